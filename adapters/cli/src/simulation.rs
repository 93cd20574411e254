//! Headless execution of a scenario.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use serde::Serialize;
use skirmish_core::{AgentKind, Command, Control, Event, Faction, Layer, Position};
use skirmish_world::{self as world, query, NavMesh, World};

use crate::scenario::Scenario;

/// Running totals gathered from world events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub(crate) struct Tally {
    pub(crate) spawned: u64,
    pub(crate) attacks: u64,
    pub(crate) deaths: u64,
    pub(crate) despawned: u64,
    pub(crate) rejected_spawns: u64,
    pub(crate) transitions: u64,
}

impl Tally {
    fn record(&mut self, event: &Event) {
        match event {
            Event::AgentSpawned { .. } => self.spawned += 1,
            Event::AgentAttacked { .. } => self.attacks += 1,
            Event::AgentDied { .. } => self.deaths += 1,
            Event::AgentDespawned { .. } => self.despawned += 1,
            Event::SpawnRejected { .. } => self.rejected_spawns += 1,
            Event::AgentStateChanged { .. } => self.transitions += 1,
            _ => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct SpawnerSummary {
    pub(crate) id: u32,
    pub(crate) active: usize,
    pub(crate) phase: String,
}

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Summary {
    pub(crate) ticks: u64,
    pub(crate) simulated_seconds: f64,
    pub(crate) tally: Tally,
    pub(crate) live_agents: usize,
    pub(crate) agents_by_state: BTreeMap<String, usize>,
    pub(crate) spawners: Vec<SpawnerSummary>,
}

/// Builds the world described by `scenario` and ticks it to completion.
pub(crate) fn run(scenario: &Scenario) -> Summary {
    let mut mesh = NavMesh::new();
    for area in &scenario.areas {
        let _ = mesh.add_area(area.area());
    }

    let (auto_attack, battle_zone) = match &scenario.player {
        Some(player) => (player.auto_attack.config(), player.auto_attack.zone.clone()),
        None => (None, world::Config::default().battle_zone),
    };
    let mut world = World::new(
        world::Config {
            seed: scenario.seed,
            corpse_linger: scenario.corpse_linger(),
            brain: scenario.brain.config(),
            auto_attack,
            battle_zone,
        },
        mesh,
    );
    for kind in &scenario.kinds {
        world.register_kind(kind.kind(), kind.stats());
    }

    let tally = Rc::new(RefCell::new(Tally::default()));
    let sink = Rc::clone(&tally);
    let _ = world.subscribe(move |event| sink.borrow_mut().record(event));

    let mut events = Vec::new();
    if let Some(player) = &scenario.player {
        let kind = AgentKind::new(player.kind.clone());
        world.register_kind(kind.clone(), player.stats());
        world::apply(
            &mut world,
            Command::SpawnAgent {
                kind,
                faction: Faction::Friendly,
                layer: Layer::Player,
                position: Position::from(player.position),
                heading: 0.0,
                control: Control::External,
            },
            &mut events,
        );
    }

    for squad in &scenario.squads {
        for index in 0..squad.count {
            world::apply(
                &mut world,
                Command::SpawnAgent {
                    kind: AgentKind::new(squad.kind.clone()),
                    faction: squad.faction,
                    layer: squad.faction.layer(),
                    position: squad.slot(index),
                    heading: 0.0,
                    control: Control::Autonomous,
                },
                &mut events,
            );
        }
    }

    let spawners: Vec<_> = scenario
        .spawners
        .iter()
        .enumerate()
        .map(|(index, settings)| {
            let seed = scenario.seed.wrapping_add(index as u64);
            world::activate_spawner(&mut world, settings.config(seed), &mut events)
        })
        .collect();

    let dt = scenario.tick();
    for _ in 0..scenario.ticks {
        events.clear();
        world::apply(&mut world, Command::Tick { dt }, &mut events);
    }

    let mut agents_by_state = BTreeMap::new();
    for agent in query::agent_view(&world).iter() {
        let label = agent
            .state
            .map_or_else(|| String::from("External"), |state| format!("{state:?}"));
        *agents_by_state.entry(label).or_insert(0) += 1;
    }

    let tally = *tally.borrow();
    let summary = Summary {
        ticks: query::tick_index(&world),
        simulated_seconds: dt.as_secs_f64() * scenario.ticks as f64,
        tally,
        live_agents: query::live_count(&world),
        agents_by_state,
        spawners: spawners
            .into_iter()
            .map(|id| SpawnerSummary {
                id: id.get(),
                active: query::active_population(&world, id).unwrap_or(0),
                phase: query::spawner_phase(&world, id)
                    .map_or_else(String::new, |phase| format!("{phase:?}")),
            })
            .collect(),
    };

    tracing::info!(
        ticks = summary.ticks,
        live = summary.live_agents,
        deaths = summary.tally.deaths,
        "simulation finished"
    );
    summary
}
