#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Skirmish.
//!
//! The world owns every agent, its health ledger, its brain and its body in
//! the reference navigation. All mutations flow through [`apply`], which
//! appends the resulting [`Event`]s to the caller's buffer and forwards them
//! to registered subscribers. Population controllers are hosted by the world
//! and advanced at the end of every tick. Externally controlled agents may
//! carry an automatic attack that fires while they stand in the battle zone.

mod lifecycle;
mod navigation;
mod roster;
mod subscriptions;

use std::{collections::BTreeMap, time::Duration};

use skirmish_core::{
    AgentId, AgentKind, AgentPool, AreaMask, Command, Control, Event, FighterState, FighterStats,
    HealthEvent, NavMeshQuery, NavigationService, SpawnRequest, SpawnerId,
};
use skirmish_system_brain::{self as brain, Brain};
use skirmish_system_combat::{AutoAttack, AutoAttackConfig};
use skirmish_system_population::{self as population, PopulationController};

use crate::{
    lifecycle::Lifecycle,
    navigation::NavAgents,
    roster::{Corpse, Roster},
    subscriptions::Subscribers,
};

pub use navigation::{Area, NavMesh};
pub use subscriptions::SubscriptionId;

/// Distance within which a position counts as standing on a navigable area.
const ZONE_TOLERANCE: f32 = 1.0;

/// World-wide tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Seed every brain's random stream is derived from.
    pub seed: u64,
    /// Time a dead autonomous agent stays in the world before retirement.
    pub corpse_linger: Duration,
    /// Tuning handed to every brain.
    pub brain: brain::Config,
    /// Automatic attack given to externally controlled agents, if any.
    pub auto_attack: Option<AutoAttackConfig>,
    /// Navigable area automatic attacks are restricted to.
    pub battle_zone: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 0,
            corpse_linger: Duration::ZERO,
            brain: brain::Config::default(),
            auto_attack: None,
            battle_zone: String::from("Battle Zone"),
        }
    }
}

/// Represents the authoritative Skirmish world state.
#[derive(Debug)]
pub struct World {
    config: Config,
    catalog: BTreeMap<AgentKind, FighterStats>,
    roster: Roster,
    brains: BTreeMap<AgentId, Brain>,
    auto_attacks: BTreeMap<AgentId, AutoAttack>,
    nav: NavAgents,
    mesh: NavMesh,
    battle_zone: AreaMask,
    spawners: BTreeMap<SpawnerId, PopulationController>,
    next_spawner: u32,
    subscribers: Subscribers,
    tick_index: u64,
}

impl World {
    /// Creates an empty world over the provided navigation mesh.
    #[must_use]
    pub fn new(config: Config, mesh: NavMesh) -> Self {
        let battle_zone = match config.auto_attack {
            Some(_) => population::resolve_area_mask(&mesh, &config.battle_zone),
            None => AreaMask::ALL,
        };
        Self {
            config,
            catalog: BTreeMap::new(),
            roster: Roster::default(),
            brains: BTreeMap::new(),
            auto_attacks: BTreeMap::new(),
            nav: NavAgents::default(),
            mesh,
            battle_zone,
            spawners: BTreeMap::new(),
            next_spawner: 0,
            subscribers: Subscribers::default(),
            tick_index: 0,
        }
    }

    /// Registers the stats agents of `kind` are created with.
    ///
    /// Agents already in the world keep the stats they were created with.
    pub fn register_kind(&mut self, kind: AgentKind, stats: FighterStats) {
        let _ = self.catalog.insert(kind, stats);
    }

    /// Registers a handler invoked with every event produced by [`apply`].
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + 'static,
    {
        self.subscribers.subscribe(Box::new(handler))
    }

    /// Removes a handler. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn lifecycle(&mut self) -> Lifecycle<'_> {
        Lifecycle {
            roster: &mut self.roster,
            brains: &mut self.brains,
            auto_attacks: &mut self.auto_attacks,
            nav: &mut self.nav,
            catalog: &self.catalog,
            config: &self.config,
        }
    }

    fn sync_positions(&mut self) {
        for (id, position) in self.nav.positions() {
            if let Some(agent) = self.roster.get_mut(id) {
                agent.position = position;
            }
        }
    }

    fn run_brains(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let ids: Vec<AgentId> = self.brains.keys().copied().collect();
        let mut commands = Vec::new();

        for id in ids {
            let Some(me) = self.roster.get(id).map(|agent| agent.presence()) else {
                continue;
            };
            if me.dead {
                continue;
            }
            let Some(brain) = self.brains.get_mut(&id) else {
                continue;
            };

            let from = brain.state();
            brain.tick(&me, &self.roster, &mut self.nav, dt, &mut commands);
            let to = brain.state();
            if from != to {
                out_events.push(Event::AgentStateChanged { agent: id, from, to });
            }

            for command in commands.drain(..) {
                execute(self, command, out_events);
            }
        }
    }

    fn run_auto_attacks(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let ids: Vec<AgentId> = self.auto_attacks.keys().copied().collect();
        let mut commands = Vec::new();

        for id in ids {
            let Some(me) = self.roster.get(id).map(|agent| agent.presence()) else {
                continue;
            };
            let Some(auto) = self.auto_attacks.get_mut(&id) else {
                continue;
            };

            let in_zone = !me.dead
                && self
                    .mesh
                    .sample_position(me.position, ZONE_TOLERANCE, self.battle_zone)
                    .is_some();
            if !in_zone {
                auto.disengage();
                continue;
            }

            auto.tick(&me, &self.roster, dt, &mut commands);
            for command in commands.drain(..) {
                execute(self, command, out_events);
            }
        }
    }

    fn damage(
        &mut self,
        target: AgentId,
        amount: f32,
        attacker: Option<AgentId>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(agent) = self.roster.get_mut(target) else {
            tracing::debug!(%target, "damage ignored for unknown agent");
            return;
        };

        if let Some(attacker) = attacker {
            out_events.push(Event::AgentAttacked {
                attacker,
                target,
                damage: amount,
            });
        }

        let mut health_events = Vec::with_capacity(2);
        agent.body.health.take_damage(amount, &mut health_events);
        let remaining = agent.body.health.current_hp();

        let mut died = false;
        for event in health_events {
            match event {
                HealthEvent::Damaged(amount) => out_events.push(Event::AgentDamaged {
                    agent: target,
                    amount,
                    remaining,
                }),
                HealthEvent::Dead => died = true,
            }
        }

        if died {
            self.handle_death(target, attacker, out_events);
        }
    }

    fn handle_death(
        &mut self,
        agent: AgentId,
        killer: Option<AgentId>,
        out_events: &mut Vec<Event>,
    ) {
        out_events.push(Event::AgentDied { agent, killer });
        tracing::debug!(%agent, ?killer, "agent died");

        let Some(brain) = self.brains.get_mut(&agent) else {
            self.nav.stop(agent);
            return;
        };

        let from = brain.state();
        brain.handle_death(&mut self.nav);
        if from != FighterState::Dead {
            out_events.push(Event::AgentStateChanged {
                agent,
                from,
                to: FighterState::Dead,
            });
        }
        self.nav.disable(agent);

        if self.config.corpse_linger.is_zero() {
            let _ = self.retire(agent, out_events);
        } else if let Some(record) = self.roster.get_mut(agent) {
            record.corpse = Some(Corpse {
                died_on: self.tick_index,
                remaining: self.config.corpse_linger,
            });
        }
    }

    fn retire(&mut self, agent: AgentId, out_events: &mut Vec<Event>) -> bool {
        if self.roster.get(agent).is_none() {
            tracing::debug!(%agent, "retirement ignored for unknown agent");
            return false;
        }

        let token = self.lifecycle().retire(agent, out_events);
        if let Some(token) = token {
            if let Some(controller) = self.spawners.get_mut(&token.spawner()) {
                let _ = controller.notify_despawn(token);
            }
        }
        true
    }

    fn count_down_corpses(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let tick_index = self.tick_index;
        let mut expired = Vec::new();
        for agent in self.roster.iter_mut() {
            let Some(corpse) = agent.corpse.as_mut() else {
                continue;
            };
            if corpse.died_on == tick_index {
                continue;
            }

            corpse.remaining = corpse.remaining.saturating_sub(dt);
            if corpse.remaining.is_zero() {
                expired.push(agent.id);
            }
        }

        for agent in expired {
            let _ = self.retire(agent, out_events);
        }
    }

    fn run_spawners(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        for controller in self.spawners.values_mut() {
            let mut pool = Lifecycle {
                roster: &mut self.roster,
                brains: &mut self.brains,
                auto_attacks: &mut self.auto_attacks,
                nav: &mut self.nav,
                catalog: &self.catalog,
                config: &self.config,
            };
            controller.tick(dt, &self.mesh, &mut pool, out_events);
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    let start = out_events.len();
    execute(world, command, out_events);
    world.subscribers.publish(&out_events[start..]);
}

/// Starts a population controller and returns its identifier.
pub fn activate_spawner(
    world: &mut World,
    config: population::Config,
    out_events: &mut Vec<Event>,
) -> SpawnerId {
    let start = out_events.len();
    let id = SpawnerId::new(world.next_spawner);
    world.next_spawner = world.next_spawner.saturating_add(1);

    let controller = PopulationController::new(id, config, &world.mesh);
    tracing::debug!(spawner = id.get(), area_mask = controller.area_mask().bits(), "spawner activated");
    let _ = world.spawners.insert(id, controller);

    out_events.push(Event::SpawnerActivated { spawner: id });
    world.subscribers.publish(&out_events[start..]);
    id
}

fn execute(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });

            world.nav.advance(dt);
            world.sync_positions();
            world.run_brains(dt, out_events);
            world.run_auto_attacks(dt, out_events);
            world.count_down_corpses(dt, out_events);
            world.run_spawners(dt, out_events);
        }
        Command::SpawnAgent {
            kind,
            faction,
            layer,
            position,
            heading,
            control,
        } => {
            let request = SpawnRequest {
                kind,
                faction,
                layer,
                position,
                heading,
                area_mask: AreaMask::ALL,
                control,
                spawner: None,
            };
            let kind = request.kind.clone();
            if world.lifecycle().spawn(request, out_events).is_none() {
                tracing::warn!(%kind, "spawn ignored, no template registered");
            }
        }
        Command::DamageAgent {
            target,
            amount,
            attacker,
        } => world.damage(target, amount, attacker, out_events),
        Command::ReviveAgent { agent } => {
            let Some(record) = world.roster.get_mut(agent) else {
                tracing::debug!(%agent, "revive ignored for unknown agent");
                return;
            };
            if record.control != Control::External {
                tracing::debug!(%agent, "revive ignored for autonomous agent");
                return;
            }

            record.body.health.reset_health();
            record.position = record.home;
            world.nav.warp(agent, record.home);
            world.nav.resume(agent);
            out_events.push(Event::AgentRevived { agent });
        }
        Command::PlaceAgent { agent, position } => {
            world.nav.warp(agent, position);
            match world.roster.get_mut(agent) {
                Some(record) => record.position = world.nav.position(agent).unwrap_or(position),
                None => tracing::debug!(%agent, "placement ignored for unknown agent"),
            }
        }
        Command::RetireAgent { agent } => {
            let _ = world.retire(agent, out_events);
        }
        Command::HaltSpawner { spawner } => match world.spawners.get_mut(&spawner) {
            Some(controller) => {
                controller.halt();
                out_events.push(Event::SpawnerHalted { spawner });
            }
            None => tracing::debug!(spawner = spawner.get(), "halt ignored for unknown spawner"),
        },
        Command::ResumeSpawner { spawner } => match world.spawners.get_mut(&spawner) {
            Some(controller) => {
                controller.activate();
                out_events.push(Event::SpawnerActivated { spawner });
            }
            None => tracing::debug!(spawner = spawner.get(), "resume ignored for unknown spawner"),
        },
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use skirmish_core::{
        AgentId, AgentKind, AgentSnapshot, AgentView, AreaMask, FighterState, HealthSnapshot,
        Position, SpawnerId,
    };
    use skirmish_system_population::PacingPhase;

    use super::{roster::Agent, World};

    /// Captures a read-only view of every agent in the world.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(
            world
                .roster
                .iter()
                .map(|agent| snapshot(world, agent))
                .collect(),
        )
    }

    /// Captures a single agent, if it is in the world.
    #[must_use]
    pub fn agent(world: &World, agent: AgentId) -> Option<AgentSnapshot> {
        world.roster.get(agent).map(|record| snapshot(world, record))
    }

    /// Brain state of an autonomous agent.
    #[must_use]
    pub fn state(world: &World, agent: AgentId) -> Option<FighterState> {
        world.brains.get(&agent).map(|brain| brain.state())
    }

    /// Target an autonomous agent currently perceives.
    #[must_use]
    pub fn current_target(world: &World, agent: AgentId) -> Option<AgentId> {
        world
            .brains
            .get(&agent)
            .and_then(|brain| brain.current_target())
    }

    /// Agent an automatic attack is locked onto.
    #[must_use]
    pub fn auto_attack_target(world: &World, agent: AgentId) -> Option<AgentId> {
        world
            .auto_attacks
            .get(&agent)
            .and_then(|auto| auto.target())
    }

    /// Copy of an agent's health ledger.
    #[must_use]
    pub fn health(world: &World, agent: AgentId) -> Option<HealthSnapshot> {
        world
            .roster
            .get(agent)
            .map(|record| record.body.health.snapshot())
    }

    /// Current position of an agent.
    #[must_use]
    pub fn position(world: &World, agent: AgentId) -> Option<Position> {
        world.roster.get(agent).map(|record| record.position)
    }

    /// Navigable areas an agent was spawned into.
    #[must_use]
    pub fn area_mask(world: &World, agent: AgentId) -> Option<AreaMask> {
        world.roster.get(agent).map(|record| record.area_mask)
    }

    /// Number of agents in the world that are not dead.
    #[must_use]
    pub fn live_count(world: &World) -> usize {
        world
            .roster
            .iter()
            .filter(|agent| !agent.body.health.is_dead())
            .count()
    }

    /// Number of agents tracked by a population controller.
    #[must_use]
    pub fn active_population(world: &World, spawner: SpawnerId) -> Option<usize> {
        world
            .spawners
            .get(&spawner)
            .map(|controller| controller.active_count())
    }

    /// Pacing stage of a population controller.
    #[must_use]
    pub fn spawner_phase(world: &World, spawner: SpawnerId) -> Option<PacingPhase> {
        world
            .spawners
            .get(&spawner)
            .map(|controller| controller.phase())
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Number of retired instances of `kind` waiting for reuse.
    #[must_use]
    pub fn shelved_instances(world: &World, kind: &AgentKind) -> usize {
        world.roster.shelved(kind)
    }

    fn snapshot(world: &World, agent: &Agent) -> AgentSnapshot {
        let brain = world.brains.get(&agent.id);
        AgentSnapshot {
            id: agent.id,
            kind: agent.body.kind.clone(),
            faction: agent.faction,
            layer: agent.layer,
            position: agent.position,
            heading: agent.heading,
            state: brain.map(|brain| brain.state()),
            target: brain.and_then(|brain| brain.current_target()),
            health: agent.body.health.snapshot(),
        }
    }
}
