use std::{collections::BTreeMap, time::Duration};

use skirmish_core::{
    AgentDirectory, AgentId, Command, Faction, FighterState, FighterStats, LayerMask,
    NavigationService, Position, Presence, SpatialQuery,
};
use skirmish_system_brain::{Brain, Config};

const DT: Duration = Duration::from_millis(250);

#[derive(Default)]
struct Arena {
    agents: BTreeMap<AgentId, Presence>,
}

impl Arena {
    fn place(&mut self, id: u32, faction: Faction, position: Position) {
        let _ = self.agents.insert(
            AgentId::new(id),
            Presence {
                id: AgentId::new(id),
                faction,
                position,
                dead: false,
            },
        );
    }

    fn kill(&mut self, id: u32) {
        if let Some(presence) = self.agents.get_mut(&AgentId::new(id)) {
            presence.dead = true;
        }
    }

    fn remove(&mut self, id: u32) {
        let _ = self.agents.remove(&AgentId::new(id));
    }

    fn me(&self, id: u32) -> Presence {
        self.agents[&AgentId::new(id)]
    }
}

impl SpatialQuery for Arena {
    fn overlap(&self, center: Position, radius: f32, mask: LayerMask, out: &mut Vec<AgentId>) {
        for presence in self.agents.values() {
            if mask.contains(presence.faction.layer())
                && presence.position.distance(center) <= radius
            {
                out.push(presence.id);
            }
        }
    }
}

impl AgentDirectory for Arena {
    fn presence(&self, agent: AgentId) -> Option<Presence> {
        self.agents.get(&agent).copied()
    }
}

#[derive(Clone, Debug, PartialEq)]
enum NavCall {
    Destination(Position),
    Stop,
    Resume,
}

#[derive(Default)]
struct ScriptedNav {
    calls: Vec<NavCall>,
    stopped: bool,
    remaining: f32,
}

impl NavigationService for ScriptedNav {
    fn set_destination(&mut self, _agent: AgentId, point: Position) {
        self.calls.push(NavCall::Destination(point));
    }

    fn stop(&mut self, _agent: AgentId) {
        self.calls.push(NavCall::Stop);
        self.stopped = true;
    }

    fn resume(&mut self, _agent: AgentId) {
        self.calls.push(NavCall::Resume);
        self.stopped = false;
    }

    fn is_enabled(&self, _agent: AgentId) -> bool {
        true
    }

    fn is_stopped(&self, _agent: AgentId) -> bool {
        self.stopped
    }

    fn is_path_pending(&self, _agent: AgentId) -> bool {
        false
    }

    fn remaining_distance(&self, _agent: AgentId) -> f32 {
        self.remaining
    }
}

fn brain_for(arena: &Arena, id: u32) -> Brain {
    Brain::new(
        AgentId::new(id),
        &FighterStats::default(),
        Config::default(),
        arena.me(id).position,
        5,
    )
}

fn step(brain: &mut Brain, arena: &Arena, id: u32, nav: &mut ScriptedNav) -> Vec<Command> {
    let mut out = Vec::new();
    brain.tick(&arena.me(id), arena, nav, DT, &mut out);
    out
}

#[test]
fn perceived_target_interrupts_patrol_without_moving() {
    let mut arena = Arena::default();
    arena.place(1, Faction::Friendly, Position::ZERO);
    arena.place(2, Faction::Enemy, Position::new(12.0, 0.0, 0.0));
    let mut brain = brain_for(&arena, 1);
    let mut nav = ScriptedNav::default();

    let commands = step(&mut brain, &arena, 1, &mut nav);

    assert_eq!(brain.state(), FighterState::Chase);
    assert_eq!(brain.current_target(), Some(AgentId::new(2)));
    assert!(commands.is_empty());
    assert!(nav.calls.is_empty(), "the transition tick issues no movement");
}

#[test]
fn chase_holds_outside_range_and_attacks_at_exact_range() {
    let mut arena = Arena::default();
    arena.place(1, Faction::Enemy, Position::ZERO);
    arena.place(2, Faction::Friendly, Position::new(6.0, 0.0, 0.0));
    let mut brain = brain_for(&arena, 1);
    let mut nav = ScriptedNav::default();

    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.state(), FighterState::Chase);

    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.state(), FighterState::Chase);
    assert_eq!(
        nav.calls,
        vec![NavCall::Destination(Position::new(6.0, 0.0, 0.0))]
    );

    arena.place(2, Faction::Friendly, Position::new(5.0, 0.0, 0.0));
    nav.calls.clear();
    let _ = step(&mut brain, &arena, 1, &mut nav);

    assert_eq!(brain.state(), FighterState::Attack);
    assert_eq!(nav.calls, vec![NavCall::Stop]);
}

#[test]
fn attack_strikes_once_per_cooldown() {
    let mut arena = Arena::default();
    arena.place(1, Faction::Friendly, Position::ZERO);
    arena.place(2, Faction::Neutral, Position::new(0.0, 0.0, 3.0));
    let mut brain = brain_for(&arena, 1);
    let mut nav = ScriptedNav::default();

    let mut strike_ticks = Vec::new();
    for tick in 0..12 {
        let commands = step(&mut brain, &arena, 1, &mut nav);
        for command in commands {
            assert_eq!(
                command,
                Command::DamageAgent {
                    target: AgentId::new(2),
                    amount: 100.0,
                    attacker: Some(AgentId::new(1)),
                }
            );
            strike_ticks.push(tick);
        }
    }

    // Cooldown is reached at the fourth quarter-second tick, then every four ticks.
    assert_eq!(strike_ticks, vec![3, 7, 11]);
}

#[test]
fn vanished_target_returns_to_patrol() {
    let mut arena = Arena::default();
    arena.place(1, Faction::Friendly, Position::ZERO);
    arena.place(2, Faction::Enemy, Position::new(2.0, 0.0, 0.0));
    let mut brain = brain_for(&arena, 1);
    let mut nav = ScriptedNav::default();

    let _ = step(&mut brain, &arena, 1, &mut nav);
    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.state(), FighterState::Attack);

    arena.kill(2);
    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.state(), FighterState::Patrol);
    assert_eq!(brain.current_target(), None);

    arena.place(3, Faction::Enemy, Position::new(4.0, 0.0, 0.0));
    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.state(), FighterState::Chase);

    arena.remove(3);
    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.state(), FighterState::Patrol);
}

#[test]
fn target_leaving_range_resumes_chase() {
    let mut arena = Arena::default();
    arena.place(1, Faction::Enemy, Position::ZERO);
    arena.place(2, Faction::Friendly, Position::new(4.0, 0.0, 0.0));
    let mut brain = brain_for(&arena, 1);
    let mut nav = ScriptedNav::default();

    let _ = step(&mut brain, &arena, 1, &mut nav);
    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.state(), FighterState::Attack);

    arena.place(2, Faction::Friendly, Position::new(9.0, 0.0, 0.0));
    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.state(), FighterState::Chase);

    nav.calls.clear();
    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(
        nav.calls,
        vec![
            NavCall::Resume,
            NavCall::Destination(Position::new(9.0, 0.0, 0.0))
        ]
    );
}

#[test]
fn patrol_regenerates_point_on_arrival() {
    let mut arena = Arena::default();
    arena.place(1, Faction::Friendly, Position::new(10.0, 1.0, 10.0));
    let mut brain = brain_for(&arena, 1);
    let mut nav = ScriptedNav {
        remaining: 3.0,
        ..ScriptedNav::default()
    };

    let first = brain.patrol_point();
    let _ = step(&mut brain, &arena, 1, &mut nav);
    assert_eq!(brain.patrol_point(), first);
    assert_eq!(nav.calls, vec![NavCall::Destination(first)]);

    nav.remaining = 0.05;
    let _ = step(&mut brain, &arena, 1, &mut nav);
    let second = brain.patrol_point();
    assert_ne!(second, first);
    assert_eq!(second.y, 1.0);
    assert!(second.distance(Position::new(10.0, 1.0, 10.0)) <= 6.0);
}

#[test]
fn death_is_absorbing() {
    let mut arena = Arena::default();
    arena.place(1, Faction::Friendly, Position::ZERO);
    arena.place(2, Faction::Enemy, Position::new(1.0, 0.0, 0.0));
    let mut brain = brain_for(&arena, 1);
    let mut nav = ScriptedNav::default();
    let _ = step(&mut brain, &arena, 1, &mut nav);

    brain.handle_death(&mut nav);
    assert_eq!(brain.state(), FighterState::Dead);
    assert_eq!(brain.current_target(), None);
    assert_eq!(nav.calls, vec![NavCall::Stop]);

    nav.calls.clear();
    for _ in 0..8 {
        let commands = step(&mut brain, &arena, 1, &mut nav);
        assert!(commands.is_empty());
    }
    brain.handle_death(&mut nav);

    assert_eq!(brain.state(), FighterState::Dead);
    assert!(nav.calls.is_empty());
    assert_eq!(brain.current_target(), None);
}
