use std::{cell::Cell, collections::BTreeMap, time::Duration};

use skirmish_core::{
    AgentId, AgentPool, AreaMask, Event, NavMeshQuery, Position, SpawnRejection, SpawnRequest,
    SpawnToken, SpawnerId,
};
use skirmish_system_population::{Config, PacingPhase, PopulationController};

const DT: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Meadow {
    barren: bool,
    failures_left: Cell<usize>,
    samples: Cell<usize>,
}

impl NavMeshQuery for Meadow {
    fn area_mask(&self, name: &str) -> Option<AreaMask> {
        (name == "Battle Zone").then_some(AreaMask::from_index(0))
    }

    fn sample_position(&self, point: Position, _max_distance: f32, _mask: AreaMask) -> Option<Position> {
        self.samples.set(self.samples.get() + 1);
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return None;
        }
        (!self.barren).then_some(point)
    }
}

#[derive(Default)]
struct Barracks {
    next: u32,
    refuse: bool,
    live: BTreeMap<AgentId, SpawnRequest>,
}

impl AgentPool for Barracks {
    fn spawn(&mut self, request: SpawnRequest, out: &mut Vec<Event>) -> Option<AgentId> {
        if self.refuse {
            return None;
        }
        self.next += 1;
        let agent = AgentId::new(self.next);
        out.push(Event::AgentSpawned {
            agent,
            kind: request.kind.clone(),
            faction: request.faction,
            position: request.position,
            spawner: request.spawner,
        });
        let _ = self.live.insert(agent, request);
        Some(agent)
    }

    fn retire(&mut self, agent: AgentId, out: &mut Vec<Event>) -> Option<SpawnToken> {
        let request = self.live.remove(&agent)?;
        let token = request.spawner.map(|spawner| SpawnToken::attach(agent, spawner));
        out.push(Event::AgentDespawned { agent, token });
        token
    }
}

fn controller(config: Config, mesh: &Meadow) -> PopulationController {
    PopulationController::new(SpawnerId::new(1), config, mesh)
}

fn tick(
    controller: &mut PopulationController,
    mesh: &Meadow,
    pool: &mut Barracks,
) -> Vec<Event> {
    let mut events = Vec::new();
    controller.tick(DT, mesh, pool, &mut events);
    events
}

#[test]
fn initial_burst_runs_four_paced_batches_before_waiting() {
    let mesh = Meadow::default();
    let mut pool = Barracks::default();
    let mut controller = controller(Config::default(), &mesh);

    let _ = tick(&mut controller, &mesh, &mut pool);
    assert_eq!(controller.phase(), PacingPhase::Warmup);
    assert_eq!(controller.active_count(), 0);

    let mut per_tick = Vec::new();
    while controller.phase() != PacingPhase::Waiting {
        let before = controller.active_count();
        let events = tick(&mut controller, &mesh, &mut pool);
        assert!(controller.active_count() <= 100);
        let spawned = controller.active_count() - before;
        assert_eq!(events.len(), spawned, "only spawn announcements, {events:?}");
        per_tick.push(spawned);
    }

    assert_eq!(per_tick, vec![4, 4, 4, 4, 0]);
    assert_eq!(controller.active_count(), 16);
    assert_eq!(pool.live.len(), 16);
}

#[test]
fn interval_batches_top_up_after_each_wait() {
    let mesh = Meadow::default();
    let mut pool = Barracks::default();
    let mut controller = controller(Config::default(), &mesh);
    while controller.phase() != PacingPhase::Waiting {
        let _ = tick(&mut controller, &mesh, &mut pool);
    }

    for _ in 0..9 {
        let _ = tick(&mut controller, &mesh, &mut pool);
        assert_eq!(controller.active_count(), 16);
    }

    let _ = tick(&mut controller, &mesh, &mut pool);
    assert_eq!(controller.active_count(), 17);
    assert_eq!(controller.phase(), PacingPhase::Waiting);

    for _ in 0..10 {
        let _ = tick(&mut controller, &mesh, &mut pool);
    }
    assert_eq!(controller.active_count(), 18);
}

#[test]
fn spawn_at_capacity_is_rejected_without_side_effects() {
    let mesh = Meadow::default();
    let mut pool = Barracks::default();
    let config = Config {
        capacity: 2,
        ..Config::default()
    };
    let mut controller = controller(config, &mesh);

    assert!(controller.try_spawn_one(&mesh, &mut pool, &mut Vec::new()).is_ok());
    assert!(controller.try_spawn_one(&mesh, &mut pool, &mut Vec::new()).is_ok());
    assert_eq!(
        controller.try_spawn_one(&mesh, &mut pool, &mut Vec::new()),
        Err(SpawnRejection::CapacityReached)
    );

    let mut events = Vec::new();
    assert!(!controller.spawn_one(&mesh, &mut pool, &mut events));
    assert_eq!(controller.active_count(), 2);
    assert_eq!(pool.live.len(), 2);
    assert_eq!(
        events,
        vec![Event::SpawnRejected {
            spawner: SpawnerId::new(1),
            reason: SpawnRejection::CapacityReached,
        }]
    );
}

fn count_rejections(events: &[Event], wanted: SpawnRejection) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::SpawnRejected { reason, .. } if *reason == wanted))
        .count()
}

#[test]
fn exhausted_sampling_under_delivers_one_attempt_per_slot() {
    let mesh = Meadow {
        barren: true,
        ..Meadow::default()
    };
    let mut pool = Barracks::default();
    let mut controller = controller(Config::default(), &mesh);

    let mut rejections = 0;
    while controller.phase() != PacingPhase::Waiting {
        let events = tick(&mut controller, &mesh, &mut pool);
        rejections += count_rejections(&events, SpawnRejection::NoSpawnPoint);
    }

    assert_eq!(rejections, 16);
    assert_eq!(mesh.samples.get(), 16 * 20);
    assert_eq!(controller.active_count(), 0);
}

#[test]
fn failed_spawn_point_is_not_retried_within_the_batch() {
    let mesh = Meadow {
        failures_left: Cell::new(1),
        ..Meadow::default()
    };
    let mut pool = Barracks::default();
    let config = Config {
        initial_spawn: 4,
        initial_per_frame: 4,
        max_spawn_attempts: 1,
        ..Config::default()
    };
    let mut controller = controller(config, &mesh);

    let _ = tick(&mut controller, &mesh, &mut pool);
    let events = tick(&mut controller, &mesh, &mut pool);
    assert_eq!(count_rejections(&events, SpawnRejection::NoSpawnPoint), 1);
    assert_eq!(controller.active_count(), 3);

    let events = tick(&mut controller, &mesh, &mut pool);
    assert!(events.is_empty());
    assert_eq!(controller.phase(), PacingPhase::Waiting);
    assert_eq!(controller.active_count(), 3);

    for _ in 0..10 {
        let _ = tick(&mut controller, &mesh, &mut pool);
    }
    assert_eq!(controller.active_count(), 4, "the next batch makes up the shortfall");
}

#[test]
fn pool_refusal_is_reported() {
    let mesh = Meadow::default();
    let mut pool = Barracks {
        refuse: true,
        ..Barracks::default()
    };
    let mut controller = controller(Config::default(), &mesh);

    assert_eq!(
        controller.try_spawn_one(&mesh, &mut pool, &mut Vec::new()),
        Err(SpawnRejection::PoolExhausted)
    );
    assert_eq!(controller.active_count(), 0);
}

#[test]
fn despawn_notifications_free_capacity_for_own_tokens_only() {
    let mesh = Meadow::default();
    let mut pool = Barracks::default();
    let config = Config {
        capacity: 1,
        ..Config::default()
    };
    let mut controller = controller(config, &mesh);
    let agent = controller
        .try_spawn_one(&mesh, &mut pool, &mut Vec::new())
        .expect("spawn succeeds");

    assert!(!controller.notify_despawn(SpawnToken::attach(agent, SpawnerId::new(9))));
    assert_eq!(controller.active_count(), 1);

    let token = pool.retire(agent, &mut Vec::new()).expect("agent carries a token");
    assert!(controller.notify_despawn(token));
    assert!(!controller.notify_despawn(token), "second notification is a no-op");
    assert_eq!(controller.active_count(), 0);
    assert!(controller.try_spawn_one(&mesh, &mut pool, &mut Vec::new()).is_ok());
}

#[test]
fn waits_again_when_full_at_interval() {
    let mesh = Meadow::default();
    let mut pool = Barracks::default();
    let config = Config {
        capacity: 4,
        ..Config::default()
    };
    let mut controller = controller(config, &mesh);

    for _ in 0..40 {
        let events = tick(&mut controller, &mesh, &mut pool);
        assert!(
            !events.iter().any(|event| matches!(event, Event::SpawnRejected { .. })),
            "a full population never attempts spawns"
        );
        assert!(controller.active_count() <= 4);
    }

    assert_eq!(controller.active_count(), 4);
    assert_eq!(controller.phase(), PacingPhase::Waiting);
}

#[test]
fn halting_abandons_the_batch_and_activation_restarts_warmup() {
    let mesh = Meadow::default();
    let mut pool = Barracks::default();
    let mut controller = controller(Config::default(), &mesh);
    let _ = tick(&mut controller, &mesh, &mut pool);
    let _ = tick(&mut controller, &mesh, &mut pool);
    assert_eq!(controller.phase(), PacingPhase::Burst);
    assert_eq!(controller.active_count(), 4);

    controller.halt();
    for _ in 0..30 {
        let _ = tick(&mut controller, &mesh, &mut pool);
    }
    assert_eq!(controller.phase(), PacingPhase::Halted);
    assert_eq!(controller.active_count(), 4);

    controller.activate();
    assert_eq!(controller.phase(), PacingPhase::Warmup);
    let _ = tick(&mut controller, &mesh, &mut pool);
    let _ = tick(&mut controller, &mesh, &mut pool);
    assert_eq!(controller.active_count(), 8);
}

#[test]
fn spawn_requests_carry_controller_settings() {
    let mesh = Meadow::default();
    let mut pool = Barracks::default();
    let mut controller = controller(Config::default(), &mesh);

    let agent = controller
        .try_spawn_one(&mesh, &mut pool, &mut Vec::new())
        .expect("spawn succeeds");
    let request = &pool.live[&agent];

    assert_eq!(request.spawner, Some(SpawnerId::new(1)));
    assert_eq!(request.area_mask, AreaMask::from_index(0));
    assert!(Config::default().kinds.contains(&request.kind));
    assert!((0.0..360.0).contains(&request.heading));
    assert!(controller.is_tracking(agent));
}
