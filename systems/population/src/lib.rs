#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded population controller with paced, multi-tick spawning.
//!
//! The controller keeps the set of agents it spawned below a fixed capacity.
//! Its pacing loop idles for a few warm-up ticks, performs an initial burst of
//! spawns spread across several ticks, and then alternates between waiting a
//! fixed interval and spawning small top-up batches. Every suspension point is
//! stored as explicit state and advanced by [`PopulationController::tick`].

use std::{collections::BTreeSet, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, UnitBall};
use skirmish_core::{
    AgentId, AgentKind, AgentPool, AreaMask, Control, Event, Faction, NavMeshQuery, Position,
    SpawnRejection, SpawnRequest, SpawnToken, SpawnerId,
};

/// Tuning of a population controller.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Maximum number of tracked agents.
    pub capacity: usize,
    /// Agents requested by the initial burst.
    pub initial_spawn: usize,
    /// Spawn attempts per tick during the initial burst.
    pub initial_per_frame: usize,
    /// Wait between two top-up batches.
    pub interval: Duration,
    /// Agents requested by each top-up batch.
    pub per_interval: usize,
    /// Spawn attempts per tick during top-up batches.
    pub per_frame: usize,
    /// Faction assigned to spawned agents.
    pub faction: Faction,
    /// Templates chosen uniformly for each spawn.
    pub kinds: Vec<AgentKind>,
    /// Navigable area spawn points must lie in.
    pub area_name: String,
    /// Center of the spawn region.
    pub anchor: Position,
    /// Radius of the spawn region around the anchor.
    pub spawn_radius: f32,
    /// Candidate points sampled per spawn before giving up.
    pub max_spawn_attempts: usize,
    /// Ticks the controller idles after activation.
    pub warmup_frames: u32,
    /// Seed of the controller's random stream.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 100,
            initial_spawn: 16,
            initial_per_frame: 4,
            interval: Duration::from_secs(10),
            per_interval: 1,
            per_frame: 2,
            faction: Faction::Enemy,
            kinds: ["Enemy_1001", "Enemy_1002", "Enemy_1003"]
                .into_iter()
                .map(AgentKind::new)
                .collect(),
            area_name: String::from("Battle Zone"),
            anchor: Position::ZERO,
            spawn_radius: 20.0,
            max_spawn_attempts: 20,
            warmup_frames: 2,
            seed: 0,
        }
    }
}

/// Observable stage of the pacing loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacingPhase {
    /// Idling before the initial burst.
    Warmup,
    /// Spreading the initial burst across ticks.
    Burst,
    /// Counting down to the next top-up batch.
    Waiting,
    /// Spreading a top-up batch across ticks.
    Interval,
    /// Pacing loop stopped.
    Halted,
}

/// Resolves a named area into a mask, falling back to every area.
#[must_use]
pub fn resolve_area_mask<M>(mesh: &M, name: &str) -> AreaMask
where
    M: NavMeshQuery + ?Sized,
{
    match mesh.area_mask(name) {
        Some(mask) => mask,
        None => {
            tracing::warn!(area = name, "navigation area not found, falling back to all areas");
            AreaMask::ALL
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BatchKind {
    Burst,
    Interval,
}

#[derive(Clone, Copy, Debug)]
struct Batch {
    kind: BatchKind,
    per_frame: usize,
    target: usize,
    attempted: usize,
    spawned: usize,
}

#[derive(Clone, Copy, Debug)]
enum Pacing {
    Warmup { frames_left: u32 },
    Batch(Batch),
    Waiting { remaining: Duration },
    Halted,
}

enum BatchStep {
    Yielded,
    Finished,
}

/// Spawns agents through an [`AgentPool`] while keeping their count bounded.
#[derive(Clone, Debug)]
pub struct PopulationController {
    id: SpawnerId,
    config: Config,
    area_mask: AreaMask,
    active: BTreeSet<AgentId>,
    pacing: Pacing,
    rng: ChaCha8Rng,
}

impl PopulationController {
    /// Creates an active controller that starts in its warm-up phase.
    #[must_use]
    pub fn new<M>(id: SpawnerId, config: Config, mesh: &M) -> Self
    where
        M: NavMeshQuery + ?Sized,
    {
        let area_mask = resolve_area_mask(mesh, &config.area_name);
        let rng = ChaCha8Rng::seed_from_u64(config.seed ^ u64::from(id.get()));
        Self {
            id,
            pacing: Pacing::Warmup {
                frames_left: config.warmup_frames,
            },
            config,
            area_mask,
            active: BTreeSet::new(),
            rng,
        }
    }

    /// Identifier of the controller.
    #[must_use]
    pub fn id(&self) -> SpawnerId {
        self.id
    }

    /// Tuning the controller was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Area mask spawn points are validated against.
    #[must_use]
    pub fn area_mask(&self) -> AreaMask {
        self.area_mask
    }

    /// Number of tracked agents.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Reports whether the controller tracks the agent.
    #[must_use]
    pub fn is_tracking(&self, agent: AgentId) -> bool {
        self.active.contains(&agent)
    }

    /// Current stage of the pacing loop.
    #[must_use]
    pub fn phase(&self) -> PacingPhase {
        match self.pacing {
            Pacing::Warmup { .. } => PacingPhase::Warmup,
            Pacing::Batch(batch) => match batch.kind {
                BatchKind::Burst => PacingPhase::Burst,
                BatchKind::Interval => PacingPhase::Interval,
            },
            Pacing::Waiting { .. } => PacingPhase::Waiting,
            Pacing::Halted => PacingPhase::Halted,
        }
    }

    /// Stops the pacing loop. A batch in progress is abandoned as is.
    pub fn halt(&mut self) {
        self.pacing = Pacing::Halted;
    }

    /// Restarts the pacing loop from its warm-up phase.
    pub fn activate(&mut self) {
        self.pacing = Pacing::Warmup {
            frames_left: self.config.warmup_frames,
        };
    }

    /// Advances the pacing loop by one tick of length `dt`.
    ///
    /// Failed spawn attempts are reported as [`Event::SpawnRejected`].
    pub fn tick<M, P>(&mut self, dt: Duration, mesh: &M, pool: &mut P, out: &mut Vec<Event>)
    where
        M: NavMeshQuery + ?Sized,
        P: AgentPool + ?Sized,
    {
        match self.pacing {
            Pacing::Halted => {}
            Pacing::Warmup { frames_left } => {
                let frames_left = frames_left.saturating_sub(1);
                if frames_left > 0 {
                    self.pacing = Pacing::Warmup { frames_left };
                    return;
                }

                let batch = self.start_batch(
                    BatchKind::Burst,
                    self.config.initial_spawn,
                    self.config.initial_per_frame,
                );
                self.resume_batch(batch, mesh, pool, out);
            }
            Pacing::Batch(batch) => self.resume_batch(batch, mesh, pool, out),
            Pacing::Waiting { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    self.pacing = Pacing::Waiting { remaining };
                    return;
                }

                if self.active.len() < self.config.capacity {
                    let batch = self.start_batch(
                        BatchKind::Interval,
                        self.config.per_interval,
                        self.config.per_frame,
                    );
                    self.resume_batch(batch, mesh, pool, out);
                } else {
                    self.start_wait();
                }
            }
        }
    }

    /// Performs a single spawn attempt, reporting failures into `out`.
    ///
    /// Returns whether an agent was spawned.
    pub fn spawn_one<M, P>(&mut self, mesh: &M, pool: &mut P, out: &mut Vec<Event>) -> bool
    where
        M: NavMeshQuery + ?Sized,
        P: AgentPool + ?Sized,
    {
        match self.try_spawn_one(mesh, pool, out) {
            Ok(_) => true,
            Err(reason) => {
                tracing::warn!(spawner = self.id.get(), %reason, "spawn attempt failed");
                out.push(Event::SpawnRejected {
                    spawner: self.id,
                    reason,
                });
                false
            }
        }
    }

    /// Performs a single spawn attempt.
    ///
    /// The attempt is rejected when the controller is at capacity, when no
    /// navigable point is found around the anchor, or when the pool cannot
    /// provide an instance. On success the agent is tracked until its token is
    /// handed back through [`PopulationController::notify_despawn`]. Events
    /// emitted by the pool are appended to `out`.
    pub fn try_spawn_one<M, P>(
        &mut self,
        mesh: &M,
        pool: &mut P,
        out: &mut Vec<Event>,
    ) -> Result<AgentId, SpawnRejection>
    where
        M: NavMeshQuery + ?Sized,
        P: AgentPool + ?Sized,
    {
        if self.active.len() >= self.config.capacity {
            return Err(SpawnRejection::CapacityReached);
        }

        let position = self.sample_spawn_point(mesh).ok_or(SpawnRejection::NoSpawnPoint)?;

        if self.config.kinds.is_empty() {
            return Err(SpawnRejection::PoolExhausted);
        }
        let pick = self.rng.gen_range(0..self.config.kinds.len());
        let kind = self.config.kinds[pick].clone();
        let heading: f32 = self.rng.gen_range(0.0..360.0);

        let request = SpawnRequest {
            kind,
            faction: self.config.faction,
            layer: self.config.faction.layer(),
            position,
            heading,
            area_mask: self.area_mask,
            control: Control::Autonomous,
            spawner: Some(self.id),
        };
        let agent = pool
            .spawn(request, out)
            .ok_or(SpawnRejection::PoolExhausted)?;

        let _ = self.active.insert(agent);
        tracing::debug!(spawner = self.id.get(), %agent, active = self.active.len(), "agent spawned");
        Ok(agent)
    }

    /// Stops tracking the agent named by `token`.
    ///
    /// Tokens issued by other controllers are ignored. Returns whether the
    /// active set changed.
    pub fn notify_despawn(&mut self, token: SpawnToken) -> bool {
        if token.spawner() != self.id {
            return false;
        }

        self.active.remove(&token.agent())
    }

    fn start_batch(&self, kind: BatchKind, target: usize, per_frame: usize) -> Batch {
        Batch {
            kind,
            per_frame: per_frame.max(1),
            target: target.min(self.config.capacity.saturating_sub(self.active.len())),
            attempted: 0,
            spawned: 0,
        }
    }

    fn resume_batch<M, P>(&mut self, mut batch: Batch, mesh: &M, pool: &mut P, out: &mut Vec<Event>)
    where
        M: NavMeshQuery + ?Sized,
        P: AgentPool + ?Sized,
    {
        match self.run_frame(&mut batch, mesh, pool, out) {
            BatchStep::Yielded => self.pacing = Pacing::Batch(batch),
            BatchStep::Finished => {
                tracing::debug!(
                    spawner = self.id.get(),
                    spawned = batch.spawned,
                    requested = batch.target,
                    "spawn batch finished"
                );
                self.start_wait();
            }
        }
    }

    /// Each targeted spawn gets exactly one attempt. A failed attempt leaves
    /// the batch one agent short; the next batch makes up for it.
    fn run_frame<M, P>(
        &mut self,
        batch: &mut Batch,
        mesh: &M,
        pool: &mut P,
        out: &mut Vec<Event>,
    ) -> BatchStep
    where
        M: NavMeshQuery + ?Sized,
        P: AgentPool + ?Sized,
    {
        let mut attempts = 0;
        while batch.attempted < batch.target {
            if self.active.len() >= self.config.capacity {
                return BatchStep::Finished;
            }

            batch.attempted += 1;
            if self.spawn_one(mesh, pool, out) {
                batch.spawned += 1;
            }

            attempts += 1;
            if attempts >= batch.per_frame {
                return BatchStep::Yielded;
            }
        }

        BatchStep::Finished
    }

    fn start_wait(&mut self) {
        self.pacing = Pacing::Waiting {
            remaining: self.config.interval,
        };
    }

    fn sample_spawn_point<M>(&mut self, mesh: &M) -> Option<Position>
    where
        M: NavMeshQuery + ?Sized,
    {
        let anchor = self.config.anchor;
        let radius = self.config.spawn_radius;
        for _ in 0..self.config.max_spawn_attempts {
            let [x, _, z]: [f32; 3] = UnitBall.sample(&mut self.rng);
            let candidate = Position::new(anchor.x + x * radius, anchor.y, anchor.z + z * radius);
            if let Some(point) = mesh.sample_position(candidate, radius, self.area_mask) {
                return Some(point);
            }
        }

        None
    }
}
