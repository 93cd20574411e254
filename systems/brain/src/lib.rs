#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Behaviour state machine driving an autonomous fighter.
//!
//! A [`Brain`] owns the fighter's perception, combat module and movement
//! binding. Every tick it refreshes perception, accrues combat cooldown and
//! then runs the update of its current [`FighterState`]. Damage is never
//! applied directly: attacks are queued as [`Command::DamageAgent`] values for
//! the world to resolve.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, UnitBall};
use skirmish_core::{
    AgentDirectory, AgentId, Command, FighterState, FighterStats, NavigationService, Position,
    Presence, SpatialQuery,
};
use skirmish_system_combat::{self as combat, Combat};
use skirmish_system_movement::MovementIntent;
use skirmish_system_perception::Perception;

const SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Tuning applied to every brain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Radius of the ball patrol points are drawn from.
    pub patrol_radius: f32,
    /// Remaining distance at which a patrol point counts as reached.
    pub arrive_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            patrol_radius: 6.0,
            arrive_threshold: 0.1,
        }
    }
}

/// Finite state machine coordinating perception, movement and combat.
#[derive(Clone, Debug)]
pub struct Brain {
    state: FighterState,
    perception: Perception,
    movement: MovementIntent,
    combat: Combat,
    patrol_point: Position,
    config: Config,
    rng: ChaCha8Rng,
}

impl Brain {
    /// Creates a patrolling brain for `agent` standing at `origin`.
    ///
    /// The brain's random stream is derived from `seed` and the agent id, so
    /// two brains built from the same inputs choose identical patrol points.
    #[must_use]
    pub fn new(
        agent: AgentId,
        stats: &FighterStats,
        config: Config,
        origin: Position,
        seed: u64,
    ) -> Self {
        let mixed = seed ^ u64::from(agent.get()).wrapping_add(1).wrapping_mul(SEED_MIX);
        let mut brain = Self {
            state: FighterState::Patrol,
            perception: Perception::new(stats.view_radius),
            movement: MovementIntent::bind(agent),
            combat: Combat::new(combat::Config::from(stats)),
            patrol_point: origin,
            config,
            rng: ChaCha8Rng::seed_from_u64(mixed),
        };
        brain.patrol_point = brain.next_patrol_point(origin);
        brain
    }

    /// Current behaviour state.
    #[must_use]
    pub fn state(&self) -> FighterState {
        self.state
    }

    /// Target selected by the most recent perception refresh.
    #[must_use]
    pub fn current_target(&self) -> Option<AgentId> {
        self.perception.current_target()
    }

    /// Point the brain walks toward while patrolling.
    #[must_use]
    pub fn patrol_point(&self) -> Position {
        self.patrol_point
    }

    /// Advances the brain by one simulation tick.
    ///
    /// `me` must describe the agent this brain drives. Attacks are appended to
    /// `out`. Dead brains do nothing.
    pub fn tick<W, N>(
        &mut self,
        me: &Presence,
        world: &W,
        nav: &mut N,
        delta: Duration,
        out: &mut Vec<Command>,
    ) where
        W: SpatialQuery + AgentDirectory + ?Sized,
        N: NavigationService + ?Sized,
    {
        if self.state == FighterState::Dead {
            return;
        }

        self.perception.tick(me, world);
        self.combat.tick(delta);

        match self.state {
            FighterState::Patrol => self.patrol(me, nav),
            FighterState::Chase => self.chase(me, world, nav),
            FighterState::Attack => self.attack(me, world, out),
            FighterState::Dead => {}
        }
    }

    /// Forces the brain into its terminal state.
    ///
    /// Movement is halted and the target forgotten. Calling this on a brain
    /// that is already dead has no further effect.
    pub fn handle_death<N>(&mut self, nav: &mut N)
    where
        N: NavigationService + ?Sized,
    {
        if self.state == FighterState::Dead {
            return;
        }

        self.state = FighterState::Dead;
        self.movement.stop(nav);
        self.perception.clear();
    }

    fn patrol<N>(&mut self, me: &Presence, nav: &mut N)
    where
        N: NavigationService + ?Sized,
    {
        if self.perception.current_target().is_some() {
            self.state = FighterState::Chase;
            return;
        }

        self.movement.move_to(nav, self.patrol_point);
        if self.movement.is_arrived(nav, self.config.arrive_threshold) {
            self.patrol_point = self.next_patrol_point(me.position);
        }
    }

    fn chase<W, N>(&mut self, me: &Presence, world: &W, nav: &mut N)
    where
        W: AgentDirectory + ?Sized,
        N: NavigationService + ?Sized,
    {
        let Some(target) = self.target_presence(world) else {
            self.state = FighterState::Patrol;
            return;
        };

        if me.position.distance(target.position) <= self.combat.attack_range() {
            self.movement.stop(nav);
            self.state = FighterState::Attack;
            return;
        }

        self.movement.move_to(nav, target.position);
    }

    fn attack<W>(&mut self, me: &Presence, world: &W, out: &mut Vec<Command>)
    where
        W: AgentDirectory + ?Sized,
    {
        let Some(target) = self.target_presence(world) else {
            self.state = FighterState::Patrol;
            return;
        };

        if me.position.distance(target.position) > self.combat.attack_range() {
            self.state = FighterState::Chase;
            return;
        }

        if self.combat.can_attack() {
            self.combat.attack(me.id, target.id, out);
        }
    }

    fn target_presence<W>(&self, world: &W) -> Option<Presence>
    where
        W: AgentDirectory + ?Sized,
    {
        self.perception
            .current_target()
            .and_then(|target| world.presence(target))
    }

    fn next_patrol_point(&mut self, around: Position) -> Position {
        let [x, _, z]: [f32; 3] = UnitBall.sample(&mut self.rng);
        Position::new(
            around.x + x * self.config.patrol_radius,
            around.y,
            around.z + z * self.config.patrol_radius,
        )
    }
}
