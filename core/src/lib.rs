#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the per-agent systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! to subscribers. Systems read the world through the collaborator traits in
//! [`services`] and respond exclusively with new commands or with calls on the
//! services they were handed.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

mod health;
pub mod services;

pub use health::{HealthEvent, HealthModel};
pub use services::{
    AgentDirectory, AgentPool, NavMeshQuery, NavigationService, SpatialQuery,
};

/// World-space position of an agent. Only distance math is performed on it.
pub type Position = glam::Vec3;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Materializes an agent outside of any population controller.
    SpawnAgent {
        /// Template the agent is created from.
        kind: AgentKind,
        /// Faction the agent fights for.
        faction: Faction,
        /// Physics layer the agent occupies.
        layer: Layer,
        /// Location the agent is warped to.
        position: Position,
        /// Facing around the vertical axis, in degrees.
        heading: f32,
        /// Whether a brain drives the agent.
        control: Control,
    },
    /// Applies damage to an agent's health record.
    DamageAgent {
        /// Agent receiving the damage.
        target: AgentId,
        /// Amount subtracted from the target's hit points.
        amount: f32,
        /// Agent that dealt the damage, if any.
        attacker: Option<AgentId>,
    },
    /// Restores an externally controlled agent to full health.
    ReviveAgent {
        /// Agent to revive.
        agent: AgentId,
    },
    /// Warps an agent to a new position.
    PlaceAgent {
        /// Agent being moved.
        agent: AgentId,
        /// Destination of the warp.
        position: Position,
    },
    /// Deactivates an agent and returns it to the instance pool.
    RetireAgent {
        /// Agent being retired.
        agent: AgentId,
    },
    /// Stops a population controller's pacing loop.
    HaltSpawner {
        /// Controller to halt.
        spawner: SpawnerId,
    },
    /// Restarts a halted population controller from its warm-up phase.
    ResumeSpawner {
        /// Controller to resume.
        spawner: SpawnerId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an agent entered the world.
    AgentSpawned {
        /// Identifier assigned to the agent.
        agent: AgentId,
        /// Template the agent was created from.
        kind: AgentKind,
        /// Faction the agent fights for.
        faction: Faction,
        /// Location the agent was warped to.
        position: Position,
        /// Population controller tracking the agent, if any.
        spawner: Option<SpawnerId>,
    },
    /// Reports that an agent executed an attack against a target.
    AgentAttacked {
        /// Agent that attacked.
        attacker: AgentId,
        /// Agent that was attacked.
        target: AgentId,
        /// Damage carried by the attack.
        damage: f32,
    },
    /// Reports that an agent lost hit points.
    AgentDamaged {
        /// Agent that took damage.
        agent: AgentId,
        /// Amount of damage applied.
        amount: f32,
        /// Hit points left after the damage.
        remaining: f32,
    },
    /// Reports that an agent died. Emitted exactly once per death.
    AgentDied {
        /// Agent that died.
        agent: AgentId,
        /// Agent whose attack was fatal, if any.
        killer: Option<AgentId>,
    },
    /// Reports that an agent was restored to full health.
    AgentRevived {
        /// Agent that was revived.
        agent: AgentId,
    },
    /// Reports a behaviour transition of an agent's brain.
    AgentStateChanged {
        /// Agent whose brain transitioned.
        agent: AgentId,
        /// State before the transition.
        from: FighterState,
        /// State after the transition.
        to: FighterState,
    },
    /// Confirms that an agent left the world and was returned to the pool.
    AgentDespawned {
        /// Agent that was retired.
        agent: AgentId,
        /// Spawn token that was attached to the agent, if any.
        token: Option<SpawnToken>,
    },
    /// Announces that a population controller started pacing.
    SpawnerActivated {
        /// Controller that became active.
        spawner: SpawnerId,
    },
    /// Announces that a population controller stopped pacing.
    SpawnerHalted {
        /// Controller that was halted.
        spawner: SpawnerId,
    },
    /// Reports that a single spawn attempt failed.
    SpawnRejected {
        /// Controller that attempted the spawn.
        spawner: SpawnerId,
        /// Reason the attempt failed.
        reason: SpawnRejection,
    },
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Unique identifier assigned to a population controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnerId(u32);

impl SpawnerId {
    /// Creates a new spawner identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Handle attached to a spawned agent so its removal can be reported back to
/// the controller that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnToken {
    agent: AgentId,
    spawner: SpawnerId,
}

impl SpawnToken {
    /// Attaches the agent to the owning controller.
    #[must_use]
    pub const fn attach(agent: AgentId, spawner: SpawnerId) -> Self {
        Self { agent, spawner }
    }

    /// Agent carrying the token.
    #[must_use]
    pub const fn agent(&self) -> AgentId {
        self.agent
    }

    /// Controller that should be notified when the agent despawns.
    #[must_use]
    pub const fn spawner(&self) -> SpawnerId {
        self.spawner
    }
}

/// Sides an agent can fight for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Allied with the player.
    Friendly,
    /// Hostile to the player and allies.
    Enemy,
    /// Hostile to everyone else.
    Neutral,
}

impl Faction {
    /// Physics layer agents of this faction occupy by default.
    #[must_use]
    pub const fn layer(self) -> Layer {
        match self {
            Self::Friendly => Layer::Friendly,
            Self::Enemy => Layer::Enemy,
            Self::Neutral => Layer::Neutral,
        }
    }
}

/// Physics layers used to filter spatial queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    /// Layer for entities without a dedicated layer.
    Default,
    /// Friendly fighters.
    Friendly,
    /// Enemy fighters.
    Enemy,
    /// Neutral fighters.
    Neutral,
    /// Player-equivalent agents.
    Player,
}

impl Layer {
    const fn bit(self) -> u32 {
        match self {
            Self::Default => 1 << 0,
            Self::Friendly => 1 << 1,
            Self::Enemy => 1 << 2,
            Self::Neutral => 1 << 3,
            Self::Player => 1 << 4,
        }
    }
}

/// Set of physics layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Mask matching every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Creates a mask containing exactly the provided layers.
    #[must_use]
    pub const fn of(layers: &[Layer]) -> Self {
        let mut bits = 0;
        let mut index = 0;
        while index < layers.len() {
            bits |= layers[index].bit();
            index += 1;
        }
        Self(bits)
    }

    /// Layers a fighter of the provided faction considers hostile.
    #[must_use]
    pub const fn hostile_to(faction: Faction) -> Self {
        match faction {
            Faction::Friendly => Self::of(&[Layer::Enemy, Layer::Neutral]),
            Faction::Enemy => Self::of(&[Layer::Friendly, Layer::Player, Layer::Neutral]),
            Faction::Neutral => Self::of(&[Layer::Friendly, Layer::Player, Layer::Enemy]),
        }
    }

    /// Reports whether the mask includes the provided layer.
    #[must_use]
    pub const fn contains(self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }
}

/// Set of navigable areas. Area index `i` maps to bit `1 << i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AreaMask(u32);

impl AreaMask {
    /// Mask matching every area.
    pub const ALL: Self = Self(u32::MAX);

    /// Mask containing the single area with the provided index.
    ///
    /// Indices beyond the mask width produce an empty mask.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        if index < u32::BITS {
            Self(1 << index)
        } else {
            Self(0)
        }
    }

    /// Reports whether the area with the provided index belongs to the mask.
    #[must_use]
    pub const fn contains_index(self, index: u32) -> bool {
        index < u32::BITS && self.0 & (1 << index) != 0
    }

    /// Raw bit representation of the mask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Behaviour states of an autonomous fighter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FighterState {
    /// Wandering between random points near its position.
    Patrol,
    /// Moving toward a perceived target.
    Chase,
    /// Standing within range and striking the target.
    Attack,
    /// Absorbing terminal state.
    Dead,
}

/// Selects what drives an agent's behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    /// A brain perceives, moves and fights on the agent's behalf.
    Autonomous,
    /// The agent is driven from outside the simulation, like a player.
    External,
}

/// Name of a pooled agent template.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentKind(String);

impl AgentKind {
    /// Creates a kind from its template name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Template name of the kind.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed combat and movement parameters of an agent kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FighterStats {
    /// Hit points of a fresh instance.
    pub max_hp: f32,
    /// Radius of the perception sphere.
    pub view_radius: f32,
    /// Maximum distance at which the fighter can strike.
    pub attack_range: f32,
    /// Minimum simulated time between two strikes.
    pub attack_cooldown: Duration,
    /// Damage dealt by a single strike.
    pub damage: f32,
    /// Travel speed in world units per second.
    pub move_speed: f32,
}

impl Default for FighterStats {
    fn default() -> Self {
        Self {
            max_hp: 1_000.0,
            view_radius: 20.0,
            attack_range: 5.0,
            attack_cooldown: Duration::from_secs(1),
            damage: 100.0,
            move_speed: 3.5,
        }
    }
}

/// Parameters handed to an [`AgentPool`] when materializing an agent.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Template to instantiate.
    pub kind: AgentKind,
    /// Faction assigned to the agent.
    pub faction: Faction,
    /// Physics layer assigned to the agent.
    pub layer: Layer,
    /// Location the agent is warped to.
    pub position: Position,
    /// Facing around the vertical axis, in degrees.
    pub heading: f32,
    /// Navigable areas the agent may route through.
    pub area_mask: AreaMask,
    /// Whether a brain drives the agent.
    pub control: Control,
    /// Controller that will track the agent, if any.
    pub spawner: Option<SpawnerId>,
}

/// Reasons a single spawn attempt may fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SpawnRejection {
    /// The controller already tracks as many agents as its capacity allows.
    #[error("population capacity reached")]
    CapacityReached,
    /// No navigable spawn point was found within the allowed attempts.
    #[error("no navigable spawn point found")]
    NoSpawnPoint,
    /// The instance pool could not provide an agent of the requested kind.
    #[error("instance pool could not provide an agent")]
    PoolExhausted,
}

/// Read-only copy of an agent's health ledger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthSnapshot {
    /// Hit points of a fully healed agent.
    pub max_hp: f32,
    /// Hit points currently left.
    pub current_hp: f32,
}

impl HealthSnapshot {
    /// Reports whether the snapshot describes a dead agent.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current_hp <= 0.0
    }
}

/// Minimal description of an agent used by perception and pursuit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Presence {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Faction the agent fights for.
    pub faction: Faction,
    /// Current world position of the agent.
    pub position: Position,
    /// Whether the agent is dead, either by health or by brain state.
    pub dead: bool,
}

/// Immutable representation of a single agent used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Template the agent was created from.
    pub kind: AgentKind,
    /// Faction the agent fights for.
    pub faction: Faction,
    /// Physics layer the agent occupies.
    pub layer: Layer,
    /// Current world position.
    pub position: Position,
    /// Facing around the vertical axis, in degrees.
    pub heading: f32,
    /// Brain state, absent for externally controlled agents.
    pub state: Option<FighterState>,
    /// Target currently perceived by the brain, if any.
    pub target: Option<AgentId>,
    /// Copy of the agent's health ledger.
    pub health: HealthSnapshot,
}

/// Read-only snapshot describing every live agent.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Number of agents captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
