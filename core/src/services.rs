//! Collaborator contracts consumed by the per-agent systems.
//!
//! The simulation never talks to a navigation or physics engine directly.
//! Each system receives the services it needs as arguments, so adapters can
//! substitute a real engine, the world's reference implementations, or test
//! doubles.

use crate::{AgentId, AreaMask, Event, LayerMask, Position, Presence, SpawnRequest, SpawnToken};

/// Per-agent routing commands and status queries.
pub trait NavigationService {
    /// Routes the agent toward `point`.
    fn set_destination(&mut self, agent: AgentId, point: Position);

    /// Halts the agent's current routing without forgetting its destination.
    fn stop(&mut self, agent: AgentId);

    /// Lets a stopped agent continue along its route.
    fn resume(&mut self, agent: AgentId);

    /// Reports whether the agent is bound to the navigation service.
    fn is_enabled(&self, agent: AgentId) -> bool;

    /// Reports whether the agent's routing is currently halted.
    fn is_stopped(&self, agent: AgentId) -> bool;

    /// Reports whether a route is still being computed for the agent.
    fn is_path_pending(&self, agent: AgentId) -> bool;

    /// Distance left along the agent's current route.
    fn remaining_distance(&self, agent: AgentId) -> f32;
}

/// Static queries against the navigable regions of the map.
pub trait NavMeshQuery {
    /// Looks up the mask of a named area.
    fn area_mask(&self, name: &str) -> Option<AreaMask>;

    /// Finds the navigable point closest to `point` within `max_distance`,
    /// restricted to areas in `mask`.
    fn sample_position(&self, point: Position, max_distance: f32, mask: AreaMask)
        -> Option<Position>;
}

/// Overlap queries against agent bodies.
pub trait SpatialQuery {
    /// Appends every agent on a layer in `mask` whose position lies within
    /// `radius` of `center`.
    fn overlap(&self, center: Position, radius: f32, mask: LayerMask, out: &mut Vec<AgentId>);
}

/// Lookup of live agent state by identifier.
pub trait AgentDirectory {
    /// Returns the agent's presence, or `None` when the agent no longer exists.
    fn presence(&self, agent: AgentId) -> Option<Presence>;
}

/// Provisioning and recycling of agent instances.
pub trait AgentPool {
    /// Materializes an agent, reusing a retired instance of the same kind when
    /// one is available. Returns `None` when no instance can be provided.
    ///
    /// Events announcing the new agent are appended to `out`.
    fn spawn(&mut self, request: SpawnRequest, out: &mut Vec<Event>) -> Option<AgentId>;

    /// Deactivates the agent and returns its instance to the pool, yielding the
    /// spawn token it carried.
    fn retire(&mut self, agent: AgentId, out: &mut Vec<Event>) -> Option<SpawnToken>;
}
