#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Thin command layer binding one agent to a navigation service.

use skirmish_core::{AgentId, NavigationService, Position};

/// Movement binding of a single agent.
///
/// Every call is a no-op while the navigation service reports the agent as
/// disabled, which is the case once the agent has been retired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovementIntent {
    agent: AgentId,
}

impl MovementIntent {
    /// Binds the intent to the provided agent.
    #[must_use]
    pub const fn bind(agent: AgentId) -> Self {
        Self { agent }
    }

    /// Agent the intent drives.
    #[must_use]
    pub const fn agent(&self) -> AgentId {
        self.agent
    }

    /// Resumes the agent if needed and routes it toward `point`.
    pub fn move_to<N>(&self, nav: &mut N, point: Position)
    where
        N: NavigationService + ?Sized,
    {
        if !nav.is_enabled(self.agent) {
            return;
        }

        if nav.is_stopped(self.agent) {
            nav.resume(self.agent);
        }
        nav.set_destination(self.agent, point);
    }

    /// Halts the agent's current routing.
    pub fn stop<N>(&self, nav: &mut N)
    where
        N: NavigationService + ?Sized,
    {
        if !nav.is_enabled(self.agent) {
            return;
        }

        nav.stop(self.agent);
    }

    /// Reports whether the agent is within `threshold` of its destination.
    ///
    /// Always false while a route is still being computed.
    #[must_use]
    pub fn is_arrived<N>(&self, nav: &N, threshold: f32) -> bool
    where
        N: NavigationService + ?Sized,
    {
        if nav.is_path_pending(self.agent) {
            return false;
        }

        nav.remaining_distance(self.agent) <= threshold
    }
}
