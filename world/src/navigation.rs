//! Reference navigation used when the simulation runs without an engine.
//!
//! [`NavMesh`] is a set of named axis-aligned rectangles on the XZ plane, each
//! at a fixed elevation. [`NavAgents`] moves bound agents in straight lines
//! toward their destinations. Neither computes real paths.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use skirmish_core::{AgentId, AreaMask, NavMeshQuery, NavigationService, Position};

/// Named navigable rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct Area {
    name: String,
    min: Vec2,
    max: Vec2,
    elevation: f32,
}

impl Area {
    /// Creates an area spanning the rectangle between two XZ corners.
    ///
    /// The corners may be given in any order.
    #[must_use]
    pub fn new(name: impl Into<String>, corner_a: Vec2, corner_b: Vec2, elevation: f32) -> Self {
        Self {
            name: name.into(),
            min: corner_a.min(corner_b),
            max: corner_a.max(corner_b),
            elevation,
        }
    }

    /// Name the area is looked up by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn closest_point(&self, point: Position) -> Position {
        let flat = Vec2::new(point.x, point.z).clamp(self.min, self.max);
        Position::new(flat.x, self.elevation, flat.y)
    }
}

/// Collection of navigable areas. Area `i` owns mask bit `1 << i`.
#[derive(Clone, Debug, Default)]
pub struct NavMesh {
    areas: Vec<Area>,
}

impl NavMesh {
    /// Creates a mesh without any navigable area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an area and returns the mask selecting it.
    pub fn add_area(&mut self, area: Area) -> AreaMask {
        let index = u32::try_from(self.areas.len()).unwrap_or(u32::MAX);
        self.areas.push(area);
        AreaMask::from_index(index)
    }

    /// Builder-style variant of [`NavMesh::add_area`].
    #[must_use]
    pub fn with_area(mut self, area: Area) -> Self {
        let _ = self.add_area(area);
        self
    }
}

impl NavMeshQuery for NavMesh {
    fn area_mask(&self, name: &str) -> Option<AreaMask> {
        self.areas
            .iter()
            .position(|area| area.name() == name)
            .and_then(|index| u32::try_from(index).ok())
            .map(AreaMask::from_index)
    }

    fn sample_position(
        &self,
        point: Position,
        max_distance: f32,
        mask: AreaMask,
    ) -> Option<Position> {
        let mut best: Option<(f32, Position)> = None;
        for (index, area) in self.areas.iter().enumerate() {
            let included = u32::try_from(index).map_or(false, |index| mask.contains_index(index));
            if !included {
                continue;
            }

            let candidate = area.closest_point(point);
            let distance = candidate.distance(point);
            if distance > max_distance {
                continue;
            }

            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, candidate));
            }
        }

        best.map(|(_, position)| position)
    }
}

#[derive(Clone, Debug)]
struct NavAgent {
    position: Position,
    destination: Option<Position>,
    speed: f32,
    enabled: bool,
    stopped: bool,
    pending: bool,
}

/// Straight-line kinematic movement of every bound agent.
///
/// A new destination leaves the path pending until the next
/// [`NavAgents::advance`], mirroring an engine that resolves routes
/// asynchronously.
#[derive(Clone, Debug, Default)]
pub(crate) struct NavAgents {
    agents: BTreeMap<AgentId, NavAgent>,
}

impl NavAgents {
    pub(crate) fn register(&mut self, agent: AgentId, position: Position, speed: f32) {
        let _ = self.agents.insert(
            agent,
            NavAgent {
                position,
                destination: None,
                speed: speed.max(0.0),
                enabled: true,
                stopped: false,
                pending: false,
            },
        );
    }

    pub(crate) fn remove(&mut self, agent: AgentId) {
        let _ = self.agents.remove(&agent);
    }

    /// Teleports the agent and forgets its route.
    pub(crate) fn warp(&mut self, agent: AgentId, position: Position) {
        if let Some(entry) = self.agents.get_mut(&agent) {
            entry.position = position;
            entry.destination = None;
            entry.pending = false;
        }
    }

    /// Unbinds the agent so that movement commands are ignored.
    pub(crate) fn disable(&mut self, agent: AgentId) {
        if let Some(entry) = self.agents.get_mut(&agent) {
            entry.enabled = false;
            entry.stopped = true;
            entry.destination = None;
            entry.pending = false;
        }
    }

    pub(crate) fn position(&self, agent: AgentId) -> Option<Position> {
        self.agents.get(&agent).map(|entry| entry.position)
    }

    /// Resolves pending paths and moves every routed agent.
    pub(crate) fn advance(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        for entry in self.agents.values_mut() {
            if !entry.enabled {
                continue;
            }

            entry.pending = false;
            if entry.stopped {
                continue;
            }

            let Some(destination) = entry.destination else {
                continue;
            };

            let offset = destination - entry.position;
            let distance = offset.length();
            let step = entry.speed * seconds;
            entry.position = if distance <= step {
                destination
            } else {
                entry.position + offset / distance * step
            };
        }
    }

    pub(crate) fn positions(&self) -> impl Iterator<Item = (AgentId, Position)> + '_ {
        self.agents.iter().map(|(id, entry)| (*id, entry.position))
    }
}

impl NavigationService for NavAgents {
    fn set_destination(&mut self, agent: AgentId, point: Position) {
        let Some(entry) = self.agents.get_mut(&agent) else {
            return;
        };
        if !entry.enabled {
            return;
        }

        if entry.destination != Some(point) {
            entry.destination = Some(point);
            entry.pending = true;
        }
    }

    fn stop(&mut self, agent: AgentId) {
        if let Some(entry) = self.agents.get_mut(&agent) {
            entry.stopped = true;
        }
    }

    fn resume(&mut self, agent: AgentId) {
        if let Some(entry) = self.agents.get_mut(&agent) {
            if entry.enabled {
                entry.stopped = false;
            }
        }
    }

    fn is_enabled(&self, agent: AgentId) -> bool {
        self.agents.get(&agent).map_or(false, |entry| entry.enabled)
    }

    fn is_stopped(&self, agent: AgentId) -> bool {
        self.agents.get(&agent).map_or(true, |entry| entry.stopped)
    }

    fn is_path_pending(&self, agent: AgentId) -> bool {
        self.agents.get(&agent).map_or(false, |entry| entry.pending)
    }

    fn remaining_distance(&self, agent: AgentId) -> f32 {
        self.agents.get(&agent).map_or(0.0, |entry| {
            entry
                .destination
                .map_or(0.0, |destination| entry.position.distance(destination))
        })
    }
}
