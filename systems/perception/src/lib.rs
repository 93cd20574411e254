#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick nearest-hostile target resolution.

use skirmish_core::{AgentDirectory, AgentId, LayerMask, Presence, SpatialQuery};

/// Perception state of a single fighter.
///
/// The current target is a weak handle: it names an agent but never keeps it
/// alive, and it is recomputed from scratch on every [`Perception::tick`].
#[derive(Clone, Debug)]
pub struct Perception {
    view_radius: f32,
    current_target: Option<AgentId>,
    scratch: Vec<AgentId>,
}

impl Perception {
    /// Creates a perception sphere with the provided radius and no target.
    #[must_use]
    pub fn new(view_radius: f32) -> Self {
        Self {
            view_radius: view_radius.max(0.0),
            current_target: None,
            scratch: Vec::new(),
        }
    }

    /// Target selected by the most recent tick.
    #[must_use]
    pub fn current_target(&self) -> Option<AgentId> {
        self.current_target
    }

    /// Forgets the current target.
    pub fn clear(&mut self) {
        self.current_target = None;
    }

    /// Replaces the current target with the nearest living hostile around `me`.
    ///
    /// Candidates come from an overlap query filtered by the faction's hostile
    /// layers. Self, same-faction agents, unknown agents and dead agents are
    /// skipped. The smallest squared distance wins and exact ties go to the
    /// lowest identifier, so the outcome does not depend on the order in which
    /// the query reports candidates.
    pub fn tick<W>(&mut self, me: &Presence, world: &W)
    where
        W: SpatialQuery + AgentDirectory + ?Sized,
    {
        self.scratch.clear();
        world.overlap(
            me.position,
            self.view_radius,
            LayerMask::hostile_to(me.faction),
            &mut self.scratch,
        );

        let mut best: Option<Candidate> = None;
        for &id in &self.scratch {
            if id == me.id {
                continue;
            }

            let Some(other) = world.presence(id) else {
                continue;
            };

            if other.faction == me.faction || other.dead {
                continue;
            }

            let current = Candidate {
                id,
                distance_sq: other.position.distance_squared(me.position),
            };

            match &mut best {
                Some(existing) => {
                    if current.precedes(existing) {
                        *existing = current;
                    }
                }
                None => best = Some(current),
            }
        }

        self.current_target = best.map(|candidate| candidate.id);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    id: AgentId,
    distance_sq: f32,
}

impl Candidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }

        self.id < other.id
    }
}
