//! Registry of live agents and the pool of retired instances.

use std::{collections::BTreeMap, time::Duration};

use skirmish_core::{
    AgentDirectory, AgentId, AgentKind, AreaMask, Control, Faction, FighterStats, HealthModel,
    Layer, LayerMask, Position, Presence, SpatialQuery, SpawnToken,
};

/// Reusable part of an agent that survives retirement.
#[derive(Clone, Debug)]
pub(crate) struct Body {
    pub(crate) kind: AgentKind,
    pub(crate) stats: FighterStats,
    pub(crate) health: HealthModel,
}

/// Live agent record.
#[derive(Clone, Debug)]
pub(crate) struct Agent {
    pub(crate) id: AgentId,
    pub(crate) body: Body,
    pub(crate) faction: Faction,
    pub(crate) layer: Layer,
    pub(crate) position: Position,
    /// Where the agent entered the world. Revived agents return here.
    pub(crate) home: Position,
    pub(crate) heading: f32,
    pub(crate) area_mask: AreaMask,
    pub(crate) control: Control,
    pub(crate) token: Option<SpawnToken>,
    pub(crate) corpse: Option<Corpse>,
}

/// Countdown of a dead autonomous agent awaiting retirement.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Corpse {
    pub(crate) died_on: u64,
    pub(crate) remaining: Duration,
}

impl Agent {
    pub(crate) fn presence(&self) -> Presence {
        Presence {
            id: self.id,
            faction: self.faction,
            position: self.position,
            dead: self.body.health.is_dead(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Roster {
    agents: BTreeMap<AgentId, Agent>,
    shelved: BTreeMap<AgentKind, Vec<Body>>,
    next_id: u32,
}

impl Roster {
    pub(crate) fn allocate_id(&mut self) -> AgentId {
        let id = AgentId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub(crate) fn insert(&mut self, agent: Agent) {
        let _ = self.agents.insert(agent.id, agent);
    }

    pub(crate) fn remove(&mut self, agent: AgentId) -> Option<Agent> {
        self.agents.remove(&agent)
    }

    pub(crate) fn get(&self, agent: AgentId) -> Option<&Agent> {
        self.agents.get(&agent)
    }

    pub(crate) fn get_mut(&mut self, agent: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&agent)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    /// Takes a retired body of the requested kind, if one is shelved.
    pub(crate) fn reuse(&mut self, kind: &AgentKind) -> Option<Body> {
        self.shelved.get_mut(kind).and_then(Vec::pop)
    }

    pub(crate) fn shelve(&mut self, body: Body) {
        self.shelved.entry(body.kind.clone()).or_default().push(body);
    }

    pub(crate) fn shelved(&self, kind: &AgentKind) -> usize {
        self.shelved.get(kind).map_or(0, Vec::len)
    }
}

impl SpatialQuery for Roster {
    fn overlap(&self, center: Position, radius: f32, mask: LayerMask, out: &mut Vec<AgentId>) {
        let radius_sq = radius * radius;
        out.extend(
            self.agents
                .values()
                .filter(|agent| mask.contains(agent.layer))
                .filter(|agent| agent.position.distance_squared(center) <= radius_sq)
                .map(|agent| agent.id),
        );
    }
}

impl AgentDirectory for Roster {
    fn presence(&self, agent: AgentId) -> Option<Presence> {
        self.agents.get(&agent).map(Agent::presence)
    }
}
