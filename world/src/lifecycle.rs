//! Materialization and retirement of agents.

use std::collections::BTreeMap;

use skirmish_core::{
    AgentId, AgentKind, AgentPool, Control, Event, FighterStats, HealthModel, SpawnRequest,
    SpawnToken,
};
use skirmish_system_brain::Brain;
use skirmish_system_combat::AutoAttack;

use crate::{
    navigation::NavAgents,
    roster::{Agent, Body, Roster},
    Config,
};

/// Borrowed view of the world parts an [`AgentPool`] needs.
pub(crate) struct Lifecycle<'w> {
    pub(crate) roster: &'w mut Roster,
    pub(crate) brains: &'w mut BTreeMap<AgentId, Brain>,
    pub(crate) auto_attacks: &'w mut BTreeMap<AgentId, AutoAttack>,
    pub(crate) nav: &'w mut NavAgents,
    pub(crate) catalog: &'w BTreeMap<AgentKind, FighterStats>,
    pub(crate) config: &'w Config,
}

impl Lifecycle<'_> {
    fn body_for(&mut self, kind: &AgentKind) -> Option<Body> {
        if let Some(mut body) = self.roster.reuse(kind) {
            body.health.reset_health();
            return Some(body);
        }

        let stats = *self.catalog.get(kind)?;
        Some(Body {
            kind: kind.clone(),
            stats,
            health: HealthModel::new(stats.max_hp),
        })
    }
}

impl AgentPool for Lifecycle<'_> {
    fn spawn(&mut self, request: SpawnRequest, out: &mut Vec<Event>) -> Option<AgentId> {
        let Some(body) = self.body_for(&request.kind) else {
            tracing::debug!(kind = %request.kind, "no template registered for kind");
            return None;
        };

        let id = self.roster.allocate_id();
        self.nav.register(id, request.position, body.stats.move_speed);
        if request.control == Control::Autonomous {
            let brain = Brain::new(
                id,
                &body.stats,
                self.config.brain,
                request.position,
                self.config.seed,
            );
            let _ = self.brains.insert(id, brain);
        } else if let Some(config) = self.config.auto_attack {
            let _ = self.auto_attacks.insert(id, AutoAttack::new(config));
        }

        out.push(Event::AgentSpawned {
            agent: id,
            kind: request.kind.clone(),
            faction: request.faction,
            position: request.position,
            spawner: request.spawner,
        });
        tracing::debug!(agent = %id, kind = %request.kind, "agent entered the world");

        self.roster.insert(Agent {
            id,
            body,
            faction: request.faction,
            layer: request.layer,
            position: request.position,
            home: request.position,
            heading: request.heading,
            area_mask: request.area_mask,
            control: request.control,
            token: request.spawner.map(|spawner| SpawnToken::attach(id, spawner)),
            corpse: None,
        });
        Some(id)
    }

    fn retire(&mut self, agent: AgentId, out: &mut Vec<Event>) -> Option<SpawnToken> {
        let record = self.roster.remove(agent)?;
        self.nav.remove(agent);
        let _ = self.brains.remove(&agent);
        let _ = self.auto_attacks.remove(&agent);
        self.roster.shelve(record.body);

        out.push(Event::AgentDespawned {
            agent,
            token: record.token,
        });
        tracing::debug!(%agent, "agent returned to pool");
        record.token
    }
}
