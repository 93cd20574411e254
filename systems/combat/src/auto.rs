//! Automatic attacks of externally controlled fighters.

use std::time::Duration;

use skirmish_core::{AgentDirectory, AgentId, Command, Faction, LayerMask, Presence, SpatialQuery};

use crate::{Combat, Config};

/// Tuning of an automatic attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoAttackConfig {
    /// Radius within which a new target is picked.
    pub range: f32,
    /// Minimum time between two strikes.
    pub cooldown: Duration,
    /// Damage carried by each strike.
    pub damage: f32,
}

impl Default for AutoAttackConfig {
    fn default() -> Self {
        Self {
            range: 10.0,
            cooldown: Duration::from_secs(1),
            damage: 100.0,
        }
    }
}

/// Strikes the nearest non-friendly fighter without being told to.
///
/// A picked target is kept until it dies or leaves the world, even if it walks
/// out of range. The first strike lands as soon as a target is found.
#[derive(Clone, Debug)]
pub struct AutoAttack {
    range: f32,
    combat: Combat,
    target: Option<AgentId>,
    scratch: Vec<AgentId>,
}

impl AutoAttack {
    /// Creates an automatic attack with no target.
    #[must_use]
    pub fn new(config: AutoAttackConfig) -> Self {
        Self {
            range: config.range.max(0.0),
            combat: Combat::primed(Config::new(config.range, config.cooldown, config.damage)),
            target: None,
            scratch: Vec::new(),
        }
    }

    /// Agent currently being attacked.
    #[must_use]
    pub fn target(&self) -> Option<AgentId> {
        self.target
    }

    /// Forgets the target. The cooldown is left untouched.
    pub fn disengage(&mut self) {
        self.target = None;
    }

    /// Accrues cooldown time and strikes the target when ready.
    pub fn tick<W>(&mut self, me: &Presence, world: &W, dt: Duration, out: &mut Vec<Command>)
    where
        W: SpatialQuery + AgentDirectory + ?Sized,
    {
        self.combat.tick(dt);

        let alive = self
            .target
            .and_then(|target| world.presence(target))
            .is_some_and(|target| !target.dead);
        if !alive {
            self.target = self.nearest(me, world);
        }

        if let Some(target) = self.target {
            if self.combat.can_attack() {
                self.combat.attack(me.id, target, out);
            }
        }
    }

    /// Nearest living non-friendly agent strictly inside the range. Ties go to
    /// the lowest identifier.
    fn nearest<W>(&mut self, me: &Presence, world: &W) -> Option<AgentId>
    where
        W: SpatialQuery + AgentDirectory + ?Sized,
    {
        self.scratch.clear();
        world.overlap(me.position, self.range, LayerMask::ALL, &mut self.scratch);

        let range_sq = self.range * self.range;
        let mut best: Option<(f32, AgentId)> = None;
        for &id in &self.scratch {
            if id == me.id {
                continue;
            }
            let Some(other) = world.presence(id) else {
                continue;
            };
            if other.dead || other.faction == Faction::Friendly {
                continue;
            }

            let distance_sq = other.position.distance_squared(me.position);
            if distance_sq >= range_sq {
                continue;
            }
            let closer = best.map_or(true, |(closest, holder)| {
                distance_sq < closest || (distance_sq == closest && id < holder)
            });
            if closer {
                best = Some((distance_sq, id));
            }
        }

        best.map(|(_, id)| id)
    }
}
