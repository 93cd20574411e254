#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooldown-gated melee resolution.

mod auto;

use std::time::Duration;

use skirmish_core::{AgentId, Command, FighterStats};

pub use auto::{AutoAttack, AutoAttackConfig};

/// Static combat parameters of a fighter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    attack_range: f32,
    cooldown: Duration,
    damage: f32,
}

impl Config {
    /// Creates a configuration from explicit range, cooldown and damage.
    #[must_use]
    pub const fn new(attack_range: f32, cooldown: Duration, damage: f32) -> Self {
        Self {
            attack_range,
            cooldown,
            damage,
        }
    }
}

impl From<&FighterStats> for Config {
    fn from(stats: &FighterStats) -> Self {
        Self::new(stats.attack_range, stats.attack_cooldown, stats.damage)
    }
}

/// Melee module that accrues cooldown time and issues damage commands.
#[derive(Clone, Debug)]
pub struct Combat {
    attack_range: f32,
    cooldown: Duration,
    damage: f32,
    timer: Duration,
}

impl Combat {
    /// Creates a combat module whose timer starts at zero.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            attack_range: config.attack_range,
            cooldown: config.cooldown,
            damage: config.damage,
            timer: Duration::ZERO,
        }
    }

    /// Creates a combat module that may strike on its first tick.
    #[must_use]
    pub fn primed(config: Config) -> Self {
        Self {
            timer: config.cooldown,
            ..Self::new(config)
        }
    }

    /// Maximum distance at which attacks connect.
    #[must_use]
    pub fn attack_range(&self) -> f32 {
        self.attack_range
    }

    /// Damage carried by each attack.
    #[must_use]
    pub fn damage(&self) -> f32 {
        self.damage
    }

    /// Time accumulated since the last attack.
    #[must_use]
    pub fn timer(&self) -> Duration {
        self.timer
    }

    /// Accrues simulated time toward the next attack.
    pub fn tick(&mut self, delta: Duration) {
        self.timer = self.timer.saturating_add(delta);
    }

    /// Reports whether the cooldown has elapsed.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.timer >= self.cooldown
    }

    /// Restarts the cooldown and queues damage against `target`.
    ///
    /// The damage command is queued even if the target has already died; the
    /// target's health ledger ignores it.
    pub fn attack(&mut self, attacker: AgentId, target: AgentId, out: &mut Vec<Command>) {
        self.timer = Duration::ZERO;
        out.push(Command::DamageAgent {
            target,
            amount: self.damage,
            attacker: Some(attacker),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combat() -> Combat {
        Combat::new(Config::new(5.0, Duration::from_secs(1), 100.0))
    }

    #[test]
    fn cooldown_must_fully_elapse() {
        let mut combat = combat();
        assert!(!combat.can_attack());

        combat.tick(Duration::from_millis(999));
        assert!(!combat.can_attack());

        combat.tick(Duration::from_millis(1));
        assert!(combat.can_attack());
    }

    #[test]
    fn one_strike_after_cumulative_cooldown() {
        let mut combat = combat();
        let (attacker, target) = (AgentId::new(1), AgentId::new(2));
        let mut out = Vec::new();
        let mut strikes = Vec::new();

        for delta in [Duration::from_millis(400), Duration::from_millis(700)] {
            combat.tick(delta);
            if combat.can_attack() {
                combat.attack(attacker, target, &mut out);
                strikes.push(delta);
            }
        }

        assert_eq!(strikes, vec![Duration::from_millis(700)]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn attacking_resets_the_timer_and_queues_damage() {
        let mut combat = combat();
        combat.tick(Duration::from_millis(1_500));
        let mut out = Vec::new();

        combat.attack(AgentId::new(1), AgentId::new(2), &mut out);

        assert_eq!(combat.timer(), Duration::ZERO);
        assert!(!combat.can_attack());
        assert_eq!(
            out,
            vec![Command::DamageAgent {
                target: AgentId::new(2),
                amount: 100.0,
                attacker: Some(AgentId::new(1)),
            }]
        );
    }

    #[test]
    fn primed_modules_strike_immediately() {
        let mut combat = Combat::primed(Config::new(5.0, Duration::from_secs(1), 100.0));
        assert!(combat.can_attack());

        combat.attack(AgentId::new(1), AgentId::new(2), &mut Vec::new());
        assert!(!combat.can_attack());
    }

    #[test]
    fn timer_keeps_accruing_while_idle() {
        let mut combat = combat();
        for _ in 0..10 {
            combat.tick(Duration::from_millis(400));
        }
        assert_eq!(combat.timer(), Duration::from_secs(4));
        assert!(combat.can_attack());
    }

    #[test]
    fn stats_translate_into_configuration() {
        let combat = Combat::new(Config::from(&FighterStats::default()));
        assert_eq!(combat.attack_range(), 5.0);
        assert_eq!(combat.damage(), 100.0);
    }
}
