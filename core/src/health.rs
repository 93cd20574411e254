//! Hit point ledger shared by every agent.

use crate::HealthSnapshot;

/// Notifications produced while mutating a [`HealthModel`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HealthEvent {
    /// Hit points were subtracted.
    Damaged(f32),
    /// Hit points reached zero. Produced at most once between resets.
    Dead,
}

/// Mutable hit point ledger.
///
/// `current_hp` always lies within `0.0..=max_hp`. Once the ledger reports
/// death it stays at zero and ignores further damage until
/// [`HealthModel::reset_health`] is called.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthModel {
    max_hp: f32,
    current_hp: f32,
}

impl HealthModel {
    /// Creates a full ledger with the provided maximum.
    ///
    /// Negative or NaN maxima are clamped to zero, which yields a ledger that
    /// is dead from the start.
    #[must_use]
    pub fn new(max_hp: f32) -> Self {
        let max_hp = max_hp.max(0.0);
        Self {
            max_hp,
            current_hp: max_hp,
        }
    }

    /// Hit points of a fully healed ledger.
    #[must_use]
    pub fn max_hp(&self) -> f32 {
        self.max_hp
    }

    /// Hit points currently left.
    #[must_use]
    pub fn current_hp(&self) -> f32 {
        self.current_hp
    }

    /// Reports whether the ledger reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current_hp <= 0.0
    }

    /// Subtracts `amount` and records the resulting notifications in `out`.
    ///
    /// Dead ledgers ignore the call entirely. A living ledger always reports
    /// [`HealthEvent::Damaged`], followed by [`HealthEvent::Dead`] when this
    /// call is the one that brought it to zero.
    pub fn take_damage(&mut self, amount: f32, out: &mut Vec<HealthEvent>) {
        if self.is_dead() {
            return;
        }

        let amount = amount.max(0.0);
        self.current_hp -= amount;
        out.push(HealthEvent::Damaged(amount));

        if self.current_hp <= 0.0 {
            self.current_hp = 0.0;
            out.push(HealthEvent::Dead);
        }
    }

    /// Restores the ledger to its maximum and clears death.
    pub fn reset_health(&mut self) {
        self.current_hp = self.max_hp;
    }

    /// Captures a read-only copy of the ledger.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            max_hp: self.max_hp,
            current_hp: self.current_hp,
        }
    }
}
