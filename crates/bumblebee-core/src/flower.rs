//! Flower patches: the only nectar source on the grid.

use crate::{GridPos, InvariantViolation};

/// Nectar source occupying one cell for a single day.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowerPatch {
    pub position: GridPos,
    max_nectar: f64,
    nectar: f64,
    replenish_per_tick: f64,
}

impl FlowerPatch {
    /// Full patch that regrows its whole capacity over one day of `daily_steps` ticks.
    #[must_use]
    pub fn new(position: GridPos, nectar: f64, daily_steps: u32) -> Self {
        let nectar = nectar.max(0.0);
        Self {
            position,
            max_nectar: nectar,
            nectar,
            replenish_per_tick: nectar / f64::from(daily_steps.max(1)),
        }
    }

    #[must_use]
    pub fn nectar(&self) -> f64 {
        self.nectar
    }

    #[must_use]
    pub fn max_nectar(&self) -> f64 {
        self.max_nectar
    }

    #[must_use]
    pub fn replenish_per_tick(&self) -> f64 {
        self.replenish_per_tick
    }

    /// Adequate patches hold strictly more nectar than `threshold`.
    #[must_use]
    pub fn is_adequate(&self, threshold: f64) -> bool {
        self.nectar > threshold
    }

    /// Remove `amount` units; taking more than the patch holds is a contract breach.
    pub fn withdraw(&mut self, amount: f64) -> Result<(), InvariantViolation> {
        let remaining = self.nectar - amount;
        if amount < 0.0 || remaining < 0.0 {
            return Err(InvariantViolation::NegativeNectar {
                what: "flower patch",
                value: remaining,
            });
        }
        self.nectar = remaining;
        Ok(())
    }

    /// Per-tick regrowth, capped at capacity.
    pub fn replenish(&mut self) {
        self.nectar = (self.nectar + self.replenish_per_tick).min(self.max_nectar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdraw_and_replenish_stay_in_bounds() {
        let mut patch = FlowerPatch::new(GridPos::new(1, 1), 100.0, 10);
        assert_eq!(patch.replenish_per_tick(), 10.0);
        patch.withdraw(35.0).expect("withdraw");
        assert_eq!(patch.nectar(), 65.0);
        patch.replenish();
        assert_eq!(patch.nectar(), 75.0);
        for _ in 0..5 {
            patch.replenish();
        }
        assert_eq!(patch.nectar(), patch.max_nectar());
    }

    #[test]
    fn overdraw_is_rejected() {
        let mut patch = FlowerPatch::new(GridPos::new(0, 0), 5.0, 1);
        let err = patch.withdraw(6.0).expect_err("overdraw");
        assert!(matches!(err, InvariantViolation::NegativeNectar { .. }));
        assert_eq!(patch.nectar(), 5.0);
        patch.withdraw(5.0).expect("drain");
        assert!(!patch.is_adequate(0.0));
    }

    #[test]
    fn negative_budget_becomes_empty_patch() {
        let patch = FlowerPatch::new(GridPos::new(0, 0), -3.0, 4);
        assert_eq!(patch.nectar(), 0.0);
        assert_eq!(patch.replenish_per_tick(), 0.0);
    }
}
