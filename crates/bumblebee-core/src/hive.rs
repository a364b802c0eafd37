//! Hives: nectar stock plus exclusive membership of their bees.

use crate::{BeeId, GridPos, HiveId, InvariantViolation};
use std::collections::BTreeSet;

/// A colony's home cell. Hives live for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct Hive {
    pub id: HiveId,
    pub position: GridPos,
    nectar: f64,
    members: BTreeSet<BeeId>,
    fertilized_queens: u64,
}

impl Hive {
    #[must_use]
    pub fn new(id: HiveId, position: GridPos) -> Self {
        Self {
            id,
            position,
            nectar: 0.0,
            members: BTreeSet::new(),
            fertilized_queens: 0,
        }
    }

    /// Current nectar stock, never negative.
    #[must_use]
    pub fn nectar(&self) -> f64 {
        self.nectar
    }

    /// Live member ids in a stable order.
    pub fn members(&self) -> impl Iterator<Item = BeeId> + '_ {
        self.members.iter().copied()
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn contains(&self, bee: BeeId) -> bool {
        self.members.contains(&bee)
    }

    /// Queens of this hive fertilized so far in the run.
    #[must_use]
    pub fn fertilized_queens(&self) -> u64 {
        self.fertilized_queens
    }

    pub(crate) fn add_member(&mut self, bee: BeeId) {
        self.members.insert(bee);
    }

    /// Detach `bee`; a bee that is not a member is a contract breach.
    pub(crate) fn remove_member(&mut self, bee: BeeId) -> Result<(), InvariantViolation> {
        if self.members.remove(&bee) {
            Ok(())
        } else {
            Err(InvariantViolation::NotAMember { bee, hive: self.id })
        }
    }

    pub(crate) fn deposit(&mut self, amount: f64) -> Result<(), InvariantViolation> {
        if amount < 0.0 {
            return Err(InvariantViolation::NegativeNectar {
                what: "deposit",
                value: amount,
            });
        }
        self.nectar += amount;
        Ok(())
    }

    pub(crate) fn withdraw(&mut self, amount: f64) -> Result<(), InvariantViolation> {
        let remaining = self.nectar - amount;
        if amount < 0.0 || remaining < 0.0 {
            return Err(InvariantViolation::NegativeNectar {
                what: "hive",
                value: remaining,
            });
        }
        self.nectar = remaining;
        Ok(())
    }

    /// Take up to `amount`, stopping at an empty stock.
    pub(crate) fn withdraw_saturating(&mut self, amount: f64) -> f64 {
        let taken = amount.clamp(0.0, self.nectar);
        self.nectar -= taken;
        taken
    }

    pub(crate) fn record_fertilized_queen(&mut self) {
        self.fertilized_queens += 1;
    }

    /// Overwrite the stock; used to seed scenarios.
    pub fn set_nectar(&mut self, nectar: f64) -> Result<(), InvariantViolation> {
        if nectar.is_nan() || nectar < 0.0 {
            return Err(InvariantViolation::NegativeNectar {
                what: "hive",
                value: nectar,
            });
        }
        self.nectar = nectar;
        Ok(())
    }
}
