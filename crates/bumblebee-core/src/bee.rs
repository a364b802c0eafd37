//! Bee entity: shared state plus a caste-specific [`Role`] payload.

use crate::{BeeId, Caste, GridPos, HiveId, config::CasteTable};
use std::collections::HashSet;

/// Whether an encountered bee belongs to the same hive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HiveRelation {
    OwnHive,
    OtherHive,
}

/// Bees met from one caste, split by hive relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncounterSets {
    pub own_hive: HashSet<BeeId>,
    pub other_hive: HashSet<BeeId>,
}

impl EncounterSets {
    fn set_mut(&mut self, relation: HiveRelation) -> &mut HashSet<BeeId> {
        match relation {
            HiveRelation::OwnHive => &mut self.own_hive,
            HiveRelation::OtherHive => &mut self.other_hive,
        }
    }
}

/// Lifetime encounter record of one bee, keyed by the other bee's caste.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encounters {
    by_caste: [EncounterSets; 3],
}

/// Cardinalities of an [`Encounters`] record, indexed by [`Caste::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncounterCounts {
    pub own: [usize; 3],
    pub other: [usize; 3],
}

impl EncounterCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.own.iter().sum::<usize>() + self.other.iter().sum::<usize>()
    }
}

impl Encounters {
    /// Record `other`; returns `true` if it was not already known.
    pub fn record(&mut self, caste: Caste, relation: HiveRelation, other: BeeId) -> bool {
        self.by_caste[caste.index()].set_mut(relation).insert(other)
    }

    #[must_use]
    pub fn of(&self, caste: Caste) -> &EncounterSets {
        &self.by_caste[caste.index()]
    }

    /// Whether `other` was recorded under `caste` for `relation`.
    #[must_use]
    pub fn contains(&self, caste: Caste, relation: HiveRelation, other: BeeId) -> bool {
        let sets = self.of(caste);
        match relation {
            HiveRelation::OwnHive => sets.own_hive.contains(&other),
            HiveRelation::OtherHive => sets.other_hive.contains(&other),
        }
    }

    #[must_use]
    pub fn counts(&self) -> EncounterCounts {
        let mut counts = EncounterCounts::default();
        for caste in Caste::ALL {
            let sets = self.of(caste);
            counts.own[caste.index()] = sets.own_hive.len();
            counts.other[caste.index()] = sets.other_hive.len();
        }
        counts
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts().total()
    }
}

/// Worker payload: nectar carried back to the hive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerState {
    pub max_nectar_carry: f64,
    pub stored_nectar: f64,
}

impl WorkerState {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.stored_nectar >= self.max_nectar_carry
    }

    #[must_use]
    pub fn free_capacity(&self) -> f64 {
        (self.max_nectar_carry - self.stored_nectar).max(0.0)
    }
}

/// Queen payload. Fertilization is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueenState {
    pub fertilized: bool,
}

/// Caste-specific state of a bee.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    Worker(WorkerState),
    Drone,
    Queen(QueenState),
}

impl Role {
    #[must_use]
    pub const fn caste(&self) -> Caste {
        match self {
            Role::Worker(_) => Caste::Worker,
            Role::Drone => Caste::Drone,
            Role::Queen(_) => Caste::Queen,
        }
    }
}

/// A live bee. Owned by the world's arena; its hive only stores the id.
#[derive(Debug, Clone, PartialEq)]
pub struct Bee {
    pub hive: HiveId,
    pub position: GridPos,
    /// Nectar-backed survival stock in `[0, nectar_needed]`.
    pub health: f64,
    pub nectar_needed: f64,
    /// Minimum patch nectar this bee considers worth collecting.
    pub nectar_threshold: f64,
    /// Set when the current tick was spent extracting nectar.
    pub is_collecting: bool,
    pub last_resource: Option<GridPos>,
    pub encounters: Encounters,
    pub role: Role,
}

impl Bee {
    /// Fresh bee of `caste` with empty health and no memories.
    #[must_use]
    pub fn new(
        caste: Caste,
        hive: HiveId,
        position: GridPos,
        castes: &CasteTable,
        max_nectar_carry: f64,
    ) -> Self {
        let params = castes.get(caste);
        let role = match caste {
            Caste::Worker => Role::Worker(WorkerState {
                max_nectar_carry,
                stored_nectar: 0.0,
            }),
            Caste::Drone => Role::Drone,
            Caste::Queen => Role::Queen(QueenState::default()),
        };
        Self {
            hive,
            position,
            health: 0.0,
            nectar_needed: params.nectar_needed,
            nectar_threshold: params.nectar_threshold,
            is_collecting: false,
            last_resource: None,
            encounters: Encounters::default(),
            role,
        }
    }

    #[must_use]
    pub const fn caste(&self) -> Caste {
        self.role.caste()
    }

    #[must_use]
    pub fn is_hungry(&self) -> bool {
        self.health < self.nectar_needed
    }

    /// Nectar still missing to reach the daily requirement.
    #[must_use]
    pub fn deficit(&self) -> f64 {
        (self.nectar_needed - self.health).max(0.0)
    }

    #[must_use]
    pub fn is_fertilized(&self) -> bool {
        matches!(self.role, Role::Queen(QueenState { fertilized: true }))
    }

    #[must_use]
    pub fn worker(&self) -> Option<&WorkerState> {
        match &self.role {
            Role::Worker(state) => Some(state),
            _ => None,
        }
    }

    pub fn worker_mut(&mut self) -> Option<&mut WorkerState> {
        match &mut self.role {
            Role::Worker(state) => Some(state),
            _ => None,
        }
    }
}
