//! Core types and simulation engine for the bumblebee colony model.
//!
//! Bees of three castes forage on a bounded grid, carry nectar back to their hives and
//! record who they meet. Once per simulated day every hive feeds its members, culls the
//! ones it cannot sustain, reassigns castes from the recorded encounters and spawns new
//! bees from its surplus. [`WorldState`] owns the whole run and is driven one tick at a
//! time with [`WorldState::step`].

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

pub mod bee;
pub mod config;
pub mod flower;
pub mod grid;
pub mod hive;
pub mod metrics;
pub mod mutation;
pub mod world;

pub use bee::{
    Bee, EncounterCounts, EncounterSets, Encounters, HiveRelation, QueenState, Role, WorkerState,
};
pub use config::{CasteParams, CasteTable, SimulationConfig};
pub use flower::FlowerPatch;
pub use grid::{Cell, Grid};
pub use hive::Hive;
pub use metrics::{
    CasteCounts, DayCounters, DaySummary, DeathCause, HiveSummary, MetricsSink, NullSink,
    TickEvents,
};
pub use mutation::{CasteDistribution, MutationRule};
pub use world::WorldState;

new_key_type! {
    /// Stable handle for bees backed by a generational slot map.
    pub struct BeeId;

    /// Handle for the flower patches of the current day.
    pub struct PatchId;
}

/// Index of a hive; hives are created once at setup and never removed.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct HiveId(pub u32);

impl HiveId {
    /// Position of the hive in the world's hive list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Simulation clock (ticks processed since the run started).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Number of whole days elapsed for the given day length.
    #[must_use]
    pub const fn day(self, daily_steps: u32) -> u64 {
        if daily_steps == 0 {
            return 0;
        }
        self.0 / daily_steps as u64
    }
}

/// Integer cell coordinate on the grid.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// One Chebyshev step toward `target`: each axis moves by the sign of the difference.
    #[must_use]
    pub fn step_toward(self, target: GridPos) -> GridPos {
        let step = |from: u32, to: u32| match to.cmp(&from) {
            std::cmp::Ordering::Greater => from + 1,
            std::cmp::Ordering::Less => from - 1,
            std::cmp::Ordering::Equal => from,
        };
        GridPos::new(step(self.x, target.x), step(self.y, target.y))
    }
}

/// Bee caste; decides behaviour and daily nectar needs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Caste {
    Worker,
    Drone,
    Queen,
}

impl Caste {
    /// Every caste in canonical order.
    pub const ALL: [Caste; 3] = [Caste::Worker, Caste::Drone, Caste::Queen];

    /// Dense index used by per-caste arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Caste::Worker => 0,
            Caste::Drone => 1,
            Caste::Queen => 2,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Caste::Worker => "worker",
            Caste::Drone => "drone",
            Caste::Queen => "queen",
        }
    }
}

/// Broken engine contracts. These abort the run; nothing is clamped or repaired.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvariantViolation {
    #[error("bee {bee:?} is not a member of hive {hive:?}")]
    NotAMember { bee: BeeId, hive: HiveId },
    #[error("bee {0:?} is not alive")]
    UnknownBee(BeeId),
    #[error("hive {0:?} does not exist")]
    UnknownHive(HiveId),
    #[error("flower patch {0:?} does not exist")]
    UnknownPatch(PatchId),
    #[error("bee {bee:?} is not listed in cell {pos:?}")]
    NotInCell { bee: BeeId, pos: GridPos },
    #[error("position ({x}, {y}) lies outside the {width}x{height} grid")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },
    #[error("{what} nectar would drop to {value}")]
    NegativeNectar { what: &'static str, value: f64 },
}

/// Errors that can occur when constructing or advancing a world.
#[derive(Debug, Error)]
pub enum WorldStateError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A programming contract was broken mid-run.
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
    /// The configured number of days has already been simulated.
    #[error("simulation finished after {0:?}")]
    Finished(Tick),
}
