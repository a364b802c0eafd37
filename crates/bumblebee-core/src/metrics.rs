//! Day summaries and the sink trait that receives them.

use crate::{Caste, HiveId, Tick};
use serde::{Deserialize, Serialize};

/// Live bees per caste.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CasteCounts {
    pub workers: usize,
    pub drones: usize,
    pub queens: usize,
}

impl CasteCounts {
    pub fn add(&mut self, caste: Caste) {
        match caste {
            Caste::Worker => self.workers += 1,
            Caste::Drone => self.drones += 1,
            Caste::Queen => self.queens += 1,
        }
    }

    #[must_use]
    pub const fn get(&self, caste: Caste) -> usize {
        match caste {
            Caste::Worker => self.workers,
            Caste::Drone => self.drones,
            Caste::Queen => self.queens,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.workers + self.drones + self.queens
    }
}

/// Snapshot of one hive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HiveSummary {
    pub hive: HiveId,
    pub counts: CasteCounts,
    /// Cumulative over the run.
    pub fertilized_queens: u64,
    pub nectar: f64,
}

/// Why a bee left the simulation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeathCause {
    /// A drone that had not fed itself by the end of the day.
    Starved,
    /// The hive could not cover the bee's deficit.
    Unfed,
    /// Consumed by a queen-drone mating.
    Mated,
    /// Replaced by a freshly drawn caste.
    Replaced,
}

/// Event counts accumulated since the previous day boundary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayCounters {
    /// Bees spawned from hive surplus.
    pub births: usize,
    pub deaths_starved: usize,
    pub deaths_unfed: usize,
    /// Bees removed by mating (two per mating).
    pub deaths_mated: usize,
    pub mutations: usize,
    /// Bees kept because their caste weights summed to zero.
    pub degenerate_mutations: usize,
    /// Bees with no encounters whose health was reset instead of mutating.
    pub health_resets: usize,
    pub matings: usize,
}

impl DayCounters {
    pub fn record_death(&mut self, cause: DeathCause) {
        match cause {
            DeathCause::Starved => self.deaths_starved += 1,
            DeathCause::Unfed => self.deaths_unfed += 1,
            DeathCause::Mated => self.deaths_mated += 1,
            DeathCause::Replaced => {}
        }
    }

    /// Deaths of every cause except mutation replacement.
    #[must_use]
    pub const fn deaths(&self) -> usize {
        self.deaths_starved + self.deaths_unfed + self.deaths_mated
    }
}

/// Read-only population snapshot, emitted once per simulated day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    /// Number of completed days.
    pub day: u64,
    pub tick: Tick,
    pub totals: CasteCounts,
    pub hives: Vec<HiveSummary>,
    /// Aggregate of the per-hive fertilized queen counters.
    pub fertilized_queens: u64,
    pub counters: DayCounters,
}

/// Events emitted after every [`crate::WorldState::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    pub tick: Tick,
    /// Set on day boundaries to the number of completed days.
    pub day_completed: Option<u64>,
    pub finished: bool,
    pub matings: usize,
}

/// Receiver for per-day (and optionally per-tick) metrics.
pub trait MetricsSink: Send {
    fn on_day(&mut self, summary: &DaySummary);

    fn on_tick(&mut self, _events: &TickEvents) {}
}

/// No-op metrics sink.
#[derive(Debug, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn on_day(&mut self, _summary: &DaySummary) {}
}
