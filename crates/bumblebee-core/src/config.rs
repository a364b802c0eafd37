//! Run configuration and validation.

use crate::{Caste, WorldStateError, mutation::MutationRule};
use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

/// Per-caste physiology.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CasteParams {
    /// Nectar the bee must hold at the end of a day to survive.
    pub nectar_needed: f64,
    /// A flower patch only counts as adequate when it holds more nectar than this.
    pub nectar_threshold: f64,
}

impl CasteParams {
    #[must_use]
    pub const fn new(nectar_needed: f64, nectar_threshold: f64) -> Self {
        Self {
            nectar_needed,
            nectar_threshold,
        }
    }
}

/// Physiology for every caste, indexed by [`Caste`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CasteTable {
    pub worker: CasteParams,
    pub drone: CasteParams,
    pub queen: CasteParams,
}

impl CasteTable {
    /// Parameters for `caste`.
    #[must_use]
    pub const fn get(&self, caste: Caste) -> &CasteParams {
        match caste {
            Caste::Worker => &self.worker,
            Caste::Drone => &self.drone,
            Caste::Queen => &self.queen,
        }
    }

    /// Mutable parameters for `caste`.
    pub fn get_mut(&mut self, caste: Caste) -> &mut CasteParams {
        match caste {
            Caste::Worker => &mut self.worker,
            Caste::Drone => &mut self.drone,
            Caste::Queen => &mut self.queen,
        }
    }
}

impl Default for CasteTable {
    fn default() -> Self {
        Self {
            worker: CasteParams::new(236.0, 1.0),
            drone: CasteParams::new(236.0, 1.0),
            queen: CasteParams::new(740.0, 1.0),
        }
    }
}

/// Static configuration for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Width of the grid in cells.
    pub width: u32,
    /// Height of the grid in cells.
    pub height: u32,
    /// Number of hives placed at distinct cells.
    pub num_hives: u32,
    /// Bees per hive at setup, split evenly across castes (at least one of each).
    pub initial_bees_per_hive: u32,
    /// Ticks per simulated day.
    pub daily_steps: u32,
    /// Days to simulate before the run halts.
    pub num_days: u32,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// How encounter statistics turn into caste probabilities.
    pub mutation: MutationRule,
    /// Fraction of the hive's stock spent on new bees each day.
    pub growth_factor: f64,
    /// Relative spread of the daily flower nectar budget; drawn from `[0, 0.5)` when unset.
    pub resource_variability: Option<f64>,
    /// Daily flower nectar mean as a multiple of the initial colony need.
    pub nectar_abundance: f64,
    /// Nectar a worker can carry before heading home.
    pub worker_max_nectar_carry: f64,
    /// Per-caste nectar needs and foraging thresholds.
    pub castes: CasteTable,
    /// Whether a random walk may step onto the bee's own hive cell.
    pub exclude_home_on_random_walk: bool,
    /// Maximum number of day summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 30,
            height: 30,
            num_hives: 3,
            initial_bees_per_hive: 3,
            daily_steps: 500,
            num_days: 30,
            rng_seed: None,
            mutation: MutationRule::default(),
            growth_factor: 0.5,
            resource_variability: None,
            nectar_abundance: 70.0,
            worker_max_nectar_carry: 44.0,
            castes: CasteTable::default(),
            exclude_home_on_random_walk: true,
            history_capacity: 365,
        }
    }
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl SimulationConfig {
    /// Validates every field, rejecting the configuration before any state is built.
    pub fn validate(&self) -> Result<(), WorldStateError> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldStateError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        if self.num_hives == 0 {
            return Err(WorldStateError::InvalidConfig("num_hives must be positive"));
        }
        let cells = u64::from(self.width) * u64::from(self.height);
        if u64::from(self.num_hives) >= cells {
            return Err(WorldStateError::InvalidConfig(
                "the grid needs at least one cell without a hive",
            ));
        }
        if self.initial_bees_per_hive == 0 {
            return Err(WorldStateError::InvalidConfig(
                "initial_bees_per_hive must be positive",
            ));
        }
        if self.daily_steps == 0 || self.num_days == 0 {
            return Err(WorldStateError::InvalidConfig(
                "daily_steps and num_days must be positive",
            ));
        }
        self.mutation.validate()?;
        if !unit_interval(self.growth_factor) {
            return Err(WorldStateError::InvalidConfig(
                "growth_factor must lie in [0, 1]",
            ));
        }
        if let Some(variability) = self.resource_variability {
            if !unit_interval(variability) {
                return Err(WorldStateError::InvalidConfig(
                    "resource_variability must lie in [0, 1]",
                ));
            }
        }
        if !self.nectar_abundance.is_finite() || self.nectar_abundance <= 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "nectar_abundance must be positive",
            ));
        }
        if !self.worker_max_nectar_carry.is_finite() || self.worker_max_nectar_carry <= 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "worker_max_nectar_carry must be positive",
            ));
        }
        for caste in Caste::ALL {
            let params = self.castes.get(caste);
            if !params.nectar_needed.is_finite() || params.nectar_needed <= 0.0 {
                return Err(WorldStateError::InvalidConfig(
                    "nectar_needed must be positive for every caste",
                ));
            }
            if !params.nectar_threshold.is_finite() || params.nectar_threshold < 0.0 {
                return Err(WorldStateError::InvalidConfig(
                    "nectar_threshold must be non-negative for every caste",
                ));
            }
        }
        if self.history_capacity == 0 {
            return Err(WorldStateError::InvalidConfig(
                "history_capacity must be positive",
            ));
        }
        Ok(())
    }

    /// Total ticks in the run.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        u64::from(self.daily_steps) * u64::from(self.num_days)
    }

    /// Number of bees of each caste a hive starts with.
    #[must_use]
    pub fn initial_bees_per_caste(&self) -> u32 {
        (self.initial_bees_per_hive / Caste::ALL.len() as u32).max(1)
    }

    /// Daily nectar need of the whole starting population.
    #[must_use]
    pub fn initial_nectar_need(&self) -> f64 {
        let per_hive: f64 = Caste::ALL
            .iter()
            .map(|caste| self.castes.get(*caste).nectar_needed)
            .sum::<f64>()
            * f64::from(self.initial_bees_per_caste());
        per_hive * f64::from(self.num_hives)
    }

    /// Mean of the daily flower nectar budget.
    #[must_use]
    pub fn mean_nectar_budget(&self) -> f64 {
        self.initial_nectar_need() * self.nectar_abundance
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.total_ticks(), 15_000);
        assert_eq!(config.initial_bees_per_caste(), 1);
        assert_eq!(config.castes.get(Caste::Queen).nectar_needed, 740.0);
        // 3 hives * (236 + 236 + 740)
        assert_eq!(config.initial_nectar_need(), 3_636.0);
        assert_eq!(config.mean_nectar_budget(), 254_520.0);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            SimulationConfig {
                width: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                width: 2,
                height: 1,
                num_hives: 2,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                growth_factor: 1.5,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                resource_variability: Some(-0.1),
                ..SimulationConfig::default()
            },
            SimulationConfig {
                mutation: MutationRule::ForagerRoyal {
                    alpha: 0.5,
                    forager_royal_ratio: 2.0,
                },
                ..SimulationConfig::default()
            },
            SimulationConfig {
                daily_steps: 0,
                ..SimulationConfig::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(WorldStateError::InvalidConfig(_))),
                "expected rejection for {config:?}"
            );
        }

        let mut config = SimulationConfig::default();
        config.castes.get_mut(Caste::Drone).nectar_needed = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"width": 12, "rng_seed": 9}"#).expect("parse");
        assert_eq!(config.width, 12);
        assert_eq!(config.height, 30);
        assert_eq!(config.rng_seed, Some(9));
        assert_eq!(config.mutation, MutationRule::default());
    }

    #[test]
    fn initial_split_uses_thirds() {
        let config = SimulationConfig {
            initial_bees_per_hive: 10,
            ..SimulationConfig::default()
        };
        assert_eq!(config.initial_bees_per_caste(), 3);
    }
}
