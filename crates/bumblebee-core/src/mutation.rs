//! Encounter-driven caste reassignment.
//!
//! At the end of every day each surviving bee is replaced by a fresh bee whose caste is
//! drawn from a categorical distribution. The distribution is derived from the bee's
//! lifetime encounters, expressed as fractions of its total encounters so that long-lived
//! bees are not weighted differently from short-lived ones.

use crate::{Caste, WorldStateError, bee::EncounterCounts};
use rand::{Rng, distr::Distribution, distr::weighted::WeightedIndex};
use serde::{Deserialize, Serialize};

/// Weighting scheme that maps encounter fractions to raw caste weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum MutationRule {
    /// Same-caste crowding suppresses a caste while foreign mating partners favour it.
    ///
    /// `alpha` balances own-hive against other-hive encounters. `forager_royal_ratio`
    /// is the emphasis on the worker term; the remaining emphasis is split evenly between
    /// the drone and queen terms.
    ForagerRoyal {
        alpha: f64,
        forager_royal_ratio: f64,
    },
    /// Each caste's weight grows with encounters of that same caste.
    CasteWeights {
        alpha: f64,
        worker: f64,
        drone: f64,
        queen: f64,
    },
}

impl Default for MutationRule {
    fn default() -> Self {
        Self::ForagerRoyal {
            alpha: 0.5,
            forager_royal_ratio: 0.5,
        }
    }
}

impl MutationRule {
    pub(crate) fn validate(&self) -> Result<(), WorldStateError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        match *self {
            MutationRule::ForagerRoyal {
                alpha,
                forager_royal_ratio,
            } => {
                if !in_unit(alpha) || !in_unit(forager_royal_ratio) {
                    return Err(WorldStateError::InvalidConfig(
                        "alpha and forager_royal_ratio must lie in [0, 1]",
                    ));
                }
            }
            MutationRule::CasteWeights {
                alpha,
                worker,
                drone,
                queen,
            } => {
                if !in_unit(alpha) {
                    return Err(WorldStateError::InvalidConfig("alpha must lie in [0, 1]"));
                }
                if [worker, drone, queen]
                    .iter()
                    .any(|w| !w.is_finite() || *w < 0.0)
                {
                    return Err(WorldStateError::InvalidConfig(
                        "caste weights must be finite and non-negative",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Raw, unnormalised weights per caste (indexed by [`Caste::index`]).
    ///
    /// Returns `None` when the bee has no encounters at all.
    #[must_use]
    pub fn weights(&self, counts: &EncounterCounts) -> Option<[f64; 3]> {
        let total = counts.total();
        if total == 0 {
            return None;
        }
        let total = total as f64;
        let own = |caste: Caste| counts.own[caste.index()] as f64 / total;
        let other = |caste: Caste| counts.other[caste.index()] as f64 / total;

        let raw = match *self {
            MutationRule::ForagerRoyal {
                alpha,
                forager_royal_ratio,
            } => {
                let forager = forager_royal_ratio;
                let royal = (1.0 - forager_royal_ratio) / 2.0;
                [
                    1.0 - forager
                        * (alpha * own(Caste::Worker) + (1.0 - alpha) * other(Caste::Worker)),
                    1.0 - royal
                        * (alpha * own(Caste::Drone) - (1.0 - alpha) * other(Caste::Queen)),
                    1.0 - royal
                        * (alpha * own(Caste::Queen) - (1.0 - alpha) * other(Caste::Drone)),
                ]
            }
            MutationRule::CasteWeights {
                alpha,
                worker,
                drone,
                queen,
            } => {
                let mix = |caste: Caste| alpha * own(caste) + (1.0 - alpha) * other(caste);
                [
                    worker * mix(Caste::Worker),
                    drone * mix(Caste::Drone),
                    queen * mix(Caste::Queen),
                ]
            }
        };
        Some(raw.map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 }))
    }

    /// Normalised caste probabilities, or `None` when the distribution is degenerate.
    #[must_use]
    pub fn distribution(&self, counts: &EncounterCounts) -> Option<CasteDistribution> {
        CasteDistribution::from_weights(self.weights(counts)?)
    }
}

/// Categorical distribution over castes whose probabilities sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CasteDistribution {
    probabilities: [f64; 3],
}

impl CasteDistribution {
    /// Normalises raw weights; `None` when their sum is not strictly positive.
    #[must_use]
    pub fn from_weights(weights: [f64; 3]) -> Option<Self> {
        let sum: f64 = weights.iter().sum();
        if !sum.is_finite() || sum <= 0.0 {
            return None;
        }
        Some(Self {
            probabilities: weights.map(|w| w / sum),
        })
    }

    #[must_use]
    pub fn probabilities(&self) -> [f64; 3] {
        self.probabilities
    }

    #[must_use]
    pub fn probability(&self, caste: Caste) -> f64 {
        self.probabilities[caste.index()]
    }

    /// Draw one caste; `None` only if the weights cannot form a sampler.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Caste> {
        let sampler = WeightedIndex::new(self.probabilities).ok()?;
        Caste::ALL.get(sampler.sample(rng)).copied()
    }
}
