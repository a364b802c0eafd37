//! End-of-day hive cycle: feed and cull, caste reassignment, homing and spawning.

use super::WorldState;
use crate::{BeeId, Caste, DeathCause, HiveId, WorldStateError};
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, trace};

impl WorldState {
    /// Run the four daily phases for `hive` in order.
    pub fn run_daily_cycle(&mut self, hive: HiveId) -> Result<(), WorldStateError> {
        let before = self.counters;
        self.feed_and_kill_bees(hive)?;
        self.generate_next_generation(hive)?;
        self.bees_to_hive(hive)?;
        let born = self.spawn_new_bees(hive)?;

        let (members, nectar) = {
            let entry = self.hive_entry(hive)?;
            (entry.member_count(), entry.nectar())
        };
        debug!(
            hive = hive.0,
            members,
            nectar,
            starved = self.counters.deaths_starved - before.deaths_starved,
            unfed = self.counters.deaths_unfed - before.deaths_unfed,
            mutations = self.counters.mutations - before.mutations,
            born,
            "daily cycle complete"
        );
        Ok(())
    }

    /// Feed every member from the hive stock in a shuffled order.
    ///
    /// Drones must have fed themselves and starve otherwise. Every other caste is topped
    /// up to its daily need if the stock covers the whole deficit, and dies if it cannot.
    pub fn feed_and_kill_bees(&mut self, hive: HiveId) -> Result<(), WorldStateError> {
        let mut members: Vec<BeeId> = self.hive_entry(hive)?.members().collect();
        members.shuffle(&mut self.rng);

        for id in members {
            let (caste, hungry, deficit, needed) = {
                let bee = self.bee_entry(id)?;
                (bee.caste(), bee.is_hungry(), bee.deficit(), bee.nectar_needed)
            };
            if caste == Caste::Drone {
                if hungry {
                    self.remove_bee(id, DeathCause::Starved)?;
                }
                continue;
            }

            let entry = self.hive_entry(hive)?;
            if entry.nectar() >= deficit {
                entry.withdraw(deficit)?;
                self.bee_entry_mut(id)?.health = needed;
            } else {
                self.remove_bee(id, DeathCause::Unfed)?;
            }
        }
        Ok(())
    }

    /// Replace members by bees of a caste drawn from their encounter statistics.
    ///
    /// A bee that met nobody has its health reset instead; one whose weights carry no
    /// mass is left as it is. Replacements keep the position, hive and remembered
    /// resource of the bee they replace and nothing else.
    pub fn generate_next_generation(&mut self, hive: HiveId) -> Result<(), WorldStateError> {
        let members: Vec<BeeId> = self.hive_entry(hive)?.members().collect();
        let rule = self.config.mutation;

        for id in members {
            let counts = self.bee_entry(id)?.encounters.counts();
            if counts.total() == 0 {
                self.bee_entry_mut(id)?.health = 0.0;
                self.counters.health_resets += 1;
                continue;
            }
            let Some(caste) = rule
                .distribution(&counts)
                .and_then(|dist| dist.sample(&mut self.rng))
            else {
                self.counters.degenerate_mutations += 1;
                trace!(?id, ?counts, "caste weights carry no mass; bee kept");
                continue;
            };

            let (pos, last_resource) = {
                let bee = self.bee_entry(id)?;
                (bee.position, bee.last_resource)
            };
            self.remove_bee(id, DeathCause::Replaced)?;
            let replacement = self.spawn_bee(hive, caste, pos)?;
            self.bee_entry_mut(replacement)?.last_resource = last_resource;
            self.counters.mutations += 1;
        }
        Ok(())
    }

    /// Bring every non-drone member back onto the hive cell without recording encounters.
    pub fn bees_to_hive(&mut self, hive: HiveId) -> Result<(), WorldStateError> {
        let (home, members) = {
            let entry = self.hive_entry(hive)?;
            (entry.position, entry.members().collect::<Vec<_>>())
        };
        for id in members {
            if self.bee_entry(id)?.caste() != Caste::Drone {
                self.move_bee(id, home)?;
            }
        }
        Ok(())
    }

    /// Spend `growth_factor` of the stock on new bees of uniformly drawn castes.
    ///
    /// Each birth costs the newborn's daily need; the stock never drops below zero.
    /// Returns the number of bees spawned.
    pub fn spawn_new_bees(&mut self, hive: HiveId) -> Result<usize, WorldStateError> {
        let (home, stock) = {
            let entry = self.hive_entry(hive)?;
            (entry.position, entry.nectar())
        };
        let mut budget = stock * self.config.growth_factor;
        let mut born = 0;
        while budget > 0.0 && self.hive_entry(hive)?.nectar() > 0.0 {
            let caste = Caste::ALL[self.rng.random_range(0..Caste::ALL.len())];
            let cost = self.config.castes.get(caste).nectar_needed;
            self.spawn_bee(hive, caste, home)?;
            budget -= cost;
            self.hive_entry(hive)?.withdraw_saturating(cost);
            born += 1;
        }
        self.counters.births += born;
        Ok(born)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Caste, GridPos, HiveId, HiveRelation, MutationRule, NullSink, SimulationConfig,
        WorldState,
    };

    fn world(mutation: MutationRule) -> WorldState {
        let config = SimulationConfig {
            width: 6,
            height: 6,
            num_hives: 2,
            daily_steps: 50,
            num_days: 2,
            rng_seed: Some(31),
            mutation,
            ..SimulationConfig::default()
        };
        WorldState::with_hives(
            config,
            &[GridPos::new(1, 1), GridPos::new(4, 4)],
            Box::new(NullSink),
        )
        .expect("world")
    }

    #[test]
    fn feeding_drains_stock_or_kills() {
        let mut world = world(MutationRule::default());
        let hive = HiveId(0);
        let home = GridPos::new(1, 1);
        let worker = world.spawn_bee(hive, Caste::Worker, home).expect("w");
        let queen = world.spawn_bee(hive, Caste::Queen, home).expect("q");
        let fed_drone = world
            .spawn_bee(hive, Caste::Drone, GridPos::new(3, 3))
            .expect("d");
        world.bee_mut(worker).expect("w").health = 200.0;
        world.bee_mut(fed_drone).expect("d").health = 236.0;
        // Covers the worker's 36 but not the queen's 740.
        world.hive_mut(hive).expect("hive").set_nectar(100.0).expect("seed");

        world.feed_and_kill_bees(hive).expect("feed");
        let entry = world.hive(hive).expect("hive");
        assert!(entry.contains(worker));
        assert!(entry.contains(fed_drone));
        assert!(!entry.contains(queen));
        assert!(world.bee(queen).is_none());
        assert_eq!(entry.nectar(), 64.0);
        assert_eq!(world.bee(worker).expect("w").health, 236.0);
        assert_eq!(world.counters().deaths_unfed, 1);
    }

    #[test]
    fn lonely_bees_reset_health_instead_of_mutating() {
        let mut world = world(MutationRule::default());
        let hive = HiveId(1);
        let id = world
            .spawn_bee(hive, Caste::Worker, GridPos::new(0, 5))
            .expect("spawn");
        world.bee_mut(id).expect("bee").health = 236.0;
        world.generate_next_generation(hive).expect("mutate");
        assert_eq!(world.bee(id).expect("bee").health, 0.0);
        assert_eq!(world.counters().health_resets, 1);
        assert_eq!(world.counters().mutations, 0);
    }

    #[test]
    fn replacement_keeps_place_and_memory_only() {
        let mut world = world(MutationRule::CasteWeights {
            alpha: 1.0,
            worker: 0.0,
            drone: 0.0,
            queen: 1.0,
        });
        let hive = HiveId(0);
        let spot = GridPos::new(2, 3);
        let a = world.spawn_bee(hive, Caste::Worker, spot).expect("a");
        let b = world.spawn_bee(hive, Caste::Queen, spot).expect("b");
        world.update_encounters(a).expect("meet");
        world.bee_mut(a).expect("a").last_resource = Some(GridPos::new(5, 0));
        world.bee_mut(a).expect("a").health = 236.0;

        world.generate_next_generation(hive).expect("mutate");
        assert!(world.bee(a).is_none());
        // The queen only met a worker, which this rule gives no weight.
        let kept = world.bee(b).expect("queen kept");
        assert_eq!(kept.encounters.total(), 1);

        let entry = world.hive(hive).expect("hive");
        assert_eq!(entry.member_count(), 2);
        let replacements: Vec<_> = entry
            .members()
            .filter(|id| *id != b)
            .map(|id| world.bee(id).expect("bee"))
            .collect();
        assert_eq!(replacements.len(), 1);
        let fresh = replacements[0];
        assert_eq!(fresh.caste(), Caste::Queen);
        assert_eq!(fresh.position, spot);
        assert_eq!(fresh.last_resource, Some(GridPos::new(5, 0)));
        assert_eq!(fresh.health, 0.0);
        assert_eq!(fresh.encounters.total(), 0);
        assert_eq!(world.counters().mutations, 1);
        assert_eq!(world.counters().degenerate_mutations, 1);
    }

    #[test]
    fn degenerate_weights_leave_the_bee_alone() {
        let mut world = world(MutationRule::CasteWeights {
            alpha: 1.0,
            worker: 1.0,
            drone: 1.0,
            queen: 1.0,
        });
        let spot = GridPos::new(2, 2);
        let ours = world.spawn_bee(HiveId(0), Caste::Worker, spot).expect("a");
        let theirs = world.spawn_bee(HiveId(1), Caste::Drone, spot).expect("b");
        world.update_encounters(ours).expect("meet");
        assert!(
            world
                .bee(ours)
                .expect("a")
                .encounters
                .contains(Caste::Drone, HiveRelation::OtherHive, theirs)
        );
        world.generate_next_generation(HiveId(0)).expect("mutate");
        assert!(world.bee(ours).is_some());
        assert_eq!(world.counters().degenerate_mutations, 1);
    }

    #[test]
    fn homing_skips_drones() {
        let mut world = world(MutationRule::default());
        let hive = HiveId(1);
        let worker = world
            .spawn_bee(hive, Caste::Worker, GridPos::new(0, 0))
            .expect("w");
        let drone = world
            .spawn_bee(hive, Caste::Drone, GridPos::new(0, 1))
            .expect("d");
        world.bees_to_hive(hive).expect("home");
        assert_eq!(world.bee(worker).expect("w").position, GridPos::new(4, 4));
        assert_eq!(world.bee(drone).expect("d").position, GridPos::new(0, 1));
        assert!(world.grid().bees_at(GridPos::new(4, 4)).contains(&worker));
    }

    #[test]
    fn spawning_stops_when_stock_runs_dry() {
        let mut world = world(MutationRule::default());
        let hive = HiveId(0);
        world.hive_mut(hive).expect("hive").set_nectar(300.0).expect("seed");
        world.config.growth_factor = 1.0;
        let born = world.spawn_new_bees(hive).expect("spawn");
        // A cheap first birth leaves 64 units, which the second one drains.
        assert!((1..=2).contains(&born));
        assert_eq!(world.hive(hive).expect("hive").nectar(), 0.0);
        assert_eq!(world.counters().births, born);
        assert_eq!(world.hive(hive).expect("hive").member_count(), born);
    }
}
