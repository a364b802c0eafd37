//! Per-tick caste state machines.
//!
//! Every caste follows the same outline: a tick spent collecting only clears the flag,
//! a bee at capacity heads home, and any other bee moves and then inspects the cell it
//! landed on. Collecting never moves the bee.

use super::WorldState;
use crate::{
    BeeId, Caste, DeathCause, GridPos, InvariantViolation, PatchId, Role, WorldStateError,
};
use tracing::trace;

impl WorldState {
    /// Activate a single bee for one tick.
    pub fn step_bee(&mut self, id: BeeId) -> Result<(), WorldStateError> {
        match self.bee_entry(id)?.caste() {
            Caste::Worker => self.step_worker(id),
            Caste::Drone => self.step_drone(id),
            Caste::Queen => self.step_queen(id),
        }
    }

    fn step_worker(&mut self, id: BeeId) -> Result<(), WorldStateError> {
        if self.finish_collecting(id)? {
            return Ok(());
        }
        let home = self.home_of(id)?;
        let (pos, full, last) = {
            let bee = self.bee_entry(id)?;
            let full = bee.worker().is_some_and(|state| state.is_full());
            (bee.position, full, bee.last_resource)
        };
        if full {
            if pos == home {
                self.deposit(id)?;
            } else {
                self.move_toward(id, home)?;
            }
            return Ok(());
        }

        match last {
            Some(target) => self.move_toward(id, target)?,
            None => self.random_move(id)?,
        }
        let pos = self.bee_entry(id)?.position;
        if last.is_none_or(|target| target == pos) {
            self.forage_here(id)?;
        }
        Ok(())
    }

    fn step_drone(&mut self, id: BeeId) -> Result<(), WorldStateError> {
        if self.finish_collecting(id)? {
            let bee = self.bee_entry(id)?;
            let (pos, hungry, threshold) = (bee.position, bee.is_hungry(), bee.nectar_threshold);
            if hungry && self.check_cell_for_nectar(pos, threshold).is_some() {
                self.bee_entry_mut(id)?.last_resource = Some(pos);
            }
            return Ok(());
        }

        self.random_move(id)?;
        let bee = self.bee_entry(id)?;
        if bee.is_hungry() {
            if let Some(patch) = self.check_cell_for_nectar(bee.position, bee.nectar_threshold) {
                self.collect(id, patch)?;
            }
        }
        Ok(())
    }

    fn step_queen(&mut self, id: BeeId) -> Result<(), WorldStateError> {
        let home = self.home_of(id)?;
        {
            let bee = self.bee_entry(id)?;
            if bee.position == home && !bee.is_hungry() {
                return Ok(());
            }
        }
        if self.finish_collecting(id)? {
            return Ok(());
        }

        let (pos, hungry, threshold, last) = {
            let bee = self.bee_entry(id)?;
            (
                bee.position,
                bee.is_hungry(),
                bee.nectar_threshold,
                bee.last_resource,
            )
        };
        if hungry {
            match last {
                Some(target) => self.move_toward(id, target)?,
                None => self.random_move(id)?,
            }
        } else {
            if self.check_cell_for_nectar(pos, threshold).is_some() {
                self.bee_entry_mut(id)?.last_resource = Some(pos);
            }
            self.move_toward(id, home)?;
        }

        if !self.bee_entry(id)?.is_fertilized() {
            if let Some(drone) = self.foreign_drone_near(id)? {
                return self.mate(id, drone);
            }
        }

        let bee = self.bee_entry(id)?;
        if bee.is_hungry() && bee.last_resource.is_none_or(|target| target == bee.position) {
            self.forage_here(id)?;
        }
        Ok(())
    }

    /// Clears the collecting flag; `true` when this tick was spent collecting.
    fn finish_collecting(&mut self, id: BeeId) -> Result<bool, InvariantViolation> {
        let bee = self.bee_entry_mut(id)?;
        let was_collecting = bee.is_collecting;
        bee.is_collecting = false;
        Ok(was_collecting)
    }

    /// Start collecting from an adequate patch here, or forget the remembered resource.
    fn forage_here(&mut self, id: BeeId) -> Result<(), WorldStateError> {
        let (pos, threshold) = {
            let bee = self.bee_entry(id)?;
            (bee.position, bee.nectar_threshold)
        };
        match self.check_cell_for_nectar(pos, threshold) {
            Some(patch) => self.collect(id, patch),
            None => {
                self.bee_entry_mut(id)?.last_resource = None;
                Ok(())
            }
        }
    }

    /// Withdraw nectar from `patch`: workers fill their load, other castes their health.
    fn collect(&mut self, id: BeeId, patch: PatchId) -> Result<(), WorldStateError> {
        let available = self
            .patches
            .get(patch)
            .ok_or(InvariantViolation::UnknownPatch(patch))?
            .nectar();
        let bee = self.bee_entry_mut(id)?;
        let amount = match bee.worker() {
            Some(state) => state.free_capacity(),
            None => bee.deficit(),
        }
        .min(available);
        if let Role::Worker(state) = &mut bee.role {
            state.stored_nectar += amount;
        } else {
            bee.health += amount;
        }
        bee.is_collecting = true;
        self.patches
            .get_mut(patch)
            .ok_or(InvariantViolation::UnknownPatch(patch))?
            .withdraw(amount)?;
        Ok(())
    }

    fn deposit(&mut self, id: BeeId) -> Result<(), WorldStateError> {
        let hive = self.bee_entry(id)?.hive;
        let load = match self.bee_entry_mut(id)?.worker_mut() {
            Some(state) => std::mem::take(&mut state.stored_nectar),
            None => return Ok(()),
        };
        self.hive_entry(hive)?.deposit(load)?;
        Ok(())
    }

    /// First drone in the queen's cell that belongs to another hive.
    fn foreign_drone_near(&self, queen: BeeId) -> Result<Option<BeeId>, InvariantViolation> {
        let bee = self.bee_entry(queen)?;
        let hive = bee.hive;
        Ok(self
            .grid
            .bees_at(bee.position)
            .iter()
            .copied()
            .find(|other| {
                *other != queen
                    && self
                        .bees
                        .get(*other)
                        .is_some_and(|o| o.caste() == Caste::Drone && o.hive != hive)
            }))
    }

    /// Fertilize the queen and consume both partners.
    fn mate(&mut self, queen: BeeId, drone: BeeId) -> Result<(), WorldStateError> {
        let (hive, pos): (_, GridPos) = {
            let bee = self.bee_entry_mut(queen)?;
            if let Role::Queen(state) = &mut bee.role {
                state.fertilized = true;
            }
            (bee.hive, bee.position)
        };
        self.hive_entry(hive)?.record_fertilized_queen();
        self.remove_bee(queen, DeathCause::Mated)?;
        self.remove_bee(drone, DeathCause::Mated)?;
        self.counters.matings += 1;
        trace!(?queen, ?drone, hive = hive.0, x = pos.x, y = pos.y, "queen mated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Caste, GridPos, HiveId, NullSink, SimulationConfig, WorldState};

    fn world() -> WorldState {
        let config = SimulationConfig {
            width: 6,
            height: 6,
            num_hives: 2,
            daily_steps: 1_000,
            num_days: 1,
            rng_seed: Some(23),
            ..SimulationConfig::default()
        };
        WorldState::with_hives(
            config,
            &[GridPos::new(0, 0), GridPos::new(5, 5)],
            Box::new(NullSink),
        )
        .expect("world")
    }

    #[test]
    fn full_worker_heads_home_then_deposits() {
        let mut world = world();
        let id = world
            .spawn_bee(HiveId(0), Caste::Worker, GridPos::new(2, 1))
            .expect("spawn");
        world
            .bee_mut(id)
            .and_then(|bee| bee.worker_mut())
            .expect("worker")
            .stored_nectar = 44.0;

        world.step_bee(id).expect("step");
        assert_eq!(world.bee(id).expect("bee").position, GridPos::new(1, 0));
        world.step_bee(id).expect("step");
        assert_eq!(world.bee(id).expect("bee").position, GridPos::new(0, 0));
        world.step_bee(id).expect("deposit");
        assert_eq!(world.hive(HiveId(0)).expect("hive").nectar(), 44.0);
        let bee = world.bee(id).expect("bee");
        assert_eq!(bee.worker().expect("worker").stored_nectar, 0.0);
        assert_eq!(bee.position, GridPos::new(0, 0));
    }

    #[test]
    fn drone_remembers_a_patch_it_is_still_hungry_for() {
        let mut world = world();
        let spot = GridPos::new(3, 3);
        world.place_flower_patch(spot, 1_000.0).expect("patch");
        let id = world.spawn_bee(HiveId(1), Caste::Drone, spot).expect("spawn");
        {
            let bee = world.bee_mut(id).expect("bee");
            bee.is_collecting = true;
            bee.health = 10.0;
        }
        world.step_bee(id).expect("step");
        let bee = world.bee(id).expect("bee");
        assert!(!bee.is_collecting);
        assert_eq!(bee.position, spot);
        assert_eq!(bee.last_resource, Some(spot));
    }

    #[test]
    fn drone_feeds_itself_after_a_random_step() {
        let mut world = world();
        let start = GridPos::new(3, 3);
        for pos in world.grid().neighborhood(start) {
            world.place_flower_patch(pos, 100.0).expect("patch");
        }
        let id = world.spawn_bee(HiveId(1), Caste::Drone, start).expect("spawn");
        world.step_bee(id).expect("step");
        let bee = world.bee(id).expect("bee");
        assert!(bee.is_collecting);
        assert_eq!(bee.health, 100.0);
        assert_eq!(world.patch_at(bee.position).expect("patch").nectar(), 0.0);
    }

    #[test]
    fn fed_queen_idles_at_home() {
        let mut world = world();
        let home = GridPos::new(0, 0);
        let id = world.spawn_bee(HiveId(0), Caste::Queen, home).expect("spawn");
        world.bee_mut(id).expect("queen").health = 740.0;
        for _ in 0..5 {
            world.step_bee(id).expect("step");
        }
        let bee = world.bee(id).expect("queen");
        assert_eq!(bee.position, home);
        assert!(bee.last_resource.is_none());
    }

    #[test]
    fn fed_queen_remembers_patch_before_returning() {
        let mut world = world();
        let spot = GridPos::new(2, 2);
        world.place_flower_patch(spot, 50.0).expect("patch");
        let id = world.spawn_bee(HiveId(0), Caste::Queen, spot).expect("spawn");
        world.bee_mut(id).expect("queen").health = 740.0;
        world.step_bee(id).expect("step");
        let bee = world.bee(id).expect("queen");
        assert_eq!(bee.last_resource, Some(spot));
        assert_eq!(bee.position, GridPos::new(1, 1));
    }
}
