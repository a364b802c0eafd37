//! Movement on the grid and same-cell encounter recording.

use super::WorldState;
use crate::{BeeId, GridPos, HiveRelation, InvariantViolation, PatchId, WorldStateError};
use rand::Rng;

impl WorldState {
    /// Relocate a bee and update cell membership. Records no encounters.
    pub fn move_bee(&mut self, id: BeeId, pos: GridPos) -> Result<(), WorldStateError> {
        let from = self.bee_entry(id)?.position;
        self.grid.relocate_bee(id, from, pos)?;
        self.bee_entry_mut(id)?.position = pos;
        Ok(())
    }

    /// Step to a uniformly drawn neighbouring cell, then record encounters.
    ///
    /// The bee's own hive cell is excluded when `exclude_home_on_random_walk` is set. With
    /// no candidate cell the bee stays where it is.
    pub fn random_move(&mut self, id: BeeId) -> Result<(), WorldStateError> {
        let pos = self.bee_entry(id)?.position;
        let home = self.home_of(id)?;
        let mut candidates = self.grid.neighborhood(pos);
        if self.config.exclude_home_on_random_walk {
            candidates.retain(|cell| *cell != home);
        }
        if !candidates.is_empty() {
            let target = candidates[self.rng.random_range(0..candidates.len())];
            self.move_bee(id, target)?;
        }
        self.update_encounters(id)?;
        Ok(())
    }

    /// One Chebyshev step toward `target`, then record encounters.
    pub fn move_toward(&mut self, id: BeeId, target: GridPos) -> Result<(), WorldStateError> {
        let pos = self.bee_entry(id)?.position;
        self.move_bee(id, pos.step_toward(target))?;
        self.update_encounters(id)?;
        Ok(())
    }

    /// Record every co-located bee in both directions.
    ///
    /// Nothing is recorded on hive cells. Returns how many pairs were new.
    pub fn update_encounters(&mut self, id: BeeId) -> Result<usize, WorldStateError> {
        let (pos, hive, caste) = {
            let bee = self.bee_entry(id)?;
            (bee.position, bee.hive, bee.caste())
        };
        if self.grid.hive_at(pos).is_some() {
            return Ok(0);
        }

        let others: Vec<BeeId> = self
            .grid
            .bees_at(pos)
            .iter()
            .copied()
            .filter(|other| *other != id)
            .collect();
        let mut recorded = 0;
        for other in others {
            let (other_hive, other_caste) = {
                let bee = self.bee_entry(other)?;
                (bee.hive, bee.caste())
            };
            let relation = if other_hive == hive {
                HiveRelation::OwnHive
            } else {
                HiveRelation::OtherHive
            };
            let fresh = self
                .bee_entry_mut(id)?
                .encounters
                .record(other_caste, relation, other);
            self.bee_entry_mut(other)?
                .encounters
                .record(caste, relation, id);
            if fresh {
                recorded += 1;
            }
        }
        Ok(recorded)
    }

    /// The patch on `pos` if it holds more than `threshold` nectar.
    #[must_use]
    pub fn check_cell_for_nectar(&self, pos: GridPos, threshold: f64) -> Option<PatchId> {
        let id = self.grid.cell(pos).ok()?.patch?;
        self.patches
            .get(id)
            .filter(|patch| patch.is_adequate(threshold))
            .map(|_| id)
    }

    /// Cell of the hive owning `id`.
    pub(super) fn home_of(&self, id: BeeId) -> Result<GridPos, InvariantViolation> {
        let hive = self.bee_entry(id)?.hive;
        self.hives
            .get(hive.index())
            .map(|h| h.position)
            .ok_or(InvariantViolation::UnknownHive(hive))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Caste, GridPos, HiveId, HiveRelation, NullSink, SimulationConfig, WorldState};

    fn world() -> WorldState {
        let config = SimulationConfig {
            width: 5,
            height: 5,
            num_hives: 2,
            daily_steps: 100,
            num_days: 1,
            rng_seed: Some(17),
            ..SimulationConfig::default()
        };
        WorldState::with_hives(
            config,
            &[GridPos::new(0, 0), GridPos::new(4, 4)],
            Box::new(NullSink),
        )
        .expect("world")
    }

    #[test]
    fn random_walk_stays_in_bounds_and_avoids_home() {
        let mut world = world();
        let id = world
            .spawn_bee(HiveId(0), Caste::Drone, GridPos::new(1, 1))
            .expect("spawn");
        for _ in 0..200 {
            world.random_move(id).expect("move");
            let pos = world.bee(id).expect("bee").position;
            assert!(world.grid().contains(pos));
            assert_ne!(pos, GridPos::new(0, 0));
            assert_eq!(world.grid().bees_at(pos), &[id]);
        }
    }

    #[test]
    fn move_toward_steps_diagonally() {
        let mut world = world();
        let id = world
            .spawn_bee(HiveId(1), Caste::Queen, GridPos::new(0, 2))
            .expect("spawn");
        world.move_toward(id, GridPos::new(4, 4)).expect("move");
        assert_eq!(world.bee(id).expect("bee").position, GridPos::new(1, 3));
        world.move_toward(id, GridPos::new(1, 3)).expect("noop");
        assert_eq!(world.bee(id).expect("bee").position, GridPos::new(1, 3));
        assert!(world.move_bee(id, GridPos::new(5, 0)).is_err());
        assert_eq!(world.bee(id).expect("bee").position, GridPos::new(1, 3));
    }

    #[test]
    fn encounters_are_mutual_and_idempotent() {
        let mut world = world();
        let spot = GridPos::new(2, 2);
        let worker = world
            .spawn_bee(HiveId(0), Caste::Worker, spot)
            .expect("spawn");
        let drone = world
            .spawn_bee(HiveId(1), Caste::Drone, spot)
            .expect("spawn");
        let sister = world
            .spawn_bee(HiveId(0), Caste::Queen, spot)
            .expect("spawn");

        assert_eq!(world.update_encounters(worker).expect("record"), 2);
        assert_eq!(world.update_encounters(worker).expect("record"), 0);
        // Only the drone-queen pair is new.
        assert_eq!(world.update_encounters(drone).expect("record"), 1);

        let w = &world.bee(worker).expect("worker").encounters;
        assert!(w.contains(Caste::Drone, HiveRelation::OtherHive, drone));
        assert!(w.contains(Caste::Queen, HiveRelation::OwnHive, sister));
        let d = &world.bee(drone).expect("drone").encounters;
        assert!(d.contains(Caste::Worker, HiveRelation::OtherHive, worker));
        assert!(d.contains(Caste::Queen, HiveRelation::OtherHive, sister));
        assert_eq!(d.total(), 2);
        let s = &world.bee(sister).expect("sister").encounters;
        assert!(s.contains(Caste::Worker, HiveRelation::OwnHive, worker));
        assert_eq!(s.total(), 2);
    }

    #[test]
    fn hive_cells_record_nothing() {
        let mut world = world();
        let home = GridPos::new(0, 0);
        let a = world.spawn_bee(HiveId(0), Caste::Worker, home).expect("a");
        let b = world.spawn_bee(HiveId(1), Caste::Drone, home).expect("b");
        world.move_toward(a, home).expect("stay");
        assert_eq!(world.update_encounters(b).expect("record"), 0);
        assert_eq!(world.bee(a).expect("a").encounters.total(), 0);
        assert_eq!(world.bee(b).expect("b").encounters.total(), 0);
    }

    #[test]
    fn nectar_check_uses_strict_threshold() {
        let mut world = world();
        let pos = GridPos::new(3, 1);
        let patch = world.place_flower_patch(pos, 5.0).expect("patch");
        assert_eq!(world.check_cell_for_nectar(pos, 4.9), Some(patch));
        assert_eq!(world.check_cell_for_nectar(pos, 5.0), None);
        assert_eq!(world.check_cell_for_nectar(GridPos::new(3, 2), 0.0), None);
    }
}
