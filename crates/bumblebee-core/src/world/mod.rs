//! World state, tick pipeline and the public mutation surface.

mod colony;
mod forage;
mod movement;

use crate::{
    Bee, BeeId, Caste, CasteCounts, DayCounters, DaySummary, DeathCause, FlowerPatch, Grid,
    GridPos, Hive, HiveId, HiveSummary, InvariantViolation, MetricsSink, NullSink, PatchId,
    SimulationConfig, Tick, TickEvents, WorldStateError,
};
use rand::{Rng, rngs::SmallRng, seq::SliceRandom};
use rand_distr::{Distribution, Normal};
use slotmap::SlotMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use tracing::{debug, info};

/// Agent scheduled for activation within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Bee(BeeId),
    Patch(PatchId),
}

/// Aggregate world state for one simulation run.
pub struct WorldState {
    config: SimulationConfig,
    tick: Tick,
    rng: SmallRng,
    grid: Grid,
    bees: SlotMap<BeeId, Bee>,
    patches: SlotMap<PatchId, FlowerPatch>,
    hives: Vec<Hive>,
    resource_variability: f64,
    mean_nectar_budget: f64,
    sink: Box<dyn MetricsSink>,
    history: VecDeque<DaySummary>,
    counters: DayCounters,
    activation_scratch: Vec<Activation>,
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("bee_count", &self.bees.len())
            .field("patch_count", &self.patches.len())
            .field("hive_count", &self.hives.len())
            .finish()
    }
}

impl WorldState {
    /// Instantiate a populated world using the supplied configuration.
    pub fn new(config: SimulationConfig) -> Result<Self, WorldStateError> {
        Self::with_sink(config, Box::new(NullSink))
    }

    /// Instantiate a populated world that reports to `sink`.
    ///
    /// Hives are placed at distinct random cells, each receives its starting bees on the
    /// hive cell, and the first day's flower patches are laid out.
    pub fn with_sink(
        config: SimulationConfig,
        sink: Box<dyn MetricsSink>,
    ) -> Result<Self, WorldStateError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let cells = (config.width as usize) * (config.height as usize);
        let width = config.width;
        let positions: Vec<GridPos> =
            rand::seq::index::sample(&mut rng, cells, config.num_hives as usize)
                .into_iter()
                .map(|idx| GridPos::new(idx as u32 % width, idx as u32 / width))
                .collect();

        let mut world = Self::assemble(config, rng, &positions, sink)?;
        let per_caste = world.config.initial_bees_per_caste();
        for idx in 0..world.hives.len() {
            let hive = HiveId(idx as u32);
            let pos = world.hives[idx].position;
            for caste in Caste::ALL {
                for _ in 0..per_caste {
                    world.spawn_bee(hive, caste, pos)?;
                }
            }
        }
        world.resample_flower_patches()?;
        info!(
            width = world.config.width,
            height = world.config.height,
            hives = world.hives.len(),
            bees = world.bees.len(),
            patches = world.patches.len(),
            resource_variability = world.resource_variability,
            "bumblebee world initialised"
        );
        Ok(world)
    }

    /// Instantiate an unpopulated world with hives at the given cells.
    ///
    /// No bees and no flower patches are created; callers add them with
    /// [`WorldState::spawn_bee`] and [`WorldState::place_flower_patch`]. Patches are
    /// resampled as usual at the first day boundary.
    pub fn with_hives(
        config: SimulationConfig,
        hive_positions: &[GridPos],
        sink: Box<dyn MetricsSink>,
    ) -> Result<Self, WorldStateError> {
        config.validate()?;
        if hive_positions.len() != config.num_hives as usize {
            return Err(WorldStateError::InvalidConfig(
                "hive positions must match num_hives",
            ));
        }
        let distinct: BTreeSet<_> = hive_positions.iter().collect();
        if distinct.len() != hive_positions.len() {
            return Err(WorldStateError::InvalidConfig(
                "hive positions must be distinct",
            ));
        }
        let rng = config.seeded_rng();
        Self::assemble(config, rng, hive_positions, sink)
    }

    fn assemble(
        config: SimulationConfig,
        mut rng: SmallRng,
        hive_positions: &[GridPos],
        sink: Box<dyn MetricsSink>,
    ) -> Result<Self, WorldStateError> {
        let mut grid = Grid::new(config.width, config.height)?;
        let mut hives = Vec::with_capacity(hive_positions.len());
        for (idx, pos) in hive_positions.iter().enumerate() {
            let id = HiveId(idx as u32);
            grid.place_hive(id, *pos)?;
            hives.push(Hive::new(id, *pos));
        }
        let resource_variability = match config.resource_variability {
            Some(value) => value,
            None => rng.random_range(0.0..0.5),
        };
        let history_capacity = config.history_capacity;
        Ok(Self {
            mean_nectar_budget: config.mean_nectar_budget(),
            config,
            tick: Tick::zero(),
            rng,
            grid,
            bees: SlotMap::with_key(),
            patches: SlotMap::with_key(),
            hives,
            resource_variability,
            sink,
            history: VecDeque::with_capacity(history_capacity),
            counters: DayCounters::default(),
            activation_scratch: Vec::new(),
        })
    }

    /// Execute one tick, running the daily cycle when a day boundary is reached.
    pub fn step(&mut self) -> Result<TickEvents, WorldStateError> {
        if self.is_finished() {
            return Err(WorldStateError::Finished(self.tick));
        }
        let matings_before = self.counters.matings;
        self.stage_activation()?;
        // Counted before the boundary resets the day counters.
        let matings = self.counters.matings - matings_before;
        self.tick = self.tick.next();

        let day_completed = if self
            .tick
            .0
            .is_multiple_of(u64::from(self.config.daily_steps))
        {
            self.stage_day_boundary()?;
            Some(self.day())
        } else {
            None
        };

        let events = TickEvents {
            tick: self.tick,
            day_completed,
            finished: self.is_finished(),
            matings,
        };
        self.sink.on_tick(&events);
        Ok(events)
    }

    /// Step until the configured number of days has been simulated.
    pub fn run(&mut self) -> Result<(), WorldStateError> {
        while !self.is_finished() {
            self.step()?;
        }
        Ok(())
    }

    fn stage_activation(&mut self) -> Result<(), WorldStateError> {
        let mut order = std::mem::take(&mut self.activation_scratch);
        order.clear();
        order.extend(self.bees.keys().map(Activation::Bee));
        order.extend(self.patches.keys().map(Activation::Patch));
        order.shuffle(&mut self.rng);
        let result = self.activate(&order);
        self.activation_scratch = order;
        result
    }

    /// Run each agent once in `order`, skipping any removed earlier in the pass.
    fn activate(&mut self, order: &[Activation]) -> Result<(), WorldStateError> {
        for activation in order {
            match *activation {
                Activation::Bee(id) => {
                    if self.bees.contains_key(id) {
                        self.step_bee(id)?;
                    }
                }
                Activation::Patch(id) => {
                    if let Some(patch) = self.patches.get_mut(id) {
                        patch.replenish();
                    }
                }
            }
        }
        Ok(())
    }

    fn stage_day_boundary(&mut self) -> Result<(), WorldStateError> {
        debug!(day = self.day(), tick = self.tick.0, "day boundary");
        self.resample_flower_patches()?;
        for idx in 0..self.hives.len() {
            self.run_daily_cycle(HiveId(idx as u32))?;
        }

        let summary = self.census();
        self.sink.on_day(&summary);
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
        self.counters = DayCounters::default();
        Ok(())
    }

    /// Replace every flower patch with a freshly drawn layout.
    ///
    /// The day's total nectar is normally distributed around the configured mean with a
    /// spread of `resource_variability * mean`. It is divided into one share per non-hive
    /// cell and each share lands on a uniformly drawn non-hive cell; a cell drawing several
    /// shares hosts a single patch holding all of them.
    pub fn resample_flower_patches(&mut self) -> Result<(), WorldStateError> {
        self.patches.clear();
        self.grid.clear_patches();

        let candidates: Vec<GridPos> = self
            .grid
            .positions()
            .filter(|pos| self.grid.hive_at(*pos).is_none())
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        let mean = self.mean_nectar_budget;
        let total = match Normal::new(mean, self.resource_variability * mean) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => mean,
        }
        .max(0.0);
        let share = total / candidates.len() as f64;

        let mut shares: BTreeMap<GridPos, u32> = BTreeMap::new();
        for _ in 0..candidates.len() {
            let pos = candidates[self.rng.random_range(0..candidates.len())];
            *shares.entry(pos).or_default() += 1;
        }
        for (pos, count) in shares {
            self.insert_patch(pos, share * f64::from(count))?;
        }
        Ok(())
    }

    /// Put a full flower patch on `pos`, replacing any patch already there.
    pub fn place_flower_patch(
        &mut self,
        pos: GridPos,
        nectar: f64,
    ) -> Result<PatchId, WorldStateError> {
        if let Some(old) = self.grid.cell(pos)?.patch {
            self.patches.remove(old);
        }
        Ok(self.insert_patch(pos, nectar)?)
    }

    fn insert_patch(&mut self, pos: GridPos, nectar: f64) -> Result<PatchId, InvariantViolation> {
        let patch = FlowerPatch::new(pos, nectar, self.config.daily_steps);
        let id = self.patches.insert(patch);
        self.grid.set_patch(pos, Some(id))?;
        Ok(id)
    }

    /// Create a fresh bee of `caste` owned by `hive` at `pos`.
    pub fn spawn_bee(
        &mut self,
        hive: HiveId,
        caste: Caste,
        pos: GridPos,
    ) -> Result<BeeId, WorldStateError> {
        if hive.index() >= self.hives.len() {
            return Err(InvariantViolation::UnknownHive(hive).into());
        }
        self.grid.cell(pos)?;
        let bee = Bee::new(
            caste,
            hive,
            pos,
            &self.config.castes,
            self.config.worker_max_nectar_carry,
        );
        let id = self.bees.insert(bee);
        self.grid.place_bee(id, pos)?;
        self.hives[hive.index()].add_member(id);
        Ok(id)
    }

    /// Detach a bee from its hive, the grid and the arena.
    ///
    /// A bee its hive does not list is a broken contract and nothing is removed.
    pub fn remove_bee(&mut self, id: BeeId, cause: DeathCause) -> Result<Bee, WorldStateError> {
        let (hive_id, pos) = match self.bees.get(id) {
            Some(bee) => (bee.hive, bee.position),
            None => return Err(InvariantViolation::UnknownBee(id).into()),
        };
        self.hive_entry(hive_id)?.remove_member(id)?;
        self.grid.remove_bee(id, pos)?;
        let bee = self
            .bees
            .remove(id)
            .ok_or(InvariantViolation::UnknownBee(id))?;
        self.counters.record_death(cause);
        Ok(bee)
    }

    fn hive_entry(&mut self, id: HiveId) -> Result<&mut Hive, InvariantViolation> {
        self.hives
            .get_mut(id.index())
            .ok_or(InvariantViolation::UnknownHive(id))
    }

    fn bee_entry(&self, id: BeeId) -> Result<&Bee, InvariantViolation> {
        self.bees.get(id).ok_or(InvariantViolation::UnknownBee(id))
    }

    fn bee_entry_mut(&mut self, id: BeeId) -> Result<&mut Bee, InvariantViolation> {
        self.bees.get_mut(id).ok_or(InvariantViolation::UnknownBee(id))
    }

    /// Read-only population snapshot at the current tick.
    #[must_use]
    pub fn census(&self) -> DaySummary {
        let mut totals = CasteCounts::default();
        let hives: Vec<HiveSummary> = self
            .hives
            .iter()
            .map(|hive| {
                let mut counts = CasteCounts::default();
                for id in hive.members() {
                    if let Some(bee) = self.bees.get(id) {
                        counts.add(bee.caste());
                        totals.add(bee.caste());
                    }
                }
                HiveSummary {
                    hive: hive.id,
                    counts,
                    fertilized_queens: hive.fertilized_queens(),
                    nectar: hive.nectar(),
                }
            })
            .collect();
        DaySummary {
            day: self.day(),
            tick: self.tick,
            totals,
            fertilized_queens: hives.iter().map(|h| h.fertilized_queens).sum(),
            hives,
            counters: self.counters,
        }
    }

    /// Whether `num_days * daily_steps` ticks have been simulated.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.tick.0 >= self.config.total_ticks()
    }

    /// Returns an immutable reference to configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Completed days.
    #[must_use]
    pub fn day(&self) -> u64 {
        self.tick.day(self.config.daily_steps)
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Read-only access to the bee arena.
    #[must_use]
    pub fn bees(&self) -> &SlotMap<BeeId, Bee> {
        &self.bees
    }

    #[must_use]
    pub fn bee(&self, id: BeeId) -> Option<&Bee> {
        self.bees.get(id)
    }

    /// Mutable access to a bee's state.
    ///
    /// Relocation must go through [`WorldState::move_bee`]; writing `position` directly
    /// desynchronises the grid.
    #[must_use]
    pub fn bee_mut(&mut self, id: BeeId) -> Option<&mut Bee> {
        self.bees.get_mut(id)
    }

    #[must_use]
    pub fn bee_count(&self) -> usize {
        self.bees.len()
    }

    #[must_use]
    pub fn hives(&self) -> &[Hive] {
        &self.hives
    }

    #[must_use]
    pub fn hive(&self, id: HiveId) -> Option<&Hive> {
        self.hives.get(id.index())
    }

    /// Mutable access to a hive, e.g. to seed its nectar stock.
    #[must_use]
    pub fn hive_mut(&mut self, id: HiveId) -> Option<&mut Hive> {
        self.hives.get_mut(id.index())
    }

    #[must_use]
    pub fn patches(&self) -> &SlotMap<PatchId, FlowerPatch> {
        &self.patches
    }

    #[must_use]
    pub fn patch(&self, id: PatchId) -> Option<&FlowerPatch> {
        self.patches.get(id)
    }

    /// Flower patch on `pos`, if any.
    #[must_use]
    pub fn patch_at(&self, pos: GridPos) -> Option<&FlowerPatch> {
        self.grid
            .cell(pos)
            .ok()
            .and_then(|cell| cell.patch)
            .and_then(|id| self.patches.get(id))
    }

    /// Spread of the daily nectar budget in effect for this run.
    #[must_use]
    pub const fn resource_variability(&self) -> f64 {
        self.resource_variability
    }

    #[must_use]
    pub const fn mean_nectar_budget(&self) -> f64 {
        self.mean_nectar_budget
    }

    /// Counters accumulated since the last day boundary.
    #[must_use]
    pub const fn counters(&self) -> &DayCounters {
        &self.counters
    }

    /// Iterate over retained day summaries.
    pub fn history(&self) -> impl Iterator<Item = &DaySummary> {
        self.history.iter()
    }
}
