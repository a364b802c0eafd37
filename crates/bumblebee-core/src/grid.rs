//! Bounded, non-wrapping 2D grid with multi-occupancy cells.

use crate::{BeeId, GridPos, HiveId, InvariantViolation, PatchId, WorldStateError};

/// Occupants of a single cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Bees currently standing here, in arrival order.
    pub bees: Vec<BeeId>,
    pub patch: Option<PatchId>,
    pub hive: Option<HiveId>,
}

/// Row-major cell storage for a `width * height` world.
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Construct an empty grid.
    pub fn new(width: u32, height: u32) -> Result<Self, WorldStateError> {
        if width == 0 || height == 0 {
            return Err(WorldStateError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: vec![Cell::default(); (width as usize) * (height as usize)],
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub const fn contains(&self, pos: GridPos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Converts signed coordinates into a position, failing outside the bounds.
    pub fn checked(&self, x: i64, y: i64) -> Result<GridPos, InvariantViolation> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return Err(InvariantViolation::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(GridPos::new(x as u32, y as u32))
    }

    #[inline]
    fn offset(&self, pos: GridPos) -> Result<usize, InvariantViolation> {
        if !self.contains(pos) {
            return Err(InvariantViolation::OutOfBounds {
                x: i64::from(pos.x),
                y: i64::from(pos.y),
                width: self.width,
                height: self.height,
            });
        }
        Ok((pos.y as usize) * (self.width as usize) + (pos.x as usize))
    }

    /// Immutable access to a specific cell.
    pub fn cell(&self, pos: GridPos) -> Result<&Cell, InvariantViolation> {
        let idx = self.offset(pos)?;
        Ok(&self.cells[idx])
    }

    fn cell_mut(&mut self, pos: GridPos) -> Result<&mut Cell, InvariantViolation> {
        let idx = self.offset(pos)?;
        Ok(&mut self.cells[idx])
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| GridPos::new(x, y)))
    }

    /// Moore neighbourhood of `pos` (up to 8 cells), clipped at the edges.
    #[must_use]
    pub fn neighborhood(&self, pos: GridPos) -> Vec<GridPos> {
        let mut out = Vec::with_capacity(8);
        for dy in -1_i64..=1 {
            for dx in -1_i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Ok(next) = self.checked(i64::from(pos.x) + dx, i64::from(pos.y) + dy) {
                    out.push(next);
                }
            }
        }
        out
    }

    pub(crate) fn place_bee(&mut self, bee: BeeId, pos: GridPos) -> Result<(), InvariantViolation> {
        self.cell_mut(pos)?.bees.push(bee);
        Ok(())
    }

    pub(crate) fn remove_bee(
        &mut self,
        bee: BeeId,
        pos: GridPos,
    ) -> Result<(), InvariantViolation> {
        let cell = self.cell_mut(pos)?;
        match cell.bees.iter().position(|id| *id == bee) {
            Some(idx) => {
                cell.bees.remove(idx);
                Ok(())
            }
            None => Err(InvariantViolation::NotInCell { bee, pos }),
        }
    }

    pub(crate) fn relocate_bee(
        &mut self,
        bee: BeeId,
        from: GridPos,
        to: GridPos,
    ) -> Result<(), InvariantViolation> {
        self.offset(to)?;
        self.remove_bee(bee, from)?;
        self.place_bee(bee, to)
    }

    pub(crate) fn set_patch(
        &mut self,
        pos: GridPos,
        patch: Option<PatchId>,
    ) -> Result<(), InvariantViolation> {
        self.cell_mut(pos)?.patch = patch;
        Ok(())
    }

    pub(crate) fn clear_patches(&mut self) {
        for cell in &mut self.cells {
            cell.patch = None;
        }
    }

    pub(crate) fn place_hive(
        &mut self,
        hive: HiveId,
        pos: GridPos,
    ) -> Result<(), InvariantViolation> {
        self.cell_mut(pos)?.hive = Some(hive);
        Ok(())
    }

    /// Hive standing on `pos`, if any.
    #[must_use]
    pub fn hive_at(&self, pos: GridPos) -> Option<HiveId> {
        self.cell(pos).ok().and_then(|cell| cell.hive)
    }

    /// Bees standing on `pos`; empty outside the grid.
    #[must_use]
    pub fn bees_at(&self, pos: GridPos) -> &[BeeId] {
        self.cell(pos).map_or(&[], |cell| cell.bees.as_slice())
    }
}
