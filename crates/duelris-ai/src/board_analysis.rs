use std::{cell::OnceCell, iter};

use duelris_engine::{GRID_HEIGHT, GRID_WIDTH, Grid};

/// Lazily computed metrics of a grid.
///
/// Every metric is computed on first access and cached, so evaluators only
/// pay for what they read.
#[derive(Debug)]
pub struct BoardAnalysis {
    grid: Grid,
    column_heights: OnceCell<[u8; GRID_WIDTH]>,
    column_occupied_cells: OnceCell<[u8; GRID_WIDTH]>,
    column_well_depths: OnceCell<[u8; GRID_WIDTH]>,
    max_height: OnceCell<u8>,
    aggregate_height: OnceCell<u32>,
    num_holes: OnceCell<u32>,
    sum_of_hole_depth: OnceCell<u32>,
    bumpiness: OnceCell<u32>,
    squared_bumpiness: OnceCell<u32>,
}

impl BoardAnalysis {
    #[must_use]
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            grid: *grid,
            column_heights: OnceCell::new(),
            column_occupied_cells: OnceCell::new(),
            column_well_depths: OnceCell::new(),
            max_height: OnceCell::new(),
            aggregate_height: OnceCell::new(),
            num_holes: OnceCell::new(),
            sum_of_hole_depth: OnceCell::new(),
            bumpiness: OnceCell::new(),
            squared_bumpiness: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn column_heights(&self) -> &[u8; GRID_WIDTH] {
        self.column_heights.get_or_init(|| {
            let mut heights = [0; GRID_WIDTH];
            for (x, h) in heights.iter_mut().enumerate() {
                *h = u8::try_from(self.grid.column_height(x)).unwrap_or(u8::MAX);
            }
            heights
        })
    }

    #[must_use]
    pub fn column_occupied_cells(&self) -> &[u8; GRID_WIDTH] {
        self.column_occupied_cells.get_or_init(|| {
            let mut occupied = [0; GRID_WIDTH];
            for row in self.grid.rows() {
                for (o, cell) in iter::zip(&mut occupied, row) {
                    if !cell.is_empty() {
                        *o += 1;
                    }
                }
            }
            occupied
        })
    }

    /// Depth of each column below the lower of its two neighbours.
    ///
    /// The side walls count as infinitely high, so edge columns can be wells.
    #[must_use]
    pub fn column_well_depths(&self) -> &[u8; GRID_WIDTH] {
        self.column_well_depths.get_or_init(|| {
            let h = self.column_heights();
            let start = &[u8::MAX, h[0], h[1]][..];
            let end = &[h[GRID_WIDTH - 2], h[GRID_WIDTH - 1], u8::MAX][..];
            let triples = iter::once(start).chain(h.windows(3)).chain(iter::once(end));
            let mut depths = [0; GRID_WIDTH];
            for (depth, w) in iter::zip(&mut depths, triples) {
                if w[1] < w[0] && w[1] < w[2] {
                    *depth = u8::min(w[0], w[2]) - w[1];
                }
            }
            depths
        })
    }

    #[must_use]
    pub fn max_height(&self) -> u8 {
        *self
            .max_height
            .get_or_init(|| self.column_heights().iter().copied().max().unwrap_or(0))
    }

    /// Sum of all column heights.
    #[must_use]
    pub fn aggregate_height(&self) -> u32 {
        *self
            .aggregate_height
            .get_or_init(|| self.column_heights().iter().copied().map(u32::from).sum())
    }

    /// Empty cells with an occupied cell somewhere above them.
    #[must_use]
    pub fn num_holes(&self) -> u32 {
        *self.num_holes.get_or_init(|| {
            iter::zip(self.column_heights(), self.column_occupied_cells())
                .map(|(h, occ)| u32::from(h - occ))
                .sum()
        })
    }

    /// Holes weighted by the number of occupied cells stacked above them.
    #[must_use]
    pub fn sum_of_hole_depth(&self) -> u32 {
        *self.sum_of_hole_depth.get_or_init(|| {
            let mut depth_sum = 0;
            for x in 0..GRID_WIDTH {
                let mut depth = 0;
                for y in 0..GRID_HEIGHT {
                    if self.grid.is_occupied(x, y) {
                        depth += 1;
                    } else if depth > 0 {
                        depth_sum += depth;
                    }
                }
            }
            depth_sum
        })
    }

    /// Sum of absolute height differences between neighbouring columns.
    #[must_use]
    pub fn bumpiness(&self) -> u32 {
        *self.bumpiness.get_or_init(|| {
            self.column_heights()
                .windows(2)
                .map(|w| u32::from(w[0].abs_diff(w[1])))
                .sum()
        })
    }

    /// Like [`Self::bumpiness`], with each difference squared.
    #[must_use]
    pub fn squared_bumpiness(&self) -> u32 {
        *self.squared_bumpiness.get_or_init(|| {
            self.column_heights()
                .windows(2)
                .map(|w| u32::from(w[0].abs_diff(w[1])).pow(2))
                .sum()
        })
    }

    #[must_use]
    pub fn deepest_well(&self) -> u8 {
        self.column_well_depths().iter().copied().max().unwrap_or(0)
    }

    /// Total depth of every well except the deepest one.
    #[must_use]
    pub fn secondary_well_depth(&self) -> u32 {
        let total: u32 = self.column_well_depths().iter().copied().map(u32::from).sum();
        total - u32::from(self.deepest_well())
    }
}
