//! Cell-grid addressing for regular scalar grids
//!
//! A grid of `(nx, ny, nz)` samples contains `(nx-1)(ny-1)(nz-1)` unit cells.
//! Cells are addressed by a row-major linear index
//! `i*(ny-1)*(nz-1) + j*(nz-1) + k`; the ordering of this index is part of
//! the externally observable triangle-ordering contract, so it must never
//! change.

use crate::{Error, Result};

/// Relative sample offsets of a cell's 8 corners.
///
/// Lorensen/Bourke numbering: corners 0-3 wind around the bottom face
/// (z = 0), corners 4-7 around the top face (z = 1).
pub const CORNER_OFFSETS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Corner pairs of the cube's 12 edges, indexed by edge number.
///
/// Edges 0-3 ring the bottom face, 4-7 the top face, 8-11 are vertical.
pub const EDGE_CORNERS: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Addressing helper mapping between linear cell indices, cell coordinates
/// and the grid-sample coordinates of cell corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    dims: [usize; 3],
}

impl CellLayout {
    /// Create a layout for a grid of `(nx, ny, nz)` samples.
    ///
    /// Every dimension must be at least 1; dimensions of exactly 1 are valid
    /// and yield zero cells along that axis.
    pub fn new(dims: [usize; 3]) -> Result<Self> {
        if dims.iter().any(|&d| d == 0) {
            return Err(Error::InvalidData(format!(
                "Grid dimensions must all be >= 1, got {:?}",
                dims
            )));
        }
        Ok(Self { dims })
    }

    /// Grid sample dimensions `(nx, ny, nz)`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Number of cells along each axis.
    pub fn cell_dims(&self) -> [usize; 3] {
        [self.dims[0] - 1, self.dims[1] - 1, self.dims[2] - 1]
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        let [cx, cy, cz] = self.cell_dims();
        cx * cy * cz
    }

    /// Total number of grid samples.
    pub fn sample_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Cell coordinates `(i, j, k)` of a linear cell index.
    pub fn cell_coords(&self, cell: usize) -> [usize; 3] {
        let [_, cy, cz] = self.cell_dims();
        let i = cell / (cy * cz);
        let j = (cell / cz) % cy;
        let k = cell % cz;
        [i, j, k]
    }

    /// Grid-sample coordinates of corner `corner` of the cell at `coords`.
    pub fn corner_coords(&self, coords: [usize; 3], corner: usize) -> [usize; 3] {
        let offset = CORNER_OFFSETS[corner];
        [
            coords[0] + offset[0],
            coords[1] + offset[1],
            coords[2] + offset[2],
        ]
    }

    /// Row-major linear index of a grid sample, matching the memory order of
    /// freshly allocated output arrays.
    pub fn sample_index(&self, sample: [usize; 3]) -> usize {
        (sample[0] * self.dims[1] + sample[1]) * self.dims[2] + sample[2]
    }
}
