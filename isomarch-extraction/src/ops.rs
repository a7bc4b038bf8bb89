//! Public forward and backward operations
//!
//! Both operations share the same front half of the pipeline: classify every
//! cell, scan the counts into offsets, scatter the offsets into the ordered
//! triangle-index list. The forward pass then interpolates triangle vertices;
//! the backward pass accumulates gradients instead, reusing the identical
//! classification and ordering.

use crate::backend::ThreadPoolBackend;
use crate::builder::build_triangles;
use crate::classify::count_cell_triangles;
use crate::gradient::accumulate_gradients;
use crate::scan::BlockedScan;
use crate::scatter::scatter_triangle_indices;
use isomarch_core::{
    Backend, CellLayout, Error, ExclusiveScan, Result, Scalar, TriangleIndex,
};
use log::{debug, trace};
use ndarray::{Array3, ArrayView3};

/// Fixed-isolevel configuration for the non-differentiable operation
/// variant. The threshold is a configuration value rather than an input, so
/// no backward operation exists for it.
#[derive(Debug, Clone, Copy)]
pub struct FixedIsolevel {
    pub isolevel: f64,
}

/// Isosurface extractor with pluggable execution backend and scan.
pub struct MarchingCubes<B = ThreadPoolBackend, S = BlockedScan> {
    backend: B,
    scan: S,
}

impl MarchingCubes {
    /// Extractor with the default thread-pool backend and blocked scan.
    pub fn new() -> Self {
        Self {
            backend: ThreadPoolBackend::new(),
            scan: BlockedScan::new(),
        }
    }
}

impl Default for MarchingCubes {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend, S: ExclusiveScan> MarchingCubes<B, S> {
    /// Extractor from explicit backend and scan implementations.
    pub fn with_parts(backend: B, scan: S) -> Self {
        Self { backend, scan }
    }

    /// Classify, scan and scatter: the shared front half of both passes.
    fn prepare<T: Scalar>(
        &self,
        grid: &ArrayView3<'_, T>,
        isolevel: T,
    ) -> Result<(CellLayout, i64, Vec<TriangleIndex>)> {
        let (nx, ny, nz) = grid.dim();
        let layout = CellLayout::new([nx, ny, nz])?;

        let mut counts = count_cell_triangles(grid, &layout, isolevel, &self.backend);
        // Barrier: offsets are a function of all preceding counts, so the
        // scan must fully complete before any consumer runs.
        let total = self.scan.scan(&mut counts);
        trace!(
            "classified {} cells, {} triangles total",
            layout.cell_count(),
            total
        );

        let indices = scatter_triangle_indices(&counts, total, &self.backend);
        Ok((layout, total, indices))
    }

    /// Extract the isosurface at `isolevel` as a `[total, 3, 3]` array of
    /// triangle vertices in grid-local coordinates.
    ///
    /// Grids with any dimension of 1 have no interior cells and yield an
    /// empty output, not an error.
    pub fn extract<T: Scalar>(
        &self,
        grid: ArrayView3<'_, T>,
        isolevel: T,
    ) -> Result<Array3<T>> {
        let (layout, total, indices) = self.prepare(&grid, isolevel)?;
        debug!(
            "extracting {} triangles from {:?} grid at isolevel {:?}",
            total,
            layout.dims(),
            isolevel.to_f64()
        );
        build_triangles(&grid, &layout, isolevel, &indices, &self.backend)
    }

    /// Forward pass of the fixed-isolevel variant: same contract as
    /// [`extract`](Self::extract), with the threshold taken from
    /// configuration and converted to the grid's element width.
    pub fn extract_fixed<T: Scalar>(
        &self,
        grid: ArrayView3<'_, T>,
        config: &FixedIsolevel,
    ) -> Result<Array3<T>> {
        self.extract(grid, T::from_f64(config.isolevel))
    }

    /// Backward pass of the differentiable variant.
    ///
    /// `triangle_gradients` holds the loss gradient with respect to every
    /// triangle-vertex position and must be shaped exactly
    /// `[total_triangles, 3, 3]` for this grid and isolevel; anything else is
    /// rejected before gradient computation starts. Returns the gradients
    /// with respect to the grid samples and the isolevel.
    pub fn gradients<T: Scalar>(
        &self,
        grid: ArrayView3<'_, T>,
        isolevel: T,
        triangle_gradients: ArrayView3<'_, T>,
    ) -> Result<(Array3<T>, T)> {
        let (_, rows, cols) = triangle_gradients.dim();
        if (rows, cols) != (3, 3) {
            return Err(Error::InvalidData(format!(
                "Triangle gradients must be shaped [total, 3, 3], got {:?}",
                triangle_gradients.dim()
            )));
        }

        let (layout, total, indices) = self.prepare(&grid, isolevel)?;
        if triangle_gradients.dim().0 != total as usize {
            return Err(Error::InvalidData(format!(
                "Triangle gradients have {} rows but the surface has {} triangles",
                triangle_gradients.dim().0,
                total
            )));
        }

        debug!(
            "backpropagating {} triangle gradients onto {:?} grid",
            total,
            layout.dims()
        );
        accumulate_gradients(
            &grid,
            &layout,
            isolevel,
            &indices,
            &triangle_gradients,
            &self.backend,
        )
    }
}

/// Convenience forward extraction with the default backend and scan.
pub fn marching_cubes<T: Scalar>(grid: ArrayView3<'_, T>, isolevel: T) -> Result<Array3<T>> {
    MarchingCubes::new().extract(grid, isolevel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_gradient_shape_rejected_early() {
        let grid = Array3::<f32>::zeros((2, 2, 2));
        let bad = Array3::<f32>::zeros((0, 3, 2));
        let result = MarchingCubes::new().gradients(grid.view(), 0.5, bad.view());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_gradient_row_count_must_match() {
        let grid = Array3::<f32>::from_elem((2, 2, 2), 1.0);
        // Uniform grid: zero triangles, so one gradient row is a mismatch.
        let bad = Array3::<f32>::zeros((1, 3, 3));
        let result = MarchingCubes::new().gradients(grid.view(), 0.5, bad.view());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_fixed_isolevel_matches_differentiable_forward() {
        let grid = Array3::from_shape_fn((3, 3, 3), |(x, y, z)| (x + y + z) as f32);
        let config = FixedIsolevel { isolevel: 2.5 };
        let extractor = MarchingCubes::new();

        let fixed = extractor.extract_fixed(grid.view(), &config).unwrap();
        let differentiable = extractor.extract(grid.view(), 2.5f32).unwrap();
        assert_eq!(fixed, differentiable);
    }
}
