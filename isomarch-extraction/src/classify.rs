//! Per-cell corner classification and triangle counting

use crate::backend::DisjointSlice;
use crate::tables::TRIANGLE_COUNTS;
use isomarch_core::{Backend, CellLayout, Scalar};
use ndarray::ArrayView3;

/// 8-bit classification code of one cell.
///
/// Bit `c` is set iff corner `c` lies strictly below the isolevel. A corner
/// value exactly equal to the isolevel is therefore classified as outside,
/// on every backend and in both the forward and backward pass.
pub fn cell_code<T: Scalar>(
    grid: &ArrayView3<'_, T>,
    layout: &CellLayout,
    cell: usize,
    isolevel: T,
) -> u8 {
    let coords = layout.cell_coords(cell);
    let mut code = 0u8;
    for corner in 0..8 {
        let [x, y, z] = layout.corner_coords(coords, corner);
        if grid[[x, y, z]] < isolevel {
            code |= 1 << corner;
        }
    }
    code
}

/// Number of triangles implied by one cell's classification.
pub fn count_triangles_in_cell<T: Scalar>(
    grid: &ArrayView3<'_, T>,
    layout: &CellLayout,
    cell: usize,
    isolevel: T,
) -> i64 {
    TRIANGLE_COUNTS[cell_code(grid, layout, cell, isolevel) as usize]
}

/// Classify every cell and return its pre-scan triangle count.
///
/// Embarrassingly parallel; cells write disjoint entries.
pub fn count_cell_triangles<T: Scalar, B: Backend>(
    grid: &ArrayView3<'_, T>,
    layout: &CellLayout,
    isolevel: T,
    backend: &B,
) -> Vec<i64> {
    let mut counts = vec![0i64; layout.cell_count()];
    {
        let out = DisjointSlice::new(&mut counts);
        backend.dispatch(layout.cell_count(), |cell| {
            // Safety: one slot per cell index.
            unsafe { out.write(cell, count_triangles_in_cell(grid, layout, cell, isolevel)) };
        });
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ThreadPoolBackend;
    use ndarray::Array3;

    fn single_cell_grid(corners: [f32; 8]) -> Array3<f32> {
        let mut grid = Array3::zeros((2, 2, 2));
        let layout = CellLayout::new([2, 2, 2]).unwrap();
        for (corner, &value) in corners.iter().enumerate() {
            let [x, y, z] = layout.corner_coords([0, 0, 0], corner);
            grid[[x, y, z]] = value;
        }
        grid
    }

    #[test]
    fn test_uniform_cell_counts_zero() {
        let layout = CellLayout::new([2, 2, 2]).unwrap();

        let all_above = single_cell_grid([2.0; 8]);
        assert_eq!(
            count_triangles_in_cell(&all_above.view(), &layout, 0, 1.0f32),
            0
        );

        let all_below = single_cell_grid([0.0; 8]);
        assert_eq!(
            count_triangles_in_cell(&all_below.view(), &layout, 0, 1.0f32),
            0
        );
    }

    #[test]
    fn test_single_inside_corner() {
        let layout = CellLayout::new([2, 2, 2]).unwrap();
        for corner in 0..8 {
            let mut corners = [2.0f32; 8];
            corners[corner] = 0.0;
            let grid = single_cell_grid(corners);
            assert_eq!(cell_code(&grid.view(), &layout, 0, 1.0), 1 << corner);
            assert_eq!(count_triangles_in_cell(&grid.view(), &layout, 0, 1.0), 1);
        }
    }

    #[test]
    fn test_equal_to_isolevel_is_outside() {
        let layout = CellLayout::new([2, 2, 2]).unwrap();
        // One corner exactly at the isolevel, the rest above: nothing is
        // inside, so the cell emits no triangles.
        let mut corners = [2.0f32; 8];
        corners[3] = 1.0;
        let grid = single_cell_grid(corners);
        assert_eq!(cell_code(&grid.view(), &layout, 0, 1.0), 0);
    }

    #[test]
    fn test_count_cell_triangles_matches_scalar_path() {
        let layout = CellLayout::new([4, 3, 3]).unwrap();
        let grid =
            Array3::from_shape_fn((4, 3, 3), |(x, y, z)| (x + 2 * y) as f32 - z as f32 * 0.7);
        let backend = ThreadPoolBackend::new().with_min_chunk(1);

        let counts = count_cell_triangles(&grid.view(), &layout, 1.3f32, &backend);
        assert_eq!(counts.len(), layout.cell_count());
        for (cell, &count) in counts.iter().enumerate() {
            assert_eq!(
                count,
                count_triangles_in_cell(&grid.view(), &layout, cell, 1.3f32)
            );
        }
    }
}
