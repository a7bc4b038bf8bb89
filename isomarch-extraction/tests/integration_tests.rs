//! Integration tests for isomarch-extraction
//!
//! These exercise the full pipeline end to end: counting invariants, the
//! canonical single-cell scenarios, determinism, backend parity, gradient
//! correctness against finite differences, and the degenerate-but-valid
//! boundary grids.

use approx::assert_relative_eq;
use half::f16;
use isomarch_core::{CellLayout, ExclusiveScan, Scalar};
use isomarch_extraction::{
    count_cell_triangles, marching_cubes, scatter_triangle_indices, BlockedScan, MarchingCubes,
    SequentialScan, StridedBackend, ThreadPoolBackend,
};
use ndarray::{Array3, ArrayView3};

/// 2x2x2 grid, bottom face 0, top face 1.
fn slab_grid() -> Array3<f64> {
    Array3::from_shape_fn((2, 2, 2), |(_, _, z)| z as f64)
}

/// A larger smooth test field (offset sphere).
fn sphere_grid(n: usize) -> Array3<f64> {
    let center = (n as f64 - 1.0) / 2.0;
    Array3::from_shape_fn((n, n, n), |(x, y, z)| {
        let dx = x as f64 - center;
        let dy = y as f64 - center * 0.8;
        let dz = z as f64 - center;
        (dx * dx + dy * dy + dz * dz).sqrt()
    })
}

fn triangle_count_from_counts(grid: &Array3<f64>, isolevel: f64) -> (i64, usize) {
    let (nx, ny, nz) = grid.dim();
    let layout = CellLayout::new([nx, ny, nz]).unwrap();
    let backend = ThreadPoolBackend::new().with_min_chunk(1);
    let counts = count_cell_triangles(&grid.view(), &layout, isolevel, &backend);
    let per_cell_sum: i64 = counts.iter().sum();

    let mut offsets = counts;
    let total = SequentialScan.scan(&mut offsets);
    let indices = scatter_triangle_indices(&offsets, total, &backend);

    assert_eq!(per_cell_sum, total);
    (total, indices.len())
}

#[test]
fn test_counts_scan_and_scatter_agree() {
    let grid = sphere_grid(9);
    for isolevel in [1.0, 2.5, 3.7] {
        let (total, scattered) = triangle_count_from_counts(&grid, isolevel);
        assert_eq!(total as usize, scattered);

        let triangles = marching_cubes(grid.view(), isolevel).unwrap();
        assert_eq!(triangles.dim(), (total as usize, 3, 3));
        assert!(total > 0);
    }
}

#[test]
fn test_slab_yields_quad_at_half_height() {
    let grid = slab_grid();
    let triangles = marching_cubes(grid.view(), 0.5).unwrap();

    // Exactly two triangles forming the z = 0.5 quad.
    assert_eq!(triangles.dim(), (2, 3, 3));
    for i in 0..2 {
        for vertex in 0..3 {
            let x = triangles[[i, vertex, 0]];
            let y = triangles[[i, vertex, 1]];
            let z = triangles[[i, vertex, 2]];
            assert!(x == 0.0 || x == 1.0);
            assert!(y == 0.0 || y == 1.0);
            assert_relative_eq!(z, 0.5);
        }
    }

    // The six vertices cover all four corners of the quad.
    let mut seen = std::collections::BTreeSet::new();
    for i in 0..2 {
        for vertex in 0..3 {
            seen.insert((
                triangles[[i, vertex, 0]] as i64,
                triangles[[i, vertex, 1]] as i64,
            ));
        }
    }
    assert_eq!(seen.len(), 4);
}

#[test]
fn test_single_inside_corner_triangle() {
    let mut grid = Array3::from_elem((2, 2, 2), 2.0f64);
    grid[[0, 0, 0]] = 0.0;
    let isolevel = 0.5;

    let triangles = marching_cubes(grid.view(), isolevel).unwrap();
    assert_eq!(triangles.dim(), (1, 3, 3));

    // Each vertex sits on one of the three edges adjacent to the inside
    // corner, at t = (isolevel - v_inside) / (v_outside - v_inside) = 0.25
    // from the corner.
    let t = (isolevel - 0.0) / (2.0 - 0.0);
    let mut expected = vec![[t, 0.0, 0.0], [0.0, t, 0.0], [0.0, 0.0, t]];
    for vertex in 0..3 {
        let position = [
            triangles[[0, vertex, 0]],
            triangles[[0, vertex, 1]],
            triangles[[0, vertex, 2]],
        ];
        let found = expected
            .iter()
            .position(|e| e.iter().zip(&position).all(|(a, b)| a == b));
        assert!(found.is_some(), "unexpected vertex {:?}", position);
        expected.remove(found.unwrap());
    }
}

#[test]
fn test_unit_dimensions_yield_empty_output() {
    for dims in [(1, 5, 5), (5, 1, 5), (5, 5, 1), (1, 1, 1)] {
        let grid = Array3::<f32>::from_elem(dims, 1.0);
        let triangles = marching_cubes(grid.view(), 0.5f32).unwrap();
        assert_eq!(triangles.dim(), (0, 3, 3));
    }
}

#[test]
fn test_zero_dimension_is_rejected() {
    let grid = Array3::<f32>::zeros((0, 4, 4));
    assert!(marching_cubes(grid.view(), 0.5f32).is_err());
}

#[test]
fn test_determinism_across_runs_and_schedules() {
    let grid = sphere_grid(8);
    let isolevel = 2.9;

    let reference = marching_cubes(grid.view(), isolevel).unwrap();

    let two_threads = MarchingCubes::with_parts(
        ThreadPoolBackend::with_threads(2).unwrap(),
        SequentialScan,
    );
    let seven_threads = MarchingCubes::with_parts(
        ThreadPoolBackend::with_threads(7).unwrap().with_min_chunk(1),
        BlockedScan::with_block_size(16),
    );

    // Bit-identical ordering and vertex values under every schedule.
    assert_eq!(two_threads.extract(grid.view(), isolevel).unwrap(), reference);
    assert_eq!(seven_threads.extract(grid.view(), isolevel).unwrap(), reference);
}

#[test]
fn test_backend_parity_threadpool_vs_strided() {
    let grid = sphere_grid(10);
    let isolevel = 3.4;

    let pool = MarchingCubes::with_parts(ThreadPoolBackend::new(), BlockedScan::new());
    let strided = MarchingCubes::with_parts(StridedBackend::new(5), SequentialScan);

    let a = pool.extract(grid.view(), isolevel).unwrap();
    let b = strided.extract(grid.view(), isolevel).unwrap();
    assert_eq!(a, b);

    // Backward parity: the strided backend races its atomic adds in a
    // different order, so grid gradients match within tolerance while the
    // isolevel gradient (fixed reduction order) matches exactly.
    let ones = Array3::from_elem(a.dim(), 1.0);
    let (grad_a, iso_a) = pool.gradients(grid.view(), isolevel, ones.view()).unwrap();
    let (grad_b, iso_b) = strided
        .gradients(grid.view(), isolevel, ones.view())
        .unwrap();
    assert_eq!(iso_a, iso_b);
    for (ga, gb) in grad_a.iter().zip(grad_b.iter()) {
        assert_relative_eq!(*ga, *gb, epsilon = 1e-12, max_relative = 1e-9);
    }
}

#[test]
fn test_tie_break_consistent_across_backends() {
    // One corner exactly at the isolevel: it counts as outside, identically
    // on both backends.
    let mut grid = Array3::from_elem((2, 2, 2), 2.0f64);
    grid[[0, 0, 0]] = 0.5;

    let pool = marching_cubes(grid.view(), 0.5).unwrap();
    let strided = MarchingCubes::with_parts(StridedBackend::new(3), SequentialScan)
        .extract(grid.view(), 0.5)
        .unwrap();
    assert_eq!(pool.dim(), (0, 3, 3));
    assert_eq!(pool, strided);
}

#[test]
fn test_half_and_single_widths() {
    fn convert<T: Scalar>(grid: &Array3<f64>) -> Array3<T> {
        grid.mapv(|v| T::from_f64(v))
    }

    let grid = slab_grid();

    let half_grid: Array3<f16> = convert(&grid);
    let half_triangles = marching_cubes(half_grid.view(), f16::from_f64(0.5)).unwrap();
    assert_eq!(half_triangles.dim(), (2, 3, 3));
    for &component in half_triangles.iter() {
        let value = Scalar::to_f64(component);
        assert!(value == 0.0 || value == 0.5 || value == 1.0);
    }

    let single_grid: Array3<f32> = convert(&grid);
    let single_triangles = marching_cubes(single_grid.view(), 0.5f32).unwrap();
    assert_eq!(single_triangles.dim(), (2, 3, 3));
}

#[test]
fn test_gradient_check_perturbed_corner() {
    // 2x2x2 grid with one perturbed corner; analytic gradient vs central
    // finite differences for every grid sample and the isolevel.
    let mut grid = slab_grid();
    grid[[1, 0, 0]] = 0.3;
    let isolevel = 0.6;

    let extractor = MarchingCubes::new();
    let forward = |grid: ArrayView3<'_, f64>, isolevel: f64| -> f64 {
        extractor.extract(grid, isolevel).unwrap().iter().sum()
    };

    let triangles = extractor.extract(grid.view(), isolevel).unwrap();
    let ones = Array3::from_elem(triangles.dim(), 1.0);
    let (grid_gradients, isolevel_gradient) = extractor
        .gradients(grid.view(), isolevel, ones.view())
        .unwrap();

    let eps = 1e-6;
    for x in 0..2 {
        for y in 0..2 {
            for z in 0..2 {
                let mut plus = grid.clone();
                plus[[x, y, z]] += eps;
                let mut minus = grid.clone();
                minus[[x, y, z]] -= eps;
                let estimate =
                    (forward(plus.view(), isolevel) - forward(minus.view(), isolevel))
                        / (2.0 * eps);
                assert_relative_eq!(
                    grid_gradients[[x, y, z]],
                    estimate,
                    epsilon = 1e-5,
                    max_relative = 1e-4
                );
            }
        }
    }

    let estimate = (forward(grid.view(), isolevel + eps) - forward(grid.view(), isolevel - eps))
        / (2.0 * eps);
    assert_relative_eq!(isolevel_gradient, estimate, epsilon = 1e-5, max_relative = 1e-4);
}

#[test]
fn test_gradients_on_empty_surface() {
    let grid = Array3::from_elem((3, 3, 3), 5.0f64);
    let empty = Array3::zeros((0, 3, 3));
    let (grid_gradients, isolevel_gradient) = MarchingCubes::new()
        .gradients(grid.view(), 1.0, empty.view())
        .unwrap();
    assert!(grid_gradients.iter().all(|&g| g == 0.0));
    assert_eq!(isolevel_gradient, 0.0);
}
