//! Backward pass: triangle-vertex gradients onto grid values and isolevel
//!
//! For each triangle the interpolation parameter `t` of its three edges is
//! recomputed exactly as in the forward pass, and the incoming vertex
//! gradient is chained through the closed-form partials of the interpolation
//! formula. Grid-corner contributions race across triangles (a corner is
//! shared by up to 8 cells), so they go through atomic adds; per-triangle
//! isolevel partials are written to disjoint slots and reduced in a fixed
//! sequential order afterwards, which makes the isolevel gradient
//! deterministic. Grid gradients are exact up to floating-point summation
//! order.

use crate::backend::DisjointSlice;
use crate::builder::edge_parameter;
use crate::classify::cell_code;
use crate::tables::triangle_edges;
use isomarch_core::{Backend, CellLayout, Error, Result, Scalar, TriangleIndex, EDGE_CORNERS};
use ndarray::{Array3, ArrayView3};

/// Accumulate gradients for one triangle.
///
/// Adds the grid-corner contributions into `grid_cells` (atomically) and
/// returns the triangle's isolevel partial.
fn backpropagate_triangle<T: Scalar>(
    grid: &ArrayView3<'_, T>,
    layout: &CellLayout,
    isolevel: T,
    index: TriangleIndex,
    vertex_gradients: [[T; 3]; 3],
    grid_cells: &[T::Atomic],
) -> T {
    let cell = index.cell as usize;
    let coords = layout.cell_coords(cell);
    let code = cell_code(grid, layout, cell, isolevel);
    let edges = triangle_edges(code, index.local as usize);

    let mut isolevel_partial = T::zero();
    for (vertex, &edge) in edges.iter().enumerate() {
        let [a, b] = EDGE_CORNERS[edge];
        let pa = layout.corner_coords(coords, a);
        let pb = layout.corner_coords(coords, b);
        let va = grid[[pa[0], pa[1], pa[2]]];
        let vb = grid[[pb[0], pb[1], pb[2]]];

        let (_, differentiable) = edge_parameter(va, vb, isolevel);
        if !differentiable {
            // Degenerate edge or saturated clamp: t is locally constant.
            continue;
        }

        // d(vertex)/dt is the edge direction; chain with the incoming
        // vertex-position gradient.
        let mut loss_dt = T::zero();
        for axis in 0..3 {
            let direction = T::from_f64(pb[axis] as f64 - pa[axis] as f64);
            loss_dt = loss_dt + vertex_gradients[vertex][axis] * direction;
        }

        // t = (isolevel - va) / (vb - va) on the differentiable branch.
        let denom = vb - va;
        let dt_dva = (isolevel - vb) / (denom * denom);
        let dt_dvb = (va - isolevel) / (denom * denom);
        let dt_diso = T::one() / denom;

        T::atomic_add(&grid_cells[layout.sample_index(pa)], loss_dt * dt_dva);
        T::atomic_add(&grid_cells[layout.sample_index(pb)], loss_dt * dt_dvb);
        isolevel_partial = isolevel_partial + loss_dt * dt_diso;
    }
    isolevel_partial
}

/// Run the gradient pass over the scattered triangle list.
///
/// Both accumulators are zero-initialized here; the caller never sees a
/// partially written result.
pub fn accumulate_gradients<T: Scalar, B: Backend>(
    grid: &ArrayView3<'_, T>,
    layout: &CellLayout,
    isolevel: T,
    indices: &[TriangleIndex],
    triangle_gradients: &ArrayView3<'_, T>,
    backend: &B,
) -> Result<(Array3<T>, T)> {
    let grid_cells: Vec<T::Atomic> = (0..layout.sample_count()).map(|_| T::zero_cell()).collect();
    let mut isolevel_partials = vec![T::zero(); indices.len()];

    {
        let partials = DisjointSlice::new(&mut isolevel_partials);
        backend.dispatch(indices.len(), |i| {
            let mut incoming = [[T::zero(); 3]; 3];
            for vertex in 0..3 {
                for axis in 0..3 {
                    incoming[vertex][axis] = triangle_gradients[[i, vertex, axis]];
                }
            }
            let partial =
                backpropagate_triangle(grid, layout, isolevel, indices[i], incoming, &grid_cells);
            // Safety: one slot per triangle index.
            unsafe { partials.write(i, partial) };
        });
    }

    let [nx, ny, nz] = layout.dims();
    let values: Vec<T> = grid_cells.iter().map(|cell| T::atomic_load(cell)).collect();
    let grid_gradients = Array3::from_shape_vec((nx, ny, nz), values)
        .map_err(|e| Error::Algorithm(format!("Gradient buffer shape mismatch: {}", e)))?;

    // Fixed reduction order: triangle order, independent of scheduling.
    let isolevel_gradient = isolevel_partials
        .iter()
        .fold(T::zero(), |acc, &partial| acc + partial);

    Ok((grid_gradients, isolevel_gradient))
}
