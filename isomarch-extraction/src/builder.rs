//! Triangle construction by edge interpolation

use crate::backend::DisjointSlice;
use crate::classify::cell_code;
use crate::tables::triangle_edges;
use isomarch_core::{Backend, CellLayout, Error, Result, Scalar, TriangleIndex, EDGE_CORNERS};
use ndarray::{Array3, ArrayView3};

/// Interpolation parameter of the isosurface crossing along one edge.
///
/// `t = clamp((isolevel - v0) / (v1 - v0), 0, 1)`. A degenerate edge
/// (`v0 == v1`) pins `t` to 0.5 instead of dividing by zero. The returned
/// flag is true only on the differentiable branch: neither degenerate nor
/// saturated by the clamp.
pub(crate) fn edge_parameter<T: Scalar>(v0: T, v1: T, isolevel: T) -> (T, bool) {
    if v0 == v1 {
        return (T::from_f64(0.5), false);
    }
    let raw = (isolevel - v0) / (v1 - v0);
    if raw < T::zero() {
        (T::zero(), false)
    } else if raw > T::one() {
        (T::one(), false)
    } else {
        (raw, true)
    }
}

/// Compute the three vertices of one output triangle, in grid-local
/// continuous coordinates (cell origin plus a fractional offset along each
/// crossed edge).
pub fn compute_triangle<T: Scalar>(
    grid: &ArrayView3<'_, T>,
    layout: &CellLayout,
    isolevel: T,
    index: TriangleIndex,
) -> [[T; 3]; 3] {
    let cell = index.cell as usize;
    let coords = layout.cell_coords(cell);
    let code = cell_code(grid, layout, cell, isolevel);
    let edges = triangle_edges(code, index.local as usize);

    let mut vertices = [[T::zero(); 3]; 3];
    for (vertex, &edge) in edges.iter().enumerate() {
        let [a, b] = EDGE_CORNERS[edge];
        let pa = layout.corner_coords(coords, a);
        let pb = layout.corner_coords(coords, b);
        let va = grid[[pa[0], pa[1], pa[2]]];
        let vb = grid[[pb[0], pb[1], pb[2]]];
        let (t, _) = edge_parameter(va, vb, isolevel);
        for axis in 0..3 {
            let x0 = T::from_f64(pa[axis] as f64);
            let x1 = T::from_f64(pb[axis] as f64);
            vertices[vertex][axis] = x0 + t * (x1 - x0);
        }
    }
    vertices
}

/// Build the `[total, 3, 3]` triangle array for the scattered index list.
///
/// Independent across triangles; each writes its own 9-element row.
pub fn build_triangles<T: Scalar, B: Backend>(
    grid: &ArrayView3<'_, T>,
    layout: &CellLayout,
    isolevel: T,
    indices: &[TriangleIndex],
    backend: &B,
) -> Result<Array3<T>> {
    let mut triangles = Array3::zeros((indices.len(), 3, 3));
    {
        let flat = triangles
            .as_slice_mut()
            .ok_or_else(|| Error::Algorithm("Triangle buffer is not contiguous".to_string()))?;
        let out = DisjointSlice::new(flat);
        backend.dispatch(indices.len(), |i| {
            let vertices = compute_triangle(grid, layout, isolevel, indices[i]);
            for (vertex, components) in vertices.iter().enumerate() {
                for (axis, &component) in components.iter().enumerate() {
                    // Safety: triangle i owns the flat range 9i..9i+9.
                    unsafe { out.write(i * 9 + vertex * 3 + axis, component) };
                }
            }
        });
    }
    Ok(triangles)
}
