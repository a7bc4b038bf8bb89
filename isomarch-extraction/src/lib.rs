//! # isomarch extraction
//!
//! Parallel isosurface extraction over regular 3D scalar grids with a
//! differentiable backward pass.
//!
//! The forward pipeline runs in four stages: per-cell classification against
//! the classic 256-case lookup table, an exclusive prefix sum turning
//! per-cell triangle counts into write offsets, a scatter expanding the
//! offsets into the ordered triangle-index list, and per-triangle vertex
//! interpolation along cube edges. The backward pass reuses the same
//! classification and ordering to push triangle-vertex gradients back onto
//! the grid samples and the isolevel.

pub mod backend;
pub mod builder;
pub mod classify;
pub mod gradient;
pub mod ops;
pub mod scan;
pub mod scatter;
pub mod tables;

// Re-export commonly used items
pub use backend::{StridedBackend, ThreadPoolBackend};
pub use builder::{build_triangles, compute_triangle};
pub use classify::{cell_code, count_cell_triangles, count_triangles_in_cell};
pub use gradient::accumulate_gradients;
pub use ops::{marching_cubes, FixedIsolevel, MarchingCubes};
pub use scan::{BlockedScan, SequentialScan};
pub use scatter::scatter_triangle_indices;
