//! Core data structures and traits for isomarch
//!
//! This crate provides the fundamental types for isosurface extraction over
//! regular 3D scalar grids: the scalar-width abstraction, cell-grid
//! addressing, triangle indexing, and the capability traits the extraction
//! pipeline is built against.

pub mod error;
pub mod grid;
pub mod scalar;
pub mod traits;
pub mod triangle;

pub use error::*;
pub use grid::*;
pub use scalar::*;
pub use traits::*;
pub use triangle::*;
