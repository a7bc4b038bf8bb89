//! Triangle indexing for the compacted output ordering

/// Identifies one output triangle: which cell it belongs to and which of the
/// cell's (up to 5) triangles it is.
///
/// The scattered list of these pairs is sorted by `cell`, then by `local`;
/// that ordering is the externally observable output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriangleIndex {
    /// Linear cell index.
    pub cell: i64,
    /// Ordinal of the triangle within its cell, in `0..count`.
    pub local: i64,
}

impl TriangleIndex {
    pub fn new(cell: i64, local: i64) -> Self {
        Self { cell, local }
    }
}
