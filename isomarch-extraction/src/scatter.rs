//! Expansion of post-scan offsets into the ordered triangle-index list

use crate::backend::DisjointSlice;
use isomarch_core::{Backend, TriangleIndex};

/// Expand per-cell offsets into the explicit `(cell, local)` list.
///
/// Cell `i` owns `offsets[i+1] - offsets[i]` triangles (`total - offsets[i]`
/// for the last cell) and writes them consecutively starting at its own
/// offset, so output ranges are disjoint and the resulting list is sorted by
/// cell, then by local ordinal. Cells with zero triangles write nothing.
pub fn scatter_triangle_indices<B: Backend>(
    offsets: &[i64],
    total_triangles: i64,
    backend: &B,
) -> Vec<TriangleIndex> {
    let mut indices = vec![TriangleIndex::default(); total_triangles as usize];
    {
        let out = DisjointSlice::new(&mut indices);
        backend.dispatch(offsets.len(), |cell| {
            let start = offsets[cell];
            let count = if cell + 1 < offsets.len() {
                offsets[cell + 1] - start
            } else {
                total_triangles - start
            };
            for local in 0..count {
                // Safety: the scan makes per-cell output ranges disjoint.
                unsafe {
                    out.write(
                        (start + local) as usize,
                        TriangleIndex::new(cell as i64, local),
                    )
                };
            }
        });
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{StridedBackend, ThreadPoolBackend};
    use crate::scan::SequentialScan;
    use isomarch_core::ExclusiveScan;

    fn scatter_from_counts(counts: &[i64], backend: &impl Backend) -> Vec<TriangleIndex> {
        let mut offsets = counts.to_vec();
        let total = SequentialScan.scan(&mut offsets);
        scatter_triangle_indices(&offsets, total, backend)
    }

    #[test]
    fn test_ordering_contract() {
        let backend = ThreadPoolBackend::new().with_min_chunk(1);
        let indices = scatter_from_counts(&[2, 0, 3, 1], &backend);

        let expected: Vec<TriangleIndex> = [(0, 0), (0, 1), (2, 0), (2, 1), (2, 2), (3, 0)]
            .iter()
            .map(|&(cell, local)| TriangleIndex::new(cell, local))
            .collect();
        assert_eq!(indices, expected);
    }

    #[test]
    fn test_length_matches_total() {
        let backend = StridedBackend::new(3);
        let counts: Vec<i64> = (0..500).map(|i| i % 6).collect();
        let indices = scatter_from_counts(&counts, &backend);
        assert_eq!(indices.len(), counts.iter().sum::<i64>() as usize);

        // Sorted by cell, then local; locals dense from zero.
        for window in indices.windows(2) {
            let (a, b) = (window[0], window[1]);
            assert!(a.cell <= b.cell);
            if a.cell == b.cell {
                assert_eq!(b.local, a.local + 1);
            } else {
                assert_eq!(b.local, 0);
            }
        }
    }

    #[test]
    fn test_no_cells_no_triangles() {
        let backend = ThreadPoolBackend::new();
        assert!(scatter_triangle_indices(&[], 0, &backend).is_empty());
    }
}
