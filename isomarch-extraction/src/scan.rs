//! Exclusive prefix-sum implementations
//!
//! The scan is the pipeline's single synchronization barrier: every consumer
//! of post-scan offsets observes the fully completed scan. Both
//! implementations satisfy the same contract and are interchangeable.

use isomarch_core::ExclusiveScan;
use rayon::prelude::*;

/// Straightforward sequential exclusive scan.
///
/// The running sum starts from an explicit zero, so the first output element
/// is always 0 and the reported total never contains garbage.
pub struct SequentialScan;

impl ExclusiveScan for SequentialScan {
    fn scan(&self, counts: &mut [i64]) -> i64 {
        let mut running = 0i64;
        for count in counts.iter_mut() {
            let value = *count;
            *count = running;
            running += value;
        }
        running
    }
}

/// Three-phase multi-block parallel exclusive scan.
///
/// Phase 1 scans each block independently and records the block totals,
/// phase 2 scans the block totals sequentially, phase 3 adds each block's
/// base offset back in. Equivalent to [`SequentialScan`] for every input.
pub struct BlockedScan {
    block_size: usize,
}

impl BlockedScan {
    pub fn new() -> Self {
        Self { block_size: 4096 }
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }
}

impl Default for BlockedScan {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusiveScan for BlockedScan {
    fn scan(&self, counts: &mut [i64]) -> i64 {
        if counts.len() <= self.block_size {
            return SequentialScan.scan(counts);
        }

        let mut block_totals: Vec<i64> = counts
            .par_chunks_mut(self.block_size)
            .map(|block| SequentialScan.scan(block))
            .collect();

        let total = SequentialScan.scan(&mut block_totals);

        counts
            .par_chunks_mut(self.block_size)
            .zip(block_totals.par_iter())
            .for_each(|(block, &base)| {
                for offset in block.iter_mut() {
                    *offset += base;
                }
            });

        total
    }
}
