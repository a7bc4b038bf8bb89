//! Capability traits for the extraction pipeline
//!
//! The algorithm core is factored around two narrow abstractions: a
//! parallel-for over independent units of work, and an exclusive prefix sum.
//! Backends implementing [`Backend`] with different scheduling models must
//! produce identical results, since no stage carries an ordering dependency
//! between units of work.

/// Parallel-for over `units` independent units of work.
///
/// Implementations may run `op` on the unit indices in any order and on any
/// thread, but must have completed every unit before returning (fork-join).
/// `op` is only handed shared references, so stages that write do so through
/// disjoint targets or atomic accumulators.
pub trait Backend: Send + Sync {
    fn dispatch<F>(&self, units: usize, op: F)
    where
        F: Fn(usize) + Send + Sync;
}

/// Exclusive prefix sum over per-cell triangle counts.
///
/// Overwrites `counts` in place with the exclusive running sums (element `i`
/// becomes the sum of all elements strictly before `i`) and returns the grand
/// total. An empty slice yields 0. The running sum starts from an explicit
/// zero; the first output element is always 0.
pub trait ExclusiveScan: Send + Sync {
    fn scan(&self, counts: &mut [i64]) -> i64;
}
