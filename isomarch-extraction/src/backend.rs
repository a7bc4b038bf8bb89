//! Execution backends for the extraction pipeline
//!
//! Two scheduling models implement the same [`Backend`] contract with
//! identical semantics:
//!
//! - [`ThreadPoolBackend`] partitions the index space into contiguous ranges
//!   on a rayon pool (fork-join, blocking until all ranges complete).
//! - [`StridedBackend`] models a massively parallel device: a fixed number of
//!   execution units, each walking the index space with a stride equal to the
//!   unit count.
//!
//! No pipeline stage orders its units of work, so any interleaving produces
//! the same output.

use isomarch_core::{Backend, Error, Result};
use rayon::prelude::*;
use std::marker::PhantomData;

/// Below this many units the dispatch overhead dominates; run inline.
const SEQUENTIAL_CUTOFF: usize = 1024;

/// Fork-join backend over a rayon thread pool.
///
/// Uses the global rayon pool unless constructed with a dedicated one via
/// [`ThreadPoolBackend::with_threads`].
pub struct ThreadPoolBackend {
    pool: Option<rayon::ThreadPool>,
    min_chunk: usize,
}

impl ThreadPoolBackend {
    /// Backend on the global rayon pool.
    pub fn new() -> Self {
        Self {
            pool: None,
            min_chunk: SEQUENTIAL_CUTOFF,
        }
    }

    /// Backend on a dedicated pool with a fixed worker count.
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("isomarch-{}", index))
            .build()
            .map_err(|e| Error::Algorithm(format!("Failed to create thread pool: {}", e)))?;
        Ok(Self {
            pool: Some(pool),
            min_chunk: SEQUENTIAL_CUTOFF,
        })
    }

    /// Minimum contiguous range handed to one worker.
    pub fn with_min_chunk(mut self, min_chunk: usize) -> Self {
        self.min_chunk = min_chunk.max(1);
        self
    }
}

impl Default for ThreadPoolBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ThreadPoolBackend {
    fn dispatch<F>(&self, units: usize, op: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        if units < self.min_chunk {
            for i in 0..units {
                op(i);
            }
            return;
        }
        let run = || {
            (0..units)
                .into_par_iter()
                .with_min_len(self.min_chunk)
                .for_each(|i| op(i));
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

/// Grid-stride backend: a fixed number of execution units, each processing
/// indices `unit, unit + units, unit + 2*units, ...`.
///
/// This mirrors device-style dispatch where every logical unit of work is an
/// independent lightweight task strided over the physical execution units.
pub struct StridedBackend {
    units: usize,
}

impl StridedBackend {
    /// Backend with `units` physical execution units.
    pub fn new(units: usize) -> Self {
        Self {
            units: units.max(1),
        }
    }
}

impl Backend for StridedBackend {
    fn dispatch<F>(&self, units: usize, op: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        let workers = self.units.min(units);
        if workers <= 1 {
            for i in 0..units {
                op(i);
            }
            return;
        }
        let op = &op;
        std::thread::scope(|scope| {
            for unit in 0..workers {
                scope.spawn(move || {
                    let mut i = unit;
                    while i < units {
                        op(i);
                        i += workers;
                    }
                });
            }
        });
    }
}

/// Shared writable view over a slice whose writers target disjoint indices.
///
/// The scatter and builder stages reserve their output ranges up front (via
/// the prefix scan), so concurrent tasks never alias; this wrapper lets them
/// write through a shared reference.
pub(crate) struct DisjointSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// Safety: writers are handed disjoint indices by construction, and the
// borrow of the underlying slice outlives the dispatch.
unsafe impl<T: Send> Sync for DisjointSlice<'_, T> {}
unsafe impl<T: Send> Send for DisjointSlice<'_, T> {}

impl<'a, T> DisjointSlice<'a, T> {
    pub(crate) fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    /// Write `value` at `index`.
    ///
    /// # Safety
    /// No other task may write `index` during the same dispatch.
    pub(crate) unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.len);
        unsafe { self.ptr.add(index).write(value) };
    }
}
