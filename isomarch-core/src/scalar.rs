//! Scalar-width abstraction for the extraction kernels
//!
//! The pipeline runs all of its arithmetic at the element width of the input
//! grid (16-, 32- or 64-bit floating point), while counts and indices stay
//! `i64`. Kernels are written once, generic over [`Scalar`], and instantiated
//! per width.

use half::f16;
use num_traits::Float;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};

/// Floating-point element type usable by the extraction kernels.
///
/// Extends [`num_traits::Float`] with exact conversions to/from `f64` and an
/// atomic accumulation cell of matching width. The atomic cell is what the
/// gradient pass uses for concurrent additive writes into shared buffers;
/// plain overwrites are never performed on shared accumulators.
pub trait Scalar: Float + Debug + Send + Sync + 'static {
    /// Atomic cell holding one value of this width as raw bits.
    type Atomic: Send + Sync;

    /// A new atomic cell initialized to zero.
    fn zero_cell() -> Self::Atomic;

    /// Convert a configuration-level `f64` into this width.
    fn from_f64(value: f64) -> Self;

    /// Widen to `f64` (for logging and tests).
    fn to_f64(self) -> f64;

    /// Atomically add `value` to `cell`.
    ///
    /// Implemented as a compare-exchange loop over the bit representation, so
    /// concurrent writers from any interleaving accumulate without loss. The
    /// summation order is unspecified.
    fn atomic_add(cell: &Self::Atomic, value: Self);

    /// Read the current value of an atomic cell.
    fn atomic_load(cell: &Self::Atomic) -> Self;
}

macro_rules! impl_scalar {
    ($float:ty, $atomic:ty, $from_bits:path, $to_f64:expr, $from_f64:expr) => {
        impl Scalar for $float {
            type Atomic = $atomic;

            fn zero_cell() -> Self::Atomic {
                // Positive zero is all-zero bits at every supported width.
                <$atomic>::new(0)
            }

            fn from_f64(value: f64) -> Self {
                $from_f64(value)
            }

            fn to_f64(self) -> f64 {
                $to_f64(self)
            }

            fn atomic_add(cell: &Self::Atomic, value: Self) {
                let mut current = cell.load(Ordering::Relaxed);
                loop {
                    let updated = ($from_bits(current) + value).to_bits();
                    match cell.compare_exchange_weak(
                        current,
                        updated,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(actual) => current = actual,
                    }
                }
            }

            fn atomic_load(cell: &Self::Atomic) -> Self {
                $from_bits(cell.load(Ordering::Relaxed))
            }
        }
    };
}

impl_scalar!(f16, AtomicU16, f16::from_bits, f16::to_f64, f16::from_f64);
impl_scalar!(f32, AtomicU32, f32::from_bits, f64::from, |v: f64| v as f32);
impl_scalar!(f64, AtomicU64, f64::from_bits, |v: f64| v, |v: f64| v);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_atomic_add_accumulates() {
        let cell = f32::zero_cell();
        f32::atomic_add(&cell, 1.5);
        f32::atomic_add(&cell, 2.25);
        assert_eq!(f32::atomic_load(&cell), 3.75);
    }

    #[test]
    fn test_atomic_add_concurrent() {
        let cell = f64::zero_cell();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        f64::atomic_add(&cell, 1.0);
                    }
                });
            }
        });
        assert_eq!(f64::atomic_load(&cell), 8000.0);
    }

    #[test]
    fn test_half_width_roundtrip() {
        let value = f16::from_f64(0.5);
        assert_relative_eq!(Scalar::to_f64(value), 0.5);

        let cell = f16::zero_cell();
        f16::atomic_add(&cell, value);
        f16::atomic_add(&cell, value);
        assert_relative_eq!(Scalar::to_f64(f16::atomic_load(&cell)), 1.0);
    }
}
