//! Numeric backend selection
//!
//! The per-frame level math (RMS, peak) runs through a strategy trait with
//! two implementations: a portable reference implementation and, where the
//! platform provides one, a hardware-accelerated path. The backend is picked
//! once at first use; if the accelerated path is unavailable the choice is
//! logged a single time and the reference implementation serves for the
//! remainder of the process. Both implementations are numerically
//! equivalent within floating-point tolerance.

use once_cell::sync::OnceCell;
use tracing::info;

/// Bulk numeric operations used by the frame pipeline
pub trait NumericBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Root-mean-square amplitude of the buffer
    fn rms(&self, samples: &[f32]) -> f32;

    /// Peak absolute amplitude of the buffer
    fn peak(&self, samples: &[f32]) -> f32;
}

/// Portable reference implementation
pub struct ReferenceBackend;

impl NumericBackend for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn rms(&self, samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = samples.iter().map(|&x| x * x).sum();
        (sum / samples.len() as f32).sqrt()
    }

    fn peak(&self, samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }
}

static REFERENCE: ReferenceBackend = ReferenceBackend;

#[cfg(target_os = "macos")]
mod accelerate {
    //! Accelerate framework bindings (vDSP)

    use super::NumericBackend;

    #[allow(non_camel_case_types)]
    type vDSP_Stride = std::os::raw::c_int;
    #[allow(non_camel_case_types)]
    type vDSP_Length = usize;

    #[link(name = "Accelerate", kind = "framework")]
    extern "C" {
        // Mean of squares
        fn vDSP_measqv(a: *const f32, stride: vDSP_Stride, result: *mut f32, n: vDSP_Length);

        // Maximum magnitude
        fn vDSP_maxmgv(a: *const f32, stride: vDSP_Stride, result: *mut f32, n: vDSP_Length);
    }

    pub struct AccelerateBackend;

    impl NumericBackend for AccelerateBackend {
        fn name(&self) -> &'static str {
            "accelerate"
        }

        fn rms(&self, samples: &[f32]) -> f32 {
            if samples.is_empty() {
                return 0.0;
            }
            let mut mean_sq: f32 = 0.0;
            unsafe {
                vDSP_measqv(samples.as_ptr(), 1, &mut mean_sq, samples.len());
            }
            mean_sq.sqrt()
        }

        fn peak(&self, samples: &[f32]) -> f32 {
            if samples.is_empty() {
                return 0.0;
            }
            let mut peak: f32 = 0.0;
            unsafe {
                vDSP_maxmgv(samples.as_ptr(), 1, &mut peak, samples.len());
            }
            peak
        }
    }

    pub static ACCELERATE: AccelerateBackend = AccelerateBackend;
}

#[cfg(target_os = "macos")]
fn accelerated_backend() -> Option<&'static dyn NumericBackend> {
    Some(&accelerate::ACCELERATE)
}

#[cfg(not(target_os = "macos"))]
fn accelerated_backend() -> Option<&'static dyn NumericBackend> {
    None
}

/// The process-wide numeric backend
///
/// Selection happens on first call and is idempotent; later calls return
/// the same instance.
pub fn numeric_backend() -> &'static dyn NumericBackend {
    static BACKEND: OnceCell<&'static dyn NumericBackend> = OnceCell::new();

    *BACKEND.get_or_init(|| match accelerated_backend() {
        Some(backend) => {
            info!("using accelerated numeric backend: {}", backend.name());
            backend
        }
        None => {
            info!("accelerated numeric backend unavailable, using reference implementation");
            &REFERENCE
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_reference_rms_of_unit_sine() {
        let samples: Vec<f32> = (0..4096)
            .map(|i| (2.0 * PI * 441.0 * i as f32 / 44100.0).sin())
            .collect();
        let rms = ReferenceBackend.rms(&samples);
        assert!(
            (rms - 1.0 / 2.0f32.sqrt()).abs() < 1e-3,
            "Expected 1/sqrt(2), got {}",
            rms
        );
    }

    #[test]
    fn test_reference_rms_empty() {
        assert_eq!(ReferenceBackend.rms(&[]), 0.0);
    }

    #[test]
    fn test_reference_peak() {
        assert_eq!(ReferenceBackend.peak(&[0.25, -0.75, 0.5]), 0.75);
        assert_eq!(ReferenceBackend.peak(&[]), 0.0);
    }

    #[test]
    fn test_backend_is_stable_across_calls() {
        let a = numeric_backend().name();
        let b = numeric_backend().name();
        assert_eq!(a, b);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_accelerated_matches_reference() {
        // Deterministic pseudo-random buffer
        let mut state = 0x12345678u32;
        let samples: Vec<f32> = (0..2048)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        let reference = ReferenceBackend;
        let accelerated = accelerated_backend().expect("accelerate available on macos");

        assert!((reference.rms(&samples) - accelerated.rms(&samples)).abs() < 1e-5);
        assert!((reference.peak(&samples) - accelerated.peak(&samples)).abs() < 1e-6);
    }
}
