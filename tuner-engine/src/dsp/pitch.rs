//! YIN pitch estimation
//!
//! Time-domain pitch detection over a fixed analysis window: squared
//! difference function, cumulative-mean-normalized difference (CMNDF),
//! absolute threshold with local-minimum refinement, then parabolic
//! interpolation for sub-sample accuracy. "No pitch" is an expected result
//! for silence, noise, or out-of-range input and is reported as `None`,
//! never as an error.

use crate::config::AnalysisConfig;

/// YIN pitch detector for one capture session
///
/// Holds the tuning parameters and reusable scratch buffers; `detect` runs
/// once per frame on the mono analysis window.
///
/// # Example
/// ```
/// use tuner_engine::config::AnalysisConfig;
/// use tuner_engine::dsp::pitch::PitchDetector;
///
/// let config = AnalysisConfig::default();
/// let mut detector = PitchDetector::new(44_100, &config);
///
/// let silence = vec![0.0f32; 2048];
/// assert_eq!(detector.detect(&silence, 0.0), None);
/// ```
pub struct PitchDetector {
    sample_rate: f32,
    threshold: f32,
    min_frequency: f32,
    max_frequency: f32,
    noise_gate: f32,
    difference: Vec<f32>,
    cmndf: Vec<f32>,
}

impl PitchDetector {
    /// Create a detector for the given device sample rate
    pub fn new(sample_rate: u32, config: &AnalysisConfig) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            threshold: config.yin_threshold,
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            noise_gate: config.noise_gate,
            difference: Vec::new(),
            cmndf: Vec::new(),
        }
    }

    /// Estimate the fundamental frequency of the window, in Hz
    ///
    /// `rms` is the window's root-mean-square amplitude, computed by the
    /// caller (the frame pipeline already needs it for the volume display).
    /// Detection is skipped entirely when it falls below the noise gate.
    pub fn detect(&mut self, samples: &[f32], rms: f32) -> Option<f32> {
        let half = samples.len() / 2;
        if half < 3 {
            return None;
        }

        // Noise gate: below the floor, any estimate would be spurious
        if rms < self.noise_gate {
            return None;
        }

        self.difference_function(samples, half);
        self.normalize(half);

        let tau = self.absolute_threshold(half)?;
        let interpolated = self.interpolate(tau, half);

        let frequency = self.sample_rate / interpolated;
        if !frequency.is_finite()
            || frequency < self.min_frequency
            || frequency > self.max_frequency
        {
            return None;
        }

        Some(frequency)
    }

    /// d(tau) = sum over i of (x[i] - x[i+tau])^2
    fn difference_function(&mut self, samples: &[f32], half: usize) {
        self.difference.clear();
        self.difference.resize(half, 0.0);

        for tau in 1..half {
            let mut sum = 0.0f32;
            for i in 0..half {
                let delta = samples[i] - samples[i + tau];
                sum += delta * delta;
            }
            self.difference[tau] = sum;
        }
    }

    /// cmndf(tau) = d(tau) * tau / running_sum(d), cmndf(0) = 1
    fn normalize(&mut self, half: usize) {
        self.cmndf.clear();
        self.cmndf.resize(half, 0.0);
        self.cmndf[0] = 1.0;

        let mut running_sum = 0.0f32;
        for tau in 1..half {
            running_sum += self.difference[tau];
            self.cmndf[tau] = if running_sum > 0.0 {
                self.difference[tau] * tau as f32 / running_sum
            } else {
                1.0
            };
        }
    }

    /// First tau with cmndf below the threshold, walked to its local minimum
    fn absolute_threshold(&self, half: usize) -> Option<usize> {
        for tau in 2..half {
            if self.cmndf[tau] < self.threshold {
                let mut min_tau = tau;
                while min_tau + 1 < half && self.cmndf[min_tau + 1] < self.cmndf[min_tau] {
                    min_tau += 1;
                }
                return Some(min_tau);
            }
        }
        None
    }

    /// Parabolic interpolation around tau; at a window boundary, fall back
    /// to comparing the endpoint against its one in-range neighbor
    fn interpolate(&self, tau: usize, half: usize) -> f32 {
        if tau >= 1 && tau + 1 < half {
            let s0 = self.cmndf[tau - 1];
            let s1 = self.cmndf[tau];
            let s2 = self.cmndf[tau + 1];
            let denominator = 2.0 * s1 - s2 - s0;
            if denominator.abs() > f32::EPSILON {
                return tau as f32 + (s2 - s0) / (2.0 * denominator);
            }
            return tau as f32;
        }

        if tau + 1 < half {
            // Left boundary: keep whichever endpoint is smaller
            if self.cmndf[tau] <= self.cmndf[tau + 1] {
                tau as f32
            } else {
                (tau + 1) as f32
            }
        } else if tau >= 1 {
            // Right boundary
            if self.cmndf[tau] <= self.cmndf[tau - 1] {
                tau as f32
            } else {
                (tau - 1) as f32
            }
        } else {
            tau as f32
        }
    }
}

/// Clarity of the dominant periodicity, in [0, 1]
///
/// Normalized autocorrelation peak over the lag range corresponding to the
/// frequency band. A pure tone approaches 1.0; noise stays near 0.
pub fn clarity(samples: &[f32], sample_rate: f32, min_frequency: f32, max_frequency: f32) -> f32 {
    let half = samples.len() / 2;
    if half < 2 {
        return 0.0;
    }

    let mut zero_lag = 0.0f32;
    for &x in &samples[..half] {
        zero_lag += x * x;
    }
    if zero_lag < f32::EPSILON {
        return 0.0;
    }

    let min_tau = (sample_rate / max_frequency) as usize;
    let max_tau = ((sample_rate / min_frequency) as usize).min(half);

    let mut max_correlation = 0.0f32;
    for tau in min_tau..max_tau {
        let mut correlation = 0.0f32;
        for i in 0..(half - tau) {
            correlation += samples[i] * samples[i + tau];
        }
        if correlation > max_correlation {
            max_correlation = correlation;
        }
    }

    (max_correlation / zero_lag).clamp(0.0, 1.0)
}
