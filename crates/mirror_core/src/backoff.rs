use std::time::Duration;

/// Exponential retry delay with optional bounded jitter.
///
/// The delay after failed attempt `n` (1-based) is `base * 2^n`, plus up to the
/// same amount again when jitter is on, clamped to `cap`. The jitter is always
/// smaller than the exponential step, so successive delays never shrink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    pub base: Duration,
    pub cap: Duration,
    pub jitter: bool,
}

const MAX_EXPONENT: u32 = 20;

impl BackoffSchedule {
    pub fn new(base: Duration, cap: Duration, jitter: bool) -> Self {
        Self { base, cap, jitter }
    }

    /// `jitter_sample` is expected in `[0, 1)`; values outside are clamped.
    pub fn delay_for(&self, attempt: u32, jitter_sample: f64) -> Duration {
        let factor = 1u32 << attempt.min(MAX_EXPONENT);
        let step = self.base.saturating_mul(factor).min(self.cap);
        let jitter = if self.jitter {
            step.mul_f64(jitter_sample.clamp(0.0, 0.999))
        } else {
            Duration::ZERO
        };
        step.saturating_add(jitter).min(self.cap)
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(60),
            jitter: true,
        }
    }
}
