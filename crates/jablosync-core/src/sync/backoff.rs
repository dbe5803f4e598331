use std::time::Duration;

/// Exponential backoff for failed poll cycles.
///
/// After `n` consecutive failures the next cycle waits
/// `min(base * 2^n, max)`. With no failures it waits `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    /// Delay before the next cycle given the current failure streak.
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        // 2^16 * any sane base is far beyond any sane max.
        let factor = 1u32 << consecutive_failures.min(16);
        self.base.saturating_mul(factor).min(self.max)
    }
}
