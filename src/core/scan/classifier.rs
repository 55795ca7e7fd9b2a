use super::error::ConfigError;

pub const DEFAULT_THRESHOLD: f64 = 250.0;

/// `true` when the score meets the threshold. The boundary is inclusive.
#[inline]
pub fn is_triggered(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Fixed-threshold classifier, one per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventClassifier {
    threshold: f64,
}

impl EventClassifier {
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_triggered(&self, score: f64) -> bool {
        is_triggered(score, self.threshold)
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
