use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::scan::{
    ConfigError, EventClassifier, Kernel, SignalBand, SignalDetector, DEFAULT_THRESHOLD,
};

/// 扫描参数 - 可从 TOML 读取，命令行参数覆盖
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSettings {
    #[serde(default)]
    pub start_frame: u64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub band: SignalBand,
    #[serde(default = "default_kernel")]
    pub kernel: [usize; 2],
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            start_frame: 0,
            threshold: default_threshold(),
            report_interval_secs: default_report_interval_secs(),
            workers: default_workers(),
            band: SignalBand::default(),
            kernel: default_kernel(),
        }
    }
}

impl ScanSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn detector(&self) -> Result<SignalDetector, ConfigError> {
        let kernel = Kernel::ellipse(self.kernel[0], self.kernel[1])?;
        Ok(SignalDetector::new(self.band, kernel)?.with_workers(self.workers))
    }

    pub fn classifier(&self) -> Result<EventClassifier, ConfigError> {
        EventClassifier::new(self.threshold)
    }
}

/// Where detection records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

impl From<Option<PathBuf>> for OutputTarget {
    fn from(path: Option<PathBuf>) -> Self {
        path.map(OutputTarget::File).unwrap_or(OutputTarget::Stdout)
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_report_interval_secs() -> u64 {
    30
}
fn default_workers() -> usize {
    1
}
fn default_kernel() -> [usize; 2] {
    [2, 2]
}
