use std::fmt;
use std::time::{Duration, Instant};

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// 扫描计数器 - 由扫描循环独占，进度报告器只在 observe 时借用
#[derive(Debug, Clone)]
pub struct ScanCounters {
    pub total_processed: u64,
    pub processed_since_last_report: u64,
    pub run_start_time: Instant,
    pub last_report_time: Instant,
}

impl ScanCounters {
    pub fn new(now: Instant) -> Self {
        Self {
            total_processed: 0,
            processed_since_last_report: 0,
            run_start_time: now,
            last_report_time: now,
        }
    }

    pub fn record_frame(&mut self) {
        self.total_processed += 1;
        self.processed_since_last_report += 1;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.run_start_time)
    }
}

/// One progress report.
///
/// `percent`, `total` and `eta` count only the frames this run scans
/// (`total_frames - start_frame`), so a resumed scan starts at 0% rather than
/// at the share of the video already covered.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub percent: f64,
    pub processed: u64,
    /// Frames in the scanned range.
    pub total: u64,
    pub since_last: u64,
    pub frames_per_second: f64,
    /// `None` when nothing was processed during the interval.
    pub eta: Option<Duration>,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% ({}/{} frames, +{}) {:.1} fps, ETA ",
            self.percent, self.processed, self.total, self.since_last, self.frames_per_second
        )?;
        match self.eta {
            Some(eta) => write!(f, "{}", format_duration(eta)),
            None => write!(f, "unavailable"),
        }
    }
}

/// Renders `H:MM:SS`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// 进度报告器 - 按墙钟间隔输出速率与剩余时间，不影响扫描流程
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    frames_to_scan: u64,
    interval: Duration,
}

impl ProgressReporter {
    /// `frames_to_scan` is the length of the scanned range (`total - start`).
    pub fn new(frames_to_scan: u64, interval: Duration) -> Self {
        Self {
            frames_to_scan,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn observe(&mut self, counters: &mut ScanCounters, now: Instant) -> Option<ReportLine> {
        let window = now.saturating_duration_since(counters.last_report_time);
        if window < self.interval {
            return None;
        }

        let since_last = counters.processed_since_last_report;
        let window_secs = window.as_secs_f64();
        let frames_per_second = if window_secs > 0.0 {
            since_last as f64 / window_secs
        } else {
            0.0
        };

        let remaining = self.frames_to_scan.saturating_sub(counters.total_processed);
        let eta = if frames_per_second > 0.0 {
            Some(Duration::from_secs_f64(remaining as f64 / frames_per_second))
        } else {
            None
        };

        let percent = if self.frames_to_scan == 0 {
            100.0
        } else {
            counters.total_processed as f64 / self.frames_to_scan as f64 * 100.0
        };

        counters.processed_since_last_report = 0;
        counters.last_report_time = now;

        Some(ReportLine {
            percent,
            processed: counters.total_processed,
            total: self.frames_to_scan,
            since_last,
            frames_per_second,
            eta,
        })
    }
}
