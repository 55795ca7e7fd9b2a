use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::classifier::EventClassifier;
use super::error::{ConfigError, ScanError, SourceError};
use super::geometry::Geometry;
use super::progress::{ProgressReporter, ScanCounters};
use super::region::RegionExtractor;
use super::signal::SignalDetector;
use super::sink::{DetectionRecord, ResultSink};
use super::source::FrameSource;

/// `[start_frame, total_frames)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub start_frame: u64,
    pub total_frames: u64,
}

impl ScanRange {
    pub fn new(start_frame: u64, total_frames: u64) -> Result<Self, ConfigError> {
        if start_frame > total_frames {
            return Err(ConfigError::StartBeyondEnd {
                start_frame,
                total_frames,
            });
        }
        Ok(Self {
            start_frame,
            total_frames,
        })
    }

    pub fn len(&self) -> u64 {
        self.total_frames - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub frames_processed: u64,
    pub detections: u64,
    pub elapsed: Duration,
    /// Index of the next frame that would have been scanned.
    pub next_frame: u64,
    pub stop: StopReason,
}

impl ScanSummary {
    pub fn is_complete(&self) -> bool {
        self.stop == StopReason::Completed
    }
}

/// 扫描主循环 - 取帧 → 裁剪 → 打分 → 判定 → 输出
///
/// Geometry and range are validated when the loop is built, so a bad
/// configuration fails before any frame is decoded.
pub struct ScanLoop {
    extractor: RegionExtractor,
    detector: SignalDetector,
    classifier: EventClassifier,
    range: ScanRange,
    cancel: Option<Arc<AtomicBool>>,
}

impl ScanLoop {
    pub fn new(
        geometry: Geometry,
        frame_size: (u32, u32),
        range: ScanRange,
        detector: SignalDetector,
        classifier: EventClassifier,
    ) -> Result<Self, ConfigError> {
        let extractor = RegionExtractor::new(geometry, frame_size.0, frame_size.1)?;
        Ok(Self {
            extractor,
            detector,
            classifier,
            range,
            cancel: None,
        })
    }

    /// Builds the loop for the full remaining length of `source`.
    pub fn for_source(
        source: &dyn FrameSource,
        geometry: Geometry,
        start_frame: u64,
        detector: SignalDetector,
        classifier: EventClassifier,
    ) -> Result<Self, ConfigError> {
        let range = ScanRange::new(start_frame, source.total_frames())?;
        Self::new(geometry, source.dimensions(), range, detector, classifier)
    }

    /// The loop stops between frames once the flag is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn range(&self) -> ScanRange {
        self.range
    }

    pub fn geometry(&self) -> &Geometry {
        self.extractor.geometry()
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Runs the scan. The sink is written but never closed here.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn ResultSink,
        reporter: &mut ProgressReporter,
    ) -> Result<ScanSummary, ScanError> {
        let range = self.range;
        let mut counters = ScanCounters::new(Instant::now());
        let mut detections = 0u64;

        info!(
            "🔍 Scanning frames {}..{} in {}",
            range.start_frame,
            range.total_frames,
            self.extractor.geometry()
        );

        if !range.is_empty() {
            source
                .seek(range.start_frame)
                .map_err(|source| ScanError::SourceFault {
                    frame_index: range.start_frame,
                    source,
                })?;
        }

        let mut frame_index = range.start_frame;
        let mut stop = StopReason::Completed;

        while frame_index < range.total_frames {
            if self.cancelled() {
                warn!("⏹️ Scan interrupted before frame {}", frame_index);
                stop = StopReason::Interrupted;
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    return Err(ScanError::SourceExhausted {
                        frame_index,
                        total_frames: range.total_frames,
                    })
                }
                Err(source) => {
                    return Err(ScanError::SourceFault {
                        frame_index,
                        source,
                    })
                }
            };

            if !self.extractor.matches_frame(&frame) {
                let (width, height) = self.extractor.frame_size();
                return Err(ScanError::SourceFault {
                    frame_index,
                    source: SourceError::DimensionMismatch {
                        width,
                        height,
                        actual_width: frame.width,
                        actual_height: frame.height,
                    },
                });
            }

            let region = self.extractor.extract(&frame);
            let score = self.detector.score(&region);

            if self.classifier.is_triggered(score) {
                debug!("✨ Frame {} triggered with score {}", frame_index, score);
                sink.write(&DetectionRecord { frame_index, score })?;
                detections += 1;
            }

            counters.record_frame();
            if let Some(line) = reporter.observe(&mut counters, Instant::now()) {
                info!("{}", line);
            }

            frame_index += 1;
        }

        let summary = ScanSummary {
            frames_processed: counters.total_processed,
            detections,
            elapsed: counters.elapsed(Instant::now()),
            next_frame: frame_index,
            stop,
        };

        info!(
            "✅ Scanned {} frames in {:.1}s, {} detections",
            summary.frames_processed,
            summary.elapsed.as_secs_f64(),
            summary.detections
        );

        Ok(summary)
    }
}
