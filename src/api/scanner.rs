//! 闪烁扫描器

use log::{error, info};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::{OutputTarget, ScanSettings};
use crate::core::scan::source::is_image_path;
use crate::core::scan::{
    FileSink, FrameSource, Geometry, ImageSequenceSource, ProgressReporter, ResultSink, ScanError,
    ScanLoop, ScanSummary, StdoutSink,
};

/// 闪烁扫描器 - 打开输入、构建扫描循环、管理输出生命周期
///
/// ```no_run
/// use flashscan::api::FlashScanner;
/// use flashscan::config::{OutputTarget, ScanSettings};
///
/// let scanner = FlashScanner::create(ScanSettings::default());
/// let geometry = "120x40+16+900".parse().unwrap();
/// let summary = scanner
///     .scan("stream.mp4".as_ref(), geometry, &OutputTarget::Stdout)
///     .unwrap();
/// println!("{} detections", summary.detections);
/// ```
pub struct FlashScanner {
    settings: ScanSettings,
    cancel: Arc<AtomicBool>,
}

impl FlashScanner {
    pub fn create(settings: ScanSettings) -> Self {
        info!("🎬 FlashScanner: created");
        Self {
            settings,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Setting this flag stops a running scan before its next frame.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Still images and image directories decode through `image`; anything else
    /// is treated as a video file.
    pub fn open_source(input: &Path) -> Result<Box<dyn FrameSource>, ScanError> {
        if input.is_dir() || is_image_path(input) {
            let source = ImageSequenceSource::open(input).map_err(ScanError::SourceOpen)?;
            return Ok(Box::new(source));
        }

        #[cfg(feature = "ffmpeg")]
        {
            let source =
                crate::core::scan::FfmpegSource::open(input).map_err(ScanError::SourceOpen)?;
            Ok(Box::new(source))
        }
        #[cfg(not(feature = "ffmpeg"))]
        {
            Err(ScanError::SourceOpen(crate::core::scan::SourceError::Decode(format!(
                "{}: video input requires the ffmpeg feature",
                input.display()
            ))))
        }
    }

    pub fn open_sink(target: &OutputTarget) -> Result<Box<dyn ResultSink>, ScanError> {
        match target {
            OutputTarget::File(path) => {
                info!("📝 Writing results to {}", path.display());
                Ok(Box::new(FileSink::create(path)?))
            }
            OutputTarget::Stdout => Ok(Box::new(StdoutSink::stdout())),
        }
    }

    fn build_loop(&self, source: &dyn FrameSource, geometry: Geometry) -> Result<ScanLoop, ScanError> {
        let scan = ScanLoop::for_source(
            source,
            geometry,
            self.settings.start_frame,
            self.settings.detector()?,
            self.settings.classifier()?,
        )?;
        Ok(scan.with_cancel_flag(self.cancel_flag()))
    }

    fn run_loop(
        &self,
        scan: &ScanLoop,
        source: &mut dyn FrameSource,
        sink: &mut dyn ResultSink,
    ) -> Result<ScanSummary, ScanError> {
        let mut reporter = ProgressReporter::new(scan.range().len(), self.settings.report_interval());
        scan.run(source, sink, &mut reporter)
    }

    /// Scans `source` into `sink`. The sink stays open.
    pub fn scan_source(
        &self,
        source: &mut dyn FrameSource,
        geometry: Geometry,
        sink: &mut dyn ResultSink,
    ) -> Result<ScanSummary, ScanError> {
        let scan = self.build_loop(source, geometry)?;
        self.run_loop(&scan, source, sink)
    }

    /// Opens input and output, scans, then closes the output even when the
    /// scan failed so every record already written stays on disk.
    pub fn scan(
        &self,
        input: &Path,
        geometry: Geometry,
        output: &OutputTarget,
    ) -> Result<ScanSummary, ScanError> {
        let mut source = Self::open_source(input)?;
        // configuration problems surface before the output file is touched
        let scan = self.build_loop(source.as_ref(), geometry)?;

        let mut sink = Self::open_sink(output)?;
        let result = self.run_loop(&scan, source.as_mut(), sink.as_mut());
        let closed = sink.close();

        match (result, closed) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    error!("❌ Failed to close output after scan error: {}", close_err);
                }
                Err(e)
            }
        }
    }
}

impl Drop for FlashScanner {
    fn drop(&mut self) {
        info!("🗑️ FlashScanner: released");
    }
}
