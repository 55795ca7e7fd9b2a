//! 画面闪烁检测 - 在固定区域内逐帧查找指定颜色的闪烁
//!
//! 核心流程：
//! 1. 区域裁剪 - 几何范围只校验一次
//! 2. 颜色掩码 - HSV 容差带（或旧版亮度阈值）
//! 3. 形态学膨胀 - 补上压缩造成的小缺口
//! 4. 归一化强度 + 固定阈值判定
//! 5. 逐条输出结果，定时输出进度

pub mod classifier;
pub mod error;
pub mod events;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_source;
pub mod frame;
pub mod geometry;
pub mod picker;
pub mod progress;
pub mod region;
pub mod scan_loop;
pub mod signal;
pub mod sink;
pub mod source;

pub use classifier::{is_triggered, EventClassifier, DEFAULT_THRESHOLD};
pub use error::{ConfigError, ScanError, SourceError};
pub use events::{collapse, read_records, DetectedEvent, SaveList};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg_source::FfmpegSource;
pub use frame::Frame;
pub use geometry::Geometry;
pub use picker::{GeometryPicker, PickerEvent, PickerState};
pub use progress::{ProgressReporter, ReportLine, ScanCounters, DEFAULT_REPORT_INTERVAL};
pub use region::{Region, RegionExtractor};
pub use scan_loop::{ScanLoop, ScanRange, ScanSummary, StopReason};
pub use signal::{Kernel, SignalBand, SignalDetector};
pub use sink::{DelimitedSink, DetectionRecord, FileSink, ResultSink, StdoutSink};
pub use source::{FrameSource, ImageSequenceSource, MemorySource};
