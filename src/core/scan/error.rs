use thiserror::Error;

/// 配置错误 - 扫描开始前检出
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("geometry '{0}' is not in WxH+X+Y format")]
    MalformedGeometry(String),
    #[error("geometry {width}x{height} has no area")]
    EmptyGeometry { width: u32, height: u32 },
    #[error(
        "geometry {geometry} is out of bounds for a {frame_width}x{frame_height} frame"
    )]
    GeometryOutOfBounds {
        geometry: String,
        frame_width: u32,
        frame_height: u32,
    },
    #[error("start frame {start_frame} is beyond the total frame count {total_frames}")]
    StartBeyondEnd { start_frame: u64, total_frames: u64 },
    #[error("invalid detection threshold: {0}")]
    InvalidThreshold(f64),
    #[error("invalid signal band: {0}")]
    InvalidBand(String),
    #[error("invalid dilation kernel {width}x{height}")]
    InvalidKernel { width: usize, height: usize },
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[cfg(feature = "ffmpeg")]
    #[error("ffmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
    #[error("no frames found at {0}")]
    Empty(String),
    #[error("frame is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("seek to frame {target} failed: source holds {total} frames")]
    SeekOutOfRange { target: u64, total: u64 },
    #[error("{0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to open frame source: {0}")]
    SourceOpen(#[source] SourceError),
    #[error("frame source failed at frame {frame_index}: {source}")]
    SourceFault {
        frame_index: u64,
        #[source]
        source: SourceError,
    },
    #[error("frame source ran out at frame {frame_index}, expected {total_frames} frames")]
    SourceExhausted { frame_index: u64, total_frames: u64 },
    #[error("failed to write result: {0}")]
    SinkFault(#[source] std::io::Error),
}
