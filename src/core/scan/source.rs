//! Frame sources.
//!
//! A source yields RGB frames in index order starting at the position set by
//! `seek`. `Ok(None)` means the stream ended; the scan loop decides whether
//! that was expected.

use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::error::SourceError;
use super::frame::Frame;

pub trait FrameSource {
    /// `(width, height)` shared by every frame of the run.
    fn dimensions(&self) -> (u32, u32);

    fn total_frames(&self) -> u64;

    /// Position the source so the next frame returned is `frame_index`.
    fn seek(&mut self, frame_index: u64) -> Result<(), SourceError>;

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Video track length from container metadata.
///
/// Prefers the stored frame count, then the track duration, then the
/// container duration, each in seconds and multiplied by `frame_rate`.
/// Non-positive durations are treated as missing. `None` when no usable
/// figure is left, so callers never mistake an unknown length for an empty one.
pub fn estimate_frame_count(
    stored_frames: i64,
    track_seconds: f64,
    container_seconds: f64,
    frame_rate: f64,
) -> Option<u64> {
    if stored_frames > 0 {
        return Some(stored_frames as u64);
    }
    if !(frame_rate.is_finite() && frame_rate > 0.0) {
        return None;
    }

    [track_seconds, container_seconds]
        .into_iter()
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| (s * frame_rate).round() as u64)
        .find(|&n| n > 0)
}

/// In-memory frames. Useful for embedding and for tests.
pub struct MemorySource {
    frames: Vec<Frame>,
    width: u32,
    height: u32,
    declared_total: u64,
    position: u64,
    faults: HashSet<u64>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Result<Self, SourceError> {
        let first = frames
            .first()
            .ok_or_else(|| SourceError::Empty("memory".to_string()))?;
        let (width, height) = (first.width, first.height);

        if let Some(bad) = frames.iter().find(|f| f.width != width || f.height != height) {
            return Err(SourceError::DimensionMismatch {
                width,
                height,
                actual_width: bad.width,
                actual_height: bad.height,
            });
        }

        let declared_total = frames.len() as u64;
        Ok(Self {
            frames,
            width,
            height,
            declared_total,
            position: 0,
            faults: HashSet::new(),
        })
    }

    /// Claim more frames than are actually held, like a container whose
    /// header overstates its length.
    pub fn with_declared_total(mut self, total: u64) -> Self {
        self.declared_total = total;
        self
    }

    /// Fail with a decode error when `frame_index` is reached.
    pub fn with_fault_at(mut self, frame_index: u64) -> Self {
        self.faults.insert(frame_index);
        self
    }
}

impl FrameSource for MemorySource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn total_frames(&self) -> u64 {
        self.declared_total
    }

    fn seek(&mut self, frame_index: u64) -> Result<(), SourceError> {
        if frame_index > self.frames.len() as u64 {
            return Err(SourceError::SeekOutOfRange {
                target: frame_index,
                total: self.frames.len() as u64,
            });
        }
        self.position = frame_index;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.faults.contains(&self.position) {
            return Err(SourceError::Decode(format!(
                "corrupt frame {}",
                self.position
            )));
        }

        let frame = self.frames.get(self.position as usize).cloned().map(|mut f| {
            f.frame_number = self.position;
            f
        });
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }
}

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// 静态帧或图片序列 - 单个图片文件视为一帧，目录按文件名排序
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    width: u32,
    height: u32,
    position: u64,
}

impl ImageSequenceSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image_path(p))
                .collect();
            paths.sort();
            paths
        } else {
            vec![path.to_path_buf()]
        };

        let first = paths
            .first()
            .ok_or_else(|| SourceError::Empty(path.display().to_string()))?;
        let (width, height) = image::image_dimensions(first)?;

        info!(
            "🖼️ ImageSequenceSource: {} frame(s) of {}x{} from {}",
            paths.len(),
            width,
            height,
            path.display()
        );

        Ok(Self {
            paths,
            width,
            height,
            position: 0,
        })
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn total_frames(&self) -> u64 {
        self.paths.len() as u64
    }

    fn seek(&mut self, frame_index: u64) -> Result<(), SourceError> {
        if frame_index > self.total_frames() {
            return Err(SourceError::SeekOutOfRange {
                target: frame_index,
                total: self.total_frames(),
            });
        }
        self.position = frame_index;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.paths.get(self.position as usize) else {
            return Ok(None);
        };

        debug!("Decoding {}", path.display());
        let image = image::open(path)?.to_rgb8();
        let (w, h) = image.dimensions();
        if (w, h) != (self.width, self.height) {
            return Err(SourceError::DimensionMismatch {
                width: self.width,
                height: self.height,
                actual_width: w,
                actual_height: h,
            });
        }

        let frame = Frame::from_rgb_image(image, self.position);
        self.position += 1;
        Ok(Some(frame))
    }
}
