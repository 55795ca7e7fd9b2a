//! Video file source using FFmpeg.
//!
//! Frames are decoded in order and converted to RGB24. Seeking decodes and
//! discards frames instead of jumping to a keyframe so the index of every
//! returned frame is exact.

use ffmpeg_next as ffmpeg;
use log::{debug, info};
use std::path::Path;

use super::error::SourceError;
use super::frame::Frame;
use super::source::{estimate_frame_count, FrameSource};

const AV_TIME_BASE: f64 = 1_000_000.0;

pub struct FfmpegSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    width: u32,
    height: u32,
    total_frames: u64,
    position: u64,
    eof_sent: bool,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        ffmpeg::init()?;
        let input = ffmpeg::format::input(&path)?;
        let container_seconds = input.duration() as f64 / AV_TIME_BASE;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| SourceError::Decode(format!("{} has no video track", path.display())))?;
        let stream_index = stream.index();
        let total_frames = stream_frame_count(&stream, container_seconds).ok_or_else(|| {
            SourceError::Decode(format!(
                "{}: frame count unknown (no frame count, duration or frame rate)",
                path.display()
            ))
        })?;

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context.decoder().video()?;

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )?;

        let (width, height) = (decoder.width(), decoder.height());
        info!(
            "🎬 FfmpegSource: {} ({}x{}, {} frames)",
            path.display(),
            width,
            height,
            total_frames
        );

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            width,
            height,
            total_frames,
            position: 0,
            eof_sent: false,
        })
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == index)
            .map(|(_, packet)| packet)
    }

    fn decode_next(&mut self) -> Result<Option<ffmpeg::frame::Video>, SourceError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.eof_sent {
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }
}

fn stream_frame_count(
    stream: &ffmpeg::format::stream::Stream,
    container_seconds: f64,
) -> Option<u64> {
    let track_seconds = stream.duration() as f64 * f64::from(stream.time_base());
    let mut rate = f64::from(stream.avg_frame_rate());
    if rate.is_nan() || rate <= 0.0 {
        rate = f64::from(stream.rate());
    }
    estimate_frame_count(stream.frames(), track_seconds, container_seconds, rate)
}

impl FrameSource for FfmpegSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn seek(&mut self, frame_index: u64) -> Result<(), SourceError> {
        if frame_index < self.position {
            return Err(SourceError::Decode(format!(
                "cannot seek backwards from {} to {}",
                self.position, frame_index
            )));
        }

        debug!("Skipping {} frames", frame_index - self.position);
        while self.position < frame_index {
            if self.decode_next()?.is_none() {
                return Err(SourceError::SeekOutOfRange {
                    target: frame_index,
                    total: self.position,
                });
            }
            self.position += 1;
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(decoded) = self.decode_next()? else {
            return Ok(None);
        };

        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler.run(&decoded, &mut rgb)?;
        let pixels = frame_to_pixels(&rgb)?;

        let frame = Frame::new(rgb.width(), rgb.height(), pixels, self.position);
        self.position += 1;
        Ok(Some(frame))
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<Vec<u8>, SourceError> {
    let row_bytes = frame.width() as usize * 3;
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok(data[..row_bytes * height].to_vec());
    }

    let mut pixels = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let start = row * stride;
        let chunk = data
            .get(start..start + row_bytes)
            .ok_or_else(|| SourceError::Decode("ffmpeg frame row is out of bounds".into()))?;
        pixels.extend_from_slice(chunk);
    }
    Ok(pixels)
}
