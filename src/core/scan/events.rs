//! 事件合并 - 把连续触发帧合并为一次事件，并导出网页使用的 saves 列表

use serde::Serialize;
use std::io::BufRead;

use super::error::SourceError;
use super::sink::{DetectionRecord, HEADER};

/// A run of triggering frames that belong to one on-screen flash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedEvent {
    pub first_frame: u64,
    pub last_frame: u64,
    pub peak_score: f64,
    pub frames: u64,
}

/// Parses `frame;value` lines. A header line and blank lines are skipped.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<DetectionRecord>, SourceError> {
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line == HEADER {
            continue;
        }

        let bad_line = || SourceError::Decode(format!("line {}: malformed record '{}'", line_no + 1, line));
        let (frame, value) = line.split_once(';').ok_or_else(bad_line)?;
        let frame_index = frame.trim().parse::<u64>().map_err(|_| bad_line())?;
        let score = value.trim().parse::<f64>().map_err(|_| bad_line())?;

        records.push(DetectionRecord { frame_index, score });
    }

    Ok(records)
}

/// Groups records whose frame indices are at most `max_gap` apart.
/// Records are expected in increasing frame order.
pub fn collapse(records: &[DetectionRecord], max_gap: u64) -> Vec<DetectedEvent> {
    let mut events: Vec<DetectedEvent> = Vec::new();

    for record in records {
        match events.last_mut() {
            Some(event) if record.frame_index.saturating_sub(event.last_frame) <= max_gap => {
                event.last_frame = record.frame_index;
                event.peak_score = event.peak_score.max(record.score);
                event.frames += 1;
            }
            _ => events.push(DetectedEvent {
                first_frame: record.frame_index,
                last_frame: record.frame_index,
                peak_score: record.score,
                frames: 1,
            }),
        }
    }

    events
}

/// Event start positions, as frame indices and as seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveList {
    pub saves: Vec<u64>,
    pub seconds: Vec<f64>,
}

impl SaveList {
    pub fn from_events(events: &[DetectedEvent], fps: f64) -> Self {
        let saves: Vec<u64> = events.iter().map(|e| e.first_frame).collect();
        let seconds = saves.iter().map(|&f| f as f64 / fps).collect();
        Self { saves, seconds }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
