//! 结果输出 - `frame;value` 行格式
//!
//! File sinks write a header once and flush after every record so that an
//! interrupted run keeps everything it reported. The stdout sink prints bare
//! records.

use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use super::error::ScanError;

pub const HEADER: &str = "frame;value";

/// One triggering frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionRecord {
    pub frame_index: u64,
    pub score: f64,
}

impl DetectionRecord {
    /// `{:?}` keeps the shortest round-trip representation and a trailing `.0`.
    pub fn to_line(&self) -> String {
        format!("{};{:?}", self.frame_index, self.score)
    }
}

pub trait ResultSink {
    fn write(&mut self, record: &DetectionRecord) -> Result<(), ScanError>;

    fn close(&mut self) -> Result<(), ScanError> {
        Ok(())
    }
}

/// Collects records in memory.
impl ResultSink for Vec<DetectionRecord> {
    fn write(&mut self, record: &DetectionRecord) -> Result<(), ScanError> {
        self.push(*record);
        Ok(())
    }
}

/// Line-oriented sink over any writer.
pub struct DelimitedSink<W: Write> {
    writer: W,
    flush_each: bool,
    written: u64,
}

impl<W: Write> DelimitedSink<W> {
    pub fn new(mut writer: W, header: bool, flush_each: bool) -> Result<Self, ScanError> {
        if header {
            writeln!(writer, "{HEADER}").map_err(ScanError::SinkFault)?;
            if flush_each {
                writer.flush().map_err(ScanError::SinkFault)?;
            }
        }
        Ok(Self {
            writer,
            flush_each,
            written: 0,
        })
    }

    pub fn records_written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for DelimitedSink<W> {
    fn write(&mut self, record: &DetectionRecord) -> Result<(), ScanError> {
        writeln!(self.writer, "{}", record.to_line()).map_err(ScanError::SinkFault)?;
        if self.flush_each {
            self.writer.flush().map_err(ScanError::SinkFault)?;
        }
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ScanError> {
        debug!("Closing sink after {} records", self.written);
        self.writer.flush().map_err(ScanError::SinkFault)
    }
}

pub type FileSink = DelimitedSink<BufWriter<File>>;
pub type StdoutSink = DelimitedSink<Stdout>;

impl FileSink {
    pub fn create(path: &Path) -> Result<Self, ScanError> {
        let file = File::create(path).map_err(ScanError::SinkFault)?;
        Self::new(BufWriter::new(file), true, true)
    }
}

impl StdoutSink {
    pub fn stdout() -> Self {
        Self {
            writer: io::stdout(),
            flush_each: false,
            written: 0,
        }
    }
}
