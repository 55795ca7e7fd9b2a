//! flashscan - scan a fixed screen region for colored flashes

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use flashscan::api::FlashScanner;
use flashscan::config::{OutputTarget, ScanSettings};
use flashscan::core::scan::{collapse, read_records, Geometry, SaveList, SignalBand, StopReason};

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a video or image sequence and write `frame;value` records.
    Scan(ScanArgs),
    /// Collapse a results file into events and print a save list as JSON.
    Events(EventsArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Region to watch, as WIDTHxHEIGHT+X+Y.
    #[arg(short, long)]
    geometry: Geometry,
    /// Video file, still image, or directory of frames.
    #[arg(short, long)]
    input: PathBuf,
    /// Results file. Records go to stdout without a header when omitted.
    output: Option<PathBuf>,
    /// First frame index to scan.
    #[arg(long)]
    start: Option<u64>,
    /// Trigger threshold on the 0..=255 intensity scale.
    #[arg(long)]
    threshold: Option<f64>,
    /// Seconds between progress reports.
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,
    /// Mask worker threads (0 = one per CPU).
    #[arg(long)]
    workers: Option<usize>,
    /// TOML settings file; flags above override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Use the brightness mask instead of the color band.
    #[arg(long, value_name = "LEVEL", num_args = 0..=1, default_missing_value = "230")]
    luma: Option<u8>,
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct EventsArgs {
    /// Results file written by `scan`.
    results: PathBuf,
    /// Frame rate used to turn frame indices into seconds.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
    /// Records at most this many frames apart belong to one event.
    #[arg(long, default_value_t = 1)]
    max_gap: u64,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Scan(args) => run_scan(args),
        Command::Events(args) => run_events(args),
    }
}

fn settings_for(args: &ScanArgs) -> Result<ScanSettings, String> {
    let mut settings = match &args.config {
        Some(path) => ScanSettings::load(path).map_err(|e| e.to_string())?,
        None => ScanSettings::default(),
    };
    if let Some(start) = args.start {
        settings.start_frame = start;
    }
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    if let Some(interval) = args.interval {
        settings.report_interval_secs = interval;
    }
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }
    if let Some(level) = args.luma {
        settings.band = SignalBand::luma(level);
    }
    Ok(settings)
}

fn run_scan(args: ScanArgs) -> ExitCode {
    flashscan::init_logging(args.verbose);

    let settings = match settings_for(&args) {
        Ok(s) => s,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    log::debug!("settings: {:?}", settings);

    let scanner = FlashScanner::create(settings);
    let cancel = scanner.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
        log::warn!("⚠️ Ctrl-C handler unavailable: {}", e);
    }

    let output = OutputTarget::from(args.output);
    match scanner.scan(&args.input, args.geometry, &output) {
        Ok(summary) if summary.stop == StopReason::Interrupted => {
            log::warn!(
                "⏹️ Interrupted after {} frames, resume with --start {}",
                summary.frames_processed,
                summary.next_frame
            );
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Ok(summary) => {
            log::info!(
                "✅ Scan complete: {} frames, {} detections in {:.1}s",
                summary.frames_processed,
                summary.detections,
                summary.elapsed.as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run_events(args: EventsArgs) -> ExitCode {
    flashscan::init_logging(args.verbose);

    if !(args.fps.is_finite() && args.fps > 0.0) {
        log::error!("❌ fps must be positive, got {}", args.fps);
        return ExitCode::from(EXIT_FAILURE);
    }

    let records = match File::open(&args.results)
        .map_err(|e| e.to_string())
        .and_then(|f| read_records(BufReader::new(f)).map_err(|e| e.to_string()))
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("❌ {}: {}", args.results.display(), e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let events = collapse(&records, args.max_gap);
    log::info!("{} records -> {} events", records.len(), events.len());

    match SaveList::from_events(&events, args.fps).to_json() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
