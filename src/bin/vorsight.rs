//! Vorsight CLI - Command-line interface for the VOR metrics engine
//!
//! Commands:
//! - run: Process tracker frames into metrics snapshots (stdin or file)
//! - calibrate: Build a calibration from recorded fixation dwells
//! - validate: Validate tracker frame schema
//! - schema: Print schema information
//! - doctor: Diagnose configuration health

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vorsight::adapters::{LandmarkTrackerAdapter, PointTrackerAdapter, TrackerAdapter};
use vorsight::config::EngineConfig;
use vorsight::schema::{self, RawFrame, SCHEMA_VERSION};
use vorsight::types::{GazeVector, ScreenPoint};
use vorsight::{ComputeError, VorProcessor, PRODUCER_NAME, VORSIGHT_VERSION};

/// Vorsight - On-device compute engine for VOR rehabilitation metrics
#[derive(Parser)]
#[command(name = "vorsight")]
#[command(version = VORSIGHT_VERSION)]
#[command(about = "Transform tracker frames into VOR rehabilitation metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process tracker frames into metrics snapshots
    Run {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Tracker adapter for the frames
        #[arg(long, default_value = "point")]
        tracker: TrackerChoice,

        /// Viewport width in pixels
        #[arg(long, default_value = "1920")]
        width: f64,

        /// Viewport height in pixels
        #[arg(long, default_value = "1080")]
        height: f64,

        /// Load calibration state from file
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Exercise level to run (requires --calibration)
        #[arg(long)]
        level: Option<u8>,

        /// Write the session CSV here after processing
        #[arg(long)]
        export: Option<PathBuf>,

        /// Emit one metrics snapshot per line to stdout
        #[arg(long, default_value = "true")]
        emit_metrics: bool,
    },

    /// Build a calibration from recorded fixation dwells
    Calibrate {
        /// Dwell file: JSON array of {target: {x, y}, samples: [{x, y}]}
        #[arg(short, long)]
        input: PathBuf,

        /// Output calibration state file
        #[arg(short, long)]
        output: PathBuf,

        /// Viewport width in pixels
        #[arg(long, default_value = "1920")]
        width: f64,

        /// Viewport height in pixels
        #[arg(long, default_value = "1080")]
        height: f64,
    },

    /// Validate tracker frame schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },

    /// Diagnose configuration health
    Doctor {
        /// Check a calibration state file
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum TrackerChoice {
    /// Screen-point or normalized-vector predictions
    Point,
    /// Facial landmark maps
    Landmark,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (tracker.frame.v1)
    Input,
    /// Output schema (metrics snapshot)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), VorCliError> {
    match cli.command {
        Commands::Run {
            input,
            input_format,
            tracker,
            width,
            height,
            calibration,
            level,
            export,
            emit_metrics,
        } => cmd_run(
            &input,
            input_format,
            tracker,
            width,
            height,
            calibration.as_deref(),
            level,
            export.as_deref(),
            emit_metrics,
        ),

        Commands::Calibrate {
            input,
            output,
            width,
            height,
        } => cmd_calibrate(&input, &output, width, height),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),

        Commands::Doctor { calibration, json } => cmd_doctor(calibration.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, VorCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn make_adapter(tracker: &TrackerChoice) -> Box<dyn TrackerAdapter> {
    match tracker {
        TrackerChoice::Point => Box::new(PointTrackerAdapter),
        TrackerChoice::Landmark => Box::new(LandmarkTrackerAdapter),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    input: &Path,
    input_format: InputFormat,
    tracker: TrackerChoice,
    width: f64,
    height: f64,
    calibration: Option<&Path>,
    level: Option<u8>,
    export: Option<&Path>,
    emit_metrics: bool,
) -> Result<(), VorCliError> {
    let mut processor = VorProcessor::new(EngineConfig::for_viewport(width, height));
    let adapter = make_adapter(&tracker);

    if let Some(calibration_path) = calibration {
        let calibration_json = fs::read_to_string(calibration_path)?;
        processor.load_calibration(&calibration_json)?;
    }

    if let Some(level_id) = level {
        processor.start_exercise(level_id)?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Streaming stdin is processed line by line; files are read up front
    if input.to_string_lossy() == "-" && matches!(input_format, InputFormat::Ndjson) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let frame: RawFrame = serde_json::from_str(trimmed)
                .map_err(|e| VorCliError::ParseError(format!("frame: {}", e)))?;
            process_one(&mut processor, adapter.as_ref(), &frame, emit_metrics, &mut out)?;
        }
    } else {
        let data = read_input(input)?;
        let frames = match input_format {
            InputFormat::Ndjson => schema::parse_ndjson(&data)?,
            InputFormat::Json => schema::parse_array(&data)?,
        };
        if frames.is_empty() {
            return Err(VorCliError::NoFrames);
        }
        for frame in &frames {
            process_one(&mut processor, adapter.as_ref(), frame, emit_metrics, &mut out)?;
        }
    }

    if level.is_some() {
        let summary = processor.stop_exercise()?;
        writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    }

    if let Some(export_path) = export {
        let csv = processor.export_session()?;
        fs::write(export_path, &csv.data)?;
        eprintln!("wrote {} ({} rows)", export_path.display(), processor.recorded_len());
    }

    Ok(())
}

fn process_one(
    processor: &mut VorProcessor,
    adapter: &dyn TrackerAdapter,
    frame: &RawFrame,
    emit_metrics: bool,
    out: &mut impl Write,
) -> Result<(), VorCliError> {
    let snapshot = processor.process_raw(adapter, frame)?;
    if emit_metrics {
        writeln!(out, "{}", serde_json::to_string(&snapshot)?)?;
    }
    Ok(())
}

/// One recorded fixation dwell in a calibration input file
#[derive(serde::Deserialize)]
struct DwellRecord {
    target: ScreenPoint,
    samples: Vec<GazeVector>,
}

fn cmd_calibrate(
    input: &Path,
    output: &Path,
    width: f64,
    height: f64,
) -> Result<(), VorCliError> {
    let data = read_input(input)?;
    let dwells: Vec<DwellRecord> = serde_json::from_str(&data)
        .map_err(|e| VorCliError::ParseError(format!("dwell file: {}", e)))?;

    if dwells.is_empty() {
        return Err(VorCliError::NoFrames);
    }

    let config = EngineConfig::for_viewport(width, height);
    let mut mapper =
        vorsight::CalibrationMapper::new(config.viewport, config.calibration);
    for dwell in &dwells {
        mapper.record_point(dwell.target, &dwell.samples)?;
    }

    let report = mapper.measure_precision(mapper.points());
    fs::write(output, mapper.to_json().map_err(ComputeError::JsonError)?)?;

    println!(
        "calibrated {} points, mean error {:.1}px, precision {}%",
        mapper.len(),
        report.mean_error_px,
        report.precision_pct
    );
    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), VorCliError> {
    let data = read_input(input)?;
    let frames = match input_format {
        InputFormat::Ndjson => schema::parse_ndjson(&data)?,
        InputFormat::Json => schema::parse_array(&data)?,
    };

    let errors: Vec<ValidationErrorDetail> = frames
        .iter()
        .enumerate()
        .filter_map(|(index, frame)| {
            frame.validate().err().map(|e| ValidationErrorDetail {
                index,
                t_ms: frame.t_ms,
                error: e.to_string(),
            })
        })
        .collect();

    let report = ValidationReport {
        total_frames: frames.len(),
        valid_frames: frames.len() - errors.len(),
        invalid_frames: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:   {}", report.total_frames);
        println!("Valid frames:   {}", report.valid_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Frame at t={}ms (index {}): {}", err.t_ms, err.index, err.error);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(VorCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), VorCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: {}", SCHEMA_VERSION);
            println!();
            println!("Each frame carries a timestamp, a source, and one or both of:");
            println!();
            println!("1. gaze - A gaze reading");
            println!("   - x, y coordinates");
            println!("   - space: screen (pixels) or normalized (face-relative)");
            println!();
            println!("2. landmarks - Facial landmark map with scale");
            println!("   - landmark index -> [x, y] in tracker-video coordinates");
            println!("   - scale: video-to-screen ratio, required with landmarks");
            println!();
            println!("Supported trackers: point, landmark (custom names pass through)");
        }
        SchemaType::Output => {
            println!("Output Schema: metrics snapshot (one per frame)");
            println!();
            println!("- t: frame timestamp in milliseconds");
            println!("- gaze_x, gaze_y: smoothed gaze in screen pixels");
            println!("- head_angle: degrees, null without landmarks");
            println!("- head_vel (deg/s), eye_vel (px/s)");
            println!("- vor_gain: |eye_vel|/|head_vel|, null below the head-motion guard");
            println!("- latency_ms: running mean reflex latency, null before a response");
            println!("- fixation_rms: stability over the sliding window, pixels");
            println!("- saccade_count: threshold crossings this session");
            println!("- level, on_target: active exercise context");
        }
    }

    Ok(())
}

fn cmd_doctor(calibration: Option<&Path>, json: bool) -> Result<(), VorCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "vorsight_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Vorsight version {}", VORSIGHT_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(calibration_path) = calibration {
        if calibration_path.exists() {
            match fs::read_to_string(calibration_path) {
                Ok(content) => match vorsight::CalibrationMapper::from_json(&content) {
                    Ok(mapper) => {
                        let status = if mapper.is_interpolating() {
                            CheckStatus::Ok
                        } else {
                            CheckStatus::Warning
                        };
                        checks.push(DoctorCheck {
                            name: "calibration".to_string(),
                            status,
                            message: format!(
                                "Calibration file valid ({} points)",
                                mapper.len()
                            ),
                        });
                    }
                    Err(e) => {
                        checks.push(DoctorCheck {
                            name: "calibration".to_string(),
                            status: CheckStatus::Error,
                            message: format!("Invalid calibration JSON: {}", e),
                        });
                    }
                },
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "calibration".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot read calibration file: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "calibration".to_string(),
                status: CheckStatus::Warning,
                message: "Calibration file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VORSIGHT_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Vorsight Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(VorCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum VorCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for VorCliError {
    fn from(e: io::Error) -> Self {
        VorCliError::Io(e)
    }
}

impl From<ComputeError> for VorCliError {
    fn from(e: ComputeError) -> Self {
        VorCliError::Compute(e)
    }
}

impl From<serde_json::Error> for VorCliError {
    fn from(e: serde_json::Error) -> Self {
        VorCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VorCliError> for CliError {
    fn from(e: VorCliError) -> Self {
        match e {
            VorCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VorCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches tracker.frame.v1 schema".to_string()),
            },
            VorCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VorCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            VorCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            VorCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            VorCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_frames: usize,
    valid_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    t_ms: f64,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
