//! Logstep CLI
//!
//! Inspect how a debug log classifies, or replay it headlessly and print the
//! reconstructed stack at every pause.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use indexmap::IndexMap;
use logstep_log::{Classifier, Cursor, EventKind, LogSource};
use logstep_replay::breakpoint::client_path;
use logstep_replay::{
    BreakpointIndex, EngineOutput, OverlayResult, ReplayConfig, ReplayEngine, StepKind, StepOutcome,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "logstep")]
#[command(about = "Logstep - replay debugger for debug logs", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "logstep=warn")]
    log_filter: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every line's classification and a summary
    Inspect {
        /// Path to the debug log
        log: PathBuf,
    },
    /// Replay a log and print the stack at each pause
    Replay {
        /// Path to the debug log
        log: PathBuf,
        /// JSON file of line breakpoint info
        #[arg(short, long)]
        breakpoints: Option<PathBuf>,
        /// Breakpoint as `file:line`; repeatable
        #[arg(long = "break", value_name = "FILE:LINE")]
        breaks: Vec<String>,
        /// Granularity of each resume
        #[arg(short, long, value_enum, default_value_t = Step::Run)]
        step: Step,
        /// Pause on the first line
        #[arg(long)]
        stop_on_entry: bool,
        /// Refuse logs without the required log levels
        #[arg(long)]
        check_log_levels: bool,
        /// JSON array of heap dump overlay results
        #[arg(long, value_name = "PATH")]
        overlays: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Step {
    Run,
    Over,
    In,
    Out,
}

impl From<Step> for StepKind {
    fn from(step: Step) -> Self {
        match step {
            Step::Run => Self::Run,
            Step::Over => Self::Over,
            Step::In => Self::In,
            Step::Out => Self::Out,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { log } => inspect(&log),
        Commands::Replay {
            log,
            breakpoints,
            breaks,
            step,
            stop_on_entry,
            check_log_levels,
            overlays,
        } => {
            let index = match breakpoints {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .wrap_err_with(|| format!("reading {}", path.display()))?;
                    BreakpointIndex::from_json(&json)?
                }
                None => BreakpointIndex::new(),
            };
            let config = ReplayConfig {
                stop_on_entry,
                check_log_levels,
                echo_log_lines: false,
            };
            let overlays = match overlays {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .wrap_err_with(|| format!("reading {}", path.display()))?;
                    serde_json::from_str::<Vec<OverlayResult>>(&json)
                        .wrap_err_with(|| format!("parsing overlay results in {}", path.display()))?
                }
                None => Vec::new(),
            };
            replay(&log, index, &breaks, step.into(), config, overlays)
        }
    }
}

fn inspect(path: &Path) -> Result<()> {
    let source = LogSource::load(path)?;
    println!("{} ({} lines, {} bytes)", source.name(), source.non_blank_count(), source.size());

    let mut cursor = Cursor::new();
    let mut classifier = Classifier::new();
    let mut histogram: IndexMap<EventKind, usize> = IndexMap::new();
    while let Some((position, line)) = cursor.advance(&source) {
        let kind = classifier.classify(line).kind();
        *histogram.entry(kind).or_default() += 1;
        println!("{:>6}  {kind:?}", position + 1);
    }

    println!();
    histogram.sort_keys();
    for (kind, count) in &histogram {
        println!("{:<20} {count}", format!("{kind:?}"));
    }
    Ok(())
}

fn replay(
    path: &Path,
    index: BreakpointIndex,
    breaks: &[String],
    step: StepKind,
    config: ReplayConfig,
    overlays: Vec<OverlayResult>,
) -> Result<()> {
    let source = LogSource::load(path)?;
    let stop_on_entry = config.stop_on_entry;
    let mut engine = ReplayEngine::launch(source, index, config)?;
    if !overlays.is_empty() {
        let supplied = overlays.len();
        let attached = engine.attach_overlay_results(overlays);
        println!("attached {attached} of {supplied} heap dump overlay(s)");
    }

    let mut requested: IndexMap<String, Vec<u32>> = IndexMap::new();
    for raw in breaks {
        let (file, line) = parse_break(raw)?;
        let uri = engine.breakpoint_index().resolve_file(file);
        requested.entry(uri).or_default().push(line);
    }
    tracing::debug!(files = requested.len(), "setting breakpoints");
    for (uri, lines) in &requested {
        let verified = engine.set_breakpoints(uri, lines);
        for (line, ok) in lines.iter().zip(verified) {
            if !ok {
                println!("unverified breakpoint {}:{line}", client_path(uri));
            }
        }
    }

    let mut outcome = if stop_on_entry {
        engine.start_at_entry()
    } else {
        engine.resume(step)
    };
    let mut pauses = 0usize;
    loop {
        print_output(&mut engine);
        match outcome {
            StepOutcome::Stopped(reason) => {
                pauses += 1;
                println!("-- stopped ({}) --", reason.as_str());
                if let Some(id) = engine.apply_heap_dump() {
                    println!("  variables from heap dump {id}");
                }
                print_stack(&engine);
            }
            StepOutcome::Terminated => break,
        }
        outcome = engine.resume(step);
    }
    println!("-- terminated after {pauses} pause(s), {} lines --", engine.lines_classified());
    Ok(())
}

fn print_output(engine: &mut ReplayEngine) {
    for output in engine.drain_output() {
        match output {
            EngineOutput::UserDebug { message, level, line, .. } => println!("[{level}] line {line}: {message}"),
            EngineOutput::LogLine(line) => println!("{line}"),
            EngineOutput::Warning(text) => println!("warning: {text}"),
        }
    }
}

fn print_stack(engine: &ReplayEngine) {
    for frame in engine.stack().innermost_first() {
        let location = frame
            .source
            .as_ref()
            .map_or_else(|| "<no source>".to_string(), |s| format!("{}:{}", s.name, frame.line));
        println!("  {}  {location}", frame.name);
    }
}

/// `path/File.cls:12` into its file and line
fn parse_break(raw: &str) -> Result<(&str, u32)> {
    let (file, line) = raw
        .rsplit_once(':')
        .ok_or_else(|| eyre!("breakpoint `{raw}` is not FILE:LINE"))?;
    let line = line
        .parse()
        .wrap_err_with(|| format!("breakpoint `{raw}` has no line number"))?;
    Ok((file, line))
}
