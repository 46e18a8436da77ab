mod script;

use std::fs;
use std::io::{self, Read, Write};

use clap::{Args, Parser, Subcommand};
use knob::angle::{pointer_radians, sample_angle};
use knob::cursor::NoopCursor;
use knob::{AngleSample, ConfigError, Knob, KnobOptions, Point, Rect};
use serde::Serialize;
use tracing::{Level, debug, info};

use crate::script::{Step, parse_point, parse_rect, parse_script, run_step};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid script: {0}")]
    Script(serde_json::Error),
    #[error("cannot read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("output failed: {0}")]
    Output(#[from] io::Error),
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("step {index} failed: {source}")]
    Step { index: usize, source: ConfigError },
}

#[derive(Parser, Debug)]
#[command(name = "knob-cli", about = "Replay pointer gestures against a rotary knob")]
struct Cli {
    /// Log engine internals to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a gesture script and print every event as a JSON line.
    Replay(ReplayArgs),
    /// Print the angle sample for one pointer move around a pivot.
    Sample(SampleArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    #[arg(long, env = "KNOB_OPTIONS", default_value = "{}", help = "Options JSON, or @path to a file")]
    options: String,

    #[arg(long, default_value = "-", help = "Script file path, or - for stdin")]
    script: String,

    #[arg(long, value_parser = parse_rect, default_value = "0,0,100,100", help = "Target rect: left,top,width,height")]
    rect: Rect,
}

#[derive(Args, Debug)]
struct SampleArgs {
    #[arg(long, value_parser = parse_point)]
    pivot: Point,

    #[arg(long, value_parser = parse_point)]
    from: Point,

    #[arg(long, value_parser = parse_point)]
    to: Point,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match cli.command {
        Command::Replay(args) => run_replay(args),
        Command::Sample(args) => run_sample(&args),
    }
}

fn run_replay(args: ReplayArgs) -> Result<(), CliError> {
    let options = load_options(&args.options)?;
    let steps = parse_script(&read_source(&args.script)?).map_err(CliError::Script)?;
    info!(steps = steps.len(), "replaying script");

    let mut knob = Knob::with_cursor(options, Box::new(NoopCursor))?;
    knob.attach(Box::new(args.rect));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (index, step) in steps.iter().enumerate() {
        debug!(index, ?step, "step");
        let events = run_step(&mut knob, step).map_err(|source| CliError::Step { index, source })?;
        for event in &events {
            write_line(&mut out, event)?;
        }
        if matches!(step, Step::SetOptions(_)) {
            debug!(version = knob.config().version(), "options applied");
        }
    }
    write_line(&mut out, &serde_json::json!({ "snapshot": knob.snapshot() }))?;
    Ok(())
}

fn run_sample(args: &SampleArgs) -> Result<(), CliError> {
    let previous = pointer_radians(args.pivot, args.from);
    let (next, delta) = sample_angle(args.pivot, previous, args.to);
    write_line(&mut io::stdout().lock(), &AngleSample::new(delta, next))
}

/// `@path` reads options from a file; anything else is inline JSON.
fn load_options(arg: &str) -> Result<KnobOptions, CliError> {
    let json = match arg.strip_prefix('@') {
        Some(path) => read_source(path)?,
        None => arg.to_owned(),
    };
    Ok(KnobOptions::from_json(&json)?)
}

/// Read a whole file, or stdin for `-`.
fn read_source(path: &str) -> Result<String, CliError> {
    let read_err = |source| CliError::Read { path: path.to_owned(), source };
    if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(read_err)?;
        Ok(buf)
    } else {
        fs::read_to_string(path).map_err(read_err)
    }
}

fn write_line(out: &mut impl Write, value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string(value)?;
    writeln!(out, "{rendered}")?;
    Ok(())
}
