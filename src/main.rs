use std::io::{IsTerminal, stdout};
use std::path::PathBuf;

use clap::{Args, ColorChoice, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::json;

use bannersense::actuate::{Actuator, FallbackPolicy, Polarity, RecordingDriver};
use bannersense::dom::{DomSnapshot, SnapshotSpec};
use bannersense::patterns::PatternDb;
use bannersense::session::{Command, Reply};
use bannersense::{Detection, DetectionEngine};

#[derive(Parser)]
#[command(
    name = "bannersense",
    about = "Consent-banner detection and actuation over DOM snapshots",
    arg_required_else_help = true
)]
struct Cli {
    /// Disable color
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    /// Log classifier verdicts to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the detection cascade against a snapshot file
    Detect(DetectArgs),
    /// Resolve and plan the click for a polarity (dry run)
    Actuate(ActuateArgs),
    /// Print the JSON Schema of a wire type
    Schema(SchemaArgs),
}

#[derive(Args, Clone)]
struct DetectArgs {
    /// DOM snapshot JSON file
    snapshot: PathBuf,

    /// Pattern database file (builtin default when omitted)
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Output JSON (stable schema)
    #[arg(long)]
    json: bool,
}

#[derive(Args, Clone)]
struct ActuateArgs {
    /// DOM snapshot JSON file
    snapshot: PathBuf,

    /// Which control to actuate
    #[arg(long, value_enum)]
    polarity: PolarityArg,

    /// Pattern database file (builtin default when omitted)
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Fail instead of falling back to accept on a missing reject control
    #[arg(long)]
    strict: bool,

    /// Output JSON (stable schema)
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolarityArg {
    Accept,
    Deny,
}

impl From<PolarityArg> for Polarity {
    fn from(value: PolarityArg) -> Self {
        match value {
            PolarityArg::Accept => Polarity::Accept,
            PolarityArg::Deny => Polarity::Deny,
        }
    }
}

#[derive(Args, Clone)]
struct SchemaArgs {
    /// Which wire type to describe
    #[arg(value_enum)]
    kind: SchemaKind,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    Snapshot,
    Patterns,
    Detection,
    Command,
    Reply,
}

fn load_snapshot(path: &PathBuf) -> Result<DomSnapshot, i32> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        eprintln!("cannot read snapshot {}: {}", path.display(), err);
        2
    })?;
    DomSnapshot::from_json_str(&content).map_err(|err| {
        eprintln!("cannot parse snapshot {}: {}", path.display(), err);
        2
    })
}

fn render_detection(snapshot: &DomSnapshot, detection: &Detection, color: bool) -> String {
    let mut out = String::new();
    let heading = format!(
        "Banner: {} (confidence {:.2})",
        detection.kind.as_str(),
        detection.confidence
    );
    out.push_str(&if color {
        heading.bold().green().to_string()
    } else {
        heading
    });
    if let Some(cmp) = &detection.cmp_name {
        out.push_str(&format!("\n  Platform: {}", cmp));
    }
    out.push_str(&format!(
        "\n  Element: {}",
        snapshot.describe(detection.banner)
    ));
    if detection.in_iframe {
        out.push_str("\n  Location: same-origin iframe");
    }
    if !detection.matched_keywords.is_empty() {
        out.push_str(&format!(
            "\n  Keywords: {}",
            detection.matched_keywords.join(", ")
        ));
    }
    out
}

fn run_detect(args: DetectArgs, color: bool) -> Result<(), i32> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let patterns = PatternDb::load_or_builtin(args.patterns.as_deref());
    let engine = DetectionEngine::standard(patterns);
    let verdict = engine.scan(&snapshot);

    if args.json {
        let value = json!({ "detection": &verdict });
        println!("{}", serde_json::to_string_pretty(&value).map_err(|_| 3)?);
    } else {
        match &verdict {
            Some(detection) => println!("{}", render_detection(&snapshot, detection, color)),
            None => {
                let line = "No banner detected.";
                println!("{}", if color { line.red().to_string() } else { line.into() });
            }
        }
    }
    if verdict.is_some() { Ok(()) } else { Err(1) }
}

fn run_actuate(args: ActuateArgs, color: bool) -> Result<(), i32> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let patterns = PatternDb::load_or_builtin(args.patterns.as_deref());
    let engine = DetectionEngine::standard(patterns);

    let Some(detection) = engine.scan(&snapshot) else {
        let line = "No banner detected; nothing to actuate.";
        println!("{}", if color { line.red().to_string() } else { line.into() });
        return Err(1);
    };

    let fallback = if args.strict {
        FallbackPolicy::Strict
    } else {
        FallbackPolicy::AcceptWhenRejectMissing
    };
    let actuator = Actuator::new(fallback);
    let polarity: Polarity = args.polarity.into();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|_| 3)?;
    let mut driver = RecordingDriver::new(snapshot.clone(), "cli");
    let outcome = runtime.block_on(actuator.actuate(
        &mut driver,
        &snapshot,
        engine.patterns(),
        &detection,
        polarity,
    ));

    match outcome {
        Ok(actuation) => {
            if args.json {
                let value = json!({
                    "actuation": actuation,
                    "steps": driver
                        .dispatched
                        .iter()
                        .map(|(_, step)| step)
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&value).map_err(|_| 3)?);
            } else {
                let heading = format!("Would click: {}", snapshot.describe(actuation.clicked));
                println!(
                    "{}",
                    if color {
                        heading.bold().green().to_string()
                    } else {
                        heading
                    }
                );
                if actuation.fell_back_to_accept {
                    println!("  (no reject control; fell back to accept)");
                }
                let steps: Vec<String> = driver
                    .dispatched
                    .iter()
                    .map(|(_, step)| format!("{:?}", step).to_lowercase())
                    .collect();
                println!("  Events: {}", steps.join(" "));
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err);
            Err(1)
        }
    }
}

fn run_schema(args: SchemaArgs) -> Result<(), i32> {
    let schema = match args.kind {
        SchemaKind::Snapshot => schemars::schema_for!(SnapshotSpec),
        SchemaKind::Patterns => schemars::schema_for!(PatternDb),
        SchemaKind::Detection => schemars::schema_for!(Detection),
        SchemaKind::Command => schemars::schema_for!(Command),
        SchemaKind::Reply => schemars::schema_for!(Reply),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&schema).map_err(|_| 3)?
    );
    Ok(())
}

fn detect_color_choice() -> ColorChoice {
    // Scan args before clap so help/errors honor `--no-color`.
    let mut args = std::env::args_os();
    args.next();
    let mut flag = false;
    for arg in args {
        if arg == "--" {
            break;
        }
        if arg == "--no-color" {
            flag = true;
            break;
        }
    }
    if flag || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug { "bannersense=debug" } else { "bannersense=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let color_choice = detect_color_choice();
    let matches = Cli::command().color(color_choice).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    init_tracing(cli.debug);
    let color = stdout().is_terminal() && !matches!(color_choice, ColorChoice::Never);

    let result = match cli.command {
        Some(Commands::Detect(args)) => run_detect(args, color),
        Some(Commands::Actuate(args)) => run_actuate(args, color),
        Some(Commands::Schema(args)) => run_schema(args),
        None => Ok(()),
    };
    if let Err(code) = result {
        std::process::exit(code);
    }
}
