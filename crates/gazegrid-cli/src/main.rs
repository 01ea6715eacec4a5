//! Command line interface for the gazegrid engine.
//!
//! Calibrates profiles from directories of captured frames, stores them
//! in a sqlite database, and resolves single captures to on-screen
//! points. Capture files encode the target the subject fixated in their
//! name, `x_<x>_y_<y>.<ext>`, for example `x_340_y_200.png`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use gazegrid::{
    AgentConfig, CalibrationTarget, Prediction, ProfileStore, ScreenGeometry,
    SqliteProfileStore, SyntheticPredictor, TrackingEngine,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "gazegrid")]
#[command(about = "Calibrate gaze profiles and map gaze captures to on-screen points")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate a profile from a directory of captures.
    Calibrate(CalibrateArgs),
    /// Resolve one capture to an on-screen point.
    Predict(PredictArgs),
    /// List stored profiles.
    Profiles(StoreArgs),
    /// Delete a stored profile.
    DeleteProfile(DeleteArgs),
}

#[derive(Args)]
struct StoreArgs {
    /// Path to the profile database.
    #[arg(long, default_value = "gazegrid.db")]
    db: PathBuf,
}

#[derive(Args)]
struct CalibrateArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Directory of capture images named x_<x>_y_<y>.<ext>.
    captures: PathBuf,

    /// Profile name to create or update.
    #[arg(long)]
    profile: String,

    /// Mapping strategy.
    #[arg(long, value_enum, default_value_t = AgentArg::Interpolation)]
    agent: AgentArg,

    /// Print the calibration report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Capture image to resolve.
    image: PathBuf,

    /// Stored profile id to load before predicting.
    #[arg(long)]
    profile_id: i64,

    /// Mapping strategy.
    #[arg(long, value_enum, default_value_t = AgentArg::Interpolation)]
    agent: AgentArg,

    /// Print the outcome as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DeleteArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Stored profile id to delete.
    #[arg(long)]
    id: i64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum AgentArg {
    /// Angle-only interpolation.
    Naive,
    /// Head-aware interpolation.
    Interpolation,
    /// Ray/screen intersection with the default screen geometry. Expects
    /// metric head positions; the built-in predictor reports pixels.
    Geometric,
}

impl AgentArg {
    fn to_config(self) -> AgentConfig {
        match self {
            AgentArg::Naive => AgentConfig::Naive,
            AgentArg::Interpolation => AgentConfig::Interpolation,
            AgentArg::Geometric => AgentConfig::Geometric {
                screen: ScreenGeometry::default(),
                initial_depth_scale: 1.0,
            },
        }
    }

    /// True when the strategy treats head positions as metric coordinates.
    fn expects_metric_head(self) -> bool {
        matches!(self, AgentArg::Geometric)
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Calibrate(args) => run_calibrate(args),
        Commands::Predict(args) => run_predict(args),
        Commands::Profiles(args) => run_profiles(args),
        Commands::DeleteProfile(args) => run_delete(args),
    }
}

fn build_engine(db: &Path, agent: AgentArg) -> CliResult<TrackingEngine> {
    if agent.expects_metric_head() {
        tracing::warn!(
            "Geometric mapping expects metric head positions; the built-in predictor reports image pixels"
        );
    }
    let store = SqliteProfileStore::open(db)?;
    Ok(TrackingEngine::new(
        Arc::new(SyntheticPredictor::default()),
        agent.to_config().build(),
        Arc::new(store),
    ))
}

/// Parse an on-screen target from a capture file name shaped like
/// `x_<x>_y_<y>`, extension already removed.
fn parse_target(stem: &str) -> Option<[f64; 2]> {
    let mut parts = stem.split('_');
    if parts.next()? != "x" {
        return None;
    }
    let x: f64 = parts.next()?.parse().ok()?;
    if parts.next()? != "y" {
        return None;
    }
    let y: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some([x, y])
}

/// Collect calibration targets from a capture directory, sorted by file
/// name. Files that do not follow the naming scheme or fail to decode
/// are skipped with a warning.
fn load_captures(dir: &Path) -> CliResult<Vec<CalibrationTarget>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut targets = Vec::new();
    for path in paths {
        let target = match path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(parse_target)
        {
            Some(target) => target,
            None => {
                tracing::warn!("Skipping {} (not named x_<x>_y_<y>)", path.display());
                continue;
            }
        };
        let frame = match image::open(&path) {
            Ok(img) => img.to_luma8(),
            Err(e) => {
                tracing::warn!("Skipping unreadable capture {}: {}", path.display(), e);
                continue;
            }
        };
        targets.push(CalibrationTarget { target, frame });
    }
    Ok(targets)
}

fn run_calibrate(args: CalibrateArgs) -> CliResult<()> {
    let targets = load_captures(&args.captures)?;
    if targets.is_empty() {
        return Err(format!(
            "no captures matching x_<x>_y_<y>.<ext> in {}",
            args.captures.display()
        )
        .into());
    }
    tracing::info!(
        "Calibrating from {} captures in {}",
        targets.len(),
        args.captures.display()
    );

    let engine = build_engine(&args.store.db, args.agent)?;
    let report = engine.run_calibration_steps(&targets);
    let id = engine.save_profile(&args.profile)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "profile": args.profile,
                "id": id,
                "report": report,
            }))?
        );
        return Ok(());
    }

    println!("calibrated profile '{}' (id {id})", args.profile);
    println!("  appended:   {}", report.appended);
    println!("  no subject: {}", report.no_subject);
    println!("  failed:     {}", report.failures.len());
    for failure in &report.failures {
        println!(
            "    [{}] target ({}, {}): {}",
            failure.index, failure.target[0], failure.target[1], failure.reason
        );
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> CliResult<()> {
    let engine = build_engine(&args.store.db, args.agent)?;
    engine.load_profile(args.profile_id)?;
    if engine.calibration_point_count() == 0 {
        tracing::warn!("Profile {} is empty or unknown", args.profile_id);
    }

    let frame = image::open(&args.image)?.to_luma8();
    let prediction = engine.predict_gaze_position(&frame)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        match prediction {
            Prediction::Point([x, y]) => println!("({x:.1}, {y:.1})"),
            Prediction::Undefined(reason) => println!("undefined: {reason}"),
        }
    }
    Ok(())
}

fn run_profiles(args: StoreArgs) -> CliResult<()> {
    let store = SqliteProfileStore::open(&args.db)?;
    let records = store.list()?;
    if records.is_empty() {
        println!("no profiles stored in {}", args.db.display());
        return Ok(());
    }
    println!("{:>6}  {:<24}  updated", "id", "name");
    for record in records {
        println!(
            "{:>6}  {:<24}  {}",
            record.id,
            record.name,
            record.updated_at.to_rfc3339()
        );
    }
    Ok(())
}

fn run_delete(args: DeleteArgs) -> CliResult<()> {
    let store = SqliteProfileStore::open(&args.store.db)?;
    store.delete(args.id)?;
    println!("deleted profile {}", args.id);
    Ok(())
}
