use anyhow::{Context, Result};
use cammeasure_core::{
    convert, export_measurements_csv, Color, CsvExportConfig, DrawCommand, DrawList, LineStyle,
    MeasureEngine, MeasurementRecord, OfflineReconciler, Point, Preferences, ReferenceCatalog,
    ReferenceObject, StageStatus, TapOutcome, Unit,
};
use cammeasure_storage::{JsonFileStore, Storage};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "cammeasure")]
#[command(about = "Camera measurement calibration and replay tool")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert a length between units.
    Convert {
        #[arg(value_name = "VALUE", allow_negative_numbers = true)]
        value: f64,
        #[arg(long)]
        from: Unit,
        #[arg(long)]
        to: Unit,
    },
    /// Print the reference object catalog.
    References,
    /// Replay a JSON event script against the engine.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
        /// Read preferences from this JSON file instead of the data directory.
        #[arg(long, value_name = "FILE")]
        preferences: Option<PathBuf>,
        /// Write the resulting ledger as CSV.
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
        /// Include the draw instructions in the output.
        #[arg(long)]
        draw: bool,
    },
    /// Print measurements waiting in the offline stage.
    Staged {
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

/// One entry of a replay script
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum ScriptEvent {
    Capture { active: bool },
    Reference { name: String },
    CustomReference { width: f64, height: f64, unit: Unit },
    Calibrate,
    Tap { x: f64, y: f64 },
    Measure,
    Cancel,
    Online { online: bool },
    Unit { unit: Unit },
    Style { color: Color, width: f64 },
    Clear,
}

#[derive(Debug, Serialize)]
struct ReferenceOutput {
    name: &'static str,
    #[serde(flatten)]
    reference: ReferenceObject,
}

#[derive(Debug, Serialize)]
struct ReplayOutput<'a> {
    scale: Option<String>,
    measurements: &'a [MeasurementRecord],
    pending: Vec<MeasurementRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    draw: Option<Vec<DrawCommand>>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Convert { value, from, to } => {
            println!("{}", convert(value, from, to));
            Ok(())
        }
        Commands::References => run_references(),
        Commands::Replay { script, data_dir, preferences, csv, draw } => {
            run_replay(&script, data_dir, preferences.as_deref(), csv.as_deref(), draw)
        }
        Commands::Staged { data_dir } => run_staged(data_dir),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_storage(data_dir: Option<PathBuf>) -> Result<Storage> {
    match data_dir {
        Some(dir) => Ok(Storage::with_root(dir)),
        None => Storage::from_default_project().context("failed to resolve data directory"),
    }
}

fn run_references() -> Result<()> {
    let payload: Vec<ReferenceOutput> = ReferenceCatalog::new()
        .entries()
        .into_iter()
        .map(|(name, reference)| ReferenceOutput { name, reference })
        .collect();

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_replay(
    script: &Path,
    data_dir: Option<PathBuf>,
    preferences: Option<&Path>,
    csv: Option<&Path>,
    draw: bool,
) -> Result<()> {
    let bytes =
        fs::read(script).with_context(|| format!("failed to read script {}", script.display()))?;
    let events: Vec<ScriptEvent> = serde_json::from_slice(&bytes)
        .with_context(|| format!("invalid script {}", script.display()))?;

    let storage = open_storage(data_dir)?;
    let preferences = match preferences {
        Some(path) => Preferences::from_file(path)
            .with_context(|| format!("failed to load preferences from {}", path.display()))?,
        None => storage.load_preferences().context("failed to load preferences")?,
    }
    .with_env_overrides()
    .context("invalid preference override")?;

    let mut engine = MeasureEngine::new(storage.offline_store(), DrawList::new(), preferences)?;
    for (index, event) in events.into_iter().enumerate() {
        apply_event(&mut engine, event).with_context(|| format!("event {index} failed"))?;
    }

    if let Some(path) = csv {
        let file = fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        export_measurements_csv(file, engine.ledger(), &CsvExportConfig::default())?;
    }

    let pending = engine.reconciler().pending().context("failed to read offline stage")?;
    let draw = draw.then(|| engine.renderer_mut().take());
    let payload = ReplayOutput {
        scale: engine.scale_description(),
        measurements: engine.ledger().all(),
        pending,
        draw,
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn apply_event(
    engine: &mut MeasureEngine<Arc<JsonFileStore>, DrawList>,
    event: ScriptEvent,
) -> Result<()> {
    match event {
        ScriptEvent::Capture { active } => engine.set_capture_active(active),
        ScriptEvent::Reference { name } => {
            let known = engine.catalog().names().join(", ");
            engine.select_reference(&name).with_context(|| format!("known references: {known}"))?
        }
        ScriptEvent::CustomReference { width, height, unit } => {
            engine.set_custom_reference(width, height, unit)?
        }
        ScriptEvent::Calibrate => engine.begin_calibration()?,
        ScriptEvent::Tap { x, y } => {
            if let TapOutcome::Measured { record, stage: StageStatus::Failed(reason) } =
                engine.tap(Point::new(x, y))?
            {
                log::warn!("measurement {} kept in memory only: {reason}", record.id());
            }
        }
        ScriptEvent::Measure => engine.start_measuring()?,
        ScriptEvent::Cancel => engine.cancel_measuring(),
        ScriptEvent::Online { online } => {
            if let Some(report) = engine.set_online(online)?.filter(|r| !r.is_noop()) {
                log::info!(
                    "reconciled offline stage: {} merged, {} already present",
                    report.merged,
                    report.already_present
                );
            }
        }
        ScriptEvent::Unit { unit } => engine.set_display_unit(unit),
        ScriptEvent::Style { color, width } => engine.set_line_style(LineStyle::new(color, width)?),
        ScriptEvent::Clear => engine.clear_measurements(),
    }
    Ok(())
}

fn run_staged(data_dir: Option<PathBuf>) -> Result<()> {
    let store = open_storage(data_dir)?.offline_store();
    let pending = OfflineReconciler::new(store).pending().context("failed to read offline stage")?;

    println!("{}", serde_json::to_string_pretty(&pending)?);
    Ok(())
}
