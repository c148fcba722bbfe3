//! Headless front end: open a project, replay panel actions, export.
//!
//! ```text
//! proedit <project.json> [output.png|output.jpg]
//!         [--actions actions.json] [--config config.json] [--save out.json]
//! ```

use proedit_app::file_ops::{self, FileError};
use proedit_app::{AppConfig, ConfigError, Session};
use proedit_core::EditorAction;
use proedit_render::{DataUrlLoader, ExportError, ExportFormat, ExportOutcome, RetainedSurface};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

/// Image loads are synchronous here; a few rounds drain nested requests.
const SETTLE_ROUNDS: usize = 8;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Invalid actions file: {0}")]
    Actions(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct Args {
    project: PathBuf,
    output: Option<PathBuf>,
    actions: Option<PathBuf>,
    config: Option<PathBuf>,
    save: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, CliError> {
    let mut parsed = Args::default();
    let mut positional = Vec::new();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .map(PathBuf::from)
                .ok_or_else(|| CliError::Usage(format!("{} needs a path", flag)))
        };
        match arg.as_str() {
            "--actions" => parsed.actions = Some(value("--actions")?),
            "--config" => parsed.config = Some(value("--config")?),
            "--save" => parsed.save = Some(value("--save")?),
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown option {}", flag)));
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let mut positional = positional.into_iter();
    parsed.project = positional
        .next()
        .ok_or_else(|| CliError::Usage("missing project file".to_string()))?;
    parsed.output = positional.next();
    if let Some(extra) = positional.next() {
        return Err(CliError::Usage(format!("unexpected argument {:?}", extra)));
    }
    Ok(parsed)
}

fn output_format(path: &Path, fallback: ExportFormat) -> ExportFormat {
    path.extension()
        .and_then(|e| ExportFormat::from_extension(&e.to_string_lossy()))
        .unwrap_or(fallback)
}

fn run(args: Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    log::info!("Starting {}", config.title);

    let surface = RetainedSurface::new(config.editor.canvas_size());
    let mut session = Session::with_surface(config.editor.clone(), Box::new(DataUrlLoader::new()), surface);
    session.load_project(file_ops::open_project(&args.project)?);

    if let Some(path) = &args.actions {
        let content = std::fs::read_to_string(path).map_err(FileError::from)?;
        let actions: Vec<EditorAction> = serde_json::from_str(&content)?;
        log::info!("Replaying {} actions", actions.len());
        for action in actions {
            session.dispatch(action);
            session.pump();
        }
    }
    session.settle(SETTLE_ROUNDS);

    if let Some(path) = &args.save {
        file_ops::save_project(path, &session.editor().to_project())?;
    }

    if let Some(path) = &args.output {
        let format = output_format(path, config.export_format);
        match session.export(format)? {
            ExportOutcome::Exported(bytes) => file_ops::write_export(path, &bytes)?,
            ExportOutcome::NoSurface => log::warn!("Export skipped: no canvas"),
        }
    }

    log::info!(
        "{} layers, {} on canvas",
        session.editor().layers().len(),
        session.sync().tracked_count()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let result = parse_args(std::env::args().skip(1)).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(message)) => {
            eprintln!("error: {}", message);
            eprintln!(
                "usage: proedit <project.json> [output.png|output.jpg] \
                 [--actions actions.json] [--config config.json] [--save out.json]"
            );
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
