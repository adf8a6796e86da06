use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::json;

use vizport::config::{AfterRender, ConfigError, WidgetConfig};
use vizport::dot::DotSource;
use vizport::error::ErrorCode;
use vizport::loader::{LoadError, ResourceLoader};
use vizport::stage::{MemoryStage, Stage};
use vizport::viewport::Size;
use vizport::widget::{RenderOutcome, WidgetController};


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: std::io::Error },
    #[error("invalid --pan value {0:?}; expected DX,DY")]
    InvalidPan(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("input is empty")]
    EmptyInput,
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "vizport", about = "Render graph descriptions to SVG with pan/zoom/fit")]
struct Cli {
    /// Path to the Graphviz `dot` executable.
    #[arg(long, env = "VIZPORT_DOT")]
    dot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the rendering engine and print its version.
    Check,
    /// Render a graph description and export the drawing.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Source file, or `-` for stdin.
    #[arg(default_value = "-")]
    input: String,

    /// Output file (defaults to the export filename).
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = 800.0)]
    width: f64,

    #[arg(long, default_value_t = 600.0)]
    height: f64,

    /// Reset the view instead of fitting after the render.
    #[arg(long)]
    reset: bool,

    /// Zoom steps to apply after the render (negative zooms out).
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    zoom: i32,

    /// Pan offset to apply after the render, as `DX,DY`.
    #[arg(long, allow_hyphen_values = true)]
    pan: Option<String>,

    /// Write the viewport-framed view instead of the bare drawing.
    #[arg(long)]
    framed: bool,

    /// Print a JSON report of the widget state.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Check => run_check(cli.dot).await,
        Command::Render(args) => run_render(cli.dot, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vizport: {e} ({})", e.error_code());
            ExitCode::FAILURE
        }
    }
}

fn load_config(dot: Option<PathBuf>) -> Result<WidgetConfig, CliError> {
    let mut config = WidgetConfig::from_env()?;
    if let Some(dot) = dot {
        config.dot_program = dot;
    }
    Ok(config)
}

async fn run_check(dot: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(dot)?;
    let loader = ResourceLoader::new(Arc::new(DotSource::new(config.dot_program, config.render_timeout)));
    let capability = loader.ensure_ready().await?;
    println!("{}", capability.describe());
    Ok(())
}

async fn run_render(dot: Option<PathBuf>, args: RenderArgs) -> Result<(), CliError> {
    let mut config = load_config(dot)?;
    if args.reset {
        config.after_render = AfterRender::Reset;
    }
    let pan = args.pan.as_deref().map(parse_pan).transpose()?;
    let source = read_source(&args.input)?;
    if source.is_empty() {
        return Err(CliError::EmptyInput);
    }

    let (widget, stage) = mount_widget(config, Size::new(args.width, args.height));

    let outcome = widget.set_source(&source).await;
    if let RenderOutcome::Failed { message } = &outcome {
        if args.json {
            print_report(&widget, None)?;
        }
        return Err(CliError::Render(message.clone()));
    }

    for _ in 0..args.zoom.unsigned_abs() {
        if args.zoom > 0 {
            widget.zoom_in();
        } else {
            widget.zoom_out();
        }
    }
    if let Some((dx, dy)) = pan {
        widget.pan_by(dx, dy);
    }

    let export = widget.export_svg().ok_or_else(|| CliError::Render("no drawing produced".into()))?;
    let markup = if args.framed { stage.compose().unwrap_or(export.markup) } else { export.markup };
    let out = args.out.unwrap_or_else(|| PathBuf::from(export.filename));
    std::fs::write(&out, markup).map_err(|source| CliError::Write { path: out.display().to_string(), source })?;
    tracing::info!(path = %out.display(), "drawing exported");

    if args.json {
        print_report(&widget, Some(&out))?;
    }
    Ok(())
}

/// Build a widget over `dot` that draws onto an in-memory stage the caller keeps.
fn mount_widget(config: WidgetConfig, viewport: Size) -> (WidgetController, Arc<MemoryStage>) {
    let stage = Arc::new(MemoryStage::new(viewport));
    let capability_source = Arc::new(DotSource::new(config.dot_program.clone(), config.render_timeout));
    let widget = WidgetController::new(capability_source, Arc::clone(&stage) as Arc<dyn Stage>, config);
    (widget, stage)
}

fn print_report(widget: &WidgetController, out: Option<&PathBuf>) -> Result<(), CliError> {
    let status = widget.status();
    let report = json!({
        "widget": widget.id(),
        "status": status,
        "transform": widget.transform(),
        "view_box": widget.drawing().and_then(|d| d.view_box()),
        "output": out.map(|p| p.display().to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn read_source(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| CliError::Read { path: "<stdin>".into(), source })?;
        return Ok(text);
    }
    std::fs::read_to_string(input).map_err(|source| CliError::Read { path: input.to_owned(), source })
}

fn parse_pan(raw: &str) -> Result<(f64, f64), CliError> {
    let invalid = || CliError::InvalidPan(raw.to_owned());
    let (dx, dy) = raw.split_once(',').ok_or_else(invalid)?;
    let dx: f64 = dx.trim().parse().map_err(|_| invalid())?;
    let dy: f64 = dy.trim().parse().map_err(|_| invalid())?;
    Ok((dx, dy))
}

impl ErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Load(e) => e.error_code(),
            Self::Read { .. } => "E_CLI_READ",
            Self::Write { .. } => "E_CLI_WRITE",
            Self::InvalidPan(_) => "E_CLI_INVALID_PAN",
            Self::Render(_) => "E_CLI_RENDER",
            Self::EmptyInput => "E_CLI_EMPTY_INPUT",
            Self::Json(_) => "E_CLI_JSON",
        }
    }
}
