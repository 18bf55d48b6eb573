//! CLI Entry Point for signal_panes
//!
//! Provides a headless command-line front end for the engine:
//! - `view`: load files into a fresh session, apply visibility/sync/zoom edits and
//!   print the resulting render calls and control-table model
//! - `config`: print the effective configuration
//!
//! # Usage
//!
//! ```bash
//! signal_panes view a.csv b.csv --layout 2x2 --hide a.csv:X@2 --sync 1 --sync 2 --zoom 1=10:20
//! signal_panes config --config config/signal_panes.toml
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use signal_panes::catalog::SignalId;
use signal_panes::config::{AppConfig, DEFAULT_CONFIG_PATH};
use signal_panes::ingest::read_delimited;
use signal_panes::layout::LayoutMode;
use signal_panes::logging;
use signal_panes::pane::{render_channel, ChannelPane, PaneIndex, RenderCommand, ZoomRange};
use signal_panes::registry::SessionRegistry;
use signal_panes::sync::ZoomEvent;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "signal_panes")]
#[command(about = "Multi-pane signal viewer engine", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load files into a session and print render calls and the table model
    View {
        /// Delimited files to upload, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Layout override (1x1, 1x2, 2x1, 2x2)
        #[arg(long)]
        layout: Option<LayoutMode>,

        /// Hide a signal in a pane: FILE:SIGNAL@PANE (pane 1-4)
        #[arg(long, value_parser = parse_hide)]
        hide: Vec<HideArg>,

        /// Add a pane (1-4) to the zoom sync group
        #[arg(long, value_parser = parse_pane)]
        sync: Vec<PaneIndex>,

        /// Zoom a pane: PANE=START:END, or PANE=reset
        #[arg(long, value_parser = parse_zoom)]
        zoom: Vec<ZoomArg>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone)]
struct HideArg {
    signal: SignalId,
    pane: PaneIndex,
}

#[derive(Debug, Clone)]
struct ZoomArg {
    pane: PaneIndex,
    event: ZoomEvent,
}

fn parse_pane(value: &str) -> Result<PaneIndex, String> {
    let number: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a pane number"))?;
    number
        .checked_sub(1)
        .and_then(|index| PaneIndex::new(index).ok())
        .ok_or_else(|| format!("pane must be 1-4, got {number}"))
}

fn parse_hide(value: &str) -> Result<HideArg, String> {
    let (key, pane) = value
        .rsplit_once('@')
        .ok_or_else(|| format!("expected FILE:SIGNAL@PANE, got '{value}'"))?;
    let (file, name) = key
        .split_once(':')
        .ok_or_else(|| format!("expected FILE:SIGNAL@PANE, got '{value}'"))?;
    Ok(HideArg {
        signal: SignalId::new(file, name),
        pane: parse_pane(pane)?,
    })
}

fn parse_zoom(value: &str) -> Result<ZoomArg, String> {
    let (pane, range) = value
        .split_once('=')
        .ok_or_else(|| format!("expected PANE=START:END or PANE=reset, got '{value}'"))?;
    let pane = parse_pane(pane)?;
    if range.trim().eq_ignore_ascii_case("reset") {
        return Ok(ZoomArg {
            pane,
            event: ZoomEvent::Reset,
        });
    }
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{range}'"))?;
    let start: f64 = start.trim().parse().map_err(|_| format!("bad start '{start}'"))?;
    let end: f64 = end.trim().parse().map_err(|_| format!("bad end '{end}'"))?;
    let range = ZoomRange::new(start, end).map_err(|e| e.to_string())?;
    Ok(ZoomArg {
        pane,
        event: ZoomEvent::Range(range),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    logging::init_from_config(&config)?;

    match cli.command {
        Commands::View {
            files,
            layout,
            hide,
            sync,
            zoom,
        } => view(config, files, layout, hide, sync, zoom).await,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn view(
    mut config: AppConfig,
    files: Vec<PathBuf>,
    layout: Option<LayoutMode>,
    hide: Vec<HideArg>,
    sync: Vec<PaneIndex>,
    zoom: Vec<ZoomArg>,
) -> Result<()> {
    if let Some(layout) = layout {
        config.layout.default = layout;
    }
    let delimiter = config.ingestion.delimiter_byte();
    info!(app = %config.application.name, layout = %config.layout.default, "Starting view");

    let registry = SessionRegistry::new(config);
    let opened = registry.open();
    let session = opened.handle.clone();

    let (render_tx, mut render_rx) = render_channel();
    for pane in PaneIndex::ALL {
        session
            .attach_pane(pane, Arc::new(ChannelPane::new(render_tx.clone())))
            .await?;
    }

    for path in &files {
        let name = file_name(path)?;
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let table = read_delimited(BufReader::new(file), delimiter)?;
        let outcome = session.ingest_file(name.clone(), table).await?;
        match outcome.warning {
            Some(warning) => warn!(file = %name, "{}", warning),
            None => info!(file = %name, signals = ?outcome.added_signals, "File ingested"),
        }
    }

    for pane in sync {
        session.set_sync(pane, true).await?;
    }
    for arg in hide {
        session.set_cell(arg.signal, arg.pane, false).await?;
    }
    session.flush_now().await?;

    for arg in zoom {
        let updated = session.zoom_changed(arg.pane, arg.event).await?;
        info!(pane = %arg.pane, synced = updated.len(), "Zoom applied");
    }

    while let Ok(command) = render_rx.try_recv() {
        match command {
            RenderCommand::TraceVisibility {
                pane,
                signal,
                visible,
            } => println!("{pane}: {} {signal}", if visible { "show" } else { "hide" }),
            RenderCommand::ZoomRange { pane, range } => match range {
                Some(range) => println!("{pane}: zoom {}..{}", range.start, range.end),
                None => println!("{pane}: autoscale"),
            },
        }
    }

    let model = session.snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&model)?);

    registry.close_all().await;
    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))
}
