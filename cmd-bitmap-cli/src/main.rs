//! Command Bit Map CLI Application
//!
//! Renders the bit layout of command definitions into an HTML page.
//! It uses the cmd-bitmap library and adds:
//! - Command selection (whole file, `commands` array, or by text offset)
//! - Sample payload enrichment from a directory
//! - TOML configuration with CLI overrides
//! - Standalone HTML page output

use anyhow::{bail, Context, Result};
use clap::Parser;
use cmd_bitmap::{
    derive_command_id, locate_command, IndexStyle, NoSamples, Renderer, SampleFetcher,
    UpdateSession, UpdateTarget,
};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod page;
mod samples;

use config::AppConfig;
use page::PageSurface;
use samples::DirectorySampleFetcher;

/// Command Bit Map - Visualize the bit layout of binary commands
#[derive(Parser, Debug)]
#[command(name = "cmd-bitmap")]
#[command(about = "Render the byte/bit layout of command definitions as HTML", long_about = None)]
#[command(version)]
struct Args {
    /// Command or signal-set JSON file
    #[arg(long, value_name = "FILE")]
    command: Option<PathBuf>,

    /// Render only the command enclosing this byte offset of the file
    #[arg(long, value_name = "OFFSET")]
    at: Option<usize>,

    /// Output HTML file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of `<command-id>.txt` sample payload files
    #[arg(long, value_name = "DIR")]
    samples: Option<PathBuf>,

    /// Show alphabetic byte labels (A, B, ..., AA) initially
    #[arg(long)]
    alpha: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Command Bit Map CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using cmd-bitmap library v{}", cmd_bitmap::VERSION);

    let config = resolve_config(&args)?;
    let Some(command_path) = config.input.command.clone() else {
        eprintln!("Command Bit Map - No input specified");
        eprintln!("\nQuick Start:");
        eprintln!("  cmd-bitmap --command command.json --output bitmap.html");
        eprintln!("  cmd-bitmap --command signalset.json --at 1200");
        eprintln!("\nUse --help for more options");
        return Ok(());
    };

    let text = fs::read_to_string(&command_path)
        .with_context(|| format!("Failed to read command file: {:?}", command_path))?;
    let targets = select_targets(&text, args.at)?;
    log::info!("Rendering {} command(s) from {:?}", targets.len(), command_path);

    let surface = Arc::new(PageSurface::new());
    let renderer = Renderer::new(config.render.clone());
    match &config.samples.dir {
        Some(dir) => {
            log::info!("Loading sample payloads from {:?}", dir);
            let fetcher = DirectorySampleFetcher::new(dir);
            let session =
                UpdateSession::new(renderer, fetcher, Arc::clone(&surface), config.session.clone());
            render_all(&session, targets).await;
        }
        None => {
            let session = UpdateSession::new(
                renderer,
                NoSamples,
                Arc::clone(&surface),
                config.session.clone(),
            );
            render_all(&session, targets).await;
        }
    }

    match &config.output.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            let mut writer = BufWriter::new(file);
            surface.write_page(&mut writer, &config.output.title)?;
            writer.flush()?;
            log::info!("Bit map written to {:?}", path);
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            surface.write_page(&mut writer, &config.output.title)?;
        }
    }

    Ok(())
}

/// Config file (if any) with CLI flags applied on top
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(command) = &args.command {
        config.input.command = Some(command.clone());
    }
    if let Some(output) = &args.output {
        config.output.file = Some(output.clone());
    }
    if let Some(samples) = &args.samples {
        config.samples.dir = Some(samples.clone());
    }
    if args.alpha {
        config.render.index_style = IndexStyle::Alpha;
    }

    Ok(config)
}

/// Commands to render from a file's text
///
/// With an offset, only the command enclosing it. Otherwise every entry of
/// a top-level `commands` array, or the document itself.
fn select_targets(text: &str, at: Option<usize>) -> Result<Vec<UpdateTarget>> {
    if let Some(offset) = at {
        let lookup = locate_command(text, offset);
        let (true, Some(command)) = (lookup.is_command, lookup.command) else {
            bail!("No command definition encloses offset {}", offset);
        };
        return Ok(vec![titled(command, 0)]);
    }

    let document: Value =
        serde_json::from_str(text).context("Failed to parse command file as JSON")?;
    match document.get("commands").and_then(Value::as_array) {
        Some(commands) => Ok(commands
            .iter()
            .enumerate()
            .map(|(i, command)| titled(command.clone(), i))
            .collect()),
        None => Ok(vec![titled(document, 0)]),
    }
}

fn titled(command: Value, index: usize) -> UpdateTarget {
    let title = derive_command_id(&command).unwrap_or_else(|| format!("Command {}", index + 1));
    UpdateTarget::new(command).with_title(title)
}

async fn render_all<F: SampleFetcher>(
    session: &UpdateSession<F, Arc<PageSurface>>,
    targets: Vec<UpdateTarget>,
) {
    for target in targets {
        let title = target.title.clone().unwrap_or_default();
        let outcome = session.update_now(target).await;
        log::debug!("{}: {:?}", title, outcome);
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
