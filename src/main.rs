use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfembed::embed::SourceContext;
use pdfembed::output::PngAssets;
use pdfembed::processor::{BlockProcessor, DEFAULT_DISPLAY_WIDTH, RenderContext};
use pdfembed::settings::{Settings, SettingsStore};
use pdfembed::vault::Vault;
use pdfembed::{DocumentLoader, markdown};

#[derive(Parser)]
#[command(name = "pdfembed", version, about = "Embed rendered PDF pages into Markdown notes")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log file
    #[arg(long, global = true, default_value = "pdfembed.log")]
    log_file: PathBuf,

    /// Log debug details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace every ```pdf block in the given notes with rendered pages
    Render {
        /// Notes to render, relative to the vault root or absolute
        #[arg(required = true)]
        notes: Vec<PathBuf>,

        #[command(flatten)]
        pass: PassArgs,

        /// Print the rewritten notes instead of saving them
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the resolved render plans of a note as JSON
    Plan {
        note: PathBuf,

        #[command(flatten)]
        pass: PassArgs,
    },
    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct PassArgs {
    /// Vault root
    #[arg(long, default_value = ".")]
    vault: PathBuf,

    /// Folder for rendered page images, relative to the vault root
    #[arg(long, default_value = ".pdfembed")]
    assets: String,

    /// Width in pixels that fit-to-width pages are rendered for
    #[arg(long, default_value_t = DEFAULT_DISPLAY_WIDTH)]
    display_width: u32,

    /// Override fit_by_default for this run
    #[arg(long)]
    fit: Option<bool>,

    /// Override link_by_default for this run
    #[arg(long)]
    link: Option<bool>,
}

impl PassArgs {
    fn snapshot(&self, settings: &Settings) -> Settings {
        Settings {
            fit_by_default: self.fit.unwrap_or(settings.fit_by_default),
            link_by_default: self.link.unwrap_or(settings.link_by_default),
            ..settings.clone()
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set {
        /// fit_by_default or link_by_default
        key: String,
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

fn main() -> Result<()> {
    better_panic::install();
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("failed to create log file {}", cli.log_file.display()))?,
    )?;

    info!("Starting pdfembed");

    let store = match &cli.config {
        Some(path) => SettingsStore::at(path),
        None => SettingsStore::discover(),
    };

    let ok = match &cli.command {
        Command::Render {
            notes,
            pass,
            dry_run,
        } => render_notes(&store.load(), notes, pass, *dry_run)?,
        Command::Plan { note, pass } => {
            plan_note(&store.load(), note, pass)?;
            true
        }
        Command::Config { action } => {
            configure(&store, action)?;
            true
        }
    };

    info!("Shutting down pdfembed");
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(feature = "pdf")]
fn loader() -> Result<Box<dyn DocumentLoader>> {
    Ok(Box::new(pdfembed::pdf::MupdfLoader))
}

#[cfg(not(feature = "pdf"))]
fn loader() -> Result<Box<dyn DocumentLoader>> {
    anyhow::bail!("pdfembed was built without the `pdf` feature, rendering is unavailable")
}

fn note_path(vault: &Vault, note: &std::path::Path) -> Result<String> {
    vault
        .relative_path(note)
        .with_context(|| format!("{} is not inside the vault", note.display()))
}

/// Returns false when any note could not be read or written.
fn render_notes(
    settings: &Settings,
    notes: &[PathBuf],
    pass: &PassArgs,
    dry_run: bool,
) -> Result<bool> {
    let vault = Vault::open(&pass.vault)?;
    let loader = loader()?;
    let snapshot = pass.snapshot(settings);
    let ctx = RenderContext {
        settings: &snapshot,
        files: &vault,
        links: &vault,
        loader: loader.as_ref(),
        display_width: pass.display_width,
    };
    let mut processor = BlockProcessor::new(ctx);
    let mut sink = PngAssets::new(vault.full_path(&pass.assets), pass.assets.as_str());

    let mut ok = true;
    for note in notes {
        let result = note_path(&vault, note).and_then(|rel| {
            let full = vault.full_path(&rel);
            let text = fs::read_to_string(&full)
                .with_context(|| format!("failed to read {}", full.display()))?;
            let (rendered, stats) =
                processor.process_note(&text, &SourceContext::new(rel.as_str()), &mut sink);
            info!("{rel}: {stats:?}");

            if dry_run {
                print!("{rendered}");
            } else if rendered != text {
                fs::write(&full, &rendered)
                    .with_context(|| format!("failed to write {}", full.display()))?;
            }
            println!(
                "{rel}: {} blocks ({} failed), {} pages ({} failed)",
                stats.blocks, stats.failed_blocks, stats.pages, stats.failed_pages
            );
            Ok(())
        });

        if let Err(e) = result {
            error!("{e:#}");
            eprintln!("{e:#}");
            ok = false;
        }
    }
    Ok(ok)
}

fn plan_note(settings: &Settings, note: &std::path::Path, pass: &PassArgs) -> Result<()> {
    let vault = Vault::open(&pass.vault)?;
    let loader = loader()?;
    let snapshot = pass.snapshot(settings);
    let ctx = RenderContext {
        settings: &snapshot,
        files: &vault,
        links: &vault,
        loader: loader.as_ref(),
        display_width: pass.display_width,
    };
    let mut processor = BlockProcessor::new(ctx);

    let rel = note_path(&vault, note)?;
    let full = vault.full_path(&rel);
    let text =
        fs::read_to_string(&full).with_context(|| format!("failed to read {}", full.display()))?;
    let source = SourceContext::new(rel.as_str());

    let blocks: Vec<serde_json::Value> = markdown::find_blocks(&text)
        .iter()
        .map(|block| match processor.resolve(&block.source, &source) {
            Ok(resolved) => serde_json::json!({
                "path": resolved.reference.path,
                "options": resolved.options,
                "pages": processor.plan_block(&resolved),
            }),
            Err(e) => serde_json::json!({ "error": e.inline_message() }),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}

fn configure(store: &SettingsStore, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = store.load();
            if let Some(path) = store.path() {
                println!("# {}", path.display());
            }
            print!("{}", serde_yaml::to_string(&settings)?);
        }
        ConfigAction::Set { key, value } => {
            let settings = store.set(key, *value)?;
            info!("Updated {key} to {value}");
            print!("{}", serde_yaml::to_string(&settings)?);
        }
    }
    Ok(())
}
