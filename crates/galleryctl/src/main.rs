mod files;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use futures_util::future::BoxFuture;
use gallery_core::{
    Gallery, GalleryConfig, HttpImageLoader, ImageLoader, LoadError, SharePlatform, Tile,
    TileState, UploadSource,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::files::collect_files;

#[derive(Parser)]
#[command(name = "galleryctl", version, about = "CLI tools for the image gallery")]
struct Cli {
    /// Gallery config file (JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Suppress warnings
    #[arg(long)]
    quiet: bool,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the images shown for a category
    List {
        #[arg(long, default_value = "all")]
        category: String,
    },
    /// Load every tile of a category and report fallbacks and failures
    Check {
        #[arg(long, default_value = "all")]
        category: String,
    },
    /// Validate and add local images, then print the resulting view
    Upload {
        #[arg(value_hint = clap::ValueHint::AnyPath, required = true)]
        paths: Vec<PathBuf>,
        /// Category for the uploaded images (unknown names become misc)
        #[arg(long)]
        category: Option<String>,
        /// Category shown after the upload
        #[arg(long, default_value = "all")]
        view: String,
    },
    /// Print the share URL for an image in a category
    Share {
        #[arg(long)]
        platform: String,
        #[arg(long)]
        index: usize,
        #[arg(long, default_value = "all")]
        category: String,
        /// Page address to share (overrides config)
        #[arg(long)]
        page_url: Option<String>,
    },
    /// Generate shell completion script
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    if let Commands::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    let config = GalleryConfig::resolve(cli.config.as_deref()).context("failed to load config")?;
    let mut gallery = Gallery::new(&config);

    match cli.command {
        Commands::List { category } => list_command(&mut gallery, &category, cli.json),
        Commands::Check { category } => check_command(&mut gallery, &category, cli.json).await,
        Commands::Upload {
            paths,
            category,
            view,
        } => upload_command(&mut gallery, paths, category, &view, cli.json, cli.quiet).await,
        Commands::Share {
            platform,
            index,
            category,
            page_url,
        } => share_command(&mut gallery, &platform, index, &category, page_url),
        Commands::Completion { .. } => Ok(()),
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn list_command(gallery: &mut Gallery, category: &str, as_json: bool) -> Result<()> {
    gallery.set_category(category);
    print_view(gallery, as_json)
}

fn print_view(gallery: &Gallery, as_json: bool) -> Result<()> {
    if as_json {
        let items: Vec<&gallery_core::ImageDescriptor> = gallery.view_items().collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if gallery.view().is_empty() {
        println!("(no images in {})", gallery.view().filter());
        return Ok(());
    }
    for (position, item) in gallery.view_items().enumerate() {
        let origin = if item.is_local { "local" } else { "remote" };
        println!(
            "{:>3}  {:<13} {:<6} {}",
            position, item.category, origin, item.label
        );
    }
    Ok(())
}

/// Counts load attempts on a progress spinner.
struct ProgressLoader<'a> {
    inner: &'a HttpImageLoader,
    bar: ProgressBar,
}

impl ImageLoader for ProgressLoader<'_> {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), LoadError>> {
        Box::pin(async move {
            let outcome = self.inner.load(url).await;
            self.bar.inc(1);
            outcome
        })
    }
}

async fn check_command(gallery: &mut Gallery, category: &str, as_json: bool) -> Result<()> {
    gallery.set_category(category);
    let loader = HttpImageLoader::new();
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {pos} load attempts [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    let progress = ProgressLoader {
        inner: &loader,
        bar: bar.clone(),
    };

    let tiles = gallery.render(&progress).await;
    bar.finish_and_clear();

    if as_json {
        let report: Vec<_> = tiles.iter().map(tile_json).collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut failed = 0usize;
    for tile in &tiles {
        let status = match &tile.state {
            TileState::Loaded { .. } if tile.attempts.len() > 1 => "fallback".to_string(),
            TileState::Loaded { .. } => "ok".to_string(),
            TileState::Failed(failure) => {
                failed += 1;
                format!("failed ({failure})")
            }
            TileState::Pending | TileState::Loading { .. } => "pending".to_string(),
        };
        println!("{:>3}  {:<18} {}", tile.position, status, tile.label);
    }
    println!("{} tiles, {} failed", tiles.len(), failed);
    Ok(())
}

fn tile_json(tile: &Tile) -> serde_json::Value {
    json!({
        "position": tile.position,
        "catalog_index": tile.catalog_index,
        "label": tile.label,
        "url": tile.display_url(),
        "failure": tile.failure().map(|failure| failure.to_string()),
        "attempts": tile.attempts,
    })
}

async fn upload_command(
    gallery: &mut Gallery,
    paths: Vec<PathBuf>,
    category: Option<String>,
    view: &str,
    as_json: bool,
    quiet: bool,
) -> Result<()> {
    let (files, warnings) = collect_files(&paths);
    if !quiet {
        for warning in &warnings {
            eprintln!("warning: {}: {}", warning.path.display(), warning.message);
        }
    }

    gallery.set_category(view);
    let selection: Vec<Box<dyn UploadSource>> = files
        .into_iter()
        .map(|file| Box::new(file) as Box<dyn UploadSource>)
        .collect();
    let rejected = gallery.select_files(selection);
    for err in &rejected {
        eprintln!("rejected: {err}");
    }

    let report = gallery
        .commit_uploads(category.as_deref())
        .await
        .context("nothing to upload")?;
    for err in &report.failures {
        eprintln!("failed: {err}");
    }
    if !as_json {
        println!(
            "added {} image(s), {} rejected, {} failed",
            report.added.len(),
            rejected.len(),
            report.failures.len()
        );
    }
    print_view(gallery, as_json)
}

fn share_command(
    gallery: &mut Gallery,
    platform: &str,
    index: usize,
    category: &str,
    page_url: Option<String>,
) -> Result<()> {
    if let Some(page_url) = page_url {
        gallery.set_page_url(page_url);
    }
    let Some(parsed) = SharePlatform::parse(platform) else {
        let known: Vec<&str> = SharePlatform::ALL.iter().map(|p| p.as_str()).collect();
        return Err(anyhow!(
            "unknown platform {platform} (expected one of {})",
            known.join(", ")
        ));
    };
    gallery.set_category(category);
    gallery.open(index)?;
    let url = gallery
        .share(parsed.as_str())
        .ok_or_else(|| anyhow!("could not build share url"))?;
    println!("{url}");
    Ok(())
}
