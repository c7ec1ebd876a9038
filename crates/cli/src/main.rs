//! edsite-harvest entry point.
//!
//! Walks EDSITEment lesson plans and student resources and publishes them
//! into a catalog directory. Logging goes to stderr; the run summary to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use edsite_client::{
    Assembler, ChannelInfo, FetchClient, FetchConfig, ManifestCatalog, MediaPlatform, MediaPolicy, Materializer,
    PageSource, Pipeline, WalkConfig, WalkMode, YtDlp,
};
use edsite_core::{AppConfig, CacheDb, MetadataDefaults};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Lessons,
    Resources,
    All,
}

impl Mode {
    fn walk_modes(self) -> &'static [WalkMode] {
        match self {
            Mode::Lessons => &[WalkMode::Lessons],
            Mode::Resources => &[WalkMode::Resources],
            Mode::All => &[WalkMode::Lessons, WalkMode::Resources],
        }
    }
}

#[derive(Parser)]
#[command(name = "edsite-harvest", about = "Archive EDSITEment lessons and student resources")]
struct Cli {
    /// TOML config file (also read from EDSITE_CONFIG_FILE)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which traversal to run
    #[arg(short, long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Skip video and audio downloads
    #[arg(long)]
    no_download: bool,

    /// Bypass the page cache
    #[arg(long)]
    no_cache: bool,

    /// Remove expired cache entries before the run
    #[arg(long)]
    purge_cache: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_cache(config: &AppConfig, cli: &Cli) -> Result<Option<CacheDb>> {
    if cli.no_cache {
        tracing::info!("page cache disabled");
        return Ok(None);
    }
    let cache = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening page cache {}", config.db_path.display()))?;
    if cli.purge_cache {
        let removed = cache.purge_expired_pages().await?;
        tracing::info!(removed, "expired cache entries purged");
    }
    Ok(Some(cache))
}

fn media_platform(config: &AppConfig) -> Option<Arc<dyn MediaPlatform>> {
    let platform = match &config.ytdlp_path {
        Some(path) => Some(YtDlp::new(path.clone())),
        None => YtDlp::from_path(),
    };
    match platform {
        Some(platform) => {
            tracing::info!(binary = %platform.binary_path().display(), "media extractor found");
            Some(Arc::new(platform) as Arc<dyn MediaPlatform>)
        }
        None => {
            tracing::warn!("yt-dlp not found; video and audio resources will be skipped");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.no_download {
        config.download_media = false;
    }
    tracing::info!(base_url = %config.base_url, mode = ?cli.mode, "starting harvest");

    let cache = open_cache(&config, &cli).await?;
    let source: Arc<dyn PageSource> = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?, cache)?);

    let catalog = ManifestCatalog::open(&config.output_dir, ChannelInfo::from_config(&config))?;
    let assembler = Assembler::new(&config.work_dir, &config.channel_name, catalog, source.clone())?;
    let defaults = MetadataDefaults::from_config(&config);
    let materializer = Materializer::new(
        source.clone(),
        media_platform(&config),
        MediaPolicy::from_config(&config),
        defaults.clone(),
        config.work_dir.join("media"),
    );

    let mut pipeline = Pipeline::new(source, WalkConfig::from_app_config(&config)?, assembler, materializer, defaults);
    let summary = pipeline.run(cli.mode.walk_modes()).await;
    let manifest = pipeline.into_catalog().finish()?;

    println!(
        "published {} units, skipped {}, failed {}; catalog at {}",
        summary.published,
        summary.skipped,
        summary.failed,
        manifest.display()
    );
    Ok(())
}
