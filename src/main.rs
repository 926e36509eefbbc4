//! Headless driver: loads a catalog, scatters its planes, resolves textures and
//! applies gesture commands read line by line from stdin.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use glam::Vec2;
use scatter_gallery::catalog::Catalog;
use scatter_gallery::config::Configuration;
use scatter_gallery::events::{LoadTexture, TextureOutcome, UserInput};
use scatter_gallery::scene::Frame;
use scatter_gallery::texture::Material;
use scatter_gallery::tasks::{loader, session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "scatter-gallery",
    version,
    about = "3D scattered image gallery driven from stdin"
)]
struct Args {
    /// Path to YAML config (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Catalog JSON file or image directory; overrides catalog-path
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
    /// Deterministic placement seed; overrides placement-seed
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Viewport size used for popup layout
    #[arg(long, value_name = "WxH", default_value = "1920x1080", value_parser = parse_viewport)]
    viewport: Vec2,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn parse_viewport(s: &str) -> Result<Vec2, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {s:?}"))?;
    let w: f32 = w.trim().parse().map_err(|_| format!("bad width in {s:?}"))?;
    let h: f32 = h.trim().parse().map_err(|_| format!("bad height in {s:?}"))?;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("viewport must be positive, got {s:?}"));
    }
    Ok(Vec2::new(w, h))
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(format!("scatter_gallery={level}").parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        catalog,
        seed,
        viewport,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let mut cfg = match &config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(path) = catalog {
        cfg.catalog_path = path;
    }
    if seed.is_some() {
        cfg.placement_seed = seed;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    if cfg.catalog_path.as_os_str().is_empty() {
        return Err(anyhow!("no catalog given; set catalog-path or pass --catalog"));
    }

    let catalog = Catalog::load(&cfg.catalog_path)
        .with_context(|| format!("failed to load catalog from {}", cfg.catalog_path.display()))?;
    info!(images = catalog.len(), path = %cfg.catalog_path.display(), "catalog loaded");

    let (input_tx, input_rx) = mpsc::channel::<UserInput>(32);
    let (load_tx, load_rx) = mpsc::channel::<LoadTexture>(64);
    let (outcome_tx, outcome_rx) = mpsc::channel::<TextureOutcome>(64);
    let (frame_tx, mut frame_rx) = mpsc::channel::<Frame>(8);
    let cancel = CancellationToken::new();

    let mut tasks = JoinSet::new();
    tasks.spawn(loader::run(
        load_rx,
        outcome_tx,
        cancel.clone(),
        cfg.loader_max_concurrent_decodes,
        cfg.texture_timeout,
    ));
    tasks.spawn(session::run(
        session::Session::new(&cfg, catalog, viewport),
        input_rx,
        outcome_rx,
        load_tx,
        frame_tx,
        cancel.clone(),
    ));
    tasks.spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            log_frame(&frame);
        }
        Ok::<_, anyhow::Error>(())
    });
    tasks.spawn(read_commands(input_tx, cancel.clone()));

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received; shutting down");
                cancel.cancel();
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!("task failed: {err:#}");
                cancel.cancel();
            }
            Err(err) => {
                warn!("task panicked: {err}");
                cancel.cancel();
            }
        }
    }
    Ok(())
}

async fn read_commands(input_tx: mpsc::Sender<UserInput>, cancel: CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.context("reading stdin")?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<UserInput>() {
            Ok(input) => {
                if input_tx.send(input).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!("{err}"),
        }
    }
    Ok(())
}

fn log_frame(frame: &Frame) {
    let loaded = frame
        .planes
        .iter()
        .filter(|p| matches!(p.material, Material::Texture(_)))
        .count();
    let failed = frame
        .planes
        .iter()
        .filter(|p| matches!(p.material, Material::FallbackTint(_)))
        .count();
    match &frame.popup {
        Some(popup) => info!(
            planes = frame.planes.len(),
            loaded,
            failed,
            index = popup.index,
            title = %popup.record.title,
            objects = popup.record.object_count,
            "frame: viewing"
        ),
        None => info!(planes = frame.planes.len(), loaded, failed, "frame: browsing"),
    }
}
