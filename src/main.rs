use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceid::{capture, config, references, verification, Siamese};
use faceid_vision::video::Camera;
use log::info;

#[derive(Parser)]
#[command(name = "faceid")]
#[command(version, about = "Siamese-network face verification against a reference set")]
struct Cli {
    /// Config file (defaults to the built-in path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a probe frame and verify it against the reference images
    Verify {
        /// Use this image as the probe instead of the camera
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Print the full verdict as JSON
        #[arg(long)]
        json: bool,
    },
    /// Capture reference images from the camera
    Enroll {
        /// Number of frames to store
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// List the reference images that verification scores against
    References,
    /// Open config file in editor
    Config,
}

fn main() -> Result<ExitCode> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Verify { image, json } => verify(&cfg, image, json),
        Commands::Enroll { count } => enroll(&cfg, count).map(|_| ExitCode::SUCCESS),
        Commands::References => list(&cfg).map(|_| ExitCode::SUCCESS),
        Commands::Config => open_config(cli.config).map(|_| ExitCode::SUCCESS),
    }
}

fn verify(cfg: &config::Config, image: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let thresholds = cfg.thresholds()?;

    let mut model = Siamese::load(&cfg.paths.embedding_model, &cfg.paths.classifier_model)
        .context("Failed to load Siamese model")?;

    let probe_path = match image {
        Some(path) => path,
        None => {
            info!("Opening camera: {}", cfg.camera);
            let mut camera = Camera::open(&cfg.camera).context("Failed to open camera")?;
            capture::capture_probe(
                &mut camera,
                cfg.crop.into(),
                &cfg.paths.probe_image,
                cfg.warmup_frames,
            )?;
            cfg.paths.probe_image.clone()
        }
    };

    let verdict = verification::verify(
        &mut model,
        &probe_path,
        &cfg.paths.reference_dir,
        thresholds,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        println!("{}", if verdict.verified { "Verified" } else { "Unverified" });
    }

    Ok(if verdict.verified {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn enroll(cfg: &config::Config, count: usize) -> Result<()> {
    info!("Opening camera: {}", cfg.camera);
    let mut camera = Camera::open(&cfg.camera).context("Failed to open camera")?;
    capture::warm_up(&mut camera, cfg.warmup_frames)?;

    info!("Capturing {} reference frame(s)...", count);
    for i in 0..count {
        let frame = capture::grab(&mut camera, cfg.crop.into())?;
        let path = references::add_reference(&cfg.paths.reference_dir, &frame)
            .context("Failed to save reference image")?;
        info!("Frame {}: {}", i + 1, path.display());

        // Small delay so consecutive references differ
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    info!(
        "✓ {} reference image(s) stored in {}",
        count,
        cfg.paths.reference_dir.display()
    );
    Ok(())
}

fn list(cfg: &config::Config) -> Result<()> {
    let refs = references::list_references(&cfg.paths.reference_dir)?;
    for path in &refs {
        println!("{}", path.display());
    }
    info!("{} reference image(s)", refs.len());
    Ok(())
}

fn open_config(path: Option<PathBuf>) -> Result<()> {
    let config_path = path.unwrap_or_else(|| config::CONFIG_PATH.to_path_buf());
    if !config_path.exists() {
        config::save_config(&config::Config::default(), Some(&config_path))
            .context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
