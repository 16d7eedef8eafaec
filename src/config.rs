use anyhow::{Context, Result};
use faceid_vision::CropRegion;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::verification::Thresholds;

pub static CONFIG_PATH: Lazy<&'static Path> =
    Lazy::new(|| Path::new(option_env!("FACEID_CONFIG_PATH").unwrap_or("faceid.toml")));

pub static DATA_PREFIX: Lazy<&'static Path> =
    Lazy::new(|| Path::new(option_env!("FACEID_DATA_PREFIX").unwrap_or("application_data")));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: String,
    /// A single score must exceed this to count as a detection
    pub detection_threshold: f32,
    /// Fraction of references that must be detections
    pub verification_threshold: f32,
    /// Frames discarded after opening the camera while exposure settles
    pub warmup_frames: usize,
    pub paths: Paths,
    pub crop: Crop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub embedding_model: PathBuf,
    pub classifier_model: PathBuf,
    /// Captured frame is written here before it is compared
    pub probe_image: PathBuf,
    pub reference_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: "/dev/video0".to_string(),
            detection_threshold: 0.9,
            verification_threshold: 0.8,
            warmup_frames: 0,
            paths: Paths::default(),
            crop: Crop::default(),
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            embedding_model: DATA_PREFIX.join("models").join("embedding.onnx"),
            classifier_model: DATA_PREFIX.join("models").join("classifier.onnx"),
            probe_image: DATA_PREFIX.join("input_img").join("input_img.jpg"),
            reference_dir: DATA_PREFIX.join("verification_img"),
        }
    }
}

impl Default for Crop {
    fn default() -> Self {
        CropRegion::default().into()
    }
}

impl From<CropRegion> for Crop {
    fn from(r: CropRegion) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

impl From<Crop> for CropRegion {
    fn from(c: Crop) -> Self {
        Self {
            x: c.x,
            y: c.y,
            width: c.width,
            height: c.height,
        }
    }
}

impl Config {
    pub fn thresholds(&self) -> Result<Thresholds> {
        Ok(Thresholds::new(
            self.detection_threshold,
            self.verification_threshold,
        )?)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse_config(raw: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(raw)?;
    cfg.thresholds()?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
