use anyhow::{Context, Result};
use faceid_vision::{video, Camera, CropRegion};
use image::RgbImage;
use std::path::Path;

/// Read and discard `count` frames so auto exposure can settle
pub fn warm_up(camera: &mut Camera, count: usize) -> Result<()> {
    for _ in 0..count {
        camera.frame().context("warmup frame")?;
    }
    Ok(())
}

/// Grab one frame and cut the capture window out of it
pub fn grab(camera: &mut Camera, region: CropRegion) -> Result<RgbImage> {
    let frame = camera.frame().context("Failed to capture frame")?;
    video::crop(&frame, region)
}

/// Capture the probe frame and write it to `probe_path`
pub fn capture_probe(
    camera: &mut Camera,
    region: CropRegion,
    probe_path: &Path,
    warmup: usize,
) -> Result<RgbImage> {
    warm_up(camera, warmup)?;
    let probe = grab(camera, region)?;
    save_probe(&probe, probe_path)?;
    Ok(probe)
}

pub fn save_probe(probe: &RgbImage, probe_path: &Path) -> Result<()> {
    if let Some(parent) = probe_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    probe
        .save(probe_path)
        .with_context(|| format!("writing probe {}", probe_path.display()))?;
    log::debug!("probe written to {}", probe_path.display());
    Ok(())
}
