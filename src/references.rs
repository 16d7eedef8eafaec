use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

/// Every decodable image file directly inside `dir`, sorted by name.
pub fn list_references(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;

    let mut refs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        let path = entry.path();
        // Follows symlinks, so linked images count as references
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                log::warn!("skipping non-file entry {}", path.display());
                continue;
            }
            Err(e) => {
                log::warn!("skipping unreadable entry {}: {}", path.display(), e);
                continue;
            }
        }
        if ImageFormat::from_path(&path).is_err() {
            log::warn!("skipping non-image file {}", path.display());
            continue;
        }
        refs.push(path);
    }

    refs.sort();
    Ok(refs)
}

/// Store a new reference image under a random name.
pub fn add_reference(dir: &Path, image: &RgbImage) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{}.jpg", uuid::Uuid::new_v4()));
    image
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
