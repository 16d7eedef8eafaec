use anyhow::Result;
use faceid::verification::{self, Thresholds, VerifyError};
use faceid::{references, Embedding, InputImage};
use faceid_vision::SimilarityModel;
use image::{Rgb, RgbImage};
use std::path::PathBuf;

/// Mean colour per channel as the embedding; score falls off with distance
struct MeanColour {
    embedded: usize,
}

impl SimilarityModel for MeanColour {
    fn embed(&mut self, image: &InputImage) -> Result<Embedding> {
        self.embedded += 1;
        let n = (image.pixels.len() / 3) as f32;
        let mut sums = [0.0f32; 3];
        for ((_, _, c), v) in image.pixels.indexed_iter() {
            sums[c] += v;
        }
        Embedding::from_vec(sums.iter().map(|s| s / n).collect())
    }

    fn classify(&mut self, distance: &Embedding) -> Result<f32> {
        let mean = distance.vector.mean().unwrap_or(0.0);
        Ok((1.0 - mean).clamp(0.0, 1.0))
    }
}

struct Scratch(PathBuf);

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("faceid-it-{}-{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(dir.join("verification_img")).unwrap();
        Self(dir)
    }

    fn refs(&self) -> PathBuf {
        self.0.join("verification_img")
    }

    fn probe(&self, colour: [u8; 3]) -> PathBuf {
        let path = self.0.join("input_img.jpg");
        RgbImage::from_pixel(250, 250, Rgb(colour)).save(&path).unwrap();
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.0).ok();
    }
}

#[test]
fn test_same_image_is_verified() -> Result<()> {
    env_logger::try_init().ok();
    let dir = Scratch::new("same");
    let probe = dir.probe([120, 80, 60]);
    for _ in 0..4 {
        references::add_reference(&dir.refs(), &RgbImage::from_pixel(250, 250, Rgb([120, 80, 60])))?;
    }

    let mut model = MeanColour { embedded: 0 };
    let verdict = verification::verify(&mut model, &probe, &dir.refs(), Thresholds::new(0.9, 0.8)?)?;

    assert_eq!(verdict.scores.len(), 4);
    assert!(verdict.scores.iter().all(|&s| s > 0.99));
    assert_eq!(verdict.ratio, 1.0);
    assert!(verdict.verified);
    // Probe embedded once, then once per reference
    assert_eq!(model.embedded, 5);
    Ok(())
}

#[test]
fn test_different_images_are_unverified() -> Result<()> {
    env_logger::try_init().ok();
    let dir = Scratch::new("different");
    let probe = dir.probe([255, 255, 255]);
    references::add_reference(&dir.refs(), &RgbImage::from_pixel(250, 250, Rgb([255, 255, 255])))?;
    for _ in 0..3 {
        references::add_reference(&dir.refs(), &RgbImage::new(250, 250))?;
    }

    let mut model = MeanColour { embedded: 0 };
    let verdict = verification::verify(&mut model, &probe, &dir.refs(), Thresholds::new(0.9, 0.8)?)?;

    assert_eq!(verdict.scores.len(), 4);
    assert_eq!(verdict.detections, 1);
    assert_eq!(verdict.ratio, 0.25);
    assert!(!verdict.verified);
    Ok(())
}

#[test]
fn test_score_count_matches_image_count() -> Result<()> {
    let dir = Scratch::new("count");
    let probe = dir.probe([10, 20, 30]);
    for _ in 0..3 {
        references::add_reference(&dir.refs(), &RgbImage::new(64, 64))?;
    }
    std::fs::write(dir.refs().join("README"), "ignored")?;

    let mut model = MeanColour { embedded: 0 };
    let verdict = verification::verify(&mut model, &probe, &dir.refs(), Thresholds::new(0.5, 0.5)?)?;
    assert_eq!(verdict.scores.len(), references::list_references(&dir.refs())?.len());
    assert_eq!(verdict.scores.len(), 3);
    Ok(())
}

#[test]
fn test_empty_reference_directory_is_reported() -> Result<()> {
    let dir = Scratch::new("empty");
    let probe = dir.probe([0, 0, 0]);

    let mut model = MeanColour { embedded: 0 };
    let err = verification::verify(&mut model, &probe, &dir.refs(), Thresholds::new(0.9, 0.8)?)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VerifyError>(),
        Some(VerifyError::NoReferences(_))
    ));
    assert_eq!(model.embedded, 0);
    Ok(())
}

#[test]
fn test_missing_probe_propagates() -> Result<()> {
    let dir = Scratch::new("missing-probe");
    references::add_reference(&dir.refs(), &RgbImage::new(32, 32))?;

    let mut model = MeanColour { embedded: 0 };
    let result = verification::verify(
        &mut model,
        &dir.0.join("does-not-exist.jpg"),
        &dir.refs(),
        Thresholds::new(0.9, 0.8)?,
    );
    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_verdict_serializes_to_json() -> Result<()> {
    let verdict = verification::decide(vec![0.95, 0.2], Thresholds::new(0.9, 0.4)?)?;
    let json: serde_json::Value = serde_json::to_value(&verdict)?;
    assert_eq!(json["detections"], 1);
    assert_eq!(json["verified"], true);
    assert!((json["thresholds"]["detection"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    assert!((json["thresholds"]["verification"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    assert_eq!(json["scores"].as_array().map(|a| a.len()), Some(2));
    Ok(())
}
