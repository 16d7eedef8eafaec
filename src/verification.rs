use anyhow::{Context, Result};
use faceid_vision::{l1_distance, preprocess, SimilarityModel};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::references;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no reference images found in {0}")]
    NoReferences(String),
    #[error("{name} threshold must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    detection: f32,
    verification: f32,
}

impl Thresholds {
    pub fn new(detection: f32, verification: f32) -> Result<Self, VerifyError> {
        for (name, value) in [("detection", detection), ("verification", verification)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VerifyError::ThresholdOutOfRange { name, value });
            }
        }
        Ok(Self {
            detection,
            verification,
        })
    }

    pub fn detection(&self) -> f32 {
        self.detection
    }

    pub fn verification(&self) -> f32 {
        self.verification
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// One raw score per reference image, in reference order
    pub scores: Vec<f32>,
    /// Scores strictly above the detection threshold
    pub detections: usize,
    /// `detections / scores.len()`, always within [0, 1]
    pub ratio: f32,
    pub thresholds: Thresholds,
    pub verified: bool,
}

/// Threshold raw scores into a decision.
///
/// `scores` must be non-empty; the reference set is what the ratio is taken over.
pub fn decide(scores: Vec<f32>, thresholds: Thresholds) -> Result<Verdict, VerifyError> {
    if scores.is_empty() {
        return Err(VerifyError::NoReferences("score set".to_string()));
    }

    let detections = scores
        .iter()
        .filter(|&&s| s > thresholds.detection)
        .count();
    let ratio = detections as f32 / scores.len() as f32;

    Ok(Verdict {
        verified: ratio > thresholds.verification,
        scores,
        detections,
        ratio,
        thresholds,
    })
}

/// Score the probe against every image in `reference_dir` and decide.
pub fn verify<M: SimilarityModel>(
    model: &mut M,
    probe_path: &Path,
    reference_dir: &Path,
    thresholds: Thresholds,
) -> Result<Verdict> {
    let refs = references::list_references(reference_dir)?;
    if refs.is_empty() {
        return Err(VerifyError::NoReferences(reference_dir.display().to_string()).into());
    }
    log::info!("Scoring probe against {} reference(s)", refs.len());

    let probe = preprocess::preprocess_path(probe_path).context("preprocessing probe")?;
    let probe_embedding = model.embed(&probe).context("embedding probe")?;

    let mut scores = Vec::with_capacity(refs.len());
    for path in &refs {
        let reference = preprocess::preprocess_path(path)?;
        let embedding = model
            .embed(&reference)
            .with_context(|| format!("embedding {}", path.display()))?;
        let score = model.classify(&l1_distance(&probe_embedding, &embedding)?)?;
        log::debug!("{}: {:.4}", path.display(), score);
        scores.push(score);
    }

    let verdict = decide(scores, thresholds)?;
    log::info!(
        "Detections: {}/{} ratio {:.3} (verification threshold {:.3})",
        verdict.detections,
        verdict.scores.len(),
        verdict.ratio,
        thresholds.verification
    );
    Ok(verdict)
}
