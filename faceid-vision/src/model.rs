use anyhow::{Context, Result};
#[cfg(any(feature = "openvino", feature = "cuda"))]
use ort::ep::{self, ExecutionProvider};
use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
    value::Value,
};
use std::path::Path;

use crate::distance::{l1_distance, Embedding};
use crate::preprocess::InputImage;

/// Two-tower similarity model.
///
/// `similarity` runs both images through the same embedding tower, joins
/// them with the L1 distance and feeds the result to the classifier head.
pub trait SimilarityModel {
    fn embed(&mut self, image: &InputImage) -> Result<Embedding>;

    /// Map an L1 distance vector to a similarity score in [0, 1]
    fn classify(&mut self, distance: &Embedding) -> Result<f32>;

    fn similarity(&mut self, probe: &InputImage, reference: &InputImage) -> Result<f32> {
        let a = self.embed(probe)?;
        let b = self.embed(reference)?;
        self.classify(&l1_distance(&a, &b)?)
    }
}

pub fn session_builder() -> Result<SessionBuilder> {
    #[allow(unused_mut)]
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

pub fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        anyhow::bail!("model file not found: {}", path.display());
    }
    let session = session_builder()?
        .commit_from_file(path)
        .with_context(|| format!("load model {}", path.display()))?;
    log::debug!(
        "loaded {}: inputs={:?} outputs={:?}",
        path.display(),
        session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
        session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>()
    );
    Ok(session)
}

/// ONNX Runtime Siamese network, exported as two graphs:
/// the embedding tower `(1, 100, 100, 3) -> (1, D)` and the classifier head
/// `(1, D) -> (1, 1)` with a sigmoid output.
pub struct Siamese {
    pub embedding: Session,
    pub classifier: Session,
}

impl Siamese {
    pub fn load(embedding_model: &Path, classifier_model: &Path) -> Result<Self> {
        Ok(Self {
            embedding: load_session(embedding_model).context("embedding model")?,
            classifier: load_session(classifier_model).context("classifier model")?,
        })
    }
}

impl SimilarityModel for Siamese {
    fn embed(&mut self, image: &InputImage) -> Result<Embedding> {
        let input_tensor = Value::from_array(image.to_tensor())?;
        let outputs = self.embedding.run(ort::inputs![input_tensor])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        // Expecting shape [1, D]
        let embedding_size = if shape.len() == 2 {
            shape[1] as usize
        } else {
            data.len()
        };
        Embedding::from_vec(data[0..embedding_size].to_vec())
    }

    fn classify(&mut self, distance: &Embedding) -> Result<f32> {
        let input_tensor = Value::from_array(distance.vector.clone())?;
        let outputs = self.classifier.run(ort::inputs![input_tensor])?;
        let (_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        data.first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("classifier returned an empty tensor"))
    }
}
