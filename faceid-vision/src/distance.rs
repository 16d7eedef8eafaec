use anyhow::Result;
use ndarray::Array2;

/// Embedding tower output for one image, shape `(1, D)`
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Array2<f32>,
}

impl Embedding {
    pub fn from_vec(values: Vec<f32>) -> Result<Self> {
        let len = values.len();
        Ok(Self {
            vector: Array2::from_shape_vec((1, len), values)?,
        })
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }
}

/// Element-wise absolute difference between two embeddings of the same shape.
///
/// This is the layer that joins the two Siamese towers; the classifier head
/// consumes its output.
pub fn l1_distance(a: &Embedding, b: &Embedding) -> Result<Embedding> {
    if a.vector.shape() != b.vector.shape() {
        anyhow::bail!(
            "embedding shape mismatch: {:?} vs {:?}",
            a.vector.shape(),
            b.vector.shape()
        );
    }

    Ok(Embedding {
        vector: (&a.vector - &b.vector).mapv(f32::abs),
    })
}
