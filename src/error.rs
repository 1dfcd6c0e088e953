use rand::distributions::WeightedError;
use thiserror::Error;

/// Errors produced while setting up or running a k-means calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KMeansError {
    /// The dataset holds fewer samples than clusters were requested.
    #[error("dataset holds {samples} samples, but {k} clusters were requested")]
    TooFewPoints { samples: usize, k: usize },
    /// An engine was requested for zero clusters.
    #[error("the number of clusters must be at least 1")]
    NoClusters,
    /// A raw sample buffer does not match the announced sample count and dimensionality.
    #[error("sample buffer of length {len} does not hold {sample_cnt} samples with {sample_dims} dimensions")]
    ShapeMismatch { len: usize, sample_cnt: usize, sample_dims: usize },
    /// Weighted seed selection was handed unusable (e.g. non-finite) weights.
    #[error("weighted seed selection failed: {0}")]
    Sampling(#[from] WeightedError),
}

pub type Result<T> = std::result::Result<T, KMeansError>;
