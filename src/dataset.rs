use crate::{primitive::Primitive, KMeansError, Result};

/// Storage of the samples to cluster, together with one (mutable) cluster label per sample.
///
/// The engine only reads the sample vectors, and takes exclusive write access to the labels
/// while [`KMeans::train`](crate::KMeans::train) is running. A label of `None` marks a sample
/// that is not (yet) assigned to any cluster.
pub trait Dataset<T: Primitive> {
    /// Amount of samples stored.
    fn size(&self) -> usize;
    /// Amount of dimensions every sample has.
    fn dimension(&self) -> usize;
    /// Sample vector at **idx** (length: [`Dataset::dimension`]).
    fn input_vector(&self, idx: usize) -> &[T];
    /// Current cluster label of the sample at **idx**.
    fn label(&self, idx: usize) -> Option<usize>;
    fn set_label(&mut self, idx: usize, label: Option<usize>);

    /// Mark every sample as unassigned.
    fn clear_labels(&mut self) {
        for idx in 0..self.size() {
            self.set_label(idx, None);
        }
    }
}

/// Plain [`Dataset`] implementation, storing all samples in one row-major buffer.
#[derive(Clone, Debug)]
pub struct Samples<T: Primitive> {
    sample_cnt: usize,
    sample_dims: usize,
    samples: Vec<T>,
    labels: Vec<Option<usize>>,
}
impl<T: Primitive> Samples<T> {
    /// Create a new instance of the [`Samples`] structure.
    ///
    /// ## Arguments
    /// - **samples**: Vector of samples [row-major] = [<sample0>,<sample1>,<sample2>,...]
    /// - **sample_cnt**: Amount of samples, contained in the passed **samples** vector
    /// - **sample_dims**: Amount of dimensions each sample from the **sample** vector has
    ///
    /// ## Errors
    /// [`KMeansError::ShapeMismatch`] if `samples.len() != sample_cnt * sample_dims`.
    pub fn new(samples: Vec<T>, sample_cnt: usize, sample_dims: usize) -> Result<Self> {
        if samples.len() != sample_cnt * sample_dims {
            return Err(KMeansError::ShapeMismatch { len: samples.len(), sample_cnt, sample_dims });
        }
        Ok(Self { sample_cnt, sample_dims, samples, labels: vec![None; sample_cnt] })
    }

    /// Current labels of all samples, in sample order.
    pub fn labels(&self) -> &[Option<usize>] { &self.labels }

    /// The raw row-major sample buffer, as passed to [`Samples::new`].
    pub fn samples(&self) -> &[T] { &self.samples }
}

impl<T: Primitive> Dataset<T> for Samples<T> {
    fn size(&self) -> usize { self.sample_cnt }
    fn dimension(&self) -> usize { self.sample_dims }
    fn input_vector(&self, idx: usize) -> &[T] {
        &self.samples[idx * self.sample_dims..(idx + 1) * self.sample_dims]
    }
    fn label(&self, idx: usize) -> Option<usize> { self.labels[idx] }
    fn set_label(&mut self, idx: usize, label: Option<usize>) { self.labels[idx] = label; }
}
