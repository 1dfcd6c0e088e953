use crate::{primitive::*, AbortStrategy, Dataset, KMeansError, Result};
use std::cell::RefCell;
use rand::prelude::*;
use log::debug;

pub type InitDoneCallbackFn<'a, T> = &'a dyn Fn(&KMeansState<T>);
pub type IterationDoneCallbackFn<'a, T> = &'a dyn Fn(&KMeansState<T>, usize, T);

/// What to do with a cluster that lost all of its samples during an assignment pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EmptyClusterPolicy {
    /// Move the sample with the highest distance to its centroid (taken from a cluster with more than
    /// one sample) into the empty cluster, and use it as that cluster's centroid.
    #[default]
    StealFarthest,
    /// Reset the centroid of the empty cluster to the all-zero vector.
    ResetToZero,
    /// Leave the centroid of the empty cluster where it was.
    KeepPrevious,
}

/// Outcome of the refinement loop of a k-means calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convergence {
    /// An assignment pass did not move a single sample.
    Converged,
    /// The configured [`AbortStrategy`] stopped the calculation before a fixed point was reached.
    Stalled,
    /// The configured iteration limit was reached before a fixed point.
    MaxIterationsReached,
}

/// This is a structure holding various configuration options for the a k-means calculations, such as
/// the random number generator to use, or a couple of callbacks, that can be set to get status information from
/// a running k-means calculation.
///
/// For a more detailed information about all possible options, have a look at [`KMeansConfigBuilder`].
pub struct KMeansConfig<'a, T: Primitive> {
    /// Callback that is called, when the initialization phase finished
    /// ## Arguments
    /// - **state**: Current [`KMeansState`] after the initialization
    pub(crate) init_done: InitDoneCallbackFn<'a, T>,
    /// Callback that is called after each iteration
    /// ## Arguments
    /// - **state**: Current[`KMeansState`] after the iteration
    /// - **iteration_id**: Number of the current iteration
    /// - **distsum**: New distance sum (**state** contains the distsum from the previous iteration)
    pub(crate) iteration_done: IterationDoneCallbackFn<'a, T>,
    /// Random number generator to use
    pub(crate) rnd: Box<RefCell<dyn RngCore>>,
    /// The abort-strategy to use for the running calculation
    pub(crate) abort_strategy: AbortStrategy<T>,
    /// Upper bound for the amount of refinement iterations
    pub(crate) max_iter: usize,
    pub(crate) empty_cluster_policy: EmptyClusterPolicy,
}
impl<'a, T: Primitive> Default for KMeansConfig<'a, T> {
    fn default() -> Self {
        Self {
            init_done: &|_| {},
            iteration_done: &|_,_,_| {},
            rnd: Box::new(RefCell::new(StdRng::from_entropy())),
            abort_strategy: AbortStrategy::NoChange,
            max_iter: 300,
            empty_cluster_policy: EmptyClusterPolicy::default(),
        }
    }
}
impl<'a, T: Primitive> KMeansConfig<'a, T> {
    /// Use the [`KMeansConfigBuilder`] to build a [`KMeansConfig`] instance.
    pub fn build() -> KMeansConfigBuilder<'a, T> {
        KMeansConfigBuilder { config: KMeansConfig::default() }
    }
}
impl<'a, T: Primitive> std::fmt::Debug for KMeansConfig<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KMeansConfig")
            .field("abort_strategy", &self.abort_strategy)
            .field("max_iter", &self.max_iter)
            .field("empty_cluster_policy", &self.empty_cluster_policy)
            .finish_non_exhaustive()
    }
}

pub struct KMeansConfigBuilder<'a, T: Primitive> {
    config: KMeansConfig<'a, T>
}
impl<'a, T: Primitive> KMeansConfigBuilder<'a, T> {
    /// Set the callback that should be called after the centroid initialization, before the iteration starts.
    pub fn init_done(mut self, init_done: InitDoneCallbackFn<'a, T>) -> Self {
        self.config.init_done = init_done; self
    }
    /// Set the callback that should be called after each iteration during a running k-means calculation.
    pub fn iteration_done(mut self, iteration_done: IterationDoneCallbackFn<'a, T>) -> Self {
        self.config.iteration_done = iteration_done; self
    }
    /// Set the random number generator that should be used in the k-means calculation.
    /// Use a seeded generator for deterministically repeatable results.
    pub fn random_generator<R: RngCore + 'static>(mut self, rnd: R) -> Self {
        self.config.rnd = Box::new(RefCell::new(rnd)); self
    }
    /// Set the abort-strategy to use during a running k-means calculation. For more information,
    /// see documentation of [`AbortStrategy`].
    /// ## Default
    /// [`AbortStrategy::NoChange`]
    pub fn abort_strategy(mut self, abort_strategy: AbortStrategy<T>) -> Self {
        self.config.abort_strategy = abort_strategy; self
    }
    /// Limit the amount of refinement iterations. At least one assignment pass is always done.
    /// ## Default
    /// `300`
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter; self
    }
    /// Set the policy for clusters that end up without any samples.
    /// ## Default
    /// [`EmptyClusterPolicy::StealFarthest`]
    pub fn empty_cluster_policy(mut self, policy: EmptyClusterPolicy) -> Self {
        self.config.empty_cluster_policy = policy; self
    }
    /// Return the internally built configuration structure.
    pub fn build(self) -> KMeansConfig<'a, T> { self.config }
}


/// This is the internally used data-structure, storing the current state during calculation, as
/// well as the final result, as returned by the API.
///
/// ## Generics
/// - **T**: Underlying primitive type that was used for the calculation
///
/// ## Fields
/// - **k**: The amount of clusters that were requested when calculating this k-means result
/// - **distsum**: The total sum of (squared) distances from all samples to their respective centroids
/// - **centroids**: Calculated cluster centers [row-major] = [<centroid0>,<centroid1>,<centroid2>,...]
/// - **centroid_frequency**: Amount of samples in each centroid
/// - **assignments**: Vector mapping each sample to its respective nearest cluster (`None` while unassigned)
/// - **centroid_distances**: Vector containing each sample's (squared) distance to its centroid
/// - **iterations**: Amount of completed refinement iterations (assignment + centroid update)
/// - **status**: Why the refinement loop stopped
#[derive(Clone, Debug)]
pub struct KMeansState<T: Primitive> {
    pub k: usize,
    pub distsum: T,
    pub centroids: Vec<T>,
    pub centroid_frequency: Vec<usize>,
    pub assignments: Vec<Option<usize>>,
    pub centroid_distances: Vec<T>,
    pub iterations: usize,
    pub status: Convergence,

    pub(crate) sample_dims: usize
}
impl<T: Primitive> KMeansState<T> {
    pub(crate) fn new(sample_cnt: usize, sample_dims: usize, k: usize) -> Self {
        Self {
            k,
            distsum: T::zero(),
            centroids: vec![T::zero(); sample_dims * k],
            centroid_frequency: vec![0usize;k],
            assignments: vec![None;sample_cnt],
            centroid_distances: vec![T::infinity();sample_cnt],
            iterations: 0,
            status: Convergence::MaxIterationsReached,
            sample_dims
        }
    }
    pub(crate) fn set_centroid_from_iter(&mut self, idx: usize, src: impl Iterator<Item = T>) {
        self.centroids.iter_mut().skip(self.sample_dims * idx).take(self.sample_dims)
                .zip(src)
                .for_each(|(c,s)| *c = s);
    }

    /// Centroid of the cluster with index **idx**.
    pub fn centroid(&self, idx: usize) -> &[T] {
        &self.centroids[idx * self.sample_dims..(idx + 1) * self.sample_dims]
    }

    pub fn sample_dims(&self) -> usize { self.sample_dims }
}


/// Entrypoint of this crate's API-Surface.
///
/// An instance owns the requested amount of clusters, and the centroids of the last successful
/// [`KMeans::train`] call. The samples themselves are handed in on every call, through the [`Dataset`] trait.
///
/// ## Supported initialization methods
/// - K-Mean++ [`KMeans::init_kmeanplusplus`]
/// - Random-Sample (Forgy) [`KMeans::init_random_sample`]
#[derive(Clone, Debug)]
pub struct KMeans<T: Primitive> {
    k: usize,
    sample_dims: usize,
    centroids: Vec<T>,
}
impl<T: Primitive> KMeans<T> {
    /// Create a new engine, searching for **k** clusters.
    ///
    /// ## Errors
    /// [`KMeansError::NoClusters`] if `k == 0`.
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(KMeansError::NoClusters);
        }
        Ok(Self { k, sample_dims: 0, centroids: Vec::new() })
    }

    /// Amount of clusters this engine searches for.
    pub fn k(&self) -> usize { self.k }

    /// Dimensionality of the centroids (0 before the first successful training).
    pub fn sample_dims(&self) -> usize { self.sample_dims }

    /// Centroids of the last successful training [row-major] = [<centroid0>,<centroid1>,...].
    /// Empty before the first successful training.
    pub fn centroids(&self) -> &[T] { &self.centroids }

    /// Centroid of the cluster with index **idx**, if the engine was trained.
    pub fn centroid(&self, idx: usize) -> Option<&[T]> {
        if self.centroids.is_empty() || idx >= self.k {
            return None;
        }
        Some(&self.centroids[idx * self.sample_dims..(idx + 1) * self.sample_dims])
    }

    /// Cluster the samples of **data** (Lloyd's algorithm).
    ///
    /// The labels of **data** are cleared, and overwritten with the final cluster assignments.
    /// The final centroids are kept within this instance (see [`KMeans::centroids`]).
    ///
    /// When **data** holds exactly `k` samples, every sample becomes its own cluster (sample `i` is
    /// labeled `i`, centroid `i` is sample `i`), without invoking **init**.
    ///
    /// ## Arguments
    /// - **data**: Samples to cluster
    /// - **init**: Initialization-Method to use for the initialization of the **k** centroids
    /// - **config**: [`KMeansConfig`] instance, containing several configuration options for the calculation.
    ///
    /// ## Returns
    /// Instance of [`KMeansState`], containing the final state (result).
    ///
    /// ## Errors
    /// - [`KMeansError::TooFewPoints`] if **data** holds fewer than `k` samples. The labels are left untouched.
    /// - Any error of the initialization method (e.g. [`KMeansError::Sampling`]). The labels of **data**
    ///   were already cleared at that point, and are left unassigned (`None`).
    ///
    /// ## Example
    /// ```rust
    /// use kmeans_engine::*;
    /// use rand::prelude::*;
    ///
    /// let (sample_cnt, sample_dims, k) = (2000, 8, 4);
    /// let mut rnd = StdRng::seed_from_u64(42);
    /// let samples: Vec<f64> = (0..sample_cnt * sample_dims).map(|_| rnd.gen()).collect();
    ///
    /// let mut data = Samples::new(samples, sample_cnt, sample_dims).unwrap();
    /// let mut kmean = KMeans::new(k).unwrap();
    /// let conf = KMeansConfig::build().random_generator(rnd).build();
    /// let result = kmean.train(&mut data, KMeans::init_kmeanplusplus, &conf).unwrap();
    ///
    /// assert_eq!(kmean.centroids().len(), k * sample_dims);
    /// assert!(data.labels().iter().all(|l| l.map_or(false, |c| c < k)));
    /// println!("Error: {}", result.distsum);
    /// ```
    pub fn train<'a, S, F>(&mut self, data: &mut S, init: F, config: &KMeansConfig<'a, T>) -> Result<KMeansState<T>>
                where S: Dataset<T> + ?Sized,
                    for<'c> F: FnOnce(&S, &mut KMeansState<T>, &KMeansConfig<'c, T>) -> Result<()> {
        let sample_cnt = data.size();
        if sample_cnt < self.k {
            return Err(KMeansError::TooFewPoints { samples: sample_cnt, k: self.k });
        }
        data.clear_labels();

        let state = if sample_cnt == self.k {
            debug!("{} samples for {} clusters, every sample forms its own cluster", sample_cnt, self.k);
            Self::singleton_clusters(&*data, self.k)
        } else {
            crate::variants::Lloyd::calculate(&*data, self.k, init, config)?
        };

        state.assignments.iter().enumerate()
            .for_each(|(idx, assignment)| data.set_label(idx, *assignment));
        self.sample_dims = state.sample_dims;
        self.centroids = state.centroids.clone();
        Ok(state)
    }

    fn singleton_clusters<S: Dataset<T> + ?Sized>(data: &S, k: usize) -> KMeansState<T> {
        let mut state = KMeansState::new(k, data.dimension(), k);
        for idx in 0..k {
            state.set_centroid_from_iter(idx, data.input_vector(idx).iter().cloned());
            state.assignments[idx] = Some(idx);
            state.centroid_distances[idx] = T::zero();
            state.centroid_frequency[idx] = 1;
        }
        state.status = Convergence::Converged;
        state
    }

    /// K-Means++ initialization method
    ///
    /// ## Description
    /// This initialization method starts by selecting one sample (uniformly at random) as first centroid.
    /// Proceeding from there, the method iteratively selects one new centroid (per iteration) among the samples
    /// that were not chosen yet. A sample's probability of being chosen is proportional to its squared distance to
    /// the nearest centroid selected so far. The chosen samples are assigned to the cluster they seeded.
    ///
    /// ## Note
    /// This method is not meant for direct invocation. Pass a reference to it, to [`KMeans::train`].
    pub fn init_kmeanplusplus<S: Dataset<T> + ?Sized>(data: &S, state: &mut KMeansState<T>, config: &KMeansConfig<'_, T>) -> Result<()> {
        crate::inits::kmeanplusplus::calculate(data, state, config)
    }

    /// Random sample initialization method (a.k.a. Forgy)
    ///
    /// ## Description
    /// This initialization method randomly selects k distinct samples as initial centroids.
    ///
    /// ## Note
    /// This method is not meant for direct invocation. Pass a reference to it, to [`KMeans::train`].
    pub fn init_random_sample<S: Dataset<T> + ?Sized>(data: &S, state: &mut KMeansState<T>, config: &KMeansConfig<'_, T>) -> Result<()> {
        crate::inits::randomsample::calculate(data, state, config)
    }
}
