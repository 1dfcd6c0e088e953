//! # kmeans-engine - API documentation
//!
//! kmeans-engine is a small rust library partitioning fixed-dimension samples into `k` clusters
//! (k-means clustering), meant as building block within larger numeric pipelines.
//!
//! ## Design target
//! The engine is deterministic for a given random number generator: all randomness (seed selection)
//! is drawn from the generator passed in through the [`KMeansConfig`], so seeded generators lead to
//! reproducible clusterings. The calculation itself is single-threaded.
//!
//! ## Supported variants
//! - k-Means clustering (Lloyd) [`KMeans::train`]
//!
//! ## Supported centroid initializations
//! The outcome of each K-Means run depends on the initialization of its clusters.
//! - K-Mean++ [`KMeans::init_kmeanplusplus`]
//! - Random-Sample (Forgy) [`KMeans::init_random_sample`]
//!
//! ## Supported primitive types
//! - [`f32`]
//! - [`f64`]
//!
//! ## Example
//! Here is an example showing the default k-Means implementation, using K-Mean++ initialization:
//!
//! ```rust
//! use kmeans_engine::*;
//!
//! let (sample_cnt, sample_dims, k) = (2000, 20, 4);
//!
//! // Generate some random data
//! let mut samples = vec![0.0f64;sample_cnt * sample_dims];
//! samples.iter_mut().for_each(|v| *v = rand::random());
//!
//! // Calculate kmeans, using kmean++ as initialization-method
//! let mut data = Samples::new(samples, sample_cnt, sample_dims).unwrap();
//! let mut kmean = KMeans::new(k).unwrap();
//! let result = kmean.train(&mut data, KMeans::init_kmeanplusplus, &KMeansConfig::default()).unwrap();
//!
//! println!("Centroids: {:?}", kmean.centroids());
//! println!("Cluster-Assignments: {:?}", data.labels());
//! println!("Error: {} ({:?} after {} iterations)", result.distsum, result.status, result.iterations);
//! ```
//!
//! ## Example (using the status event callbacks)
//! ```rust
//! use kmeans_engine::*;
//! use rand::prelude::*;
//!
//! let (sample_cnt, sample_dims, k) = (2000, 20, 4);
//!
//! // Generate some random data
//! let mut samples = vec![0.0f64;sample_cnt * sample_dims];
//! samples.iter_mut().for_each(|v| *v = rand::random());
//!
//! let conf = KMeansConfig::build()
//!     .random_generator(StdRng::seed_from_u64(1337))
//!     .max_iter(500)
//!     .init_done(&|_| println!("Initialization completed."))
//!     .iteration_done(&|s, nr, new_distsum|
//!         println!("Iteration {} - Error: {:.2} -> {:.2} | Improvement: {:.2}",
//!             nr, s.distsum, new_distsum, s.distsum - new_distsum))
//!     .build();
//!
//! let mut data = Samples::new(samples, sample_cnt, sample_dims).unwrap();
//! let mut kmean = KMeans::new(k).unwrap();
//! let result = kmean.train(&mut data, KMeans::init_random_sample, &conf).unwrap();
//!
//! println!("Error: {}", result.distsum);
//! ```
//!
//! ## Short API-Overview / Description
//! Entry-point of the library is the [`KMeans`] struct, created for a fixed amount of clusters. Samples are
//! handed to [`KMeans::train`] through the [`Dataset`] trait, whose per-sample labels receive the final
//! cluster assignments; [`Samples`] is a plain row-major implementation of it. The final centroids stay
//! within the [`KMeans`] instance, while the complete final state of the calculation (centroids, assignments,
//! distances, convergence status) is returned as [`KMeansState`].
//!
//! Training needs exclusive access to both, the engine and the dataset. To cluster multiple datasets
//! concurrently, use one engine per dataset.
//!
//! The initialization method is passed to [`KMeans::train`] as plain function. The provided methods are
//! static methods within the [`KMeans`] struct, which are simply passed in as reference.

#[macro_use] mod helpers;
mod primitive;
mod error;
mod dataset;
mod distances;
mod api;
mod variants;
mod inits;
mod abort_strategy;

pub use abort_strategy::AbortStrategy;
pub use api::{Convergence, EmptyClusterPolicy, KMeansState, KMeansConfig, KMeansConfigBuilder, KMeans};
pub use dataset::{Dataset, Samples};
pub use distances::squared_distance;
pub use error::{KMeansError, Result};
pub use primitive::Primitive;
