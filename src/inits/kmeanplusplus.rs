use crate::distances::squared_distance;
use crate::{primitive::*, Dataset, KMeansConfig, KMeansError, KMeansState, Result};
use rand::distributions::{WeightedError, WeightedIndex};
use rand::prelude::*;
use log::{debug, trace};
use std::ops::DerefMut;

pub(crate) fn calculate<T, S>(data: &S, state: &mut KMeansState<T>, config: &KMeansConfig<'_, T>) -> Result<()>
where
    T: Primitive,
    S: Dataset<T> + ?Sized,
{
    let sample_cnt = data.size();
    let mut chosen = vec![false; sample_cnt];

    for k in 0..state.k {
        let sample_id = if k == 0 {
            // Randomly select first centroid
            config.rnd.borrow_mut().gen_range(0..sample_cnt)
        } else {
            pick_weighted(&state.centroid_distances, &chosen, config.rnd.borrow_mut().deref_mut())?
                .ok_or(KMeansError::TooFewPoints { samples: sample_cnt, k: state.k })?
        };
        trace!("k-means++ seeds cluster {} with sample {}", k, sample_id);
        chosen[sample_id] = true;
        state.assignments[sample_id] = Some(k);
        state.set_centroid_from_iter(k, data.input_vector(sample_id).iter().cloned());

        // Each sample keeps the distance to its nearest centroid chosen so far
        let newest = &state.centroids[k * state.sample_dims..(k + 1) * state.sample_dims];
        state.centroid_distances.iter_mut()
            .enumerate()
            .for_each(|(si, dist)| {
                let d = squared_distance(data.input_vector(si), newest);
                if d < *dist {
                    *dist = d;
                }
            });
    }
    state.distsum = state.centroid_distances.iter().cloned().sum();
    debug!("k-means++ initialization done, distsum: {}", state.distsum);
    Ok(())
}

/// Draw the index of the next seed among the samples that were not chosen yet, with a probability
/// proportional to each sample's distance to its nearest centroid.
///
/// The weights are accumulated in ascending sample order, and the first sample whose accumulated
/// weight exceeds a uniform draw from `[0, total)` is picked. Should all remaining weights be zero,
/// the unchosen sample with the lowest index is returned. `None` means that every sample was already chosen.
/// Weights that are (or sum up to) a non-finite value are rejected with [`WeightedError::InvalidWeight`].
pub(crate) fn pick_weighted<T, R>(distances: &[T], chosen: &[bool], rnd: &mut R) -> Result<Option<usize>>
where
    T: Primitive,
    R: Rng + ?Sized,
{
    let weights: Vec<T> = distances.iter().cloned()
        .zip(chosen.iter().cloned())
        .map(|(d, c)| if c { T::zero() } else { d })
        .collect();
    // WeightedIndex only rejects NaN and negative weights, an infinite total panics while sampling
    let total = weights.iter().fold(T::zero(), |acc, w| acc + *w);
    if !total.is_finite() {
        return Err(WeightedError::InvalidWeight.into());
    }
    match WeightedIndex::new(weights.iter().cloned()) {
        // Use rand's WeightedIndex to randomly draw a centroid, while respecting their probabilities
        Ok(index) => Ok(Some(index.sample(rnd))),
        Err(WeightedError::AllWeightsZero) | Err(WeightedError::NoItem) => {
            Ok(chosen.iter().position(|c| !c))
        }
        Err(err) => Err(err.into()),
    }
}
