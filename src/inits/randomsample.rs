use crate::{primitive::*, Dataset, KMeansConfig, KMeansError, KMeansState, Result};
use rand::seq::index;
use log::debug;
use std::ops::DerefMut;

/// Draws `k` distinct sample indices (uniformly, without replacement) and copies these samples
/// into the centroids. Assignments are left untouched.
pub(crate) fn calculate<T, S>(data: &S, state: &mut KMeansState<T>, config: &KMeansConfig<'_, T>) -> Result<()>
where
    T: Primitive,
    S: Dataset<T> + ?Sized,
{
    if state.k > data.size() {
        return Err(KMeansError::TooFewPoints { samples: data.size(), k: state.k });
    }
    let picks = index::sample(config.rnd.borrow_mut().deref_mut(), data.size(), state.k);
    debug!("random sample initialization picked samples {:?}", picks);
    picks.iter()
        .enumerate()
        .for_each(|(ci, si)| { // Copy randomly chosen samples into state.centroids
            state.set_centroid_from_iter(ci, data.input_vector(si).iter().cloned());
        });
    Ok(())
}
