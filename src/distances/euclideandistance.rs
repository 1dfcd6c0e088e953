use crate::primitive::Primitive;

/// Squared euclidean distance between two samples of equal dimensionality.
///
/// Both operands are expected to stem from the same dataset, so their lengths are only
/// checked in debug builds.
#[inline(always)]
pub fn squared_distance<T: Primitive>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len(), "samples of differing dimensionality");
    a.iter().cloned()
        .zip(b.iter().cloned())
        .map(|(sv, cv)| sv - cv)        // <sample> - <centroid>
        .map(|v| v * v)                 // <vec_components> ^2
        .sum()
}
