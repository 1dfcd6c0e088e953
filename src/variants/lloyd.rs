use crate::distances::squared_distance;
use crate::{primitive::*, Convergence, Dataset, EmptyClusterPolicy, KMeansConfig, KMeansState, Result};
use log::{debug, info, trace, warn};
use std::cmp::Ordering;

pub(crate) struct Lloyd<T: Primitive> {
    _p: std::marker::PhantomData<T>
}
impl<T: Primitive> Lloyd<T> {
    /// Assigns every sample to its nearest centroid (ties go to the lower centroid index), and stores
    /// the sample's distance to it. Returns the amount of samples that changed their cluster.
    pub(crate) fn update_cluster_assignments<S: Dataset<T> + ?Sized>(data: &S, state: &mut KMeansState<T>) -> usize {
        let (centroids, dims, k) = (&state.centroids, state.sample_dims, state.k);
        let mut changes = 0;
        for (si, (assignment, centroid_dist)) in state.assignments.iter_mut().zip(state.centroid_distances.iter_mut()).enumerate() {
            let s = data.input_vector(si);
            let (best_idx, best_dist) = (0..k)
                .map(|ci| squared_distance(s, &centroids[ci * dims..(ci + 1) * dims]))
                .enumerate()
                .fold((0, T::infinity()), |best, (ci, d)| if d < best.1 { (ci, d) } else { best });
            if *assignment != Some(best_idx) {
                *assignment = Some(best_idx);
                changes += 1;
            }
            *centroid_dist = best_dist;
        }
        changes
    }

    pub(crate) fn update_cluster_frequencies(assignments: &[Option<usize>], centroid_frequency: &mut [usize]) -> usize {
        centroid_frequency.iter_mut().for_each(|v| *v = 0);
        let mut used_centroids_cnt = 0;
        assignments.iter().flatten().cloned()
            .for_each(|centroid_id| {
                if centroid_frequency[centroid_id] == 0 {
                    used_centroids_cnt += 1; // Count the amount of centroids with more than 0 samples
                }
                centroid_frequency[centroid_id] += 1;
            });
        used_centroids_cnt
    }

    pub(crate) fn update_centroid_distances<S: Dataset<T> + ?Sized>(data: &S, state: &mut KMeansState<T>) {
        let (centroids, dims) = (&state.centroids, state.sample_dims);
        state.centroid_distances.iter_mut()
            .zip(state.assignments.iter())
            .enumerate()
            .for_each(|(si, (centroid_dist, assignment))| {
                if let Some(ci) = *assignment {
                    *centroid_dist = squared_distance(data.input_vector(si), &centroids[ci * dims..(ci + 1) * dims]);
                }
            });
    }

    fn update_centroids<S: Dataset<T> + ?Sized>(data: &S, state: &mut KMeansState<T>, policy: EmptyClusterPolicy) {
        let dims = state.sample_dims;
        // Sum all samples in a cluster together into new_centroids
        let used_centroids_cnt = Self::update_cluster_frequencies(&state.assignments, &mut state.centroid_frequency);
        let mut new_centroids = vec![T::zero(); state.centroids.len()];
        let mut member_cnt = vec![T::zero(); state.k];
        state.assignments.iter().enumerate()
            .filter_map(|(si, a)| a.map(|ci| (si, ci)))
            .for_each(|(si, ci)| {
                new_centroids[ci * dims..(ci + 1) * dims].iter_mut()
                    .zip(data.input_vector(si))
                    .for_each(|(c, s)| *c += s);
                member_cnt[ci] += T::one();
            });

        if used_centroids_cnt != state.k {
            match policy {
                EmptyClusterPolicy::StealFarthest => {
                    Self::steal_for_empty_clusters(data, state, &mut new_centroids, &mut member_cnt);
                }
                EmptyClusterPolicy::ResetToZero => {
                    warn!("{} empty cluster(s), resetting their centroids to zero", state.k - used_centroids_cnt);
                }
                EmptyClusterPolicy::KeepPrevious => {
                    debug!("{} empty cluster(s), keeping their previous centroids", state.k - used_centroids_cnt);
                    for ci in (0..state.k).filter(|&ci| state.centroid_frequency[ci] == 0) {
                        new_centroids[ci * dims..(ci + 1) * dims].copy_from_slice(&state.centroids[ci * dims..(ci + 1) * dims]);
                    }
                }
            }
        }

        // Calculate new centroids from updated cluster_assignments
        state.centroids.chunks_mut(dims.max(1))
            .zip(new_centroids.chunks(dims.max(1)))
            .zip(member_cnt.iter().cloned())
            .for_each(|((c, nc), cnt)| {
                if cnt > T::zero() {
                    c.iter_mut().zip(nc.iter().cloned()).for_each(|(c, nc)| *c = nc / cnt);
                } else {
                    c.copy_from_slice(nc);
                }
            });
    }

    /// Moves the sample with the highest distance to its centroid, that is not alone in its cluster,
    /// into every cluster without samples.
    fn steal_for_empty_clusters<S: Dataset<T> + ?Sized>(data: &S, state: &mut KMeansState<T>, new_centroids: &mut [T], member_cnt: &mut [T]) {
        let dims = state.sample_dims;
        let mut distance_sorted_samples: Vec<usize> = (0..state.assignments.len()).collect();
        distance_sorted_samples.sort_by(|&i1, &i2|
            state.centroid_distances[i1].partial_cmp(&state.centroid_distances[i2]).unwrap_or(Ordering::Equal));

        for ci in 0..state.k {
            if state.centroid_frequency[ci] != 0 {
                continue;
            }
            let candidate = distance_sorted_samples.iter().rev().cloned()
                .find_map(|si| state.assignments[si]
                    .filter(|&prev| state.centroid_frequency[prev] > 1)
                    .map(|prev| (si, prev)));
            let Some((sample_id, prev_centroid_id)) = candidate else {
                break;
            };
            debug!("cluster {} ran empty, moving sample {} over from cluster {}", ci, sample_id, prev_centroid_id);

            state.centroid_frequency[prev_centroid_id] -= 1;
            state.centroid_frequency[ci] += 1;
            member_cnt[prev_centroid_id] -= T::one();
            member_cnt[ci] = T::one();
            // Centroid is moved into the chosen point -> the points centroid distance is 0
            state.centroid_distances[sample_id] = T::zero();
            let sample = data.input_vector(sample_id);
            // Subtract chosen sample from its previous centroid
            new_centroids[prev_centroid_id * dims..(prev_centroid_id + 1) * dims].iter_mut()
                .zip(sample)
                .for_each(|(cv, sv)| *cv -= *sv);
            // Chosen sample is single point in cluster -> set cluster's sum to chosen point
            new_centroids[ci * dims..(ci + 1) * dims].copy_from_slice(sample);
            state.assignments[sample_id] = Some(ci);
        }
    }

    pub(crate) fn calculate<'a, S, F>(data: &S, k: usize, init: F, config: &KMeansConfig<'a, T>) -> Result<KMeansState<T>>
                where S: Dataset<T> + ?Sized,
                    for<'c> F: FnOnce(&S, &mut KMeansState<T>, &KMeansConfig<'c, T>) -> Result<()> {
        let mut state = KMeansState::new(data.size(), data.dimension(), k);

        // Initialize clusters and notify subscriber
        init(data, &mut state, config)?;
        (config.init_done)(&state);
        let mut abort_strategy = config.abort_strategy.create_logic();

        for i in 1..=config.max_iter.max(1) {
            let changes = Self::update_cluster_assignments(data, &mut state);
            let new_distsum: T = state.centroid_distances.iter().cloned().sum();
            trace!("iteration {}: {} samples changed their cluster, distsum: {}", i, changes, new_distsum);

            let proceed = abort_strategy.next(changes, new_distsum);
            if changes == 0 {
                state.status = Convergence::Converged;
                break;
            }
            Self::update_centroids(data, &mut state, config.empty_cluster_policy);
            state.iterations = i;

            // Notify subscriber about finished iteration
            (config.iteration_done)(&state, i, new_distsum);
            state.distsum = new_distsum;
            if !proceed {
                state.status = Convergence::Stalled;
                break;
            }
        }

        match state.status {
            Convergence::Converged => info!("k-means converged after {} iterations", state.iterations),
            Convergence::Stalled => info!("k-means stopped by its abort strategy after {} iterations", state.iterations),
            Convergence::MaxIterationsReached => warn!("k-means did not converge within {} iterations", state.iterations),
        }

        Self::update_centroid_distances(data, &mut state);
        state.distsum = state.centroid_distances.iter().cloned().sum();
        Ok(state)
    }
}




#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbortStrategy, KMeans, Samples};
    use rand::prelude::*;
    use std::cell::Cell;

    fn seeded_conf<'a>(seed: u64) -> KMeansConfig<'a, f64> {
        KMeansConfig::build().random_generator(StdRng::seed_from_u64(seed)).build()
    }

    #[test]
    fn two_separated_groups() {
        let data = Samples::new(vec![0.0f64, 0.0, 0.0, 1.0, 10.0, 0.0, 10.0, 1.0], 4, 2).unwrap();
        let res = Lloyd::calculate(&data, 2, |data: &Samples<f64>, state: &mut KMeansState<f64>, _| {
            // seed with samples 0 and 2
            state.set_centroid_from_iter(0, data.input_vector(0).iter().cloned());
            state.set_centroid_from_iter(1, data.input_vector(2).iter().cloned());
            Ok(())
        }, &seeded_conf(1)).unwrap();

        assert_eq!(res.status, Convergence::Converged);
        assert_eq!(res.iterations, 1);
        assert_eq!(res.assignments, vec![Some(0), Some(0), Some(1), Some(1)]);
        assert_eq!(res.centroids, vec![0.0, 0.5, 10.0, 0.5]);
        assert_eq!(res.centroid_frequency, vec![2, 2]);
        assert_eq!(res.distsum, 1.0);
    }

    #[test]
    fn single_tight_cluster_converges_in_one_pass() {
        let samples = vec![1.0f64, 1.0, 1.1, 0.9, 0.9, 1.1, 1.05, 1.0, 0.95, 1.0];
        let data = Samples::new(samples, 5, 2).unwrap();
        let res = Lloyd::calculate(&data, 1, KMeans::init_kmeanplusplus, &seeded_conf(4)).unwrap();

        assert_eq!(res.status, Convergence::Converged);
        assert_eq!(res.iterations, 1);
        assert!(res.assignments.iter().all(|a| *a == Some(0)));
        assert_approx_eq!(res.centroids[0], 1.0, 1e-12);
        assert_approx_eq!(res.centroids[1], 1.0, 1e-12);
    }

    fn seed_with(centroids: [f64; 4]) -> impl FnOnce(&Samples<f64>, &mut KMeansState<f64>, &KMeansConfig<'_, f64>) -> Result<()> {
        move |_, state, _| {
            state.centroids.copy_from_slice(&centroids);
            Ok(())
        }
    }

    #[test]
    fn empty_cluster_steals_farthest_sample() {
        let data = Samples::new(vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0], 3, 2).unwrap();
        let conf = KMeansConfig::build().empty_cluster_policy(EmptyClusterPolicy::StealFarthest).build();

        let res = Lloyd::calculate(&data, 2, seed_with([2.0, 0.0, 1337.0, 0.0]), &conf).unwrap();
        assert_eq!(res.status, Convergence::Converged);
        assert_eq!(res.distsum, 0.5);
        assert_eq!(&res.assignments, &[Some(0), Some(0), Some(1)]);
        assert_eq!(&res.centroids, &[1.5, 0.0, 3.0, 0.0]);
        assert_eq!(&res.centroid_frequency, &[2, 1]);
        assert_eq!(&res.centroid_distances, &[0.25, 0.25, 0.0]);
    }

    #[test]
    fn empty_cluster_reset_to_zero() {
        let data = Samples::new(vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0], 3, 2).unwrap();
        let conf = KMeansConfig::build().empty_cluster_policy(EmptyClusterPolicy::ResetToZero).build();

        let res = Lloyd::calculate(&data, 2, seed_with([2.0, 0.0, 1337.0, 0.0]), &conf).unwrap();
        assert_eq!(res.status, Convergence::Converged);
        // sample 0 is equally far from both centroids -> lower index wins
        assert_eq!(&res.assignments, &[Some(0), Some(0), Some(0)]);
        assert_eq!(&res.centroids, &[2.0, 0.0, 0.0, 0.0]);
        assert_eq!(&res.centroid_frequency, &[3, 0]);
    }

    #[test]
    fn empty_cluster_keeps_previous_centroid() {
        let data = Samples::new(vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0], 3, 2).unwrap();
        let conf = KMeansConfig::build().empty_cluster_policy(EmptyClusterPolicy::KeepPrevious).build();

        let res = Lloyd::calculate(&data, 2, seed_with([2.0, 0.0, 1337.0, 0.0]), &conf).unwrap();
        assert_eq!(res.status, Convergence::Converged);
        assert_eq!(&res.assignments, &[Some(0), Some(0), Some(0)]);
        assert_eq!(&res.centroids, &[2.0, 0.0, 1337.0, 0.0]);
    }

    #[test]
    fn iteration_limit_is_reported() {
        let data = Samples::new(vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0], 3, 2).unwrap();
        let conf = KMeansConfig::build().max_iter(1).build();

        let res = Lloyd::calculate(&data, 2, seed_with([2.0, 0.0, 1337.0, 0.0]), &conf).unwrap();
        assert_eq!(res.status, Convergence::MaxIterationsReached);
        assert_eq!(res.iterations, 1);
        assert_eq!(&res.assignments, &[Some(0), Some(0), Some(1)]);
        assert_eq!(&res.centroids, &[1.5, 0.0, 3.0, 0.0]);
        assert_eq!(&res.centroid_distances, &[0.25, 0.25, 0.0]);
    }

    #[test]
    fn zero_iteration_limit_still_assigns() {
        let data = Samples::new(vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0], 3, 2).unwrap();
        let conf = KMeansConfig::build().max_iter(0).build();

        let res = Lloyd::calculate(&data, 2, seed_with([2.0, 0.0, 1337.0, 0.0]), &conf).unwrap();
        assert!(res.assignments.iter().all(Option::is_some));
    }

    #[test]
    fn abort_strategy_stalls_before_fixed_point() {
        let data = Samples::new(vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0], 3, 2).unwrap();
        let conf = KMeansConfig::build()
            .abort_strategy(AbortStrategy::NoImprovement { threshold: f64::INFINITY })
            .build();

        let res = Lloyd::calculate(&data, 2, seed_with([2.0, 0.0, 1337.0, 0.0]), &conf).unwrap();
        assert_eq!(res.status, Convergence::Stalled);
        assert_eq!(res.iterations, 1);
        // centroids still match the final assignments
        assert_eq!(&res.centroids, &[1.5, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn assignment_pass_is_idempotent_after_convergence() {
        let mut rnd = StdRng::seed_from_u64(21);
        let samples: Vec<f64> = (0..600).map(|_| rnd.gen_range(-5.0..5.0)).collect();
        let data = Samples::new(samples, 200, 3).unwrap();

        let runs = [
            Lloyd::calculate(&data, 6, KMeans::init_kmeanplusplus, &seeded_conf(8)).unwrap(),
            Lloyd::calculate(&data, 6, KMeans::init_random_sample, &seeded_conf(8)).unwrap(),
        ];
        for res in runs {
            assert_eq!(res.status, Convergence::Converged);

            let mut again = res.clone();
            assert_eq!(Lloyd::update_cluster_assignments(&data, &mut again), 0);
            assert_eq!(again.assignments, res.assignments);
        }
    }

    #[test]
    fn centroids_are_member_means() {
        let mut rnd = StdRng::seed_from_u64(5);
        let samples: Vec<f64> = (0..400).map(|_| rnd.gen_range(0.0..100.0)).collect();
        let data = Samples::new(samples, 200, 2).unwrap();
        let res = Lloyd::calculate(&data, 5, KMeans::init_kmeanplusplus, &seeded_conf(2)).unwrap();

        for ci in 0..5 {
            let members: Vec<usize> = (0..200).filter(|&si| res.assignments[si] == Some(ci)).collect();
            assert_eq!(members.len(), res.centroid_frequency[ci]);
            if members.is_empty() {
                continue;
            }
            for d in 0..2 {
                let mean = members.iter().map(|&si| data.input_vector(si)[d]).sum::<f64>() / members.len() as f64;
                assert_approx_eq!(res.centroid(ci)[d], mean, 1e-9);
            }
        }
    }

    #[test]
    fn assignments_prefer_lower_centroid_on_ties() {
        let data = Samples::new(vec![0.0f64, 2.0, 4.0], 3, 1).unwrap();
        let mut state = KMeansState::new(3, 1, 2);
        state.centroids.copy_from_slice(&[1.0, 3.0]);
        assert_eq!(Lloyd::update_cluster_assignments(&data, &mut state), 3);
        assert_eq!(state.assignments, vec![Some(0), Some(0), Some(1)]);
        assert_eq!(state.centroid_distances, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn status_callbacks() {
        let data = Samples::new(vec![0.0f64, 0.0, 0.0, 1.0, 10.0, 0.0, 10.0, 1.0], 4, 2).unwrap();
        let (init_calls, iteration_calls) = (Cell::new(0), Cell::new(0));
        let on_init = |s: &KMeansState<f64>| {
            init_calls.set(init_calls.get() + 1);
            assert_eq!(s.assignments.iter().flatten().count(), 2);
        };
        let on_iteration = |s: &KMeansState<f64>, nr: usize, _: f64| {
            iteration_calls.set(iteration_calls.get() + 1);
            assert_eq!(s.iterations, nr);
        };
        let conf = KMeansConfig::build()
            .random_generator(StdRng::seed_from_u64(3))
            .init_done(&on_init)
            .iteration_done(&on_iteration)
            .build();

        let res = Lloyd::calculate(&data, 2, KMeans::init_kmeanplusplus, &conf).unwrap();
        assert_eq!(init_calls.get(), 1);
        assert_eq!(iteration_calls.get(), res.iterations);
    }

    #[test]
    fn iris_dataset_f32() {
        let samples = vec![1.4f32, 0.2, 1.4, 0.2, 1.3, 0.2, 1.5, 0.2, 1.4, 0.2, 1.7, 0.4, 1.4, 0.3, 1.5, 0.2, 1.4, 0.2, 1.5, 0.1, 1.5, 0.2, 1.6, 0.2, 1.4, 0.1, 1.1, 0.1, 1.2, 0.2, 1.5, 0.4, 1.3, 0.4, 1.4, 0.3, 1.7, 0.3, 1.5, 0.3, 1.7, 0.2, 1.5, 0.4, 1.0, 0.2, 1.7, 0.5, 1.9, 0.2, 1.6, 0.2, 1.6, 0.4, 1.5, 0.2, 1.4, 0.2, 1.6, 0.2, 1.6, 0.2, 1.5, 0.4, 1.5, 0.1, 1.4, 0.2, 1.5, 0.2, 1.2, 0.2, 1.3, 0.2, 1.4, 0.1, 1.3, 0.2, 1.5, 0.2, 1.3, 0.3, 1.3, 0.3, 1.3, 0.2, 1.6, 0.6, 1.9, 0.4, 1.4, 0.3, 1.6, 0.2, 1.4, 0.2, 1.5, 0.2, 1.4, 0.2, 4.7, 1.4, 4.5, 1.5, 4.9, 1.5, 4.0, 1.3, 4.6, 1.5, 4.5, 1.3, 4.7, 1.6, 3.3, 1.0, 4.6, 1.3, 3.9, 1.4, 3.5, 1.0, 4.2, 1.5, 4.0, 1.0, 4.7, 1.4, 3.6, 1.3, 4.4, 1.4, 4.5, 1.5, 4.1, 1.0, 4.5, 1.5, 3.9, 1.1, 4.8, 1.8, 4.0, 1.3, 4.9, 1.5, 4.7, 1.2, 4.3, 1.3, 4.4, 1.4, 4.8, 1.4, 5.0, 1.7, 4.5, 1.5, 3.5, 1.0, 3.8, 1.1, 3.7, 1.0, 3.9, 1.2, 5.1, 1.6, 4.5, 1.5, 4.5, 1.6, 4.7, 1.5, 4.4, 1.3, 4.1, 1.3, 4.0, 1.3, 4.4, 1.2, 4.6, 1.4, 4.0, 1.2, 3.3, 1.0, 4.2, 1.3, 4.2, 1.2, 4.2, 1.3, 4.3, 1.3, 3.0, 1.1, 4.1, 1.3, 6.0, 2.5, 5.1, 1.9, 5.9, 2.1, 5.6, 1.8, 5.8, 2.2, 6.6, 2.1, 4.5, 1.7, 6.3, 1.8, 5.8, 1.8, 6.1, 2.5, 5.1, 2.0, 5.3, 1.9, 5.5, 2.1, 5.0, 2.0, 5.1, 2.4, 5.3, 2.3, 5.5, 1.8, 6.7, 2.2, 6.9, 2.3, 5.0, 1.5, 5.7, 2.3, 4.9, 2.0, 6.7, 2.0, 4.9, 1.8, 5.7, 2.1, 6.0, 1.8, 4.8, 1.8, 4.9, 1.8, 5.6, 2.1, 5.8, 1.6, 6.1, 1.9, 6.4, 2.0, 5.6, 2.2, 5.1, 1.5, 5.6, 1.4, 6.1, 2.3, 5.6, 2.4, 5.5, 1.8, 4.8, 1.8, 5.4, 2.1, 5.6, 2.4, 5.1, 2.3, 5.1, 1.9, 5.9, 2.3, 5.7, 2.5, 5.2, 2.3, 5.0, 1.9, 5.2, 2.0, 5.4, 2.3, 5.1, 1.8];

        let data = Samples::new(samples, 150, 2).unwrap();
        let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(1)).build();
        let res = Lloyd::calculate(&data, 3, KMeans::init_kmeanplusplus, &conf).unwrap();

        assert_eq!(res.status, Convergence::Converged);
        assert_eq!(res.centroid_frequency.iter().sum::<usize>(), 150);
        assert!(res.assignments.iter().all(|a| a.map_or(false, |c| c < 3)));
        let total: f32 = res.centroid_distances.iter().sum();
        assert_approx_eq!(res.distsum, total, 1e-3);

        let mut again = res.clone();
        assert_eq!(Lloyd::update_cluster_assignments(&data, &mut again), 0);
    }
}
