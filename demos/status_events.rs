use kmeans_engine::*;
use rand::prelude::*;

fn main() {
    let (sample_cnt, sample_dims, k, max_iter) = (20000, 200, 4, 2500);

    // Generate some random data
    let mut samples = vec![0.0f64;sample_cnt * sample_dims];
    samples.iter_mut().for_each(|v| *v = rand::random());

	let conf = KMeansConfig::build()
		.random_generator(StdRng::seed_from_u64(1337))
		.max_iter(max_iter)
		.init_done(&|_| println!("Initialization completed."))
		.iteration_done(&|s, nr, new_distsum|
			println!("Iteration {} - Error: {:.2} -> {:.2} | Improvement: {:.2}",
				nr, s.distsum, new_distsum, s.distsum - new_distsum))
		.build();

    // Calculate kmeans, using random samples as initial centroids
    let mut data = Samples::new(samples, sample_cnt, sample_dims).expect("sample buffer matches its shape");
    let mut kmean = KMeans::new(k).expect("k is positive");
    match kmean.train(&mut data, KMeans::init_random_sample, &conf) {
        Ok(result) => println!("Error: {} after {} iterations ({:?})", result.distsum, result.iterations, result.status),
        Err(err) => eprintln!("Clustering failed: {}", err),
    }
}
