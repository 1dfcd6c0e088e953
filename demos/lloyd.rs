use kmeans_engine::*;

fn main() {
    let (sample_cnt, sample_dims, k) = (20000, 200, 4);

    // Generate some random data
    let mut samples = vec![0.0f64;sample_cnt * sample_dims];
    samples.iter_mut().for_each(|v| *v = rand::random());

    // Calculate kmeans, using kmean++ as initialization-method
    let mut data = Samples::new(samples, sample_cnt, sample_dims).expect("sample buffer matches its shape");
    let mut kmean = KMeans::new(k).expect("k is positive");
    let result = match kmean.train(&mut data, KMeans::init_kmeanplusplus, &KMeansConfig::default()) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Clustering failed: {}", err);
            return;
        }
    };

    println!("Centroids: {:?}", kmean.centroids());
    println!("Cluster-Assignments: {:?}", data.labels());
    println!("Error: {} ({:?})", result.distsum, result.status);
}
