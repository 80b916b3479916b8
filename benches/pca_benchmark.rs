use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use simple_pca::{SimplePca, Standardization};

fn generate_data(n_samples: usize, n_features: usize) -> Array2<f64> {
    Array::random((n_samples, n_features), Uniform::new(0., 10.))
}

fn bench_fit_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("SimplePca_fit_transform");

    for &(n_samples, n_features) in [(100, 10), (500, 50), (1000, 200)].iter() {
        let data = generate_data(n_samples, n_features);
        group.throughput(Throughput::Elements((n_samples * n_features) as u64));
        for mode in [Standardization::Center, Standardization::CenterAndScale] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", mode), format!("{}x{}", n_samples, n_features)),
                &data,
                |b, data_matrix| {
                    let pca = SimplePca::new(10);
                    b.iter_with_setup(
                        || data_matrix.clone(),
                        |data_to_fit| pca.fit_transform_with(data_to_fit, mode).unwrap(),
                    );
                },
            );
        }
    }
    group.finish();
}

// The D x D eigendecomposition dominates; isolate it from centering and projection.
fn bench_eigen_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("SimplePca_eigen_decompose");

    for &n_features in [10usize, 50, 200].iter() {
        let pca = SimplePca::new(10);
        let standardized = pca
            .standardize(generate_data(500, n_features), Standardization::Center)
            .unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(n_features),
            &standardized,
            |b, standardized| b.iter(|| pca.eigen_decompose(standardized).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fit_transform, bench_eigen_decompose);
criterion_main!(benches);
