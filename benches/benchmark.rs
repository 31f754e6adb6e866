// Benchmarks for the clustering pipeline stages
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use clustx::{
    compute_metrics, project, AlgorithmChoice, ClusteringExecutor, Dataset, FeaturePreprocessor,
    Pipeline, Value,
};
use clustx_cluster::AlgorithmSelector;
use rand::prelude::*;
use rand::rngs::StdRng;

const FEATURES: [&str; 6] = ["f1", "f2", "f3", "f4", "f5", "f6"];

fn generate_dataset(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    Dataset::from_records((0..n).map(|i| {
        let center = (i % 4) as f64 * 6.0;
        FEATURES
            .iter()
            .map(|&name| (name, Value::Number(center + rng.random_range(-1.0..1.0))))
            .collect::<Vec<_>>()
    }))
}

fn benchmark_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess");
    let preprocessor = FeaturePreprocessor::new();

    for size in [100, 1000, 10000].iter() {
        let dataset = generate_dataset(*size, 1);
        group.bench_with_input(BenchmarkId::new("fit_transform", size), size, |b, _| {
            b.iter(|| black_box(preprocessor.fit_transform(black_box(&dataset)).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_auto_selected(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_selected");
    group.sample_size(10);
    let preprocessor = FeaturePreprocessor::new();
    let selector = AlgorithmSelector::default();
    let executor = ClusteringExecutor::default();

    // one size per selection band: k-means, DBSCAN, HDBSCAN
    for size in [50, 100, 1000].iter() {
        let matrix = preprocessor.fit_transform(&generate_dataset(*size, 2)).unwrap().matrix;
        let choice = selector.select(matrix.n_rows()).unwrap();
        let name = choice.algorithm().display_name();
        group.bench_with_input(BenchmarkId::new(name, size), &choice, |b, choice| {
            b.iter(|| black_box(executor.execute(black_box(&matrix), choice).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_requested(c: &mut Criterion) {
    let mut group = c.benchmark_group("requested");
    group.sample_size(10);
    let matrix = FeaturePreprocessor::new()
        .fit_transform(&generate_dataset(500, 3))
        .unwrap()
        .matrix;
    let executor = ClusteringExecutor::default();

    let choices = [
        AlgorithmChoice::Hierarchical {
            n_clusters: 4,
            linkage: Default::default(),
        },
        AlgorithmChoice::Gmm {
            n_components: 4,
            covariance_type: Default::default(),
        },
    ];
    for choice in choices {
        group.bench_function(choice.algorithm().display_name(), |b| {
            b.iter(|| black_box(executor.execute(&matrix, &choice).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    let executor = ClusteringExecutor::default();

    for size in [100, 1000].iter() {
        let matrix = FeaturePreprocessor::new()
            .fit_transform(&generate_dataset(*size, 4))
            .unwrap()
            .matrix;
        let labels = executor
            .execute(&matrix, &AlgorithmChoice::KMeans { n_clusters: 4 })
            .unwrap();
        group.bench_with_input(BenchmarkId::new("compute_metrics", size), size, |b, _| {
            b.iter(|| black_box(compute_metrics(&matrix, &labels).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("project", size), size, |b, _| {
            b.iter(|| black_box(project(&matrix, &labels).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    let pipeline = Pipeline::default();
    let dataset = generate_dataset(1000, 5);

    group.bench_function("run_and_analyze", |b| {
        b.iter(|| {
            let outcome = pipeline.run_clustering(black_box(&dataset), None).unwrap();
            black_box(pipeline.analyze_clusters(&dataset, &outcome).unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_preprocess,
    benchmark_auto_selected,
    benchmark_requested,
    benchmark_metrics,
    benchmark_pipeline
);
criterion_main!(benches);
