use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use thyroid_bench::data::{ClassLabels, Column, Dataset, Table};
use thyroid_bench::preprocessing::Recipe;
use thyroid_bench::training::{FoldPlan, ModelFamily};
use thyroid_bench::tuning::{HyperParam, ModelSpec, TuningRunner};

fn create_dataset(n_rows: usize, n_features: usize) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut table = Table::new();
    let mut signal = vec![0.0; n_rows];

    for f in 0..n_features {
        let values: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect();
        for (s, v) in signal.iter_mut().zip(&values) {
            *s += v;
        }
        table.push_column(format!("feature_{}", f), Column::Numeric(values)).unwrap();
    }

    let threshold = 5.0 * n_features as f64;
    let labels: Array1<f64> = signal.iter().map(|&s| if s > threshold { 1.0 } else { 0.0 }).collect();
    Dataset::new(table, labels, ClassLabels::new("Yes", "No")).unwrap()
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    let data = create_dataset(300, 8);
    let folds = FoldPlan::stratified(&data.labels, 5, 42).unwrap();
    let recipe = Recipe::standard(0.9);

    let specs = [
        ("knn", ModelSpec::new(ModelFamily::Knn)),
        ("logistic_regression", ModelSpec::new(ModelFamily::LogisticRegression)),
        (
            "random_forest",
            ModelSpec::new(ModelFamily::RandomForest)
                .set("trees", HyperParam::fixed(50i64))
                .unwrap(),
        ),
    ];

    for (name, spec) in specs.iter() {
        for workers in [1usize, 4] {
            let runner = TuningRunner::new().with_levels(2).with_workers(workers);
            group.bench_with_input(
                BenchmarkId::new(*name, format!("{}_workers", workers)),
                spec,
                |b, spec| b.iter(|| runner.run(black_box(spec), &data, &folds, &recipe).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_recipe(c: &mut Criterion) {
    let mut group = c.benchmark_group("recipe");

    for n_rows in [500, 2000].iter() {
        let data = create_dataset(*n_rows, 12);
        let recipe = Recipe::standard(0.9);
        group.bench_with_input(BenchmarkId::new("prep_bake", n_rows), &data, |b, data| {
            b.iter(|| {
                let fitted = recipe.prep(black_box(&data.predictors)).unwrap();
                fitted.bake(&data.predictors).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grid_search, bench_recipe);
criterion_main!(benches);
