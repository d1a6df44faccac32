use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use numsynth::{FitParams, FittingRenderer, FontPool, FontSource};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::hint::black_box;

fn bench_fit(c: &mut Criterion) {
    let pool = FontPool::empty();
    let renderer = FittingRenderer::new(&pool, FitParams::default());

    c.bench_function("fit_upright", |b| {
        b.iter_batched(
            || Xoshiro256PlusPlus::seed_from_u64(1),
            |mut rng| {
                black_box(
                    renderer
                        .render("9999", 140, 105, &FontSource::Builtin, 0.0, &mut rng)
                        .unwrap(),
                )
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("fit_rotated", |b| {
        b.iter_batched(
            || Xoshiro256PlusPlus::seed_from_u64(1),
            |mut rng| {
                black_box(
                    renderer
                        .render("9999", 140, 105, &FontSource::Builtin, 15.0, &mut rng)
                        .unwrap(),
                )
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
