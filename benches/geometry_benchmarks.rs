//! Benchmarks for the per-frame geometry and presentation decisions
//!
//! These run on every frame, so they should stay in the nanosecond range
//! even with many outputs attached.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use gles_demos::output::{OutputId, OutputRegistry, OutputTransform};
use gles_demos::renderer::damage::{choose_presentation, DamageRect};
use gles_demos::window::{Size, Window, WindowOptions};

fn setup(output_count: u32) -> (Window, OutputRegistry) {
    let mut window = Window::new(Size::new(800, 600), WindowOptions::default());
    let mut registry = OutputRegistry::new();
    for i in 0..output_count {
        let id = OutputId(i + 1);
        registry.add_output(id, &mut window);
        registry.on_scale_changed(id, (i % 3) as i32 + 1, &mut window);
        registry.on_geometry_changed(
            id,
            OutputTransform::ALL[i as usize % OutputTransform::ALL.len()],
            &mut window,
        );
        window.enter_output(id, &registry);
    }
    (window, registry)
}

/// Benchmark buffer geometry recomputation
fn bench_buffer_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_geometry");

    for output_count in [1u32, 4, 16].iter() {
        group.bench_with_input(
            format!("update_with_{}_outputs", output_count),
            output_count,
            |b, &output_count| {
                b.iter_batched(
                    || setup(output_count),
                    |(mut window, registry)| {
                        black_box(window.update_buffer_geometry(&registry));
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark output churn: add, enter, leave, remove
fn bench_output_churn(c: &mut Criterion) {
    c.bench_function("output_hotplug_cycle", |b| {
        let (mut window, mut registry) = setup(4);
        b.iter(|| {
            let id = OutputId(100);
            registry.add_output(id, &mut window);
            window.enter_output(id, &registry);
            black_box(registry.compute_scale(&window));
            registry.remove_output(id, &mut window);
        });
    });
}

/// Benchmark the partial/full swap decision
fn bench_presentation_choice(c: &mut Criterion) {
    let damage = DamageRect::centered(1920, 1080, 2);
    c.bench_function("choose_presentation", |b| {
        b.iter(|| {
            black_box(choose_presentation(
                black_box(true),
                black_box(2),
                black_box(&damage),
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_buffer_geometry,
    bench_output_churn,
    bench_presentation_choice
);
criterion_main!(benches);
