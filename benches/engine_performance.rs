use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lapmeter::engine::window::WindowStats;
use lapmeter::engine::{LapEngine, MonitorConfig, ValidatedPulse};

fn sample_pulse(point_no: usize) -> ValidatedPulse {
    ValidatedPulse {
        value_ms: 40.0 + (point_no % 7) as f64 * 3.5,
        timestamp_ms: 1_000 + point_no as u64 * 950,
    }
}

fn bench_pulse_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("lap_engine");

    group.bench_function("process_500_pulses", |b| {
        b.iter(|| {
            let mut engine = LapEngine::new(MonitorConfig::default());
            engine.start();
            for point_no in 0..500 {
                black_box(engine.process_pulse(black_box(sample_pulse(point_no))));
            }
        });
    });

    group.bench_function("snapshot_after_1000_laps", |b| {
        let mut engine = LapEngine::new(MonitorConfig::default());
        engine.start();
        for point_no in 0..1_001 {
            engine.process_pulse(sample_pulse(point_no));
        }
        b.iter(|| black_box(engine.snapshot()));
    });

    group.finish();
}

fn bench_window_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_statistics");

    let durations: Vec<f64> = (0..10_000)
        .map(|lap| 900.0 + (lap % 13) as f64 * 7.5)
        .collect();
    group.bench_function("rebuild_10k_laps", |b| {
        b.iter(|| {
            let mut stats = WindowStats::new(3);
            stats.rebuild(black_box(&durations), 50);
            black_box(stats.best_duration_ms());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_pulse_processing, bench_window_rebuild);
criterion_main!(benches);
