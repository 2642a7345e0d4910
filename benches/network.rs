use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use railcast::{CascadeAnalyzer, CascadeConfig, ScheduleRow, Simulator};

const STATIONS: [&str; 6] = ["Delhi", "Palwal", "Kosi Kalan", "Mathura", "Raja Ki Mandi", "Agra"];
const TRAINS: u64 = 20;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 10, 27, 8, 0, 0).unwrap()
}

// 20 trains on the Delhi-Agra corridor, 45 minutes between stops,
// departing every 3 minutes.
fn make_network() -> Simulator {
    let mut rows = Vec::new();
    for t in 0..TRAINS {
        let offset = Duration::minutes(i64::try_from(t * 3).unwrap());
        for (s, station) in STATIONS.iter().enumerate() {
            let departure = start() + offset + Duration::minutes(i64::try_from(s * 45).unwrap());
            rows.push(ScheduleRow::new(format!("T-{}", 101 + t), *station, departure));
        }
    }
    Simulator::from_rows(rows, start()).unwrap()
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("network");
    group.throughput(Throughput::Elements(TRAINS));

    group.bench_function("step_5min", |b| {
        b.iter_batched(
            make_network,
            |mut sim| {
                sim.step(5).unwrap();
                sim
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("full_day", |b| {
        b.iter_batched(
            make_network,
            |mut sim| {
                for _ in 0..96 {
                    sim.step(5).unwrap();
                }
                sim
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_cascade(c: &mut Criterion) {
    let sim = make_network();
    let mut analyzer = CascadeAnalyzer::new(CascadeConfig::default());

    c.bench_function("network/analyze_cascade", |b| {
        b.iter(|| analyzer.analyze(&sim, "T-105", 45).unwrap());
    });

    c.bench_function("network/snapshot", |b| {
        b.iter(|| sim.snapshot());
    });
}

criterion_group!(benches, bench_step, bench_cascade);
criterion_main!(benches);
