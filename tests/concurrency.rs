use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};

use railcast::{
    InMemoryScheduleSource, ScheduleRow, SimulationConfig, SimulationContext, SimulationEvent,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 10, 27, 8, 0, 0).unwrap()
}

fn corridor(trains: usize) -> Vec<ScheduleRow> {
    let stations = ["Delhi", "Palwal", "Kosi Kalan", "Mathura", "Agra"];
    let mut rows = Vec::new();
    for t in 0..trains {
        let offset = Duration::minutes(i64::try_from(t).unwrap() * 5);
        for (s, station) in stations.iter().enumerate() {
            let departure = start() + offset + Duration::minutes(i64::try_from(s).unwrap() * 45);
            rows.push(ScheduleRow::new(format!("T-{:03}", 100 + t), *station, departure));
        }
    }
    rows
}

fn shared_context() -> Arc<SimulationContext> {
    let source = Arc::new(InMemoryScheduleSource::new(corridor(12)));
    Arc::new(SimulationContext::new(source, SimulationConfig::default()).unwrap())
}

#[test]
fn concurrent_steps_and_reads_stay_consistent() {
    let ctx = shared_context();

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..10 {
                    ctx.step(1).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..20 {
                    let snapshot = ctx.snapshot().unwrap();
                    assert!(snapshot.current_time >= start());
                    assert!(snapshot.current_time <= start() + Duration::minutes(40));
                    let _ = ctx.analyze_cascade("T-100", 30).unwrap();
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    // Steps are serialized: 40 one-minute steps land exactly 40 minutes in.
    let snapshot = ctx.snapshot().unwrap();
    assert_eq!(snapshot.current_time, start() + Duration::minutes(40));
}

#[test]
fn concurrent_delays_accumulate_without_loss() {
    let ctx = shared_context();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..5 {
                    assert!(ctx.add_delay_event("T-105", 1, "Signal").unwrap());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = ctx
        .with_simulator(|sim| sim.train("T-105").map(|t| t.delay_minutes()))
        .unwrap();
    assert_eq!(total, Some(40));
}

#[test]
fn events_arrive_in_mutation_order() {
    let ctx = shared_context();
    let stream = ctx.subscribe();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..20 {
                    ctx.add_delay_event("T-103", 1, "Signal").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let totals: Vec<u32> = stream
        .drain()
        .into_iter()
        .map(|event| match event {
            SimulationEvent::DelayInjected { total_delay, .. } => total_delay,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(totals, (1..=160).collect::<Vec<u32>>());
}

#[test]
fn readers_never_observe_a_partial_reset() {
    let ctx = shared_context();
    ctx.step(50).unwrap();

    let resetter = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for _ in 0..10 {
                ctx.reset().unwrap();
                ctx.step(50).unwrap();
            }
        })
    };

    let reader = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for _ in 0..50 {
                let snapshot = ctx.snapshot().unwrap();
                let fresh = snapshot.current_time == start();
                let stepped = snapshot.current_time == start() + Duration::minutes(50);
                assert!(fresh || stepped, "unexpected clock {}", snapshot.current_time);
                if fresh {
                    assert_eq!(snapshot.trains.len(), 12);
                    assert!(snapshot.trains.iter().all(|t| t.current_station == "Delhi"));
                }
            }
        })
    };

    resetter.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn slow_subscriber_does_not_block_the_simulation() {
    let source = Arc::new(InMemoryScheduleSource::new(corridor(12)));
    let config = SimulationConfig {
        event_capacity: 2,
        ..SimulationConfig::default()
    };
    let ctx = SimulationContext::new(source, config).unwrap();
    let stream = ctx.subscribe();

    for _ in 0..10 {
        assert!(ctx.add_delay_event("T-101", 5, "Signal").unwrap());
    }

    let received = stream.drain();
    assert_eq!(received.len(), 2);
    assert!(received
        .iter()
        .all(|e| matches!(e, SimulationEvent::DelayInjected { .. })));
}
