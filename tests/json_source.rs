use std::io::Write;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::NamedTempFile;

use railcast::{
    JsonFileScheduleSource, LoadError, Readiness, ScheduleSource, SimulationConfig,
    SimulationContext,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "railcast=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn write_json(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const SCHEDULES: &str = r#"[
    {"train_id": "T-1", "station_name": "C", "scheduled_time": "2023-10-27T09:30:00Z"},
    {"train_id": "T-1", "station_name": "A", "scheduled_time": "2023-10-27T08:00:00Z"},
    {"train_id": "T-1", "station_name": "B", "scheduled_time": "2023-10-27T08:45:00Z"},
    {"train_id": "T-2", "station_name": "B", "scheduled_time": "2023-10-27T08:50:00Z"},
    {"train_id": "T-2", "station_name": "D", "scheduled_time": "2023-10-27T10:00:00Z"}
]"#;

#[test]
fn loads_and_orders_rows_from_disk() {
    init_tracing();
    let file = write_json(SCHEDULES);
    let source = Arc::new(JsonFileScheduleSource::new(file.path()));
    assert_eq!(source.fetch().unwrap().len(), 5);

    let ctx = SimulationContext::new(source, SimulationConfig::default()).unwrap();
    assert_eq!(ctx.readiness().unwrap(), Readiness::Ready);

    let stations = ctx
        .with_simulator(|sim| {
            sim.train("T-1")
                .map(|t| t.schedule().iter().map(|e| e.station.clone()).collect::<Vec<_>>())
        })
        .unwrap();
    assert_eq!(
        stations,
        Some(vec!["A".to_string(), "B".to_string(), "C".to_string()])
    );

    ctx.step(30).unwrap();
    let snapshot = ctx.snapshot().unwrap();
    assert_eq!(
        snapshot.current_time,
        Utc.with_ymd_and_hms(2023, 10, 27, 8, 30, 0).unwrap()
    );
    assert_eq!(snapshot.trains[0].current_station, "B");
    assert_eq!(snapshot.trains[0].next_station, "C");
}

#[test]
fn malformed_file_leaves_context_not_ready() {
    init_tracing();
    let file = write_json("{ not json");
    let source = JsonFileScheduleSource::new(file.path());
    assert!(matches!(source.fetch(), Err(LoadError::Malformed { .. })));

    let ctx = SimulationContext::new(Arc::new(source), SimulationConfig::default()).unwrap();
    match ctx.readiness().unwrap() {
        Readiness::NotReady { reason } => assert!(reason.starts_with("Malformed schedule data")),
        Readiness::Ready => panic!("expected NotReady"),
    }
}

#[test]
fn empty_array_is_an_empty_load() {
    init_tracing();
    let file = write_json("[]");
    let ctx = SimulationContext::new(
        Arc::new(JsonFileScheduleSource::new(file.path())),
        SimulationConfig::default(),
    )
    .unwrap();
    assert_eq!(
        ctx.readiness().unwrap(),
        Readiness::NotReady {
            reason: LoadError::Empty.to_string()
        }
    );
    assert!(ctx.snapshot().unwrap_err().is_execution());
}
