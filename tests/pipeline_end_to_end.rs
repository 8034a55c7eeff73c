use std::path::PathBuf;

use rusqlite::types::Value as SqlValue;

use repair_order_pipeline::config::PipelineConfig;
use repair_order_pipeline::persistence::SqliteSink;
use repair_order_pipeline::pipeline::{default_sinks, process_events, run_pipeline};

fn tmp_path(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("repair_orders_{name}_{nanos}"))
}

fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

#[test]
fn default_run_writes_one_day_table() {
    let db = tmp_path("default.db");
    let report = process_events("tests/fixtures/events", &db).unwrap();

    assert_eq!(report.documents, 3);
    assert_eq!(report.rows, 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.windows, vec![("1D".to_string(), 2)]);
    assert!(report.persist.all_written());

    let mut sink = SqliteSink::open(&db);
    assert_eq!(sink.table_names().unwrap(), vec!["1D_repair_orders"]);

    let stored = sink.read_table("1D_repair_orders").unwrap();
    assert_eq!(
        stored.columns,
        vec![
            "index",
            "order_id",
            "date_time",
            "status",
            "cost",
            "technician",
            "part_name",
            "part_quantity",
            "time_frame"
        ]
    );
    assert_eq!(
        stored.rows[0],
        vec![
            SqlValue::Integer(1),
            SqlValue::Integer(222),
            text("2023-08-11 12:34:56"),
            text("Completed"),
            SqlValue::Real(200.0),
            text("Tech 2"),
            text("part 2"),
            text("2"),
            text("1D"),
        ]
    );
    assert_eq!(stored.rows[1][1], SqlValue::Integer(111));
    assert_eq!(stored.rows[1][6], text("part 1, part 2"));
    assert_eq!(stored.rows[1][7], text("1, 1"));

    drop(sink);
    let _ = std::fs::remove_file(&db);
}

#[test]
fn rerun_on_same_input_replaces_with_identical_table() {
    let db = tmp_path("rerun.db");
    process_events("tests/fixtures/events", &db).unwrap();
    let first = SqliteSink::open(&db).read_table("1D_repair_orders").unwrap();

    process_events("tests/fixtures/events", &db).unwrap();
    let mut sink = SqliteSink::open(&db);
    let second = sink.read_table("1D_repair_orders").unwrap();

    assert_eq!(first, second);
    assert_eq!(sink.table_names().unwrap().len(), 1);

    drop(sink);
    let _ = std::fs::remove_file(&db);
}

#[test]
fn several_windows_become_several_tables() {
    let db = tmp_path("windows.db");
    let config = PipelineConfig {
        source_dir: PathBuf::from("tests/fixtures/events"),
        windows: vec!["30m".to_string(), "1D".to_string(), "2w".to_string()],
        database: db.clone(),
        ..PipelineConfig::default()
    };
    let mut sinks = default_sinks(&config);
    let report = run_pipeline(&config, &mut sinks, None).unwrap();
    drop(sinks);

    assert_eq!(
        report.windows,
        vec![("30m".to_string(), 1), ("1D".to_string(), 2), ("2w".to_string(), 2)]
    );

    let mut sink = SqliteSink::open(&db);
    assert_eq!(
        sink.table_names().unwrap(),
        vec!["1D_repair_orders", "2w_repair_orders", "30m_repair_orders"]
    );
    let recent = sink.read_table("30m_repair_orders").unwrap();
    assert_eq!(recent.rows.len(), 1);
    let frame = recent.column_index("time_frame").unwrap();
    assert_eq!(recent.rows[0][frame], text("30m"));

    drop(sink);
    let _ = std::fs::remove_file(&db);
}

#[test]
fn unwritable_database_is_reported_not_fatal() {
    let dir = tmp_path("not_a_dir");
    let config = PipelineConfig {
        source_dir: PathBuf::from("tests/fixtures/events"),
        database: dir.join("missing").join("repair_orders.db"),
        ..PipelineConfig::default()
    };
    let mut sinks = default_sinks(&config);
    let report = run_pipeline(&config, &mut sinks, None).unwrap();

    assert!(report.persist.written.is_empty());
    assert_eq!(report.persist.failed.len(), 1);
    assert!(report.persist.failed[0].error.to_string().contains("1D_repair_orders"));
}
