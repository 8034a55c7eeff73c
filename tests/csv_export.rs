use std::path::PathBuf;

use repair_order_pipeline::config::PipelineConfig;
use repair_order_pipeline::pipeline::{default_sinks, run_pipeline};

fn tmp_path(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("repair_orders_{name}_{nanos}"))
}

#[test]
fn each_window_gets_a_csv_file_alongside_sqlite() {
    let out = tmp_path("csv_out");
    let db = tmp_path("csv.db");
    let config = PipelineConfig {
        source_dir: PathBuf::from("tests/fixtures/events"),
        windows: vec!["1h".to_string(), "1D".to_string()],
        database: db.clone(),
        csv_dir: Some(out.clone()),
        ..PipelineConfig::default()
    };

    let mut sinks = default_sinks(&config);
    assert_eq!(sinks.len(), 2);
    let report = run_pipeline(&config, &mut sinks, None).unwrap();
    drop(sinks);

    assert_eq!(report.persist.written.len(), 4);
    assert!(report.persist.all_written());

    let day = std::fs::read_to_string(out.join("1D_repair_orders.csv")).unwrap();
    assert_eq!(
        day,
        "index,order_id,date_time,status,cost,technician,part_name,part_quantity,time_frame\n\
         1,222,2023-08-11 12:34:56,Completed,200.0,Tech 2,part 2,2,1D\n\
         0,111,2023-08-10 12:34:56,Completed,100.0,Tech 1,\"part 1, part 2\",\"1, 1\",1D\n"
    );

    let hour = std::fs::read_to_string(out.join("1h_repair_orders.csv")).unwrap();
    assert_eq!(hour.lines().count(), 2);
    assert!(hour.lines().nth(1).unwrap().starts_with("1,222,"));

    let _ = std::fs::remove_dir_all(&out);
    let _ = std::fs::remove_file(&db);
}
