use repair_order_pipeline::PipelineError;
use repair_order_pipeline::ingestion::{
    collect_documents, ingest_from_dir, CollectOptions, ExtractOptions, IngestionOptions, RepeatedTextPolicy,
};
use repair_order_pipeline::types::{DataType, Value};

fn text(s: &str) -> Value {
    Value::Utf8(s.to_string())
}

#[test]
fn collects_only_xml_files_in_name_order() {
    let docs = collect_documents("tests/fixtures/events", &CollectOptions::default()).unwrap();
    let names: Vec<String> = docs
        .iter()
        .map(|d| d.source.as_ref().unwrap().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["111.xml", "222.xml", "333.xml"]);
}

#[test]
fn other_extension_with_no_match_is_no_input() {
    let opts = CollectOptions {
        extension: "json".to_string(),
        ..Default::default()
    };
    let err = collect_documents("tests/fixtures/events", &opts).unwrap_err();
    assert!(matches!(err, PipelineError::NoInput { ref extension, .. } if extension == "json"));
}

#[test]
fn malformed_document_is_set_aside() {
    let extraction = ingest_from_dir("tests/fixtures/events", &IngestionOptions::default()).unwrap();

    let ds = &extraction.dataset;
    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.schema.field_names().collect::<Vec<_>>(),
        vec!["order_id", "date_time", "status", "cost", "technician", "name", "quantity"]
    );
    assert_eq!(ds.schema.fields[5].data_type, DataType::List);

    let order_ids: Vec<&Value> = ds.column("order_id").unwrap().collect();
    assert_eq!(order_ids, vec![&text("111"), &text("222")]);
    let names: Vec<&Value> = ds.column("name").unwrap().collect();
    assert_eq!(names, vec![&Value::list(["part 1", "part 2"]), &Value::list(["part 2"])]);

    assert_eq!(extraction.rejected.len(), 1);
    let rejected = &extraction.rejected[0];
    assert!(rejected.document.to_string().ends_with("333.xml"));
    assert!(matches!(rejected.error, PipelineError::MalformedDocument { .. }));
}

#[test]
fn absent_keys_are_null_and_repeated_text_follows_policy() {
    let last_wins = ingest_from_dir("tests/fixtures/mixed", &IngestionOptions::default()).unwrap();
    let ds = &last_wins.dataset;
    assert_eq!(ds.row_count(), 2);
    assert!(last_wins.rejected.is_empty());

    let status = ds.schema.index_of("status").unwrap();
    let cost = ds.schema.index_of("cost").unwrap();
    let name = ds.schema.index_of("name").unwrap();
    let technician = ds.schema.index_of("technician").unwrap();
    assert_eq!(ds.rows[1][status], text("Completed"));
    assert_eq!(ds.rows[1][cost], Value::Null);
    assert_eq!(ds.rows[1][name], Value::Null);
    assert_eq!(ds.rows[1][technician], text("Tech & Apprentice"));

    let opts = IngestionOptions {
        extract: ExtractOptions {
            repeated_text: RepeatedTextPolicy::Accumulate,
        },
        ..Default::default()
    };
    let accumulated = ingest_from_dir("tests/fixtures/mixed", &opts).unwrap();
    let ds = &accumulated.dataset;
    let status = ds.schema.index_of("status").unwrap();
    assert_eq!(ds.schema.fields[status].data_type, DataType::List);
    assert_eq!(ds.rows[0][status], text("Completed"));
    assert_eq!(ds.rows[1][status], Value::list(["Received", "Completed"]));
}
