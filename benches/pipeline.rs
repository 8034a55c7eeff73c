use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use repair_order_pipeline::ingestion::{extract_records, ExtractOptions};
use repair_order_pipeline::persistence::{SqliteSink, TableSink};
use repair_order_pipeline::processing::{process_to_repair_orders, window_many};
use repair_order_pipeline::types::RawDocument;

fn synthetic_documents(n: usize) -> Vec<RawDocument> {
    (0..n)
        .map(|i| {
            let parts: String = (0..(i % 4) + 1)
                .map(|p| format!(r#"<part name="part {p}" quantity="{}"/>"#, p + 1))
                .collect();
            RawDocument::from_text(format!(
                "<event><order_id>{i}</order_id><date_time>2023-08-{:02}T{:02}:{:02}:00</date_time>\
                 <status>Completed</status><cost>{}.50</cost><repair_details><technician>Tech {}</technician>\
                 <repair_parts>{parts}</repair_parts></repair_details></event>",
                1 + (i / 1440) % 28,
                (i / 60) % 24,
                i % 60,
                100 + i % 900,
                i % 7
            ))
        })
        .collect()
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_records");
    for n in [100usize, 1_000, 10_000] {
        let docs = synthetic_documents(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &docs, |b, docs| {
            b.iter(|| extract_records(black_box(docs), &ExtractOptions::default()))
        });
    }
    group.finish();
}

fn bench_window_and_reshape(c: &mut Criterion) {
    let extraction = extract_records(&synthetic_documents(10_000), &ExtractOptions::default());
    c.bench_function("window_reshape_10k", |b| {
        b.iter(|| {
            let windows = window_many(black_box(&extraction.dataset), &["1h", "1D", "1w"]).unwrap();
            process_to_repair_orders(&windows)
        })
    });
}

fn bench_sqlite_write(c: &mut Criterion) {
    let extraction = extract_records(&synthetic_documents(10_000), &ExtractOptions::default());
    let windows = window_many(&extraction.dataset, &["1w"]).unwrap();
    let tables = process_to_repair_orders(&windows);
    let mut sink = SqliteSink::in_memory().unwrap();
    c.bench_function("sqlite_write_1w", |b| {
        b.iter(|| sink.write_table(black_box(&tables[0])).unwrap())
    });
}

criterion_group!(benches, bench_extract, bench_window_and_reshape, bench_sqlite_write);
criterion_main!(benches);
