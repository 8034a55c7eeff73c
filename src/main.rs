use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use repair_order_pipeline::config::PipelineConfig;
use repair_order_pipeline::ingestion::{CompositeObserver, FileObserver, PipelineObserver, TracingObserver};
use repair_order_pipeline::pipeline::{default_sinks, run_pipeline};
use repair_order_pipeline::PipelineResult;

#[derive(Parser)]
#[command(name = "repair-orders")]
#[command(about = "Load XML repair-order events into one table per trailing time window")]
struct Cli {
    /// Directory holding the event documents
    source_dir: Option<PathBuf>,

    /// Window spec such as 1D, 12h or 2w (repeat for several tables)
    #[arg(short, long = "window")]
    windows: Vec<String>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Also write one CSV file per window into this directory
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// JSON config file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extension of the event documents, without the dot
    #[arg(long)]
    extension: Option<String>,

    /// Append stage events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> PipelineResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_path(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = self.source_dir {
            config.source_dir = dir;
        }
        if !self.windows.is_empty() {
            config.windows = self.windows;
        }
        if let Some(database) = self.database {
            config.database = database;
        }
        if self.csv_dir.is_some() {
            config.csv_dir = self.csv_dir;
        }
        if let Some(extension) = self.extension {
            config.extension = extension;
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> PipelineResult<()> {
    let config = cli.into_config()?;

    let mut observers: Vec<Arc<dyn PipelineObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &config.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    let observer: Arc<dyn PipelineObserver> = Arc::new(CompositeObserver::new(observers));

    let mut sinks = default_sinks(&config);
    let report = run_pipeline(&config, &mut sinks, Some(observer))?;

    for written in &report.persist.written {
        println!("{}\t{}\t{} rows", written.sink, written.table, written.rows);
    }
    for failed in &report.persist.failed {
        eprintln!("{}\t{}", failed.sink, failed.error);
    }
    if !report.rejected.is_empty() {
        eprintln!("{} document(s) could not be parsed:", report.rejected.len());
        for doc in &report.rejected {
            eprintln!("  {doc}");
        }
    }
    Ok(())
}
