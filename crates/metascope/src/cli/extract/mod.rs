//! The `metascope extract` command.

mod batch;
pub mod types;

pub use types::ReportFormat;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use metascope_core::{BatchProcessor, Config, FileDiscovery, MetadataPipeline};

use batch::{run_batch, BatchContext};

/// Arguments for the `extract` command.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Files or directories to read
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format (defaults to the `output.format` config value)
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Number of files processed concurrently
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Also write every text report into this zip archive
    #[arg(long, value_name = "ZIP")]
    pub export: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Execute the extract command.
pub async fn execute(args: ExtractArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(parallel) = args.parallel {
        if parallel == 0 {
            anyhow::bail!("--parallel must be at least 1");
        }
        config.processing.parallel_workers = parallel;
    }

    let files = FileDiscovery::new(config.processing.clone()).discover_all(&args.inputs);
    if files.is_empty() {
        tracing::warn!("No files found at {:?}", args.inputs);
        return Ok(());
    }
    tracing::info!(
        "Found {} file(s) ({} bytes)",
        files.len(),
        FileDiscovery::total_size(&files)
    );

    let format = ReportFormat::resolve(args.format, &config.output.format);
    let pipeline = Arc::new(MetadataPipeline::new(&config));
    let processor = BatchProcessor::new(pipeline, config.processing.parallel_workers);

    let ctx = BatchContext {
        processor,
        format,
        pretty: config.output.pretty,
        include_warnings: config.output.include_warnings,
        show_progress: !args.no_progress && files.len() > 1,
    };
    run_batch(ctx, &args, files).await
}
