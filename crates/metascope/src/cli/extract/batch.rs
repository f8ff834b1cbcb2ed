//! Batch execution: progress tracking, report output, archive export and the
//! closing summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::{Duration, Instant};

use metascope_core::{
    ArchiveExporter, BatchProcessor, BatchStats, DiscoveredFile, FileReport, OutputWriter,
};

use super::types::ReportFormat;
use super::ExtractArgs;

/// Everything `run_batch` needs besides the arguments.
pub(crate) struct BatchContext {
    pub processor: BatchProcessor,
    pub format: ReportFormat,
    pub pretty: bool,
    pub include_warnings: bool,
    pub show_progress: bool,
}

/// Process the discovered files, then write reports and the optional archive.
pub async fn run_batch(
    ctx: BatchContext,
    args: &ExtractArgs,
    files: Vec<DiscoveredFile>,
) -> anyhow::Result<()> {
    let total_bytes: u64 = files.iter().map(|f| f.size).sum();
    let progress = if ctx.show_progress {
        create_progress_bar(files.len() as u64)
    } else {
        indicatif::ProgressBar::hidden()
    };

    let start_time = Instant::now();
    let paths = files.into_iter().map(|f| f.path).collect();
    let outcome = ctx
        .processor
        .process_paths(paths, |report| {
            progress.inc(1);
            let elapsed = start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                progress.set_message(format!(
                    "{:.1} files/sec - {}",
                    progress.position() as f64 / elapsed,
                    report.file_name
                ));
            }
        })
        .await;
    let elapsed = start_time.elapsed();
    progress.finish_and_clear();

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            write_reports(BufWriter::new(file), &ctx, &outcome.reports)?;
            tracing::info!("Output written to {:?}", path);
        }
        None => write_reports(std::io::stdout().lock(), &ctx, &outcome.reports)?,
    }

    if let Some(archive) = &args.export {
        ArchiveExporter::write_to_path(archive, &outcome.reports)?;
        eprintln!("Archive written to {}", archive.display());
    }

    print_summary(&outcome.stats, total_bytes, elapsed);
    Ok(())
}

/// Write reports in the selected format. A single JSON report is written
/// as an object, several as an array.
fn write_reports<W: Write>(
    writer: W,
    ctx: &BatchContext,
    reports: &[FileReport],
) -> anyhow::Result<()> {
    let mut writer = OutputWriter::new(writer, ctx.format.into(), ctx.pretty)
        .with_warnings(ctx.include_warnings);
    match (ctx.format, reports) {
        (ReportFormat::Json, [single]) => writer.write(single)?,
        _ => writer.write_all(reports)?,
    }
    writer.flush()?;
    Ok(())
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(stats: &BatchStats, total_bytes: u64, elapsed: Duration) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    for line in summary_lines(stats, total_bytes, elapsed) {
        eprintln!("{line}");
    }
    eprintln!("  ====================================");
}

fn summary_lines(stats: &BatchStats, total_bytes: u64, elapsed: Duration) -> Vec<String> {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        stats.total() as f64 / secs
    } else {
        0.0
    };

    let mut lines = vec![format!("    Parsed:       {:>8}", stats.parsed)];
    if stats.corrupt > 0 {
        lines.push(format!("    Corrupt:      {:>8}", stats.corrupt));
    }
    if stats.unrecognized > 0 {
        lines.push(format!("    Unrecognized: {:>8}", stats.unrecognized));
    }
    if stats.unreadable > 0 {
        lines.push(format!("    Unreadable:   {:>8}", stats.unreadable));
    }
    lines.push(format!("    With GPS:     {:>8}", stats.with_gps));
    lines.push("  ------------------------------------".to_string());
    lines.push(format!("    Total:        {:>8}", stats.total()));
    lines.push(format!(
        "    Read:         {:>7.1} MB",
        total_bytes as f64 / 1_000_000.0
    ));
    lines.push(format!("    Duration:     {:>7.1}s", secs));
    lines.push(format!("    Rate:         {:>7.1} files/sec", rate));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use metascope_core::{assemble, Config, MetadataPipeline, ReportStatus};

    fn context(format: ReportFormat) -> BatchContext {
        BatchContext {
            processor: BatchProcessor::new(
                Arc::new(MetadataPipeline::new(&Config::default())),
                1,
            ),
            format,
            pretty: false,
            include_warnings: true,
            show_progress: false,
        }
    }

    fn report(name: &str) -> FileReport {
        FileReport::new(
            name,
            ReportStatus::Unrecognized,
            assemble(None, vec![], None, vec!["File could not be parsed: unrecognized format.".into()]),
        )
    }

    #[test]
    fn single_json_report_is_an_object() {
        let mut out = Vec::new();
        write_reports(&mut out, &context(ReportFormat::Json), &[report("a")]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(value.is_object());

        let mut out = Vec::new();
        write_reports(
            &mut out,
            &context(ReportFormat::Json),
            &[report("a"), report("b")],
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn text_reports_are_blank_line_separated() {
        let mut out = Vec::new();
        write_reports(
            &mut out,
            &context(ReportFormat::Text),
            &[report("a"), report("b")],
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("File: a (unknown format)"));
        assert!(text.contains("\n\nFile: b (unknown format)"));
    }

    #[test]
    fn summary_hides_zero_failure_rows() {
        let stats = BatchStats {
            parsed: 3,
            with_gps: 1,
            ..Default::default()
        };
        let lines = summary_lines(&stats, 2_000_000, Duration::from_secs(2));
        assert!(lines[0].ends_with("3"));
        assert!(!lines.iter().any(|l| l.contains("Corrupt")));
        assert!(lines.iter().any(|l| l.contains("2.0 MB")));
        assert!(lines.iter().any(|l| l.contains("1.5 files/sec")));
    }
}
