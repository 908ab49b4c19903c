//! CLI binary for doc2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConverterConfig`, runs one import + convert, and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use doc2pdf::{
    export_to, inspect_pdf, ConversionProgressCallback, ConversionStage, Converter,
    ConverterConfig, OfficeRendererFactory, ProgressCallback, RetentionPolicy, ShareTarget,
    SourceDocument, SystemShare,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the conversion stages. A single document has no
/// meaningful length, so there is no bar.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Importing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_import_complete(&self, document: &SourceDocument) {
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(&document.display_name),
            dim(&document.human_size().unwrap_or_else(|| "size unknown".into())),
        ));
    }

    fn on_conversion_start(&self, _document: &SourceDocument) {
        self.bar.set_prefix("Converting");
    }

    fn on_stage(&self, stage: ConversionStage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_conversion_complete(&self, _output: &Path) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} converted in {}",
            green("✔"),
            dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64())),
        );
    }

    fn on_conversion_error(&self, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(error));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert; prints the generated PDF path
  doc2pdf "Quarterly Report.docx"

  # Convert and copy the PDF next to the source
  doc2pdf report.pages -o report.pdf

  # Convert and show it in the file browser
  doc2pdf --reveal notes.doc

  # Machine-readable summary
  doc2pdf --json report.docx > summary.json

  # Purge old imports and outputs, then exit
  doc2pdf --purge

ENVIRONMENT VARIABLES:
  DOC2PDF_SOFFICE     Office executable (default: soffice on PATH)
  DOC2PDF_WORK_DIR    Private working area (default: $TMPDIR/doc2pdf)
  RUST_LOG            Override the log filter

SETUP:
  The default backend drives LibreOffice headless. Install it and make sure
  `soffice --version` works, or point DOC2PDF_SOFFICE at the binary.
"#;

/// Convert Word and Pages documents to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "doc2pdf",
    version,
    about = "Convert Word and Pages documents to PDF",
    long_about = "Import a word-processing document into a private working area, render it \
with a headless renderer, and write the result as a PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document path or file:// URI.
    #[arg(required_unless_present = "purge")]
    input: Option<String>,

    /// Also copy the generated PDF here (file or directory).
    #[arg(short, long, env = "DOC2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Private working area for imports and outputs.
    #[arg(long, env = "DOC2PDF_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Office executable used by the headless backend.
    #[arg(long, env = "DOC2PDF_SOFFICE")]
    soffice: Option<PathBuf>,

    /// Delay after load before snapshotting, in milliseconds.
    #[arg(long, env = "DOC2PDF_SETTLE_MS", default_value_t = 200)]
    settle_ms: u64,

    /// Load timeout in seconds.
    #[arg(long, env = "DOC2PDF_LOAD_TIMEOUT", default_value_t = 20,
          value_parser = clap::value_parser!(u64).range(1..))]
    load_timeout: u64,

    /// Snapshot timeout in seconds.
    #[arg(long, env = "DOC2PDF_SNAPSHOT_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    snapshot_timeout: u64,

    /// Show the generated PDF in the file browser.
    #[arg(long)]
    reveal: bool,

    /// Open the generated PDF with the default handler.
    #[arg(long, conflicts_with = "reveal")]
    share: bool,

    /// Print a JSON summary instead of the output path.
    #[arg(long, env = "DOC2PDF_JSON")]
    json: bool,

    /// Apply the retention policy to the working area. Without INPUT, exit
    /// after purging.
    #[arg(long)]
    purge: bool,

    /// Purge files older than this many days.
    #[arg(long, default_value_t = 7,
          value_parser = clap::value_parser!(u64).range(1..=36_500))]
    keep_days: u64,

    /// Keep at most this many files per working directory.
    #[arg(long, default_value_t = 50)]
    keep_files: usize,

    /// Disable the progress spinner.
    #[arg(long, env = "DOC2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers the INFO-level story, so only errors get through
    // while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress && cli.input.is_some() {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let factory = match cli.soffice {
        Some(ref program) => OfficeRendererFactory::new(program),
        None => OfficeRendererFactory::from_env(),
    };
    let converter = Converter::new(config, Arc::new(factory));

    // ── Purge ────────────────────────────────────────────────────────────
    if cli.purge {
        let report = converter
            .purge_workspace()
            .await
            .context("Failed to purge working area")?;
        if cli.input.is_none() {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else if !cli.quiet {
                eprintln!(
                    "{} removed {} file(s), kept {}",
                    green("✔"),
                    report.removed,
                    report.kept
                );
            }
            return Ok(());
        }
    }
    let Some(input) = cli.input.as_deref() else {
        return Ok(());
    };

    // ── Import + convert ─────────────────────────────────────────────────
    let document = converter
        .import_file(input)
        .await
        .with_context(|| format!("Failed to import '{input}'"))?;

    let canceller = converter.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });
    let start = Instant::now();
    let result = converter.convert().await;
    ctrl_c.abort();
    let pdf = result.context("Conversion failed")?;
    let elapsed_ms = start.elapsed().as_millis();

    // ── Deliver ──────────────────────────────────────────────────────────
    let delivered = match cli.output {
        Some(ref dest) => Some(
            export_to(&pdf, dest)
                .await
                .with_context(|| format!("Failed to copy PDF to {}", dest.display()))?,
        ),
        None => None,
    };
    let final_path = delivered.as_deref().unwrap_or(&pdf);

    if cli.reveal {
        SystemShare
            .reveal(final_path)
            .context("Failed to reveal PDF")?;
    } else if cli.share {
        SystemShare.share(final_path).context("Failed to open PDF")?;
    }

    // ── Summary ──────────────────────────────────────────────────────────
    let summary = inspect_pdf(final_path).await;
    if cli.json {
        let json = serde_json::json!({
            "input": input,
            "document": document,
            "output": final_path,
            "duration_ms": elapsed_ms,
            "pdf": summary.as_ref().ok(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise summary")?
        );
        return Ok(());
    }

    println!("{}", final_path.display());
    if !cli.quiet {
        match summary {
            Ok(s) => eprintln!(
                "   {}  →  {}",
                dim(&format!(
                    "{} page(s), PDF {}, {}",
                    s.pages,
                    s.version,
                    doc2pdf::format_file_size(s.bytes)
                )),
                bold(&final_path.display().to_string()),
            ),
            Err(e) => eprintln!("   {} {}", cyan("⚠"), dim(&format!("could not inspect PDF: {e}"))),
        }
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .settle_delay(Duration::from_millis(cli.settle_ms))
        .load_timeout(Duration::from_secs(cli.load_timeout))
        .snapshot_timeout(Duration::from_secs(cli.snapshot_timeout))
        .purge_on_start(false)
        .retention(RetentionPolicy {
            max_age: Some(retention_age(cli.keep_days)),
            max_files: Some(cli.keep_files),
        });

    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Age limit for `--keep-days`, saturating instead of overflowing.
fn retention_age(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(24 * 60 * 60))
}
