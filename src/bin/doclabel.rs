//! CLI binary for edgequake-doclabel.
//!
//! A thin shim over the library crate: every subcommand maps its flags onto
//! `LabelingConfig`, calls one or two library functions and prints or writes
//! the result.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_doclabel::{
    extract_page_regions, format_ocr, read_json, read_page_list, render_pages, write_json,
    write_training_set, AnalysisResult, EditScript, FieldSchema, LabelingConfig, Page,
    PageSelection, ProgressCallback, RenderProgressCallback, Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_render_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
    }

    fn on_page_rendered(&self, page_num: usize, total: usize, width: u32, height: u32) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{width}x{height} px")),
        ));
        self.bar.inc(1);
    }

    fn on_render_complete(&self, rendered: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} {} pages rendered", green("✔"), bold(&rendered.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render every page to images/ and print the page list
  doclabel render invoice.pdf > pages.json

  # Inspect the regions an analysis result would pre-populate on page 1
  doclabel regions --pages pages.json --analysis analysis.json --page 1

  # Canonicalise an analysis result into an OCR file
  doclabel ocr analysis.json -o training/invoice.pdf.ocr.json

  # Full session: render, pre-populate, replay edits, write the training set
  doclabel label --schema fields.json --pdf invoice.pdf \
      --analysis analysis.json --edits edits.json -o training/

EDIT SCRIPT:
  {
    "regions":  [{"page": 1, "startX": 20, "startY": 10, "endX": 100, "endY": 30,
                  "field": "Vendor", "content": "Contoso"}],
    "commands": [{"page": 1, "index": 0, "command": {"setRowNumber": 2}}]
  }

ENVIRONMENT VARIABLES:
  RUST_LOG                Override the log filter (e.g. edgequake_doclabel=debug)
  DOCLABEL_*              Every flag can also be set from the environment
"#;

/// Label document pages and emit training data for template models.
#[derive(Parser, Debug)]
#[command(
    name = "doclabel",
    version,
    about = "Label document pages and emit template-model training data",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCLABEL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCLABEL_QUIET")]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "DOCLABEL_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render PDF pages to JPEG and print the page list as JSON.
    Render {
        /// PDF to render.
        pdf: PathBuf,

        #[command(flatten)]
        render: RenderArgs,

        /// Write the page list here instead of stdout.
        #[arg(short, long, env = "DOCLABEL_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Print the regions an analysis result yields for each page.
    Regions {
        /// Page list written by `render`.
        #[arg(long, env = "DOCLABEL_PAGES")]
        pages: PathBuf,

        /// Analysis result JSON (SDK or REST shape).
        #[arg(long, env = "DOCLABEL_ANALYSIS")]
        analysis: PathBuf,

        /// Only this page (1-indexed).
        #[arg(long)]
        page: Option<usize>,
    },

    /// Canonicalise an analysis result into an OCR document.
    Ocr {
        /// Analysis result JSON.
        analysis: PathBuf,

        /// Output file.
        #[arg(short, long, env = "DOCLABEL_OUTPUT")]
        output: PathBuf,

        /// Fail on shapes canonicalisation has no rule for.
        #[arg(long, env = "DOCLABEL_STRICT")]
        strict: bool,
    },

    /// Run a full labeling session and write the training set.
    Label(LabelArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Directory for rendered page images.
    #[arg(long, env = "DOCLABEL_IMAGES_DIR", default_value = "images")]
    images_dir: PathBuf,

    /// Longest rendered edge in pixels.
    #[arg(long, env = "DOCLABEL_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long = "select", env = "DOCLABEL_SELECT", default_value = "all")]
    selection: PageSelection,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCLABEL_PASSWORD")]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct LabelArgs {
    /// Field schema (fields.json).
    #[arg(long, env = "DOCLABEL_SCHEMA")]
    schema: PathBuf,

    /// PDF to render.
    #[arg(long, env = "DOCLABEL_PDF", conflicts_with = "pages", required_unless_present = "pages")]
    pdf: Option<PathBuf>,

    /// Page list from an earlier `render` run.
    #[arg(long, env = "DOCLABEL_PAGES")]
    pages: Option<PathBuf>,

    /// Analysis result used to pre-populate labels and write the OCR file.
    #[arg(long, env = "DOCLABEL_ANALYSIS")]
    analysis: Option<PathBuf>,

    /// Edit script to replay.
    #[arg(long, env = "DOCLABEL_EDITS")]
    edits: Option<PathBuf>,

    /// Document name used for the output files (defaults to the PDF file name).
    #[arg(long, env = "DOCLABEL_DOCUMENT")]
    document: Option<String>,

    /// Output directory for the training set.
    #[arg(short, long, env = "DOCLABEL_OUTPUT")]
    output: PathBuf,

    /// `$schema` marker of the labels file.
    #[arg(long, env = "DOCLABEL_SCHEMA_URI")]
    schema_uri: Option<String>,

    /// Fail on analysis shapes canonicalisation has no rule for.
    #[arg(long, env = "DOCLABEL_STRICT")]
    strict: bool,

    #[command(flatten)]
    render: RenderArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // Only commands that rasterise get a bar.
    let progress = || -> Option<ProgressCallback> {
        show_progress.then(|| CliProgressCallback::new() as ProgressCallback)
    };

    match cli.command {
        Command::Render {
            pdf,
            render,
            output,
        } => {
            let config = build_config(&render, progress(), None, false)?;
            let pages = render_pages(&pdf, &config)
                .await
                .with_context(|| format!("Failed to render {}", pdf.display()))?;
            emit(&pages, output.as_deref()).await?;
        }

        Command::Regions {
            pages,
            analysis,
            page,
        } => {
            let pages = read_page_list(&pages).context("Failed to read page list")?;
            let analysis =
                AnalysisResult::from_file(&analysis).context("Failed to read analysis result")?;

            let mut all = Vec::new();
            for p in pages.iter().filter(|p| page.is_none_or(|n| n == p.number)) {
                all.extend(
                    extract_page_regions(&analysis, p)
                        .with_context(|| format!("Failed to extract regions on page {}", p.number))?,
                );
            }
            emit(&all, None).await?;
        }

        Command::Ocr {
            analysis,
            output,
            strict,
        } => {
            let raw: Value = read_json(&analysis).context("Failed to read analysis result")?;
            let policy = LabelingConfig::builder()
                .strict_canonicalization(strict)
                .build()?
                .shape_policy();
            let ocr = format_ocr(&raw, chrono::Utc::now(), policy)
                .context("Failed to canonicalise analysis result")?;
            write_json(&output, &ocr)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&output.display().to_string()));
            }
        }

        Command::Label(args) => {
            let progress = if args.pdf.is_some() { progress() } else { None };
            run_label(args, progress, cli.quiet).await?
        }
    }

    Ok(())
}

async fn run_label(args: LabelArgs, progress: Option<ProgressCallback>, quiet: bool) -> Result<()> {
    let config = build_config(
        &args.render,
        progress,
        args.schema_uri.clone(),
        args.strict,
    )?;

    let schema_text = tokio::fs::read_to_string(&args.schema)
        .await
        .with_context(|| format!("Failed to read field schema {}", args.schema.display()))?;
    let schema = Arc::new(FieldSchema::from_json_str(&schema_text).context("Invalid field schema")?);

    let (pages, document) = load_pages(&args, &config).await?;
    let mut session = Session::new(schema, pages).with_schema_uri(config.schema_uri.clone());

    // ── Pre-populate from the analysis result ────────────────────────────
    let ocr = match &args.analysis {
        Some(path) => {
            let raw: Value = read_json(path).context("Failed to read analysis result")?;
            let analysis = AnalysisResult::from_value(raw.clone())
                .with_context(|| format!("Invalid analysis result {}", path.display()))?;
            session
                .prepopulate(&analysis)
                .context("Failed to pre-populate labels")?;
            Some(
                format_ocr(&raw, chrono::Utc::now(), config.shape_policy())
                    .context("Failed to canonicalise analysis result")?,
            )
        }
        None => None,
    };

    // ── Replay edits ─────────────────────────────────────────────────────
    if let Some(path) = &args.edits {
        let script: EditScript = read_json(path).context("Failed to read edit script")?;
        let report = script
            .apply(&mut session)
            .with_context(|| format!("Edit script {} addresses a missing label", path.display()))?;
        for failure in &report.failures {
            eprintln!(
                "  {} {} on {}: {}",
                red("✗"),
                failure.command.name(),
                failure.label,
                failure.error
            );
        }
        if !quiet {
            eprintln!(
                "{} {} edits applied, {} rejected",
                if report.failures.is_empty() { green("✔") } else { red("⚠") },
                report.applied,
                report.failures.len()
            );
        }
    }

    // ── Write the training set ───────────────────────────────────────────
    let labels = session
        .label_document(&document)
        .context("Failed to format labels")?;
    let paths = write_training_set(&args.output, &document, &labels, ocr.as_ref())
        .await
        .context("Failed to write training set")?;

    if !quiet {
        eprintln!(
            "{}  {} labels  →  {}",
            green("✔"),
            labels.labels.len(),
            bold(&paths.labels.display().to_string())
        );
        if ocr.is_some() {
            eprintln!("   {}", dim(&paths.ocr.display().to_string()));
        }
    }
    Ok(())
}

/// Render the PDF or read a page list, and settle the document name.
async fn load_pages(args: &LabelArgs, config: &LabelingConfig) -> Result<(Vec<Page>, String)> {
    if let Some(pdf) = &args.pdf {
        let pages = render_pages(pdf, config)
            .await
            .with_context(|| format!("Failed to render {}", pdf.display()))?;
        let document = match &args.document {
            Some(name) => name.clone(),
            None => pdf
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("PDF path has no file name; pass --document")?,
        };
        return Ok((pages, document));
    }

    let Some(list) = &args.pages else {
        bail!("Either --pdf or --pages is required");
    };
    let pages = read_page_list(list).context("Failed to read page list")?;
    let selected: Vec<Page> = pages
        .into_iter()
        .filter(|p| config.pages.contains(p.number))
        .collect();
    let Some(document) = args.document.clone() else {
        bail!("--document is required when labeling from a page list");
    };
    Ok((selected, document))
}

/// Map CLI args to `LabelingConfig`.
fn build_config(
    render: &RenderArgs,
    progress: Option<ProgressCallback>,
    schema_uri: Option<String>,
    strict: bool,
) -> Result<LabelingConfig> {
    let mut builder = LabelingConfig::builder()
        .images_dir(&render.images_dir)
        .max_rendered_pixels(render.max_pixels)
        .pages(render.selection.clone())
        .strict_canonicalization(strict);

    if let Some(pwd) = &render.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(uri) = schema_uri {
        builder = builder.schema_uri(uri);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print pretty JSON to stdout, or write it to `output`.
async fn emit<T: serde::Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => write_json(path, value)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
            println!("{json}");
            Ok(())
        }
    }
}
