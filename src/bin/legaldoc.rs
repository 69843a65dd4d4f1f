//! CLI binary for legaldoc-fill.
//!
//! A thin shim over the library crate: maps flags onto `FillConfig`, runs the
//! web form or a single pipeline step, and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use legaldoc_fill::{
    pdf_to_latex, pdf_to_text, DocumentId, FillConfig, FillService, FilledAnswers,
    IngestProgressCallback, IngestReport, ProgressCallback, RenderStrategy, TemplateStore,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar over the source PDFs, one log line per file.
struct CliIngestProgress {
    bar: ProgressBar,
}

impl CliIngestProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Ingesting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl IngestProgressCallback for CliIngestProgress {
    fn on_ingest_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} source PDF(s)"))
        ));
    }

    fn on_file_start(&self, name: &str, _idx: usize, _total: usize) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, name: &str, idx: usize, total: usize, bytes: usize) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            green("✓"),
            idx,
            total,
            name,
            dim(&format!("{bytes} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, name: &str, idx: usize, total: usize, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            red("✗"),
            idx,
            total,
            name,
            red(first_line),
        ));
        self.bar.inc(1);
    }

    fn on_ingest_complete(&self, _total: usize, _converted: usize) {
        self.bar.finish_and_clear();
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Build text templates from documents/*.pdf
  legaldoc ingest text

  # Serve the form on http://127.0.0.1:8501
  legaldoc serve

  # List the fields a template needs
  legaldoc extract affiidavit_rawalpindi

  # Fill and render from a saved answers file
  legaldoc fill affiidavit_rawalpindi --answers informations_filled/affiidavit_rawalpindi_info_filled.txt

  # Render through pdflatex instead of direct layout
  legaldoc --render latex serve

ENVIRONMENT:
  GEMINI_API_KEY          Gemini key (otherwise read from api.key)
  OPENAI_API_KEY          OpenAI key, with --provider openai
  EDGEQUAKE_LLM_PROVIDER  Provider, when --provider is not given
  EDGEQUAKE_MODEL         Model, when --model is not given
  PDFIUM_LIB_PATH         Path to libpdfium, for the ingest commands
  RUST_LOG                Overrides the log filter
"#;

#[derive(Parser, Debug)]
#[command(
    name = "legaldoc",
    version,
    about = "Fill legal-document templates with an LLM and render them to PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Directory holding documents_txt/, informations/, documents_filled/, …
    #[arg(long, global = true, env = "LEGALDOC_ROOT", default_value = ".")]
    root: PathBuf,

    /// LLM provider: gemini, openai, anthropic, mistral, ollama.
    #[arg(long, global = true, env = "LEGALDOC_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (default depends on the provider; gemini-2.0-flash for Gemini).
    #[arg(long, global = true, env = "LEGALDOC_MODEL")]
    model: Option<String>,

    /// File holding the API key; a relative path is taken from --root.
    #[arg(long, global = true, env = "LEGALDOC_API_KEY_FILE", default_value = "api.key")]
    api_key_file: PathBuf,

    /// Never read an API key file.
    #[arg(long, global = true)]
    no_api_key_file: bool,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "LEGALDOC_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, global = true, env = "LEGALDOC_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Retries per LLM call.
    #[arg(long, global = true, env = "LEGALDOC_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// How filled documents become PDFs.
    #[arg(long, global = true, env = "LEGALDOC_RENDER", value_enum, default_value = "direct")]
    render: RenderArg,

    /// LaTeX compiler binary.
    #[arg(long, global = true, env = "LEGALDOC_LATEX_PROGRAM", default_value = "pdflatex")]
    latex_program: String,

    /// Kill the LaTeX compiler after this many seconds.
    #[arg(long, global = true, env = "LEGALDOC_LATEX_TIMEOUT")]
    latex_timeout: Option<u64>,

    /// Do not send documents_latex/{id}.tex to the model as a skeleton.
    #[arg(long, global = true)]
    no_latex_skeleton: bool,

    /// Disable the ingestion progress bar.
    #[arg(long, global = true, env = "LEGALDOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LEGALDOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LEGALDOC_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the web form.
    Serve {
        #[arg(long, env = "LEGALDOC_BIND", default_value = "127.0.0.1:8501")]
        bind: SocketAddr,
    },
    /// List the known documents and what exists on disk for each.
    List,
    /// Extract the fields a template needs and save them.
    Extract {
        /// Document identifier, e.g. assets_form.
        doc: String,
        /// Print the field list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Fill a template from a `label: value` answers file and render it.
    Fill {
        doc: String,
        #[arg(long)]
        answers: PathBuf,
    },
    /// Build templates from documents/*.pdf.
    Ingest {
        #[command(subcommand)]
        kind: IngestKind,
    },
}

#[derive(Subcommand, Debug)]
enum IngestKind {
    /// Extract page text into documents_txt/.
    Text,
    /// Send page images to the model for LaTeX, into documents_latex/.
    Latex {
        /// Rendering DPI (72–400).
        #[arg(long, default_value_t = 150,
              value_parser = clap::value_parser!(u32).range(72..=400))]
        dpi: u32,

        /// Concurrent page requests.
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RenderArg {
    Direct,
    Latex,
}

impl From<RenderArg> for RenderStrategy {
    fn from(v: RenderArg) -> Self {
        match v {
            RenderArg::Direct => RenderStrategy::Direct,
            RenderArg::Latex => RenderStrategy::Latex,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The server logs requests at INFO; the ingest bar replaces INFO output.
    let ingesting = matches!(cli.command, Command::Ingest { .. });
    let show_progress = ingesting && !g.quiet && !g.no_progress;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Serve { bind } => {
            let config = build_config(g, None)?;
            let service = FillService::from_config(&config).context("Failed to set up the LLM client")?;
            if !g.quiet {
                eprintln!(
                    "{} Serving {} documents on {}  {}",
                    cyan("◆"),
                    DocumentId::ALL.len(),
                    bold(&format!("http://{bind}")),
                    dim(&format!("render: {:?}", service.renderer().strategy())),
                );
            }
            legaldoc_fill::web::serve(Arc::new(service), *bind)
                .await
                .with_context(|| format!("Server on {bind} failed"))?;
        }

        Command::List => {
            let store = TemplateStore::new(&g.root);
            if !g.quiet {
                eprintln!("{} {}", cyan("◆"), bold(&store.root().display().to_string()));
            }
            for id in DocumentId::ALL {
                let mark = |exists: bool| if exists { green("✓") } else { dim("·") };
                println!(
                    "{:<46} txt {}  tex {}  fields {}  pdf {}",
                    id.as_str(),
                    mark(store.text_path(id).exists()),
                    mark(store.latex_path(id).exists()),
                    mark(store.field_list_path(id).exists()),
                    mark(store.output_pdf_path(id).exists()),
                );
            }
        }

        Command::Extract { doc, json } => {
            let id: DocumentId = doc.parse()?;
            let config = build_config(g, None)?;
            let service = FillService::from_config(&config).context("Failed to set up the LLM client")?;
            let fields = service
                .extract(id)
                .await
                .with_context(|| format!("Field extraction failed for {id}"))?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(fields.labels())
                        .context("Failed to serialise fields")?
                );
            } else {
                for label in fields.iter() {
                    println!("{label}");
                }
                if !g.quiet {
                    eprintln!(
                        "{} {} field(s) → {}",
                        green("✔"),
                        fields.len(),
                        bold(&service.store().field_list_path(id).display().to_string())
                    );
                }
            }
        }

        Command::Fill { doc, answers } => {
            let id: DocumentId = doc.parse()?;
            let contents = tokio::fs::read_to_string(answers)
                .await
                .with_context(|| format!("Failed to read answers from {}", answers.display()))?;
            let config = build_config(g, None)?;
            let service = FillService::from_config(&config).context("Failed to set up the LLM client")?;

            let submission = service
                .submit_answers(id, FilledAnswers::parse(&contents))
                .await
                .with_context(|| format!("Could not process {id}"))?;

            match &submission.outcome {
                Ok(out) => {
                    if !g.quiet {
                        eprintln!("{} {}", green("✔"), submission.message());
                    }
                    println!("{}", out.pdf_path.display());
                }
                Err(e) => {
                    eprintln!("{} {}", red("✘"), submission.message());
                    anyhow::bail!("Rendering failed: {e}");
                }
            }
        }

        Command::Ingest { kind } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliIngestProgress::new() as Arc<dyn IngestProgressCallback>)
            } else {
                None
            };

            let report = match kind {
                IngestKind::Text => {
                    let config = build_config(g, progress)?;
                    pdf_to_text(&TemplateStore::new(&config.root_dir), &config)
                        .await
                        .context("Text ingestion failed")?
                }
                IngestKind::Latex { dpi, concurrency } => {
                    let mut config = build_config(g, progress)?;
                    config.dpi = (*dpi).clamp(72, 400);
                    config.concurrency = (*concurrency).max(1);
                    let service =
                        FillService::from_config(&config).context("Failed to set up the LLM client")?;
                    pdf_to_latex(service.client(), service.store(), &config)
                        .await
                        .context("LaTeX ingestion failed")?
                }
            };
            print_report(&report, g.quiet);
        }
    }

    Ok(())
}

/// Map CLI args to `FillConfig`.
fn build_config(g: &GlobalArgs, progress: Option<ProgressCallback>) -> Result<FillConfig> {
    let mut builder = FillConfig::builder()
        .root_dir(&g.root)
        .temperature(g.temperature)
        .max_tokens(g.max_tokens)
        .max_retries(g.max_retries)
        .render_strategy(g.render.into())
        .latex_program(g.latex_program.clone())
        .latex_skeleton(!g.no_latex_skeleton);

    builder = if g.no_api_key_file {
        builder.no_api_key_file()
    } else {
        builder.api_key_file(&g.api_key_file)
    };
    if let Some(ref provider) = g.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = g.model {
        builder = builder.model(model.clone());
    }
    if let Some(secs) = g.latex_timeout {
        builder = builder.latex_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_report(report: &IngestReport, quiet: bool) {
    if quiet {
        return;
    }
    let total = report.total();
    if report.failed.is_empty() {
        eprintln!(
            "{} {} template(s) written",
            green("✔"),
            bold(&report.converted.len().to_string())
        );
    } else {
        eprintln!(
            "{} {}/{} template(s) written  ({} failed)",
            if report.converted.is_empty() {
                red("✘")
            } else {
                cyan("⚠")
            },
            bold(&report.converted.len().to_string()),
            total,
            red(&report.failed.len().to_string()),
        );
        for failure in &report.failed {
            let first_line = failure.error.lines().next().unwrap_or_default();
            eprintln!("   {}  {}", failure.name, dim(first_line));
        }
    }
}
