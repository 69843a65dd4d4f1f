//! Configuration types for the document-filling pipeline.
//!
//! Every knob lives in [`FillConfig`], built via [`FillConfigBuilder`]. The
//! same struct drives the web server, the CLI subcommands, and the ingestion
//! tools, so a run can be reproduced by comparing two `Debug` dumps.

use crate::error::FillError;
use crate::pipeline::llm::CompletionClient;
use crate::progress::IngestProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Provider used when nothing else is configured and an API key file exists.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default location of the API key file, relative to the working directory.
pub const DEFAULT_API_KEY_FILE: &str = "api.key";

/// Configuration for the extract → fill → render pipeline.
///
/// # Example
/// ```rust
/// use legaldoc_fill::{FillConfig, RenderStrategy};
///
/// let config = FillConfig::builder()
///     .root_dir("/srv/legaldoc")
///     .render_strategy(RenderStrategy::Latex)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct FillConfig {
    /// Directory all template and output paths are resolved against. Default: `.`.
    pub root_dir: PathBuf,

    /// LLM model identifier. If None, [`DEFAULT_MODEL`] is used with a named provider.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed completion client. Takes precedence over everything else.
    pub client: Option<Arc<dyn CompletionClient>>,

    /// File holding the provider API key. Default: `api.key`, relative to
    /// `root_dir`.
    ///
    /// Only consulted when the provider's key variable is not already set in
    /// the environment.
    pub api_key_file: Option<PathBuf>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens per completion. Default: 8192.
    ///
    /// A filled multi-page affidavit in LaTeX runs to a few thousand tokens.
    pub max_tokens: usize,

    /// Retry attempts on a failed model call. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// How filled documents become PDFs. Default: [`RenderStrategy::Direct`].
    pub render_strategy: RenderStrategy,

    /// Page geometry for direct rendering. Default: [`PageLayout::letter`].
    pub layout: PageLayout,

    /// LaTeX compiler executable. Default: `pdflatex`.
    pub latex_program: String,

    /// Arguments placed before the source filename. Default: `-interaction=nonstopmode`.
    pub latex_args: Vec<String>,

    /// Kill the compiler after this many seconds. Default: no timeout.
    pub latex_timeout_secs: Option<u64>,

    /// Send `documents_latex/{id}.tex` to the filler as a skeleton when
    /// rendering through LaTeX. Default: true.
    pub latex_skeleton: bool,

    /// Rasterisation DPI for `ingest latex`. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Longest rendered page edge in pixels for `ingest latex`. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Concurrent page requests during `ingest latex`. Default: 4.
    pub concurrency: usize,

    /// Ingestion progress events.
    pub progress_callback: Option<Arc<dyn IngestProgressCallback>>,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            model: None,
            provider_name: None,
            provider: None,
            client: None,
            api_key_file: Some(PathBuf::from(DEFAULT_API_KEY_FILE)),
            temperature: 0.2,
            max_tokens: 8192,
            max_retries: 0,
            retry_backoff_ms: 500,
            render_strategy: RenderStrategy::default(),
            layout: PageLayout::default(),
            latex_program: "pdflatex".to_string(),
            latex_args: vec!["-interaction=nonstopmode".to_string()],
            latex_timeout_secs: None,
            latex_skeleton: true,
            dpi: 150,
            max_rendered_pixels: 2000,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FillConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillConfig")
            .field("root_dir", &self.root_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("client", &self.client.as_ref().map(|_| "<dyn CompletionClient>"))
            .field("api_key_file", &self.api_key_file)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("render_strategy", &self.render_strategy)
            .field("layout", &self.layout)
            .field("latex_program", &self.latex_program)
            .field("latex_args", &self.latex_args)
            .field("latex_timeout_secs", &self.latex_timeout_secs)
            .field("latex_skeleton", &self.latex_skeleton)
            .field("dpi", &self.dpi)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl FillConfig {
    /// Create a new builder for `FillConfig`.
    pub fn builder() -> FillConfigBuilder {
        FillConfigBuilder {
            config: Self::default(),
        }
    }

    /// The API key file, with a relative path taken from `root_dir`.
    pub fn api_key_path(&self) -> Option<PathBuf> {
        self.api_key_file.as_ref().map(|p| {
            if p.is_relative() {
                self.root_dir.join(p)
            } else {
                p.clone()
            }
        })
    }
}

/// Builder for [`FillConfig`].
#[derive(Debug)]
pub struct FillConfigBuilder {
    config: FillConfig,
}

impl FillConfigBuilder {
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.root_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn api_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.api_key_file = Some(path.into());
        self
    }

    pub fn no_api_key_file(mut self) -> Self {
        self.config.api_key_file = None;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn render_strategy(mut self, strategy: RenderStrategy) -> Self {
        self.config.render_strategy = strategy;
        self
    }

    pub fn layout(mut self, layout: PageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn latex_program(mut self, program: impl Into<String>) -> Self {
        self.config.latex_program = program.into();
        self
    }

    pub fn latex_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.latex_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn latex_timeout_secs(mut self, secs: u64) -> Self {
        self.config.latex_timeout_secs = Some(secs);
        self
    }

    pub fn latex_skeleton(mut self, enabled: bool) -> Self {
        self.config.latex_skeleton = enabled;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn IngestProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FillConfig, FillError> {
        let c = &self.config;
        if c.latex_program.trim().is_empty() {
            return Err(FillError::InvalidConfig(
                "LaTeX program must not be empty".into(),
            ));
        }
        c.layout.validate()?;
        if c.max_tokens == 0 {
            return Err(FillError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a filled document is turned into a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// Lay the filled plain text out line by line. (default)
    #[default]
    Direct,
    /// Ask the model for LaTeX and compile it with an external program.
    Latex,
}

impl fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStrategy::Direct => f.write_str("direct"),
            RenderStrategy::Latex => f.write_str("latex"),
        }
    }
}

/// Page geometry for direct text layout, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    /// Distance from the top edge to the first baseline, and the bottom
    /// limit below which a new page starts.
    pub margin: f32,
    /// x-coordinate every line starts at.
    pub left: f32,
    pub line_height: f32,
    pub font_size: f32,
}

impl PageLayout {
    /// US Letter, 12 pt Helvetica, 15 pt leading, 50 pt margins.
    pub const fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: 50.0,
            left: 50.0,
            line_height: 15.0,
            font_size: 12.0,
        }
    }

    /// Baseline of the first line on every page.
    pub fn top(&self) -> f32 {
        self.height - self.margin
    }

    fn validate(&self) -> Result<(), FillError> {
        if self.line_height <= 0.0 || self.font_size <= 0.0 {
            return Err(FillError::InvalidConfig(
                "line height and font size must be positive".into(),
            ));
        }
        if self.top() < self.margin {
            return Err(FillError::InvalidConfig(format!(
                "page height {} leaves no room between margins of {}",
                self.height, self.margin
            )));
        }
        Ok(())
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::letter()
    }
}
