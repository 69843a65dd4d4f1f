//! Error types for the legaldoc-fill library.
//!
//! Every stage of the pipeline returns [`FillError`]. The stages used to
//! swallow failures and hand back sentinel values; with an explicit error a
//! caller can tell "the model found no fields" (an empty
//! [`crate::pipeline::extract::FieldList`]) apart from "extraction failed"
//! (`Err(FillError)`), and the web layer can show a failure banner instead of
//! an unconditional success message.
//!
//! Variants are grouped by the stage that raises them so log lines read
//! naturally: store, model, render, ingest, I/O, configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Fixed message shown to users when the document could not be filled.
pub const FILL_FAILED_MESSAGE: &str =
    "Error: Unable to process the document. Please ensure your inputs are valid and try again.";

/// All errors returned by the legaldoc-fill library.
#[derive(Debug, Error)]
pub enum FillError {
    // ── Template store ────────────────────────────────────────────────────
    /// The identifier is not one of the known templates.
    #[error("Unknown document '{id}'")]
    UnknownDocument { id: String },

    /// The text template for a known identifier is missing on disk.
    #[error("Template for '{id}' not found at '{path}'\nRun `legaldoc ingest text` to build it.")]
    TemplateNotFound { id: String, path: PathBuf },

    /// The template exists but contains only whitespace.
    #[error("Template for '{id}' is empty")]
    EmptyTemplate { id: String },

    /// No field list has ever been extracted for this document.
    #[error("No field list for '{id}' at '{path}'")]
    FieldListMissing { id: String, path: PathBuf },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The API key file exists but could not be read.
    #[error("Failed to read API key file '{path}': {source}")]
    ApiKeyUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The model call failed after every configured attempt.
    #[error("LLM call failed after {retries} retries: {detail}")]
    LlmFailed { retries: u32, detail: String },

    /// The model answered, but with nothing usable.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    // ── Render errors ─────────────────────────────────────────────────────
    /// Could not build or save the direct-layout PDF.
    #[error("Failed to write PDF '{path}': {detail}")]
    PdfWriteFailed { path: PathBuf, detail: String },

    /// The LaTeX compiler binary could not be started.
    #[error("LaTeX compiler '{program}' could not be started: {source}\nInstall a TeX distribution or pass --latex-program.")]
    LatexCompilerUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The LaTeX compiler exited with a non-zero status.
    #[error("LaTeX compilation failed (exit status {status:?}):\n{log}")]
    LatexCompileFailed { status: Option<i32>, log: String },

    /// The LaTeX compiler did not finish within the configured timeout.
    #[error("LaTeX compilation timed out after {secs}s")]
    LatexTimeout { secs: u64 },

    /// The compiler reported success but produced no PDF.
    #[error("LaTeX compiler produced no PDF at '{path}'")]
    LatexOutputMissing { path: PathBuf },

    // ── Ingest errors ─────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    /// A source PDF could not be opened.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading or writing a pipeline file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FillError {
    /// Build an [`FillError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FillError::Io {
            path: path.into(),
            source,
        }
    }

    /// Message suitable for the end user of the web form.
    ///
    /// Model failures collapse to [`FILL_FAILED_MESSAGE`]; everything else
    /// uses the display text.
    pub fn user_message(&self) -> String {
        match self {
            FillError::LlmFailed { .. }
            | FillError::EmptyResponse
            | FillError::ProviderNotConfigured { .. } => FILL_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// True for errors raised by the renderer stage.
    pub fn is_render_error(&self) -> bool {
        matches!(
            self,
            FillError::PdfWriteFailed { .. }
                | FillError::LatexCompilerUnavailable { .. }
                | FillError::LatexCompileFailed { .. }
                | FillError::LatexTimeout { .. }
                | FillError::LatexOutputMissing { .. }
        )
    }
}
