//! # legaldoc-fill
//!
//! Fill legal-document templates with an LLM.
//!
//! A user picks one of nine government-form templates. The model lists the
//! blanks the template needs ("Full Name", "NIC Number", …), the user answers
//! them in a web form, the model writes the completed document, and the
//! result is rendered to PDF, either by laying the text out line by line or
//! by compiling LaTeX.
//!
//! ## Pipeline Overview
//!
//! ```text
//! documents_txt/{id}.txt
//!  │
//!  ├─ 1. Extract  model lists the fields      → informations/{id}_info.txt
//!  ├─ 2. Collect  web form answers            → informations_filled/{id}_info_filled.txt
//!  ├─ 3. Fill     model completes the template
//!  └─ 4. Render   direct layout (lopdf) or pdflatex → documents_filled/{id}.pdf
//! ```
//!
//! Templates themselves come from source PDFs via the ingestion tools
//! ([`pipeline::ingest`]): pdfium text extraction, or page images sent to the
//! model for a LaTeX rendition.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use legaldoc_fill::{DocumentId, FillConfig, FillService, FilledAnswers};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider from api.key (Gemini) or GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = FillConfig::default();
//!     let service = FillService::from_config(&config)?;
//!
//!     let fields = service.extract(DocumentId::AffiidavitRawalpindi).await?;
//!     println!("{:?}", fields.labels());
//!
//!     let answers = FilledAnswers::from_pairs([("Full Name of Deponent", "Ayesha Khan")]);
//!     let submission = service
//!         .submit_answers(DocumentId::AffiidavitRawalpindi, answers)
//!         .await?;
//!     println!("{}", submission.message());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `legaldoc` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod service;
pub mod store;
pub mod web;

#[cfg(test)]
mod test_support;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FillConfig, FillConfigBuilder, PageLayout, RenderStrategy};
pub use error::{FillError, FILL_FAILED_MESSAGE};
pub use pipeline::answers::FilledAnswers;
pub use pipeline::extract::FieldList;
pub use pipeline::fill::{DocumentFormat, FilledDocument};
pub use pipeline::ingest::{pdf_to_latex, pdf_to_text, IngestReport};
pub use pipeline::llm::{Completion, CompletionClient, CompletionRequest, LlmClient};
pub use pipeline::render::{RenderedPdf, Renderer};
pub use progress::{IngestProgressCallback, NoopIngestProgress, ProgressCallback};
pub use service::{resolve_client, FillService, FormState, Submission};
pub use store::{DocumentId, Template, TemplateStore};
