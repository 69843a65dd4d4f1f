//! Pipeline stages for filling legal-document templates.
//!
//! ## Data Flow
//!
//! ```text
//! template ──▶ extract ──▶ answers ──▶ fill ──▶ render
//! (store)      (model)     (form)      (model)  (layout | latex)
//! ```
//!
//! 1. [`extract`]: ask the model which blanks the template has; persist the
//!    labels
//! 2. [`answers`]: pair labels with the user's values; persist them
//! 3. [`fill`]: ask the model for the completed document
//! 4. [`render`]: turn it into a PDF, by direct line [`layout`] or by the
//!    [`latex`] compiler
//!
//! Template ingestion ([`ingest`]) runs offline beforehand, using
//! [`rasterise`] and [`encode`] to turn source PDFs into templates. Every
//! model call goes through [`llm`].

pub mod answers;
pub mod encode;
pub mod extract;
pub mod fill;
pub mod ingest;
pub mod latex;
pub mod layout;
pub mod llm;
pub mod rasterise;
pub mod render;
