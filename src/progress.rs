//! Progress callbacks for template ingestion.
//!
//! Ingestion walks every PDF under `documents/` and can take minutes when
//! each page goes through the model. Inject an
//! [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::FillConfigBuilder::progress_callback`] to observe it; the
//! `legaldoc` binary drives an `indicatif` bar this way.
//!
//! # Example
//!
//! ```rust
//! use legaldoc_fill::{FillConfig, IngestProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl IngestProgressCallback for Counter {
//!     fn on_file_complete(&self, name: &str, _idx: usize, _total: usize, bytes: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name}: {bytes} bytes");
//!     }
//! }
//!
//! let config = FillConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Events raised while converting source PDFs into templates.
///
/// All methods default to no-ops. Files are processed one at a time, so
/// calls never overlap, but the trait is `Send + Sync` because the callback
/// lives in a shared config.
pub trait IngestProgressCallback: Send + Sync {
    /// Before the first file, with the number of PDFs found.
    fn on_ingest_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// `idx` is 1-based.
    fn on_file_start(&self, name: &str, idx: usize, total_files: usize) {
        let _ = (name, idx, total_files);
    }

    /// A template was written; `bytes` is its length.
    fn on_file_complete(&self, name: &str, idx: usize, total_files: usize, bytes: usize) {
        let _ = (name, idx, total_files, bytes);
    }

    /// The file was skipped; ingestion continues with the next one.
    fn on_file_error(&self, name: &str, idx: usize, total_files: usize, error: &str) {
        let _ = (name, idx, total_files, error);
    }

    fn on_ingest_complete(&self, total_files: usize, converted: usize) {
        let _ = (total_files, converted);
    }
}

/// Default when no callback is configured.
pub struct NoopIngestProgress;

impl IngestProgressCallback for NoopIngestProgress {}

/// Type stored in [`crate::config::FillConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
