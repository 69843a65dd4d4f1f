//! Template ingestion: source PDFs → text and LaTeX templates.
//!
//! Both tools walk `documents/*.pdf` in name order and write one template
//! per file. A file that fails is logged and skipped; the run continues and
//! the failure is listed in the returned [`IngestReport`].
//!
//! ```text
//! documents/{stem}.pdf ─┬─▶ pdfium text ───────────────────────────▶ documents_txt/{stem}.txt
//!                       └─▶ pdfium raster ─▶ documents_images/{stem}/page_{n}.png
//!                                          └─▶ model, per page ────▶ documents_latex/{stem}.tex
//! ```

use crate::config::FillConfig;
use crate::error::FillError;
use crate::pipeline::encode::{image_data, png_bytes};
use crate::pipeline::llm::{CompletionClient, CompletionRequest};
use crate::pipeline::rasterise::{bind_pdfium, extract_text_blocking, render_pages_blocking};
use crate::progress::ProgressCallback;
use crate::prompts::IMAGE_TO_LATEX_PROMPT;
use crate::store::{write_atomic, TemplateStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A source PDF that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Stems of the templates written.
    pub converted: Vec<String>,
    pub failed: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }
}

/// `*.pdf` files directly under `dir`, sorted by name.
///
/// A missing directory yields an empty list.
pub async fn list_source_pdfs(dir: &Path) -> Result<Vec<PathBuf>, FillError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Source directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(FillError::io(dir, e)),
    };

    let mut pdfs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| FillError::io(dir, e))? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Forwards progress events and accumulates the report.
struct Tracker<'a> {
    callback: Option<&'a ProgressCallback>,
    total: usize,
    report: IngestReport,
}

impl<'a> Tracker<'a> {
    fn new(callback: Option<&'a ProgressCallback>, total: usize) -> Self {
        if let Some(cb) = callback {
            cb.on_ingest_start(total);
        }
        Self {
            callback,
            total,
            report: IngestReport::default(),
        }
    }

    fn start(&self, name: &str, idx: usize) {
        info!("Processing: {name}.pdf ({idx}/{})", self.total);
        if let Some(cb) = self.callback {
            cb.on_file_start(name, idx, self.total);
        }
    }

    fn finish(&mut self, name: String, idx: usize, result: Result<(PathBuf, usize), FillError>) {
        match result {
            Ok((path, bytes)) => {
                info!("Saved {}", path.display());
                if let Some(cb) = self.callback {
                    cb.on_file_complete(&name, idx, self.total, bytes);
                }
                self.report.converted.push(name);
            }
            Err(e) => {
                warn!("Failed to process {name}.pdf: {e}");
                if let Some(cb) = self.callback {
                    cb.on_file_error(&name, idx, self.total, &e.to_string());
                }
                self.report.failed.push(IngestFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    fn done(self) -> IngestReport {
        if let Some(cb) = self.callback {
            cb.on_ingest_complete(self.total, self.report.converted.len());
        }
        self.report
    }
}

/// Write `documents_txt/{stem}.txt` for every source PDF.
pub async fn pdf_to_text(
    store: &TemplateStore,
    config: &FillConfig,
) -> Result<IngestReport, FillError> {
    let sources = list_source_pdfs(&store.source_pdf_dir()).await?;
    let mut tracker = Tracker::new(config.progress_callback.as_ref(), sources.len());

    for (i, pdf) in sources.iter().enumerate() {
        let name = stem(pdf);
        tracker.start(&name, i + 1);
        let out = store.text_dir().join(format!("{name}.txt"));
        let result = convert_to_text(pdf, &out).await.map(|n| (out, n));
        tracker.finish(name, i + 1, result);
    }

    Ok(tracker.done())
}

async fn convert_to_text(pdf: &Path, out: &Path) -> Result<usize, FillError> {
    let path = pdf.to_path_buf();
    let text = tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        extract_text_blocking(&pdfium, &path)
    })
    .await
    .map_err(|e| FillError::Internal(format!("Text extraction task panicked: {e}")))??;

    write_atomic(out, &text).await?;
    Ok(text.len())
}

/// Write `documents_latex/{stem}.tex` for every source PDF, saving the page
/// images under `documents_images/{stem}/` on the way.
pub async fn pdf_to_latex(
    client: &dyn CompletionClient,
    store: &TemplateStore,
    config: &FillConfig,
) -> Result<IngestReport, FillError> {
    let sources = list_source_pdfs(&store.source_pdf_dir()).await?;
    let mut tracker = Tracker::new(config.progress_callback.as_ref(), sources.len());

    for (i, pdf) in sources.iter().enumerate() {
        let name = stem(pdf);
        tracker.start(&name, i + 1);
        let out = store.latex_dir().join(format!("{name}.tex"));
        let images = store.images_dir().join(&name);
        let result = convert_to_latex(client, pdf, &images, &out, config)
            .await
            .map(|n| (out, n));
        tracker.finish(name, i + 1, result);
    }

    Ok(tracker.done())
}

async fn convert_to_latex(
    client: &dyn CompletionClient,
    pdf: &Path,
    images_dir: &Path,
    out: &Path,
    config: &FillConfig,
) -> Result<usize, FillError> {
    let path = pdf.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let pngs = tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let images = render_pages_blocking(&pdfium, &path, dpi, max_pixels)?;
        images
            .iter()
            .enumerate()
            .map(|(i, img)| png_bytes(img, i + 1))
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| FillError::Internal(format!("Render task panicked: {e}")))??;

    save_page_images(images_dir, &pngs).await?;
    let latex = pages_to_latex(client, &pngs, config.concurrency).await?;
    write_atomic(out, &latex).await?;
    Ok(latex.len())
}

/// Save PNGs as `page_1.png`, `page_2.png`, …
pub async fn save_page_images(dir: &Path, pngs: &[Vec<u8>]) -> Result<Vec<PathBuf>, FillError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| FillError::io(dir, e))?;

    let mut paths = Vec::with_capacity(pngs.len());
    for (i, png) in pngs.iter().enumerate() {
        let path = dir.join(format!("page_{}.png", i + 1));
        tokio::fs::write(&path, png)
            .await
            .map_err(|e| FillError::io(&path, e))?;
        paths.push(path);
    }
    Ok(paths)
}

/// Send each page image to the model and join the answers in page order,
/// each followed by a blank line.
///
/// Up to `concurrency` requests are in flight. Any failed page fails the
/// whole file: a template with a missing page is worse than none.
pub async fn pages_to_latex(
    client: &dyn CompletionClient,
    pngs: &[Vec<u8>],
    concurrency: usize,
) -> Result<String, FillError> {
    let total = pngs.len();
    let pages: Vec<Result<String, FillError>> = stream::iter(pngs.iter().enumerate().map(
        |(idx, png)| async move {
            let request = CompletionRequest::with_image(IMAGE_TO_LATEX_PROMPT, image_data(png));
            let completion = client.complete(request).await?;
            debug!(
                "Page {}/{} → {} chars LaTeX",
                idx + 1,
                total,
                completion.text.len()
            );
            Ok::<String, FillError>(completion.text)
        },
    ))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    let mut latex = String::new();
    for page in pages {
        latex.push_str(&page?);
        latex.push_str("\n\n");
    }
    Ok(latex)
}
