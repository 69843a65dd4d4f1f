//! Renderer: filled document → PDF on disk.
//!
//! A single entry point dispatches on the document's format: plain text goes
//! through the direct line layout ([`super::layout`]), LaTeX through the
//! external compiler ([`super::latex`]). The strategy configured on the
//! renderer decides which format the filler is asked to produce.

use crate::config::{FillConfig, PageLayout, RenderStrategy};
use crate::error::FillError;
use crate::pipeline::fill::{DocumentFormat, FilledDocument};
use crate::pipeline::latex::LatexCompiler;
use crate::pipeline::layout::write_pdf;
use crate::store::{DocumentId, TemplateStore};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Where a rendered document ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPdf {
    pub pdf_path: PathBuf,
    /// Compiled source, for the LaTeX strategy.
    pub latex_path: Option<PathBuf>,
    /// Page count, when known (direct layout only).
    pub pages: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    strategy: RenderStrategy,
    layout: PageLayout,
    compiler: LatexCompiler,
}

impl Renderer {
    pub fn new(strategy: RenderStrategy, layout: PageLayout, compiler: LatexCompiler) -> Self {
        Self {
            strategy,
            layout,
            compiler,
        }
    }

    pub fn from_config(config: &FillConfig) -> Self {
        Self::new(
            config.render_strategy,
            config.layout,
            LatexCompiler::new(
                config.latex_program.clone(),
                config.latex_args.clone(),
                config.latex_timeout_secs,
            ),
        )
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    /// Format the filler should produce for this renderer.
    pub fn document_format(&self) -> DocumentFormat {
        match self.strategy {
            RenderStrategy::Direct => DocumentFormat::Text,
            RenderStrategy::Latex => DocumentFormat::Latex,
        }
    }

    /// Render `doc` to `documents_filled/{id}.pdf`, replacing any earlier
    /// output.
    pub async fn render(
        &self,
        doc: &FilledDocument,
        store: &TemplateStore,
        id: DocumentId,
    ) -> Result<RenderedPdf, FillError> {
        let pdf_path = store.output_pdf_path(id);

        let rendered = match doc.format {
            DocumentFormat::Text => {
                let text = doc.content.clone();
                let layout = self.layout;
                let path = pdf_path.clone();
                let pages = tokio::task::spawn_blocking(move || write_pdf(&text, &layout, &path))
                    .await
                    .map_err(|e| FillError::Internal(format!("PDF layout task panicked: {e}")))??;
                RenderedPdf {
                    pdf_path,
                    latex_path: None,
                    pages: Some(pages),
                }
            }
            DocumentFormat::Latex => {
                let tex = self
                    .compiler
                    .compile(&doc.content, &store.latex_build_dir(), id.as_str(), &pdf_path)
                    .await?;
                RenderedPdf {
                    pdf_path,
                    latex_path: Some(tex),
                    pages: None,
                }
            }
        };

        info!("PDF saved to {}", rendered.pdf_path.display());
        Ok(rendered)
    }
}
