//! Direct text-to-PDF layout.
//!
//! Each input line is drawn at a fixed x-coordinate, moving down one line
//! height per line; when the cursor drops below the bottom margin a new page
//! starts. No word wrap, no font-size adaptation: long lines run off the
//! right edge exactly as they were written.
//!
//! Layout ([`layout_pages`]) is pure and separate from PDF serialisation
//! ([`write_pdf`]) so the geometry can be tested without parsing PDFs.

use crate::config::PageLayout;
use crate::error::FillError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::path::Path;
use tracing::debug;

/// One line of text at its baseline position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// Lines placed on one page, top to bottom.
pub type PageLines = Vec<PlacedLine>;

/// Split `text` on newlines and assign every line a page and baseline.
///
/// Lines are trimmed. The first baseline on each page is
/// `height - margin`; each following line sits `line_height` lower.
pub fn layout_pages(text: &str, layout: &PageLayout) -> Vec<PageLines> {
    let mut pages: Vec<PageLines> = vec![Vec::new()];
    let mut y = layout.top();

    for line in text.split('\n') {
        if y < layout.margin {
            pages.push(Vec::new());
            y = layout.top();
        }
        if let Some(page) = pages.last_mut() {
            page.push(PlacedLine {
                x: layout.left,
                y,
                text: line.trim().to_string(),
            });
        }
        y -= layout.line_height;
    }

    pages
}

/// Map text to the WinAnsi bytes the standard Helvetica font can show.
///
/// Typographic quotes and dashes fold to ASCII; other characters outside
/// Latin-1 become `?`.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => b'\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => b'"',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => b'-',
            '\u{2022}' => 0x95,
            '\u{2026}' => 0x85,
            '\t' => b' ',
            c if (c as u32) < 0x20 => b' ',
            c if (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Build a PDF document from laid-out pages.
pub fn build_document(pages: &[PageLines], layout: &PageLayout) -> Result<Document, FillError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let mut operations = Vec::with_capacity(page.len() * 5);
        for line in page {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec!["F1".into(), layout.font_size.into()],
            ));
            operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(to_win_ansi(&line.text), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| FillError::Internal(format!("content stream encoding: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                layout.width.into(),
                layout.height.into(),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

/// Lay out `text` and save it as a PDF at `path`, returning the page count.
///
/// Blocking; call from `spawn_blocking` in async code.
pub fn write_pdf(text: &str, layout: &PageLayout, path: &Path) -> Result<usize, FillError> {
    let pages = layout_pages(text, layout);
    let mut doc = build_document(&pages, layout)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FillError::io(parent, e))?;
    }
    doc.save(path).map_err(|e| FillError::PdfWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    debug!("Wrote {} page(s) to {}", pages.len(), path.display());
    Ok(pages.len())
}
