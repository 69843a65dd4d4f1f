//! Template store: the closed set of documents and where their files live.
//!
//! Every path the pipeline reads or writes is derived here from a
//! [`DocumentId`] and the configured root directory, so the on-disk layout is
//! defined in exactly one place:
//!
//! ```text
//! documents/{id}.pdf                          source PDFs (ingest input)
//! documents_txt/{id}.txt                      text templates
//! documents_latex/{id}.tex                    LaTeX templates
//! documents_images/{id}/page_{n}.png          rasterised pages (ingest)
//! informations/{id}_info.txt                  extracted field labels
//! informations_filled/{id}_info_filled.txt    submitted answers
//! documents_filled/{id}.pdf                   rendered output
//! documents_filled/latex/{id}.tex             LaTeX build directory
//! ```

use crate::error::FillError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::debug;

/// One of the legal-document templates the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentId {
    /// The on-disk stem keeps the historical `affiidavit` spelling.
    AffiidavitRawalpindi,
    ApplicationForCertificateOfDomicile,
    ApplicationForCopyOfDomicileCertificate,
    ApplicationForPermissionToBuild,
    ApplicationForWoodTransitPermit,
    AssetsForm,
    CertificateOfDomicile,
    PoliceCharacterCertificate,
    UndertakingForConstruction,
}

impl DocumentId {
    /// Every known document, in dropdown order.
    pub const ALL: [DocumentId; 9] = [
        DocumentId::AffiidavitRawalpindi,
        DocumentId::ApplicationForCertificateOfDomicile,
        DocumentId::ApplicationForCopyOfDomicileCertificate,
        DocumentId::ApplicationForPermissionToBuild,
        DocumentId::ApplicationForWoodTransitPermit,
        DocumentId::AssetsForm,
        DocumentId::CertificateOfDomicile,
        DocumentId::PoliceCharacterCertificate,
        DocumentId::UndertakingForConstruction,
    ];

    /// File stem used in every path for this document.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentId::AffiidavitRawalpindi => "affiidavit_rawalpindi",
            DocumentId::ApplicationForCertificateOfDomicile => {
                "application_for_certificate_of_domicile"
            }
            DocumentId::ApplicationForCopyOfDomicileCertificate => {
                "application_for_copy_of_domicile_certificate"
            }
            DocumentId::ApplicationForPermissionToBuild => "application_for_permission_to_build",
            DocumentId::ApplicationForWoodTransitPermit => "application_for_wood_transit_permit",
            DocumentId::AssetsForm => "assets_form",
            DocumentId::CertificateOfDomicile => "certificate_of_domicile",
            DocumentId::PoliceCharacterCertificate => "police_character_certificate",
            DocumentId::UndertakingForConstruction => "undertaking_for_construction",
        }
    }

    /// Human-readable title: underscores become spaces, words are capitalised.
    ///
    /// `application_for_wood_transit_permit` → `Application For Wood Transit Permit`.
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentId {
    type Err = FillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        DocumentId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == key)
            .ok_or_else(|| FillError::UnknownDocument { id: s.to_string() })
    }
}

/// The unfilled source document for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: DocumentId,
    /// Plain-text rendition; the source of truth for placeholders.
    pub text: String,
    /// LaTeX rendition, when one has been ingested.
    pub latex: Option<String>,
}

/// Resolves document paths under a root directory and loads templates.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory scanned by the ingestion tools.
    pub fn source_pdf_dir(&self) -> PathBuf {
        self.root.join("documents")
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join("documents_txt")
    }

    pub fn latex_dir(&self) -> PathBuf {
        self.root.join("documents_latex")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("documents_images")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("documents_filled")
    }

    /// Working directory for the LaTeX compiler.
    pub fn latex_build_dir(&self) -> PathBuf {
        self.output_dir().join("latex")
    }

    pub fn text_path(&self, id: DocumentId) -> PathBuf {
        self.text_dir().join(format!("{id}.txt"))
    }

    pub fn latex_path(&self, id: DocumentId) -> PathBuf {
        self.latex_dir().join(format!("{id}.tex"))
    }

    pub fn field_list_path(&self, id: DocumentId) -> PathBuf {
        self.root.join("informations").join(format!("{id}_info.txt"))
    }

    pub fn answers_path(&self, id: DocumentId) -> PathBuf {
        self.root
            .join("informations_filled")
            .join(format!("{id}_info_filled.txt"))
    }

    pub fn output_pdf_path(&self, id: DocumentId) -> PathBuf {
        self.output_dir().join(format!("{id}.pdf"))
    }

    /// Load the text template, plus the LaTeX rendition when present.
    pub async fn load(&self, id: DocumentId) -> Result<Template, FillError> {
        let text_path = self.text_path(id);
        let text = match tokio::fs::read_to_string(&text_path).await {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FillError::TemplateNotFound {
                    id: id.to_string(),
                    path: text_path,
                })
            }
            Err(e) => return Err(FillError::io(text_path, e)),
        };

        let latex = read_optional(&self.latex_path(id)).await?;
        debug!(
            "Loaded template {} ({} bytes text, latex: {})",
            id,
            text.len(),
            latex.is_some()
        );
        Ok(Template { id, text, latex })
    }
}

/// Read a file, treating "not found" as `None`.
pub(crate) async fn read_optional(path: &Path) -> Result<Option<String>, FillError> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FillError::io(path, e)),
    }
}

/// Write `contents` to `path`, creating parent directories.
///
/// Each call writes its own temp file in the target directory and renames it
/// over `path`, so concurrent writers never share a temp file and a reader
/// sees either the old or the new contents. The last rename wins.
pub(crate) async fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), FillError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| FillError::io(&dir, e))?;

    let path = path.to_path_buf();
    let contents = contents.as_ref().to_vec();
    tokio::task::spawn_blocking(move || {
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| FillError::io(&dir, e))?;
        tmp.write_all(&contents).map_err(|e| FillError::io(&dir, e))?;
        tmp.persist(&path).map_err(|e| FillError::io(&path, e.error))?;
        Ok::<(), FillError>(())
    })
    .await
    .map_err(|e| FillError::Internal(format!("file write task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_strings() {
        for id in DocumentId::ALL {
            assert_eq!(id.as_str().parse::<DocumentId>().unwrap(), id);
        }
        assert!(matches!(
            "lease_agreement".parse::<DocumentId>(),
            Err(FillError::UnknownDocument { .. })
        ));
    }

    #[test]
    fn titles_are_capitalised() {
        assert_eq!(DocumentId::AssetsForm.title(), "Assets Form");
        assert_eq!(
            DocumentId::ApplicationForCopyOfDomicileCertificate.title(),
            "Application For Copy Of Domicile Certificate"
        );
        assert_eq!(DocumentId::AffiidavitRawalpindi.title(), "Affiidavit Rawalpindi");
    }

    #[test]
    fn serde_uses_file_stem() {
        let json = serde_json::to_string(&DocumentId::PoliceCharacterCertificate).unwrap();
        assert_eq!(json, "\"police_character_certificate\"");
    }

    #[test]
    fn paths_are_namespaced_by_id() {
        let store = TemplateStore::new("/srv");
        let id = DocumentId::CertificateOfDomicile;
        assert_eq!(
            store.text_path(id),
            PathBuf::from("/srv/documents_txt/certificate_of_domicile.txt")
        );
        assert_eq!(
            store.field_list_path(id),
            PathBuf::from("/srv/informations/certificate_of_domicile_info.txt")
        );
        assert_eq!(
            store.answers_path(id),
            PathBuf::from("/srv/informations_filled/certificate_of_domicile_info_filled.txt")
        );
        assert_eq!(
            store.output_pdf_path(id),
            PathBuf::from("/srv/documents_filled/certificate_of_domicile.pdf")
        );
        assert_eq!(
            store.latex_build_dir(),
            PathBuf::from("/srv/documents_filled/latex")
        );
    }

    #[tokio::test]
    async fn load_reports_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());
        let err = store.load(DocumentId::AssetsForm).await.unwrap_err();
        assert!(matches!(err, FillError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn load_picks_up_latex_rendition() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());
        let id = DocumentId::AssetsForm;
        write_atomic(&store.text_path(id), "Name: ______").await.unwrap();

        let t = store.load(id).await.unwrap();
        assert_eq!(t.text, "Name: ______");
        assert!(t.latex.is_none());

        write_atomic(&store.latex_path(id), "\\documentclass{article}")
            .await
            .unwrap();
        let t = store.load(id).await.unwrap();
        assert_eq!(t.latex.as_deref(), Some("\\documentclass{article}"));
    }

    #[tokio::test]
    async fn write_atomic_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.txt");
        write_atomic(&path, "first").await.unwrap();
        write_atomic(&path, "second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let left: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(left, ["out.txt"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_all_succeed_and_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("informations_filled/x_info_filled.txt");

        for round in 0..20 {
            let writers: Vec<_> = (0..8)
                .map(|w| {
                    let path = path.clone();
                    let body = format!("Full Name: writer {w} round {round}\n").repeat(200);
                    tokio::spawn(async move { write_atomic(&path, body).await })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            // Whole contents from exactly one writer.
            let contents = std::fs::read_to_string(&path).unwrap();
            let first = contents.lines().next().unwrap().to_string();
            assert!(first.ends_with(&format!("round {round}")));
            assert!(contents.lines().all(|l| l == first));
            assert_eq!(contents.lines().count(), 200);
        }

        let left = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(left, 1);
    }
}
