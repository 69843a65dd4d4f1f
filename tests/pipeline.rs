//! Integration tests for legaldoc-fill.
//!
//! Everything except the `e2e_` tests runs against a scripted model client
//! and a scratch directory. The `e2e_` tests make live LLM calls and are
//! gated behind `E2E_ENABLED`:
//!
//!   E2E_ENABLED=1 GEMINI_API_KEY=… cargo test --test pipeline e2e -- --nocapture

use async_trait::async_trait;
use legaldoc_fill::pipeline::answers::form_key;
use legaldoc_fill::pipeline::extract::read_field_list;
use legaldoc_fill::{
    Completion, CompletionClient, CompletionRequest, DocumentId, FillConfig, FillError,
    FillService, FilledAnswers, RenderStrategy, FILL_FAILED_MESSAGE,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const AFFIDAVIT: &str = "A F F I D A V I T
I, _______________ S/o _________________ resident of
__________________________________________________________ do hereby solemnly
affirm and declare as under: -
1. That I am residing in district Rawalpindi since _____________ .
Deponent.  __________________________
NIC NO.  __________________________";

/// Answers extraction prompts with `fields` and fill prompts with the queued
/// `fills` in turn (the last one repeats), recording every prompt. No fills
/// means every fill call fails.
struct FakeModel {
    fields: String,
    fills: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    fn new(fields: &str, filled: Option<&str>) -> Arc<Self> {
        Self::with_fills(fields, filled.as_slice())
    }

    fn with_fills(fields: &str, fills: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fields: fields.to_string(),
            fills: Mutex::new(fills.iter().map(|f| f.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn next_fill(&self) -> Option<String> {
        let mut fills = self.fills.lock().unwrap();
        match fills.len() {
            0 => None,
            1 => Some(fills[0].clone()),
            _ => Some(fills.remove(0)),
        }
    }
}

#[async_trait]
impl CompletionClient for FakeModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, FillError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let text = if request.prompt.contains("extract required fields") {
            self.fields.clone()
        } else {
            self.next_fill().ok_or_else(|| FillError::LlmFailed {
                retries: 0,
                detail: "503 Service Unavailable".into(),
            })?
        };
        Ok(Completion {
            text,
            ..Default::default()
        })
    }
}

fn seed_template(root: &Path, id: DocumentId, text: &str) {
    let dir = root.join("documents_txt");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{id}.txt")), text).unwrap();
}

fn service(root: &Path, model: Arc<FakeModel>) -> FillService {
    let config = FillConfig::builder()
        .root_dir(root)
        .client(model)
        .no_api_key_file()
        .build()
        .unwrap();
    FillService::from_config(&config).unwrap()
}

fn pdf_page_count(path: &Path) -> usize {
    lopdf::Document::load(path).unwrap().get_pages().len()
}

// ── Extract → form → fill → render ──────────────────────────────────────────

#[tokio::test]
async fn test_full_flow_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let id = DocumentId::AffiidavitRawalpindi;
    seed_template(root, id, AFFIDAVIT);

    let model = FakeModel::new(
        "```\n- Full Name of Deponent\n- Father’s Name\n\n- Residential Address\n- Duration of residence in District Rawalpindi\n- NIC Number\n```",
        Some("A F F I D A V I T\nI, Ayesha Khan D/o Tariq Khan resident of House 12, Satellite Town ..."),
    );
    let svc = service(root, model.clone());

    let form = svc.prepare_form(id).await.unwrap();
    let fields = form.fields.expect("field list");
    assert_eq!(fields.len(), 5);

    // Extraction output: one trimmed, non-empty label per line.
    let on_disk = std::fs::read_to_string(root.join("informations/affiidavit_rawalpindi_info.txt")).unwrap();
    assert_eq!(on_disk.lines().count(), 5);
    assert!(on_disk.lines().all(|l| !l.is_empty() && l == l.trim()));

    let values = [
        "Ayesha Khan",
        "Tariq Khan",
        "House 12, Satellite Town",
        "",
        "37405-1234567-2",
    ];
    let submitted: HashMap<String, String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (form_key(i), v.to_string()))
        .collect();
    let submission = svc.submit(id, &submitted).await.unwrap();

    assert!(submission.succeeded(), "{}", submission.message());
    let answers = std::fs::read_to_string(
        root.join("informations_filled/affiidavit_rawalpindi_info_filled.txt"),
    )
    .unwrap();
    let expected: Vec<String> = fields
        .iter()
        .zip(values)
        .map(|(label, value)| format!("{label}: {value}"))
        .collect();
    assert_eq!(answers.lines().collect::<Vec<_>>(), expected);

    let pdf = root.join("documents_filled/affiidavit_rawalpindi.pdf");
    assert_eq!(submission.outcome.as_ref().unwrap().pdf_path, pdf);
    assert_eq!(pdf_page_count(&pdf), 1);

    // The fill prompt carried the template and the answers.
    let prompts = model.prompts.lock().unwrap();
    let fill_prompt = prompts.last().unwrap();
    assert!(fill_prompt.contains("I, _______________ S/o"));
    assert!(fill_prompt.contains("Full Name of Deponent: Ayesha Khan\nFather’s Name: Tariq Khan"));
}

#[tokio::test]
async fn test_second_submission_replaces_first() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let id = DocumentId::UndertakingForConstruction;
    seed_template(root, id, "UNDERTAKING\nI, ________, undertake ...");

    // First render runs to two pages, the second fits on one.
    let long: String = (1..=60).map(|i| format!("Clause {i}.\n")).collect();
    let model = FakeModel::with_fills("Full Name\nPlot Number", &[&long, "UNDERTAKING\nI, Sana"]);
    let svc = service(root, model);
    svc.prepare_form(id).await.unwrap();

    let first = HashMap::from([
        (form_key(0), "Imran".to_string()),
        (form_key(1), "42-B".to_string()),
    ]);
    let second = HashMap::from([(form_key(0), "Sana".to_string())]);
    let sub = svc.submit(id, &first).await.unwrap();
    let pdf = sub.outcome.unwrap().pdf_path;
    assert_eq!(pdf_page_count(&pdf), 2);

    let sub = svc.submit(id, &second).await.unwrap();
    assert!(sub.succeeded());
    assert_eq!(
        std::fs::read_to_string(&sub.answers_path).unwrap(),
        "Full Name: Sana\nPlot Number: \n"
    );
    assert_eq!(sub.outcome.as_ref().unwrap().pages, Some(1));
    assert_eq!(svc.rendered_pdf(id).await, Some(pdf.clone()));
    assert_eq!(pdf_page_count(&pdf), 1);
}

#[tokio::test]
async fn test_fill_failure_keeps_answers_without_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let id = DocumentId::AssetsForm;
    seed_template(root, id, "ASSETS FORM\nName: ______");

    // Extraction works once, then the model goes away for filling.
    let svc = service(root, FakeModel::new("Name", None));
    let form = svc.prepare_form(id).await.unwrap();
    assert!(form.is_available());

    let sub = svc
        .submit(id, &HashMap::from([(form_key(0), "Bilal".to_string())]))
        .await
        .unwrap();
    assert!(!sub.succeeded());
    assert_eq!(sub.message(), FILL_FAILED_MESSAGE);
    // Answers were still recorded.
    assert_eq!(std::fs::read_to_string(&sub.answers_path).unwrap(), "Name: Bilal\n");
    assert!(svc.rendered_pdf(id).await.is_none());
}

#[tokio::test]
async fn test_earlier_field_list_survives_failed_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let id = DocumentId::PoliceCharacterCertificate;
    seed_template(root, id, "CERTIFICATE\nName: ______");
    let list = root.join("informations/police_character_certificate_info.txt");
    std::fs::create_dir_all(list.parent().unwrap()).unwrap();
    std::fs::write(&list, "Applicant Name\n").unwrap();

    struct Down;
    #[async_trait]
    impl CompletionClient for Down {
        async fn complete(&self, _: CompletionRequest) -> Result<Completion, FillError> {
            Err(FillError::LlmFailed {
                retries: 0,
                detail: "timeout".into(),
            })
        }
    }
    let config = FillConfig::builder()
        .root_dir(root)
        .client(Arc::new(Down))
        .build()
        .unwrap();
    let svc = FillService::from_config(&config).unwrap();

    let form = svc.prepare_form(id).await.unwrap();
    assert!(form.extraction_error.is_some());
    assert_eq!(form.fields.unwrap().labels(), &["Applicant Name"]);
    assert_eq!(
        read_field_list(&list).await.unwrap().unwrap().labels(),
        &["Applicant Name"]
    );
}

#[tokio::test]
async fn test_long_document_renders_multiple_pages() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let id = DocumentId::ApplicationForPermissionToBuild;
    seed_template(root, id, "APPLICATION\n______");

    let long: String = (1..=120).map(|i| format!("Clause {i}.\n")).collect();
    let svc = service(root, FakeModel::new("Owner Name", Some(&long)));

    let sub = svc
        .submit_answers(id, FilledAnswers::from_pairs([("Owner Name", "Zahid")]))
        .await
        .unwrap();
    let out = sub.outcome.unwrap();
    // 120 lines at 47 per letter page.
    assert_eq!(out.pages, Some(3));
    assert_eq!(pdf_page_count(&out.pdf_path), 3);
}

#[cfg(unix)]
#[tokio::test]
async fn test_latex_compile_failure_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let id = DocumentId::CertificateOfDomicile;
    seed_template(root, id, "CERTIFICATE OF DOMICILE\n______");

    let config = FillConfig::builder()
        .root_dir(root)
        .client(FakeModel::new("Name", Some("```latex\n\\documentclass{article}\n```")))
        .render_strategy(RenderStrategy::Latex)
        .latex_program("sh")
        .latex_args(["-c", "echo '! LaTeX Error: File not found.' >&2; exit 1"])
        .build()
        .unwrap();
    let svc = FillService::from_config(&config).unwrap();

    let sub = svc
        .submit_answers(id, FilledAnswers::from_pairs([("Name", "Hina")]))
        .await
        .unwrap();
    match &sub.outcome {
        Err(FillError::LatexCompileFailed { status, log }) => {
            assert_eq!(*status, Some(1));
            assert!(log.contains("LaTeX Error"));
        }
        other => panic!("expected compile failure, got {other:?}"),
    }
    assert!(!sub.succeeded());
    // Fence stripped before compiling.
    let tex = std::fs::read_to_string(root.join("documents_filled/latex/certificate_of_domicile.tex")).unwrap();
    assert_eq!(tex, "\\documentclass{article}");
    assert!(!root.join("documents_filled/certificate_of_domicile.pdf").exists());
}

// ── Live provider (E2E_ENABLED) ──────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

#[tokio::test]
async fn e2e_extract_and_fill_affidavit() {
    e2e_skip_unless_enabled!();
    let _ = tracing_subscriber::fmt()
        .with_env_filter("legaldoc_fill=debug")
        .with_test_writer()
        .try_init();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let id = DocumentId::AffiidavitRawalpindi;
    seed_template(root, id, AFFIDAVIT);

    let config = FillConfig::builder().root_dir(root).build().unwrap();
    let svc = FillService::from_config(&config).expect("provider configured");

    let fields = svc.extract(id).await.unwrap();
    println!("fields: {:?}", fields.labels());
    assert!(!fields.is_empty());

    let answers = FilledAnswers::from_pairs(
        fields
            .iter()
            .map(|label| (label.to_string(), format!("<{label}>"))),
    );
    let sub = svc.submit_answers(id, answers).await.unwrap();
    println!("{}", sub.message());
    assert!(sub.succeeded());
    assert!(pdf_page_count(&sub.outcome.unwrap().pdf_path) >= 1);
}
