//! The fill service: one object tying store, model client and renderer
//! together for the web form and the CLI.
//!
//! ```text
//! prepare_form(id):  template ──▶ extract ──▶ informations/{id}_info.txt ──▶ FormState
//! submit(id, form):  field list + form ──▶ answers file ──▶ fill ──▶ render ──▶ Submission
//! ```
//!
//! Requests share nothing but the filesystem. Two concurrent submissions for
//! the same document race on the same files and the last write wins.

use crate::config::{FillConfig, DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::error::FillError;
use crate::pipeline::answers::FilledAnswers;
use crate::pipeline::extract::{extract_to_file, read_field_list, FieldList};
use crate::pipeline::fill::fill_document;
use crate::pipeline::llm::{CompletionClient, LlmClient};
use crate::pipeline::render::{RenderedPdf, Renderer};
use crate::store::{DocumentId, TemplateStore};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

// ── Client resolution ────────────────────────────────────────────────────

/// Build the model client, from most-specific to least-specific source:
///
/// 1. a pre-built client (`config.client`)
/// 2. a pre-built provider (`config.provider`)
/// 3. a named provider (`config.provider_name`) with `config.model`
/// 4. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`
/// 5. the API key file, read as a Gemini key
/// 6. auto-detection via [`ProviderFactory::from_env`]
///
/// For 3–5 the API key file is exported as the provider's key variable when
/// that variable is not already set.
pub fn resolve_client(config: &FillConfig) -> Result<Arc<dyn CompletionClient>, FillError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmClient::new(provider, config)))
}

fn resolve_provider(config: &FillConfig) -> Result<Arc<dyn LLMProvider>, FillError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        apply_api_key_file(config, name)?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| default_model(name).to_string());
        return create_provider(name, &model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            apply_api_key_file(config, &prov)?;
            return create_provider(&prov, &model);
        }
    }

    if apply_api_key_file(config, DEFAULT_PROVIDER)? {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(DEFAULT_PROVIDER, model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| FillError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Put a Gemini key in api.key, set GEMINI_API_KEY or OPENAI_API_KEY, or pass --provider.\n\
                Error: {e}"
            ),
        })?;
    Ok(llm_provider)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, FillError> {
    info!("Using provider {name} with model {model}");
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        FillError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Model used when a provider is named without one.
pub fn default_model(provider: &str) -> &'static str {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => "gpt-4.1-nano",
        "anthropic" => "claude-3-5-haiku-latest",
        "mistral" => "mistral-small-latest",
        "ollama" => "llama3.2",
        _ => DEFAULT_MODEL,
    }
}

/// Environment variable holding the API key for `provider`.
pub fn api_key_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        _ => None,
    }
}

/// Read the API key file into the provider's key variable.
///
/// Returns `true` when a key was exported. A missing file, an empty file, an
/// already-set variable, or a provider without a key variable all yield
/// `false`.
fn apply_api_key_file(config: &FillConfig, provider: &str) -> Result<bool, FillError> {
    let (Some(path), Some(var)) = (config.api_key_path(), api_key_var(provider)) else {
        return Ok(false);
    };
    if std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false) {
        return Ok(false);
    }

    let key = match std::fs::read_to_string(&path) {
        Ok(k) => k.trim().to_string(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(source) => return Err(FillError::ApiKeyUnreadable { path, source }),
    };
    if key.is_empty() {
        warn!("API key file {} is empty", path.display());
        return Ok(false);
    }

    // Runs once at startup, before the server spawns request tasks.
    std::env::set_var(var, key);
    info!("Loaded {var} from {}", path.display());
    Ok(true)
}

// ── Service ──────────────────────────────────────────────────────────────

/// What the form page needs to know about a document.
#[derive(Debug)]
pub struct FormState {
    pub id: DocumentId,
    /// Fields to ask for; `None` when no field list exists on disk.
    pub fields: Option<FieldList>,
    /// Set when this load's extraction failed. `fields` may still hold a
    /// list from an earlier load.
    pub extraction_error: Option<FillError>,
}

impl FormState {
    pub fn is_available(&self) -> bool {
        self.fields.is_some()
    }

    pub fn unavailable_message(&self) -> String {
        unavailable_message(self.id)
    }
}

/// Warning shown in place of a form that has no field list.
pub fn unavailable_message(id: DocumentId) -> String {
    format!(
        "The service for '{}' is not available at the moment.",
        id.title()
    )
}

/// Result of a form submission.
///
/// The answers are always saved before the document is filled, so a failed
/// fill or render still leaves `answers_path` on disk.
#[derive(Debug)]
pub struct Submission {
    pub id: DocumentId,
    pub answers_path: PathBuf,
    pub answer_count: usize,
    pub outcome: Result<RenderedPdf, FillError>,
}

impl Submission {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Banner text for the result page.
    pub fn message(&self) -> String {
        match &self.outcome {
            Ok(_) => format!(
                "Information for {} has been processed successfully!",
                self.id.title()
            ),
            Err(e) => e.user_message(),
        }
    }
}

/// Extract, fill and render documents for one template root.
pub struct FillService {
    client: Arc<dyn CompletionClient>,
    store: TemplateStore,
    renderer: Renderer,
    latex_skeleton: bool,
}

impl FillService {
    pub fn new(client: Arc<dyn CompletionClient>, store: TemplateStore, renderer: Renderer) -> Self {
        Self {
            client,
            store,
            renderer,
            latex_skeleton: true,
        }
    }

    /// Resolve the client and build the service from `config`.
    pub fn from_config(config: &FillConfig) -> Result<Self, FillError> {
        let client = resolve_client(config)?;
        let mut service = Self::new(
            client,
            TemplateStore::new(&config.root_dir),
            Renderer::from_config(config),
        );
        service.latex_skeleton = config.latex_skeleton;
        Ok(service)
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn client(&self) -> &dyn CompletionClient {
        self.client.as_ref()
    }

    /// Regenerate and persist the field list for `id`.
    pub async fn extract(&self, id: DocumentId) -> Result<FieldList, FillError> {
        let template = self.store.load(id).await?;
        extract_to_file(self.client.as_ref(), &template, &self.store.field_list_path(id)).await
    }

    /// Run extraction, then read back whatever field list is on disk.
    ///
    /// Extraction runs on every call. Its failure is logged and recorded, not
    /// returned: an earlier list still makes the form usable.
    ///
    /// # Errors
    /// Template loading and reading the field-list file.
    pub async fn prepare_form(&self, id: DocumentId) -> Result<FormState, FillError> {
        let template = self.store.load(id).await?;
        let path = self.store.field_list_path(id);

        let extraction_error =
            match extract_to_file(self.client.as_ref(), &template, &path).await {
                Ok(_) => None,
                Err(e) => {
                    error!("Error in extracting required fields for {id}: {e}");
                    Some(e)
                }
            };

        let fields = read_field_list(&path).await?;
        if fields.is_none() {
            warn!("No field list for {id}; form unavailable");
        }
        Ok(FormState {
            id,
            fields,
            extraction_error,
        })
    }

    /// Pair submitted form values with the stored field list, then fill and
    /// render.
    ///
    /// # Errors
    /// [`FillError::FieldListMissing`] when no field list exists, plus store
    /// and answer-file I/O errors. Fill and render failures are reported in
    /// [`Submission::outcome`].
    pub async fn submit(
        &self,
        id: DocumentId,
        form: &HashMap<String, String>,
    ) -> Result<Submission, FillError> {
        let path = self.store.field_list_path(id);
        let fields = read_field_list(&path)
            .await?
            .ok_or_else(|| FillError::FieldListMissing {
                id: id.to_string(),
                path,
            })?;
        self.submit_answers(id, FilledAnswers::from_form(&fields, form))
            .await
    }

    /// Save `answers`, fill the template and render it.
    pub async fn submit_answers(
        &self,
        id: DocumentId,
        answers: FilledAnswers,
    ) -> Result<Submission, FillError> {
        let mut template = self.store.load(id).await?;
        if !self.latex_skeleton {
            template.latex = None;
        }

        let answers_path = self.store.answers_path(id);
        answers.write(&answers_path).await?;

        // A failed render must not leave the previous submission's PDF behind.
        let pdf_path = self.store.output_pdf_path(id);
        match tokio::fs::remove_file(&pdf_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(FillError::io(pdf_path, e)),
        }

        let outcome = match fill_document(
            self.client.as_ref(),
            &template,
            &answers,
            self.renderer.document_format(),
        )
        .await
        {
            Ok(doc) => self.renderer.render(&doc, &self.store, id).await,
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(out) => info!("{} processed → {}", id.title(), out.pdf_path.display()),
            Err(e) => error!("Processing {} failed: {e}", id.title()),
        }

        Ok(Submission {
            id,
            answers_path,
            answer_count: answers.len(),
            outcome,
        })
    }

    /// Path of the last rendered PDF, if one exists.
    pub async fn rendered_pdf(&self, id: DocumentId) -> Option<PathBuf> {
        let path = self.store.output_pdf_path(id);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderStrategy;
    use crate::error::FILL_FAILED_MESSAGE;
    use crate::pipeline::answers::form_key;
    use crate::test_support::ScriptedClient;

    const TEMPLATE: &str = "AFFIDAVIT\nI, ________ S/o ________ do hereby affirm.";

    fn service(dir: &std::path::Path, client: ScriptedClient) -> FillService {
        let config = FillConfig::builder().root_dir(dir).build().unwrap();
        FillService::new(
            Arc::new(client),
            TemplateStore::new(dir),
            Renderer::from_config(&config),
        )
    }

    fn seed_template(dir: &std::path::Path) {
        let store = TemplateStore::new(dir);
        let path = store.text_path(DocumentId::AffiidavitRawalpindi);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, TEMPLATE).unwrap();
    }

    /// Field list for extraction prompts, a filled document otherwise.
    fn scripted() -> ScriptedClient {
        ScriptedClient::new(|req| {
            if req.prompt.contains("extract required fields") {
                Ok("- Full Name\n- Father's Name\n".into())
            } else {
                Ok("AFFIDAVIT\nI, Ali S/o Raza do hereby affirm.".into())
            }
        })
    }

    #[test]
    fn api_key_vars_cover_known_providers() {
        assert_eq!(api_key_var("Gemini"), Some("GEMINI_API_KEY"));
        assert_eq!(api_key_var("openai"), Some("OPENAI_API_KEY"));
        assert_eq!(api_key_var("ollama"), None);
        assert_eq!(default_model("gemini"), DEFAULT_MODEL);
    }

    #[test]
    fn prebuilt_client_wins() {
        let client: Arc<dyn CompletionClient> = Arc::new(ScriptedClient::fixed("x"));
        let config = FillConfig::builder()
            .client(Arc::clone(&client))
            .provider_name("no-such-provider")
            .build()
            .unwrap();
        let resolved = resolve_client(&config).unwrap();
        assert!(Arc::ptr_eq(&resolved, &client));
    }

    #[tokio::test]
    async fn form_lists_extracted_fields() {
        let dir = tempfile::tempdir().unwrap();
        seed_template(dir.path());
        let svc = service(dir.path(), scripted());

        let form = svc.prepare_form(DocumentId::AffiidavitRawalpindi).await.unwrap();
        assert!(form.is_available());
        assert!(form.extraction_error.is_none());
        assert_eq!(form.fields.unwrap().labels(), &["Full Name", "Father's Name"]);
    }

    #[tokio::test]
    async fn failed_extraction_without_list_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        seed_template(dir.path());
        let svc = service(dir.path(), ScriptedClient::failing());

        let form = svc.prepare_form(DocumentId::AffiidavitRawalpindi).await.unwrap();
        assert!(!form.is_available());
        assert!(form.extraction_error.is_some());
        assert_eq!(
            form.unavailable_message(),
            "The service for 'Affiidavit Rawalpindi' is not available at the moment."
        );
    }

    #[tokio::test]
    async fn missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), scripted());
        let err = svc.prepare_form(DocumentId::AssetsForm).await.unwrap_err();
        assert!(matches!(err, FillError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn submission_saves_answers_and_renders() {
        let dir = tempfile::tempdir().unwrap();
        seed_template(dir.path());
        let svc = service(dir.path(), scripted());
        let id = DocumentId::AffiidavitRawalpindi;
        svc.prepare_form(id).await.unwrap();

        let form = HashMap::from([
            (form_key(0), "Ali".to_string()),
            (form_key(1), "Raza".to_string()),
        ]);
        let sub = svc.submit(id, &form).await.unwrap();

        assert!(sub.succeeded());
        assert_eq!(sub.answer_count, 2);
        assert_eq!(
            sub.message(),
            "Information for Affiidavit Rawalpindi has been processed successfully!"
        );
        assert_eq!(
            std::fs::read_to_string(&sub.answers_path).unwrap(),
            "Full Name: Ali\nFather's Name: Raza\n"
        );
        assert_eq!(svc.rendered_pdf(id).await, Some(svc.store().output_pdf_path(id)));
    }

    #[tokio::test]
    async fn submit_without_field_list_fails() {
        let dir = tempfile::tempdir().unwrap();
        seed_template(dir.path());
        let svc = service(dir.path(), scripted());
        let err = svc
            .submit(DocumentId::AffiidavitRawalpindi, &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FillError::FieldListMissing { .. }));
    }

    #[tokio::test]
    async fn fill_failure_keeps_answers_and_drops_stale_pdf() {
        let dir = tempfile::tempdir().unwrap();
        seed_template(dir.path());
        let id = DocumentId::AffiidavitRawalpindi;

        let ok = service(dir.path(), scripted());
        ok.submit_answers(id, FilledAnswers::from_pairs([("Full Name", "Ali")]))
            .await
            .unwrap();
        assert!(ok.rendered_pdf(id).await.is_some());

        let failing = service(dir.path(), ScriptedClient::failing());
        let sub = failing
            .submit_answers(id, FilledAnswers::from_pairs([("Full Name", "Sara")]))
            .await
            .unwrap();
        assert!(!sub.succeeded());
        assert_eq!(sub.message(), FILL_FAILED_MESSAGE);
        assert_eq!(
            std::fs::read_to_string(&sub.answers_path).unwrap(),
            "Full Name: Sara\n"
        );
        assert!(failing.rendered_pdf(id).await.is_none());
    }

    #[tokio::test]
    async fn latex_skeleton_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        seed_template(dir.path());
        let store = TemplateStore::new(dir.path());
        let latex_path = store.latex_path(DocumentId::AffiidavitRawalpindi);
        std::fs::create_dir_all(latex_path.parent().unwrap()).unwrap();
        std::fs::write(&latex_path, "\\begin{document}SKELETON\\end{document}").unwrap();

        let client = Arc::new(ScriptedClient::fixed("\\documentclass{article}"));
        let config = FillConfig::builder()
            .root_dir(dir.path())
            .client(client.clone())
            .render_strategy(RenderStrategy::Latex)
            .latex_program("no-such-latex-binary-5d1e")
            .latex_skeleton(false)
            .build()
            .unwrap();
        let svc = FillService::from_config(&config).unwrap();
        assert_eq!(svc.renderer().strategy(), RenderStrategy::Latex);
        assert_eq!(svc.store().root(), dir.path());

        let sub = svc
            .submit_answers(DocumentId::AffiidavitRawalpindi, FilledAnswers::default())
            .await
            .unwrap();
        assert!(matches!(
            sub.outcome,
            Err(FillError::LatexCompilerUnavailable { .. })
        ));
        assert!(!client.prompts.lock().unwrap()[0].contains("SKELETON"));
    }

    #[tokio::test]
    async fn from_config_uses_the_configured_client() {
        let client = Arc::new(ScriptedClient::fixed("pong"));
        let config = FillConfig::builder()
            .client(client.clone())
            .no_api_key_file()
            .build()
            .unwrap();
        let svc = FillService::from_config(&config).unwrap();

        let reply = svc
            .client()
            .complete(crate::pipeline::llm::CompletionRequest::text("ping"))
            .await
            .unwrap();
        assert_eq!(reply.text, "pong");
        assert_eq!(client.call_count(), 1);
        assert_eq!(svc.renderer().strategy(), RenderStrategy::Direct);
    }
}
