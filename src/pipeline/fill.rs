//! Document filling: template + answers → filled document.
//!
//! The model's answer is used as the filled document. Nothing checks that the
//! placeholders were actually replaced; the only cleanup is removing an outer
//! Markdown fence from LaTeX output, because the compiler cannot read one.

use crate::error::FillError;
use crate::pipeline::answers::FilledAnswers;
use crate::pipeline::llm::{CompletionClient, CompletionRequest};
use crate::prompts::fill_document_prompt;
use crate::store::Template;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Markup of a filled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Latex,
}

/// A template with the user's answers substituted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledDocument {
    pub content: String,
    pub format: DocumentFormat,
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:latex|tex|LaTeX)?[ \t]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

/// Ask the model to fill `template` with `answers`.
///
/// With [`DocumentFormat::Latex`] the stored LaTeX rendition of the template,
/// when present, is sent as a skeleton for the model to fill.
pub async fn fill_document(
    client: &dyn CompletionClient,
    template: &Template,
    answers: &FilledAnswers,
    format: DocumentFormat,
) -> Result<FilledDocument, FillError> {
    let latex = format == DocumentFormat::Latex;
    let skeleton = if latex { template.latex.as_deref() } else { None };
    let prompt = fill_document_prompt(&template.text, &answers.to_information(), skeleton, latex);

    let completion = client.complete(CompletionRequest::text(prompt)).await?;
    if completion.text.trim().is_empty() {
        return Err(FillError::EmptyResponse);
    }

    let content = match format {
        DocumentFormat::Text => completion.text,
        DocumentFormat::Latex => strip_outer_fence(&completion.text),
    };
    debug!(
        "Filled {} as {:?}: {} chars, {} output tokens",
        template.id,
        format,
        content.len(),
        completion.output_tokens
    );
    info!("Filled document for {}", template.id.title());

    Ok(FilledDocument { content, format })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FILL_FAILED_MESSAGE;
    use crate::store::DocumentId;
    use crate::test_support::ScriptedClient;

    fn template(text: &str, latex: Option<&str>) -> Template {
        Template {
            id: DocumentId::UndertakingForConstruction,
            text: text.to_string(),
            latex: latex.map(str::to_string),
        }
    }

    /// Echo whatever sits between "Template document: " and "\n2. User Information".
    fn echo_template(req: &CompletionRequest) -> Result<String, FillError> {
        let start = req.prompt.find("Template document: ").unwrap() + "Template document: ".len();
        let end = req.prompt.find("\n2. User Information").unwrap();
        Ok(req.prompt[start..end].to_string())
    }

    #[tokio::test]
    async fn template_without_placeholders_comes_back_unchanged() {
        let text = "UNDERTAKING\nI shall comply with all building bye-laws.";
        let client = ScriptedClient::new(echo_template);
        let filled = fill_document(
            &client,
            &template(text, None),
            &FilledAnswers::default(),
            DocumentFormat::Text,
        )
        .await
        .unwrap();
        assert_eq!(filled.content, text);
        assert_eq!(filled.format, DocumentFormat::Text);
    }

    #[tokio::test]
    async fn text_output_is_verbatim() {
        let raw = "```\nI, Ali, undertake...\n```";
        let client = ScriptedClient::fixed(raw);
        let filled = fill_document(
            &client,
            &template("I, ____, undertake...", None),
            &FilledAnswers::from_pairs([("Full Name", "Ali")]),
            DocumentFormat::Text,
        )
        .await
        .unwrap();
        assert_eq!(filled.content, raw);

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("User Information: Full Name: Ali"));
    }

    #[tokio::test]
    async fn latex_output_loses_outer_fence_and_uses_skeleton() {
        let client = ScriptedClient::fixed(
            "```latex\n\\documentclass{article}\n\\begin{document}Ali\\end{document}\n```\n",
        );
        let filled = fill_document(
            &client,
            &template("I, ____", Some("\\begin{document}I, \\underline{\\hspace{3cm}}")),
            &FilledAnswers::from_pairs([("Full Name", "Ali")]),
            DocumentFormat::Latex,
        )
        .await
        .unwrap();
        assert_eq!(
            filled.content,
            "\\documentclass{article}\n\\begin{document}Ali\\end{document}"
        );

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("LaTeX skeleton: \\begin{document}I, \\underline"));
    }

    #[tokio::test]
    async fn model_failure_is_an_error_with_fixed_user_message() {
        let client = ScriptedClient::failing();
        let err = fill_document(
            &client,
            &template("I, ____", None),
            &FilledAnswers::default(),
            DocumentFormat::Text,
        )
        .await
        .unwrap_err();
        assert_eq!(err.user_message(), FILL_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn blank_answer_is_an_error() {
        let client = ScriptedClient::fixed("  \n");
        let err = fill_document(
            &client,
            &template("I, ____", None),
            &FilledAnswers::default(),
            DocumentFormat::Text,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FillError::EmptyResponse));
    }
}
