//! Field extraction: ask the model which blanks a template needs filled.
//!
//! The model answers with one label per line. Models decorate lists freely
//! (bullets, dashes, code fences), so [`parse_field_list`] strips that
//! decoration and drops blank lines before anything reaches disk.
//!
//! The list is regenerated on every call; two runs over the same template may
//! disagree if the model does.

use crate::error::FillError;
use crate::pipeline::llm::{CompletionClient, CompletionRequest};
use crate::prompts::extract_fields_prompt;
use crate::store::{read_optional, write_atomic, Template};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// Ordered labels of the fields a user must fill.
///
/// Empty means the template needs no input, which is a valid outcome and
/// distinct from a failed extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList {
    labels: Vec<String>,
}

impl FieldList {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// One label per line, newline-terminated.
    pub fn to_file_contents(&self) -> String {
        self.labels.iter().map(|l| format!("{l}\n")).collect()
    }

    /// Parse a field-list file: one trimmed, non-empty label per line.
    pub fn from_file_contents(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

// A fence line such as "```" or "```text".
static RE_FENCE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^`{3,}\s*[A-Za-z0-9_-]*$").unwrap());

// The model's way of saying "no fields": `[]`, `None`, `(none)`, `N/A`.
static RE_NO_FIELDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:\[\s*\]|\(?none\)?\.?|n/?a\.?)$").unwrap());

/// Parse the model's newline-delimited answer into field labels.
///
/// Each line is stripped of surrounding `-`, `*`, `•` and spaces; blank lines
/// and code-fence lines are dropped. A lone empty-list marker such as `[]`
/// yields an empty list.
pub fn parse_field_list(response: &str) -> FieldList {
    let labels: Vec<String> = response
        .trim()
        .lines()
        .map(|line| line.trim_matches(|c: char| matches!(c, '-' | '*' | '•') || c.is_whitespace()))
        .filter(|line| !line.is_empty())
        .filter(|line| !RE_FENCE_LINE.is_match(line))
        .map(str::to_string)
        .collect();
    if let [only] = labels.as_slice() {
        if RE_NO_FIELDS.is_match(only) {
            return FieldList::default();
        }
    }
    FieldList::new(labels)
}

/// Ask the model for the fields `template` requires.
///
/// # Errors
/// [`FillError::EmptyTemplate`] when the template is blank; otherwise
/// whatever the client returns.
pub async fn extract_fields(
    client: &dyn CompletionClient,
    template: &Template,
) -> Result<FieldList, FillError> {
    if template.text.trim().is_empty() {
        return Err(FillError::EmptyTemplate {
            id: template.id.to_string(),
        });
    }

    let request = CompletionRequest::text(extract_fields_prompt(&template.text));
    let completion = client.complete(request).await?;
    let fields = parse_field_list(&completion.text);
    debug!(
        "Model listed {} fields for {} ({} output tokens)",
        fields.len(),
        template.id,
        completion.output_tokens
    );
    Ok(fields)
}

/// Extract fields and persist them to `path`.
///
/// The file is only replaced after a successful extraction, so a failure
/// leaves any earlier list in place.
pub async fn extract_to_file(
    client: &dyn CompletionClient,
    template: &Template,
    path: &Path,
) -> Result<FieldList, FillError> {
    let fields = extract_fields(client, template).await?;
    write_atomic(path, fields.to_file_contents()).await?;
    info!("Extracted information saved to {}", path.display());
    Ok(fields)
}

/// Read a persisted field list; `None` if it has never been written.
pub async fn read_field_list(path: &Path) -> Result<Option<FieldList>, FillError> {
    Ok(read_optional(path)
        .await?
        .map(|contents| FieldList::from_file_contents(&contents)))
}
