//! Filled answers: the user's value for each field label.
//!
//! Form inputs are keyed by position (`field_0`, `field_1`, …) rather than by
//! label, so two identical labels still produce two answers. Answers keep the
//! field-list order and serialise as `label: value` lines, which is both the
//! persisted format and the "User Information" block of the fill prompt.

use crate::error::FillError;
use crate::pipeline::extract::FieldList;
use crate::store::write_atomic;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Name of the form input for the field at `index`.
pub fn form_key(index: usize) -> String {
    format!("field_{index}")
}

/// One submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub label: String,
    pub value: String,
}

/// Ordered answers for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilledAnswers {
    entries: Vec<Answer>,
}

impl FilledAnswers {
    /// Pair each field with its submitted value, in field-list order.
    ///
    /// No validation: empty strings are accepted and a field missing from the
    /// submission is recorded as empty. Line breaks inside a value are folded
    /// to spaces so each answer stays on one line.
    pub fn from_form(fields: &FieldList, form: &HashMap<String, String>) -> Self {
        let entries = fields
            .iter()
            .enumerate()
            .map(|(idx, label)| Answer {
                label: label.to_string(),
                value: form
                    .get(&form_key(idx))
                    .map(|v| single_line(v))
                    .unwrap_or_default(),
            })
            .collect();
        Self { entries }
    }

    pub fn from_pairs<I, L, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(l, v)| Answer {
                    label: l.into(),
                    value: single_line(&v.into()),
                })
                .collect(),
        }
    }

    /// Parse `label: value` lines, splitting at the first `": "`.
    ///
    /// A line without a separator is a label with an empty answer.
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|line| match line.split_once(": ") {
                Some((label, value)) => Answer {
                    label: label.trim().to_string(),
                    value: value.trim_end().to_string(),
                },
                None => Answer {
                    label: line.trim().trim_end_matches(':').to_string(),
                    value: String::new(),
                },
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[Answer] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value for the first field with this label.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.value.as_str())
    }

    /// `label: value` lines joined with `\n`, no trailing newline.
    pub fn to_information(&self) -> String {
        self.entries
            .iter()
            .map(|a| format!("{}: {}", a.label, a.value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// File form: one `label: value` line per answer, newline-terminated.
    pub fn to_file_contents(&self) -> String {
        self.entries
            .iter()
            .map(|a| format!("{}: {}\n", a.label, a.value))
            .collect()
    }

    /// Persist to `path`, replacing any earlier submission.
    pub async fn write(&self, path: &Path) -> Result<(), FillError> {
        write_atomic(path, self.to_file_contents()).await?;
        info!("Saved {} answers to {}", self.len(), path.display());
        Ok(())
    }
}

fn single_line(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\n', '\r'], " ")
}
