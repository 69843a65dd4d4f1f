//! HTML pages, rendered with Tera.
//!
//! Templates are compiled into the binary. Names end in `.html`, so Tera
//! autoescapes every interpolated value (labels and answers come from the
//! model and the user).

use crate::pipeline::answers::form_key;
use crate::service::{FormState, Submission};
use crate::store::DocumentId;
use axum::http::StatusCode;
use once_cell::sync::Lazy;
use serde::Serialize;
use tera::{Context, Tera};

const BASE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{% block title %}Legal Document Filling Service{% endblock title %}</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
label { display: block; margin-top: 0.8rem; }
input[type=text] { width: 100%; padding: 0.3rem; }
button { margin-top: 1rem; }
.success { color: #155724; background: #d4edda; padding: 0.6rem; }
.warning { color: #856404; background: #fff3cd; padding: 0.6rem; }
.error { color: #721c24; background: #f8d7da; padding: 0.6rem; }
</style>
</head>
<body>
<h1>Legal Document Filling Service</h1>
{% block content %}{% endblock content %}
</body>
</html>
"#;

const SELECTOR: &str = r#"<form method="get" action="/documents">
<label for="doc">Select a Document</label>
<select id="doc" name="doc">
{% for doc in documents %}<option value="{{ doc.id }}"{% if doc.id == selected %} selected{% endif %}>{{ doc.title }}</option>
{% endfor %}</select>
<button type="submit">Open</button>
</form>
"#;

const INDEX: &str = r#"{% extends "base.html" %}
{% block content %}{% include "selector.html" %}{% endblock content %}
"#;

const FORM: &str = r#"{% extends "base.html" %}
{% block title %}{{ title }}{% endblock title %}
{% block content %}{% include "selector.html" %}
{% if available %}
<p>Please fill the required information for the document: {{ title }}</p>
<form method="post" action="/documents/{{ id }}">
{% for field in fields %}<label for="{{ field.key }}">{{ field.label }}</label>
<input type="text" id="{{ field.key }}" name="{{ field.key }}">
{% endfor %}<button type="submit">Submit Information</button>
</form>
{% else %}
<p class="warning">{{ unavailable }}</p>
{% endif %}
{% endblock content %}
"#;

const RESULT: &str = r#"{% extends "base.html" %}
{% block title %}{{ title }}{% endblock title %}
{% block content %}{% include "selector.html" %}
{% if succeeded %}
<p class="success">{{ message }}</p>
<p><a href="/documents/{{ id }}/pdf">Download PDF</a></p>
{% else %}
<p class="error">{{ message }}</p>
{% endif %}
<p><a href="/documents/{{ id }}">Back to the form</a></p>
{% endblock content %}
"#;

const ERROR: &str = r#"{% extends "base.html" %}
{% block title %}{{ status }}{% endblock title %}
{% block content %}
<p class="error">{{ message }}</p>
<p><a href="/">Back to the document list</a></p>
{% endblock content %}
"#;

static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", BASE),
        ("selector.html", SELECTOR),
        ("index.html", INDEX),
        ("form.html", FORM),
        ("result.html", RESULT),
        ("error.html", ERROR),
    ])
    .unwrap();
    tera
});

#[derive(Serialize)]
struct DocumentOption {
    id: &'static str,
    title: String,
}

#[derive(Serialize)]
struct FieldInput<'a> {
    key: String,
    label: &'a str,
}

fn base_context(selected: Option<DocumentId>) -> Context {
    let documents: Vec<DocumentOption> = DocumentId::ALL
        .iter()
        .map(|id| DocumentOption {
            id: id.as_str(),
            title: id.title(),
        })
        .collect();
    let mut ctx = Context::new();
    ctx.insert("documents", &documents);
    ctx.insert("selected", selected.map(|id| id.as_str()).unwrap_or(""));
    ctx
}

/// Landing page: the document dropdown.
pub fn index_page() -> Result<String, tera::Error> {
    TEMPLATES.render("index.html", &base_context(None))
}

/// One text input per field, or the "not available" warning.
pub fn form_page(state: &FormState) -> Result<String, tera::Error> {
    let fields: Vec<FieldInput> = state
        .fields
        .iter()
        .flat_map(|f| f.iter())
        .enumerate()
        .map(|(idx, label)| FieldInput {
            key: form_key(idx),
            label,
        })
        .collect();

    let mut ctx = base_context(Some(state.id));
    ctx.insert("id", state.id.as_str());
    ctx.insert("title", &state.id.title());
    ctx.insert("available", &state.is_available());
    ctx.insert("fields", &fields);
    ctx.insert("unavailable", &state.unavailable_message());
    TEMPLATES.render("form.html", &ctx)
}

/// Success or error banner for a submission.
pub fn result_page(submission: &Submission) -> Result<String, tera::Error> {
    let mut ctx = base_context(Some(submission.id));
    ctx.insert("id", submission.id.as_str());
    ctx.insert("title", &submission.id.title());
    ctx.insert("succeeded", &submission.succeeded());
    ctx.insert("message", &submission.message());
    TEMPLATES.render("result.html", &ctx)
}

pub fn error_page(status: StatusCode, message: &str) -> Result<String, tera::Error> {
    let mut ctx = Context::new();
    ctx.insert("status", &status.to_string());
    ctx.insert("message", message);
    TEMPLATES.render("error.html", &ctx)
}
