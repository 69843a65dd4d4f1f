use crate::store::DocumentId;
use crate::web::error::WebError;
use crate::web::pages;
use crate::web::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

fn parse_id(raw: &str) -> Result<DocumentId, WebError> {
    Ok(raw.parse::<DocumentId>()?)
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn index() -> Result<Html<String>, WebError> {
    Ok(Html(pages::index_page()?))
}

#[derive(Debug, Deserialize)]
pub struct SelectQuery {
    pub doc: String,
}

/// Target of the dropdown form.
pub async fn select(Query(query): Query<SelectQuery>) -> Result<Redirect, WebError> {
    let id = parse_id(&query.doc)?;
    Ok(Redirect::to(&format!("/documents/{id}")))
}

pub async fn show_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, WebError> {
    let id = parse_id(&id)?;
    let form = state.service.prepare_form(id).await?;
    Ok(Html(pages::form_page(&form)?))
}

pub async fn submit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let id = parse_id(&id)?;
    info!("Form submitted for {id} with {} value(s)", form.len());
    let submission = state.service.submit(id, &form).await?;

    let status = if submission.succeeded() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Html(pages::result_page(&submission)?)).into_response())
}

pub async fn download_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let id = parse_id(&id)?;
    let path = state
        .service
        .rendered_pdf(id)
        .await
        .ok_or_else(|| WebError::NotFound(format!("No filled PDF for '{}' yet.", id.title())))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| WebError::Internal(format!("reading {}: {e}", path.display())))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{id}.pdf\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
