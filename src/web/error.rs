use crate::error::FillError;
use crate::service::unavailable_message;
use crate::store::DocumentId;
use crate::web::pages;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Error type for all route handlers.
#[derive(Debug)]
pub enum WebError {
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            WebError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            WebError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        match pages::error_page(status, &message) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!("error page failed to render: {e}");
                (status, message).into_response()
            }
        }
    }
}

impl From<FillError> for WebError {
    fn from(e: FillError) -> Self {
        match e {
            FillError::UnknownDocument { .. } | FillError::TemplateNotFound { .. } => {
                WebError::NotFound(e.to_string())
            }
            FillError::FieldListMissing { ref id, .. } => match id.parse::<DocumentId>() {
                Ok(doc) => WebError::Unavailable(unavailable_message(doc)),
                Err(_) => WebError::Unavailable(format!(
                    "The service for '{id}' is not available at the moment."
                )),
            },
            other => WebError::Internal(other.user_message()),
        }
    }
}

impl From<tera::Error> for WebError {
    fn from(e: tera::Error) -> Self {
        WebError::Internal(format!("page rendering: {e}"))
    }
}
