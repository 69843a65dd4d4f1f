//! Web form over the fill service (axum).
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/` | document dropdown |
//! | GET | `/health` | `ok` |
//! | GET | `/documents?doc={id}` | redirect to the form |
//! | GET | `/documents/{id}` | extract fields, show the form |
//! | POST | `/documents/{id}` | save answers, fill, render |
//! | GET | `/documents/{id}/pdf` | last rendered PDF |

pub mod error;
pub mod pages;
pub mod routes;

use crate::service::FillService;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FillService>,
}

pub fn router(service: Arc<FillService>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/documents", get(routes::select))
        .route(
            "/documents/{id}",
            get(routes::show_form).post(routes::submit_form),
        )
        .route("/documents/{id}/pdf", get(routes::download_pdf))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Serve the form on `addr` until Ctrl-C.
pub async fn serve(service: Arc<FillService>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
