pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/ai", post(handlers::handle_generate))
        .route("/process", post(handlers::handle_process))
        .route("/update", post(handlers::handle_update))
        .route("/status", get(handlers::handle_status))
        .route("/events", get(handlers::handle_events))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Serve the API until `shutdown` fires.
pub async fn serve(
    state: ApiState,
    bind: &str,
    port: u16,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    tracing::info!(bind, port, "API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}
