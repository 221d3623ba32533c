pub mod auth;
pub mod board;
pub mod home;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router. Every request passes through the session
/// middleware; unmatched paths fall back to the static directory.
pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.storage.static_path);
    let max_upload_bytes = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(home::index))
        .route("/create", get(home::create_page))
        .merge(auth::router())
        .merge(board::router(max_upload_bytes))
        .fallback_service(static_dir)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
