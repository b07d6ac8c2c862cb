use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints. None of them consult a caller's role.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /roles/infer
        // Resolves a user record's role label without touching any session.
        .route("/roles/infer", post(handlers::resolve_role))
}
