use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// The endpoints the SPA calls on every screen: the session profile, the menu, and
/// the three authorization queries backing action buttons, the route guard and the
/// menu renderer.
///
/// Every handler receives a validated `AuthUser`; the router layer above this module
/// rejects unauthenticated requests before they get here.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Resolved role, allowed routes and visible menu for the caller.
        .route("/me", get(handlers::get_me))
        // GET /me/menu
        // Just the visible menu entries, in display order.
        .route("/me/menu", get(handlers::get_my_menu))
        // POST /authorize/resource
        // Action-button gating: may the caller perform `action` on `resource`?
        .route("/authorize/resource", post(handlers::authorize_resource))
        // POST /authorize/route
        // Route guard: allow, or where to redirect.
        .route("/authorize/route", post(handlers::authorize_route))
        // POST /authorize/menu
        // Visibility of a single menu entry.
        .route("/authorize/menu", post(handlers::authorize_menu))
        // POST /session/logout
        // Drops the cached role for the caller.
        .route("/session/logout", post(handlers::logout))
}
