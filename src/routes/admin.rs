use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Reading and replacing the permission table. Mounted under `/admin`.
///
/// Access Control:
/// Each handler extracts `AuthUser` (401 without a session) and then checks the
/// caller's grants on the `roles` resource in the table currently in force (403 when
/// missing). There is no hard-coded role name anywhere in this path.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/permissions   -> requires `list` on `roles`
        // PUT /admin/permissions   -> requires `edit` on `roles`; whole-table replacement
        .route(
            "/permissions",
            get(handlers::get_permission_table).put(handlers::replace_permission_table),
        )
        // GET /admin/permissions/{role} -> requires `show` on `roles`
        .route("/permissions/{role}", get(handlers::get_role_grants))
}
