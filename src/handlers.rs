use crate::{
    AppState,
    auth::AuthUser,
    models::{
        AuthorizationDecision, InferredRole, MenuQuery, ResourceQuery, RouteQuery, SessionProfile,
    },
    navigation::{self, MenuItem, RouteDecision},
    permissions::{Action, PermissionTable, Role, RoleGrants, UserRecord},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::collections::BTreeMap;

/// The resource whose grants govern the permission administration endpoints.
pub const ROLES_RESOURCE: &str = "roles";

/// require
///
/// Admin gate. Passes when `user`'s role holds `action` on `resource` in the current
/// table; rejects with 403 otherwise.
fn require(
    user: &AuthUser,
    table: &PermissionTable,
    resource: &str,
    action: Action,
) -> Result<(), StatusCode> {
    if table.resource_allowed(user.role_key(), resource, action) {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.id, role = user.role_key(), resource, %action, "forbidden");
        Err(StatusCode::FORBIDDEN)
    }
}

// --- Public ---

/// resolve_role
///
/// [Public Route] Runs role inference over a user record, reporting which label was
/// used and what it resolved to.
#[utoipa::path(
    post,
    path = "/roles/infer",
    request_body = UserRecord,
    responses((status = 200, description = "Inferred role", body = InferredRole))
)]
pub async fn resolve_role(Json(record): Json<UserRecord>) -> Json<InferredRole> {
    let role = record.infer_role();
    Json(InferredRole {
        raw_label: record.raw_role_label().map(str::to_string),
        canonical: role.as_ref().and_then(|role| role.canonical()),
        role,
    })
}

// --- Authenticated ---

/// get_me
///
/// [Authenticated Route] The caller's resolved role plus the routes and menu entries
/// it grants.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = SessionProfile))
)]
pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> Json<SessionProfile> {
    let table = state.permissions.snapshot();
    let routes = table
        .grants(user.role_key())
        .map(|grants| grants.routes.iter().cloned().collect())
        .unwrap_or_default();

    let role_resolved_at = match state.sessions.load_entry(user.id).await {
        Ok(entry) => entry.map(|entry| entry.resolved_at),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "failed to load session entry");
            None
        }
    };

    Json(SessionProfile {
        id: user.id,
        canonical: user.role.as_ref().and_then(|role| role.canonical()),
        role_resolved_at,
        menu: navigation::visible_menu(&table, user.role_key()),
        role: user.role,
        routes,
    })
}

/// get_my_menu
///
/// [Authenticated Route] The menu entries the caller may see, in display order.
#[utoipa::path(
    get,
    path = "/me/menu",
    responses((status = 200, description = "Visible menu", body = [MenuItem]))
)]
pub async fn get_my_menu(user: AuthUser, State(state): State<AppState>) -> Json<Vec<MenuItem>> {
    let table = state.permissions.snapshot();
    Json(navigation::visible_menu(&table, user.role_key()))
}

/// authorize_resource
///
/// [Authenticated Route] Whether the caller may perform an action on a resource.
/// Drives the SPA's action buttons.
#[utoipa::path(
    post,
    path = "/authorize/resource",
    request_body = ResourceQuery,
    responses((status = 200, description = "Decision", body = AuthorizationDecision))
)]
pub async fn authorize_resource(
    user: AuthUser,
    State(state): State<AppState>,
    Json(query): Json<ResourceQuery>,
) -> Json<AuthorizationDecision> {
    let allowed = state.permissions.snapshot().resource_action_allowed(
        user.role_key(),
        &query.resource,
        query.action.as_deref(),
    );
    tracing::debug!(
        user_id = %user.id,
        role = user.role_key(),
        resource = %query.resource,
        action = query.action.as_deref().unwrap_or("list"),
        allowed,
        "resource check"
    );
    Json(AuthorizationDecision { allowed })
}

/// authorize_route
///
/// [Authenticated Route] Route guard: allow, or the path to redirect to.
#[utoipa::path(
    post,
    path = "/authorize/route",
    request_body = RouteQuery,
    responses((status = 200, description = "Decision", body = RouteDecision))
)]
pub async fn authorize_route(
    user: AuthUser,
    State(state): State<AppState>,
    Json(query): Json<RouteQuery>,
) -> Json<RouteDecision> {
    let table = state.permissions.snapshot();
    let role = user.role.as_ref().map(|role| role.as_str());
    Json(navigation::guard_route(&table, role, &query.path))
}

/// authorize_menu
///
/// [Authenticated Route] Whether the caller may see a single menu entry.
#[utoipa::path(
    post,
    path = "/authorize/menu",
    request_body = MenuQuery,
    responses((status = 200, description = "Decision", body = AuthorizationDecision))
)]
pub async fn authorize_menu(
    user: AuthUser,
    State(state): State<AppState>,
    Json(query): Json<MenuQuery>,
) -> Json<AuthorizationDecision> {
    let allowed = state
        .permissions
        .snapshot()
        .menu_allowed(user.role_key(), &query.menu_id);
    Json(AuthorizationDecision { allowed })
}

/// logout
///
/// [Authenticated Route] Forgets the caller's cached role.
#[utoipa::path(
    post,
    path = "/session/logout",
    responses(
        (status = 204, description = "Session cleared"),
        (status = 500, description = "Session store failure")
    )
)]
pub async fn logout(user: AuthUser, State(state): State<AppState>) -> StatusCode {
    match state.sessions.clear(user.id).await {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "failed to clear session");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// --- Admin ---

/// get_permission_table
///
/// [Admin Route] The table currently in force. Requires `list` on `roles`.
#[utoipa::path(
    get,
    path = "/admin/permissions",
    responses(
        (status = 200, description = "Permission table", body = PermissionTable),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn get_permission_table(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PermissionTable>, StatusCode> {
    let table = state.permissions.snapshot();
    require(&user, &table, ROLES_RESOURCE, Action::List)?;
    Ok(Json(table.as_ref().clone()))
}

/// get_role_grants
///
/// [Admin Route] One role's entry. Requires `show` on `roles`; 404 for a role id with
/// no entry.
#[utoipa::path(
    get,
    path = "/admin/permissions/{role}",
    params(("role" = String, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role grants", body = RoleGrants),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No entry for role")
    )
)]
pub async fn get_role_grants(
    user: AuthUser,
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<RoleGrants>, StatusCode> {
    let table = state.permissions.snapshot();
    require(&user, &table, ROLES_RESOURCE, Action::Show)?;
    table
        .grants(&role)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// replace_permission_table
///
/// [Admin Route] Publishes a whole new table. Requires `edit` on `roles`, checked
/// against the table in force before the swap. The body must cover every canonical
/// role; an incomplete one is rejected with 422 and nothing changes.
#[utoipa::path(
    put,
    path = "/admin/permissions",
    request_body = PermissionTable,
    responses(
        (status = 200, description = "Table published", body = PermissionTable),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Incomplete table")
    )
)]
pub async fn replace_permission_table(
    user: AuthUser,
    State(state): State<AppState>,
    Json(roles): Json<BTreeMap<String, RoleGrants>>,
) -> Result<Json<PermissionTable>, StatusCode> {
    require(
        &user,
        &state.permissions.snapshot(),
        ROLES_RESOURCE,
        Action::Edit,
    )?;

    let roles = roles
        .into_iter()
        .map(|(role, grants)| role.parse::<Role>().map(|role| (role, grants)))
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map_err(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "rejected permission table");
            StatusCode::UNPROCESSABLE_ENTITY
        })?;

    let table = PermissionTable::new(roles).map_err(|e| {
        tracing::warn!(user_id = %user.id, error = %e, "rejected permission table");
        StatusCode::UNPROCESSABLE_ENTITY
    })?;

    state.permissions.replace(table.clone());
    tracing::info!(user_id = %user.id, "permission table replaced");
    Ok(Json(table))
}
