use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization core: role inference, permission table, queries.
pub mod permissions;

// Service components around the core.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod navigation;
pub mod session;

pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use permissions::{PermissionState, PermissionStore};
pub use session::{FileSessionStore, InMemorySessionStore, SessionState};

/// ApiDoc
///
/// OpenAPI document for the authorization service, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::resolve_role, handlers::get_me, handlers::get_my_menu,
        handlers::authorize_resource, handlers::authorize_route, handlers::authorize_menu,
        handlers::logout, handlers::get_permission_table, handlers::get_role_grants,
        handlers::replace_permission_table
    ),
    components(
        schemas(
            models::ResourceQuery, models::RouteQuery, models::MenuQuery,
            models::AuthorizationDecision, models::InferredRole, models::SessionProfile,
            navigation::MenuItem, navigation::RouteDecision,
            permissions::Role, permissions::RoleId, permissions::Action,
            permissions::UserRecord, permissions::RoleObject,
            permissions::ResourcePermissions, permissions::RoleGrants,
            permissions::PermissionTable,
        )
    ),
    tags(
        (name = "school-admin", description = "School administration authorization API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cloneable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Where resolved roles are remembered between requests.
    pub sessions: SessionState,
    /// The permission table in force; replaceable as a whole.
    pub permissions: PermissionState,
    pub config: AppConfig,
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for PermissionState {
    fn from_ref(app_state: &AppState) -> PermissionState {
        app_state.permissions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` can be extracted, then stores the
/// identity in the request extensions so handlers reuse it instead of resolving it
/// a second time.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies middleware, and registers the state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers authenticate through their own `AuthUser` argument.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying method, URI and the `x-request-id` set by the layer above,
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
