use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use school_admin::{
    AppState, PermissionStore,
    auth::{AuthUser, Claims},
    config::{AppConfig, Env},
    permissions::{Role, RoleId, RoleObject, UserRecord},
    session::{InMemorySessionStore, SessionEntry, SessionError, SessionState, SessionStore},
};
use serde_json::json;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::SystemTime,
};
use uuid::Uuid;

// --- Failing Session Store ---

struct UnavailableSessionStore;

#[async_trait]
impl SessionStore for UnavailableSessionStore {
    async fn save_role(&self, _user_id: Uuid, _role: RoleId) -> Result<(), SessionError> {
        Err(SessionError::Unavailable("offline".to_string()))
    }
    async fn load_entry(&self, _user_id: Uuid) -> Result<Option<SessionEntry>, SessionError> {
        Err(SessionError::Unavailable("offline".to_string()))
    }
    async fn clear(&self, _user_id: Uuid) -> Result<bool, SessionError> {
        Err(SessionError::Unavailable("offline".to_string()))
    }
}

// --- Counting Session Store ---

#[derive(Default)]
struct CountingSessionStore {
    inner: InMemorySessionStore,
    saves: AtomicUsize,
}

#[async_trait]
impl SessionStore for CountingSessionStore {
    async fn save_role(&self, user_id: Uuid, role: RoleId) -> Result<(), SessionError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_role(user_id, role).await
    }
    async fn load_entry(&self, user_id: Uuid) -> Result<Option<SessionEntry>, SessionError> {
        self.inner.load_entry(user_id).await
    }
    async fn clear(&self, user_id: Uuid) -> Result<bool, SessionError> {
        self.inner.clear(user_id).await
    }
}

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn create_token(user_id: Uuid, profile: UserRecord, exp_offset: u64) -> String {
    let now = now_secs();

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
        profile,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn profile_with_role_object(name: &str) -> UserRecord {
    UserRecord {
        roles: vec![RoleObject {
            name: Some(name.to_string()),
        }],
        ..UserRecord::default()
    }
}

fn create_app_state(env: Env, sessions: SessionState) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState {
        sessions,
        permissions: Arc::new(PermissionStore::builtin()),
        config,
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

fn with_header(parts: &mut Parts, name: &'static str, value: &str) {
    parts.headers.insert(
        header::HeaderName::from_static(name),
        header::HeaderValue::from_str(value).unwrap(),
    );
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let app_state = create_app_state(Env::Production, sessions.clone());
    let token = create_token(TEST_USER_ID, profile_with_role_object("Docente Titular"), 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.role, Some(RoleId::from(Role::Docente)));
    // The resolved role is remembered for later requests.
    assert_eq!(
        sessions.load_role(TEST_USER_ID).await.unwrap(),
        Some(RoleId::from(Role::Docente))
    );
}

#[tokio::test]
async fn test_jwt_generic_role_field() {
    let app_state = create_app_state(Env::Production, Arc::new(InMemorySessionStore::new()));
    let profile = UserRecord {
        role: Some("Coordinador".to_string()),
        ..UserRecord::default()
    };
    let token = create_token(TEST_USER_ID, profile, 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.role, Some(RoleId::new("coordinador")));
}

#[tokio::test]
async fn test_jwt_without_role_falls_back_to_session() {
    let sessions = Arc::new(InMemorySessionStore::new());
    sessions
        .save_role(TEST_USER_ID, RoleId::from(Role::Tutor))
        .await
        .unwrap();
    let app_state = create_app_state(Env::Production, sessions);
    let token = create_token(TEST_USER_ID, UserRecord::default(), 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.role, Some(RoleId::from(Role::Tutor)));
}

#[tokio::test]
async fn test_jwt_without_any_role_is_authenticated_but_roleless() {
    let app_state = create_app_state(Env::Production, Arc::new(InMemorySessionStore::new()));
    let token = create_token(TEST_USER_ID, UserRecord::default(), 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.role, None);
    assert_eq!(user.role_key(), "");
}

#[tokio::test]
async fn test_session_store_failure_does_not_fail_auth() {
    let app_state = create_app_state(Env::Production, Arc::new(UnavailableSessionStore));
    let token = create_token(TEST_USER_ID, profile_with_role_object("Directora"), 3600);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.role, Some(RoleId::from(Role::Director)));
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production, Arc::new(InMemorySessionStore::new()));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let app_state = create_app_state(Env::Production, Arc::new(InMemorySessionStore::new()));
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = Claims {
        sub: TEST_USER_ID,
        iat: now as usize,
        exp: (now + 3600) as usize,
        profile: profile_with_role_object("Administrador"),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_with_role_header() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let app_state = create_app_state(Env::Local, sessions.clone());
    let user_id = Uuid::new_v4();

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_header(&mut parts, "x-user-id", &user_id.to_string());
    with_header(&mut parts, "x-user-role", "ADMIN");

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, user_id);
    assert_eq!(user.role, Some(RoleId::from(Role::Admin)));
    assert_eq!(
        sessions.load_role(user_id).await.unwrap(),
        Some(RoleId::from(Role::Admin))
    );
}

#[tokio::test]
async fn test_local_bypass_with_cached_role() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let user_id = Uuid::new_v4();
    sessions
        .save_role(user_id, RoleId::from(Role::Auxiliar))
        .await
        .unwrap();
    let app_state = create_app_state(Env::Local, sessions);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_header(&mut parts, "x-user-id", &user_id.to_string());

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.role, Some(RoleId::from(Role::Auxiliar)));
}

#[tokio::test]
async fn test_local_bypass_unknown_user_requires_token() {
    let app_state = create_app_state(Env::Local, Arc::new(InMemorySessionStore::new()));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_header(&mut parts, "x-user-id", &Uuid::new_v4().to_string());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let app_state = create_app_state(Env::Production, Arc::new(InMemorySessionStore::new()));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_header(&mut parts, "x-user-id", &Uuid::new_v4().to_string());
    with_header(&mut parts, "x-user-role", "admin");

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_jwt_with_null_and_scalar_role_fields() {
    let app_state = create_app_state(Env::Production, Arc::new(InMemorySessionStore::new()));
    let now = now_secs();
    // Signed payloads the provider may emit with loosely typed role fields.
    let payload = json!({
        "sub": TEST_USER_ID,
        "iat": now,
        "exp": now + 3600,
        "roles": null,
        "rol_nombre": 7,
        "rol": "Docente",
    });
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    let token = encode(&Header::default(), &payload, &key).unwrap();

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    // "7" outranks the generic field and passes through.
    assert_eq!(user.role, Some(RoleId::new("7")));

    let payload = json!({
        "sub": TEST_USER_ID,
        "iat": now,
        "exp": now + 3600,
        "roles": ["Docente"],
    });
    let token = encode(&Header::default(), &payload, &key).unwrap();

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.role, Some(RoleId::new("7")), "falls back to the cached role");
}

#[tokio::test]
async fn test_unchanged_role_is_saved_once() {
    let sessions = Arc::new(CountingSessionStore::default());
    let app_state = create_app_state(Env::Production, sessions.clone());
    let token = create_token(TEST_USER_ID, profile_with_role_object("Docente"), 3600);

    for _ in 0..3 {
        let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
        with_bearer(&mut parts, &token);
        AuthUser::from_request_parts(&mut parts, &app_state)
            .await
            .unwrap();
    }
    assert_eq!(sessions.saves.load(Ordering::SeqCst), 1);

    // A different role is saved again.
    let token = create_token(TEST_USER_ID, profile_with_role_object("Director"), 3600);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);
    AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(sessions.saves.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_resolved_user_in_extensions_is_reused() {
    let sessions = Arc::new(CountingSessionStore::default());
    let app_state = create_app_state(Env::Production, sessions.clone());
    let resolved = AuthUser {
        id: TEST_USER_ID,
        role: Some(RoleId::from(Role::Alumno)),
    };

    // No credentials at all: only the extension identifies the caller.
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.extensions.insert(resolved.clone());

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user, resolved);
    assert_eq!(sessions.saves.load(Ordering::SeqCst), 0);
}
