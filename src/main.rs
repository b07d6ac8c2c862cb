use school_admin::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    permissions::{PermissionState, PermissionStore},
    session::{FileSessionStore, InMemorySessionStore, SessionState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise crate-level debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "school_admin=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Permission table: file override or the built-in table.
    let permissions = match &config.permissions_file {
        Some(path) => PermissionStore::from_file(path)
            .expect("FATAL: PERMISSIONS_FILE could not be loaded as a complete permission table."),
        None => PermissionStore::builtin(),
    };
    let permissions = Arc::new(permissions) as PermissionState;

    // 4. Session store: file-backed when configured, in-memory otherwise.
    let sessions = match &config.session_file {
        Some(path) => Arc::new(
            FileSessionStore::open(path)
                .await
                .expect("FATAL: SESSION_FILE could not be opened."),
        ) as SessionState,
        None => Arc::new(InMemorySessionStore::new()) as SessionState,
    };

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        sessions,
        permissions,
        config,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
