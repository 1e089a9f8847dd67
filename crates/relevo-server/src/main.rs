use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use relevo_api::middleware::require_auth;
use relevo_api::{AppState, AppStateInner, admin, attendance, auth, conversations, messages, tasks, users};
use relevo_core::{Core, CoreConfig, SystemClock};
use relevo_db::Database;
use relevo_store::{BlobStore, MediaPolicy};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Requests carry base64 media inline; 10 MiB of video grows past 13 MiB on
/// the wire, so leave generous headroom.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relevo=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("RELEVO_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: RELEVO_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("RELEVO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RELEVO_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("RELEVO_DB_PATH")
        .unwrap_or_else(|_| "relevo.db".into())
        .into();
    let storage_dir: PathBuf = std::env::var("RELEVO_STORAGE_DIR")
        .unwrap_or_else(|_| "./blob-storage".into())
        .into();
    let public_base = std::env::var("RELEVO_PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{}/files", port));
    let config = CoreConfig {
        chat_retention_days: env_i64("RELEVO_CHAT_RETENTION_DAYS", 2),
        attendance_retention_days: env_i64("RELEVO_ATTENDANCE_RETENTION_DAYS", 7),
    };
    let sweep_interval_secs: u64 = std::env::var("RELEVO_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(86_400); // daily

    // Init database, blob store and the service core
    let db = Arc::new(Database::open(&db_path)?);
    let store = Arc::new(BlobStore::new(storage_dir.clone(), public_base)?);
    let core = Core::new(
        db.clone(),
        store,
        MediaPolicy::default(),
        config.clone(),
        Arc::new(SystemClock),
    );

    bootstrap_admin(&db)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        core,
        jwt_secret,
    });

    // Daily retention sweep
    tokio::spawn(run_sweep_loop(state.clone(), sweep_interval_secs));

    // Routes
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{user_id}", delete(users::delete_user))
        .route(
            "/conversations",
            get(conversations::list_for_admin).post(conversations::resolve),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/conversations/{conversation_id}/read",
            post(conversations::mark_read),
        )
        .route("/attendance/time", post(attendance::record_time))
        .route("/attendance/completions", post(attendance::record_completion))
        .route("/tasks", post(tasks::create_task))
        .route("/tasks/{task_id}", put(tasks::update_task).delete(tasks::delete_task))
        .route("/tasks/{task_id}/evidence", post(tasks::upload_evidence))
        .route("/admin/cleanup", post(admin::run_cleanup))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/files", ServeDir::new(&storage_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Relevo server listening on {}", addr);
    info!(
        "Retention: chat {} days, records {} days, sweep every {}s",
        config.chat_retention_days, config.attendance_retention_days, sweep_interval_secs
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// First-run convenience: without any admin account nobody can log in, so
/// create one from RELEVO_ADMIN_PASSWORD when the users table has none.
fn bootstrap_admin(db: &Database) -> anyhow::Result<()> {
    if db.has_admin()? {
        return Ok(());
    }
    let Ok(password) = std::env::var("RELEVO_ADMIN_PASSWORD") else {
        warn!("No admin user exists and RELEVO_ADMIN_PASSWORD is unset; logins will fail");
        return Ok(());
    };
    let hash = relevo_api::auth::hash_password(&password)?;
    db.create_user(
        &uuid::Uuid::new_v4().to_string(),
        "Administrador",
        "admin",
        &hash,
        "admin",
        &relevo_db::fmt_ts(chrono::Utc::now()),
    )?;
    info!("Bootstrapped initial admin user 'admin'");
    Ok(())
}

/// Scheduled retention sweep. A failed run logs and waits for the next
/// tick; the sweep is idempotent, so a crash mid-run just means the next
/// run finishes the job.
async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let st = state.clone();
        let outcome =
            tokio::task::spawn_blocking(move || st.core.run_retention_sweep(chrono::Utc::now()))
                .await;
        match outcome {
            Ok(Ok(report)) => {
                if report.deleted_messages > 0
                    || report.deleted_blobs > 0
                    || report.deleted_time_records > 0
                    || report.deleted_task_completions > 0
                {
                    info!(
                        "Sweep removed {} messages, {} blobs, {} time records, {} completions",
                        report.deleted_messages,
                        report.deleted_blobs,
                        report.deleted_time_records,
                        report.deleted_task_completions,
                    );
                }
            }
            Ok(Err(e)) => warn!("Retention sweep aborted: {:#}", anyhow::Error::new(e)),
            Err(e) => warn!("Retention sweep task failed: {}", e),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
