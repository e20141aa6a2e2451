//! HTTP surface for the companion app.
//!
//! ## Endpoints
//!
//! - `GET /health`
//! - `/api/users` for registration and profile updates
//! - `/api/tasks` for task CRUD, lifecycle transitions, readiness,
//!   checklist items, photos and the two archives
//! - `GET /photos/<file>` serves uploaded photos when a photos directory is
//!   configured

mod checklist;
mod error;
mod extract;
mod photos;
mod tasks;
mod users;

pub use error::ApiError;
pub use extract::ApiJson;

use crate::config::ServerConfig;
use crate::model::Task;
use crate::status::{self, TaskStatus};
use crate::store::StoreHandle;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::Json;
use axum::routing::{get, post, put};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub store: StoreHandle,
}

/// A task as returned to clients: the stored record plus its resolved status.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub status: TaskStatus,
}

impl TaskView {
    pub fn new(task: Task, now: &DateTime<Tz>) -> Self {
        let status = status::resolve(&task, now);
        Self { task, status }
    }
}

/// Build the application router.
pub fn router(state: ApiState, max_body_bytes: usize, photos_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/{id}", get(users::get_one).put(users::update))
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/search", get(tasks::search))
        .route("/api/tasks/deleted", get(tasks::list_deleted))
        .route("/api/tasks/completed", get(tasks::list_completed))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_one).put(tasks::update).delete(tasks::delete),
        )
        .route("/api/tasks/{id}/complete", post(tasks::complete))
        .route("/api/tasks/{id}/restore", post(tasks::restore))
        .route(
            "/api/tasks/{id}/restore-completed",
            post(tasks::restore_completed),
        )
        .route("/api/tasks/{id}/ready", post(tasks::ready))
        .route("/api/tasks/{id}/not-going", post(tasks::not_going))
        .route("/api/tasks/{id}/checklist", post(checklist::add))
        .route(
            "/api/tasks/{id}/checklist/{item_id}",
            put(checklist::edit).delete(checklist::remove),
        )
        .route(
            "/api/tasks/{id}/checklist/{item_id}/toggle",
            post(checklist::toggle),
        )
        .route(
            "/api/tasks/{id}/photos",
            post(photos::upload).delete(photos::remove),
        );

    let app = match photos_dir {
        Some(dir) => api.nest_service("/photos", ServeDir::new(dir)),
        None => api,
    };

    app.layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Running HTTP server.
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ApiServer {
    /// Bind and start serving in a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(
        store: StoreHandle,
        config: &ServerConfig,
        photos_dir: Option<PathBuf>,
    ) -> crate::Result<Self> {
        let app = router(ApiState { store }, config.max_upload_bytes, photos_dir);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        let addr = listener.local_addr()?;
        info!("API server listening on http://{addr}");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = served.await {
                error!("API server error: {e}");
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            error!("API server task ended abnormally: {e}");
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.handle.abort();
        }
    }
}
