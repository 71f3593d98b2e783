// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The admin HTTP surface: `POST /reload` and `GET /status`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use radv::shutdown::cancelled;
use radv::{Config, Daemon, ReloadError, Status};
use serde::Serialize;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Deadline for one reload request; expiry surfaces as 408.
const RELOAD_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct AppState {
    daemon: Arc<Daemon>,
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

fn error_response(code: StatusCode, kind: &'static str, message: String) -> Response {
    (code, Json(ErrorBody { kind, message })).into_response()
}

pub fn router(daemon: Arc<Daemon>) -> Router {
    Router::new()
        .route("/reload", post(reload))
        .route("/status", get(status))
        .with_state(AppState { daemon })
}

/// Serve the admin API until shutdown fires.
pub async fn serve(
    listen: SocketAddr,
    daemon: Arc<Daemon>,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(%listen, "admin API listening");
    axum::serve(listener, router(daemon))
        .with_graceful_shutdown(async move { cancelled(&mut shutdown).await })
        .await
}

async fn reload(State(state): State<AppState>, body: String) -> Response {
    let config = match Config::from_json_str(&body) {
        Ok(config) => config,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, "JSONSyntaxError", e.to_string());
        }
    };

    // The never-firing cancel leaves cancellation to the deadline.
    let (_hold, mut cancel) = watch::channel(false);
    match tokio::time::timeout(RELOAD_DEADLINE, state.daemon.reload(&config, &mut cancel)).await {
        Ok(Ok(())) => StatusCode::OK.into_response(),
        Ok(Err(ReloadError::Validation(errors))) => error_response(
            StatusCode::BAD_REQUEST,
            "ValidationError",
            errors.to_string(),
        ),
        Ok(Err(ReloadError::Cancelled)) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalServerError",
            "the daemon is not accepting reloads".to_string(),
        ),
        Err(_elapsed) => error_response(
            StatusCode::REQUEST_TIMEOUT,
            "RequestTimeout",
            format!("reload not accepted within {RELOAD_DEADLINE:?}"),
        ),
    }
}

async fn status(State(state): State<AppState>) -> Json<Status> {
    Json(state.daemon.status().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_api() -> (SocketAddr, watch::Sender<bool>) {
        let daemon = Arc::new(Daemon::new(&Config::default()).unwrap());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            axum::serve(listener, router(daemon))
                .with_graceful_shutdown(async move { cancelled(&mut shutdown_rx).await })
                .await
                .unwrap();
        });
        (addr, shutdown_tx)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_returns_sorted_interfaces() {
        let (addr, _shutdown) = spawn_api().await;
        let body: serde_json::Value = reqwest::Client::new()
            .get(format!("http://{addr}/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({ "interfaces": [] }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reload_rejects_bad_json_and_bad_configs() {
        let (addr, _shutdown) = spawn_api().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{addr}/reload"))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "JSONSyntaxError");

        let response = client
            .post(format!("http://{addr}/reload"))
            .body(r#"{"interfaces":[{"name":"x","raIntervalMilliseconds":69}]}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "ValidationError");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("RAIntervalMilliseconds")
        );
    }
}
