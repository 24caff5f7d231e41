use std::{future::IntoFuture, time::Duration};

use axum::{routing::get, Router};
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth;
use crate::state::AppState;

/// How long in-flight requests may run after a shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/ping", get(ping))
        .merge(auth::router())
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn welcome() -> &'static str {
    "Welcome to the auth api server"
}

async fn ping() -> &'static str {
    "pong"
}

/// Serves until `shutdown` resolves, then drains for at most [`SHUTDOWN_GRACE`].
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(());
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop_rx.changed().await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => return Ok(res?),
        _ = shutdown => {
            info!("shutdown signal received, draining in-flight requests");
            let _ = stop_tx.send(());
        }
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(res) => res?,
        Err(_) => warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "grace period elapsed, closing with requests still in flight"
        ),
    }
    info!("server stopped");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
