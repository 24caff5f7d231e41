mod app;
mod auth;
mod config;
mod db;
mod error;
mod response;
mod state;

use crate::{app::build_app, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename("dev.env").ok();
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "authsvc=debug,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let db = db::connect(&config).await?;
    db::migrate(&db).await?;

    let addr = config.bind_addr();
    let app = build_app(AppState::init(&config, db));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("apiserver listening on {}", addr);
    app::serve(listener, app, app::shutdown_signal()).await
}
