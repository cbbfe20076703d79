use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use caption_core::QueueState;
use caption_engine::{
    BroadcastHub, ChatCompletionsGenerator, ControllerHandle, FsImageSource, QueueController,
};
use caption_logging::{caption_info, caption_warn};

use crate::cli::Cli;
use crate::session;

const EMBEDDED_INDEX: &str = include_str!("../assets/index.html");

/// Viewer page source.
#[derive(Debug, Clone)]
pub enum IndexPage {
    Embedded,
    /// Read on every request so edits show up on reload.
    File(PathBuf),
}

#[derive(Clone)]
pub struct AppState {
    pub controller: ControllerHandle,
    pub hub: Arc<BroadcastHub>,
    pub page: Arc<IndexPage>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(websocket))
        .fallback(not_found)
        .with_state(state)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.model_settings()?;
    caption_info!(
        "Captioning {} images with {} at {}",
        cli.images.len(),
        settings.model,
        settings.base_url
    );
    let generator = ChatCompletionsGenerator::new(settings).context("building model client")?;

    let hub = Arc::new(BroadcastHub::new());
    let (controller, handle) = QueueController::new(
        QueueState::new(cli.images.iter().cloned()),
        Arc::clone(&hub),
        Arc::new(generator),
        Arc::new(FsImageSource),
    );
    controller.spawn();
    if cli.start_immediately {
        handle.start();
    }

    let page = match cli.index_html {
        Some(path) => IndexPage::File(path),
        None => IndexPage::Embedded,
    };
    let app = router(AppState {
        controller: handle,
        hub,
        page: Arc::new(page),
    });

    let addr = SocketAddr::new(cli.bind, cli.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    caption_info!("HTTP server running on http://{}", addr);
    caption_info!("Open your browser to view the interface");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving viewer")?;
    caption_info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        caption_warn!("Could not listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
}

async fn index(State(state): State<AppState>) -> Response {
    match state.page.as_ref() {
        IndexPage::Embedded => Html(EMBEDDED_INDEX).into_response(),
        IndexPage::File(path) => match tokio::fs::read_to_string(path).await {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                caption_warn!("Could not read {:?}: {}", path, err);
                (StatusCode::NOT_FOUND, "index.html not found").into_response()
            }
        },
    }
}

async fn websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| session::run(socket, state))
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
