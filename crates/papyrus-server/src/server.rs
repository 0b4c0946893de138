//! HTTP Server - 路由与启动

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{chat, files, root_handler};
use crate::state::AppState;

/// multipart 边界与非文件字段的额外余量
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// 构建路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);
    let upload_limit = usize::try_from(upload_limit).unwrap_or(usize::MAX);

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/chat", post(chat::chat_handler))
        .route(
            "/upload",
            post(files::upload_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/files/:session_id",
            get(files::list_files_handler).delete(files::clear_files_handler),
        )
        .layer(TraceLayer::new_for_http());

    let router = if state.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// 启动 HTTP 服务，Ctrl-C 时优雅退出
pub async fn run_server(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
