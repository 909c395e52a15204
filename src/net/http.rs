use axum::{
    Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use futures::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::EngineHandle;
use crate::error::{AppResult, InfraError};
use crate::models::types::ConnectionId;
use crate::net::output::init_output_for_websocket;
use crate::net::protocol::ClientEvent;

/// Landing page of the browser client, served at `/`.
const HOME_PAGE: &str = "home.html";

#[derive(Clone)]
struct HttpAppCtx {
    engine: EngineHandle,
    outbound_buffer: usize,
}

/// `/ws` for clients, plus the browser client's files when a static dir is configured.
pub fn router(engine: EngineHandle, cfg: &Config) -> Router {
    let mut app = Router::new().route("/ws", get(ws_upgrade)).with_state(HttpAppCtx {
        engine,
        outbound_buffer: cfg.outbound_buffer,
    });

    if let Some(dir) = &cfg.static_dir {
        info!(dir = %dir.display(), "serving static files");
        app = app
            .route_service("/", ServeFile::new(dir.join(HOME_PAGE)))
            .fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

/// Run the HTTP server with WebSocket endpoint
pub async fn serve(addr: std::net::SocketAddr, engine: EngineHandle, cfg: &Config) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(InfraError::from)?;
    serve_listener(listener, engine, cfg).await
}

pub async fn serve_listener(listener: tokio::net::TcpListener, engine: EngineHandle, cfg: &Config) -> AppResult<()> {
    let app = router(engine, cfg);
    axum::serve(listener, app).await.map_err(InfraError::from)?;
    Ok(())
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<HttpAppCtx>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler(socket, state.engine.clone(), state.outbound_buffer))
}

async fn ws_handler(socket: WebSocket, engine: EngineHandle, outbound_buffer: usize) {
    let conn = ConnectionId::new();
    let (ws_write, mut ws_read) = socket.split();

    let output = init_output_for_websocket(conn, outbound_buffer, ws_write);
    if engine.connect(output).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = ws_read.next().await {
        let parsed = match msg {
            Message::Text(t) => serde_json::from_str::<ClientEvent>(t.as_str()),
            Message::Binary(b) => serde_json::from_slice::<ClientEvent>(&b),
            Message::Ping(_) => {
                // Axum already handles Pong responses automatically
                continue;
            }
            Message::Pong(_) => continue,
            Message::Close(_) => break,
        };

        match parsed {
            Ok(event) => {
                if engine.submit(conn, event).await.is_err() {
                    break;
                }
            }
            Err(e) => debug!(conn = %conn, error = %e, "malformed client event"),
        }
    }

    _ = engine.disconnect(conn).await;
}
