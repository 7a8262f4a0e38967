// src/server/http.rs

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::Stream;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::server::livereload::{
    CLIENT_JS, EVENTS_PATH, LiveReload, ReloadKind, SCRIPT_PATH, inject_script,
};

/// How long `stop` waits for open connections (event streams never finish
/// on their own) before aborting the server task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Largest HTML body the injection middleware will buffer.
const MAX_HTML_BODY: usize = 16 * 1024 * 1024;

/// Static files from `root`, the live-reload endpoints, and script
/// injection into HTML responses.
pub fn router(root: impl Into<PathBuf>, reload: LiveReload) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(reload_events))
        .route(SCRIPT_PATH, get(client_script))
        .fallback_service(ServeDir::new(root.into()))
        .layer(middleware::from_fn(inject_into_html))
        .with_state(reload)
}

async fn reload_events(
    State(reload): State<LiveReload>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(clients = reload.clients() + 1, "live-reload client connected");
    let stream = BroadcastStream::new(reload.subscribe()).map(|msg| {
        // A lagging client missed something; a full reload covers it.
        let kind = msg.unwrap_or(ReloadKind::Full);
        Ok(Event::default().event("reload").data(kind.as_str()))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CLIENT_JS)
}

/// Only complete `200 OK` UTF-8 HTML bodies are rewritten; partial and
/// not-modified responses pass through untouched.
async fn inject_into_html(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_HTML_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer html response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let html = match std::str::from_utf8(&bytes) {
        Ok(html) => inject_script(html),
        Err(_) => {
            debug!("html response is not UTF-8; serving it without the reload client");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Entry point for starting the server.
#[derive(Debug)]
pub struct DevServer;

impl DevServer {
    /// Bind `host:port` (port 0 picks a free one) and serve in the background.
    pub async fn start(
        host: &str,
        port: u16,
        root: impl Into<PathBuf>,
        reload: LiveReload,
    ) -> Result<DevServerHandle> {
        let root = root.into();
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("binding dev server to {host}:{port}"))?;
        let local_addr = listener.local_addr()?;

        let app = router(root.clone(), reload);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        info!(addr = %local_addr, root = ?root, "dev server listening on http://{local_addr}");
        Ok(DevServerHandle {
            local_addr,
            stop_tx: Some(stop_tx),
            task,
        })
    }
}

/// Owned handle to a running dev server.
#[derive(Debug)]
pub struct DevServerHandle {
    local_addr: SocketAddr,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl DevServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the server task to end.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut self.task).await {
            Ok(joined) => {
                joined
                    .map_err(|e| anyhow!("dev server task failed: {e}"))?
                    .context("dev server stopped with an error")?;
            }
            Err(_) => {
                debug!("open connections after grace period; aborting dev server");
                self.task.abort();
            }
        }
        info!(addr = %self.local_addr, "dev server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::livereload::{ReloadTrigger, SCRIPT_TAG};
    use crate::types::AssetClass;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn html_gets_the_client_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><body>hi</body></html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "let a;").unwrap();

        let app = router(dir.path(), LiveReload::new());

        let page = app.clone().oneshot(get_request("/")).await.unwrap();
        assert_eq!(page.status(), StatusCode::OK);
        assert_eq!(
            body_text(page).await,
            format!("<html><body>hi{SCRIPT_TAG}</body></html>")
        );

        let js = app.clone().oneshot(get_request("/app.js")).await.unwrap();
        assert_eq!(body_text(js).await, "let a;");

        let missing = app.oneshot(get_request("/nope.html")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn partial_and_non_utf8_pages_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><body>hi</body></html>").unwrap();
        let latin1 = b"<html><body>caf\xe9</body></html>".to_vec();
        std::fs::write(dir.path().join("latin1.html"), &latin1).unwrap();
        let app = router(dir.path(), LiveReload::new());

        let ranged = Request::builder()
            .uri("/index.html")
            .header(header::RANGE, "bytes=0-5")
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(ranged).await.unwrap();
        assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_text(res).await, "<html>");

        let res = app.oneshot(get_request("/latin1.html")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.to_vec(), latin1);
    }

    #[tokio::test]
    async fn serves_the_client() {
        let dir = tempfile::tempdir().unwrap();
        let res = router(dir.path(), LiveReload::new())
            .oneshot(get_request(SCRIPT_PATH))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_text(res).await.contains("EventSource"));
    }

    #[tokio::test]
    async fn event_stream_carries_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let live = LiveReload::new();
        let res = router(dir.path(), live.clone())
            .oneshot(get_request(EVENTS_PATH))
            .await
            .unwrap();
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );

        live.reload(AssetClass::Style);
        let mut stream = res.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert!(text.contains("event: reload"), "{text}");
        assert!(text.contains("data: css"), "{text}");
    }

    #[tokio::test]
    async fn start_and_stop_over_tcp() {
        let dir = tempfile::tempdir().unwrap();
        let handle = DevServer::start("127.0.0.1", 0, dir.path(), LiveReload::new())
            .await
            .unwrap();
        let addr = handle.local_addr();
        assert_ne!(addr.port(), 0);

        let mut conn = tokio::net::TcpStream::connect(addr).await.unwrap();
        conn.write_all(b"GET /__livereload.js HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        conn.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200"));
        assert!(raw.contains("EventSource"));

        handle.stop().await.unwrap();
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }
}
