//! Development server over the generated pages, with live reload

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        Path as RoutePath, State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::commands::generate;
use crate::generator::RouteManifest;
use crate::helpers::post_href;
use crate::Blog;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state
struct ServerState {
    public_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Build the router serving `public_dir`
fn router(public_dir: PathBuf, live_reload: bool) -> (Router, broadcast::Sender<()>) {
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        public_dir,
        reload_tx: reload_tx.clone(),
        live_reload,
    });

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/posts/:slug", get(post_handler))
        .route("/posts/:slug/", get(post_handler))
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .with_state(state);

    (app, reload_tx)
}

/// Start the development server
pub async fn start(blog: &Blog, ip: &str, port: u16, watch: bool) -> Result<()> {
    let (app, reload_tx) = router(blog.public_dir.clone(), watch);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if watch {
        let blog = blog.clone();
        // The debouncer blocks on a std channel, keep it off the runtime workers
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(blog, reload_tx) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Watch the sources, regenerate, and tell connected pages to reload
fn watch_and_reload(blog: Blog, reload_tx: broadcast::Sender<()>) -> Result<()> {
    generate::watch_sources(&blog, || {
        // No connected clients is not an error
        let _ = reload_tx.send(());
    })
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

async fn index_handler(State(state): State<Arc<ServerState>>) -> Response {
    serve_page(&state, state.public_dir.join("index.html")).await
}

/// Serve a generated post page; slugs outside the route manifest are 404
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    RoutePath(slug): RoutePath<String>,
) -> Response {
    let public_dir = state.public_dir.clone();
    let manifest = match tokio::task::spawn_blocking(move || RouteManifest::load(&public_dir)).await
    {
        Ok(Ok(manifest)) => manifest,
        Ok(Err(e)) => {
            tracing::warn!("Route manifest unavailable: {}", e);
            return not_found(&state).await;
        }
        Err(e) => {
            tracing::error!("Route manifest task failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response();
        }
    };

    if !manifest.contains(&post_href(&slug)) {
        tracing::debug!("Unknown post: {}", slug);
        return not_found(&state).await;
    }

    let page = state
        .public_dir
        .join("posts")
        .join(&slug)
        .join("index.html");
    serve_page(&state, page).await
}

/// Serve static assets; everything else is 404
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.public_dir);
    match service.try_call(request).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => response.into_response(),
        Ok(_) => not_found(&state).await,
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

async fn serve_page(state: &ServerState, file_path: PathBuf) -> Response {
    match tokio::fs::read_to_string(&file_path).await {
        Ok(content) => Html(page_body(state, &content)).into_response(),
        Err(_) => not_found(state).await,
    }
}

async fn not_found(state: &ServerState) -> Response {
    let body = match tokio::fs::read_to_string(state.public_dir.join("404.html")).await {
        Ok(content) => page_body(state, &content),
        Err(_) => "Not found".to_string(),
    };
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

fn page_body(state: &ServerState, html: &str) -> String {
    if state.live_reload {
        inject_live_reload(html)
    } else {
        html.to_string()
    }
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}
