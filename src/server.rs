use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running loopback file server and the URL the window should load.
pub struct ServerHandle {
    url: String,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Serves the prebuilt web bundle on 127.0.0.1 with an OS-assigned port.
/// The server is unreachable from outside the host.
pub async fn start(bundle_dir: PathBuf) -> Result<ServerHandle, String> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|err| format!("Failed to bind static server: {err}"))?;
    let port = listener
        .local_addr()
        .map_err(|err| format!("Failed to read server address: {err}"))?
        .port();
    let url = format!("http://127.0.0.1:{port}/");

    let app = Router::new()
        .fallback(serve_asset)
        .with_state(Arc::new(bundle_dir));
    let task = tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            tracing::error!(%error, "static server stopped");
        }
    });

    tracing::info!(%url, "static server running");
    Ok(ServerHandle { url, task })
}

async fn serve_asset(State(root): State<Arc<PathBuf>>, uri: Uri) -> Response {
    let relative = uri.path().trim_start_matches('/');
    let relative = if relative.is_empty() {
        "index.html"
    } else {
        relative
    };

    let Some(path) = resolve_asset_path(&root, relative) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type_for_path(&path))],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// Rejects any request that resolves outside the bundle directory.
fn resolve_asset_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let canonical_root = root.canonicalize().ok()?;
    let candidate = canonical_root.join(relative).canonicalize().ok()?;
    if !candidate.starts_with(&canonical_root) || !candidate.is_file() {
        return None;
    }
    Some(candidate)
}

fn content_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
    {
        Some(ext) if ext == "html" || ext == "htm" => "text/html; charset=utf-8",
        Some(ext) if ext == "css" => "text/css; charset=utf-8",
        Some(ext) if ext == "js" || ext == "mjs" => "text/javascript; charset=utf-8",
        Some(ext) if ext == "json" || ext == "map" => "application/json",
        Some(ext) if ext == "wasm" => "application/wasm",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "svg" => "image/svg+xml",
        Some(ext) if ext == "ico" => "image/x-icon",
        Some(ext) if ext == "woff" => "font/woff",
        Some(ext) if ext == "woff2" => "font/woff2",
        Some(ext) if ext == "txt" || ext == "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(port: u16, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    fn port_of(handle: &ServerHandle) -> u16 {
        handle
            .url()
            .trim_start_matches("http://127.0.0.1:")
            .trim_end_matches('/')
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn binds_loopback_with_ephemeral_port() {
        let dir = tempdir().unwrap();
        let handle = start(dir.path().to_path_buf()).await.unwrap();
        assert!(handle.url().starts_with("http://127.0.0.1:"));
        assert_ne!(port_of(&handle), 0);
        handle.shutdown();
    }

    #[tokio::test]
    async fn serves_index_as_default_document() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>vizwalk</h1>").unwrap();
        let handle = start(dir.path().to_path_buf()).await.unwrap();

        let response = get(port_of(&handle), "/").await;
        assert!(response.contains("200 OK"));
        assert!(response.contains("text/html"));
        assert!(response.contains("<h1>vizwalk</h1>"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn unknown_asset_is_not_found() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "ok").unwrap();
        let handle = start(dir.path().to_path_buf()).await.unwrap();

        let response = get(port_of(&handle), "/missing.js").await;
        assert!(response.contains("404"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn traversal_cannot_escape_the_bundle_dir() {
        let outer = tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "top-secret").unwrap();
        let bundle = outer.path().join("bundle");
        std::fs::create_dir(&bundle).unwrap();
        std::fs::write(bundle.join("index.html"), "ok").unwrap();
        let handle = start(bundle).await.unwrap();

        let response = get(port_of(&handle), "/../secret.txt").await;
        assert!(!response.contains("top-secret"));
        handle.shutdown();
    }
}
