//! Static browsing/admin console compiled into the binary and served from the
//! router fallback, so the server ships as a single artifact.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rust_embed::Embed;
use std::path::Path;

#[derive(Embed)]
#[folder = "ui/"]
#[prefix = ""]
struct EmbeddedUi;

fn get_mime_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

async fn serve_embedded_file(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    let file_path = if path.is_empty() { "index.html" } else { path };

    let try_paths = [
        file_path.to_string(),
        format!("{}/index.html", file_path.trim_end_matches('/')),
        format!("{file_path}.html"),
    ];

    for try_path in &try_paths {
        if let Some(content) = EmbeddedUi::get(try_path) {
            let mime = get_mime_type(try_path);
            return (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime),
                    (header::CACHE_CONTROL, "public, max-age=3600"),
                ],
                Body::from(content.data.into_owned()),
            )
                .into_response();
        }
    }

    // Unknown paths fall back to the SPA shell so deep links work.
    if let Some(index) = EmbeddedUi::get("index.html") {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            Body::from(index.data.into_owned()),
        )
            .into_response();
    }

    (StatusCode::NOT_FOUND, "Not found").into_response()
}

pub fn embedded_ui_router() -> Router {
    Router::new().fallback(get(serve_embedded_file))
}

pub fn has_embedded_ui() -> bool {
    EmbeddedUi::get("index.html").is_some()
}
