//! Edge route filter.
//!
//! Runs in front of every request but never authorizes or denies: the edge has
//! no access to the token held in client storage. It only sorts paths so that
//! static assets and API calls can bypass any future edge-side page logic.

use axum::{extract::Request, middleware::Next, response::Response};

const STATIC_PREFIXES: &[&str] = &["/_next/static", "/_next/image", "/static"];
const STATIC_FILES: &[&str] = &["/favicon.ico", "/robots.txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeClass {
    Static,
    Api,
    Page,
}

pub fn classify(path: &str) -> EdgeClass {
    let path = path.split(['?', '#']).next().unwrap_or_default();

    if STATIC_FILES.contains(&path)
        || STATIC_PREFIXES.iter().any(|p| under(path, p))
        || has_extension(path)
    {
        EdgeClass::Static
    } else if under(path, "/api") {
        EdgeClass::Api
    } else {
        EdgeClass::Page
    }
}

fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
}

fn has_extension(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .and_then(|last| last.rsplit_once('.'))
        .map_or(false, |(stem, ext)| !stem.is_empty() && !ext.is_empty())
}

/// Pass-through middleware. Classification is recorded, nothing is blocked.
pub async fn edge_route_filter(request: Request, next: Next) -> Response {
    let class = classify(request.uri().path());
    tracing::trace!(path = request.uri().path(), ?class, "Edge filter pass-through");

    next.run(request).await
}
