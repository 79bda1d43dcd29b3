//! Embedded browser client.
//!
//! The page and its script are compiled into the binary, so the server
//! ships as a single artifact with no asset directory to deploy.

use axum::http::header;
use axum::response::{Html, IntoResponse};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const APP_JS: &str = include_str!("../assets/app.js");

/// GET / — the toggle page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /assets/app.js — the page script.
pub async fn app_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], APP_JS)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
