//! Embedded operator UI
//!
//! The single-page UI ships inside the binary so the service has no
//! static-file directory to configure.

use axum::http::header;
use axum::response::{Html, IntoResponse};

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../ui/index.html"))
}

/// GET /app.js
pub async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        include_str!("../ui/app.js"),
    )
}
