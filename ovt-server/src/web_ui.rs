//! Embedded status page

use axum::response::Html;

/// Serve the embedded status page
///
/// A deliberately small raw-values view; the full gauge dashboard lives in
/// its own front-end and consumes /data and the SSE stream directly.
pub async fn serve_ui() -> Html<&'static str> {
    Html(include_str!("ui.html"))
}
