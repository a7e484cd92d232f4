//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers;
use crate::pipeline::Pipeline;

/// Uploads above this size are rejected before reaching the pipeline
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Configure and start the HTTP server
pub async fn start_http_server(pipeline: Arc<Pipeline>, host: &str, port: u16) -> Result<()> {
    let app = build_router(AppState { pipeline });

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("🌐 Server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(serve_ui))
        .route("/health", get(handlers::health_handler))
        .route("/api/process", post(handlers::process_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Serve the single-page upload form
async fn serve_ui() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

const UPLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Video/Audio to Notes Converter</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; max-width: 720px; }
        .status { color: #666; margin: 10px 0; }
        .error { color: #b00020; margin: 10px 0; }
        .result { background: #f5f5f5; padding: 10px; margin: 10px 0; white-space: pre-wrap; }
        .downloads a { display: block; margin: 4px 0; }
    </style>
</head>
<body>
    <h1>Video/Audio to Notes Converter</h1>
    <p>Choose a video or audio file (mp4, mov, avi, m4a, wav, mp3).</p>

    <form id="upload-form">
        <input type="file" id="file" accept=".mp4,.mov,.avi,.m4a,.wav,.mp3" required>
        <button type="submit">Process File</button>
    </form>

    <div id="status" class="status"></div>
    <div id="error" class="error"></div>

    <div id="output" style="display:none">
        <h2>Generated Notes:</h2>
        <div id="notes" class="result"></div>
        <h3>Download Options</h3>
        <div class="downloads">
            <a id="download-transcript">Download Full Transcript</a>
            <a id="download-notes">Download Summary</a>
        </div>
    </div>

    <script>
        const form = document.getElementById('upload-form');
        const status = document.getElementById('status');
        const error = document.getElementById('error');
        const output = document.getElementById('output');

        function textDownload(link, name, text) {
            link.href = 'data:text/plain;charset=utf-8,' + encodeURIComponent(text);
            link.download = name;
        }

        form.addEventListener('submit', async (event) => {
            event.preventDefault();
            error.textContent = '';
            output.style.display = 'none';
            status.textContent = 'Processing file...';

            const data = new FormData();
            data.append('file', document.getElementById('file').files[0]);

            try {
                const response = await fetch('/api/process', { method: 'POST', body: data });
                const body = await response.json();
                status.textContent = '';

                if (!body.success) {
                    error.textContent = body.error;
                    return;
                }

                document.getElementById('notes').textContent = body.data.notes;
                textDownload(document.getElementById('download-transcript'),
                             'transcript.txt', body.data.transcript);
                textDownload(document.getElementById('download-notes'),
                             'notes.txt', body.data.notes);
                output.style.display = 'block';
            } catch (e) {
                status.textContent = '';
                error.textContent = 'Request failed: ' + e;
            }
        });
    </script>
</body>
</html>
"#;
