//! HTTP surface: the upload form and the `/validate` endpoint.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::upload::{CertificateChecker, Reply, Upload};
use crate::verify::PageNameFetcher;
use crate::Config;

/// Checker shared by every request handler.
pub type SharedChecker = Arc<CertificateChecker<Arc<dyn PageNameFetcher>>>;

const UPLOAD_FORM: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/index.html"));

/// Multipart field holding the certificate.
const FILE_FIELD: &str = "file";

pub fn router(checker: SharedChecker, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(upload_form))
        .route("/validate", post(validate))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(checker)
}

/// Binds `config.addr` and serves until the process is stopped.
pub async fn serve(config: &Config, fetcher: Arc<dyn PageNameFetcher>) -> anyhow::Result<()> {
    let checker = Arc::new(CertificateChecker::new(
        config.upload_dir.clone(),
        config.element_timeout,
        fetcher,
    ));
    let app = router(checker, config.max_upload_bytes);

    let listener = TcpListener::bind(config.addr).await?;
    info!("listening on {}", config.addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

async fn validate(
    State(checker): State<SharedChecker>,
    mut multipart: Multipart,
) -> Result<Response, MultipartError> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        // A part without a filename is a plain form value, not a file.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let bytes = field.bytes().await?;
        file = Some((filename, bytes));
        break;
    }

    // Extraction and the browser session both block.
    let reply = tokio::task::spawn_blocking(move || {
        let upload = file.as_ref().map(|(filename, bytes)| Upload {
            filename: filename.as_str(),
            bytes: &bytes[..],
        });
        checker.handle_upload(upload)
    })
    .await;

    match reply {
        Ok(reply) => Ok(reply_response(&reply)),
        Err(e) => {
            error!(error = %e, "certificate check panicked");
            Ok((StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response())
        }
    }
}

fn reply_response(reply: &Reply) -> Response {
    let status =
        StatusCode::from_u16(reply.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = if reply.is_html() {
        "text/html; charset=utf-8"
    } else {
        "text/plain; charset=utf-8"
    };
    (status, [(header::CONTENT_TYPE, content_type)], reply.body()).into_response()
}
