use std::{io, sync::Arc};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use maud::Markup;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    archive::ArchiveJob,
    classify,
    config::ServeConfig,
    error::{AppError, AppResult},
    listing, render,
    resolve::{PathResolver, Resolved},
};

pub type SharedState = Arc<ServeConfig>;

/// Archive name used when the whole root is downloaded.
const ROOT_ARCHIVE_NAME: &str = "archive";

pub fn router(config: ServeConfig) -> Router {
    Router::new()
        .route("/", get(browse_root))
        .route("/browse", get(browse_root))
        .route("/browse/", get(browse_root))
        .route("/browse/*rel", get(browse))
        .route("/view/*rel", get(view))
        .route("/download/*rel", get(download))
        .route("/download-all", get(download_all_root))
        .route("/download-all/", get(download_all_root))
        .route("/download-all/*rel", get(download_all))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(config))
}

// --- Browsing ---

async fn browse_root(State(state): State<SharedState>) -> AppResult<Response> {
    let target = PathResolver::new(state.root()).resolve("")?;
    listing_page(&state, target).await
}

async fn browse(State(state): State<SharedState>, uri: Uri) -> AppResult<Response> {
    let rel = wildcard(&uri, "/browse/");
    let target = PathResolver::new(state.root()).resolve(&rel)?;
    listing_page(&state, target).await
}

async fn listing_page(state: &SharedState, target: Resolved) -> AppResult<Response> {
    let visibility = state.visibility();
    let page = tokio::task::spawn_blocking(move || -> AppResult<Markup> {
        if !target.absolute.is_dir() {
            return Err(AppError::NotFound);
        }
        // An unreadable directory still gets a page, just an error one.
        Ok(match listing::list(&target.absolute, visibility) {
            Ok(entries) => render::directory_page(&target.relative, &entries),
            Err(e) => {
                warn!("Failed to read directory {}: {}", target.absolute.display(), e);
                render::error_page(access_message(&e))
            }
        })
    })
    .await??;
    Ok(page.into_response())
}

fn access_message(err: &io::Error) -> &'static str {
    match err.kind() {
        io::ErrorKind::PermissionDenied => "Access Denied",
        _ => "Cannot read directory",
    }
}

// --- Files ---

/// View and download report escapes as plain 404s.
fn resolve_file(state: &SharedState, rel: &str) -> AppResult<Resolved> {
    PathResolver::new(state.root())
        .resolve(rel)
        .map_err(|_| AppError::NotFound)
}

async fn view(State(state): State<SharedState>, uri: Uri) -> AppResult<Response> {
    let rel = wildcard(&uri, "/view/");
    let target = resolve_file(&state, &rel)?;
    let page = tokio::task::spawn_blocking(move || -> AppResult<Markup> {
        if !target.absolute.is_file() {
            return Err(AppError::NotFound);
        }
        let mode = classify::classify(target.relative.basename());
        let preview = classify::load_preview(&target.absolute, mode)?;
        Ok(render::file_page(&target.relative, &preview))
    })
    .await??;
    Ok(page.into_response())
}

async fn download(State(state): State<SharedState>, uri: Uri) -> AppResult<Response> {
    let rel = wildcard(&uri, "/download/");
    let target = resolve_file(&state, &rel)?;
    let metadata = match fs::metadata(&target.absolute).await {
        Ok(meta) if meta.is_file() => meta,
        _ => return Err(AppError::NotFound),
    };
    let file = fs::File::open(&target.absolute).await?;

    info!("Serving file: {}", target.absolute.display());
    Ok(attachment(
        file,
        metadata.len(),
        "application/octet-stream",
        target.relative.basename(),
        "download",
    ))
}

// --- Archives ---

async fn download_all_root(State(state): State<SharedState>) -> AppResult<Response> {
    archive_download(&state, "").await
}

async fn download_all(State(state): State<SharedState>, uri: Uri) -> AppResult<Response> {
    let rel = wildcard(&uri, "/download-all/");
    archive_download(&state, &rel).await
}

async fn archive_download(state: &SharedState, rel: &str) -> AppResult<Response> {
    let target = PathResolver::new(state.root()).resolve(rel)?;
    let zip_name = if target.relative.is_root() {
        format!("{}.zip", ROOT_ARCHIVE_NAME)
    } else {
        format!("{}.zip", target.relative.basename())
    };

    let job = ArchiveJob::new(state.root(), &target, state.visibility());
    let prefix = job.prefix().to_string();
    let (file, len, stats) = tokio::task::spawn_blocking(move || job.spool()).await??;
    info!(
        "Built {} ({} files under '{}', {} skipped, {} bytes) from {}",
        zip_name,
        stats.files,
        prefix,
        stats.skipped,
        len,
        target.absolute.display()
    );

    Ok(attachment(
        fs::File::from_std(file),
        len,
        "application/zip",
        &zip_name,
        "archive.zip",
    ))
}

// --- Utility Functions ---

/// The part of the request path after `prefix`, percent-decoded. Bytes that
/// are not valid UTF-8 become U+FFFD, so such paths simply fail to resolve.
fn wildcard(uri: &Uri, prefix: &str) -> String {
    let raw = uri.path().strip_prefix(prefix).unwrap_or("");
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

/// Streams `file` as a download. A client that hangs up mid-transfer only
/// drops this body stream.
fn attachment(
    file: fs::File,
    len: u64,
    content_type: &'static str,
    filename: &str,
    fallback: &'static str,
) -> Response {
    let body = Body::from_stream(ReaderStream::new(file));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(filename, fallback));

    (StatusCode::OK, headers, body).into_response()
}

/// Falls back to `fallback` when `filename` cannot go into a header.
fn content_disposition(filename: &str, fallback: &'static str) -> HeaderValue {
    let quoted = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", quoted)).unwrap_or_else(|_| {
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", fallback))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
    })
}

async fn not_found() -> AppError {
    AppError::NotFound
}
