use std::convert::Infallible;
use std::fmt::Write;
use std::sync::Arc;

use log::{debug, error};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use warp::reply::Response;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use crate::storage::storage_trait::Storage;
use crate::storage::types::Artifact;

pub const NOT_FOUND_BODY: &str = "File not found";

/// Bytes escaped in listing links. Everything but unreserved URL characters.
const LINK_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn with_storage(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = (Arc<dyn Storage>,), Error = Infallible> + Clone {
    warp::any().map(move || storage.clone())
}

/// Every route of the artifact server, with rejections mapped to plain-text replies.
pub fn routes(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    listing_route(storage.clone())
        .or(artifact_route(storage))
        .recover(handle_rejection)
}

/// GET /
pub fn listing_route(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .and(with_storage(storage))
        .and_then(list_artifacts)
}

/// GET /:name
pub fn artifact_route(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path::param::<String>()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_storage(storage))
        .and_then(serve_artifact)
}

async fn list_artifacts(storage: Arc<dyn Storage>) -> Result<Response, Rejection> {
    // Directory scans are blocking; keep them off the async workers.
    match tokio::task::spawn_blocking(move || storage.list_artifacts()).await {
        Ok(Ok(artifacts)) => Ok(reply::html(render_listing(&artifacts)).into_response()),
        Ok(Err(e)) => {
            error!("Failed to list artifacts: {}", e);
            Ok(internal_error())
        }
        Err(e) => {
            error!("Listing task failed: {}", e);
            Ok(internal_error())
        }
    }
}

async fn serve_artifact(segment: String, storage: Arc<dyn Storage>) -> Result<Response, Rejection> {
    // warp hands over the raw segment; decode it before any name check.
    let name = match percent_decode_str(&segment).decode_utf8() {
        Ok(name) => name.into_owned(),
        Err(_) => {
            debug!("Undecodable path segment {}", segment);
            return Ok(not_found());
        }
    };
    let lookup = name.clone();
    match tokio::task::spawn_blocking(move || storage.read_artifact(&lookup)).await {
        Ok(Ok(bytes)) => {
            let mime = mime_guess::from_path(&name).first_or_octet_stream();
            debug!("Serving {} ({} bytes, {})", name, bytes.len(), mime);
            Ok(reply::with_header(bytes, "content-type", mime.to_string()).into_response())
        }
        Ok(Err(e)) if e.is_not_found() => {
            debug!("{}", e);
            Ok(not_found())
        }
        Ok(Err(e)) => {
            error!("Failed to read artifact {}: {}", name, e);
            Ok(internal_error())
        }
        Err(e) => {
            error!("Read task for {} failed: {}", name, e);
            Ok(internal_error())
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(
            reply::with_status("Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
                .into_response(),
        );
    }
    Ok(not_found())
}

fn not_found() -> Response {
    reply::with_status(NOT_FOUND_BODY, StatusCode::NOT_FOUND).into_response()
}

fn internal_error() -> Response {
    reply::with_status("Internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML page linking every artifact.
pub fn render_listing(artifacts: &[Artifact]) -> String {
    let mut html = String::from(
        "<html><head><title>capserve</title></head><body><h3>Captured screens</h3><ul>",
    );
    for artifact in artifacts {
        let name = artifact.name.as_str();
        let _ = write!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            utf8_percent_encode(name, LINK_ESCAPE),
            escape_html(name)
        );
    }
    html.push_str("</ul></body></html>");
    html
}
