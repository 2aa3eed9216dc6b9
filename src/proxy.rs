//! Range-forwarding audio proxy
//!
//! Streams a chapter's audio from the external archive through this server
//! so byte-range seeking keeps working for clients that cannot reach the
//! archive directly. The client's Range header is forwarded upstream and the
//! upstream's range response headers are relayed back unchanged.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::constants::PROXY_USER_AGENT;
use crate::error::ApiError;
use crate::serve::AppState;

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

#[derive(Serialize)]
struct UpstreamErrorBody {
    message: String,
    status: u16,
}

/// Only HTTPS targets are accepted; anything else is a client error
pub fn validate_proxy_url(raw: Option<&str>) -> Result<Url, ApiError> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing or invalid url".to_string()))?;
    let url = Url::parse(raw)
        .map_err(|_| ApiError::Validation("Missing or invalid url".to_string()))?;
    if url.scheme() != "https" {
        return Err(ApiError::Validation("Missing or invalid url".to_string()));
    }
    Ok(url)
}

pub async fn audio_proxy_handler(
    State(state): State<Arc<AppState>>,
    request_headers: axum::http::HeaderMap,
    Query(query): Query<ProxyQuery>,
) -> Response {
    let target = match validate_proxy_url(query.url.as_deref()) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };

    let range = request_headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    forward_audio(&state.http, target.as_str(), range).await
}

/// Fetch `target` and relay status, range headers and the body stream.
///
/// Upstream HTTP errors are propagated with the upstream's status code; a
/// failure to reach the upstream at all becomes an upstream error response.
/// A failure mid-stream, after headers are sent, simply aborts the body.
pub async fn forward_audio(client: &reqwest::Client, target: &str, range: Option<&str>) -> Response {
    let mut upstream_request = client.get(target).header("User-Agent", PROXY_USER_AGENT);

    // Forward the client's byte range so seeking works through the proxy
    if let Some(range) = range {
        upstream_request = upstream_request.header("Range", range);
    }

    let upstream = match upstream_request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!("Proxy audio error: {}", e);
            return ApiError::Upstream(e).into_response();
        }
    };

    let upstream_status = upstream.status().as_u16();
    if upstream_status >= 400 {
        let status =
            StatusCode::from_u16(upstream_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (
            status,
            Json(UpstreamErrorBody {
                message: "Failed to fetch audio from source".to_string(),
                status: upstream_status,
            }),
        )
            .into_response();
    }

    let status = if upstream_status == 206 {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    // reqwest and axum sit on different http versions, so header values cross
    // the boundary as strings
    let content_type = upstream_header(&upstream, "content-type").unwrap_or("audio/mp4".to_string());
    let accept_ranges = upstream_header(&upstream, "accept-ranges").unwrap_or("bytes".to_string());
    let content_length = upstream_header(&upstream, "content-length");
    let content_range = upstream_header(&upstream, "content-range");

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&accept_ranges) {
        headers.insert(header::ACCEPT_RANGES, value);
    }
    if let Some(length) = content_length {
        if let Ok(value) = HeaderValue::from_str(&length) {
            headers.insert(header::CONTENT_LENGTH, value);
        }
    }
    if let Some(range) = content_range {
        if let Ok(value) = HeaderValue::from_str(&range) {
            headers.insert(header::CONTENT_RANGE, value);
        }
    }

    response
}

fn upstream_header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::validate_proxy_url;

    #[test]
    fn accepts_https_urls() {
        assert!(validate_proxy_url(Some("https://archive.org/download/x/1.m4a")).is_ok());
    }

    #[test]
    fn rejects_missing_empty_and_plain_http() {
        assert!(validate_proxy_url(None).is_err());
        assert!(validate_proxy_url(Some("")).is_err());
        assert!(validate_proxy_url(Some("http://archive.org/download/x/1.m4a")).is_err());
        assert!(validate_proxy_url(Some("not a url")).is_err());
        assert!(validate_proxy_url(Some("ftp://archive.org/file")).is_err());
    }
}
