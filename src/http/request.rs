//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Prepare request for forwarding to an instance
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Path and query are forwarded verbatim; only the origin changes
//! - Hop-by-hop headers are not forwarded

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::{Request, Version};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Headers scoped to a single connection (RFC 9110 §7.6.1).
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayRequestId;

impl MakeRequestId for GatewayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID header value, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The instance URL could not be used as a forwarding origin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid upstream target '{target}'")]
pub struct InvalidTarget {
    pub target: String,
}

/// Re-point `request` at `target` (an instance base URL such as `http://10.0.0.5:3002`).
///
/// Scheme, authority and `Host` come from the target; method, path, query,
/// remaining headers and the streaming body are kept.
pub fn upstream_request(request: Request<Body>, target: &str) -> Result<Request<Body>, InvalidTarget> {
    let invalid = || InvalidTarget {
        target: target.to_string(),
    };

    let target_uri: Uri = target.parse().map_err(|_| invalid())?;
    let (Some(scheme), Some(authority)) = (target_uri.scheme().cloned(), target_uri.authority().cloned()) else {
        return Err(invalid());
    };

    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(scheme);
    uri_parts.authority = Some(authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = Uri::from_parts(uri_parts).map_err(|_| invalid())?;

    // Upstream connections are HTTP/1.1 regardless of the inbound protocol.
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    let host = HeaderValue::from_str(authority.as_str()).map_err(|_| invalid())?;
    parts.headers.insert(header::HOST, host);

    Ok(Request::from_parts(parts, body))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
