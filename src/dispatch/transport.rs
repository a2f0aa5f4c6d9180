//! Upstream forwarding transport.

use std::error::Error as StdError;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::request::InvalidTarget;
use crate::resilience::{with_deadline, DeadlineExceeded};

/// Why a forward produced no upstream response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    InvalidTarget(#[from] InvalidTarget),

    #[error("upstream connection failed: {0}")]
    Connect(String),

    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("upstream timed out: {0}")]
    Timeout(#[from] DeadlineExceeded),
}

/// Sends a fully prepared request to an upstream instance.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Forward `request` and resolve to the upstream response, failing once `deadline` passes.
    ///
    /// Any response, whatever its status, counts as success.
    fn forward(
        &self,
        request: Request<Body>,
        deadline: Duration,
    ) -> BoxFuture<'_, Result<Response<Body>, TransportError>>;
}

/// Pooled HTTP/1.1 client transport.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
}

impl HyperTransport {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn forward(
        &self,
        request: Request<Body>,
        deadline: Duration,
    ) -> BoxFuture<'_, Result<Response<Body>, TransportError>> {
        Box::pin(async move {
            match with_deadline(deadline, self.client.request(request)).await? {
                Ok(response) => Ok(response.map(Body::new)),
                Err(e) if e.is_connect() => Err(TransportError::Connect(error_chain(&e))),
                Err(e) => Err(TransportError::Request(error_chain(&e))),
            }
        })
    }
}

/// Render an error with its source chain, e.g. "client error (Connect): tcp connect error: Connection refused".
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
