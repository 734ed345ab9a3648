//! Bridges hyper requests onto [`Server::dispatch`].

use crate::api::types::{collect_body, empty_response, error_response, json_response};
use crate::router::{DispatchError, Server};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error};

/// Main request handler
///
/// The body is read in full before dispatch, so no store lock is held while
/// waiting on the client.
pub async fn route_request(
    req: Request<Incoming>,
    server: Arc<Server>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {}", method, path);

    let body = match collect_body(req).await {
        Ok(body) => body,
        Err(e) => return Ok(failure(&method, &path, DispatchError::Body(e))),
    };

    Ok(respond(&server, &method, &path, &body))
}

/// Dispatch an already-read request and render the outcome.
pub fn respond(server: &Server, method: &Method, path: &str, body: &[u8]) -> Response<Full<Bytes>> {
    match server.dispatch(method, path, body) {
        Ok(reply) => match reply.body {
            Some(body) => json_response(reply.status, &body),
            None => empty_response(reply.status),
        },
        Err(e) => failure(method, path, e),
    }
}

fn failure(method: &Method, path: &str, err: DispatchError) -> Response<Full<Bytes>> {
    match &err {
        DispatchError::UnknownRoute(pattern) => {
            error!("{} {}: route {} has no endpoint", method, path, pattern)
        }
        DispatchError::Body(reason) => debug!("{} {}: {}", method, path, reason),
        other => debug!("{} {} -> {}: {}", method, path, other.status(), other),
    }
    error_response(err.status(), &err.to_string())
}
