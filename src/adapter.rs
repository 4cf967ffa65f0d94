//! Serverless entry-point shim.
//!
//! Hosting platforms hand us one request at a time; the only job here is to
//! drive the prediction router with that request and hand back whatever it
//! produces. No validation, no error translation.

use axum::{Router, body::Body, http::Request, response::Response};
use tower::ServiceExt;

/// Forward one platform-supplied request to the application router and
/// return its response unchanged. The router is infallible, so this cannot
/// fail of its own accord.
pub async fn forward(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request)
        .await
        .unwrap_or_else(|err| match err {})
}
