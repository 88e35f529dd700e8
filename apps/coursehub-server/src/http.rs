use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::field::Empty;

const BODY_LIMIT: usize = 1024 * 1024;

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

#[derive(Clone, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        let id = nanoid::nanoid!();
        Some(RequestId::new(id.parse().ok()?))
    }
}

fn http_span(req: &Request<Body>) -> tracing::Span {
    let rid = req
        .headers()
        .get(request_id_header())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("n/a");
    tracing::info_span!(
        "http_request",
        method = %req.method(),
        uri = %req.uri().path(),
        request_id = %rid,
        status = Empty,
    )
}

/// Health probe plus the module routes, wrapped in the server middleware.
/// Layers run outermost-last: the request id is set before the trace span opens.
pub fn build_router(routes: Router, timeout: Option<Duration>) -> Router {
    let mut router = routes.route("/healthz", get(|| async { "ok" }));

    if let Some(timeout) = timeout {
        router = router.layer(TimeoutLayer::new(timeout));
    }
    router
        .layer(TraceLayer::new_for_http().make_span_with(http_span))
        .layer(PropagateRequestIdLayer::new(request_id_header()))
        .layer(SetRequestIdLayer::new(request_id_header(), MakeReqId))
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
}
