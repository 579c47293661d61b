//! HTTP pipeline integration: the exception boundary that converts uncaught
//! failures into routed Error records plus a sanitized client response, and
//! a usage middleware that records one Usage event per request.

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::FutureExt;
use http::{header, HeaderMap, StatusCode};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::{CapturedBody, Claim, RequestContext, ResponseCapture};
use crate::record::ErrorDetail;
use crate::relay::Relay;

/// Header consulted for a framework-supplied per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fixed message returned to clients when the boundary fires.
pub const GENERIC_ERROR_MESSAGE: &str = "Internal server error.";

/// Request bodies above this size are not captured.
const BODY_CAPTURE_LIMIT: usize = 64 * 1024;

/// Authenticated principal's claims, inserted into request extensions by
/// the application's auth layer.
#[derive(Debug, Clone, Default)]
pub struct RequestClaims(pub Vec<Claim>);

/// Minimal response body written when the boundary fires. Carries only a
/// trace identifier the client can quote back to operators, never the
/// original failure text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub trace_id: String,
    pub message: String,
}

/// Outermost recovery point for one request. Catches a panic from the
/// downstream stack, records it as an Error event enriched from the request
/// context, and answers with a sanitized envelope. Never rethrows.
pub async fn exception_boundary(
    State(relay): State<Arc<Relay>>,
    req: Request,
    next: Next,
) -> Response {
    let capture_bodies = relay.config().map_to_ecs;
    let (mut ctx, req) = capture_request(req, capture_bodies).await;
    if ctx.trace_identifier.is_none() {
        ctx.trace_identifier = Some(Uuid::new_v4().to_string());
    }

    // Prefer an already-active correlation id over the per-request one.
    let trace_id = relay
        .correlation()
        .current()
        .or_else(|| ctx.trace_identifier.clone())
        .unwrap_or_default();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let detail = ErrorDetail::from_panic(panic_message(panic.as_ref()));
            if let Err(err) = relay.log_error_detail(detail, Some(&ctx)).await {
                eprintln!("failed to route boundary error record: {err}");
            }

            let envelope = ErrorEnvelope {
                trace_id,
                message: GENERIC_ERROR_MESSAGE.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
        }
    }
}

/// Records one Usage event per request after the downstream completes. The
/// activity name is the matched route when available, else the raw path.
/// In ECS mode the response is captured best-effort and restored unchanged.
pub async fn track_usage(State(relay): State<Arc<Relay>>, req: Request, next: Next) -> Response {
    let capture_bodies = relay.config().map_to_ecs;
    let matched = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string());
    let (mut ctx, req) = capture_request(req, capture_bodies).await;
    let activity = matched.or_else(|| ctx.path.clone()).unwrap_or_default();

    let response = next.run(req).await;

    let response = if capture_bodies {
        let (response, capture) = capture_response(response).await;
        ctx.response = Some(capture);
        response
    } else {
        response
    };

    if let Err(err) = relay.log_usage_with_context(&activity, &ctx, None).await {
        eprintln!("failed to route usage record: {err}");
    }

    response
}

/// Build a [`RequestContext`] from the request, optionally capturing the
/// body. The body is only read when its declared length fits the capture
/// limit, so streaming or oversized requests pass through untouched.
async fn capture_request(req: Request, capture_body: bool) -> (RequestContext, Request) {
    let mut ctx = RequestContext::new();
    ctx.method = Some(req.method().to_string());
    ctx.path = Some(req.uri().path().to_string());
    ctx.query = req.uri().query().map(str::to_string);

    let headers = req.headers();
    ctx.user_agent = header_str(headers, header::USER_AGENT.as_str());
    ctx.accept_language = header_str(headers, header::ACCEPT_LANGUAGE.as_str());
    ctx.referrer = header_str(headers, header::REFERER.as_str());
    ctx.request_mime = header_str(headers, header::CONTENT_TYPE.as_str());
    ctx.trace_identifier = header_str(headers, REQUEST_ID_HEADER);
    ctx.client_ip = header_str(headers, "x-forwarded-for")
        .map(|raw| raw.split(',').next().unwrap_or(&raw).trim().to_string());

    if let Some(claims) = req.extensions().get::<RequestClaims>() {
        ctx.claims = claims.0.clone();
    }

    if !capture_body || !declares_capturable_body(headers) {
        return (ctx, req);
    }

    let (parts, body) = req.into_parts();
    match axum::body::to_bytes(body, BODY_CAPTURE_LIMIT).await {
        Ok(bytes) => {
            ctx.request_body = Some(CapturedBody {
                bytes: Some(bytes.len() as u64),
                content: String::from_utf8_lossy(&bytes).into_owned(),
            });
            (ctx, Request::from_parts(parts, Body::from(bytes)))
        }
        // The declared length lied and the stream is gone; continue without
        // a capture rather than failing the request.
        Err(_) => (ctx, Request::from_parts(parts, Body::empty())),
    }
}

/// Buffer the response body so it can be both recorded and returned to the
/// client. An unreadable body yields a capture without content.
async fn capture_response(response: Response) -> (Response, ResponseCapture) {
    let status_code = response.status().as_u16();
    let mime_type = header_str(response.headers(), header::CONTENT_TYPE.as_str());
    let (parts, body) = response.into_parts();

    match body.collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let capture = ResponseCapture {
                status_code,
                mime_type,
                body: Some(CapturedBody {
                    bytes: Some(bytes.len() as u64),
                    content: String::from_utf8_lossy(&bytes).into_owned(),
                }),
            };
            (Response::from_parts(parts, Body::from(bytes)), capture)
        }
        Err(_) => {
            let capture = ResponseCapture {
                status_code,
                mime_type,
                body: None,
            };
            (Response::from_parts(parts, Body::empty()), capture)
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn declares_capturable_body(headers: &HeaderMap) -> bool {
    header_str(headers, header::CONTENT_LENGTH.as_str())
        .and_then(|raw| raw.parse::<usize>().ok())
        .map(|length| length > 0 && length <= BODY_CAPTURE_LIMIT)
        .unwrap_or(false)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unhandled panic".to_string()
    }
}
