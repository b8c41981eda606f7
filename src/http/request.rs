//! Request identity and extraction helpers.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID when the client did not send one
//! - Read the `User-ID` header and the request ID for the operation handlers
//! - Extract the caller's W3C trace context (`traceparent`/`tracestate`)
//! - Turn body rejections into validation errors
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A missing `User-ID` is not rejected here; the handler counts and logs it

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::Json;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::CartError;
use crate::operations::Inbound;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const USER_ID_HEADER: &str = "user-id";

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Trace context propagated by the caller, read with the global propagator.
pub fn parent_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Assemble an [`Inbound`] from headers and an already-decoded payload.
pub fn inbound<P>(headers: &HeaderMap, payload: Result<P, CartError>) -> Inbound<P> {
    Inbound {
        request_id: header_str(headers, X_REQUEST_ID),
        user_id: header_str(headers, USER_ID_HEADER),
        parent: parent_context(headers),
        payload,
    }
}

/// Decode a JSON body, mapping any rejection to a validation error.
pub fn json_payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, CartError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        CartError::validation("body", "malformed JSON")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("user1"));
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc"));

        let inbound = inbound(&headers, Ok(()));
        assert_eq!(inbound.user_id.as_deref(), Some("user1"));
        assert_eq!(inbound.request_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_headers() {
        let inbound = inbound(&HeaderMap::new(), Ok(()));
        assert!(inbound.user_id.is_none());
        assert!(inbound.request_id.is_none());
    }

    #[test]
    fn test_parent_context_from_traceparent() {
        use opentelemetry::trace::{TraceContextExt, TraceId};
        use opentelemetry_sdk::propagation::TraceContextPropagator;

        global::set_text_map_propagator(TraceContextPropagator::new());

        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );
        let parent = inbound(&headers, Ok(())).parent;
        let span = parent.span();
        assert!(span.span_context().is_remote());
        assert_eq!(
            span.span_context().trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );

        let empty = parent_context(&HeaderMap::new());
        assert!(!empty.span().span_context().is_valid());
    }

    #[test]
    fn test_make_request_uuid() {
        let request = Request::new(());
        let id = UuidRequestId.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }
}
