//! HTTP Transport Utilities
//!
//! This module converts [`ExecutionResult`]s into HTTP responses and reads
//! request bodies with an upper bound.
//!
//! Every response produced here:
//! - has status 200 (outcomes travel in the `errcode` field)
//! - carries `Access-Control-Allow-Origin: *`
//! - is UTF-8 JSON with `Content-Length` set to the exact body length
//!
//! # Example
//!
//! ```
//! use hostgate_common::transport::http::HttpTransport;
//! use hostgate_common::ExecutionResult;
//!
//! let response = HttpTransport::to_http_response(&ExecutionResult::healthy());
//! assert_eq!(response.headers()["access-control-allow-origin"], "*");
//! ```

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Request, Response, StatusCode};

use crate::protocol::error::{GatewayError, Result};
use crate::protocol::ExecutionResult;

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Create an HTTP response from an execution result.
    pub fn to_http_response(result: &ExecutionResult) -> HyperResponse {
        let body = Bytes::from(result.to_json());
        let len = body.len();

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

        response
    }

    /// Read a whole request body, failing once it grows past `limit` bytes.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::PayloadTooLarge`] when the limit is exceeded
    /// - [`GatewayError::Body`] for any other read failure
    pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                Err(GatewayError::PayloadTooLarge { limit })
            }
            Err(err) => Err(GatewayError::Body(err.to_string())),
        }
    }

    /// Returns the request's `Content-Type` header, if it is valid text.
    pub fn content_type(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_http_response_headers() {
        let response = HttpTransport::to_http_response(&ExecutionResult::healthy());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Access-Control-Allow-Origin").unwrap(), "*");
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn test_content_length_matches_encoded_body() {
        let result = ExecutionResult::success("D:/渲染/场景.ess");
        let expected = result.to_json().len();
        let response = HttpTransport::to_http_response(&result);

        let header = response.headers().get("Content-Length").unwrap();
        assert_eq!(header.to_str().unwrap(), expected.to_string());
    }

    #[test]
    fn test_failure_is_still_http_200() {
        let response = HttpTransport::to_http_response(&ExecutionResult::execution_failed("boom", ""));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let body = Full::new(Bytes::from_static(b"maxcode=1%2B1&esspath=%2Ftmp%2Fa.ess"));
        let bytes = HttpTransport::read_body(body, 1024).await.unwrap();
        assert_eq!(&bytes[..], b"maxcode=1%2B1&esspath=%2Ftmp%2Fa.ess");
    }

    #[tokio::test]
    async fn test_read_body_over_limit() {
        let body = Full::new(Bytes::from(vec![b'a'; 64]));
        let err = HttpTransport::read_body(body, 16).await.unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge { limit: 16 }));
    }

    #[test]
    fn test_content_type_lookup() {
        let mut headers = HeaderMap::new();
        assert!(HttpTransport::content_type(&headers).is_none());

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        assert_eq!(
            HttpTransport::content_type(&headers),
            Some("application/x-www-form-urlencoded; charset=utf-8")
        );
    }
}
