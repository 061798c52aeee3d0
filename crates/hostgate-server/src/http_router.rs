//! Request router
//!
//! Classifies an incoming request into one of three operations by its exact
//! path (including any query string):
//!
//! - `/healthz` → [`Operation::HealthCheck`]
//! - `/exit` → [`Operation::Shutdown`]
//! - anything else → [`Operation::Execute`], with the body decoded as a form
//!
//! The HTTP method is ignored. Execute requests read two fields:
//!
//! - `maxcode` - the script text; a missing field means an empty script
//! - `esspath` - an opaque token echoed back on success; missing means empty
//!
//! The router is permissive: it never rejects an Execute
//! request for missing fields.

use hostgate_common::transport::{Charset, FormData};
use hostgate_common::ExecutionRequest;
use hyper::body::Bytes;

/// Path of the health check.
pub const HEALTH_PATH: &str = "/healthz";

/// Path that stops the listener.
pub const EXIT_PATH: &str = "/exit";

/// Form field holding the script text.
pub const SCRIPT_FIELD: &str = "maxcode";

/// Form field holding the correlation token.
pub const TOKEN_FIELD: &str = "esspath";

/// What the listener should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    HealthCheck,
    Shutdown,
    Execute(ExecutionRequest),
}

/// A request as the router sees it, lifted off the wire.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    /// Path and query exactly as received
    pub path: String,
    /// Raw request body
    pub body: Bytes,
    /// Charset declared by the request, UTF-8 if none
    pub charset: Charset,
}

impl IncomingRequest {
    /// Creates a request, taking the charset from a `Content-Type` value.
    pub fn new(path: impl Into<String>, body: Bytes, content_type: Option<&str>) -> Self {
        Self {
            path: path.into(),
            body,
            charset: Charset::from_content_type(content_type),
        }
    }
}

/// Stateless path-based classifier.
pub struct Router;

impl Router {
    /// Returns true for paths that never need the request body.
    pub fn is_control_path(path: &str) -> bool {
        path == HEALTH_PATH || path == EXIT_PATH
    }

    /// Classifies a request.
    ///
    /// # Example
    ///
    /// ```
    /// use hostgate_server::http_router::{IncomingRequest, Operation, Router};
    /// use hyper::body::Bytes;
    ///
    /// let req = IncomingRequest::new("/healthz", Bytes::new(), None);
    /// assert_eq!(Router::classify(&req), Operation::HealthCheck);
    /// ```
    pub fn classify(request: &IncomingRequest) -> Operation {
        match request.path.as_str() {
            HEALTH_PATH => Operation::HealthCheck,
            EXIT_PATH => Operation::Shutdown,
            _ => {
                let form = FormData::parse(&request.body, request.charset);
                let script = form.get(SCRIPT_FIELD).unwrap_or_default();
                let token = form.get(TOKEN_FIELD).unwrap_or_default();

                if form.get(SCRIPT_FIELD).is_none() {
                    tracing::debug!("Request to {} has no {} field, submitting empty script", request.path, SCRIPT_FIELD);
                }

                Operation::Execute(ExecutionRequest::new(script, token))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, body: &'static [u8]) -> IncomingRequest {
        IncomingRequest::new(path, Bytes::from_static(body), None)
    }

    #[test]
    fn test_health_path() {
        assert_eq!(Router::classify(&request("/healthz", b"")), Operation::HealthCheck);
    }

    #[test]
    fn test_health_ignores_body() {
        assert_eq!(
            Router::classify(&request("/healthz", b"maxcode=1&esspath=x")),
            Operation::HealthCheck
        );
    }

    #[test]
    fn test_exit_path() {
        assert_eq!(Router::classify(&request("/exit", b"")), Operation::Shutdown);
    }

    #[test]
    fn test_execute_fields() {
        let op = Router::classify(&request("/", b"maxcode=1%2B1&esspath=%2Ftmp%2Fa.ess"));
        assert_eq!(op, Operation::Execute(ExecutionRequest::new("1+1", "/tmp/a.ess")));
    }

    #[test]
    fn test_any_other_path_executes() {
        let op = Router::classify(&request("/run/script", b"maxcode=x&esspath=y"));
        assert_eq!(op, Operation::Execute(ExecutionRequest::new("x", "y")));
    }

    #[test]
    fn test_matching_is_exact() {
        for path in ["/healthz/", "/HEALTHZ", "/healthz?check=1", "/exit/now"] {
            assert!(
                matches!(Router::classify(&request(path, b"")), Operation::Execute(_)),
                "{} should be an execute request",
                path
            );
        }
    }

    #[test]
    fn test_missing_script_is_empty() {
        let op = Router::classify(&request("/", b"esspath=job"));
        assert_eq!(op, Operation::Execute(ExecutionRequest::new("", "job")));
    }

    #[test]
    fn test_empty_body_is_empty_execute() {
        let op = Router::classify(&request("/", b""));
        assert_eq!(op, Operation::Execute(ExecutionRequest::default()));
    }

    #[test]
    fn test_declared_charset_is_used() {
        let req = IncomingRequest::new(
            "/",
            Bytes::from_static(b"maxcode=1&esspath=caf%E9"),
            Some("application/x-www-form-urlencoded; charset=iso-8859-1"),
        );
        assert_eq!(Router::classify(&req), Operation::Execute(ExecutionRequest::new("1", "café")));
    }

    #[test]
    fn test_control_paths() {
        assert!(Router::is_control_path("/healthz"));
        assert!(Router::is_control_path("/exit"));
        assert!(!Router::is_control_path("/"));
        assert!(!Router::is_control_path("/exit?now"));
    }
}
