//! Hostgate Result Types
//!
//! This module defines the execution request handed to the host and the
//! result that is serialized back to the caller.

use serde::{Deserialize, Serialize};

/// Status codes carried in the `errcode` field.
///
/// These live inside the JSON body only; the HTTP status line is always 200.
pub mod status {
    pub const SUCCESS: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const PAYLOAD_TOO_LARGE: u16 = 413;
    pub const EXECUTION_FAILED: u16 = 500;
    pub const HOST_UNAVAILABLE: u16 = 503;
    pub const TIMED_OUT: u16 = 504;
}

/// A script submission derived from an incoming request.
///
/// The script is opaque to the gateway. The correlation token (the `esspath`
/// form field) is never interpreted; it is echoed back in the result payload
/// so the caller can match the response to whatever job or file it cares
/// about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionRequest {
    /// Script text handed to the host verbatim (may be empty)
    pub script: String,
    /// Opaque token echoed back on success
    pub correlation_token: String,
}

impl ExecutionRequest {
    /// Creates a new execution request.
    pub fn new(script: impl Into<String>, correlation_token: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            correlation_token: correlation_token.into(),
        }
    }
}

/// The outcome of handling one request.
///
/// Results are only ever built whole through the constructors below; the
/// fields are private so a half-filled result cannot reach the serializer.
///
/// # Wire Shape
///
/// ```text
/// {"errcode": <int>, "msg": "<string>", "data": {"res": "<string>"}}
/// ```
///
/// # Example
///
/// ```
/// use hostgate_common::protocol::ExecutionResult;
///
/// let ok = ExecutionResult::healthy();
/// assert_eq!(ok.status_code(), 200);
/// assert_eq!(ok.payload(), "healthy");
///
/// let failed = ExecutionResult::execution_failed("ReferenceError: x is not defined", "/tmp/a.ess");
/// assert!(!failed.is_success());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireResult", from = "WireResult")]
pub struct ExecutionResult {
    status_code: u16,
    message: String,
    payload: String,
}

impl ExecutionResult {
    fn new(status_code: u16, message: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            payload: payload.into(),
        }
    }

    /// Creates a successful result carrying `payload` in `data.res`.
    pub fn success(payload: impl Into<String>) -> Self {
        Self::new(status::SUCCESS, "success", payload)
    }

    /// The health check answer.
    pub fn healthy() -> Self {
        Self::success("healthy")
    }

    /// The answer sent to the caller that requested shutdown.
    pub fn stopped() -> Self {
        Self::success("stop")
    }

    /// The host reported a runtime error while running the script.
    ///
    /// The correlation token is still echoed so the caller knows which job
    /// failed.
    pub fn execution_failed(message: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::new(status::EXECUTION_FAILED, message, payload)
    }

    /// The bounded wait for the host expired before the script finished.
    pub fn timed_out(timeout_ms: u128, payload: impl Into<String>) -> Self {
        Self::new(
            status::TIMED_OUT,
            format!("host did not finish within {}ms", timeout_ms),
            payload,
        )
    }

    /// The host execution context is gone (its thread exited).
    pub fn host_unavailable(payload: impl Into<String>) -> Self {
        Self::new(status::HOST_UNAVAILABLE, "host execution context unavailable", payload)
    }

    /// The request could not be read or decoded.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(status::BAD_REQUEST, message, "")
    }

    /// The request body exceeded the configured limit.
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            status::PAYLOAD_TOO_LARGE,
            format!("request body exceeds {} bytes", limit),
            "",
        )
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Returns true when `errcode` is 200.
    pub fn is_success(&self) -> bool {
        self.status_code == status::SUCCESS
    }

    /// Serializes the result to its JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses a result from its JSON wire form.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

#[derive(Serialize, Deserialize)]
struct WireResult {
    errcode: u16,
    msg: String,
    data: WireData,
}

#[derive(Serialize, Deserialize)]
struct WireData {
    #[serde(default)]
    res: String,
}

impl From<ExecutionResult> for WireResult {
    fn from(result: ExecutionResult) -> Self {
        Self {
            errcode: result.status_code,
            msg: result.message,
            data: WireData { res: result.payload },
        }
    }
}

impl From<WireResult> for ExecutionResult {
    fn from(wire: WireResult) -> Self {
        Self::new(wire.errcode, wire.msg, wire.data.res)
    }
}
