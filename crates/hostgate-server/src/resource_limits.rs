//! Limits applied while handling requests.
//!
//! Two knobs exist:
//!
//! - `execution_timeout` bounds how long a submitter waits for the host. It is
//!   off by default: a script that never hands control back will hang its
//!   caller, matching the behaviour of hosts that cannot interrupt a running
//!   script. When set, the caller gets a 504 result after the bound while the
//!   host keeps running the script; later submissions queue behind it.
//! - `max_body_bytes` caps how much of a request body is read (16 MiB by
//!   default). Oversized requests get a 413 result and the listener carries on.

use std::time::Duration;

/// Default cap on request body size (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Limits for request handling and script execution.
///
/// # Example
///
/// ```
/// use hostgate_server::ExecutionLimits;
/// use std::time::Duration;
///
/// let limits = ExecutionLimits::new()
///     .with_execution_timeout(Duration::from_secs(5))
///     .with_max_body_bytes(1024 * 1024);
/// assert!(limits.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionLimits {
    /// How long a submitter waits for the host; `None` waits forever
    pub execution_timeout: Option<Duration>,
    /// Largest request body that will be read
    pub max_body_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            execution_timeout: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ExecutionLimits {
    /// Creates limits with no execution timeout and a 16 MiB body cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bounded wait for script execution.
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    /// Sets the request body cap.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Validates the limits.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An execution timeout is set to zero
    /// - An execution timeout is longer than one hour
    /// - The body cap is zero
    pub fn validate(&self) -> Result<(), String> {
        if let Some(timeout) = self.execution_timeout {
            if timeout.is_zero() {
                return Err("execution timeout must be greater than zero".to_string());
            }

            if timeout.as_secs() > 3600 {
                return Err(format!(
                    "execution timeout must be <= 1 hour (got {} seconds)",
                    timeout.as_secs()
                ));
            }
        }

        if self.max_body_bytes == 0 {
            return Err("max body size must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = ExecutionLimits::default();
        assert!(limits.execution_timeout.is_none());
        assert_eq!(limits.max_body_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_with_execution_timeout() {
        let limits = ExecutionLimits::new()
            .with_execution_timeout(Duration::from_millis(5500));

        assert_eq!(limits.execution_timeout, Some(Duration::from_millis(5500)));
    }

    #[test]
    fn test_validate_default() {
        assert!(ExecutionLimits::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let limits = ExecutionLimits::new().with_execution_timeout(Duration::ZERO);
        let err = limits.validate().unwrap_err();
        assert!(err.contains("greater than zero"));
    }

    #[test]
    fn test_validate_excessive_timeout_fails() {
        let limits = ExecutionLimits::new()
            .with_execution_timeout(Duration::from_secs(7200)); // 2 hours
        let err = limits.validate().unwrap_err();
        assert!(err.contains("1 hour"));
    }

    #[test]
    fn test_validate_zero_body_cap_fails() {
        let limits = ExecutionLimits::new().with_max_body_bytes(0);
        assert!(limits.validate().is_err());
    }
}
