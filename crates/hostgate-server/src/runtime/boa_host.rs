//! Boa-backed JavaScript host
//!
//! [`BoaHost`] is the host the `hostgate` binary ships with. It keeps one Boa
//! [`Context`] alive for the lifetime of the host thread, so globals defined
//! by one submitted script are visible to the next.
//!
//! # JavaScript API
//!
//! - `print(...args)` - writes its arguments, space separated, to the host log
//!
//! Boa's `Context` is neither `Send` nor `Sync`. Build it on the host thread
//! by handing `BoaHost::new` (or a closure calling `with_prelude`) to
//! [`HostProxy::spawn`](crate::runtime::HostProxy::spawn).

use boa_engine::{js_string, Context, JsResult, JsValue, NativeFunction, Source};
use hostgate_common::HostError;

use crate::runtime::host::ScriptHost;

/// A JavaScript execution context driven by the gateway.
pub struct BoaHost {
    context: Context,
}

impl BoaHost {
    /// Creates a fresh context with the host bindings installed.
    pub fn new() -> Result<Self, HostError> {
        let mut context = Context::default();

        context
            .register_global_callable(js_string!("print"), 0, NativeFunction::from_fn_ptr(print))
            .map_err(|e| HostError::Startup(format!("Failed to install print binding: {}", e)))?;

        Ok(Self { context })
    }

    /// Creates a context and evaluates `prelude` in it before any request
    /// arrives.
    ///
    /// Useful for defining helper functions that submitted scripts can call.
    pub fn with_prelude(prelude: &str) -> Result<Self, HostError> {
        let mut host = Self::new()?;
        host.context
            .eval(Source::from_bytes(prelude))
            .map_err(|e| HostError::Startup(format!("Prelude evaluation error: {}", e)))?;

        tracing::info!("Prelude evaluated");
        Ok(host)
    }
}

impl ScriptHost for BoaHost {
    fn execute(&mut self, script: &str) -> Result<String, HostError> {
        let value = self
            .context
            .eval(Source::from_bytes(script))
            .map_err(|e| HostError::Script(e.to_string()))?;

        Ok(value.display().to_string())
    }
}

fn print(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }

    tracing::info!(target: "hostgate::host", "{}", parts.join(" "));
    Ok(JsValue::undefined())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_creation() {
        assert!(BoaHost::new().is_ok());
    }

    #[test]
    fn test_execute_returns_output() {
        let mut host = BoaHost::new().unwrap();
        assert_eq!(host.execute("1 + 1").unwrap(), "2");
    }

    #[test]
    fn test_empty_script_executes() {
        let mut host = BoaHost::new().unwrap();
        assert_eq!(host.execute("").unwrap(), "undefined");
    }

    #[test]
    fn test_globals_persist_between_scripts() {
        let mut host = BoaHost::new().unwrap();
        host.execute("var counter = 1;").unwrap();
        host.execute("counter += 1;").unwrap();
        assert_eq!(host.execute("counter").unwrap(), "2");
    }

    #[test]
    fn test_thrown_error_is_reported() {
        let mut host = BoaHost::new().unwrap();
        let err = host.execute("throw new Error('intentional error')").unwrap_err();
        assert!(matches!(err, HostError::Script(_)));
        assert!(err.to_string().contains("intentional error"));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let mut host = BoaHost::new().unwrap();
        assert!(host.execute("this is not valid javascript ))").is_err());
    }

    #[test]
    fn test_host_survives_failed_script() {
        let mut host = BoaHost::new().unwrap();
        assert!(host.execute("undefinedFunction()").is_err());
        assert_eq!(host.execute("40 + 2").unwrap(), "42");
    }

    #[test]
    fn test_print_binding() {
        let mut host = BoaHost::new().unwrap();
        assert_eq!(host.execute("print('hello', 42)").unwrap(), "undefined");
    }

    #[test]
    fn test_prelude_defines_helpers() {
        let mut host = BoaHost::with_prelude("function double(x) { return x * 2; }").unwrap();
        assert_eq!(host.execute("double(21)").unwrap(), "42");
    }

    #[test]
    fn test_bad_prelude_fails_startup() {
        let err = BoaHost::with_prelude("function (").err().unwrap();
        assert!(matches!(err, HostError::Startup(_)));
    }
}
