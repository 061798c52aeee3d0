//! The host capability the gateway drives.
//!
//! A host is whatever owns the single-threaded execution context: an
//! embedded interpreter, an application's main thread, a test double. The
//! gateway only needs two things from it: run a script to completion, and
//! show a line of text to whoever is watching the host.

use hostgate_common::HostError;

/// A single-threaded script execution context.
///
/// Implementations do not need to be `Send`. The [`HostProxy`] builds the
/// host on its own thread through a factory and never moves it afterwards.
///
/// [`HostProxy`]: crate::runtime::HostProxy
pub trait ScriptHost {
    /// Runs `script` to completion and returns its textual output.
    ///
    /// The script is opaque; an empty script is still executed.
    fn execute(&mut self, script: &str) -> Result<String, HostError>;

    /// Writes one line to the host's UI or log surface.
    fn emit(&mut self, line: &str) {
        tracing::info!(target: "hostgate::host", "{}", line);
    }
}
