//! Host execution proxy
//!
//! The host can only run one thing at a time, from one thread. [`HostProxy`]
//! owns that thread and exposes a thread-safe "submit and wait" entry point:
//!
//! 1. [`HostProxy::spawn`] starts a dedicated `hostgate-host` thread and builds
//!    the host on it through a factory
//! 2. Callers send [`HostCommand`]s over a single FIFO channel
//! 3. The host thread runs each script to completion before taking the next
//!    command, then answers on the caller's reply channel
//!
//! Any number of threads or tasks can hold a clone of the proxy. Because all
//! of them feed the same queue and only the host thread ever touches the
//! host, two scripts never interleave.
//!
//! # Failure Handling
//!
//! A script error or a panic inside the host becomes an [`ExecutionResult`]
//! with a failure `errcode`; it never unwinds into the caller. If the host
//! thread is gone, submissions return a 503 result.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc as std_mpsc;
use std::thread;

use hostgate_common::{ExecutionRequest, ExecutionResult, HostError};
use tokio::sync::{mpsc, oneshot};

use crate::resource_limits::ExecutionLimits;
use crate::runtime::host::ScriptHost;

/// Name of the thread that owns the host.
pub const HOST_THREAD_NAME: &str = "hostgate-host";

/// Commands sent to the host thread.
enum HostCommand {
    Execute {
        request: ExecutionRequest,
        reply: Reply,
    },
    Emit(String),
    Shutdown,
}

/// Where the host thread sends an execution result.
///
/// Blocking submitters wait on a std channel so they can use `recv_timeout`;
/// async submitters await a oneshot.
enum Reply {
    Blocking(std_mpsc::SyncSender<ExecutionResult>),
    Async(oneshot::Sender<ExecutionResult>),
}

impl Reply {
    fn send(self, result: ExecutionResult) {
        // The submitter may have given up waiting; nobody to tell.
        let _ = match self {
            Reply::Blocking(tx) => tx.send(result).map_err(|_| ()),
            Reply::Async(tx) => tx.send(result).map_err(|_| ()),
        };
    }
}

/// Thread-safe handle to the host's single execution context.
///
/// # Example
///
/// ```no_run
/// use hostgate_common::ExecutionRequest;
/// use hostgate_server::{BoaHost, ExecutionLimits, HostProxy};
///
/// let proxy = HostProxy::spawn(BoaHost::new, ExecutionLimits::default()).unwrap();
/// let result = proxy.submit(ExecutionRequest::new("1 + 1", "/tmp/a.ess"));
/// assert_eq!(result.payload(), "/tmp/a.ess");
/// ```
#[derive(Clone)]
pub struct HostProxy {
    commands: mpsc::UnboundedSender<HostCommand>,
    limits: ExecutionLimits,
}

impl HostProxy {
    /// Starts the host thread and builds the host on it.
    ///
    /// The factory runs on the new thread, so the host itself does not need
    /// to be `Send`. This call returns once the factory has finished.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Startup`] if the thread cannot be spawned or the
    /// factory fails.
    pub fn spawn<F, H>(factory: F, limits: ExecutionLimits) -> Result<Self, HostError>
    where
        F: FnOnce() -> Result<H, HostError> + Send + 'static,
        H: ScriptHost + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<HostCommand>();
        let (init_tx, init_rx) = std_mpsc::channel::<Result<(), HostError>>();

        thread::Builder::new()
            .name(HOST_THREAD_NAME.to_string())
            .spawn(move || {
                let host = match factory() {
                    Ok(host) => {
                        let _ = init_tx.send(Ok(()));
                        host
                    }
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };

                run_host(host, cmd_rx);
            })
            .map_err(|e| HostError::Startup(format!("Failed to spawn host thread: {}", e)))?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!("Host execution context ready");
                Ok(Self {
                    commands: cmd_tx,
                    limits,
                })
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(HostError::Startup("host factory panicked".to_string())),
        }
    }

    /// Runs a script on the host and blocks until it finishes.
    ///
    /// Must not be called from inside an async task; use
    /// [`submit_async`](Self::submit_async) there.
    pub fn submit(&self, request: ExecutionRequest) -> ExecutionResult {
        let token = request.correlation_token.clone();
        let (tx, rx) = std_mpsc::sync_channel(1);

        if !self.enqueue(request, Reply::Blocking(tx)) {
            return ExecutionResult::host_unavailable(token);
        }

        match self.limits.execution_timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(result) => result,
                Err(std_mpsc::RecvTimeoutError::Timeout) => {
                    tracing::warn!("Host did not finish within {}ms", timeout.as_millis());
                    ExecutionResult::timed_out(timeout.as_millis(), token)
                }
                Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                    ExecutionResult::host_unavailable(token)
                }
            },
            None => rx
                .recv()
                .unwrap_or_else(|_| ExecutionResult::host_unavailable(token)),
        }
    }

    /// Runs a script on the host and awaits its result.
    ///
    /// Shares the FIFO queue with [`submit`](Self::submit).
    pub async fn submit_async(&self, request: ExecutionRequest) -> ExecutionResult {
        let token = request.correlation_token.clone();
        let (tx, rx) = oneshot::channel();

        if !self.enqueue(request, Reply::Async(tx)) {
            return ExecutionResult::host_unavailable(token);
        }

        match self.limits.execution_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => ExecutionResult::host_unavailable(token),
                Err(_) => {
                    tracing::warn!("Host did not finish within {}ms", timeout.as_millis());
                    ExecutionResult::timed_out(timeout.as_millis(), token)
                }
            },
            None => rx
                .await
                .unwrap_or_else(|_| ExecutionResult::host_unavailable(token)),
        }
    }

    /// Sends a line to the host's UI surface without waiting.
    pub fn emit(&self, line: impl Into<String>) {
        let _ = self.commands.send(HostCommand::Emit(line.into()));
    }

    /// Asks the host thread to exit once the commands queued before this one
    /// have run.
    pub fn shutdown(&self) {
        let _ = self.commands.send(HostCommand::Shutdown);
    }

    /// Returns false once the host thread has exited.
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    /// The limits this proxy applies to submissions.
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    fn enqueue(&self, request: ExecutionRequest, reply: Reply) -> bool {
        self.commands
            .send(HostCommand::Execute { request, reply })
            .is_ok()
    }
}

/// The host thread's command loop.
fn run_host<H: ScriptHost>(mut host: H, mut commands: mpsc::UnboundedReceiver<HostCommand>) {
    while let Some(command) = commands.blocking_recv() {
        match command {
            HostCommand::Execute { request, reply } => {
                let result = execute_on_host(&mut host, &request);
                reply.send(result);
            }
            HostCommand::Emit(line) => {
                let _ = panic::catch_unwind(AssertUnwindSafe(|| host.emit(&line)));
            }
            HostCommand::Shutdown => break,
        }
    }

    tracing::info!("Host execution context stopped");
}

fn execute_on_host<H: ScriptHost>(host: &mut H, request: &ExecutionRequest) -> ExecutionResult {
    tracing::debug!(
        "Executing script ({} bytes) for '{}'",
        request.script.len(),
        request.correlation_token
    );

    match panic::catch_unwind(AssertUnwindSafe(|| host.execute(&request.script))) {
        Ok(Ok(output)) => {
            tracing::debug!("Script finished: {}", output);
            ExecutionResult::success(request.correlation_token.clone())
        }
        Ok(Err(err)) => {
            tracing::warn!("Script failed for '{}': {}", request.correlation_token, err);
            ExecutionResult::execution_failed(err.to_string(), request.correlation_token.clone())
        }
        Err(panic) => {
            let err = HostError::Panicked(panic_message(panic.as_ref()));
            tracing::error!("Host panicked for '{}': {}", request.correlation_token, err);
            ExecutionResult::execution_failed(err.to_string(), request.correlation_token.clone())
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
