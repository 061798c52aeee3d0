//! Shared helpers for gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hostgate_common::HostError;
use hostgate_server::{ExecutionLimits, Gateway, HostProxy, ScriptHost, ServerConfig};

// ============================================================================
// Test Hosts
// ============================================================================

/// Records every script it is asked to run.
///
/// Scripts starting with `fail` return a script error; `sleep:<ms>` sleeps.
pub struct RecordingHost {
    pub scripts: Arc<Mutex<Vec<String>>>,
}

impl ScriptHost for RecordingHost {
    fn execute(&mut self, script: &str) -> Result<String, HostError> {
        self.scripts.lock().unwrap().push(script.to_string());

        if let Some(ms) = script.strip_prefix("sleep:") {
            thread::sleep(Duration::from_millis(ms.parse().unwrap_or(0)));
        }
        if script.starts_with("fail") {
            return Err(HostError::Script(format!("Error: {}", script)));
        }

        Ok(script.to_string())
    }
}

/// Increments a shared counter with a gap between read and write, so any
/// overlap between two scripts loses an update.
pub struct CounterHost {
    pub counter: Arc<AtomicUsize>,
}

impl ScriptHost for CounterHost {
    fn execute(&mut self, _script: &str) -> Result<String, HostError> {
        let seen = self.counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(2));
        self.counter.store(seen + 1, Ordering::SeqCst);
        Ok((seen + 1).to_string())
    }
}

// ============================================================================
// Running Gateway
// ============================================================================

/// A started gateway on an ephemeral loopback port.
pub struct TestGateway {
    pub gateway: Gateway,
    pub addr: SocketAddr,
}

impl TestGateway {
    /// Starts a gateway in front of the host built by `factory`.
    pub fn start<F, H>(factory: F, limits: ExecutionLimits) -> Self
    where
        F: FnOnce() -> Result<H, HostError> + Send + 'static,
        H: ScriptHost + 'static,
    {
        Self::start_with(factory, limits.clone(), limits)
    }

    /// Starts a gateway whose proxy and listener use separate limits.
    pub fn start_with<F, H>(factory: F, proxy_limits: ExecutionLimits, server_limits: ExecutionLimits) -> Self
    where
        F: FnOnce() -> Result<H, HostError> + Send + 'static,
        H: ScriptHost + 'static,
    {
        let proxy = HostProxy::spawn(factory, proxy_limits).expect("host should start");
        let gateway = Gateway::new(proxy);

        let config = ServerConfig::new(0)
            .with_bind_hosts(["127.0.0.1"])
            .with_limits(server_limits);
        gateway.start(&config).expect("gateway should start");

        let addr = gateway.local_addrs()[0];
        Self { gateway, addr }
    }

    /// Starts a gateway in front of a [`RecordingHost`].
    pub fn recording(limits: ExecutionLimits) -> (Self, Arc<Mutex<Vec<String>>>) {
        let scripts = Arc::new(Mutex::new(Vec::new()));
        let host = RecordingHost {
            scripts: scripts.clone(),
        };
        (Self::start(move || Ok(host), limits), scripts)
    }

    /// Base URL of the gateway, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.url(), path)
    }
}
