//! Gateway lifecycle
//!
//! A [`Gateway`] owns the listener for one host. It moves through three
//! states, never backwards:
//!
//! ```text
//! Unbound --start()--> Listening --/exit--> Stopped
//! ```
//!
//! `start` binds every configured address on the calling thread, so bind
//! errors come back to the caller, and then hands the sockets to a single
//! `hostgate-listener` worker thread. Calling `start` again while listening
//! does nothing. A stopped gateway cannot be restarted.
//!
//! The worker closes its sockets and flips the state to `Stopped` while
//! holding the state lock, so anyone who observes `Stopped` can rely on new
//! connections being refused.

use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use hostgate_common::StartError;
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::http_server::HttpServer;
use crate::runtime::HostProxy;

/// Name of the listener worker thread.
pub const LISTENER_THREAD_NAME: &str = "hostgate-listener";

/// Where a gateway is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Created, nothing bound yet
    Unbound,
    /// Sockets bound and the worker is accepting
    Listening,
    /// The worker has exited; sockets are closed
    Stopped,
}

struct Inner {
    state: ListenerState,
    local_addrs: Vec<SocketAddr>,
    worker: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ListenerState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Closes the worker's sockets and marks the gateway stopped.
    fn finish(&self, listeners: Vec<tokio::net::TcpListener>) {
        let mut inner = self.lock();
        drop(listeners);
        inner.state = ListenerState::Stopped;
        self.state_tx.send_replace(ListenerState::Stopped);
        tracing::info!("Listener stopped");
    }
}

/// The HTTP gateway in front of one host.
///
/// # Example
///
/// ```no_run
/// use hostgate_server::{BoaHost, ExecutionLimits, Gateway, HostProxy, ServerConfig};
///
/// let proxy = HostProxy::spawn(BoaHost::new, ExecutionLimits::default()).unwrap();
/// let gateway = Gateway::new(proxy);
/// gateway.start(&ServerConfig::default()).unwrap();
/// gateway.wait();
/// ```
pub struct Gateway {
    proxy: HostProxy,
    shared: Arc<Shared>,
}

impl Gateway {
    /// Creates an unbound gateway that will dispatch to `proxy`.
    pub fn new(proxy: HostProxy) -> Self {
        let (state_tx, _) = watch::channel(ListenerState::Unbound);
        Self {
            proxy,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: ListenerState::Unbound,
                    local_addrs: Vec::new(),
                    worker: None,
                }),
                state_tx,
            }),
        }
    }

    /// Binds every configured address and starts the listener worker.
    ///
    /// The request body cap comes from `config.limits`; the execution bound
    /// is the one the proxy was spawned with.
    ///
    /// Returns `Ok(())` without doing anything if the gateway is already
    /// listening. On error nothing is left bound and the gateway stays
    /// [`ListenerState::Unbound`].
    ///
    /// # Errors
    ///
    /// - [`StartError::AlreadyStopped`] once the gateway has stopped
    /// - [`StartError::AddrInUse`], [`StartError::Bind`] or
    ///   [`StartError::Unsupported`] if a socket cannot be bound
    /// - [`StartError::Resolve`] or [`StartError::NoAddresses`] for bad hosts
    /// - [`StartError::Spawn`] if the worker cannot be started
    pub fn start(&self, config: &ServerConfig) -> Result<(), StartError> {
        let mut inner = self.shared.lock();
        match inner.state {
            ListenerState::Listening => {
                tracing::debug!("Listener already running");
                return Ok(());
            }
            ListenerState::Stopped => return Err(StartError::AlreadyStopped),
            ListenerState::Unbound => {}
        }

        let addrs = config.resolve_addrs()?;
        let mut listeners = Vec::with_capacity(addrs.len());
        let mut local_addrs = Vec::with_capacity(addrs.len());

        for addr in addrs {
            let listener =
                std::net::TcpListener::bind(addr).map_err(|e| StartError::from_bind(addr, e))?;
            listener
                .set_nonblocking(true)
                .map_err(|e| StartError::from_bind(addr, e))?;
            let local = listener
                .local_addr()
                .map_err(|e| StartError::from_bind(addr, e))?;

            local_addrs.push(local);
            listeners.push(listener);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StartError::Spawn)?;

        let server = HttpServer::new(self.proxy.clone(), config.limits.max_body_bytes);
        let shared = self.shared.clone();

        let worker = thread::Builder::new()
            .name(LISTENER_THREAD_NAME.to_string())
            .spawn(move || {
                let served = panic::catch_unwind(AssertUnwindSafe(|| {
                    runtime.block_on(async move {
                        let listeners: Vec<_> = listeners
                            .into_iter()
                            .filter_map(|l| match tokio::net::TcpListener::from_std(l) {
                                Ok(listener) => Some(listener),
                                Err(e) => {
                                    tracing::error!("Failed to register listener: {}", e);
                                    None
                                }
                            })
                            .collect();

                        server.serve(&listeners).await;
                        listeners
                    })
                }));

                match served {
                    Ok(listeners) => shared.finish(listeners),
                    Err(_) => {
                        tracing::error!("Listener worker panicked");
                        shared.finish(Vec::new());
                    }
                }
            })
            .map_err(StartError::Spawn)?;

        for addr in &local_addrs {
            tracing::info!("Listening on http://{}", addr);
        }

        inner.state = ListenerState::Listening;
        inner.local_addrs = local_addrs;
        inner.worker = Some(worker);
        self.shared.state_tx.send_replace(ListenerState::Listening);

        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ListenerState {
        self.shared.lock().state
    }

    /// Addresses actually bound, with ephemeral ports filled in.
    ///
    /// Empty until the gateway has started.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.shared.lock().local_addrs.clone()
    }

    /// The proxy requests are dispatched to.
    pub fn proxy(&self) -> &HostProxy {
        &self.proxy
    }

    /// Blocks until the listener stops. Returns immediately if it never
    /// started.
    pub fn wait(&self) {
        let worker = self.shared.lock().worker.take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!("Listener worker exited abnormally");
            }
        }
    }

    /// Waits until the listener reaches [`ListenerState::Stopped`].
    ///
    /// Unlike [`wait`](Self::wait) this never blocks the thread, and it keeps
    /// waiting if the gateway has not started yet.
    pub async fn wait_async(&self) {
        let mut rx = self.shared.state_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state == ListenerState::Stopped).await;
    }
}
