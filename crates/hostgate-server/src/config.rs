//! Server configuration
//!
//! A [`ServerConfig`] is built once at startup, usually from a single optional
//! port parameter, and is not consulted again after the listener binds.
//!
//! By default the gateway binds three hosts on the same port:
//!
//! - `127.0.0.1`
//! - `localhost`
//! - the machine's primary IPv4 address, when one can be found
//!
//! Host names are resolved to IPv4 addresses and duplicates are dropped, so
//! `localhost` and `127.0.0.1` end up as a single socket.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use hostgate_common::protocol::error::{GatewayError, Result, StartError};

use crate::resource_limits::ExecutionLimits;

/// Port used when the startup parameter is absent or empty.
pub const DEFAULT_PORT: u16 = 8080;

/// Loopback host bound by default.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Local host name alias bound by default.
pub const LOCALHOST_ALIAS: &str = "localhost";

/// Listener configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Port shared by every bound host. `0` asks the OS for an ephemeral port
    /// per address.
    pub port: u16,
    /// Hosts to bind, as IP literals or resolvable names
    pub bind_hosts: Vec<String>,
    /// Request and execution limits
    pub limits: ExecutionLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

impl ServerConfig {
    /// Creates a configuration for `port` with the default bind hosts.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            bind_hosts: default_bind_hosts(),
            limits: ExecutionLimits::default(),
        }
    }

    /// Builds a configuration from the optional startup parameter.
    ///
    /// An absent or blank parameter selects [`DEFAULT_PORT`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the parameter is not a port in
    /// 1..=65535.
    ///
    /// # Example
    ///
    /// ```
    /// use hostgate_server::{ServerConfig, DEFAULT_PORT};
    ///
    /// assert_eq!(ServerConfig::from_param(None).unwrap().port, DEFAULT_PORT);
    /// assert_eq!(ServerConfig::from_param(Some("")).unwrap().port, DEFAULT_PORT);
    /// assert_eq!(ServerConfig::from_param(Some("9000")).unwrap().port, 9000);
    /// assert!(ServerConfig::from_param(Some("0")).is_err());
    /// ```
    pub fn from_param(param: Option<&str>) -> Result<Self> {
        let param = param.map(str::trim).unwrap_or_default();
        if param.is_empty() {
            return Ok(Self::default());
        }

        match param.parse::<u16>() {
            Ok(port) if port != 0 => Ok(Self::new(port)),
            _ => Err(GatewayError::Config(format!(
                "invalid port '{}': expected a number between 1 and 65535",
                param
            ))),
        }
    }

    /// Replaces the bind hosts.
    pub fn with_bind_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bind_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the limits.
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Resolves the bind hosts into the socket addresses to listen on.
    ///
    /// IP literals are used as given. Names are resolved and only their IPv4
    /// addresses are kept. The result is deduplicated, first occurrence wins.
    ///
    /// # Errors
    ///
    /// - [`StartError::Resolve`] if a name cannot be resolved
    /// - [`StartError::NoAddresses`] if nothing is left to bind
    pub fn resolve_addrs(&self) -> std::result::Result<Vec<SocketAddr>, StartError> {
        let mut seen = HashSet::new();
        let mut addrs = Vec::new();

        for host in &self.bind_hosts {
            let host = host.trim();
            if host.is_empty() {
                continue;
            }

            let candidates: Vec<SocketAddr> = match host.parse::<IpAddr>() {
                Ok(ip) => vec![SocketAddr::new(ip, self.port)],
                Err(_) => (host, self.port)
                    .to_socket_addrs()
                    .map_err(|source| StartError::Resolve {
                        host: host.to_string(),
                        source,
                    })?
                    .filter(SocketAddr::is_ipv4)
                    .collect(),
            };

            for addr in candidates {
                if seen.insert(addr) {
                    addrs.push(addr);
                }
            }
        }

        if addrs.is_empty() {
            return Err(StartError::NoAddresses);
        }

        Ok(addrs)
    }
}

/// The default bind hosts: loopback, the `localhost` alias and, if known, the
/// primary IPv4 address.
pub fn default_bind_hosts() -> Vec<String> {
    let mut hosts = vec![LOOPBACK_HOST.to_string(), LOCALHOST_ALIAS.to_string()];
    if let Some(ip) = primary_ipv4() {
        hosts.push(ip.to_string());
    }
    hosts
}

/// Finds the IPv4 address this machine would use for outbound traffic.
///
/// Connecting a UDP socket only selects a route; no packet is sent. Returns
/// `None` on machines without a usable route.
pub fn primary_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;

    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}
