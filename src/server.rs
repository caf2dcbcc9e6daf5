//! The supervisor: binds both front ends, fans out the long-running
//! activities, and coordinates graceful shutdown.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::Config;
use crate::engine::DecisionEngine;
use crate::metrics::Metrics;
use crate::store::AccountStore;
use crate::{exposition, refill, tcp, udp};

/// A fatal startup failure.
#[derive(Debug)]
pub enum ServerError {
    /// A socket could not be bound or inspected.
    Bind { addr: SocketAddr, source: io::Error },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { addr, source } => write!(f, "failed to bind {}: {}", addr, source),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind { source, .. } => Some(source),
        }
    }
}

/// A bound but not-yet-running service instance.
///
/// Binding is separated from running so that startup failures surface
/// before any activity is spawned, and so tests can bind port 0 and read
/// back the real address.
pub struct Server {
    udp: Arc<UdpSocket>,
    tcp: TcpListener,
    metrics_addr: SocketAddr,
    engine: DecisionEngine,
    store: Arc<AccountStore>,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind the UDP socket and TCP listener on the configured port.
    ///
    /// Both front ends share one port number; when the configured port is 0
    /// the TCP listener reuses whatever port the kernel handed the UDP
    /// socket.
    pub async fn bind(config: &Config, metrics: Metrics) -> Result<Self, ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let udp = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = udp
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let tcp_addr = SocketAddr::from(([0, 0, 0, 0], local_addr.port()));
        let tcp = TcpListener::bind(tcp_addr)
            .await
            .map_err(|source| ServerError::Bind { addr: tcp_addr, source })?;

        let store = Arc::new(AccountStore::new());
        let engine = DecisionEngine::new(store.clone(), metrics);
        Ok(Self {
            udp: Arc::new(udp),
            tcp,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], config.metrics_port)),
            engine,
            store,
            local_addr,
        })
    }

    /// The address both front ends are bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The store backing this instance's decisions.
    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    /// Run the four long-running activities (UDP front end, TCP front end,
    /// refill clock, metrics exposition) until the shutdown signal fires,
    /// then wait for all of them to finish.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!(port = self.local_addr.port(), "listening on udp and tcp");

        let activities = [
            tokio::spawn(udp::run(self.udp, self.engine.clone(), shutdown.clone())),
            tokio::spawn(tcp::run(self.tcp, self.engine.clone(), shutdown.clone())),
            tokio::spawn(refill::run(self.store.clone(), shutdown.clone())),
            tokio::spawn(exposition::run(
                self.metrics_addr,
                self.engine.metrics().clone(),
                shutdown,
            )),
        ];
        for activity in activities {
            if let Err(err) = activity.await {
                error!(error = %err, "activity ended abnormally");
            }
        }
        info!("all activities stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[tokio::test]
    async fn bind_reports_the_chosen_port() {
        let config = Config { port: 0, metrics_port: 0 };
        let metrics = Metrics::new(Registry::new()).unwrap();
        let server = Server::bind(&config, metrics).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn run_drains_after_shutdown_signal() {
        let config = Config { port: 0, metrics_port: 0 };
        let metrics = Metrics::new(Registry::new()).unwrap();
        let server = Server::bind(&config, metrics).await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let running = tokio::spawn(server.run(shutdown_rx));
        shutdown_tx.send(true).unwrap();
        running.await.unwrap();
    }
}
