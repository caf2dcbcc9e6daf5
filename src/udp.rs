//! UDP front end: one datagram, one decision, one reply byte.

use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{error, info};

use crate::engine::{DecisionEngine, Protocol};

/// Datagrams are read into a buffer this large; anything longer is
/// truncated and will almost certainly fail parsing.
pub const MAX_DATAGRAM: usize = 128;

/// Run the UDP receive loop until the shutdown signal fires.
///
/// Each datagram is copied into a fresh buffer and handed to a short-lived
/// task that decides and replies to the source address. Concurrent
/// `send_to` calls on the shared socket are safe, so reply tasks never
/// serialize behind each other.
pub async fn run(
    socket: Arc<UdpSocket>,
    engine: DecisionEngine,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("udp server closed");
                return;
            }
            received = socket.recv_from(&mut buf) => {
                let (len, addr) = match received {
                    Ok(received) => received,
                    Err(err) => {
                        error!(error = %err, "udp read error");
                        continue;
                    }
                };
                let started = Instant::now();
                let data = buf[..len].to_vec();
                let socket = socket.clone();
                let engine = engine.clone();
                tokio::spawn(async move {
                    let text = String::from_utf8_lossy(&data);
                    let decision = engine.decide_line(Protocol::Udp, &text);
                    if let Err(err) = socket.send_to(&[decision.as_byte()], addr).await {
                        error!(%addr, error = %err, "udp failed to send reply");
                    }
                    engine.metrics().udp_request_duration.observe(started.elapsed().as_secs_f64());
                });
            }
        }
    }
}
