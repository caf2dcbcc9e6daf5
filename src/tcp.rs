//! TCP front end: line-oriented connections, one decision per line.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, error, info, warn};

use crate::engine::{DecisionEngine, Protocol};

/// Longest accepted request line.
pub const MAX_LINE: usize = 1024;

/// A connection that stays silent this long is closed. The deadline is
/// re-armed after every successfully read line.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the accept loop until the shutdown signal fires.
///
/// Each accepted connection gets its own task; accept errors are logged and
/// the loop keeps going.
pub async fn run(
    listener: TcpListener,
    engine: DecisionEngine,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("tcp server closed");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(handle_connection(stream, peer, engine.clone()));
                    }
                    Err(err) => error!(error = %err, "tcp accept error"),
                }
            }
        }
    }
}

/// Serve one connection: read newline-delimited requests, answer each with
/// a decision byte plus newline, until idle timeout, EOF, or an error.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, engine: DecisionEngine) {
    let metrics = engine.metrics().clone();
    metrics.tcp_sockets.inc();
    debug!(%peer, "tcp connection opened");

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_LINE));

    loop {
        let line = match timeout(IDLE_TIMEOUT, lines.next()).await {
            Err(_) => {
                debug!(%peer, "tcp connection idle, closing");
                break;
            }
            Ok(None) => {
                debug!(%peer, "tcp connection closed by peer");
                break;
            }
            Ok(Some(Err(err))) => {
                warn!(%peer, error = %err, "tcp read error");
                break;
            }
            Ok(Some(Ok(line))) => line,
        };

        let started = Instant::now();
        let decision = engine.decide_line(Protocol::Tcp, &line);
        if let Err(err) = write_half.write_all(&[decision.as_byte(), b'\n']).await {
            error!(%peer, error = %err, "tcp failed to send reply");
            break;
        }
        metrics.tcp_request_duration.observe(started.elapsed().as_secs_f64());
    }

    metrics.tcp_sockets.dec();
}
