//! Inbound side of the exchange
//!
//! The listener accepts connections indefinitely and spawns one handler per
//! connection, so all peers can stream at once. Each handler drains its
//! connection to EOF, checks the framing, and pushes the outcome onto the
//! aggregator channel.

use crate::error::ExchangeError;
use crate::exchange::protocol::{decode_stream, read_to_close, ConnectionResult};
use crate::exchange::InboundResult;
use std::net::SocketAddr;
use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Bound listener for peer connections
pub struct Receiver {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Receiver {
    /// Bind the listening socket
    ///
    /// Binding happens before the accept loop is spawned so a port conflict
    /// is reported to the caller directly.
    pub async fn bind(host: &str, port: u16) -> Result<Self, ExchangeError> {
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ExchangeError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ExchangeError::Bind { addr, source })?;

        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        info!(addr = %local_addr, hostname = %hostname, "listening for peers");

        Ok(Self { listener, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop on its own task
    pub fn spawn(self, results: mpsc::Sender<InboundResult>) -> JoinHandle<Result<(), ExchangeError>> {
        tokio::spawn(self.run(results))
    }

    /// Accept connections until an accept error occurs
    ///
    /// Never waits for a handler to finish.
    pub async fn run(self, results: mpsc::Sender<InboundResult>) -> Result<(), ExchangeError> {
        loop {
            let (stream, peer) = self.listener.accept().await.map_err(|e| {
                error!(error = %e, "accept failed");
                ExchangeError::Accept(e)
            })?;

            debug!(%peer, "peer connected");
            let results = results.clone();
            tokio::spawn(async move {
                let mut stream = stream;
                let outcome = drain_connection(&mut stream, peer).await;
                if results.send(outcome).await.is_err() {
                    debug!(%peer, "aggregator already finished, dropping result");
                }
            });
        }
    }
}

/// Read one peer's stream to EOF and validate its framing
///
/// A read error ends the read but not the node; framing is then judged on
/// whatever arrived.
pub async fn drain_connection<R>(reader: &mut R, peer: SocketAddr) -> InboundResult
where
    R: AsyncRead + Unpin,
{
    let (bytes, read_err) = read_to_close(reader).await;
    if let Some(e) = read_err {
        warn!(%peer, error = %e, bytes = bytes.len(), "read error, treating as end of stream");
    }

    match decode_stream(&bytes) {
        Ok(records) => {
            info!(%peer, records = records.len(), "received FIN");
            Ok(ConnectionResult {
                peer,
                records,
                clean: true,
            })
        }
        Err(framing) => {
            error!(%peer, bytes = bytes.len(), reason = %framing, "protocol violation");
            Err(ExchangeError::ProtocolViolation {
                peer,
                reason: framing.to_string(),
            })
        }
    }
}
