//! Outbound side of the exchange
//!
//! For one destination: dial with bounded retry, stream the bucket, write the
//! sentinel, close. A destination with an empty bucket still gets a
//! connection carrying only the sentinel.

use crate::config::Config;
use crate::error::ExchangeError;
use crate::exchange::protocol::write_stream;
use crate::partition::BucketMap;
use crate::record::Record;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How hard to try reaching a peer that is not listening yet
#[derive(Debug, Clone, Copy)]
pub struct DialPolicy {
    /// Total connection attempts before giving up
    pub attempts: u32,
    /// Sleep after each failed attempt
    pub backoff: Duration,
}

impl Default for DialPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            backoff: Duration::from_secs(1),
        }
    }
}

impl DialPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.exchange.dial_attempts,
            backoff: config.exchange.dial_backoff(),
        }
    }
}

/// Sends buckets to peers
#[derive(Debug, Clone, Copy, Default)]
pub struct Sender {
    policy: DialPolicy,
}

impl Sender {
    pub fn new(policy: DialPolicy) -> Self {
        Self { policy }
    }

    /// Deliver `records` followed by the sentinel to `host:port`
    pub async fn send(&self, host: &str, port: u16, records: &[Record]) -> Result<(), ExchangeError> {
        let addr = dial_target(host, port);
        let stream = self.dial(&addr).await?;

        debug!(dest = %addr, records = records.len(), "sending bucket");

        let mut writer = BufWriter::new(stream);
        write_stream(&mut writer, records)
            .await
            .map_err(|source| ExchangeError::SendFailed { addr: addr.clone(), source })?;
        writer
            .shutdown()
            .await
            .map_err(|source| ExchangeError::SendFailed { addr: addr.clone(), source })?;

        info!(dest = %addr, records = records.len(), "done sending records");
        Ok(())
    }

    /// Connect, retrying connection-level failures up to the attempt budget
    async fn dial(&self, addr: &str) -> Result<TcpStream, ExchangeError> {
        for attempt in 1..=self.policy.attempts {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) if is_transient(&e) => {
                    warn!(
                        dest = %addr,
                        attempt,
                        max = self.policy.attempts,
                        error = %e,
                        "dial failed, retrying"
                    );
                    sleep(self.policy.backoff).await;
                }
                Err(source) => {
                    return Err(ExchangeError::DialFailed {
                        addr: addr.to_string(),
                        source,
                    })
                }
            }
        }

        Err(ExchangeError::DialExhausted {
            addr: addr.to_string(),
            attempts: self.policy.attempts,
        })
    }
}

/// Send every peer its bucket, one peer at a time
///
/// Peers are visited in topology order. `local_id` is skipped since its
/// bucket never leaves this node. The first failure ends the broadcast.
pub async fn broadcast(
    config: &Config,
    local_id: usize,
    buckets: &BucketMap,
    sender: Sender,
) -> Result<(), ExchangeError> {
    info!("start broadcasting");

    for server in &config.servers {
        if server.server_id == local_id {
            debug!(server_id = server.server_id, "local bucket, not sending");
            continue;
        }

        let bucket = buckets
            .get(&server.server_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        sender.send(&server.host, server.port, bucket).await?;
    }

    info!("end broadcasting");
    Ok(())
}

/// `host:port`, with `localhost` pinned to the IPv4 loopback
fn dial_target(host: &str, port: u16) -> String {
    let host = if host == "localhost" { "127.0.0.1" } else { host };
    format!("{}:{}", host, port)
}

/// Connection-level failures worth retrying
fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::AddrNotAvailable
            | ErrorKind::TimedOut
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExchangeConfig, ServerEntry};
    use crate::exchange::protocol::{decode_stream, read_to_close};
    use crate::record::record_with_key;
    use tokio::net::TcpListener;

    fn fast_policy(attempts: u32) -> DialPolicy {
        DialPolicy {
            attempts,
            backoff: Duration::from_millis(50),
        }
    }

    /// Reserve a loopback port that nothing is listening on
    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn accept_one(listener: TcpListener) -> Vec<Record> {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (bytes, err) = read_to_close(&mut stream).await;
        assert!(err.is_none());
        decode_stream(&bytes).unwrap()
    }

    #[test]
    fn test_dial_target_normalizes_localhost() {
        assert_eq!(dial_target("localhost", 8080), "127.0.0.1:8080");
        assert_eq!(dial_target("10.0.1.10", 9), "10.0.1.10:9");
    }

    #[test]
    fn test_is_transient() {
        assert!(is_transient(&std::io::Error::from(ErrorKind::ConnectionRefused)));
        assert!(is_transient(&std::io::Error::from(ErrorKind::TimedOut)));
        assert!(!is_transient(&std::io::Error::from(ErrorKind::InvalidInput)));
        assert!(!is_transient(&std::io::Error::from(ErrorKind::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_send_delivers_records_and_sentinel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let records = vec![record_with_key(&[0x90]), record_with_key(&[0xA0])];

        let receiver = tokio::spawn(accept_one(listener));
        Sender::new(fast_policy(3))
            .send("localhost", port, &records)
            .await
            .unwrap();

        assert_eq!(receiver.await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_send_empty_bucket_is_fin_only() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let receiver = tokio::spawn(accept_one(listener));
        Sender::new(fast_policy(3)).send("127.0.0.1", port, &[]).await.unwrap();

        assert!(receiver.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dial_retries_until_listener_starts() {
        let port = free_port();
        let records = vec![record_with_key(&[0x42])];

        // Listener comes up three backoff intervals after the first dial.
        let receiver = tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            accept_one(listener).await
        });

        Sender::new(fast_policy(10))
            .send("127.0.0.1", port, &records)
            .await
            .unwrap();

        assert_eq!(receiver.await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_dial_exhausts_budget() {
        let port = free_port();
        let err = Sender::new(fast_policy(3))
            .send("127.0.0.1", port, &[record_with_key(&[1])])
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::DialExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_broadcast_skips_self_and_sends_fin_to_empty_peers() {
        let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let config = Config {
            servers: vec![
                ServerEntry { server_id: 0, host: "127.0.0.1".into(), port: free_port() },
                ServerEntry {
                    server_id: 1,
                    host: "127.0.0.1".into(),
                    port: listener_a.local_addr().unwrap().port(),
                },
                ServerEntry {
                    server_id: 2,
                    host: "127.0.0.1".into(),
                    port: listener_b.local_addr().unwrap().port(),
                },
            ],
            exchange: ExchangeConfig::default(),
        };

        let mut buckets = BucketMap::new();
        buckets.insert(0, vec![record_with_key(&[0x00])]);
        buckets.insert(1, vec![record_with_key(&[0x60]), record_with_key(&[0x70])]);

        let peer_a = tokio::spawn(accept_one(listener_a));
        let peer_b = tokio::spawn(accept_one(listener_b));

        broadcast(&config, 0, &buckets, Sender::new(fast_policy(3))).await.unwrap();

        assert_eq!(peer_a.await.unwrap(), buckets[&1]);
        assert!(peer_b.await.unwrap().is_empty());
    }
}
