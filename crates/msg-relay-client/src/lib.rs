//! Message Relay Client
//!
//! [`RelayTransport`] carries one party's side of a session through the
//! relay service. Messages to each peer are numbered in send order and the
//! receiver takes them back in the same order, so the relay never has to
//! know anything about rounds.

use dashmap::DashMap;
use mpc_bridge_core::transport::{async_trait, AsyncTransport};
use mpc_bridge_core::types::PartyId;
use mpc_bridge_core::{Error, Result, TransportConfig};
use msg_relay::wire::{PutRequest, TakeRequest, TakeResponse};
use msg_relay::MessageId;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// HTTP-based relay transport for one party in one session
pub struct RelayTransport {
    client: Client,
    url: String,
    session_id: String,
    me: PartyId,
    /// Next sequence number per receiving peer
    sent: DashMap<PartyId, u64>,
    /// Next sequence number per sending peer
    received: DashMap<PartyId, u64>,
    poll_interval: Duration,
    max_attempts: u32,
    request_timeout: Duration,
}

impl RelayTransport {
    pub fn new(url: &str, session_id: &str, me: PartyId) -> Self {
        Self::with_config(url, session_id, me, &TransportConfig::default())
    }

    /// Poll at the configured interval, giving up after one call timeout
    pub fn with_config(
        url: &str,
        session_id: &str,
        me: PartyId,
        config: &TransportConfig,
    ) -> Self {
        let poll_interval = config.poll_interval.max(Duration::from_millis(1));
        let max_attempts = (config.call_timeout.as_millis() / poll_interval.as_millis()).max(1);
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            session_id: session_id.to_string(),
            me,
            sent: DashMap::new(),
            received: DashMap::new(),
            poll_interval,
            max_attempts: u32::try_from(max_attempts).unwrap_or(u32::MAX),
            request_timeout: config.call_timeout,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn send_seq(&self, to: PartyId) -> u64 {
        self.sent.get(&to).map(|s| *s).unwrap_or(0)
    }

    async fn put(&self, req: &PutRequest) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/v1/msg", self.url))
            .json(req)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "relay rejected {}: {}",
                req.id,
                response.status()
            )));
        }
        Ok(())
    }

    /// One take attempt; `None` while the message has not arrived
    async fn try_take(&self, id: &MessageId) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .post(format!("{}/v1/msg/take", self.url))
            .json(&TakeRequest { id: id.clone() })
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: TakeResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::Transport(e.to_string()))?;
                let payload = body
                    .payload()
                    .map_err(|e| Error::Transport(e.to_string()))?;
                Ok(Some(payload))
            }
            status => Err(Error::Transport(format!("take {id} failed: {status}"))),
        }
    }
}

#[async_trait]
impl AsyncTransport for RelayTransport {
    #[instrument(skip(self, message), fields(me = self.me, size = message.len()))]
    async fn send(&self, to: PartyId, message: Vec<u8>) -> Result<()> {
        // Only a message the relay accepted uses up its number
        let seq = self.send_seq(to);
        let id = MessageId::new(&self.session_id, self.me, to, seq);
        self.put(&PutRequest::new(id, &message)).await?;
        self.sent.insert(to, seq + 1);
        debug!(seq, "Message posted");
        Ok(())
    }

    #[instrument(skip(self), fields(me = self.me))]
    async fn receive(&self, from: PartyId) -> Result<Vec<u8>> {
        let seq = self.received.get(&from).map(|s| *s).unwrap_or(0);
        let id = MessageId::new(&self.session_id, from, self.me, seq);

        for attempt in 0..self.max_attempts {
            if let Some(payload) = self.try_take(&id).await? {
                self.received.insert(from, seq + 1);
                debug!(seq, attempt, "Message received");
                return Ok(payload);
            }
            trace!(seq, attempt, "Message not yet available");
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(Error::Transport(format!(
            "no message {id} after {} attempts",
            self.max_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpc_bridge_core::ops;
    use mpc_bridge_core::session::{Job2P, JobMp};
    use mpc_bridge_core::transport::{run_blocking, BlockingTransport};
    use mpc_bridge_core::{EngineConfig, SoftEngine};
    use msg_relay::{new_session_id, MessageStore};
    use msg_relay_svc::{serve, AppState};
    use std::sync::Arc;
    use tokio::runtime::Handle;

    async fn start_relay() -> String {
        start_relay_with(MessageStore::default()).await
    }

    async fn start_relay_with(store: MessageStore) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, AppState::new(store)));
        format!("http://{addr}")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_messages_arrive_in_send_order() {
        let url = start_relay().await;
        let session = new_session_id();
        let a = RelayTransport::new(&url, &session, 0);
        let b = RelayTransport::new(&url, &session, 1);

        a.send(1, b"first".to_vec()).await.unwrap();
        a.send(1, b"second".to_vec()).await.unwrap();
        b.send(0, b"reply".to_vec()).await.unwrap();

        assert_eq!(b.receive(0).await.unwrap(), b"first");
        assert_eq!(b.receive(0).await.unwrap(), b"second");
        assert_eq!(a.receive(1).await.unwrap(), b"reply");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_send_keeps_its_sequence_number() {
        let store = MessageStore::default();
        let url = start_relay_with(store.clone()).await;
        let session = new_session_id();
        let a = RelayTransport::new(&url, &session, 0);
        let b = RelayTransport::new(&url, &session, 1);

        let slot = MessageId::new(&session, 0, 1, 0);
        store.put(slot.clone(), b"squatter".to_vec()).unwrap();
        assert!(matches!(a.send(1, b"first".to_vec()).await, Err(Error::Transport(_))));

        store.take(&slot).unwrap();
        a.send(1, b"first".to_vec()).await.unwrap();
        assert_eq!(b.receive(0).await.unwrap(), b"first");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_receive_gives_up() {
        let url = start_relay().await;
        let config = TransportConfig {
            call_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(20),
        };
        let b = RelayTransport::with_config(&url, "quiet", 1, &config);
        assert!(matches!(b.receive(0).await, Err(Error::Transport(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sessions_are_isolated() {
        let url = start_relay().await;
        let a = RelayTransport::new(&url, "one", 0);
        let config = TransportConfig {
            call_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(20),
        };
        let other = RelayTransport::with_config(&url, "two", 1, &config);
        a.send(1, b"x".to_vec()).await.unwrap();
        assert!(other.receive(0).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_two_party_agreement_over_relay() {
        let url = start_relay().await;
        let session = new_session_id();
        let config = TransportConfig::default();

        let runs = (0..2u32).map(|i| {
            let transport = BlockingTransport::new(
                Arc::new(RelayTransport::with_config(&url, &session, i, &config)),
                Handle::current(),
                &config,
            );
            run_blocking(move || {
                let mut job = Job2P::new(transport, i as usize, ["alice", "bob"])?;
                ops::agree::agree_random(&SoftEngine::default(), &mut job, 256)
            })
        });
        let out: Vec<Vec<u8>> = futures_join(runs).await;
        assert_eq!(out[0].len(), 32);
        assert_eq!(out[0], out[1]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_three_party_ecdsa_over_relay() {
        let url = start_relay().await;
        let session = new_session_id();
        let config = TransportConfig::default();
        let engine = Arc::new(
            SoftEngine::new(EngineConfig {
                paillier_prime_bits: 512,
                ..EngineConfig::default()
            })
            .unwrap(),
        );
        let hash = [7u8; 32];

        let runs = (0..3u32).map(|i| {
            let transport = BlockingTransport::new(
                Arc::new(RelayTransport::with_config(&url, &session, i, &config)),
                Handle::current(),
                &config,
            );
            let engine = engine.clone();
            run_blocking(move || {
                let mut job = JobMp::new(transport, i as usize, ["a", "b", "c"])?;
                let curve = mpc_bridge_core::Curve::Secp256k1;
                let (key, _sid) = ops::ecdsamp::dkg(engine.as_ref(), &mut job, curve)?;
                ops::ecdsamp::sign(engine.as_ref(), &mut job, &key, &hash, 0)
            })
        });
        let out = futures_join(runs).await;
        assert!(!out[0].is_empty());
        assert!(out[1].is_empty() && out[2].is_empty());
    }

    async fn futures_join<T, F>(runs: impl Iterator<Item = F>) -> Vec<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let handles: Vec<_> = runs.collect();
        let mut out = Vec::with_capacity(handles.len());
        for result in futures_util::future::join_all(handles).await {
            out.push(result.unwrap());
        }
        out
    }
}
