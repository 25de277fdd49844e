//! In-memory loopback network for testing
//!
//! Messages live in per-(from, to, seq) slots, so every ordered pair of parties
//! behaves as an independent FIFO link. Each party drives its own
//! [`MemoryEndpoint`], usually from its own thread.

use super::Transport;
use crate::types::PartyId;
use crate::{Error, Result};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
struct SlotKey {
    from: PartyId,
    to: PartyId,
    seq: u64,
}

struct Inner {
    /// Undelivered messages
    slots: DashMap<SlotKey, Vec<u8>>,
    /// Registered parties
    parties: Vec<PartyId>,
    /// Wakes receivers when a slot is filled
    arrived: Condvar,
    lock: Mutex<()>,
}

/// In-memory network shared by a fixed set of parties
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<Inner>,
}

impl MemoryNetwork {
    /// Create a network for the given parties
    pub fn new(parties: impl IntoIterator<Item = PartyId>) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: DashMap::new(),
                parties: parties.into_iter().collect(),
                arrived: Condvar::new(),
                lock: Mutex::new(()),
            }),
        }
    }

    /// Create a network for parties `0..count`
    pub fn with_parties(count: usize) -> Self {
        Self::new(0..count as PartyId)
    }

    /// Endpoint for one registered party
    pub fn endpoint(&self, me: PartyId) -> Result<MemoryEndpoint> {
        if !self.inner.parties.contains(&me) {
            return Err(Error::BadArgument(format!("party {me} is not on this network")));
        }
        Ok(MemoryEndpoint {
            inner: self.inner.clone(),
            me,
            send_seq: HashMap::new(),
            recv_seq: HashMap::new(),
            timeout: None,
        })
    }

    /// One endpoint per registered party, in registration order
    pub fn endpoints(&self) -> Vec<MemoryEndpoint> {
        self.inner
            .parties
            .iter()
            .filter_map(|p| self.endpoint(*p).ok())
            .collect()
    }

    /// Messages sent but not yet received
    pub fn pending(&self) -> usize {
        self.inner.slots.len()
    }
}

/// One party's view of a [`MemoryNetwork`]
pub struct MemoryEndpoint {
    inner: Arc<Inner>,
    me: PartyId,
    send_seq: HashMap<PartyId, u64>,
    recv_seq: HashMap<PartyId, u64>,
    timeout: Option<Duration>,
}

impl MemoryEndpoint {
    /// Fail receives that wait longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// This endpoint's identity
    pub fn id(&self) -> PartyId {
        self.me
    }

    fn check_peer(&self, peer: PartyId) -> Result<()> {
        if peer == self.me {
            return Err(Error::Transport(format!("party {peer} cannot message itself")));
        }
        if !self.inner.parties.contains(&peer) {
            return Err(Error::Transport(format!("unknown peer {peer}")));
        }
        Ok(())
    }

    fn wait_for(&self, key: SlotKey) -> Result<Vec<u8>> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some((_, message)) = self.inner.slots.remove(&key) {
                return Ok(message);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(Error::Transport(format!(
                        "timed out waiting for message {} from party {}",
                        key.seq, key.from
                    )));
                }
            }
            // bounded wait covers a notify racing the slot check
            guard = self
                .inner
                .arrived
                .wait_timeout(guard, POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

impl Transport for MemoryEndpoint {
    fn send(&mut self, to: PartyId, message: &[u8]) -> Result<()> {
        self.check_peer(to)?;
        let seq = self.send_seq.entry(to).or_insert(0);
        let key = SlotKey {
            from: self.me,
            to,
            seq: *seq,
        };
        *seq += 1;

        self.inner.slots.insert(key, message.to_vec());
        let _guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.arrived.notify_all();
        Ok(())
    }

    fn receive(&mut self, from: PartyId) -> Result<Vec<u8>> {
        self.check_peer(from)?;
        let seq = *self.recv_seq.get(&from).unwrap_or(&0);
        let message = self.wait_for(SlotKey {
            from,
            to: self.me,
            seq,
        })?;
        self.recv_seq.insert(from, seq + 1);
        Ok(message)
    }

    /// Resolves senders in ascending id order, then answers in request order
    fn receive_all(&mut self, from: &[PartyId]) -> Result<Vec<Vec<u8>>> {
        let mut order: Vec<usize> = (0..from.len()).collect();
        order.sort_by_key(|i| from[*i]);

        let mut messages = vec![Vec::new(); from.len()];
        for i in order {
            messages[i] = self.receive(from[i])?;
        }
        debug!(party = self.me, count = from.len(), "Batch received");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_per_link() {
        let net = MemoryNetwork::with_parties(2);
        let mut a = net.endpoint(0).unwrap();
        let mut b = net.endpoint(1).unwrap();

        a.send(1, b"first").unwrap();
        a.send(1, b"second").unwrap();

        assert_eq!(b.receive(0).unwrap(), b"first");
        assert_eq!(b.receive(0).unwrap(), b"second");
        assert_eq!(net.pending(), 0);
    }

    #[test]
    fn test_rejects_self_and_unknown() {
        let net = MemoryNetwork::with_parties(2);
        let mut a = net.endpoint(0).unwrap();

        assert!(matches!(a.send(0, b"x"), Err(Error::Transport(_))));
        assert!(matches!(a.send(7, b"x"), Err(Error::Transport(_))));
        assert!(net.endpoint(9).is_err());
    }

    #[test]
    fn test_receive_blocks_until_sent() {
        let net = MemoryNetwork::with_parties(2);
        let mut a = net.endpoint(0).unwrap();
        let mut b = net.endpoint(1).unwrap();

        let handle = thread::spawn(move || b.receive(0).unwrap());
        thread::sleep(Duration::from_millis(20));
        a.send(1, b"late").unwrap();

        assert_eq!(handle.join().unwrap(), b"late");
    }

    #[test]
    fn test_receive_all_in_request_order() {
        let net = MemoryNetwork::with_parties(4);
        let mut eps = net.endpoints();
        let mut me = eps.remove(3);
        for (i, ep) in eps.iter_mut().enumerate() {
            ep.send(3, &[i as u8]).unwrap();
        }

        let messages = me.receive_all(&[2, 0, 1]).unwrap();
        assert_eq!(messages, vec![vec![2], vec![0], vec![1]]);
    }

    #[test]
    fn test_timeout() {
        let net = MemoryNetwork::with_parties(2);
        let mut b = net.endpoint(1).unwrap().with_timeout(Duration::from_millis(50));
        assert!(matches!(b.receive(0), Err(Error::Transport(_))));
    }
}
