//! Transport adapter between the engine and caller-supplied network primitives.
//!
//! The engine talks to a [`Channel`] using zero-based party indices. A
//! [`TransportAdapter`] implements that channel by resolving indices to
//! caller identities and forwarding to a [`Transport`]. The adapter is generic
//! over a [`Shape`]: two-party sessions never batch receives, multi-party
//! sessions forward `receive_all` as one scatter/gather call.

use crate::types::{PartyId, PartyIndex};
use crate::{Error, Result};
use std::marker::PhantomData;
use tracing::trace;

pub mod bridge;
pub mod memory;

pub use bridge::{async_trait, run_blocking, AsyncTransport, BlockingTransport, CancelFlag};
pub use memory::{MemoryEndpoint, MemoryNetwork};

/// Caller-supplied point-to-point primitives, keyed by party identity.
///
/// Any error returned here reaches the engine as [`Error::Transport`]. A
/// transport that needs bounded latency or cancellation enforces it itself by
/// failing the call.
pub trait Transport: Send {
    /// Deliver `message` to party `to`
    fn send(&mut self, to: PartyId, message: &[u8]) -> Result<()>;

    /// Block until the next message from party `from` arrives
    fn receive(&mut self, from: PartyId) -> Result<Vec<u8>>;

    /// Receive one message from each listed party, in the listed order
    fn receive_all(&mut self, from: &[PartyId]) -> Result<Vec<Vec<u8>>> {
        from.iter().map(|party| self.receive(*party)).collect()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, to: PartyId, message: &[u8]) -> Result<()> {
        (**self).send(to, message)
    }

    fn receive(&mut self, from: PartyId) -> Result<Vec<u8>> {
        (**self).receive(from)
    }

    fn receive_all(&mut self, from: &[PartyId]) -> Result<Vec<Vec<u8>>> {
        (**self).receive_all(from)
    }
}

/// Network interface the protocol engine drives, keyed by party index
pub trait Channel {
    /// Index of the local party
    fn party_index(&self) -> PartyIndex;

    /// Number of parties in the session
    fn party_count(&self) -> usize;

    /// Participant names, used for transcript binding
    fn party_names(&self) -> &[String];

    fn send(&mut self, to: PartyIndex, message: &[u8]) -> Result<()>;

    fn receive(&mut self, from: PartyIndex) -> Result<Vec<u8>>;

    /// Receive one message from each listed index, preserving order
    fn receive_all(&mut self, from: &[PartyIndex]) -> Result<Vec<Vec<u8>>>;

    /// Every index except the local one, ascending
    fn peers(&self) -> Vec<PartyIndex> {
        let me = self.party_index();
        (0..self.party_count()).filter(|i| *i != me).collect()
    }

    /// Send the same message to every peer
    fn broadcast(&mut self, message: &[u8]) -> Result<()> {
        for peer in self.peers() {
            self.send(peer, message)?;
        }
        Ok(())
    }

    /// Broadcast `message` and collect everyone's message for this round.
    ///
    /// The result is indexed by party, with the local message at the local
    /// index.
    fn exchange(&mut self, message: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.broadcast(message)?;
        let peers = self.peers();
        let received = self.receive_all(&peers)?;
        let mut all = vec![Vec::new(); self.party_count()];
        all[self.party_index()] = message.to_vec();
        for (peer, msg) in peers.into_iter().zip(received) {
            all[peer] = msg;
        }
        Ok(all)
    }

    /// Send a distinct message to every peer and collect one from each.
    ///
    /// `outgoing` is indexed by party; the local slot is ignored and the local
    /// slot of the result is empty.
    fn exchange_direct(&mut self, outgoing: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
        if outgoing.len() != self.party_count() {
            return Err(Error::BadArgument(format!(
                "expected {} outgoing messages, got {}",
                self.party_count(),
                outgoing.len()
            )));
        }
        let peers = self.peers();
        for peer in &peers {
            self.send(*peer, &outgoing[*peer])?;
        }
        let received = self.receive_all(&peers)?;
        let mut all = vec![Vec::new(); self.party_count()];
        for (peer, msg) in peers.into_iter().zip(received) {
            all[peer] = msg;
        }
        Ok(all)
    }
}

/// Party-count shape of a session
pub trait Shape: Send + 'static {
    /// Label used in logs
    const NAME: &'static str;

    /// Check a roster and local index for this shape
    fn validate(party_index: PartyIndex, names: &[String]) -> Result<()>;

    /// Shape-specific batched receive
    fn receive_all(
        adapter: &mut TransportAdapter<Self>,
        from: &[PartyIndex],
    ) -> Result<Vec<Vec<u8>>>
    where
        Self: Sized;
}

/// Exactly two parties; batched receives degenerate to a single receive
#[derive(Debug)]
pub struct TwoParty;

/// Two or more parties; batched receives are forwarded as one call
#[derive(Debug)]
pub struct MultiParty;

fn validate_names(names: &[String]) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(Error::BadArgument(format!("party name {i} is empty")));
        }
        if names[..i].contains(name) {
            return Err(Error::BadArgument(format!("duplicate party name {name:?}")));
        }
    }
    Ok(())
}

impl Shape for TwoParty {
    const NAME: &'static str = "2p";

    fn validate(party_index: PartyIndex, names: &[String]) -> Result<()> {
        if names.len() != 2 {
            return Err(Error::BadArgument(format!(
                "two-party session needs 2 names, got {}",
                names.len()
            )));
        }
        if party_index > 1 {
            return Err(Error::BadArgument(format!(
                "two-party index must be 0 or 1, got {party_index}"
            )));
        }
        validate_names(names)
    }

    fn receive_all(
        adapter: &mut TransportAdapter<Self>,
        from: &[PartyIndex],
    ) -> Result<Vec<Vec<u8>>> {
        match from {
            [single] => Ok(vec![adapter.receive(*single)?]),
            _ => Err(Error::BadArgument(format!(
                "two-party receive_all needs exactly one sender, got {}",
                from.len()
            ))),
        }
    }
}

impl Shape for MultiParty {
    const NAME: &'static str = "mp";

    fn validate(party_index: PartyIndex, names: &[String]) -> Result<()> {
        if names.len() < 2 {
            return Err(Error::BadArgument(format!(
                "multi-party session needs at least 2 names, got {}",
                names.len()
            )));
        }
        if party_index >= names.len() {
            return Err(Error::BadArgument(format!(
                "party index {party_index} out of range for {} parties",
                names.len()
            )));
        }
        validate_names(names)
    }

    fn receive_all(
        adapter: &mut TransportAdapter<Self>,
        from: &[PartyIndex],
    ) -> Result<Vec<Vec<u8>>> {
        let roles = from
            .iter()
            .map(|index| adapter.role_for(*index))
            .collect::<Result<Vec<_>>>()?;
        trace!(senders = ?roles, "receive_all");
        let messages = adapter
            .transport
            .receive_all(&roles)
            .map_err(into_transport)?;
        if messages.len() != roles.len() {
            return Err(Error::Transport(format!(
                "receive_all returned {} messages for {} senders",
                messages.len(),
                roles.len()
            )));
        }
        Ok(messages)
    }
}

/// Map a primitive's failure onto the transport category
fn into_transport(e: Error) -> Error {
    match e {
        Error::Transport(_) => e,
        other => Error::Transport(other.to_string()),
    }
}

/// Forwards engine channel calls to a caller [`Transport`]
pub struct TransportAdapter<S: Shape> {
    transport: Box<dyn Transport>,
    roles: Vec<PartyId>,
    _shape: PhantomData<S>,
}

impl<S: Shape> TransportAdapter<S> {
    /// Adapter with an explicit index to identity mapping
    pub fn new(transport: Box<dyn Transport>, roles: Vec<PartyId>) -> Self {
        Self {
            transport,
            roles,
            _shape: PhantomData,
        }
    }

    /// Adapter whose mapping is the identity over `0..count`
    pub fn identity(transport: Box<dyn Transport>, count: usize) -> Self {
        Self::new(transport, (0..count as PartyId).collect())
    }

    /// Number of mapped parties
    pub fn party_count(&self) -> usize {
        self.roles.len()
    }

    /// Resolve an engine index to the caller's identity
    pub fn role_for(&self, index: PartyIndex) -> Result<PartyId> {
        self.roles.get(index).copied().ok_or_else(|| {
            Error::BadArgument(format!(
                "party index {index} out of range for {} parties",
                self.roles.len()
            ))
        })
    }

    pub fn send(&mut self, to: PartyIndex, message: &[u8]) -> Result<()> {
        let role = self.role_for(to)?;
        trace!(to = role, len = message.len(), "send");
        self.transport.send(role, message).map_err(into_transport)
    }

    pub fn receive(&mut self, from: PartyIndex) -> Result<Vec<u8>> {
        let role = self.role_for(from)?;
        let message = self.transport.receive(role).map_err(into_transport)?;
        trace!(from = role, len = message.len(), "receive");
        Ok(message)
    }

    pub fn receive_all(&mut self, from: &[PartyIndex]) -> Result<Vec<Vec<u8>>> {
        S::receive_all(self, from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every call and answers receives with the sender id
    #[derive(Default, Clone)]
    struct Recorder {
        sent: Arc<Mutex<Vec<(PartyId, Vec<u8>)>>>,
        batches: Arc<Mutex<Vec<Vec<PartyId>>>>,
        fail: bool,
    }

    impl Transport for Recorder {
        fn send(&mut self, to: PartyId, message: &[u8]) -> Result<()> {
            if self.fail {
                return Err(Error::Crypto("callback status 7".into()));
            }
            self.sent.lock().unwrap().push((to, message.to_vec()));
            Ok(())
        }

        fn receive(&mut self, from: PartyId) -> Result<Vec<u8>> {
            if self.fail {
                return Err(Error::BadArgument("callback status 7".into()));
            }
            Ok(vec![from as u8])
        }

        fn receive_all(&mut self, from: &[PartyId]) -> Result<Vec<Vec<u8>>> {
            self.batches.lock().unwrap().push(from.to_vec());
            // resolve in ascending order, answer in request order
            let mut sorted = from.to_vec();
            sorted.sort_unstable();
            let resolved: Vec<(PartyId, Vec<u8>)> =
                sorted.into_iter().map(|p| (p, vec![p as u8])).collect();
            Ok(from
                .iter()
                .map(|p| resolved.iter().find(|(q, _)| q == p).unwrap().1.clone())
                .collect())
        }
    }

    #[test]
    fn test_two_party_send_routes_to_peer() {
        let recorder = Recorder::default();
        let mut adapter = TransportAdapter::<TwoParty>::identity(Box::new(recorder.clone()), 2);

        adapter.send(1, b"hello").unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[(1, b"hello".to_vec())]);
    }

    #[test]
    fn test_out_of_range_index_is_bad_argument() {
        let mut adapter = TransportAdapter::<TwoParty>::identity(Box::new(Recorder::default()), 2);
        assert!(matches!(adapter.send(2, b"x"), Err(Error::BadArgument(_))));
        assert!(matches!(adapter.receive(5), Err(Error::BadArgument(_))));
    }

    #[test]
    fn test_two_party_receive_all_needs_one_sender() {
        let recorder = Recorder::default();
        let mut adapter = TransportAdapter::<TwoParty>::identity(Box::new(recorder.clone()), 2);

        assert_eq!(adapter.receive_all(&[1]).unwrap(), vec![vec![1]]);
        assert!(matches!(adapter.receive_all(&[0, 1]), Err(Error::BadArgument(_))));
        assert!(matches!(adapter.receive_all(&[]), Err(Error::BadArgument(_))));
        // never batched
        assert!(recorder.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_multi_party_receive_all_preserves_order() {
        let recorder = Recorder::default();
        let mut adapter = TransportAdapter::<MultiParty>::identity(Box::new(recorder.clone()), 3);

        let messages = adapter.receive_all(&[2, 0, 1]).unwrap();

        assert_eq!(messages, vec![vec![2], vec![0], vec![1]]);
        assert_eq!(recorder.batches.lock().unwrap().as_slice(), &[vec![2, 0, 1]]);
    }

    #[test]
    fn test_mapping_is_applied() {
        let recorder = Recorder::default();
        let mut adapter = TransportAdapter::<MultiParty>::new(Box::new(recorder.clone()), vec![10, 20, 30]);

        adapter.send(2, b"m").unwrap();
        assert_eq!(adapter.receive(1).unwrap(), vec![20]);
        assert_eq!(adapter.receive_all(&[0, 2]).unwrap(), vec![vec![10], vec![30]]);
        assert_eq!(recorder.sent.lock().unwrap()[0].0, 30);
    }

    #[test]
    fn test_primitive_failures_become_transport_errors() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut adapter = TransportAdapter::<TwoParty>::identity(Box::new(recorder), 2);
        assert!(matches!(adapter.send(1, b"x"), Err(Error::Transport(_))));
        assert!(matches!(adapter.receive(1), Err(Error::Transport(_))));
    }

    #[test]
    fn test_validate_rosters() {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        TwoParty::validate(0, &names(&["P1", "P2"])).unwrap();
        assert!(TwoParty::validate(2, &names(&["P1", "P2"])).is_err());
        assert!(TwoParty::validate(0, &names(&["P1"])).is_err());
        assert!(TwoParty::validate(0, &names(&["P1", ""])).is_err());
        assert!(TwoParty::validate(0, &names(&["P1", "P1"])).is_err());

        MultiParty::validate(2, &names(&["a", "b", "c"])).unwrap();
        assert!(MultiParty::validate(3, &names(&["a", "b", "c"])).is_err());
        assert!(MultiParty::validate(0, &names(&["a"])).is_err());
    }
}
