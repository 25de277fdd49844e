//! Protocol sessions (jobs)
//!
//! A [`Job`] binds a transport, the local party index and the participant
//! roster. It is created once, used for any number of strictly sequential
//! operations (each takes `&mut Job`), and released when dropped.

use crate::transport::{Channel, MultiParty, Shape, Transport, TransportAdapter, TwoParty};
use crate::types::PartyIndex;
use crate::Result;
use tracing::{debug, info};

/// Session over a fixed roster, generic over the party-count shape
pub struct Job<S: Shape> {
    adapter: TransportAdapter<S>,
    party_index: PartyIndex,
    names: Vec<String>,
}

/// Two-party session
pub type Job2P = Job<TwoParty>;

/// Multi-party session
pub type JobMp = Job<MultiParty>;

impl<S: Shape> Job<S> {
    /// Validate the roster and build a session whose index to identity
    /// mapping is the identity over the roster.
    pub fn new<T, I, N>(transport: T, party_index: PartyIndex, names: I) -> Result<Self>
    where
        T: Transport + 'static,
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        S::validate(party_index, &names)?;

        let adapter = TransportAdapter::identity(Box::new(transport), names.len());
        info!(
            shape = S::NAME,
            party_index,
            n_parties = names.len(),
            "Session created"
        );
        Ok(Self {
            adapter,
            party_index,
            names,
        })
    }

    /// Name of the local party
    pub fn name(&self) -> &str {
        &self.names[self.party_index]
    }
}

impl<S: Shape> Channel for Job<S> {
    fn party_index(&self) -> PartyIndex {
        self.party_index
    }

    fn party_count(&self) -> usize {
        self.names.len()
    }

    fn party_names(&self) -> &[String] {
        &self.names
    }

    fn send(&mut self, to: PartyIndex, message: &[u8]) -> Result<()> {
        self.adapter.send(to, message)
    }

    fn receive(&mut self, from: PartyIndex) -> Result<Vec<u8>> {
        self.adapter.receive(from)
    }

    fn receive_all(&mut self, from: &[PartyIndex]) -> Result<Vec<Vec<u8>>> {
        self.adapter.receive_all(from)
    }
}

impl<S: Shape> Drop for Job<S> {
    fn drop(&mut self) {
        debug!(shape = S::NAME, party_index = self.party_index, "Session released");
    }
}

impl<S: Shape> std::fmt::Debug for Job<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("shape", &S::NAME)
            .field("party_index", &self.party_index)
            .field("names", &self.names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryNetwork;
    use crate::Error;
    use std::thread;

    #[test]
    fn test_two_party_construction() {
        let net = MemoryNetwork::with_parties(2);
        let job = Job2P::new(net.endpoint(0).unwrap(), 0, ["P1", "P2"]).unwrap();
        assert_eq!(job.party_index(), 0);
        assert_eq!(job.party_count(), 2);
        assert_eq!(job.name(), "P1");
        assert_eq!(job.peers(), vec![1]);
    }

    #[test]
    fn test_two_party_rejects_bad_arguments() {
        let net = MemoryNetwork::with_parties(2);
        let bad = |index, names: Vec<&str>| {
            Job2P::new(net.endpoint(0).unwrap(), index, names).unwrap_err()
        };
        assert!(matches!(bad(2, vec!["P1", "P2"]), Error::BadArgument(_)));
        assert!(matches!(bad(0, vec!["P1", "P2", "P3"]), Error::BadArgument(_)));
        assert!(matches!(bad(0, vec!["P1", ""]), Error::BadArgument(_)));
    }

    #[test]
    fn test_multi_party_rejects_bad_arguments() {
        let net = MemoryNetwork::with_parties(3);
        assert!(JobMp::new(net.endpoint(0).unwrap(), 3, ["a", "b", "c"]).is_err());
        assert!(JobMp::new(net.endpoint(0).unwrap(), 0, ["a"]).is_err());
        assert!(JobMp::new(net.endpoint(0).unwrap(), 0, ["a", "b", "a"]).is_err());
        assert!(JobMp::new(net.endpoint(0).unwrap(), 2, ["a", "b", "c"]).is_ok());
    }

    #[test]
    fn test_exchange_between_sessions() {
        let net = MemoryNetwork::with_parties(3);
        let handles: Vec<_> = net
            .endpoints()
            .into_iter()
            .enumerate()
            .map(|(i, ep)| {
                thread::spawn(move || {
                    let mut job = JobMp::new(ep, i, ["a", "b", "c"]).unwrap();
                    job.exchange(&[i as u8]).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![vec![0], vec![1], vec![2]]);
        }
    }

    #[test]
    fn test_two_party_routing_over_loopback() {
        let net = MemoryNetwork::with_parties(2);
        let mut p0 = Job2P::new(net.endpoint(0).unwrap(), 0, ["P1", "P2"]).unwrap();
        let mut p1 = Job2P::new(net.endpoint(1).unwrap(), 1, ["P1", "P2"]).unwrap();

        p0.send(1, b"to one").unwrap();
        assert_eq!(p1.receive(0).unwrap(), b"to one");
        assert!(matches!(p1.receive_all(&[0, 0]), Err(Error::BadArgument(_))));
    }
}
