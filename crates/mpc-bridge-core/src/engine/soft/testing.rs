//! Harness for running protocol parties on threads over a loopback network

use crate::session::{Job2P, JobMp};
use crate::transport::{MemoryNetwork, Transport};
use crate::types::PartyId;
use crate::Result;
use std::thread;

/// Run `f` as both parties of a two-party session named `P1`/`P2`
pub(crate) fn run_2p<T, F>(f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&mut Job2P) -> T + Send + Clone + 'static,
{
    run_2p_over(|_, endpoint| Box::new(endpoint) as Box<dyn Transport>, f)
}

/// Like [`run_2p`], letting `wrap` replace each party's transport
pub(crate) fn run_2p_over<T, F, W>(wrap: W, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&mut Job2P) -> T + Send + Clone + 'static,
    W: Fn(usize, crate::transport::MemoryEndpoint) -> Box<dyn Transport>,
{
    let net = MemoryNetwork::with_parties(2);
    let handles: Vec<_> = net
        .endpoints()
        .into_iter()
        .enumerate()
        .map(|(i, endpoint)| {
            let transport = wrap(i, endpoint);
            let f = f.clone();
            thread::spawn(move || {
                let mut job = Job2P::new(transport, i, ["P1", "P2"]).unwrap();
                f(&mut job)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

/// Run `f` as every party of an `n`-party session
pub(crate) fn run_mp<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&mut JobMp) -> T + Send + Clone + 'static,
{
    let net = MemoryNetwork::with_parties(n);
    let names: Vec<String> = (0..n).map(|i| format!("party-{i}")).collect();
    let handles: Vec<_> = net
        .endpoints()
        .into_iter()
        .enumerate()
        .map(|(i, endpoint)| {
            let names = names.clone();
            let f = f.clone();
            thread::spawn(move || {
                let mut job = JobMp::new(endpoint, i, names).unwrap();
                f(&mut job)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

/// Flips one byte of the `nth` message sent to `target`
pub(crate) struct TamperingTransport<T> {
    inner: T,
    target: PartyId,
    nth: usize,
    sent: usize,
}

impl<T: Transport> TamperingTransport<T> {
    pub(crate) fn new(inner: T, target: PartyId, nth: usize) -> Self {
        Self {
            inner,
            target,
            nth,
            sent: 0,
        }
    }
}

impl<T: Transport> Transport for TamperingTransport<T> {
    fn send(&mut self, to: PartyId, message: &[u8]) -> Result<()> {
        if to != self.target {
            return self.inner.send(to, message);
        }
        let mut message = message.to_vec();
        if self.sent == self.nth {
            if let Some(last) = message.last_mut() {
                *last ^= 0x01;
            }
        }
        self.sent += 1;
        self.inner.send(to, &message)
    }

    fn receive(&mut self, from: PartyId) -> Result<Vec<u8>> {
        self.inner.receive(from)
    }
}
