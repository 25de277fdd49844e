//! Bridging asynchronous transports onto the synchronous engine
//!
//! The engine blocks its thread on every send and receive. An
//! [`AsyncTransport`] is driven from that thread through a tokio runtime
//! handle by [`BlockingTransport`], which also enforces a per-call timeout and
//! checks a [`CancelFlag`] before forwarding anything.

use super::Transport;
use crate::config::TransportConfig;
use crate::types::PartyId;
use crate::{Error, Result};
use futures_util::future::try_join_all;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

pub use ::async_trait::async_trait;

/// Asynchronous point-to-point transport keyed by party identity
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    /// Deliver `message` to party `to`
    async fn send(&self, to: PartyId, message: Vec<u8>) -> Result<()>;

    /// Wait for the next message from party `from`
    async fn receive(&self, from: PartyId) -> Result<Vec<u8>>;

    /// Receive from every listed party concurrently, preserving order
    async fn receive_all(&self, from: &[PartyId]) -> Result<Vec<Vec<u8>>> {
        try_join_all(from.iter().map(|party| self.receive(*party))).await
    }
}

/// Shared cancellation switch for in-flight protocol runs
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent call on transports sharing this flag
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives an [`AsyncTransport`] from a blocking engine thread.
///
/// Must not be used from inside an async task: run the protocol with
/// [`run_blocking`] or on a plain thread.
pub struct BlockingTransport<T: AsyncTransport> {
    inner: Arc<T>,
    handle: Handle,
    timeout: Duration,
    cancel: CancelFlag,
}

impl<T: AsyncTransport> BlockingTransport<T> {
    /// Bridge `inner` through the runtime behind `handle`
    pub fn new(inner: Arc<T>, handle: Handle, config: &TransportConfig) -> Self {
        Self {
            inner,
            handle,
            timeout: config.call_timeout,
            cancel: CancelFlag::new(),
        }
    }

    /// Share an existing cancellation flag
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// The flag checked before every call
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    fn run<R, F>(&self, op: &'static str, fut: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        if self.cancel.is_cancelled() {
            debug!(op, "Call refused, session cancelled");
            return Err(Error::Transport(format!("{op} cancelled")));
        }
        let timeout = self.timeout;
        self.handle.block_on(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(op, timeout_ms = timeout.as_millis() as u64, "Transport call timed out");
                    Err(Error::Transport(format!("{op} timed out")))
                }
            }
        })
    }
}

impl<T: AsyncTransport + 'static> Transport for BlockingTransport<T> {
    fn send(&mut self, to: PartyId, message: &[u8]) -> Result<()> {
        let inner = self.inner.clone();
        let message = message.to_vec();
        self.run("send", async move { inner.send(to, message).await })
    }

    fn receive(&mut self, from: PartyId) -> Result<Vec<u8>> {
        let inner = self.inner.clone();
        self.run("receive", async move { inner.receive(from).await })
    }

    fn receive_all(&mut self, from: &[PartyId]) -> Result<Vec<Vec<u8>>> {
        let inner = self.inner.clone();
        let from = from.to_vec();
        self.run("receive_all", async move { inner.receive_all(&from).await })
    }
}

/// Run a blocking protocol operation from async code
pub async fn run_blocking<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Transport(format!("protocol worker failed: {e}")))?
}
