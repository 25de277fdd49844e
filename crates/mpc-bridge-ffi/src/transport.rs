//! Transport built over caller callbacks.
//!
//! Received messages come back as buffers the callback allocated with
//! [`crate::mem::mpcb_cmem_new`]; the library copies them and releases the
//! originals (zeroed) before returning to the engine.
//!
//! A receive callback that reports success must write its output, even for
//! empty messages: an empty message is what `mpcb_cmem_new` returns for no
//! bytes, and a batch of empty messages is what `mpcb_cmems_new` returns for
//! them. An output left untouched is a transport failure.

use crate::mem::{self, CMem, CMems};
use mpc_bridge_core::transport::Transport;
use mpc_bridge_core::types::PartyId;
use mpc_bridge_core::{Error, Result};
use std::os::raw::{c_int, c_void};

pub type SendFn =
    unsafe extern "C" fn(ctx: *mut c_void, to: c_int, data: *const u8, size: c_int) -> c_int;
pub type ReceiveFn = unsafe extern "C" fn(ctx: *mut c_void, from: c_int, out: *mut CMem) -> c_int;
pub type ReceiveAllFn =
    unsafe extern "C" fn(
        ctx: *mut c_void,
        from: *const c_int,
        count: c_int,
        out: *mut CMems,
    ) -> c_int;

/// Caller network primitives plus the context threaded through every call.
/// A non-zero callback status is reported to the engine as a transport failure.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TransportCallbacks {
    pub ctx: *mut c_void,
    pub send: Option<SendFn>,
    pub receive: Option<ReceiveFn>,
    /// Required for multi-party sessions only. On success `out` must hold
    /// an array from `mpcb_cmems_new`.
    pub receive_all: Option<ReceiveAllFn>,
}

/// Releases a callback-produced buffer when the copy is done
struct Incoming(CMem);

impl Drop for Incoming {
    fn drop(&mut self) {
        // SAFETY: produced by mpcb_cmem_new as required of the callback
        unsafe { mem::mpcb_cmem_free(self.0) };
    }
}

struct IncomingArray(CMems);

impl Drop for IncomingArray {
    fn drop(&mut self) {
        // SAFETY: produced by mpcb_cmems_new as required of the callback
        unsafe { mem::mpcb_cmems_free(self.0) };
    }
}

fn to_c(party: PartyId) -> Result<c_int> {
    c_int::try_from(party).map_err(|_| Error::BadArgument(format!("party id {party} out of range")))
}

/// Size/count preset in receive outputs to detect a callback that never wrote them
const UNSET: c_int = -1;

fn unset_output(what: &str) -> Error {
    Error::Transport(format!("{what} callback reported success without an output"))
}

fn check_status(what: &str, status: c_int) -> Result<()> {
    match status {
        0 => Ok(()),
        code => Err(Error::Transport(format!("{what} callback returned {code:#x}"))),
    }
}

/// [`Transport`] forwarding to a [`TransportCallbacks`] table
#[derive(Debug)]
pub struct CallbackTransport {
    callbacks: TransportCallbacks,
    send: SendFn,
    receive: ReceiveFn,
}

// SAFETY: the caller guarantees the context may be used from the thread
// running the session, which is the only thread that touches it.
unsafe impl Send for CallbackTransport {}

impl CallbackTransport {
    pub fn new(callbacks: TransportCallbacks, needs_receive_all: bool) -> Result<Self> {
        let send = callbacks
            .send
            .ok_or_else(|| Error::BadArgument("missing send callback".into()))?;
        let receive = callbacks
            .receive
            .ok_or_else(|| Error::BadArgument("missing receive callback".into()))?;
        if needs_receive_all && callbacks.receive_all.is_none() {
            return Err(Error::BadArgument("missing receive_all callback".into()));
        }
        Ok(Self {
            callbacks,
            send,
            receive,
        })
    }
}

impl Transport for CallbackTransport {
    fn send(&mut self, to: PartyId, message: &[u8]) -> Result<()> {
        let size = c_int::try_from(message.len())
            .map_err(|_| Error::BadArgument("message too large".into()))?;
        // SAFETY: message outlives the call
        let status = unsafe { (self.send)(self.callbacks.ctx, to_c(to)?, message.as_ptr(), size) };
        check_status("send", status)
    }

    fn receive(&mut self, from: PartyId) -> Result<Vec<u8>> {
        let mut out = CMem {
            size: UNSET,
            ..CMem::EMPTY
        };
        // SAFETY: out is a valid, writable CMem
        let status = unsafe { (self.receive)(self.callbacks.ctx, to_c(from)?, &mut out) };
        let written = out.size != UNSET;
        let incoming = Incoming(if written { out } else { CMem::EMPTY });
        check_status("receive", status)?;
        if !written {
            return Err(unset_output("receive"));
        }
        // SAFETY: the callback filled out with a library buffer
        let bytes = unsafe { mem::borrow(incoming.0) }
            .map_err(|e| Error::Transport(format!("malformed received buffer: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn receive_all(&mut self, from: &[PartyId]) -> Result<Vec<Vec<u8>>> {
        let Some(receive_all) = self.callbacks.receive_all else {
            return from.iter().map(|party| self.receive(*party)).collect();
        };
        let ids: Vec<c_int> = from.iter().map(|p| to_c(*p)).collect::<Result<_>>()?;
        let count = c_int::try_from(ids.len())
            .map_err(|_| Error::BadArgument("too many senders".into()))?;
        let mut out = CMems {
            count: UNSET,
            ..CMems::EMPTY
        };
        // SAFETY: ids outlives the call and out is writable
        let status = unsafe { receive_all(self.callbacks.ctx, ids.as_ptr(), count, &mut out) };
        let written = out.count != UNSET;
        let incoming = IncomingArray(if written { out } else { CMems::EMPTY });
        check_status("receive_all", status)?;
        if !written {
            return Err(unset_output("receive_all"));
        }

        // SAFETY: the callback filled out with a library array
        let items = unsafe { mem::borrow_array(incoming.0) }
            .map_err(|e| Error::Transport(format!("malformed received array: {e}")))?;
        // A written array of count 0 is every message empty
        if items.is_empty() && !from.is_empty() {
            return Ok(vec![Vec::new(); from.len()]);
        }
        if items.len() != from.len() {
            return Err(Error::Transport(format!(
                "receive_all returned {} messages for {} senders",
                items.len(),
                from.len()
            )));
        }
        Ok(items.into_iter().map(<[u8]>::to_vec).collect())
    }
}
