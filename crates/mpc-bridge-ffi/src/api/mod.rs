//! Operation entry points.
//!
//! Each entry point validates its pointers and handles, decodes inputs,
//! runs the operation and only then allocates outputs. Buffer outputs are
//! allocated under one [`Outputs`] guard and handles are stored last, so a
//! failing call leaves nothing behind for the caller to free.

use crate::mem::{self, CMem, CMems, Outputs};
use mpc_bridge_core::types::{Curve, PartyIndex};
use mpc_bridge_core::{ops, Error, Result};
use std::os::raw::c_int;

pub mod agree;
pub mod curve;
pub mod ecdsa2p;
pub mod ecdsamp;
pub mod elgamal;
pub mod paillier;
pub mod pve;
pub mod schnorr;
pub mod zk;

pub(crate) fn outputs() -> Outputs<'static> {
    Outputs::new(mem::boundary())
}

/// # Safety
/// See [`mem::borrow`].
pub(crate) unsafe fn bytes<'a>(mem: CMem) -> Result<&'a [u8]> {
    mem::borrow(mem)
}

/// # Safety
/// See [`mem::borrow_array`].
pub(crate) unsafe fn messages<'a>(mems: CMems) -> Result<Vec<&'a [u8]>> {
    mem::borrow_array(mems)
}

pub(crate) fn curve(nid: c_int) -> Result<Curve> {
    ops::curve::curve_from_nid(nid)
}

pub(crate) fn count(value: c_int, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::BadArgument(format!("negative {what} {value}")))
}

pub(crate) fn receiver(value: c_int) -> Result<PartyIndex> {
    count(value, "signature receiver")
}

/// Serialize/deserialize pair for a persisted object kind
macro_rules! persist_entry_points {
    ($handle:ty, $object:ty, $serialize:ident, $deserialize:ident) => {
        /// Serialize the object into a fresh buffer, which may hold secret
        /// material and is zeroed by `mpcb_cmem_free`.
        ///
        /// # Safety
        /// `out` must be writable.
        #[no_mangle]
        pub unsafe extern "C" fn $serialize(
            handle: $handle,
            out: *mut $crate::mem::CMem,
        ) -> std::os::raw::c_int {
            $crate::status::ffi_call(stringify!($serialize), || {
                $crate::status::require_out(out, "encoding")?;
                let object = handle.get()?;
                let encoded = mpc_bridge_core::objects::Persist::to_bytes(&*object)?;
                let mut outputs = $crate::api::outputs();
                outputs.mem(out, &encoded)?;
                outputs.commit();
                Ok(())
            })
        }

        /// Rebuild an object from its serialized form
        ///
        /// # Safety
        /// `bytes` must be a readable buffer and `out` writable.
        #[no_mangle]
        pub unsafe extern "C" fn $deserialize(
            bytes: $crate::mem::CMem,
            out: *mut $handle,
        ) -> std::os::raw::c_int {
            $crate::status::ffi_call(stringify!($deserialize), || {
                $crate::status::require_out(out, "handle")?;
                let bytes = $crate::api::bytes(bytes)?;
                let object: $object = mpc_bridge_core::objects::Persist::from_bytes(bytes)?;
                $crate::status::write_out(out, <$handle>::store(object))
            })
        }
    };
}

pub(crate) use persist_entry_points;
