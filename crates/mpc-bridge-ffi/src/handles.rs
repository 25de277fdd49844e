//! Typed handles for objects and sessions.
//!
//! Each kind gets its own `#[repr(C)]` wrapper around a raw arena handle and
//! its own registry, so a point handle cannot be passed where a key handle is
//! expected, and a stale or double-freed handle fails with BadArgument.
//! Every kind has exactly one `*_free` function; freeing the null handle is a
//! no-op.

use crate::status::ffi_call;
use mpc_bridge_core::objects::{
    EcdsaKey2p, ElGamalCommitment, Handle, KeyShareMp, Paillier, Point, PveBatchCiphertext,
    PveCiphertext, Registry, Scalar, SchnorrKey2p,
};
use mpc_bridge_core::{Job2P, JobMp, Result};
use std::os::raw::c_int;
use std::sync::{Arc, Mutex};

macro_rules! handle_kinds {
    ($(
        $(#[$meta:meta])*
        $handle:ident($ty:ty) in $registry:ident, $free:ident;
    )*) => {$(
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $handle {
            pub id: u64,
        }

        pub(crate) static $registry: Registry<$ty> = Registry::new(stringify!($handle));

        impl $handle {
            pub const NULL: Self = Self { id: 0 };

            pub fn is_null(self) -> bool {
                self.id == 0
            }

            pub(crate) fn store(value: $ty) -> Self {
                Self { id: $registry.insert(value).to_raw() }
            }

            pub(crate) fn get(self) -> Result<Arc<$ty>> {
                $registry.get(Handle::from_raw(self.id))
            }

            pub(crate) fn release(self) -> Result<()> {
                $registry.remove(Handle::from_raw(self.id))
            }
        }

        /// Release the object. Null is a no-op; a stale handle is BadArgument.
        #[no_mangle]
        pub extern "C" fn $free(handle: $handle) -> c_int {
            ffi_call(stringify!($free), || handle.release())
        }
    )*};
}

handle_kinds! {
    /// Two-party session
    Job2PHandle(Mutex<Job2P>) in JOBS_2P, mpcb_job2p_free;
    /// Multi-party session
    JobMpHandle(Mutex<JobMp>) in JOBS_MP, mpcb_jobmp_free;
    /// Two-party ECDSA key share
    EcdsaKey2pHandle(EcdsaKey2p) in ECDSA_KEYS_2P, mpcb_ecdsa2p_key_free;
    /// Two-party Schnorr key share
    SchnorrKey2pHandle(SchnorrKey2p) in SCHNORR_KEYS_2P, mpcb_schnorr2p_key_free;
    /// Multi-party key share, ECDSA or Schnorr
    KeyShareMpHandle(KeyShareMp) in KEYS_MP, mpcb_key_mp_free;
    /// Curve point
    PointHandle(Point) in POINTS, mpcb_point_free;
    /// Curve scalar
    ScalarHandle(Scalar) in SCALARS, mpcb_scalar_free;
    /// ElGamal commitment
    ElGamalHandle(ElGamalCommitment) in ELGAMAL, mpcb_elgamal_free;
    /// PVE ciphertext
    PveHandle(PveCiphertext) in PVE, mpcb_pve_free;
    /// Batch PVE ciphertext
    PveBatchHandle(PveBatchCiphertext) in PVE_BATCH, mpcb_pve_batch_free;
    /// Paillier key, public or private
    PaillierHandle(Paillier) in PAILLIER, mpcb_paillier_free;
}

/// Resolve a caller array of handles, in order
///
/// # Safety
/// `handles` must point at `count` readable handles, or be null with `count` 0.
pub(crate) unsafe fn resolve_all<H, T>(
    handles: *const H,
    count: c_int,
    get: impl Fn(H) -> Result<Arc<T>>,
) -> Result<Vec<Arc<T>>>
where
    H: Copy,
{
    let count = usize::try_from(count).map_err(|_| {
        mpc_bridge_core::Error::BadArgument(format!("negative handle count {count}"))
    })?;
    if count == 0 {
        return Ok(Vec::new());
    }
    if handles.is_null() {
        return Err(mpc_bridge_core::Error::BadArgument("null handle array".into()));
    }
    std::slice::from_raw_parts(handles, count)
        .iter()
        .map(|h| get(*h))
        .collect()
}
