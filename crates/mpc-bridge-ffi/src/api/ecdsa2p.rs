//! Two-party ECDSA

use super::{bytes, curve, messages, outputs, persist_entry_points};
use crate::engine;
use crate::handles::{EcdsaKey2pHandle, Job2PHandle, PointHandle};
use crate::job::with_job;
use crate::mem::{CMem, CMems};
use crate::status::{ffi_call, require_out, write_out};
use mpc_bridge_core::objects::EcdsaKey2p;
use mpc_bridge_core::ops::{self, Signed, SignedBatch};
use mpc_bridge_core::types::SessionId;
use mpc_bridge_core::{Engine, Job2P, Result};
use std::os::raw::c_int;

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsa2p_dkg(
    job: Job2PHandle,
    curve_nid: c_int,
    out: *mut EcdsaKey2pHandle,
) -> c_int {
    ffi_call("mpcb_ecdsa2p_dkg", || {
        require_out(out, "key")?;
        let curve = curve(curve_nid)?;
        let key = with_job(job.get()?, |job| ops::ecdsa2p::dkg(engine(), job, curve))?;
        write_out(out, EcdsaKey2pHandle::store(key))
    })
}

/// Re-randomize both shares; the input key stays valid and must still be freed
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsa2p_refresh(
    job: Job2PHandle,
    key: EcdsaKey2pHandle,
    out: *mut EcdsaKey2pHandle,
) -> c_int {
    ffi_call("mpcb_ecdsa2p_refresh", || {
        require_out(out, "key")?;
        let key = key.get()?;
        let refreshed = with_job(job.get()?, |job| ops::ecdsa2p::refresh(engine(), job, &key))?;
        write_out(out, EcdsaKey2pHandle::store(refreshed))
    })
}

type SignOne = fn(&dyn Engine, &mut Job2P, &SessionId, &EcdsaKey2p, &[u8]) -> Result<Signed>;
type SignMany =
    fn(&dyn Engine, &mut Job2P, &SessionId, &EcdsaKey2p, &[&[u8]]) -> Result<SignedBatch>;

unsafe fn sign_one(
    op: SignOne,
    job: Job2PHandle,
    sid: CMem,
    key: EcdsaKey2pHandle,
    msg: CMem,
    sid_out: *mut CMem,
    sig_out: *mut CMem,
) -> Result<()> {
    require_out(sid_out, "session id")?;
    require_out(sig_out, "signature")?;
    let sid = SessionId::new(bytes(sid)?);
    let key = key.get()?;
    let msg = bytes(msg)?;
    let signed = with_job(job.get()?, |job| op(engine(), job, &sid, &key, msg))?;

    let mut outputs = outputs();
    outputs.mem(sid_out, signed.sid.as_bytes())?;
    outputs.mem(sig_out, &signed.signature)?;
    outputs.commit();
    Ok(())
}

unsafe fn sign_many(
    op: SignMany,
    job: Job2PHandle,
    sid: CMem,
    key: EcdsaKey2pHandle,
    msgs: CMems,
    sid_out: *mut CMem,
    sigs_out: *mut CMems,
) -> Result<()> {
    require_out(sid_out, "session id")?;
    require_out(sigs_out, "signatures")?;
    let sid = SessionId::new(bytes(sid)?);
    let key = key.get()?;
    let msgs = messages(msgs)?;
    let signed = with_job(job.get()?, |job| op(engine(), job, &sid, &key, &msgs))?;

    let mut outputs = outputs();
    outputs.mem(sid_out, signed.sid.as_bytes())?;
    outputs.array(sigs_out, &signed.signatures)?;
    outputs.commit();
    Ok(())
}

/// Sign a message hash. An empty `sid` makes the parties agree on one,
/// returned through `sid_out`. Party 0 receives the DER signature; party 1
/// gets an empty buffer.
///
/// # Safety
/// Input buffers must be readable and both outputs writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsa2p_sign(
    job: Job2PHandle,
    sid: CMem,
    key: EcdsaKey2pHandle,
    msg: CMem,
    sid_out: *mut CMem,
    sig_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_ecdsa2p_sign", || {
        sign_one(ops::ecdsa2p::sign, job, sid, key, msg, sid_out, sig_out)
    })
}

/// Batched [`mpcb_ecdsa2p_sign`]
///
/// # Safety
/// As [`mpcb_ecdsa2p_sign`].
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsa2p_sign_batch(
    job: Job2PHandle,
    sid: CMem,
    key: EcdsaKey2pHandle,
    msgs: CMems,
    sid_out: *mut CMem,
    sigs_out: *mut CMems,
) -> c_int {
    ffi_call("mpcb_ecdsa2p_sign_batch", || {
        sign_many(ops::ecdsa2p::sign_batch, job, sid, key, msgs, sid_out, sigs_out)
    })
}

/// Abort-detecting signing. A `MPCB_E_KEY_LEAK` status means the key
/// must be retired, never retried.
///
/// # Safety
/// As [`mpcb_ecdsa2p_sign`].
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsa2p_sign_with_global_abort(
    job: Job2PHandle,
    sid: CMem,
    key: EcdsaKey2pHandle,
    msg: CMem,
    sid_out: *mut CMem,
    sig_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_ecdsa2p_sign_with_global_abort", || {
        sign_one(ops::ecdsa2p::sign_with_global_abort, job, sid, key, msg, sid_out, sig_out)
    })
}

/// # Safety
/// As [`mpcb_ecdsa2p_sign`].
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsa2p_sign_with_global_abort_batch(
    job: Job2PHandle,
    sid: CMem,
    key: EcdsaKey2pHandle,
    msgs: CMems,
    sid_out: *mut CMem,
    sigs_out: *mut CMems,
) -> c_int {
    ffi_call("mpcb_ecdsa2p_sign_with_global_abort_batch", || {
        sign_many(
            ops::ecdsa2p::sign_with_global_abort_batch,
            job,
            sid,
            key,
            msgs,
            sid_out,
            sigs_out,
        )
    })
}

/// Joint public key, as an owned point
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsa2p_key_public(
    key: EcdsaKey2pHandle,
    out: *mut PointHandle,
) -> c_int {
    ffi_call("mpcb_ecdsa2p_key_public", || {
        require_out(out, "point")?;
        let key = key.get()?;
        write_out(out, PointHandle::store(key.public_key().clone()))
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsa2p_key_curve(key: EcdsaKey2pHandle, out: *mut c_int) -> c_int {
    ffi_call("mpcb_ecdsa2p_key_curve", || {
        let key = key.get()?;
        write_out(out, key.curve().nid())
    })
}

persist_entry_points!(
    EcdsaKey2pHandle,
    EcdsaKey2p,
    mpcb_ecdsa2p_key_serialize,
    mpcb_ecdsa2p_key_deserialize
);
