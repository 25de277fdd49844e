//! Two-party and multi-party Schnorr signing

use super::{bytes, curve, messages, outputs, persist_entry_points, receiver};
use crate::engine;
use crate::handles::{
    Job2PHandle, JobMpHandle, KeyShareMpHandle, PointHandle, SchnorrKey2pHandle,
};
use crate::job::with_job;
use crate::mem::{CMem, CMems};
use crate::status::{ffi_call, require_out, write_out};
use mpc_bridge_core::objects::SchnorrKey2p;
use mpc_bridge_core::ops;
use mpc_bridge_core::types::{SchnorrVariant, SessionId};
use std::os::raw::c_int;

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorr2p_dkg(
    job: Job2PHandle,
    curve_nid: c_int,
    out: *mut SchnorrKey2pHandle,
) -> c_int {
    ffi_call("mpcb_schnorr2p_dkg", || {
        require_out(out, "key")?;
        let curve = curve(curve_nid)?;
        let key = with_job(job.get()?, |job| ops::schnorr2p::dkg(engine(), job, curve))?;
        write_out(out, SchnorrKey2pHandle::store(key))
    })
}

/// Sign with `variant` (0 EdDSA, 1 BIP340). Party 0 receives the signature.
///
/// # Safety
/// `msg` must be readable and `sig_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorr2p_sign(
    job: Job2PHandle,
    key: SchnorrKey2pHandle,
    msg: CMem,
    variant: c_int,
    sig_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_schnorr2p_sign", || {
        require_out(sig_out, "signature")?;
        let variant = SchnorrVariant::from_i32(variant)?;
        let key = key.get()?;
        let msg = bytes(msg)?;
        let signature = with_job(job.get()?, |job| {
            ops::schnorr2p::sign(engine(), job, &key, msg, variant)
        })?;
        let mut outputs = outputs();
        outputs.mem(sig_out, &signature)?;
        outputs.commit();
        Ok(())
    })
}

/// # Safety
/// `msgs` must be readable and `sigs_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorr2p_sign_batch(
    job: Job2PHandle,
    key: SchnorrKey2pHandle,
    msgs: CMems,
    variant: c_int,
    sigs_out: *mut CMems,
) -> c_int {
    ffi_call("mpcb_schnorr2p_sign_batch", || {
        require_out(sigs_out, "signatures")?;
        let variant = SchnorrVariant::from_i32(variant)?;
        let key = key.get()?;
        let msgs = messages(msgs)?;
        let signatures = with_job(job.get()?, |job| {
            ops::schnorr2p::sign_batch(engine(), job, &key, &msgs, variant)
        })?;
        let mut outputs = outputs();
        outputs.array(sigs_out, &signatures)?;
        outputs.commit();
        Ok(())
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorr2p_key_public(
    key: SchnorrKey2pHandle,
    out: *mut PointHandle,
) -> c_int {
    ffi_call("mpcb_schnorr2p_key_public", || {
        require_out(out, "point")?;
        let key = key.get()?;
        write_out(out, PointHandle::store(key.public_key().clone()))
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorr2p_key_curve(
    key: SchnorrKey2pHandle,
    out: *mut c_int,
) -> c_int {
    ffi_call("mpcb_schnorr2p_key_curve", || {
        let key = key.get()?;
        write_out(out, key.curve().nid())
    })
}

persist_entry_points!(
    SchnorrKey2pHandle,
    SchnorrKey2p,
    mpcb_schnorr2p_key_serialize,
    mpcb_schnorr2p_key_deserialize
);

/// # Safety
/// Both outputs must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorrmp_dkg(
    job: JobMpHandle,
    curve_nid: c_int,
    key_out: *mut KeyShareMpHandle,
    sid_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_schnorrmp_dkg", || {
        require_out(key_out, "key")?;
        require_out(sid_out, "session id")?;
        let curve = curve(curve_nid)?;
        let (key, sid) = with_job(job.get()?, |job| ops::schnorrmp::dkg(engine(), job, curve))?;

        let mut outputs = outputs();
        outputs.mem(sid_out, sid.as_bytes())?;
        write_out(key_out, KeyShareMpHandle::store(key))?;
        outputs.commit();
        Ok(())
    })
}

/// # Safety
/// `sid` must be readable and both outputs writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorrmp_refresh(
    job: JobMpHandle,
    sid: CMem,
    key: KeyShareMpHandle,
    key_out: *mut KeyShareMpHandle,
    sid_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_schnorrmp_refresh", || {
        require_out(key_out, "key")?;
        require_out(sid_out, "session id")?;
        let sid = SessionId::new(bytes(sid)?);
        let key = key.get()?;
        let (refreshed, sid) =
            with_job(job.get()?, |job| ops::schnorrmp::refresh(engine(), job, &sid, &key))?;

        let mut outputs = outputs();
        outputs.mem(sid_out, sid.as_bytes())?;
        write_out(key_out, KeyShareMpHandle::store(refreshed))?;
        outputs.commit();
        Ok(())
    })
}

/// Only party `sig_receiver` gets the signature
///
/// # Safety
/// `msg` must be readable and `sig_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorrmp_sign(
    job: JobMpHandle,
    key: KeyShareMpHandle,
    msg: CMem,
    sig_receiver: c_int,
    variant: c_int,
    sig_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_schnorrmp_sign", || {
        require_out(sig_out, "signature")?;
        let variant = SchnorrVariant::from_i32(variant)?;
        let receiver = receiver(sig_receiver)?;
        let key = key.get()?;
        let msg = bytes(msg)?;
        let signature = with_job(job.get()?, |job| {
            ops::schnorrmp::sign(engine(), job, &key, msg, receiver, variant)
        })?;
        let mut outputs = outputs();
        outputs.mem(sig_out, &signature)?;
        outputs.commit();
        Ok(())
    })
}

/// # Safety
/// `msgs` must be readable and `sigs_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_schnorrmp_sign_batch(
    job: JobMpHandle,
    key: KeyShareMpHandle,
    msgs: CMems,
    sig_receiver: c_int,
    variant: c_int,
    sigs_out: *mut CMems,
) -> c_int {
    ffi_call("mpcb_schnorrmp_sign_batch", || {
        require_out(sigs_out, "signatures")?;
        let variant = SchnorrVariant::from_i32(variant)?;
        let receiver = receiver(sig_receiver)?;
        let key = key.get()?;
        let msgs = messages(msgs)?;
        let signatures = with_job(job.get()?, |job| {
            ops::schnorrmp::sign_batch(engine(), job, &key, &msgs, receiver, variant)
        })?;
        let mut outputs = outputs();
        outputs.array(sigs_out, &signatures)?;
        outputs.commit();
        Ok(())
    })
}
