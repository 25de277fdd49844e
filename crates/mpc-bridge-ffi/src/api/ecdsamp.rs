//! Multi-party ECDSA, plus accessors for the multi-party key share that
//! ECDSA and Schnorr share

use super::{bytes, curve, outputs, persist_entry_points, receiver};
use crate::engine;
use crate::handles::{JobMpHandle, KeyShareMpHandle, PointHandle};
use crate::job::with_job;
use crate::mem::CMem;
use crate::status::{ffi_call, require_out, write_out};
use mpc_bridge_core::objects::KeyShareMp;
use mpc_bridge_core::ops;
use mpc_bridge_core::types::SessionId;
use std::os::raw::c_int;

/// Generate a key among all parties; `sid_out` receives the identifier
/// bound to the run.
///
/// # Safety
/// Both outputs must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsamp_dkg(
    job: JobMpHandle,
    curve_nid: c_int,
    key_out: *mut KeyShareMpHandle,
    sid_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_ecdsamp_dkg", || {
        require_out(key_out, "key")?;
        require_out(sid_out, "session id")?;
        let curve = curve(curve_nid)?;
        let (key, sid) = with_job(job.get()?, |job| ops::ecdsamp::dkg(engine(), job, curve))?;

        let mut outputs = outputs();
        outputs.mem(sid_out, sid.as_bytes())?;
        write_out(key_out, KeyShareMpHandle::store(key))?;
        outputs.commit();
        Ok(())
    })
}

/// Re-randomize the shares. An empty `sid` is replaced by a fresh one.
///
/// # Safety
/// `sid` must be readable and both outputs writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsamp_refresh(
    job: JobMpHandle,
    sid: CMem,
    key: KeyShareMpHandle,
    key_out: *mut KeyShareMpHandle,
    sid_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_ecdsamp_refresh", || {
        require_out(key_out, "key")?;
        require_out(sid_out, "session id")?;
        let sid = SessionId::new(bytes(sid)?);
        let key = key.get()?;
        let (refreshed, sid) =
            with_job(job.get()?, |job| ops::ecdsamp::refresh(engine(), job, &sid, &key))?;

        let mut outputs = outputs();
        outputs.mem(sid_out, sid.as_bytes())?;
        write_out(key_out, KeyShareMpHandle::store(refreshed))?;
        outputs.commit();
        Ok(())
    })
}

/// Sign a message hash; only party `sig_receiver` gets the DER signature,
/// everyone else an empty buffer.
///
/// # Safety
/// `msg` must be readable and `sig_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_ecdsamp_sign(
    job: JobMpHandle,
    key: KeyShareMpHandle,
    msg: CMem,
    sig_receiver: c_int,
    sig_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_ecdsamp_sign", || {
        require_out(sig_out, "signature")?;
        let key = key.get()?;
        let msg = bytes(msg)?;
        let receiver = receiver(sig_receiver)?;
        let signature = with_job(job.get()?, |job| {
            ops::ecdsamp::sign(engine(), job, &key, msg, receiver)
        })?;

        let mut outputs = outputs();
        outputs.mem(sig_out, &signature)?;
        outputs.commit();
        Ok(())
    })
}

/// Joint public key, as an owned point
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_key_mp_public(key: KeyShareMpHandle, out: *mut PointHandle) -> c_int {
    ffi_call("mpcb_key_mp_public", || {
        require_out(out, "point")?;
        let key = key.get()?;
        write_out(out, PointHandle::store(key.public_key().clone()))
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_key_mp_curve(key: KeyShareMpHandle, out: *mut c_int) -> c_int {
    ffi_call("mpcb_key_mp_curve", || {
        let key = key.get()?;
        write_out(out, key.curve().nid())
    })
}

persist_entry_points!(KeyShareMpHandle, KeyShareMp, mpcb_key_mp_serialize, mpcb_key_mp_deserialize);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::curve::mpcb_point_to_bytes;
    use crate::handles::{mpcb_key_mp_free, mpcb_point_free};
    use crate::mem::testing::{leaked, with_allocator};
    use crate::status::{MPCB_E_BADARG, MPCB_SUCCESS};
    use crate::testing::{cmem, run_mp, take};
    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    use k256::ecdsa::{Signature, VerifyingKey};

    #[test]
    fn test_three_party_dkg_refresh_sign() {
        let hash = [7u8; 32];
        let out = run_mp(3, move |job| unsafe {
            let mut key = KeyShareMpHandle::NULL;
            let mut sid = CMem::EMPTY;
            assert_eq!(mpcb_ecdsamp_dkg(job, 714, &mut key, &mut sid), MPCB_SUCCESS);
            let sid = take(sid);

            let mut refreshed = KeyShareMpHandle::NULL;
            let mut new_sid = CMem::EMPTY;
            let rc = mpcb_ecdsamp_refresh(job, cmem(&sid), key, &mut refreshed, &mut new_sid);
            assert_eq!(rc, MPCB_SUCCESS);
            take(new_sid);
            assert_eq!(mpcb_key_mp_free(key), MPCB_SUCCESS);

            let mut sig = CMem::EMPTY;
            assert_eq!(mpcb_ecdsamp_sign(job, refreshed, cmem(&hash), 2, &mut sig), MPCB_SUCCESS);

            let mut point = PointHandle::NULL;
            let mut public = CMem::EMPTY;
            assert_eq!(mpcb_key_mp_public(refreshed, &mut point), MPCB_SUCCESS);
            assert_eq!(mpcb_point_to_bytes(point, &mut public), MPCB_SUCCESS);
            mpcb_point_free(point);
            mpcb_key_mp_free(refreshed);
            (take(public), take(sig))
        });

        assert!(out[0].1.is_empty() && out[1].1.is_empty());
        let verifying = VerifyingKey::from_sec1_bytes(&out[2].0).unwrap();
        let signature = Signature::from_der(&out[2].1).unwrap();
        verifying.verify_prehash(&hash, &signature).unwrap();
    }

    #[test]
    fn test_failed_sid_allocation_stores_no_key() {
        let out = run_mp(3, |job| unsafe {
            let allocator = leaked(Some(0));
            let mut key = KeyShareMpHandle::NULL;
            let mut sid = CMem::EMPTY;
            let rc = with_allocator(allocator, || {
                mpcb_ecdsamp_dkg(job, 714, &mut key, &mut sid)
            });
            (rc, key.is_null(), sid.data.is_null(), allocator.live())
        });
        for (rc, no_key, no_sid, live) in out {
            assert_eq!(rc, MPCB_E_BADARG);
            assert!(no_key && no_sid);
            assert_eq!(live, 0);
        }
    }

    #[test]
    fn test_negative_receiver_rejected() {
        let out = run_mp(2, |job| unsafe {
            let mut key = KeyShareMpHandle::NULL;
            let mut sid = CMem::EMPTY;
            assert_eq!(mpcb_ecdsamp_dkg(job, 714, &mut key, &mut sid), MPCB_SUCCESS);
            take(sid);
            let mut sig = CMem::EMPTY;
            let rc = mpcb_ecdsamp_sign(job, key, cmem(&[1u8; 32]), -1, &mut sig);
            mpcb_key_mp_free(key);
            rc
        });
        assert!(out.iter().all(|rc| *rc == MPCB_E_BADARG));
    }
}
