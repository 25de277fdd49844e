//! ElGamal commitments

use super::{bytes, curve, outputs};
use crate::engine;
use crate::handles::{ElGamalHandle, PointHandle, ScalarHandle};
use crate::mem::CMem;
use crate::status::{ffi_call, require_out, write_out};
use mpc_bridge_core::ops;
use std::os::raw::c_int;

/// Commitment from its two points, which are copied
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_elgamal_new(
    l: PointHandle,
    r: PointHandle,
    out: *mut ElGamalHandle,
) -> c_int {
    ffi_call("mpcb_elgamal_new", || {
        require_out(out, "commitment")?;
        let com = ops::elgamal::new(&*l.get()?, &*r.get()?)?;
        write_out(out, ElGamalHandle::store(com))
    })
}

/// Commit to `m` under public key `p` with randomness `r`
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_elgamal_make(
    p: PointHandle,
    m: ScalarHandle,
    r: ScalarHandle,
    out: *mut ElGamalHandle,
) -> c_int {
    ffi_call("mpcb_elgamal_make", || {
        require_out(out, "commitment")?;
        let com = ops::elgamal::make(engine(), &*p.get()?, &*m.get()?, &*r.get()?)?;
        write_out(out, ElGamalHandle::store(com))
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_elgamal_to_bytes(com: ElGamalHandle, out: *mut CMem) -> c_int {
    ffi_call("mpcb_elgamal_to_bytes", || {
        require_out(out, "encoding")?;
        let encoded = ops::elgamal::to_bytes(&*com.get()?)?;
        let mut outputs = outputs();
        outputs.mem(out, &encoded)?;
        outputs.commit();
        Ok(())
    })
}

/// Decode a commitment, which must lie on `curve_nid`
///
/// # Safety
/// `encoded` must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_elgamal_from_bytes(
    curve_nid: c_int,
    encoded: CMem,
    out: *mut ElGamalHandle,
) -> c_int {
    ffi_call("mpcb_elgamal_from_bytes", || {
        require_out(out, "commitment")?;
        let com = ops::elgamal::from_bytes(curve(curve_nid)?, bytes(encoded)?)?;
        write_out(out, ElGamalHandle::store(com))
    })
}

/// First component, as an owned point
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_elgamal_l(com: ElGamalHandle, out: *mut PointHandle) -> c_int {
    ffi_call("mpcb_elgamal_l", || {
        require_out(out, "point")?;
        write_out(out, PointHandle::store(ops::elgamal::l(&*com.get()?)))
    })
}

/// Second component, as an owned point
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_elgamal_r(com: ElGamalHandle, out: *mut PointHandle) -> c_int {
    ffi_call("mpcb_elgamal_r", || {
        require_out(out, "point")?;
        write_out(out, PointHandle::store(ops::elgamal::r(&*com.get()?)))
    })
}
