//! Zero-knowledge proofs, each bound to a session id and an `aux` value

use super::{bytes, outputs};
use crate::engine;
use crate::handles::{resolve_all, ElGamalHandle, PointHandle, ScalarHandle};
use crate::mem::CMem;
use crate::status::{ffi_call, require_out, write_out};
use mpc_bridge_core::objects::{Point, Scalar};
use mpc_bridge_core::{ops, Result};
use std::os::raw::c_int;

/// # Safety
/// `out` must be writable.
unsafe fn emit(out: *mut CMem, proof: &[u8]) -> Result<()> {
    let mut outputs = outputs();
    outputs.mem(out, proof)?;
    outputs.commit();
    Ok(())
}

fn owned<T: Clone>(items: Vec<std::sync::Arc<T>>) -> Vec<T> {
    items.iter().map(|item| T::clone(item)).collect()
}

/// Prove knowledge of `w` with `Q = w * G`
///
/// # Safety
/// `sid` must be readable and `proof_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_uc_dl_prove(
    q: PointHandle,
    w: ScalarHandle,
    sid: CMem,
    aux: u64,
    proof_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_zk_uc_dl_prove", || {
        require_out(proof_out, "proof")?;
        let proof = ops::zk::uc_dl_prove(engine(), &*q.get()?, &*w.get()?, bytes(sid)?, aux)?;
        emit(proof_out, &proof)
    })
}

/// Success means the proof verified; a rejected proof is `MPCB_E_CRYPTO`
///
/// # Safety
/// `proof` and `sid` must be readable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_uc_dl_verify(
    proof: CMem,
    q: PointHandle,
    sid: CMem,
    aux: u64,
) -> c_int {
    ffi_call("mpcb_zk_uc_dl_verify", || {
        ops::zk::uc_dl_verify(engine(), bytes(proof)?, &*q.get()?, bytes(sid)?, aux)
    })
}

/// Batch discrete-log proof over `q_count` points and `w_count` witnesses,
/// which must match.
///
/// # Safety
/// The handle arrays must hold their stated counts; `sid` must be readable
/// and `proof_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_uc_batch_dl_prove(
    qs: *const PointHandle,
    q_count: c_int,
    ws: *const ScalarHandle,
    w_count: c_int,
    sid: CMem,
    aux: u64,
    proof_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_zk_uc_batch_dl_prove", || {
        require_out(proof_out, "proof")?;
        let qs: Vec<Point> = owned(resolve_all(qs, q_count, PointHandle::get)?);
        let ws: Vec<Scalar> = owned(resolve_all(ws, w_count, ScalarHandle::get)?);
        let proof = ops::zk::uc_batch_dl_prove(engine(), &qs, &ws, bytes(sid)?, aux)?;
        emit(proof_out, &proof)
    })
}

/// # Safety
/// `qs` must hold `q_count` handles; `proof` and `sid` must be readable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_uc_batch_dl_verify(
    proof: CMem,
    qs: *const PointHandle,
    q_count: c_int,
    sid: CMem,
    aux: u64,
) -> c_int {
    ffi_call("mpcb_zk_uc_batch_dl_verify", || {
        let qs: Vec<Point> = owned(resolve_all(qs, q_count, PointHandle::get)?);
        ops::zk::uc_batch_dl_verify(engine(), bytes(proof)?, &qs, bytes(sid)?, aux)
    })
}

/// Prove `B = w * A` for the `w` with `Q = w * G`
///
/// # Safety
/// `sid` must be readable and `proof_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_dh_prove(
    q: PointHandle,
    a: PointHandle,
    b: PointHandle,
    w: ScalarHandle,
    sid: CMem,
    aux: u64,
    proof_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_zk_dh_prove", || {
        require_out(proof_out, "proof")?;
        let proof = ops::zk::dh_prove(
            engine(),
            &*q.get()?,
            &*a.get()?,
            &*b.get()?,
            &*w.get()?,
            bytes(sid)?,
            aux,
        )?;
        emit(proof_out, &proof)
    })
}

/// # Safety
/// `proof` and `sid` must be readable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_dh_verify(
    proof: CMem,
    q: PointHandle,
    a: PointHandle,
    b: PointHandle,
    sid: CMem,
    aux: u64,
) -> c_int {
    ffi_call("mpcb_zk_dh_verify", || {
        ops::zk::dh_verify(
            engine(),
            bytes(proof)?,
            &*q.get()?,
            &*a.get()?,
            &*b.get()?,
            bytes(sid)?,
            aux,
        )
    })
}

/// Prove that `com` commits to `x` under public key `q` with randomness `r`
///
/// # Safety
/// `sid` must be readable and `proof_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_uc_elgamal_com_prove(
    q: PointHandle,
    com: ElGamalHandle,
    x: ScalarHandle,
    r: ScalarHandle,
    sid: CMem,
    aux: u64,
    proof_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_zk_uc_elgamal_com_prove", || {
        require_out(proof_out, "proof")?;
        let proof = ops::zk::uc_elgamal_com_prove(
            engine(),
            &*q.get()?,
            &*com.get()?,
            &*x.get()?,
            &*r.get()?,
            bytes(sid)?,
            aux,
        )?;
        emit(proof_out, &proof)
    })
}

/// # Safety
/// `proof` and `sid` must be readable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_uc_elgamal_com_verify(
    proof: CMem,
    q: PointHandle,
    com: ElGamalHandle,
    sid: CMem,
    aux: u64,
) -> c_int {
    ffi_call("mpcb_zk_uc_elgamal_com_verify", || {
        ops::zk::uc_elgamal_com_verify(
            engine(),
            bytes(proof)?,
            &*q.get()?,
            &*com.get()?,
            bytes(sid)?,
            aux,
        )
    })
}

/// Commit to `x` under `q` with randomness `r` and prove the opening
///
/// # Safety
/// `sid` must be readable and both outputs writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_make_elgamal_com_with_proof(
    q: PointHandle,
    x: ScalarHandle,
    r: ScalarHandle,
    sid: CMem,
    aux: u64,
    com_out: *mut ElGamalHandle,
    proof_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_zk_make_elgamal_com_with_proof", || {
        require_out(com_out, "commitment")?;
        require_out(proof_out, "proof")?;
        let (com, proof) = ops::zk::make_elgamal_com_with_proof(
            engine(),
            &*q.get()?,
            &*x.get()?,
            &*r.get()?,
            bytes(sid)?,
            aux,
        )?;
        let mut outputs = outputs();
        outputs.mem(proof_out, &proof)?;
        write_out(com_out, ElGamalHandle::store(com))?;
        outputs.commit();
        Ok(())
    })
}

/// Prove that `b` commits under `q` to the discrete log of `a`, with
/// randomness `r`
///
/// # Safety
/// `sid` must be readable and `proof_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_elgamal_com_pub_share_equ_prove(
    q: PointHandle,
    a: PointHandle,
    b: ElGamalHandle,
    r: ScalarHandle,
    sid: CMem,
    aux: u64,
    proof_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_zk_elgamal_com_pub_share_equ_prove", || {
        require_out(proof_out, "proof")?;
        let proof = ops::zk::elgamal_com_pub_share_equ_prove(
            engine(),
            &*q.get()?,
            &*a.get()?,
            &*b.get()?,
            &*r.get()?,
            bytes(sid)?,
            aux,
        )?;
        emit(proof_out, &proof)
    })
}

/// # Safety
/// `proof` and `sid` must be readable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_elgamal_com_pub_share_equ_verify(
    proof: CMem,
    q: PointHandle,
    a: PointHandle,
    b: ElGamalHandle,
    sid: CMem,
    aux: u64,
) -> c_int {
    ffi_call("mpcb_zk_elgamal_com_pub_share_equ_verify", || {
        ops::zk::elgamal_com_pub_share_equ_verify(
            engine(),
            bytes(proof)?,
            &*q.get()?,
            &*a.get()?,
            &*b.get()?,
            bytes(sid)?,
            aux,
        )
    })
}

/// Prove that `c` is `a` scaled by the scalar `b` commits to (`scalar_b`,
/// randomness `r_b`), re-randomized with `r_c`
///
/// # Safety
/// `sid` must be readable and `proof_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_elgamal_com_mult_prove(
    q: PointHandle,
    a: ElGamalHandle,
    b: ElGamalHandle,
    c: ElGamalHandle,
    r_b: ScalarHandle,
    r_c: ScalarHandle,
    scalar_b: ScalarHandle,
    sid: CMem,
    aux: u64,
    proof_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_zk_elgamal_com_mult_prove", || {
        require_out(proof_out, "proof")?;
        let proof = ops::zk::elgamal_com_mult_prove(
            engine(),
            &*q.get()?,
            &*a.get()?,
            &*b.get()?,
            &*c.get()?,
            &*r_b.get()?,
            &*r_c.get()?,
            &*scalar_b.get()?,
            bytes(sid)?,
            aux,
        )?;
        emit(proof_out, &proof)
    })
}

/// # Safety
/// `proof` and `sid` must be readable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_elgamal_com_mult_verify(
    proof: CMem,
    q: PointHandle,
    a: ElGamalHandle,
    b: ElGamalHandle,
    c: ElGamalHandle,
    sid: CMem,
    aux: u64,
) -> c_int {
    ffi_call("mpcb_zk_elgamal_com_mult_verify", || {
        ops::zk::elgamal_com_mult_verify(
            engine(),
            bytes(proof)?,
            &*q.get()?,
            &*a.get()?,
            &*b.get()?,
            &*c.get()?,
            bytes(sid)?,
            aux,
        )
    })
}

/// Prove that `eb` is `ea` scaled by the secret `c`, re-randomized with `r0`
///
/// # Safety
/// `sid` must be readable and `proof_out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_uc_elgamal_com_mult_private_scalar_prove(
    e: PointHandle,
    ea: ElGamalHandle,
    eb: ElGamalHandle,
    r0: ScalarHandle,
    c: ScalarHandle,
    sid: CMem,
    aux: u64,
    proof_out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_zk_uc_elgamal_com_mult_private_scalar_prove", || {
        require_out(proof_out, "proof")?;
        let proof = ops::zk::uc_elgamal_com_mult_private_scalar_prove(
            engine(),
            &*e.get()?,
            &*ea.get()?,
            &*eb.get()?,
            &*r0.get()?,
            &*c.get()?,
            bytes(sid)?,
            aux,
        )?;
        emit(proof_out, &proof)
    })
}

/// # Safety
/// `proof` and `sid` must be readable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_zk_uc_elgamal_com_mult_private_scalar_verify(
    proof: CMem,
    e: PointHandle,
    ea: ElGamalHandle,
    eb: ElGamalHandle,
    sid: CMem,
    aux: u64,
) -> c_int {
    ffi_call("mpcb_zk_uc_elgamal_com_mult_private_scalar_verify", || {
        ops::zk::uc_elgamal_com_mult_private_scalar_verify(
            engine(),
            bytes(proof)?,
            &*e.get()?,
            &*ea.get()?,
            &*eb.get()?,
            bytes(sid)?,
            aux,
        )
    })
}
