//! Publicly verifiable encryption.
//!
//! Every call takes the KEM explicitly: a null `kem` table selects the
//! built-in X25519 KEM. Label accessors return borrowed views into the
//! ciphertext; they are valid only while the ciphertext handle is alive and
//! must not be freed.

use super::{bytes, count, curve};
use crate::engine;
use crate::handles::{resolve_all, PointHandle, PveBatchHandle, PveHandle, ScalarHandle};
use crate::kem::{self, KemCallbacks};
use crate::mem::CMem;
use crate::status::{ffi_call, require_out, write_out};
use mpc_bridge_core::objects::{Point, PveBatchCiphertext, PveCiphertext, Scalar};
use mpc_bridge_core::{ops, Error, Result};
use std::os::raw::c_int;

/// Borrowed view of bytes owned by a live object
fn view(bytes: &[u8]) -> Result<CMem> {
    if bytes.is_empty() {
        return Ok(CMem::EMPTY);
    }
    let size =
        c_int::try_from(bytes.len()).map_err(|_| Error::BadArgument("label too large".into()))?;
    Ok(CMem {
        data: bytes.as_ptr().cast_mut(),
        size,
    })
}

/// Encrypt scalar `x` to `ek` under `label`
///
/// # Safety
/// `kem` must be null or a valid table; buffers must be readable and `out`
/// writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_encrypt(
    kem: *const KemCallbacks,
    ek: CMem,
    label: CMem,
    curve_nid: c_int,
    x: ScalarHandle,
    out: *mut PveHandle,
) -> c_int {
    ffi_call("mpcb_pve_encrypt", || {
        require_out(out, "ciphertext")?;
        let kem = kem::resolve(kem)?;
        let ct = ops::pve::encrypt(
            engine(),
            kem.as_ref(),
            bytes(ek)?,
            bytes(label)?,
            curve(curve_nid)?,
            &*x.get()?,
        )?;
        write_out(out, PveHandle::store(ct))
    })
}

/// Success when `ct` encrypts the discrete log of `q` under `label`
///
/// # Safety
/// As [`mpcb_pve_encrypt`].
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_verify(
    kem: *const KemCallbacks,
    ek: CMem,
    ct: PveHandle,
    q: PointHandle,
    label: CMem,
) -> c_int {
    ffi_call("mpcb_pve_verify", || {
        let kem = kem::resolve(kem)?;
        ops::pve::verify(engine(), kem.as_ref(), bytes(ek)?, &*ct.get()?, &*q.get()?, bytes(label)?)
    })
}

/// Recover the encrypted scalar. `dk` is passed to the KEM untouched, so a
/// caller KEM may treat it as a key reference.
///
/// # Safety
/// As [`mpcb_pve_encrypt`].
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_decrypt(
    kem: *const KemCallbacks,
    dk: CMem,
    ek: CMem,
    ct: PveHandle,
    label: CMem,
    curve_nid: c_int,
    out: *mut ScalarHandle,
) -> c_int {
    ffi_call("mpcb_pve_decrypt", || {
        require_out(out, "scalar")?;
        let kem = kem::resolve(kem)?;
        let x = ops::pve::decrypt(
            engine(),
            kem.as_ref(),
            bytes(dk)?,
            bytes(ek)?,
            &*ct.get()?,
            bytes(label)?,
            curve(curve_nid)?,
        )?;
        write_out(out, ScalarHandle::store(x))
    })
}

/// Public commitment `Q = x * G`, as an owned point
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_get_q(ct: PveHandle, out: *mut PointHandle) -> c_int {
    ffi_call("mpcb_pve_get_q", || {
        require_out(out, "point")?;
        write_out(out, PointHandle::store(ct.get()?.q().clone()))
    })
}

/// Borrowed label, valid while `ct` is alive; never free it
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_get_label(ct: PveHandle, out: *mut CMem) -> c_int {
    ffi_call("mpcb_pve_get_label", || {
        let ct = ct.get()?;
        write_out(out, view(ct.label())?)
    })
}

/// # Safety
/// `xs` must hold `count` handles; otherwise as [`mpcb_pve_encrypt`].
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_batch_encrypt(
    kem: *const KemCallbacks,
    ek: CMem,
    label: CMem,
    curve_nid: c_int,
    xs: *const ScalarHandle,
    count: c_int,
    out: *mut PveBatchHandle,
) -> c_int {
    ffi_call("mpcb_pve_batch_encrypt", || {
        require_out(out, "ciphertext")?;
        let kem = kem::resolve(kem)?;
        let xs: Vec<Scalar> = resolve_all(xs, count, ScalarHandle::get)?
            .iter()
            .map(|x| Scalar::clone(x))
            .collect();
        let ct = ops::pve::batch_encrypt(
            engine(),
            kem.as_ref(),
            bytes(ek)?,
            bytes(label)?,
            curve(curve_nid)?,
            &xs,
        )?;
        write_out(out, PveBatchHandle::store(ct))
    })
}

/// # Safety
/// `qs` must hold `count` handles; otherwise as [`mpcb_pve_encrypt`].
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_batch_verify(
    kem: *const KemCallbacks,
    ek: CMem,
    ct: PveBatchHandle,
    qs: *const PointHandle,
    count: c_int,
    label: CMem,
) -> c_int {
    ffi_call("mpcb_pve_batch_verify", || {
        let kem = kem::resolve(kem)?;
        let qs: Vec<Point> = resolve_all(qs, count, PointHandle::get)?
            .iter()
            .map(|q| Point::clone(q))
            .collect();
        ops::pve::batch_verify(engine(), kem.as_ref(), bytes(ek)?, &*ct.get()?, &qs, bytes(label)?)
    })
}

/// Decrypt every scalar into `out`, which has room for `capacity` handles.
/// `capacity` must equal the batch size.
///
/// # Safety
/// `out` must be writable for `capacity` handles; otherwise as
/// [`mpcb_pve_encrypt`].
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_batch_decrypt(
    kem: *const KemCallbacks,
    dk: CMem,
    ek: CMem,
    ct: PveBatchHandle,
    label: CMem,
    curve_nid: c_int,
    out: *mut ScalarHandle,
    capacity: c_int,
) -> c_int {
    ffi_call("mpcb_pve_batch_decrypt", || {
        require_out(out, "scalars")?;
        let ct = ct.get()?;
        let capacity = count(capacity, "output capacity")?;
        if capacity != ct.len() {
            return Err(Error::BadArgument(format!(
                "room for {capacity} scalars, batch holds {}",
                ct.len()
            )));
        }
        let kem = kem::resolve(kem)?;
        let xs = ops::pve::batch_decrypt(
            engine(),
            kem.as_ref(),
            bytes(dk)?,
            bytes(ek)?,
            &ct,
            bytes(label)?,
            curve(curve_nid)?,
        )?;
        for (i, x) in xs.into_iter().enumerate() {
            out.add(i).write(ScalarHandle::store(x));
        }
        Ok(())
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_batch_count(ct: PveBatchHandle, out: *mut c_int) -> c_int {
    ffi_call("mpcb_pve_batch_count", || {
        let len = ct.get()?.len();
        let len = c_int::try_from(len).map_err(|_| Error::BadArgument("batch too large".into()))?;
        write_out(out, len)
    })
}

/// Commitment of element `index`, as an owned point
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_batch_get_q(
    ct: PveBatchHandle,
    index: c_int,
    out: *mut PointHandle,
) -> c_int {
    ffi_call("mpcb_pve_batch_get_q", || {
        require_out(out, "point")?;
        let ct = ct.get()?;
        let q = ct
            .qs()
            .get(count(index, "index")?)
            .ok_or_else(|| Error::BadArgument(format!("index {index} out of range")))?;
        write_out(out, PointHandle::store(q.clone()))
    })
}

/// Borrowed label, valid while `ct` is alive; never free it
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_pve_batch_get_label(ct: PveBatchHandle, out: *mut CMem) -> c_int {
    ffi_call("mpcb_pve_batch_get_label", || {
        let ct = ct.get()?;
        write_out(out, view(ct.label())?)
    })
}

super::persist_entry_points!(PveHandle, PveCiphertext, mpcb_pve_serialize, mpcb_pve_deserialize);
super::persist_entry_points!(
    PveBatchHandle,
    PveBatchCiphertext,
    mpcb_pve_batch_serialize,
    mpcb_pve_batch_deserialize
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::curve::{
        mpcb_curve_mul_generator, mpcb_curve_random_scalar, mpcb_scalar_to_bytes,
    };
    use crate::handles::{mpcb_point_free, mpcb_pve_batch_free, mpcb_pve_free, mpcb_scalar_free};
    use crate::kem::testing::{callbacks, Counter};
    use crate::status::{MPCB_E_BADARG, MPCB_E_CRYPTO, MPCB_SUCCESS};
    use crate::testing::{cmem, take};
    use mpc_bridge_core::{Kem, X25519Kem};
    use std::ptr;
    use std::sync::atomic::Ordering;

    const SECP256K1: c_int = 714;

    fn scalar_bytes(s: ScalarHandle) -> Vec<u8> {
        let mut out = CMem::EMPTY;
        assert_eq!(unsafe { mpcb_scalar_to_bytes(s, &mut out) }, MPCB_SUCCESS);
        take(out)
    }

    #[test]
    fn test_encrypt_verify_decrypt_with_builtin_kem() {
        let dk = X25519Kem::generate_dk();
        let ek = X25519Kem.derive_public(&dk).unwrap();
        let label = b"backup-2024";
        unsafe {
            let (mut x, mut q) = (ScalarHandle::NULL, PointHandle::NULL);
            assert_eq!(mpcb_curve_random_scalar(SECP256K1, &mut x), MPCB_SUCCESS);
            assert_eq!(mpcb_curve_mul_generator(x, &mut q), MPCB_SUCCESS);

            let mut ct = PveHandle::NULL;
            let rc = mpcb_pve_encrypt(ptr::null(), cmem(&ek), cmem(label), SECP256K1, x, &mut ct);
            assert_eq!(rc, MPCB_SUCCESS);
            assert_eq!(mpcb_pve_verify(ptr::null(), cmem(&ek), ct, q, cmem(label)), MPCB_SUCCESS);
            assert_eq!(
                mpcb_pve_verify(ptr::null(), cmem(&ek), ct, q, cmem(b"other")),
                MPCB_E_CRYPTO
            );

            let mut borrowed = CMem::EMPTY;
            assert_eq!(mpcb_pve_get_label(ct, &mut borrowed), MPCB_SUCCESS);
            assert_eq!(crate::mem::borrow(borrowed).unwrap(), label);

            let mut decrypted = ScalarHandle::NULL;
            let rc = mpcb_pve_decrypt(
                ptr::null(),
                cmem(&dk),
                cmem(&ek),
                ct,
                cmem(label),
                SECP256K1,
                &mut decrypted,
            );
            assert_eq!(rc, MPCB_SUCCESS);
            assert_eq!(scalar_bytes(decrypted), scalar_bytes(x));

            mpcb_pve_free(ct);
            mpcb_point_free(q);
            mpcb_scalar_free(x);
            mpcb_scalar_free(decrypted);
        }
    }

    #[test]
    fn test_batch_decrypt_through_caller_kem() {
        let counter = Counter::default();
        let table = callbacks(&counter);
        let dk = X25519Kem::generate_dk();
        let ek = X25519Kem.derive_public(&dk).unwrap();
        let label = b"batch";
        unsafe {
            let mut xs = [ScalarHandle::NULL; 3];
            for x in xs.iter_mut() {
                assert_eq!(mpcb_curve_random_scalar(SECP256K1, x), MPCB_SUCCESS);
            }
            let mut ct = PveBatchHandle::NULL;
            let rc = mpcb_pve_batch_encrypt(
                &table,
                cmem(&ek),
                cmem(label),
                SECP256K1,
                xs.as_ptr(),
                3,
                &mut ct,
            );
            assert_eq!(rc, MPCB_SUCCESS);

            let mut len = 0;
            assert_eq!(mpcb_pve_batch_count(ct, &mut len), MPCB_SUCCESS);
            assert_eq!(len, 3);

            let mut qs = [PointHandle::NULL; 3];
            for (i, q) in qs.iter_mut().enumerate() {
                assert_eq!(mpcb_pve_batch_get_q(ct, i as c_int, q), MPCB_SUCCESS);
            }
            assert_eq!(
                mpcb_pve_batch_verify(&table, cmem(&ek), ct, qs.as_ptr(), 3, cmem(label)),
                MPCB_SUCCESS
            );

            let mut out = [ScalarHandle::NULL; 3];
            let rc = mpcb_pve_batch_decrypt(
                &table,
                cmem(&dk),
                cmem(&ek),
                ct,
                cmem(label),
                SECP256K1,
                out.as_mut_ptr(),
                2,
            );
            assert_eq!(rc, MPCB_E_BADARG);
            assert!(out.iter().all(|h| h.is_null()));

            let rc = mpcb_pve_batch_decrypt(
                &table,
                cmem(&dk),
                cmem(&ek),
                ct,
                cmem(label),
                SECP256K1,
                out.as_mut_ptr(),
                3,
            );
            assert_eq!(rc, MPCB_SUCCESS);
            assert!(counter.decapsulations.load(Ordering::SeqCst) > 0);
            for (x, y) in xs.iter().zip(&out) {
                assert_eq!(scalar_bytes(*x), scalar_bytes(*y));
            }

            mpcb_pve_batch_free(ct);
            for h in xs.into_iter().chain(out) {
                mpcb_scalar_free(h);
            }
            for q in qs {
                mpcb_point_free(q);
            }
        }
    }
}
