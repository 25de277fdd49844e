//! Paillier homomorphic encryption. Plaintexts, ciphertexts and scalars are
//! unsigned big-endian integers.

use super::{bytes, outputs, persist_entry_points};
use crate::engine;
use crate::handles::PaillierHandle;
use crate::mem::CMem;
use crate::status::{ffi_call, require_out, write_out};
use mpc_bridge_core::objects::Paillier;
use mpc_bridge_core::{ops, Result};
use std::os::raw::c_int;

/// # Safety
/// `out` must be writable.
unsafe fn emit(out: *mut CMem, value: &[u8]) -> Result<()> {
    let mut outputs = outputs();
    outputs.mem(out, value)?;
    outputs.commit();
    Ok(())
}

/// Fresh private key, sized by the engine configuration
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_generate(out: *mut PaillierHandle) -> c_int {
    ffi_call("mpcb_paillier_generate", || {
        require_out(out, "key")?;
        let key = ops::paillier::generate(engine())?;
        write_out(out, PaillierHandle::store(key))
    })
}

/// Public key from its modulus
///
/// # Safety
/// `n` must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_from_public(n: CMem, out: *mut PaillierHandle) -> c_int {
    ffi_call("mpcb_paillier_from_public", || {
        require_out(out, "key")?;
        let key = ops::paillier::from_public(bytes(n)?)?;
        write_out(out, PaillierHandle::store(key))
    })
}

/// Private key from the modulus and its factors, which are checked
///
/// # Safety
/// Inputs must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_from_private(
    n: CMem,
    p: CMem,
    q: CMem,
    out: *mut PaillierHandle,
) -> c_int {
    ffi_call("mpcb_paillier_from_private", || {
        require_out(out, "key")?;
        let key = ops::paillier::from_private(engine(), bytes(n)?, bytes(p)?, bytes(q)?)?;
        write_out(out, PaillierHandle::store(key))
    })
}

/// Writes 1 when the factors are present
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_has_private_key(
    key: PaillierHandle,
    out: *mut c_int,
) -> c_int {
    ffi_call("mpcb_paillier_has_private_key", || {
        let has = ops::paillier::has_private_key(&*key.get()?);
        write_out(out, c_int::from(has))
    })
}

/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_get_n(key: PaillierHandle, out: *mut CMem) -> c_int {
    ffi_call("mpcb_paillier_get_n", || {
        require_out(out, "modulus")?;
        emit(out, &ops::paillier::n(&*key.get()?))
    })
}

/// # Safety
/// `plaintext` must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_encrypt(
    key: PaillierHandle,
    plaintext: CMem,
    out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_paillier_encrypt", || {
        require_out(out, "ciphertext")?;
        let cipher = ops::paillier::encrypt(engine(), &*key.get()?, bytes(plaintext)?)?;
        emit(out, &cipher)
    })
}

/// Needs a private key. The plaintext is zeroed by `mpcb_cmem_free`.
///
/// # Safety
/// `ciphertext` must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_decrypt(
    key: PaillierHandle,
    ciphertext: CMem,
    out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_paillier_decrypt", || {
        require_out(out, "plaintext")?;
        let plain = ops::paillier::decrypt(engine(), &*key.get()?, bytes(ciphertext)?)?;
        emit(out, &plain)
    })
}

/// Ciphertext of the sum of both plaintexts
///
/// # Safety
/// Inputs must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_add_ciphers(
    key: PaillierHandle,
    c1: CMem,
    c2: CMem,
    out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_paillier_add_ciphers", || {
        require_out(out, "ciphertext")?;
        let sum = ops::paillier::add_ciphers(engine(), &*key.get()?, bytes(c1)?, bytes(c2)?)?;
        emit(out, &sum)
    })
}

/// Ciphertext of the plaintext times `scalar`
///
/// # Safety
/// Inputs must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_mul_scalar(
    key: PaillierHandle,
    c: CMem,
    scalar: CMem,
    out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_paillier_mul_scalar", || {
        require_out(out, "ciphertext")?;
        let product = ops::paillier::mul_scalar(engine(), &*key.get()?, bytes(c)?, bytes(scalar)?)?;
        emit(out, &product)
    })
}

/// Success when `c` is a well-formed ciphertext under `key`
///
/// # Safety
/// `c` must be readable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_paillier_verify_cipher(key: PaillierHandle, c: CMem) -> c_int {
    ffi_call("mpcb_paillier_verify_cipher", || {
        ops::paillier::verify_cipher(engine(), &*key.get()?, bytes(c)?)
    })
}

persist_entry_points!(PaillierHandle, Paillier, mpcb_paillier_serialize, mpcb_paillier_deserialize);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::mpcb_paillier_free;
    use crate::status::{MPCB_E_BADARG, MPCB_SUCCESS};
    use crate::testing::{cmem, take};

    #[test]
    fn test_homomorphic_ops_through_handles() {
        unsafe {
            let mut private = PaillierHandle::NULL;
            assert_eq!(mpcb_paillier_generate(&mut private), MPCB_SUCCESS);
            let mut n = CMem::EMPTY;
            assert_eq!(mpcb_paillier_get_n(private, &mut n), MPCB_SUCCESS);
            let n = take(n);

            let mut public = PaillierHandle::NULL;
            assert_eq!(mpcb_paillier_from_public(cmem(&n), &mut public), MPCB_SUCCESS);
            let mut has = -1;
            assert_eq!(mpcb_paillier_has_private_key(public, &mut has), MPCB_SUCCESS);
            assert_eq!(has, 0);

            let (mut c1, mut c2, mut sum) = (CMem::EMPTY, CMem::EMPTY, CMem::EMPTY);
            assert_eq!(mpcb_paillier_encrypt(public, cmem(&[20]), &mut c1), MPCB_SUCCESS);
            assert_eq!(mpcb_paillier_encrypt(public, cmem(&[22]), &mut c2), MPCB_SUCCESS);
            let (c1, c2) = (take(c1), take(c2));
            assert_eq!(
                mpcb_paillier_add_ciphers(public, cmem(&c1), cmem(&c2), &mut sum),
                MPCB_SUCCESS
            );
            let sum = take(sum);
            assert_eq!(mpcb_paillier_verify_cipher(public, cmem(&sum)), MPCB_SUCCESS);

            let mut plain = CMem::EMPTY;
            assert_eq!(mpcb_paillier_decrypt(public, cmem(&sum), &mut plain), MPCB_E_BADARG);
            assert_eq!(mpcb_paillier_decrypt(private, cmem(&sum), &mut plain), MPCB_SUCCESS);
            assert_eq!(take(plain), vec![42]);

            let mut encoded = CMem::EMPTY;
            assert_eq!(mpcb_paillier_serialize(private, &mut encoded), MPCB_SUCCESS);
            let encoded = take(encoded);
            let mut restored = PaillierHandle::NULL;
            assert_eq!(mpcb_paillier_deserialize(cmem(&encoded), &mut restored), MPCB_SUCCESS);
            let mut triple = CMem::EMPTY;
            let rc = mpcb_paillier_mul_scalar(public, cmem(&c1), cmem(&[3]), &mut triple);
            assert_eq!(rc, MPCB_SUCCESS);
            let triple = take(triple);
            let mut plain = CMem::EMPTY;
            assert_eq!(mpcb_paillier_decrypt(restored, cmem(&triple), &mut plain), MPCB_SUCCESS);
            assert_eq!(take(plain), vec![60]);

            for key in [private, public, restored] {
                assert_eq!(mpcb_paillier_free(key), MPCB_SUCCESS);
            }
        }
    }
}
