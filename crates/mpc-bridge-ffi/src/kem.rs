//! Caller-side key encapsulation, passed explicitly to each PVE call.
//!
//! A null table selects the built-in X25519 KEM. Callback outputs are
//! buffers allocated with [`crate::mem::mpcb_cmem_new`]; shared secrets are
//! copied into zeroizing storage and the originals zeroed on release.

use crate::mem::{self, CMem};
use mpc_bridge_core::buffer::{secret, SecretBytes};
use mpc_bridge_core::{Error, Kem, Result, X25519Kem};
use std::os::raw::{c_int, c_void};

pub type EncapsulateFn = unsafe extern "C" fn(
    ctx: *mut c_void,
    ek: CMem,
    rho: *const u8,
    ct_out: *mut CMem,
    ss_out: *mut CMem,
) -> c_int;
pub type DecapsulateFn =
    unsafe extern "C" fn(ctx: *mut c_void, dk: CMem, ct: CMem, ss_out: *mut CMem) -> c_int;
pub type DerivePublicFn =
    unsafe extern "C" fn(ctx: *mut c_void, dk: CMem, ek_out: *mut CMem) -> c_int;

/// KEM callbacks; `rho` always points at 32 bytes and encapsulation must
/// be deterministic in it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KemCallbacks {
    pub ctx: *mut c_void,
    pub encapsulate: Option<EncapsulateFn>,
    pub decapsulate: Option<DecapsulateFn>,
    pub derive_public: Option<DerivePublicFn>,
}

/// Owns one callback output until it has been copied
struct Owned(CMem);

impl Owned {
    fn copy(&self, what: &str) -> Result<Vec<u8>> {
        // SAFETY: filled by the callback with a library buffer
        let bytes = unsafe { mem::borrow(self.0) }
            .map_err(|e| Error::Crypto(format!("malformed kem {what}: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn copy_secret(&self) -> Result<SecretBytes> {
        // SAFETY: as above
        let bytes = unsafe { mem::borrow(self.0) }
            .map_err(|e| Error::Crypto(format!("malformed kem secret: {e}")))?;
        Ok(secret(bytes))
    }
}

impl Drop for Owned {
    fn drop(&mut self) {
        // SAFETY: produced by mpcb_cmem_new as required of the callback
        unsafe { mem::mpcb_cmem_free(self.0) };
    }
}

/// View a borrowed slice as an input buffer. The callee must not write to it.
fn input(bytes: &[u8]) -> Result<CMem> {
    if bytes.is_empty() {
        return Ok(CMem::EMPTY);
    }
    let size = c_int::try_from(bytes.len())
        .map_err(|_| Error::BadArgument("kem input too large".into()))?;
    Ok(CMem {
        data: bytes.as_ptr().cast_mut(),
        size,
    })
}

fn check_status(what: &str, status: c_int) -> Result<()> {
    match status {
        0 => Ok(()),
        code => Err(Error::Crypto(format!("kem {what} callback returned {code:#x}"))),
    }
}

/// [`Kem`] forwarding to a [`KemCallbacks`] table
#[derive(Debug)]
pub struct CallbackKem {
    ctx: *mut c_void,
    encapsulate: EncapsulateFn,
    decapsulate: DecapsulateFn,
    derive_public: DerivePublicFn,
}

// SAFETY: the caller guarantees the context is usable from the calling
// thread for the duration of the call; the table does not outlive it.
unsafe impl Send for CallbackKem {}
unsafe impl Sync for CallbackKem {}

impl CallbackKem {
    pub fn new(table: &KemCallbacks) -> Result<Self> {
        match (table.encapsulate, table.decapsulate, table.derive_public) {
            (Some(encapsulate), Some(decapsulate), Some(derive_public)) => Ok(Self {
                ctx: table.ctx,
                encapsulate,
                decapsulate,
                derive_public,
            }),
            _ => Err(Error::BadArgument("incomplete kem callback table".into())),
        }
    }
}

impl Kem for CallbackKem {
    fn encapsulate(&self, ek: &[u8], rho: &[u8; 32]) -> Result<(Vec<u8>, SecretBytes)> {
        let mut ct = CMem::EMPTY;
        let mut ss = CMem::EMPTY;
        // SAFETY: inputs outlive the call and both outputs are writable
        let status =
            unsafe { (self.encapsulate)(self.ctx, input(ek)?, rho.as_ptr(), &mut ct, &mut ss) };
        let (ct, ss) = (Owned(ct), Owned(ss));
        check_status("encapsulate", status)?;
        Ok((ct.copy("ciphertext")?, ss.copy_secret()?))
    }

    fn decapsulate(&self, dk: &[u8], ciphertext: &[u8]) -> Result<SecretBytes> {
        let mut ss = CMem::EMPTY;
        // SAFETY: as above
        let status =
            unsafe { (self.decapsulate)(self.ctx, input(dk)?, input(ciphertext)?, &mut ss) };
        let ss = Owned(ss);
        check_status("decapsulate", status)?;
        ss.copy_secret()
    }

    fn derive_public(&self, dk: &[u8]) -> Result<Vec<u8>> {
        let mut ek = CMem::EMPTY;
        // SAFETY: as above
        let status = unsafe { (self.derive_public)(self.ctx, input(dk)?, &mut ek) };
        let ek = Owned(ek);
        check_status("derive_public", status)?;
        ek.copy("encapsulation key")
    }
}

/// The KEM selected by a caller table pointer
///
/// # Safety
/// `table` must be null or point at a valid [`KemCallbacks`].
pub(crate) unsafe fn resolve(table: *const KemCallbacks) -> Result<Box<dyn Kem>> {
    match table.as_ref() {
        None => Ok(Box::new(X25519Kem)),
        Some(table) => Ok(Box::new(CallbackKem::new(table)?)),
    }
}
