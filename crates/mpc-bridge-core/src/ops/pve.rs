//! Publicly verifiable encryption of discrete logs.
//!
//! The KEM is always an explicit argument. Accessors on the ciphertext
//! objects (`q()`, `qs()`, `label()`) borrow from the ciphertext and are
//! valid only while it is alive.

use super::check_non_empty;
use crate::engine::Engine;
use crate::kem::Kem;
use crate::objects::{Point, PveBatchCiphertext, PveCiphertext, Scalar};
use crate::types::Curve;
use crate::{Error, Result};
use tracing::{debug, instrument};

fn check_curve(expected: Curve, actual: Curve, what: &str) -> Result<()> {
    if expected != actual {
        return Err(Error::BadArgument(format!("{what} is on {actual}, expected {expected}")));
    }
    Ok(())
}

/// Encrypt `x` to `ek` under `label`
#[instrument(skip_all, fields(curve = %curve, label_len = label.len()))]
pub fn encrypt(
    engine: &dyn Engine,
    kem: &dyn Kem,
    ek: &[u8],
    label: &[u8],
    curve: Curve,
    x: &Scalar,
) -> Result<PveCiphertext> {
    check_non_empty("encryption key", ek)?;
    check_non_empty("label", label)?;
    check_curve(curve, x.curve(), "scalar")?;
    let ct = engine.pve_encrypt(kem, ek, label, x)?;
    debug!("PVE ciphertext created");
    Ok(ct)
}

/// Check, without decrypting, that `ct` encrypts the discrete log of `q`
#[instrument(skip_all, fields(label_len = label.len()))]
pub fn verify(
    engine: &dyn Engine,
    kem: &dyn Kem,
    ek: &[u8],
    ct: &PveCiphertext,
    q: &Point,
    label: &[u8],
) -> Result<()> {
    check_non_empty("encryption key", ek)?;
    check_non_empty("label", label)?;
    check_curve(ct.curve(), q.curve(), "point")?;
    engine.pve_verify(kem, ek, ct, q, label)
}

#[instrument(skip_all, fields(curve = %curve, label_len = label.len()))]
pub fn decrypt(
    engine: &dyn Engine,
    kem: &dyn Kem,
    dk: &[u8],
    ek: &[u8],
    ct: &PveCiphertext,
    label: &[u8],
    curve: Curve,
) -> Result<Scalar> {
    check_non_empty("decryption key", dk)?;
    check_non_empty("encryption key", ek)?;
    check_non_empty("label", label)?;
    check_curve(curve, ct.curve(), "ciphertext")?;
    engine.pve_decrypt(kem, dk, ek, ct, label)
}

#[instrument(skip_all, fields(curve = %curve, count = xs.len()))]
pub fn batch_encrypt(
    engine: &dyn Engine,
    kem: &dyn Kem,
    ek: &[u8],
    label: &[u8],
    curve: Curve,
    xs: &[Scalar],
) -> Result<PveBatchCiphertext> {
    check_non_empty("encryption key", ek)?;
    check_non_empty("label", label)?;
    if xs.is_empty() {
        return Err(Error::BadArgument("empty batch".into()));
    }
    for x in xs {
        check_curve(curve, x.curve(), "scalar")?;
    }
    engine.pve_batch_encrypt(kem, ek, label, xs)
}

#[instrument(skip_all, fields(count = qs.len()))]
pub fn batch_verify(
    engine: &dyn Engine,
    kem: &dyn Kem,
    ek: &[u8],
    ct: &PveBatchCiphertext,
    qs: &[Point],
    label: &[u8],
) -> Result<()> {
    check_non_empty("encryption key", ek)?;
    check_non_empty("label", label)?;
    if qs.len() != ct.len() {
        return Err(Error::BadArgument(format!(
            "{} points for a batch of {}",
            qs.len(),
            ct.len()
        )));
    }
    for q in qs {
        check_curve(ct.curve(), q.curve(), "point")?;
    }
    engine.pve_batch_verify(kem, ek, ct, qs, label)
}

#[instrument(skip_all, fields(curve = %curve, count = ct.len()))]
pub fn batch_decrypt(
    engine: &dyn Engine,
    kem: &dyn Kem,
    dk: &[u8],
    ek: &[u8],
    ct: &PveBatchCiphertext,
    label: &[u8],
    curve: Curve,
) -> Result<Vec<Scalar>> {
    check_non_empty("decryption key", dk)?;
    check_non_empty("encryption key", ek)?;
    check_non_empty("label", label)?;
    check_curve(curve, ct.curve(), "ciphertext")?;
    engine.pve_batch_decrypt(kem, dk, ek, ct, label)
}
