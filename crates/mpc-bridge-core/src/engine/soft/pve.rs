//! Publicly verifiable encryption of discrete logs by cut-and-choose.
//!
//! Each row splits every secret `x` into `x0 + x1`, publishes `x0*G` and
//! encrypts both halves under independent KEM encapsulations. A Fiat-Shamir
//! challenge over the whole ciphertext selects one half per row to open by
//! revealing its encapsulation seed; the other half stays sealed for the
//! decryptor. A single value is the batch of length one.

use super::curve::{decode_point, decode_scalar, encode_point, encode_scalar, random_scalar};
use crate::codec;
use crate::config::EngineConfig;
use crate::kem::Kem;
use crate::{Error, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use k256::{ProjectivePoint, Scalar};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

#[cfg(feature = "multi-thread")]
use rayon::prelude::*;

const AEAD_CONTEXT: &str = "mpc-bridge 2024 pve row key";

#[derive(Serialize, Deserialize)]
struct Half {
    kem_ct: Vec<u8>,
    sealed: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct Row {
    /// `x0*G` for every value
    r0: Vec<Vec<u8>>,
    halves: [Half; 2],
    /// Encapsulation seed of the half selected by the challenge
    opened_rho: [u8; 32],
}

#[derive(Serialize, Deserialize)]
struct Body {
    rows: Vec<Row>,
}

fn aad(label: &[u8], qs: &[ProjectivePoint], row: usize, side: usize) -> Vec<u8> {
    let mut aad = Vec::with_capacity(label.len() + 33 * qs.len() + 16);
    aad.extend_from_slice(&(label.len() as u64).to_be_bytes());
    aad.extend_from_slice(label);
    for q in qs {
        aad.extend_from_slice(&encode_point(q));
    }
    aad.extend_from_slice(&(row as u64).to_be_bytes());
    aad.push(side as u8);
    aad
}

fn cipher(shared: &[u8]) -> ChaCha20Poly1305 {
    let key = Zeroizing::new(blake3::derive_key(AEAD_CONTEXT, shared));
    ChaCha20Poly1305::new(Key::from_slice(&key[..]))
}

fn seal(shared: &[u8], values: &[Scalar], aad: &[u8]) -> Result<Vec<u8>> {
    let mut plain = Zeroizing::new(Vec::with_capacity(32 * values.len()));
    for v in values {
        plain.extend_from_slice(&encode_scalar(v));
    }
    // Every key is derived from a fresh encapsulation, so a fixed nonce is safe
    cipher(shared)
        .encrypt(
            Nonce::from_slice(&[0u8; 12]),
            Payload {
                msg: &plain,
                aad,
            },
        )
        .map_err(|_| Error::Crypto("pve encryption failed".into()))
}

fn open(shared: &[u8], sealed: &[u8], aad: &[u8], count: usize) -> Result<Vec<Scalar>> {
    let plain = Zeroizing::new(
        cipher(shared)
            .decrypt(Nonce::from_slice(&[0u8; 12]), Payload { msg: sealed, aad })
            .map_err(|_| Error::Crypto("pve row does not decrypt".into()))?,
    );
    if plain.len() != 32 * count {
        return Err(Error::Crypto("pve row has the wrong size".into()));
    }
    plain.chunks(32).map(decode_scalar).collect()
}

/// One challenge bit per row, from the hash of everything public
fn challenge(label: &[u8], qs: &[ProjectivePoint], rows: &[Row]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"mpc-bridge pve challenge");
    hasher.update(aad(label, qs, rows.len(), 0));
    for row in rows {
        for r0 in &row.r0 {
            hasher.update(r0);
        }
        for half in &row.halves {
            hasher.update(&half.kem_ct);
            hasher.update(&half.sealed);
        }
    }
    hasher.finalize().into()
}

fn bit(challenge: &[u8; 32], row: usize) -> usize {
    ((challenge[row / 8] >> (row % 8)) & 1) as usize
}

fn public_halves(
    qs: &[ProjectivePoint],
    r0: &[ProjectivePoint],
    side: usize,
) -> Vec<ProjectivePoint> {
    if side == 0 {
        r0.to_vec()
    } else {
        qs.iter().zip(r0).map(|(q, r)| *q - r).collect()
    }
}

/// Encrypt `xs` to `ek`, bound to `label`
#[instrument(skip_all, fields(count = xs.len(), rows = rows))]
pub(crate) fn encrypt(
    kem: &dyn Kem,
    ek: &[u8],
    label: &[u8],
    xs: &[Scalar],
    rows: usize,
) -> Result<(Vec<ProjectivePoint>, Vec<u8>)> {
    if xs.is_empty() {
        return Err(Error::BadArgument("nothing to encrypt".into()));
    }
    let qs: Vec<ProjectivePoint> = xs.iter().map(|x| ProjectivePoint::GENERATOR * x).collect();

    let mut built = Vec::with_capacity(rows);
    let mut seeds = Vec::with_capacity(rows);
    for row in 0..rows {
        let x0: Vec<Scalar> = xs.iter().map(|_| random_scalar()).collect();
        let x1: Vec<Scalar> = xs.iter().zip(&x0).map(|(x, a)| x - a).collect();
        let mut rho = [[0u8; 32]; 2];
        let mut halves = Vec::with_capacity(2);
        for (side, values) in [&x0, &x1].into_iter().enumerate() {
            rand::thread_rng().fill_bytes(&mut rho[side]);
            let (kem_ct, shared) = kem.encapsulate(ek, &rho[side])?;
            let sealed = seal(&shared, values, &aad(label, &qs, row, side))?;
            halves.push(Half { kem_ct, sealed });
        }
        let (Some(second), Some(first)) = (halves.pop(), halves.pop()) else {
            return Err(Error::Crypto("pve row is incomplete".into()));
        };
        built.push(Row {
            r0: x0.iter().map(|a| encode_point(&(ProjectivePoint::GENERATOR * a))).collect(),
            halves: [first, second],
            opened_rho: [0u8; 32],
        });
        seeds.push(Zeroizing::new(rho));
    }

    let c = challenge(label, &qs, &built);
    for (index, (row, rho)) in built.iter_mut().zip(&seeds).enumerate() {
        row.opened_rho = rho[bit(&c, index)];
    }
    debug!(rows, "PVE ciphertext built");
    Ok((qs, codec::encode(&Body { rows: built })?))
}

fn decode_body(body: &[u8], count: usize) -> Result<Body> {
    let body: Body =
        codec::decode(body).map_err(|_| Error::Crypto("malformed pve ciphertext".into()))?;
    if body.rows.is_empty() || body.rows.len() > EngineConfig::MAX_PVE_ROWS {
        return Err(Error::Crypto("pve ciphertext has no usable rows".into()));
    }
    if body.rows.iter().any(|r| r.r0.len() != count) {
        return Err(Error::Crypto("pve row does not match the statement".into()));
    }
    Ok(body)
}

fn verify_row(
    kem: &dyn Kem,
    ek: &[u8],
    label: &[u8],
    qs: &[ProjectivePoint],
    index: usize,
    row: &Row,
    side: usize,
) -> Result<()> {
    let r0 = row
        .r0
        .iter()
        .map(|p| decode_point(p))
        .collect::<Result<Vec<_>>>()?;
    let half = &row.halves[side];
    let (kem_ct, shared) = kem.encapsulate(ek, &row.opened_rho)?;
    if kem_ct != half.kem_ct {
        return Err(Error::Crypto(format!("pve row {index} opened a different encapsulation")));
    }
    let values = open(&shared, &half.sealed, &aad(label, qs, index, side), qs.len())?;
    let expected = public_halves(qs, &r0, side);
    for (v, p) in values.iter().zip(&expected) {
        if ProjectivePoint::GENERATOR * v != *p {
            return Err(Error::Crypto(format!("pve row {index} is inconsistent")));
        }
    }
    Ok(())
}

/// Check that `body` encrypts discrete logs of `qs` to `ek` under `label`
#[instrument(skip_all, fields(count = qs.len()))]
pub(crate) fn verify(
    kem: &dyn Kem,
    ek: &[u8],
    label: &[u8],
    qs: &[ProjectivePoint],
    body: &[u8],
) -> Result<()> {
    let body = decode_body(body, qs.len())?;
    let c = challenge(label, qs, &body.rows);
    let check =
        |(index, row): (usize, &Row)| verify_row(kem, ek, label, qs, index, row, bit(&c, index));

    #[cfg(feature = "multi-thread")]
    body.rows.par_iter().enumerate().try_for_each(check)?;
    #[cfg(not(feature = "multi-thread"))]
    body.rows.iter().enumerate().try_for_each(check)?;

    debug!(rows = body.rows.len(), "PVE ciphertext verified");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decrypt_row(
    kem: &dyn Kem,
    dk: &[u8],
    ek: &[u8],
    label: &[u8],
    qs: &[ProjectivePoint],
    index: usize,
    row: &Row,
    opened: usize,
) -> Result<Vec<Scalar>> {
    let sealed = 1 - opened;
    let (_, shared) = kem.encapsulate(ek, &row.opened_rho)?;
    let aad_opened = aad(label, qs, index, opened);
    let known = open(&shared, &row.halves[opened].sealed, &aad_opened, qs.len())?;
    let shared = kem.decapsulate(dk, &row.halves[sealed].kem_ct)?;
    let aad_sealed = aad(label, qs, index, sealed);
    let hidden = open(&shared, &row.halves[sealed].sealed, &aad_sealed, qs.len())?;

    let xs: Vec<Scalar> = known.iter().zip(&hidden).map(|(a, b)| a + b).collect();
    if xs.iter().zip(qs).all(|(x, q)| ProjectivePoint::GENERATOR * x == *q) {
        Ok(xs)
    } else {
        Err(Error::Crypto(format!("pve row {index} decrypts to the wrong value")))
    }
}

/// Recover the encrypted values from the first row that decrypts consistently
#[instrument(skip_all, fields(count = qs.len()))]
pub(crate) fn decrypt(
    kem: &dyn Kem,
    dk: &[u8],
    ek: &[u8],
    label: &[u8],
    qs: &[ProjectivePoint],
    body: &[u8],
) -> Result<Vec<Scalar>> {
    let body = decode_body(body, qs.len())?;
    let c = challenge(label, qs, &body.rows);
    let mut last = Error::Crypto("no pve row decrypts".into());

    for (index, row) in body.rows.iter().enumerate() {
        match decrypt_row(kem, dk, ek, label, qs, index, row, bit(&c, index)) {
            Ok(xs) => return Ok(xs),
            Err(e) => {
                debug!(row = index, error = %e, "Skipping PVE row");
                last = e;
            }
        }
    }
    Err(last)
}
