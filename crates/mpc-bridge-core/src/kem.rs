//! Key encapsulation used by publicly verifiable encryption.
//!
//! The KEM is always passed explicitly to the PVE operations that need it.
//! Encapsulation must be deterministic in `rho`: verifiers re-run it on
//! revealed seeds and compare the results.

use crate::buffer::SecretBytes;
use crate::{Error, Result};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Deterministic key encapsulation mechanism.
///
/// `ek` and `dk` are opaque to the bridge: a caller-side implementation may
/// treat `dk` as a reference to a key held elsewhere (an HSM slot, a key id).
pub trait Kem: Send + Sync {
    /// Encapsulate to `ek` using seed `rho`, returning `(ciphertext, shared secret)`
    fn encapsulate(&self, ek: &[u8], rho: &[u8; 32]) -> Result<(Vec<u8>, SecretBytes)>;

    /// Recover the shared secret from `ciphertext`
    fn decapsulate(&self, dk: &[u8], ciphertext: &[u8]) -> Result<SecretBytes>;

    /// Encapsulation key matching `dk`
    fn derive_public(&self, dk: &[u8]) -> Result<Vec<u8>>;
}

impl<K: Kem + ?Sized> Kem for &K {
    fn encapsulate(&self, ek: &[u8], rho: &[u8; 32]) -> Result<(Vec<u8>, SecretBytes)> {
        (**self).encapsulate(ek, rho)
    }

    fn decapsulate(&self, dk: &[u8], ciphertext: &[u8]) -> Result<SecretBytes> {
        (**self).decapsulate(dk, ciphertext)
    }

    fn derive_public(&self, dk: &[u8]) -> Result<Vec<u8>> {
        (**self).derive_public(dk)
    }
}

const KDF_CONTEXT: &str = "mpc-bridge 2024 x25519 kem shared secret";

/// X25519 KEM with the ephemeral key drawn from a ChaCha20 stream seeded by `rho`
#[derive(Debug, Default, Clone, Copy)]
pub struct X25519Kem;

impl X25519Kem {
    /// Fresh decapsulation key
    pub fn generate_dk() -> SecretBytes {
        let secret = StaticSecret::random_from_rng(rand::rngs::OsRng);
        Zeroizing::new(secret.to_bytes().to_vec())
    }

    fn key32(bytes: &[u8], what: &str) -> Result<[u8; 32]> {
        bytes
            .try_into()
            .map_err(|_| Error::BadArgument(format!("x25519 {what} must be 32 bytes")))
    }

    fn derive(shared: &[u8; 32], ct: &[u8; 32], ek: &[u8; 32]) -> SecretBytes {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
        hasher.update(shared);
        hasher.update(ct);
        hasher.update(ek);
        Zeroizing::new(hasher.finalize().as_bytes().to_vec())
    }
}

impl Kem for X25519Kem {
    fn encapsulate(&self, ek: &[u8], rho: &[u8; 32]) -> Result<(Vec<u8>, SecretBytes)> {
        let ek = Self::key32(ek, "encapsulation key")?;
        let eph = StaticSecret::random_from_rng(ChaCha20Rng::from_seed(*rho));
        let ct = PublicKey::from(&eph).to_bytes();
        let shared = eph.diffie_hellman(&PublicKey::from(ek));
        if !shared.was_contributory() {
            return Err(Error::BadArgument("low-order x25519 encapsulation key".into()));
        }
        Ok((ct.to_vec(), Self::derive(shared.as_bytes(), &ct, &ek)))
    }

    fn decapsulate(&self, dk: &[u8], ciphertext: &[u8]) -> Result<SecretBytes> {
        let dk = Zeroizing::new(Self::key32(dk, "decapsulation key")?);
        let ct = Self::key32(ciphertext, "ciphertext")
            .map_err(|e| Error::Crypto(e.to_string()))?;
        let secret = StaticSecret::from(*dk);
        let ek = PublicKey::from(&secret).to_bytes();
        let shared = secret.diffie_hellman(&PublicKey::from(ct));
        if !shared.was_contributory() {
            return Err(Error::Crypto("low-order x25519 ciphertext".into()));
        }
        Ok(Self::derive(shared.as_bytes(), &ct, &ek))
    }

    fn derive_public(&self, dk: &[u8]) -> Result<Vec<u8>> {
        let dk = Zeroizing::new(Self::key32(dk, "decapsulation key")?);
        Ok(PublicKey::from(&StaticSecret::from(*dk)).to_bytes().to_vec())
    }
}
