//! Paillier keys and homomorphic operations

use super::check_non_empty;
use crate::buffer::SecretBytes;
use crate::engine::Engine;
use crate::objects::Paillier;
use crate::Result;
use tracing::instrument;

/// Fresh key with its factorization
#[instrument(skip_all)]
pub fn generate(engine: &dyn Engine) -> Result<Paillier> {
    engine.paillier_generate()
}

/// Public-only key from the modulus
pub fn from_public(n: &[u8]) -> Result<Paillier> {
    Paillier::public(n)
}

/// Key from the modulus and its factors, which must multiply to it
pub fn from_private(engine: &dyn Engine, n: &[u8], p: &[u8], q: &[u8]) -> Result<Paillier> {
    let key = Paillier::private(n, p, q)?;
    engine.paillier_check(&key)?;
    Ok(key)
}

pub fn has_private_key(key: &Paillier) -> bool {
    key.has_private_key()
}

/// Modulus, copied
pub fn n(key: &Paillier) -> Vec<u8> {
    key.n().to_vec()
}

pub fn encrypt(engine: &dyn Engine, key: &Paillier, plaintext: &[u8]) -> Result<Vec<u8>> {
    check_non_empty("plaintext", plaintext)?;
    engine.paillier_encrypt(key, plaintext)
}

/// Needs the private factors
pub fn decrypt(engine: &dyn Engine, key: &Paillier, ciphertext: &[u8]) -> Result<SecretBytes> {
    check_non_empty("ciphertext", ciphertext)?;
    engine.paillier_decrypt(key, ciphertext)
}

pub fn add_ciphers(engine: &dyn Engine, key: &Paillier, c1: &[u8], c2: &[u8]) -> Result<Vec<u8>> {
    check_non_empty("ciphertext", c1)?;
    check_non_empty("ciphertext", c2)?;
    engine.paillier_add(key, c1, c2)
}

pub fn mul_scalar(engine: &dyn Engine, key: &Paillier, c: &[u8], scalar: &[u8]) -> Result<Vec<u8>> {
    check_non_empty("ciphertext", c)?;
    check_non_empty("scalar", scalar)?;
    engine.paillier_mul_scalar(key, c, scalar)
}

pub fn verify_cipher(engine: &dyn Engine, key: &Paillier, c: &[u8]) -> Result<()> {
    check_non_empty("ciphertext", c)?;
    engine.paillier_verify_cipher(key, c)
}
