//! Protocol engine interface.
//!
//! The bridge treats the cryptographic engine as a black box with a stable
//! functional contract. Interactive methods receive a [`Channel`] and block on
//! it for every round. Every method defaults to [`Error::Unsupported`], so an
//! engine (or a test stub) only implements what it offers.

use crate::buffer::SecretBytes;
use crate::kem::Kem;
use crate::objects::{
    EcdsaKey2p, ElGamalCommitment, KeyShareMp, Paillier, Point, PveBatchCiphertext,
    PveCiphertext, Scalar, SchnorrKey2p,
};
use crate::transport::Channel;
use crate::types::{Curve, PartyIndex, SchnorrVariant, SessionId};
use crate::{Error, Result};

pub mod soft;

pub use soft::SoftEngine;

fn unsupported<T>(engine: &str, op: &str) -> Result<T> {
    Err(Error::Unsupported(format!("{op} is not provided by engine {engine}")))
}

/// Functional contract of a multiparty protocol engine
#[allow(unused_variables)]
pub trait Engine: Send + Sync {
    /// Engine name, for logs
    fn name(&self) -> &'static str;

    // ---- random agreement ----

    /// Two parties agree on `bits` random bits
    fn agree_random(&self, ch: &mut dyn Channel, bits: usize) -> Result<Vec<u8>> {
        unsupported(self.name(), "agree_random")
    }

    /// All parties agree on `bits` random bits; no party can bias the result
    fn multi_agree_random(&self, ch: &mut dyn Channel, bits: usize) -> Result<Vec<u8>> {
        unsupported(self.name(), "multi_agree_random")
    }

    /// Cheaper variant where the last party to speak can bias the result
    fn weak_multi_agree_random(&self, ch: &mut dyn Channel, bits: usize) -> Result<Vec<u8>> {
        unsupported(self.name(), "weak_multi_agree_random")
    }

    /// One value per peer, indexed by party; the local slot is empty
    fn multi_pairwise_agree_random(
        &self,
        ch: &mut dyn Channel,
        bits: usize,
    ) -> Result<Vec<Vec<u8>>> {
        unsupported(self.name(), "multi_pairwise_agree_random")
    }

    // ---- ECDSA ----

    fn ecdsa2p_dkg(&self, ch: &mut dyn Channel, curve: Curve) -> Result<EcdsaKey2p> {
        unsupported(self.name(), "ecdsa2p_dkg")
    }

    fn ecdsa2p_refresh(&self, ch: &mut dyn Channel, key: &EcdsaKey2p) -> Result<EcdsaKey2p> {
        unsupported(self.name(), "ecdsa2p_refresh")
    }

    /// Sign a batch of message hashes. An empty `sid` is replaced by a jointly
    /// generated one. Party 0 receives the signatures, party 1 an empty list.
    /// With `global_abort`, an inconsistent result is reported as
    /// [`Error::PossibleKeyLeak`].
    fn ecdsa2p_sign(
        &self,
        ch: &mut dyn Channel,
        sid: &mut SessionId,
        key: &EcdsaKey2p,
        messages: &[&[u8]],
        global_abort: bool,
    ) -> Result<Vec<Vec<u8>>> {
        unsupported(self.name(), "ecdsa2p_sign")
    }

    fn ecdsamp_dkg(
        &self,
        ch: &mut dyn Channel,
        curve: Curve,
        sid: &mut SessionId,
    ) -> Result<KeyShareMp> {
        unsupported(self.name(), "ecdsamp_dkg")
    }

    fn ecdsamp_refresh(
        &self,
        ch: &mut dyn Channel,
        sid: &mut SessionId,
        key: &KeyShareMp,
    ) -> Result<KeyShareMp> {
        unsupported(self.name(), "ecdsamp_refresh")
    }

    /// Only `receiver` gets the signature; everyone else gets an empty one
    fn ecdsamp_sign(
        &self,
        ch: &mut dyn Channel,
        key: &KeyShareMp,
        message: &[u8],
        receiver: PartyIndex,
    ) -> Result<Vec<u8>> {
        unsupported(self.name(), "ecdsamp_sign")
    }

    // ---- Schnorr ----

    fn schnorr2p_dkg(&self, ch: &mut dyn Channel, curve: Curve) -> Result<SchnorrKey2p> {
        unsupported(self.name(), "schnorr2p_dkg")
    }

    /// Party 0 receives the signatures
    fn schnorr2p_sign(
        &self,
        ch: &mut dyn Channel,
        key: &SchnorrKey2p,
        messages: &[&[u8]],
        variant: SchnorrVariant,
    ) -> Result<Vec<Vec<u8>>> {
        unsupported(self.name(), "schnorr2p_sign")
    }

    fn schnorrmp_dkg(
        &self,
        ch: &mut dyn Channel,
        curve: Curve,
        sid: &mut SessionId,
    ) -> Result<KeyShareMp> {
        unsupported(self.name(), "schnorrmp_dkg")
    }

    fn schnorrmp_refresh(
        &self,
        ch: &mut dyn Channel,
        sid: &mut SessionId,
        key: &KeyShareMp,
    ) -> Result<KeyShareMp> {
        unsupported(self.name(), "schnorrmp_refresh")
    }

    fn schnorrmp_sign(
        &self,
        ch: &mut dyn Channel,
        key: &KeyShareMp,
        messages: &[&[u8]],
        receiver: PartyIndex,
        variant: SchnorrVariant,
    ) -> Result<Vec<Vec<u8>>> {
        unsupported(self.name(), "schnorrmp_sign")
    }

    // ---- curve arithmetic ----

    fn random_scalar(&self, curve: Curve) -> Result<Scalar> {
        unsupported(self.name(), "random_scalar")
    }

    fn scalar_from_bytes(&self, curve: Curve, bytes: &[u8]) -> Result<Scalar> {
        unsupported(self.name(), "scalar_from_bytes")
    }

    fn scalar_add(&self, a: &Scalar, b: &Scalar) -> Result<Scalar> {
        unsupported(self.name(), "scalar_add")
    }

    fn generator(&self, curve: Curve) -> Result<Point> {
        unsupported(self.name(), "generator")
    }

    fn mul_generator(&self, scalar: &Scalar) -> Result<Point> {
        unsupported(self.name(), "mul_generator")
    }

    fn point_from_bytes(&self, curve: Curve, bytes: &[u8]) -> Result<Point> {
        unsupported(self.name(), "point_from_bytes")
    }

    fn point_add(&self, a: &Point, b: &Point) -> Result<Point> {
        unsupported(self.name(), "point_add")
    }

    fn point_mul(&self, point: &Point, scalar: &Scalar) -> Result<Point> {
        unsupported(self.name(), "point_mul")
    }

    /// `(r*G, m*G + r*P)`
    fn elgamal_commit(&self, p: &Point, m: &Scalar, r: &Scalar) -> Result<ElGamalCommitment> {
        unsupported(self.name(), "elgamal_commit")
    }

    // ---- zero-knowledge proofs ----

    /// Knowledge of `w` with `Q = w*G`
    fn zk_dl_prove(&self, q: &Point, w: &Scalar, sid: &[u8], aux: u64) -> Result<Vec<u8>> {
        unsupported(self.name(), "zk_dl_prove")
    }

    fn zk_dl_verify(&self, proof: &[u8], q: &Point, sid: &[u8], aux: u64) -> Result<()> {
        unsupported(self.name(), "zk_dl_verify")
    }

    fn zk_batch_dl_prove(
        &self,
        qs: &[Point],
        ws: &[Scalar],
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        unsupported(self.name(), "zk_batch_dl_prove")
    }

    fn zk_batch_dl_verify(&self, proof: &[u8], qs: &[Point], sid: &[u8], aux: u64) -> Result<()> {
        unsupported(self.name(), "zk_batch_dl_verify")
    }

    /// Knowledge of `w` with `Q = w*G` and `B = w*A`
    fn zk_dh_prove(
        &self,
        q: &Point,
        a: &Point,
        b: &Point,
        w: &Scalar,
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        unsupported(self.name(), "zk_dh_prove")
    }

    #[allow(clippy::too_many_arguments)]
    fn zk_dh_verify(
        &self,
        proof: &[u8],
        q: &Point,
        a: &Point,
        b: &Point,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        unsupported(self.name(), "zk_dh_verify")
    }

    /// Knowledge of `(x, r)` opening `com` under base `q`
    fn zk_elgamal_com_prove(
        &self,
        q: &Point,
        com: &ElGamalCommitment,
        x: &Scalar,
        r: &Scalar,
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        unsupported(self.name(), "zk_elgamal_com_prove")
    }

    fn zk_elgamal_com_verify(
        &self,
        proof: &[u8],
        q: &Point,
        com: &ElGamalCommitment,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        unsupported(self.name(), "zk_elgamal_com_verify")
    }

    /// Knowledge of `r` with `b = (r*G, a + r*Q)`: `b` commits to the
    /// discrete log of `a`
    #[allow(clippy::too_many_arguments)]
    fn zk_elgamal_com_pub_share_equ_prove(
        &self,
        q: &Point,
        a: &Point,
        b: &ElGamalCommitment,
        r: &Scalar,
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        unsupported(self.name(), "zk_elgamal_com_pub_share_equ_prove")
    }

    #[allow(clippy::too_many_arguments)]
    fn zk_elgamal_com_pub_share_equ_verify(
        &self,
        proof: &[u8],
        q: &Point,
        a: &Point,
        b: &ElGamalCommitment,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        unsupported(self.name(), "zk_elgamal_com_pub_share_equ_verify")
    }

    /// `b` commits to `scalar_b` with randomness `r_b`, and `c` is `a`
    /// scaled by `scalar_b` then re-randomized with `r_c`
    #[allow(clippy::too_many_arguments)]
    fn zk_elgamal_com_mult_prove(
        &self,
        q: &Point,
        a: &ElGamalCommitment,
        b: &ElGamalCommitment,
        c: &ElGamalCommitment,
        r_b: &Scalar,
        r_c: &Scalar,
        scalar_b: &Scalar,
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        unsupported(self.name(), "zk_elgamal_com_mult_prove")
    }

    #[allow(clippy::too_many_arguments)]
    fn zk_elgamal_com_mult_verify(
        &self,
        proof: &[u8],
        q: &Point,
        a: &ElGamalCommitment,
        b: &ElGamalCommitment,
        c: &ElGamalCommitment,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        unsupported(self.name(), "zk_elgamal_com_mult_verify")
    }

    /// `eb` is `ea` scaled by the secret `c` then re-randomized with `r0`
    #[allow(clippy::too_many_arguments)]
    fn zk_elgamal_com_mult_private_scalar_prove(
        &self,
        e: &Point,
        ea: &ElGamalCommitment,
        eb: &ElGamalCommitment,
        r0: &Scalar,
        c: &Scalar,
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        unsupported(self.name(), "zk_elgamal_com_mult_private_scalar_prove")
    }

    #[allow(clippy::too_many_arguments)]
    fn zk_elgamal_com_mult_private_scalar_verify(
        &self,
        proof: &[u8],
        e: &Point,
        ea: &ElGamalCommitment,
        eb: &ElGamalCommitment,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        unsupported(self.name(), "zk_elgamal_com_mult_private_scalar_verify")
    }

    // ---- Paillier ----

    fn paillier_generate(&self) -> Result<Paillier> {
        unsupported(self.name(), "paillier_generate")
    }

    /// Check that a private key's factors match its modulus
    fn paillier_check(&self, key: &Paillier) -> Result<()> {
        unsupported(self.name(), "paillier_check")
    }

    fn paillier_encrypt(&self, key: &Paillier, plaintext: &[u8]) -> Result<Vec<u8>> {
        unsupported(self.name(), "paillier_encrypt")
    }

    fn paillier_decrypt(&self, key: &Paillier, ciphertext: &[u8]) -> Result<SecretBytes> {
        unsupported(self.name(), "paillier_decrypt")
    }

    fn paillier_add(&self, key: &Paillier, c1: &[u8], c2: &[u8]) -> Result<Vec<u8>> {
        unsupported(self.name(), "paillier_add")
    }

    fn paillier_mul_scalar(&self, key: &Paillier, c: &[u8], scalar: &[u8]) -> Result<Vec<u8>> {
        unsupported(self.name(), "paillier_mul_scalar")
    }

    fn paillier_verify_cipher(&self, key: &Paillier, c: &[u8]) -> Result<()> {
        unsupported(self.name(), "paillier_verify_cipher")
    }

    // ---- publicly verifiable encryption ----

    fn pve_encrypt(
        &self,
        kem: &dyn Kem,
        ek: &[u8],
        label: &[u8],
        x: &Scalar,
    ) -> Result<PveCiphertext> {
        unsupported(self.name(), "pve_encrypt")
    }

    fn pve_verify(
        &self,
        kem: &dyn Kem,
        ek: &[u8],
        ct: &PveCiphertext,
        q: &Point,
        label: &[u8],
    ) -> Result<()> {
        unsupported(self.name(), "pve_verify")
    }

    fn pve_decrypt(
        &self,
        kem: &dyn Kem,
        dk: &[u8],
        ek: &[u8],
        ct: &PveCiphertext,
        label: &[u8],
    ) -> Result<Scalar> {
        unsupported(self.name(), "pve_decrypt")
    }

    fn pve_batch_encrypt(
        &self,
        kem: &dyn Kem,
        ek: &[u8],
        label: &[u8],
        xs: &[Scalar],
    ) -> Result<PveBatchCiphertext> {
        unsupported(self.name(), "pve_batch_encrypt")
    }

    fn pve_batch_verify(
        &self,
        kem: &dyn Kem,
        ek: &[u8],
        ct: &PveBatchCiphertext,
        qs: &[Point],
        label: &[u8],
    ) -> Result<()> {
        unsupported(self.name(), "pve_batch_verify")
    }

    fn pve_batch_decrypt(
        &self,
        kem: &dyn Kem,
        dk: &[u8],
        ek: &[u8],
        ct: &PveBatchCiphertext,
        label: &[u8],
    ) -> Result<Vec<Scalar>> {
        unsupported(self.name(), "pve_batch_decrypt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    impl Engine for Empty {
        fn name(&self) -> &'static str {
            "empty"
        }
    }

    #[test]
    fn test_defaults_are_unsupported() {
        assert!(matches!(
            Empty.random_scalar(Curve::Secp256k1),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(Empty.paillier_generate(), Err(Error::Unsupported(_))));
    }
}
