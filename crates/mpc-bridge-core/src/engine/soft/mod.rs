//! Reference engine over secp256k1.
//!
//! Keys are additive n-of-n shares. ECDSA signing runs Paillier-based MtA
//! between every pair of parties, Schnorr signing produces BIP-340
//! signatures, and PVE uses cut-and-choose over the caller's KEM. Other
//! curves report [`Error::Unsupported`].

mod agree;
mod curve;
mod ecdsa;
mod keygen;
mod paillier;
mod pve;
mod schnorr;
mod zk;

#[cfg(test)]
pub(crate) mod testing;

use self::curve::{
    decode_point, from_point, from_scalar, parse_scalar, require, to_point, to_scalar,
};
use self::keygen::{Generated, Share};
use self::paillier::{PaillierPublic, PaillierSecret};
use super::Engine;
use crate::buffer::{secret, SecretBytes};
use crate::config::EngineConfig;
use crate::kem::Kem;
use crate::objects::{
    EcdsaKey2p, ElGamalCommitment, KeyKind, KeyShare, KeyShareMp, Paillier, Point,
    PveBatchCiphertext, PveCiphertext, Scalar, SchnorrKey2p,
};
use crate::transport::Channel;
use crate::types::{Curve, PartyIndex, SchnorrVariant, SessionId};
use crate::{Error, Result};
use k256::ProjectivePoint;
use libpaillier::unknown_order::BigNumber;
use tracing::{debug, info};

/// Software implementation of [`Engine`]
#[derive(Debug, Clone, Default)]
pub struct SoftEngine {
    config: EngineConfig,
}

impl SoftEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine configured from the process environment
    pub fn from_env() -> Self {
        Self {
            config: EngineConfig::from_env(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn paillier_bits(&self) -> Option<usize> {
        Some(self.config.paillier_prime_bits)
    }
}

fn key_share<K: KeyKind>(ch: &dyn Channel, generated: Generated) -> KeyShare<K> {
    KeyShare::new(
        ch.party_index(),
        ch.party_count(),
        from_point(&generated.public_key),
        generated.payload,
    )
}

fn check_variant(variant: SchnorrVariant) -> Result<()> {
    match variant {
        SchnorrVariant::Bip340 => Ok(()),
        SchnorrVariant::EdDsa => Err(Error::Unsupported(
            "EdDSA signing needs an Ed25519 engine".into(),
        )),
    }
}

fn same_curve(a: Curve, b: Curve) -> Result<()> {
    if a != b {
        return Err(Error::BadArgument(format!("curve mismatch: {a} vs {b}")));
    }
    Ok(())
}

fn paillier_public(key: &Paillier) -> Result<PaillierPublic> {
    PaillierPublic::from_bytes(key.n())
}

fn paillier_secret(key: &Paillier) -> Result<PaillierSecret> {
    let (p, q) = key
        .factors()
        .ok_or_else(|| Error::BadArgument("paillier key has no private part".into()))?;
    PaillierSecret::from_bytes(key.n(), p, q)
}

type Pair = (ProjectivePoint, ProjectivePoint);

fn commitment(com: &ElGamalCommitment) -> Result<Pair> {
    Ok((to_point(com.l())?, to_point(com.r())?))
}

fn mult_statement<'a>(
    q: &'a ProjectivePoint,
    a: &'a Pair,
    b: &'a Pair,
    c: &'a Pair,
) -> zk::MultStatement<'a> {
    zk::MultStatement {
        q,
        a: zk::Commitment { l: &a.0, r: &a.1 },
        b: zk::Commitment { l: &b.0, r: &b.1 },
        c: zk::Commitment { l: &c.0, r: &c.1 },
    }
}

fn points(qs: &[Point]) -> Result<Vec<ProjectivePoint>> {
    qs.iter().map(to_point).collect()
}

fn scalars(ws: &[Scalar]) -> Result<Vec<k256::Scalar>> {
    ws.iter().map(to_scalar).collect()
}

fn check_label(expected: &[u8], label: &[u8]) -> Result<()> {
    if expected != label {
        return Err(Error::Crypto("ciphertext was made for another label".into()));
    }
    Ok(())
}

impl Engine for SoftEngine {
    fn name(&self) -> &'static str {
        "soft-secp256k1"
    }

    fn agree_random(&self, ch: &mut dyn Channel, bits: usize) -> Result<Vec<u8>> {
        agree::agree(ch, b"mpc-bridge agree-random", bits)
    }

    fn multi_agree_random(&self, ch: &mut dyn Channel, bits: usize) -> Result<Vec<u8>> {
        agree::agree(ch, b"mpc-bridge multi-agree-random", bits)
    }

    fn weak_multi_agree_random(&self, ch: &mut dyn Channel, bits: usize) -> Result<Vec<u8>> {
        agree::weak_agree(ch, b"mpc-bridge weak-multi-agree-random", bits)
    }

    fn multi_pairwise_agree_random(
        &self,
        ch: &mut dyn Channel,
        bits: usize,
    ) -> Result<Vec<Vec<u8>>> {
        agree::pairwise_agree(ch, b"mpc-bridge pairwise-agree-random", bits)
    }

    fn ecdsa2p_dkg(&self, ch: &mut dyn Channel, curve: Curve) -> Result<EcdsaKey2p> {
        require(curve)?;
        let generated = keygen::generate(ch, self.paillier_bits())?;
        Ok(key_share(ch, generated))
    }

    fn ecdsa2p_refresh(&self, ch: &mut dyn Channel, key: &EcdsaKey2p) -> Result<EcdsaKey2p> {
        let share = Share::load_for(ch, key)?;
        let sid = agree::agree(ch, b"mpc-bridge ecdsa2p refresh", 256)?;
        let generated = keygen::refresh(ch, &share, &sid, self.paillier_bits())?;
        Ok(key_share(ch, generated))
    }

    fn ecdsa2p_sign(
        &self,
        ch: &mut dyn Channel,
        sid: &mut SessionId,
        key: &EcdsaKey2p,
        messages: &[&[u8]],
        global_abort: bool,
    ) -> Result<Vec<Vec<u8>>> {
        let share = Share::load_for(ch, key)?;
        agree::ensure_sid(ch, sid, b"mpc-bridge ecdsa2p sign")?;
        ecdsa::sign(ch, &share, sid.as_bytes(), messages, 0, global_abort)
    }

    fn ecdsamp_dkg(
        &self,
        ch: &mut dyn Channel,
        curve: Curve,
        sid: &mut SessionId,
    ) -> Result<KeyShareMp> {
        require(curve)?;
        let generated = keygen::generate(ch, self.paillier_bits())?;
        if sid.is_empty() {
            *sid = SessionId::new(generated.transcript.clone());
            debug!(?sid, "Session id taken from key generation transcript");
        }
        Ok(key_share(ch, generated))
    }

    fn ecdsamp_refresh(
        &self,
        ch: &mut dyn Channel,
        sid: &mut SessionId,
        key: &KeyShareMp,
    ) -> Result<KeyShareMp> {
        let share = Share::load_for(ch, key)?;
        agree::ensure_sid(ch, sid, b"mpc-bridge ecdsamp refresh")?;
        let generated = keygen::refresh(ch, &share, sid.as_bytes(), self.paillier_bits())?;
        Ok(key_share(ch, generated))
    }

    fn ecdsamp_sign(
        &self,
        ch: &mut dyn Channel,
        key: &KeyShareMp,
        message: &[u8],
        receiver: PartyIndex,
    ) -> Result<Vec<u8>> {
        let share = Share::load_for(ch, key)?;
        let sid = agree::agree(ch, b"mpc-bridge ecdsamp sign", 256)?;
        let signatures = ecdsa::sign(ch, &share, &sid, &[message], receiver, false)?;
        Ok(signatures.into_iter().next().unwrap_or_default())
    }

    fn schnorr2p_dkg(&self, ch: &mut dyn Channel, curve: Curve) -> Result<SchnorrKey2p> {
        require(curve)?;
        let generated = keygen::generate(ch, None)?;
        Ok(key_share(ch, generated))
    }

    fn schnorr2p_sign(
        &self,
        ch: &mut dyn Channel,
        key: &SchnorrKey2p,
        messages: &[&[u8]],
        variant: SchnorrVariant,
    ) -> Result<Vec<Vec<u8>>> {
        check_variant(variant)?;
        let share = Share::load_for(ch, key)?;
        schnorr::sign_bip340(ch, &share, messages, 0)
    }

    fn schnorrmp_dkg(
        &self,
        ch: &mut dyn Channel,
        curve: Curve,
        sid: &mut SessionId,
    ) -> Result<KeyShareMp> {
        require(curve)?;
        let generated = keygen::generate(ch, None)?;
        if sid.is_empty() {
            *sid = SessionId::new(generated.transcript.clone());
        }
        Ok(key_share(ch, generated))
    }

    fn schnorrmp_refresh(
        &self,
        ch: &mut dyn Channel,
        sid: &mut SessionId,
        key: &KeyShareMp,
    ) -> Result<KeyShareMp> {
        let share = Share::load_for(ch, key)?;
        agree::ensure_sid(ch, sid, b"mpc-bridge schnorrmp refresh")?;
        let generated = keygen::refresh(ch, &share, sid.as_bytes(), None)?;
        Ok(key_share(ch, generated))
    }

    fn schnorrmp_sign(
        &self,
        ch: &mut dyn Channel,
        key: &KeyShareMp,
        messages: &[&[u8]],
        receiver: PartyIndex,
        variant: SchnorrVariant,
    ) -> Result<Vec<Vec<u8>>> {
        check_variant(variant)?;
        let share = Share::load_for(ch, key)?;
        schnorr::sign_bip340(ch, &share, messages, receiver)
    }

    fn random_scalar(&self, curve: Curve) -> Result<Scalar> {
        require(curve)?;
        Ok(from_scalar(&curve::random_scalar()))
    }

    fn scalar_from_bytes(&self, curve: Curve, bytes: &[u8]) -> Result<Scalar> {
        require(curve)?;
        Ok(from_scalar(&parse_scalar(bytes)?))
    }

    fn scalar_add(&self, a: &Scalar, b: &Scalar) -> Result<Scalar> {
        same_curve(a.curve(), b.curve())?;
        Ok(from_scalar(&(to_scalar(a)? + to_scalar(b)?)))
    }

    fn generator(&self, curve: Curve) -> Result<Point> {
        require(curve)?;
        Ok(from_point(&ProjectivePoint::GENERATOR))
    }

    fn mul_generator(&self, scalar: &Scalar) -> Result<Point> {
        Ok(from_point(&(ProjectivePoint::GENERATOR * to_scalar(scalar)?)))
    }

    fn point_from_bytes(&self, curve: Curve, bytes: &[u8]) -> Result<Point> {
        require(curve)?;
        let point = decode_point(bytes).map_err(|e| Error::BadArgument(e.to_string()))?;
        Ok(from_point(&point))
    }

    fn point_add(&self, a: &Point, b: &Point) -> Result<Point> {
        a.same_curve(b)?;
        Ok(from_point(&(to_point(a)? + to_point(b)?)))
    }

    fn point_mul(&self, point: &Point, scalar: &Scalar) -> Result<Point> {
        same_curve(point.curve(), scalar.curve())?;
        Ok(from_point(&(to_point(point)? * to_scalar(scalar)?)))
    }

    fn elgamal_commit(&self, p: &Point, m: &Scalar, r: &Scalar) -> Result<ElGamalCommitment> {
        same_curve(p.curve(), m.curve())?;
        same_curve(m.curve(), r.curve())?;
        let base = to_point(p)?;
        let (m, r) = (to_scalar(m)?, to_scalar(r)?);
        let l = ProjectivePoint::GENERATOR * r;
        let c = ProjectivePoint::GENERATOR * m + base * r;
        ElGamalCommitment::new(&from_point(&l), &from_point(&c))
    }

    fn zk_dl_prove(&self, q: &Point, w: &Scalar, sid: &[u8], aux: u64) -> Result<Vec<u8>> {
        zk::prove_dl(&to_point(q)?, &to_scalar(w)?, sid, aux)
    }

    fn zk_dl_verify(&self, proof: &[u8], q: &Point, sid: &[u8], aux: u64) -> Result<()> {
        zk::verify_dl(proof, &to_point(q)?, sid, aux)
    }

    fn zk_batch_dl_prove(
        &self,
        qs: &[Point],
        ws: &[Scalar],
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        zk::prove_batch_dl(&points(qs)?, &scalars(ws)?, sid, aux)
    }

    fn zk_batch_dl_verify(&self, proof: &[u8], qs: &[Point], sid: &[u8], aux: u64) -> Result<()> {
        zk::verify_batch_dl(proof, &points(qs)?, sid, aux)
    }

    fn zk_dh_prove(
        &self,
        q: &Point,
        a: &Point,
        b: &Point,
        w: &Scalar,
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        zk::prove_dh(&to_point(q)?, &to_point(a)?, &to_point(b)?, &to_scalar(w)?, sid, aux)
    }

    fn zk_dh_verify(
        &self,
        proof: &[u8],
        q: &Point,
        a: &Point,
        b: &Point,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        zk::verify_dh(proof, &to_point(q)?, &to_point(a)?, &to_point(b)?, sid, aux)
    }

    fn zk_elgamal_com_prove(
        &self,
        q: &Point,
        com: &ElGamalCommitment,
        x: &Scalar,
        r: &Scalar,
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        let (l, c) = commitment(com)?;
        let com = zk::Commitment { l: &l, r: &c };
        zk::prove_elgamal_com(&to_point(q)?, &com, &to_scalar(x)?, &to_scalar(r)?, sid, aux)
    }

    fn zk_elgamal_com_verify(
        &self,
        proof: &[u8],
        q: &Point,
        com: &ElGamalCommitment,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        let (l, c) = commitment(com)?;
        let com = zk::Commitment { l: &l, r: &c };
        zk::verify_elgamal_com(proof, &to_point(q)?, &com, sid, aux)
    }

    fn zk_elgamal_com_pub_share_equ_prove(
        &self,
        q: &Point,
        a: &Point,
        b: &ElGamalCommitment,
        r: &Scalar,
        sid: &[u8],
        aux: u64,
    ) -> Result<Vec<u8>> {
        let (l, c) = commitment(b)?;
        let com = zk::Commitment { l: &l, r: &c };
        let (q, a) = (to_point(q)?, to_point(a)?);
        zk::prove_elgamal_com_pub_share_equ(&q, &a, &com, &to_scalar(r)?, sid, aux)
    }

    fn zk_elgamal_com_pub_share_equ_verify(
        &self,
        proof: &[u8],
        q: &Point,
        a: &Point,
        b: &ElGamalCommitment,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        let (l, c) = commitment(b)?;
        let com = zk::Commitment { l: &l, r: &c };
        zk::verify_elgamal_com_pub_share_equ(proof, &to_point(q)?, &to_point(a)?, &com, sid, aux)
    }

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
        let q = to_point(q)?;
        let (a, b, c) = (commitment(a)?, commitment(b)?, commitment(c)?);
        let st = mult_statement(&q, &a, &b, &c);
        let (scalar_b, r_b, r_c) = (to_scalar(scalar_b)?, to_scalar(r_b)?, to_scalar(r_c)?);
        zk::prove_elgamal_com_mult(&st, &scalar_b, &r_b, &r_c, sid, aux)
    }

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
        let q = to_point(q)?;
        let (a, b, c) = (commitment(a)?, commitment(b)?, commitment(c)?);
        zk::verify_elgamal_com_mult(proof, &mult_statement(&q, &a, &b, &c), sid, aux)
    }

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
        let (al, ar) = commitment(ea)?;
        let (bl, br) = commitment(eb)?;
        let (ea, eb) = (zk::Commitment { l: &al, r: &ar }, zk::Commitment { l: &bl, r: &br });
        let (r0, c) = (to_scalar(r0)?, to_scalar(c)?);
        zk::prove_elgamal_com_mult_private_scalar(&to_point(e)?, &ea, &eb, &r0, &c, sid, aux)
    }

    fn zk_elgamal_com_mult_private_scalar_verify(
        &self,
        proof: &[u8],
        e: &Point,
        ea: &ElGamalCommitment,
        eb: &ElGamalCommitment,
        sid: &[u8],
        aux: u64,
    ) -> Result<()> {
        let (al, ar) = commitment(ea)?;
        let (bl, br) = commitment(eb)?;
        let (ea, eb) = (zk::Commitment { l: &al, r: &ar }, zk::Commitment { l: &bl, r: &br });
        zk::verify_elgamal_com_mult_private_scalar(proof, &to_point(e)?, &ea, &eb, sid, aux)
    }

    fn paillier_generate(&self) -> Result<Paillier> {
        info!(bits = self.config.paillier_prime_bits, "Generating Paillier key");
        let key = PaillierSecret::generate(self.config.paillier_prime_bits)?;
        let (p, q) = key.factors();
        Paillier::private(&key.public().n().to_bytes(), &p, &q)
    }

    fn paillier_check(&self, key: &Paillier) -> Result<()> {
        paillier_secret(key).map(|_| ())
    }

    fn paillier_encrypt(&self, key: &Paillier, plaintext: &[u8]) -> Result<Vec<u8>> {
        let c = paillier_public(key)?.encrypt(&BigNumber::from_slice(plaintext))?;
        Ok(c.to_bytes())
    }

    fn paillier_decrypt(&self, key: &Paillier, ciphertext: &[u8]) -> Result<SecretBytes> {
        let m = paillier_secret(key)?.decrypt(&BigNumber::from_slice(ciphertext))?;
        Ok(secret(&m.to_bytes()))
    }

    fn paillier_add(&self, key: &Paillier, c1: &[u8], c2: &[u8]) -> Result<Vec<u8>> {
        let c = paillier_public(key)?
            .add(&BigNumber::from_slice(c1), &BigNumber::from_slice(c2))?;
        Ok(c.to_bytes())
    }

    fn paillier_mul_scalar(&self, key: &Paillier, c: &[u8], scalar: &[u8]) -> Result<Vec<u8>> {
        let c = paillier_public(key)?
            .mul(&BigNumber::from_slice(c), &BigNumber::from_slice(scalar))?;
        Ok(c.to_bytes())
    }

    fn paillier_verify_cipher(&self, key: &Paillier, c: &[u8]) -> Result<()> {
        paillier_public(key)?.check_cipher(&BigNumber::from_slice(c))
    }

    fn pve_encrypt(
        &self,
        kem: &dyn Kem,
        ek: &[u8],
        label: &[u8],
        x: &Scalar,
    ) -> Result<PveCiphertext> {
        let (qs, body) = pve::encrypt(kem, ek, label, &[to_scalar(x)?], self.config.pve_rows)?;
        let q = qs
            .first()
            .ok_or_else(|| Error::Crypto("pve produced no commitment".into()))?;
        Ok(PveCiphertext::new(label, from_point(q), body))
    }

    fn pve_verify(
        &self,
        kem: &dyn Kem,
        ek: &[u8],
        ct: &PveCiphertext,
        q: &Point,
        label: &[u8],
    ) -> Result<()> {
        check_label(ct.label(), label)?;
        if ct.q() != q {
            return Err(Error::Crypto("ciphertext commits to another point".into()));
        }
        pve::verify(kem, ek, label, &[to_point(q)?], ct.body())
    }

    fn pve_decrypt(
        &self,
        kem: &dyn Kem,
        dk: &[u8],
        ek: &[u8],
        ct: &PveCiphertext,
        label: &[u8],
    ) -> Result<Scalar> {
        check_label(ct.label(), label)?;
        let xs = pve::decrypt(kem, dk, ek, label, &[to_point(ct.q())?], ct.body())?;
        xs.first()
            .map(from_scalar)
            .ok_or_else(|| Error::Crypto("pve decrypted nothing".into()))
    }

    fn pve_batch_encrypt(
        &self,
        kem: &dyn Kem,
        ek: &[u8],
        label: &[u8],
        xs: &[Scalar],
    ) -> Result<PveBatchCiphertext> {
        let (qs, body) = pve::encrypt(kem, ek, label, &scalars(xs)?, self.config.pve_rows)?;
        PveBatchCiphertext::new(label, qs.iter().map(from_point).collect(), body)
    }

    fn pve_batch_verify(
        &self,
        kem: &dyn Kem,
        ek: &[u8],
        ct: &PveBatchCiphertext,
        qs: &[Point],
        label: &[u8],
    ) -> Result<()> {
        check_label(ct.label(), label)?;
        if ct.qs() != qs {
            return Err(Error::Crypto("ciphertext commits to other points".into()));
        }
        pve::verify(kem, ek, label, &points(qs)?, ct.body())
    }

    fn pve_batch_decrypt(
        &self,
        kem: &dyn Kem,
        dk: &[u8],
        ek: &[u8],
        ct: &PveBatchCiphertext,
        label: &[u8],
    ) -> Result<Vec<Scalar>> {
        check_label(ct.label(), label)?;
        let xs = pve::decrypt(kem, dk, ek, label, &points(ct.qs())?, ct.body())?;
        Ok(xs.iter().map(from_scalar).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kem::X25519Kem;
    use crate::objects::Persist;
    use super::testing::{run_2p, run_mp};

    fn engine() -> SoftEngine {
        SoftEngine::new(EngineConfig {
            paillier_prime_bits: 512,
            pve_rows: 8,
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            pve_rows: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(SoftEngine::new(config), Err(Error::BadArgument(_))));
    }

    #[test]
    fn test_other_curves_are_unsupported() {
        let engine = engine();
        for curve in [Curve::P256, Curve::P384, Curve::P521, Curve::Ed25519] {
            assert!(matches!(engine.generator(curve), Err(Error::Unsupported(_))));
            assert!(matches!(engine.random_scalar(curve), Err(Error::Unsupported(_))));
        }
    }

    #[test]
    fn test_curve_arithmetic() {
        let engine = engine();
        let a = engine.random_scalar(Curve::Secp256k1).unwrap();
        let b = engine.random_scalar(Curve::Secp256k1).unwrap();
        let sum = engine.scalar_add(&a, &b).unwrap();

        let lhs = engine.mul_generator(&sum).unwrap();
        let rhs = engine
            .point_add(&engine.mul_generator(&a).unwrap(), &engine.mul_generator(&b).unwrap())
            .unwrap();
        assert_eq!(lhs, rhs);

        let g = engine.generator(Curve::Secp256k1).unwrap();
        assert_eq!(engine.point_mul(&g, &a).unwrap(), engine.mul_generator(&a).unwrap());
        assert_eq!(engine.point_from_bytes(Curve::Secp256k1, g.as_bytes()).unwrap(), g);
        assert!(matches!(
            engine.point_from_bytes(Curve::Secp256k1, &[7; 33]),
            Err(Error::BadArgument(_))
        ));
    }

    #[test]
    fn test_elgamal_commitment_proof() {
        let engine = engine();
        let dk = engine.random_scalar(Curve::Secp256k1).unwrap();
        let q = engine.mul_generator(&dk).unwrap();
        let m = engine.random_scalar(Curve::Secp256k1).unwrap();
        let r = engine.random_scalar(Curve::Secp256k1).unwrap();

        let com = engine.elgamal_commit(&q, &m, &r).unwrap();
        assert_eq!(com.l(), &engine.mul_generator(&r).unwrap());
        let proof = engine.zk_elgamal_com_prove(&q, &com, &m, &r, b"sid", 3).unwrap();
        engine.zk_elgamal_com_verify(&proof, &q, &com, b"sid", 3).unwrap();
        assert!(engine.zk_elgamal_com_verify(&proof, &q, &com, b"sid", 4).is_err());
    }

    #[test]
    fn test_paillier_through_objects() {
        let engine = engine();
        let key = engine.paillier_generate().unwrap();
        engine.paillier_check(&key).unwrap();
        let restored = Paillier::from_bytes(&key.to_bytes().unwrap()).unwrap();

        let c1 = engine.paillier_encrypt(&restored, &[5]).unwrap();
        let c2 = engine.paillier_encrypt(&restored, &[7]).unwrap();
        let sum = engine.paillier_add(&restored, &c1, &c2).unwrap();
        let product = engine.paillier_mul_scalar(&restored, &sum, &[2]).unwrap();
        engine.paillier_verify_cipher(&restored, &product).unwrap();
        assert_eq!(engine.paillier_decrypt(&restored, &product).unwrap().as_slice(), &[24]);

        let public = Paillier::public(key.n()).unwrap();
        assert!(matches!(
            engine.paillier_decrypt(&public, &c1),
            Err(Error::BadArgument(_))
        ));
    }

    #[test]
    fn test_pve_through_objects() {
        let engine = engine();
        let dk = X25519Kem::generate_dk();
        let ek = X25519Kem.derive_public(&dk).unwrap();
        let x = engine.random_scalar(Curve::Secp256k1).unwrap();
        let q = engine.mul_generator(&x).unwrap();

        let ct = engine.pve_encrypt(&X25519Kem, &ek, b"backup", &x).unwrap();
        assert_eq!(ct.q(), &q);
        engine.pve_verify(&X25519Kem, &ek, &ct, &q, b"backup").unwrap();
        let other = engine.generator(Curve::Secp256k1).unwrap();
        assert!(matches!(
            engine.pve_verify(&X25519Kem, &ek, &ct, &other, b"backup"),
            Err(Error::Crypto(_))
        ));
        assert!(engine.pve_verify(&X25519Kem, &ek, &ct, &q, b"other").is_err());
        assert_eq!(engine.pve_decrypt(&X25519Kem, &dk, &ek, &ct, b"backup").unwrap(), x);
    }

    #[test]
    fn test_pve_batch_through_objects() {
        let engine = engine();
        let dk = X25519Kem::generate_dk();
        let ek = X25519Kem.derive_public(&dk).unwrap();
        let xs: Vec<Scalar> = (0..3)
            .map(|_| engine.random_scalar(Curve::Secp256k1).unwrap())
            .collect();
        let qs: Vec<Point> = xs.iter().map(|x| engine.mul_generator(x).unwrap()).collect();

        let ct = engine.pve_batch_encrypt(&X25519Kem, &ek, b"batch", &xs).unwrap();
        assert_eq!(ct.len(), 3);
        engine.pve_batch_verify(&X25519Kem, &ek, &ct, &qs, b"batch").unwrap();
        assert!(engine.pve_batch_verify(&X25519Kem, &ek, &ct, &qs[..2], b"batch").is_err());
        assert_eq!(
            engine.pve_batch_decrypt(&X25519Kem, &dk, &ek, &ct, b"batch").unwrap(),
            xs
        );
    }

    #[test]
    fn test_ecdsa2p_sign_and_refresh() {
        let engine = engine();
        let out = run_2p(move |job| {
            let key = engine.ecdsa2p_dkg(job, Curve::Secp256k1).unwrap();
            let refreshed = engine.ecdsa2p_refresh(job, &key).unwrap();
            assert_eq!(refreshed.public_key(), key.public_key());

            let mut sid = SessionId::empty();
            let msg = [3u8; 32];
            let sigs = engine
                .ecdsa2p_sign(job, &mut sid, &refreshed, &[msg.as_slice()], true)
                .unwrap();
            (key.public_key().clone(), sid, sigs)
        });
        assert_eq!(out[0].0, out[1].0);
        assert_eq!(out[0].1, out[1].1);
        assert!(!out[0].1.is_empty());
        assert_eq!(out[0].2.len(), 1);
        assert!(out[1].2.is_empty());
    }

    #[test]
    fn test_schnorr_rejects_eddsa() {
        let engine = engine();
        let out = run_2p(move |job| {
            let key = engine.schnorr2p_dkg(job, Curve::Secp256k1).unwrap();
            engine.schnorr2p_sign(job, &key, &[[0u8; 32].as_slice()], SchnorrVariant::EdDsa)
        });
        assert!(out.iter().all(|r| matches!(r, Err(Error::Unsupported(_)))));
    }

    #[test]
    fn test_mp_dkg_fills_empty_sid() {
        let engine = engine();
        let out = run_mp(3, move |job| {
            let mut sid = SessionId::empty();
            let key = engine.schnorrmp_dkg(job, Curve::Secp256k1, &mut sid).unwrap();
            let mut given = SessionId::new(b"caller sid".to_vec());
            let refreshed = engine.schnorrmp_refresh(job, &mut given, &key).unwrap();
            assert_eq!(given.as_bytes(), b"caller sid");
            (sid, refreshed.public_key().clone())
        });
        assert!(!out[0].0.is_empty());
        assert!(out.iter().all(|(sid, pk)| *sid == out[0].0 && *pk == out[0].1));
    }
}
