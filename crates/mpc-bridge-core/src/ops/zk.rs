//! Zero-knowledge proofs bound to a session id and an auxiliary counter

use super::check_non_empty;
use crate::engine::Engine;
use crate::objects::{ElGamalCommitment, Point, Scalar};
use crate::{Error, Result};
use tracing::instrument;

/// Knowledge of `w` with `Q = w*G`
#[instrument(skip_all, fields(aux = aux))]
pub fn uc_dl_prove(
    engine: &dyn Engine,
    q: &Point,
    w: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    check_non_empty("session id", sid)?;
    engine.zk_dl_prove(q, w, sid, aux)
}

#[instrument(skip_all, fields(aux = aux))]
pub fn uc_dl_verify(
    engine: &dyn Engine,
    proof: &[u8],
    q: &Point,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    check_non_empty("proof", proof)?;
    check_non_empty("session id", sid)?;
    engine.zk_dl_verify(proof, q, sid, aux)
}

fn check_batch(qs: &[Point], ws: Option<&[Scalar]>) -> Result<()> {
    if qs.is_empty() {
        return Err(Error::BadArgument("empty batch".into()));
    }
    if let Some(ws) = ws {
        if ws.len() != qs.len() {
            return Err(Error::BadArgument(format!(
                "{} points but {} witnesses",
                qs.len(),
                ws.len()
            )));
        }
    }
    Ok(())
}

#[instrument(skip_all, fields(count = qs.len(), aux = aux))]
pub fn uc_batch_dl_prove(
    engine: &dyn Engine,
    qs: &[Point],
    ws: &[Scalar],
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    check_batch(qs, Some(ws))?;
    check_non_empty("session id", sid)?;
    engine.zk_batch_dl_prove(qs, ws, sid, aux)
}

#[instrument(skip_all, fields(count = qs.len(), aux = aux))]
pub fn uc_batch_dl_verify(
    engine: &dyn Engine,
    proof: &[u8],
    qs: &[Point],
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    check_batch(qs, None)?;
    check_non_empty("proof", proof)?;
    check_non_empty("session id", sid)?;
    engine.zk_batch_dl_verify(proof, qs, sid, aux)
}

/// Knowledge of `w` with `Q = w*G` and `B = w*A`
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn dh_prove(
    engine: &dyn Engine,
    q: &Point,
    a: &Point,
    b: &Point,
    w: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    check_non_empty("session id", sid)?;
    engine.zk_dh_prove(q, a, b, w, sid, aux)
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn dh_verify(
    engine: &dyn Engine,
    proof: &[u8],
    q: &Point,
    a: &Point,
    b: &Point,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    check_non_empty("proof", proof)?;
    check_non_empty("session id", sid)?;
    engine.zk_dh_verify(proof, q, a, b, sid, aux)
}

/// Knowledge of the opening `(x, r)` of an ElGamal commitment under `q`
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn uc_elgamal_com_prove(
    engine: &dyn Engine,
    q: &Point,
    com: &ElGamalCommitment,
    x: &Scalar,
    r: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    check_non_empty("session id", sid)?;
    engine.zk_elgamal_com_prove(q, com, x, r, sid, aux)
}

#[instrument(skip_all, fields(aux = aux))]
pub fn uc_elgamal_com_verify(
    engine: &dyn Engine,
    proof: &[u8],
    q: &Point,
    com: &ElGamalCommitment,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    check_non_empty("proof", proof)?;
    check_non_empty("session id", sid)?;
    engine.zk_elgamal_com_verify(proof, q, com, sid, aux)
}

/// Commit to `x` under `q` with randomness `r` and prove the opening in one
/// step, so the proof always matches the commitment
#[instrument(skip_all, fields(aux = aux))]
pub fn make_elgamal_com_with_proof(
    engine: &dyn Engine,
    q: &Point,
    x: &Scalar,
    r: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<(ElGamalCommitment, Vec<u8>)> {
    check_non_empty("session id", sid)?;
    let com = engine.elgamal_commit(q, x, r)?;
    let proof = engine.zk_elgamal_com_prove(q, &com, x, r, sid, aux)?;
    Ok((com, proof))
}

/// `b` commits under `q` to the discrete log of `a`, with randomness `r`
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn elgamal_com_pub_share_equ_prove(
    engine: &dyn Engine,
    q: &Point,
    a: &Point,
    b: &ElGamalCommitment,
    r: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    check_non_empty("session id", sid)?;
    engine.zk_elgamal_com_pub_share_equ_prove(q, a, b, r, sid, aux)
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn elgamal_com_pub_share_equ_verify(
    engine: &dyn Engine,
    proof: &[u8],
    q: &Point,
    a: &Point,
    b: &ElGamalCommitment,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    check_non_empty("proof", proof)?;
    check_non_empty("session id", sid)?;
    engine.zk_elgamal_com_pub_share_equ_verify(proof, q, a, b, sid, aux)
}

/// `c` is `a` scaled by the scalar `b` commits to, then re-randomized
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn elgamal_com_mult_prove(
    engine: &dyn Engine,
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
    check_non_empty("session id", sid)?;
    engine.zk_elgamal_com_mult_prove(q, a, b, c, r_b, r_c, scalar_b, sid, aux)
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn elgamal_com_mult_verify(
    engine: &dyn Engine,
    proof: &[u8],
    q: &Point,
    a: &ElGamalCommitment,
    b: &ElGamalCommitment,
    c: &ElGamalCommitment,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    check_non_empty("proof", proof)?;
    check_non_empty("session id", sid)?;
    engine.zk_elgamal_com_mult_verify(proof, q, a, b, c, sid, aux)
}

/// `eb` is `ea` scaled by the secret `c`, then re-randomized with `r0`
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn uc_elgamal_com_mult_private_scalar_prove(
    engine: &dyn Engine,
    e: &Point,
    ea: &ElGamalCommitment,
    eb: &ElGamalCommitment,
    r0: &Scalar,
    c: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    check_non_empty("session id", sid)?;
    engine.zk_elgamal_com_mult_private_scalar_prove(e, ea, eb, r0, c, sid, aux)
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(aux = aux))]
pub fn uc_elgamal_com_mult_private_scalar_verify(
    engine: &dyn Engine,
    proof: &[u8],
    e: &Point,
    ea: &ElGamalCommitment,
    eb: &ElGamalCommitment,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    check_non_empty("proof", proof)?;
    check_non_empty("session id", sid)?;
    engine.zk_elgamal_com_mult_private_scalar_verify(proof, e, ea, eb, sid, aux)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SoftEngine;
    use crate::types::Curve;

    #[test]
    fn test_dl_proof_binds_sid() {
        let engine = SoftEngine::default();
        let w = engine.random_scalar(Curve::Secp256k1).unwrap();
        let q = engine.mul_generator(&w).unwrap();

        let proof = uc_dl_prove(&engine, &q, &w, b"sid-1", 0).unwrap();
        uc_dl_verify(&engine, &proof, &q, b"sid-1", 0).unwrap();
        assert!(matches!(
            uc_dl_verify(&engine, &proof, &q, b"sid-2", 0),
            Err(Error::Crypto(_))
        ));
        assert!(matches!(
            uc_dl_prove(&engine, &q, &w, b"", 0),
            Err(Error::BadArgument(_))
        ));
    }

    #[test]
    fn test_batch_shape_checked() {
        let engine = SoftEngine::default();
        let ws: Vec<Scalar> = (0..3)
            .map(|_| engine.random_scalar(Curve::Secp256k1).unwrap())
            .collect();
        let qs: Vec<Point> = ws.iter().map(|w| engine.mul_generator(w).unwrap()).collect();

        let proof = uc_batch_dl_prove(&engine, &qs, &ws, b"sid", 9).unwrap();
        uc_batch_dl_verify(&engine, &proof, &qs, b"sid", 9).unwrap();
        assert!(matches!(
            uc_batch_dl_prove(&engine, &qs, &ws[..2], b"sid", 9),
            Err(Error::BadArgument(_))
        ));
        assert!(uc_batch_dl_verify(&engine, &proof, &qs[..2], b"sid", 9).is_err());
    }

    #[test]
    fn test_dh_proof() {
        let engine = SoftEngine::default();
        let curve = Curve::Secp256k1;
        let w = engine.random_scalar(curve).unwrap();
        let a = engine.mul_generator(&engine.random_scalar(curve).unwrap()).unwrap();
        let q = engine.mul_generator(&w).unwrap();
        let b = engine.point_mul(&a, &w).unwrap();

        let proof = dh_prove(&engine, &q, &a, &b, &w, b"sid", 1).unwrap();
        dh_verify(&engine, &proof, &q, &a, &b, b"sid", 1).unwrap();
        assert!(dh_verify(&engine, &proof, &q, &b, &a, b"sid", 1).is_err());
    }

    fn random(engine: &SoftEngine) -> Scalar {
        engine.random_scalar(Curve::Secp256k1).unwrap()
    }

    /// `scalar*com + (r*G, r*q)`
    fn scale(
        engine: &SoftEngine,
        q: &Point,
        com: &ElGamalCommitment,
        scalar: &Scalar,
        r: &Scalar,
    ) -> ElGamalCommitment {
        let add = |a: Point, b: Point| engine.point_add(&a, &b).unwrap();
        let l = add(engine.point_mul(com.l(), scalar).unwrap(), engine.mul_generator(r).unwrap());
        let rr = add(engine.point_mul(com.r(), scalar).unwrap(), engine.point_mul(q, r).unwrap());
        ElGamalCommitment::new(&l, &rr).unwrap()
    }

    #[test]
    fn test_commitment_made_with_its_proof() {
        let engine = SoftEngine::default();
        let q = engine.mul_generator(&random(&engine)).unwrap();
        let (x, r) = (random(&engine), random(&engine));

        let (com, proof) = make_elgamal_com_with_proof(&engine, &q, &x, &r, b"sid", 4).unwrap();
        assert_eq!(com, engine.elgamal_commit(&q, &x, &r).unwrap());
        uc_elgamal_com_verify(&engine, &proof, &q, &com, b"sid", 4).unwrap();
        assert!(matches!(
            make_elgamal_com_with_proof(&engine, &q, &x, &r, b"", 4),
            Err(Error::BadArgument(_))
        ));
    }

    #[test]
    fn test_commitment_equals_public_share() {
        let engine = SoftEngine::default();
        let q = engine.mul_generator(&random(&engine)).unwrap();
        let (x, r) = (random(&engine), random(&engine));
        let a = engine.mul_generator(&x).unwrap();
        let b = engine.elgamal_commit(&q, &x, &r).unwrap();

        let proof = elgamal_com_pub_share_equ_prove(&engine, &q, &a, &b, &r, b"sid", 1).unwrap();
        elgamal_com_pub_share_equ_verify(&engine, &proof, &q, &a, &b, b"sid", 1).unwrap();

        let other = engine.mul_generator(&random(&engine)).unwrap();
        assert!(matches!(
            elgamal_com_pub_share_equ_verify(&engine, &proof, &q, &other, &b, b"sid", 1),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_commitment_product() {
        let engine = SoftEngine::default();
        let q = engine.mul_generator(&random(&engine)).unwrap();
        let a = engine.elgamal_commit(&q, &random(&engine), &random(&engine)).unwrap();
        let (scalar_b, r_b, r_c) = (random(&engine), random(&engine), random(&engine));
        let b = engine.elgamal_commit(&q, &scalar_b, &r_b).unwrap();
        let c = scale(&engine, &q, &a, &scalar_b, &r_c);

        let proof =
            elgamal_com_mult_prove(&engine, &q, &a, &b, &c, &r_b, &r_c, &scalar_b, b"sid", 0)
                .unwrap();
        elgamal_com_mult_verify(&engine, &proof, &q, &a, &b, &c, b"sid", 0).unwrap();

        // c scaled by a different scalar than the one b commits to
        let off = scale(&engine, &q, &a, &random(&engine), &r_c);
        assert!(elgamal_com_mult_verify(&engine, &proof, &q, &a, &b, &off, b"sid", 0).is_err());
        assert!(elgamal_com_mult_verify(&engine, b"", &q, &a, &b, &c, b"sid", 0).is_err());
    }

    #[test]
    fn test_private_scalar_product() {
        let engine = SoftEngine::default();
        let e = engine.mul_generator(&random(&engine)).unwrap();
        let ea = engine.elgamal_commit(&e, &random(&engine), &random(&engine)).unwrap();
        let (c, r0) = (random(&engine), random(&engine));
        let eb = scale(&engine, &e, &ea, &c, &r0);

        let proof =
            uc_elgamal_com_mult_private_scalar_prove(&engine, &e, &ea, &eb, &r0, &c, b"sid", 7)
                .unwrap();
        uc_elgamal_com_mult_private_scalar_verify(&engine, &proof, &e, &ea, &eb, b"sid", 7)
            .unwrap();
        assert!(
            uc_elgamal_com_mult_private_scalar_verify(&engine, &proof, &e, &ea, &eb, b"sid", 8)
                .is_err()
        );
    }
}
