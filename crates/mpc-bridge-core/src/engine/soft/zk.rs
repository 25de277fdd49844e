//! Sigma protocols made non-interactive over merlin transcripts.
//!
//! Every proof is bound to a caller session id and an auxiliary integer
//! (usually the prover's party index), so a proof from one context does not
//! verify in another.

use super::curve::{decode_point, decode_scalar, encode_point, encode_scalar, random_scalar, reduce};
use crate::codec;
use crate::{Error, Result};
use k256::{ProjectivePoint, Scalar};
use merlin::Transcript;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

fn transcript(domain: &'static [u8], sid: &[u8], aux: u64) -> Transcript {
    let mut t = Transcript::new(b"mpc-bridge zk");
    t.append_message(b"domain", domain);
    t.append_message(b"sid", sid);
    t.append_u64(b"aux", aux);
    t
}

fn append_point(t: &mut Transcript, label: &'static [u8], point: &ProjectivePoint) {
    t.append_message(label, &encode_point(point));
}

fn challenge(t: &mut Transcript) -> Scalar {
    let mut buf = [0u8; 32];
    t.challenge_bytes(b"challenge", &mut buf);
    reduce(&buf)
}

fn check(lhs: ProjectivePoint, rhs: ProjectivePoint, what: &str) -> Result<()> {
    if bool::from(lhs.ct_eq(&rhs)) {
        Ok(())
    } else {
        Err(Error::Crypto(format!("{what} proof rejected")))
    }
}

fn decode_proof<T: serde::de::DeserializeOwned>(proof: &[u8], what: &str) -> Result<T> {
    codec::decode(proof).map_err(|_| Error::Crypto(format!("malformed {what} proof")))
}

// ---- discrete log ----

#[derive(Serialize, Deserialize)]
struct DlProof {
    a: Vec<u8>,
    z: [u8; 32],
}

/// Knowledge of `w` such that `q = w*G`
pub(crate) fn prove_dl(q: &ProjectivePoint, w: &Scalar, sid: &[u8], aux: u64) -> Result<Vec<u8>> {
    let k = random_scalar();
    let a = ProjectivePoint::GENERATOR * k;

    let mut t = transcript(b"dl", sid, aux);
    append_point(&mut t, b"Q", q);
    append_point(&mut t, b"A", &a);
    let e = challenge(&mut t);

    codec::encode(&DlProof {
        a: encode_point(&a),
        z: encode_scalar(&(k + e * w)),
    })
}

pub(crate) fn verify_dl(proof: &[u8], q: &ProjectivePoint, sid: &[u8], aux: u64) -> Result<()> {
    let proof: DlProof = decode_proof(proof, "dl")?;
    let a = decode_point(&proof.a)?;
    let z = decode_scalar(&proof.z)?;

    let mut t = transcript(b"dl", sid, aux);
    append_point(&mut t, b"Q", q);
    append_point(&mut t, b"A", &a);
    let e = challenge(&mut t);

    check(ProjectivePoint::GENERATOR * z, a + *q * e, "dl")
}

// ---- batch discrete log ----

/// Powers `e, e^2, ..., e^n` weighting each statement
fn powers(e: Scalar, n: usize) -> Vec<Scalar> {
    let mut out = Vec::with_capacity(n);
    let mut acc = e;
    for _ in 0..n {
        out.push(acc);
        acc *= e;
    }
    out
}

fn batch_transcript(qs: &[ProjectivePoint], a: &ProjectivePoint, sid: &[u8], aux: u64) -> Scalar {
    let mut t = transcript(b"batch-dl", sid, aux);
    t.append_u64(b"n", qs.len() as u64);
    for q in qs {
        append_point(&mut t, b"Q", q);
    }
    append_point(&mut t, b"A", a);
    challenge(&mut t)
}

/// Knowledge of every `ws[i]` with `qs[i] = ws[i]*G`, in one proof
pub(crate) fn prove_batch_dl(
    qs: &[ProjectivePoint],
    ws: &[Scalar],
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    if qs.is_empty() || qs.len() != ws.len() {
        return Err(Error::BadArgument(format!(
            "{} statements for {} witnesses",
            qs.len(),
            ws.len()
        )));
    }
    let k = random_scalar();
    let a = ProjectivePoint::GENERATOR * k;
    let e = batch_transcript(qs, &a, sid, aux);
    let z = powers(e, ws.len())
        .iter()
        .zip(ws)
        .fold(k, |acc, (ei, w)| acc + *ei * w);

    codec::encode(&DlProof {
        a: encode_point(&a),
        z: encode_scalar(&z),
    })
}

pub(crate) fn verify_batch_dl(
    proof: &[u8],
    qs: &[ProjectivePoint],
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    if qs.is_empty() {
        return Err(Error::BadArgument("empty batch".into()));
    }
    let proof: DlProof = decode_proof(proof, "batch dl")?;
    let a = decode_point(&proof.a)?;
    let z = decode_scalar(&proof.z)?;
    let e = batch_transcript(qs, &a, sid, aux);
    let rhs = powers(e, qs.len())
        .iter()
        .zip(qs)
        .fold(a, |acc, (ei, q)| acc + *q * ei);

    check(ProjectivePoint::GENERATOR * z, rhs, "batch dl")
}

// ---- Diffie-Hellman tuple ----

#[derive(Serialize, Deserialize)]
struct DhProof {
    t1: Vec<u8>,
    t2: Vec<u8>,
    z: [u8; 32],
}

fn dh_challenge(
    q: &ProjectivePoint,
    a: &ProjectivePoint,
    b: &ProjectivePoint,
    t1: &ProjectivePoint,
    t2: &ProjectivePoint,
    sid: &[u8],
    aux: u64,
) -> Scalar {
    let mut t = transcript(b"dh", sid, aux);
    append_point(&mut t, b"Q", q);
    append_point(&mut t, b"A", a);
    append_point(&mut t, b"B", b);
    append_point(&mut t, b"T1", t1);
    append_point(&mut t, b"T2", t2);
    challenge(&mut t)
}

/// Knowledge of `w` with `q = w*G` and `b = w*a`
pub(crate) fn prove_dh(
    q: &ProjectivePoint,
    a: &ProjectivePoint,
    b: &ProjectivePoint,
    w: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    let k = random_scalar();
    let t1 = ProjectivePoint::GENERATOR * k;
    let t2 = *a * k;
    let e = dh_challenge(q, a, b, &t1, &t2, sid, aux);

    codec::encode(&DhProof {
        t1: encode_point(&t1),
        t2: encode_point(&t2),
        z: encode_scalar(&(k + e * w)),
    })
}

pub(crate) fn verify_dh(
    proof: &[u8],
    q: &ProjectivePoint,
    a: &ProjectivePoint,
    b: &ProjectivePoint,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    let proof: DhProof = decode_proof(proof, "dh")?;
    let t1 = decode_point(&proof.t1)?;
    let t2 = decode_point(&proof.t2)?;
    let z = decode_scalar(&proof.z)?;
    let e = dh_challenge(q, a, b, &t1, &t2, sid, aux);

    check(ProjectivePoint::GENERATOR * z, t1 + *q * e, "dh")?;
    check(*a * z, t2 + *b * e, "dh")
}

// ---- ElGamal commitment opening ----

#[derive(Serialize, Deserialize)]
struct ElGamalProof {
    a1: Vec<u8>,
    a2: Vec<u8>,
    z1: [u8; 32],
    z2: [u8; 32],
}

/// ElGamal commitment `(l, r) = (rho*G, x*G + rho*q)`
pub(crate) struct Commitment<'a> {
    pub l: &'a ProjectivePoint,
    pub r: &'a ProjectivePoint,
}

fn elgamal_challenge(
    q: &ProjectivePoint,
    com: &Commitment<'_>,
    a1: &ProjectivePoint,
    a2: &ProjectivePoint,
    sid: &[u8],
    aux: u64,
) -> Scalar {
    let mut t = transcript(b"elgamal-com", sid, aux);
    append_point(&mut t, b"Q", q);
    append_point(&mut t, b"L", com.l);
    append_point(&mut t, b"R", com.r);
    append_point(&mut t, b"A1", a1);
    append_point(&mut t, b"A2", a2);
    challenge(&mut t)
}

/// Knowledge of `(x, rho)` opening `com` under base `q`
pub(crate) fn prove_elgamal_com(
    q: &ProjectivePoint,
    com: &Commitment<'_>,
    x: &Scalar,
    rho: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    let k1 = random_scalar();
    let k2 = random_scalar();
    let a1 = ProjectivePoint::GENERATOR * k2;
    let a2 = ProjectivePoint::GENERATOR * k1 + *q * k2;
    let e = elgamal_challenge(q, com, &a1, &a2, sid, aux);

    codec::encode(&ElGamalProof {
        a1: encode_point(&a1),
        a2: encode_point(&a2),
        z1: encode_scalar(&(k1 + e * x)),
        z2: encode_scalar(&(k2 + e * rho)),
    })
}

pub(crate) fn verify_elgamal_com(
    proof: &[u8],
    q: &ProjectivePoint,
    com: &Commitment<'_>,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    let proof: ElGamalProof = decode_proof(proof, "elgamal commitment")?;
    let a1 = decode_point(&proof.a1)?;
    let a2 = decode_point(&proof.a2)?;
    let z1 = decode_scalar(&proof.z1)?;
    let z2 = decode_scalar(&proof.z2)?;
    let e = elgamal_challenge(q, com, &a1, &a2, sid, aux);

    check(ProjectivePoint::GENERATOR * z2, a1 + *com.l * e, "elgamal commitment")?;
    check(
        ProjectivePoint::GENERATOR * z1 + *q * z2,
        a2 + *com.r * e,
        "elgamal commitment",
    )
}

/// Challenge over a fixed-order list of statement and commitment points
fn challenge_over(
    domain: &'static [u8],
    sid: &[u8],
    aux: u64,
    points: &[&ProjectivePoint],
) -> Scalar {
    let mut t = transcript(domain, sid, aux);
    t.append_u64(b"points", points.len() as u64);
    for point in points {
        append_point(&mut t, b"P", point);
    }
    challenge(&mut t)
}

// ---- commitment to the discrete log of a public point ----

/// Knowledge of `rho` with `com = (rho*G, a + rho*q)`, i.e. `com` commits
/// to the discrete log of `a`
pub(crate) fn prove_elgamal_com_pub_share_equ(
    q: &ProjectivePoint,
    a: &ProjectivePoint,
    com: &Commitment<'_>,
    rho: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    let k = random_scalar();
    let t1 = ProjectivePoint::GENERATOR * k;
    let t2 = *q * k;
    let e = challenge_over(
        b"elgamal-com-pub-share",
        sid,
        aux,
        &[q, a, com.l, com.r, &t1, &t2],
    );

    codec::encode(&DhProof {
        t1: encode_point(&t1),
        t2: encode_point(&t2),
        z: encode_scalar(&(k + e * rho)),
    })
}

pub(crate) fn verify_elgamal_com_pub_share_equ(
    proof: &[u8],
    q: &ProjectivePoint,
    a: &ProjectivePoint,
    com: &Commitment<'_>,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    let proof: DhProof = decode_proof(proof, "public share commitment")?;
    let t1 = decode_point(&proof.t1)?;
    let t2 = decode_point(&proof.t2)?;
    let z = decode_scalar(&proof.z)?;
    let e = challenge_over(
        b"elgamal-com-pub-share",
        sid,
        aux,
        &[q, a, com.l, com.r, &t1, &t2],
    );

    check(ProjectivePoint::GENERATOR * z, t1 + *com.l * e, "public share commitment")?;
    check(*q * z, t2 + (*com.r - a) * e, "public share commitment")
}

// ---- commitment multiplication ----

#[derive(Serialize, Deserialize)]
struct MultProof {
    t: Vec<Vec<u8>>,
    z_b: [u8; 32],
    z_rb: [u8; 32],
    z_rc: [u8; 32],
}

/// `c` is `a` scaled by the scalar `b` commits to, then re-randomized
pub(crate) struct MultStatement<'a> {
    pub q: &'a ProjectivePoint,
    pub a: Commitment<'a>,
    pub b: Commitment<'a>,
    pub c: Commitment<'a>,
}

impl MultStatement<'_> {
    fn challenge(&self, t: &[ProjectivePoint; 4], sid: &[u8], aux: u64) -> Scalar {
        challenge_over(
            b"elgamal-com-mult",
            sid,
            aux,
            &[
                self.q, self.a.l, self.a.r, self.b.l, self.b.r, self.c.l, self.c.r, &t[0], &t[1],
                &t[2], &t[3],
            ],
        )
    }
}

/// Witness: scalar `b` with `st.b = (rb*G, b*G + rb*q)` and
/// `st.c = (b*a.l + rc*G, b*a.r + rc*q)`
pub(crate) fn prove_elgamal_com_mult(
    st: &MultStatement<'_>,
    b: &Scalar,
    rb: &Scalar,
    rc: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    let (kb, krb, krc) = (random_scalar(), random_scalar(), random_scalar());
    let g = ProjectivePoint::GENERATOR;
    let t = [
        g * krb,
        g * kb + *st.q * krb,
        *st.a.l * kb + g * krc,
        *st.a.r * kb + *st.q * krc,
    ];
    let e = st.challenge(&t, sid, aux);

    codec::encode(&MultProof {
        t: t.iter().map(encode_point).collect(),
        z_b: encode_scalar(&(kb + e * b)),
        z_rb: encode_scalar(&(krb + e * rb)),
        z_rc: encode_scalar(&(krc + e * rc)),
    })
}

pub(crate) fn verify_elgamal_com_mult(
    proof: &[u8],
    st: &MultStatement<'_>,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    const WHAT: &str = "commitment multiplication";
    let proof: MultProof = decode_proof(proof, WHAT)?;
    let [t1, t2, t3, t4] = proof.t.as_slice() else {
        return Err(Error::Crypto(format!("malformed {WHAT} proof")));
    };
    let t = [decode_point(t1)?, decode_point(t2)?, decode_point(t3)?, decode_point(t4)?];
    let z_b = decode_scalar(&proof.z_b)?;
    let z_rb = decode_scalar(&proof.z_rb)?;
    let z_rc = decode_scalar(&proof.z_rc)?;
    let e = st.challenge(&t, sid, aux);
    let g = ProjectivePoint::GENERATOR;

    check(g * z_rb, t[0] + *st.b.l * e, WHAT)?;
    check(g * z_b + *st.q * z_rb, t[1] + *st.b.r * e, WHAT)?;
    check(*st.a.l * z_b + g * z_rc, t[2] + *st.c.l * e, WHAT)?;
    check(*st.a.r * z_b + *st.q * z_rc, t[3] + *st.c.r * e, WHAT)
}

// ---- multiplication by a private scalar ----

#[derive(Serialize, Deserialize)]
struct ScaleProof {
    t1: Vec<u8>,
    t2: Vec<u8>,
    z_c: [u8; 32],
    z_r: [u8; 32],
}

fn scale_challenge(
    e: &ProjectivePoint,
    ea: &Commitment<'_>,
    eb: &Commitment<'_>,
    t1: &ProjectivePoint,
    t2: &ProjectivePoint,
    sid: &[u8],
    aux: u64,
) -> Scalar {
    challenge_over(
        b"elgamal-com-mult-private-scalar",
        sid,
        aux,
        &[e, ea.l, ea.r, eb.l, eb.r, t1, t2],
    )
}

/// Knowledge of `(c, r0)` with `eb = (c*ea.l + r0*G, c*ea.r + r0*e)`
pub(crate) fn prove_elgamal_com_mult_private_scalar(
    e: &ProjectivePoint,
    ea: &Commitment<'_>,
    eb: &Commitment<'_>,
    r0: &Scalar,
    c: &Scalar,
    sid: &[u8],
    aux: u64,
) -> Result<Vec<u8>> {
    let (kc, kr) = (random_scalar(), random_scalar());
    let t1 = *ea.l * kc + ProjectivePoint::GENERATOR * kr;
    let t2 = *ea.r * kc + *e * kr;
    let ch = scale_challenge(e, ea, eb, &t1, &t2, sid, aux);

    codec::encode(&ScaleProof {
        t1: encode_point(&t1),
        t2: encode_point(&t2),
        z_c: encode_scalar(&(kc + ch * c)),
        z_r: encode_scalar(&(kr + ch * r0)),
    })
}

pub(crate) fn verify_elgamal_com_mult_private_scalar(
    proof: &[u8],
    e: &ProjectivePoint,
    ea: &Commitment<'_>,
    eb: &Commitment<'_>,
    sid: &[u8],
    aux: u64,
) -> Result<()> {
    const WHAT: &str = "private scalar multiplication";
    let proof: ScaleProof = decode_proof(proof, WHAT)?;
    let t1 = decode_point(&proof.t1)?;
    let t2 = decode_point(&proof.t2)?;
    let z_c = decode_scalar(&proof.z_c)?;
    let z_r = decode_scalar(&proof.z_r)?;
    let ch = scale_challenge(e, ea, eb, &t1, &t2, sid, aux);

    check(*ea.l * z_c + ProjectivePoint::GENERATOR * z_r, t1 + *eb.l * ch, WHAT)?;
    check(*ea.r * z_c + *e * z_r, t2 + *eb.r * ch, WHAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (Scalar, ProjectivePoint) {
        let w = random_scalar();
        (w, ProjectivePoint::GENERATOR * w)
    }

    #[test]
    fn test_dl_binds_sid_and_aux() {
        let (w, q) = keypair();
        let proof = prove_dl(&q, &w, b"sid", 3).unwrap();
        verify_dl(&proof, &q, b"sid", 3).unwrap();
        assert!(verify_dl(&proof, &q, b"other", 3).is_err());
        assert!(verify_dl(&proof, &q, b"sid", 4).is_err());
        assert!(matches!(verify_dl(b"junk", &q, b"sid", 3), Err(Error::Crypto(_))));
    }

    #[test]
    fn test_batch_dl() {
        let pairs: Vec<_> = (0..4).map(|_| keypair()).collect();
        let ws: Vec<_> = pairs.iter().map(|(w, _)| *w).collect();
        let qs: Vec<_> = pairs.iter().map(|(_, q)| *q).collect();

        let proof = prove_batch_dl(&qs, &ws, b"sid", 0).unwrap();
        verify_batch_dl(&proof, &qs, b"sid", 0).unwrap();

        let mut swapped = qs.clone();
        swapped.swap(0, 1);
        assert!(verify_batch_dl(&proof, &swapped, b"sid", 0).is_err());
        assert!(prove_batch_dl(&qs, &ws[..3], b"sid", 0).is_err());
    }

    #[test]
    fn test_dh_tuple() {
        let (w, q) = keypair();
        let a = ProjectivePoint::GENERATOR * random_scalar();
        let b = a * w;
        let proof = prove_dh(&q, &a, &b, &w, b"sid", 1).unwrap();
        verify_dh(&proof, &q, &a, &b, b"sid", 1).unwrap();
        assert!(verify_dh(&proof, &q, &a, &(b + a), b"sid", 1).is_err());
    }

    #[test]
    fn test_elgamal_commitment_opening() {
        let (_, q) = keypair();
        let x = random_scalar();
        let rho = random_scalar();
        let l = ProjectivePoint::GENERATOR * rho;
        let r = ProjectivePoint::GENERATOR * x + q * rho;
        let com = Commitment { l: &l, r: &r };

        let proof = prove_elgamal_com(&q, &com, &x, &rho, b"sid", 9).unwrap();
        verify_elgamal_com(&proof, &q, &com, b"sid", 9).unwrap();

        let wrong = prove_elgamal_com(&q, &com, &(x + Scalar::ONE), &rho, b"sid", 9).unwrap();
        assert!(verify_elgamal_com(&wrong, &q, &com, b"sid", 9).is_err());
    }

    /// `(rho*G, x*G + rho*q)`
    fn commit(q: &ProjectivePoint, x: &Scalar, rho: &Scalar) -> (ProjectivePoint, ProjectivePoint) {
        let g = ProjectivePoint::GENERATOR;
        (g * rho, g * x + *q * rho)
    }

    #[test]
    fn test_commitment_to_public_share() {
        let (_, q) = keypair();
        let (x, a) = keypair();
        let rho = random_scalar();
        let (l, r) = commit(&q, &x, &rho);
        let com = Commitment { l: &l, r: &r };

        let proof = prove_elgamal_com_pub_share_equ(&q, &a, &com, &rho, b"sid", 2).unwrap();
        verify_elgamal_com_pub_share_equ(&proof, &q, &a, &com, b"sid", 2).unwrap();

        let other = a + ProjectivePoint::GENERATOR;
        assert!(verify_elgamal_com_pub_share_equ(&proof, &q, &other, &com, b"sid", 2).is_err());
        assert!(verify_elgamal_com_pub_share_equ(&proof, &q, &a, &com, b"sid", 3).is_err());
    }

    #[test]
    fn test_commitment_multiplication() {
        let (_, q) = keypair();
        let (x, rho) = (random_scalar(), random_scalar());
        let (al, ar) = commit(&q, &x, &rho);
        let (b, rb, rc) = (random_scalar(), random_scalar(), random_scalar());
        let (bl, br) = commit(&q, &b, &rb);
        let (cl, cr) = (al * b + ProjectivePoint::GENERATOR * rc, ar * b + q * rc);

        let st = MultStatement {
            q: &q,
            a: Commitment { l: &al, r: &ar },
            b: Commitment { l: &bl, r: &br },
            c: Commitment { l: &cl, r: &cr },
        };
        let proof = prove_elgamal_com_mult(&st, &b, &rb, &rc, b"sid", 0).unwrap();
        verify_elgamal_com_mult(&proof, &st, b"sid", 0).unwrap();

        // c no longer decrypts to b*x
        let shifted = cr + ProjectivePoint::GENERATOR;
        let wrong = MultStatement {
            c: Commitment { l: &cl, r: &shifted },
            ..st
        };
        assert!(verify_elgamal_com_mult(&proof, &wrong, b"sid", 0).is_err());
        let forged = prove_elgamal_com_mult(&wrong, &b, &rb, &rc, b"sid", 0).unwrap();
        assert!(verify_elgamal_com_mult(&forged, &wrong, b"sid", 0).is_err());
    }

    #[test]
    fn test_multiplication_by_private_scalar() {
        let (_, e) = keypair();
        let (al, ar) = commit(&e, &random_scalar(), &random_scalar());
        let (c, r0) = (random_scalar(), random_scalar());
        let (bl, br) = (al * c + ProjectivePoint::GENERATOR * r0, ar * c + e * r0);
        let (ea, eb) = (Commitment { l: &al, r: &ar }, Commitment { l: &bl, r: &br });

        let proof =
            prove_elgamal_com_mult_private_scalar(&e, &ea, &eb, &r0, &c, b"sid", 5).unwrap();
        verify_elgamal_com_mult_private_scalar(&proof, &e, &ea, &eb, b"sid", 5).unwrap();
        assert!(verify_elgamal_com_mult_private_scalar(&proof, &e, &eb, &ea, b"sid", 5).is_err());
        assert!(matches!(
            verify_elgamal_com_mult_private_scalar(b"junk", &e, &ea, &eb, b"sid", 5),
            Err(Error::Crypto(_))
        ));
    }
}
