//! Threshold BIP-340 signing over additive shares

use super::agree::commit_reveal;
use super::curve::{decode_scalar, encode_point, encode_scalar, random_nonzero};
use super::keygen::Share;
use crate::codec;
use crate::transport::Channel;
use crate::types::PartyIndex;
use crate::{Error, Result};
use k256::{
    elliptic_curve::{bigint::U256, ops::Reduce, point::AffineCoordinates},
    FieldBytes, ProjectivePoint, Scalar,
};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

/// `SHA256(SHA256(tag) || SHA256(tag) || data...)` reduced onto the field
fn tagged_hash(tag: &[u8], parts: &[&[u8]]) -> Scalar {
    let tag_hash = Sha256::digest(tag);
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    for part in parts {
        hasher.update(part);
    }
    let digest: [u8; 32] = hasher.finalize().into();
    <Scalar as Reduce<U256>>::reduce_bytes(&digest.into())
}

fn x_only(point: &ProjectivePoint) -> FieldBytes {
    point.to_affine().x()
}

fn has_odd_y(point: &ProjectivePoint) -> bool {
    bool::from(point.to_affine().y_is_odd())
}

/// Negate `scalar` when `point` has an odd y coordinate
fn even_y(point: &ProjectivePoint, scalar: Scalar) -> Scalar {
    if has_odd_y(point) {
        -scalar
    } else {
        scalar
    }
}

/// Sign 32-byte messages; `receiver` gets 64-byte `R.x || s` signatures and
/// everyone else an empty list.
#[instrument(skip_all, fields(party_index = ch.party_index(), count = messages.len(), receiver = receiver))]
pub(crate) fn sign_bip340(
    ch: &mut dyn Channel,
    share: &Share,
    messages: &[&[u8]],
    receiver: PartyIndex,
) -> Result<Vec<Vec<u8>>> {
    let me = ch.party_index();
    let count = messages.len();
    if let Some(bad) = messages.iter().find(|m| m.len() != 32) {
        return Err(Error::BadArgument(format!(
            "BIP340 messages are 32 bytes, got {}",
            bad.len()
        )));
    }
    info!("Starting Schnorr signing");

    let q = share.public_key;
    let d = even_y(&q, share.x);
    let qx = x_only(&q);

    let mut nonces: Vec<Scalar> = (0..count).map(|_| random_nonzero()).collect();
    let commitments: Vec<Vec<u8>> = nonces
        .iter()
        .map(|k| encode_point(&(ProjectivePoint::GENERATOR * k)))
        .collect();
    let revealed = commit_reveal(ch, b"mpc-bridge bip340 nonce", &codec::encode(&commitments)?)?;

    let mut big_r = vec![ProjectivePoint::IDENTITY; count];
    for (index, value) in revealed.values.iter().enumerate() {
        let points: Vec<Vec<u8>> = codec::decode(value)
            .map_err(|_| Error::Crypto(format!("malformed nonce from {index}")))?;
        if points.len() != count {
            return Err(Error::Crypto(format!("party {index} sent {} nonces", points.len())));
        }
        for (m, p) in points.iter().enumerate() {
            big_r[m] += super::curve::decode_point(p)?;
        }
    }

    let mut challenges = Vec::with_capacity(count);
    let mut partial = Vec::with_capacity(count);
    for m in 0..count {
        let k = even_y(&big_r[m], nonces[m]);
        let e = tagged_hash(
            b"BIP0340/challenge",
            &[&x_only(&big_r[m]), &qx, messages[m]],
        );
        partial.push(encode_scalar(&(k + e * d)));
        challenges.push(e);
    }
    nonces.iter_mut().for_each(zeroize::Zeroize::zeroize);

    if me != receiver {
        ch.send(receiver, &codec::encode(&partial)?)?;
        return Ok(Vec::new());
    }

    let peers = ch.peers();
    let received = ch.receive_all(&peers)?;
    let mut s: Vec<Scalar> = partial
        .iter()
        .map(|p| decode_scalar(p))
        .collect::<Result<_>>()?;
    for (peer, bytes) in peers.iter().zip(&received) {
        let parts: Vec<[u8; 32]> = codec::decode(bytes)
            .map_err(|_| Error::Crypto(format!("malformed partial signature from {peer}")))?;
        if parts.len() != count {
            return Err(Error::Crypto(format!("party {peer} sent {} partials", parts.len())));
        }
        for (m, part) in parts.iter().enumerate() {
            s[m] += decode_scalar(part)?;
        }
    }

    let q_even = if has_odd_y(&q) { -q } else { q };
    let mut signatures = Vec::with_capacity(count);
    for m in 0..count {
        let r_even = if has_odd_y(&big_r[m]) { -big_r[m] } else { big_r[m] };
        if ProjectivePoint::GENERATOR * s[m] != r_even + q_even * challenges[m] {
            warn!(message = m, "Assembled Schnorr signature does not verify");
            return Err(Error::Crypto("assembled signature does not verify".into()));
        }
        let mut signature = x_only(&big_r[m]).to_vec();
        signature.extend_from_slice(&encode_scalar(&s[m]));
        signatures.push(signature);
    }
    info!("Schnorr signing completed");
    Ok(signatures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::soft::curve::from_point;
    use crate::engine::soft::keygen::generate;
    use crate::engine::soft::testing::{run_2p, run_mp};
    use crate::objects::{KeyShareMp, SchnorrKey2p};
    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    use k256::schnorr::{Signature, VerifyingKey};

    fn check(public_key: &ProjectivePoint, msg: &[u8], sig: &[u8]) {
        let key = VerifyingKey::from_bytes(&x_only(public_key)).unwrap();
        let signature = Signature::try_from(sig).unwrap();
        key.verify_prehash(msg, &signature).unwrap();
    }

    #[test]
    fn test_two_party_signatures_verify() {
        let msgs = [[1u8; 32], [2u8; 32], [3u8; 32]];
        let out = run_2p(move |job| {
            let generated = generate(job, None).unwrap();
            let key = SchnorrKey2p::new(
                job.party_index(),
                2,
                from_point(&generated.public_key),
                generated.payload.clone(),
            );
            let share = Share::load(&key).unwrap();
            let refs: Vec<&[u8]> = msgs.iter().map(|m| m.as_slice()).collect();
            (generated.public_key, sign_bip340(job, &share, &refs, 0).unwrap())
        });
        assert!(out[1].1.is_empty());
        assert_eq!(out[0].1.len(), 3);
        for (msg, sig) in msgs.iter().zip(&out[0].1) {
            assert_eq!(sig.len(), 64);
            check(&out[0].0, msg, sig);
        }
    }

    #[test]
    fn test_multi_party_signature_verifies() {
        let msg = [9u8; 32];
        let out = run_mp(4, move |job| {
            let generated = generate(job, None).unwrap();
            let key = KeyShareMp::new(
                job.party_index(),
                4,
                from_point(&generated.public_key),
                generated.payload.clone(),
            );
            let share = Share::load(&key).unwrap();
            (generated.public_key, sign_bip340(job, &share, &[msg.as_slice()], 1).unwrap())
        });
        check(&out[1].0, &msg, &out[1].1[0]);
        assert!(out[0].1.is_empty());
    }

    #[test]
    fn test_tagged_hash_matches_definition() {
        let tag = Sha256::digest(b"BIP0340/challenge");
        let mut data = tag.to_vec();
        data.extend_from_slice(&tag);
        data.extend_from_slice(b"abc");
        let expected: [u8; 32] = Sha256::digest(&data).into();
        assert_eq!(
            tagged_hash(b"BIP0340/challenge", &[b"a", b"bc"]),
            <Scalar as Reduce<U256>>::reduce_bytes(&expected.into())
        );
    }
}
