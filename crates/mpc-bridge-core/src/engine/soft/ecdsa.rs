//! Threshold ECDSA signing with Paillier MtA, shared by the two-party and
//! multi-party variants.
//!
//! Per message hash `m`, every party holds `k_i`, `gamma_i` and its additive
//! key share `x_i`:
//!
//! 1. commit to and reveal `Gamma_i = gamma_i*G`
//! 2. run MtA pairwise so each party holds additive shares of
//!    `delta = k*gamma` and `sigma = k*x`
//! 3. open `delta`, set `R = delta^-1 * sum(Gamma_i) = k^-1 * G`
//! 4. send `s_i = m*k_i + r*sigma_i` to the receiver, who assembles and
//!    verifies the signature.

use super::agree::commit_reveal;
use super::curve::{decode_point, decode_scalar, encode_point, encode_scalar, random_nonzero, reduce};
use super::keygen::{PaillierKeys, Share};
use super::paillier::{mta_finish, mta_respond, scalar_to_bn};
use crate::codec;
use crate::transport::Channel;
use crate::types::PartyIndex;
use crate::{Error, Result};
use k256::{
    elliptic_curve::{bigint::U256, ops::Reduce, point::AffineCoordinates, scalar::IsHigh},
    ProjectivePoint, Scalar,
};
use libpaillier::unknown_order::BigNumber;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroize;

/// Per-message secrets of one signing run
struct Nonce {
    k: Scalar,
    gamma: Scalar,
}

impl Drop for Nonce {
    fn drop(&mut self) {
        self.k.zeroize();
        self.gamma.zeroize();
    }
}

#[derive(Serialize, Deserialize)]
struct MtaRequest {
    /// `Enc(k_i)` under the sender's own key, one per message
    enc_k: Vec<Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
struct MtaResponse {
    delta: Vec<Vec<u8>>,
    sigma: Vec<Vec<u8>>,
}

fn x_coordinate(point: &ProjectivePoint) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&point.to_affine().x())
}

fn decode_points(bytes: &[u8], count: usize, from: PartyIndex) -> Result<Vec<ProjectivePoint>> {
    let encoded: Vec<Vec<u8>> = codec::decode(bytes)
        .map_err(|_| Error::Crypto(format!("malformed points from {from}")))?;
    if encoded.len() != count {
        return Err(Error::Crypto(format!("party {from} sent {} points", encoded.len())));
    }
    encoded.iter().map(|p| decode_point(p)).collect()
}

fn decode_scalars(bytes: &[u8], count: usize, from: PartyIndex) -> Result<Vec<Scalar>> {
    let encoded: Vec<[u8; 32]> = codec::decode(bytes)
        .map_err(|_| Error::Crypto(format!("malformed scalars from {from}")))?;
    if encoded.len() != count {
        return Err(Error::Crypto(format!("party {from} sent {} scalars", encoded.len())));
    }
    encoded.iter().map(|s| decode_scalar(s)).collect()
}

fn encode_scalars(scalars: &[Scalar]) -> Result<Vec<u8>> {
    let encoded: Vec<[u8; 32]> = scalars.iter().map(encode_scalar).collect();
    codec::encode(&encoded)
}

fn parse_ciphers(encoded: &[Vec<u8>], count: usize, from: PartyIndex) -> Result<Vec<BigNumber>> {
    if encoded.len() != count {
        return Err(Error::Crypto(format!("party {from} sent {} ciphertexts", encoded.len())));
    }
    Ok(encoded.iter().map(BigNumber::from_slice).collect())
}

/// Standard ECDSA verification of `(r, s)` on hash scalar `z`
fn verify(public_key: &ProjectivePoint, z: &Scalar, r: &Scalar, s: &Scalar) -> bool {
    let s_inv = match Option::<Scalar>::from(s.invert()) {
        Some(inv) => inv,
        None => return false,
    };
    let point = ProjectivePoint::GENERATOR * (*z * s_inv) + *public_key * (*r * s_inv);
    x_coordinate(&point) == *r
}

fn der(r: &Scalar, s: &Scalar) -> Result<Vec<u8>> {
    let s = if bool::from(s.is_high()) { -*s } else { *s };
    let signature = k256::ecdsa::Signature::from_scalars(r.to_bytes(), s.to_bytes())
        .map_err(|e| Error::Crypto(format!("signature encoding: {e}")))?;
    Ok(signature.to_der().as_bytes().to_vec())
}

/// Pairwise MtA for both products; returns this party's `(delta_i, sigma_i)` per message
fn multiply(
    ch: &mut dyn Channel,
    share: &Share,
    paillier: &PaillierKeys,
    nonces: &[Nonce],
) -> Result<(Vec<Scalar>, Vec<Scalar>)> {
    let me = ch.party_index();
    let count = nonces.len();
    let own = paillier.own.public();

    let enc_k = nonces
        .iter()
        .map(|n| own.encrypt(&scalar_to_bn(&n.k)).map(|c| c.to_bytes()))
        .collect::<Result<Vec<_>>>()?;
    let requests = ch.exchange(&codec::encode(&MtaRequest { enc_k })?)?;

    let mut delta: Vec<Scalar> = nonces.iter().map(|n| n.k * n.gamma).collect();
    let mut sigma: Vec<Scalar> = nonces.iter().map(|n| n.k * share.x).collect();

    let mut responses = vec![Vec::new(); ch.party_count()];
    for peer in ch.peers() {
        let request: MtaRequest = codec::decode(&requests[peer])
            .map_err(|_| Error::Crypto(format!("malformed MtA request from {peer}")))?;
        let ciphers = parse_ciphers(&request.enc_k, count, peer)?;
        let peer_key = &paillier.peers[peer];
        let mut response = MtaResponse {
            delta: Vec::with_capacity(count),
            sigma: Vec::with_capacity(count),
        };
        for (m, enc_k) in ciphers.iter().enumerate() {
            let (c, beta) = mta_respond(peer_key, enc_k, &nonces[m].gamma)?;
            response.delta.push(c.to_bytes());
            delta[m] += beta;
            let (c, nu) = mta_respond(peer_key, enc_k, &share.x)?;
            response.sigma.push(c.to_bytes());
            sigma[m] += nu;
        }
        responses[peer] = codec::encode(&response)?;
    }
    let replies = ch.exchange_direct(&responses)?;

    for peer in ch.peers() {
        let reply: MtaResponse = codec::decode(&replies[peer])
            .map_err(|_| Error::Crypto(format!("malformed MtA response from {peer}")))?;
        let deltas = parse_ciphers(&reply.delta, count, peer)?;
        let sigmas = parse_ciphers(&reply.sigma, count, peer)?;
        for m in 0..count {
            delta[m] += mta_finish(&paillier.own, &deltas[m])?;
            sigma[m] += mta_finish(&paillier.own, &sigmas[m])?;
        }
    }
    debug!(party_index = me, count, "MtA completed");
    Ok((delta, sigma))
}

/// Sign every hash in `messages`; only `receiver` gets the DER signatures,
/// every other party gets an empty list.
#[instrument(skip_all, fields(party_index = ch.party_index(), count = messages.len(), receiver = receiver))]
pub(crate) fn sign(
    ch: &mut dyn Channel,
    share: &Share,
    sid: &[u8],
    messages: &[&[u8]],
    receiver: PartyIndex,
    global_abort: bool,
) -> Result<Vec<Vec<u8>>> {
    let me = ch.party_index();
    let count = messages.len();
    let paillier = share
        .paillier
        .as_ref()
        .ok_or_else(|| Error::BadArgument("key share carries no paillier keys".into()))?;
    info!("Starting ECDSA signing");

    let nonces: Vec<Nonce> = (0..count)
        .map(|_| Nonce {
            k: random_nonzero(),
            gamma: random_nonzero(),
        })
        .collect();

    // Round 1: commit to and reveal Gamma_i
    let gammas: Vec<Vec<u8>> = nonces
        .iter()
        .map(|n| encode_point(&(ProjectivePoint::GENERATOR * n.gamma)))
        .collect();
    let mut tag = b"mpc-bridge ecdsa gamma ".to_vec();
    tag.extend_from_slice(sid);
    let revealed = commit_reveal(ch, &tag, &codec::encode(&gammas)?)?;
    let mut big_gamma = vec![ProjectivePoint::IDENTITY; count];
    for (index, value) in revealed.values.iter().enumerate() {
        for (m, point) in decode_points(value, count, index)?.into_iter().enumerate() {
            big_gamma[m] += point;
        }
    }

    // Round 2: MtA
    let (delta_i, sigma_i) = multiply(ch, share, paillier, &nonces)?;

    // Round 3: open delta and derive R
    let deltas = ch.exchange(&encode_scalars(&delta_i)?)?;
    let mut delta = vec![Scalar::ZERO; count];
    for (index, bytes) in deltas.iter().enumerate() {
        for (m, d) in decode_scalars(bytes, count, index)?.into_iter().enumerate() {
            delta[m] += d;
        }
    }
    let mut rs = Vec::with_capacity(count);
    for m in 0..count {
        let inv = Option::<Scalar>::from(delta[m].invert())
            .ok_or_else(|| Error::Crypto("degenerate nonce product".into()))?;
        let r = x_coordinate(&(big_gamma[m] * inv));
        if bool::from(r.is_zero()) {
            return Err(Error::Crypto("signature nonce has zero x coordinate".into()));
        }
        rs.push(r);
    }

    // Round 4: partial signatures to the receiver
    let zs: Vec<Scalar> = messages.iter().map(|m| reduce(m)).collect();
    let partial: Vec<Scalar> = (0..count)
        .map(|m| zs[m] * nonces[m].k + rs[m] * sigma_i[m])
        .collect();

    if me != receiver {
        ch.send(receiver, &encode_scalars(&partial)?)?;
        info!("Partial signatures sent");
        return Ok(Vec::new());
    }

    let peers = ch.peers();
    let received = ch.receive_all(&peers)?;
    let mut s = partial;
    for (peer, bytes) in peers.iter().zip(&received) {
        for (m, part) in decode_scalars(bytes, count, *peer)?.into_iter().enumerate() {
            s[m] += part;
        }
    }

    let mut signatures = Vec::with_capacity(count);
    for m in 0..count {
        if !verify(&share.public_key, &zs[m], &rs[m], &s[m]) {
            warn!(message = m, global_abort, "Assembled signature does not verify");
            return Err(if global_abort {
                Error::PossibleKeyLeak
            } else {
                Error::Crypto("assembled signature does not verify".into())
            });
        }
        signatures.push(der(&rs[m], &s[m])?);
    }
    info!("ECDSA signing completed");
    Ok(signatures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::soft::curve::from_point;
    use crate::engine::soft::keygen::generate;
    use crate::engine::soft::testing::{run_2p, run_2p_over, run_mp, TamperingTransport};
    use crate::objects::{EcdsaKey2p, KeyShareMp};
    use crate::transport::Transport;
    use k256::ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey};

    fn check_der(public_key: &ProjectivePoint, hash: &[u8], der: &[u8]) {
        let key = VerifyingKey::from_sec1_bytes(&encode_point(public_key)).unwrap();
        let signature = Signature::from_der(der).unwrap();
        key.verify_prehash(hash, &signature).unwrap();
        assert!(signature.normalize_s().is_none());
    }

    #[test]
    fn test_two_party_batch_signs_at_party_zero() {
        let hashes = [[0x11u8; 32], [0x22u8; 32]];
        let out = run_2p(move |job| {
            let generated = generate(job, Some(512)).unwrap();
            let key = EcdsaKey2p::new(
                job.party_index(),
                2,
                from_point(&generated.public_key),
                generated.payload.clone(),
            );
            let share = Share::load(&key).unwrap();
            let msgs: Vec<&[u8]> = hashes.iter().map(|h| h.as_slice()).collect();
            let sigs = sign(job, &share, b"sid", &msgs, 0, false).unwrap();
            (generated.public_key, sigs)
        });
        assert_eq!(out[0].1.len(), 2);
        assert!(out[1].1.is_empty());
        for (hash, der) in hashes.iter().zip(&out[0].1) {
            check_der(&out[0].0, hash, der);
        }
    }

    #[test]
    fn test_multi_party_receiver() {
        let hash = [0x5au8; 32];
        let out = run_mp(3, move |job| {
            let generated = generate(job, Some(512)).unwrap();
            let key = KeyShareMp::new(
                job.party_index(),
                3,
                from_point(&generated.public_key),
                generated.payload.clone(),
            );
            let share = Share::load(&key).unwrap();
            let sigs = sign(job, &share, b"sid", &[hash.as_slice()], 2, true).unwrap();
            (generated.public_key, sigs)
        });
        assert!(out[0].1.is_empty() && out[1].1.is_empty());
        check_der(&out[2].0, &hash, &out[2].1[0]);
    }

    #[test]
    fn test_corrupted_partial_signature_signals_key_leak() {
        // Party 1 sends two keygen messages, two gamma messages, two MtA
        // messages and one delta opening before its partial signature.
        let results = run_2p_over(
            |i, endpoint| {
                if i == 1 {
                    Box::new(TamperingTransport::new(endpoint, 0, 7)) as Box<dyn Transport>
                } else {
                    Box::new(endpoint)
                }
            },
            |job| {
                let generated = generate(job, Some(512))?;
                let key = EcdsaKey2p::new(
                    job.party_index(),
                    2,
                    from_point(&generated.public_key),
                    generated.payload.clone(),
                );
                let share = Share::load(&key)?;
                sign(job, &share, b"sid", &[&[7u8; 32][..]], 0, true)
            },
        );
        assert!(matches!(results[0], Err(Error::PossibleKeyLeak)));
        assert!(matches!(results[1], Ok(ref sigs) if sigs.is_empty()));
    }
}
