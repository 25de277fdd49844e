//! Commit-reveal building blocks and random agreement

use crate::codec;
use crate::transport::Channel;
use crate::types::{PartyIndex, SessionId};
use crate::{Error, Result};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of fresh randomness each party contributes to an agreement
const SEED_LEN: usize = 32;

#[derive(Serialize, Deserialize)]
struct Opening {
    salt: [u8; 32],
    value: Vec<u8>,
}

fn commitment(tag: &[u8], index: PartyIndex, salt: &[u8; 32], value: &[u8]) -> Result<[u8; 32]> {
    let mut mac =
        HmacSha256::new_from_slice(salt).map_err(|e| Error::Crypto(format!("commitment: {e}")))?;
    Mac::update(&mut mac, tag);
    Mac::update(&mut mac, &(index as u64).to_be_bytes());
    Mac::update(&mut mac, value);
    Ok(mac.finalize().into_bytes().into())
}

fn check_opening(
    tag: &[u8],
    index: PartyIndex,
    committed: &[u8],
    opening: &[u8],
) -> Result<Vec<u8>> {
    let opening: Opening =
        codec::decode(opening).map_err(|_| Error::Crypto(format!("bad opening from {index}")))?;
    let mut mac = HmacSha256::new_from_slice(&opening.salt)
        .map_err(|e| Error::Crypto(format!("commitment: {e}")))?;
    Mac::update(&mut mac, tag);
    Mac::update(&mut mac, &(index as u64).to_be_bytes());
    Mac::update(&mut mac, &opening.value);
    mac.verify_slice(committed)
        .map_err(|_| Error::Crypto(format!("party {index} opened a different value")))?;
    Ok(opening.value)
}

fn seal(tag: &[u8], index: PartyIndex, value: &[u8]) -> Result<([u8; 32], Vec<u8>)> {
    let mut salt = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut salt);
    let committed = commitment(tag, index, &salt, value)?;
    let opening = codec::encode(&Opening {
        salt,
        value: value.to_vec(),
    })?;
    Ok((committed, opening))
}

/// Values every party committed to before any of them was revealed
pub(crate) struct Revealed {
    /// Round-one commitments, indexed by party
    pub commitments: Vec<Vec<u8>>,
    /// Opened values, indexed by party
    pub values: Vec<Vec<u8>>,
}

/// Broadcast a commitment to `value`, then open it, and check every peer's opening
pub(crate) fn commit_reveal(ch: &mut dyn Channel, tag: &[u8], value: &[u8]) -> Result<Revealed> {
    let me = ch.party_index();
    let (committed, opening) = seal(tag, me, value)?;
    let commitments = ch.exchange(&committed)?;
    let openings = ch.exchange(&opening)?;

    let mut values = Vec::with_capacity(openings.len());
    for (index, (c, o)) in commitments.iter().zip(&openings).enumerate() {
        if index == me {
            values.push(value.to_vec());
        } else {
            values.push(check_opening(tag, index, c, o)?);
        }
    }
    Ok(Revealed {
        commitments,
        values,
    })
}

/// Per-peer commit-reveal: `outgoing[j]` is committed to and opened for `j` only
pub(crate) fn commit_reveal_direct(
    ch: &mut dyn Channel,
    tag: &[u8],
    outgoing: &[Vec<u8>],
) -> Result<Vec<Vec<u8>>> {
    let me = ch.party_index();
    let mut commitments = vec![Vec::new(); ch.party_count()];
    let mut openings = vec![Vec::new(); ch.party_count()];
    for peer in ch.peers() {
        let (c, o) = seal(tag, me, &outgoing[peer])?;
        commitments[peer] = c.to_vec();
        openings[peer] = o;
    }
    let received = ch.exchange_direct(&commitments)?;
    let opened = ch.exchange_direct(&openings)?;

    let mut values = vec![Vec::new(); ch.party_count()];
    for peer in ch.peers() {
        values[peer] = check_opening(tag, peer, &received[peer], &opened[peer])?;
    }
    Ok(values)
}

fn fresh_seed() -> Vec<u8> {
    let mut seed = vec![0u8; SEED_LEN];
    rand::thread_rng().fill_bytes(&mut seed);
    seed
}

/// Stretch the concatenated contributions to `bits` output bits
fn expand(label: &[u8], contributions: &[&[u8]], bits: usize) -> Vec<u8> {
    let mut xof = Shake256::default();
    xof.update(label);
    for c in contributions {
        xof.update(&(c.len() as u64).to_be_bytes());
        xof.update(c);
    }
    let mut out = vec![0u8; bits / 8];
    xof.finalize_xof().read(&mut out);
    out
}

fn check_bits(bits: usize) -> Result<()> {
    if bits < 8 || bits % 8 != 0 {
        return Err(Error::BadArgument(format!("cannot agree on {bits} bits")));
    }
    Ok(())
}

/// Unbiasable agreement among all parties of the channel
pub(crate) fn agree(ch: &mut dyn Channel, label: &[u8], bits: usize) -> Result<Vec<u8>> {
    check_bits(bits)?;
    let revealed = commit_reveal(ch, label, &fresh_seed())?;
    let parts: Vec<&[u8]> = revealed.values.iter().map(Vec::as_slice).collect();
    debug!(bits, n_parties = parts.len(), "Agreed on random value");
    Ok(expand(label, &parts, bits))
}

/// Agreement without the commitment round
pub(crate) fn weak_agree(ch: &mut dyn Channel, label: &[u8], bits: usize) -> Result<Vec<u8>> {
    check_bits(bits)?;
    let seeds = ch.exchange(&fresh_seed())?;
    if seeds.iter().any(|s| s.len() != SEED_LEN) {
        return Err(Error::Crypto("malformed random contribution".into()));
    }
    let parts: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
    Ok(expand(label, &parts, bits))
}

/// One agreed value per pair of parties; the local slot is left empty
pub(crate) fn pairwise_agree(
    ch: &mut dyn Channel,
    label: &[u8],
    bits: usize,
) -> Result<Vec<Vec<u8>>> {
    check_bits(bits)?;
    let me = ch.party_index();
    let mine: Vec<Vec<u8>> = (0..ch.party_count())
        .map(|j| if j == me { Vec::new() } else { fresh_seed() })
        .collect();
    let theirs = commit_reveal_direct(ch, label, &mine)?;

    let mut out = vec![Vec::new(); ch.party_count()];
    for peer in ch.peers() {
        // Order contributions by index so both ends hash the same input
        let (low, high) = if me < peer {
            (&mine[peer], &theirs[peer])
        } else {
            (&theirs[peer], &mine[peer])
        };
        out[peer] = expand(label, &[low, high], bits);
    }
    Ok(out)
}

/// Use `sid` as-is, or agree on a fresh one when it is empty
pub(crate) fn ensure_sid(ch: &mut dyn Channel, sid: &mut SessionId, label: &[u8]) -> Result<()> {
    if sid.is_empty() {
        *sid = SessionId::new(agree(ch, label, 256)?);
        debug!(?sid, "Generated session id");
    }
    Ok(())
}

/// Digest of a transcript of messages
pub(crate) fn transcript_hash(label: &[u8], parts: &[Vec<u8>]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    Digest::update(&mut hasher, label);
    for part in parts {
        Digest::update(&mut hasher, (part.len() as u64).to_be_bytes());
        Digest::update(&mut hasher, part);
    }
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::soft::testing::{run_2p, run_mp};
    use crate::session::Job2P;
    use crate::transport::MemoryNetwork;

    #[test]
    fn test_two_parties_agree() {
        let out = run_2p(|job| agree(job, b"test", 256).unwrap());
        assert_eq!(out[0].len(), 32);
        assert_eq!(out[0], out[1]);
    }

    #[test]
    fn test_multi_party_variants() {
        let strong = run_mp(3, |job| agree(job, b"strong", 128).unwrap());
        assert!(strong.iter().all(|v| v == &strong[0] && v.len() == 16));

        let weak = run_mp(4, |job| weak_agree(job, b"weak", 64).unwrap());
        assert!(weak.iter().all(|v| v == &weak[0] && v.len() == 8));
    }

    #[test]
    fn test_pairwise_values_match_per_pair() {
        let out = run_mp(3, |job| pairwise_agree(job, b"pairs", 256).unwrap());
        for i in 0..3 {
            assert!(out[i][i].is_empty());
            for j in 0..3 {
                if i != j {
                    assert_eq!(out[i][j], out[j][i]);
                    assert_eq!(out[i][j].len(), 32);
                }
            }
        }
        assert_ne!(out[0][1], out[0][2]);
    }

    #[test]
    fn test_rejects_bad_bit_lengths() {
        let net = MemoryNetwork::with_parties(2);
        let mut job = Job2P::new(net.endpoint(0).unwrap(), 0, ["a", "b"]).unwrap();
        assert!(matches!(agree(&mut job, b"x", 7), Err(Error::BadArgument(_))));
        assert!(matches!(agree(&mut job, b"x", 12), Err(Error::BadArgument(_))));
        assert_eq!(net.pending(), 0);
    }

    #[test]
    fn test_sid_is_generated_once() {
        let out = run_2p(|job| {
            let mut sid = SessionId::empty();
            ensure_sid(job, &mut sid, b"sid").unwrap();
            let first = sid.clone();
            ensure_sid(job, &mut sid, b"sid").unwrap();
            (first, sid)
        });
        assert!(!out[0].0.is_empty());
        assert_eq!(out[0].0, out[0].1);
        assert_eq!(out[0].0, out[1].0);
    }

    #[test]
    fn test_tampered_opening_detected() {
        let tag = b"tag";
        let (committed, _) = seal(tag, 1, b"value").unwrap();
        let (_, other) = seal(tag, 1, b"other").unwrap();
        assert!(matches!(
            check_opening(tag, 1, &committed, &other),
            Err(Error::Crypto(_))
        ));
    }
}
