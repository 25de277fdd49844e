//! Additive n-of-n key generation and refresh

use super::agree::{commit_reveal, pairwise_agree, transcript_hash};
use super::curve::{decode_point, encode_point, encode_scalar, hash_to_scalar, random_nonzero};
use super::paillier::{PaillierPublic, PaillierSecret};
use super::zk::{prove_dl, verify_dl};
use crate::buffer::SecretBytes;
use crate::codec;
use crate::objects::{KeyKind, KeyShare};
use crate::transport::Channel;
use crate::types::PartyIndex;
use crate::{Error, Result};
use k256::{elliptic_curve::Group, ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Engine-private part of a key share
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct SharePayload {
    x: [u8; 32],
    public_shares: Vec<Vec<u8>>,
    paillier: Option<PaillierPayload>,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct PaillierPayload {
    p: Vec<u8>,
    q: Vec<u8>,
    /// Every party's modulus, indexed by party
    moduli: Vec<Vec<u8>>,
}

/// Paillier material held by an ECDSA share
pub(crate) struct PaillierKeys {
    pub own: PaillierSecret,
    pub peers: Vec<PaillierPublic>,
}

/// Decoded key share
pub(crate) struct Share {
    pub index: PartyIndex,
    pub x: Scalar,
    pub public_key: ProjectivePoint,
    pub public_shares: Vec<ProjectivePoint>,
    pub paillier: Option<PaillierKeys>,
}

impl Drop for Share {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl Share {
    pub(crate) fn count(&self) -> usize {
        self.public_shares.len()
    }

    /// [`Share::load`], then check the share is used from the seat it was
    /// generated for
    pub(crate) fn load_for<K: KeyKind>(ch: &dyn Channel, key: &KeyShare<K>) -> Result<Self> {
        let share = Self::load(key)?;
        if ch.party_index() != share.index || ch.party_count() != share.count() {
            return Err(Error::BadArgument(format!(
                "key share of party {} in {} used as party {} in {}",
                share.index,
                share.count(),
                ch.party_index(),
                ch.party_count()
            )));
        }
        Ok(share)
    }

    /// Decode and cross-check a share produced by [`generate`] or [`refresh`]
    pub(crate) fn load<K: KeyKind>(key: &KeyShare<K>) -> Result<Self> {
        let payload: SharePayload = codec::decode(key.secret_payload())
            .map_err(|_| Error::BadArgument("key share was not produced by this engine".into()))?;
        let x = super::curve::decode_scalar(&payload.x)?;
        let public_shares = payload
            .public_shares
            .iter()
            .map(|p| decode_point(p))
            .collect::<Result<Vec<_>>>()?;
        let public_key = super::curve::to_point(key.public_key())?;

        let index = key.party_index();
        if public_shares.len() != key.party_count() || index >= public_shares.len() {
            return Err(Error::Crypto("key share roster is inconsistent".into()));
        }
        if public_shares[index] != ProjectivePoint::GENERATOR * x {
            return Err(Error::Crypto("secret share does not match its public share".into()));
        }
        let sum = public_shares
            .iter()
            .fold(ProjectivePoint::IDENTITY, |acc, p| acc + p);
        if sum != public_key {
            return Err(Error::Crypto("public shares do not add up to the key".into()));
        }

        let paillier = match &payload.paillier {
            None => None,
            Some(pp) => {
                if pp.moduli.len() != public_shares.len() {
                    return Err(Error::Crypto("paillier roster is inconsistent".into()));
                }
                let own = PaillierSecret::from_bytes(&pp.moduli[index], &pp.p, &pp.q)
                    .map_err(|e| Error::Crypto(e.to_string()))?;
                let peers = pp
                    .moduli
                    .iter()
                    .map(|n| PaillierPublic::from_bytes(n))
                    .collect::<Result<Vec<_>>>()?;
                Some(PaillierKeys { own, peers })
            }
        };

        Ok(Self {
            index,
            x,
            public_key,
            public_shares,
            paillier,
        })
    }
}

/// Output of one key generation or refresh run
pub(crate) struct Generated {
    pub public_key: ProjectivePoint,
    pub payload: SecretBytes,
    /// Digest of the round-one commitments, usable as a session id
    pub transcript: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct Contribution {
    public_share: Vec<u8>,
    proof: Vec<u8>,
    paillier_n: Option<Vec<u8>>,
}

fn roster_binding(ch: &dyn Channel, label: &[u8], sid: &[u8]) -> Vec<u8> {
    let mut parts: Vec<Vec<u8>> = ch.party_names().iter().map(|n| n.as_bytes().to_vec()).collect();
    parts.push(sid.to_vec());
    transcript_hash(label, &parts)
}

/// Publish `x*G` with a proof of knowledge, and collect everyone else's
fn publish(
    ch: &mut dyn Channel,
    tag: &[u8],
    binding: &[u8],
    x: &Scalar,
    paillier: Option<&PaillierSecret>,
) -> Result<(Vec<ProjectivePoint>, Option<Vec<Vec<u8>>>, Vec<u8>)> {
    let me = ch.party_index();
    let public_share = ProjectivePoint::GENERATOR * x;
    let contribution = Contribution {
        public_share: encode_point(&public_share),
        proof: prove_dl(&public_share, x, binding, me as u64)?,
        paillier_n: paillier.map(|k| k.public().n().to_bytes()),
    };
    let revealed = commit_reveal(ch, tag, &codec::encode(&contribution)?)?;

    let mut shares = Vec::with_capacity(ch.party_count());
    let mut moduli = Vec::with_capacity(ch.party_count());
    for (index, value) in revealed.values.iter().enumerate() {
        let c: Contribution = codec::decode(value)
            .map_err(|_| Error::Crypto(format!("malformed key contribution from {index}")))?;
        let point = decode_point(&c.public_share)?;
        verify_dl(&c.proof, &point, binding, index as u64)?;
        if paillier.is_some() {
            let n = c
                .paillier_n
                .ok_or_else(|| Error::Crypto(format!("party {index} sent no paillier key")))?;
            PaillierPublic::from_bytes(&n).map_err(|e| Error::Crypto(e.to_string()))?;
            moduli.push(n);
        }
        shares.push(point);
    }
    let transcript = transcript_hash(b"keygen transcript", &revealed.commitments);
    Ok((shares, paillier.map(|_| moduli), transcript))
}

fn assemble(
    x: &Scalar,
    public_shares: &[ProjectivePoint],
    paillier: Option<(&PaillierSecret, Vec<Vec<u8>>)>,
) -> Result<(ProjectivePoint, SecretBytes)> {
    let public_key = public_shares
        .iter()
        .fold(ProjectivePoint::IDENTITY, |acc, p| acc + p);
    if bool::from(public_key.is_identity()) {
        return Err(Error::Crypto("joint public key is the identity".into()));
    }
    let payload = SharePayload {
        x: encode_scalar(x),
        public_shares: public_shares.iter().map(encode_point).collect(),
        paillier: paillier.map(|(key, moduli)| {
            let (p, q) = key.factors();
            PaillierPayload {
                p: p.to_vec(),
                q: q.to_vec(),
                moduli,
            }
        }),
    };
    Ok((public_key, codec::encode_secret(&payload)?))
}

/// Joint key generation. With `paillier_bits`, every party also generates a
/// Paillier key and learns everyone's modulus.
pub(crate) fn generate(ch: &mut dyn Channel, paillier_bits: Option<usize>) -> Result<Generated> {
    info!(
        party_index = ch.party_index(),
        n_parties = ch.party_count(),
        paillier = paillier_bits.is_some(),
        "Starting key generation"
    );
    let x = random_nonzero();
    let paillier = paillier_bits.map(PaillierSecret::generate).transpose()?;
    let binding = roster_binding(ch, b"keygen", &[]);

    let (shares, moduli, transcript) =
        publish(ch, b"mpc-bridge keygen", &binding, &x, paillier.as_ref())?;
    let (public_key, payload) = assemble(&x, &shares, paillier.as_ref().zip(moduli))?;

    info!(
        party_index = ch.party_index(),
        public_key = hex::encode(encode_point(&public_key)),
        "Key generation completed"
    );
    Ok(Generated {
        public_key,
        payload,
        transcript,
    })
}

/// Re-randomize shares with zero-sum offsets derived from pairwise seeds.
/// The joint key is unchanged; Paillier keys, if any, are replaced.
pub(crate) fn refresh(
    ch: &mut dyn Channel,
    share: &Share,
    sid: &[u8],
    paillier_bits: Option<usize>,
) -> Result<Generated> {
    info!(party_index = ch.party_index(), "Starting key refresh");
    let me = ch.party_index();
    let mut label = b"mpc-bridge refresh ".to_vec();
    label.extend_from_slice(sid);
    let seeds = pairwise_agree(ch, &label, 256)?;

    let mut offset = Scalar::ZERO;
    for peer in ch.peers() {
        let (low, high) = (me.min(peer) as u64, me.max(peer) as u64);
        let h = hash_to_scalar(
            b"refresh offset",
            &[sid, &low.to_be_bytes(), &high.to_be_bytes(), &seeds[peer]],
        );
        if peer > me {
            offset += h;
        } else {
            offset -= h;
        }
    }
    let x = share.x + offset;
    debug!("Derived refresh offset");

    let paillier = paillier_bits.map(PaillierSecret::generate).transpose()?;
    let binding = roster_binding(ch, b"refresh", sid);
    let (shares, moduli, transcript) =
        publish(ch, b"mpc-bridge refresh", &binding, &x, paillier.as_ref())?;
    let (public_key, payload) = assemble(&x, &shares, paillier.as_ref().zip(moduli))?;
    if public_key != share.public_key {
        return Err(Error::Crypto("refreshed shares changed the public key".into()));
    }

    info!(party_index = me, "Key refresh completed");
    Ok(Generated {
        public_key,
        payload,
        transcript,
    })
}
