//! Operation dispatch.
//!
//! Every operation follows the same shape: validate the caller's inputs,
//! decode handle-shaped arguments, call the [`Engine`](crate::engine::Engine)
//! and hand back owned outputs. Validation failures are reported as
//! [`Error::BadArgument`] before the engine runs, so they never touch the
//! network. Engine errors are returned unchanged.

pub mod agree;
pub mod curve;
pub mod ecdsa2p;
pub mod ecdsamp;
pub mod elgamal;
pub mod paillier;
pub mod pve;
pub mod schnorr2p;
pub mod schnorrmp;
pub mod zk;

use crate::buffer::BufferArray;
use crate::objects::{KeyKind, KeyShare};
use crate::transport::Channel;
use crate::types::{Curve, PartyIndex, SchnorrVariant, SessionId};
use crate::{Error, Result};

/// Output of a signing run that also yields a session id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signed {
    pub sid: SessionId,
    /// DER or raw signature; empty for a party that does not receive it
    pub signature: Vec<u8>,
}

/// Batched variant of [`Signed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBatch {
    pub sid: SessionId,
    /// One signature per message, or no elements for a non-receiver
    pub signatures: BufferArray,
}

pub(crate) fn check_bits(bits: usize) -> Result<()> {
    if bits < 8 || bits % 8 != 0 {
        return Err(Error::BadArgument(format!(
            "bit length {bits} must be a positive multiple of 8"
        )));
    }
    Ok(())
}

pub(crate) fn check_non_empty(what: &str, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::BadArgument(format!("{what} is empty")));
    }
    Ok(())
}

/// Message hashes must be non-empty and no longer than the group order
pub(crate) fn check_messages(curve: Curve, messages: &[&[u8]]) -> Result<()> {
    if messages.is_empty() {
        return Err(Error::BadArgument("no messages to sign".into()));
    }
    for (i, message) in messages.iter().enumerate() {
        if message.is_empty() || message.len() > curve.order_size() {
            return Err(Error::BadArgument(format!(
                "message {i} is {} bytes, expected 1..={} for {curve}",
                message.len(),
                curve.order_size()
            )));
        }
    }
    Ok(())
}

/// Schnorr messages: BIP340 signs 32-byte digests, EdDSA arbitrary non-empty messages
pub(crate) fn check_schnorr_messages(variant: SchnorrVariant, messages: &[&[u8]]) -> Result<()> {
    if messages.is_empty() {
        return Err(Error::BadArgument("no messages to sign".into()));
    }
    for (i, message) in messages.iter().enumerate() {
        let ok = match variant {
            SchnorrVariant::Bip340 => message.len() == 32,
            SchnorrVariant::EdDsa => !message.is_empty(),
        };
        if !ok {
            return Err(Error::BadArgument(format!(
                "message {i} of {} bytes is not valid for {variant}",
                message.len()
            )));
        }
    }
    Ok(())
}

pub(crate) fn check_variant_curve(variant: SchnorrVariant, curve: Curve) -> Result<()> {
    let expected = match variant {
        SchnorrVariant::Bip340 => Curve::Secp256k1,
        SchnorrVariant::EdDsa => Curve::Ed25519,
    };
    if curve != expected {
        return Err(Error::BadArgument(format!("{variant} signing needs a {expected} key")));
    }
    Ok(())
}

/// The key must belong to the local party of a session of the same size
pub(crate) fn check_key<K: KeyKind>(job: &dyn Channel, key: &KeyShare<K>) -> Result<()> {
    if key.party_index() != job.party_index() || key.party_count() != job.party_count() {
        return Err(Error::BadArgument(format!(
            "key share {} of {} used by party {} of {}",
            key.party_index(),
            key.party_count(),
            job.party_index(),
            job.party_count()
        )));
    }
    Ok(())
}

pub(crate) fn check_receiver(job: &dyn Channel, receiver: PartyIndex) -> Result<()> {
    if receiver >= job.party_count() {
        return Err(Error::BadArgument(format!(
            "signature receiver {receiver} is not one of {} parties",
            job.party_count()
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits() {
        assert!(check_bits(256).is_ok());
        assert!(check_bits(8).is_ok());
        for bits in [0, 4, 12, 257] {
            assert!(matches!(check_bits(bits), Err(Error::BadArgument(_))));
        }
    }

    #[test]
    fn test_message_bounds() {
        let ok = [1u8; 32];
        let long = [1u8; 33];
        assert!(check_messages(Curve::Secp256k1, &[&ok]).is_ok());
        assert!(check_messages(Curve::Secp256k1, &[&ok, &long]).is_err());
        assert!(check_messages(Curve::P521, &[&[1u8; 66][..]]).is_ok());
        assert!(check_messages(Curve::Secp256k1, &[&[][..]]).is_err());
        assert!(check_messages(Curve::Secp256k1, &[]).is_err());
    }

    #[test]
    fn test_schnorr_message_rules() {
        assert!(check_schnorr_messages(SchnorrVariant::Bip340, &[&[0u8; 32][..]]).is_ok());
        assert!(check_schnorr_messages(SchnorrVariant::Bip340, &[&[0u8; 31][..]]).is_err());
        assert!(check_schnorr_messages(SchnorrVariant::EdDsa, &[&[0u8; 100][..]]).is_ok());
        assert!(check_variant_curve(SchnorrVariant::Bip340, Curve::Ed25519).is_err());
        assert!(check_variant_curve(SchnorrVariant::EdDsa, Curve::Ed25519).is_ok());
    }
}
