//! Two-party Schnorr (BIP340 or EdDSA)

use super::{check_key, check_schnorr_messages, check_variant_curve};
use crate::buffer::BufferArray;
use crate::engine::Engine;
use crate::objects::SchnorrKey2p;
use crate::session::Job2P;
use crate::transport::Channel;
use crate::types::{Curve, SchnorrVariant};
use crate::Result;
use tracing::{info, instrument};

#[instrument(skip_all, fields(party_index = job.party_index(), curve = %curve))]
pub fn dkg(engine: &dyn Engine, job: &mut Job2P, curve: Curve) -> Result<SchnorrKey2p> {
    let key = engine.schnorr2p_dkg(job, curve)?;
    info!("Two-party Schnorr key generated");
    Ok(key)
}

/// Party 0 receives the signature, party 1 an empty one
#[instrument(skip_all, fields(party_index = job.party_index(), variant = %variant))]
pub fn sign(
    engine: &dyn Engine,
    job: &mut Job2P,
    key: &SchnorrKey2p,
    message: &[u8],
    variant: SchnorrVariant,
) -> Result<Vec<u8>> {
    let signatures = sign_batch(engine, job, key, &[message], variant)?;
    Ok(signatures.get(0).map(<[u8]>::to_vec).unwrap_or_default())
}

#[instrument(skip_all, fields(party_index = job.party_index(), count = messages.len(), variant = %variant))]
pub fn sign_batch(
    engine: &dyn Engine,
    job: &mut Job2P,
    key: &SchnorrKey2p,
    messages: &[&[u8]],
    variant: SchnorrVariant,
) -> Result<BufferArray> {
    check_key(job, key)?;
    check_variant_curve(variant, key.curve())?;
    check_schnorr_messages(variant, messages)?;
    let signatures = engine.schnorr2p_sign(job, key, messages, variant)?;
    Ok(BufferArray::pack(signatures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::soft::testing::run_2p;
    use crate::engine::SoftEngine;
    use crate::objects::Persist;
    use crate::Error;

    #[test]
    fn test_bip340_batch_over_restored_key() {
        let out = run_2p(|job| {
            let engine = SoftEngine::default();
            let key = dkg(&engine, job, Curve::Secp256k1).unwrap();
            let key = SchnorrKey2p::from_bytes(&key.to_bytes().unwrap()).unwrap();
            let msgs = [[5u8; 32], [6u8; 32]];
            let refs: Vec<&[u8]> = msgs.iter().map(|m| m.as_slice()).collect();
            sign_batch(&engine, job, &key, &refs, SchnorrVariant::Bip340).unwrap()
        });
        assert_eq!(out[0].len(), 2);
        assert!(out[0].iter().all(|sig| sig.len() == 64));
        assert!(out[1].is_empty());
    }

    #[test]
    fn test_variant_must_match_key_curve() {
        let out = run_2p(|job| {
            let engine = SoftEngine::default();
            let key = dkg(&engine, job, Curve::Secp256k1).unwrap();
            (
                sign(&engine, job, &key, b"hello", SchnorrVariant::EdDsa),
                sign(&engine, job, &key, &[1; 31], SchnorrVariant::Bip340),
            )
        });
        for (eddsa, short) in out {
            assert!(matches!(eddsa, Err(Error::BadArgument(_))));
            assert!(matches!(short, Err(Error::BadArgument(_))));
        }
    }
}
