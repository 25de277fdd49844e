//! Multi-party Schnorr (n-of-n)

use super::{check_key, check_receiver, check_schnorr_messages, check_variant_curve};
use crate::buffer::BufferArray;
use crate::engine::Engine;
use crate::objects::KeyShareMp;
use crate::session::JobMp;
use crate::transport::Channel;
use crate::types::{Curve, PartyIndex, SchnorrVariant, SessionId};
use crate::Result;
use tracing::{info, instrument};

#[instrument(skip_all, fields(party_index = job.party_index(), n_parties = job.party_count(), curve = %curve))]
pub fn dkg(engine: &dyn Engine, job: &mut JobMp, curve: Curve) -> Result<(KeyShareMp, SessionId)> {
    let mut sid = SessionId::empty();
    let key = engine.schnorrmp_dkg(job, curve, &mut sid)?;
    info!(?sid, "Multi-party Schnorr key generated");
    Ok((key, sid))
}

#[instrument(skip_all, fields(party_index = job.party_index(), n_parties = job.party_count()))]
pub fn refresh(
    engine: &dyn Engine,
    job: &mut JobMp,
    sid: &SessionId,
    key: &KeyShareMp,
) -> Result<(KeyShareMp, SessionId)> {
    check_key(job, key)?;
    let mut sid = sid.clone();
    let key = engine.schnorrmp_refresh(job, &mut sid, key)?;
    Ok((key, sid))
}

/// Only `receiver` gets the signature
#[instrument(skip_all, fields(party_index = job.party_index(), receiver = receiver, variant = %variant))]
pub fn sign(
    engine: &dyn Engine,
    job: &mut JobMp,
    key: &KeyShareMp,
    message: &[u8],
    receiver: PartyIndex,
    variant: SchnorrVariant,
) -> Result<Vec<u8>> {
    let signatures = sign_batch(engine, job, key, &[message], receiver, variant)?;
    Ok(signatures.get(0).map(<[u8]>::to_vec).unwrap_or_default())
}

#[instrument(skip_all, fields(party_index = job.party_index(), count = messages.len(), receiver = receiver))]
pub fn sign_batch(
    engine: &dyn Engine,
    job: &mut JobMp,
    key: &KeyShareMp,
    messages: &[&[u8]],
    receiver: PartyIndex,
    variant: SchnorrVariant,
) -> Result<BufferArray> {
    check_key(job, key)?;
    check_receiver(job, receiver)?;
    check_variant_curve(variant, key.curve())?;
    check_schnorr_messages(variant, messages)?;
    let signatures = engine.schnorrmp_sign(job, key, messages, receiver, variant)?;
    Ok(BufferArray::pack(signatures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::soft::testing::run_mp;
    use crate::engine::SoftEngine;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    use k256::schnorr::{Signature, VerifyingKey};

    #[test]
    fn test_sign_after_refresh_verifies() {
        let msg = [0x11u8; 32];
        let out = run_mp(3, move |job| {
            let engine = SoftEngine::default();
            let (key, sid) = dkg(&engine, job, Curve::Secp256k1).unwrap();
            let (key, _) = refresh(&engine, job, &sid, &key).unwrap();
            let sig = sign(&engine, job, &key, &msg, 0, SchnorrVariant::Bip340).unwrap();
            (key.public_key().clone(), sig)
        });
        assert!(out[1].1.is_empty() && out[2].1.is_empty());

        let compressed = out[0].0.as_bytes();
        let key = VerifyingKey::from_bytes(&compressed[1..]).unwrap();
        let signature = Signature::try_from(out[0].1.as_slice()).unwrap();
        key.verify_prehash(&msg, &signature).unwrap();
    }
}
