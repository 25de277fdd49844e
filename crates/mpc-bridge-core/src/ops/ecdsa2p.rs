//! Two-party ECDSA

use super::{check_key, check_messages, Signed, SignedBatch};
use crate::buffer::BufferArray;
use crate::engine::Engine;
use crate::objects::EcdsaKey2p;
use crate::session::Job2P;
use crate::transport::Channel;
use crate::types::{Curve, SessionId};
use crate::{Error, Result};
use tracing::{info, instrument};

#[instrument(skip_all, fields(party_index = job.party_index(), curve = %curve))]
pub fn dkg(engine: &dyn Engine, job: &mut Job2P, curve: Curve) -> Result<EcdsaKey2p> {
    let key = engine.ecdsa2p_dkg(job, curve)?;
    info!("Two-party ECDSA key generated");
    Ok(key)
}

/// New shares of the same public key; the old share should be discarded
#[instrument(skip_all, fields(party_index = job.party_index()))]
pub fn refresh(engine: &dyn Engine, job: &mut Job2P, key: &EcdsaKey2p) -> Result<EcdsaKey2p> {
    check_key(job, key)?;
    engine.ecdsa2p_refresh(job, key)
}

fn run(
    engine: &dyn Engine,
    job: &mut Job2P,
    sid: &SessionId,
    key: &EcdsaKey2p,
    messages: &[&[u8]],
    global_abort: bool,
) -> Result<SignedBatch> {
    check_key(job, key)?;
    check_messages(key.curve(), messages)?;

    let mut sid = sid.clone();
    let signatures = engine.ecdsa2p_sign(job, &mut sid, key, messages, global_abort)?;
    if !signatures.is_empty() && signatures.len() != messages.len() {
        return Err(Error::Crypto(format!(
            "engine returned {} signatures for {} messages",
            signatures.len(),
            messages.len()
        )));
    }
    Ok(SignedBatch {
        sid,
        signatures: BufferArray::pack(signatures),
    })
}

fn single(batch: SignedBatch) -> Signed {
    Signed {
        signature: batch.signatures.get(0).map(<[u8]>::to_vec).unwrap_or_default(),
        sid: batch.sid,
    }
}

/// Sign one hash. An empty `sid` is replaced by a jointly generated one,
/// returned in the output. Party 0 receives the signature.
#[instrument(skip_all, fields(party_index = job.party_index()))]
pub fn sign(
    engine: &dyn Engine,
    job: &mut Job2P,
    sid: &SessionId,
    key: &EcdsaKey2p,
    message: &[u8],
) -> Result<Signed> {
    run(engine, job, sid, key, &[message], false).map(single)
}

#[instrument(skip_all, fields(party_index = job.party_index(), count = messages.len()))]
pub fn sign_batch(
    engine: &dyn Engine,
    job: &mut Job2P,
    sid: &SessionId,
    key: &EcdsaKey2p,
    messages: &[&[u8]],
) -> Result<SignedBatch> {
    run(engine, job, sid, key, messages, false)
}

/// Like [`sign`], but a signature that fails verification is reported as
/// [`Error::PossibleKeyLeak`]. The key must then be retired.
#[instrument(skip_all, fields(party_index = job.party_index()))]
pub fn sign_with_global_abort(
    engine: &dyn Engine,
    job: &mut Job2P,
    sid: &SessionId,
    key: &EcdsaKey2p,
    message: &[u8],
) -> Result<Signed> {
    run(engine, job, sid, key, &[message], true).map(single)
}

#[instrument(skip_all, fields(party_index = job.party_index(), count = messages.len()))]
pub fn sign_with_global_abort_batch(
    engine: &dyn Engine,
    job: &mut Job2P,
    sid: &SessionId,
    key: &EcdsaKey2p,
    messages: &[&[u8]],
) -> Result<SignedBatch> {
    run(engine, job, sid, key, messages, true)
}
