//! Multi-party ECDSA (n-of-n)

use super::{check_key, check_messages, check_receiver};
use crate::engine::Engine;
use crate::objects::KeyShareMp;
use crate::session::JobMp;
use crate::transport::Channel;
use crate::types::{Curve, PartyIndex, SessionId};
use crate::Result;
use tracing::{info, instrument};

/// Generate a key; the returned sid identifies the run and can seed later steps
#[instrument(skip_all, fields(party_index = job.party_index(), n_parties = job.party_count(), curve = %curve))]
pub fn dkg(engine: &dyn Engine, job: &mut JobMp, curve: Curve) -> Result<(KeyShareMp, SessionId)> {
    let mut sid = SessionId::empty();
    let key = engine.ecdsamp_dkg(job, curve, &mut sid)?;
    info!(?sid, "Multi-party ECDSA key generated");
    Ok((key, sid))
}

/// Re-randomize shares. An empty `sid` is replaced by a fresh one.
#[instrument(skip_all, fields(party_index = job.party_index(), n_parties = job.party_count()))]
pub fn refresh(
    engine: &dyn Engine,
    job: &mut JobMp,
    sid: &SessionId,
    key: &KeyShareMp,
) -> Result<(KeyShareMp, SessionId)> {
    check_key(job, key)?;
    let mut sid = sid.clone();
    let key = engine.ecdsamp_refresh(job, &mut sid, key)?;
    Ok((key, sid))
}

/// Only `receiver` gets the DER signature; every other party gets an empty one
#[instrument(skip_all, fields(party_index = job.party_index(), n_parties = job.party_count(), receiver = receiver))]
pub fn sign(
    engine: &dyn Engine,
    job: &mut JobMp,
    key: &KeyShareMp,
    message: &[u8],
    receiver: PartyIndex,
) -> Result<Vec<u8>> {
    check_key(job, key)?;
    check_messages(key.curve(), &[message])?;
    check_receiver(job, receiver)?;
    engine.ecdsamp_sign(job, key, message, receiver)
}
