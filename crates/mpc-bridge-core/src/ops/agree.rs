//! Jointly generated randomness

use super::check_bits;
use crate::buffer::BufferArray;
use crate::engine::Engine;
use crate::session::{Job2P, JobMp};
use crate::transport::Channel;
use crate::Result;
use tracing::instrument;

/// Two parties agree on `bits` random bits
#[instrument(skip_all, fields(party_index = job.party_index(), bits = bits))]
pub fn agree_random(engine: &dyn Engine, job: &mut Job2P, bits: usize) -> Result<Vec<u8>> {
    check_bits(bits)?;
    engine.agree_random(job, bits)
}

/// Every party agrees on `bits` random bits
#[instrument(skip_all, fields(party_index = job.party_index(), n_parties = job.party_count(), bits = bits))]
pub fn multi_agree_random(engine: &dyn Engine, job: &mut JobMp, bits: usize) -> Result<Vec<u8>> {
    check_bits(bits)?;
    engine.multi_agree_random(job, bits)
}

/// Cheaper agreement where the last party to reveal can bias the output
#[instrument(skip_all, fields(party_index = job.party_index(), n_parties = job.party_count(), bits = bits))]
pub fn weak_multi_agree_random(
    engine: &dyn Engine,
    job: &mut JobMp,
    bits: usize,
) -> Result<Vec<u8>> {
    check_bits(bits)?;
    engine.weak_multi_agree_random(job, bits)
}

/// One value shared with each peer, indexed by party; the local slot is empty
#[instrument(skip_all, fields(party_index = job.party_index(), n_parties = job.party_count(), bits = bits))]
pub fn multi_pairwise_agree_random(
    engine: &dyn Engine,
    job: &mut JobMp,
    bits: usize,
) -> Result<BufferArray> {
    check_bits(bits)?;
    let values = engine.multi_pairwise_agree_random(job, bits)?;
    Ok(BufferArray::pack(values))
}
