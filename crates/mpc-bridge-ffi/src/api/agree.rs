//! Random agreement

use super::outputs;
use crate::engine;
use crate::handles::{Job2PHandle, JobMpHandle};
use crate::job::with_job;
use crate::mem::{CMem, CMems};
use crate::status::{ffi_call, require_out};
use mpc_bridge_core::ops;
use std::os::raw::c_int;

fn bits(value: c_int) -> mpc_bridge_core::Result<usize> {
    super::count(value, "bit length")
}

/// Two parties agree on `bit_len` random bits
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_agree_random(
    job: Job2PHandle,
    bit_len: c_int,
    out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_agree_random", || {
        require_out(out, "random")?;
        let bits = bits(bit_len)?;
        let value = with_job(job.get()?, |job| ops::agree::agree_random(engine(), job, bits))?;
        let mut outputs = outputs();
        outputs.mem(out, &value)?;
        outputs.commit();
        Ok(())
    })
}

/// All parties agree on `bit_len` unbiased random bits
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_multi_agree_random(
    job: JobMpHandle,
    bit_len: c_int,
    out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_multi_agree_random", || {
        require_out(out, "random")?;
        let bits = bits(bit_len)?;
        let value =
            with_job(job.get()?, |job| ops::agree::multi_agree_random(engine(), job, bits))?;
        let mut outputs = outputs();
        outputs.mem(out, &value)?;
        outputs.commit();
        Ok(())
    })
}

/// Cheaper multi-party agreement that tolerates a biasing last party
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_weak_multi_agree_random(
    job: JobMpHandle,
    bit_len: c_int,
    out: *mut CMem,
) -> c_int {
    ffi_call("mpcb_weak_multi_agree_random", || {
        require_out(out, "random")?;
        let bits = bits(bit_len)?;
        let value =
            with_job(job.get()?, |job| ops::agree::weak_multi_agree_random(engine(), job, bits))?;
        let mut outputs = outputs();
        outputs.mem(out, &value)?;
        outputs.commit();
        Ok(())
    })
}

/// One shared value per party pair; element `i` is shared with party `i`
/// and the local element is empty.
///
/// # Safety
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_multi_pairwise_agree_random(
    job: JobMpHandle,
    bit_len: c_int,
    out: *mut CMems,
) -> c_int {
    ffi_call("mpcb_multi_pairwise_agree_random", || {
        require_out(out, "random values")?;
        let bits = bits(bit_len)?;
        let values = with_job(job.get()?, |job| {
            ops::agree::multi_pairwise_agree_random(engine(), job, bits)
        })?;
        let mut outputs = outputs();
        outputs.array(out, &values)?;
        outputs.commit();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{MPCB_E_BADARG, MPCB_SUCCESS};
    use crate::testing::{run_2p, run_mp, take, take_all};

    #[test]
    fn test_two_parties_agree_through_callbacks() {
        let out = run_2p(|job| {
            let mut value = CMem::EMPTY;
            assert_eq!(unsafe { mpcb_agree_random(job, 256, &mut value) }, MPCB_SUCCESS);
            take(value)
        });
        assert_eq!(out[0].len(), 32);
        assert_eq!(out[0], out[1]);
    }

    #[test]
    fn test_bad_bit_length_fails_before_network() {
        let out = run_2p(|job| {
            let mut value = CMem::EMPTY;
            let rc = unsafe { mpcb_agree_random(job, 12, &mut value) };
            (rc, value.data.is_null())
        });
        assert!(out.iter().all(|(rc, null)| *rc == MPCB_E_BADARG && *null));
    }

    #[test]
    fn test_multi_party_agreement() {
        let out = run_mp(3, |job| {
            let mut value = CMem::EMPTY;
            assert_eq!(
                unsafe { mpcb_multi_agree_random(job, 128, &mut value) },
                MPCB_SUCCESS
            );
            let mut pairwise = CMems::EMPTY;
            assert_eq!(
                unsafe { mpcb_multi_pairwise_agree_random(job, 64, &mut pairwise) },
                MPCB_SUCCESS
            );
            (take(value), take_all(pairwise))
        });
        assert!(out.iter().all(|(v, _)| v.len() == 16 && *v == out[0].0));
        assert_eq!(out[0].1.len(), 3);
        assert_eq!(out[0].1[1], out[1].1[0]);
        assert_eq!(out[2].1[0], out[0].1[2]);
    }
}
