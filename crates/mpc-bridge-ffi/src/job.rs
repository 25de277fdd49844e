//! Session constructors

use crate::handles::{Job2PHandle, JobMpHandle};
use crate::status::{ffi_call, require_out, write_out};
use crate::transport::{CallbackTransport, TransportCallbacks};
use mpc_bridge_core::session::Job;
use mpc_bridge_core::transport::Shape;
use mpc_bridge_core::types::PartyIndex;
use mpc_bridge_core::{Error, Job2P, JobMp, Result};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::sync::{Arc, Mutex};

/// Copy a caller NUL-terminated UTF-8 name
///
/// # Safety
/// `name` must be null or a valid C string.
unsafe fn name(name: *const c_char) -> Result<String> {
    if name.is_null() {
        return Err(Error::BadArgument("null party name".into()));
    }
    CStr::from_ptr(name)
        .to_str()
        .map(str::to_owned)
        .map_err(|_| Error::BadArgument("party name is not UTF-8".into()))
}

unsafe fn callbacks(table: *const TransportCallbacks) -> Result<TransportCallbacks> {
    table
        .as_ref()
        .copied()
        .ok_or_else(|| Error::BadArgument("null transport callback table".into()))
}

fn to_index(index: c_int) -> Result<PartyIndex> {
    PartyIndex::try_from(index)
        .map_err(|_| Error::BadArgument(format!("negative party index {index}")))
}

/// Run `f` with exclusive use of a session. Operations on one session are
/// serialized; a session poisoned by a panic is unusable.
pub(crate) fn with_job<S: Shape, R>(
    job: Arc<Mutex<Job<S>>>,
    f: impl FnOnce(&mut Job<S>) -> Result<R>,
) -> Result<R> {
    let mut guard = job
        .lock()
        .map_err(|_| Error::BadArgument("session unusable after an earlier panic".into()))?;
    f(&mut guard)
}

/// Create a two-party session. `party_index` is 0 or 1 and names the
/// local party within `(name0, name1)`.
///
/// # Safety
/// `callbacks` must point at a valid table whose context outlives the
/// session; names must be valid C strings; `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn mpcb_job2p_new(
    callbacks_table: *const TransportCallbacks,
    party_index: c_int,
    name0: *const c_char,
    name1: *const c_char,
    out: *mut Job2PHandle,
) -> c_int {
    ffi_call("mpcb_job2p_new", || {
        require_out(out, "session")?;
        let transport = CallbackTransport::new(callbacks(callbacks_table)?, false)?;
        let names = [name(name0)?, name(name1)?];
        let job = Job2P::new(transport, to_index(party_index)?, names)?;
        write_out(out, Job2PHandle::store(Mutex::new(job)))
    })
}

/// Create a multi-party session over `count` names
///
/// # Safety
/// As [`mpcb_job2p_new`]; `names` must hold `count` C strings.
#[no_mangle]
pub unsafe extern "C" fn mpcb_jobmp_new(
    callbacks_table: *const TransportCallbacks,
    party_index: c_int,
    count: c_int,
    names: *const *const c_char,
    out: *mut JobMpHandle,
) -> c_int {
    ffi_call("mpcb_jobmp_new", || {
        require_out(out, "session")?;
        let transport = CallbackTransport::new(callbacks(callbacks_table)?, true)?;
        let count = usize::try_from(count)
            .map_err(|_| Error::BadArgument(format!("negative party count {count}")))?;
        if names.is_null() && count > 0 {
            return Err(Error::BadArgument("null name array".into()));
        }
        let names: Vec<String> = (0..count)
            .map(|i| name(*names.add(i)))
            .collect::<Result<_>>()?;
        let job = JobMp::new(transport, to_index(party_index)?, names)?;
        write_out(out, JobMpHandle::store(Mutex::new(job)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::{mpcb_job2p_free, mpcb_jobmp_free};
    use crate::status::{MPCB_E_BADARG, MPCB_SUCCESS};
    use crate::transport::testing::{callbacks as table, Mailbox, Party};

    #[test]
    fn test_job2p_lifecycle() {
        let mailbox = Arc::new(Mailbox::default());
        let party = Party::new(0, mailbox);
        let table = table(&party);
        let mut job = Job2PHandle::NULL;
        let rc = unsafe {
            mpcb_job2p_new(&table, 0, c"P1".as_ptr(), c"P2".as_ptr(), &mut job)
        };
        assert_eq!(rc, MPCB_SUCCESS);
        assert!(!job.is_null());

        assert_eq!(mpcb_job2p_free(job), MPCB_SUCCESS);
        assert_eq!(mpcb_job2p_free(job), MPCB_E_BADARG);
    }

    #[test]
    fn test_job2p_rejects_bad_arguments() {
        let mailbox = Arc::new(Mailbox::default());
        let party = Party::new(0, mailbox);
        let table = table(&party);
        let mut job = Job2PHandle::NULL;
        unsafe {
            assert_eq!(
                mpcb_job2p_new(&table, 2, c"P1".as_ptr(), c"P2".as_ptr(), &mut job),
                MPCB_E_BADARG
            );
            assert_eq!(
                mpcb_job2p_new(std::ptr::null(), 0, c"P1".as_ptr(), c"P2".as_ptr(), &mut job),
                MPCB_E_BADARG
            );
            assert_eq!(
                mpcb_job2p_new(&table, 0, c"P1".as_ptr(), std::ptr::null(), &mut job),
                MPCB_E_BADARG
            );
            assert_eq!(
                mpcb_job2p_new(&table, 0, c"P1".as_ptr(), c"P1".as_ptr(), &mut job),
                MPCB_E_BADARG
            );
        }
        assert!(job.is_null());
    }

    #[test]
    fn test_jobmp_requires_batched_receive() {
        let mailbox = Arc::new(Mailbox::default());
        let party = Party::new(1, mailbox);
        let mut table = table(&party);
        let names = [c"a".as_ptr(), c"b".as_ptr(), c"c".as_ptr()];
        let mut job = JobMpHandle::NULL;

        let rc = unsafe { mpcb_jobmp_new(&table, 1, 3, names.as_ptr(), &mut job) };
        assert_eq!(rc, MPCB_SUCCESS);
        assert_eq!(mpcb_jobmp_free(job), MPCB_SUCCESS);

        table.receive_all = None;
        let rc = unsafe { mpcb_jobmp_new(&table, 1, 3, names.as_ptr(), &mut job) };
        assert_eq!(rc, MPCB_E_BADARG);
    }
}
