//! Runs parties on threads, each with a session built through the boundary

use crate::handles::{mpcb_job2p_free, mpcb_jobmp_free, Job2PHandle, JobMpHandle};
use crate::job::{mpcb_job2p_new, mpcb_jobmp_new};
use crate::status::MPCB_SUCCESS;
use crate::transport::testing::{callbacks, Mailbox, Party};
use mpc_bridge_core::{EngineConfig, SoftEngine};
use std::ffi::CString;
use std::sync::Arc;
use std::thread;

/// Smaller Paillier primes keep key generation fast
pub(crate) fn engine() -> SoftEngine {
    SoftEngine::new(EngineConfig {
        paillier_prime_bits: 512,
        ..EngineConfig::default()
    })
    .unwrap()
}

pub(crate) fn run_2p<T, F>(f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(Job2PHandle) -> T + Send + Clone + 'static,
{
    let mailbox = Arc::new(Mailbox::default());
    let threads: Vec<_> = (0..2)
        .map(|i| {
            let mailbox = mailbox.clone();
            let f = f.clone();
            thread::spawn(move || {
                let party = Party::new(i, mailbox);
                let table = callbacks(&party);
                let mut job = Job2PHandle::NULL;
                let rc = unsafe {
                    mpcb_job2p_new(&table, i, c"P1".as_ptr(), c"P2".as_ptr(), &mut job)
                };
                assert_eq!(rc, MPCB_SUCCESS);
                let out = f(job);
                assert_eq!(mpcb_job2p_free(job), MPCB_SUCCESS);
                out
            })
        })
        .collect();
    threads.into_iter().map(|t| t.join().unwrap()).collect()
}

pub(crate) fn run_mp<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(JobMpHandle) -> T + Send + Clone + 'static,
{
    let mailbox = Arc::new(Mailbox::default());
    let threads: Vec<_> = (0..n)
        .map(|i| {
            let mailbox = mailbox.clone();
            let f = f.clone();
            thread::spawn(move || {
                let party = Party::new(i as i32, mailbox);
                let table = callbacks(&party);
                let names: Vec<CString> =
                    (0..n).map(|p| CString::new(format!("party-{p}")).unwrap()).collect();
                let ptrs: Vec<_> = names.iter().map(|s| s.as_ptr()).collect();
                let mut job = JobMpHandle::NULL;
                let rc = unsafe {
                    mpcb_jobmp_new(&table, i as i32, n as i32, ptrs.as_ptr(), &mut job)
                };
                assert_eq!(rc, MPCB_SUCCESS);
                let out = f(job);
                assert_eq!(mpcb_jobmp_free(job), MPCB_SUCCESS);
                out
            })
        })
        .collect();
    threads.into_iter().map(|t| t.join().unwrap()).collect()
}

/// Copy and release a library buffer
pub(crate) fn take(mem: crate::mem::CMem) -> Vec<u8> {
    let bytes = unsafe { crate::mem::borrow(mem) }.unwrap().to_vec();
    unsafe { crate::mem::mpcb_cmem_free(mem) };
    bytes
}

/// Copy and release a library array
pub(crate) fn take_all(mems: crate::mem::CMems) -> Vec<Vec<u8>> {
    let items: Vec<Vec<u8>> = unsafe { crate::mem::borrow_array(mems) }
        .unwrap()
        .into_iter()
        .map(<[u8]>::to_vec)
        .collect();
    unsafe { crate::mem::mpcb_cmems_free(mems) };
    items
}

/// Borrow a test slice as an input buffer
pub(crate) fn cmem(bytes: &[u8]) -> crate::mem::CMem {
    crate::mem::CMem {
        data: bytes.as_ptr().cast_mut(),
        size: bytes.len() as i32,
    }
}
