//! Status codes returned by every entry point

use mpc_bridge_core::{Error, ErrorCode, Result};
use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};

pub const MPCB_SUCCESS: c_int = ErrorCode::Success.as_i32();
pub const MPCB_E_BADARG: c_int = ErrorCode::BadArgument.as_i32();
pub const MPCB_E_NOT_SUPPORTED: c_int = ErrorCode::Unsupported.as_i32();
pub const MPCB_E_NOT_FOUND: c_int = ErrorCode::NotFound.as_i32();
pub const MPCB_E_NETWORK: c_int = ErrorCode::Transport.as_i32();
pub const MPCB_E_CRYPTO: c_int = ErrorCode::Crypto.as_i32();
pub const MPCB_E_KEY_LEAK: c_int = ErrorCode::PossibleKeyLeak.as_i32();

/// Run an entry point body, turning its result into a status code.
///
/// Panics never unwind into the caller; they surface as a crypto failure.
pub(crate) fn ffi_call<F>(name: &'static str, body: F) -> c_int
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => MPCB_SUCCESS,
        Ok(Err(e)) => {
            match &e {
                Error::PossibleKeyLeak => error!(op = name, "Possible key leak, retire this key"),
                Error::BadArgument(_) => warn!(op = name, error = %e, "Rejected call"),
                _ => warn!(op = name, error = %e, "Call failed"),
            }
            e.code().as_i32()
        }
        Err(_) => {
            error!(op = name, "Panic caught at the boundary");
            MPCB_E_CRYPTO
        }
    }
}

/// Write `value` through a caller out-parameter
///
/// # Safety
/// `out` must be null or valid for a write of `T`.
pub(crate) unsafe fn write_out<T>(out: *mut T, value: T) -> Result<()> {
    if out.is_null() {
        return Err(Error::BadArgument("null output pointer".into()));
    }
    out.write(value);
    Ok(())
}

/// Fail early on a null out-parameter, before any engine work
pub(crate) fn require_out<T>(out: *mut T, what: &str) -> Result<()> {
    if out.is_null() {
        return Err(Error::BadArgument(format!("null {what} output")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(MPCB_SUCCESS, 0);
        assert_eq!(MPCB_E_BADARG as u32, 0xff01_0002);
        assert_eq!(MPCB_E_NOT_SUPPORTED as u32, 0xff01_0005);
        assert_eq!(MPCB_E_NOT_FOUND as u32, 0xff01_0006);
        assert_eq!(MPCB_E_NETWORK as u32, 0xff03_0001);
        assert_eq!(MPCB_E_CRYPTO as u32, 0xff04_0001);
        assert_eq!(MPCB_E_KEY_LEAK as u32, 0xff04_0002);
    }

    #[test]
    fn test_errors_and_panics_become_codes() {
        assert_eq!(ffi_call("ok", || Ok(())), MPCB_SUCCESS);
        assert_eq!(
            ffi_call("leak", || Err(Error::PossibleKeyLeak)),
            MPCB_E_KEY_LEAK
        );
        assert_eq!(
            ffi_call("alloc", || Err(Error::AllocationFailed)),
            MPCB_E_BADARG
        );
        assert_eq!(ffi_call("boom", || panic!("engine bug")), MPCB_E_CRYPTO);
    }

    #[test]
    fn test_null_out_parameter() {
        let out: *mut u64 = std::ptr::null_mut();
        assert!(require_out(out, "handle").is_err());
        assert!(unsafe { write_out(out, 1) }.is_err());
    }
}
