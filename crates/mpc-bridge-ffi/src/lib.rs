//! # MPC Bridge C boundary
//!
//! `extern "C"` entry points over [`mpc_bridge_core`]. Every function
//! returns a status code (`0` on success, see [`status`]) and writes its
//! results through out-parameters.
//!
//! ## Ownership
//!
//! - Buffers returned by the library (`CMem`, `CMems`) belong to the caller
//!   and are released with `mpcb_cmem_free` / `mpcb_cmems_free`, which zero
//!   them first. Input buffers are only borrowed for the call.
//! - Objects and sessions are typed handles. Each kind has one `*_free`
//!   function; freeing the null handle is a no-op and freeing twice fails
//!   with BadArgument.
//! - Accessors return owned copies unless documented as borrowed.
//! - On failure no output is left allocated.
//!
//! ## Safety
//!
//! Pointers must satisfy the contract documented on each function. A
//! session may be used from one thread at a time; concurrent calls on the
//! same session are serialized.

use mpc_bridge_core::SoftEngine;
use std::os::raw::{c_char, c_int};
use std::sync::OnceLock;

pub mod api;
pub mod handles;
pub mod job;
pub mod kem;
pub mod mem;
pub mod status;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use handles::*;
pub use kem::KemCallbacks;
pub use mem::{CMem, CMems};
pub use transport::TransportCallbacks;

static ENGINE: OnceLock<SoftEngine> = OnceLock::new();

/// Process-wide engine, configured from the environment on first use
pub(crate) fn engine() -> &'static SoftEngine {
    ENGINE.get_or_init(configured)
}

#[cfg(not(test))]
fn configured() -> SoftEngine {
    SoftEngine::from_env()
}

#[cfg(test)]
fn configured() -> SoftEngine {
    testing::engine()
}

/// Library version as a static C string; never freed
#[no_mangle]
pub extern "C" fn mpcb_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`). Only the first call has an effect.
#[no_mangle]
pub extern "C" fn mpcb_init_logging(json: bool) -> c_int {
    use tracing_subscriber::{fmt, EnvFilter};

    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let result = if json {
            fmt().json().with_env_filter(filter).try_init()
        } else {
            fmt().with_env_filter(filter).try_init()
        };
        // Another subscriber may already be installed by the host
        if result.is_err() {
            tracing::debug!("Global subscriber already set");
        }
    });
    status::MPCB_SUCCESS
}
