//! # MPC Bridge Core
//!
//! Binding layer between callers and a multiparty cryptographic engine.
//!
//! This crate provides:
//! - An owned-buffer contract with zeroizing release for secret material
//! - A transport adapter that lets the engine reach caller-supplied networking
//! - Two-party and multi-party sessions over one generic implementation
//! - Stateless operation dispatch: validate, call the engine, marshal outputs
//! - Serializable engine objects (keys, points, commitments, ciphertexts)
//! - A reference engine over secp256k1
//!
//! ## Example
//!
//! ```rust,ignore
//! use mpc_bridge_core::{ops, session::Job2P, SoftEngine};
//!
//! let engine = SoftEngine::default();
//! let mut job = Job2P::new(transport, 0, ["P1", "P2"])?;
//!
//! let key = ops::ecdsa2p::dkg(&engine, &mut job, Curve::Secp256k1)?;
//! let signed = ops::ecdsa2p::sign(&engine, &mut job, &SessionId::empty(), &key, &hash)?;
//! ```

pub mod buffer;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod kem;
pub mod objects;
pub mod ops;
pub mod session;
pub mod transport;
pub mod types;

pub use buffer::{BufferArray, SecretBytes};
pub use config::{EngineConfig, TransportConfig};
pub use engine::{Engine, SoftEngine};
pub use error::{Error, ErrorCode, Result};
pub use kem::{Kem, X25519Kem};
pub use session::{Job2P, JobMp};
pub use types::{Curve, PartyId, PartyIndex, SchnorrVariant, SessionId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
