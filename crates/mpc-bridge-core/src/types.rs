//! Core types shared by sessions, objects and dispatch

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-based position of a party inside a session, as seen by the engine
pub type PartyIndex = usize;

/// Caller-side identity of a party, as seen by the transport
pub type PartyId = u32;

/// Elliptic curves known to the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Curve {
    P256 = 1,
    P384 = 2,
    P521 = 3,
    Secp256k1 = 4,
    Ed25519 = 5,
}

impl Curve {
    /// All known curves
    pub const ALL: [Curve; 5] = [
        Curve::P256,
        Curve::P384,
        Curve::P521,
        Curve::Secp256k1,
        Curve::Ed25519,
    ];

    /// OpenSSL numeric identifier
    pub const fn nid(self) -> i32 {
        match self {
            Curve::P256 => 415,
            Curve::P384 => 715,
            Curve::P521 => 716,
            Curve::Secp256k1 => 714,
            Curve::Ed25519 => 1087,
        }
    }

    /// Resolve an OpenSSL numeric identifier
    pub fn from_nid(nid: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.nid() == nid)
            .ok_or_else(|| Error::NotFound(format!("curve nid {nid}")))
    }

    /// Boundary enum value
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Resolve a boundary enum value
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| Error::NotFound(format!("curve code {code}")))
    }

    /// Size of the group order in bytes, which bounds message hashes
    pub const fn order_size(self) -> usize {
        match self {
            Curve::P256 | Curve::Secp256k1 | Curve::Ed25519 => 32,
            Curve::P384 => 48,
            Curve::P521 => 66,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
            Curve::Secp256k1 => "secp256k1",
            Curve::Ed25519 => "Ed25519",
        };
        f.write_str(name)
    }
}

/// Session identifier used for domain separation across rounds and batches.
///
/// An empty value asks the engine to agree on a fresh one; a non-empty value
/// is used as-is, which lets a caller resume a handshake with the identifier
/// emitted by an earlier step.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Vec<u8>);

impl SessionId {
    /// Wrap caller-provided bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// An empty identifier, to be generated by the engine
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = &self.0[..self.0.len().min(4)];
        write!(f, "SessionId({}..)", hex::encode(prefix))
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Schnorr signature flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum SchnorrVariant {
    /// RFC 8032 signatures over Ed25519
    EdDsa = 0,
    /// BIP-340 signatures over secp256k1
    Bip340 = 1,
}

impl SchnorrVariant {
    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(SchnorrVariant::EdDsa),
            1 => Ok(SchnorrVariant::Bip340),
            other => Err(Error::BadArgument(format!("schnorr variant {other}"))),
        }
    }
}

impl fmt::Display for SchnorrVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchnorrVariant::EdDsa => f.write_str("EdDSA"),
            SchnorrVariant::Bip340 => f.write_str("BIP340"),
        }
    }
}
