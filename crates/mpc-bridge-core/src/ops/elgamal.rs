//! EC ElGamal commitments

use crate::buffer::SecretBytes;
use crate::engine::Engine;
use crate::objects::{ElGamalCommitment, Persist, Point, Scalar};
use crate::types::Curve;
use crate::Result;

/// Build from existing components; both points are copied
pub fn new(l: &Point, r: &Point) -> Result<ElGamalCommitment> {
    ElGamalCommitment::new(l, r)
}

/// Commit to `m` under public key `p` with randomness `r`
pub fn make(engine: &dyn Engine, p: &Point, m: &Scalar, r: &Scalar) -> Result<ElGamalCommitment> {
    engine.elgamal_commit(p, m, r)
}

pub fn to_bytes(com: &ElGamalCommitment) -> Result<SecretBytes> {
    com.to_bytes()
}

/// Decode a commitment that must belong to `curve`
pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<ElGamalCommitment> {
    ElGamalCommitment::from_bytes_on(curve, bytes)
}

/// `L` component, as an independent copy
pub fn l(com: &ElGamalCommitment) -> Point {
    com.l().clone()
}

/// `R` component, as an independent copy
pub fn r(com: &ElGamalCommitment) -> Point {
    com.r().clone()
}
