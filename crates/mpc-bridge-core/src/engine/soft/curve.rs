//! secp256k1 helpers shared by the reference protocols

use crate::objects::{self, Point};
use crate::types::Curve;
use crate::{Error, Result};
use k256::{
    elliptic_curve::{
        bigint::U256,
        ops::Reduce,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Field, PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// The only curve the reference engine implements
pub(crate) const CURVE: Curve = Curve::Secp256k1;

/// Fail with `Unsupported` for any curve other than secp256k1
pub(crate) fn require(curve: Curve) -> Result<()> {
    if curve != CURVE {
        return Err(Error::Unsupported(format!("curve {curve}")));
    }
    Ok(())
}

pub(crate) fn random_scalar() -> Scalar {
    Scalar::random(&mut OsRng)
}

/// Random scalar that is never zero
pub(crate) fn random_nonzero() -> Scalar {
    loop {
        let s = random_scalar();
        if !bool::from(s.is_zero()) {
            return s;
        }
    }
}

pub(crate) fn encode_point(point: &ProjectivePoint) -> Vec<u8> {
    point.to_affine().to_encoded_point(true).as_bytes().to_vec()
}

/// Decode a SEC1 point received from a peer
pub(crate) fn decode_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    let encoded =
        EncodedPoint::from_bytes(bytes).map_err(|e| Error::Crypto(format!("point: {e}")))?;
    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .map(ProjectivePoint::from)
        .ok_or_else(|| Error::Crypto("point is not on secp256k1".into()))
}

/// Canonical 32-byte encoding received from a peer
pub(crate) fn decode_scalar(bytes: &[u8]) -> Result<Scalar> {
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Crypto(format!("scalar of {} bytes", bytes.len())))?;
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(bytes)))
        .ok_or_else(|| Error::Crypto("scalar not reduced".into()))
}

pub(crate) fn encode_scalar(scalar: &Scalar) -> [u8; 32] {
    scalar.to_bytes().into()
}

/// Reduce the leading 32 big-endian bytes, left-padding short input
pub(crate) fn reduce(bytes: &[u8]) -> Scalar {
    let mut padded = [0u8; 32];
    let take = bytes.len().min(32);
    padded[32 - take..].copy_from_slice(&bytes[..take]);
    <Scalar as Reduce<U256>>::reduce_bytes(&padded.into())
}

/// Domain-separated hash of length-prefixed parts onto the scalar field
pub(crate) fn hash_to_scalar(domain: &[u8], parts: &[&[u8]]) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update((domain.len() as u64).to_be_bytes());
    hasher.update(domain);
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let digest: [u8; 32] = hasher.finalize().into();
    <Scalar as Reduce<U256>>::reduce_bytes(&digest.into())
}

// ---- conversions to and from boundary objects ----

pub(crate) fn to_point(point: &Point) -> Result<ProjectivePoint> {
    require(point.curve())?;
    decode_point(point.as_bytes()).map_err(|e| Error::BadArgument(e.to_string()))
}

pub(crate) fn from_point(point: &ProjectivePoint) -> Point {
    Point::from_validated(CURVE, encode_point(point))
}

/// Load a boundary scalar, accepting short big-endian input below the order
pub(crate) fn to_scalar(scalar: &objects::Scalar) -> Result<Scalar> {
    require(scalar.curve())?;
    parse_scalar(scalar.as_bytes())
}

/// Parse caller bytes as a canonical scalar
pub(crate) fn parse_scalar(bytes: &[u8]) -> Result<Scalar> {
    if bytes.len() > 32 {
        return Err(Error::BadArgument(format!("scalar of {} bytes", bytes.len())));
    }
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(bytes);
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(padded)))
        .ok_or_else(|| Error::BadArgument("scalar is not below the group order".into()))
}

pub(crate) fn from_scalar(scalar: &Scalar) -> objects::Scalar {
    objects::Scalar::from_validated(CURVE, &encode_scalar(scalar))
}
