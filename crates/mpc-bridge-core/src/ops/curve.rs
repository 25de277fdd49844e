//! Curve points and scalars

use super::check_non_empty;
use crate::buffer::{secret, SecretBytes};
use crate::engine::Engine;
use crate::objects::{Point, Scalar};
use crate::types::Curve;
use crate::Result;

/// Resolve an OpenSSL curve identifier
pub fn curve_from_nid(nid: i32) -> Result<Curve> {
    Curve::from_nid(nid)
}

pub fn random_scalar(engine: &dyn Engine, curve: Curve) -> Result<Scalar> {
    engine.random_scalar(curve)
}

pub fn generator(engine: &dyn Engine, curve: Curve) -> Result<Point> {
    engine.generator(curve)
}

/// `s*G`
pub fn mul_generator(engine: &dyn Engine, scalar: &Scalar) -> Result<Point> {
    engine.mul_generator(scalar)
}

/// Decode and validate an encoded point
pub fn point_from_bytes(engine: &dyn Engine, curve: Curve, bytes: &[u8]) -> Result<Point> {
    check_non_empty("point encoding", bytes)?;
    engine.point_from_bytes(curve, bytes)
}

/// Compressed encoding, copied
pub fn point_to_bytes(point: &Point) -> Vec<u8> {
    point.as_bytes().to_vec()
}

pub fn point_add(engine: &dyn Engine, a: &Point, b: &Point) -> Result<Point> {
    a.same_curve(b)?;
    engine.point_add(a, b)
}

pub fn point_mul(engine: &dyn Engine, point: &Point, scalar: &Scalar) -> Result<Point> {
    engine.point_mul(point, scalar)
}

pub fn point_is_zero(point: &Point) -> bool {
    point.is_identity()
}

/// Big-endian bytes below the group order
pub fn scalar_from_bytes(engine: &dyn Engine, curve: Curve, bytes: &[u8]) -> Result<Scalar> {
    check_non_empty("scalar encoding", bytes)?;
    engine.scalar_from_bytes(curve, bytes)
}

/// Big-endian bytes, copied into a zeroizing buffer
pub fn scalar_to_bytes(scalar: &Scalar) -> SecretBytes {
    secret(scalar.as_bytes())
}

pub fn scalar_add(engine: &dyn Engine, a: &Scalar, b: &Scalar) -> Result<Scalar> {
    engine.scalar_add(a, b)
}
