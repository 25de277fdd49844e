use super::{ObjectKind, Persist};
use crate::buffer::{secret, SecretBytes};
use crate::codec;
use crate::types::Curve;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Curve point in compressed encoding.
///
/// Points are only built by an engine (which validates the encoding) or
/// decoded from a previously serialized point.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Point {
    curve: Curve,
    encoded: Vec<u8>,
}

impl Point {
    /// Wrap an encoding the caller has already validated for `curve`
    pub fn from_validated(curve: Curve, encoded: Vec<u8>) -> Self {
        Self { curve, encoded }
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Compressed encoding, borrowed from the point
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Whether this is the group identity
    pub fn is_identity(&self) -> bool {
        self.encoded.iter().all(|b| *b == 0)
    }

    /// Fail unless `other` lives on the same curve
    pub fn same_curve(&self, other: &Point) -> Result<()> {
        if self.curve != other.curve {
            return Err(Error::BadArgument(format!(
                "curve mismatch: {} vs {}",
                self.curve, other.curve
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}, {})", self.curve, hex::encode(&self.encoded))
    }
}

#[derive(Serialize, Deserialize)]
pub struct PointRepr {
    curve: Curve,
    encoded: Vec<u8>,
}

impl Persist for Point {
    const KIND: ObjectKind = ObjectKind::Point;
    type Repr = PointRepr;

    fn to_repr(&self) -> PointRepr {
        PointRepr {
            curve: self.curve,
            encoded: self.encoded.clone(),
        }
    }

    fn from_repr(repr: PointRepr) -> Result<Self> {
        if repr.encoded.is_empty() {
            return Err(Error::BadArgument("empty point encoding".into()));
        }
        Ok(Self::from_validated(repr.curve, repr.encoded))
    }
}

/// Scalar modulo the group order, big-endian. Zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Scalar {
    curve: Curve,
    bytes: SecretBytes,
}

impl Scalar {
    /// Wrap a canonical big-endian encoding produced by an engine
    pub fn from_validated(curve: Curve, bytes: &[u8]) -> Self {
        Self {
            curve,
            bytes: secret(bytes),
        }
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Big-endian bytes, borrowed from the scalar
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({}, ..)", self.curve)
    }
}

#[derive(Serialize, Deserialize)]
pub struct ScalarRepr {
    curve: Curve,
    #[serde(with = "codec::secret_bytes")]
    bytes: SecretBytes,
}

impl Persist for Scalar {
    const KIND: ObjectKind = ObjectKind::Scalar;
    type Repr = ScalarRepr;

    fn to_repr(&self) -> ScalarRepr {
        ScalarRepr {
            curve: self.curve,
            bytes: self.bytes.clone(),
        }
    }

    fn from_repr(repr: ScalarRepr) -> Result<Self> {
        if repr.bytes.len() > repr.curve.order_size() {
            return Err(Error::BadArgument("scalar longer than the group order".into()));
        }
        Ok(Self {
            curve: repr.curve,
            bytes: repr.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_roundtrip_keeps_accessors() {
        let point = Point::from_validated(Curve::Secp256k1, vec![2; 33]);
        let restored = Point::from_bytes(&point.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, point);
        assert_eq!(restored.curve(), Curve::Secp256k1);
    }

    #[test]
    fn test_kind_confusion_rejected() {
        let point = Point::from_validated(Curve::Secp256k1, vec![3; 33]);
        let bytes = point.to_bytes().unwrap();
        assert!(matches!(Scalar::from_bytes(&bytes), Err(Error::BadArgument(_))));
        assert!(Point::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_scalar_debug_hides_value() {
        let scalar = Scalar::from_validated(Curve::Secp256k1, &[7; 32]);
        assert_eq!(format!("{scalar:?}"), "Scalar(secp256k1, ..)");
    }
}
