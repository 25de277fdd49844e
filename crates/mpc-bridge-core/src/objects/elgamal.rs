use super::{ObjectKind, Persist, Point};
use crate::types::Curve;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// EC ElGamal commitment `(L, R) = (r*G, m*G + r*P)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElGamalCommitment {
    l: Point,
    r: Point,
}

impl ElGamalCommitment {
    /// Build from two points on the same curve (both are copied in)
    pub fn new(l: &Point, r: &Point) -> Result<Self> {
        l.same_curve(r)?;
        Ok(Self {
            l: l.clone(),
            r: r.clone(),
        })
    }

    pub fn curve(&self) -> Curve {
        self.l.curve()
    }

    /// The `L` component, borrowed
    pub fn l(&self) -> &Point {
        &self.l
    }

    /// The `R` component, borrowed
    pub fn r(&self) -> &Point {
        &self.r
    }

    /// Load a commitment and check it belongs to `curve`
    pub fn from_bytes_on(curve: Curve, bytes: &[u8]) -> Result<Self> {
        let commitment = Self::from_bytes(bytes)?;
        if commitment.curve() != curve {
            return Err(Error::BadArgument(format!(
                "commitment is on {}, expected {curve}",
                commitment.curve()
            )));
        }
        Ok(commitment)
    }
}

#[derive(Serialize, Deserialize)]
pub struct ElGamalRepr {
    curve: Curve,
    l: Vec<u8>,
    r: Vec<u8>,
}

impl Persist for ElGamalCommitment {
    const KIND: ObjectKind = ObjectKind::ElGamalCommitment;
    type Repr = ElGamalRepr;

    fn to_repr(&self) -> ElGamalRepr {
        ElGamalRepr {
            curve: self.curve(),
            l: self.l.as_bytes().to_vec(),
            r: self.r.as_bytes().to_vec(),
        }
    }

    fn from_repr(repr: ElGamalRepr) -> Result<Self> {
        if repr.l.is_empty() || repr.r.is_empty() {
            return Err(Error::BadArgument("truncated commitment".into()));
        }
        Ok(Self {
            l: Point::from_validated(repr.curve, repr.l),
            r: Point::from_validated(repr.curve, repr.r),
        })
    }
}
