use super::{ObjectKind, Persist, Point};
use crate::types::Curve;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Publicly verifiable encryption of one scalar `x` with `Q = x*G`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PveCiphertext {
    label: Vec<u8>,
    q: Point,
    body: Vec<u8>,
}

impl PveCiphertext {
    /// Assemble from an engine-produced body
    pub fn new(label: &[u8], q: Point, body: Vec<u8>) -> Self {
        Self {
            label: label.to_vec(),
            q,
            body,
        }
    }

    pub fn curve(&self) -> Curve {
        self.q.curve()
    }

    /// Public commitment `Q`, borrowed: valid only while the ciphertext is alive
    pub fn q(&self) -> &Point {
        &self.q
    }

    /// Label bound into the ciphertext, borrowed: valid only while the ciphertext is alive
    pub fn label(&self) -> &[u8] {
        &self.label
    }

    /// Engine-private body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Publicly verifiable encryption of several scalars under one label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PveBatchCiphertext {
    label: Vec<u8>,
    qs: Vec<Point>,
    body: Vec<u8>,
}

impl PveBatchCiphertext {
    pub fn new(label: &[u8], qs: Vec<Point>, body: Vec<u8>) -> Result<Self> {
        let first = qs
            .first()
            .ok_or_else(|| Error::BadArgument("empty pve batch".into()))?;
        for q in &qs[1..] {
            first.same_curve(q)?;
        }
        Ok(Self {
            label: label.to_vec(),
            qs,
            body,
        })
    }

    pub fn curve(&self) -> Curve {
        self.qs[0].curve()
    }

    /// Number of encrypted scalars
    pub fn len(&self) -> usize {
        self.qs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qs.is_empty()
    }

    /// Public commitments, borrowed
    pub fn qs(&self) -> &[Point] {
        &self.qs
    }

    /// Label, borrowed
    pub fn label(&self) -> &[u8] {
        &self.label
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[derive(Serialize, Deserialize)]
pub struct PveRepr {
    curve: Curve,
    label: Vec<u8>,
    qs: Vec<Vec<u8>>,
    body: Vec<u8>,
}

fn points(curve: Curve, encoded: Vec<Vec<u8>>) -> Result<Vec<Point>> {
    encoded
        .into_iter()
        .map(|q| {
            if q.is_empty() {
                Err(Error::BadArgument("empty point in ciphertext".into()))
            } else {
                Ok(Point::from_validated(curve, q))
            }
        })
        .collect()
}

impl Persist for PveCiphertext {
    const KIND: ObjectKind = ObjectKind::PveCiphertext;
    type Repr = PveRepr;

    fn to_repr(&self) -> PveRepr {
        PveRepr {
            curve: self.curve(),
            label: self.label.clone(),
            qs: vec![self.q.as_bytes().to_vec()],
            body: self.body.clone(),
        }
    }

    fn from_repr(repr: PveRepr) -> Result<Self> {
        let mut qs = points(repr.curve, repr.qs)?;
        if qs.len() != 1 {
            return Err(Error::BadArgument("single ciphertext holds one point".into()));
        }
        Ok(Self::new(&repr.label, qs.remove(0), repr.body))
    }
}

impl Persist for PveBatchCiphertext {
    const KIND: ObjectKind = ObjectKind::PveBatchCiphertext;
    type Repr = PveRepr;

    fn to_repr(&self) -> PveRepr {
        PveRepr {
            curve: self.curve(),
            label: self.label.clone(),
            qs: self.qs.iter().map(|q| q.as_bytes().to_vec()).collect(),
            body: self.body.clone(),
        }
    }

    fn from_repr(repr: PveRepr) -> Result<Self> {
        let qs = points(repr.curve, repr.qs)?;
        Self::new(&repr.label, qs, repr.body)
    }
}
