use super::{ObjectKind, Persist};
use crate::buffer::{secret, SecretBytes};
use crate::codec;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Paillier key: always the public modulus, optionally the factorization
#[derive(Clone, PartialEq, Eq)]
pub struct Paillier {
    n: Vec<u8>,
    factors: Option<(SecretBytes, SecretBytes)>,
}

impl Paillier {
    /// Public-only key
    pub fn public(n: &[u8]) -> Result<Self> {
        if n.is_empty() {
            return Err(Error::BadArgument("empty paillier modulus".into()));
        }
        Ok(Self {
            n: n.to_vec(),
            factors: None,
        })
    }

    /// Key with private factors; consistency is checked by the engine
    pub fn private(n: &[u8], p: &[u8], q: &[u8]) -> Result<Self> {
        if p.is_empty() || q.is_empty() {
            return Err(Error::BadArgument("empty paillier factor".into()));
        }
        let mut key = Self::public(n)?;
        key.factors = Some((secret(p), secret(q)));
        Ok(key)
    }

    pub fn has_private_key(&self) -> bool {
        self.factors.is_some()
    }

    /// Public modulus, borrowed
    pub fn n(&self) -> &[u8] {
        &self.n
    }

    /// Private factors, if present
    pub fn factors(&self) -> Option<(&[u8], &[u8])> {
        self.factors.as_ref().map(|(p, q)| (p.as_slice(), q.as_slice()))
    }
}

impl fmt::Debug for Paillier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paillier")
            .field("n_bits", &(self.n.len() * 8))
            .field("private", &self.has_private_key())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
pub struct PaillierRepr {
    n: Vec<u8>,
    #[serde(with = "codec::secret_bytes")]
    p: SecretBytes,
    #[serde(with = "codec::secret_bytes")]
    q: SecretBytes,
}

impl Persist for Paillier {
    const KIND: ObjectKind = ObjectKind::Paillier;
    type Repr = PaillierRepr;

    fn to_repr(&self) -> PaillierRepr {
        let (p, q) = self.factors.clone().unwrap_or_default();
        PaillierRepr {
            n: self.n.clone(),
            p,
            q,
        }
    }

    fn from_repr(repr: PaillierRepr) -> Result<Self> {
        if repr.p.is_empty() && repr.q.is_empty() {
            Self::public(&repr.n)
        } else {
            Self::private(&repr.n, &repr.p, &repr.q)
        }
    }
}
