use super::{ObjectKind, Persist, Point};
use crate::buffer::SecretBytes;
use crate::codec;
use crate::types::{Curve, PartyIndex};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker for a family of key shares
pub trait KeyKind: Send + Sync + 'static {
    const KIND: ObjectKind;
    const NAME: &'static str;
}

/// Two-party ECDSA
pub struct Ecdsa2p;

/// Two-party Schnorr
pub struct Schnorr2p;

/// Multi-party shares, used by both ECDSA and Schnorr
pub struct Mp;

impl KeyKind for Ecdsa2p {
    const KIND: ObjectKind = ObjectKind::EcdsaKey2p;
    const NAME: &'static str = "ecdsa-2p";
}

impl KeyKind for Schnorr2p {
    const KIND: ObjectKind = ObjectKind::SchnorrKey2p;
    const NAME: &'static str = "schnorr-2p";
}

impl KeyKind for Mp {
    const KIND: ObjectKind = ObjectKind::KeyShareMp;
    const NAME: &'static str = "mp";
}

pub type EcdsaKey2p = KeyShare<Ecdsa2p>;
pub type SchnorrKey2p = KeyShare<Schnorr2p>;
pub type KeyShareMp = KeyShare<Mp>;

/// One party's share of a jointly generated key.
///
/// The public parts are plain fields; the secret part is an engine-private
/// payload that only the engine that produced it can interpret.
pub struct KeyShare<K: KeyKind> {
    curve: Curve,
    party_index: PartyIndex,
    party_count: usize,
    public_key: Point,
    secret: SecretBytes,
    _kind: PhantomData<K>,
}

impl<K: KeyKind> KeyShare<K> {
    pub fn new(
        party_index: PartyIndex,
        party_count: usize,
        public_key: Point,
        secret: SecretBytes,
    ) -> Self {
        Self {
            curve: public_key.curve(),
            party_index,
            party_count,
            public_key,
            secret,
            _kind: PhantomData,
        }
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Index of the party holding this share
    pub fn party_index(&self) -> PartyIndex {
        self.party_index
    }

    pub fn party_count(&self) -> usize {
        self.party_count
    }

    /// Joint public key, borrowed from the share
    pub fn public_key(&self) -> &Point {
        &self.public_key
    }

    /// Engine-private payload
    pub fn secret_payload(&self) -> &[u8] {
        &self.secret
    }
}

impl<K: KeyKind> Clone for KeyShare<K> {
    fn clone(&self) -> Self {
        Self {
            curve: self.curve,
            party_index: self.party_index,
            party_count: self.party_count,
            public_key: self.public_key.clone(),
            secret: self.secret.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: KeyKind> fmt::Debug for KeyShare<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyShare")
            .field("kind", &K::NAME)
            .field("curve", &self.curve)
            .field("party_index", &self.party_index)
            .field("party_count", &self.party_count)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
pub struct KeyShareRepr {
    curve: Curve,
    party_index: u32,
    party_count: u32,
    public_key: Vec<u8>,
    #[serde(with = "codec::secret_bytes")]
    secret: SecretBytes,
}

impl<K: KeyKind> Persist for KeyShare<K> {
    const KIND: ObjectKind = K::KIND;
    type Repr = KeyShareRepr;

    fn to_repr(&self) -> KeyShareRepr {
        KeyShareRepr {
            curve: self.curve,
            party_index: self.party_index as u32,
            party_count: self.party_count as u32,
            public_key: self.public_key.as_bytes().to_vec(),
            secret: self.secret.clone(),
        }
    }

    fn from_repr(repr: KeyShareRepr) -> Result<Self> {
        if repr.party_count < 2 || repr.party_index >= repr.party_count {
            return Err(Error::BadArgument(format!(
                "key share index {} of {}",
                repr.party_index, repr.party_count
            )));
        }
        if repr.public_key.is_empty() || repr.secret.is_empty() {
            return Err(Error::BadArgument("truncated key share".into()));
        }
        Ok(Self::new(
            repr.party_index as PartyIndex,
            repr.party_count as usize,
            Point::from_validated(repr.curve, repr.public_key),
            repr.secret,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::secret;

    fn sample() -> EcdsaKey2p {
        EcdsaKey2p::new(
            1,
            2,
            Point::from_validated(Curve::Secp256k1, vec![2; 33]),
            secret(b"opaque share"),
        )
    }

    #[test]
    fn test_roundtrip_preserves_public_accessors() {
        let key = sample();
        let restored = EcdsaKey2p::from_bytes(&key.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.public_key(), key.public_key());
        assert_eq!(restored.curve(), Curve::Secp256k1);
        assert_eq!(restored.party_index(), 1);
        assert_eq!(restored.secret_payload(), b"opaque share");
    }

    #[test]
    fn test_ecdsa_bytes_are_not_a_schnorr_key() {
        let bytes = sample().to_bytes().unwrap();
        assert!(matches!(
            SchnorrKey2p::from_bytes(&bytes),
            Err(Error::BadArgument(_))
        ));
        assert!(KeyShareMp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_debug_omits_secret() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("opaque"));
        assert!(rendered.contains("ecdsa-2p"));
    }
}
