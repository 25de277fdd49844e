//! Engine-native objects exposed through opaque handles.
//!
//! Objects are immutable values: every operation that would change one
//! produces a new object instead. They can be read from several threads at
//! once. Each kind serializes into a tagged envelope, so bytes of one kind are
//! rejected when loaded as another.

use crate::buffer::SecretBytes;
use crate::codec;
use crate::{Error, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

mod elgamal;
mod keys;
mod paillier;
mod point;
mod pve;
pub mod registry;

pub use elgamal::ElGamalCommitment;
pub use keys::{Ecdsa2p, EcdsaKey2p, KeyKind, KeyShare, KeyShareMp, Mp, Schnorr2p, SchnorrKey2p};
pub use paillier::Paillier;
pub use point::{Point, Scalar};
pub use pve::{PveBatchCiphertext, PveCiphertext};
pub use registry::{Handle, Registry};

/// Envelope format version
pub const ENVELOPE_VERSION: u16 = 1;

/// Discriminates serialized object kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    EcdsaKey2p,
    SchnorrKey2p,
    KeyShareMp,
    Point,
    Scalar,
    ElGamalCommitment,
    PveCiphertext,
    PveBatchCiphertext,
    Paillier,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    kind: ObjectKind,
    version: u16,
    #[serde(with = "codec::secret_bytes")]
    body: SecretBytes,
}

/// Serialize/deserialize pair shared by every object kind
pub trait Persist: Sized {
    const KIND: ObjectKind;

    type Repr: Serialize + DeserializeOwned;

    fn to_repr(&self) -> Self::Repr;

    fn from_repr(repr: Self::Repr) -> Result<Self>;

    /// Tagged, versioned encoding. Key kinds carry secret shares, so the
    /// result is zeroed on drop.
    fn to_bytes(&self) -> Result<SecretBytes> {
        let body = codec::encode_secret(&self.to_repr())?;
        codec::encode_secret(&Envelope {
            kind: Self::KIND,
            version: ENVELOPE_VERSION,
            body,
        })
    }

    /// Decode bytes produced by [`Persist::to_bytes`]
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::BadArgument(format!("empty {:?} encoding", Self::KIND)));
        }
        let envelope: Envelope = codec::decode(bytes)?;
        if envelope.kind != Self::KIND {
            return Err(Error::BadArgument(format!(
                "expected {:?}, found {:?}",
                Self::KIND,
                envelope.kind
            )));
        }
        if envelope.version != ENVELOPE_VERSION {
            return Err(Error::BadArgument(format!(
                "unsupported {:?} version {}",
                Self::KIND,
                envelope.version
            )));
        }
        Self::from_repr(codec::decode(&envelope.body)?)
    }
}
