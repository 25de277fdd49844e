//! Single-pass binary encoding for objects, proofs and protocol messages.
//!
//! Values are written into a growable buffer with length-prefixed sequences,
//! so there is no separate sizing pass to keep in sync with the writer.

use crate::buffer::SecretBytes;
use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<{ 64 * 1024 * 1024 }>()
}

/// Encode a value
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config()).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a value that holds secret material
pub fn encode_secret<T: Serialize>(value: &T) -> Result<SecretBytes> {
    encode(value).map(Zeroizing::new)
}

/// Decode a value, rejecting trailing bytes
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, read) = bincode::serde::decode_from_slice(bytes, config())
        .map_err(|e| Error::Deserialization(e.to_string()))?;
    if read != bytes.len() {
        return Err(Error::Deserialization(format!(
            "{} trailing bytes",
            bytes.len() - read
        )));
    }
    Ok(value)
}

/// Serde adapter for zeroizing byte buffers
pub mod secret_bytes {
    use crate::buffer::SecretBytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use zeroize::Zeroizing;

    pub fn serialize<S>(value: &SecretBytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretBytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<u8>::deserialize(deserializer).map(Zeroizing::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        tag: u8,
        items: Vec<Vec<u8>>,
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let sample = Sample {
            tag: 3,
            items: vec![vec![1, 2], vec![]],
        };
        let mut bytes = encode(&sample).unwrap();
        assert_eq!(decode::<Sample>(&bytes).unwrap(), sample);

        bytes.push(0);
        assert!(matches!(
            decode::<Sample>(&bytes),
            Err(Error::Deserialization(_))
        ));
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = encode(&Sample {
            tag: 1,
            items: vec![vec![9; 40]],
        })
        .unwrap();
        assert!(decode::<Sample>(&bytes[..bytes.len() - 1]).is_err());
    }
}
