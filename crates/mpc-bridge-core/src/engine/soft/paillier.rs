//! Paillier encryption and the multiplicative-to-additive conversion built on it

use super::curve::reduce;
use crate::buffer::{secret, SecretBytes};
use crate::{Error, Result};
use k256::Scalar;
use libpaillier::{unknown_order::BigNumber, DecryptionKey};

/// secp256k1 group order, big-endian
const ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// Size of the additive mask in the MtA response, comfortably above two
/// group elements multiplied together
const MASK_BITS: usize = 592;

fn bn_mod(n: &BigNumber, p: &BigNumber) -> BigNumber {
    n.modadd(&BigNumber::zero(), p)
}

pub(crate) fn scalar_to_bn(s: &Scalar) -> BigNumber {
    BigNumber::from_slice(s.to_bytes())
}

pub(crate) fn bn_to_scalar(n: &BigNumber) -> Scalar {
    let order = BigNumber::from_slice(ORDER);
    reduce(&bn_mod(n, &order).to_bytes())
}

/// Public half of a Paillier key
#[derive(Clone, Debug)]
pub(crate) struct PaillierPublic {
    n: BigNumber,
    nn: BigNumber,
}

impl PaillierPublic {
    pub(crate) fn from_bytes(n: &[u8]) -> Result<Self> {
        let n = BigNumber::from_slice(n);
        if n <= BigNumber::one() {
            return Err(Error::BadArgument("paillier modulus too small".into()));
        }
        Ok(Self { nn: &n * &n, n })
    }

    pub(crate) fn n(&self) -> &BigNumber {
        &self.n
    }

    /// Random element of `Z*_n`
    fn nonce(&self) -> BigNumber {
        loop {
            let r = BigNumber::random(&self.n);
            if r != BigNumber::zero() && r.invert(&self.n).is_some() {
                return r;
            }
        }
    }

    /// `(1 + n)^m * r^n mod n^2`
    pub(crate) fn encrypt(&self, m: &BigNumber) -> Result<BigNumber> {
        if m >= &self.n {
            return Err(Error::BadArgument("plaintext not below the modulus".into()));
        }
        let base = BigNumber::one() + &self.n;
        let a = base.modpow(m, &self.nn);
        let b = self.nonce().modpow(&self.n, &self.nn);
        Ok(a.modmul(&b, &self.nn))
    }

    /// Ciphertext lies in `Z*_{n^2}`
    pub(crate) fn check_cipher(&self, c: &BigNumber) -> Result<()> {
        if c <= &BigNumber::zero() || c >= &self.nn {
            return Err(Error::Crypto("ciphertext out of range".into()));
        }
        if bn_mod(c, &self.n).invert(&self.n).is_none() {
            return Err(Error::Crypto("ciphertext shares a factor with the modulus".into()));
        }
        Ok(())
    }

    /// Ciphertext of the sum of the plaintexts
    pub(crate) fn add(&self, c1: &BigNumber, c2: &BigNumber) -> Result<BigNumber> {
        self.check_cipher(c1)?;
        self.check_cipher(c2)?;
        Ok(c1.modmul(c2, &self.nn))
    }

    /// Ciphertext of the plaintext multiplied by `k`
    pub(crate) fn mul(&self, c: &BigNumber, k: &BigNumber) -> Result<BigNumber> {
        self.check_cipher(c)?;
        Ok(c.modpow(k, &self.nn))
    }
}

/// Paillier key with its factorization
#[derive(Debug)]
pub(crate) struct PaillierSecret {
    public: PaillierPublic,
    key: DecryptionKey,
    p: BigNumber,
    q: BigNumber,
}

impl PaillierSecret {
    /// Two fresh primes of `bits` bits each
    pub(crate) fn generate(bits: usize) -> Result<Self> {
        let p = BigNumber::prime(bits);
        let mut q = BigNumber::prime(bits);
        while q == p {
            q = BigNumber::prime(bits);
        }
        Self::from_primes(&p, &q)
    }

    pub(crate) fn from_primes(p: &BigNumber, q: &BigNumber) -> Result<Self> {
        let key = DecryptionKey::with_safe_primes_unchecked(p, q)
            .ok_or_else(|| Error::BadArgument("paillier factors are not usable".into()))?;
        Ok(Self {
            public: PaillierPublic::from_bytes(&(p * q).to_bytes())?,
            key,
            p: p.clone(),
            q: q.clone(),
        })
    }

    /// Load factors and check that they match the modulus
    pub(crate) fn from_bytes(n: &[u8], p: &[u8], q: &[u8]) -> Result<Self> {
        let secret = Self::from_primes(&BigNumber::from_slice(p), &BigNumber::from_slice(q))?;
        if secret.public.n != BigNumber::from_slice(n) {
            return Err(Error::BadArgument("paillier factors do not match the modulus".into()));
        }
        Ok(secret)
    }

    pub(crate) fn public(&self) -> &PaillierPublic {
        &self.public
    }

    /// Big-endian factors, zeroed on drop
    pub(crate) fn factors(&self) -> (SecretBytes, SecretBytes) {
        (secret(&self.p.to_bytes()), secret(&self.q.to_bytes()))
    }

    pub(crate) fn decrypt(&self, c: &BigNumber) -> Result<BigNumber> {
        self.public.check_cipher(c)?;
        let m = self
            .key
            .decrypt(c)
            .ok_or_else(|| Error::Crypto("paillier decryption failed".into()))?;
        Ok(BigNumber::from_slice(m))
    }
}

/// Receiver side of MtA: given `Enc(a)` under the peer's key and a local `b`,
/// return `Enc(a*b + mask)` and the local additive share `-mask mod q`.
pub(crate) fn mta_respond(
    peer: &PaillierPublic,
    enc_a: &BigNumber,
    b: &Scalar,
) -> Result<(BigNumber, Scalar)> {
    let mask = BigNumber::random(&(BigNumber::one() << MASK_BITS));
    let scaled = peer.mul(enc_a, &scalar_to_bn(b))?;
    let response = peer.add(&scaled, &peer.encrypt(&mask)?)?;
    Ok((response, -bn_to_scalar(&mask)))
}

/// Sender side of MtA: decrypt the response into the local additive share
pub(crate) fn mta_finish(own: &PaillierSecret, response: &BigNumber) -> Result<Scalar> {
    Ok(bn_to_scalar(&own.decrypt(response)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::soft::curve::random_scalar;

    fn small_key() -> PaillierSecret {
        PaillierSecret::generate(512).unwrap()
    }

    #[test]
    fn test_homomorphic_operations() {
        let key = small_key();
        let pk = key.public();
        let c1 = pk.encrypt(&BigNumber::from(20u64)).unwrap();
        let c2 = pk.encrypt(&BigNumber::from(22u64)).unwrap();

        let sum = pk.add(&c1, &c2).unwrap();
        assert_eq!(key.decrypt(&sum).unwrap(), BigNumber::from(42u64));

        let product = pk.mul(&c1, &BigNumber::from(3u64)).unwrap();
        assert_eq!(key.decrypt(&product).unwrap(), BigNumber::from(60u64));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let key = small_key();
        let pk = key.public();
        assert!(pk.encrypt(pk.n()).is_err());
        assert!(pk.check_cipher(&BigNumber::zero()).is_err());
        assert!(pk.check_cipher(pk.n()).is_err());
    }

    #[test]
    fn test_factor_mismatch() {
        let a = small_key();
        let b = small_key();
        let (p, q) = a.factors();
        assert!(PaillierSecret::from_bytes(&a.public().n().to_bytes(), &p, &q).is_ok());
        assert!(PaillierSecret::from_bytes(&b.public().n().to_bytes(), &p, &q).is_err());
    }

    #[test]
    fn test_mta_shares_sum_to_product() {
        let key = small_key();
        let a = random_scalar();
        let b = random_scalar();

        let enc_a = key.public().encrypt(&scalar_to_bn(&a)).unwrap();
        let (response, beta) = mta_respond(key.public(), &enc_a, &b).unwrap();
        let alpha = mta_finish(&key, &response).unwrap();
        assert_eq!(alpha + beta, a * b);
    }
}
