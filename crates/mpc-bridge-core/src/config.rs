//! Engine and transport configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Environment variable for the Paillier prime size
pub const ENV_PAILLIER_BITS: &str = "MPC_BRIDGE_PAILLIER_BITS";
/// Environment variable for the number of PVE cut-and-choose rows
pub const ENV_PVE_ROWS: &str = "MPC_BRIDGE_PVE_ROWS";
/// Environment variable for the per-call transport timeout, in milliseconds
pub const ENV_CALL_TIMEOUT_MS: &str = "MPC_BRIDGE_CALL_TIMEOUT_MS";

/// Parameters of the reference engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Size of each Paillier prime in bits
    pub paillier_prime_bits: usize,
    /// Cut-and-choose rows in a PVE ciphertext
    pub pve_rows: usize,
}

impl EngineConfig {
    /// Smallest prime size that keeps MtA masks below the modulus
    pub const MIN_PAILLIER_PRIME_BITS: usize = 512;
    /// Challenge bits come from one SHA-256 digest
    pub const MAX_PVE_ROWS: usize = 256;

    pub fn validate(&self) -> Result<()> {
        if self.paillier_prime_bits < Self::MIN_PAILLIER_PRIME_BITS {
            return Err(Error::BadArgument(format!(
                "paillier primes must be at least {} bits",
                Self::MIN_PAILLIER_PRIME_BITS
            )));
        }
        if self.pve_rows == 0 || self.pve_rows > Self::MAX_PVE_ROWS {
            return Err(Error::BadArgument(format!(
                "pve rows must be in 1..={}",
                Self::MAX_PVE_ROWS
            )));
        }
        Ok(())
    }

    /// Defaults overridden by any valid environment values
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            paillier_prime_bits: env_or(ENV_PAILLIER_BITS, defaults.paillier_prime_bits),
            pve_rows: env_or(ENV_PVE_ROWS, defaults.pve_rows),
        };
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "Ignoring engine configuration from environment");
                defaults
            }
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            paillier_prime_bits: 1024,
            pve_rows: 32,
        }
    }
}

/// Timing knobs for transports bridged from async code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Bound on every forwarded send or receive
    pub call_timeout: Duration,
    /// Delay between polls when a message has not arrived yet
    pub poll_interval: Duration,
}

impl TransportConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            call_timeout: Duration::from_millis(env_or(
                ENV_CALL_TIMEOUT_MS,
                defaults.call_timeout.as_millis() as u64,
            )),
            ..defaults
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_small_primes() {
        let config = EngineConfig {
            paillier_prime_bits: 256,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::BadArgument(_))));
    }

    #[test]
    fn test_rejects_row_count() {
        for rows in [0, 257] {
            let config = EngineConfig {
                pve_rows: rows,
                ..EngineConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }
}
