//! Configuration fingerprinting
//!
//! Every report is stamped with a SHA-256 hash of the configuration that
//! produced it. Together with the seed this makes any archived result
//! traceable to its exact inputs: two reports with the same hash and seed are
//! replays of the same run.

use crate::error::SimulationError;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hex digest of a configuration's JSON form
///
/// Configuration types are built from `Vec`s and scalars only, with no maps
/// of unstable iteration order, so their JSON serialization is already
/// canonical and the digest is deterministic across processes and platforms.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    let json = serde_json::to_string(config)
        .map_err(|e| SimulationError::Serialization(format!("config hashing failed: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestConfig {
        value: i32,
        name: String,
    }

    #[test]
    fn test_hash_deterministic() {
        let a = TestConfig {
            value: 42,
            name: "lane".to_string(),
        };
        let b = TestConfig {
            value: 42,
            name: "lane".to_string(),
        };
        assert_eq!(
            compute_config_hash(&a).unwrap(),
            compute_config_hash(&b).unwrap()
        );
    }

    #[test]
    fn test_hash_distinguishes_configs() {
        let a = TestConfig {
            value: 42,
            name: "lane".to_string(),
        };
        let b = TestConfig {
            value: 43,
            name: "lane".to_string(),
        };
        assert_ne!(
            compute_config_hash(&a).unwrap(),
            compute_config_hash(&b).unwrap()
        );
    }
}
