//! ============================================================================
//! Device Identity - Stable per-installation token
//! ============================================================================
//! Generated once as `device_` + 9 base-36 characters and kept in local
//! storage under `device_id`. Regenerated only when storage is cleared.
//! ============================================================================

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Local storage key holding the identity
pub const DEVICE_ID_KEY: &str = "device_id";

const DEVICE_ID_PREFIX: &str = "device_";
const DEVICE_ID_RANDOM_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque identifier of this installation (not a user account)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Return the stored identity, generating and persisting one if absent
    pub fn resolve(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        if let Some(existing) = store.get(DEVICE_ID_KEY)? {
            if !existing.is_empty() {
                return Ok(Self(existing));
            }
        }

        let identity = Self::generate();
        store.set(DEVICE_ID_KEY, identity.as_str())?;
        info!("Generated new device identity {}", identity);
        Ok(identity)
    }

    /// Discard the stored identity and persist a fresh one
    pub fn reset(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        store.remove(DEVICE_ID_KEY)?;
        Self::resolve(store)
    }

    fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..DEVICE_ID_RANDOM_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("{}{}", DEVICE_ID_PREFIX, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceIdentity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
