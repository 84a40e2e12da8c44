//! ============================================================================
//! APPCTL-CORE: Risk Calculator Client
//! ============================================================================
//! This crate handles all client-side logic for the risk calculator app:
//! - Device identity resolution and local key-value storage (redb)
//! - Registration and periodic access re-validation against the server
//! - Risk sizing arithmetic and saving calculations
//! - Cache-first offline fetching with a precache list
//! ============================================================================

pub mod access;
pub mod calc;
pub mod config;
pub mod error;
pub mod identity;
pub mod offline_cache;
pub mod storage;
pub mod types;

// Re-export main types for convenience
pub use access::{AccessController, AccessView, ConsoleView, HttpAccessApi};
pub use config::ControllerConfig;
pub use error::{AccessError, StorageError};
pub use identity::DeviceIdentity;
pub use offline_cache::OfflineCache;
pub use storage::{KeyValueStore, LocalStore, MemoryStore};
pub use types::*;
