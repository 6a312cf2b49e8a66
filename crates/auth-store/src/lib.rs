//! Credential storage for Lumen
//!
//! This crate provides the credential store that holds the current access
//! token, refresh token, and authenticated user, with pluggable key-value
//! persistence and a readiness gate for storage rehydration at startup.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod store;

pub use backend::{BackendError, FileBackend, MemoryBackend, StorageBackend};
pub use store::{AuthStore, StoreError, UserRecord, AUTH_STORAGE_KEY};
