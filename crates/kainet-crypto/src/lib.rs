//! Kainet Crypto Library
//!
//! Shared-secret symmetric encryption for room messages (AES-256-GCM).
//! Every holder of the bearer credential derives the same key, so any
//! operator can read any room. The envelope protects message contents from
//! observers of the store, not from other credential holders.

pub mod envelope;
pub mod error;
pub mod keys;

pub use envelope::{decrypt, encrypt};
pub use error::CryptoError;
pub use keys::{SymmetricKey, derive_key};
