use std::fmt;

use aes_gcm::{Aes256Gcm, Key, aead::KeyInit};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Length of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit AES-GCM key derived from the shared secret.
///
/// Lives in memory for one session and is wiped on drop. The raw bytes never
/// leave this crate; callers can only hand the key to [`crate::encrypt`] and
/// [`crate::decrypt`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    pub(crate) fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.bytes))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Derive the room key from the shared bearer credential.
///
/// SHA-256 over the UTF-8 bytes of `secret`, used directly as the AES-256 key.
/// Unsalted and deterministic: the same secret always gives the same key.
pub fn derive_key(secret: &str) -> Result<SymmetricKey, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::Derivation("secret is empty"));
    }

    let digest = Sha256::digest(secret.as_bytes());
    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&digest);

    Ok(SymmetricKey { bytes })
}
