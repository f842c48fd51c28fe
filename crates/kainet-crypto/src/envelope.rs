use aes_gcm::{
    Nonce,
    aead::{Aead, OsRng, rand_core::RngCore},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::CryptoError;
use crate::keys::SymmetricKey;

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Seal a message for the store.
///
/// Output is base64 (standard alphabet, padded) of `nonce || ciphertext || tag`.
/// A fresh random nonce is drawn from the OS RNG on every call.
pub fn encrypt(plaintext: &str, key: &SymmetricKey) -> Result<String, CryptoError> {
    let cipher = key.cipher();

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encryption)?;

    let mut framed = Vec::with_capacity(NONCE_LEN + sealed.len());
    framed.extend_from_slice(&nonce_bytes);
    framed.extend_from_slice(&sealed);

    Ok(BASE64.encode(framed))
}

/// Open an envelope produced by [`encrypt`].
///
/// Anything short of a verified tag and valid UTF-8 is reported as
/// [`CryptoError::Decryption`], except payloads too short to hold a nonce.
pub fn decrypt(envelope: &str, key: &SymmetricKey) -> Result<String, CryptoError> {
    let framed = BASE64
        .decode(envelope)
        .map_err(|_| CryptoError::Decryption)?;

    if framed.len() < NONCE_LEN {
        return Err(CryptoError::MalformedEnvelope {
            len: framed.len(),
            min: NONCE_LEN,
        });
    }

    let (nonce_bytes, body) = framed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = key
        .cipher()
        .decrypt(nonce, body)
        .map_err(|_| CryptoError::Decryption)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption)
}
