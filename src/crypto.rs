//! Credential hashing and at-rest sealing of the vault collections.
//!
//! The master password is kept as an Argon2id PHC string. A separate data key
//! is derived from the password and a stored salt; it seals the entry and
//! category collections with ChaCha20-Poly1305.

use anyhow::{Result, anyhow};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::StorageError;
use crate::storage::{CATEGORIES_KEY, ENTRIES_KEY, KeyValueStore};

pub const KDF_SALT_LEN: usize = 16;
const SEAL_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

impl KdfParams {
    fn argon2(self, output_len: Option<usize>) -> Result<Argon2<'static>> {
        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, output_len)
            .map_err(|e| anyhow!("Invalid Argon2 params: {e}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

pub type DataKey = Zeroizing<[u8; 32]>;

pub fn derive_key_with_params(
    master_password: &str,
    salt: &[u8],
    params: KdfParams,
) -> Result<DataKey> {
    let argon2 = params.argon2(Some(32))?;
    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(master_password.as_bytes(), salt, &mut *key)
        .map_err(|e| anyhow!("Key derivation failed: {e}"))?;
    Ok(key)
}

pub fn generate_salt() -> [u8; KDF_SALT_LEN] {
    let mut salt = [0u8; KDF_SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

pub fn hash_credential(password: &str, params: KdfParams) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .argon2(None)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Credential hashing failed: {e}"))?;
    Ok(hash.to_string())
}

pub fn is_credential_hash(stored: &str) -> bool {
    stored.starts_with("$argon2")
}

pub fn verify_credential(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow!("Bad stored hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// On-disk envelope of a sealed value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SealedValue {
    pub sealed: u8,
    pub nonce: String,
    pub data: String,
}

pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<SealedValue> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| anyhow!("Encryption failed: {e}"))?;

    Ok(SealedValue {
        sealed: SEAL_VERSION,
        nonce: base64::engine::general_purpose::STANDARD.encode(nonce_bytes),
        data: base64::engine::general_purpose::STANDARD.encode(ciphertext),
    })
}

pub fn open(key: &[u8; 32], enc: &SealedValue) -> Result<Vec<u8>> {
    if enc.sealed != SEAL_VERSION {
        return Err(anyhow!("Unsupported sealed value version: {}", enc.sealed));
    }
    let nonce_bytes = base64::engine::general_purpose::STANDARD.decode(&enc.nonce)?;
    if nonce_bytes.len() != 12 {
        return Err(anyhow!("Invalid nonce length"));
    }
    let ciphertext = base64::engine::general_purpose::STANDARD.decode(&enc.data)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| anyhow!("Decryption failed. Wrong password?"))
}

/// Seals the entry and category collections on the way into the inner store
/// and opens them on the way out. Values written before sealing existed are
/// returned untouched and get sealed on their next write.
pub struct SealedStore<S> {
    inner: S,
    key: DataKey,
}

impl<S: KeyValueStore> SealedStore<S> {
    pub fn new(inner: S, key: DataKey) -> Self {
        Self { inner, key }
    }

    fn is_sealed_key(key: &str) -> bool {
        key == ENTRIES_KEY || key == CATEGORIES_KEY
    }
}

impl<S: KeyValueStore> KeyValueStore for SealedStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(raw) = self.inner.get(key)? else {
            return Ok(None);
        };
        if !Self::is_sealed_key(key) {
            return Ok(Some(raw));
        }
        let envelope = match serde_json::from_str::<SealedValue>(&raw) {
            Ok(envelope) => envelope,
            Err(_) => return Ok(Some(raw)),
        };
        let sealed_err = |reason: String| StorageError::Sealed {
            key: key.to_string(),
            reason,
        };
        let plain = open(&self.key, &envelope).map_err(|e| sealed_err(e.to_string()))?;
        String::from_utf8(plain)
            .map(Some)
            .map_err(|e| sealed_err(e.to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if !Self::is_sealed_key(key) {
            return self.inner.set(key, value);
        }
        let sealed_err = |reason: String| StorageError::Sealed {
            key: key.to_string(),
            reason,
        };
        let envelope = seal(&self.key, value.as_bytes()).map_err(|e| sealed_err(e.to_string()))?;
        let encoded =
            serde_json::to_string(&envelope).map_err(|e| sealed_err(e.to_string()))?;
        self.inner.set(key, &encoded)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

#[cfg(test)]
pub(crate) const TEST_KDF: KdfParams = KdfParams {
    m_cost: 8,
    t_cost: 1,
    p_cost: 1,
};
