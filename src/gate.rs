//! Master-password gate.
//!
//! First run asks for a new password twice; later runs check it against the
//! stored Argon2id hash. Either way a successful pass yields the data key
//! that opens the sealed collections. Older vaults that kept the password in
//! plain text are accepted once and rewritten as a hash.

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crypto::{
    DataKey, KdfParams, derive_key_with_params, generate_salt, hash_credential,
    is_credential_hash, verify_credential,
};
use crate::error::GateError;
use crate::storage::{KDF_SALT_KEY, KeyValueStore, MASTER_KEY, SEEN_TOUR_KEY};

pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// No master password yet.
    Setup,
    Locked,
}

/// Salt and cost settings for the data key, fixed when the vault is created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct KdfRecord {
    salt: String,
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
}

impl KdfRecord {
    fn params(&self) -> KdfParams {
        KdfParams {
            m_cost: self.m_cost,
            t_cost: self.t_cost,
            p_cost: self.p_cost,
        }
    }
}

pub struct LockGate<S> {
    storage: S,
    params: KdfParams,
}

impl<S: KeyValueStore> LockGate<S> {
    pub fn new(storage: S) -> Self {
        Self::with_params(storage, KdfParams::default())
    }

    /// `params` only applies to credentials and salts created from now on;
    /// existing ones keep the costs they were made with.
    pub fn with_params(storage: S, params: KdfParams) -> Self {
        Self { storage, params }
    }

    pub fn status(&self) -> Result<GateStatus, GateError> {
        Ok(match self.storage.get(MASTER_KEY)? {
            Some(stored) if !stored.is_empty() => GateStatus::Locked,
            _ => GateStatus::Setup,
        })
    }

    pub fn setup(&mut self, password: &str, confirm: &str) -> Result<DataKey, GateError> {
        if self.status()? == GateStatus::Locked {
            return Err(GateError::AlreadyInitialized);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(GateError::TooShort(MIN_PASSWORD_LEN));
        }
        if password != confirm {
            return Err(GateError::Mismatch);
        }
        let hash =
            hash_credential(password, self.params).map_err(|e| GateError::Kdf(e.to_string()))?;
        self.storage.set(MASTER_KEY, &hash)?;
        info!("master password created");
        self.data_key(password)
    }

    pub fn unlock(&mut self, password: &str) -> Result<DataKey, GateError> {
        let Some(stored) = self.storage.get(MASTER_KEY)?.filter(|s| !s.is_empty()) else {
            return Err(GateError::NotInitialized);
        };
        if is_credential_hash(&stored) {
            let ok = verify_credential(password, &stored)
                .map_err(|e| GateError::BadCredential(e.to_string()))?;
            if !ok {
                warn!("unlock rejected");
                return Err(GateError::WrongPassword);
            }
        } else {
            if password != stored {
                warn!("unlock rejected");
                return Err(GateError::WrongPassword);
            }
            let hash = hash_credential(password, self.params)
                .map_err(|e| GateError::Kdf(e.to_string()))?;
            self.storage.set(MASTER_KEY, &hash)?;
            info!("plain-text master password upgraded to a hash");
        }
        info!("vault unlocked");
        self.data_key(password)
    }

    pub fn seen_tour(&self) -> Result<bool, GateError> {
        Ok(self.storage.get(SEEN_TOUR_KEY)?.as_deref() == Some("true"))
    }

    pub fn mark_tour_seen(&mut self) -> Result<(), GateError> {
        self.storage.set(SEEN_TOUR_KEY, "true")?;
        Ok(())
    }

    fn data_key(&mut self, password: &str) -> Result<DataKey, GateError> {
        let record = match self.kdf_record()? {
            Some(record) => record,
            None => {
                let record = KdfRecord {
                    salt: base64::engine::general_purpose::STANDARD.encode(generate_salt()),
                    m_cost: self.params.m_cost,
                    t_cost: self.params.t_cost,
                    p_cost: self.params.p_cost,
                };
                let raw = serde_json::to_string(&record)
                    .map_err(|e| GateError::BadCredential(e.to_string()))?;
                self.storage.set(KDF_SALT_KEY, &raw)?;
                record
            }
        };
        let salt = base64::engine::general_purpose::STANDARD
            .decode(&record.salt)
            .map_err(|e| GateError::BadCredential(e.to_string()))?;
        derive_key_with_params(password, &salt, record.params())
            .map_err(|e| GateError::Kdf(e.to_string()))
    }

    fn kdf_record(&self) -> Result<Option<KdfRecord>, GateError> {
        match self.storage.get(KDF_SALT_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| GateError::BadCredential(e.to_string())),
            None => Ok(None),
        }
    }
}
