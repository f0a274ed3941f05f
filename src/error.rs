use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid pattern cell '{0}' (expected 0-8)")]
    InvalidToken(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("sealed value for '{key}' could not be opened: {reason}")]
    Sealed { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not serialize '{key}': {source}")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("folder name is required")]
    EmptyCategoryName,
    #[error("title and secret value are required")]
    MissingRequiredField,
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
}

/// Import failures; each maps to the stage it aborts.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON file is malformed or invalid: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("incomplete structure: expected an object with an \"entries\" array")]
    IncompleteStructure,
    #[error(transparent)]
    Commit(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("password must be at least {0} characters")]
    TooShort(usize),
    #[error("confirmation does not match")]
    Mismatch,
    #[error("wrong password, access denied")]
    WrongPassword,
    #[error("vault already has a master password")]
    AlreadyInitialized,
    #[error("vault has no master password yet")]
    NotInitialized,
    #[error("stored credential is unreadable: {0}")]
    BadCredential(String),
    #[error("key derivation failed: {0}")]
    Kdf(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
