use log::info;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::db::{SharedStore, StoreError};

/// Storage key of the enrolled credential.
pub const PASSCODE_KEY: &str = "@auth_passcode_v1";
/// Shortest passcode accepted at enrollment.
pub const MIN_PASSCODE_LEN: usize = 4;

const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PasscodeError {
    #[error("Passcode must be at least {} characters.", MIN_PASSCODE_LEN)]
    TooShort,
    #[error("stored passcode credential is corrupt: {0}")]
    Corrupt(#[from] hex::FromHexError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Salted SHA-256 digest of the enrolled passcode, hex encoded.
#[derive(Debug, Serialize, Deserialize)]
struct Credential {
    salt: String,
    digest: String,
}

/// The one locally enrolled passcode, kept in the key-value store next to
/// the book collection.
pub struct PasscodeVault {
    store: SharedStore,
}

impl PasscodeVault {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn is_enrolled(&self) -> Result<bool, PasscodeError> {
        Ok(self.credential()?.is_some())
    }

    /// Replace any existing credential with `passcode`.
    pub fn enroll(&self, passcode: &str) -> Result<(), PasscodeError> {
        if passcode.chars().count() < MIN_PASSCODE_LEN {
            return Err(PasscodeError::TooShort);
        }

        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let credential = Credential {
            salt: hex::encode(salt),
            digest: hex::encode(digest(&salt, passcode)),
        };

        let raw = serde_json::to_string(&credential).map_err(|source| StoreError::Encode {
            key: PASSCODE_KEY.to_string(),
            source,
        })?;
        self.store.set_item(PASSCODE_KEY, &raw)?;
        info!("event=passcode_enroll module=auth status=ok");
        Ok(())
    }

    /// Compare `candidate` against the enrolled credential. `false` when
    /// nothing is enrolled.
    pub fn verify(&self, candidate: &str) -> Result<bool, PasscodeError> {
        let Some(credential) = self.credential()? else {
            return Ok(false);
        };
        let salt = hex::decode(&credential.salt)?;
        let expected = hex::decode(&credential.digest)?;
        Ok(digest(&salt, candidate)
            .as_slice()
            .ct_eq(expected.as_slice())
            .into())
    }

    pub fn clear(&self) -> Result<(), PasscodeError> {
        self.store.remove_item(PASSCODE_KEY)?;
        info!("event=passcode_clear module=auth status=ok");
        Ok(())
    }

    fn credential(&self) -> Result<Option<Credential>, StoreError> {
        let Some(raw) = self.store.get_item(PASSCODE_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                key: PASSCODE_KEY.to_string(),
                source,
            })
    }
}

fn digest(salt: &[u8], passcode: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(passcode.as_bytes());
    hasher.finalize().to_vec()
}
