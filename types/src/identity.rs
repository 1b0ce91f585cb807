//! Identities, principals, and account identifiers.
//!
//! An [`Identity`] is the ed25519 credential obtained from a wallet provider.
//! The [`Principal`] is its external-facing form (hex-encoded public key) and
//! the [`AccountId`] is the ledger-side identifier derived from it.

use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    sha256::Sha256,
    Hasher, Signer,
};
use commonware_utils::{from_hex, hex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Domain separator for account-id derivation.
const ACCOUNT_DOMAIN: &[u8] = b"aptc-account";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsePrincipalError {
    #[error("principal is not valid hex")]
    InvalidHex,
    #[error("principal has wrong length (got {got} bytes, expected {expected})")]
    WrongLength { got: usize, expected: usize },
}

/// A user credential usable for service calls.
#[derive(Clone)]
pub struct Identity {
    key: PrivateKey,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("principal", &self.principal())
            .finish()
    }
}

impl Identity {
    pub fn new(key: PrivateKey) -> Self {
        Self { key }
    }

    /// Deterministic identity for tests and tooling.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            key: PrivateKey::from_seed(seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn principal(&self) -> Principal {
        Principal::from_public_key(&self.public_key())
    }

    pub fn account_id(&self) -> AccountId {
        self.principal().account_id()
    }
}

/// External-facing account identifier derived from an identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn from_public_key(key: &PublicKey) -> Self {
        Principal(hex(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ledger-side account identifier for this principal.
    pub fn account_id(&self) -> AccountId {
        let mut hasher = Sha256::new();
        hasher.update(ACCOUNT_DOMAIN);
        hasher.update(self.0.as_bytes());
        AccountId(hex(hasher.finalize().as_ref()))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Principal {
    type Err = ParsePrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_hex(s).ok_or(ParsePrincipalError::InvalidHex)?;
        if bytes.len() != 32 {
            return Err(ParsePrincipalError::WrongLength {
                got: bytes.len(),
                expected: 32,
            });
        }
        Ok(Principal(hex(&bytes)))
    }
}

/// Ledger account identifier (hex digest of a domain-separated principal).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        AccountId(s)
    }
}
