//! Signing credential and its resolver
//!
//! SECURITY: this module is the only place the private key lives.
//! - It is held inside alloy's `PrivateKeySigner` and never serialized
//! - `Debug` prints the derived address only
//! - Only the signature of a prehashed message ever leaves this module

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use thiserror::Error;

use crate::error::ConfigError;
use crate::network::NetworkContext;

const PRIVATE_KEY_HEX_LEN: usize = 64;

#[derive(Error, Debug)]
#[error("signing failed: {0}")]
pub struct SigningError(String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no signing credential is configured; trading tools are disabled")]
    NoCredential,
}

/// The process-wide signing key plus its public address.
#[derive(Clone)]
pub struct Credential {
    signer: PrivateKeySigner,
    address: Address,
}

impl Credential {
    /// Parse a 32-byte hex private key, with or without a `0x` prefix.
    pub fn from_hex(key_hex: &str) -> Result<Self, ConfigError> {
        let trimmed = key_hex.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != PRIVATE_KEY_HEX_LEN {
            return Err(ConfigError::InvalidPrivateKey(format!(
                "expected {} hex characters, got {}",
                PRIVATE_KEY_HEX_LEN,
                digits.len()
            )));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidPrivateKey(
                "key contains non-hex characters".to_string(),
            ));
        }

        let bytes = B256::from_str(digits)
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
        let signer = PrivateKeySigner::from_bytes(&bytes)
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
        let address = signer.address();

        Ok(Credential { signer, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest. Returns `r ‖ s ‖ v` with `v` in {27, 28}.
    pub fn sign_hash(&self, hash: &B256) -> Result<[u8; 65], SigningError> {
        let signature = self
            .signer
            .sign_hash_sync(hash)
            .map_err(|e| SigningError(e.to_string()))?;
        Ok(signature.as_bytes())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address)
            .field("signer", &"<redacted>")
            .finish()
    }
}

/// What a write operation is allowed to use: the credential and the network
/// it must be submitted to.
#[derive(Debug, Clone)]
pub struct SigningContext {
    pub credential: Arc<Credential>,
    pub network: NetworkContext,
}

/// Hands out the signing context for write operations. Reads never call it.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self) -> Result<SigningContext, ResolveError>;
}

/// Resolver over the credential loaded at startup.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    credential: Option<Arc<Credential>>,
    network: NetworkContext,
}

impl StaticResolver {
    pub fn new(credential: Option<Credential>, network: NetworkContext) -> Self {
        StaticResolver {
            credential: credential.map(Arc::new),
            network,
        }
    }

    /// A resolver that refuses every write.
    pub fn read_only(network: NetworkContext) -> Self {
        StaticResolver {
            credential: None,
            network,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

impl CredentialResolver for StaticResolver {
    fn resolve(&self) -> Result<SigningContext, ResolveError> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(ResolveError::NoCredential)?;

        Ok(SigningContext {
            credential: Arc::clone(credential),
            network: self.network.clone(),
        })
    }
}
