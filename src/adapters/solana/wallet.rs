use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Failed to load keypair from file: {0}")]
    LoadError(String),
    #[error("Invalid keypair bytes: {0}")]
    InvalidKeypair(String),
    #[error("Invalid base58 private key at position {index}: {reason}")]
    InvalidPrivateKey { index: usize, reason: String },
    #[error("No wallet credentials configured")]
    NoCredentials,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Holds one signing keypair
pub struct WalletManager {
    keypair: Keypair,
}

impl WalletManager {
    /// Load keypair from a file path (JSON array format)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| WalletError::LoadError(format!("Failed to read file: {}", e)))?;

        // Parse JSON array of bytes
        let bytes: Vec<u8> = serde_json::from_str(&contents)
            .map_err(|e| WalletError::LoadError(format!("Invalid JSON format: {}", e)))?;

        Self::from_bytes(&bytes)
    }

    /// Load keypair from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let keypair = Keypair::try_from(bytes)
            .map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;

        Ok(Self { keypair })
    }

    /// Load keypair from a base58 encoded 64-byte secret key (Phantom/solana-keygen export format)
    pub fn from_base58(encoded: &str) -> Result<Self, WalletError> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Create a new random keypair (for testing)
    pub fn new_random() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    /// Get the public key as a string
    pub fn public_key(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Export keypair as bytes (use with caution)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.keypair.to_bytes().to_vec()
    }

    pub fn to_base58(&self) -> String {
        self.keypair.to_base58_string()
    }
}

impl Clone for WalletManager {
    fn clone(&self) -> Self {
        Self {
            keypair: self.keypair.insecure_clone(),
        }
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager")
            .field("pubkey", &self.public_key())
            .finish()
    }
}

/// Parse a comma separated list of base58 private keys. Blank entries are ignored.
pub fn parse_private_key_list(list: &str) -> Result<Vec<WalletManager>, WalletError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| {
            WalletManager::from_base58(entry).map_err(|e| WalletError::InvalidPrivateKey {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Build the wallet list from inline base58 keys followed by keypair files.
/// Order is preserved; an empty result is an error.
pub fn load_wallets(
    private_keys: &[String],
    keypair_paths: &[String],
) -> Result<Vec<WalletManager>, WalletError> {
    let mut wallets = Vec::with_capacity(private_keys.len() + keypair_paths.len());

    for (index, key) in private_keys.iter().enumerate() {
        let wallet = WalletManager::from_base58(key).map_err(|e| WalletError::InvalidPrivateKey {
            index,
            reason: e.to_string(),
        })?;
        wallets.push(wallet);
    }

    for path in keypair_paths {
        let expanded = shellexpand::tilde(path).to_string();
        wallets.push(WalletManager::from_file(expanded)?);
    }

    if wallets.is_empty() {
        return Err(WalletError::NoCredentials);
    }

    Ok(wallets)
}
