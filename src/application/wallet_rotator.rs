//! Round-robin wallet rotation.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::adapters::solana::WalletManager;
use crate::domain::FarmError;

/// Hands out the configured wallets in order, wrapping around at the end
#[derive(Debug)]
pub struct WalletRotator {
    wallets: Vec<Arc<Keypair>>,
    index: AtomicUsize,
}

impl WalletRotator {
    pub fn new(wallets: Vec<Arc<Keypair>>) -> Result<Self, FarmError> {
        if wallets.is_empty() {
            return Err(FarmError::Configuration(
                "wallet rotator needs at least one wallet".to_string(),
            ));
        }

        Ok(Self {
            wallets,
            index: AtomicUsize::new(0),
        })
    }

    pub fn from_managers(managers: Vec<WalletManager>) -> Result<Self, FarmError> {
        let wallets = managers
            .iter()
            .map(|m| Arc::new(m.keypair().insecure_clone()))
            .collect();
        Self::new(wallets)
    }

    /// Next wallet in rotation. Concurrent callers each get their own slot.
    pub fn next(&self) -> Arc<Keypair> {
        let slot = self.index.fetch_add(1, Ordering::Relaxed) % self.wallets.len();
        Arc::clone(&self.wallets[slot])
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn pubkeys(&self) -> Vec<Pubkey> {
        self.wallets.iter().map(|w| w.pubkey()).collect()
    }
}
