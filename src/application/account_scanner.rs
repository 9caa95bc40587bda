//! Token account scanner.
//!
//! Lists every SPL token account a wallet owns and marks the empty ones as
//! closable. Read-only; nothing is submitted.

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

use crate::domain::{AccountRecord, FarmError};
use crate::ports::ChainPort;

/// Everything found for one wallet
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Every decoded token account, in RPC order
    pub accounts: Vec<AccountRecord>,
    /// Accounts that could not be decoded as token accounts
    pub skipped: usize,
}

impl ScanResult {
    pub fn closable(&self) -> Vec<AccountRecord> {
        self.accounts.iter().filter(|a| a.closable).cloned().collect()
    }

    pub fn closable_count(&self) -> usize {
        self.accounts.iter().filter(|a| a.closable).count()
    }
}

pub struct AccountScanner {
    chain: Arc<dyn ChainPort>,
    token_program: Pubkey,
}

impl AccountScanner {
    pub fn new(chain: Arc<dyn ChainPort>) -> Self {
        Self {
            chain,
            token_program: spl_token::id(),
        }
    }

    pub async fn scan(&self, wallet: &Pubkey) -> Result<ScanResult, FarmError> {
        tracing::info!("Scanning token accounts of {}", wallet);

        let raw_accounts = self
            .chain
            .get_token_accounts(wallet, &self.token_program)
            .await
            .map_err(|e| FarmError::ScanFailed(e.to_string()))?;

        let mut result = ScanResult::default();
        for raw in &raw_accounts {
            match AccountRecord::from_token_account(raw) {
                Ok(record) => {
                    tracing::debug!(
                        "{} | mint {} | balance {} | {} lamports | {}",
                        record.address,
                        record.mint_label(),
                        record.balance,
                        record.lamports,
                        if record.closable { "closable" } else { "has balance" }
                    );
                    result.accounts.push(record);
                }
                Err(e) => {
                    tracing::warn!("Skipping undecodable account: {}", e);
                    result.skipped += 1;
                }
            }
        }

        tracing::info!(
            "Found {} token accounts, {} closable, {} skipped",
            result.accounts.len(),
            result.closable_count(),
            result.skipped
        );
        Ok(result)
    }
}
