//! Batched, bounded-concurrency closing of empty token accounts.
//!
//! Accounts are split into consecutive batches of `concurrency`. Each batch
//! is fanned out with `join_all` and fully awaited before the next one starts,
//! so at most `concurrency` closes are ever in flight.

use futures::future::join_all;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;

use crate::domain::{AccountRecord, FarmError};
use crate::ports::ChainPort;

/// Result of closing a set of accounts. `closed` and `failed` keep submission order.
#[derive(Debug, Clone, Default)]
pub struct CloseOutcome {
    pub closed: Vec<AccountRecord>,
    pub failed: Vec<AccountRecord>,
    pub batches: usize,
}

pub struct BatchCloser {
    chain: Arc<dyn ChainPort>,
    concurrency: usize,
}

impl BatchCloser {
    pub fn new(chain: Arc<dyn ChainPort>, concurrency: usize) -> Result<Self, FarmError> {
        if concurrency == 0 {
            return Err(FarmError::Configuration(
                "close concurrency must be > 0".to_string(),
            ));
        }
        Ok(Self { chain, concurrency })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Close every account in `accounts`; one failure never affects the others
    pub async fn close_all(&self, owner: &Keypair, accounts: Vec<AccountRecord>) -> CloseOutcome {
        let total = accounts.len();
        let mut outcome = CloseOutcome::default();
        if total == 0 {
            return outcome;
        }

        tracing::info!(
            "Closing {} accounts in batches of {}",
            total,
            self.concurrency
        );

        let mut processed = 0;
        for batch in accounts.chunks(self.concurrency) {
            outcome.batches += 1;

            let tasks = batch.iter().cloned().map(|record| self.close_one(owner, record));
            let results = join_all(tasks).await;

            for result in results {
                match result {
                    Ok(record) => outcome.closed.push(record),
                    Err(record) => outcome.failed.push(record),
                }
            }

            processed += batch.len();
            tracing::info!(
                "Progress: {}/{} ({:.1}%)",
                processed,
                total,
                processed as f64 / total as f64 * 100.0
            );
        }

        tracing::info!(
            "Closed {} accounts, {} failed, {} batches",
            outcome.closed.len(),
            outcome.failed.len(),
            outcome.batches
        );
        outcome
    }

    async fn close_one(&self, owner: &Keypair, record: AccountRecord) -> Result<AccountRecord, AccountRecord> {
        let owner_key = owner.pubkey();
        let instruction = match spl_token::instruction::close_account(
            &spl_token::id(),
            &record.address,
            &owner_key,
            &owner_key,
            &[],
        ) {
            Ok(ix) => ix,
            Err(e) => return Err(record.mark_failed(e.to_string())),
        };

        match self.chain.send_and_confirm(&[instruction], owner, &[]).await {
            Ok(signature) => {
                tracing::info!("Closed {} ({}) | tx {}", record.address, record.mint_label(), signature);
                Ok(record.mark_closed(signature.to_string()))
            }
            Err(e) => {
                tracing::warn!("Failed to close {}: {}", record.address, e);
                Err(record.mark_failed(e.to_string()))
            }
        }
    }
}
