//! Rent recovery: scan a wallet, optionally close its empty token accounts,
//! and report how many lamports came back.

use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;

use super::account_scanner::AccountScanner;
use super::batch_closer::BatchCloser;
use crate::domain::{FarmError, RecoveryReport, LAMPORTS_PER_SOL};
use crate::ports::ChainPort;

pub struct RecoveryService {
    chain: Arc<dyn ChainPort>,
    scanner: AccountScanner,
    closer: BatchCloser,
    execute: bool,
}

impl RecoveryService {
    /// Scan-only until `with_execute(true)`
    pub fn new(chain: Arc<dyn ChainPort>, concurrency: usize) -> Result<Self, FarmError> {
        Ok(Self {
            scanner: AccountScanner::new(chain.clone()),
            closer: BatchCloser::new(chain.clone(), concurrency)?,
            chain,
            execute: false,
        })
    }

    pub fn with_execute(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    /// Run the pipeline for one wallet. Never fails: problems land in `report.error`.
    pub async fn recover(&self, wallet: &Keypair) -> RecoveryReport {
        let address = wallet.pubkey();

        let initial_balance = match self.chain.get_balance(&address).await {
            Ok(balance) => balance,
            Err(e) => {
                let mut report = RecoveryReport::new(address.to_string(), 0);
                report.error = Some(format!("Balance lookup failed: {}", e));
                return report;
            }
        };
        let mut report = RecoveryReport::new(address.to_string(), initial_balance);
        tracing::info!(
            "Wallet {} | balance {:.6} SOL",
            address,
            initial_balance as f64 / LAMPORTS_PER_SOL as f64
        );

        let scan = match self.scanner.scan(&address).await {
            Ok(scan) => scan,
            Err(e) => {
                tracing::error!("{}", e);
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.skipped_accounts = scan.skipped;
        report.closable_accounts = scan.closable();

        if report.closable_accounts.is_empty() {
            tracing::info!("No empty token accounts to close");
            return report;
        }

        tracing::info!(
            "{} closable accounts holding {:.6} SOL of rent",
            report.closable_accounts.len(),
            report.reclaimable_lamports() as f64 / LAMPORTS_PER_SOL as f64
        );

        if !self.execute {
            tracing::info!("Dry run, pass --execute to close them");
            return report;
        }

        let outcome = self
            .closer
            .close_all(wallet, report.closable_accounts.clone())
            .await;
        report.closed_accounts = outcome.closed;
        report.failed_accounts = outcome.failed;

        match self.chain.get_balance(&address).await {
            Ok(new_balance) => {
                report.settle(new_balance);
                tracing::info!(
                    "Recovered {:.6} SOL | new balance {:.6} SOL",
                    report.total_recovered as f64 / LAMPORTS_PER_SOL as f64,
                    new_balance as f64 / LAMPORTS_PER_SOL as f64
                );
            }
            Err(e) => {
                report.error = Some(format!("Balance re-query failed: {}", e));
            }
        }

        report
    }
}
