//! Token account records and the rent recovery report.

use serde::{Deserialize, Serialize};
use spl_token::solana_program::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_token::state::Account as TokenAccount;
use thiserror::Error;

use super::pool::pubkey_string;

/// Lamports per SOL, for display only
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccountDecodeError {
    #[error("Account {address} has {len} bytes, expected {expected}")]
    InvalidLength {
        address: String,
        len: usize,
        expected: usize,
    },
    #[error("Account {address} is not an initialized token account: {reason}")]
    InvalidLayout { address: String, reason: String },
}

/// Kind of account found during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    SplToken,
}

/// Raw account bytes as returned by the chain
#[derive(Debug, Clone, PartialEq)]
pub struct RawAccount {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

/// A scanned token account and, after a close attempt, its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    pub kind: AccountKind,
    pub mint: Option<String>,
    /// Raw token balance in base units
    pub balance: u64,
    /// Rent held by the account, returned on close
    pub lamports: u64,
    pub closable: bool,
    pub signature: Option<String>,
    pub error: Option<String>,
}

impl AccountRecord {
    /// Decode an SPL token account layout. Closable iff the balance is exactly zero.
    pub fn from_token_account(raw: &RawAccount) -> Result<Self, AccountDecodeError> {
        if raw.data.len() != TokenAccount::LEN {
            return Err(AccountDecodeError::InvalidLength {
                address: raw.address.to_string(),
                len: raw.data.len(),
                expected: TokenAccount::LEN,
            });
        }

        let account = TokenAccount::unpack(&raw.data).map_err(|e| AccountDecodeError::InvalidLayout {
            address: raw.address.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            address: raw.address,
            kind: AccountKind::SplToken,
            mint: Some(account.mint.to_string()),
            balance: account.amount,
            lamports: raw.lamports,
            closable: account.amount == 0,
            signature: None,
            error: None,
        })
    }

    /// Short mint label like `EPjFWdd5...`
    pub fn mint_label(&self) -> String {
        match &self.mint {
            Some(mint) if mint.len() > 8 => format!("{}...", &mint[..8]),
            Some(mint) => mint.clone(),
            None => "-".to_string(),
        }
    }

    pub fn mark_closed(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self.error = None;
        self
    }

    pub fn mark_failed(mut self, error: String) -> Self {
        self.signature = None;
        self.error = Some(error);
        self
    }
}

/// Result of a scan-and-close run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub wallet_address: String,
    pub initial_balance: u64,
    pub closable_accounts: Vec<AccountRecord>,
    pub closed_accounts: Vec<AccountRecord>,
    pub failed_accounts: Vec<AccountRecord>,
    /// Accounts whose layout could not be decoded
    pub skipped_accounts: usize,
    /// Balance delta after closing; negative if fees exceeded recovered rent
    pub total_recovered: i64,
    pub new_balance: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecoveryReport {
    pub fn new(wallet_address: String, initial_balance: u64) -> Self {
        Self {
            wallet_address,
            initial_balance,
            new_balance: initial_balance,
            ..Default::default()
        }
    }

    /// Rent currently locked in closable accounts
    pub fn reclaimable_lamports(&self) -> u64 {
        self.closable_accounts.iter().map(|a| a.lamports).sum()
    }

    /// Record the post-close balance and the delta against the starting balance
    pub fn settle(&mut self, new_balance: u64) {
        self.new_balance = new_balance;
        self.total_recovered = new_balance as i64 - self.initial_balance as i64;
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_zero_balance_is_closable() {
        let owner = Pubkey::new_unique();
        let raw = raw_token_account(&owner, 0, 2_039_280);

        let record = AccountRecord::from_token_account(&raw).unwrap();
        assert!(record.closable);
        assert_eq!(record.balance, 0);
        assert_eq!(record.lamports, 2_039_280);
        assert_eq!(record.kind, AccountKind::SplToken);
    }

    #[test]
    fn test_nonzero_balance_never_closable() {
        let owner = Pubkey::new_unique();
        for amount in [1u64, 7, 1_000_000, u64::MAX] {
            let raw = raw_token_account(&owner, amount, 2_039_280);
            let record = AccountRecord::from_token_account(&raw).unwrap();
            assert!(!record.closable, "amount {} must not be closable", amount);
        }
    }

    #[test]
    fn test_decode_rejects_short_data() {
        let raw = RawAccount {
            address: Pubkey::new_unique(),
            owner: spl_token::id(),
            lamports: 1,
            data: vec![0u8; 64],
        };
        assert!(matches!(
            AccountRecord::from_token_account(&raw),
            Err(AccountDecodeError::InvalidLength { len: 64, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_uninitialized() {
        let raw = RawAccount {
            address: Pubkey::new_unique(),
            owner: spl_token::id(),
            lamports: 1,
            data: vec![0u8; TokenAccount::LEN],
        };
        assert!(matches!(
            AccountRecord::from_token_account(&raw),
            Err(AccountDecodeError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_mark_outcomes() {
        let raw = raw_token_account(&Pubkey::new_unique(), 0, 10);
        let record = AccountRecord::from_token_account(&raw).unwrap();

        let closed = record.clone().mark_closed("sig".to_string());
        assert_eq!(closed.signature.as_deref(), Some("sig"));
        assert!(closed.error.is_none());

        let failed = record.mark_failed("boom".to_string());
        assert!(failed.signature.is_none());
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_report_settle() {
        let mut report = RecoveryReport::new("wallet".to_string(), 1_000);
        assert_eq!(report.new_balance, 1_000);
        assert_eq!(report.total_recovered, 0);

        report.settle(5_000);
        assert_eq!(report.total_recovered, 4_000);

        report.settle(900);
        assert_eq!(report.total_recovered, -100);
    }

    #[test]
    fn test_report_error_omitted_when_absent() {
        let report = RecoveryReport::new("wallet".to_string(), 0);
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("\"error\""));
    }
}
