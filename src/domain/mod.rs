//! Domain Layer - Core types for the DLMM farmer
//!
//! Pure data and rules with no network access. Chain and protocol
//! interactions happen through the ports layer.
//!
//! - `token`: token descriptors and exact amount scaling
//! - `pool`: pool descriptors
//! - `position`: position handles, swap direction and receipts
//! - `account`: token account records and the rent recovery report
//! - `random`: randomized cycle parameters
//! - `error`: farming error taxonomy

pub mod token;
pub mod pool;
pub mod position;
pub mod account;
pub mod random;
pub mod error;

pub use token::{TokenDescriptor, AmountError, ui_to_raw, raw_to_ui};
pub use pool::{PoolDescriptor, orient_pair};
pub use position::{PositionHandle, SwapDirection, SwapReceipt, symmetric_bin_range};
pub use account::{
    AccountRecord, AccountKind, AccountDecodeError, RawAccount, RecoveryReport, LAMPORTS_PER_SOL,
};
pub use random::{RangeInclusive, random_int, random_wait, select_token_pair, select_bin_step};
pub use error::{FarmError, CycleStage};
