//! Meteora DLMM adapter
//!
//! - `pda`: program derived addresses
//! - `state`: `LbPair` account decoding
//! - `instructions`: lb_clmm instruction builders
//! - `quote`: active-bin swap quotes
//! - `client`: `DlmmPort` implementation

pub mod pda;
pub mod state;
pub mod instructions;
pub mod quote;
pub mod client;

pub use client::MeteoraDlmmClient;
pub use pda::LB_CLMM_PROGRAM_ID;
