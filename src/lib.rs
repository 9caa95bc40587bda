//! Meteora Farmer - DLMM liquidity farming bot library
//!
//! Repeats open position / swap / withdraw cycles against Meteora DLMM pools
//! on Solana, and reclaims rent from empty token accounts.
//!
//! # Modules
//!
//! - `domain`: Core types (TokenDescriptor, PoolDescriptor, PositionHandle, RecoveryReport)
//! - `ports`: Trait abstractions (ChainPort, DlmmPort) and in-memory fakes
//! - `adapters`: External implementations (Solana RPC, Meteora DLMM, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Farming loop, cycle controller and rent recovery

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
