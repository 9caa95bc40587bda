//! Farming error taxonomy.

use std::fmt;
use thiserror::Error;

/// Stage of a farming cycle, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    ResolvePool,
    OpenPosition,
    Swap { index: u32, total: u32 },
    ClosePosition,
    Cooldown,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleStage::ResolvePool => write!(f, "resolve pool"),
            CycleStage::OpenPosition => write!(f, "open position"),
            CycleStage::Swap { index, total } => write!(f, "swap {}/{}", index + 1, total),
            CycleStage::ClosePosition => write!(f, "close position"),
            CycleStage::Cooldown => write!(f, "cooldown"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FarmError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Pool resolution exhausted after {attempts} attempts: {last_error}")]
    PoolResolutionExhausted { attempts: u32, last_error: String },

    #[error("Transaction failed ({operation}): {reason}")]
    TransactionFailed { operation: String, reason: String },

    #[error("Token account scan failed: {0}")]
    ScanFailed(String),

    #[error("Insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    #[error("Cycle failed at {stage}: {source}")]
    CycleFailed {
        stage: CycleStage,
        #[source]
        source: Box<FarmError>,
    },
}

impl FarmError {
    pub fn transaction(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        FarmError::TransactionFailed {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap as a cycle failure at `stage`
    pub fn at_stage(self, stage: CycleStage) -> Self {
        FarmError::CycleFailed {
            stage,
            source: Box::new(self),
        }
    }

    /// Stage a cycle failure happened at, if this is one
    pub fn stage(&self) -> Option<CycleStage> {
        match self {
            FarmError::CycleFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
