use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;

use super::pool::pubkey_string;

/// An open liquidity position. Lives for exactly one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionHandle {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    pub open_signature: String,
    pub lower_bin_id: i32,
    pub upper_bin_id: i32,
}

impl PositionHandle {
    pub fn new(address: Pubkey, open_signature: Signature, lower_bin_id: i32, upper_bin_id: i32) -> Self {
        Self {
            address,
            open_signature: open_signature.to_string(),
            lower_bin_id,
            upper_bin_id,
        }
    }

    /// Number of bins covered by the position
    pub fn width(&self) -> i32 {
        self.upper_bin_id - self.lower_bin_id + 1
    }
}

/// Bin range `[active - half_width, active + half_width]`
pub fn symmetric_bin_range(active_id: i32, half_width: i32) -> (i32, i32) {
    (active_id - half_width, active_id + half_width)
}

/// Swap direction within a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Sell X, receive Y
    XToY,
    /// Sell Y, receive X
    YToX,
}

impl SwapDirection {
    /// Even swap indices go X -> Y, odd ones back
    pub fn for_index(index: u32) -> Self {
        if index % 2 == 0 {
            SwapDirection::XToY
        } else {
            SwapDirection::YToX
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            SwapDirection::XToY => SwapDirection::YToX,
            SwapDirection::YToX => SwapDirection::XToY,
        }
    }

    pub fn swap_for_y(&self) -> bool {
        matches!(self, SwapDirection::XToY)
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::XToY => write!(f, "X->Y"),
            SwapDirection::YToX => write!(f, "Y->X"),
        }
    }
}

/// One confirmed swap inside a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub index: u32,
    pub direction: SwapDirection,
    /// Input in base units of the sold token
    pub amount_in: u64,
    /// Output in base units of the bought token
    pub amount_out: u64,
    pub signature: String,
}
