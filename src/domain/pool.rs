use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

use super::position::SwapDirection;
use super::token::TokenDescriptor;

/// A DLMM pool the cycle operates on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDescriptor {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    pub token_x: TokenDescriptor,
    pub token_y: TokenDescriptor,
    pub bin_step: u16,
    /// True when this run created the pool rather than finding it
    pub is_new: bool,
    /// True when the pool stores the configured pair in the opposite order,
    /// so `token_x` is the second configured token
    #[serde(default)]
    pub reversed: bool,
}

impl PoolDescriptor {
    pub fn new(
        address: Pubkey,
        token_x: TokenDescriptor,
        token_y: TokenDescriptor,
        bin_step: u16,
        is_new: bool,
    ) -> Self {
        Self {
            address,
            token_x,
            token_y,
            bin_step,
            is_new,
            reversed: false,
        }
    }

    pub fn with_reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// First token of the configured pair. Owns `token_x_amount` and the initial swap amount.
    pub fn first_token(&self) -> &TokenDescriptor {
        if self.reversed {
            &self.token_y
        } else {
            &self.token_x
        }
    }

    /// Put values given in configured pair order into pool (x, y) order
    pub fn to_pool_order<T>(&self, first: T, second: T) -> (T, T) {
        if self.reversed {
            (second, first)
        } else {
            (first, second)
        }
    }

    /// Pool-side direction of swap `index`. Even swaps sell the first configured token.
    pub fn swap_direction(&self, index: u32) -> SwapDirection {
        let direction = SwapDirection::for_index(index);
        if self.reversed {
            direction.opposite()
        } else {
            direction
        }
    }

    /// "X-Y" pair label for logging
    pub fn pair_label(&self) -> String {
        format!("{}-{}", self.token_x.symbol, self.token_y.symbol)
    }
}

impl fmt::Display for PoolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (bin step {})",
            self.pair_label(),
            self.address,
            self.bin_step
        )
    }
}

/// Order a configured pair the way a pool stores its mints.
///
/// Returns `(token_x, token_y, reversed)`, or `None` when the pool does not hold
/// exactly these two mints.
pub fn orient_pair(
    first: &TokenDescriptor,
    second: &TokenDescriptor,
    pool_x: &Pubkey,
    pool_y: &Pubkey,
) -> Option<(TokenDescriptor, TokenDescriptor, bool)> {
    let first_mint = first.mint().ok()?;
    let second_mint = second.mint().ok()?;
    if first_mint == *pool_x && second_mint == *pool_y {
        Some((first.clone(), second.clone(), false))
    } else if first_mint == *pool_y && second_mint == *pool_x {
        Some((second.clone(), first.clone(), true))
    } else {
        None
    }
}

pub(crate) mod pubkey_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> TokenDescriptor {
        TokenDescriptor::new("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6)
    }

    fn sol() -> TokenDescriptor {
        TokenDescriptor::new("SOL", "So11111111111111111111111111111111111111112", 9)
    }

    #[test]
    fn test_pair_label_and_display() {
        let pool = PoolDescriptor::new(
            Pubkey::new_unique(),
            TokenDescriptor::new("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6),
            TokenDescriptor::new("SOL", "So11111111111111111111111111111111111111112", 9),
            20,
            false,
        );

        assert_eq!(pool.pair_label(), "USDC-SOL");
        assert!(pool.to_string().contains("bin step 20"));
    }

    #[test]
    fn test_serializes_address_as_base58() {
        let address = Pubkey::new_unique();
        let pool = PoolDescriptor::new(
            address,
            TokenDescriptor::new("A", "A", 6),
            TokenDescriptor::new("B", "B", 6),
            10,
            true,
        );

        let json = serde_json::to_string(&pool).unwrap();
        assert!(json.contains(&address.to_string()));

        let back: PoolDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pool);
    }

    #[test]
    fn test_orient_pair_matches_pool_order() {
        let (usdc_mint, sol_mint) = (usdc().mint().unwrap(), sol().mint().unwrap());

        let (x, y, reversed) = orient_pair(&usdc(), &sol(), &usdc_mint, &sol_mint).unwrap();
        assert_eq!((x.symbol.as_str(), y.symbol.as_str(), reversed), ("USDC", "SOL", false));

        let (x, y, reversed) = orient_pair(&usdc(), &sol(), &sol_mint, &usdc_mint).unwrap();
        assert_eq!((x.symbol.as_str(), y.symbol.as_str(), reversed), ("SOL", "USDC", true));

        assert!(orient_pair(&usdc(), &sol(), &usdc_mint, &Pubkey::new_unique()).is_none());
    }

    #[test]
    fn test_reversed_pool_keeps_configured_roles() {
        let pool = PoolDescriptor::new(Pubkey::new_unique(), sol(), usdc(), 20, false).with_reversed(true);

        assert_eq!(pool.first_token().symbol, "USDC");
        assert_eq!(pool.to_pool_order("usdc amount", "sol amount"), ("sol amount", "usdc amount"));
        assert_eq!(pool.swap_direction(0), SwapDirection::YToX);
        assert_eq!(pool.swap_direction(1), SwapDirection::XToY);

        let straight = PoolDescriptor::new(Pubkey::new_unique(), usdc(), sol(), 20, false);
        assert_eq!(straight.first_token().symbol, "USDC");
        assert_eq!(straight.to_pool_order(1, 2), (1, 2));
        assert_eq!(straight.swap_direction(0), SwapDirection::XToY);
    }
}
