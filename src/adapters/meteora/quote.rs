//! Active-bin swap quoting.
//!
//! Prices every unit at the active bin's price and charges the pool's base
//! fee. Large swaps that walk through several bins get a looser estimate;
//! the on-chain `min_out` check is what enforces slippage.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use solana_sdk::pubkey::Pubkey;

use crate::ports::{DlmmError, PoolState, SwapQuote};

const BASIS_POINT_MAX: u64 = 10_000;
const FEE_PRECISION: u64 = 1_000_000_000;

/// `base^exp` by squaring, failing instead of overflowing
fn checked_powi(base: Decimal, exp: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut base = base;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base)?;
        }
    }
    Some(result)
}

/// Price of X in Y (base units) at `bin_id`: `(1 + bin_step / 10_000) ^ bin_id`
pub fn bin_price(bin_id: i32, bin_step: u16) -> Result<Decimal, DlmmError> {
    let step = Decimal::ONE + Decimal::from(bin_step) / dec!(10000);
    let magnitude = checked_powi(step, bin_id.unsigned_abs())
        .ok_or_else(|| DlmmError::QuoteError(format!("bin price overflow at bin {}", bin_id)))?;
    if bin_id >= 0 {
        Ok(magnitude)
    } else {
        Decimal::ONE
            .checked_div(magnitude)
            .ok_or_else(|| DlmmError::QuoteError(format!("bin price underflow at bin {}", bin_id)))
    }
}

/// Base fee rate scaled by 1e9: `base_factor * bin_step * 10 * 10^power_factor`
pub fn base_fee_rate(pool: &PoolState) -> u128 {
    pool.base_factor as u128
        * pool.bin_step as u128
        * 10
        * 10u128.pow(pool.base_fee_power_factor as u32)
}

/// Fee charged on `amount_in`, rounded up
pub fn fee_for(pool: &PoolState, amount_in: u64) -> u64 {
    let rate = base_fee_rate(pool).min(FEE_PRECISION as u128);
    let fee = (amount_in as u128 * rate).div_ceil(FEE_PRECISION as u128);
    fee as u64
}

/// Apply slippage tolerance: `amount * (10_000 - bps) / 10_000`, rounded down
pub fn min_out_with_slippage(amount: u64, slippage_bps: u16) -> u64 {
    let bps = (slippage_bps as u64).min(BASIS_POINT_MAX);
    (amount as u128 * (BASIS_POINT_MAX - bps) as u128 / BASIS_POINT_MAX as u128) as u64
}

pub fn quote_exact_in(
    pool: &PoolState,
    amount_in: u64,
    swap_for_y: bool,
    slippage_bps: u16,
    bin_arrays: Vec<Pubkey>,
) -> Result<SwapQuote, DlmmError> {
    if bin_arrays.is_empty() {
        return Err(DlmmError::InsufficientLiquidity(format!(
            "no bin arrays with liquidity for pool {}",
            pool.address
        )));
    }
    if amount_in == 0 {
        return Err(DlmmError::InvalidParameters("swap amount is zero".to_string()));
    }

    let fee = fee_for(pool, amount_in);
    let net_in = Decimal::from(amount_in - fee);
    let price = bin_price(pool.active_id, pool.bin_step)?;

    let out = if swap_for_y {
        net_in.checked_mul(price)
    } else {
        net_in.checked_div(price)
    }
    .ok_or_else(|| DlmmError::QuoteError("output amount overflow".to_string()))?;

    let out_amount = out
        .floor()
        .to_u64()
        .ok_or_else(|| DlmmError::QuoteError(format!("output amount {} out of range", out)))?;

    Ok(SwapQuote {
        swap_for_y,
        amount_in,
        out_amount,
        min_out_amount: min_out_with_slippage(out_amount, slippage_bps),
        fee,
        bin_arrays,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(active_id: i32, bin_step: u16, base_factor: u16) -> PoolState {
        PoolState {
            address: Pubkey::new_unique(),
            token_x_mint: Pubkey::new_unique(),
            token_y_mint: Pubkey::new_unique(),
            reserve_x: Pubkey::new_unique(),
            reserve_y: Pubkey::new_unique(),
            oracle: Pubkey::new_unique(),
            active_id,
            bin_step,
            base_factor,
            base_fee_power_factor: 0,
        }
    }

    #[test]
    fn test_bin_price() {
        assert_eq!(bin_price(0, 20).unwrap(), Decimal::ONE);
        assert_eq!(bin_price(1, 20).unwrap(), dec!(1.002));
        assert_eq!(bin_price(2, 100).unwrap(), dec!(1.0201));

        let down = bin_price(-1, 100).unwrap();
        assert!((down * dec!(1.01) - Decimal::ONE).abs() < dec!(0.0000000001));
    }

    #[test]
    fn test_base_fee() {
        // 10_000 * 20 * 10 = 2_000_000 / 1e9 = 0.2%
        let p = pool(0, 20, 10_000);
        assert_eq!(base_fee_rate(&p), 2_000_000);
        assert_eq!(fee_for(&p, 1_000_000), 2_000);
        // rounds up
        assert_eq!(fee_for(&p, 1), 1);
    }

    #[test]
    fn test_min_out_with_slippage() {
        assert_eq!(min_out_with_slippage(10_000, 50), 9_950);
        assert_eq!(min_out_with_slippage(10_000, 0), 10_000);
        assert_eq!(min_out_with_slippage(10_000, 20_000), 0);
    }

    #[test]
    fn test_quote_at_unit_price() {
        let p = pool(0, 20, 10_000);
        let quote = quote_exact_in(&p, 1_000_000, true, 50, vec![Pubkey::new_unique()]).unwrap();

        assert_eq!(quote.fee, 2_000);
        assert_eq!(quote.out_amount, 998_000);
        assert_eq!(quote.min_out_amount, 993_010);
    }

    #[test]
    fn test_quote_direction_uses_inverse_price() {
        let p = pool(1, 100, 1);
        let arrays = vec![Pubkey::new_unique()];

        let for_y = quote_exact_in(&p, 1_000_000, true, 0, arrays.clone()).unwrap();
        let for_x = quote_exact_in(&p, 1_000_000, false, 0, arrays).unwrap();
        assert!(for_y.out_amount > for_x.out_amount);
    }

    #[test]
    fn test_quote_without_bin_arrays() {
        let p = pool(0, 20, 10_000);
        assert!(matches!(
            quote_exact_in(&p, 1_000, true, 50, vec![]),
            Err(DlmmError::InsufficientLiquidity(_))
        ));
    }
}
