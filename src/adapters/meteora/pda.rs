//! Program derived addresses of the Meteora DLMM (lb_clmm) program.

use solana_sdk::{pubkey, pubkey::Pubkey};

pub const LB_CLMM_PROGRAM_ID: Pubkey = pubkey!("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9t2ZSaQ4V");

/// Bins stored per bin array account
pub const BINS_PER_ARRAY: i32 = 70;

/// Widest range a single position may cover
pub const MAX_BINS_PER_POSITION: i32 = 70;

/// Canonical ordering of a mint pair, smaller key first
pub fn sort_mints<'a>(a: &'a Pubkey, b: &'a Pubkey) -> (&'a Pubkey, &'a Pubkey) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Permissionless pool address. Same result whichever order the mints are passed in.
pub fn derive_lb_pair(token_x: &Pubkey, token_y: &Pubkey, bin_step: u16, base_factor: u16) -> Pubkey {
    let (min, max) = sort_mints(token_x, token_y);
    Pubkey::find_program_address(
        &[
            min.as_ref(),
            max.as_ref(),
            &bin_step.to_le_bytes(),
            &base_factor.to_le_bytes(),
        ],
        &LB_CLMM_PROGRAM_ID,
    )
    .0
}

pub fn derive_preset_parameter(bin_step: u16, base_factor: u16) -> Pubkey {
    Pubkey::find_program_address(
        &[
            b"preset_parameter",
            &bin_step.to_le_bytes(),
            &base_factor.to_le_bytes(),
        ],
        &LB_CLMM_PROGRAM_ID,
    )
    .0
}

/// Token vault of the pool for `mint`
pub fn derive_reserve(lb_pair: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[lb_pair.as_ref(), mint.as_ref()], &LB_CLMM_PROGRAM_ID).0
}

pub fn derive_oracle(lb_pair: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"oracle", lb_pair.as_ref()], &LB_CLMM_PROGRAM_ID).0
}

pub fn derive_bin_array_bitmap_extension(lb_pair: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"bitmap", lb_pair.as_ref()], &LB_CLMM_PROGRAM_ID).0
}

pub fn derive_event_authority() -> Pubkey {
    Pubkey::find_program_address(&[b"__event_authority"], &LB_CLMM_PROGRAM_ID).0
}

/// Index of the bin array holding `bin_id` (floor division, negative ids round down)
pub fn bin_id_to_bin_array_index(bin_id: i32) -> i64 {
    bin_id.div_euclid(BINS_PER_ARRAY) as i64
}

pub fn derive_bin_array(lb_pair: &Pubkey, index: i64) -> Pubkey {
    Pubkey::find_program_address(
        &[b"bin_array", lb_pair.as_ref(), &index.to_le_bytes()],
        &LB_CLMM_PROGRAM_ID,
    )
    .0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lb_pair_is_order_independent() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();

        assert_eq!(derive_lb_pair(&a, &b, 20, 10_000), derive_lb_pair(&b, &a, 20, 10_000));
    }

    #[test]
    fn test_lb_pair_depends_on_parameters() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();

        let base = derive_lb_pair(&a, &b, 20, 10_000);
        assert_ne!(base, derive_lb_pair(&a, &b, 25, 10_000));
        assert_ne!(base, derive_lb_pair(&a, &b, 20, 8_000));
    }

    #[test]
    fn test_bin_array_index() {
        assert_eq!(bin_id_to_bin_array_index(0), 0);
        assert_eq!(bin_id_to_bin_array_index(69), 0);
        assert_eq!(bin_id_to_bin_array_index(70), 1);
        assert_eq!(bin_id_to_bin_array_index(-1), -1);
        assert_eq!(bin_id_to_bin_array_index(-70), -1);
        assert_eq!(bin_id_to_bin_array_index(-71), -2);
    }

    #[test]
    fn test_bin_arrays_are_distinct_per_index() {
        let pair = Pubkey::new_unique();
        assert_ne!(derive_bin_array(&pair, 0), derive_bin_array(&pair, -1));
    }

    #[test]
    fn test_program_id() {
        assert_eq!(
            LB_CLMM_PROGRAM_ID.to_string(),
            "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9t2ZSaQ4V"
        );
    }
}
