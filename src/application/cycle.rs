//! One farming cycle: resolve pool, open position, swap N times, close position.
//!
//! The cycle is a straight stage machine. Nothing inside it retries; any stage
//! failure ends the cycle as `FarmError::CycleFailed { stage, .. }`. Once a
//! position is open it is always closed, even when a swap fails.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use serde::Serialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::pool_resolver::PoolResolver;
use crate::config::{Config, PoolSelection, MAX_SWAPS_PER_CYCLE};
use crate::domain::{
    random_int, random_wait, select_bin_step, select_token_pair, symmetric_bin_range, CycleStage,
    FarmError, PoolDescriptor, PositionHandle, RangeInclusive, SwapDirection, SwapReceipt,
    TokenDescriptor,
};
use crate::ports::{ChainPort, DlmmError, DlmmPort, OpenPositionRequest, PoolState};

/// Cycle parameters, resolved from configuration once at startup
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Skip resolution and always farm this pool
    pub fixed_pool: Option<Pubkey>,
    pub tokens: Vec<TokenDescriptor>,
    pub bin_steps: Vec<u16>,
    pub selection: PoolSelection,
    pub bin_half_width: i32,
    pub liquidity_x: Decimal,
    pub liquidity_y: Decimal,
    pub swaps_per_cycle: RangeInclusive,
    pub initial_swap_amount: Decimal,
    pub slippage_bps: u16,
    pub wait_between_swaps_ms: Option<RangeInclusive>,
    pub wait_between_cycles_ms: RangeInclusive,
}

impl CycleConfig {
    pub fn from_config(config: &Config) -> Result<Self, FarmError> {
        let fixed_pool = config
            .pool
            .address
            .as_deref()
            .map(Pubkey::from_str)
            .transpose()
            .map_err(|e| FarmError::Configuration(format!("pool address: {}", e)))?;

        Ok(Self {
            fixed_pool,
            tokens: config.tokens.clone(),
            bin_steps: config.pool.bin_steps.clone(),
            selection: config.pool.selection,
            bin_half_width: config.pool.bin_half_width,
            liquidity_x: config.liquidity.token_x_amount,
            liquidity_y: config.liquidity.token_y_amount,
            swaps_per_cycle: config.swap.swaps_per_cycle,
            initial_swap_amount: config.swap.initial_amount,
            slippage_bps: config.swap.slippage_bps,
            wait_between_swaps_ms: config.swap.wait_between_swaps_ms,
            wait_between_cycles_ms: config.cycle.wait_between_cycles_ms,
        })
    }
}

/// Everything a successful cycle did
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub pool: PoolDescriptor,
    pub position: PositionHandle,
    pub swaps: Vec<SwapReceipt>,
    pub removal_signature: String,
    /// Wait before the next cycle
    #[serde(with = "duration_ms")]
    pub next_delay: Duration,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

fn dlmm_error(operation: &str, err: DlmmError) -> FarmError {
    match err {
        DlmmError::InsufficientLiquidity(msg) => FarmError::InsufficientLiquidity(msg),
        other => FarmError::transaction(operation, other),
    }
}

pub struct PositionCycleController {
    chain: Arc<dyn ChainPort>,
    dlmm: Arc<dyn DlmmPort>,
    resolver: PoolResolver,
    config: CycleConfig,
    rng: Mutex<StdRng>,
}

impl PositionCycleController {
    pub fn new(
        chain: Arc<dyn ChainPort>,
        dlmm: Arc<dyn DlmmPort>,
        resolver: PoolResolver,
        config: CycleConfig,
    ) -> Self {
        Self {
            chain,
            dlmm,
            resolver,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic randomness for tests and replays
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// Run one full cycle with `wallet` paying and signing
    pub async fn run_cycle(&self, wallet: &Keypair) -> Result<CycleOutcome, FarmError> {
        tracing::info!("Step 1: resolving pool");
        let pool = self
            .resolve_pool(wallet)
            .await
            .map_err(|e| e.at_stage(CycleStage::ResolvePool))?;
        if pool.is_new {
            tracing::info!("Created new pool: {}", pool);
        } else {
            tracing::info!("Using existing pool: {}", pool);
        }

        tracing::info!("Step 2: opening position");
        let position = self
            .open_position(wallet, &pool)
            .await
            .map_err(|e| e.at_stage(CycleStage::OpenPosition))?;

        tracing::info!("Step 3: swapping");
        let swap_result = self.run_swaps(wallet, &pool).await;

        tracing::info!("Step 4: removing liquidity");
        let removal = self
            .close_position(wallet, &pool, &position)
            .await
            .map_err(|e| e.at_stage(CycleStage::ClosePosition));

        match (swap_result, removal) {
            (Ok(swaps), Ok(removal_signature)) => {
                let next_delay =
                    self.with_rng(|rng| random_wait(rng, self.config.wait_between_cycles_ms));
                tracing::info!(
                    "Cycle complete on {}: {} swaps, next cycle in {}s",
                    pool.pair_label(),
                    swaps.len(),
                    next_delay.as_secs()
                );
                Ok(CycleOutcome {
                    pool,
                    position,
                    swaps,
                    removal_signature,
                    next_delay,
                })
            }
            (Ok(swaps), Err(close_err)) => {
                tracing::error!(
                    "Position {} could not be closed after {} swaps",
                    position.address,
                    swaps.len()
                );
                Err(close_err)
            }
            (Err(swap_err), Ok(_)) => Err(swap_err),
            (Err(swap_err), Err(close_err)) => {
                tracing::error!(
                    "Cleanup of position {} failed after swap error: {}",
                    position.address,
                    close_err
                );
                Err(swap_err)
            }
        }
    }

    async fn resolve_pool(&self, wallet: &Keypair) -> Result<PoolDescriptor, FarmError> {
        match self.config.fixed_pool {
            Some(address) => self.fixed_pool(&address).await,
            None => {
                let (token_x, token_y, bin_step) = self.pick_pair()?;
                self.resolver.resolve_pool(wallet, &token_x, &token_y, bin_step).await
            }
        }
    }

    /// Describe the fixed pool from its own mints. Both must be configured tokens;
    /// the one listed first in configuration owns `token_x_amount`.
    async fn fixed_pool(&self, address: &Pubkey) -> Result<PoolDescriptor, FarmError> {
        let state = self
            .dlmm
            .load_pool(address)
            .await
            .map_err(|e| dlmm_error("load pool", e))?;

        let position_of = |mint: &Pubkey| {
            self.config
                .tokens
                .iter()
                .position(|token| token.mint().ok().as_ref() == Some(mint))
        };
        match (position_of(&state.token_x_mint), position_of(&state.token_y_mint)) {
            (Some(ix), Some(iy)) if ix != iy => {
                let x = self.config.tokens[ix].clone();
                let y = self.config.tokens[iy].clone();
                Ok(PoolDescriptor::new(*address, x, y, state.bin_step, false).with_reversed(ix > iy))
            }
            _ => Err(FarmError::Configuration(format!(
                "pool {} holds mints {} / {}, which are not both configured tokens",
                address, state.token_x_mint, state.token_y_mint
            ))),
        }
    }

    fn pick_pair(&self) -> Result<(TokenDescriptor, TokenDescriptor, u16), FarmError> {
        let picked = match self.config.selection {
            PoolSelection::First => match (self.config.tokens.first(), self.config.tokens.get(1)) {
                (Some(x), Some(y)) => self
                    .config
                    .bin_steps
                    .first()
                    .map(|step| (x.clone(), y.clone(), *step)),
                _ => None,
            },
            PoolSelection::Random => self.with_rng(|rng| {
                let (x, y) = select_token_pair(rng, &self.config.tokens)?;
                let step = select_bin_step(rng, &self.config.bin_steps)?;
                Some((x.clone(), y.clone(), step))
            }),
        };

        picked.ok_or_else(|| {
            FarmError::Configuration("need at least two tokens and one bin step".to_string())
        })
    }

    async fn load_state(&self, pool: &PoolDescriptor) -> Result<PoolState, FarmError> {
        self.dlmm
            .load_pool(&pool.address)
            .await
            .map_err(|e| dlmm_error("load pool", e))
    }

    async fn open_position(&self, wallet: &Keypair, pool: &PoolDescriptor) -> Result<PositionHandle, FarmError> {
        let state = self.load_state(pool).await?;
        let (lower, upper) = symmetric_bin_range(state.active_id, self.config.bin_half_width);

        // Configured amounts follow the configured pair, not the pool's storage order
        let (ui_x, ui_y) = pool.to_pool_order(self.config.liquidity_x, self.config.liquidity_y);
        let amount_x = pool
            .token_x
            .to_raw(ui_x)
            .map_err(|e| FarmError::Configuration(e.to_string()))?;
        let amount_y = pool
            .token_y
            .to_raw(ui_y)
            .map_err(|e| FarmError::Configuration(e.to_string()))?;

        let position_keypair = Keypair::new();
        tracing::info!(
            "Adding liquidity to {} | {} {} + {} {} over bins [{}, {}] (active {}) | position {}",
            pool.pair_label(),
            ui_x,
            pool.token_x.symbol,
            ui_y,
            pool.token_y.symbol,
            lower,
            upper,
            state.active_id,
            position_keypair.pubkey()
        );

        let request = OpenPositionRequest {
            position: position_keypair.pubkey(),
            user: wallet.pubkey(),
            amount_x,
            amount_y,
            min_bin_id: lower,
            max_bin_id: upper,
        };
        let instructions = self
            .dlmm
            .open_position_instructions(&state, &request)
            .await
            .map_err(|e| dlmm_error("open position", e))?;

        let signature = self
            .chain
            .send_and_confirm(&instructions, wallet, &[&position_keypair])
            .await
            .map_err(|e| FarmError::transaction("open position", e))?;

        tracing::info!("Liquidity added | tx {}", signature);
        Ok(PositionHandle::new(position_keypair.pubkey(), signature, lower, upper))
    }

    /// Swap input chains: swap i sells what swap i-1 received
    async fn run_swaps(&self, wallet: &Keypair, pool: &PoolDescriptor) -> Result<Vec<SwapReceipt>, FarmError> {
        let range = self.config.swaps_per_cycle;
        let drawn = self.with_rng(|rng| random_int(rng, range.min, range.max));
        let total = u32::try_from(drawn)
            .ok()
            .filter(|total| *total <= MAX_SWAPS_PER_CYCLE)
            .ok_or_else(|| {
                FarmError::Configuration(format!(
                    "swaps_per_cycle draw {} exceeds {}",
                    drawn, MAX_SWAPS_PER_CYCLE
                ))
                .at_stage(CycleStage::Swap { index: 0, total: 0 })
            })?;

        // The chain starts by selling the first configured token
        let mut amount = pool
            .first_token()
            .to_raw(self.config.initial_swap_amount)
            .map_err(|e| FarmError::Configuration(e.to_string()).at_stage(CycleStage::Swap { index: 0, total }))?;

        let mut receipts = Vec::with_capacity(total as usize);
        for index in 0..total {
            let direction = pool.swap_direction(index);
            tracing::info!("Swap {}/{} {} | amount in {}", index + 1, total, direction, amount);

            let receipt = self
                .swap_once(wallet, pool, index, direction, amount)
                .await
                .map_err(|e| e.at_stage(CycleStage::Swap { index, total }))?;

            amount = receipt.amount_out;
            receipts.push(receipt);

            if let Some(window) = self.config.wait_between_swaps_ms {
                if index + 1 < total {
                    let wait = self.with_rng(|rng| random_wait(rng, window));
                    tracing::debug!("Waiting {}ms before next swap", wait.as_millis());
                    tokio::time::sleep(wait).await;
                }
            }
        }

        Ok(receipts)
    }

    async fn swap_once(
        &self,
        wallet: &Keypair,
        pool: &PoolDescriptor,
        index: u32,
        direction: SwapDirection,
        amount_in: u64,
    ) -> Result<SwapReceipt, FarmError> {
        let state = self.load_state(pool).await?;
        let swap_for_y = direction.swap_for_y();

        let bin_arrays = self
            .dlmm
            .bin_arrays_for_swap(&state, swap_for_y)
            .await
            .map_err(|e| dlmm_error("swap", e))?;
        if bin_arrays.is_empty() {
            return Err(FarmError::InsufficientLiquidity(format!(
                "no bin arrays to swap {} in pool {}",
                direction, pool.address
            )));
        }

        let quote = self
            .dlmm
            .swap_quote(&state, amount_in, swap_for_y, self.config.slippage_bps, bin_arrays)
            .map_err(|e| dlmm_error("swap quote", e))?;

        let instructions = self
            .dlmm
            .swap_instructions(&state, &wallet.pubkey(), &quote)
            .await
            .map_err(|e| dlmm_error("swap", e))?;

        let signature = self
            .chain
            .send_and_confirm(&instructions, wallet, &[])
            .await
            .map_err(|e| FarmError::transaction("swap", e))?;

        let (sold, bought) = if swap_for_y {
            (&pool.token_x, &pool.token_y)
        } else {
            (&pool.token_y, &pool.token_x)
        };
        tracing::info!(
            "Swapped {} {} -> at least {} {} | tx {}",
            sold.to_ui(amount_in),
            sold.symbol,
            bought.to_ui(quote.min_out_amount),
            bought.symbol,
            signature
        );

        Ok(SwapReceipt {
            index,
            direction,
            amount_in,
            amount_out: quote.min_out_amount,
            signature: signature.to_string(),
        })
    }

    async fn close_position(
        &self,
        wallet: &Keypair,
        pool: &PoolDescriptor,
        position: &PositionHandle,
    ) -> Result<String, FarmError> {
        let state = self.load_state(pool).await?;
        let instructions = self
            .dlmm
            .remove_liquidity_instructions(&state, &wallet.pubkey(), position)
            .await
            .map_err(|e| dlmm_error("remove liquidity", e))?;

        let signature = self
            .chain
            .send_and_confirm(&instructions, wallet, &[])
            .await
            .map_err(|e| FarmError::transaction("remove liquidity", e))?;

        tracing::info!("Liquidity removed and position {} closed | tx {}", position.address, signature);
        Ok(signature.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::pool_resolver::PoolResolverConfig;
    use crate::domain::RawAccount;
    use crate::ports::mocks::{MockChain, MockDlmm};
    use rust_decimal_macros::dec;

    pub(crate) fn usdc() -> TokenDescriptor {
        TokenDescriptor::new("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6)
    }

    pub(crate) fn sol() -> TokenDescriptor {
        TokenDescriptor::new("SOL", "So11111111111111111111111111111111111111112", 9)
    }

    pub(crate) fn mock_dlmm(active_id: i32) -> MockDlmm {
        let mut state = MockDlmm::with_active_id(active_id).pool().clone();
        state.token_x_mint = usdc().mint().unwrap();
        state.token_y_mint = sol().mint().unwrap();
        MockDlmm::new(state)
    }

    pub(crate) fn cycle_config(fixed_pool: Option<Pubkey>, swaps: u64) -> CycleConfig {
        CycleConfig {
            fixed_pool,
            tokens: vec![usdc(), sol()],
            bin_steps: vec![20],
            selection: PoolSelection::First,
            bin_half_width: 10,
            liquidity_x: dec!(0.3),
            liquidity_y: dec!(0.001),
            swaps_per_cycle: RangeInclusive::new(swaps, swaps),
            initial_swap_amount: dec!(0.01),
            slippage_bps: 50,
            wait_between_swaps_ms: None,
            wait_between_cycles_ms: RangeInclusive::new(10, 20),
        }
    }

    pub(crate) fn controller(
        chain: Arc<MockChain>,
        dlmm: Arc<MockDlmm>,
        config: CycleConfig,
    ) -> PositionCycleController {
        let resolver = PoolResolver::new(
            chain.clone(),
            dlmm.clone(),
            PoolResolverConfig {
                base_factor: 10_000,
                max_retries: 2,
                retry_delay: Duration::from_millis(1),
                settle_delay: Duration::from_millis(1),
            },
        );
        PositionCycleController::new(chain, dlmm, resolver, config).with_seed(42)
    }

    #[tokio::test]
    async fn test_swap_amounts_chain() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(mock_dlmm(100).with_rate(3, 2));
        let pool = dlmm.pool().address;
        let cycle = controller(chain, dlmm.clone(), cycle_config(Some(pool), 3));

        let outcome = cycle.run_cycle(&Keypair::new()).await.unwrap();

        assert_eq!(outcome.swaps.len(), 3);
        // 0.01 USDC at 6 decimals
        assert_eq!(outcome.swaps[0].amount_in, 10_000);
        assert_eq!(outcome.swaps[1].amount_in, outcome.swaps[0].amount_out);
        assert_eq!(outcome.swaps[2].amount_in, outcome.swaps[1].amount_out);

        let directions: Vec<SwapDirection> = outcome.swaps.iter().map(|s| s.direction).collect();
        assert_eq!(directions, vec![SwapDirection::XToY, SwapDirection::YToX, SwapDirection::XToY]);

        // Received amount is the quote's slippage-adjusted minimum
        let quotes = dlmm.quotes();
        assert_eq!(outcome.swaps[0].amount_out, quotes[0].min_out_amount);
        assert_eq!(quotes[0].min_out_amount, 14_925);
    }

    #[tokio::test]
    async fn test_position_range_centered_on_active_bin() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(mock_dlmm(100));
        let pool = dlmm.pool().address;
        let cycle = controller(chain.clone(), dlmm, cycle_config(Some(pool), 1));

        let outcome = cycle.run_cycle(&Keypair::new()).await.unwrap();

        assert_eq!(outcome.position.lower_bin_id, 90);
        assert_eq!(outcome.position.upper_bin_id, 110);
        assert!(!outcome.pool.is_new);
        assert_eq!(chain.sent_with_tag(b"open_position"), 1);
        assert_eq!(chain.sent_with_tag(b"remove_liquidity"), 1);
        assert!(outcome.next_delay >= Duration::from_millis(10));
        assert!(outcome.next_delay <= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_swap_failure_still_closes_position() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(mock_dlmm(0).with_failing_swap_call(1));
        let pool = dlmm.pool().address;
        let cycle = controller(chain.clone(), dlmm.clone(), cycle_config(Some(pool), 3));

        let err = cycle.run_cycle(&Keypair::new()).await.unwrap_err();

        assert_eq!(err.stage(), Some(CycleStage::Swap { index: 1, total: 3 }));
        assert_eq!(dlmm.call_count("remove_liquidity"), 1);
        assert_eq!(chain.sent_with_tag(b"remove_liquidity"), 1);
        // Swap 3 never ran
        assert_eq!(dlmm.call_count("swap"), 2);
    }

    #[tokio::test]
    async fn test_swap_error_reported_when_cleanup_also_fails() {
        let chain = Arc::new(MockChain::new().with_failing_tag(b"remove_liquidity", "position locked"));
        let dlmm = Arc::new(mock_dlmm(0).with_all_swaps_failing());
        let pool = dlmm.pool().address;
        let cycle = controller(chain, dlmm, cycle_config(Some(pool), 2));

        let err = cycle.run_cycle(&Keypair::new()).await.unwrap_err();
        assert_eq!(err.stage(), Some(CycleStage::Swap { index: 0, total: 2 }));
    }

    #[tokio::test]
    async fn test_close_failure_alone_is_reported() {
        let chain = Arc::new(MockChain::new().with_failing_tag(b"remove_liquidity", "position locked"));
        let dlmm = Arc::new(mock_dlmm(0));
        let pool = dlmm.pool().address;
        let cycle = controller(chain, dlmm, cycle_config(Some(pool), 2));

        let err = cycle.run_cycle(&Keypair::new()).await.unwrap_err();
        assert_eq!(err.stage(), Some(CycleStage::ClosePosition));
        assert!(err.to_string().contains("position locked"));
    }

    #[tokio::test]
    async fn test_no_liquidity_fails_first_swap() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(mock_dlmm(0).without_liquidity());
        let pool = dlmm.pool().address;
        let cycle = controller(chain, dlmm.clone(), cycle_config(Some(pool), 2));

        let err = cycle.run_cycle(&Keypair::new()).await.unwrap_err();

        assert_eq!(err.stage(), Some(CycleStage::Swap { index: 0, total: 2 }));
        match err {
            FarmError::CycleFailed { source, .. } => {
                assert!(matches!(*source, FarmError::InsufficientLiquidity(_)))
            }
            other => panic!("expected CycleFailed, got {:?}", other),
        }
        assert_eq!(dlmm.call_count("remove_liquidity"), 1);
    }

    #[tokio::test]
    async fn test_open_failure_skips_swaps_and_close() {
        let chain = Arc::new(MockChain::new().with_failing_tag(b"open_position", "insufficient funds"));
        let dlmm = Arc::new(mock_dlmm(0));
        let pool = dlmm.pool().address;
        let cycle = controller(chain, dlmm.clone(), cycle_config(Some(pool), 2));

        let err = cycle.run_cycle(&Keypair::new()).await.unwrap_err();

        assert_eq!(err.stage(), Some(CycleStage::OpenPosition));
        assert_eq!(dlmm.call_count("swap"), 0);
        assert_eq!(dlmm.call_count("remove_liquidity"), 0);
    }

    #[tokio::test]
    async fn test_resolution_creates_missing_pool() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(mock_dlmm(0));
        let cycle = controller(chain.clone(), dlmm.clone(), cycle_config(None, 1));

        let outcome = cycle.run_cycle(&Keypair::new()).await.unwrap();

        assert!(outcome.pool.is_new);
        assert_eq!(outcome.pool.address, dlmm.pool().address);
        assert_eq!(chain.sent_with_tag(b"create_pool"), 1);
    }

    #[tokio::test]
    async fn test_resolution_uses_existing_pool() {
        let dlmm = Arc::new(mock_dlmm(0));
        let chain = Arc::new(MockChain::new().with_account(RawAccount {
            address: dlmm.pool().address,
            owner: Pubkey::new_unique(),
            lamports: 1,
            data: vec![0u8; 8],
        }));
        let cycle = controller(chain.clone(), dlmm.clone(), cycle_config(None, 1));

        let outcome = cycle.run_cycle(&Keypair::new()).await.unwrap();

        assert!(!outcome.pool.is_new);
        assert_eq!(chain.sent_with_tag(b"create_pool"), 0);
    }

    #[tokio::test]
    async fn test_exhausted_resolution_fails_at_resolve_stage() {
        let chain = Arc::new(MockChain::new().with_failing_tag(b"create_pool", "preset_parameter not initialized"));
        let dlmm = Arc::new(mock_dlmm(0));
        let cycle = controller(chain.clone(), dlmm.clone(), cycle_config(None, 1));

        let err = cycle.run_cycle(&Keypair::new()).await.unwrap_err();

        assert_eq!(err.stage(), Some(CycleStage::ResolvePool));
        assert_eq!(chain.sent_with_tag(b"create_pool"), 2);
        assert_eq!(dlmm.call_count("open_position"), 0);
    }

    #[tokio::test]
    async fn test_zero_swaps_still_round_trips_position() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(mock_dlmm(0));
        let pool = dlmm.pool().address;
        let cycle = controller(chain.clone(), dlmm, cycle_config(Some(pool), 0));

        let outcome = cycle.run_cycle(&Keypair::new()).await.unwrap();
        assert!(outcome.swaps.is_empty());
        assert_eq!(chain.sent().len(), 2);
    }

    fn reversed_dlmm() -> MockDlmm {
        let mut state = MockDlmm::with_active_id(0).pool().clone();
        state.token_x_mint = sol().mint().unwrap();
        state.token_y_mint = usdc().mint().unwrap();
        MockDlmm::new(state)
    }

    #[tokio::test]
    async fn test_reversed_pool_keeps_amounts_with_their_tokens() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(reversed_dlmm());
        let pool = dlmm.pool().address;
        let cycle = controller(chain, dlmm.clone(), cycle_config(Some(pool), 2));

        let outcome = cycle.run_cycle(&Keypair::new()).await.unwrap();

        assert_eq!(outcome.pool.pair_label(), "SOL-USDC");
        assert!(outcome.pool.reversed);

        // 0.3 USDC and 0.001 SOL, on the pool's sides
        let opened = dlmm.open_requests();
        assert_eq!(opened[0].amount_x, 1_000_000);
        assert_eq!(opened[0].amount_y, 300_000);

        // The chain still starts by selling 0.01 USDC, which is the pool's Y
        assert_eq!(outcome.swaps[0].direction, SwapDirection::YToX);
        assert_eq!(outcome.swaps[0].amount_in, 10_000);
        assert_eq!(outcome.swaps[1].direction, SwapDirection::XToY);
        assert_eq!(outcome.swaps[1].amount_in, outcome.swaps[0].amount_out);
        assert!(!dlmm.quotes()[0].swap_for_y);
    }

    #[tokio::test]
    async fn test_fixed_pool_pair_comes_from_pool_mints() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(mock_dlmm(0));
        let pool = dlmm.pool().address;
        let mut config = cycle_config(Some(pool), 1);
        config.tokens = vec![
            usdc(),
            TokenDescriptor::new("BONK", "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", 5),
            sol(),
        ];
        config.selection = PoolSelection::Random;
        let cycle = controller(chain, dlmm.clone(), config);

        for _ in 0..20 {
            let outcome = cycle.run_cycle(&Keypair::new()).await.unwrap();
            assert_eq!(outcome.pool.pair_label(), "USDC-SOL");
            assert!(!outcome.pool.reversed);
        }
        assert!(dlmm.open_requests().iter().all(|r| r.amount_x == 300_000 && r.amount_y == 1_000_000));
    }

    #[tokio::test]
    async fn test_fixed_pool_of_unconfigured_tokens_rejected() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(MockDlmm::with_active_id(0));
        let pool = dlmm.pool().address;
        let cycle = controller(chain.clone(), dlmm.clone(), cycle_config(Some(pool), 1));

        let err = cycle.run_cycle(&Keypair::new()).await.unwrap_err();

        assert_eq!(err.stage(), Some(CycleStage::ResolvePool));
        match err {
            FarmError::CycleFailed { source, .. } => {
                assert!(matches!(*source, FarmError::Configuration(_)))
            }
            other => panic!("expected CycleFailed, got {:?}", other),
        }
        assert_eq!(dlmm.call_count("open_position"), 0);
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_swap_count_rejected_and_position_closed() {
        let chain = Arc::new(MockChain::new());
        let dlmm = Arc::new(mock_dlmm(0));
        let pool = dlmm.pool().address;
        let cycle = controller(chain, dlmm.clone(), cycle_config(Some(pool), u32::MAX as u64 + 1));

        let err = cycle.run_cycle(&Keypair::new()).await.unwrap_err();

        assert_eq!(err.stage(), Some(CycleStage::Swap { index: 0, total: 0 }));
        assert!(err.to_string().contains("exceeds"));
        assert_eq!(dlmm.call_count("swap"), 0);
        assert_eq!(dlmm.call_count("remove_liquidity"), 1);
    }
}
