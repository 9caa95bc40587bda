//! Pool resolution: find the pool for a pair, or create it, with bounded retries.

use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{orient_pair, FarmError, PoolDescriptor, TokenDescriptor};
use crate::ports::{ChainPort, CreatePoolRequest, DlmmPort};

/// Active bin of freshly created pools
const INITIAL_ACTIVE_ID: i32 = 0;

#[derive(Debug, Clone)]
pub struct PoolResolverConfig {
    pub base_factor: u16,
    /// Total attempts, not retries after the first
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub settle_delay: Duration,
}

impl Default for PoolResolverConfig {
    fn default() -> Self {
        Self {
            base_factor: 10_000,
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            settle_delay: Duration::from_secs(2),
        }
    }
}

impl From<&crate::config::PoolSection> for PoolResolverConfig {
    fn from(section: &crate::config::PoolSection) -> Self {
        Self {
            base_factor: section.base_factor,
            max_retries: section.max_retries,
            retry_delay: section.retry_delay(),
            settle_delay: section.settle_delay(),
        }
    }
}

pub struct PoolResolver {
    chain: Arc<dyn ChainPort>,
    dlmm: Arc<dyn DlmmPort>,
    config: PoolResolverConfig,
}

impl PoolResolver {
    pub fn new(chain: Arc<dyn ChainPort>, dlmm: Arc<dyn DlmmPort>, config: PoolResolverConfig) -> Self {
        Self { chain, dlmm, config }
    }

    pub fn config(&self) -> &PoolResolverConfig {
        &self.config
    }

    /// Return the pool for `(token_x, token_y, bin_step)`, creating it if needed.
    ///
    /// Every failure inside an attempt is retried after `retry_delay`, up to
    /// `max_retries` attempts in total. A lost creation race ("already in use")
    /// resolves itself on the next attempt's existence check.
    pub async fn resolve_pool(
        &self,
        payer: &Keypair,
        token_x: &TokenDescriptor,
        token_y: &TokenDescriptor,
        bin_step: u16,
    ) -> Result<PoolDescriptor, FarmError> {
        if self.config.max_retries == 0 {
            return Err(FarmError::Configuration("max_retries must be > 0".to_string()));
        }

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_retries {
            match self.try_resolve(payer, token_x, token_y, bin_step).await {
                Ok(pool) => return Ok(pool),
                Err(e) => {
                    last_error = e.to_string();
                    if last_error.contains("already in use") || last_error.contains("already exists") {
                        tracing::warn!("Pool already exists (attempt {}/{}), re-checking", attempt, self.config.max_retries);
                    } else if last_error.contains("preset_parameter") || last_error.contains("preset parameter") {
                        tracing::error!(
                            "Preset parameter for bin step {} / base factor {} is missing or invalid: {}",
                            bin_step,
                            self.config.base_factor,
                            last_error
                        );
                    } else {
                        tracing::warn!(
                            "Pool resolution attempt {}/{} failed: {}",
                            attempt,
                            self.config.max_retries,
                            last_error
                        );
                    }

                    if attempt < self.config.max_retries {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(FarmError::PoolResolutionExhausted {
            attempts: self.config.max_retries,
            last_error,
        })
    }

    async fn try_resolve(
        &self,
        payer: &Keypair,
        token_x: &TokenDescriptor,
        token_y: &TokenDescriptor,
        bin_step: u16,
    ) -> Result<PoolDescriptor, FarmError> {
        let mint_x = token_x
            .mint()
            .map_err(|e| FarmError::Configuration(format!("{}: {}", token_x.symbol, e)))?;
        let mint_y = token_y
            .mint()
            .map_err(|e| FarmError::Configuration(format!("{}: {}", token_y.symbol, e)))?;

        let address = self
            .dlmm
            .derive_pool_address(&mint_x, &mint_y, bin_step, self.config.base_factor);

        let exists = self
            .chain
            .account_exists(&address)
            .await
            .map_err(|e| FarmError::transaction("pool lookup", e))?;

        if exists {
            match self.dlmm.load_pool(&address).await {
                Ok(state) => match orient_pair(token_x, token_y, &state.token_x_mint, &state.token_y_mint) {
                    Some((x, y, reversed)) => {
                        tracing::info!("Using existing pool {} {}-{}", address, x.symbol, y.symbol);
                        return Ok(PoolDescriptor::new(address, x, y, bin_step, false).with_reversed(reversed));
                    }
                    None => {
                        tracing::warn!(
                            "Account {} holds pool {}/{}, not {}-{}; treating as missing",
                            address,
                            state.token_x_mint,
                            state.token_y_mint,
                            token_x.symbol,
                            token_y.symbol
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!("Account {} exists but is not a usable pool, treating as missing: {}", address, e);
                }
            }
        }

        let preset_parameter = self
            .dlmm
            .derive_preset_parameter(bin_step, self.config.base_factor);
        let request = CreatePoolRequest {
            token_x: mint_x,
            token_y: mint_y,
            bin_step,
            base_factor: self.config.base_factor,
            preset_parameter,
            active_id: INITIAL_ACTIVE_ID,
        };

        tracing::info!(
            "Creating pool {}-{} (bin step {}, base factor {})",
            token_x.symbol,
            token_y.symbol,
            bin_step,
            self.config.base_factor
        );

        let instructions = self
            .dlmm
            .create_pool_instructions(&payer.pubkey(), &request)
            .await
            .map_err(|e| FarmError::transaction("create pool", e))?;

        let signature = self
            .chain
            .send_and_confirm(&instructions, payer, &[])
            .await
            .map_err(|e| FarmError::transaction("create pool", e))?;

        tracing::info!("Pool created: {} | tx {}", address, signature);
        tokio::time::sleep(self.config.settle_delay).await;

        let address = self
            .dlmm
            .derive_pool_address(&mint_x, &mint_y, bin_step, self.config.base_factor);

        Ok(PoolDescriptor::new(address, token_x.clone(), token_y.clone(), bin_step, true))
    }
}
