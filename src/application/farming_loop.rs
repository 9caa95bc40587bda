//! Farming Loop
//!
//! Drives the cycle controller until stopped: rotate wallet, run one cycle,
//! then sleep the cycle's delay on success or the error backoff on failure.
//! A failed cycle is logged and the loop carries on.

use chrono::{DateTime, Utc};
use solana_sdk::signature::Signer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

use super::cycle::PositionCycleController;
use super::wallet_rotator::WalletRotator;

#[derive(Debug, Default)]
struct LoopCounters {
    iterations: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    swaps: AtomicU64,
}

/// Status snapshot of the farming loop
#[derive(Debug, Clone)]
pub struct FarmingStatus {
    pub is_running: bool,
    pub iterations: u64,
    pub successes: u64,
    pub failures: u64,
    pub swaps: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct FarmingLoop {
    controller: Arc<PositionCycleController>,
    rotator: Arc<WalletRotator>,
    wait_after_error: Duration,
    max_cycles: Option<u64>,
    is_running: Arc<RwLock<bool>>,
    shutdown: Arc<Notify>,
    counters: Arc<LoopCounters>,
    started_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    last_error: Arc<RwLock<Option<String>>>,
}

impl FarmingLoop {
    pub fn new(
        controller: Arc<PositionCycleController>,
        rotator: Arc<WalletRotator>,
        wait_after_error: Duration,
    ) -> Self {
        Self {
            controller,
            rotator,
            wait_after_error,
            max_cycles: None,
            is_running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
            counters: Arc::new(LoopCounters::default()),
            started_at: Arc::new(RwLock::new(None)),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Stop after this many cycles instead of running until stopped
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Run the farming loop until `stop` is called
    pub async fn run(&self) {
        *self.is_running.write().await = true;
        *self.started_at.write().await = Some(Utc::now());

        tracing::info!(
            "Starting farming loop - {} wallet(s), error backoff {:?}",
            self.rotator.len(),
            self.wait_after_error
        );

        while *self.is_running.read().await {
            let wait = self.iteration().await;

            if let Some(max) = self.max_cycles {
                if self.counters.iterations.load(Ordering::SeqCst) >= max {
                    tracing::info!("Reached {} cycles", max);
                    break;
                }
            }
            if !*self.is_running.read().await {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.shutdown.notified() => {}
            }
        }

        *self.is_running.write().await = false;
        tracing::info!("Farming loop stopped");
    }

    /// One wallet rotation plus one cycle. Returns how long to wait before the next.
    async fn iteration(&self) -> Duration {
        let iteration = self.counters.iterations.fetch_add(1, Ordering::SeqCst) + 1;
        let wallet = self.rotator.next();
        tracing::info!("=== Cycle #{} | wallet {} ===", iteration, wallet.pubkey());

        match self.controller.run_cycle(&wallet).await {
            Ok(outcome) => {
                self.counters.successes.fetch_add(1, Ordering::SeqCst);
                self.counters
                    .swaps
                    .fetch_add(outcome.swaps.len() as u64, Ordering::SeqCst);
                tracing::info!(
                    "Cycle #{} done | pool {} | {} swaps | waiting {}s",
                    iteration,
                    outcome.pool.address,
                    outcome.swaps.len(),
                    outcome.next_delay.as_secs()
                );
                outcome.next_delay
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::SeqCst);
                tracing::error!(
                    "Cycle #{} failed: {} | retrying in {}s",
                    iteration,
                    e,
                    self.wait_after_error.as_secs()
                );
                *self.last_error.write().await = Some(e.to_string());
                self.wait_after_error
            }
        }
    }

    /// Stop the loop at the next await point; wakes any pending sleep
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        self.shutdown.notify_one();
        tracing::info!("Stop signal sent to farming loop");
    }

    /// Get current status snapshot
    pub async fn status(&self) -> FarmingStatus {
        FarmingStatus {
            is_running: *self.is_running.read().await,
            iterations: self.counters.iterations.load(Ordering::SeqCst),
            successes: self.counters.successes.load(Ordering::SeqCst),
            failures: self.counters.failures.load(Ordering::SeqCst),
            swaps: self.counters.swaps.load(Ordering::SeqCst),
            started_at: *self.started_at.read().await,
            last_error: self.last_error.read().await.clone(),
        }
    }
}

// Clones share the running flag and counters, so a signal handler can stop the loop
impl Clone for FarmingLoop {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            rotator: Arc::clone(&self.rotator),
            wait_after_error: self.wait_after_error,
            max_cycles: self.max_cycles,
            is_running: Arc::clone(&self.is_running),
            shutdown: Arc::clone(&self.shutdown),
            counters: Arc::clone(&self.counters),
            started_at: Arc::clone(&self.started_at),
            last_error: Arc::clone(&self.last_error),
        }
    }
}
