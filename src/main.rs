//! Meteora Farmer - DLMM liquidity farming bot
//!
//! Opens a position, swaps back and forth, withdraws and repeats.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meteora_farmer::adapters::cli::{self, CliApp, Command, FarmCmd, MintCmd, RecoverCmd, StatusCmd};
use meteora_farmer::adapters::solana::{load_wallets, SolanaClient, WalletManager};
use meteora_farmer::adapters::MeteoraDlmmClient;
use meteora_farmer::application::{
    CycleConfig, FarmingLoop, PoolResolver, PoolResolverConfig, PositionCycleController,
    RecoveryService, TokenMinter, WalletRotator,
};
use meteora_farmer::config::{load_config, Config, LoggingSection};
use meteora_farmer::domain::{ui_to_raw, RecoveryReport, LAMPORTS_PER_SOL};
use meteora_farmer::ports::{ChainPort, DlmmPort};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in the TOML)
    dotenvy::dotenv().ok();

    let app = cli::init();
    let config = load_config(&app.config)
        .with_context(|| format!("Failed to load configuration from {}", app.config.display()))?;
    init_logging(&config.logging, app.verbose, app.debug)?;

    match app.command() {
        Command::Farm(cmd) => farm_command(&app, cmd, config).await,
        Command::Recover(cmd) => recover_command(cmd, config).await,
        Command::Mint(cmd) => mint_command(cmd, config).await,
        Command::Status(cmd) => status_command(cmd, config).await,
    }
}

/// Console layer plus an optional append-only file layer without ANSI colors
fn init_logging(logging: &LoggingSection, verbose: bool, debug: bool) -> Result<()> {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match &logging.log_file {
        Some(path) => {
            if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            Some(fmt::layer().with_ansi(false).with_target(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(())
}

fn rpc_client(config: &Config, rpc_override: Option<String>) -> Arc<SolanaClient> {
    let url = rpc_override.unwrap_or_else(|| config.solana.get_rpc_url());
    Arc::new(SolanaClient::with_commitment(url, &config.solana.commitment))
}

fn wallets(config: &Config) -> Result<Vec<WalletManager>> {
    load_wallets(&config.wallets.get_private_keys(), &config.wallets.keypair_paths)
        .context("Failed to load wallets")
}

async fn farm_command(app: &CliApp, cmd: FarmCmd, config: Config) -> Result<()> {
    tracing::info!("Starting Meteora farmer...");
    tracing::info!("Config: {}", app.config.display());

    let solana = rpc_client(&config, cmd.rpc_url);
    tracing::info!("RPC: {}", solana.rpc_url());
    let chain: Arc<dyn ChainPort> = solana;
    let dlmm: Arc<dyn DlmmPort> = Arc::new(MeteoraDlmmClient::new(chain.clone()));

    let rotator = Arc::new(WalletRotator::from_managers(wallets(&config)?)?);
    for (i, key) in rotator.pubkeys().iter().enumerate() {
        tracing::info!("Wallet {}: {}", i + 1, key);
    }

    let resolver = PoolResolver::new(chain.clone(), dlmm.clone(), PoolResolverConfig::from(&config.pool));
    let controller = Arc::new(PositionCycleController::new(
        chain,
        dlmm,
        resolver,
        CycleConfig::from_config(&config)?,
    ));

    let farming = FarmingLoop::new(controller, rotator, config.cycle.wait_after_error())
        .with_max_cycles(cmd.cycles);

    // Setup Ctrl+C handler
    let handle = farming.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        handle.stop().await;
    });

    farming.run().await;

    let status = farming.status().await;
    tracing::info!(
        "Farmer stopped after {} cycles ({} ok, {} failed, {} swaps)",
        status.iterations,
        status.successes,
        status.failures,
        status.swaps
    );
    Ok(())
}

async fn recover_command(cmd: RecoverCmd, config: Config) -> Result<()> {
    let chain: Arc<dyn ChainPort> = rpc_client(&config, cmd.rpc_url);
    let concurrency = cmd.concurrency.unwrap_or(config.recovery.concurrency);
    let service = RecoveryService::new(chain, concurrency)?.with_execute(cmd.execute);

    if !cmd.execute {
        tracing::info!("Scan only. Pass --execute to close empty accounts.");
    }

    let mut reports = Vec::new();
    for wallet in wallets(&config)? {
        reports.push(service.recover(wallet.keypair()).await);
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }
    Ok(())
}

fn print_report(report: &RecoveryReport) {
    let sol = |lamports: u64| lamports as f64 / LAMPORTS_PER_SOL as f64;

    println!("Wallet: {}", report.wallet_address);
    println!("  Balance:         {:.6} SOL", sol(report.initial_balance));
    println!("  Closable:        {}", report.closable_accounts.len());
    println!("  Reclaimable:     {:.6} SOL", sol(report.reclaimable_lamports()));
    if report.skipped_accounts > 0 {
        println!("  Skipped:         {}", report.skipped_accounts);
    }
    if !report.closed_accounts.is_empty() || !report.failed_accounts.is_empty() {
        println!("  Closed:          {}", report.closed_accounts.len());
        println!("  Failed:          {}", report.failed_accounts.len());
        println!(
            "  Recovered:       {:.6} SOL",
            report.total_recovered as f64 / LAMPORTS_PER_SOL as f64
        );
        println!("  New balance:     {:.6} SOL", sol(report.new_balance));
    }
    for failed in &report.failed_accounts {
        println!(
            "    ✗ {} {}",
            failed.address,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    if let Some(error) = &report.error {
        println!("  Error: {}", error);
    }
}

async fn mint_command(cmd: MintCmd, config: Config) -> Result<()> {
    let chain: Arc<dyn ChainPort> = rpc_client(&config, cmd.rpc_url);
    let payer = wallets(&config)?
        .into_iter()
        .next()
        .context("No wallet configured")?;

    let supply = ui_to_raw(cmd.supply, cmd.decimals).context("Invalid supply")?;
    let receipt = TokenMinter::new(chain)
        .mint(payer.keypair(), cmd.decimals, supply)
        .await?;

    println!("Mint:          {}", receipt.mint);
    println!("Token account: {}", receipt.token_account);
    println!("Decimals:      {}", receipt.decimals);
    println!("Supply:        {} ({} base units)", cmd.supply, receipt.supply);
    println!("Signature:     {}", receipt.signature);
    Ok(())
}

async fn status_command(cmd: StatusCmd, config: Config) -> Result<()> {
    let solana = rpc_client(&config, None);

    let mut rows = Vec::new();
    for wallet in wallets(&config)? {
        let balance = solana
            .get_balance(&wallet.pubkey())
            .await
            .with_context(|| format!("Failed to get balance of {}", wallet.pubkey()))?;
        rows.push((wallet.pubkey().to_string(), balance));
    }

    match cmd.format.as_str() {
        "json" => {
            let wallets: Vec<_> = rows
                .iter()
                .map(|(address, lamports)| serde_json::json!({ "address": address, "lamports": lamports }))
                .collect();
            let status = serde_json::json!({
                "rpc_url": solana.rpc_url(),
                "checked_at": Utc::now().to_rfc3339(),
                "wallets": wallets,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        _ => {
            println!("RPC: {}", solana.rpc_url());
            for (address, lamports) in &rows {
                println!(
                    "Wallet: {} | {} lamports ({:.4} SOL)",
                    address,
                    lamports,
                    *lamports as f64 / LAMPORTS_PER_SOL as f64
                );
            }
        }
    }

    Ok(())
}
