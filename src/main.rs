//! Polyscout — AI-Powered Prediction Market Edge Scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the collaborators, and dispatches the requested subcommand.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use polyscout::alerts::moltbook::MoltbookClient;
use polyscout::alerts::telegram::TelegramChannel;
use polyscout::alerts::NotifyChannel;
use polyscout::config::AppConfig;
use polyscout::engine::scanner::ScanOrchestrator;
use polyscout::engine::scheduler::Scheduler;
use polyscout::heartbeat::{self, HeartbeatGate};
use polyscout::llm::openrouter::OpenRouterClient;
use polyscout::platforms::polymarket::PolymarketClient;
use polyscout::portfolio::PaperLedger;

#[derive(Parser)]
#[command(name = "polyscout", about = "AI-powered prediction market edge scanner")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single market scan and exit
    Scan {
        /// Also post edge alerts to Moltbook
        #[arg(long)]
        moltbook: bool,
        /// Agent name to ask for peer review on admitted edges
        #[arg(long)]
        ask_peer: Option<String>,
    },
    /// Run scans continuously on the configured interval
    Run {
        /// Scan interval in minutes (overrides config)
        #[arg(long)]
        interval: Option<u64>,
        /// Also post edge alerts to Moltbook
        #[arg(long)]
        moltbook: bool,
        /// Agent name to ask for peer review on admitted edges
        #[arg(long)]
        ask_peer: Option<String>,
    },
    /// Send a test alert to verify Telegram configuration
    TestAlert,
    /// Run the Moltbook heartbeat check now
    Heartbeat,
    /// Show the heartbeat status summary
    Status,
    /// Show paper trading performance
    Portfolio,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;

    init_logging();

    match cli.command {
        Command::Scan { moltbook, ask_peer } => {
            let scheduler = build_scheduler(&cfg, moltbook, ask_peer, None)?;
            let alerts_sent = scheduler.scan_once().await?;
            println!("Scan complete: {alerts_sent} edge alert(s) sent");
        }
        Command::Run {
            interval,
            moltbook,
            ask_peer,
        } => {
            let scheduler = build_scheduler(&cfg, moltbook, ask_peer, interval)?;
            info!(
                agent = %cfg.agent.name,
                min_confidence = cfg.agent.min_confidence,
                "Polyscout starting. Press Ctrl+C to stop."
            );
            scheduler
                .run_until(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
            println!("Polyscout stopped.");
        }
        Command::TestAlert => {
            let telegram = telegram_channel(&cfg)?;
            telegram.send_test_alert(&cfg.agent.name).await?;
            println!("Test alert sent successfully");
        }
        Command::Heartbeat => {
            let gate = HeartbeatGate::new(&cfg.storage.heartbeat_path);
            let moltbook = moltbook_client(&cfg)?;
            heartbeat::run_peer_heartbeat(&gate, &moltbook).await?;
        }
        Command::Status => {
            let gate = HeartbeatGate::new(&cfg.storage.heartbeat_path);
            let summary = gate.summary();
            println!("Heartbeat Status");
            println!("{}", "=".repeat(40));
            if summary.is_empty() {
                println!("No heartbeat records yet.");
            } else {
                for (task, status) in summary {
                    println!("  {task}: {:.1} hours ago", status.hours_ago);
                }
            }
        }
        Command::Portfolio => {
            let ledger = PaperLedger::new(&cfg.storage.portfolio_path);
            let stats = ledger.summary()?;
            println!("Paper Trading Portfolio");
            println!("{}", "=".repeat(40));
            println!("  Total Trades: {}", stats.total_trades);
            println!("  Open:         {}", stats.open_trades);
            println!("  Closed:       {}", stats.closed_trades);
            println!("  Win Rate:     {:.1}%", stats.win_rate);
            println!("  Total PnL:    {:.2} units", stats.total_pnl);
            println!("  ROI:          {:.1}%", stats.roi);
        }
    }

    Ok(())
}

/// Wire a fully configured scheduler for scan/run commands.
///
/// Telegram credentials and the LLM key are required here; Moltbook is
/// optional and only consulted when the flag asks for it.
fn build_scheduler(
    cfg: &AppConfig,
    moltbook: bool,
    ask_peer: Option<String>,
    interval_override: Option<u64>,
) -> Result<Scheduler> {
    let llm_api_key = AppConfig::resolve_env(&cfg.llm.api_key_env)
        .context("An analyzer API key is required for scanning")?;
    let analyzer = Arc::new(OpenRouterClient::new(
        llm_api_key,
        Some(cfg.llm.model.clone()),
        Some(cfg.llm.max_tokens),
    )?);

    let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![Arc::new(telegram_channel(cfg)?)];

    let moltbook_handle = if moltbook || ask_peer.is_some() {
        if !cfg.alerts.moltbook.enabled {
            warn!("Moltbook requested but disabled in config");
            None
        } else {
            match moltbook_client(cfg) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!(error = %e, "Moltbook not available");
                    None
                }
            }
        }
    } else {
        None
    };

    if moltbook {
        if let Some(client) = &moltbook_handle {
            info!("Moltbook posting enabled");
            channels.push(client.clone());
        }
    }

    let ledger = Arc::new(PaperLedger::new(&cfg.storage.portfolio_path));
    let mut orchestrator = ScanOrchestrator::new(
        analyzer,
        ledger,
        channels,
        cfg.agent.min_confidence,
    );

    let peer_name = ask_peer.or_else(|| cfg.agent.peer_reviewer.clone());
    if let (Some(peer), Some(client)) = (peer_name, &moltbook_handle) {
        info!(peer = %peer, "Peer review enabled");
        orchestrator = orchestrator.with_peer(peer, client.clone());
    }

    let interval_minutes = interval_override.unwrap_or(cfg.agent.scan_interval_minutes);
    if interval_minutes == 0 {
        anyhow::bail!("Scan interval must be at least 1 minute");
    }
    Ok(Scheduler::new(
        Arc::new(PolymarketClient::new()?),
        Arc::new(orchestrator),
        Arc::new(HeartbeatGate::new(&cfg.storage.heartbeat_path)),
        cfg.agent.market_limit,
        Duration::from_secs(interval_minutes * 60),
    ))
}

fn telegram_channel(cfg: &AppConfig) -> Result<TelegramChannel> {
    let token = AppConfig::resolve_env(&cfg.alerts.telegram.bot_token_env)
        .context("Telegram is required for alerts")?;
    let channel_id = AppConfig::resolve_env(&cfg.alerts.telegram.channel_id_env)
        .context("Telegram is required for alerts")?;
    TelegramChannel::new(token, channel_id)
}

fn moltbook_client(cfg: &AppConfig) -> Result<MoltbookClient> {
    let api_key = AppConfig::resolve_env(&cfg.alerts.moltbook.api_key_env)
        .context("A Moltbook API key is required")?;
    MoltbookClient::new(api_key, cfg.alerts.moltbook.submolt.clone())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("polyscout=info"));

    let json_logging = std::env::var("POLYSCOUT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
