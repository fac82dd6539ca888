mod gateway;
mod sources;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use verdant_channels::{IngestionLoop, LoopExit, TelegramChannel};
use verdant_core::{
    config::{self, shellexpand, Config, Prompts, VerdantConfig},
    session::SessionIdentity,
    traits::{EnrichmentProvider, Transport},
};
use verdant_providers::{HttpEnrichmentProvider, LlmGateway, OpenAiBackend};

#[derive(Parser)]
#[command(
    name = "verdant",
    version,
    about = "Verdant: a naturalist's conversational companion"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot.
    Start,
    /// Check configuration, backend availability and storage.
    Status,
    /// Send a one-shot message through the full pipeline.
    Ask {
        /// Print the reply as JSON.
        #[arg(long)]
        json: bool,
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg.verdant)?;

    match cli.command {
        Commands::Start => start(&cfg).await?,
        Commands::Status => status(&cli.config, &cfg).await?,
        Commands::Ask { json, message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: verdant ask <message>");
            }
            ask(&cfg, &message.join(" "), json).await?;
        }
    }

    Ok(())
}

/// Stdout logging, plus a daily file under `{data_dir}/logs/` when enabled.
/// `RUST_LOG` overrides the configured level.
fn init_tracing(
    cfg: &VerdantConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    if !cfg.log_to_file {
        registry.init();
        return Ok(None);
    }

    let logs_dir = format!("{}/logs", shellexpand(&cfg.data_dir));
    std::fs::create_dir_all(&logs_dir)?;
    let appender = tracing_appender::rolling::daily(&logs_dir, "verdant.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Ok(Some(guard))
}

/// Storage, LLM gateway and enrichment sources wired into a gateway.
async fn build_gateway(cfg: &Config) -> anyhow::Result<gateway::Gateway> {
    let memory = verdant_memory::open(&cfg.memory).await?;
    let backend = OpenAiBackend::from_config(&cfg.llm)?;
    let llm = LlmGateway::from_config(Arc::new(backend), &cfg.llm);

    let mut providers: Vec<Arc<dyn EnrichmentProvider>> = Vec::new();
    for endpoint in cfg.context.providers.iter().filter(|p| p.enabled) {
        let provider =
            HttpEnrichmentProvider::from_config(endpoint, cfg.context.enrichment_timeout())?;
        info!(
            "enrichment: {} -> {} block",
            endpoint.name,
            endpoint.slot.as_str()
        );
        providers.push(Arc::new(provider));
    }

    let prompts = Prompts::load(&cfg.verdant.data_dir);
    Ok(gateway::Gateway::new(&memory, llm, providers, cfg, prompts))
}

async fn start(cfg: &Config) -> anyhow::Result<()> {
    let tg = match cfg.channel.telegram.as_ref() {
        Some(tg) if tg.enabled => tg.clone(),
        _ => anyhow::bail!("Telegram is not enabled. Enable [channel.telegram] in config.toml."),
    };
    if tg.bot_token.is_empty() {
        anyhow::bail!(
            "Telegram is enabled but bot_token is empty. \
             Set it in config.toml or TELEGRAM_BOT_TOKEN env var."
        );
    }

    let gw = Arc::new(build_gateway(cfg).await?);
    if !gw.llm().is_available().await {
        warn!(
            "llm backend '{}' is not reachable; replies will fail until it is",
            gw.llm().backend_name()
        );
    }

    let transport: Arc<dyn Transport> = Arc::new(TelegramChannel::new(tg.clone()));
    let responder = gateway::TelegramResponder::new(
        gw.clone(),
        transport.clone(),
        tg.failure_reaction.clone(),
    );
    let ingestion = IngestionLoop::from_config(transport, Arc::new(responder), &tg);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            return;
        }
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    info!("{} started, polling Telegram", cfg.verdant.name);
    match ingestion.run(shutdown_rx).await {
        LoopExit::Shutdown => {
            info!("stopped");
            Ok(())
        }
        LoopExit::WebhookBlocked => anyhow::bail!(
            "Telegram reports an active webhook for this bot. It has been deleted; \
             restart to resume polling, or deliver updates through the webhook."
        ),
    }
}

async fn status(config_path: &str, cfg: &Config) -> anyhow::Result<()> {
    println!("Verdant status\n");
    println!("Config: {config_path}");
    println!("LLM: {} ({})", cfg.llm.base_url, cfg.llm.model);

    let backend = OpenAiBackend::from_config(&cfg.llm)?;
    let llm = LlmGateway::from_config(Arc::new(backend), &cfg.llm);
    println!(
        "  {}: {}",
        llm.backend_name(),
        if llm.is_available().await {
            "available"
        } else {
            "not available"
        }
    );

    match cfg.channel.telegram.as_ref() {
        Some(tg) if tg.enabled && !tg.bot_token.is_empty() => println!("  telegram: configured"),
        Some(tg) if tg.enabled => println!("  telegram: enabled but missing bot_token"),
        Some(_) => println!("  telegram: disabled"),
        None => println!("  telegram: not configured"),
    }

    let enabled = cfg.context.providers.iter().filter(|p| p.enabled).count();
    println!("  enrichment providers: {enabled}");

    let memory = verdant_memory::open(&cfg.memory).await?;
    match memory.store {
        Some(store) => {
            let counts = store.counts().await?;
            println!(
                "  memory: sqlite at {} ({} sessions, {} nodes, {} mapped identities)",
                cfg.memory.db_path, counts.sessions, counts.nodes, counts.identities
            );
        }
        None => println!("  memory: in-process (not persisted)"),
    }
    Ok(())
}

async fn ask(cfg: &Config, message: &str, json: bool) -> anyhow::Result<()> {
    let gw = build_gateway(cfg).await?;
    let reply = gw
        .handle_message_with("cli", &SessionIdentity::explicit("cli"), message, None)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }
    if !reply.is_answered() {
        anyhow::bail!("the assistant could not answer (backend: {})", gw.llm().backend_name());
    }
    println!("{}", sources::render_for_chat(&reply.display_text, &reply.sources));
    Ok(())
}
