use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;

use smiles_cli::chat::{resolve_endpoint, run_chat_loop, HttpChatTransport};
use smiles_cli::logging::init_logging;
use smiles_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "smiles-chat",
    about = "Relay console input to the Miles of Smiles chat endpoint",
    after_help = "Examples:\n  smiles-chat\n  smiles-chat http://localhost:7001/car-booking/api/car-booking/chat"
)]
struct Args {
    /// Chat endpoint URL; defaults to `chat.endpoint` from configuration.
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_error) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (config, None),
        Err(error) => (AppConfig::default(), Some(error)),
    };
    init_logging(&config);
    if let Some(error) = config_error {
        tracing::warn!(
            event_name = "chat.config_fallback",
            error = %error,
            "configuration did not load, using defaults"
        );
    }

    let endpoint = resolve_endpoint(args.endpoint.as_deref(), &config.chat);
    let transport = HttpChatTransport::from_config(&endpoint, &config.chat)
        .context("failed to build chat transport")?;

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let relayed = run_chat_loop(&endpoint, &transport, input, &mut output)
        .await
        .context("console I/O failed")?;

    tracing::debug!(event_name = "chat.finished", relayed, "chat session ended");
    Ok(())
}
