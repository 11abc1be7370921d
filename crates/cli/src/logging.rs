use smiles_core::config::{AppConfig, LogFormat};
use tracing::Level;

/// Installs the global subscriber. Output goes to stderr so stdout carries
/// only command payloads and the chat transcript.
pub fn init_logging(config: &AppConfig) {
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(max_level(&config.logging.level))
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn max_level(level: &str) -> Level {
    level.trim().parse::<Level>().unwrap_or(Level::INFO)
}
