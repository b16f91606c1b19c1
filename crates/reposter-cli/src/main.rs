use std::sync::Arc;

use clap::{Parser, Subcommand};
use reposter_core::{shutdown, AppConfig};
use reposter_cycle::{build_bundle, Archiver, Orchestrator};
use reposter_notify::{Notice, Reporter, TelegramReporter};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "reposter-cli")]
#[command(about = "Operator commands for the reposter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run exactly one cycle now and print its report as JSON.
    RunOnce,
    /// Print the loaded configuration with credentials redacted.
    Config,
    /// Build the download-directory bundle immediately.
    Archive {
        /// Also send the download link to the notification channel.
        #[arg(long)]
        notify: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = reposter_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::RunOnce => run_once(&config).await,
        Commands::Config => {
            println!("{config:#?}");
            Ok(())
        }
        Commands::Archive { notify } => archive(&config, notify).await,
    }
}

fn reporter(config: &AppConfig) -> anyhow::Result<Arc<dyn Reporter>> {
    Ok(Arc::new(TelegramReporter::new(
        &config.report,
        &config.credentials.telegram_bot_token,
        &config.credentials.telegram_chat_id,
    )?))
}

async fn run_once(config: &AppConfig) -> anyhow::Result<()> {
    let mut orchestrator = Orchestrator::from_config(config, reporter(config)?)?;
    let (stop_tx, stop_rx) = shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, cancelling cycle");
            let _ = stop_tx.send(true);
        }
    });

    let report = orchestrator.run_cycle(stop_rx).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn archive(config: &AppConfig, notify: bool) -> anyhow::Result<()> {
    let bundle = build_bundle(Archiver::from_settings(&config.credit, &config.media)).await?;
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    if notify {
        let notice = Notice::archive_ready(&bundle.download_url, bundle.size_bytes, &bundle.sha256);
        reporter(config)?.notify(&notice).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["reposter-cli", "run-once"]).expect("parse");
        assert!(matches!(cli.command, Commands::RunOnce));

        let cli = Cli::try_parse_from(["reposter-cli", "archive", "--notify"]).expect("parse");
        assert!(matches!(cli.command, Commands::Archive { notify: true }));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["reposter-cli"]).is_err());
    }
}
