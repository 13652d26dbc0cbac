//! toolrelay - interactive entry point.
//!
//! Reads one command per line from stdin and prints the reply.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use toolrelay::config::{RelayConfig, CONFIG_ENV_VAR};
use toolrelay::dispatcher::Dispatcher;
use toolrelay::logging::init_tracing;
use toolrelay::transport::HttpConnector;

#[derive(Parser, Debug)]
#[command(name = "toolrelay", version, about = "Chat-style command shell for remote MCP tool servers")]
struct Args {
    /// Config file (YAML)
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Conversation key for this shell. Defaults to a random UUID.
    #[arg(long)]
    conversation: Option<String>,

    /// Connect to this server on start
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = RelayConfig::load(args.config.as_deref()).context("loading config")?;
    init_tracing(&config)?;

    let connector = HttpConnector::new(config.connect_timeout()).context("building HTTP client")?;
    let dispatcher = Dispatcher::new(&config, Arc::new(connector));
    let key = args
        .conversation
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::info!(conversation = %key, "session shell ready");

    let mut stdout = tokio::io::stdout();

    if let Some(endpoint) = args.endpoint {
        let reply = dispatcher.handle(&key, &format!("connect {endpoint}")).await;
        stdout.write_all(format!("{reply}\n\n").as_bytes()).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("reading stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let reply = dispatcher.handle(&key, line).await;
        stdout.write_all(format!("{reply}\n\n").as_bytes()).await?;
    }

    if let Err(e) = dispatcher.sessions().disconnect(&key).await {
        tracing::warn!(error = %e, "disconnect on exit failed");
    }
    Ok(())
}
