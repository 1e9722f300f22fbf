mod cli;
mod config;
mod error;
mod gateway;
mod gemini_client;
mod openai_client;
mod scenarios;

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::session::ChatSession;
use crate::cli::chat::{ChatContext, render};
use crate::config::{AppConfig, BackendId};
use crate::gateway::build_gateways;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,
}

#[derive(Args, Clone, Default)]
struct ChatArgs {
    /// Send a single message and print the reply
    #[arg(short, long)]
    input: Option<String>,

    /// Model to start with (see `models`)
    #[arg(short, long)]
    backend: Option<String>,

    /// Seconds to wait for a model reply
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat(ChatArgs),
    /// List the available models
    Models,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let args = match &cli.command {
        Some(Commands::Chat(args)) => args.clone(),
        _ => cli.chat.clone(),
    };

    let log_level = if args.verbose { Level::DEBUG } else { Level::WARN };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = AppConfig::from_env();
    if let Some(backend) = args.backend {
        config.default_backend = BackendId::from(backend);
    }
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs);
    }

    let gateways = build_gateways(&config.backends);
    let session = ChatSession::new(&config, gateways)?;

    info!(
        backend = %session.selected(),
        timeout = config.timeout.as_secs(),
        "Starting model picker chat"
    );

    match cli.command {
        Some(Commands::Models) => {
            render::backends(&mut io::stdout(), &session)?;
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            let mut chat_context = ChatContext::new(
                Box::new(io::stdout()),
                args.input,
                true,
                session,
            );
            chat_context.run().await
        }
    }
}
