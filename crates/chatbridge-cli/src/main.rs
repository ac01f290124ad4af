mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chatbridge=info,chatbridge_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Serve { pipe, messages } => commands::serve::run(&pipe, messages).await,
        Command::Encode { text } => commands::wire::encode(&text),
        Command::Decode { line } => commands::wire::decode(&line),
    }
}
