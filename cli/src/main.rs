use anyhow::Context;
use clap::Parser;
use colored::*;
use dotenvy::dotenv;
use food_assistant_core::{APP_NAME, ClientConfig, ConversationSession, get_default_config_file};
use tracing::{error, info};

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::Args;
use crate::output::print_usage_instructions;

/// Main function - Loads configuration, starts a session and runs the requested mode
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before reading endpoint overrides
    dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse();

    // File config, then environment, then flags
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file(APP_NAME)?,
    };
    let config = ClientConfig::load_from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .merge(&ClientConfig::from_env())
        .merge(&args.config_overrides());

    logging::init(config.log_level());
    info!("Using suggestion endpoint {}", config.chat_endpoint());

    let session = ConversationSession::from_config(&config).context("Failed to start session")?;

    if args.interactive {
        if let Err(e) = crate::app::run_interactive_chat(&session).await {
            error!("Error in interactive chat: {}", e);
            eprintln!("{}", format!("Interactive chat failed: {}", e).red());
        }
    } else if let Some(prompt) = args.prompt.clone() {
        if let Err(e) = crate::app::run_single_query(prompt, &session).await {
            error!("Error processing prompt: {}", e);
            eprintln!("{}", format!("Query failed: {}", e).red());
        }
    } else {
        // No prompt and not interactive, show usage
        print_usage_instructions();
    }

    Ok(())
}
