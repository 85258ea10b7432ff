use clap::Parser;
use food_assistant_core::{ClientConfig, ReplyStyle, RequestFormat};
use std::path::PathBuf;

/// Chat with the recipe and substitute assistant
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The question to send to the assistant
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Suggestion webhook URL
    #[arg(long)]
    pub chat_url: Option<String>,

    /// Feedback collection endpoint URL
    #[arg(long)]
    pub feedback_url: Option<String>,

    /// Message archive endpoint URL
    #[arg(long)]
    pub archive_url: Option<String>,

    /// Send `{ message }` instead of `{ chatInput, sessionId, messageId }`
    #[arg(long, default_value_t = false)]
    pub simple: bool,

    /// Lay out recipes and substitutes as bullets instead of numbered lists
    #[arg(long, default_value_t = false)]
    pub bulleted: bool,

    /// Seconds to wait for the backend before giving up
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Configuration layer built from the command line flags
    pub fn config_overrides(&self) -> ClientConfig {
        ClientConfig {
            chat_endpoint: self.chat_url.clone(),
            feedback_endpoint: self.feedback_url.clone(),
            archive_endpoint: self.archive_url.clone(),
            request_format: self.simple.then_some(RequestFormat::Simple),
            reply_style: self.bulleted.then_some(ReplyStyle::Bulleted),
            request_timeout_secs: self.timeout,
            log_level: self.verbose.then(|| "debug".to_string()),
            ..ClientConfig::default()
        }
    }
}
