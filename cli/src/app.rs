use anyhow::{Context, Result};
use colored::*;
use food_assistant_core::{ConversationSession, FeedbackOutcome, Message, Rating};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, info};

use crate::output::{
    print_bot_message, print_feedback_outcome, print_feedback_prompt, print_history,
    print_interactive_help,
};

/// A line typed in interactive mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Rate(Rating),
    ToggleComment,
    Note(String),
    SendComment,
    History,
    Help,
    Exit,
    Empty,
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Command::Empty;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            return Command::Exit;
        }

        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };

        match head {
            "/yes" => Command::Rate(Rating::Positive),
            "/no" => Command::Rate(Rating::Negative),
            "/comment" => Command::ToggleComment,
            "/note" => Command::Note(rest.to_string()),
            "/send" => Command::SendComment,
            "/history" => Command::History,
            "/help" => Command::Help,
            _ => Command::Ask(input.to_string()),
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message("Looking that up...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Submit one question while showing a spinner
async fn ask(session: &ConversationSession, question: &str) -> Option<Message> {
    let spinner = spinner();
    let reply = session.submit(question).await;
    spinner.finish_and_clear();
    reply
}

/// Runs a single query, printing the formatted reply
pub async fn run_single_query(prompt: String, session: &ConversationSession) -> Result<()> {
    info!("Running single query: {}", prompt);

    match ask(session, &prompt).await {
        Some(reply) => print_bot_message(&reply),
        None => println!("{}", "Nothing to send.".dimmed()),
    }

    Ok(())
}

/// Applies a feedback command to the latest bot reply
async fn handle_feedback(session: &ConversationSession, command: Command) {
    let Some(latest) = session.latest_bot_message() else {
        println!("{}", "No reply to give feedback on yet.".dimmed());
        return;
    };
    let Some(feedback) = session.feedback(&latest.id) else {
        return;
    };

    match command {
        Command::Rate(rating) => print_feedback_outcome(feedback.rate(rating).await),
        Command::ToggleComment => {
            feedback.toggle_comment();
            print_feedback_prompt(&feedback.snapshot());
        }
        Command::Note(text) => {
            if !feedback.set_comment(text) {
                print_feedback_outcome(FeedbackOutcome::Ignored);
            }
            print_feedback_prompt(&feedback.snapshot());
        }
        Command::SendComment => print_feedback_outcome(feedback.send_comment().await),
        _ => {}
    }
}

/// Runs an interactive chat session
pub async fn run_interactive_chat(session: &ConversationSession) -> Result<()> {
    println!("{}", "Food Assistant".bold());
    println!("Ask me about recipes or ingredient substitutes to get started.");
    println!("Type /help for commands, 'exit' or 'quit' to end the session.");
    println!();

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            break;
        }

        match Command::parse(&input) {
            Command::Empty => continue,
            Command::Exit => {
                println!("Exiting chat session.");
                break;
            }
            Command::Help => print_interactive_help(),
            Command::History => print_history(&session.messages()),
            Command::Ask(question) => {
                debug!("Submitting question: {}", question);
                if let Some(reply) = ask(session, &question).await {
                    print_bot_message(&reply);
                    if let Some(feedback) = session.feedback(&reply.id) {
                        print_feedback_prompt(&feedback.snapshot());
                    }
                }
            }
            command => handle_feedback(session, command).await,
        }

        println!(); // Add spacing between interactions
    }

    Ok(())
}
