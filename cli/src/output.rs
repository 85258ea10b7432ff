use colored::*;
use food_assistant_core::{
    FeedbackOutcome, FeedbackSnapshot, FeedbackState, LineSegment, Message, Rating, Role,
    format_lines,
};

/// Print a bot reply to the terminal
pub fn print_bot_message(message: &Message) {
    println!("{}:", "Assistant".blue().bold());
    println!("{}", render_reply(&message.text));
}

/// Render reply text line by line for the terminal
pub fn render_reply(text: &str) -> String {
    format_lines(text)
        .map(|segment| match segment {
            LineSegment::Heading(title) => title.bold().to_string(),
            LineSegment::BulletItem(item) => format!("    {}", item),
            LineSegment::Plain(line) => line.to_string(),
            LineSegment::Spacer => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the whole conversation so far
pub fn print_history(messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }

    for message in messages {
        match message.role {
            Role::User => println!("{}: {}", "You".green().bold(), message.text),
            Role::Bot => print_bot_message(message),
        }
        println!();
    }
}

/// One-line summary of the feedback controls for the latest reply
pub fn print_feedback_prompt(snapshot: &FeedbackSnapshot) {
    if snapshot.state == FeedbackState::Submitted {
        println!("{}", "✓ Thank you for your feedback!".green());
        return;
    }

    let selected = match snapshot.rating {
        Some(Rating::Positive) => " [yes selected]",
        Some(Rating::Negative) => " [no selected]",
        None => "",
    };
    println!(
        "{}{}",
        "Was this helpful? /yes  /no  /comment".dimmed(),
        selected.dimmed()
    );

    if snapshot.comment_open {
        println!(
            "{} {}",
            "Comment:".dimmed(),
            if snapshot.draft_comment.is_empty() {
                "(use /note <text>, then /send)".to_string()
            } else {
                snapshot.draft_comment.clone()
            }
        );
    }
}

pub fn print_feedback_outcome(outcome: FeedbackOutcome) {
    match outcome {
        FeedbackOutcome::Submitted => println!("{}", "✓ Thank you for your feedback!".green()),
        FeedbackOutcome::Deferred => {
            println!("{}", "Rating noted. Add a note and /send it.".dimmed())
        }
        FeedbackOutcome::Failed => {
            println!("{}", "Could not send feedback, try again.".yellow())
        }
        FeedbackOutcome::Ignored => println!("{}", "Nothing to send.".dimmed()),
    }
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "food-assistant \"your question\"".green().bold());
    println!("    Ask one question about recipes or ingredient substitutes");
    println!();
    println!("  {}", "food-assistant -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --chat-url <URL>       Suggestion webhook URL");
    println!("  --feedback-url <URL>   Feedback endpoint URL");
    println!("  --simple               Use the simple request format");
    println!("  --bulleted             Bulleted reply layout");
    println!("  --help                 Show this help message");
    println!();
}

/// Commands understood in interactive mode
pub fn print_interactive_help() {
    println!("Type a question, or one of:");
    println!("  {}          rate the latest reply as helpful", "/yes".cyan());
    println!("  {}           rate the latest reply as not helpful", "/no".cyan());
    println!("  {}      open or close the comment box", "/comment".cyan());
    println!("  {}  set the comment text", "/note <text>".cyan());
    println!("  {}         send rating and comment", "/send".cyan());
    println!("  {}      show the conversation", "/history".cyan());
    println!("  {}     leave", "exit, quit".cyan());
}
