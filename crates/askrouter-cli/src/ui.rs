use std::io::{self, Write};

use askrouter_core::{AnswerResult, Config, HealthStatus, SubmissionState, SubmitOutcome};
use colored::*;
use tokio::sync::watch;

pub fn print_thinking(file_name: Option<&str>) {
    match file_name {
        Some(name) => println!("{} {}", "🤖 Routing question with".dimmed(), name.cyan()),
        None => println!("{}", "🤖 Routing question...".dimmed()),
    }
}

pub fn print_answer(answer: &AnswerResult) {
    println!("\n{}", "Answer:".bold().green());
    println!("{}", answer.answer);

    let usage = answer.usage;
    if usage.total_tokens > 0 {
        println!(
            "\n{}",
            format!(
                "tokens: {} in / {} out / {} total",
                usage.input_tokens, usage.output_tokens, usage.total_tokens
            )
            .dimmed()
        );
    }
    if let Some(pages) = answer.pages_processed {
        println!("{}", format!("pages processed: {}", pages).dimmed());
    }
}

pub fn print_outcome(outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Answered(answer) => print_answer(answer),
        SubmitOutcome::Rejected(message) => println!("{}", message.yellow()),
        SubmitOutcome::Failed(message) | SubmitOutcome::Invalid(message) => print_error(message),
    }
}

pub fn print_error(message: &str) {
    println!("{} {}", "Error:".bold().red(), message);
}

pub fn print_attached(file_name: &str, preview_len: Option<usize>) {
    match preview_len {
        Some(len) => println!("📎 {} {}", file_name.cyan(), format!("(preview {} bytes)", len).dimmed()),
        None => println!("📎 {}", file_name.cyan()),
    }
}

pub fn print_chat_help() {
    println!("{}", "💬 Ask anything. Commands:".bold().blue());
    println!("  {}  attach an image", "/image <path>".bold());
    println!("  {}         remove the attached image", "/clear".bold());
    println!("  {}          show this help", "/help".bold());
    println!("  {}          exit", "/quit".bold());
}

pub fn print_prompt(state: &SubmissionState) -> io::Result<()> {
    match state.attached_file_name() {
        Some(name) => print!("{} {} ", format!("[{}]", name).cyan(), ">".bold()),
        None => print!("{} ", ">".bold()),
    }
    io::stdout().flush()
}

pub fn print_config(config: &Config) {
    println!("{} {}", "Backend:".bold(), config.base_url.green());
    println!("{} {}", "Source:".bold(), config.source.to_string().dimmed());
}

pub fn print_health(base_url: &str, status: &HealthStatus) {
    if status.is_healthy() {
        println!("{} {}", "✓".green(), format!("{} is healthy", base_url));
    } else {
        println!("{} {} reported '{}'", "⚠".yellow(), base_url, status.status);
    }
}

/// Print a progress line each time a submission starts
pub async fn watch_progress(mut rx: watch::Receiver<SubmissionState>) {
    let mut was_loading = rx.borrow().is_loading;
    while rx.changed().await.is_ok() {
        let loading = rx.borrow_and_update().is_loading;
        if loading && !was_loading {
            println!("{}", "Thinking...".dimmed());
        }
        was_loading = loading;
    }
}
