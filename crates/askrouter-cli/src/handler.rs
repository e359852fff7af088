use std::path::Path;

use anyhow::Result;
use askrouter_core::{AgentGateway, DataUrlPreview, ImageAttachment, Orchestrator};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::ui;

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand<'a> {
    Ask(&'a str),
    Attach(&'a str),
    ClearImage,
    Help,
    Quit,
    Empty,
}

fn parse_command(line: &str) -> ChatCommand<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }

    match line.split_once(char::is_whitespace) {
        Some(("/image", path)) => ChatCommand::Attach(path.trim()),
        _ => match line {
            "/clear" => ChatCommand::ClearImage,
            "/help" => ChatCommand::Help,
            "/quit" | "/exit" => ChatCommand::Quit,
            _ => ChatCommand::Ask(line),
        },
    }
}

/// Line-oriented session: every plain line is submitted with whatever image
/// is currently attached.
pub async fn run_chat<G: AgentGateway>(orchestrator: &Orchestrator<G>) -> Result<()> {
    let store = orchestrator.store().clone();
    let progress = tokio::spawn(ui::watch_progress(store.subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    ui::print_chat_help();

    loop {
        ui::print_prompt(&store.snapshot())?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => ui::print_chat_help(),
            ChatCommand::Attach(path) => match ImageAttachment::from_path(Path::new(path)).await {
                Ok(image) => {
                    let file_name = image.file_name().to_string();
                    match store.set_attached_image(Some(image), &DataUrlPreview).await {
                        Ok(()) => {
                            let preview_len = store.snapshot().image_preview.map(|p| p.len());
                            ui::print_attached(&file_name, preview_len);
                        }
                        Err(e) => ui::print_error(&e.to_string()),
                    }
                }
                Err(e) => ui::print_error(&e.to_string()),
            },
            ChatCommand::ClearImage => {
                if let Err(e) = store.clear_image() {
                    ui::print_error(&e.to_string());
                }
            }
            ChatCommand::Ask(question) => {
                store.set_question_text(question);
                match orchestrator.submit().await {
                    Ok(outcome) => ui::print_outcome(&outcome),
                    Err(e) => ui::print_error(&e.to_string()),
                }
            }
        }
    }

    progress.abort();
    Ok(())
}
