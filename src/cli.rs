use clap::{Parser, Subcommand};
use inquire::Text;

use crate::flow::callback::Callback;
use crate::handlers::dispatcher::{Dispatcher, SlashCommand, UserInput};
use crate::service::presentation::Reply;

pub const CLI_USER_ID: &str = "cli-user";

#[derive(Parser)]
#[command(about = "Calendar, task and note assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session; `#N` presses button N, `exit` quits.
    Chat,
    /// Handle a single message and exit.
    Ask { text: Vec<String> },
}

pub async fn cli(dispatcher: &Dispatcher, user_id: &str) {
    // Fine to exit on bad arguments here
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => chat(dispatcher, user_id).await,
        Commands::Ask { text } => {
            let text = text.join(" ");
            if let Some(reply) = dispatcher.handle(user_id, parse_line(&text, None)).await {
                print_reply(&reply);
            }
        }
    }
}

async fn chat(dispatcher: &Dispatcher, user_id: &str) {
    let mut last: Option<Reply> = dispatcher
        .handle(user_id, UserInput::Command(SlashCommand::Start))
        .await;
    if let Some(reply) = &last {
        print_reply(reply);
    }

    loop {
        let line = match Text::new("You:").prompt() {
            Ok(line) => line,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        if let Some(reply) = dispatcher.handle(user_id, parse_line(line, last.as_ref())).await {
            print_reply(&reply);
            last = Some(reply);
        }
    }
}

/// `#N` selects the Nth button of the previous reply, `/name` runs a command,
/// anything else is plain text.
fn parse_line(line: &str, last: Option<&Reply>) -> UserInput {
    if let Some(callback) = line
        .strip_prefix('#')
        .and_then(|n| n.trim().parse::<usize>().ok())
        .and_then(|n| button_at(last?, n))
    {
        return UserInput::Callback(callback);
    }
    if let Some(command) = line.strip_prefix('/').and_then(SlashCommand::from_name) {
        return UserInput::Command(command);
    }
    UserInput::Text(line.to_string())
}

fn pressable(reply: &Reply) -> Vec<(&str, &Callback)> {
    reply
        .keyboard
        .iter()
        .flat_map(|k| k.buttons())
        .filter(|b| !b.callback.is_inert())
        .map(|b| (b.label.as_str(), &b.callback))
        .collect()
}

fn button_at(reply: &Reply, n: usize) -> Option<Callback> {
    let buttons = pressable(reply);
    n.checked_sub(1)
        .and_then(|idx| buttons.get(idx))
        .map(|(_, callback)| (*callback).clone())
}

fn print_reply(reply: &Reply) {
    println!("\n{}\n", reply.text);
    let buttons = pressable(reply);
    if !buttons.is_empty() {
        let labels: Vec<String> = buttons
            .iter()
            .enumerate()
            .map(|(idx, (label, _))| format!("[#{} {}]", idx + 1, label))
            .collect();
        println!("{}\n", labels.join(" "));
    }
}
