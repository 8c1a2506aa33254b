mod command;
mod terminal;

use std::time::Duration;

use clap::Parser;
use parley::config::GateDelays;
use parley::{ClientConfig, Context, Debounce, SessionController, SessionError, Throttle};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::command::{Command, Navigation, help_text, parse_command};
use crate::terminal::{TerminalSurface, format_channels, format_roster, format_users};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "parley-cli", about = "Terminal client for a Prattle chat server")]
struct Cli {
    /// Server root; overrides `PARLEY_SERVER_URL` and the derived REST and
    /// websocket bases.
    #[arg(long)]
    server_url: Option<String>,

    #[arg(long, short, env = "PARLEY_USERNAME")]
    username: String,

    #[arg(long, env = "PARLEY_PASSWORD", hide_env_values = true)]
    password: String,

    /// Channel id opened after sign-in.
    #[arg(long)]
    channel: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    load_dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let gate = config.gate;

    let mut controller = SessionController::connect(config, Box::new(TerminalSurface::default()))?;
    controller.sign_in(&cli.username, &cli.password).await?;
    println!("Signed in as {}. Type /help for commands.", controller.username().unwrap_or_default());

    let outcome = run(&mut controller, gate).await;
    controller.logout();
    outcome
}

fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("ignoring .env: {err}");
        }
    }
}

fn build_config(cli: &Cli) -> Result<ClientConfig, SessionError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(server_url) = &cli.server_url {
        let derived = ClientConfig::for_server(server_url)?;
        config.rest_url = derived.rest_url;
        config.ws_url = derived.ws_url;
    }
    if let Some(channel) = cli.channel {
        config.default_channel = channel;
    }
    Ok(config)
}

// =============================================================================
// INTERACTIVE LOOP
// =============================================================================

async fn run(controller: &mut SessionController, gate: GateDelays) -> Result<(), CliError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut navigation = Debounce::new(Duration::from_millis(gate.debounce_ms));
    let mut moderation = Throttle::new(Duration::from_millis(gate.throttle_ms));

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let Some(command) = parse_command(&line) else {
                    continue;
                };
                if handle(controller, &mut navigation, &mut moderation, command).await == Flow::Quit {
                    break;
                }
            }
            () = controller.next_inbound() => {}
            target = navigation.ready() => {
                if let Err(err) = navigate(controller, target).await {
                    report(&err);
                }
            }
        }
    }
    Ok(())
}

async fn handle(
    controller: &mut SessionController,
    navigation: &mut Debounce<Navigation>,
    moderation: &mut Throttle,
    command: Command,
) -> Flow {
    let result = match command {
        Command::Say(text) => controller.send(&text).await,
        Command::Navigate(target) => {
            navigation.call(target);
            Ok(())
        }
        Command::Search(query) => {
            let found = controller.search(&query);
            if found.is_empty() {
                println!("No joinable channels match \"{query}\".");
            }
            for channel in found {
                println!("  #{} ({})", channel.name, channel.id);
            }
            Ok(())
        }
        Command::Moderate(action, target) => {
            if moderation.admit() {
                controller.moderate(action, &target).await
            } else {
                println!("Too fast; {action} {target} ignored.");
                Ok(())
            }
        }
        Command::Who => {
            match controller.view().roster {
                Some(roster) => print_lines(format_roster(&roster)),
                None => println!("No roster outside a channel."),
            }
            Ok(())
        }
        Command::Channels => {
            print_lines(format_channels(&controller.view().sidebar));
            Ok(())
        }
        Command::Users => {
            print_lines(format_users(&controller.view().sidebar));
            Ok(())
        }
        Command::Refresh => refresh(controller).await,
        Command::Help => {
            print_lines(help_text());
            Ok(())
        }
        Command::Usage(usage) => {
            println!("usage: {usage}");
            Ok(())
        }
        Command::Unknown(cmd) => {
            println!("Unknown command {cmd}; type /help.");
            Ok(())
        }
        Command::Quit => return Flow::Quit,
    };

    if let Err(err) = result {
        report(&err);
    }
    Flow::Continue
}

async fn navigate(controller: &mut SessionController, target: Navigation) -> Result<(), SessionError> {
    match target {
        Navigation::Channel(id) => {
            let name = controller.sidebars().channel_name(id).map_or_else(|| id.to_string(), str::to_owned);
            controller.switch_to(Context::channel(id, name)).await
        }
        Navigation::Direct(peer) => controller.switch_to(Context::direct(peer)).await,
        Navigation::Join(name) => controller.join_channel(&name).await,
    }
}

async fn refresh(controller: &mut SessionController) -> Result<(), SessionError> {
    controller.refresh_sidebars().await?;
    if controller.active().and_then(Context::channel_id).is_some() {
        controller.refresh_roster().await?;
    }
    Ok(())
}

fn report(err: &SessionError) {
    tracing::debug!(code = err.code(), error = %err, "command failed");
    eprintln!("error [{}]: {err}", err.code());
}

fn print_lines<S: std::fmt::Display>(lines: impl IntoIterator<Item = S>) {
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
