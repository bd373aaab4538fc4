//! Relay - Terminal Chat Surface
//!
//! Line-oriented front end for `relay_core`. Each line typed on stdin is
//! sent as a user turn and the answer is printed as it streams in.
//!
//! # Usage
//!
//! ```bash
//! # Endpoint from the config file or environment
//! relay
//!
//! # Explicit endpoint and system prompt
//! relay --api http://localhost:3000/api/generate --system "Be brief"
//!
//! # Verbose logging (written to stderr)
//! RUST_LOG=debug relay
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_API`: generation endpoint URL
//! - `RELAY_SYSTEM_PROMPT`: system prompt
//! - `RELAY_CONFIG`: config file path
//! - `RUST_LOG`: log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - `SIGINT`: cancel the streaming answer, or exit when idle

mod input;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use relay_core::{
    default_config_path, load_config_from_path, Chat, ChatMessage, ConfigOverrides,
    HttpTransport, Transport,
};

use input::{parse_line, Input, HELP};
use render::{Output, Renderer, PROMPT};

/// Relay - stream answers from a generation endpoint into the terminal
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Generation endpoint URL
    #[arg(short = 'a', long, value_name = "URL")]
    api: Option<String>,

    /// System prompt sent ahead of the conversation
    #[arg(short = 's', long = "system", value_name = "TEXT")]
    system_prompt: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "RELAY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(api) = &self.api {
            overrides = overrides.with_api(api.clone());
        }
        if let Some(prompt) = &self.system_prompt {
            overrides = overrides.with_system_prompt(prompt.clone());
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with streamed answers
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_cli=info".parse()?)
                .add_directive("relay_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config =
        load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        endpoint = config.api.as_deref().unwrap_or("<none>"),
        "Configuration loaded"
    );
    if config.api.is_none() {
        warn!("No endpoint configured; pass --api or set RELAY_API");
    }

    let (msg_tx, msg_rx) = mpsc::channel::<ChatMessage>(config.event_buffer);
    let mut chat = Chat::new(HttpTransport::new(), config.chat_config(), msg_tx);

    let printer = tokio::spawn(print_messages(msg_rx));

    let (input_tx, mut input_rx) = mpsc::channel::<Input>(16);
    tokio::spawn(read_stdin(input_tx.clone()));
    tokio::spawn(watch_interrupts(input_tx));

    write_stdout(PROMPT).await;

    let mut draining = false;
    let mut input_open = true;

    loop {
        if draining && !chat.is_loading() {
            break;
        }

        tokio::select! {
            input = input_rx.recv(), if input_open => {
                let input = match input {
                    Some(input) => input,
                    None => {
                        input_open = false;
                        Input::Quit
                    }
                };
                match handle_input(&mut chat, input).await {
                    Flow::Continue => {}
                    Flow::Drain => {
                        info!("Waiting for the streaming answer before exiting");
                        draining = true;
                    }
                    Flow::Exit => break,
                }
            }
            event = chat.next_event() => {
                chat.apply(event).await;
            }
        }
    }

    // Closing the message channel lets the printer drain and exit
    drop(chat);
    printer.await.context("Printer task failed")?;

    info!("Relay stopped");
    Ok(())
}

/// What the main loop does after an input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    /// Keep going
    Continue,
    /// Exit once the streaming answer settles; input is still handled
    Drain,
    /// Exit now
    Exit,
}

/// Act on one input
async fn handle_input<T: Transport + 'static>(chat: &mut Chat<T>, input: Input) -> Flow {
    match input {
        Input::Submit(text) => {
            if let Err(e) = chat.submit(text).await {
                write_stderr(&format!("[busy] {e}\n")).await;
            }
        }
        Input::Reset => chat.reset_conversation().await,
        Input::System(prompt) => chat.set_system_prompt(prompt).await,
        Input::Help => write_stdout(&format!("{HELP}\n{PROMPT}")).await,
        Input::Interrupt if chat.is_loading() => {
            info!("Interrupt: cancelling streaming answer");
            chat.cancel().await;
        }
        Input::Interrupt => return Flow::Exit,
        Input::Quit if chat.is_loading() => return Flow::Drain,
        Input::Quit => return Flow::Exit,
        Input::Empty => write_stdout(PROMPT).await,
    }
    Flow::Continue
}

/// Forward stdin lines until EOF
async fn read_stdin(tx: mpsc::Sender<Input>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(parse_line(&line)).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
    let _ = tx.send(Input::Quit).await;
}

/// Forward every Ctrl-C as an interrupt
async fn watch_interrupts(tx: mpsc::Sender<Input>) {
    loop {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        if tx.send(Input::Interrupt).await.is_err() {
            return;
        }
    }
}

/// Render chat messages until the chat is dropped
async fn print_messages(mut rx: mpsc::Receiver<ChatMessage>) {
    let mut renderer = Renderer::new();
    while let Some(msg) = rx.recv().await {
        match renderer.render(&msg) {
            Some(Output::Stdout(text)) => write_stdout(&text).await,
            Some(Output::Stderr(text)) => write_stderr(&text).await,
            None => {}
        }
    }
    write_stdout("\n").await;
}

async fn write_stdout(text: &str) {
    let mut stdout = tokio::io::stdout();
    if let Err(e) = stdout.write_all(text.as_bytes()).await {
        warn!(error = %e, "Failed to write to stdout");
        return;
    }
    let _ = stdout.flush().await;
}

async fn write_stderr(text: &str) {
    let mut stderr = tokio::io::stderr();
    if stderr.write_all(text.as_bytes()).await.is_ok() {
        let _ = stderr.flush().await;
    }
}
