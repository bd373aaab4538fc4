//! Input Parsing
//!
//! Turns stdin lines and signals into commands for the chat loop.

/// One thing the user asked for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Text to send as a user turn
    Submit(String),
    /// Clear the conversation
    Reset,
    /// Switch the system prompt (none clears it) and start over
    System(Option<String>),
    /// Print the command list
    Help,
    /// Ctrl-C: cancel the stream, or exit when idle
    Interrupt,
    /// Leave the program
    Quit,
    /// Blank line
    Empty,
}

/// Command list shown by `/help`
pub const HELP: &str = "\
Type a message and press Enter to send it.
  /reset            clear the conversation
  /system <text>    switch the system prompt and start over
  /system           clear the system prompt and start over
  /help             show this list
  /quit             exit
Ctrl-C cancels a streaming answer, or exits when nothing is streaming.";

/// Parse one line of stdin
pub fn parse_line(line: &str) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Input::Empty;
    }

    let Some(command) = line.trim_start().strip_prefix('/') else {
        return Input::Submit(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    match name {
        "reset" | "clear" => Input::Reset,
        "system" if rest.is_empty() => Input::System(None),
        "system" => Input::System(Some(rest.to_string())),
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        // Unknown commands are sent as text
        _ => Input::Submit(line.to_string()),
    }
}
