//! services/client/src/app/protocol.rs
//!
//! Defines the command protocol between the terminal and the controller: one
//! command per input line.

use crate::app::router::AuthMode;
use note_cycle_core::domain::{MajorFilter, UnknownMajor};

/// The commands a user can type at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Home,
    About,
    Notes,
    /// Narrows the grid to one major, or back to all of them.
    Filter(MajorFilter),
    /// Opens the auth form in the given mode and prompts for credentials.
    Auth(AuthMode),
    Logout,
    Upload,
    /// Deletes the n-th note of the grid, counting from 1.
    Delete(usize),
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command '{0}'. Type 'help' for the list of commands.")]
    Unknown(String),
    #[error("'{0}' needs an argument: {1}")]
    MissingArgument(&'static str, &'static str),
    #[error("'{0}' is not a note number")]
    BadIndex(String),
    #[error(transparent)]
    Major(#[from] UnknownMajor),
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "home" => Command::Home,
            "about" => Command::About,
            "notes" | "browse" => Command::Notes,
            "filter" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArgument("filter", "All or a major name"));
                }
                Command::Filter(rest.parse()?)
            }
            "login" | "signin" => Command::Auth(AuthMode::SignIn),
            "signup" => Command::Auth(AuthMode::SignUp),
            "logout" => Command::Logout,
            "upload" => Command::Upload,
            "delete" | "rm" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArgument("delete", "the note number"));
                }
                let index = rest
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ParseError::BadIndex(rest.to_string()))?;
                Command::Delete(index)
            }
            "refresh" => Command::Refresh,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(ParseError::Unknown(word.to_string())),
        };
        Ok(command)
    }
}

pub const HELP: &str = "\
Commands:
  home | about | notes        switch page
  filter <All|major>          show one major's notes
  login | signup | logout     manage your session
  upload                      share a PDF (asks for the details)
  delete <n>                  delete your n-th listed note
  refresh                     reload the notes
  help | quit";
