//! services/client/src/app/terminal.rs
//!
//! The interactive terminal front end: reads commands from stdin, drives the
//! controller, and asks the follow-up questions (credentials, upload details,
//! delete confirmation) on the same input stream.

use crate::app::controller::NoteCycle;
use crate::app::delete::{ConfirmationPrompt, DeleteOutcome};
use crate::app::protocol::{Command, HELP};
use crate::app::render::render;
use crate::app::router::{AuthMode, Navigation};
use crate::app::upload::UploadFile;
use crate::error::ActionError;
use async_trait::async_trait;
use bytes::Bytes;
use note_cycle_core::domain::Major;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

pub struct Terminal {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Prints `label` and reads one line. `None` means stdin is closed.
    pub async fn prompt(&self, label: &str) -> std::io::Result<Option<String>> {
        print!("{}", label);
        std::io::stdout().flush()?;
        self.lines.lock().await.next_line().await
    }
}

#[async_trait]
impl ConfirmationPrompt for Terminal {
    async fn confirm(&self, message: &str) -> bool {
        match self.prompt(&format!("{} [y/N] ", message)).await {
            Ok(Some(answer)) => is_yes(&answer),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Runs the read-eval-print loop until `quit` or end of input.
pub async fn run(app: &mut NoteCycle, terminal: &Terminal) -> std::io::Result<()> {
    println!("{}", render(app));
    loop {
        let Some(line) = terminal.prompt("> ").await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        debug!("Command {:?}", command);

        match command {
            Command::Quit => break,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Home => app.navigate(Navigation::Home),
            Command::About => app.navigate(Navigation::About),
            Command::Notes => app.navigate(Navigation::Notes),
            Command::Filter(filter) => {
                app.navigate(Navigation::Notes);
                app.select_major(filter);
            }
            Command::Refresh => {
                if !app.refresh().await {
                    println!("Could not refresh the notes; showing what was loaded before.");
                }
            }
            Command::Auth(mode) => {
                app.open_auth(mode);
                auth_flow(app, terminal).await?;
            }
            Command::Logout => app.sign_out().await,
            Command::Upload => upload_flow(app, terminal).await?,
            Command::Delete(number) => delete_flow(app, terminal, number).await?,
        }
        println!("{}", render(app));
    }
    Ok(())
}

/// Asks for credentials until they are accepted or the user gives up.
async fn auth_flow(app: &mut NoteCycle, terminal: &Terminal) -> std::io::Result<()> {
    loop {
        let mode = match app.router().auth_modal() {
            Some(modal) => modal.mode,
            None => return Ok(()),
        };
        let title = match mode {
            AuthMode::SignIn => "Login",
            AuthMode::SignUp => "Sign Up",
        };
        println!("[{}]", title);

        let (Some(email), Some(password)) = (
            terminal.prompt("Email: ").await?,
            terminal.prompt("Password: ").await?,
        ) else {
            app.close_auth();
            return Ok(());
        };
        app.fill_auth(&email, &password);

        match app.submit_auth().await {
            Ok(Some(identity)) => {
                println!("Welcome, {}!", identity.email);
                return Ok(());
            }
            Ok(None) => {
                println!("Check your email to confirm your account, then log in.");
                return Ok(());
            }
            Err(e) => {
                println!("{}", e);
                let other = match mode {
                    AuthMode::SignIn => "sign up instead",
                    AuthMode::SignUp => "log in instead",
                };
                let answer = terminal
                    .prompt(&format!("Try again? [y/N, or 's' to {}] ", other))
                    .await?
                    .unwrap_or_default();
                match answer.trim().to_lowercase().as_str() {
                    "s" => app.toggle_auth_mode(),
                    a if is_yes(a) => {}
                    _ => {
                        app.close_auth();
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Collects the upload form field by field, then submits it.
async fn upload_flow(app: &mut NoteCycle, terminal: &Terminal) -> std::io::Result<()> {
    if !app.open_upload() {
        println!("Please sign up or log in to upload notes.");
        return auth_flow(app, terminal).await;
    }

    match fill_upload_form(app, terminal).await? {
        Some(()) => {}
        None => {
            app.close_upload();
            return Ok(());
        }
    }

    println!("Uploading...");
    match app.submit_upload().await {
        Ok(note) => println!("Uploaded '{}' to {}.", note.title, note.course),
        Err(e) => {
            println!("{}", e);
            if matches!(e, ActionError::Validation(_)) {
                app.close_upload();
            }
        }
    }
    Ok(())
}

/// Returns `None` when the user abandons the form.
async fn fill_upload_form(app: &mut NoteCycle, terminal: &Terminal) -> std::io::Result<Option<()>> {
    let Some(title) = terminal.prompt("Title: ").await? else {
        return Ok(None);
    };
    let Some(description) = terminal.prompt("Description (optional): ").await? else {
        return Ok(None);
    };

    for (i, major) in Major::ALL.iter().enumerate() {
        println!("  {}. {}", i + 1, major);
    }
    let Some(major) = pick(terminal, "Major: ", &Major::ALL).await? else {
        return Ok(None);
    };

    let courses = app.catalog().courses(major).to_vec();
    for (i, course) in courses.iter().enumerate() {
        println!("  {}. {}", i + 1, course);
    }
    let Some(course) = pick(terminal, "Course: ", &courses).await? else {
        return Ok(None);
    };

    let Some(path) = terminal.prompt("PDF file path: ").await? else {
        return Ok(None);
    };
    let path = Path::new(path.trim());
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            println!("Could not read {}: {}", path.display(), e);
            return Ok(None);
        }
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string());

    let chosen = app.edit_upload_form(|form| {
        form.title = title;
        form.description = description;
        form.set_major(major);
        form.course = course;
        form.choose_file(UploadFile::sniffed(name, bytes))
    });
    if let Err(e) = chosen {
        println!("{}", e);
        return Ok(None);
    }
    Ok(Some(()))
}

/// Reads a 1-based choice from `options`, asking again on bad input.
async fn pick<T: Clone>(terminal: &Terminal, label: &str, options: &[T]) -> std::io::Result<Option<T>> {
    loop {
        let Some(answer) = terminal.prompt(label).await? else {
            return Ok(None);
        };
        match answer.trim().parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(options[n - 1].clone())),
            _ => println!("Enter a number between 1 and {}.", options.len()),
        }
    }
}

async fn delete_flow(app: &mut NoteCycle, terminal: &Terminal, number: usize) -> std::io::Result<()> {
    let Some(note) = app.visible_notes().into_iter().nth(number - 1) else {
        println!("There is no note number {}.", number);
        return Ok(());
    };

    match app.delete_note(&note).await {
        Ok(DeleteOutcome::Deleted) => println!("Deleted '{}'.", note.title),
        Ok(DeleteOutcome::Cancelled) => {}
        Err(e) => {
            println!("{}", e);
            if app.router().auth_modal().is_some() {
                auth_flow(app, terminal).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES\n"));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }
}
