//! services/client/src/app/render.rs
//!
//! Turns the controller's state into the text the terminal prints.

use crate::app::controller::NoteCycle;
use crate::app::router::{AuthMode, View};
use note_cycle_core::domain::{Identity, Major, MajorFilter, Note};
use std::fmt::Write;

pub fn render(app: &NoteCycle) -> String {
    let mut out = String::new();
    let identity = app.identity();

    let _ = writeln!(out, "=== NoteCycle ===");
    match &identity {
        Some(identity) => {
            let _ = writeln!(out, "Signed in as {}", identity.email);
        }
        None => {
            let _ = writeln!(out, "Not signed in");
        }
    }

    match app.view() {
        View::Landing => {
            let _ = writeln!(out, "\nNote sharing, simplified.");
            let _ = writeln!(out, "Type 'signup' or 'login' to get started, 'notes' to browse.");
        }
        View::About => {
            let _ = writeln!(out, "\nAbout NoteCycle: browse notes by major, upload your own PDFs.");
        }
        View::Main => render_main(&mut out, app, identity.as_ref()),
    }

    if let Some(modal) = app.router().auth_modal() {
        let title = match modal.mode {
            AuthMode::SignIn => "Login",
            AuthMode::SignUp => "Sign Up",
        };
        let _ = writeln!(out, "\n[{}]", title);
        if let Some(error) = &modal.error {
            let _ = writeln!(out, "  {}", error);
        }
    }
    out
}

fn render_main(out: &mut String, app: &NoteCycle, identity: Option<&Identity>) {
    let filters = std::iter::once(MajorFilter::All).chain(Major::ALL.into_iter().map(MajorFilter::Only));
    let tabs: Vec<String> = filters
        .map(|f| {
            if f == app.selected_major() {
                format!("[{}]", f)
            } else {
                f.to_string()
            }
        })
        .collect();
    let _ = writeln!(out, "\n{}", tabs.join(" | "));

    let heading = match app.selected_major() {
        MajorFilter::All => "All Notes".to_string(),
        MajorFilter::Only(major) => format!("{} Notes", major),
    };
    let _ = writeln!(out, "\n{}", heading);

    let directory = app.directory();
    if let Some(banner) = directory.last_error() {
        let _ = writeln!(out, "! {}", banner);
    }
    if directory.is_loading() {
        let _ = writeln!(out, "Loading notes...");
        return;
    }

    let notes = app.visible_notes();
    if notes.is_empty() {
        let _ = writeln!(out, "No notes yet.");
    }
    for (i, note) in notes.iter().enumerate() {
        render_note(out, i + 1, note, identity);
    }
}

fn render_note(out: &mut String, number: usize, note: &Note, identity: Option<&Identity>) {
    let owned = identity.is_some_and(|id| note.is_owned_by(id));
    let _ = writeln!(
        out,
        "{:>3}. {} ({} / {}){}",
        number,
        note.title,
        note.major,
        note.course,
        if owned { "  [yours]" } else { "" }
    );
    if let Some(description) = &note.description {
        let _ = writeln!(out, "     {}", description);
    }
    let _ = writeln!(
        out,
        "     by {} on {}  {}",
        note.user_email,
        note.created_at.format("%Y-%m-%d"),
        note.file_url
    );
}
