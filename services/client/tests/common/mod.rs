//! Shared fixtures for the client's integration tests: an in-process backend,
//! a scripted confirmation prompt and a few ready-made notes.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use note_cycle_core::domain::{Identity, Major, NewNote, Note};
use notecycle_lib::adapters::InMemoryBackend;
use notecycle_lib::app::upload::UploadFile;
use notecycle_lib::app::{AppState, ConfirmationPrompt, NoteCycle};
use notecycle_lib::config::Config;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers every confirmation the same way and counts how often it was asked.
pub struct ScriptedPrompt {
    answer: AtomicBool,
    asked: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer: AtomicBool::new(answer),
            asked: AtomicUsize::new(0),
        })
    }

    pub fn set_answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmationPrompt for ScriptedPrompt {
    async fn confirm(&self, _message: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer.load(Ordering::SeqCst)
    }
}

pub fn test_config() -> Config {
    Config::new("http://127.0.0.1:9", "anon")
}

pub fn state_for(backend: &Arc<InMemoryBackend>, config: Config) -> Arc<AppState> {
    Arc::new(AppState::from_backend(backend.clone(), config))
}

pub struct Harness {
    pub backend: Arc<InMemoryBackend>,
    pub prompt: Arc<ScriptedPrompt>,
    pub app: NoteCycle,
}

impl Harness {
    /// A started client over `backend` whose delete prompt answers yes.
    pub async fn start(backend: InMemoryBackend) -> Self {
        Self::start_with(backend, test_config()).await
    }

    pub async fn start_with(backend: InMemoryBackend, config: Config) -> Self {
        let backend = Arc::new(backend);
        let prompt = ScriptedPrompt::answering(true);
        let mut app = NoteCycle::new(state_for(&backend, config), prompt.clone());
        app.start().await;
        Self { backend, prompt, app }
    }
}

pub fn identity(id: &str, email: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: email.to_string(),
    }
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile::sniffed(name, Bytes::from_static(b"%PDF-1.7\n% notes\n"))
}

pub fn new_note(owner: &Identity, title: &str, major: Major, course: &str) -> NewNote {
    let file_path = format!("{}/{}/{}.pdf", major.as_str(), course, title.replace(' ', "_"));
    NewNote {
        title: title.to_string(),
        description: None,
        course: course.to_string(),
        major,
        file_url: format!("memory://notes-pdfs/{}", file_path),
        file_path,
        user_id: owner.id.clone(),
        user_email: owner.email.clone(),
    }
}

/// Seeds one note per major for `owner`, returning them oldest first.
pub fn seed_one_per_major(backend: &InMemoryBackend, owner: &Identity) -> Vec<Note> {
    [
        (Major::Biology, "BIS 2A"),
        (Major::Chemistry, "CHE 2A"),
        (Major::Economics, "ECN 1A"),
        (Major::ComputerScienceEngineering, "ECS 36A"),
    ]
    .into_iter()
    .map(|(major, course)| {
        backend.seed_note(
            new_note(owner, &format!("{} notes", course), major, course),
            Bytes::from_static(b"%PDF-1.4"),
        )
    })
    .collect()
}
