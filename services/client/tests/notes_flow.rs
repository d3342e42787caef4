//! End-to-end flows of the client against the in-process backend: browsing,
//! uploading and deleting notes.

mod common;

use bytes::Bytes;
use common::{identity, new_note, pdf, seed_one_per_major, state_for, test_config, Harness};
use note_cycle_core::domain::{CourseCatalog, Major, MajorFilter};
use note_cycle_core::ports::PortError;
use notecycle_lib::adapters::{InMemoryBackend, Operation};
use notecycle_lib::app::directory::NotesDirectory;
use notecycle_lib::app::router::{AuthMode, Navigation, View};
use notecycle_lib::app::upload::{UploadFile, UploadForm, UploadOrchestrator};
use notecycle_lib::app::DeleteOutcome;
use notecycle_lib::error::{ActionError, ValidationError};
use std::time::Duration;

fn fill_midterm(h: &Harness) {
    h.app.edit_upload_form(|form| {
        form.title = "Midterm 1".to_string();
        form.description = "  Week 1-5 review ".to_string();
        form.set_major(Major::ComputerScienceEngineering);
        form.course = "ECS 36A".to_string();
        form.choose_file(pdf("midterm.pdf")).unwrap();
    });
}

// =============================================================================
// Browsing
// =============================================================================

#[tokio::test]
async fn anonymous_user_browses_and_filters_by_major() {
    let backend = InMemoryBackend::new();
    let owner = identity("owner", "owner@x.edu");
    let seeded = seed_one_per_major(&backend, &owner);

    let mut h = Harness::start(backend).await;
    assert_eq!(h.app.identity(), None);
    assert_eq!(h.app.view(), View::Landing);

    h.app.navigate(Navigation::Notes);
    assert_eq!(h.app.view(), View::Main);
    assert!(!h.app.directory().is_loading());

    // Newest first.
    let titles: Vec<_> = h.app.visible_notes().into_iter().map(|n| n.title).collect();
    let expected: Vec<_> = seeded.iter().rev().map(|n| n.title.clone()).collect();
    assert_eq!(titles, expected);

    for major in Major::ALL {
        h.app.select_major(MajorFilter::Only(major));
        let visible = h.app.visible_notes();
        assert_eq!(visible.len(), 1);
        assert!(visible.iter().all(|n| n.major == major));
    }

    h.app.select_major(MajorFilter::All);
    assert_eq!(h.app.visible_notes().len(), seeded.len());
}

#[tokio::test]
async fn failed_refresh_keeps_the_notes_already_shown() {
    let backend = InMemoryBackend::new();
    seed_one_per_major(&backend, &identity("owner", "owner@x.edu"));
    let h = Harness::start(backend).await;
    assert_eq!(h.app.visible_notes().len(), 4);

    h.backend
        .fail_next(Operation::ListNotes, PortError::Unexpected("connection reset".to_string()));
    assert!(!h.app.refresh().await);

    assert_eq!(h.app.visible_notes().len(), 4);
    assert!(!h.app.directory().is_loading());
    // Silent by default.
    assert_eq!(h.app.directory().last_error(), None);
}

#[tokio::test]
async fn notify_policy_surfaces_fetch_failures_until_the_next_success() {
    let backend = InMemoryBackend::new();
    seed_one_per_major(&backend, &identity("owner", "owner@x.edu"));
    let mut config = test_config();
    config.fetch_failure_policy = notecycle_lib::config::FetchFailurePolicy::Notify;
    let h = Harness::start_with(backend, config).await;

    h.backend
        .fail_next(Operation::ListNotes, PortError::Unexpected("connection reset".to_string()));
    assert!(!h.app.refresh().await);
    let banner = h.app.directory().last_error().unwrap();
    assert!(banner.contains("connection reset"));
    assert_eq!(h.app.visible_notes().len(), 4);

    assert!(h.app.refresh().await);
    assert_eq!(h.app.directory().last_error(), None);
}

#[tokio::test]
async fn slow_backend_is_cut_off_by_the_timeout() {
    let backend = InMemoryBackend::new().with_latency(Duration::from_millis(200));
    let mut config = test_config();
    config.backend_timeout = Duration::from_millis(20);
    let h = Harness::start_with(backend, config).await;

    // Startup gave up on both the session lookup and the first fetch.
    assert_eq!(h.app.identity(), None);
    assert!(!h.app.directory().is_loading());
    assert!(!h.app.refresh().await);
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn signed_in_user_uploads_a_note() {
    let backend = InMemoryBackend::new();
    let u1 = identity("u1", "a@x.edu");
    let older = seed_one_per_major(&backend, &identity("u2", "b@x.edu"));
    backend.persist_session(u1.clone());

    let mut h = Harness::start(backend).await;
    assert_eq!(h.app.identity(), Some(u1.clone()));
    assert_eq!(h.app.view(), View::Main);
    assert_eq!(h.app.visible_notes().len(), older.len());

    assert!(h.app.open_upload());
    fill_midterm(&h);
    let note = h.app.submit_upload().await.unwrap();

    assert_eq!(note.title, "Midterm 1");
    assert_eq!(note.description.as_deref(), Some("Week 1-5 review"));
    assert_eq!(note.user_id, "u1");
    assert_eq!(note.user_email, "a@x.edu");
    assert_eq!(note.major, Major::ComputerScienceEngineering);
    assert_eq!(note.course, "ECS 36A");
    assert!(CourseCatalog::default().contains(note.major, &note.course));
    assert!(note.file_path.starts_with("Computer Science & Engineering/ECS 36A/"));
    assert!(note.file_path.ends_with(".pdf"));

    // The file is reachable through the recorded URL.
    assert_eq!(
        h.backend.fetch_url(&note.file_url),
        Some(Bytes::from_static(b"%PDF-1.7\n% notes\n"))
    );

    // The grid shows it ahead of the older notes, the overlay closed and the form is fresh.
    let visible = h.app.visible_notes();
    assert_eq!(visible.len(), older.len() + 1);
    assert_eq!(visible[0].id, note.id);
    assert!(visible.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert!(!h.app.router().is_upload_open());
    assert_eq!(h.app.upload_form(), UploadForm::default());
    assert!(!h.app.is_uploading());

    h.app.select_major(MajorFilter::Only(Major::Biology));
    assert!(h.app.visible_notes().iter().all(|n| n.id != note.id));
    h.app.select_major(MajorFilter::Only(Major::ComputerScienceEngineering));
    let cse = h.app.visible_notes();
    assert_eq!(cse.len(), 2);
    assert_eq!(cse[0].id, note.id);
}

#[tokio::test]
async fn invalid_forms_never_reach_the_backend() {
    let backend = InMemoryBackend::new();
    backend.persist_session(identity("u1", "a@x.edu"));
    let mut h = Harness::start(backend).await;
    let before = h.backend.total_calls();

    let err = h.app.submit_upload().await.unwrap_err();
    assert_eq!(err, ActionError::Validation(ValidationError::MissingTitle));

    h.app.edit_upload_form(|form| {
        form.title = "Problem set".to_string();
        form.set_major(Major::Economics);
        form.course = "ECS 36A".to_string();
    });
    let err = h.app.submit_upload().await.unwrap_err();
    assert!(matches!(
        err,
        ActionError::Validation(ValidationError::CourseNotInMajor { .. })
    ));

    h.app.edit_upload_form(|form| form.course = "ECN 1A".to_string());
    let err = h.app.submit_upload().await.unwrap_err();
    assert_eq!(err, ActionError::Validation(ValidationError::MissingFile));

    let refused = h.app.edit_upload_form(|form| {
        form.choose_file(UploadFile::new(
            "essay.docx",
            "application/msword",
            Bytes::from_static(b"PK\x03\x04"),
        ))
    });
    assert_eq!(refused, Err(ValidationError::NotPdf));
    assert_eq!(refused.unwrap_err().to_string(), "Please select a PDF file");

    assert_eq!(h.backend.total_calls(), before);
    assert_eq!(h.backend.object_count(), 0);
}

#[tokio::test]
async fn signed_out_upload_goes_to_sign_up_and_submits_nothing() {
    let mut h = Harness::start(InMemoryBackend::new()).await;

    assert!(!h.app.open_upload());
    assert!(!h.app.router().is_upload_open());
    assert_eq!(h.app.router().auth_modal().map(|m| m.mode), Some(AuthMode::SignUp));

    fill_midterm(&h);
    let before = h.backend.total_calls();
    let err = h.app.submit_upload().await.unwrap_err();
    assert_eq!(err, ActionError::Validation(ValidationError::NotAuthenticated));
    assert_eq!(h.backend.total_calls(), before);
}

#[tokio::test]
async fn storage_failure_creates_no_record() {
    let backend = InMemoryBackend::new();
    backend.persist_session(identity("u1", "a@x.edu"));
    let mut h = Harness::start(backend).await;
    h.backend
        .fail_next(Operation::Upload, PortError::Rejected("Payload too large".to_string()));

    fill_midterm(&h);
    let err = h.app.submit_upload().await.unwrap_err();
    assert_eq!(
        err,
        ActionError::StorageWrite(PortError::Rejected("Payload too large".to_string()))
    );
    assert_eq!(err.to_string(), "Error uploading note: Payload too large");

    assert_eq!(h.backend.calls(Operation::InsertNote), 0);
    assert!(h.backend.stored_notes().is_empty());
    // The form is kept for a retry.
    assert_eq!(h.app.upload_form().title, "Midterm 1");
}

#[tokio::test]
async fn metadata_failure_removes_the_orphaned_file() {
    let backend = InMemoryBackend::new();
    backend.persist_session(identity("u1", "a@x.edu"));
    let mut h = Harness::start(backend).await;
    h.backend
        .fail_next(Operation::InsertNote, PortError::Unexpected("insert failed".to_string()));

    fill_midterm(&h);
    let err = h.app.submit_upload().await.unwrap_err();
    assert!(matches!(err, ActionError::MetadataWrite(_)));

    assert_eq!(h.backend.calls(Operation::Upload), 1);
    assert_eq!(h.backend.calls(Operation::Remove), 1);
    assert_eq!(h.backend.object_count(), 0);
    assert!(h.backend.stored_notes().is_empty());
    assert!(h.app.visible_notes().is_empty());
}

#[tokio::test]
async fn refused_metadata_write_removes_the_file_without_checking() {
    let backend = InMemoryBackend::new();
    backend.persist_session(identity("u1", "a@x.edu"));
    let mut h = Harness::start(backend).await;
    let listed = h.backend.calls(Operation::ListNotes);
    h.backend.fail_next(
        Operation::InsertNote,
        PortError::Rejected("violates row-level security policy".to_string()),
    );

    fill_midterm(&h);
    let err = h.app.submit_upload().await.unwrap_err();
    assert_eq!(
        err,
        ActionError::MetadataWrite(PortError::Rejected("violates row-level security policy".to_string()))
    );

    assert_eq!(h.backend.calls(Operation::ListNotes), listed);
    assert_eq!(h.backend.calls(Operation::Remove), 1);
    assert_eq!(h.backend.object_count(), 0);
}

#[tokio::test]
async fn timed_out_metadata_write_that_never_landed_removes_the_file() {
    let backend = InMemoryBackend::new();
    backend.persist_session(identity("u1", "a@x.edu"));
    let mut h = Harness::start(backend).await;
    h.backend
        .fail_next(Operation::InsertNote, PortError::Timeout(Duration::from_secs(15)));

    fill_midterm(&h);
    let err = h.app.submit_upload().await.unwrap_err();
    assert!(matches!(err, ActionError::MetadataWrite(PortError::Timeout(_))));

    assert_eq!(h.backend.calls(Operation::Remove), 1);
    assert_eq!(h.backend.object_count(), 0);
    assert!(h.backend.stored_notes().is_empty());
}

#[tokio::test]
async fn unknown_metadata_outcome_keeps_the_file() {
    let backend = InMemoryBackend::new();
    backend.persist_session(identity("u1", "a@x.edu"));
    let mut h = Harness::start(backend).await;
    h.backend
        .fail_next(Operation::InsertNote, PortError::Unexpected("connection reset".to_string()));
    h.backend
        .fail_next(Operation::ListNotes, PortError::Unexpected("connection reset".to_string()));

    fill_midterm(&h);
    let err = h.app.submit_upload().await.unwrap_err();
    assert!(matches!(err, ActionError::MetadataWrite(_)));

    // Whether the record exists is unknown, so the file it may point at stays.
    assert_eq!(h.backend.calls(Operation::Remove), 0);
    assert_eq!(h.backend.object_count(), 1);
}

#[tokio::test]
async fn second_submit_while_uploading_is_refused() {
    let backend = std::sync::Arc::new(InMemoryBackend::new().with_latency(Duration::from_millis(30)));
    let state = state_for(&backend, test_config());
    let directory = NotesDirectory::new(state.clone());
    let uploads = UploadOrchestrator::new(state);
    let u1 = identity("u1", "a@x.edu");

    uploads.edit_form(|form| {
        form.title = "Lab report".to_string();
        form.set_major(Major::Chemistry);
        form.course = "CHE 2A".to_string();
        form.choose_file(pdf("lab.pdf")).unwrap();
    });

    let (first, second) = tokio::join!(
        uploads.submit(Some(&u1), &directory),
        uploads.submit(Some(&u1), &directory),
    );

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), ActionError::Busy("upload"));
    assert_eq!(backend.calls(Operation::Upload), 1);
    assert_eq!(backend.stored_notes().len(), 1);
    assert!(!uploads.is_busy());
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn upload_then_delete_leaves_nothing_behind() {
    let backend = InMemoryBackend::new();
    backend.persist_session(identity("u1", "a@x.edu"));
    let mut h = Harness::start(backend).await;

    fill_midterm(&h);
    let note = h.app.submit_upload().await.unwrap();
    assert!(h.backend.fetch_url(&note.file_url).is_some());

    let outcome = h.app.delete_note(&note).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(h.prompt.asked(), 1);

    assert_eq!(h.backend.fetch_url(&note.file_url), None);
    assert!(h.backend.stored_notes().is_empty());
    assert!(h.app.directory().find(&note.id).is_none());
    assert!(!h.app.is_deleting());
}

#[tokio::test]
async fn only_the_creator_may_delete() {
    let backend = InMemoryBackend::new();
    let owner = identity("owner", "owner@x.edu");
    let note = backend.seed_note(
        new_note(&owner, "Final review", Major::Biology, "BIS 2A"),
        Bytes::from_static(b"%PDF-1.4"),
    );
    backend.persist_session(identity("u2", "b@x.edu"));
    let mut h = Harness::start(backend).await;
    let before = h.backend.total_calls();

    let err = h.app.delete_note(&note).await.unwrap_err();
    assert_eq!(
        err,
        ActionError::Authorization("You can only delete your own notes".to_string())
    );
    assert_eq!(h.prompt.asked(), 0);
    assert_eq!(h.backend.total_calls(), before);
    assert!(h.backend.object(&note.file_path).is_some());
    assert!(h.app.directory().find(&note.id).is_some());
    // Signed in, so no auth overlay.
    assert!(h.app.router().auth_modal().is_none());
}

#[tokio::test]
async fn signed_out_delete_asks_for_sign_in() {
    let backend = InMemoryBackend::new();
    let owner = identity("owner", "owner@x.edu");
    let note = backend.seed_note(
        new_note(&owner, "Final review", Major::Biology, "BIS 2A"),
        Bytes::from_static(b"%PDF-1.4"),
    );
    let mut h = Harness::start(backend).await;

    assert!(matches!(
        h.app.delete_note(&note).await,
        Err(ActionError::Authorization(_))
    ));
    assert_eq!(h.app.router().auth_modal().map(|m| m.mode), Some(AuthMode::SignIn));
    assert_eq!(h.backend.stored_notes().len(), 1);
}

#[tokio::test]
async fn declining_the_confirmation_changes_nothing() {
    let backend = InMemoryBackend::new();
    let u1 = identity("u1", "a@x.edu");
    let note = backend.seed_note(
        new_note(&u1, "Midterm 1", Major::ComputerScienceEngineering, "ECS 36A"),
        Bytes::from_static(b"%PDF-1.4"),
    );
    backend.persist_session(u1);
    let mut h = Harness::start(backend).await;
    h.prompt.set_answer(false);

    assert_eq!(h.app.delete_note(&note).await.unwrap(), DeleteOutcome::Cancelled);
    assert_eq!(h.prompt.asked(), 1);
    assert_eq!(h.backend.calls(Operation::Remove), 0);
    assert_eq!(h.backend.calls(Operation::DeleteNote), 0);
    assert!(h.backend.object(&note.file_path).is_some());
    assert!(h.app.directory().find(&note.id).is_some());
}

#[tokio::test]
async fn failed_file_removal_keeps_the_record() {
    let backend = InMemoryBackend::new();
    let u1 = identity("u1", "a@x.edu");
    let note = backend.seed_note(
        new_note(&u1, "Midterm 1", Major::ComputerScienceEngineering, "ECS 36A"),
        Bytes::from_static(b"%PDF-1.4"),
    );
    backend.persist_session(u1);
    let mut h = Harness::start(backend).await;
    h.backend
        .fail_next(Operation::Remove, PortError::Unexpected("storage down".to_string()));

    let err = h.app.delete_note(&note).await.unwrap_err();
    assert!(matches!(err, ActionError::StorageDelete(_)));
    assert_eq!(h.backend.calls(Operation::DeleteNote), 0);
    assert_eq!(h.backend.stored_notes().len(), 1);
    assert!(h.app.directory().find(&note.id).is_some());
}

#[tokio::test]
async fn failed_record_removal_is_reported() {
    let backend = InMemoryBackend::new();
    let u1 = identity("u1", "a@x.edu");
    let note = backend.seed_note(
        new_note(&u1, "Midterm 1", Major::ComputerScienceEngineering, "ECS 36A"),
        Bytes::from_static(b"%PDF-1.4"),
    );
    backend.persist_session(u1);
    let mut h = Harness::start(backend).await;
    h.backend
        .fail_next(Operation::DeleteNote, PortError::Rejected("row locked".to_string()));

    let err = h.app.delete_note(&note).await.unwrap_err();
    assert!(matches!(err, ActionError::MetadataDelete(_)));
    assert_eq!(err.to_string(), "Error deleting note: row locked");
    assert_eq!(h.backend.stored_notes().len(), 1);
}
