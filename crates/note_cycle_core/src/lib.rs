pub mod domain;
pub mod ports;

pub use domain::{
    filter_notes, storage_key, CourseCatalog, Identity, Major, MajorFilter, NewNote, Note, NoteId,
    SessionEvent, SessionEventKind, UnknownMajor,
};
pub use ports::{AuthService, NoteRepository, ObjectStorage, PortError, PortResult, SessionEvents};
