//! crates/note_cycle_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any backend or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Identity
//=========================================================================================

/// The authenticated principal issued by the external auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

//=========================================================================================
// Majors and the Course Catalog
//=========================================================================================

/// The academic majors notes are organized under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Major {
    #[default]
    Biology,
    Chemistry,
    Economics,
    ComputerScienceEngineering,
}

impl Major {
    /// Every major, in display order.
    pub const ALL: [Major; 4] = [
        Major::Biology,
        Major::Chemistry,
        Major::Economics,
        Major::ComputerScienceEngineering,
    ];

    /// The exact string stored in `note.major`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Major::Biology => "Biology",
            Major::Chemistry => "Chemistry",
            Major::Economics => "Economics",
            Major::ComputerScienceEngineering => "Computer Science & Engineering",
        }
    }
}

impl fmt::Display for Major {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown major: {0}")]
pub struct UnknownMajor(pub String);

impl FromStr for Major {
    type Err = UnknownMajor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Major::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownMajor(s.to_string()))
    }
}

/// The browse filter: every note, or the notes of a single major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MajorFilter {
    #[default]
    All,
    Only(Major),
}

impl MajorFilter {
    pub fn matches(&self, note: &Note) -> bool {
        match self {
            MajorFilter::All => true,
            MajorFilter::Only(major) => note.major == *major,
        }
    }
}

impl fmt::Display for MajorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MajorFilter::All => f.write_str("All"),
            MajorFilter::Only(major) => fmt::Display::fmt(major, f),
        }
    }
}

impl FromStr for MajorFilter {
    type Err = UnknownMajor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(MajorFilter::All);
        }
        s.parse().map(MajorFilter::Only)
    }
}

/// Static mapping from major to its ordered course codes.
#[derive(Debug, Clone)]
pub struct CourseCatalog {
    courses: Vec<(Major, Vec<String>)>,
}

impl CourseCatalog {
    pub fn new(courses: Vec<(Major, Vec<String>)>) -> Self {
        Self { courses }
    }

    /// The courses offered under `major`, in catalog order.
    pub fn courses(&self, major: Major) -> &[String] {
        self.courses
            .iter()
            .find(|(m, _)| *m == major)
            .map(|(_, c)| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, major: Major, course: &str) -> bool {
        self.courses(major).iter().any(|c| c == course)
    }
}

impl Default for CourseCatalog {
    fn default() -> Self {
        let entry = |major: Major, codes: &[&str]| -> (Major, Vec<String>) {
            (major, codes.iter().map(|c| c.to_string()).collect())
        };
        Self::new(vec![
            entry(Major::Biology, &["BIS 2A", "BIS 2B", "BIS 2C", "NPB 101", "MCB 121L"]),
            entry(Major::Chemistry, &["CHE 2A", "CHE 2B", "CHE 2C", "CHE 118A", "CHE 128A"]),
            entry(Major::Economics, &["ECN 1A", "ECN 1B", "ECN 100", "ECN 122", "ECN 140"]),
            entry(
                Major::ComputerScienceEngineering,
                &["ECS 36A", "ECS 36B", "ECS 36C", "ECS 122A", "ECS 154A"],
            ),
        ])
    }
}

//=========================================================================================
// Notes
//=========================================================================================

/// Backend-assigned note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteId(pub String);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A metadata record describing one uploaded PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub description: Option<String>,
    pub course: String,
    pub major: Major,
    pub file_path: String,
    pub file_url: String,
    /// Uploader snapshot taken at upload time.
    pub user_id: String,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        self.user_id == identity.id
    }
}

/// The fields of a note before the backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub description: Option<String>,
    pub course: String,
    pub major: Major,
    pub file_path: String,
    pub file_url: String,
    pub user_id: String,
    pub user_email: String,
}

/// Returns the notes matching `filter`, preserving the input order.
pub fn filter_notes<'a>(notes: &'a [Note], filter: &MajorFilter) -> Vec<&'a Note> {
    notes.iter().filter(|n| filter.matches(n)).collect()
}

/// Derives the object storage key `{major}/{course}/{millis}_{suffix}.{ext}`.
///
/// The extension is whatever follows the last `.` in `file_name`; a name
/// without a dot is used whole.
pub fn storage_key(
    major: Major,
    course: &str,
    file_name: &str,
    epoch_millis: i64,
    suffix: &str,
) -> String {
    let ext = file_name.rsplit('.').next().unwrap_or(file_name);
    format!("{}/{}/{}_{}.{}", major.as_str(), course, epoch_millis, suffix, ext)
}

//=========================================================================================
// Session Events
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session-change notification; `identity` is the session's user after the change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub identity: Option<Identity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, major: Major) -> Note {
        Note {
            id: NoteId(id.to_string()),
            title: format!("note {id}"),
            description: None,
            course: "X".to_string(),
            major,
            file_path: String::new(),
            file_url: String::new(),
            user_id: "u1".to_string(),
            user_email: "a@x.edu".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn major_parses_display_names() {
        assert_eq!(
            "Computer Science & Engineering".parse::<Major>(),
            Ok(Major::ComputerScienceEngineering)
        );
        assert_eq!("biology".parse::<Major>(), Ok(Major::Biology));
        assert!("Physics".parse::<Major>().is_err());
        assert_eq!("All".parse::<MajorFilter>(), Ok(MajorFilter::All));
    }

    #[test]
    fn filter_keeps_order_and_matches_exactly() {
        let notes = vec![
            note("3", Major::Economics),
            note("2", Major::Biology),
            note("1", Major::Economics),
        ];

        let all = filter_notes(&notes, &MajorFilter::All);
        assert_eq!(all.len(), 3);
        assert!(all.iter().zip(&notes).all(|(a, b)| *a == b));

        let econ = filter_notes(&notes, &MajorFilter::Only(Major::Economics));
        let ids: Vec<_> = econ.iter().map(|n| n.id.0.as_str()).collect();
        assert_eq!(ids, ["3", "1"]);

        for major in Major::ALL {
            assert!(filter_notes(&notes, &MajorFilter::Only(major))
                .iter()
                .all(|n| n.major == major));
        }
    }

    #[test]
    fn catalog_scopes_courses_to_their_major() {
        let catalog = CourseCatalog::default();
        assert!(catalog.contains(Major::ComputerScienceEngineering, "ECS 36A"));
        assert!(!catalog.contains(Major::Biology, "ECS 36A"));
        assert_eq!(catalog.courses(Major::Chemistry)[0], "CHE 2A");
    }

    #[test]
    fn storage_key_uses_last_extension() {
        let key = storage_key(Major::Biology, "BIS 2A", "week.1.notes.pdf", 1700000000000, "k3x9q");
        assert_eq!(key, "Biology/BIS 2A/1700000000000_k3x9q.pdf");

        let bare = storage_key(Major::Economics, "ECN 1A", "notes", 5, "a");
        assert_eq!(bare, "Economics/ECN 1A/5_a.notes");
    }
}
