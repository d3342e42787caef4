//! services/client/src/adapters/db.rs
//!
//! This module contains the table adapter, which is the concrete implementation
//! of the `NoteRepository` port from the `core` crate. It talks to the backend's
//! PostgREST endpoint for the notes table.

use crate::adapters::supabase::SupabaseClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use note_cycle_core::domain::{Major, NewNote, Note, NoteId, UnknownMajor};
use note_cycle_core::ports::{NoteRepository, PortError, PortResult};
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A table adapter that implements the `NoteRepository` port.
#[derive(Clone)]
pub struct SupabaseNotesAdapter {
    client: SupabaseClient,
    table: String,
}

impl SupabaseNotesAdapter {
    /// Creates a new `SupabaseNotesAdapter` for the given table.
    pub fn new(client: SupabaseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct NoteRecord {
    #[serde(deserialize_with = "id_as_string")]
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    course: String,
    major: String,
    file_path: String,
    file_url: String,
    user_id: String,
    #[serde(default)]
    user_email: Option<String>,
    created_at: DateTime<Utc>,
}

impl NoteRecord {
    fn to_domain(self) -> Result<Note, UnknownMajor> {
        Ok(Note {
            id: NoteId(self.id),
            title: self.title,
            description: self.description.filter(|d| !d.is_empty()),
            course: self.course,
            major: self.major.parse::<Major>()?,
            file_path: self.file_path,
            file_url: self.file_url,
            user_id: self.user_id,
            user_email: self.user_email.unwrap_or_default(),
            created_at: self.created_at,
        })
    }
}

#[derive(Serialize)]
struct NewNoteRecord<'a> {
    title: &'a str,
    description: Option<&'a str>,
    course: &'a str,
    major: &'a str,
    file_path: &'a str,
    file_url: &'a str,
    user_id: &'a str,
    user_email: &'a str,
}

impl<'a> From<&'a NewNote> for NewNoteRecord<'a> {
    fn from(note: &'a NewNote) -> Self {
        Self {
            title: &note.title,
            description: note.description.as_deref(),
            course: &note.course,
            major: note.major.as_str(),
            file_path: &note.file_path,
            file_url: &note.file_url,
            user_id: &note.user_id,
            user_email: &note.user_email,
        }
    }
}

/// Ids may be serial integers or uuids depending on how the table was created.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unsupported note id {}", other))),
    }
}

//=========================================================================================
// `NoteRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl NoteRepository for SupabaseNotesAdapter {
    async fn list_notes(&self) -> PortResult<Vec<Note>> {
        let mut url = self.client.endpoint(["rest", "v1", self.table.as_str()])?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "created_at.desc");

        let response = self.client.send(self.client.request(Method::GET, url)).await?;
        let records: Vec<NoteRecord> = self.client.json(response).await?;

        let notes = records
            .into_iter()
            .filter_map(|r| {
                let id = r.id.clone();
                r.to_domain()
                    .map_err(|e| warn!("Skipping note {}: {}", id, e))
                    .ok()
            })
            .collect();
        Ok(notes)
    }

    async fn insert_note(&self, note: NewNote) -> PortResult<Note> {
        let url = self.client.endpoint(["rest", "v1", self.table.as_str()])?;
        let request = self
            .client
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&[NewNoteRecord::from(&note)]);

        let response = self.client.send(request).await?;
        let mut records: Vec<NoteRecord> = self.client.json(response).await?;
        let record = records
            .pop()
            .ok_or_else(|| PortError::Unexpected("Insert returned no row".to_string()))?;
        record
            .to_domain()
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn delete_note(&self, id: &NoteId) -> PortResult<()> {
        let mut url = self.client.endpoint(["rest", "v1", self.table.as_str()])?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        self.client
            .send(self.client.request(Method::DELETE, url))
            .await?;
        Ok(())
    }
}
