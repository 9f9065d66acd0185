//! Domain DTOs for the assistant backend.
//!
//! # Design
//! These types mirror the backend's JSON but are defined independently from
//! the mock-server crate; integration tests catch schema drift. Fields the
//! backend may omit carry `#[serde(default)]` so a sparse response still
//! parses: the client does not validate server payloads beyond their shape.
//! Timestamps stay as the strings the server sent.

use serde::{Deserialize, Serialize};

use crate::store::Identified;

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

/// Request payload for `POST /api/chat/message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Reply to a text or audio chat message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Transcript of the uploaded audio; absent for text messages and when
    /// transcription failed.
    #[serde(default)]
    pub original_audio_text: Option<String>,
}

/// Audio payload for `POST /api/chat/audio-message`.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub user_id: String,
}

/// One stored exchange in the server-side chat history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub ai_response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response of `GET /api/chat/history/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatHistoryPage {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub messages: Vec<ChatRecord>,
}

/// Generic acknowledgement body returned by delete/complete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}

/// A note as listed or returned by the notes endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Title and body for creating or replacing a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
}

/// A calendar event. The per-user listings name the start `start_time`;
/// both spellings land in `datetime`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(alias = "start_time")]
    pub datetime: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request payload for creating a calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInput {
    pub title: String,
    pub datetime: String,
    #[serde(default)]
    pub description: String,
}

/// A reminder. The backend reports completion as `is_completed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub reminder_time: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, alias = "is_completed")]
    pub completed: bool,
}

/// Request payload for creating or replacing a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub reminder_time: String,
    pub user_id: String,
}

/// Current conditions for one city. Always replaced as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherSnapshot {
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
    pub temperature: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub humidity: i64,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub pressure: i64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Identified for Note {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for CalendarEvent {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Reminder {
    fn id(&self) -> &str {
        &self.id
    }
}
