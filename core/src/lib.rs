//! Client core for the personal assistant app.
//!
//! # Overview
//! The app has five screens (chat, notes, calendar, reminders, weather)
//! backed by one HTTP API. This crate holds everything below the widgets:
//! request building, response parsing, error mapping, per-screen state and
//! the voice-recording state machine.
//!
//! # Design
//! - `AssistantClient` is stateless. Each endpoint is split into `build_*`
//!   (produces an `HttpRequest`) and `parse_*` (consumes an `HttpResponse`),
//!   so the I/O boundary is explicit and the client is testable without a
//!   network.
//! - `Transport` executes requests. `UreqTransport` is the blocking
//!   implementation; tests script their own.
//! - `Gateway` pairs the two, applies per-call timeouts and turns every
//!   failure into a `GatewayError` with a short message fit for the user.
//! - Screen controllers own local collections (`ListStore`,
//!   `SnapshotStore`) that only change after the server agrees.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod recording;
pub mod screens;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use chat::{ChatHistoryEntry, ChatScreen, Message};
pub use client::AssistantClient;
pub use config::{ClientConfig, Timeouts};
pub use error::{ApiError, ConfigError, ErrorKind, GatewayError};
pub use gateway::{Gateway, TIMEOUT_MESSAGE};
pub use http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse};
pub use recording::{AudioRecorder, RecordingError, RecordingSession, RecordingState};
pub use screens::{CalendarScreen, NotesScreen, RemindersScreen, Screen, WeatherScreen};
pub use store::{Identified, ListStore, SnapshotStore};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Acknowledgement, AudioUpload, CalendarEvent, ChatHistoryPage, ChatRecord, ChatReply, ChatRequest,
    EventInput, HealthStatus, Note, NoteInput, Reminder, ReminderInput, WeatherSnapshot,
};
