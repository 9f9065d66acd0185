//! One typed call per backend capability.
//!
//! # Design
//! Every operation has the same shape: build the request with
//! `AssistantClient`, execute it once on the `Transport`, parse the body, and
//! on any failure replace the technical error with a fixed domain message.
//! The technical cause is logged at `warn` and then dropped. Only the chat
//! and audio paths swap in the dedicated timeout message; elsewhere a timeout
//! keeps `ErrorKind::Timeout` but carries the operation's usual message.
//!
//! There are no retries and no request coalescing: two calls issue two
//! requests.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::AssistantClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorKind, GatewayError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Acknowledgement, AudioUpload, CalendarEvent, ChatHistoryPage, ChatReply, ChatRequest, EventInput,
    HealthStatus, Note, NoteInput, Reminder, ReminderInput, WeatherSnapshot,
};

/// Shown when a chat or audio round-trip exceeds its budget.
pub const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";

const DEFAULT_AUDIO_FILE_NAME: &str = "recording.m4a";

struct Failure {
    operation: &'static str,
    message: &'static str,
    timeout_message: bool,
}

impl Failure {
    const fn plain(operation: &'static str, message: &'static str) -> Self {
        Self {
            operation,
            message,
            timeout_message: false,
        }
    }

    const fn long_running(operation: &'static str, message: &'static str) -> Self {
        Self {
            operation,
            message,
            timeout_message: true,
        }
    }
}

const HEALTH: Failure = Failure::plain("health", "could not connect to the server");
const SEND_MESSAGE: Failure = Failure::long_running("send_message", "could not send message");
const SEND_AUDIO: Failure = Failure::long_running("send_audio_message", "could not send audio message");
const CHAT_HISTORY: Failure = Failure::plain("chat_history", "could not load chat history");
const CLEAR_CHAT_HISTORY: Failure = Failure::plain("clear_chat_history", "could not delete chat history");
const LIST_NOTES: Failure = Failure::plain("list_notes", "could not load notes");
const GET_NOTE: Failure = Failure::plain("get_note", "could not load note");
const CREATE_NOTE: Failure = Failure::plain("create_note", "could not create note");
const UPDATE_NOTE: Failure = Failure::plain("update_note", "could not update note");
const DELETE_NOTE: Failure = Failure::plain("delete_note", "could not delete note");
const LIST_EVENTS: Failure = Failure::plain("list_events", "could not load calendar events");
const USER_EVENTS: Failure = Failure::plain("user_events", "could not load user events");
const TODAY_EVENTS: Failure = Failure::plain("today_events", "could not load today's events");
const UPCOMING_EVENTS: Failure = Failure::plain("upcoming_events", "could not load upcoming events");
const CREATE_EVENT: Failure = Failure::plain("create_event", "could not create calendar event");
const DELETE_EVENT: Failure = Failure::plain("delete_event", "could not delete calendar event");
const LIST_REMINDERS: Failure = Failure::plain("list_reminders", "could not load reminders");
const GET_REMINDER: Failure = Failure::plain("get_reminder", "could not load reminder");
const CREATE_REMINDER: Failure = Failure::plain("create_reminder", "could not create reminder");
const UPDATE_REMINDER: Failure = Failure::plain("update_reminder", "could not update reminder");
const COMPLETE_REMINDER: Failure = Failure::plain("complete_reminder", "could not complete reminder");
const DELETE_REMINDER: Failure = Failure::plain("delete_reminder", "could not delete reminder");
const ACTIVE_REMINDERS: Failure = Failure::plain("active_reminders", "could not load active reminders");
const UPCOMING_REMINDERS: Failure = Failure::plain("upcoming_reminders", "could not load upcoming reminders");
const WEATHER: Failure = Failure::plain("weather", "could not load weather");

/// Typed entry point to the backend, shared by all screens.
#[derive(Clone)]
pub struct Gateway {
    client: AssistantClient,
    transport: Arc<dyn Transport>,
    user_id: String,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("client", &self.client)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            client: AssistantClient::from_config(config),
            transport,
            user_id: config.user_id.clone(),
        }
    }

    /// Gateway over the blocking ureq transport.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config, Arc::new(UreqTransport::new()))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn health(&self) -> Result<HealthStatus, GatewayError> {
        self.call(&HEALTH, Ok(self.client.build_health()), AssistantClient::parse_health)
    }

    // -- chat ---------------------------------------------------------------

    pub fn send_message(&self, text: &str) -> Result<ChatReply, GatewayError> {
        let input = ChatRequest {
            message: text.to_string(),
            user_id: Some(self.user_id.clone()),
        };
        self.call(
            &SEND_MESSAGE,
            self.client.build_send_message(&input),
            AssistantClient::parse_send_message,
        )
    }

    /// Uploads the recording at `path` as the `file` part of a multipart form.
    pub fn send_audio_message(&self, path: &Path) -> Result<ChatReply, GatewayError> {
        let request = std::fs::read(path)
            .map(|bytes| AudioUpload {
                file_name: path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(DEFAULT_AUDIO_FILE_NAME)
                    .to_string(),
                bytes,
                user_id: self.user_id.clone(),
            })
            .map(|upload| self.client.build_send_audio_message(upload))
            .map_err(|e| ApiError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        self.call(&SEND_AUDIO, request, AssistantClient::parse_send_audio_message)
    }

    pub fn chat_history(&self, limit: usize) -> Result<ChatHistoryPage, GatewayError> {
        self.call(
            &CHAT_HISTORY,
            Ok(self.client.build_chat_history(&self.user_id, limit)),
            AssistantClient::parse_chat_history,
        )
    }

    pub fn clear_chat_history(&self) -> Result<Acknowledgement, GatewayError> {
        self.call(
            &CLEAR_CHAT_HISTORY,
            Ok(self.client.build_clear_chat_history(&self.user_id)),
            AssistantClient::parse_clear_chat_history,
        )
    }

    // -- notes --------------------------------------------------------------

    pub fn list_notes(&self) -> Result<Vec<Note>, GatewayError> {
        self.call(&LIST_NOTES, Ok(self.client.build_list_notes()), AssistantClient::parse_list_notes)
    }

    pub fn get_note(&self, id: &str) -> Result<Note, GatewayError> {
        self.call(&GET_NOTE, Ok(self.client.build_get_note(id)), AssistantClient::parse_get_note)
    }

    pub fn create_note(&self, title: &str, content: &str) -> Result<Note, GatewayError> {
        let input = NoteInput {
            title: title.to_string(),
            content: content.to_string(),
        };
        self.call(
            &CREATE_NOTE,
            Ok(self.client.build_create_note(&input)),
            AssistantClient::parse_create_note,
        )
    }

    pub fn update_note(&self, id: &str, title: &str, content: &str) -> Result<Note, GatewayError> {
        let input = NoteInput {
            title: title.to_string(),
            content: content.to_string(),
        };
        self.call(
            &UPDATE_NOTE,
            self.client.build_update_note(id, &input),
            AssistantClient::parse_update_note,
        )
    }

    pub fn delete_note(&self, id: &str) -> Result<(), GatewayError> {
        self.call(&DELETE_NOTE, Ok(self.client.build_delete_note(id)), AssistantClient::parse_delete_note)
    }

    // -- calendar -----------------------------------------------------------

    pub fn list_events(&self) -> Result<Vec<CalendarEvent>, GatewayError> {
        self.call(&LIST_EVENTS, Ok(self.client.build_list_events()), AssistantClient::parse_list_events)
    }

    pub fn user_events(&self, start_date: Option<&str>, end_date: Option<&str>) -> Result<Vec<CalendarEvent>, GatewayError> {
        self.call(
            &USER_EVENTS,
            Ok(self.client.build_user_events(&self.user_id, start_date, end_date)),
            AssistantClient::parse_user_events,
        )
    }

    pub fn today_events(&self) -> Result<Vec<CalendarEvent>, GatewayError> {
        self.call(
            &TODAY_EVENTS,
            Ok(self.client.build_today_events(&self.user_id)),
            AssistantClient::parse_today_events,
        )
    }

    pub fn upcoming_events(&self, days: u32) -> Result<Vec<CalendarEvent>, GatewayError> {
        self.call(
            &UPCOMING_EVENTS,
            Ok(self.client.build_upcoming_events(&self.user_id, days)),
            AssistantClient::parse_upcoming_events,
        )
    }

    pub fn create_event(&self, title: &str, datetime: &str, description: &str) -> Result<CalendarEvent, GatewayError> {
        let input = EventInput {
            title: title.to_string(),
            datetime: datetime.to_string(),
            description: description.to_string(),
        };
        self.call(
            &CREATE_EVENT,
            self.client.build_create_event(&input),
            AssistantClient::parse_create_event,
        )
    }

    pub fn delete_event(&self, id: &str) -> Result<(), GatewayError> {
        self.call(&DELETE_EVENT, Ok(self.client.build_delete_event(id)), AssistantClient::parse_delete_event)
    }

    // -- reminders ----------------------------------------------------------

    pub fn list_reminders(&self, include_completed: bool) -> Result<Vec<Reminder>, GatewayError> {
        self.call(
            &LIST_REMINDERS,
            Ok(self.client.build_list_reminders(&self.user_id, include_completed)),
            AssistantClient::parse_list_reminders,
        )
    }

    pub fn get_reminder(&self, id: &str) -> Result<Reminder, GatewayError> {
        self.call(&GET_REMINDER, Ok(self.client.build_get_reminder(id)), AssistantClient::parse_get_reminder)
    }

    pub fn create_reminder(
        &self,
        title: &str,
        description: Option<&str>,
        reminder_time: &str,
    ) -> Result<Reminder, GatewayError> {
        let input = self.reminder_input(title, description, reminder_time);
        self.call(
            &CREATE_REMINDER,
            self.client.build_create_reminder(&input),
            AssistantClient::parse_create_reminder,
        )
    }

    pub fn update_reminder(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
        reminder_time: &str,
    ) -> Result<Reminder, GatewayError> {
        let input = self.reminder_input(title, description, reminder_time);
        self.call(
            &UPDATE_REMINDER,
            self.client.build_update_reminder(id, &input),
            AssistantClient::parse_update_reminder,
        )
    }

    pub fn complete_reminder(&self, id: &str) -> Result<(), GatewayError> {
        self.call(
            &COMPLETE_REMINDER,
            Ok(self.client.build_complete_reminder(id)),
            AssistantClient::parse_complete_reminder,
        )
    }

    pub fn delete_reminder(&self, id: &str) -> Result<(), GatewayError> {
        self.call(
            &DELETE_REMINDER,
            Ok(self.client.build_delete_reminder(id)),
            AssistantClient::parse_delete_reminder,
        )
    }

    pub fn active_reminders(&self) -> Result<Vec<Reminder>, GatewayError> {
        self.call(
            &ACTIVE_REMINDERS,
            Ok(self.client.build_active_reminders(&self.user_id)),
            AssistantClient::parse_active_reminders,
        )
    }

    pub fn upcoming_reminders(&self, hours: u32) -> Result<Vec<Reminder>, GatewayError> {
        self.call(
            &UPCOMING_REMINDERS,
            Ok(self.client.build_upcoming_reminders(&self.user_id, hours)),
            AssistantClient::parse_upcoming_reminders,
        )
    }

    // -- weather ------------------------------------------------------------

    pub fn weather(&self, city: &str) -> Result<WeatherSnapshot, GatewayError> {
        self.call(&WEATHER, Ok(self.client.build_weather(city)), AssistantClient::parse_weather)
    }

    fn reminder_input(&self, title: &str, description: Option<&str>, reminder_time: &str) -> ReminderInput {
        ReminderInput {
            title: title.to_string(),
            description: description.map(str::to_string),
            reminder_time: reminder_time.to_string(),
            user_id: self.user_id.clone(),
        }
    }

    fn call<R>(
        &self,
        failure: &Failure,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&AssistantClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, GatewayError> {
        request
            .and_then(|request| {
                debug!(
                    operation = failure.operation,
                    method = request.method.as_str(),
                    url = %request.path,
                    "sending request"
                );
                self.transport.execute(request)
            })
            .and_then(|response| parse(&self.client, response))
            .map_err(|err| {
                warn!(operation = failure.operation, error = %err, "request failed");
                domain_error(&err, failure)
            })
    }
}

fn domain_error(err: &ApiError, failure: &Failure) -> GatewayError {
    match err {
        ApiError::Timeout(_) if failure.timeout_message => GatewayError::new(ErrorKind::Timeout, TIMEOUT_MESSAGE),
        ApiError::Timeout(_) => GatewayError::new(ErrorKind::Timeout, failure.message),
        ApiError::NotFound => GatewayError::new(ErrorKind::NotFound, failure.message),
        _ => GatewayError::new(ErrorKind::RequestFailed, failure.message),
    }
}
