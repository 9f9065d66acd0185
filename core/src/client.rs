//! Stateless HTTP request builder and response parser for the assistant API.
//!
//! # Design
//! `AssistantClient` holds only a base URL and the timeout budgets and carries
//! no mutable state between calls. Each backend capability is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`. The `Gateway` (or any other host) executes the
//! round-trip in between, keeping this layer deterministic and free of I/O.
//!
//! The parse step unwraps the backend's list envelopes (`{"notes": [...]}`)
//! and treats a missing list as empty.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::config::{ClientConfig, Timeouts};
use crate::error::ApiError;
use crate::http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Acknowledgement, AudioUpload, CalendarEvent, ChatHistoryPage, ChatReply, ChatRequest, EventInput,
    HealthStatus, Note, NoteInput, Reminder, ReminderInput, WeatherSnapshot,
};

const JSON: &str = "application/json";
const AUDIO_CONTENT_TYPE: &str = "audio/m4a";

#[derive(Deserialize)]
struct NotesEnvelope {
    #[serde(default)]
    notes: Vec<Note>,
}

#[derive(Deserialize)]
struct EventsEnvelope {
    #[serde(default)]
    events: Vec<CalendarEvent>,
}

#[derive(Deserialize)]
struct RemindersEnvelope {
    #[serde(default)]
    reminders: Vec<Reminder>,
}

/// Synchronous, stateless client for the assistant API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    base_url: String,
    timeouts: Timeouts,
}

impl AssistantClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, Timeouts::default())
    }

    pub fn with_timeouts(base_url: &str, timeouts: Timeouts) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_timeouts(&config.base_url, config.timeouts)
    }

    // -----------------------------------------------------------------------
    // Health
    // -----------------------------------------------------------------------

    pub fn build_health(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.url("/health", &[]))
    }

    pub fn parse_health(&self, response: HttpResponse) -> Result<HealthStatus, ApiError> {
        parse_json(response)
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    pub fn build_send_message(&self, input: &ChatRequest) -> Result<HttpRequest, ApiError> {
        let mut req = self.json_request(HttpMethod::Post, self.url("/api/chat/message", &[]), input)?;
        req.timeout = self.timeouts.chat();
        Ok(req)
    }

    pub fn parse_send_message(&self, response: HttpResponse) -> Result<ChatReply, ApiError> {
        parse_json(response)
    }

    /// Multipart upload: a binary `file` part and a `user_id` text part. The
    /// transport picks the boundary and sets the content type.
    pub fn build_send_audio_message(&self, upload: AudioUpload) -> HttpRequest {
        let mut req = self.request(
            HttpMethod::Post,
            self.url("/api/chat/audio-message", &[("user_id", &upload.user_id)]),
        );
        req.body = Some(HttpBody::Form(vec![
            FormPart::File {
                name: "file".to_string(),
                file_name: upload.file_name,
                content_type: AUDIO_CONTENT_TYPE.to_string(),
                bytes: upload.bytes,
            },
            FormPart::Text {
                name: "user_id".to_string(),
                value: upload.user_id,
            },
        ]));
        req.timeout = self.timeouts.audio();
        req
    }

    pub fn parse_send_audio_message(&self, response: HttpResponse) -> Result<ChatReply, ApiError> {
        parse_json(response)
    }

    pub fn build_chat_history(&self, user_id: &str, limit: usize) -> HttpRequest {
        let limit = limit.to_string();
        self.request(
            HttpMethod::Get,
            self.url(&format!("/api/chat/history/{}", segment(user_id)), &[("limit", &limit)]),
        )
    }

    pub fn parse_chat_history(&self, response: HttpResponse) -> Result<ChatHistoryPage, ApiError> {
        parse_json(response)
    }

    pub fn build_clear_chat_history(&self, user_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.url(&format!("/api/chat/history/{}", segment(user_id)), &[]))
    }

    pub fn parse_clear_chat_history(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        parse_json(response)
    }

    // -----------------------------------------------------------------------
    // Notes
    // -----------------------------------------------------------------------

    pub fn build_list_notes(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.url("/api/notes/", &[]))
    }

    pub fn parse_list_notes(&self, response: HttpResponse) -> Result<Vec<Note>, ApiError> {
        parse_json::<NotesEnvelope>(response).map(|envelope| envelope.notes)
    }

    pub fn build_get_note(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.url(&format!("/api/notes/{}", segment(id)), &[]))
    }

    pub fn parse_get_note(&self, response: HttpResponse) -> Result<Note, ApiError> {
        parse_json(response)
    }

    /// The backend takes the new note as query parameters with an empty body.
    pub fn build_create_note(&self, input: &NoteInput) -> HttpRequest {
        self.request(
            HttpMethod::Post,
            self.url("/api/notes/", &[("title", &input.title), ("content", &input.content)]),
        )
    }

    pub fn parse_create_note(&self, response: HttpResponse) -> Result<Note, ApiError> {
        parse_json(response)
    }

    pub fn build_update_note(&self, id: &str, input: &NoteInput) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, self.url(&format!("/api/notes/{}", segment(id)), &[]), input)
    }

    pub fn parse_update_note(&self, response: HttpResponse) -> Result<Note, ApiError> {
        parse_json(response)
    }

    pub fn build_delete_note(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.url(&format!("/api/notes/{}", segment(id)), &[]))
    }

    pub fn parse_delete_note(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    // -----------------------------------------------------------------------
    // Calendar
    // -----------------------------------------------------------------------

    pub fn build_list_events(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.url("/api/calendar/events", &[]))
    }

    pub fn parse_list_events(&self, response: HttpResponse) -> Result<Vec<CalendarEvent>, ApiError> {
        parse_json::<EventsEnvelope>(response).map(|envelope| envelope.events)
    }

    pub fn build_user_events(&self, user_id: &str, start_date: Option<&str>, end_date: Option<&str>) -> HttpRequest {
        let mut query = Vec::new();
        if let Some(start) = start_date {
            query.push(("start_date", start));
        }
        if let Some(end) = end_date {
            query.push(("end_date", end));
        }
        self.request(
            HttpMethod::Get,
            self.url(&format!("/api/calendar/events/{}", segment(user_id)), &query),
        )
    }

    pub fn parse_user_events(&self, response: HttpResponse) -> Result<Vec<CalendarEvent>, ApiError> {
        parse_json(response)
    }

    pub fn build_today_events(&self, user_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            self.url(&format!("/api/calendar/events/today/{}", segment(user_id)), &[]),
        )
    }

    pub fn parse_today_events(&self, response: HttpResponse) -> Result<Vec<CalendarEvent>, ApiError> {
        parse_json::<EventsEnvelope>(response).map(|envelope| envelope.events)
    }

    pub fn build_upcoming_events(&self, user_id: &str, days: u32) -> HttpRequest {
        let days = days.to_string();
        self.request(
            HttpMethod::Get,
            self.url(&format!("/api/calendar/events/upcoming/{}", segment(user_id)), &[("days", &days)]),
        )
    }

    pub fn parse_upcoming_events(&self, response: HttpResponse) -> Result<Vec<CalendarEvent>, ApiError> {
        parse_json::<EventsEnvelope>(response).map(|envelope| envelope.events)
    }

    pub fn build_create_event(&self, input: &EventInput) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.url("/api/calendar/events", &[]), input)
    }

    pub fn parse_create_event(&self, response: HttpResponse) -> Result<CalendarEvent, ApiError> {
        parse_json(response)
    }

    pub fn build_delete_event(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.url(&format!("/api/calendar/events/{}", segment(id)), &[]))
    }

    pub fn parse_delete_event(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    // -----------------------------------------------------------------------
    // Reminders
    // -----------------------------------------------------------------------

    pub fn build_list_reminders(&self, user_id: &str, include_completed: bool) -> HttpRequest {
        let include = include_completed.to_string();
        self.request(
            HttpMethod::Get,
            self.url(
                "/api/reminders/",
                &[("user_id", user_id), ("include_completed", &include)],
            ),
        )
    }

    pub fn parse_list_reminders(&self, response: HttpResponse) -> Result<Vec<Reminder>, ApiError> {
        parse_json(response)
    }

    pub fn build_get_reminder(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.url(&format!("/api/reminders/{}", segment(id)), &[]))
    }

    pub fn parse_get_reminder(&self, response: HttpResponse) -> Result<Reminder, ApiError> {
        parse_json(response)
    }

    pub fn build_create_reminder(&self, input: &ReminderInput) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.url("/api/reminders/create", &[]), input)
    }

    pub fn parse_create_reminder(&self, response: HttpResponse) -> Result<Reminder, ApiError> {
        parse_json(response)
    }

    pub fn build_update_reminder(&self, id: &str, input: &ReminderInput) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, self.url(&format!("/api/reminders/{}", segment(id)), &[]), input)
    }

    pub fn parse_update_reminder(&self, response: HttpResponse) -> Result<Reminder, ApiError> {
        parse_json(response)
    }

    pub fn build_complete_reminder(&self, id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Patch,
            self.url(&format!("/api/reminders/{}/complete", segment(id)), &[]),
        )
    }

    pub fn parse_complete_reminder(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn build_delete_reminder(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.url(&format!("/api/reminders/{}", segment(id)), &[]))
    }

    pub fn parse_delete_reminder(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn build_active_reminders(&self, user_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            self.url(&format!("/api/reminders/user/{}/active", segment(user_id)), &[]),
        )
    }

    pub fn parse_active_reminders(&self, response: HttpResponse) -> Result<Vec<Reminder>, ApiError> {
        parse_json(response)
    }

    pub fn build_upcoming_reminders(&self, user_id: &str, hours: u32) -> HttpRequest {
        let hours = hours.to_string();
        self.request(
            HttpMethod::Get,
            self.url(&format!("/api/reminders/user/{}/upcoming", segment(user_id)), &[("hours", &hours)]),
        )
    }

    pub fn parse_upcoming_reminders(&self, response: HttpResponse) -> Result<Vec<Reminder>, ApiError> {
        parse_json::<RemindersEnvelope>(response).map(|envelope| envelope.reminders)
    }

    // -----------------------------------------------------------------------
    // Weather
    // -----------------------------------------------------------------------

    pub fn build_weather(&self, city: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.url("/api/weather/", &[("city", city)]))
    }

    pub fn parse_weather(&self, response: HttpResponse) -> Result<WeatherSnapshot, ApiError> {
        parse_json(response)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn url(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}{path}", self.base_url);
        if !query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            url.push('?');
            url.push_str(&encoded);
        }
        url
    }

    fn request(&self, method: HttpMethod, path: String) -> HttpRequest {
        HttpRequest {
            method,
            path,
            headers: Vec::new(),
            body: None,
            timeout: self.timeouts.default_timeout(),
        }
    }

    fn json_request<B: Serialize>(&self, method: HttpMethod, path: String, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut req = self.request(method, path);
        req.headers.push(("content-type".to_string(), JSON.to_string()));
        req.body = Some(HttpBody::Bytes(body));
        Ok(req)
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Percent-encodes one path segment (`form_urlencoded` writes spaces as `+`,
/// which a path would read literally).
fn segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client() -> AssistantClient {
        AssistantClient::new("http://localhost:8000")
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn status(code: u16) -> HttpResponse {
        HttpResponse {
            status: code,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    fn json_body(req: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(req.body.as_ref().and_then(HttpBody::as_bytes).unwrap()).unwrap()
    }

    #[test]
    fn build_health_uses_default_timeout() {
        let req = client().build_health();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:8000/health");
        assert_eq!(req.timeout, Duration::from_secs(10));
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_send_message_uses_chat_timeout() {
        let req = client()
            .build_send_message(&ChatRequest {
                message: "Bugün hava nasıl?".to_string(),
                user_id: None,
            })
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:8000/api/chat/message");
        assert_eq!(req.timeout, Duration::from_secs(45));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(json_body(&req), serde_json::json!({"message": "Bugün hava nasıl?"}));
    }

    #[test]
    fn build_send_audio_message_is_multipart() {
        let upload = AudioUpload {
            file_name: "rec.m4a".to_string(),
            bytes: b"AUDIO".to_vec(),
            user_id: "default".to_string(),
        };
        let req = client().build_send_audio_message(upload);
        assert_eq!(req.path, "http://localhost:8000/api/chat/audio-message?user_id=default");
        assert_eq!(req.timeout, Duration::from_secs(60));
        assert!(req.headers.is_empty());
        assert_eq!(
            req.body,
            Some(HttpBody::Form(vec![
                FormPart::File {
                    name: "file".to_string(),
                    file_name: "rec.m4a".to_string(),
                    content_type: "audio/m4a".to_string(),
                    bytes: b"AUDIO".to_vec(),
                },
                FormPart::Text {
                    name: "user_id".to_string(),
                    value: "default".to_string(),
                },
            ]))
        );
    }

    #[test]
    fn build_create_note_sends_query_parameters() {
        let req = client().build_create_note(&NoteInput {
            title: "Alışveriş listesi".to_string(),
            content: "süt & ekmek".to_string(),
        });
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.path,
            "http://localhost:8000/api/notes/?title=Al%C4%B1%C5%9Fveri%C5%9F+listesi&content=s%C3%BCt+%26+ekmek"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn build_update_note_sends_json() {
        let req = client()
            .build_update_note(
                "n1",
                &NoteInput {
                    title: "T".to_string(),
                    content: "C".to_string(),
                },
            )
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:8000/api/notes/n1");
        assert_eq!(json_body(&req), serde_json::json!({"title": "T", "content": "C"}));
    }

    #[test]
    fn build_user_events_skips_absent_range() {
        let c = client();
        assert_eq!(
            c.build_user_events("default", None, None).path,
            "http://localhost:8000/api/calendar/events/default"
        );
        assert_eq!(
            c.build_user_events("default", Some("2025-06-01"), Some("2025-06-30")).path,
            "http://localhost:8000/api/calendar/events/default?start_date=2025-06-01&end_date=2025-06-30"
        );
    }

    #[test]
    fn build_reminder_requests() {
        let c = client();
        let req = c.build_list_reminders("default", false);
        assert_eq!(
            req.path,
            "http://localhost:8000/api/reminders/?user_id=default&include_completed=false"
        );

        let req = c.build_complete_reminder("r1");
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.path, "http://localhost:8000/api/reminders/r1/complete");

        let req = c.build_upcoming_reminders("default", 24);
        assert_eq!(req.path, "http://localhost:8000/api/reminders/user/default/upcoming?hours=24");

        let req = c
            .build_create_reminder(&ReminderInput {
                title: "İlaç".to_string(),
                description: None,
                reminder_time: "2025-06-21T09:00:00".to_string(),
                user_id: "default".to_string(),
            })
            .unwrap();
        assert_eq!(req.path, "http://localhost:8000/api/reminders/create");
        assert_eq!(json_body(&req)["reminder_time"], "2025-06-21T09:00:00");
    }

    #[test]
    fn ids_are_encoded_as_path_segments() {
        let c = client();
        let req = c.build_get_note("a b/c+d");
        assert_eq!(req.path, "http://localhost:8000/api/notes/a%20b%2Fc%2Bd");

        let req = c.build_active_reminders("ayşe yılmaz");
        assert_eq!(
            req.path,
            "http://localhost:8000/api/reminders/user/ay%C5%9Fe%20y%C4%B1lmaz/active"
        );
    }

    #[test]
    fn build_weather_encodes_city() {
        let req = client().build_weather("São Paulo");
        assert_eq!(req.path, "http://localhost:8000/api/weather/?city=S%C3%A3o+Paulo");
    }

    #[test]
    fn parse_list_notes_unwraps_envelope() {
        let notes = client()
            .parse_list_notes(ok(
                r#"{"notes":[{"id":"1","title":"A","content":"x","created_at":"2025-06-21T10:00:00"}],"count":1}"#,
            ))
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "A");
    }

    #[test]
    fn parse_list_notes_missing_field_is_empty() {
        let notes = client().parse_list_notes(ok(r#"{"count":0}"#)).unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn parse_create_note_ignores_extra_fields() {
        let note = client()
            .parse_create_note(ok(
                r#"{"id":"1","title":"Title A","content":"Body","created_at":"T","message":"created"}"#,
            ))
            .unwrap();
        assert_eq!(note.id, "1");
        assert_eq!(note.created_at.as_deref(), Some("T"));
    }

    #[test]
    fn parse_today_events_unwraps_envelope() {
        let events = client()
            .parse_today_events(ok(
                r#"{"date":"2025-06-21","count":1,"events":[{"id":"e","title":"T","start_time":"2025-06-21T10:00:00"}]}"#,
            ))
            .unwrap();
        assert_eq!(events[0].datetime, "2025-06-21T10:00:00");
    }

    #[test]
    fn parse_upcoming_reminders_unwraps_envelope() {
        let reminders = client()
            .parse_upcoming_reminders(ok(
                r#"{"period_hours":24,"count":1,"reminders":[{"id":"r","title":"T","reminder_time":"x","is_completed":false}]}"#,
            ))
            .unwrap();
        assert_eq!(reminders.len(), 1);
    }

    #[test]
    fn parse_delete_note_not_found() {
        let err = client().parse_delete_note(status(404)).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_weather_server_error() {
        let err = client()
            .parse_weather(HttpResponse {
                status: 500,
                headers: Vec::new(),
                body: "boom".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }

    #[test]
    fn parse_send_message_bad_json() {
        let err = client().parse_send_message(ok("not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn any_2xx_is_success() {
        assert!(client().parse_complete_reminder(status(204)).is_ok());
        assert!(client().parse_delete_event(status(200)).is_ok());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = AssistantClient::new("http://localhost:8000/");
        assert_eq!(client.build_list_notes().path, "http://localhost:8000/api/notes/");
    }
}
