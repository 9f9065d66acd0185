//! In-memory stand-in for the assistant backend.
//!
//! Serves the same routes as the real API with canned intelligence: chat
//! replies come from a keyword table, "transcription" reads the uploaded
//! bytes as UTF-8 text, and weather comes from a fixed city table.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_USER_ID: &str = "default";
pub const DEFAULT_CITY: &str = "Istanbul";
pub const UNREADABLE_AUDIO_REPLY: &str = "Audio could not be processed";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub datetime: String,
    pub description: String,
    pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub reminder_time: String,
    pub user_id: String,
    pub is_completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub user_message: String,
    pub ai_response: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub message_id: String,
    pub timestamp: String,
    pub original_audio_text: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Weather {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub condition: String,
    pub humidity: i64,
    pub wind_speed: f64,
    pub pressure: i64,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ChatInput {
    pub message: String,
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct NoteQuery {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct NoteInput {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct EventInput {
    pub title: String,
    pub datetime: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct ReminderInput {
    pub title: String,
    pub description: Option<String>,
    pub reminder_time: String,
    #[serde(default = "default_user")]
    pub user_id: String,
}

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default = "default_user")]
    user_id: String,
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

#[derive(Deserialize)]
struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Deserialize)]
struct DaysQuery {
    #[serde(default = "default_days")]
    days: i64,
}

#[derive(Deserialize)]
struct HoursQuery {
    #[serde(default = "default_hours")]
    hours: i64,
}

#[derive(Deserialize)]
struct ReminderListQuery {
    #[serde(default = "default_user")]
    user_id: String,
    #[serde(default)]
    include_completed: bool,
}

#[derive(Deserialize)]
struct CityQuery {
    #[serde(default = "default_city")]
    city: String,
}

fn default_user() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_city() -> String {
    DEFAULT_CITY.to_string()
}

fn default_history_limit() -> usize {
    50
}

fn default_days() -> i64 {
    7
}

fn default_hours() -> i64 {
    24
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Store {
    pub notes: Vec<Note>,
    pub events: Vec<Event>,
    pub reminders: Vec<Reminder>,
    pub chats: HashMap<String, Vec<ChatRecord>>,
}

pub type Db = Arc<RwLock<Store>>;

/// Knobs for tests that need a slow or otherwise unusual server.
#[derive(Clone, Debug, Default)]
pub struct MockOptions {
    /// Delay before answering chat and audio messages.
    pub reply_delay: Duration,
}

#[derive(Clone)]
struct AppState {
    db: Db,
    options: MockOptions,
}

/// Failure responses, rendered as `{"detail": ...}` like the real backend.
#[derive(Debug)]
pub enum MockError {
    NotFound(&'static str),
    BadRequest(String),
    Invalid(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            MockError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            MockError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            MockError::Invalid(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<MultipartError> for MockError {
    fn from(err: MultipartError) -> Self {
        MockError::BadRequest(err.body_text())
    }
}

type ApiResult<T> = Result<Json<T>, MockError>;

pub fn app() -> Router {
    app_with(MockOptions::default())
}

pub fn app_with(options: MockOptions) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        options,
    };
    Router::new()
        .route("/health", get(health))
        .route("/api/chat/message", post(chat_message))
        .route("/api/chat/audio-message", post(audio_message))
        .route("/api/chat/history/{user_id}", get(chat_history).delete(clear_chat_history))
        .route("/api/notes/", get(list_notes).post(create_note))
        .route("/api/notes/{id}", get(get_note).put(update_note).delete(delete_note))
        .route("/api/calendar/events", get(list_events).post(create_event))
        .route("/api/calendar/events/today/{user_id}", get(today_events))
        .route("/api/calendar/events/upcoming/{user_id}", get(upcoming_events))
        .route("/api/calendar/events/{id}", get(user_events).delete(delete_event))
        .route("/api/reminders/", get(list_reminders))
        .route("/api/reminders/create", post(create_reminder))
        .route("/api/reminders/user/{user_id}/active", get(active_reminders))
        .route("/api/reminders/user/{user_id}/upcoming", get(upcoming_reminders))
        .route(
            "/api/reminders/{id}",
            get(get_reminder).put(update_reminder).delete(delete_reminder),
        )
        .route("/api/reminders/{id}/complete", patch(complete_reminder))
        .route("/api/weather/", get(weather))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockOptions::default()).await
}

pub async fn run_with(listener: TcpListener, options: MockOptions) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock assistant backend listening");
    }
    axum::serve(listener, app_with(options)).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "assistant-mock" }))
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

async fn chat_message(State(state): State<AppState>, Json(input): Json<ChatInput>) -> ApiResult<ChatReply> {
    if input.message.trim().is_empty() {
        return Err(MockError::Invalid("message is required".to_string()));
    }
    tokio::time::sleep(state.options.reply_delay).await;
    let user_id = input.user_id.unwrap_or_else(default_user);
    let reply = canned_reply(&input.message);
    let record = remember(&state.db, &user_id, &input.message, &reply).await;
    Ok(Json(ChatReply {
        response: reply,
        message_id: record.id,
        timestamp: record.timestamp,
        original_audio_text: None,
    }))
}

async fn audio_message(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    mut multipart: Multipart,
) -> ApiResult<ChatReply> {
    let mut audio = None;
    let mut user_id = query.user_id;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => audio = Some(field.bytes().await?),
            "user_id" => user_id = field.text().await?,
            _ => {}
        }
    }
    let audio = audio.ok_or_else(|| MockError::BadRequest("audio file is required".to_string()))?;
    tokio::time::sleep(state.options.reply_delay).await;

    let transcript = String::from_utf8_lossy(&audio).trim().to_string();
    debug!(bytes = audio.len(), %user_id, "audio message received");
    if transcript.is_empty() {
        return Ok(Json(ChatReply {
            response: UNREADABLE_AUDIO_REPLY.to_string(),
            message_id: Uuid::new_v4().to_string(),
            timestamp: now(),
            original_audio_text: None,
        }));
    }
    let reply = canned_reply(&transcript);
    let record = remember(&state.db, &user_id, &transcript, &reply).await;
    Ok(Json(ChatReply {
        response: reply,
        message_id: record.id,
        timestamp: record.timestamp,
        original_audio_text: Some(transcript),
    }))
}

async fn chat_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Json<Value> {
    let db = state.db.read().await;
    let records = db.chats.get(&user_id).map(Vec::as_slice).unwrap_or_default();
    let skip = records.len().saturating_sub(query.limit);
    let messages = &records[skip..];
    Json(json!({ "user_id": user_id, "count": messages.len(), "messages": messages }))
}

async fn clear_chat_history(State(state): State<AppState>, Path(user_id): Path<String>) -> Json<Value> {
    state.db.write().await.chats.remove(&user_id);
    Json(json!({ "message": "Chat history cleared", "user_id": user_id }))
}

async fn remember(db: &Db, user_id: &str, message: &str, reply: &str) -> ChatRecord {
    let record = ChatRecord {
        id: Uuid::new_v4().to_string(),
        user_message: message.to_string(),
        ai_response: reply.to_string(),
        timestamp: now(),
    };
    db.write()
        .await
        .chats
        .entry(user_id.to_string())
        .or_default()
        .push(record.clone());
    record
}

/// Keyword-table reply standing in for the language model.
pub fn canned_reply(message: &str) -> String {
    let lower = message.to_lowercase();
    let reply = if lower.contains("weather") {
        "It is sunny in Istanbul, 24°C."
    } else if lower.contains("note") {
        "Okay, I can help you with your notes."
    } else if lower.contains("meeting") || lower.contains("calendar") {
        "You have no meetings scheduled tomorrow."
    } else if lower.contains("remind") {
        "Sure, what should I remind you about?"
    } else {
        return format!("You said: {}", message.trim());
    };
    reply.to_string()
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

async fn list_notes(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.read().await;
    Json(json!({ "notes": db.notes, "count": db.notes.len() }))
}

async fn create_note(State(state): State<AppState>, Query(query): Query<NoteQuery>) -> ApiResult<Value> {
    if query.title.trim().is_empty() {
        return Err(MockError::Invalid("title is required".to_string()));
    }
    let note = Note {
        id: Uuid::new_v4().to_string(),
        title: query.title,
        content: query.content,
        created_at: now(),
    };
    debug!(id = %note.id, "note created");
    state.db.write().await.notes.insert(0, note.clone());
    let mut body = json!(note);
    body["message"] = json!("Note created");
    Ok(Json(body))
}

async fn get_note(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Note> {
    let db = state.db.read().await;
    db.notes
        .iter()
        .find(|n| n.id == id)
        .cloned()
        .map(Json)
        .ok_or(MockError::NotFound("Note"))
}

async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<NoteInput>,
) -> ApiResult<Note> {
    let mut db = state.db.write().await;
    let note = db
        .notes
        .iter_mut()
        .find(|n| n.id == id)
        .ok_or(MockError::NotFound("Note"))?;
    note.title = input.title;
    note.content = input.content;
    Ok(Json(note.clone()))
}

async fn delete_note(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let mut db = state.db.write().await;
    let index = db
        .notes
        .iter()
        .position(|n| n.id == id)
        .ok_or(MockError::NotFound("Note"))?;
    db.notes.remove(index);
    Ok(Json(json!({ "message": "Note deleted", "id": id })))
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

async fn list_events(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.read().await;
    Json(json!({ "events": db.events, "count": db.events.len() }))
}

async fn create_event(State(state): State<AppState>, Json(input): Json<EventInput>) -> ApiResult<Event> {
    if input.title.trim().is_empty() {
        return Err(MockError::Invalid("title is required".to_string()));
    }
    let at = parse_datetime(&input.datetime)
        .ok_or_else(|| MockError::Invalid(format!("invalid datetime: {}", input.datetime)))?;
    let event = Event {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        datetime: at.format(TIMESTAMP_FORMAT).to_string(),
        description: input.description,
        user_id: default_user(),
    };
    let mut db = state.db.write().await;
    db.events.push(event.clone());
    db.events.sort_by(|a, b| a.datetime.cmp(&b.datetime));
    Ok(Json(event))
}

async fn delete_event(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let mut db = state.db.write().await;
    let index = db
        .events
        .iter()
        .position(|e| e.id == id)
        .ok_or(MockError::NotFound("Event"))?;
    db.events.remove(index);
    Ok(Json(json!({ "message": "Event deleted", "id": id })))
}

/// `GET /api/calendar/events/{user_id}`: the segment is a user id here;
/// it shares the route with delete-by-event-id.
async fn user_events(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Vec<Event>> {
    let start = range.start_date.as_deref().map(parse_date).transpose()?;
    let end = range.end_date.as_deref().map(parse_date).transpose()?;
    let db = state.db.read().await;
    let events = db
        .events
        .iter()
        .filter(|e| e.user_id == user_id)
        .filter(|e| {
            let Some(date) = parse_datetime(&e.datetime).map(|at| at.date()) else {
                return false;
            };
            start.map_or(true, |from| date >= from) && end.map_or(true, |to| date <= to)
        })
        .cloned()
        .collect();
    Ok(Json(events))
}

async fn today_events(State(state): State<AppState>, Path(user_id): Path<String>) -> Json<Value> {
    let today = Local::now().date_naive();
    let db = state.db.read().await;
    let events: Vec<&Event> = db
        .events
        .iter()
        .filter(|e| e.user_id == user_id)
        .filter(|e| parse_datetime(&e.datetime).is_some_and(|at| at.date() == today))
        .collect();
    Json(json!({ "date": today.to_string(), "count": events.len(), "events": events }))
}

async fn upcoming_events(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Json<Value> {
    let now = Local::now().naive_local();
    let until = now + TimeDelta::days(query.days);
    let db = state.db.read().await;
    let events: Vec<&Event> = db
        .events
        .iter()
        .filter(|e| e.user_id == user_id)
        .filter(|e| parse_datetime(&e.datetime).is_some_and(|at| at >= now && at <= until))
        .collect();
    Json(json!({ "period_days": query.days, "count": events.len(), "events": events }))
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

async fn list_reminders(State(state): State<AppState>, Query(query): Query<ReminderListQuery>) -> Json<Vec<Reminder>> {
    let db = state.db.read().await;
    Json(
        db.reminders
            .iter()
            .filter(|r| r.user_id == query.user_id)
            .filter(|r| query.include_completed || !r.is_completed)
            .cloned()
            .collect(),
    )
}

async fn create_reminder(State(state): State<AppState>, Json(input): Json<ReminderInput>) -> ApiResult<Reminder> {
    let reminder = Reminder {
        id: Uuid::new_v4().to_string(),
        ..validate_reminder(input)?
    };
    let mut db = state.db.write().await;
    db.reminders.push(reminder.clone());
    db.reminders.sort_by(|a, b| a.reminder_time.cmp(&b.reminder_time));
    Ok(Json(reminder))
}

async fn get_reminder(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Reminder> {
    let db = state.db.read().await;
    db.reminders
        .iter()
        .find(|r| r.id == id)
        .cloned()
        .map(Json)
        .ok_or(MockError::NotFound("Reminder"))
}

async fn update_reminder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ReminderInput>,
) -> ApiResult<Reminder> {
    let update = validate_reminder(input)?;
    let mut db = state.db.write().await;
    let reminder = db
        .reminders
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or(MockError::NotFound("Reminder"))?;
    reminder.title = update.title;
    reminder.description = update.description;
    reminder.reminder_time = update.reminder_time;
    reminder.user_id = update.user_id;
    Ok(Json(reminder.clone()))
}

async fn complete_reminder(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let mut db = state.db.write().await;
    let reminder = db
        .reminders
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or(MockError::NotFound("Reminder"))?;
    reminder.is_completed = true;
    Ok(Json(json!({ "message": "Reminder completed", "reminder_id": id })))
}

async fn delete_reminder(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let mut db = state.db.write().await;
    let index = db
        .reminders
        .iter()
        .position(|r| r.id == id)
        .ok_or(MockError::NotFound("Reminder"))?;
    db.reminders.remove(index);
    Ok(Json(json!({ "message": "Reminder deleted", "id": id })))
}

async fn active_reminders(State(state): State<AppState>, Path(user_id): Path<String>) -> Json<Vec<Reminder>> {
    let db = state.db.read().await;
    Json(
        db.reminders
            .iter()
            .filter(|r| r.user_id == user_id && !r.is_completed)
            .cloned()
            .collect(),
    )
}

async fn upcoming_reminders(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HoursQuery>,
) -> Json<Value> {
    let now = Local::now().naive_local();
    let until = now + TimeDelta::hours(query.hours);
    let db = state.db.read().await;
    let reminders: Vec<&Reminder> = db
        .reminders
        .iter()
        .filter(|r| r.user_id == user_id && !r.is_completed)
        .filter(|r| parse_datetime(&r.reminder_time).is_some_and(|at| at >= now && at <= until))
        .collect();
    Json(json!({ "period_hours": query.hours, "count": reminders.len(), "reminders": reminders }))
}

fn validate_reminder(input: ReminderInput) -> Result<Reminder, MockError> {
    if input.title.trim().is_empty() {
        return Err(MockError::Invalid("title is required".to_string()));
    }
    let at = parse_datetime(&input.reminder_time)
        .ok_or_else(|| MockError::Invalid(format!("invalid reminder_time: {}", input.reminder_time)))?;
    Ok(Reminder {
        id: String::new(),
        title: input.title,
        description: input.description,
        reminder_time: at.format(TIMESTAMP_FORMAT).to_string(),
        user_id: input.user_id,
        is_completed: false,
    })
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

async fn weather(Query(query): Query<CityQuery>) -> ApiResult<Weather> {
    lookup_weather(&query.city).map(Json).ok_or(MockError::NotFound("City"))
}

/// Fixed readings for a handful of cities, matched case-insensitively.
pub fn lookup_weather(city: &str) -> Option<Weather> {
    const CITIES: [(&str, &str, f64, f64, &str, i64, f64, i64); 4] = [
        ("Istanbul", "TR", 24.5, 25.1, "Clear", 60, 3.6, 1013),
        ("Ankara", "TR", 18.0, 17.2, "Clouds", 45, 2.1, 1018),
        ("London", "GB", 14.2, 13.0, "Rain", 82, 5.4, 1006),
        ("New York", "US", 21.3, 21.0, "Clouds", 58, 4.2, 1011),
    ];
    let city = city.trim();
    CITIES
        .iter()
        .find(|entry| entry.0.eq_ignore_ascii_case(city))
        .map(|&(name, country, temperature, feels_like, condition, humidity, wind_speed, pressure)| Weather {
            city: name.to_string(),
            country: country.to_string(),
            temperature,
            feels_like,
            condition: condition.to_string(),
            humidity,
            wind_speed,
            pressure,
            timestamp: now(),
        })
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

fn now() -> String {
    Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts RFC 3339 and the naive `YYYY-MM-DDTHH:MM[:SS]` forms the app sends.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

fn parse_date(value: &str) -> Result<NaiveDate, MockError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| MockError::Invalid(format!("invalid date: {value}")))
}
