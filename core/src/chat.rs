//! Chat screen controller.
//!
//! # Design
//! The conversation is an append-only list of `Message`s that starts with a
//! greeting. Sending is split into `submit_*` (append the user's message,
//! hand back a ticket) and `receive_*` (append the reply). The one-shot
//! `send_text` / `send_audio` helpers do both around a blocking gateway call;
//! hosts that keep several requests in flight use the two halves directly.
//! Replies are appended in the order they are received, not the order the
//! messages were sent, and nothing deduplicates a repeated send.
//!
//! Failures never surface as errors here: they become a bot message, which
//! is how the user learns about them. A timeout shows the retry message;
//! everything else shows a fixed apology.
//!
//! The single in-place edit in the model: once an audio reply arrives with a
//! transcript, the "voice message" placeholder's text is replaced by it.
//!
//! Starting a new chat archives the current conversation (when there is more
//! than the greeting) into an in-memory history, newest first. Requests still
//! in flight are not cancelled; their replies land in whatever conversation
//! is current when they arrive.

use std::mem;
use std::path::Path;

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::recording::{AudioRecorder, RecordingError, RecordingSession};
use crate::store::{Identified, ListStore};
use crate::types::{ChatHistoryPage, ChatReply};

pub const GREETING: &str = "Hello! How can I help you?";
pub const NO_REPLY: &str = "Sorry, I didn't get a reply.";
pub const SEND_FAILED: &str = "Sorry, I can't respond right now. Please try again.";
pub const AUDIO_FAILED: &str = "Sorry, I couldn't process your voice message. Please try again.";
pub const AUDIO_PLACEHOLDER: &str = "🎤 Voice message";

pub const QUICK_SUGGESTIONS: [&str; 4] = [
    "How is the weather today?",
    "Create a new note",
    "Do I have a meeting tomorrow?",
    "Set a reminder",
];

const PREVIEW_CHARS: usize = 50;
const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub is_user: bool,
    pub timestamp: String,
    #[serde(default)]
    pub is_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_audio_text: Option<String>,
}

impl Message {
    fn new(text: impl Into<String>, is_user: bool, timestamp: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            is_user,
            timestamp: timestamp.unwrap_or_else(|| Utc::now().to_rfc3339()),
            is_audio: false,
            original_audio_text: None,
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self::new(text, true, None)
    }

    fn bot(text: impl Into<String>, timestamp: Option<String>) -> Self {
        Self::new(text, false, timestamp)
    }

    fn greeting() -> Self {
        Self::bot(GREETING, None)
    }
}

impl Identified for Message {
    fn id(&self) -> &str {
        &self.id
    }
}

/// An archived conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryEntry {
    pub id: String,
    pub title: String,
    pub last_message: String,
    pub timestamp: String,
    pub messages: Vec<Message>,
}

impl Identified for ChatHistoryEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Ticket for a text message awaiting its reply.
#[derive(Debug)]
pub struct PendingText {
    pub message_id: String,
    pub text: String,
}

/// Ticket for a voice message awaiting its reply.
#[derive(Debug)]
pub struct PendingAudio {
    pub message_id: String,
}

pub struct ChatScreen {
    gateway: Gateway,
    messages: Vec<Message>,
    history: ListStore<ChatHistoryEntry>,
    suggestions_visible: bool,
    in_flight: usize,
    last_error: Option<GatewayError>,
}

impl ChatScreen {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            messages: vec![Message::greeting()],
            history: ListStore::new(),
            suggestions_visible: true,
            in_flight: 0,
            last_error: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn history(&self) -> &[ChatHistoryEntry] {
        self.history.items()
    }

    pub fn suggestions_visible(&self) -> bool {
        self.suggestions_visible
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// The failure behind the most recent error bubble, if the latest reply
    /// failed.
    pub fn last_error(&self) -> Option<&GatewayError> {
        self.last_error.as_ref()
    }

    // -- text ---------------------------------------------------------------

    /// Appends the user's message. Returns `None` for blank input.
    pub fn submit_text(&mut self, text: &str) -> Option<PendingText> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.suggestions_visible = false;
        let message = Message::user(text);
        let message_id = message.id.clone();
        self.messages.push(message);
        self.in_flight += 1;
        Some(PendingText {
            message_id,
            text: text.to_string(),
        })
    }

    pub fn receive_reply(&mut self, pending: PendingText, result: Result<ChatReply, GatewayError>) -> &Message {
        debug!(message_id = %pending.message_id, ok = result.is_ok(), "chat reply received");
        self.in_flight = self.in_flight.saturating_sub(1);
        let reply = match result {
            Ok(reply) => {
                self.last_error = None;
                let timestamp = reply.timestamp.clone();
                Message::bot(reply_text(&reply), timestamp)
            }
            Err(err) => self.failure_message(err, SEND_FAILED),
        };
        self.push(reply)
    }

    /// Submits `text` and waits for the reply. `None` for blank input.
    pub fn send_text(&mut self, text: &str) -> Option<&Message> {
        let pending = self.submit_text(text)?;
        let result = self.gateway.send_message(&pending.text);
        Some(self.receive_reply(pending, result))
    }

    // -- audio --------------------------------------------------------------

    /// Appends the voice-message placeholder.
    pub fn submit_audio(&mut self) -> PendingAudio {
        self.suggestions_visible = false;
        let mut placeholder = Message::user(AUDIO_PLACEHOLDER);
        placeholder.is_audio = true;
        let message_id = placeholder.id.clone();
        self.messages.push(placeholder);
        self.in_flight += 1;
        PendingAudio { message_id }
    }

    /// Appends the reply and, when the server transcribed the audio, rewrites
    /// the placeholder with the transcript.
    pub fn receive_audio_reply(&mut self, pending: PendingAudio, result: Result<ChatReply, GatewayError>) -> &Message {
        self.in_flight = self.in_flight.saturating_sub(1);
        let reply = match result {
            Ok(reply) => {
                self.last_error = None;
                if let Some(transcript) = &reply.original_audio_text {
                    if let Some(placeholder) = self.messages.iter_mut().find(|m| m.id == pending.message_id) {
                        placeholder.text = format!("🎤 \"{transcript}\"");
                    }
                }
                let mut message = Message::bot(reply_text(&reply), reply.timestamp.clone());
                message.original_audio_text = reply.original_audio_text;
                message
            }
            Err(err) => self.failure_message(err, AUDIO_FAILED),
        };
        self.push(reply)
    }

    pub fn send_audio(&mut self, path: &Path) -> &Message {
        let pending = self.submit_audio();
        let result = self.gateway.send_audio_message(path);
        self.receive_audio_reply(pending, result)
    }

    /// Stops `session` and sends what it recorded. Idle sessions and
    /// recordings without a file send nothing and return `Ok(None)`.
    pub fn finish_recording<R: AudioRecorder>(
        &mut self,
        session: &mut RecordingSession<R>,
    ) -> Result<Option<Message>, RecordingError> {
        session.stop(|path| self.send_audio(path).clone())
    }

    // -- conversations ------------------------------------------------------

    /// Archives the conversation (unless it is only the greeting) and starts
    /// over. Returns whether anything was archived.
    pub fn new_chat(&mut self) -> bool {
        let archived = self.messages.len() > 1;
        if archived {
            let messages = mem::take(&mut self.messages);
            let last_message = messages
                .last()
                .map(|m| preview(&m.text))
                .unwrap_or_default();
            let entry = ChatHistoryEntry {
                id: Uuid::new_v4().to_string(),
                title: format!("Chat {}", self.history.len() + 1),
                last_message,
                timestamp: Local::now().format("%H:%M").to_string(),
                messages,
            };
            debug!(id = %entry.id, messages = entry.messages.len(), "chat archived");
            self.history.apply_create(entry);
        }
        self.messages = vec![Message::greeting()];
        self.suggestions_visible = true;
        self.last_error = None;
        archived
    }

    /// Replaces the current conversation with an archived one.
    pub fn load_from_history(&mut self, id: &str) -> bool {
        match self.history.get(id) {
            Some(entry) => {
                self.messages = entry.messages.clone();
                self.suggestions_visible = false;
                true
            }
            None => false,
        }
    }

    pub fn server_history(&self) -> Result<ChatHistoryPage, GatewayError> {
        self.gateway.chat_history(DEFAULT_HISTORY_LIMIT)
    }

    pub fn clear_server_history(&self) -> Result<(), GatewayError> {
        self.gateway.clear_chat_history().map(|_| ())
    }

    fn failure_message(&mut self, err: GatewayError, fallback: &str) -> Message {
        let text = if err.is_timeout() {
            err.message().to_string()
        } else {
            fallback.to_string()
        };
        self.last_error = Some(err);
        Message::bot(text, None)
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

fn reply_text(reply: &ChatReply) -> &str {
    if reply.response.trim().is_empty() {
        NO_REPLY
    } else {
        &reply.response
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::error::{ApiError, ErrorKind};
    use crate::gateway::TIMEOUT_MESSAGE;
    use crate::recording::fake::FakeRecorder;
    use crate::testing::{gateway, ScriptedTransport};

    fn texts(screen: &ChatScreen) -> Vec<&str> {
        screen.messages().iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn starts_with_greeting_and_suggestions() {
        let transport = ScriptedTransport::new();
        let screen = ChatScreen::new(gateway(&transport));
        assert_eq!(texts(&screen), [GREETING]);
        assert!(screen.suggestions_visible());
        assert!(!screen.is_loading());
    }

    #[test]
    fn send_appends_user_then_bot() {
        let transport = ScriptedTransport::new();
        transport.reply(200, r#"{"response":"Sunny, 24°C","message_id":"m1","timestamp":"2025-06-21T10:00:00"}"#);
        let mut screen = ChatScreen::new(gateway(&transport));

        let reply = screen.send_text("  weather?  ").unwrap();
        assert!(!reply.is_user);
        assert_eq!(reply.timestamp, "2025-06-21T10:00:00");
        assert_eq!(texts(&screen), [GREETING, "weather?", "Sunny, 24°C"]);
        assert!(!screen.suggestions_visible());
        assert!(!screen.is_loading());
    }

    #[test]
    fn suggestion_is_sent_as_text() {
        let transport = ScriptedTransport::new();
        transport.reply(200, r#"{"response":"Sunny"}"#);
        let mut screen = ChatScreen::new(gateway(&transport));
        screen.send_text(QUICK_SUGGESTIONS[0]).unwrap();
        assert_eq!(texts(&screen), [GREETING, QUICK_SUGGESTIONS[0], "Sunny"]);
        assert!(!screen.suggestions_visible());
    }

    #[test]
    fn blank_input_sends_nothing() {
        let transport = ScriptedTransport::new();
        let mut screen = ChatScreen::new(gateway(&transport));
        assert!(screen.send_text("   ").is_none());
        assert_eq!(transport.request_count(), 0);
        assert_eq!(screen.messages().len(), 1);
    }

    #[test]
    fn empty_reply_uses_fallback() {
        let transport = ScriptedTransport::new();
        transport.reply(200, r#"{"response":""}"#);
        let mut screen = ChatScreen::new(gateway(&transport));
        assert_eq!(screen.send_text("hi").unwrap().text, NO_REPLY);
    }

    #[test]
    fn failure_becomes_apology_bubble() {
        let transport = ScriptedTransport::new();
        transport.reply(500, "");
        let mut screen = ChatScreen::new(gateway(&transport));
        assert_eq!(screen.send_text("hi").unwrap().text, SEND_FAILED);
        assert_eq!(screen.last_error().unwrap().kind(), ErrorKind::RequestFailed);
    }

    #[test]
    fn timeout_becomes_retry_bubble() {
        let transport = ScriptedTransport::new();
        transport.fail(ApiError::Timeout(Duration::from_secs(45)));
        let mut screen = ChatScreen::new(gateway(&transport));
        assert_eq!(screen.send_text("hi").unwrap().text, TIMEOUT_MESSAGE);
        assert!(screen.last_error().unwrap().is_timeout());
    }

    #[test]
    fn overlapping_sends_append_replies_in_arrival_order() {
        let transport = ScriptedTransport::new();
        let mut screen = ChatScreen::new(gateway(&transport));

        let first = screen.submit_text("first").unwrap();
        let second = screen.submit_text("second").unwrap();
        assert!(screen.is_loading());

        screen.receive_reply(
            second,
            Ok(ChatReply {
                response: "reply to second".to_string(),
                message_id: None,
                timestamp: None,
                original_audio_text: None,
            }),
        );
        assert!(screen.is_loading());
        screen.receive_reply(
            first,
            Ok(ChatReply {
                response: "reply to first".to_string(),
                message_id: None,
                timestamp: None,
                original_audio_text: None,
            }),
        );

        assert_eq!(
            texts(&screen),
            [GREETING, "first", "second", "reply to second", "reply to first"]
        );
        assert!(!screen.is_loading());
    }

    #[test]
    fn new_chat_keeps_counting_requests_in_flight() {
        let transport = ScriptedTransport::new();
        let mut screen = ChatScreen::new(gateway(&transport));

        let old = screen.submit_text("first").unwrap();
        assert!(screen.new_chat());
        let current = screen.submit_text("second").unwrap();

        screen.receive_reply(old, Ok(ChatReply::default()));
        assert!(screen.is_loading());
        assert_eq!(screen.messages().last().unwrap().text, NO_REPLY);

        screen.receive_reply(current, Ok(ChatReply::default()));
        assert!(!screen.is_loading());
    }

    #[test]
    fn audio_timeout_becomes_retry_bubble() {
        let mut file = tempfile::Builder::new().suffix(".m4a").tempfile().unwrap();
        file.write_all(b"bytes").unwrap();

        let transport = ScriptedTransport::new();
        transport.fail(ApiError::Timeout(Duration::from_secs(60)));
        let mut screen = ChatScreen::new(gateway(&transport));
        let reply = screen.send_audio(file.path());
        assert_eq!(reply.text, TIMEOUT_MESSAGE);
        assert_ne!(reply.text, AUDIO_FAILED);
        assert!(screen.last_error().unwrap().is_timeout());
        assert_eq!(screen.messages()[1].text, AUDIO_PLACEHOLDER);
    }

    #[test]
    fn audio_reply_patches_placeholder() {
        let mut file = tempfile::Builder::new().suffix(".m4a").tempfile().unwrap();
        file.write_all(b"bytes").unwrap();

        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            r#"{"response":"Note created","original_audio_text":"create a note","timestamp":"T"}"#,
        );
        let mut screen = ChatScreen::new(gateway(&transport));
        let reply = screen.send_audio(file.path());
        assert_eq!(reply.original_audio_text.as_deref(), Some("create a note"));

        let placeholder = &screen.messages()[1];
        assert!(placeholder.is_user);
        assert!(placeholder.is_audio);
        assert_eq!(placeholder.text, "🎤 \"create a note\"");
        assert_eq!(texts(&screen)[2], "Note created");
    }

    #[test]
    fn audio_without_transcript_keeps_placeholder() {
        let transport = ScriptedTransport::new();
        let mut screen = ChatScreen::new(gateway(&transport));
        let pending = screen.submit_audio();
        screen.receive_audio_reply(
            pending,
            Ok(ChatReply {
                response: "Audio could not be processed".to_string(),
                message_id: None,
                timestamp: None,
                original_audio_text: None,
            }),
        );
        assert_eq!(screen.messages()[1].text, AUDIO_PLACEHOLDER);
    }

    #[test]
    fn audio_failure_appends_apology() {
        let transport = ScriptedTransport::new();
        let mut screen = ChatScreen::new(gateway(&transport));
        let reply = screen.send_audio(Path::new("/does/not/exist.m4a"));
        assert_eq!(reply.text, AUDIO_FAILED);
        assert_eq!(screen.messages()[1].text, AUDIO_PLACEHOLDER);
    }

    #[test]
    fn finish_recording_sends_file() {
        let mut file = tempfile::Builder::new().suffix(".m4a").tempfile().unwrap();
        file.write_all(b"bytes").unwrap();

        let transport = ScriptedTransport::new();
        transport.reply(200, r#"{"response":"ok","original_audio_text":"hello"}"#);
        let mut screen = ChatScreen::new(gateway(&transport));
        let mut session = RecordingSession::new(FakeRecorder::producing(file.path()));

        assert!(screen.finish_recording(&mut session).unwrap().is_none());
        assert_eq!(transport.request_count(), 0);

        session.start().unwrap();
        let reply = screen.finish_recording(&mut session).unwrap().unwrap();
        assert_eq!(reply.text, "ok");
        assert_eq!(transport.request_count(), 1);
        assert!(!session.is_recording());
    }

    #[test]
    fn new_chat_with_only_greeting_does_not_archive() {
        let transport = ScriptedTransport::new();
        let mut screen = ChatScreen::new(gateway(&transport));
        assert!(!screen.new_chat());
        assert!(screen.history().is_empty());
    }

    #[test]
    fn new_chat_archives_newest_first() {
        let transport = ScriptedTransport::new();
        transport.reply(200, r#"{"response":"one"}"#);
        transport.reply(200, r#"{"response":"two"}"#);
        let mut screen = ChatScreen::new(gateway(&transport));

        screen.send_text("a").unwrap();
        assert!(screen.new_chat());
        screen.send_text("b").unwrap();
        assert!(screen.new_chat());

        let history = screen.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].title, "Chat 2");
        assert_eq!(history[0].last_message, "two...");
        assert_eq!(history[1].title, "Chat 1");
        assert_eq!(history[1].messages.len(), 3);
        assert_eq!(texts(&screen), [GREETING]);
        assert!(screen.suggestions_visible());
    }

    #[test]
    fn preview_truncates_on_chars() {
        let long = "ç".repeat(80);
        let preview = preview(&long);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn load_from_history_restores_messages() {
        let transport = ScriptedTransport::new();
        transport.reply(200, r#"{"response":"one"}"#);
        let mut screen = ChatScreen::new(gateway(&transport));
        screen.send_text("a").unwrap();
        screen.new_chat();

        let id = screen.history()[0].id.clone();
        assert!(screen.load_from_history(&id));
        assert_eq!(texts(&screen), [GREETING, "a", "one"]);
        assert!(!screen.suggestions_visible());
        assert!(!screen.load_from_history("missing"));
    }
}
