//! Display State
//!
//! Types that represent the current display state for the TUI. These are
//! derived from `EngineMessage`s and used for rendering.
//!
//! # Design Philosophy
//!
//! The TUI is a thin client - it renders what the engine tells it to.
//! Display state is the bridge between engine messages and rendering; it
//! holds no business logic, only what the screen needs.

use std::time::Duration;

use engine_core::{Content, EngineMessage, EngineState, MessageId, NotifyKind, Role};

/// How long a notification stays on the status line
pub const NOTICE_TTL: Duration = Duration::from_secs(6);

/// A rendered conversation message
#[derive(Clone, Debug)]
pub struct DisplayMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: Role,
    /// The message content
    pub content: Content,
    /// Whether this message is still being streamed
    pub streaming: bool,
}

impl DisplayMessage {
    /// Create a streaming assistant message (content will be appended)
    pub fn streaming(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: Content::empty(),
            streaming: true,
        }
    }

    /// Append a chunk to text content
    pub fn append(&mut self, text: &str) {
        if let Content::Text(ref mut content) = self.content {
            content.push_str(text);
        }
    }

    /// The label shown before this message
    pub fn prefix(&self) -> &'static str {
        match self.role {
            Role::User => "You",
            Role::Assistant => "Muse",
            Role::System => "",
            Role::Function => "Result",
        }
    }
}

/// A transient status-line notification
#[derive(Clone, Debug)]
pub struct Notice {
    /// Notification kind (drives color and wording)
    pub kind: NotifyKind,
    /// Notification text
    pub message: String,
    /// How long it has been shown
    age: Duration,
}

/// Display state derived from engine messages
#[derive(Debug)]
pub struct DisplayState {
    /// Conversation messages, oldest first
    pub messages: Vec<DisplayMessage>,
    /// Current engine state
    pub engine_state: EngineState,
    /// Active notification, if any
    pub notice: Option<Notice>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayState {
    /// Create empty display state
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            engine_state: EngineState::Ready,
            notice: None,
        }
    }

    /// Whether the catalog should be shown instead of the transcript
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Apply an engine message
    pub fn apply_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::Message { id, role, content } => {
                self.messages.push(DisplayMessage {
                    id,
                    role,
                    content,
                    streaming: false,
                });
            }

            EngineMessage::Token { message_id, text } => {
                match self.messages.iter_mut().find(|m| m.id == message_id) {
                    Some(msg) => msg.append(&text),
                    None => {
                        let mut msg = DisplayMessage::streaming(message_id);
                        msg.append(&text);
                        self.messages.push(msg);
                    }
                }
            }

            EngineMessage::StreamEnd {
                message_id,
                final_content,
            } => {
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == message_id) {
                    msg.content = Content::Text(final_content);
                    msg.streaming = false;
                }
            }

            EngineMessage::StreamError { message_id, .. } => {
                // Whatever already arrived stays on screen.
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == message_id) {
                    msg.streaming = false;
                }
            }

            EngineMessage::Notify { kind, message } => {
                self.notice = Some(Notice {
                    kind,
                    message,
                    age: Duration::ZERO,
                });
            }

            EngineMessage::State { state } => {
                self.engine_state = state;
            }
        }
    }

    /// Advance timers, expiring old notices
    pub fn update(&mut self, delta: Duration) {
        if let Some(ref mut notice) = self.notice {
            notice.age += delta;
            if notice.age >= NOTICE_TTL {
                self.notice = None;
            }
        }
    }
}
