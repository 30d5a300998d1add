//! Outbound messaging contract used by the moderation workflow.
//!
//! This module has zero teloxide dependency: the workflow talks to a
//! [`ChatGateway`] trait object, the bot crate provides the Telegram-backed
//! implementation and tests provide a recording one. Chat ids are plain
//! `i64`, message ids plain `i32`, the same numbers the Bot API uses.

use async_trait::async_trait;
use thiserror::Error;

/// A message that already exists in some chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

impl MessageRef {
    pub fn new(chat_id: i64, message_id: i32) -> Self {
        Self { chat_id, message_id }
    }
}

/// Text formatting mode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    MarkdownV2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Sends `data` back as a callback query when pressed.
    Callback { text: String, data: String },
    /// Opens `url` when pressed.
    Url { text: String, url: url::Url },
}

impl Button {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Button::Callback {
            text: text.into(),
            data: data.into(),
        }
    }

    pub fn url(text: impl Into<String>, url: url::Url) -> Self {
        Button::Url { text: text.into(), url }
    }

    pub fn text(&self) -> &str {
        match self {
            Button::Callback { text, .. } | Button::Url { text, .. } => text,
        }
    }
}

/// Inline keyboard: rows of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub parse_mode: Option<ParseMode>,
    /// Forum topic to post into, when the target chat has topics.
    pub thread_id: Option<i32>,
}

impl OutgoingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
            parse_mode: None,
            thread_id: None,
        }
    }

    pub fn keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn thread(mut self, thread_id: Option<i32>) -> Self {
        self.thread_id = thread_id;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The messaging API answered with an error.
    #[error("chat API error: {0}")]
    Api(String),

    /// The request never reached the API (network, timeout).
    #[error("chat API unavailable: {0}")]
    Unavailable(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Messaging operations the workflow needs.
///
/// Implementations must be safe to share between concurrently running
/// handlers. Calls are made once: no retries happen on either side.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Sends a message and returns where it landed.
    async fn send_message(&self, message: OutgoingMessage) -> GatewayResult<MessageRef>;

    /// Replaces the text of an existing message. `keyboard: None` removes
    /// any inline keyboard the message had.
    async fn edit_message_text(&self, target: MessageRef, text: String, keyboard: Option<Keyboard>) -> GatewayResult<()>;

    /// Creates an invite link to `chat_id` redeemable `member_limit` times.
    async fn create_invite_link(&self, chat_id: i64, name: &str, member_limit: u32) -> GatewayResult<String>;

    /// Whether `user_id` currently belongs to `chat_id`.
    async fn is_chat_member(&self, chat_id: i64, user_id: i64) -> GatewayResult<bool>;
}
