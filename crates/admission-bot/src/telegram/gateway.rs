//! [`ChatGateway`] backed by the Telegram Bot API.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ThreadId};
use teloxide::RequestError;

use admission_core::gateway::{
    Button, ChatGateway, GatewayError, GatewayResult, Keyboard, MessageRef, OutgoingMessage, ParseMode,
};

pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Converts a keyboard into Telegram's inline markup.
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| match button {
                Button::Callback { text, data } => InlineKeyboardButton::callback(text.clone(), data.clone()),
                Button::Url { text, url } => InlineKeyboardButton::url(text.clone(), url.clone()),
            })
            .collect::<Vec<_>>()
    }))
}

fn to_parse_mode(mode: ParseMode) -> teloxide::types::ParseMode {
    match mode {
        ParseMode::Html => teloxide::types::ParseMode::Html,
        ParseMode::MarkdownV2 => teloxide::types::ParseMode::MarkdownV2,
    }
}

/// API refusals stay `Api`; everything that never got an answer is `Unavailable`.
pub fn map_request_error(err: RequestError) -> GatewayError {
    match err {
        RequestError::Api(api) => GatewayError::Api(api.to_string()),
        RequestError::MigrateToChatId(chat) => GatewayError::Api(format!("chat migrated to {}", chat.0)),
        other => GatewayError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn send_message(&self, message: OutgoingMessage) -> GatewayResult<MessageRef> {
        let mut request = self.bot.send_message(ChatId(message.chat_id), message.text);
        if let Some(ref keyboard) = message.keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        if let Some(mode) = message.parse_mode {
            request = request.parse_mode(to_parse_mode(mode));
        }
        if let Some(thread) = message.thread_id {
            request = request.message_thread_id(ThreadId(MessageId(thread)));
        }

        let sent = request.await.map_err(map_request_error)?;
        Ok(MessageRef::new(sent.chat.id.0, sent.id.0))
    }

    async fn edit_message_text(&self, target: MessageRef, text: String, keyboard: Option<Keyboard>) -> GatewayResult<()> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(target.chat_id), MessageId(target.message_id), text);
        // Leaving reply_markup out drops the message's inline keyboard.
        if let Some(ref keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }

        request.await.map_err(map_request_error)?;
        Ok(())
    }

    async fn create_invite_link(&self, chat_id: i64, name: &str, member_limit: u32) -> GatewayResult<String> {
        let link = self
            .bot
            .create_chat_invite_link(ChatId(chat_id))
            .name(name)
            .member_limit(member_limit)
            .await
            .map_err(map_request_error)?;
        Ok(link.invite_link)
    }

    async fn is_chat_member(&self, chat_id: i64, user_id: i64) -> GatewayResult<bool> {
        let user_id =
            u64::try_from(user_id).map_err(|_| GatewayError::Api(format!("{} is not a user id", user_id)))?;
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(map_request_error)?;
        Ok(member.kind.is_present())
    }
}
