//! Dispatcher schema and handler chain builders

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, User};

use admission_core::callback::{self, CallbackData, CallbackError};
use admission_core::gateway::MessageRef;
use admission_core::workflow::{AdminMessage, ChatUser, ModerationWorkflow};

use super::bot::Command;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub workflow: Arc<ModerationWorkflow>,
}

impl HandlerDeps {
    pub fn new(workflow: Arc<ModerationWorkflow>) -> Self {
        Self { workflow }
    }
}

/// Creates the dispatcher schema for the bot.
///
/// Private chats get `/start` and the "send /start" fallback; callback
/// queries are routed by payload prefix. Everything else is dropped.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_callback = deps.clone();
    let deps_fallback = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(callback_handler(deps_callback))
        .branch(fallback_handler(deps_fallback))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .branch(dptree::entry().filter_command::<Command>().endpoint(
            move |msg: Message, cmd: Command| {
                let deps = deps.clone();
                async move {
                    log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                    match cmd {
                        Command::Start => {
                            let user = msg
                                .from
                                .as_ref()
                                .map(chat_user)
                                .unwrap_or_else(|| ChatUser::new(msg.chat.id.0, None));
                            deps.workflow.start(msg.chat.id.0, &user).await;
                        }
                    }
                    Ok(())
                }
            },
        ))
}

fn fallback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .endpoint(move |msg: Message| {
            let deps = deps.clone();
            async move {
                deps.workflow.fallback(msg.chat.id.0).await;
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let Some(data) = q.data.as_deref() else {
                return Ok(());
            };
            if !callback::is_role_payload(data) && !callback::is_action_payload(data) {
                log::warn!("Ignoring callback with unknown payload {:?} from {}", data, q.from.id.0);
                return Ok(());
            }

            let origin = q.regular_message().map(|m| {
                AdminMessage::new(MessageRef::new(m.chat.id.0, m.id.0), m.text().unwrap_or_default())
            });
            let route = handle_callback_data(&deps.workflow, data, &chat_user(&q.from), origin).await;

            if route.answers_query() {
                if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                    log::warn!("Failed to answer callback query: {}", e);
                }
            }
            Ok(())
        }
    })
}

/// What a button press was turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackRoute {
    RoleChoice,
    Decision,
    Ignored,
}

impl CallbackRoute {
    /// Ignored presses get no reply at all.
    pub fn answers_query(&self) -> bool {
        !matches!(self, CallbackRoute::Ignored)
    }
}

/// Routes a button payload to the workflow.
///
/// `origin` is the message the button was attached to, with its current
/// text. Decisions are only honored on messages in the admin chat.
pub async fn handle_callback_data(
    workflow: &ModerationWorkflow,
    data: &str,
    user: &ChatUser,
    origin: Option<AdminMessage>,
) -> CallbackRoute {
    let Some(origin) = origin else {
        log::warn!("Callback {:?} from {} has no message attached", data, user.id);
        return CallbackRoute::Ignored;
    };

    match CallbackData::parse(data) {
        Ok(CallbackData::Role(token)) => {
            workflow.select_role(origin.target, user, Some(token.role)).await;
            CallbackRoute::RoleChoice
        }
        Err(CallbackError::UnknownRole(role)) if callback::is_role_payload(data) => {
            log::warn!("Unknown role {:?} chosen by {}", role, user.id);
            workflow.select_role(origin.target, user, None).await;
            CallbackRoute::RoleChoice
        }
        Ok(CallbackData::Action(token)) => {
            let admin_chat = workflow.settings().admin_chat_id;
            if origin.target.chat_id != admin_chat {
                log::warn!(
                    "Ignoring {} from chat {}: decisions are only taken in {}",
                    token.action,
                    origin.target.chat_id,
                    admin_chat
                );
                return CallbackRoute::Ignored;
            }

            let outcome = workflow.resolve(token, &origin).await;
            log::info!(
                "{} on application from {} by {}: {:?}",
                token.action,
                token.applicant_id,
                user.id,
                outcome
            );
            CallbackRoute::Decision
        }
        Err(e) => {
            log::warn!("Ignoring malformed callback {:?}: {}", data, e);
            CallbackRoute::Ignored
        }
    }
}

fn chat_user(user: &User) -> ChatUser {
    ChatUser::new(i64::try_from(user.id.0).unwrap_or(0), user.username.clone())
}
