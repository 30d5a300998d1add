//! Moderation workflow.
//!
//! Every inbound event is handled on its own: a `/start`, a role choice, a
//! form submission, an admin decision. There is no session table; the state
//! of an application is whatever its review card in the admin chat says
//! (see [`ModerationState`]), backed by the cards this process decided
//! itself (see [`DecisionLedger`]). The workflow only talks to the outside world
//! through [`ChatGateway`], and every outbound call is made once: failures
//! are logged and counted, never retried.

use std::sync::Arc;

use strum::IntoStaticStr;

use crate::callback::{Action, ActionToken, RoleToken};
use crate::card::{self, ModerationState};
use crate::config::Settings;
use crate::decisions::{Busy, Claim, DecisionLedger};
use crate::gateway::{Button, ChatGateway, GatewayResult, Keyboard, MessageRef, OutgoingMessage};
use crate::metrics::Metrics;
use crate::model::{Applicant, Role};
use crate::texts;

/// Sender of a command or button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: i64,
    pub username: Option<String>,
}

impl ChatUser {
    pub fn new(id: i64, username: Option<String>) -> Self {
        Self { id, username }
    }
}

/// Review card an admin pressed a button on, as the chat currently shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminMessage {
    pub target: MessageRef,
    pub text: String,
}

impl AdminMessage {
    pub fn new(target: MessageRef, text: impl Into<String>) -> Self {
        Self {
            target,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum IntakeOutcome {
    /// Card is in the admin chat, waiting for a decision.
    Posted(MessageRef),
    /// Payload could not be decoded; admins got the generic notice.
    Malformed,
    /// Card could not be delivered.
    DeliveryFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DecisionOutcome {
    Accepted,
    Rejected,
    /// The card already carries a decision banner, or this process has
    /// already decided it.
    AlreadyDecided,
    /// Another press on the same card is being handled right now.
    InFlight,
    /// No invite link could be created; nothing else was done.
    InviteFailed,
}

impl IntakeOutcome {
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

impl DecisionOutcome {
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

/// Keyboard offered on `/start`.
pub fn role_keyboard() -> Keyboard {
    Keyboard::new(vec![vec![
        Button::callback(texts::STUDENT_ROLE_BUTTON, RoleToken::new(Role::Student).encode()),
        Button::callback(texts::GRADUATE_ROLE_BUTTON, RoleToken::new(Role::Graduate).encode()),
    ]])
}

/// Accept and reject buttons under a review card, one per row.
pub fn moderation_keyboard(applicant_id: i64, role: Role) -> Keyboard {
    Keyboard::new(vec![
        vec![Button::callback(
            texts::ACCEPT_BUTTON,
            ActionToken::new(Action::Accept, applicant_id, role).encode(),
        )],
        vec![Button::callback(
            texts::REJECT_BUTTON,
            ActionToken::new(Action::Reject, applicant_id, role).encode(),
        )],
    ])
}

fn intake_error(role: Role) -> &'static str {
    match role {
        Role::Student => texts::STUDENT_INTAKE_ERROR,
        Role::Graduate => texts::GRADUATE_INTAKE_ERROR,
    }
}

pub struct ModerationWorkflow {
    gateway: Arc<dyn ChatGateway>,
    settings: Arc<Settings>,
    metrics: Metrics,
    /// Cards being decided or already decided; `None` when the guard is off.
    decisions: Option<DecisionLedger>,
}

impl ModerationWorkflow {
    pub fn new(gateway: Arc<dyn ChatGateway>, settings: Arc<Settings>, metrics: Metrics) -> Self {
        let decisions = settings.decision_guard.then(DecisionLedger::new);
        Self {
            gateway,
            settings,
            metrics,
            decisions,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Replies to `/start` in a private chat.
    pub async fn start(&self, chat_id: i64, user: &ChatUser) {
        if self.settings.check_membership {
            match self.gateway.is_chat_member(self.settings.group_chat_id, user.id).await {
                Ok(true) => {
                    log::info!("User {} is already in group {}", user.id, self.settings.group_chat_id);
                    self.deliver(OutgoingMessage::new(chat_id, texts::ALREADY_MEMBER), "already member notice")
                        .await;
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Membership lookup for user {} failed: {}", user.id, e);
                    self.metrics.record_gateway_failure("get_chat_member");
                }
            }
        }

        self.deliver(
            OutgoingMessage::new(chat_id, texts::CHOOSE_ROLE).keyboard(role_keyboard()),
            "role choice",
        )
        .await;
    }

    /// Reply to any private message that is not a command.
    pub async fn fallback(&self, chat_id: i64) {
        self.deliver(OutgoingMessage::new(chat_id, texts::GREETING), "greeting").await;
    }

    /// Turns the role-choice message into a link to the matching form.
    ///
    /// `role` is `None` when the pressed button carried a role this bot does
    /// not know; the message then asks the user to start over instead of
    /// showing a link that leads nowhere.
    pub async fn select_role(&self, origin: MessageRef, user: &ChatUser, role: Option<Role>) {
        let link = role.and_then(|role| {
            let username = user.username.as_deref().unwrap_or_default();
            match self.settings.form_url(role, username, user.id) {
                Ok(url) => Some(url),
                Err(e) => {
                    log::error!("Form link for {} could not be built: {}", role, e);
                    None
                }
            }
        });

        let (text, keyboard) = match link {
            Some(url) => (
                texts::FILL_FORM,
                Some(Keyboard::new(vec![vec![Button::url(texts::REGISTER_BUTTON, url)]])),
            ),
            None => {
                log::warn!("User {} picked an unknown role", user.id);
                (texts::UNKNOWN_ROLE, None)
            }
        };

        self.edit(origin, text.to_string(), keyboard, "role choice").await;
    }

    /// Handles a form submission: decode, render, post for review.
    pub async fn intake(&self, role: Role, body: &[u8]) -> IntakeOutcome {
        let outcome = self.post_card(role, body).await;
        self.metrics.record_submission(role.as_str(), outcome.label());
        outcome
    }

    async fn post_card(&self, role: Role, body: &[u8]) -> IntakeOutcome {
        let applicant = match Applicant::decode(role, body) {
            Ok(applicant) => applicant,
            Err(e) => {
                log::error!(
                    "Failed to decode {} submission: {}. Raw payload: {}",
                    role,
                    e,
                    String::from_utf8_lossy(body)
                );
                self.notify_admins(intake_error(role)).await;
                return IntakeOutcome::Malformed;
            }
        };

        let message = OutgoingMessage::new(self.settings.admin_chat_id, card::render(&applicant))
            .keyboard(moderation_keyboard(applicant.chat_id(), role));

        match self.deliver(message, "review card").await {
            Some(posted) => {
                log::info!(
                    "Posted {} application from {} as message {}",
                    role,
                    applicant.chat_id(),
                    posted.message_id
                );
                IntakeOutcome::Posted(posted)
            }
            None => IntakeOutcome::DeliveryFailed,
        }
    }

    /// Applies an admin decision to the application behind `admin`.
    pub async fn resolve(&self, token: ActionToken, admin: &AdminMessage) -> DecisionOutcome {
        let outcome = self.decide(token, admin).await;
        let action: &'static str = token.action.into();
        self.metrics.record_decision(action, outcome.label());
        outcome
    }

    async fn decide(&self, token: ActionToken, admin: &AdminMessage) -> DecisionOutcome {
        if ModerationState::from_card_text(&admin.text).is_decided() {
            log::info!(
                "Ignoring {} on message {}: already decided",
                token.action,
                admin.target.message_id
            );
            return DecisionOutcome::AlreadyDecided;
        }

        let claim = match self.claim(admin.target) {
            Ok(claim) => claim,
            Err(Busy::Decided) => {
                log::info!(
                    "Ignoring {} on message {}: decided earlier",
                    token.action,
                    admin.target.message_id
                );
                return DecisionOutcome::AlreadyDecided;
            }
            Err(Busy::InFlight) => {
                log::info!(
                    "Ignoring {} on message {}: another decision is in progress",
                    token.action,
                    admin.target.message_id
                );
                return DecisionOutcome::InFlight;
            }
        };

        let outcome = match token.action {
            Action::Accept => self.accept(token, admin).await,
            Action::Reject => self.reject(token, admin).await,
        };

        // A failed invite leaves the card pending.
        if outcome != DecisionOutcome::InviteFailed {
            if let Some(claim) = claim {
                claim.settle();
            }
        }
        outcome
    }

    async fn accept(&self, token: ActionToken, admin: &AdminMessage) -> DecisionOutcome {
        let link = match self
            .gateway
            .create_invite_link(self.settings.group_chat_id, &self.settings.invite_link_name, 1)
            .await
        {
            Ok(link) => link,
            Err(e) => {
                log::error!("Failed to create invite link for {}: {}", token.applicant_id, e);
                self.metrics.record_gateway_failure("create_invite_link");
                self.notify_admins(texts::DECISION_ERROR).await;
                return DecisionOutcome::InviteFailed;
            }
        };

        self.deliver(
            OutgoingMessage::new(token.applicant_id, texts::accepted_notice(&link)),
            "invite link",
        )
        .await;

        self.edit(
            admin.target,
            card::with_banner(Action::Accept, &admin.text),
            None,
            "accepted card",
        )
        .await;

        if let Some(target) = self.settings.broadcast {
            self.deliver(
                OutgoingMessage::new(target.chat_id, card::broadcast_text(&admin.text, token.role))
                    .thread(target.thread_id),
                "new member announcement",
            )
            .await;
        }

        log::info!("Accepted {} application from {}", token.role, token.applicant_id);
        DecisionOutcome::Accepted
    }

    async fn reject(&self, token: ActionToken, admin: &AdminMessage) -> DecisionOutcome {
        self.deliver(
            OutgoingMessage::new(token.applicant_id, texts::rejected_notice(&self.settings.contacts)),
            "rejection notice",
        )
        .await;

        self.edit(
            admin.target,
            card::with_banner(Action::Reject, &admin.text),
            None,
            "rejected card",
        )
        .await;

        log::info!("Rejected {} application from {}", token.role, token.applicant_id);
        DecisionOutcome::Rejected
    }

    async fn notify_admins(&self, text: &str) {
        self.deliver(OutgoingMessage::new(self.settings.admin_chat_id, text), "admin notice")
            .await;
    }

    /// Sends once; a failure is logged and counted.
    async fn deliver(&self, message: OutgoingMessage, what: &str) -> Option<MessageRef> {
        let chat_id = message.chat_id;
        log_failure(
            self.gateway.send_message(message).await,
            &self.metrics,
            "send_message",
            || format!("send {} to {}", what, chat_id),
        )
    }

    async fn edit(&self, target: MessageRef, text: String, keyboard: Option<Keyboard>, what: &str) {
        log_failure(
            self.gateway.edit_message_text(target, text, keyboard).await,
            &self.metrics,
            "edit_message",
            || format!("edit {} (message {} in {})", what, target.message_id, target.chat_id),
        );
    }

    fn claim(&self, target: MessageRef) -> Result<Option<Claim<'_>>, Busy> {
        self.decisions.as_ref().map(|ledger| ledger.claim(target)).transpose()
    }
}

fn log_failure<T, F>(result: GatewayResult<T>, metrics: &Metrics, operation: &str, context: F) -> Option<T>
where
    F: FnOnce() -> String,
{
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Failed to {}: {}", context(), e);
            metrics.record_gateway_failure(operation);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::CallbackData;

    #[test]
    fn test_role_keyboard_payloads() {
        let keyboard = role_keyboard();
        assert_eq!(keyboard.rows.len(), 1);

        let payloads: Vec<_> = keyboard
            .buttons()
            .map(|b| match b {
                Button::Callback { data, .. } => data.clone(),
                Button::Url { .. } => panic!("unexpected url button"),
            })
            .collect();
        assert_eq!(payloads, vec!["role_student", "role_graduate"]);
    }

    #[test]
    fn test_moderation_keyboard_has_two_rows() {
        let keyboard = moderation_keyboard(42, Role::Graduate);
        assert_eq!(keyboard.rows.len(), 2);

        let decoded: Vec<_> = keyboard
            .buttons()
            .map(|b| match b {
                Button::Callback { data, .. } => CallbackData::parse(data).unwrap(),
                Button::Url { .. } => panic!("unexpected url button"),
            })
            .collect();
        assert_eq!(
            decoded,
            vec![
                CallbackData::Action(ActionToken::new(Action::Accept, 42, Role::Graduate)),
                CallbackData::Action(ActionToken::new(Action::Reject, 42, Role::Graduate)),
            ]
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(IntakeOutcome::Posted(MessageRef::new(1, 2)).label(), "posted");
        assert_eq!(IntakeOutcome::DeliveryFailed.label(), "delivery_failed");
        assert_eq!(DecisionOutcome::AlreadyDecided.label(), "already_decided");
        assert_eq!(DecisionOutcome::InviteFailed.label(), "invite_failed");
    }
}
