//! In-memory [`ChatGateway`] for tests.
//!
//! Records every call instead of talking to a chat API, hands out
//! increasing message ids, and can be told to fail an operation or to park
//! invite-link creation until the test releases it.
//!
//! ```
//! use std::sync::Arc;
//! use admission_core::testing::{GatewayOp, RecordingGateway};
//!
//! let gateway = Arc::new(RecordingGateway::new());
//! gateway.fail(GatewayOp::SendMessage);
//! assert!(gateway.calls().is_empty());
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::gateway::{ChatGateway, GatewayError, GatewayResult, Keyboard, MessageRef, OutgoingMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    SendMessage,
    EditMessage,
    CreateInviteLink,
    GetChatMember,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Send(OutgoingMessage),
    Edit {
        target: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    CreateInvite {
        chat_id: i64,
        name: String,
        member_limit: u32,
    },
    MemberLookup {
        chat_id: i64,
        user_id: i64,
    },
}

/// Lets a test hold invite-link creation open.
#[derive(Clone, Default)]
pub struct InviteGate {
    /// Notified once a call is parked.
    pub entered: Arc<Notify>,
    /// Notify to let the parked call finish.
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    failing: Mutex<HashSet<GatewayOp>>,
    members: Mutex<HashSet<i64>>,
    next_message_id: AtomicI32,
    invite_gate: Mutex<Option<InviteGate>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `op` fail.
    pub fn fail(&self, op: GatewayOp) {
        lock(&self.failing).insert(op);
    }

    /// Reports `user_id` as a member of any chat.
    pub fn add_member(&self, user_id: i64) {
        lock(&self.members).insert(user_id);
    }

    /// Parks every later invite-link call until `release` is notified.
    pub fn hold_invites(&self) -> InviteGate {
        let gate = InviteGate::default();
        *lock(&self.invite_gate) = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Send(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutgoingMessage> {
        self.sent().into_iter().filter(|m| m.chat_id == chat_id).collect()
    }

    pub fn edits(&self) -> Vec<(MessageRef, String, Option<Keyboard>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Edit { target, text, keyboard } => Some((target, text, keyboard)),
                _ => None,
            })
            .collect()
    }

    pub fn invites(&self) -> Vec<(i64, String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::CreateInvite {
                    chat_id,
                    name,
                    member_limit,
                } => Some((chat_id, name, member_limit)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        lock(&self.calls).push(call);
    }

    fn check(&self, op: GatewayOp) -> GatewayResult<()> {
        if lock(&self.failing).contains(&op) {
            return Err(GatewayError::Api(format!("{:?} refused", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn send_message(&self, message: OutgoingMessage) -> GatewayResult<MessageRef> {
        let chat_id = message.chat_id;
        self.record(GatewayCall::Send(message));
        self.check(GatewayOp::SendMessage)?;
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageRef::new(chat_id, id))
    }

    async fn edit_message_text(&self, target: MessageRef, text: String, keyboard: Option<Keyboard>) -> GatewayResult<()> {
        self.record(GatewayCall::Edit { target, text, keyboard });
        self.check(GatewayOp::EditMessage)
    }

    async fn create_invite_link(&self, chat_id: i64, name: &str, member_limit: u32) -> GatewayResult<String> {
        self.record(GatewayCall::CreateInvite {
            chat_id,
            name: name.to_string(),
            member_limit,
        });

        let gate = lock(&self.invite_gate).clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        self.check(GatewayOp::CreateInviteLink)?;
        Ok(format!("https://t.me/+invite{}", self.invites().len()))
    }

    async fn is_chat_member(&self, chat_id: i64, user_id: i64) -> GatewayResult<bool> {
        self.record(GatewayCall::MemberLookup { chat_id, user_id });
        self.check(GatewayOp::GetChatMember)?;
        Ok(lock(&self.members).contains(&user_id))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
