//! Admission core - applicant registration and moderation without Telegram
//!
//! This crate holds everything the admission bot does that can be tested
//! without a network: decoding form submissions, rendering review cards,
//! encoding button payloads and driving the accept/reject workflow through
//! the [`ChatGateway`] trait.
//!
//! # Module Structure
//!
//! - `model`: applicant records and roles
//! - `card`: review card text, hashtags, decision banners
//! - `callback`: inline-button payload codec
//! - `gateway`: outbound messaging contract
//! - `workflow`: the moderation state machine
//! - `decisions`: cards already decided by this process
//! - `testing`: a recording gateway for tests
//! - `config`, `error`, `logging`, `metrics`, `texts`: ambient pieces

pub mod callback;
pub mod card;
pub mod config;
pub mod decisions;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod testing;
pub mod texts;
pub mod workflow;

pub use callback::{Action, ActionToken, CallbackData, CallbackError, RoleToken};
pub use config::{BroadcastTarget, ConfigError, Settings};
pub use error::{AppError, AppResult};
pub use gateway::{Button, ChatGateway, GatewayError, GatewayResult, Keyboard, MessageRef, OutgoingMessage, ParseMode};
pub use metrics::Metrics;
pub use model::{Applicant, GraduateForm, Role, StudentForm};
pub use workflow::{AdminMessage, ChatUser, DecisionOutcome, IntakeOutcome, ModerationWorkflow};
