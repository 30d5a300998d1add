//! Admission bot - Telegram front end and form intake server
//!
//! # Module Structure
//!
//! - `telegram`: bot creation, dispatcher schema, Telegram-backed gateway
//! - `intake`: HTTP endpoint the registration forms post to
//! - `cli`: command line interface

pub mod cli;
pub mod intake;
pub mod telegram;

pub use intake::{router, IntakeState};
pub use telegram::{schema, HandlerDeps, TelegramGateway};
