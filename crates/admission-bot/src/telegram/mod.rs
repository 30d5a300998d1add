//! Telegram bot integration and handlers

pub mod bot;
pub mod gateway;
pub mod schema;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use gateway::TelegramGateway;
pub use schema::{handle_callback_data, schema, CallbackRoute, HandlerDeps, HandlerError};
