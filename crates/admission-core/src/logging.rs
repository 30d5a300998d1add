//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup banner with the effective configuration

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use simplelog::*;
use std::fs::File;

use crate::config::Settings;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Bot id part of a token, the secret half masked.
pub fn redact_token(token: &SecretString) -> String {
    match token.expose_secret().split_once(':') {
        Some((bot_id, _)) if !bot_id.is_empty() => format!("{}:***", bot_id),
        _ => "***".to_string(),
    }
}

/// Logs the effective configuration at application startup.
pub fn log_startup_configuration(settings: &Settings) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Admission bot configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Bot token: {}", redact_token(&settings.bot_token));
    if let Some(ref url) = settings.bot_api_url {
        log::info!("Bot API URL: {}", url);
    }
    log::info!("Admin chat: {}", settings.admin_chat_id);
    log::info!("Group chat: {}", settings.group_chat_id);
    match settings.broadcast {
        Some(target) => match target.thread_id {
            Some(thread) => log::info!("Broadcast: chat {} thread {}", target.chat_id, thread),
            None => log::info!("Broadcast: chat {}", target.chat_id),
        },
        None => log::warn!("Broadcast: disabled"),
    }
    log::info!("Intake server: http://{}", settings.http_addr);
    log::info!("Shutdown grace: {:?}", settings.shutdown_grace);
    log::info!("Contacts: {}", settings.contacts.join(", "));
    log::info!("Membership check: {}", settings.check_membership);
    log::info!("Decision guard: {}", settings.decision_guard);
    if !settings.decision_guard {
        log::warn!("Concurrent presses on one review card may both run");
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    #[test]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // A logger may already be installed by another test in this binary.
        let _ = init_logger(path);
        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_redact_token() {
        assert_eq!(redact_token(&SecretString::from("123456:ABC-secret")), "123456:***");
        assert_eq!(redact_token(&SecretString::from("no-colon")), "***");
        assert_eq!(redact_token(&SecretString::from(":secret")), "***");
    }

    #[test]
    fn test_log_startup_configuration_runs() {
        let settings = Settings::new("42:secret", -1, -2);
        log_startup_configuration(&settings);
    }
}
