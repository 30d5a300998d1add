//! Runtime settings.
//!
//! Everything is read once at startup from environment variables (a `.env`
//! file is loaded by the binary before this runs) into a [`Settings`] value
//! that is handed to each component explicitly.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::model::Role;
use crate::texts;

/// Registration form for students. `{username}` and `{user_id}` are filled in
/// so the applicant does not have to type them.
pub const DEFAULT_STUDENT_FORM_URL: &str = "https://docs.google.com/forms/d/e/1FAIpQLSe_k7fTqytGhSY23jorfXC6HnZy79GR7Acr2JGpKn_UJS3hYg/viewform?usp=pp_url&entry.1409108157={username}&entry.433449939={user_id}";

/// Registration form for graduates, same placeholders.
pub const DEFAULT_GRADUATE_FORM_URL: &str = "https://docs.google.com/forms/d/e/1FAIpQLSelgO9-5K_ug_anDOdzf5gbLmetCfgqm2SsZn26Up8QriLRnA/viewform?usp=pp_url&entry.1052289244={username}&entry.1561674486={user_id}";

pub const DEFAULT_CONTACTS: &str = "@kroexov,@mikhailpuminov";

/// Topic of the group where accepted graduates are announced.
pub const DEFAULT_BROADCAST_THREAD_ID: i32 = 8;

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;
pub const DEFAULT_LOG_FILE_PATH: &str = "admission.log";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where accepted applications are re-posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastTarget {
    pub chat_id: i64,
    pub thread_id: Option<i32>,
}

#[derive(Debug)]
pub struct Settings {
    pub bot_token: SecretString,
    /// Custom Bot API server, if any.
    pub bot_api_url: Option<Url>,
    /// Chat where review cards are posted.
    pub admin_chat_id: i64,
    /// Private group applicants are invited into.
    pub group_chat_id: i64,
    pub broadcast: Option<BroadcastTarget>,
    pub http_addr: SocketAddr,
    pub shutdown_grace: Duration,
    pub student_form_url: String,
    pub graduate_form_url: String,
    /// Handles listed in the rejection notice.
    pub contacts: Vec<String>,
    pub invite_link_name: String,
    /// Tell existing group members so instead of offering the role choice.
    pub check_membership: bool,
    /// Ignore concurrent presses on the same review card.
    pub decision_guard: bool,
    pub log_file_path: String,
}

impl Settings {
    /// Settings with every optional value at its default.
    pub fn new(bot_token: impl Into<String>, admin_chat_id: i64, group_chat_id: i64) -> Self {
        Self {
            bot_token: SecretString::from(bot_token.into()),
            bot_api_url: None,
            admin_chat_id,
            group_chat_id,
            broadcast: Some(BroadcastTarget {
                chat_id: group_chat_id,
                thread_id: Some(DEFAULT_BROADCAST_THREAD_ID),
            }),
            http_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_HTTP_PORT),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            student_form_url: DEFAULT_STUDENT_FORM_URL.to_string(),
            graduate_form_url: DEFAULT_GRADUATE_FORM_URL.to_string(),
            contacts: split_list(DEFAULT_CONTACTS),
            invite_link_name: texts::DEFAULT_INVITE_LINK_NAME.to_string(),
            check_membership: true,
            decision_guard: true,
            log_file_path: DEFAULT_LOG_FILE_PATH.to_string(),
        }
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let admin_chat_id = parse_required(&get, "ADMIN_CHAT_ID")?;
        let group_chat_id = parse_required(&get, "GROUP_CHAT_ID")?;

        let mut settings = Settings::new(token, admin_chat_id, group_chat_id);

        if let Some(raw) = get("BOT_API_URL") {
            let url = Url::parse(&raw).map_err(|e| invalid("BOT_API_URL", &raw, e))?;
            settings.bot_api_url = Some(url);
        }

        let broadcast_enabled = parse_optional(&get, "BROADCAST_ENABLED", parse_bool)?.unwrap_or(true);
        settings.broadcast = if broadcast_enabled {
            let chat_id = parse_optional(&get, "BROADCAST_CHAT_ID", str::parse::<i64>)?.unwrap_or(group_chat_id);
            let thread_id = match get("BROADCAST_THREAD_ID").as_deref() {
                Some("none") => None,
                Some(raw) => Some(raw.parse::<i32>().map_err(|e| invalid("BROADCAST_THREAD_ID", raw, e))?),
                None => Some(DEFAULT_BROADCAST_THREAD_ID),
            };
            Some(BroadcastTarget { chat_id, thread_id })
        } else {
            None
        };

        let host = parse_optional(&get, "HTTP_HOST", str::parse::<IpAddr>)?.unwrap_or(settings.http_addr.ip());
        let port = parse_optional(&get, "HTTP_PORT", str::parse::<u16>)?.unwrap_or(DEFAULT_HTTP_PORT);
        settings.http_addr = SocketAddr::new(host, port);

        if let Some(secs) = parse_optional(&get, "SHUTDOWN_GRACE_SECS", str::parse::<u64>)? {
            settings.shutdown_grace = Duration::from_secs(secs);
        }

        if let Some(template) = get("STUDENT_FORM_URL") {
            settings.student_form_url = template;
        }
        if let Some(template) = get("GRADUATE_FORM_URL") {
            settings.graduate_form_url = template;
        }
        for role in [Role::Student, Role::Graduate] {
            settings.form_url(role, "check", 1).map_err(|e| ConfigError::Invalid {
                key: form_url_key(role),
                value: settings.form_template(role).to_string(),
                reason: e.to_string(),
            })?;
        }

        if let Some(raw) = get("CONTACT_HANDLES") {
            settings.contacts = split_list(&raw);
        }
        if let Some(name) = get("INVITE_LINK_NAME") {
            settings.invite_link_name = name;
        }
        if let Some(flag) = parse_optional(&get, "CHECK_MEMBERSHIP", parse_bool)? {
            settings.check_membership = flag;
        }
        if let Some(flag) = parse_optional(&get, "DECISION_GUARD", parse_bool)? {
            settings.decision_guard = flag;
        }
        if let Some(path) = get("LOG_FILE_PATH") {
            settings.log_file_path = path;
        }

        Ok(settings)
    }

    pub fn form_template(&self, role: Role) -> &str {
        match role {
            Role::Student => &self.student_form_url,
            Role::Graduate => &self.graduate_form_url,
        }
    }

    /// Registration form link for a user, with their username and id pre-filled.
    pub fn form_url(&self, role: Role, username: &str, user_id: i64) -> Result<Url, url::ParseError> {
        let link = self
            .form_template(role)
            .replace("{username}", &urlencoding::encode(username))
            .replace("{user_id}", &user_id.to_string());
        Url::parse(&link)
    }
}

fn form_url_key(role: Role) -> &'static str {
    match role {
        Role::Student => "STUDENT_FORM_URL",
        Role::Graduate => "GRADUATE_FORM_URL",
    }
}

fn parse_required<G>(get: &G, key: &'static str) -> Result<i64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key).ok_or(ConfigError::Missing(key))?;
    raw.parse::<i64>().map_err(|e| invalid(key, &raw, e))
}

fn parse_optional<G, T, E, P>(get: &G, key: &'static str, parse: P) -> Result<Option<T>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, E>,
    E: std::fmt::Display,
{
    get(key)
        .map(|raw| parse(&raw).map_err(|e| invalid(key, &raw, e)))
        .transpose()
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

fn invalid(key: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("BOT_TOKEN", "123:abc"),
        ("ADMIN_CHAT_ID", "-1001"),
        ("GROUP_CHAT_ID", "-1002"),
    ];

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(settings.bot_token.expose_secret(), "123:abc");
        assert_eq!(settings.admin_chat_id, -1001);
        assert_eq!(settings.group_chat_id, -1002);
        assert_eq!(
            settings.broadcast,
            Some(BroadcastTarget {
                chat_id: -1002,
                thread_id: Some(8)
            })
        );
        assert_eq!(settings.http_addr.port(), 8080);
        assert_eq!(settings.shutdown_grace, Duration::from_secs(10));
        assert_eq!(settings.contacts, vec!["@kroexov", "@mikhailpuminov"]);
        assert!(settings.check_membership);
        assert!(settings.decision_guard);
    }

    #[test]
    fn test_missing_required() {
        let err = Settings::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("GROUP_CHAT_ID", "1")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ADMIN_CHAT_ID"));

        let err = Settings::from_lookup(lookup(&[("ADMIN_CHAT_ID", "1"), ("GROUP_CHAT_ID", "1")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("BOT_TOKEN"));
    }

    #[test]
    fn test_teloxide_token_fallback() {
        let settings = Settings::from_lookup(lookup(&[
            ("TELOXIDE_TOKEN", "999:xyz"),
            ("ADMIN_CHAT_ID", "1"),
            ("GROUP_CHAT_ID", "2"),
        ]))
        .unwrap();
        assert_eq!(settings.bot_token.expose_secret(), "999:xyz");
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("HTTP_PORT", "eighty"));
        assert!(matches!(
            Settings::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { key: "HTTP_PORT", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("CHECK_MEMBERSHIP", "maybe"));
        assert!(matches!(
            Settings::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid {
                key: "CHECK_MEMBERSHIP",
                ..
            })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("STUDENT_FORM_URL", "not a url {user_id}"));
        assert!(matches!(
            Settings::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid {
                key: "STUDENT_FORM_URL",
                ..
            })
        ));
    }

    #[test]
    fn test_broadcast_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("BROADCAST_CHAT_ID", "-1003"));
        vars.push(("BROADCAST_THREAD_ID", "none"));
        let settings = Settings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            settings.broadcast,
            Some(BroadcastTarget {
                chat_id: -1003,
                thread_id: None
            })
        );

        let mut vars = REQUIRED.to_vec();
        vars.push(("BROADCAST_ENABLED", "false"));
        let settings = Settings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(settings.broadcast, None);
    }

    #[test]
    fn test_form_url_fills_placeholders() {
        let settings = Settings::new("t", 1, 2);
        let url = settings.form_url(Role::Graduate, "neo the one", 42).unwrap();
        let link = url.as_str();

        assert!(link.starts_with("https://docs.google.com/forms/"));
        assert!(link.contains("entry.1052289244=neo%20the%20one"));
        assert!(link.contains("entry.1561674486=42"));
    }

    #[test]
    fn test_contact_handles_list() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CONTACT_HANDLES", " @a , ,@b"));
        let settings = Settings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(settings.contacts, vec!["@a", "@b"]);
    }
}
