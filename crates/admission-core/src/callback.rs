//! Inline-button payloads.
//!
//! Wire format is `_`-joined ASCII with a type prefix and a fixed field order:
//!
//! - role choice: `role_<role>` (2 fields)
//! - moderation: `action_<accept|reject>_<applicant chat id>_<role>` (4 fields)
//!
//! Since `_` is the delimiter, only enum values and numeric chat ids ever go
//! into a payload. Names and nicknames typed by applicants never do.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::model::Role;

/// Telegram caps `callback_data` at 64 bytes.
pub const MAX_CALLBACK_LEN: usize = 64;

pub const ROLE_PREFIX: &str = "role";
pub const ACTION_PREFIX: &str = "action";

const DELIMITER: char = '_';
const ROLE_FIELDS: usize = 2;
const ACTION_FIELDS: usize = 4;

/// Admin decision on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Accept,
    Reject,
}

/// Payload of the initial "who are you" buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleToken {
    pub role: Role,
}

/// Payload of the accept/reject buttons under a review card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionToken {
    pub action: Action,
    pub applicant_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    Role(RoleToken),
    Action(ActionToken),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    #[error("empty callback payload")]
    Empty,

    #[error("unknown callback prefix: {0:?}")]
    UnknownPrefix(String),

    #[error("{prefix} payload needs {expected} fields, got {actual}")]
    TooFewFields {
        prefix: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    #[error("unknown action: {0:?}")]
    UnknownAction(String),

    #[error("invalid applicant id: {0:?}")]
    InvalidApplicantId(String),
}

impl RoleToken {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    pub fn encode(&self) -> String {
        format!("{}{}{}", ROLE_PREFIX, DELIMITER, self.role)
    }
}

impl ActionToken {
    pub fn new(action: Action, applicant_id: i64, role: Role) -> Self {
        Self {
            action,
            applicant_id,
            role,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{prefix}{d}{action}{d}{id}{d}{role}",
            prefix = ACTION_PREFIX,
            d = DELIMITER,
            action = self.action,
            id = self.applicant_id,
            role = self.role,
        )
    }
}

impl CallbackData {
    pub fn encode(&self) -> String {
        match self {
            CallbackData::Role(token) => token.encode(),
            CallbackData::Action(token) => token.encode(),
        }
    }

    /// Decodes a payload. Fewer fields than the token type needs is an error,
    /// never a partially filled token; trailing extra fields are ignored.
    pub fn parse(data: &str) -> Result<Self, CallbackError> {
        if data.is_empty() {
            return Err(CallbackError::Empty);
        }

        let parts: Vec<&str> = data.split(DELIMITER).collect();
        match parts[0] {
            ROLE_PREFIX => {
                require_fields(ROLE_PREFIX, &parts, ROLE_FIELDS)?;
                Ok(CallbackData::Role(RoleToken::new(parse_role(parts[1])?)))
            }
            ACTION_PREFIX => {
                require_fields(ACTION_PREFIX, &parts, ACTION_FIELDS)?;
                let action =
                    Action::from_str(parts[1]).map_err(|_| CallbackError::UnknownAction(parts[1].to_string()))?;
                let applicant_id = parts[2]
                    .parse::<i64>()
                    .map_err(|_| CallbackError::InvalidApplicantId(parts[2].to_string()))?;
                let role = parse_role(parts[3])?;
                Ok(CallbackData::Action(ActionToken::new(action, applicant_id, role)))
            }
            other => Err(CallbackError::UnknownPrefix(other.to_string())),
        }
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CallbackData {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether a payload belongs to the role-choice keyboard, valid or not.
pub fn is_role_payload(data: &str) -> bool {
    data.split(DELIMITER).next() == Some(ROLE_PREFIX)
}

/// Whether a payload belongs to a moderation keyboard, valid or not.
pub fn is_action_payload(data: &str) -> bool {
    data.split(DELIMITER).next() == Some(ACTION_PREFIX)
}

fn require_fields(prefix: &'static str, parts: &[&str], expected: usize) -> Result<(), CallbackError> {
    if parts.len() < expected {
        return Err(CallbackError::TooFewFields {
            prefix,
            expected,
            actual: parts.len(),
        });
    }
    Ok(())
}

fn parse_role(raw: &str) -> Result<Role, CallbackError> {
    Role::from_str(raw).map_err(|_| CallbackError::UnknownRole(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_role_token() {
        assert_eq!(RoleToken::new(Role::Student).encode(), "role_student");
        assert_eq!(RoleToken::new(Role::Graduate).encode(), "role_graduate");
    }

    #[test]
    fn test_encode_action_token() {
        let token = ActionToken::new(Action::Accept, 123456789, Role::Student);
        assert_eq!(token.encode(), "action_accept_123456789_student");
    }

    #[test]
    fn test_parse_action_token() {
        let parsed = CallbackData::parse("action_reject_42_graduate").unwrap();
        assert_eq!(
            parsed,
            CallbackData::Action(ActionToken::new(Action::Reject, 42, Role::Graduate))
        );
    }

    #[test]
    fn test_round_trip_valid_payloads() {
        for payload in [
            "role_student",
            "role_graduate",
            "action_accept_1_student",
            "action_reject_9223372036854775807_graduate",
            "action_accept_-1001234567890_graduate",
        ] {
            let parsed: CallbackData = payload.parse().unwrap();
            assert_eq!(parsed.encode(), payload);
        }
    }

    #[test]
    fn test_too_few_fields_is_invalid() {
        assert_eq!(
            CallbackData::parse("action_accept_42"),
            Err(CallbackError::TooFewFields {
                prefix: "action",
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(
            CallbackData::parse("role"),
            Err(CallbackError::TooFewFields {
                prefix: "role",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_unknown_values() {
        assert_eq!(
            CallbackData::parse("role_teacher"),
            Err(CallbackError::UnknownRole("teacher".to_string()))
        );
        assert_eq!(
            CallbackData::parse("role_"),
            Err(CallbackError::UnknownRole(String::new()))
        );
        assert_eq!(
            CallbackData::parse("action_approve_1_student"),
            Err(CallbackError::UnknownAction("approve".to_string()))
        );
        assert_eq!(
            CallbackData::parse("action_accept_neo_student"),
            Err(CallbackError::InvalidApplicantId("neo".to_string()))
        );
        assert_eq!(
            CallbackData::parse("menu_main"),
            Err(CallbackError::UnknownPrefix("menu".to_string()))
        );
        assert_eq!(CallbackData::parse(""), Err(CallbackError::Empty));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let parsed = CallbackData::parse("action_accept_5_student_extra").unwrap();
        assert_eq!(
            parsed,
            CallbackData::Action(ActionToken::new(Action::Accept, 5, Role::Student))
        );
    }

    #[test]
    fn test_payload_kind_detection() {
        assert!(is_role_payload("role_teacher"));
        assert!(is_role_payload("role"));
        assert!(!is_role_payload("roles_student"));
        assert!(is_action_payload("action_accept"));
        assert!(!is_action_payload("role_student"));
    }

    #[test]
    fn test_longest_payload_fits_telegram_limit() {
        let token = ActionToken::new(Action::Reject, i64::MIN, Role::Graduate);
        assert!(token.encode().len() <= MAX_CALLBACK_LEN);
    }
}
