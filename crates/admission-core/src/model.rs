//! Applicant records as they arrive from the external registration forms.
//!
//! Two closed variants tagged by [`Role`]. The only field the workflow relies
//! on after intake is the applicant's chat id, so decoding refuses records
//! where it is missing, empty or not a number.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Self-declared role of an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Student,
    Graduate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Form filled in by a current student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    #[serde(deserialize_with = "chat_id")]
    pub tg_id: i64,
    #[serde(default, deserialize_with = "text")]
    pub nickname: String,
    #[serde(default, deserialize_with = "text")]
    pub name: String,
    #[serde(default, deserialize_with = "text")]
    pub class: String,
}

/// Form filled in by a graduate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraduateForm {
    #[serde(deserialize_with = "chat_id")]
    pub tg_id: i64,
    #[serde(default, deserialize_with = "text")]
    pub nickname: String,
    #[serde(default, deserialize_with = "text")]
    pub name: String,
    #[serde(default, deserialize_with = "text")]
    pub year: String,
    #[serde(default, deserialize_with = "text")]
    pub class: String,
    #[serde(default, deserialize_with = "text")]
    pub city_info: String,
    #[serde(default, deserialize_with = "text")]
    pub university_info: String,
    #[serde(default, deserialize_with = "text")]
    pub work_info: String,
    #[serde(default, deserialize_with = "text")]
    pub extra_info: String,
}

/// A decoded submission, tagged by role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicant {
    Student(StudentForm),
    Graduate(GraduateForm),
}

impl Applicant {
    /// Decodes a raw form submission for the given role.
    pub fn decode(role: Role, body: &[u8]) -> Result<Self, serde_json::Error> {
        match role {
            Role::Student => serde_json::from_slice(body).map(Applicant::Student),
            Role::Graduate => serde_json::from_slice(body).map(Applicant::Graduate),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Applicant::Student(_) => Role::Student,
            Applicant::Graduate(_) => Role::Graduate,
        }
    }

    /// Chat id the outcome of the review is delivered to.
    pub fn chat_id(&self) -> i64 {
        match self {
            Applicant::Student(form) => form.tg_id,
            Applicant::Graduate(form) => form.tg_id,
        }
    }

    pub fn nickname(&self) -> &str {
        match self {
            Applicant::Student(form) => &form.nickname,
            Applicant::Graduate(form) => &form.nickname,
        }
    }
}

/// Accepts `"12345"` as well as `12345`; rejects empty, zero and non-numeric ids.
fn chat_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    let id = match Raw::deserialize(deserializer)? {
        Raw::Number(id) => id,
        Raw::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(D::Error::custom("tgId is empty"));
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| D::Error::custom(format!("tgId is not a chat id: {:?}", trimmed)))?
        }
    };

    if id == 0 {
        return Err(D::Error::custom("tgId must not be zero"));
    }
    Ok(id)
}

/// Optional text field; `null` is treated like a missing value.
fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
