use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A closed set of string values accepted for one record field.
pub trait Vocabulary: Sized + Copy {
    /// Every accepted spelling, in declaration order.
    const VALUES: &'static [&'static str];

    /// Exact (case-sensitive) lookup of a stored or submitted value.
    fn parse(value: &str) -> Option<Self>;

    fn as_str(self) -> &'static str;
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, [$($variant:ident),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            JsonSchema,
        )]
        pub enum $name {
            $($variant),+
        }

        impl Vocabulary for $name {
            const VALUES: &'static [&'static str] = &[$(stringify!($variant)),+];

            fn parse(value: &str) -> Option<Self> {
                match value {
                    $(stringify!($variant) => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                <$name as Vocabulary>::parse(value).ok_or_else(|| {
                    format!(
                        "'{value}' is not one of {}",
                        <$name as Vocabulary>::VALUES.join(", ")
                    )
                })
            }
        }
    };
}

vocabulary!(
    /// Triage urgency assigned by the classifier.
    Priority, default = Low, [Low, Medium, High]
);

vocabulary!(
    /// Binary flag used by `action_required` and `is_meeting`.
    YesNo, default = No, [Yes, No]
);

vocabulary!(
    /// Coarse topic of the message.
    Category, default = Other, [Security, Work, Marketing, Spam, Personal, Finance, Other]
);

vocabulary!(
    /// Overall tone of the message.
    Sentiment, default = Neutral, [Positive, Neutral, Negative]
);

/// A persisted email classification, as returned by `GET /api/emails`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmailRecord {
    /// Store-assigned identity.
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub subject: String,
    pub from: String,
    pub summary: Option<String>,
    pub priority: Priority,
    pub action_required: YesNo,
    pub category: Category,
    pub sentiment: Sentiment,
    /// Free-form deadline text, not parsed.
    pub deadline: Option<String>,
    pub is_meeting: YesNo,
    pub important_entities: Vec<String>,
    pub suggested_action: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A validated record that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmailRecord {
    pub subject: String,
    pub from: String,
    pub summary: Option<String>,
    pub priority: Priority,
    pub action_required: YesNo,
    pub category: Category,
    pub sentiment: Sentiment,
    pub deadline: Option<String>,
    pub is_meeting: YesNo,
    pub important_entities: Vec<String>,
    pub suggested_action: Option<String>,
}

/// Raw `email_records` row. Enum columns are decoded separately so a bad
/// stored value surfaces as a query error instead of a panic.
#[derive(Debug, Clone, FromRow)]
pub struct EmailRow {
    pub id: Uuid,
    pub subject: String,
    pub sender: String,
    pub summary: Option<String>,
    pub priority: String,
    pub action_required: String,
    pub category: String,
    pub sentiment: String,
    pub deadline: Option<String>,
    pub is_meeting: String,
    pub important_entities: Vec<String>,
    pub suggested_action: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored column held a value outside its vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record {id} has invalid {column} '{value}'")]
pub struct MalformedRow {
    pub id: Uuid,
    pub column: &'static str,
    pub value: String,
}

fn decode<T: Vocabulary>(id: Uuid, column: &'static str, value: String) -> Result<T, MalformedRow> {
    T::parse(&value).ok_or(MalformedRow { id, column, value })
}

impl TryFrom<EmailRow> for EmailRecord {
    type Error = MalformedRow;

    fn try_from(row: EmailRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Ok(EmailRecord {
            id,
            subject: row.subject,
            from: row.sender,
            summary: row.summary,
            priority: decode(id, "priority", row.priority)?,
            action_required: decode(id, "action_required", row.action_required)?,
            category: decode(id, "category", row.category)?,
            sentiment: decode(id, "sentiment", row.sentiment)?,
            deadline: row.deadline,
            is_meeting: decode(id, "is_meeting", row.is_meeting)?,
            important_entities: row.important_entities,
            suggested_action: row.suggested_action,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Acknowledgement body for `POST /api/save-email`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SaveResponse {
    pub success: bool,
}
