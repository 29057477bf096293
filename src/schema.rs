//! Shape and validation rules for records submitted to the ingest endpoint.
//!
//! The request body is deserialised leniently (enum fields as plain strings)
//! and then checked here, so every offending field is reported together
//! instead of failing on the first serde error.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Category, NewEmailRecord, Priority, Sentiment, Vocabulary, YesNo};

/// Body accepted by `POST /api/save-email`.
///
/// `subject` and `from` are required; every other field falls back to its
/// schema default when omitted or `null`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmailRecordInput {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub summary: Option<String>,
    /// One of `Low`, `Medium`, `High` (default `Low`).
    pub priority: Option<String>,
    /// `Yes` or `No` (default `No`).
    pub action_required: Option<String>,
    /// One of `Security`, `Work`, `Marketing`, `Spam`, `Personal`, `Finance`,
    /// `Other` (default `Other`).
    pub category: Option<String>,
    /// One of `Positive`, `Neutral`, `Negative` (default `Neutral`).
    pub sentiment: Option<String>,
    pub deadline: Option<String>,
    /// `Yes` or `No` (default `No`).
    pub is_meeting: Option<String>,
    pub important_entities: Option<Vec<String>>,
    pub suggested_action: Option<String>,
}

/// Why a single field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldIssue {
    Missing {
        field: &'static str,
    },
    /// Postgres text cannot store the NUL character.
    ContainsNul {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },
}

impl FieldIssue {
    pub fn field(&self) -> &'static str {
        match self {
            FieldIssue::Missing { field }
            | FieldIssue::ContainsNul { field }
            | FieldIssue::InvalidValue { field, .. } => *field,
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing { field } => write!(f, "`{field}` is required"),
            FieldIssue::ContainsNul { field } => {
                write!(f, "`{field}` must not contain NUL characters")
            }
            FieldIssue::InvalidValue {
                field,
                value,
                allowed,
            } => write!(
                f,
                "`{value}` is not a valid value for `{field}` (expected one of {})",
                allowed.join(", ")
            ),
        }
    }
}

/// A submitted record failed one or more field rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn single(issue: FieldIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// Names of the rejected fields, in the order they were checked.
    pub fn fields(&self) -> Vec<&'static str> {
        self.issues.iter().map(FieldIssue::field).collect()
    }
}

/// Collects issues while a record is being checked.
#[derive(Default)]
struct Checker {
    issues: Vec<FieldIssue>,
}

impl Checker {
    fn required(&mut self, field: &'static str, value: Option<String>) -> String {
        match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            Some(value) => {
                self.storable(field, &value);
                value
            }
            None => {
                self.issues.push(FieldIssue::Missing { field });
                String::new()
            }
        }
    }

    fn optional(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        if let Some(value) = &value {
            self.storable(field, value);
        }
        value
    }

    fn storable(&mut self, field: &'static str, value: &str) {
        if value.contains('\0') && !self.issues.contains(&FieldIssue::ContainsNul { field }) {
            self.issues.push(FieldIssue::ContainsNul { field });
        }
    }

    fn enumerated<T: Vocabulary + Default>(&mut self, field: &'static str, value: Option<String>) -> T {
        let Some(raw) = value else {
            return T::default();
        };

        match T::parse(&raw) {
            Some(parsed) => parsed,
            None => {
                self.issues.push(FieldIssue::InvalidValue {
                    field,
                    value: raw,
                    allowed: T::VALUES,
                });
                T::default()
            }
        }
    }
}

impl EmailRecordInput {
    /// Check every field rule and produce a record ready for insertion.
    pub fn validate(self) -> Result<NewEmailRecord, ValidationError> {
        let mut checker = Checker::default();

        let subject = checker.required("subject", self.subject);
        let from = checker.required("from", self.from);
        let summary = checker.optional("summary", self.summary);
        let deadline = checker.optional("deadline", self.deadline);
        let suggested_action = checker.optional("suggested_action", self.suggested_action);
        let important_entities: Vec<String> = self
            .important_entities
            .unwrap_or_default()
            .into_iter()
            .map(|entity| {
                let entity = entity.trim().to_string();
                checker.storable("important_entities", &entity);
                entity
            })
            .collect();
        let priority: Priority = checker.enumerated("priority", self.priority);
        let action_required: YesNo = checker.enumerated("action_required", self.action_required);
        let category: Category = checker.enumerated("category", self.category);
        let sentiment: Sentiment = checker.enumerated("sentiment", self.sentiment);
        let is_meeting: YesNo = checker.enumerated("is_meeting", self.is_meeting);

        if !checker.issues.is_empty() {
            return Err(ValidationError {
                issues: checker.issues,
            });
        }

        Ok(NewEmailRecord {
            subject,
            from,
            summary,
            priority,
            action_required,
            category,
            sentiment,
            deadline,
            is_meeting,
            important_entities,
            suggested_action,
        })
    }
}
