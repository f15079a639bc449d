//! Mutations captured while offline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{ActionId, Record, ResourceType, ValidationError};

/// Kind of payload a pending action carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Medication-intake log.
    LogEntry,
    /// Symptom entry.
    SymptomEntry,
    /// Outgoing message (no server-side record to reconcile with).
    Message,
}

impl ActionType {
    /// The reconcilable resource this action edits, if any.
    pub fn resource_type(&self) -> Option<ResourceType> {
        match self {
            Self::LogEntry => Some(ResourceType::LogEntry),
            Self::SymptomEntry => Some(ResourceType::SymptomEntry),
            Self::Message => None,
        }
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogEntry => "log_entry",
            Self::SymptomEntry => "symptom_entry",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "log_entry" | "log" => Ok(Self::LogEntry),
            "symptom_entry" | "symptom" => Ok(Self::SymptomEntry),
            "message" => Ok(Self::Message),
            other => Err(format!("unknown action type: {other}")),
        }
    }
}

/// Mutation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Create a new resource.
    Create,
    /// Partially update an existing resource.
    Update,
    /// Replace an existing resource wholesale.
    Replace,
    /// Delete an existing resource.
    Delete,
}

impl Method {
    /// Whether this method targets a resource that already exists server-side.
    pub fn targets_existing(&self) -> bool {
        !matches!(self, Self::Create)
    }

    /// Stable uppercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Replace => "REPLACE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATE" | "POST" => Ok(Self::Create),
            "UPDATE" | "PATCH" => Ok(Self::Update),
            "REPLACE" | "PUT" => Ok(Self::Replace),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unknown method: {other}")),
        }
    }
}

/// What a caller hands to the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingActionInput {
    /// Payload kind.
    pub action_type: ActionType,
    /// Endpoint the mutation is sent to.
    pub target_url: String,
    /// Mutation method.
    pub method: Method,
    /// Request headers, stored verbatim.
    pub headers: BTreeMap<String, String>,
    /// Request body.
    pub body: Record,
    /// Server id of the resource being edited (required unless CREATE).
    pub resource_id: Option<String>,
}

impl PendingActionInput {
    /// Create an input with no headers and no resource id.
    pub fn new(
        action_type: ActionType,
        method: Method,
        target_url: impl Into<String>,
        body: Record,
    ) -> Self {
        Self {
            action_type,
            target_url: target_url.into(),
            method,
            headers: BTreeMap::new(),
            body,
            resource_id: None,
        }
    }

    /// Set the resource id.
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check whether a header is present (case-insensitive).
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case(name))
    }

    /// Reject malformed input before it is persisted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target_url.trim().is_empty() {
            return Err(ValidationError::EmptyTargetUrl);
        }
        if self.headers.keys().any(|k| k.trim().is_empty()) {
            return Err(ValidationError::EmptyHeaderName);
        }
        if self.method.targets_existing()
            && self
                .resource_id
                .as_deref()
                .map_or(true, |id| id.trim().is_empty())
        {
            return Err(ValidationError::MissingResourceId {
                method: self.method.to_string(),
            });
        }
        if self.method != Method::Delete && self.body.is_empty() {
            return Err(ValidationError::InvalidBody {
                method: self.method.to_string(),
            });
        }
        Ok(())
    }

    /// Turn validated input into a queued action.
    pub fn into_action(self, id: ActionId, enqueued_at: DateTime<Utc>) -> PendingAction {
        PendingAction {
            id,
            action_type: self.action_type,
            target_url: self.target_url,
            method: self.method,
            headers: self.headers,
            body: self.body,
            enqueued_at,
            resource_id: self.resource_id,
        }
    }
}

/// A mutation waiting to be sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Store-assigned, monotonic.
    pub id: ActionId,
    /// Payload kind.
    pub action_type: ActionType,
    /// Endpoint the mutation is sent to.
    pub target_url: String,
    /// Mutation method.
    pub method: Method,
    /// Request headers captured at enqueue time.
    pub headers: BTreeMap<String, String>,
    /// Request body.
    pub body: Record,
    /// When the action was queued; the local timestamp for conflict checks.
    pub enqueued_at: DateTime<Utc>,
    /// Server id of the edited resource.
    pub resource_id: Option<String>,
}

impl PendingAction {
    /// Whether replay must first compare against server state.
    pub fn needs_conflict_check(&self) -> bool {
        self.method.targets_existing()
            && self.action_type.resource_type().is_some()
            && self.resource_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> Record {
        Record::new().with("status", "taken")
    }

    #[test]
    fn create_without_resource_id_is_valid() {
        let input = PendingActionInput::new(ActionType::LogEntry, Method::Create, "/api/logs", body());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn update_requires_resource_id() {
        let input = PendingActionInput::new(ActionType::LogEntry, Method::Update, "/api/logs/1", body());
        assert_eq!(
            input.validate(),
            Err(ValidationError::MissingResourceId {
                method: "UPDATE".into()
            })
        );

        let input = input.with_resource_id("   ");
        assert!(input.validate().is_err());
    }

    #[test]
    fn empty_target_url_rejected() {
        let input = PendingActionInput::new(ActionType::Message, Method::Create, "  ", body());
        assert_eq!(input.validate(), Err(ValidationError::EmptyTargetUrl));
    }

    #[test]
    fn delete_may_have_empty_body() {
        let input = PendingActionInput::new(
            ActionType::SymptomEntry,
            Method::Delete,
            "/api/symptoms/9",
            Record::new(),
        )
        .with_resource_id("9");
        assert!(input.validate().is_ok());

        let input = PendingActionInput::new(
            ActionType::SymptomEntry,
            Method::Replace,
            "/api/symptoms/9",
            Record::new(),
        )
        .with_resource_id("9");
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidBody { .. })
        ));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let input = PendingActionInput::new(ActionType::LogEntry, Method::Create, "/api/logs", body())
            .with_header("authorization", "Bearer abc");
        assert!(input.has_header("Authorization"));
    }

    #[test]
    fn messages_are_never_conflict_checked() {
        let input = PendingActionInput::new(ActionType::Message, Method::Update, "/api/messages/3", body())
            .with_resource_id("3");
        let action = input.into_action(ActionId::new(1), Utc::now());
        assert!(!action.needs_conflict_check());
    }

    #[test]
    fn method_parsing_accepts_http_verbs() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Update);
        assert_eq!("PUT".parse::<Method>().unwrap(), Method::Replace);
        assert_eq!("symptom-entry".parse::<ActionType>().unwrap(), ActionType::SymptomEntry);
        assert!("GET".parse::<Method>().is_err());
    }
}
