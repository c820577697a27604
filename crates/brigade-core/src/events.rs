use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form notification body as sent by the server.
pub type Payload = serde_json::Map<String, Value>;

/// Coarse routing key used by UI regions to subscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiCategory {
    Call,
    Order,
}

impl UiCategory {
    pub const ALL: [UiCategory; 2] = [UiCategory::Call, UiCategory::Order];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Order => "order",
        }
    }
}

impl fmt::Display for UiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `notificationType` of a notification frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    CallCompleted,
    StatusUpdate,
    NewClient,
    NewOrder,
    CallError,
    CallInProgress,
    Other(String),
}

impl NotificationKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "call_completed" => Self::CallCompleted,
            "status_update" => Self::StatusUpdate,
            "new_client" => Self::NewClient,
            "new_order" => Self::NewOrder,
            "call_error" => Self::CallError,
            "call_in_progress" => Self::CallInProgress,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::CallCompleted => "call_completed",
            Self::StatusUpdate => "status_update",
            Self::NewClient => "new_client",
            Self::NewOrder => "new_order",
            Self::CallError => "call_error",
            Self::CallInProgress => "call_in_progress",
            Self::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity. Unknown strings (the server also sends `"high"`) read as `Info`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// A decoded notification frame. Lives for one dispatch cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub payload: Payload,
}

impl Notification {
    pub fn new(kind: NotificationKind, payload: Payload) -> Self {
        Self { kind, payload }
    }

    /// Whether a completed call produced an order.
    pub fn has_order(&self) -> bool {
        self.payload
            .get("hasOrder")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// UI categories this notification is delivered to, in delivery order.
    pub fn ui_categories(&self) -> Vec<UiCategory> {
        match self.kind {
            NotificationKind::CallCompleted if self.has_order() => {
                vec![UiCategory::Call, UiCategory::Order]
            }
            NotificationKind::CallCompleted | NotificationKind::StatusUpdate => {
                vec![UiCategory::Call]
            }
            NotificationKind::NewOrder => vec![UiCategory::Order],
            _ => Vec::new(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.payload.get("title").and_then(Value::as_str)
    }

    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(Value::as_str)
    }

    pub fn priority(&self) -> Priority {
        self.payload
            .get("priority")
            .and_then(Value::as_str)
            .map(Priority::from)
            .unwrap_or_default()
    }

    pub fn details(&self) -> Option<&Payload> {
        self.payload.get("details").and_then(Value::as_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(kind: &str, payload: Value) -> Notification {
        let Value::Object(map) = payload else {
            panic!("payload must be an object");
        };
        Notification::new(NotificationKind::parse(kind), map)
    }

    #[test]
    fn call_completed_routes_to_call() {
        let n = notification("call_completed", json!({"title": "done"}));
        assert_eq!(n.ui_categories(), vec![UiCategory::Call]);
    }

    #[test]
    fn call_completed_with_order_routes_to_both() {
        let n = notification("call_completed", json!({"hasOrder": true}));
        assert_eq!(n.ui_categories(), vec![UiCategory::Call, UiCategory::Order]);
    }

    #[test]
    fn has_order_must_be_boolean_true() {
        let n = notification("call_completed", json!({"hasOrder": "yes"}));
        assert!(!n.has_order());
    }

    #[test]
    fn status_update_routes_to_call() {
        let n = notification("status_update", json!({}));
        assert_eq!(n.ui_categories(), vec![UiCategory::Call]);
    }

    #[test]
    fn new_order_routes_to_order() {
        let n = notification("new_order", json!({}));
        assert_eq!(n.ui_categories(), vec![UiCategory::Order]);
    }

    #[test]
    fn unrouted_kinds() {
        assert!(notification("new_client", json!({})).ui_categories().is_empty());
        assert!(notification("call_error", json!({})).ui_categories().is_empty());
        let other = notification("menu_changed", json!({}));
        assert!(other.ui_categories().is_empty());
        assert!(!other.kind.is_known());
        assert_eq!(other.kind.as_str(), "menu_changed");
    }

    #[test]
    fn priority_lenient_parsing() {
        assert_eq!(Priority::from("error"), Priority::Error);
        assert_eq!(Priority::from("success"), Priority::Success);
        assert_eq!(Priority::from("warning"), Priority::Warning);
        assert_eq!(Priority::from("high"), Priority::Info);
        let p: Priority = serde_json::from_value(json!("high")).unwrap();
        assert_eq!(p, Priority::Info);
        assert_eq!(serde_json::to_value(Priority::Error).unwrap(), json!("error"));
    }

    #[test]
    fn accessors_read_payload_fields() {
        let n = notification(
            "call_completed",
            json!({"title": "Call", "message": "ok", "priority": "success", "details": {"client": "Ana"}}),
        );
        assert_eq!(n.title(), Some("Call"));
        assert_eq!(n.message(), Some("ok"));
        assert_eq!(n.priority(), Priority::Success);
        assert_eq!(n.details().unwrap()["client"], "Ana");
    }
}
