//! Push notifications and the messages the worker sends to its host.

use serde::Serialize;
use url::Url;

use super::WorkerState;

pub const NOTIFICATION_TITLE: &str = "CV Optimizer Pro";
pub const DEFAULT_PUSH_BODY: &str = "Masz nowe powiadomienie z CV Optimizer Pro.";
pub const NOTIFICATION_ICON: &str = "/static/icons/icon-192x192.png";
pub const OPEN_ACTION: &str = "open";
pub const OPEN_ACTION_TITLE: &str = "Otwórz aplikację";

/// A button shown on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification the host should display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// The fixed app notification carrying `body`.
    pub fn app(body: impl Into<String>) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: body.into(),
            icon: NOTIFICATION_ICON.to_string(),
            actions: vec![NotificationAction {
                action: OPEN_ACTION.to_string(),
                title: OPEN_ACTION_TITLE.to_string(),
            }],
        }
    }

    /// Builds the notification for a push payload. Only plain text is read
    /// from the payload; an absent or blank payload gets the default body.
    pub fn from_push(payload: Option<&[u8]>) -> Self {
        let text = payload
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .filter(|text| !text.is_empty());
        Self::app(text.unwrap_or_else(|| DEFAULT_PUSH_BODY.to_string()))
    }
}

/// What the worker asked the host to do after a notification click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Open or focus a window at this URL.
    OpenWindow(Url),
    Ignored,
}

/// Messages from the worker runtime to the embedding host.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Worker moved to a new lifecycle state.
    StateChange { version: String, state: WorkerState },
    /// Display a notification.
    ShowNotification(Notification),
    /// Open or focus a client window.
    OpenWindow(Url),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_text_becomes_body() {
        let n = Notification::from_push(Some("  Twoje CV jest gotowe  ".as_bytes()));
        assert_eq!(n.title, NOTIFICATION_TITLE);
        assert_eq!(n.body, "Twoje CV jest gotowe");
        assert_eq!(n.icon, NOTIFICATION_ICON);
    }

    #[test]
    fn test_empty_push_uses_default_body() {
        assert_eq!(Notification::from_push(None).body, DEFAULT_PUSH_BODY);
        assert_eq!(Notification::from_push(Some(b"   ")).body, DEFAULT_PUSH_BODY);
    }

    #[test]
    fn test_single_open_action() {
        let n = Notification::from_push(None);
        assert_eq!(n.actions.len(), 1);
        assert_eq!(n.actions[0].action, OPEN_ACTION);
    }

    #[test]
    fn test_structured_payload_is_treated_as_text() {
        let n = Notification::from_push(Some(br#"{"title":"ignored"}"#));
        assert_eq!(n.title, NOTIFICATION_TITLE);
        assert_eq!(n.body, r#"{"title":"ignored"}"#);
    }
}
