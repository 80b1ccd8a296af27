//! Request DTOs for the host's admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for POST /__sw/notification-click
///
/// # Fields
/// - `action`: The notification action that was clicked, None when the
///   notification body itself was clicked
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationClickRequest {
    #[serde(default)]
    pub action: Option<String>,
}

impl NotificationClickRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match &self.action {
            Some(action) if action.trim().is_empty() => {
                Some("Action cannot be empty; omit it for a body click".to_string())
            }
            Some(action) if action.len() > 64 => {
                Some("Action exceeds maximum length of 64 characters".to_string())
            }
            _ => None,
        }
    }
}
