//! Session-related types.
//!
//! Types stored in the session for authentication and navigation state.

use serde::{Deserialize, Serialize};

use moorline_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user. The
/// bearer token lives here too so every API call can carry it without a
/// round trip to the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's Moorline ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name, when the identity provider supplied one.
    pub name: Option<String>,
    /// Whether the user may access the super-admin console.
    pub is_super_admin: bool,
    /// Bearer token for Moorline API calls.
    pub api_token: String,
}

impl CurrentUser {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.email.as_str())
    }
}

/// Session keys for authentication and navigation data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the selected organization id.
    pub const SELECTED_ORG: &str = "selected_org";

    /// Key for pending flash toasts.
    pub const FLASH: &str = "flash";

    /// Key for the post-sign-in return path.
    pub const RETURN_TO: &str = "return_to";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = CurrentUser {
            id: UserId::new(1),
            email: Email::parse("skipper@example.com").unwrap(),
            name: None,
            is_super_admin: false,
            api_token: "tok".to_string(),
        };
        assert_eq!(user.display_name(), "skipper@example.com");

        user.name = Some("Sam".to_string());
        assert_eq!(user.display_name(), "Sam");
    }
}
