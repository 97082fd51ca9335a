//! Flash toasts.
//!
//! One-shot notifications stored in the session and drained on the next
//! page render. Mutation handlers push a toast, redirect, and the target
//! page shows it.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::keys;

/// Visual level of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
    Info,
}

impl ToastLevel {
    /// CSS class suffix for the toast element.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A pending notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }
}

/// Append a toast to the session's pending list.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn push_toast(session: &Session, toast: Toast) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<Toast> = session.get(keys::FLASH).await?.unwrap_or_default();
    pending.push(toast);
    session.insert(keys::FLASH, pending).await
}

/// Remove and return all pending toasts.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn take_toasts(session: &Session) -> Result<Vec<Toast>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<Toast>>(keys::FLASH)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_constructors() {
        let toast = Toast::success("Invite sent");
        assert_eq!(toast.level, ToastLevel::Success);
        assert_eq!(toast.message, "Invite sent");

        assert_eq!(Toast::error("nope").level, ToastLevel::Error);
        assert_eq!(Toast::info("fyi").level, ToastLevel::Info);
    }

    #[test]
    fn test_toast_level_css_class() {
        assert_eq!(ToastLevel::Success.css_class(), "success");
        assert_eq!(ToastLevel::Error.css_class(), "error");
        assert_eq!(ToastLevel::Info.css_class(), "info");
    }
}
