//! Session and view models.

pub mod flash;
pub mod session;

pub use flash::{Toast, ToastLevel, push_toast, take_toasts};
pub use session::{CurrentUser, keys as session_keys};
