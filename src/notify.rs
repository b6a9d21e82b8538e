//! Review-channel notifications.
//!
//! Unparseable lines and stat diffs go back to whoever submitted the photo.
//! Delivery is best-effort: a failed notification must never change what
//! was persisted, so the trait is infallible and implementations log their
//! own errors.

/// Fire-and-forget message delivery to a user.
pub trait Notifier {
    fn notify(&self, user_id: i64, message: &str);
}

/// Writes notifications to the application log. Stands in for a chat
/// transport when batches are submitted from the command line.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, user_id: i64, message: &str) {
        crate::log(&format!("[notify {}] {}", user_id, message));
    }
}
