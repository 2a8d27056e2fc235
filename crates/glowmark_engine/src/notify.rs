//! User-facing notices.

use parking_lot::Mutex;

/// Sink for short user-facing status messages.
///
/// The host maps these onto whatever notice UI it has; the engine never
/// formats beyond a single line.
pub trait Notifier: Send + Sync {
    /// Emits an informational notice.
    fn notify(&self, message: &str);

    /// Emits an error notice.
    fn notify_error(&self, message: &str);
}

/// A notifier that forwards notices to the `tracing` log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "glowmark::notice", "{message}");
    }

    fn notify_error(&self, message: &str) {
        tracing::error!(target: "glowmark::notice", "{message}");
    }
}

/// A notifier that records notices in memory, for tests and headless
/// hosts.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

/// One recorded notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Whether the notice was emitted through the error channel.
    pub is_error: bool,
    /// The notice text.
    pub message: String,
}

impl MemoryNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices recorded so far, in emission order.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// All notice messages, ignoring the channel.
    pub fn messages(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.message.clone()).collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str) {
        self.notices.lock().push(Notice {
            is_error: false,
            message: message.to_string(),
        });
    }

    fn notify_error(&self, message: &str) {
        self.notices.lock().push(Notice {
            is_error: true,
            message: message.to_string(),
        });
    }
}
