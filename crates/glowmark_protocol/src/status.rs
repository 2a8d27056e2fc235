//! Task status vocabulary for the init phase.

/// Server-side export task status, as returned by the init endpoint.
///
/// The export is prepared asynchronously on the server; the client polls
/// init until the task leaves the waiting set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Everything up to the cursor is already synced; nothing to download.
    Synced,
    /// The sync service subscription has expired. Terminal.
    Expired,
    /// The export task is still being built server-side; poll again.
    Waiting,
    /// The export is ready; proceed to the download phase.
    Ready,
    /// A status string this client does not recognize. Terminal, with the
    /// raw value kept for diagnostics.
    Unknown(String),
}

const WAITING_STATUSES: &[&str] = &["PENDING", "RECEIVED", "STARTED", "RETRY"];

impl TaskStatus {
    /// Parses the wire status string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "SYNCED" => TaskStatus::Synced,
            "EXPIRED" => TaskStatus::Expired,
            "SYNCING" => TaskStatus::Ready,
            s if WAITING_STATUSES.contains(&s) => TaskStatus::Waiting,
            other => TaskStatus::Unknown(other.to_string()),
        }
    }
}
