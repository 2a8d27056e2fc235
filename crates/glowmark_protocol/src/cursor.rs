//! Opaque sync cursors and the reconciliation rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, server-issued sync position token.
///
/// The server folds several internal counters into one string; the client
/// only ever compares cursors for equality. An earlier protocol revision
/// exposed the counters individually and had clients pick the max per
/// field, which caused regressions once the server changed its internal
/// layout. Never reintroduce per-field comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncCursor(String);

impl SyncCursor {
    /// Creates a cursor from a server-issued token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The empty cursor, meaning "never synced".
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Returns true if this cursor carries no position.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyncCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SyncCursor {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Outcome of reconciling an observed cursor against the saved one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The observed cursor brings nothing new; keep the saved value.
    NoChange,
    /// The server moved the position; this is the new authoritative cursor.
    Advanced(SyncCursor),
}

impl Reconciled {
    /// Returns true if the cursor did not move.
    pub fn is_no_change(&self) -> bool {
        matches!(self, Reconciled::NoChange)
    }
}

/// Combines a newly observed cursor with the locally saved one.
///
/// The server is trusted unconditionally: any non-empty observed cursor
/// that differs from the saved value replaces it wholesale. An empty
/// observed cursor never clobbers a saved position.
pub fn reconcile(observed: &SyncCursor, saved: &SyncCursor) -> Reconciled {
    if observed == saved || observed.is_empty() {
        Reconciled::NoChange
    } else {
        Reconciled::Advanced(observed.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_is_idempotent() {
        let c = SyncCursor::new("g1:42:17");
        assert_eq!(reconcile(&c, &c), Reconciled::NoChange);

        let empty = SyncCursor::empty();
        assert_eq!(reconcile(&empty, &empty), Reconciled::NoChange);
    }

    #[test]
    fn reconcile_trusts_server() {
        let saved = SyncCursor::new("g1:42:17");
        let observed = SyncCursor::new("g1:43:02");
        assert_eq!(
            reconcile(&observed, &saved),
            Reconciled::Advanced(observed.clone())
        );

        // Even a "smaller looking" token wins; no ordering is applied.
        let older = SyncCursor::new("g1:1:1");
        assert_eq!(reconcile(&older, &saved), Reconciled::Advanced(older));
    }

    #[test]
    fn reconcile_nonempty_over_empty_saved() {
        let observed = SyncCursor::new("abc");
        assert_eq!(
            reconcile(&observed, &SyncCursor::empty()),
            Reconciled::Advanced(observed)
        );
    }

    #[test]
    fn empty_observed_retains_saved() {
        let saved = SyncCursor::new("g1:42:17");
        assert_eq!(reconcile(&SyncCursor::empty(), &saved), Reconciled::NoChange);
    }

    #[test]
    fn cursor_serde_is_transparent() {
        let c = SyncCursor::new("tok");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"tok\"");
        let back: SyncCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
