//! Content records: note entries and highlights.

use serde::{Deserialize, Serialize};

/// One remote note with its highlights, mapped to one local file.
///
/// Entries are immutable once received and consumed exactly once per
/// download batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteEntry {
    /// Page title as captured.
    pub title: String,
    /// Canonical URL of the source page.
    pub url: String,
    /// Stable note identifier; uniqueness suffix for the local filename.
    pub note_id_x: String,
    /// Deep link back into the highlight service.
    pub note_url: String,
    /// Creation time, unix seconds.
    pub create_at: i64,
    /// Last update time, unix seconds.
    pub update_at: i64,
    /// Page-level note.
    pub page_note: String,
    /// Tags attached to the page.
    pub tags: Vec<String>,
    /// Highlights in source-of-truth order. Never re-sorted locally.
    pub highlights: Vec<Highlight>,
    /// Full-page mirror markdown, when the service captured one.
    pub page_mirror: Option<String>,
}

/// A single marked passage or image within a note entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Highlight {
    /// Highlighted text. Empty for image highlights.
    pub note: String,
    /// Image reference for image highlights.
    pub image_url: String,
    /// The user's annotation ("thought") on this highlight, if any.
    pub annotation: String,
    /// Color name or hex slot as delivered.
    pub color: String,
    /// Color slot index.
    pub slot: i32,
    /// Stable reference id used for block-reference anchoring.
    pub ref_id: String,
    /// Last update time, unix seconds.
    pub update_at: i64,
}

impl Highlight {
    /// Returns true if this highlight is an image capture.
    pub fn is_image(&self) -> bool {
        self.note.is_empty() && !self.image_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_decodes_from_wire_shape() {
        let json = r##"{
            "title": "A Page",
            "url": "https://example.com/a",
            "noteIdX": "n1001",
            "noteUrl": "https://glowmark.app/n/1001",
            "createAt": 1700000000,
            "updateAt": 1700000500,
            "pageNote": "worth rereading",
            "tags": ["#reading"],
            "highlights": [
                {"note": "first passage", "color": "yellow", "slot": 1, "refId": "r1", "updateAt": 1700000100},
                {"note": "", "imageUrl": "https://example.com/i.png", "refId": "r2"}
            ]
        }"##;
        let entry: NoteEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.note_id_x, "n1001");
        assert_eq!(entry.highlights.len(), 2);
        assert_eq!(entry.highlights[0].note, "first passage");
        assert!(!entry.highlights[0].is_image());
        assert!(entry.highlights[1].is_image());
        assert!(entry.page_mirror.is_none());
    }

    #[test]
    fn entry_tolerates_missing_fields() {
        // Older server builds omit fields freely; everything defaults.
        let entry: NoteEntry = serde_json::from_str(r#"{"noteIdX": "n1"}"#).unwrap();
        assert_eq!(entry.note_id_x, "n1");
        assert!(entry.title.is_empty());
        assert!(entry.highlights.is_empty());
    }

    #[test]
    fn highlight_order_is_preserved() {
        let json = r#"{"noteIdX":"n1","highlights":[
            {"refId":"b"},{"refId":"a"},{"refId":"c"}
        ]}"#;
        let entry: NoteEntry = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = entry.highlights.iter().map(|h| h.ref_id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }
}
