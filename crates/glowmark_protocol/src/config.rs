//! Server-driven render/write policy.

use serde::{Deserialize, Serialize};

/// How rendered content is written to an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum WriteStyle {
    /// Full-page render replaces the file unconditionally.
    Overwrite,
    /// Sub-blocks are merged into the existing file, preserving any manual
    /// edits outside the marked regions.
    AppendMerge,
}

impl From<i32> for WriteStyle {
    fn from(v: i32) -> Self {
        match v {
            2 => WriteStyle::AppendMerge,
            // Unknown styles fall back to the safe full render.
            _ => WriteStyle::Overwrite,
        }
    }
}

impl From<WriteStyle> for i32 {
    fn from(s: WriteStyle) -> i32 {
        match s {
            WriteStyle::Overwrite => 1,
            WriteStyle::AppendMerge => 2,
        }
    }
}

impl Default for WriteStyle {
    fn default() -> Self {
        WriteStyle::Overwrite
    }
}

/// Render and write behavior, owned by the server.
///
/// Replaced wholesale on every successful init response: render policy is
/// always the freshest available, even on a run that otherwise fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// Overwrite vs merge behavior.
    pub write_style: WriteStyle,
    /// Template expression for the local filename.
    pub title_template: String,
    /// Page template source; drives recompilation when it changes.
    pub page_template: String,
    /// Per-highlight styling selector, interpreted by the template engine.
    pub highlight_style: i32,
    /// Tag rendering selector.
    pub tag_style: i32,
    /// Whether/how the full-page mirror is rendered.
    pub page_mirror_style: i32,
    /// Shorten computed filenames to fit a 255-byte filesystem limit.
    pub truncate_title255: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_style_wire_integers() {
        assert_eq!(WriteStyle::from(1), WriteStyle::Overwrite);
        assert_eq!(WriteStyle::from(2), WriteStyle::AppendMerge);
        assert_eq!(WriteStyle::from(0), WriteStyle::Overwrite);
        assert_eq!(WriteStyle::from(99), WriteStyle::Overwrite);
        assert_eq!(i32::from(WriteStyle::AppendMerge), 2);
    }

    #[test]
    fn config_decodes_from_wire_shape() {
        let json = r###"{
            "writeStyle": 2,
            "titleTemplate": "{{title}}",
            "pageTemplate": "## {{title}}",
            "highlightStyle": 1,
            "tagStyle": 1,
            "pageMirrorStyle": 0,
            "truncateTitle255": true
        }"###;
        let cfg: ExportConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.write_style, WriteStyle::AppendMerge);
        assert!(cfg.truncate_title255);
        assert_eq!(cfg.page_template, "## {{title}}");
    }

    #[test]
    fn config_defaults_when_fields_missing() {
        let cfg: ExportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.write_style, WriteStyle::Overwrite);
        assert!(!cfg.truncate_title255);
    }
}
