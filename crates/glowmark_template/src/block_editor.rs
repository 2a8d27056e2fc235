//! Locating and replacing named marked regions in a text document.
//!
//! A region is delimited by a begin/end marker pair unique per block name:
//!
//! ```text
//! %%begin highlights%%
//! ...inner text...
//! %%end highlights%%
//! ```
//!
//! Marker matching is case-insensitive and whitespace-tolerant inside the
//! `%%` delimiters. Only the first region per name is considered; a
//! duplicated region is a tolerated anomaly, not an error.

/// A located marked region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedRegion {
    /// Byte offset just past the begin marker.
    pub inner_start: usize,
    /// Byte offset of the end marker.
    pub inner_end: usize,
    /// The inner text between the markers.
    pub inner: String,
}

/// Delimiter for both ends of a marker.
const FENCE: &str = "%%";

/// Byte positions of every `%%` occurrence in the document.
fn fence_positions(doc: &str) -> Vec<usize> {
    doc.match_indices(FENCE).map(|(i, _)| i).collect()
}

/// Checks whether marker content (the text between two fences) names the
/// given keyword/block pair, ignoring case and surrounding whitespace.
fn marker_matches(content: &str, keyword: &str, name: &str) -> bool {
    let mut tokens = content.split_whitespace();
    let Some(first) = tokens.next() else {
        return false;
    };
    if !first.eq_ignore_ascii_case(keyword) {
        return false;
    }
    let rest: Vec<&str> = tokens.collect();
    rest.join(" ").eq_ignore_ascii_case(name)
}

/// Finds the first marker `%%<keyword> <name>%%` whose opening fence sits
/// at or after `from`. Returns the byte range of the whole marker.
fn find_marker(doc: &str, keyword: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let fences = fence_positions(doc);
    for pair in fences.windows(2) {
        let (open, close) = (pair[0], pair[1]);
        if open < from {
            continue;
        }
        let content = &doc[open + FENCE.len()..close];
        if marker_matches(content, keyword, name) {
            return Some((open, close + FENCE.len()));
        }
    }
    None
}

/// Locates the first marked region for `name`, if the document has one.
///
/// A begin marker without a matching end marker counts as no region; the
/// caller will then append a fresh, well-formed one.
pub fn locate_marked_region(doc: &str, name: &str) -> Option<MarkedRegion> {
    let (_, begin_end) = find_marker(doc, "begin", name, 0)?;
    let (end_start, _) = find_marker(doc, "end", name, begin_end)?;
    Some(MarkedRegion {
        inner_start: begin_end,
        inner_end: end_start,
        inner: doc[begin_end..end_start].to_string(),
    })
}

/// Wraps inner text in a fresh begin/end marker pair for `name`.
pub fn wrap_region(name: &str, inner: &str) -> String {
    format!("\n%%begin {name}%%\n{inner}\n%%end {name}%%\n")
}

/// Replaces the inner text of the named region, or appends a new wrapped
/// region at the end of the document if none exists.
///
/// Everything outside the region is preserved byte-for-byte. An empty
/// `new_inner` is a no-op: the server having nothing to say for a block
/// must not clobber manually edited content.
pub fn replace_or_append(doc: &str, name: &str, new_inner: &str) -> String {
    if new_inner.is_empty() {
        return doc.to_string();
    }
    match locate_marked_region(doc, name) {
        Some(region) => {
            let mut out = String::with_capacity(doc.len() + new_inner.len());
            out.push_str(&doc[..region.inner_start]);
            out.push('\n');
            out.push_str(new_inner);
            out.push('\n');
            out.push_str(&doc[region.inner_end..]);
            out
        }
        None => {
            let mut out = doc.to_string();
            out.push_str(&wrap_region(name, new_inner));
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Title\n\nintro text\n%%begin highlights%%\nold line\n%%end highlights%%\nfooter\n";

    #[test]
    fn locate_finds_inner_text() {
        let region = locate_marked_region(DOC, "highlights").unwrap();
        assert_eq!(region.inner, "\nold line\n");
        assert_eq!(&DOC[region.inner_start..region.inner_end], "\nold line\n");
    }

    #[test]
    fn locate_is_case_insensitive_and_whitespace_tolerant() {
        let doc = "a\n%%  BEGIN   Highlights %%\nx\n%% End highlights%%\nb\n";
        let region = locate_marked_region(doc, "highlights").unwrap();
        assert_eq!(region.inner, "\nx\n");
    }

    #[test]
    fn locate_takes_first_occurrence_only() {
        let doc = "%%begin h%%\nfirst\n%%end h%%\n%%begin h%%\nsecond\n%%end h%%\n";
        let region = locate_marked_region(doc, "h").unwrap();
        assert_eq!(region.inner, "\nfirst\n");
    }

    #[test]
    fn locate_missing_region() {
        assert!(locate_marked_region(DOC, "pagenote").is_none());
        // A begin without an end is treated as absent.
        let dangling = "x\n%%begin pagenote%%\nnope";
        assert!(locate_marked_region(dangling, "pagenote").is_none());
    }

    #[test]
    fn locate_ignores_stray_fences() {
        let doc = "math uses %% sometimes\n%%begin h%%\nreal\n%%end h%%\n";
        let region = locate_marked_region(doc, "h").unwrap();
        assert_eq!(region.inner, "\nreal\n");
    }

    #[test]
    fn replace_preserves_everything_outside() {
        let out = replace_or_append(DOC, "highlights", "new line");
        assert_eq!(
            out,
            "# Title\n\nintro text\n%%begin highlights%%\nnew line\n%%end highlights%%\nfooter\n"
        );
    }

    #[test]
    fn replace_is_idempotent() {
        let once = replace_or_append(DOC, "highlights", "new line");
        let twice = replace_or_append(&once, "highlights", "new line");
        assert_eq!(once, twice);
    }

    #[test]
    fn append_when_region_missing() {
        let out = replace_or_append("body\n", "pagenote", "a note");
        assert_eq!(out, "body\n\n%%begin pagenote%%\na note\n%%end pagenote%%\n");
        // A second application replaces the appended region in place.
        let again = replace_or_append(&out, "pagenote", "a note");
        assert_eq!(out, again);
    }

    #[test]
    fn empty_inner_is_a_noop() {
        assert_eq!(replace_or_append(DOC, "highlights", ""), DOC);
        assert_eq!(replace_or_append("no regions here", "pagenote", ""), "no regions here");
    }

    #[test]
    fn replace_keeps_marker_casing_as_found() {
        let doc = "%%Begin H%%\nv1\n%%END h%%\n";
        let out = replace_or_append(doc, "h", "v2");
        assert_eq!(out, "%%Begin H%%\nv2\n%%END h%%\n");
    }
}
