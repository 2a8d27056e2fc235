//! Filename computation helpers.

/// The common filesystem limit for a single path component, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Characters that cannot appear in filenames on at least one supported
/// platform.
const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// Makes a title safe to use as a filename component.
///
/// Unsafe and control characters become spaces, runs of whitespace
/// collapse to one space, and leading dots are stripped so the file never
/// turns hidden.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_start_matches('.').trim().to_string()
}

/// The parent folder of a vault path, or `None` at the vault root.
pub fn parent_folder(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir).filter(|d| !d.is_empty())
}

/// Computes the filename for a note: sanitized title plus the stable note
/// identifier as a uniqueness suffix.
///
/// The identifier suffix guarantees two entries never collide even when
/// titles collide or are empty. With `truncate255` the name is shortened
/// to fit [`MAX_FILE_NAME_BYTES`], always preserving the suffix.
pub fn note_file_name(title: &str, note_id_x: &str, truncate255: bool) -> String {
    let mut base = sanitize_title(title);
    if base.is_empty() {
        base = "No title".to_string();
    }
    let suffix = format!("-{note_id_x}.md");
    if truncate255 {
        let budget = MAX_FILE_NAME_BYTES.saturating_sub(suffix.len());
        if base.len() > budget {
            let mut cut = budget;
            while cut > 0 && !base.is_char_boundary(cut) {
                cut -= 1;
            }
            base.truncate(cut);
            base = base.trim_end().to_string();
        }
    }
    format!("{base}{suffix}")
}
