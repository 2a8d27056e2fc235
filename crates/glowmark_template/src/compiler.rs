//! Page template compilation: block extraction and marker wrapping.
//!
//! A page template declares named sub-blocks with nunjucks-style tags:
//!
//! ```text
//! {% block highlights %}
//! {% for item in highlights %}> {{item.note}}{% endfor %}
//! {% endblock %}
//! ```
//!
//! Before the full page is compiled, each recognized block body is
//! substituted back into the page wrapped in the reconciliation markers
//! from [`crate::block_editor`], so a freshly created file already carries
//! the markers needed for future partial updates. Per-block renderers are
//! compiled from the unwrapped body: they produce only the inner text the
//! block editor inserts.

use crate::engine::TemplateEngine;
use crate::error::TemplateResult;

/// Engine id under which the full page renderer is registered.
pub const PAGE_TEMPLATE_ID: &str = "page";
/// Engine id under which the filename title renderer is registered.
pub const TITLE_TEMPLATE_ID: &str = "title";

/// The sub-block names recognized in a page template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockName {
    /// The page-level note.
    PageNote,
    /// The highlight list.
    Highlights,
    /// The full-page mirror markdown.
    MdContent,
}

impl BlockName {
    /// All recognized block names.
    pub const ALL: [BlockName; 3] = [BlockName::PageNote, BlockName::Highlights, BlockName::MdContent];

    /// The name as it appears in block tags and region markers.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockName::PageNote => "pagenote",
            BlockName::Highlights => "highlights",
            BlockName::MdContent => "mdcontent",
        }
    }
}

/// Engine id for a given block renderer.
pub fn block_template_id(name: BlockName) -> String {
    format!("block.{}", name.as_str())
}

/// Extracted block bodies, one per recognized name.
///
/// `None` means the template defines no such block, which is distinct
/// from a block that is present but empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateBlocks {
    /// Body of the `pagenote` block.
    pub pagenote: Option<String>,
    /// Body of the `highlights` block.
    pub highlights: Option<String>,
    /// Body of the `mdcontent` block.
    pub mdcontent: Option<String>,
}

impl TemplateBlocks {
    /// The body for a block, or `None` if the template defines no such
    /// block.
    pub fn get(&self, name: BlockName) -> Option<&str> {
        match name {
            BlockName::PageNote => self.pagenote.as_deref(),
            BlockName::Highlights => self.highlights.as_deref(),
            BlockName::MdContent => self.mdcontent.as_deref(),
        }
    }

    /// The block body, with an empty string for undeclared blocks.
    pub fn source_of(&self, name: BlockName) -> &str {
        self.get(name).unwrap_or("")
    }

    fn set(&mut self, name: BlockName, body: String) {
        match name {
            BlockName::PageNote => self.pagenote = Some(body),
            BlockName::Highlights => self.highlights = Some(body),
            BlockName::MdContent => self.mdcontent = Some(body),
        }
    }
}

/// A compiled page template: renderer handles plus the extracted blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplates {
    /// The page template source these artifacts were compiled from.
    page_source: String,
    /// The title template source compiled alongside.
    title_source: String,
    /// The extracted block bodies.
    pub blocks: TemplateBlocks,
}

impl CompiledTemplates {
    /// Returns true if the page template declares the given block.
    pub fn has_block(&self, name: BlockName) -> bool {
        self.blocks.get(name).is_some()
    }

    /// Returns true if a non-empty title template was compiled.
    pub fn has_title(&self) -> bool {
        !self.title_source.is_empty()
    }

    fn matches(&self, page_source: &str, title_source: &str) -> bool {
        self.page_source == page_source && self.title_source == title_source
    }
}

/// One opening/closing tag pair `{% ... %}` in a template source.
struct Tag {
    start: usize,
    end: usize,
}

const TAG_OPEN: &str = "{%";
const TAG_CLOSE: &str = "%}";

/// Finds the first tag at or after `from` whose tokens satisfy `pred`.
fn find_tag(source: &str, from: usize, pred: impl Fn(&[&str]) -> bool) -> Option<Tag> {
    let mut search = from;
    while let Some(rel) = source[search..].find(TAG_OPEN) {
        let start = search + rel;
        let content_start = start + TAG_OPEN.len();
        let rel_close = source[content_start..].find(TAG_CLOSE)?;
        let content_end = content_start + rel_close;
        let tokens: Vec<&str> = source[content_start..content_end].split_whitespace().collect();
        if pred(&tokens) {
            return Some(Tag {
                start,
                end: content_end + TAG_CLOSE.len(),
            });
        }
        search = content_start;
    }
    None
}

/// The full `{% block name %}...{% endblock %}` span and its body.
struct BlockSpan {
    start: usize,
    end: usize,
    body: String,
}

fn find_block(source: &str, name: &str) -> Option<BlockSpan> {
    let open = find_tag(source, 0, |tokens| tokens == ["block", name])?;
    let close = find_tag(source, open.end, |tokens| {
        tokens.first() == Some(&"endblock")
    })?;
    Some(BlockSpan {
        start: open.start,
        end: close.end,
        body: source[open.end..close.start].to_string(),
    })
}

/// Extracts the recognized block bodies from a page template source.
///
/// First match per name wins. Names the template does not declare are
/// left as `None`.
pub fn extract_blocks(source: &str) -> TemplateBlocks {
    let mut blocks = TemplateBlocks::default();
    for name in BlockName::ALL {
        if let Some(span) = find_block(source, name.as_str()) {
            blocks.set(name, span.body);
        }
    }
    blocks
}

/// Compiles a page template plus its per-block renderers, caching the
/// result across entries so compilation cost does not scale with note
/// count.
#[derive(Debug, Default)]
pub struct TemplateCompiler {
    cached: Option<CompiledTemplates>,
}

impl TemplateCompiler {
    /// Creates an empty compiler with no cached artifacts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached artifacts, recompiling only when either source
    /// changed since the last call.
    pub fn ensure_compiled(
        &mut self,
        page_source: &str,
        title_source: &str,
        engine: &dyn TemplateEngine,
    ) -> TemplateResult<&CompiledTemplates> {
        let stale = match &self.cached {
            Some(c) => !c.matches(page_source, title_source),
            None => true,
        };
        if stale {
            self.cached = Some(compile(page_source, title_source, engine)?);
        }
        // The cache was just populated on the stale path.
        Ok(self.cached.as_ref().unwrap_or_else(|| unreachable!()))
    }

    /// Drops the cached artifacts, forcing recompilation on next use.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// Compiles the page template and its block renderers under their fixed
/// engine ids.
pub fn compile(
    page_source: &str,
    title_source: &str,
    engine: &dyn TemplateEngine,
) -> TemplateResult<CompiledTemplates> {
    let blocks = extract_blocks(page_source);

    // Substitute each declared block back into the page wrapped in the
    // reconciliation markers, so the full render emits mergeable regions.
    let mut wrapped_page = page_source.to_string();
    for name in BlockName::ALL {
        if let Some(span) = find_block(&wrapped_page, name.as_str()) {
            let body = span.body.trim_matches('\n');
            let replacement = format!(
                "%%begin {n}%%\n{body}\n%%end {n}%%",
                n = name.as_str()
            );
            wrapped_page.replace_range(span.start..span.end, &replacement);
        }
    }

    engine.compile(PAGE_TEMPLATE_ID, &wrapped_page)?;
    for name in BlockName::ALL {
        if let Some(body) = blocks.get(name) {
            engine.compile(&block_template_id(name), body.trim_matches('\n'))?;
        }
    }
    if !title_source.is_empty() {
        engine.compile(TITLE_TEMPLATE_ID, title_source)?;
    }

    Ok(CompiledTemplates {
        page_source: page_source.to_string(),
        title_source: title_source.to_string(),
        blocks,
    })
}
