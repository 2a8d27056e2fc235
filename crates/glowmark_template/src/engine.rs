//! The abstract template engine and its render context.

use crate::error::TemplateResult;
use serde::Serialize;

/// An expression-evaluating template engine supplied by the host.
///
/// The core registers template sources once per recompilation and renders
/// them by id; it never interprets template syntax itself. The engine's
/// contract includes the filter surface the default templates rely on
/// (date formatting, per-highlight styling).
pub trait TemplateEngine: Send + Sync {
    /// Compiles `source` and registers it under `id`, replacing any
    /// previous template with that id.
    fn compile(&self, id: &str, source: &str) -> TemplateResult<()>;

    /// Renders the template registered under `id` against a context.
    fn render(&self, id: &str, ctx: &RenderContext) -> TemplateResult<String>;

    /// Returns true if a template is registered under `id`.
    fn has_template(&self, id: &str) -> bool;
}

/// The context object a note entry is rendered against: flat keys plus the
/// nested highlight list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderContext {
    /// Page title.
    pub title: String,
    /// Canonical source URL.
    pub url: String,
    /// Deep link back into the highlight service.
    pub noteurl: String,
    /// Pre-rendered tag line.
    pub tags: String,
    /// Page-level note text.
    pub pagenote: String,
    /// Creation time, unix seconds; engines format it via their date
    /// filter.
    pub createat: i64,
    /// Last update time, unix seconds.
    pub updateat: i64,
    /// Full-page mirror markdown, empty when the service captured none.
    pub mdcontent: String,
    /// Number of highlights on the page.
    pub highlightcount: usize,
    /// Highlights in delivered order.
    pub highlights: Vec<HighlightContext>,
}

/// One highlight as exposed to templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HighlightContext {
    /// Highlighted text.
    pub note: String,
    /// Image reference for image highlights.
    pub imageurl: String,
    /// The user's annotation, if any.
    pub annotation: String,
    /// Color name or hex slot.
    pub color: String,
    /// Color slot index.
    pub slot: i32,
    /// Stable reference id for block anchoring.
    pub refid: String,
}
