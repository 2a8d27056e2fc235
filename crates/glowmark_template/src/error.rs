//! Template errors.

use thiserror::Error;

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while compiling or rendering templates.
///
/// These are always handled per entry by the caller; one user's malformed
/// template must never wedge a whole sync run.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template source could not be compiled.
    #[error("template compile failed: {0}")]
    Compile(String),

    /// Rendering a compiled template failed.
    #[error("template render failed: {0}")]
    Render(String),

    /// The engine has no template registered under the given id.
    #[error("unknown template id: {0}")]
    UnknownTemplate(String),
}
