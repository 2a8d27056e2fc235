//! # Glowmark Templates
//!
//! Pure string machinery for template-driven, idempotent file rendering:
//!
//! - `block_editor`: locates and replaces named marked regions
//!   (`%%begin <name>%% ... %%end <name>%%`) inside a persisted document
//! - `compiler`: extracts named sub-blocks from a page template, wraps
//!   them with reconciliation markers, and hands compiled renderers to an
//!   abstract [`TemplateEngine`]
//! - `engine`: the engine trait and the [`RenderContext`] fed to it
//!
//! This crate performs no I/O and implements no template language of its
//! own; expression evaluation is the engine implementation's business.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod block_editor;
mod compiler;
mod engine;
mod error;

pub use block_editor::{locate_marked_region, replace_or_append, wrap_region, MarkedRegion};
pub use compiler::{
    block_template_id, compile, extract_blocks, BlockName, CompiledTemplates, TemplateBlocks,
    TemplateCompiler, PAGE_TEMPLATE_ID, TITLE_TEMPLATE_ID,
};
pub use engine::{HighlightContext, RenderContext, TemplateEngine};
pub use error::{TemplateError, TemplateResult};
