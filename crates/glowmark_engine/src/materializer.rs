//! Turns one downloaded entry into one vault file.

use crate::error::SyncResult;
use crate::state::SyncState;
use glowmark_protocol::{ExportConfig, Highlight, NoteEntry, WriteStyle};
use glowmark_template::{
    block_template_id, replace_or_append, BlockName, CompiledTemplates, HighlightContext,
    RenderContext, TemplateEngine, PAGE_TEMPLATE_ID, TITLE_TEMPLATE_ID,
};
use glowmark_vault::{note_file_name, parent_folder, VaultEntryKind, VaultStore};

/// Materializes entries into the vault under the render policy of one
/// sync run.
pub struct EntryMaterializer<'a> {
    vault: &'a dyn VaultStore,
    engine: &'a dyn TemplateEngine,
}

impl<'a> EntryMaterializer<'a> {
    /// Borrows the materialization seams for one batch.
    pub fn new(vault: &'a dyn VaultStore, engine: &'a dyn TemplateEngine) -> Self {
        Self { vault, engine }
    }

    /// Writes one entry to its vault file and records its path in
    /// `state`. Returns the path written.
    ///
    /// `force_overwrite` overrides the configured write style for
    /// targeted reimports.
    pub async fn materialize(
        &self,
        entry: &NoteEntry,
        config: &ExportConfig,
        compiled: &CompiledTemplates,
        state: &mut SyncState,
        force_overwrite: bool,
    ) -> SyncResult<String> {
        let ctx = build_context(entry, config);
        let path = self.target_path(entry, config, compiled, state, &ctx)?;

        // A previously materialized file under a different name moves
        // instead of leaving an orphan behind.
        if let Some(prior) = state.path_for(&entry.note_id_x) {
            if prior != path && self.vault.kind(prior).await? == Some(VaultEntryKind::File) {
                let prior = prior.to_string();
                self.ensure_parent(&path).await?;
                self.vault.rename(&prior, &path).await?;
            }
        }

        self.ensure_parent(&path).await?;

        let style = if force_overwrite {
            WriteStyle::Overwrite
        } else {
            config.write_style
        };
        match self.vault.kind(&path).await? {
            None => {
                let page = self.engine.render(PAGE_TEMPLATE_ID, &ctx)?;
                self.vault.create(&path, &page).await?;
            }
            Some(_) if style == WriteStyle::Overwrite => {
                let page = self.engine.render(PAGE_TEMPLATE_ID, &ctx)?;
                self.vault.modify(&path, &page).await?;
            }
            Some(_) => {
                self.merge_blocks(&path, compiled, &ctx).await?;
            }
        }

        state.record_path(&entry.note_id_x, &path, entry.update_at);
        Ok(path)
    }

    /// Computes the vault path for an entry, rendering the title
    /// template when one is compiled.
    fn target_path(
        &self,
        entry: &NoteEntry,
        config: &ExportConfig,
        compiled: &CompiledTemplates,
        state: &SyncState,
        ctx: &RenderContext,
    ) -> SyncResult<String> {
        let title = if compiled.has_title() && self.engine.has_template(TITLE_TEMPLATE_ID) {
            self.engine.render(TITLE_TEMPLATE_ID, ctx)?
        } else {
            entry.title.clone()
        };
        let file_name = note_file_name(title.trim(), &entry.note_id_x, config.truncate_title255);
        Ok(format!("{}/{}", state.base_dir, file_name))
    }

    async fn ensure_parent(&self, path: &str) -> SyncResult<()> {
        if let Some(dir) = parent_folder(path) {
            self.vault.create_folder(dir).await?;
        }
        Ok(())
    }

    /// Re-renders each declared block and merges it into the existing
    /// file, leaving everything outside the marked regions untouched.
    async fn merge_blocks(
        &self,
        path: &str,
        compiled: &CompiledTemplates,
        ctx: &RenderContext,
    ) -> SyncResult<()> {
        let original = self.vault.read(path).await?;
        let mut doc = original.clone();
        for name in BlockName::ALL {
            if !compiled.has_block(name) {
                continue;
            }
            let rendered = self.engine.render(&block_template_id(name), ctx)?;
            doc = replace_or_append(&doc, name.as_str(), rendered.trim_matches('\n'));
        }
        if doc != original {
            self.vault.modify(path, &doc).await?;
        }
        Ok(())
    }
}

/// Builds the render context for one entry under the given policy.
pub fn build_context(entry: &NoteEntry, config: &ExportConfig) -> RenderContext {
    let mdcontent = if config.page_mirror_style != 0 {
        entry.page_mirror.clone().unwrap_or_default()
    } else {
        String::new()
    };
    RenderContext {
        title: entry.title.clone(),
        url: entry.url.clone(),
        noteurl: entry.note_url.clone(),
        tags: render_tags(&entry.tags, config.tag_style),
        pagenote: entry.page_note.clone(),
        createat: entry.create_at,
        updateat: entry.update_at,
        mdcontent,
        highlightcount: entry.highlights.len(),
        highlights: entry.highlights.iter().map(highlight_context).collect(),
    }
}

fn highlight_context(h: &Highlight) -> HighlightContext {
    HighlightContext {
        note: h.note.clone(),
        imageurl: h.image_url.clone(),
        annotation: h.annotation.clone(),
        color: h.color.clone(),
        slot: h.slot,
        refid: h.ref_id.clone(),
    }
}

/// Renders the tag line. Style 2 emits `#tag` hashtags; any other style
/// emits the bare names. Tags containing spaces keep them.
fn render_tags(tags: &[String], tag_style: i32) -> String {
    let mut parts = Vec::with_capacity(tags.len());
    for tag in tags {
        let bare = tag.trim_start_matches('#');
        if bare.is_empty() {
            continue;
        }
        if tag_style == 2 {
            parts.push(format!("#{bare}"));
        } else {
            parts.push(bare.to_string());
        }
    }
    parts.join(" ")
}
