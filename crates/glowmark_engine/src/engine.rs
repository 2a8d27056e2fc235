//! The sync engine: phase machine, download loop, and host entry points.

use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::materializer::EntryMaterializer;
use crate::notify::Notifier;
use crate::state::{StateStore, SyncState};
use crate::transport::SyncTransport;
use glowmark_protocol::{
    reconcile, AckRequest, ArchiveRequest, DeleteRequest, DownloadRequest, InitRequest,
    InitResponse, NoteEntry, Reconciled, TaskStatus,
};
use glowmark_template::{TemplateCompiler, TemplateEngine};
use glowmark_vault::{note_file_name, VaultEntryKind, VaultStore};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::sleep;

/// Where a run currently is. Purely observational; transitions are owned
/// by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No run in flight.
    Idle,
    /// Waiting on the init endpoint.
    InitPending,
    /// The server is still preparing the export; polling.
    Waiting,
    /// Downloading and materializing batches.
    Downloading,
    /// Acknowledging the final cursor.
    Acking,
    /// The last run ended in an error.
    Failed,
}

/// Drives the full sync protocol against a [`SyncTransport`], writing
/// results through a [`VaultStore`].
///
/// One engine instance serves one vault. All entry points are safe to
/// call concurrently; overlapping runs are rejected, never queued.
pub struct SyncEngine<T> {
    config: EngineConfig,
    transport: Arc<T>,
    vault: Arc<dyn VaultStore>,
    templates: Arc<dyn TemplateEngine>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    compiler: Mutex<TemplateCompiler>,
    phase: RwLock<SyncPhase>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a run leaves scope, whatever the path
/// out.
struct FlightGuard<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

impl<T: SyncTransport> SyncEngine<T> {
    /// Wires an engine from its five seams.
    pub fn new(
        config: EngineConfig,
        transport: Arc<T>,
        vault: Arc<dyn VaultStore>,
        templates: Arc<dyn TemplateEngine>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            transport,
            vault,
            templates,
            store,
            notifier,
            compiler: Mutex::new(TemplateCompiler::new()),
            phase: RwLock::new(SyncPhase::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// The current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write() = phase;
    }

    fn try_begin(&self) -> SyncResult<FlightGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadyInProgress);
        }
        Ok(FlightGuard {
            in_flight: &self.in_flight,
        })
    }

    /// Runs one full sync cycle. `auto` marks scheduled and startup
    /// triggers, as opposed to a manual one.
    pub async fn start_sync(&self, auto: bool) -> SyncResult<()> {
        let _guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(e) => {
                self.notifier.notify("Glowmark: sync already in progress");
                return Err(e);
            }
        };
        tracing::info!(auto, "sync run started");
        let result = self.run_sync(auto).await;
        match &result {
            Ok(()) => self.set_phase(SyncPhase::Idle),
            Err(e) => {
                self.set_phase(SyncPhase::Failed);
                self.handle_failure(e).await;
            }
        }
        result
    }

    /// Stores a new auth token and pushes it to the transport. An empty
    /// token signs out.
    pub async fn set_token(&self, token: &str) -> SyncResult<()> {
        let mut state = self.store.load().await?;
        state.token = token.to_string();
        self.store.save(&state).await?;
        self.push_token(&state);
        Ok(())
    }

    /// Startup hook: clears any stale in-flight flag from a crashed
    /// session, drains pending refreshes, and triggers a sync when
    /// configured to.
    pub async fn on_app_load(&self) -> SyncResult<()> {
        self.in_flight.store(false, Ordering::SeqCst);
        self.set_phase(SyncPhase::Idle);

        if let Err(e) = self.refresh_pending().await {
            tracing::warn!(error = %e, "startup refresh pass failed");
        }

        let state = self.store.load().await?;
        if state.trigger_on_load && !state.token.is_empty() {
            self.start_sync(true).await?;
        }
        Ok(())
    }

    /// Drains up to one batch of queued note ids through a targeted
    /// download. Returns how many ids were drained.
    pub async fn refresh_pending(&self) -> SyncResult<usize> {
        let _guard = self.try_begin()?;
        let mut state = self.store.load().await?;
        if !state.refresh_enabled || state.pending_refresh.is_empty() {
            return Ok(0);
        }
        self.push_token(&state);
        let ids = state.drain_refresh(self.config.refresh_batch);
        let count = ids.len();
        self.store.save(&state).await?;
        tracing::debug!(count, "refreshing queued notes");
        self.run_targeted(&mut state, ids, false).await?;
        self.store.save(&state).await?;
        Ok(count)
    }

    /// Re-downloads the note behind one vault file.
    pub async fn reimport_file(&self, path: &str, overwrite: bool) -> SyncResult<()> {
        let mut state = self.store.load().await?;
        let Some(id) = state.note_id_for_path(path).map(str::to_string) else {
            self.notifier
                .notify_error("Glowmark: cannot reimport; no note is recorded for this file");
            return Err(SyncError::UnknownPath(path.to_string()));
        };
        let _guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(e) => {
                self.notifier.notify("Glowmark: sync already in progress");
                return Err(e);
            }
        };
        self.push_token(&state);
        self.run_targeted(&mut state, vec![id], overwrite).await?;
        self.store.save(&state).await?;
        Ok(())
    }

    /// Archives the note behind one vault file on the server.
    pub async fn archive_path(&self, path: &str) -> SyncResult<()> {
        let state = self.store.load().await?;
        let id = state
            .note_id_for_path(path)
            .ok_or_else(|| SyncError::UnknownPath(path.to_string()))?
            .to_string();
        self.push_token(&state);
        self.transport.archive(&ArchiveRequest { note_id_x: id }).await?;
        self.notifier.notify("Glowmark: note archived");
        Ok(())
    }

    /// Deletes the note behind one vault file on the server and forgets
    /// its index entry. The local file is left alone.
    pub async fn delete_path_from_server(&self, path: &str) -> SyncResult<()> {
        let mut state = self.store.load().await?;
        let id = state
            .note_id_for_path(path)
            .ok_or_else(|| SyncError::UnknownPath(path.to_string()))?
            .to_string();
        self.push_token(&state);
        self.transport
            .delete(&DeleteRequest {
                note_id_x: id.clone(),
            })
            .await?;
        state.note_path_index.remove(&id);
        self.store.save(&state).await?;
        self.notifier.notify("Glowmark: note deleted from server");
        Ok(())
    }

    /// Vault event hook: a file was deleted. Managed files are queued
    /// for re-download so the next refresh restores them.
    pub async fn on_file_deleted(&self, path: &str) -> SyncResult<()> {
        let mut state = self.store.load().await?;
        if !path.starts_with(&format!("{}/", state.base_dir)) {
            return Ok(());
        }
        let Some(id) = state.remove_path(path) else {
            return Ok(());
        };
        let refresh = state.refresh_enabled;
        if refresh {
            state.queue_refresh(&id);
        }
        self.store.save(&state).await?;
        if refresh {
            match self.refresh_pending().await {
                Ok(_) => {}
                // A running sync will pick the queue up later.
                Err(SyncError::AlreadyInProgress) => {}
                Err(e) => tracing::warn!(error = %e, "refresh after delete failed"),
            }
        }
        Ok(())
    }

    /// Vault event hook: a file or folder was renamed. File renames move
    /// the index entry; folder renames remap every path beneath.
    pub async fn on_file_renamed(&self, old_path: &str, new_path: &str) -> SyncResult<()> {
        let mut state = self.store.load().await?;
        match state.note_id_for_path(old_path).map(str::to_string) {
            Some(id) => {
                if let Some(entry) = state.note_path_index.get_mut(&id) {
                    entry.path = new_path.to_string();
                }
            }
            None => {
                let moved = state.remap_folder(old_path, new_path);
                if moved == 0 {
                    return Ok(());
                }
                tracing::debug!(moved, old_path, new_path, "remapped folder rename");
            }
        }
        self.store.save(&state).await?;
        Ok(())
    }

    async fn run_sync(&self, auto: bool) -> SyncResult<()> {
        self.set_phase(SyncPhase::InitPending);
        let mut state = self.store.load().await?;
        self.push_token(&state);

        let folder_exists = matches!(
            self.vault.kind(&state.base_dir).await?,
            Some(VaultEntryKind::Folder)
        );
        if !folder_exists {
            // Everything the index knows is gone; start from scratch.
            state.reset_for_full_resync();
            self.store.save(&state).await?;
        }

        loop {
            let request = InitRequest {
                note_dir_deleted: !folder_exists,
                auto,
                last_cursor: state.last_cursor.clone(),
            };
            let response = self.transport.init(&request).await?;
            self.adopt_policy(&mut state, &response).await?;

            match TaskStatus::parse(&response.task_status) {
                TaskStatus::Synced => {
                    state.last_sync_failed = false;
                    self.store.save(&state).await?;
                    self.notifier.notify("Glowmark: already up to date");
                    return Ok(());
                }
                TaskStatus::Expired => return Err(SyncError::ServiceExpired),
                TaskStatus::Waiting => {
                    self.set_phase(SyncPhase::Waiting);
                    if response.notes_exported > 0 {
                        self.notifier.notify(&format!(
                            "Glowmark: preparing export ({} / {})",
                            response.notes_exported, response.total_notes
                        ));
                    } else {
                        self.notifier.notify("Glowmark: preparing export...");
                    }
                    sleep(self.config.poll_delay).await;
                    self.set_phase(SyncPhase::InitPending);
                }
                TaskStatus::Ready => break,
                TaskStatus::Unknown(raw) => return Err(SyncError::UnknownStatus(raw)),
            }
        }

        self.set_phase(SyncPhase::Downloading);
        self.notifier.notify("Glowmark: syncing data");
        // Local-edit reconciliation first, then the incremental pass.
        self.run_cursor_pass(&mut state, true).await?;
        self.run_cursor_pass(&mut state, false).await?;

        state.last_sync_failed = false;
        self.store.save(&state).await?;
        self.notifier.notify("Glowmark: sync completed");
        Ok(())
    }

    /// Adopts the freshest render policy and cursor from an init
    /// response, whatever status it carries.
    async fn adopt_policy(&self, state: &mut SyncState, response: &InitResponse) -> SyncResult<()> {
        state.export_config = Some(response.export_config.clone());
        if let Reconciled::Advanced(cursor) = reconcile(&response.last_cursor, &state.last_cursor) {
            state.last_cursor = cursor;
        }
        {
            let config = &response.export_config;
            let mut compiler = self.compiler.lock();
            if let Err(e) = compiler.ensure_compiled(
                &config.page_template,
                &config.title_template,
                self.templates.as_ref(),
            ) {
                // Entries hitting the broken template are deferred
                // per-entry later.
                tracing::warn!(error = %e, "template recompilation failed");
            }
        }
        self.store.save(state).await
    }

    /// One cursor-mode download cycle: pages until the cursor stops
    /// moving, then acknowledges it.
    async fn run_cursor_pass(&self, state: &mut SyncState, check_update: bool) -> SyncResult<()> {
        loop {
            let request = DownloadRequest::by_cursor(state.last_cursor.clone(), check_update);
            let response = self.transport.download(&request).await?;
            let batch = response.entries.len();
            tracing::debug!(batch, check_update, cursor = %state.last_cursor, "download page");
            self.materialize_batch(state, &response.entries, false).await?;

            match reconcile(&response.last_cursor, &state.last_cursor) {
                Reconciled::NoChange => {
                    if batch > 0 {
                        // The server repeated a position while still
                        // delivering entries. Stop rather than loop on
                        // the same page forever.
                        tracing::warn!(
                            batch,
                            cursor = %state.last_cursor,
                            "cursor did not advance for a non-empty batch; forcing completion"
                        );
                    }
                    break;
                }
                Reconciled::Advanced(cursor) => {
                    state.last_cursor = cursor;
                    self.store.save(state).await?;
                }
            }
            sleep(self.config.page_delay).await;
        }

        self.set_phase(SyncPhase::Acking);
        let request = AckRequest {
            last_cursor: state.last_cursor.clone(),
        };
        // Best-effort: local state is already authoritative.
        if let Err(e) = self.transport.ack(&request).await {
            self.notifier
                .notify_error(&format!("Glowmark: cursor acknowledgement failed: {e}"));
        }
        self.set_phase(SyncPhase::Downloading);
        Ok(())
    }

    /// One targeted download round for explicit note ids. Never touches
    /// the cursor and never acknowledges.
    async fn run_targeted(
        &self,
        state: &mut SyncState,
        ids: Vec<String>,
        overwrite: bool,
    ) -> SyncResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = DownloadRequest::by_ids(ids, overwrite);
        let response = self.transport.download(&request).await?;
        self.materialize_batch(state, &response.entries, overwrite).await
    }

    /// Materializes a batch strictly in order. Entry failures are
    /// isolated: the offending note is queued for refresh and the run
    /// continues.
    async fn materialize_batch(
        &self,
        state: &mut SyncState,
        entries: &[NoteEntry],
        force_overwrite: bool,
    ) -> SyncResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let config = state.export_config.clone().unwrap_or_default();
        let compiled = {
            let mut compiler = self.compiler.lock();
            compiler
                .ensure_compiled(
                    &config.page_template,
                    &config.title_template,
                    self.templates.as_ref(),
                )
                .map(|c| c.clone())
        };
        let compiled = match compiled {
            Ok(compiled) => compiled,
            Err(e) => {
                // The whole batch is blocked on the template; defer every
                // entry instead of failing the run.
                self.notifier
                    .notify_error(&format!("Glowmark: template error: {e}"));
                for entry in entries {
                    state.queue_refresh(&entry.note_id_x);
                }
                return self.store.save(state).await;
            }
        };

        let materializer = EntryMaterializer::new(self.vault.as_ref(), self.templates.as_ref());
        for entry in entries {
            match materializer
                .materialize(entry, &config, &compiled, state, force_overwrite)
                .await
            {
                Ok(path) => {
                    tracing::debug!(note = %entry.note_id_x, path = %path, "materialized");
                }
                Err(e) => {
                    state.queue_refresh(&entry.note_id_x);
                    // The templated path may not have been computed yet;
                    // fall back to the raw-title filename so the notice
                    // still points at a findable file.
                    let file = note_file_name(
                        &entry.title,
                        &entry.note_id_x,
                        config.truncate_title255,
                    );
                    self.notifier
                        .notify_error(&format!("Glowmark: error while writing \"{file}\": {e}"));
                    tracing::warn!(note = %entry.note_id_x, error = %e, "entry deferred");
                }
            }
            self.store.save(state).await?;
        }
        Ok(())
    }

    async fn handle_failure(&self, error: &SyncError) {
        self.notifier.notify_error(&format!("Glowmark: {error}"));
        let mut state = match self.store.load().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "could not load state to record failure");
                return;
            }
        };
        state.last_sync_failed = true;
        if error.invalidates_token() {
            tracing::info!("auth token invalidated by server; clearing");
            state.token.clear();
            self.transport.set_token(None);
        }
        if let Err(e) = self.store.save(&state).await {
            tracing::warn!(error = %e, "could not persist failure state");
        }
    }

    fn push_token(&self, state: &SyncState) {
        self.transport.set_token(if state.token.is_empty() {
            None
        } else {
            Some(state.token.clone())
        });
    }
}
