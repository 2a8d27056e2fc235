//! End-to-end engine runs against scripted transports and an in-memory
//! vault.

use glowmark_engine::{
    EngineConfig, MemoryNotifier, MemoryStateStore, MockTransport, SyncEngine, SyncError,
    SyncPhase, SyncState,
};
use glowmark_protocol::{
    DownloadResponse, ExportConfig, Highlight, InitResponse, NoteEntry, ProtocolError, SyncCursor,
};
use glowmark_template::{RenderContext, TemplateEngine, TemplateError, TemplateResult};
use glowmark_vault::{MemoryVault, VaultStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A substitution-only template engine: `{{key}}` placeholders over the
/// flat context keys, highlights rendered as a bullet list.
#[derive(Default)]
struct StubEngine {
    sources: Mutex<HashMap<String, String>>,
    /// Rendering fails for entries with this title.
    poison_title: Option<String>,
}

impl StubEngine {
    fn poisoned(title: &str) -> Self {
        Self {
            poison_title: Some(title.to_string()),
            ..Default::default()
        }
    }
}

impl TemplateEngine for StubEngine {
    fn compile(&self, id: &str, source: &str) -> TemplateResult<()> {
        self.sources.lock().insert(id.to_string(), source.to_string());
        Ok(())
    }

    fn render(&self, id: &str, ctx: &RenderContext) -> TemplateResult<String> {
        if self.poison_title.as_deref() == Some(ctx.title.as_str()) {
            return Err(TemplateError::Render("poisoned".into()));
        }
        let source = self
            .sources
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| TemplateError::UnknownTemplate(id.to_string()))?;
        let highlights = ctx
            .highlights
            .iter()
            .map(|h| format!("- {}", h.note))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(source
            .replace("{{title}}", &ctx.title)
            .replace("{{pagenote}}", &ctx.pagenote)
            .replace("{{highlights}}", &highlights)
            .replace("{{mdcontent}}", &ctx.mdcontent))
    }

    fn has_template(&self, id: &str) -> bool {
        self.sources.lock().contains_key(id)
    }
}

const PAGE_TEMPLATE: &str = "# {{title}}\n\n{% block pagenote %}{{pagenote}}{% endblock %}\n\n{% block highlights %}{{highlights}}{% endblock %}\n";

fn export_config(write_style: i32) -> ExportConfig {
    ExportConfig {
        write_style: write_style.into(),
        title_template: "{{title}}".to_string(),
        page_template: PAGE_TEMPLATE.to_string(),
        ..Default::default()
    }
}

fn init_response(status: &str, cursor: &str) -> InitResponse {
    InitResponse {
        task_status: status.to_string(),
        last_cursor: SyncCursor::new(cursor),
        export_config: export_config(2),
        ..Default::default()
    }
}

fn entry(id: &str, title: &str, notes: &[&str]) -> NoteEntry {
    NoteEntry {
        title: title.to_string(),
        note_id_x: id.to_string(),
        update_at: 1700000000,
        highlights: notes
            .iter()
            .map(|n| Highlight {
                note: n.to_string(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn page(entries: Vec<NoteEntry>, cursor: &str) -> DownloadResponse {
    DownloadResponse {
        entries,
        last_cursor: SyncCursor::new(cursor),
    }
}

struct Harness {
    engine: Arc<SyncEngine<MockTransport>>,
    transport: Arc<MockTransport>,
    vault: Arc<MemoryVault>,
    store: Arc<MemoryStateStore>,
    notifier: Arc<MemoryNotifier>,
}

async fn harness_with(state: SyncState, templates: StubEngine) -> Harness {
    let transport = Arc::new(MockTransport::new());
    let vault = Arc::new(MemoryVault::new());
    vault.create_folder(&state.base_dir).await.unwrap();
    let store = Arc::new(MemoryStateStore::with_state(state));
    let notifier = Arc::new(MemoryNotifier::new());
    let engine = Arc::new(SyncEngine::new(
        EngineConfig::default()
            .with_poll_delay(Duration::ZERO)
            .with_page_delay(Duration::ZERO),
        transport.clone(),
        vault.clone(),
        Arc::new(templates),
        store.clone(),
        notifier.clone(),
    ));
    Harness {
        engine,
        transport,
        vault,
        store,
        notifier,
    }
}

async fn harness() -> Harness {
    let state = SyncState {
        token: "tok".to_string(),
        ..Default::default()
    };
    harness_with(state, StubEngine::default()).await
}

#[tokio::test]
async fn synced_status_adopts_cursor_without_downloading() {
    let h = harness().await;
    h.transport.push_init(Ok(init_response("SYNCED", "abc")));

    h.engine.start_sync(false).await.unwrap();

    assert!(h.transport.download_requests().is_empty());
    let state = h.store.snapshot();
    assert_eq!(state.last_cursor.as_str(), "abc");
    assert!(state.export_config.is_some());
    assert!(!state.last_sync_failed);
    assert!(h
        .notifier
        .messages()
        .iter()
        .any(|m| m.contains("up to date")));
}

#[tokio::test]
async fn waiting_statuses_poll_until_ready() {
    let h = harness().await;
    h.transport.push_init(Ok(init_response("PENDING", "")));
    h.transport.push_init(Ok(init_response("RECEIVED", "")));
    h.transport.push_init(Ok(init_response("SYNCING", "c1")));
    // Both passes find nothing.
    h.transport.push_download(Ok(page(vec![], "c1")));
    h.transport.push_download(Ok(page(vec![], "c1")));

    h.engine.start_sync(true).await.unwrap();

    assert_eq!(h.transport.init_requests().len(), 3);
    assert_eq!(h.transport.download_requests().len(), 2);
    assert!(h.transport.init_requests().iter().all(|r| r.auto));
    assert!(h
        .notifier
        .messages()
        .iter()
        .any(|m| m.contains("sync completed")));
}

#[tokio::test]
async fn expired_status_is_terminal_but_still_adopts_policy() {
    let h = harness().await;
    h.transport.push_init(Ok(init_response("EXPIRED", "c1")));

    let err = h.engine.start_sync(false).await.unwrap_err();
    assert!(matches!(err, SyncError::ServiceExpired));
    assert_eq!(h.engine.phase(), SyncPhase::Failed);
    assert!(h.transport.download_requests().is_empty());

    let state = h.store.snapshot();
    assert!(state.last_sync_failed);
    // Render policy and cursor are adopted from every init response,
    // failing ones included.
    assert_eq!(state.export_config, Some(export_config(2)));
    assert_eq!(state.last_cursor.as_str(), "c1");
    // An expired export task is not an auth failure; the token stays.
    assert_eq!(state.token, "tok");
}

#[tokio::test]
async fn unrecognized_status_surfaces_raw_value() {
    let h = harness().await;
    h.transport.push_init(Ok(init_response("THROTTLED", "")));

    let err = h.engine.start_sync(false).await.unwrap_err();
    assert!(err.to_string().contains("THROTTLED"));
    assert!(matches!(err, SyncError::UnknownStatus(_)));
    assert_eq!(h.engine.phase(), SyncPhase::Failed);
    assert!(h.store.snapshot().export_config.is_some());
}

#[tokio::test]
async fn waiting_notice_shows_progress_only_once_exporting_starts() {
    let h = harness().await;
    let first = InitResponse {
        total_notes: 40,
        notes_exported: 0,
        ..init_response("PENDING", "")
    };
    let second = InitResponse {
        total_notes: 40,
        notes_exported: 12,
        ..init_response("STARTED", "")
    };
    h.transport.push_init(Ok(first));
    h.transport.push_init(Ok(second));
    h.transport.push_init(Ok(init_response("SYNCING", "c1")));
    h.transport.push_download(Ok(page(vec![], "c1")));
    h.transport.push_download(Ok(page(vec![], "c1")));

    h.engine.start_sync(true).await.unwrap();

    let messages = h.notifier.messages();
    // Known totals with nothing exported yet stay generic.
    assert!(messages.iter().any(|m| m.ends_with("preparing export...")));
    assert!(messages.iter().any(|m| m.contains("(12 / 40)")));
}

#[tokio::test]
async fn pages_advance_cursor_then_ack() {
    let h = harness().await;
    h.transport.push_init(Ok(init_response("SYNCING", "c1")));
    // Check-update pass: one page, then the empty terminator.
    h.transport
        .push_download(Ok(page(vec![entry("n1", "A Page", &["first"])], "c2")));
    h.transport.push_download(Ok(page(vec![], "c2")));
    // Incremental pass: nothing new.
    h.transport.push_download(Ok(page(vec![], "c2")));

    h.engine.start_sync(false).await.unwrap();

    let downloads = h.transport.download_requests();
    assert_eq!(downloads.len(), 3);
    assert!(downloads[0].check_update);
    assert_eq!(downloads[1].last_cursor.as_str(), "c2");
    assert!(!downloads[2].check_update);

    // One ack per completed pass, both carrying the final cursor.
    let acks = h.transport.ack_requests();
    assert_eq!(acks.len(), 2);
    assert!(acks.iter().all(|a| a.last_cursor.as_str() == "c2"));

    let state = h.store.snapshot();
    assert_eq!(state.last_cursor.as_str(), "c2");
    assert_eq!(state.path_for("n1"), Some("Glowmark/A Page-n1.md"));
    let content = h.vault.content_of("Glowmark/A Page-n1.md").unwrap();
    assert!(content.contains("# A Page"));
    assert!(content.contains("- first"));
    assert_eq!(h.engine.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn stalled_cursor_with_entries_forces_completion() {
    let h = harness().await;
    h.transport.push_init(Ok(init_response("SYNCING", "c1")));
    // The server keeps returning the same cursor alongside entries.
    h.transport
        .push_download(Ok(page(vec![entry("n1", "Stuck", &["x"])], "c1")));
    h.transport.push_download(Ok(page(vec![], "c1")));

    h.engine.start_sync(false).await.unwrap();

    // Each pass issued exactly one request; no infinite loop.
    assert_eq!(h.transport.download_requests().len(), 2);
    // The entry was still materialized before completion was forced.
    assert!(h.vault.content_of("Glowmark/Stuck-n1.md").is_some());
}

#[tokio::test]
async fn second_sync_is_rejected_while_one_runs() {
    use async_trait::async_trait;
    use glowmark_engine::{SyncResult, SyncTransport};
    use glowmark_protocol::{
        AckRequest, AckResponse, ArchiveRequest, DeleteRequest, DownloadRequest, InitRequest,
    };

    /// Delays init long enough for the second call to overlap.
    struct SlowTransport(MockTransport);

    #[async_trait]
    impl SyncTransport for SlowTransport {
        async fn init(&self, request: &InitRequest) -> SyncResult<InitResponse> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.0.init(request).await
        }
        async fn download(&self, request: &DownloadRequest) -> SyncResult<DownloadResponse> {
            self.0.download(request).await
        }
        async fn ack(&self, request: &AckRequest) -> SyncResult<AckResponse> {
            self.0.ack(request).await
        }
        async fn archive(&self, request: &ArchiveRequest) -> SyncResult<()> {
            self.0.archive(request).await
        }
        async fn delete(&self, request: &DeleteRequest) -> SyncResult<()> {
            self.0.delete(request).await
        }
        fn set_token(&self, token: Option<String>) {
            self.0.set_token(token);
        }
    }

    let inner = MockTransport::new();
    inner.push_init(Ok(init_response("SYNCED", "abc")));
    let transport = Arc::new(SlowTransport(inner));
    let vault = Arc::new(MemoryVault::new());
    vault.create_folder("Glowmark").await.unwrap();
    let notifier = Arc::new(MemoryNotifier::new());
    let engine = Arc::new(SyncEngine::new(
        EngineConfig::default().with_poll_delay(Duration::ZERO),
        transport,
        vault,
        Arc::new(StubEngine::default()),
        Arc::new(MemoryStateStore::with_state(SyncState {
            token: "tok".into(),
            ..Default::default()
        })),
        notifier.clone(),
    ));

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.start_sync(false).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = engine.start_sync(false).await;
    assert!(matches!(second, Err(SyncError::AlreadyInProgress)));
    assert!(notifier
        .messages()
        .iter()
        .any(|m| m.contains("already in progress")));

    first.await.unwrap().unwrap();
}

#[tokio::test]
async fn auth_error_clears_token() {
    let h = harness().await;
    h.transport.push_init(Err(SyncError::Protocol(ProtocolError::Api {
        code: 10000,
        message: "invalid token".into(),
    })));

    let err = h.engine.start_sync(false).await.unwrap_err();
    assert!(err.invalidates_token());

    let state = h.store.snapshot();
    assert!(state.token.is_empty());
    assert!(state.last_sync_failed);
    assert_eq!(h.transport.token(), None);
    assert_eq!(h.engine.phase(), SyncPhase::Failed);
}

#[tokio::test]
async fn entry_failure_is_isolated_and_queued() {
    let state = SyncState {
        token: "tok".into(),
        ..Default::default()
    };
    let h = harness_with(state, StubEngine::poisoned("Bad Apple")).await;
    h.transport.push_init(Ok(init_response("SYNCING", "c1")));
    h.transport.push_download(Ok(page(
        vec![
            entry("n1", "Fine", &["a"]),
            entry("n2", "Bad Apple", &["b"]),
            entry("n3", "Also Fine", &["c"]),
        ],
        "c2",
    )));
    h.transport.push_download(Ok(page(vec![], "c2")));
    h.transport.push_download(Ok(page(vec![], "c2")));

    h.engine.start_sync(false).await.unwrap();

    let state = h.store.snapshot();
    assert!(h.vault.content_of("Glowmark/Fine-n1.md").is_some());
    assert!(h.vault.content_of("Glowmark/Also Fine-n3.md").is_some());
    assert_eq!(state.pending_refresh, vec!["n2"]);
    // The notice names the file the user would look for.
    assert!(h
        .notifier
        .notices()
        .iter()
        .any(|n| n.is_error && n.message.contains("Bad Apple-n2.md")));
}

#[tokio::test]
async fn merge_preserves_manual_edits_between_runs() {
    let h = harness().await;

    // First run creates the file.
    h.transport.push_init(Ok(init_response("SYNCING", "c1")));
    h.transport
        .push_download(Ok(page(vec![entry("n1", "A Page", &["first"])], "c2")));
    h.transport.push_download(Ok(page(vec![], "c2")));
    h.transport.push_download(Ok(page(vec![], "c2")));
    h.engine.start_sync(false).await.unwrap();

    // The user edits outside the marked regions.
    let path = "Glowmark/A Page-n1.md";
    let content = h.vault.content_of(path).unwrap();
    h.vault
        .modify(path, &format!("{content}\nMy own thoughts\n"))
        .await
        .unwrap();

    // Second run merges an updated highlight list.
    h.transport.push_init(Ok(init_response("SYNCING", "c2")));
    h.transport.push_download(Ok(page(
        vec![entry("n1", "A Page", &["first", "second"])],
        "c3",
    )));
    h.transport.push_download(Ok(page(vec![], "c3")));
    h.transport.push_download(Ok(page(vec![], "c3")));
    h.engine.start_sync(false).await.unwrap();

    let merged = h.vault.content_of(path).unwrap();
    assert!(merged.contains("My own thoughts"));
    assert!(merged.contains("- second"));
    // Merging twice with the same content changes nothing.
    let again = glowmark_template::replace_or_append(&merged, "highlights", "- first\n- second");
    assert_eq!(again, merged);
}

#[tokio::test]
async fn missing_folder_triggers_full_resync() {
    // Vault without the sync folder, but a cursor from previous runs.
    let transport = Arc::new(MockTransport::new());
    transport.push_init(Ok(init_response("SYNCED", "fresh")));
    let mut state = SyncState {
        token: "tok".into(),
        last_cursor: SyncCursor::new("c9"),
        ..Default::default()
    };
    state.record_path("n1", "Glowmark/Old-n1.md", 1);
    let store = Arc::new(MemoryStateStore::with_state(state));
    let engine = SyncEngine::new(
        EngineConfig::default().with_poll_delay(Duration::ZERO),
        transport.clone(),
        Arc::new(MemoryVault::new()),
        Arc::new(StubEngine::default()),
        store.clone(),
        Arc::new(MemoryNotifier::new()),
    );

    engine.start_sync(false).await.unwrap();

    let init = &transport.init_requests()[0];
    assert!(init.note_dir_deleted);
    assert!(init.last_cursor.is_empty());
    let state = store.snapshot();
    assert!(state.note_path_index.is_empty());
    assert_eq!(state.data_version, 1);
}

#[tokio::test]
async fn deleted_file_is_refreshed_by_targeted_download() {
    let mut seeded = SyncState {
        token: "tok".into(),
        export_config: Some(export_config(1)),
        ..Default::default()
    };
    seeded.record_path("n1", "Glowmark/A Page-n1.md", 1);
    let h = harness_with(seeded, StubEngine::default()).await;
    h.transport
        .push_download(Ok(page(vec![entry("n1", "A Page", &["first"])], "")));

    h.engine.on_file_deleted("Glowmark/A Page-n1.md").await.unwrap();

    let downloads = h.transport.download_requests();
    assert_eq!(downloads.len(), 1);
    assert!(downloads[0].is_targeted());
    assert_eq!(downloads[0].note_ids, vec!["n1"]);
    // The file came back and the queue is clear.
    assert!(h.vault.content_of("Glowmark/A Page-n1.md").is_some());
    assert!(h.store.snapshot().pending_refresh.is_empty());
}

#[tokio::test]
async fn deletes_outside_sync_folder_are_ignored() {
    let mut seeded = SyncState {
        token: "tok".into(),
        ..Default::default()
    };
    seeded.record_path("n1", "Glowmark/A-n1.md", 1);
    let h = harness_with(seeded, StubEngine::default()).await;

    h.engine.on_file_deleted("Journal/today.md").await.unwrap();

    assert!(h.transport.download_requests().is_empty());
    assert_eq!(h.store.snapshot().note_path_index.len(), 1);
}

#[tokio::test]
async fn reimport_downloads_by_id_with_overwrite() {
    let mut seeded = SyncState {
        token: "tok".into(),
        export_config: Some(export_config(2)),
        ..Default::default()
    };
    seeded.record_path("n1", "Glowmark/A Page-n1.md", 1);
    let h = harness_with(seeded, StubEngine::default()).await;
    h.transport
        .push_download(Ok(page(vec![entry("n1", "A Page", &["first"])], "")));

    h.engine
        .reimport_file("Glowmark/A Page-n1.md", true)
        .await
        .unwrap();

    let downloads = h.transport.download_requests();
    assert_eq!(downloads[0].note_ids, vec!["n1"]);
    assert!(downloads[0].overwrite);
    // Overwrite forces a full-page render even under merge style.
    let content = h.vault.content_of("Glowmark/A Page-n1.md").unwrap();
    assert!(content.starts_with("# A Page"));
}

#[tokio::test]
async fn reimport_of_unknown_file_fails_with_notice() {
    let h = harness().await;
    let err = h.engine.reimport_file("Glowmark/stray.md", false).await;
    assert!(matches!(err, Err(SyncError::UnknownPath(_))));
    assert!(h.notifier.notices().iter().any(|n| n.is_error));
    assert!(h.transport.download_requests().is_empty());
}

#[tokio::test]
async fn rename_updates_index_for_files_and_folders() {
    let mut seeded = SyncState {
        token: "tok".into(),
        ..Default::default()
    };
    seeded.record_path("n1", "Glowmark/A-n1.md", 1);
    seeded.record_path("n2", "Glowmark/deep/B-n2.md", 1);
    let h = harness_with(seeded, StubEngine::default()).await;

    h.engine
        .on_file_renamed("Glowmark/A-n1.md", "Glowmark/renamed-n1.md")
        .await
        .unwrap();
    h.engine
        .on_file_renamed("Glowmark/deep", "Glowmark/deeper")
        .await
        .unwrap();

    let state = h.store.snapshot();
    assert_eq!(state.path_for("n1"), Some("Glowmark/renamed-n1.md"));
    assert_eq!(state.path_for("n2"), Some("Glowmark/deeper/B-n2.md"));
}

#[tokio::test]
async fn server_delete_forgets_the_note() {
    let mut seeded = SyncState {
        token: "tok".into(),
        ..Default::default()
    };
    seeded.record_path("n1", "Glowmark/A-n1.md", 1);
    let h = harness_with(seeded, StubEngine::default()).await;

    h.engine
        .delete_path_from_server("Glowmark/A-n1.md")
        .await
        .unwrap();

    assert_eq!(h.transport.delete_requests()[0].note_id_x, "n1");
    assert!(h.store.snapshot().note_path_index.is_empty());
}

#[tokio::test]
async fn renamed_entry_moves_its_file() {
    let h = harness().await;

    // First run materializes under the original title.
    h.transport.push_init(Ok(init_response("SYNCING", "c1")));
    h.transport
        .push_download(Ok(page(vec![entry("n1", "Old Title", &["a"])], "c2")));
    h.transport.push_download(Ok(page(vec![], "c2")));
    h.transport.push_download(Ok(page(vec![], "c2")));
    h.engine.start_sync(false).await.unwrap();
    assert!(h.vault.content_of("Glowmark/Old Title-n1.md").is_some());

    // The server renamed the note; its file follows.
    h.transport.push_init(Ok(init_response("SYNCING", "c2")));
    h.transport
        .push_download(Ok(page(vec![entry("n1", "New Title", &["a"])], "c3")));
    h.transport.push_download(Ok(page(vec![], "c3")));
    h.transport.push_download(Ok(page(vec![], "c3")));
    h.engine.start_sync(false).await.unwrap();

    assert!(h.vault.content_of("Glowmark/Old Title-n1.md").is_none());
    assert!(h.vault.content_of("Glowmark/New Title-n1.md").is_some());
    assert_eq!(
        h.store.snapshot().path_for("n1"),
        Some("Glowmark/New Title-n1.md")
    );
}
