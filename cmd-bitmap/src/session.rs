//! Update session: debounce and supersession
//!
//! Hosts fire update requests on every edit, cursor move or editor switch.
//! The session collapses bursts into one render after a quiet window and
//! guarantees that only the most recent request ever reaches the display
//! surface.
//!
//! Every request takes a ticket from a monotonically increasing
//! generation counter. A result is committed only while its ticket is
//! still current; the checks run before extraction, after extraction,
//! after rendering, after command id resolution, after the sample fetch,
//! and right before each commit. The base grid is committed before the
//! sample fetch starts, so enrichment never delays it.

use crate::config::SessionConfig;
use crate::render::Renderer;
use crate::signals::{derive_command_id, extract};
use crate::types::{BitmapError, Result, SamplePayload};
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Cancellation handle of one update request
///
/// Reports cancelled as soon as a newer request has been made.
#[derive(Debug, Clone)]
pub struct CancelTicket {
    generation: Arc<AtomicU64>,
    ticket: u64,
}

impl CancelTicket {
    /// The request's sequence number
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.ticket
    }

    /// `Err(BitmapError::Cancelled)` once superseded
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BitmapError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Fetches example payloads for a derived command id
pub trait SampleFetcher: Send + Sync + 'static {
    /// Example payloads, or an empty list if none are known
    ///
    /// Implementations may return `BitmapError::Cancelled` early once
    /// `cancel` reports cancelled.
    fn fetch(
        &self,
        command_id: &str,
        cancel: &CancelTicket,
    ) -> impl Future<Output = Result<Vec<SamplePayload>>> + Send;
}

/// Fetcher that never has samples
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSamples;

impl SampleFetcher for NoSamples {
    async fn fetch(&self, _command_id: &str, _cancel: &CancelTicket) -> Result<Vec<SamplePayload>> {
        Ok(Vec::new())
    }
}

/// Metadata handed to the display surface with each commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayMeta {
    pub title: String,
    /// Derived command id, if the document has one
    pub header: Option<String>,
    /// Stable id of the display slot
    pub id: String,
}

/// Where committed markup goes
pub trait DisplaySurface: Send + Sync + 'static {
    fn show(&self, markup: &str, meta: &DisplayMeta);
}

impl<T: DisplaySurface> DisplaySurface for Arc<T> {
    fn show(&self, markup: &str, meta: &DisplayMeta) {
        (**self).show(markup, meta)
    }
}

/// A command to visualize
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTarget {
    pub document: Value,
    /// Display title; defaults to the derived command id
    pub title: Option<String>,
}

impl UpdateTarget {
    pub fn new(document: Value) -> Self {
        Self {
            document,
            title: None,
        }
    }

    /// Builder method: set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// How an update ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Base grid committed; no enrichment was available
    Committed,
    /// Base grid and sample enrichment committed
    Enriched,
    /// A newer request took over; nothing (more) was committed
    Superseded,
}

/// Explicit session state owned by the host integration
///
/// Cloning is cheap and shares the session.
pub struct UpdateSession<F, S> {
    shared: Arc<Shared<F, S>>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<F, S> Clone for UpdateSession<F, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            pending: Arc::clone(&self.pending),
        }
    }
}

struct Shared<F, S> {
    renderer: Renderer,
    fetcher: F,
    surface: S,
    config: SessionConfig,
    /// Latest issued ticket
    generation: Arc<AtomicU64>,
    /// Current live render target
    current: Mutex<Option<UpdateTarget>>,
    /// Serializes the check-then-show step of commits
    commit_lock: Mutex<()>,
}

impl<F: SampleFetcher, S: DisplaySurface> UpdateSession<F, S> {
    /// Create a new session
    pub fn new(renderer: Renderer, fetcher: F, surface: S, config: SessionConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                renderer,
                fetcher,
                surface,
                config,
                generation: Arc::new(AtomicU64::new(0)),
                current: Mutex::new(None),
                commit_lock: Mutex::new(()),
            }),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Schedule a debounced update
    ///
    /// Supersedes every earlier request immediately; the update itself
    /// runs once no newer request arrives within the debounce window.
    /// Must be called from within a tokio runtime.
    pub fn request(&self, target: UpdateTarget) {
        let cancel = self.shared.begin(target.clone());
        let delay = self.shared.config.debounce();
        let shared = Arc::clone(&self.shared);

        log::trace!("Update {} scheduled in {:?}", cancel.ticket(), delay);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.run_update(cancel, target).await;
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Run an update right away, superseding anything in flight
    pub async fn update_now(&self, target: UpdateTarget) -> UpdateOutcome {
        let cancel = self.shared.begin(target.clone());
        self.abort_pending();
        self.shared.run_update(cancel, target).await
    }

    /// Drop the current target and supersede everything in flight
    ///
    /// Waits for a commit that is already writing to the surface, so no
    /// superseded markup is shown once this returns.
    pub fn clear(&self) {
        let ticket = {
            let _guard = self.shared.commit_lock.lock();
            *self.shared.current.lock() = None;
            self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        self.abort_pending();
        log::debug!("Session cleared at generation {}", ticket);
    }

    pub fn current_target(&self) -> Option<UpdateTarget> {
        self.shared.current.lock().clone()
    }

    /// Latest issued ticket
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn surface(&self) -> &S {
        &self.shared.surface
    }

    fn abort_pending(&self) {
        let pending = self.pending.lock().take();
        if let Some(handle) = pending {
            handle.abort();
        }
    }
}

impl<F: SampleFetcher, S: DisplaySurface> Shared<F, S> {
    /// Make `target` current and issue its ticket
    fn begin(&self, target: UpdateTarget) -> CancelTicket {
        let _guard = self.commit_lock.lock();
        *self.current.lock() = Some(target);
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        CancelTicket {
            generation: Arc::clone(&self.generation),
            ticket,
        }
    }

    async fn run_update(&self, cancel: CancelTicket, target: UpdateTarget) -> UpdateOutcome {
        match self.try_update(&cancel, &target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::debug!("Update {} superseded: {}", cancel.ticket(), e);
                UpdateOutcome::Superseded
            }
        }
    }

    /// Fails only with `BitmapError::Cancelled`; render and fetch failures
    /// end in a committed placeholder or base grid.
    async fn try_update(
        &self,
        cancel: &CancelTicket,
        target: &UpdateTarget,
    ) -> Result<UpdateOutcome> {
        cancel.check()?;
        let document = &target.document;
        let signals = match extract(document) {
            Ok(signals) => signals,
            Err(e) => {
                let markup = self.renderer.fail(&e);
                self.commit(cancel, &markup, &display_meta(target, None))?;
                return Ok(UpdateOutcome::Committed);
            }
        };

        cancel.check()?;
        let markup = self.renderer.render(document, &signals);

        cancel.check()?;
        let command_id = derive_command_id(document);
        let meta = display_meta(target, command_id.as_deref());
        self.commit(cancel, &markup, &meta)?;

        let Some(command_id) = command_id else {
            return Ok(UpdateOutcome::Committed);
        };
        if signals.is_empty() {
            return Ok(UpdateOutcome::Committed);
        }

        cancel.check()?;
        let samples = match self.fetcher.fetch(&command_id, cancel).await {
            Ok(samples) => samples,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                log::warn!("Sample fetch for {} failed: {}", command_id, e);
                return Ok(UpdateOutcome::Committed);
            }
        };
        if samples.is_empty() {
            return Ok(UpdateOutcome::Committed);
        }

        cancel.check()?;
        let enriched = self.renderer.render_with_samples(document, &signals, &samples);
        self.commit(cancel, &enriched, &meta)?;
        Ok(UpdateOutcome::Enriched)
    }

    fn commit(&self, cancel: &CancelTicket, markup: &str, meta: &DisplayMeta) -> Result<()> {
        let _guard = self.commit_lock.lock();
        cancel.check()?;
        self.surface.show(markup, meta);
        log::debug!("Update {} committed to '{}'", cancel.ticket(), meta.id);
        Ok(())
    }
}

/// Slot id: the command id, else the title, else `"command"`
fn display_meta(target: &UpdateTarget, command_id: Option<&str>) -> DisplayMeta {
    let id = command_id
        .or(target.title.as_deref())
        .unwrap_or("command")
        .to_string();
    DisplayMeta {
        title: target.title.clone().unwrap_or_else(|| id.clone()),
        header: command_id.map(str::to_string),
        id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[derive(Default)]
    struct RecordingSurface {
        shown: Mutex<Vec<(String, DisplayMeta)>>,
    }

    impl RecordingSurface {
        fn shown(&self) -> Vec<(String, DisplayMeta)> {
            self.shown.lock().clone()
        }
    }

    impl DisplaySurface for RecordingSurface {
        fn show(&self, markup: &str, meta: &DisplayMeta) {
            self.shown.lock().push((markup.to_string(), meta.clone()));
        }
    }

    /// Holds fetches for `7E0.*` until the gate opens; answers others at once
    struct GatedFetcher {
        gate: Arc<Notify>,
        started: mpsc::UnboundedSender<String>,
    }

    impl SampleFetcher for GatedFetcher {
        async fn fetch(
            &self,
            command_id: &str,
            _cancel: &CancelTicket,
        ) -> Result<Vec<SamplePayload>> {
            let _ = self.started.send(command_id.to_string());
            if command_id.starts_with("7E0") {
                self.gate.notified().await;
                return Ok(vec![SamplePayload::new(vec![0xAA])]);
            }
            Ok(vec![SamplePayload::new(vec![0xBB])])
        }
    }

    struct FailingFetcher;

    impl SampleFetcher for FailingFetcher {
        async fn fetch(
            &self,
            _command_id: &str,
            _cancel: &CancelTicket,
        ) -> Result<Vec<SamplePayload>> {
            Err(BitmapError::Fetch("connection refused".into()))
        }
    }

    fn target(hdr: &str, name: &str) -> UpdateTarget {
        UpdateTarget::new(json!({
            "hdr": hdr,
            "cmd": {"22": "1111"},
            "signals": [{"id": "s1", "name": name, "fmt": {"bix": 0, "len": 8}}]
        }))
    }

    #[tokio::test]
    async fn test_update_commits_base_then_enrichment() {
        init_logging();
        let surface = Arc::new(RecordingSurface::default());
        let (started, _started_rx) = mpsc::unbounded_channel();
        let fetcher = GatedFetcher {
            gate: Arc::new(Notify::new()),
            started,
        };
        let session = UpdateSession::new(
            Renderer::default(),
            fetcher,
            surface.clone(),
            SessionConfig::new(),
        );

        let outcome = session.update_now(target("7E1", "Speed")).await;
        assert_eq!(outcome, UpdateOutcome::Enriched);

        let shown = surface.shown();
        assert_eq!(shown.len(), 2);
        assert!(!shown[0].0.contains("Sample responses"));
        assert!(shown[1].0.contains(">BB</code>"));
        assert_eq!(shown[1].1.id, "7E1.221111");
        assert_eq!(shown[1].1.header.as_deref(), Some("7E1.221111"));
    }

    #[tokio::test]
    async fn test_stale_enrichment_never_reaches_the_surface() {
        init_logging();
        let surface = Arc::new(RecordingSurface::default());
        let gate = Arc::new(Notify::new());
        let (started, mut started_rx) = mpsc::unbounded_channel();
        let fetcher = GatedFetcher {
            gate: Arc::clone(&gate),
            started,
        };
        let session = UpdateSession::new(
            Renderer::default(),
            fetcher,
            surface.clone(),
            SessionConfig::new(),
        );

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.update_now(target("7E0", "Stale")).await }
        });
        assert_eq!(started_rx.recv().await.as_deref(), Some("7E0.221111"));

        let second = session.update_now(target("7E1", "Fresh")).await;
        assert_eq!(second, UpdateOutcome::Enriched);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), UpdateOutcome::Superseded);

        let shown = surface.shown();
        let (last, meta) = shown.last().unwrap();
        assert!(last.contains("Fresh"));
        assert!(last.contains(">BB</code>"));
        assert_eq!(meta.id, "7E1.221111");
        assert!(shown.iter().all(|(markup, _)| !markup.contains(">AA</code>")));
    }

    #[tokio::test]
    async fn test_debounce_collapses_bursts() {
        init_logging();
        let surface = Arc::new(RecordingSurface::default());
        let session = UpdateSession::new(
            Renderer::default(),
            NoSamples,
            surface.clone(),
            SessionConfig::new().with_debounce_ms(20),
        );

        session.request(target("7E0", "First"));
        session.request(target("7E1", "Second"));
        session.request(target("7E2", "Third"));
        assert_eq!(session.generation(), 3);

        tokio::time::sleep(Duration::from_millis(300)).await;

        let shown = surface.shown();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].0.contains("Third"));
        assert_eq!(
            session.current_target().and_then(|t| t.document["hdr"].as_str().map(str::to_string)),
            Some("7E2".to_string())
        );
    }

    #[tokio::test]
    async fn test_clear_drops_pending_request() {
        init_logging();
        let surface = Arc::new(RecordingSurface::default());
        let session = UpdateSession::new(
            Renderer::default(),
            NoSamples,
            surface.clone(),
            SessionConfig::new().with_debounce_ms(20),
        );

        session.request(target("7E0", "Gone"));
        session.clear();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(surface.shown().is_empty());
        assert!(session.current_target().is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_base_output() {
        init_logging();
        let surface = Arc::new(RecordingSurface::default());
        let session = UpdateSession::new(
            Renderer::default(),
            FailingFetcher,
            surface.clone(),
            SessionConfig::new(),
        );

        let outcome = session.update_now(target("7E0", "Speed")).await;
        assert_eq!(outcome, UpdateOutcome::Committed);

        let shown = surface.shown();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].0.contains("Speed"));
    }

    #[tokio::test]
    async fn test_invalid_document_shows_error_placeholder() {
        init_logging();
        let surface = Arc::new(RecordingSurface::default());
        let session = UpdateSession::new(
            Renderer::default(),
            NoSamples,
            surface.clone(),
            SessionConfig::new(),
        );

        let outcome = session
            .update_now(UpdateTarget::new(json!("oops")).with_title("Broken"))
            .await;
        assert_eq!(outcome, UpdateOutcome::Committed);

        let shown = surface.shown();
        assert!(shown[0].0.contains("bitmap-error"));
        assert_eq!(shown[0].1.title, "Broken");
        assert_eq!(shown[0].1.id, "Broken");
        assert_eq!(shown[0].1.header, None);
    }

    /// Blocks inside `show` until released, then records whether the
    /// session had been cleared by the time the markup was written
    struct HeldSurface {
        entered: Mutex<std::sync::mpsc::Sender<()>>,
        release: Mutex<std::sync::mpsc::Receiver<()>>,
        cleared: Arc<AtomicBool>,
        writes: Mutex<Vec<bool>>,
    }

    impl DisplaySurface for HeldSurface {
        fn show(&self, _markup: &str, _meta: &DisplayMeta) {
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv();
            self.writes.lock().push(self.cleared.load(Ordering::SeqCst));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clear_waits_for_commit_in_progress() {
        init_logging();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let cleared = Arc::new(AtomicBool::new(false));
        let surface = Arc::new(HeldSurface {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            cleared: Arc::clone(&cleared),
            writes: Mutex::new(Vec::new()),
        });
        let session = UpdateSession::new(
            Renderer::default(),
            NoSamples,
            surface.clone(),
            SessionConfig::new(),
        );

        let update = tokio::spawn({
            let session = session.clone();
            async move { session.update_now(target("7E0", "Speed")).await }
        });
        entered_rx.recv().unwrap();

        let clearing = std::thread::spawn({
            let session = session.clone();
            let cleared = Arc::clone(&cleared);
            move || {
                session.clear();
                cleared.store(true, Ordering::SeqCst);
            }
        });
        std::thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
        clearing.join().unwrap();

        // Base grid went out before the clear; enrichment is dropped
        assert_eq!(update.await.unwrap(), UpdateOutcome::Superseded);
        assert_eq!(*surface.writes.lock(), vec![false]);
        assert!(session.current_target().is_none());
    }

    #[test]
    fn test_cancel_ticket() {
        let generation = Arc::new(AtomicU64::new(4));
        let ticket = CancelTicket {
            generation: Arc::clone(&generation),
            ticket: 4,
        };
        assert!(ticket.check().is_ok());

        generation.fetch_add(1, Ordering::SeqCst);
        assert!(ticket.is_cancelled());
        assert!(matches!(ticket.check(), Err(BitmapError::Cancelled)));
    }
}
