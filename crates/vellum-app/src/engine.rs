//! Engine - orchestration state for the CLI runner and embedders
//!
//! The Engine owns the message channel, the observation store, the source
//! watcher, the shutdown signal, and settings. It processes messages
//! through the update function and broadcasts `EngineEvent`s describing
//! what changed.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, trace, warn};

use crate::config::Settings;
use crate::engine_event::EngineEvent;
use crate::message::Message;
use crate::process;
use crate::renderer::DocumentRenderer;
use crate::sink::LoadCompleteSink;
use crate::state::AppState;
use crate::status::{self, UserStatus, DRAFT_KEY, SAVED_KEY};
use crate::store::{KeyValueStore, MemoryStore};
use crate::watcher::{SourceWatcher, WatcherConfig};
use vellum_core::{DocumentSource, LoadPhase, WorkerEvent, WorkerMessage};
use vellum_render::{parse_worker_message, RequestTracker};

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone)]
struct StateSnapshot {
    phase: Option<LoadPhase>,
    load_complete_sent: bool,
    pages_done: u32,
    page_count: Option<u32>,
    saved_status: Option<UserStatus>,
}

impl StateSnapshot {
    fn capture(state: &AppState) -> Self {
        let doc = state.document.as_ref();
        Self {
            phase: doc.map(|d| d.phase),
            load_complete_sent: doc.map(|d| d.load_complete_sent).unwrap_or(false),
            pages_done: doc.map(|d| d.pages_done).unwrap_or(0),
            page_count: doc.and_then(|d| d.page_count),
            saved_status: state.status.saved.clone(),
        }
    }
}

/// Orchestration engine for Vellum.
///
/// Encapsulates the shared machinery between the CLI runner and embedders:
/// - State management
/// - Message channel
/// - Observation store with its message bridge
/// - Shutdown signaling
/// - Source watcher
/// - Settings
/// - Event broadcasting for external consumers
pub struct Engine<R>
where
    R: DocumentRenderer + Clone + Send + Sync + 'static,
{
    /// Application state (the model)
    pub state: AppState,

    /// Sender half of the unified message channel.
    /// Clone this to give to input sources (watcher, worker pump, timers).
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the unified message channel.
    /// The frontend event loop drains messages from here.
    pub msg_rx: mpsc::Receiver<Message>,

    /// Sender for the shutdown signal. Send `true` to initiate shutdown.
    pub shutdown_tx: watch::Sender<bool>,

    /// Receiver for the shutdown signal. Clone for background tasks.
    pub shutdown_rx: watch::Receiver<bool>,

    /// Watcher for the opened document. None until a local source is watched.
    source_watcher: Option<SourceWatcher>,

    /// Loaded settings (cached from config)
    pub settings: Settings,

    /// Render capability handed to action tasks
    renderer: R,

    /// Load-complete notification target
    sink: Arc<dyn LoadCompleteSink>,

    /// Observation store; actions write, the bridge mirrors changes back
    store: Arc<MemoryStore>,

    /// Directory for status persistence. None disables disk persistence.
    status_dir: Option<PathBuf>,

    /// Event broadcaster for external consumers.
    /// Subscribers receive EngineEvents after each message processing cycle.
    event_tx: broadcast::Sender<EngineEvent>,
}

impl<R> Engine<R>
where
    R: DocumentRenderer + Clone + Send + Sync + 'static,
{
    /// Create a new Engine.
    ///
    /// Performs the shared initialization:
    /// - Creates AppState
    /// - Creates message channel (capacity 256)
    /// - Creates shutdown signal channel
    /// - Creates the observation store and starts its message bridge,
    ///   seeding the saved status from disk
    /// - Creates the event broadcast channel
    pub fn new(
        renderer: R,
        sink: Arc<dyn LoadCompleteSink>,
        settings: Settings,
        status_dir: Option<PathBuf>,
    ) -> Self {
        // 1. Create state
        let state = AppState::new();

        // 2. Create message channel
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);

        // 3. Create shutdown channel
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // 4. Create the observation store
        let store = Arc::new(MemoryStore::new());

        // 5. Bridge store changes into messages, seeding saved status from disk
        Self::start_store_bridge(
            Arc::clone(&store),
            status_dir.clone(),
            msg_tx.clone(),
            shutdown_rx.clone(),
        );

        // 6. Create broadcast channel for engine events (capacity 256)
        let (event_tx, _) = broadcast::channel(256);

        Self {
            state,
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            source_watcher: None,
            settings,
            renderer,
            sink,
            store,
            status_dir,
            event_tx,
        }
    }

    /// Subscribe to engine events.
    ///
    /// Returns a receiver that gets EngineEvents after each message
    /// processing cycle. Multiple subscribers are supported.
    ///
    /// If the subscriber falls behind (buffer full), older events are
    /// dropped. Use `broadcast::error::RecvError::Lagged` to detect this.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Process a single message through the update cycle.
    ///
    /// Delegates to `process::process_message()` which runs handler::update()
    /// and dispatches any resulting UpdateActions. Emits EngineEvents based
    /// on state changes detected by comparing before/after snapshots.
    pub fn process_message(&mut self, msg: Message) {
        // Events that a snapshot diff cannot reconstruct are correlated
        // with the incoming message, before its effects apply.
        match &msg {
            Message::WorkerReady(ready) => self.emit(EngineEvent::WorkerReady {
                version: ready.version.clone(),
                pid: ready.pid,
            }),
            Message::WorkerExited { code } => {
                self.emit(EngineEvent::WorkerExited { code: *code })
            }
            Message::SourceChanged => self.emit(EngineEvent::SourceChanged),
            Message::WatcherError { message } => self.emit(EngineEvent::WatcherError {
                message: message.clone(),
            }),
            _ => {}
        }

        // Snapshot state before processing
        let pre = StateSnapshot::capture(&self.state);

        process::process_message(
            &mut self.state,
            msg,
            &self.msg_tx,
            &self.renderer,
            &self.sink,
            &self.store,
            self.status_dir.as_deref(),
        );

        // Snapshot state after processing
        let post = StateSnapshot::capture(&self.state);

        // Emit events for any state changes
        self.emit_events(&pre, &post);
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed. Events are emitted after
    /// each message is processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Get a clone of the shutdown receiver for background tasks.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Check if the application should quit.
    pub fn should_quit(&self) -> bool {
        self.state.should_quit
    }

    /// Get a reference to the observation store (for custom consumers).
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Start watching the opened document for external changes.
    ///
    /// Does nothing when the watcher is disabled in settings or the source
    /// is not a local file.
    pub fn start_source_watcher(&mut self, source: &DocumentSource) {
        if !self.settings.watcher.enabled {
            debug!("Source watcher disabled in settings");
            return;
        }

        let Some(path) = source.as_local_path() else {
            debug!("Source {} is not a local file, not watching", source);
            return;
        };

        let mut watcher = SourceWatcher::new(
            path,
            WatcherConfig::new().with_debounce_ms(self.settings.watcher.debounce_ms),
        );

        if let Err(e) = watcher.start(self.msg_tx.clone()) {
            warn!("Failed to start source watcher: {}", e);
            return;
        }

        self.source_watcher = Some(watcher);
    }

    /// Pump worker process events into messages.
    ///
    /// Responses are routed to the request tracker so in-flight render
    /// attempts resolve; ready and progress events become messages; exit
    /// cancels everything pending and ends the pump.
    pub fn start_worker_pump(
        &self,
        mut event_rx: mpsc::Receiver<WorkerEvent>,
        tracker: Arc<RequestTracker>,
    ) {
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match event {
                    WorkerEvent::Stdout(line) => match parse_worker_message(&line) {
                        Some(WorkerMessage::Response { id, result, error }) => {
                            let Some(id) = id.as_u64() else {
                                warn!("Response with non-numeric id: {}", id);
                                continue;
                            };
                            let tracker = Arc::clone(&tracker);
                            tokio::spawn(async move {
                                if !tracker.handle_response(id, result, error).await {
                                    debug!("Response for unknown request {}", id);
                                }
                            });
                        }
                        Some(WorkerMessage::Ready(ready)) => {
                            let _ = msg_tx.send(Message::WorkerReady(ready)).await;
                        }
                        Some(WorkerMessage::RenderProgress(progress)) => {
                            let _ = msg_tx.send(Message::RenderProgress(progress)).await;
                        }
                        Some(WorkerMessage::UnknownEvent { event, .. }) => {
                            debug!("Ignoring worker event: {}", event);
                        }
                        None => trace!("Non-protocol stdout line: {}", line),
                    },
                    WorkerEvent::Stderr(line) => {
                        debug!("worker stderr: {}", line);
                    }
                    WorkerEvent::Exited { code } => {
                        tracker.cancel_all().await;
                        let _ = msg_tx.send(Message::WorkerExited { code }).await;
                        break;
                    }
                }
            }
            debug!("Worker event pump finished");
        });
    }

    /// Initiate shutdown: stop the watcher, drop the session draft, signal
    /// background tasks.
    pub async fn shutdown(&mut self) {
        // Emit shutdown event
        self.emit(EngineEvent::Shutdown);

        // Stop the source watcher
        if let Some(ref mut watcher) = self.source_watcher {
            watcher.stop();
        }

        // The draft is session-scoped and does not survive the engine
        self.store.remove(DRAFT_KEY).await;

        // Signal all background tasks to stop
        let _ = self.shutdown_tx.send(true);
    }

    /// Emit EngineEvents based on state changes after processing.
    ///
    /// Compares pre/post snapshots to detect what changed.
    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        // Phase changes. The first transition of a fresh document has no
        // previous phase and is not emitted; the caller initiated it.
        if pre.phase != post.phase {
            if let (Some(old_phase), Some(new_phase)) = (pre.phase, post.phase) {
                self.emit(EngineEvent::PhaseChanged {
                    old_phase,
                    new_phase,
                    failure: self.state.document.as_ref().and_then(|d| d.failure.clone()),
                });
            }
        }

        // First successful load of the session
        if !pre.load_complete_sent && post.load_complete_sent {
            self.emit(EngineEvent::LoadCompleted);
        }

        // Render progress, only while the attempt is still in flight.
        // A settled phase also moves page counts, but that change rides
        // on the PhaseChanged event instead.
        if (post.pages_done != pre.pages_done || post.page_count != pre.page_count)
            && post.phase == Some(LoadPhase::Loading)
        {
            self.emit(EngineEvent::RenderProgress {
                pages_done: post.pages_done,
                page_count: post.page_count,
            });
        }

        // Saved status changes
        if pre.saved_status != post.saved_status {
            match &post.saved_status {
                Some(saved) => self.emit(EngineEvent::StatusSaved {
                    status: saved.clone(),
                }),
                None => self.emit(EngineEvent::StatusCleared),
            }
        }
    }

    /// Emit a single EngineEvent to all subscribers.
    ///
    /// send() returns Err only if there are no receivers -- that's fine,
    /// we don't want to panic or log errors for having no subscribers.
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Forward store change notifications as messages.
    ///
    /// Subscribes to the status keys, seeds the saved status from disk
    /// (after subscribing, so the seed itself is observed), then forwards
    /// every change until shutdown.
    fn start_store_bridge(
        store: Arc<MemoryStore>,
        status_dir: Option<PathBuf>,
        msg_tx: mpsc::Sender<Message>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        tokio::spawn(async move {
            let mut draft_rx = store.subscribe(DRAFT_KEY).await;
            let mut saved_rx = store.subscribe(SAVED_KEY).await;

            if let Some(dir) = status_dir {
                if let Some(saved) = status::load_status(&dir) {
                    match serde_json::to_value(&saved) {
                        Ok(value) => store.set(SAVED_KEY, value).await,
                        Err(e) => error!("Failed to serialize saved status: {}", e),
                    }
                }
            }

            loop {
                let change = tokio::select! {
                    res = shutdown_rx.changed() => {
                        if res.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    change = draft_rx.recv() => change,
                    change = saved_rx.recv() => change,
                };

                match change {
                    Ok(change) => {
                        let _ = msg_tx
                            .send(Message::StoreChanged {
                                key: change.key,
                                value: change.value,
                            })
                            .await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Store bridge missed {} change(s)", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            debug!("Store bridge finished");
        });
    }
}
