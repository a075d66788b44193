//! Debounced persistence of the live graph.
//!
//! The coordinator runs as a spawned task fed by the editor session.
//! Per editing session it guarantees:
//!
//! - **Change detection**: structurally identical snapshots never trigger
//!   a save; no-op edits are free.
//! - **Debounce**: rapid edits coalesce behind a configurable delay.
//! - **At most one save in flight**: edits arriving mid-save replace the
//!   pending snapshot and go out once, after the current save completes.
//! - **Close flush**: closing flushes a pending snapshot exactly once;
//!   when a save is already outstanding it carries the final state and
//!   the flush is skipped rather than firing a duplicate request.
//! - **Conflict handling**: a revision conflict discards pending edits,
//!   re-fetches the authoritative graph and surfaces it for reload; no
//!   three-way merge is attempted.

use crate::error::PersistError;
use crate::snapshot::GraphSnapshot;
use crate::store::{DraftRevision, GraphStore, PersistedWorkflow};
use flowcanvas_core::WorkflowId;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tuning for the autosave coordinator.
#[derive(Debug, Clone)]
pub struct AutosaveOptions {
    /// How long edits are batched before a save goes out.
    pub debounce: Duration,
    /// Upper bound on a single save request.
    pub save_timeout: Duration,
}

impl Default for AutosaveOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            save_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcomes surfaced to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum AutosaveEvent {
    /// The graph was persisted at the given revision.
    Saved { revision: DraftRevision },
    /// The server copy advanced; the authoritative workflow was
    /// re-fetched and local pending edits were discarded.
    Conflict(PersistedWorkflow),
    /// A save attempt failed; local edits are preserved for retry.
    Failed(PersistError),
}

enum Command {
    Edit(GraphSnapshot),
    Close(oneshot::Sender<()>),
}

/// Cheap handle for feeding the coordinator task.
#[derive(Debug, Clone)]
pub struct AutosaveHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl AutosaveHandle {
    /// Reports the current live state after a local mutation.
    pub fn record_edit(&self, snapshot: GraphSnapshot) {
        let _ = self.commands.send(Command::Edit(snapshot));
    }

    /// Closes the session, applying the close-flush contract, and waits
    /// for the coordinator to drain.
    pub async fn close(self) {
        let (done, drained) = oneshot::channel();
        if self.commands.send(Command::Close(done)).is_ok() {
            let _ = drained.await;
        }
    }
}

type SaveFuture = Pin<Box<dyn Future<Output = Result<DraftRevision, PersistError>> + Send>>;

enum LoopEvent {
    Command(Option<Command>),
    DebounceFired,
    SaveFinished(Result<DraftRevision, PersistError>),
}

/// The autosave coordinator task state.
pub struct AutosaveCoordinator<S> {
    workflow_id: WorkflowId,
    store: Arc<S>,
    options: AutosaveOptions,
    /// The state the server acknowledged last.
    last_acked: GraphSnapshot,
    /// The revision the client last read.
    revision: DraftRevision,
    /// The latest unsent state, if it differs from the server's.
    pending: Option<GraphSnapshot>,
    /// When the pending state goes out.
    deadline: Option<Instant>,
    /// The snapshot carried by the in-flight save, if any. Set before the
    /// request future is first polled and cleared in its completion arm,
    /// both on this task, so two saves can never both observe "not in
    /// flight".
    in_flight: Option<GraphSnapshot>,
    events: mpsc::UnboundedSender<AutosaveEvent>,
}

impl<S: GraphStore + 'static> AutosaveCoordinator<S> {
    /// Spawns the coordinator task for one editing session.
    ///
    /// `baseline` is the snapshot the session was opened from; `revision`
    /// is the draft revision it was read at.
    pub fn spawn(
        workflow_id: WorkflowId,
        store: Arc<S>,
        baseline: GraphSnapshot,
        revision: DraftRevision,
        options: AutosaveOptions,
    ) -> (AutosaveHandle, mpsc::UnboundedReceiver<AutosaveEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            workflow_id,
            store,
            options,
            last_acked: baseline,
            revision,
            pending: None,
            deadline: None,
            in_flight: None,
            events: event_tx,
        };
        tokio::spawn(coordinator.run(command_rx));
        (AutosaveHandle { commands: command_tx }, event_rx)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut save_task: Option<SaveFuture> = None;
        let mut shutting_down = false;
        let mut flushed = false;
        let mut close_ack: Option<oneshot::Sender<()>> = None;

        loop {
            if shutting_down && save_task.is_none() {
                match self.pending.take() {
                    Some(snapshot) if !flushed => {
                        flushed = true;
                        self.deadline = None;
                        save_task = Some(self.start_save(snapshot));
                    }
                    _ => break,
                }
            }

            let deadline = self.deadline;
            let event = tokio::select! {
                command = commands.recv(), if !shutting_down => LoopEvent::Command(command),
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() && save_task.is_none() =>
                {
                    LoopEvent::DebounceFired
                }
                result = async { save_task.as_mut().expect("save in flight").await },
                    if save_task.is_some() =>
                {
                    LoopEvent::SaveFinished(result)
                }
            };

            match event {
                LoopEvent::Command(Some(Command::Edit(snapshot))) => self.handle_edit(snapshot),
                LoopEvent::Command(Some(Command::Close(ack))) => {
                    shutting_down = true;
                    close_ack = Some(ack);
                    if save_task.is_some() {
                        // The outstanding save carries the final state;
                        // the close-time flush is skipped rather than
                        // firing a duplicate request.
                        self.pending = None;
                        self.deadline = None;
                        flushed = true;
                    }
                }
                LoopEvent::Command(None) => {
                    // Handle dropped without an explicit close.
                    shutting_down = true;
                    if save_task.is_some() {
                        self.pending = None;
                        self.deadline = None;
                        flushed = true;
                    }
                }
                LoopEvent::DebounceFired => {
                    self.deadline = None;
                    if let Some(snapshot) = self.pending.take() {
                        save_task = Some(self.start_save(snapshot));
                    }
                }
                LoopEvent::SaveFinished(result) => {
                    save_task = None;
                    if let Some(next) = self.handle_save_result(result).await {
                        save_task = Some(self.start_save(next));
                    }
                }
            }
        }

        if let Some(ack) = close_ack {
            let _ = ack.send(());
        }
    }

    fn handle_edit(&mut self, snapshot: GraphSnapshot) {
        // Compare against the state the server will hold once current
        // activity settles: the in-flight snapshot while saving, the last
        // acknowledged one otherwise.
        let baseline = self.in_flight.as_ref().unwrap_or(&self.last_acked);
        if snapshot == *baseline {
            self.pending = None;
            self.deadline = None;
            return;
        }
        if self.pending.as_ref() == Some(&snapshot) {
            return;
        }
        self.pending = Some(snapshot);
        if self.in_flight.is_none() {
            self.deadline = Some(Instant::now() + self.options.debounce);
            debug!(workflow_id = %self.workflow_id, "save scheduled");
        }
    }

    fn start_save(&mut self, snapshot: GraphSnapshot) -> SaveFuture {
        self.in_flight = Some(snapshot.clone());
        let store = Arc::clone(&self.store);
        let workflow_id = self.workflow_id;
        let last_read = self.revision;
        let timeout = self.options.save_timeout;
        debug!(%workflow_id, last_read = %last_read, "starting graph save");
        Box::pin(async move {
            match tokio::time::timeout(timeout, store.save_graph(workflow_id, &snapshot, last_read))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(PersistError::Timeout),
            }
        })
    }

    async fn handle_save_result(
        &mut self,
        result: Result<DraftRevision, PersistError>,
    ) -> Option<GraphSnapshot> {
        let sent = self
            .in_flight
            .take()
            .expect("save completed without an in-flight snapshot");
        match result {
            Ok(revision) => {
                self.revision = revision;
                self.last_acked = sent;
                info!(workflow_id = %self.workflow_id, revision = %revision, "graph saved");
                let _ = self.events.send(AutosaveEvent::Saved { revision });
                // Edits coalesced during the save go out immediately.
                match self.pending.take() {
                    Some(next) if next != self.last_acked => Some(next),
                    _ => None,
                }
            }
            Err(PersistError::Conflict { server_revision }) => {
                warn!(
                    workflow_id = %self.workflow_id,
                    server_revision = %server_revision,
                    "draft revision conflict; reloading server copy"
                );
                self.pending = None;
                self.deadline = None;
                match self.store.get_workflow(self.workflow_id).await {
                    Ok(workflow) => {
                        self.last_acked = workflow.graph.clone();
                        self.revision = workflow.draft_revision;
                        let _ = self.events.send(AutosaveEvent::Conflict(workflow));
                    }
                    Err(error) => {
                        warn!(workflow_id = %self.workflow_id, %error, "conflict reload failed");
                        let _ = self.events.send(AutosaveEvent::Failed(error));
                    }
                }
                None
            }
            Err(error) => {
                warn!(workflow_id = %self.workflow_id, %error, "graph save failed");
                // Keep the attempted state so a later edit or the close
                // flush retries it; no timer is armed — retry is never
                // silent.
                if self.pending.is_none() {
                    self.pending = Some(sent);
                }
                let _ = self.events.send(AutosaveEvent::Failed(error));
                None
            }
        }
    }
}
