use crate::activity::{ActivityLog, LogEntry, LogLevel};
use crate::catalog::{UploadError, UploadOutcome, Uploader};
use crate::import::{self, SchemaError};
use crate::models::{ProductDraft, QueuedItem};
use crate::normalize::normalize;
use crate::settings::SettingsStore;
use serde::Serialize;
use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("a product title is required before queueing")]
    MissingTitle,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("queue worker is not available")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    Idle,
    Running,
}

/// Published after every message the runner handles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerStatus {
    pub state: RunnerState,
    pub active_item_id: Option<Uuid>,
    pub pending: Vec<QueuedItem>,
    pub logs: Vec<LogEntry>,
}

impl RunnerStatus {
    fn idle() -> Self {
        Self {
            state: RunnerState::Idle,
            active_item_id: None,
            pending: Vec::new(),
            logs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub queued: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pause between one item finishing and the next being dispatched.
    pub inter_item_delay: Duration,
    pub mailbox_capacity: usize,
}

impl RunnerConfig {
    pub fn from_env() -> Self {
        let delay_ms = std::env::var("QUEUE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1000);
        Self {
            inter_item_delay: Duration::from_millis(delay_ms),
            mailbox_capacity: queue_capacity_from_env(),
        }
    }
}

enum Command {
    Enqueue {
        draft: ProductDraft,
        reply: oneshot::Sender<Result<Uuid, QueueError>>,
    },
    Import {
        drafts: Vec<ProductDraft>,
        reply: oneshot::Sender<ImportSummary>,
    },
    Start {
        reply: oneshot::Sender<RunnerState>,
    },
    Stop {
        reply: oneshot::Sender<RunnerState>,
    },
    Note(LogEntry),
    DispatchComplete {
        item_id: Uuid,
        title: String,
        outcome: Result<UploadOutcome, UploadError>,
        elapsed: Duration,
    },
    Tick,
}

/// Handle to the single upload worker. Cloning it is cheap; every clone
/// talks to the same mailbox.
#[derive(Clone)]
pub struct QueueRunner {
    tx: mpsc::Sender<Command>,
    status: watch::Receiver<RunnerStatus>,
}

impl QueueRunner {
    pub fn spawn<U: Uploader>(
        uploader: Arc<U>,
        settings: SettingsStore,
        config: RunnerConfig,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Command>(config.mailbox_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(RunnerStatus::idle());

        let worker = Worker {
            uploader,
            settings,
            delay: config.inter_item_delay,
            pending: VecDeque::new(),
            state: RunnerState::Idle,
            active_item_id: None,
            in_flight: None,
            log: ActivityLog::default(),
            mailbox: tx.downgrade(),
            status: status_tx,
        };
        let handle = tokio::spawn(worker.run(rx));

        (
            Self {
                tx,
                status: status_rx,
            },
            handle,
        )
    }

    pub async fn enqueue(&self, draft: ProductDraft) -> Result<Uuid, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Enqueue { draft, reply }).await?;
        rx.await.map_err(|_| QueueError::Unavailable)?
    }

    /// Imports a CSV file. A header problem rejects the whole file and
    /// queues nothing; rows without a title are skipped one by one.
    pub async fn import_csv(&self, content: &str) -> Result<ImportSummary, QueueError> {
        let drafts = match import::parse_drafts(content) {
            Ok(drafts) => drafts,
            Err(err) => {
                self.send(Command::Note(LogEntry::new(
                    LogLevel::Error,
                    "CSV import failed",
                    Some(err.to_string()),
                )))
                .await?;
                return Err(err.into());
            }
        };
        let (reply, rx) = oneshot::channel();
        self.send(Command::Import { drafts, reply }).await?;
        rx.await.map_err(|_| QueueError::Unavailable)
    }

    pub async fn start(&self) -> Result<RunnerState, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start { reply }).await?;
        rx.await.map_err(|_| QueueError::Unavailable)
    }

    /// Suppresses the next dispatch. A call already in flight still runs to
    /// completion and its outcome is logged.
    pub async fn stop(&self) -> Result<RunnerState, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { reply }).await?;
        rx.await.map_err(|_| QueueError::Unavailable)
    }

    pub fn status(&self) -> RunnerStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunnerStatus> {
        self.status.clone()
    }

    async fn send(&self, command: Command) -> Result<(), QueueError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| QueueError::Unavailable)
    }
}

struct Worker<U> {
    uploader: Arc<U>,
    settings: SettingsStore,
    delay: Duration,
    pending: VecDeque<QueuedItem>,
    state: RunnerState,
    active_item_id: Option<Uuid>,
    // Outlives `stop()`, which clears only the visible marker.
    in_flight: Option<Uuid>,
    log: ActivityLog,
    mailbox: mpsc::WeakSender<Command>,
    status: watch::Sender<RunnerStatus>,
}

impl<U: Uploader> Worker<U> {
    // Replies go out only after the new status is published, so a caller
    // that awaited a command always observes its effect.
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
            self.publish();
        }
        debug!(target = "catalog.queue", "queue worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Enqueue { draft, reply } => {
                let result = self.push_draft(draft);
                if result.is_ok() {
                    self.auto_start().await;
                }
                self.publish();
                let _ = reply.send(result);
            }
            Command::Import { drafts, reply } => {
                let mut summary = ImportSummary {
                    queued: 0,
                    rejected: 0,
                };
                for draft in drafts {
                    match self.push_draft(draft) {
                        Ok(_) => summary.queued += 1,
                        Err(_) => summary.rejected += 1,
                    }
                }
                self.log.push(LogEntry::info(format!(
                    "Imported {} product(s) from CSV, {} skipped",
                    summary.queued, summary.rejected
                )));
                if summary.queued > 0 {
                    self.auto_start().await;
                }
                self.publish();
                let _ = reply.send(summary);
            }
            Command::Start { reply } => {
                self.start().await;
                self.publish();
                let _ = reply.send(self.state);
            }
            Command::Stop { reply } => {
                self.stop();
                self.publish();
                let _ = reply.send(self.state);
            }
            Command::Note(entry) => self.log.push(entry),
            Command::DispatchComplete {
                item_id,
                title,
                outcome,
                elapsed,
            } => self.complete(item_id, &title, outcome, elapsed),
            Command::Tick => self.drain_step().await,
        }
    }

    fn push_draft(&mut self, draft: ProductDraft) -> Result<Uuid, QueueError> {
        if !draft.has_title() {
            self.log.push(LogEntry::new(
                LogLevel::Error,
                "Draft rejected",
                Some(QueueError::MissingTitle.to_string()),
            ));
            return Err(QueueError::MissingTitle);
        }

        let item = QueuedItem::new(draft);
        let id = item.id;
        info!(
            target = "catalog.queue",
            item_id = %id,
            title = %item.payload.title,
            "item queued"
        );
        self.log
            .push(LogEntry::info(format!("Queued: {}", item.payload.title.trim())));
        self.pending.push_back(item);
        crate::metrics::queue_depth(self.pending.len());
        Ok(id)
    }

    async fn auto_start(&mut self) {
        if self.state == RunnerState::Idle && self.settings.snapshot().await.auto_start {
            self.state = RunnerState::Running;
            info!(target = "catalog.queue", "auto-start engaged");
            self.drain_step().await;
        }
    }

    async fn start(&mut self) {
        if self.state == RunnerState::Running {
            return;
        }
        if self.pending.is_empty() {
            self.log.push(LogEntry::info("Queue is empty, nothing to upload"));
            return;
        }
        self.state = RunnerState::Running;
        info!(
            target = "catalog.queue",
            pending = self.pending.len(),
            "queue started"
        );
        self.log.push(LogEntry::info(format!(
            "Processing {} queued item(s)",
            self.pending.len()
        )));
        self.drain_step().await;
    }

    fn stop(&mut self) {
        self.state = RunnerState::Idle;
        self.active_item_id = None;
        info!(
            target = "catalog.queue",
            in_flight = ?self.in_flight,
            "queue paused"
        );
        self.log.push(LogEntry::info("Queue paused"));
    }

    async fn drain_step(&mut self) {
        if self.state != RunnerState::Running || self.in_flight.is_some() {
            return;
        }
        let Some(item) = self.pending.front().cloned() else {
            self.state = RunnerState::Idle;
            info!(target = "catalog.queue", "queue drained");
            self.log
                .push(LogEntry::new(LogLevel::Success, "Queue complete", None));
            return;
        };
        let Some(tx) = self.mailbox.upgrade() else {
            return;
        };

        let settings = self.settings.snapshot().await;
        let product = normalize(&item.payload);
        let title = item.payload.title.trim().to_string();
        let item_id = item.id;
        self.active_item_id = Some(item_id);
        self.in_flight = Some(item_id);
        info!(
            target = "catalog.queue",
            item_id = %item_id,
            title = %title,
            mode = ?settings.mode,
            "dispatching item"
        );

        let uploader = Arc::clone(&self.uploader);
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = uploader.submit(product, settings).await;
            let _ = tx
                .send(Command::DispatchComplete {
                    item_id,
                    title,
                    outcome,
                    elapsed: started.elapsed(),
                })
                .await;
        });
    }

    fn complete(
        &mut self,
        item_id: Uuid,
        title: &str,
        outcome: Result<UploadOutcome, UploadError>,
        elapsed: Duration,
    ) {
        let entry = match outcome {
            Ok(outcome) => {
                crate::metrics::dispatch_elapsed("success", elapsed.as_millis());
                let headline = match &outcome {
                    UploadOutcome::Simulated { .. } => format!("Simulated upload: {title}"),
                    UploadOutcome::Success { .. } => format!("Uploaded: {title}"),
                };
                LogEntry::new(LogLevel::Success, headline, Some(outcome.body().to_string()))
            }
            Err(err) => {
                crate::metrics::dispatch_elapsed("error", elapsed.as_millis());
                warn!(
                    target = "catalog.queue",
                    item_id = %item_id,
                    error = %err,
                    "item upload failed"
                );
                LogEntry::new(
                    LogLevel::Error,
                    format!("Upload failed: {title}"),
                    Some(err.detail()),
                )
            }
        };
        self.log.push(entry.for_item(item_id));

        self.pending.retain(|item| item.id != item_id);
        if self.active_item_id == Some(item_id) {
            self.active_item_id = None;
        }
        if self.in_flight == Some(item_id) {
            self.in_flight = None;
        }
        crate::metrics::queue_depth(self.pending.len());

        if self.state == RunnerState::Running {
            self.schedule_tick();
        }
    }

    fn schedule_tick(&self) {
        let Some(tx) = self.mailbox.upgrade() else {
            return;
        };
        let delay = self.delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = tx.send(Command::Tick).await;
        });
    }

    fn publish(&self) {
        self.status.send_replace(RunnerStatus {
            state: self.state,
            active_item_id: self.active_item_id,
            pending: self.pending.iter().cloned().collect(),
            logs: self.log.newest_first(),
        });
    }
}

fn queue_capacity_from_env() -> usize {
    std::env::var("QUEUE_CAPACITY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(64)
}
