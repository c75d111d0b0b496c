//! Streaming Fan-in Multiplexer
//!
//! [`CouncilStream`] runs one [`StreamExecutor`] task per model and merges
//! their events, in arrival order, into a single stream:
//!
//! ```text
//! producer(m1) ─┐
//! producer(m2) ─┼─> mpsc ──> CouncilStream ──> Delta / Done / Error
//! producer(m3) ─┘             (pending set,       ModelComplete
//!                              buffers)           ... AllDone
//! ```
//!
//! Producers only send events. The pending set and per-model buffers belong
//! to the consuming side, which removes a model when its `Done` or `Error`
//! arrives and emits that model's `ModelComplete` right after it. Once the
//! pending set is empty the stream joins every producer task and yields a
//! single `AllDone`, then ends.
//!
//! A producer task that panics is reaped while the others keep running, and
//! its model completes with an `Error` as soon as the channel holds nothing
//! more from it.
//!
//! Dropping the stream, or calling [`CouncilStream::cancel`], aborts all
//! producers that are still running.

use super::stream::StreamExecutor;
use super::Target;
use crate::core_types::{Message, ModelId, StreamEvent};
use crate::logging::{log_debug, log_error, log_info, log_warn};
use futures_util::stream::{FusedStream, Stream, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};
use uuid::Uuid;

const PRODUCER_EXITED_MESSAGE: &str = "stream producer exited unexpectedly";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FanInPhase {
    /// Producers not spawned yet; nothing happens until the first poll
    Idle,
    /// Forwarding producer events until every model has completed
    Draining,
    /// All models completed; waiting for producer tasks to exit
    Joining,
    Finished,
}

struct Launch {
    executor: StreamExecutor,
    targets: Vec<Target>,
    messages: Arc<[Message]>,
    sender: mpsc::UnboundedSender<StreamEvent>,
}

/// Merged event stream of a streaming council query
///
/// Must be polled from within a Tokio runtime; producers are spawned on the
/// first poll.
pub struct CouncilStream {
    query_id: Uuid,
    phase: FanInPhase,
    launch: Option<Launch>,
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
    pending: HashSet<ModelId>,
    accumulated: HashMap<ModelId, String>,
    outbox: VecDeque<StreamEvent>,
    producers: JoinSet<()>,
    producer_models: HashMap<task::Id, ModelId>,
    crashed: Vec<ModelId>,
    started_at: Option<Instant>,
}

impl CouncilStream {
    /// Prepare a fan-out over `targets`
    pub fn new(executor: StreamExecutor, targets: Vec<Target>, messages: Arc<[Message]>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = targets.iter().map(|(model, _)| model.clone()).collect();

        Self {
            query_id: Uuid::new_v4(),
            phase: FanInPhase::Idle,
            launch: Some(Launch {
                executor,
                targets,
                messages,
                sender,
            }),
            receiver,
            pending,
            accumulated: HashMap::new(),
            outbox: VecDeque::new(),
            producers: JoinSet::new(),
            producer_models: HashMap::new(),
            crashed: Vec::new(),
            started_at: None,
        }
    }

    /// Correlation id attached to this query's log events
    pub fn query_id(&self) -> Uuid {
        self.query_id
    }

    /// Models that have not produced `Done` or `Error` yet
    pub fn pending_models(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    /// Abort every producer and end the stream without `AllDone`
    pub fn cancel(&mut self) {
        if self.phase == FanInPhase::Finished {
            return;
        }

        log_info!(
            query_id = %self.query_id,
            pending_models = self.pending.len(),
            "Cancelling council stream"
        );

        self.producers.abort_all();
        self.producer_models.clear();
        self.crashed.clear();
        self.launch = None;
        self.outbox.clear();
        self.receiver.close();
        self.phase = FanInPhase::Finished;
    }

    fn start(&mut self) {
        self.phase = FanInPhase::Draining;
        self.started_at = Some(Instant::now());

        let Some(launch) = self.launch.take() else {
            return;
        };

        log_info!(
            query_id = %self.query_id,
            model_count = launch.targets.len(),
            "Starting streaming council query"
        );

        for (model, endpoint) in launch.targets {
            let mut events = launch
                .executor
                .execute(model.clone(), endpoint, &launch.messages);
            let sender = launch.sender.clone();

            let handle = self.producers.spawn(async move {
                while let Some(event) = events.next().await {
                    if sender.send(event).is_err() {
                        break;
                    }
                }
            });
            self.producer_models.insert(handle.id(), model);
        }
        // launch.sender drops here so the channel closes once every producer exits
    }

    fn absorb(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Delta { model, content } => {
                if !self.pending.contains(&model) {
                    log_debug!(query_id = %self.query_id, model = %model, "Dropping delta for completed model");
                    return;
                }
                self.accumulated
                    .entry(model.clone())
                    .or_default()
                    .push_str(&content);
                self.outbox.push_back(StreamEvent::Delta { model, content });
            }
            StreamEvent::Done { .. } | StreamEvent::Error { .. } => {
                let Some(model) = event.model().map(str::to_owned) else {
                    return;
                };
                if !self.pending.remove(&model) {
                    log_debug!(query_id = %self.query_id, model = %model, "Dropping repeated terminal event");
                    return;
                }
                log_debug!(
                    query_id = %self.query_id,
                    model = %model,
                    failed = matches!(event, StreamEvent::Error { .. }),
                    remaining = self.pending.len(),
                    "Model completed"
                );
                self.complete(model, event);
            }
            StreamEvent::ModelComplete { .. } | StreamEvent::AllDone => {}
        }
    }

    fn complete(&mut self, model: ModelId, terminal: StreamEvent) {
        let accumulated = self.accumulated.remove(&model).unwrap_or_default();
        self.outbox.push_back(terminal);
        self.outbox
            .push_back(StreamEvent::ModelComplete { model, accumulated });
    }

    fn abandon(&mut self, model: ModelId) {
        let error = StreamEvent::Error {
            model: model.clone(),
            message: PRODUCER_EXITED_MESSAGE.to_string(),
        };
        self.complete(model, error);
    }

    /// Every producer is gone but some models never finished
    fn abandon_pending(&mut self) {
        let mut orphaned: Vec<ModelId> = self.pending.drain().collect();
        orphaned.sort();

        log_error!(
            query_id = %self.query_id,
            models = ?orphaned,
            "Council stream producers exited before completing"
        );

        for model in orphaned {
            self.abandon(model);
        }
    }

    /// Complete models whose producer died once their buffered events are consumed
    fn abandon_crashed(&mut self) -> bool {
        let mut abandoned = false;
        for model in std::mem::take(&mut self.crashed) {
            if self.pending.remove(&model) {
                self.abandon(model);
                abandoned = true;
            }
        }
        abandoned
    }

    fn reap(&mut self, result: Result<(task::Id, ()), JoinError>) {
        match result {
            Ok((id, ())) => {
                self.producer_models.remove(&id);
            }
            Err(e) => {
                let Some(model) = self.producer_models.remove(&e.id()) else {
                    return;
                };
                if self.pending.contains(&model) {
                    log_error!(
                        query_id = %self.query_id,
                        model = %model,
                        error = %e,
                        "Council stream producer exited before completing"
                    );
                    self.crashed.push(model);
                }
            }
        }
    }

    fn finish(&mut self) -> StreamEvent {
        self.phase = FanInPhase::Finished;
        log_info!(
            query_id = %self.query_id,
            duration_ms = self
                .started_at
                .map(|t| t.elapsed().as_millis() as u64)
                .unwrap_or_default(),
            "Streaming council query finished"
        );
        StreamEvent::AllDone
    }
}

impl Stream for CouncilStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.outbox.pop_front() {
                return Poll::Ready(Some(event));
            }

            match this.phase {
                FanInPhase::Idle => this.start(),
                FanInPhase::Draining => {
                    if this.pending.is_empty() {
                        this.phase = FanInPhase::Joining;
                        continue;
                    }
                    match this.receiver.poll_recv(cx) {
                        Poll::Ready(Some(event)) => {
                            this.absorb(event);
                            continue;
                        }
                        Poll::Ready(None) => {
                            this.abandon_pending();
                            continue;
                        }
                        Poll::Pending => {}
                    }
                    if this.abandon_crashed() {
                        continue;
                    }
                    match this.producers.poll_join_next_with_id(cx) {
                        Poll::Ready(Some(result)) => this.reap(result),
                        Poll::Ready(None) | Poll::Pending => return Poll::Pending,
                    }
                }
                FanInPhase::Joining => match this.producers.poll_join_next(cx) {
                    Poll::Ready(Some(Ok(()))) => {}
                    Poll::Ready(Some(Err(e))) => {
                        log_warn!(
                            query_id = %this.query_id,
                            error = %e,
                            "Council stream producer did not exit cleanly"
                        );
                    }
                    Poll::Ready(None) => return Poll::Ready(Some(this.finish())),
                    Poll::Pending => return Poll::Pending,
                },
                FanInPhase::Finished => return Poll::Ready(None),
            }
        }
    }
}

impl FusedStream for CouncilStream {
    fn is_terminated(&self) -> bool {
        self.phase == FanInPhase::Finished && self.outbox.is_empty()
    }
}
