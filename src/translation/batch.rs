/*!
 * Batch translation processing.
 *
 * This module contains the `BatchTranslator`, which runs one client call per
 * cue of a snapshot with bounded concurrency, reports every resolved call as
 * events in completion order, and stops at the first failure or on cancellation.
 */

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::errors::{ProviderError, TranslationError};
use crate::subtitle_processor::Cue;

use super::core::{Mode, TokenUsageStats, TranslationClient, UnitResult};
use super::events::{BatchEvent, BatchOutcome, BatchState, CancelToken};

/// A batch running on its own task
#[derive(Debug)]
pub struct BatchHandle {
    /// Events in completion order; closes after the terminal event
    pub events: mpsc::UnboundedReceiver<BatchEvent>,

    /// Stops admission of further calls
    pub cancel: CancelToken,

    /// Resolves to the terminal outcome
    pub join: JoinHandle<BatchOutcome>,
}

/// Batch translator for processing a cue snapshot
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// The translation client to use
    client: TranslationClient,

    /// Maximum number of concurrent calls
    concurrency: usize,

    state: Arc<Mutex<BatchState>>,
}

// The permit travels back with the result so a slot frees only once the collector has seen it
type CallResult = (usize, Result<UnitResult, ProviderError>, Option<OwnedSemaphorePermit>);

impl BatchTranslator {
    /// Create a new batch translator; a limit of zero is raised to one
    pub fn new(client: TranslationClient, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            state: Arc::new(Mutex::new(BatchState::Idle)),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn client(&self) -> &TranslationClient {
        &self.client
    }

    pub fn state(&self) -> BatchState {
        *self.state.lock()
    }

    /// Run `cues` on a new task and hand back its event stream
    ///
    /// The batch is a new job: it gets its own state, independent of any
    /// earlier run of this translator.
    pub fn spawn(&self, cues: Vec<Cue>, mode: Mode) -> BatchHandle {
        let (sender, events) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let translator = BatchTranslator::new(self.client.clone(), self.concurrency);
        let token = cancel.clone();

        let join = tokio::spawn(async move { translator.run(cues, mode, sender, token).await });

        BatchHandle { events, cancel, join }
    }

    /// Run one batch to its terminal outcome
    ///
    /// A translator runs a single batch: once it has left `Idle` further runs
    /// are refused without any call and its state is left as it was. A dropped
    /// event receiver does not stop the batch. The client's connection is
    /// released whichever way the batch ends.
    pub async fn run(
        &self,
        cues: Vec<Cue>,
        mode: Mode,
        events: mpsc::UnboundedSender<BatchEvent>,
        cancel: CancelToken,
    ) -> BatchOutcome {
        {
            let mut state = self.state.lock();
            if *state != BatchState::Idle {
                let previous = *state;
                drop(state);
                warn!("Refusing to start {} batch on a translator that is already {:?}", mode, previous);
                let err = TranslationError::InvalidConfig(format!(
                    "batch translator is already {:?}, start a new one",
                    previous
                ));
                return Self::fail(err, 0, &|event| {
                    let _ = events.send(event);
                });
            }
            *state = BatchState::Running;
        }

        let outcome = self.execute(cues, mode, &events, &cancel).await;
        self.client.close().await;

        *self.state.lock() = match outcome {
            BatchOutcome::Completed(_) => BatchState::Completed,
            BatchOutcome::Failed { .. } => BatchState::Failed,
        };
        outcome
    }

    async fn execute(
        &self,
        mut cues: Vec<Cue>,
        mode: Mode,
        events: &mpsc::UnboundedSender<BatchEvent>,
        cancel: &CancelToken,
    ) -> BatchOutcome {
        let emit = |event: BatchEvent| {
            if events.send(event).is_err() {
                debug!("Batch event dropped, receiver is gone");
            }
        };

        if self.client.settings().api_key.trim().is_empty() {
            let err = TranslationError::InvalidConfig("API key is not set".to_string());
            error!("Refusing to start {} batch: {}", mode, err);
            return Self::fail(err, 0, &emit);
        }

        let total = cues.len();
        if total == 0 {
            info!("Nothing to {}: no cues", mode);
            emit(BatchEvent::BatchCompleted { mode });
            return BatchOutcome::Completed(mode);
        }

        info!(
            "Starting {} batch: {} cues, {} concurrent calls",
            mode, total, self.concurrency
        );
        let start_time = Instant::now();
        let mut token_stats = TokenUsageStats::with_model(self.client.settings().model.clone());

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<CallResult> = JoinSet::new();
        let mut next = 0;
        let mut completed = 0;
        let mut failure: Option<TranslationError> = None;

        loop {
            let halted = failure.is_some();
            if tasks.is_empty() && (halted || next == total) {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled(), if !halted => {
                    warn!("{} batch cancelled after {} of {} cues", mode, completed, total);
                    failure = Some(TranslationError::Cancelled);
                    emit(BatchEvent::BatchFailed {
                        message: TranslationError::Cancelled.to_string(),
                        completed,
                    });
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    let (position, result, _permit) = match joined {
                        Ok(call) => call,
                        Err(e) => (usize::MAX, Err(ProviderError::RequestFailed(format!("call task failed: {}", e))), None),
                    };

                    if halted {
                        debug!("Discarding result for position {} of a halted batch", position);
                        continue;
                    }

                    completed += 1;
                    match result {
                        Ok(unit) => {
                            let cue = &mut cues[position];
                            match unit.applied_mode {
                                Mode::Translate => cue.set_translation(unit.text),
                                Mode::Fix => cue.set_fixed_text(unit.text),
                            }
                            token_stats.add(unit.prompt_tokens, unit.completion_tokens);

                            emit(BatchEvent::RowUpdated {
                                position,
                                translation: cue.translation.clone(),
                                fixed_text: cue.fixed_text.clone(),
                            });
                            emit(BatchEvent::TokensAdded {
                                prompt_tokens: unit.prompt_tokens,
                                completion_tokens: unit.completion_tokens,
                            });
                            emit(BatchEvent::Progress { completed, total });
                        }
                        Err(e) => {
                            error!("{} call for cue at position {} failed: {}", mode, position, e);
                            emit(BatchEvent::Progress { completed, total });
                            let err = TranslationError::from(e);
                            emit(BatchEvent::BatchFailed {
                                message: err.to_string(),
                                completed,
                            });
                            failure = Some(err);
                        }
                    }
                }

                permit = semaphore.clone().acquire_owned(), if !halted && next < total => {
                    let Ok(permit) = permit else {
                        // The semaphore is never closed while the batch owns it
                        continue;
                    };
                    let position = next;
                    next += 1;

                    let client = self.client.clone();
                    let cue = cues[position].clone();
                    tasks.spawn(async move {
                        debug!("Calling model for cue {} (position {})", cue.index, position);
                        let result = client.translate_cue(&cue, mode).await;
                        (position, result, Some(permit))
                    });
                }
            }
        }

        if let Some(err) = failure {
            info!(
                "{} batch stopped after {} of {} cues in {:?}",
                mode, completed, total, start_time.elapsed()
            );
            return BatchOutcome::Failed {
                kind: err.kind(),
                message: err.to_string(),
            };
        }

        info!("{} batch completed in {:?}", mode, start_time.elapsed());
        info!("{}", token_stats.summary());
        emit(BatchEvent::BatchCompleted { mode });
        BatchOutcome::Completed(mode)
    }

    fn fail(err: TranslationError, completed: usize, emit: &impl Fn(BatchEvent)) -> BatchOutcome {
        let message = err.to_string();
        emit(BatchEvent::BatchFailed {
            message: message.clone(),
            completed,
        });
        BatchOutcome::Failed {
            kind: err.kind(),
            message,
        }
    }
}
