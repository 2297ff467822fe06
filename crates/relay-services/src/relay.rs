//! Relay orchestrator. Drives one signed task from request to final message.
//!
//! Per task: verify, claim the message slot, write the starting banner, start
//! the ticker, race generation against the deadline, stop the ticker, then
//! write exactly one terminal message:
//!
//!   answer in time      → converted answer (or the oversized notice)
//!   generation failure  → error banner
//!   deadline            → timeout banner
//!
//! Every terminal write is guarded: it is skipped when the live view has
//! completed the message or the detector reads it as final.
//!
//! A generation call that loses the race is not cancelled. When
//! `deliver_late_answers` is set its answer goes through the same guard,
//! and the message slot stays claimed until it settles.

use std::sync::Arc;

use relay_core::banner;
use relay_core::config::RelaySettings;
use relay_core::{
    CompletionUpdate, GenerationError, LiveLink, MessageRef, RelayError, Signer, Task,
    VerifiedTask,
};
use serde_json::json;
use tokio::task::{JoinError, JoinHandle};

use crate::delivery::{deliver, Delivery};
use crate::detector::CompletionDetector;
use crate::events::{kinds, EventLog};
use crate::generation::Generator;
use crate::race::{race_with_deadline, RaceOutcome};
use crate::tasks::{Claim, RelayState, TaskTable};
use crate::ticker;
use crate::transport::ChatTransport;

type GenerationCall = JoinHandle<Result<String, GenerationError>>;

/// Static knobs for a relay instance.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub settings: RelaySettings,
    pub public_url: String,
    pub live_path: String,
    pub system_instruction: Option<String>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            settings: RelaySettings::default(),
            public_url: "http://127.0.0.1:3000".to_string(),
            live_path: "/response.html".to_string(),
            system_instruction: None,
        }
    }
}

/// Terminal result of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Answered(Delivery),
    /// `wrote_banner` is false when the message was already final or the
    /// banner write failed.
    TimedOut { wrote_banner: bool },
    Failed { error: String },
    /// The message was finalized elsewhere first; nothing was written.
    Superseded,
}

impl RelayOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Answered(Delivery::Direct) => "answered",
            Self::Answered(Delivery::Fallback) => "answered_via_link",
            Self::TimedOut { .. } => "timed_out",
            Self::Failed { .. } => "failed",
            Self::Superseded => "superseded",
        }
    }
}

#[derive(Clone)]
pub struct Relay {
    inner: Arc<Inner>,
}

struct Inner {
    signer: Signer,
    transport: Arc<dyn ChatTransport>,
    generator: Arc<dyn Generator>,
    detector: CompletionDetector,
    options: RelayOptions,
    events: EventLog,
    tasks: TaskTable,
}

impl Relay {
    pub fn new(
        signer: Signer,
        transport: Arc<dyn ChatTransport>,
        generator: Arc<dyn Generator>,
        options: RelayOptions,
    ) -> Self {
        let events = EventLog::new(
            options.settings.event_capacity,
            options.settings.event_max_age(),
        );
        Self {
            inner: Arc::new(Inner {
                signer,
                detector: CompletionDetector::new(transport.clone()),
                transport,
                generator,
                options,
                events,
                tasks: TaskTable::new(),
            }),
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.inner.events
    }

    pub fn active_tasks(&self) -> usize {
        self.inner.tasks.len()
    }

    pub fn state_of(&self, message: &MessageRef) -> Option<RelayState> {
        self.inner.tasks.state(message)
    }

    pub fn live_link(&self, task: &Task) -> LiveLink {
        LiveLink::new(&self.inner.options.public_url, &self.inner.options.live_path, task)
    }

    // ── Entry points ──────────────────────────────────────────────────────────

    /// Admit `task` and run it in the background. Returns the task id.
    pub fn submit(&self, task: Task) -> Result<String, RelayError> {
        let (verified, claim) = self.admit(task)?;
        let id = verified.message().short_id();
        let relay = self.clone();
        tokio::spawn(async move {
            relay.run(verified, claim).await;
        });
        Ok(id)
    }

    /// Admit `task` and run it to its terminal state.
    pub async fn process(&self, task: Task) -> Result<RelayOutcome, RelayError> {
        let (verified, claim) = self.admit(task)?;
        Ok(self.run(verified, claim).await)
    }

    /// Deliver an answer pushed back by the live view.
    ///
    /// Verified like a task; a forged update writes nothing. If a task is
    /// still running on the same message its ticker is stopped first, and
    /// once the answer lands that task leaves the message alone.
    pub async fn complete(&self, update: CompletionUpdate) -> Result<Delivery, RelayError> {
        let message = MessageRef::new(&update.channel, &update.ts);
        let verified = update
            .validate()
            .and_then(|()| self.inner.signer.verify_task(update.task()))
            .inspect_err(|e| self.record_rejection(&message, "completion", e))?;

        if self.inner.tasks.stop_ticker(&message) {
            tracing::debug!(task = %message.short_id(), "stopped ticker of active task");
        }

        let link = self.live_link(verified.task());
        let delivery = deliver(&*self.inner.transport, &message, &update.text, &link).await?;
        if self.inner.tasks.mark_completed(&message) {
            tracing::debug!(task = %message.short_id(), "active task marked completed");
        }

        tracing::info!(task = %message.short_id(), ?delivery, "completion delivered");
        self.inner.events.append(
            kinds::COMPLETION,
            json!({ "task": message.short_id(), "channel": message.channel, "delivery": delivery }),
        );
        Ok(delivery)
    }

    /// One-off generation with no chat message attached. No signature, no
    /// ticker, no deadline beyond the backend's own request timeout.
    pub async fn ask(&self, prompt: &str) -> Result<String, GenerationError> {
        self.inner.generator.generate(prompt, None).await
    }

    /// Model name of the generation backend.
    pub fn model(&self) -> &str {
        self.inner.generator.model()
    }

    fn admit(&self, task: Task) -> Result<(VerifiedTask, Claim), RelayError> {
        let message = task.message();
        let admitted = task
            .validate()
            .and_then(|()| self.inner.signer.verify_task(task))
            .and_then(|verified| match self.inner.tasks.claim(&message) {
                Some(claim) => Ok((verified, claim)),
                None => Err(RelayError::AlreadyRunning),
            })
            .inspect_err(|e| self.record_rejection(&message, "task", e))?;

        tracing::info!(
            task = %message.short_id(),
            channel = %message.channel,
            "task accepted"
        );
        self.inner.events.append(
            kinds::TASK_ACCEPTED,
            json!({ "task": message.short_id(), "channel": message.channel, "ts": message.ts }),
        );
        Ok(admitted)
    }

    fn record_rejection(&self, message: &MessageRef, source: &str, error: &RelayError) {
        tracing::warn!(task = %message.short_id(), source, error = %error, "request rejected");
        self.inner.events.append(
            kinds::TASK_REJECTED,
            json!({ "task": message.short_id(), "source": source, "reason": error.to_string() }),
        );
    }

    // ── State machine ─────────────────────────────────────────────────────────

    async fn run(&self, task: VerifiedTask, claim: Claim) -> RelayOutcome {
        let inner = &self.inner;
        let settings = &inner.options.settings;
        let message = task.message();
        let id = message.short_id();
        let link = self.live_link(task.task());
        let started = tokio::time::Instant::now();

        claim.set(RelayState::InProgress);
        if let Err(e) = inner
            .transport
            .update_message(&message, &banner::starting(&link), None)
            .await
        {
            tracing::warn!(task = %id, error = %e, "starting banner failed");
        }

        let style = settings.progress_style();
        let frame_link = link.clone();
        let ticker = ticker::start(
            inner.transport.clone(),
            message.clone(),
            settings.tick_interval(),
            move |elapsed| banner::progress_frame(elapsed, &style, &frame_link),
        );
        claim.attach_ticker(ticker.token());

        let mut call = self.spawn_generation(task.prompt());
        let raced = race_with_deadline(&mut call, settings.deadline()).await;
        if !ticker.stop(settings.stop_grace()).await {
            tracing::warn!(task = %id, "progress frame hung, aborted");
        }

        let outcome = match raced {
            RaceOutcome::Completed(joined) => match flatten(joined) {
                Ok(answer) => self.answer(&claim, &message, &link, &answer).await,
                Err(e) => self.fail(&claim, &message, &link, e.to_string()).await,
            },
            RaceOutcome::TimedOut => self.time_out(claim, &message, &link, call).await,
        };

        tracing::info!(
            task = %id,
            outcome = outcome.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "task finished"
        );
        inner.events.append(
            kinds::TASK_FINISHED,
            json!({ "task": id, "outcome": outcome.label() }),
        );
        outcome
    }

    /// Whether the message must be left as it is: the live view completed
    /// it, or it reads as final.
    async fn already_final(&self, claim: &Claim, message: &MessageRef) -> bool {
        let id = message.short_id();
        if claim.completed_elsewhere() {
            tracing::info!(task = %id, "completed by the live view, leaving it");
            return true;
        }
        if self.inner.detector.is_already_finalized(message).await {
            tracing::info!(task = %id, "message already final, leaving it");
            return true;
        }
        false
    }

    async fn answer(
        &self,
        claim: &Claim,
        message: &MessageRef,
        link: &LiveLink,
        answer: &str,
    ) -> RelayOutcome {
        claim.set(RelayState::Succeeded);
        if self.already_final(claim, message).await {
            return RelayOutcome::Superseded;
        }
        match deliver(&*self.inner.transport, message, answer, link).await {
            Ok(delivery) => {
                claim.set(RelayState::Delivered);
                RelayOutcome::Answered(delivery)
            }
            Err(e) => self.fail(claim, message, link, e.to_string()).await,
        }
    }

    async fn fail(
        &self,
        claim: &Claim,
        message: &MessageRef,
        link: &LiveLink,
        error: String,
    ) -> RelayOutcome {
        claim.set(RelayState::Failed);
        tracing::warn!(task = %message.short_id(), %error, "task failed");
        if self.already_final(claim, message).await {
            return RelayOutcome::Superseded;
        }
        match self
            .inner
            .transport
            .update_message(message, &banner::failed(&error, link), None)
            .await
        {
            Ok(()) => claim.set(RelayState::Delivered),
            Err(e) => {
                tracing::error!(task = %message.short_id(), error = %e, "error banner write failed");
            }
        }
        RelayOutcome::Failed { error }
    }

    async fn time_out(
        &self,
        claim: Claim,
        message: &MessageRef,
        link: &LiveLink,
        call: GenerationCall,
    ) -> RelayOutcome {
        let inner = &self.inner;
        let id = message.short_id();
        claim.set(RelayState::TimedOut);
        tracing::warn!(
            task = %id,
            error = %RelayError::Timeout(inner.options.settings.deadline()),
            "deadline reached"
        );

        let wrote_banner = if self.already_final(&claim, message).await {
            false
        } else {
            match inner
                .transport
                .update_message(message, &banner::timed_out(link), None)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(task = %id, error = %e, "timeout banner write failed");
                    false
                }
            }
        };
        claim.set(RelayState::Delivered);

        if inner.options.settings.deliver_late_answers {
            self.follow_late_answer(call, claim, message.clone(), link.clone());
        } else {
            tracing::debug!(task = %id, "late answer will be discarded");
        }
        RelayOutcome::TimedOut { wrote_banner }
    }

    /// Await a generation call that lost the race and deliver its answer
    /// unless the message has been finalized in the meantime. `claim` is
    /// held until then so no new task can start ticking the same message.
    fn follow_late_answer(
        &self,
        call: GenerationCall,
        claim: Claim,
        message: MessageRef,
        link: LiveLink,
    ) {
        let relay = self.clone();
        tokio::spawn(async move {
            let inner = &relay.inner;
            let id = message.short_id();
            let answer = match flatten(call.await) {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!(task = %id, error = %e, "late generation failed");
                    return;
                }
            };
            if relay.already_final(&claim, &message).await {
                tracing::info!(task = %id, "late answer dropped");
                return;
            }
            match deliver(&*inner.transport, &message, &answer, &link).await {
                Ok(delivery) => {
                    tracing::info!(task = %id, ?delivery, "late answer delivered");
                    inner.events.append(
                        kinds::LATE_ANSWER,
                        json!({ "task": id, "delivery": delivery }),
                    );
                }
                Err(e) => tracing::warn!(task = %id, error = %e, "late answer write failed"),
            }
        });
    }

    fn spawn_generation(&self, prompt: &str) -> GenerationCall {
        let generator = self.inner.generator.clone();
        let instruction = self.inner.options.system_instruction.clone();
        let prompt = prompt.to_string();
        tokio::spawn(async move { generator.generate(&prompt, instruction.as_deref()).await })
    }
}

fn flatten(
    joined: Result<Result<String, GenerationError>, JoinError>,
) -> Result<String, GenerationError> {
    joined.unwrap_or_else(|e| Err(GenerationError::Backend(format!("generation task failed: {e}"))))
}
