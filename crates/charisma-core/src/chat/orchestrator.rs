//! State-update orchestrator: the model-call state machine.
//!
//! Drives one conversational turn through explicit phases: call the
//! model, retry transient failures with backoff, apply the returned
//! actions, and fall back to an apology when all attempts fail. The
//! caller always gets a `TurnOutcome`; model failure never surfaces as
//! an error.

use charisma_types::context::ContextSnapshot;
use charisma_types::event::{AppliedAction, TurnOutcome};
use charisma_types::llm::{ChatReply, ChatTurnRequest, LlmError, ModelAction};
use charisma_types::relation::Affinity;
use rand::seq::SliceRandom;
use tracing::{debug, error, warn};

use crate::llm::LlmProvider;
use crate::repository::RelationRepository;

use super::backoff::Backoff;

/// Phase of a turn as it moves through the orchestrator.
#[derive(Debug)]
pub enum TurnPhase {
    /// A model call for the given attempt number is in flight next.
    AwaitingModel { attempt: u32 },
    /// A transient failure occurred; sleep, then attempt again.
    Retrying { attempt: u32 },
    /// The model replied; its actions are being applied.
    ApplyingActions { reply: ChatReply },
    /// Terminal: the turn produced an outcome.
    Completed { outcome: TurnOutcome },
    /// Terminal: every attempt failed; a fallback reply is owed.
    Failed,
}

/// Runs the model call with retries and applies state-update actions.
pub struct TurnOrchestrator<P, R, B> {
    provider: P,
    relations: R,
    backoff: B,
    max_attempts: u32,
    fallback_replies: Vec<String>,
}

impl<P, R, B> TurnOrchestrator<P, R, B>
where
    P: LlmProvider,
    R: RelationRepository,
    B: Backoff,
{
    pub fn new(
        provider: P,
        relations: R,
        backoff: B,
        max_attempts: u32,
        fallback_replies: Vec<String>,
    ) -> Self {
        Self {
            provider,
            relations,
            backoff,
            max_attempts: max_attempts.max(1),
            fallback_replies,
        }
    }

    /// Run one turn to completion.
    ///
    /// Transient failures (timeout, rate limit, overload, empty reply)
    /// are retried up to `max_attempts` total; structural failures (auth,
    /// bad request, malformed reply) are not. Action-application
    /// failures are logged and skipped without invalidating the reply.
    pub async fn converse(
        &self,
        snapshot: &ContextSnapshot,
        request: &ChatTurnRequest,
    ) -> TurnOutcome {
        let mut phase = TurnPhase::AwaitingModel { attempt: 1 };
        loop {
            phase = match phase {
                TurnPhase::AwaitingModel { attempt } => self.call_model(request, attempt).await,
                TurnPhase::Retrying { attempt } => {
                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                    TurnPhase::AwaitingModel { attempt }
                }
                TurnPhase::ApplyingActions { reply } => {
                    let applied = self.apply_actions(snapshot, &reply.actions).await;
                    TurnPhase::Completed {
                        outcome: TurnOutcome::Reply {
                            text: reply.message,
                            applied,
                        },
                    }
                }
                TurnPhase::Completed { outcome } => return outcome,
                TurnPhase::Failed => {
                    return TurnOutcome::Fallback {
                        text: self.pick_fallback(),
                    };
                }
            };
        }
    }

    async fn call_model(&self, request: &ChatTurnRequest, attempt: u32) -> TurnPhase {
        match self.provider.generate(request).await {
            Ok(reply) if reply.message.trim().is_empty() => {
                self.after_failure(attempt, &LlmError::EmptyReply)
            }
            Ok(reply) => {
                debug!(attempt, actions = reply.actions.len(), "model replied");
                TurnPhase::ApplyingActions { reply }
            }
            Err(err) => self.after_failure(attempt, &err),
        }
    }

    fn after_failure(&self, attempt: u32, err: &LlmError) -> TurnPhase {
        if err.is_transient() && attempt < self.max_attempts {
            warn!(attempt, error = %err, "model call failed, will retry");
            TurnPhase::Retrying {
                attempt: attempt + 1,
            }
        } else {
            error!(attempt, error = %err, "model call failed, giving up");
            TurnPhase::Failed
        }
    }

    /// Apply each model-issued action independently.
    ///
    /// One failed upsert is logged and skipped; the rest still apply and
    /// the reply stands.
    async fn apply_actions(
        &self,
        snapshot: &ContextSnapshot,
        actions: &[ModelAction],
    ) -> Vec<AppliedAction> {
        let mut applied = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                ModelAction::Memory { value } => {
                    match self
                        .relations
                        .upsert_memory(&snapshot.user_id, &snapshot.character_id, value)
                        .await
                    {
                        Ok(()) => applied.push(AppliedAction::Memory {
                            value: value.clone(),
                        }),
                        Err(err) => {
                            warn!(error = %err, "failed to apply memory action, skipping");
                        }
                    }
                }
                ModelAction::Affinity { value } => {
                    let affinity = Affinity::parse_lenient(value);
                    match self
                        .relations
                        .upsert_affinity(&snapshot.user_id, &snapshot.character_id, affinity)
                        .await
                    {
                        Ok(()) => applied.push(AppliedAction::Affinity {
                            value: affinity.value(),
                        }),
                        Err(err) => {
                            warn!(error = %err, "failed to apply affinity action, skipping");
                        }
                    }
                }
            }
        }
        applied
    }

    fn pick_fallback(&self) -> String {
        self.fallback_replies
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| "Sorry, I can't respond right now.".to_string())
    }
}
