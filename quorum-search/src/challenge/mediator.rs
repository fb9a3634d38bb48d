//! The challenge mediator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::detect::detect_challenge;
use super::operator::HumanOperator;
use super::{ChallengeContext, ChallengeEvent, ChallengeState, MediationError};
use crate::config::SearchConfig;
use crate::session::{pacing, Session};

const EVENT_CAPACITY: usize = 64;

/// Escalates challenged sessions to a human operator and resumes them.
pub struct ChallengeMediator {
    operator: Arc<dyn HumanOperator>,
    wait: Duration,
    events: broadcast::Sender<ChallengeEvent>,
}

impl std::fmt::Debug for ChallengeMediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeMediator")
            .field("operator", &self.operator.name())
            .field("wait", &self.wait)
            .finish()
    }
}

impl ChallengeMediator {
    /// Create a mediator that gives the human at most `wait` per challenge.
    pub fn new(operator: Arc<dyn HumanOperator>, wait: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            operator,
            wait,
            events,
        }
    }

    pub fn from_config(operator: Arc<dyn HumanOperator>, config: &SearchConfig) -> Self {
        Self::new(operator, config.challenge_wait())
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChallengeEvent> {
        self.events.subscribe()
    }

    /// Mediate a challenge on the session's current page, if there is one.
    ///
    /// Returns `Ok(false)` immediately when the page is not challenged and
    /// `Ok(true)` once a human has cleared it and a reload came back clean.
    /// Only the `AwaitingHuman` step blocks; it ends on operator completion,
    /// on `cancel`, or after the wait limit, and the visible session is
    /// closed in every case.
    ///
    /// # Errors
    ///
    /// - [`MediationError::Abandoned`] on cancellation, timeout, decline, or
    ///   a page that is still challenged after the reload.
    /// - [`MediationError::Operator`] if the visible session cannot open.
    /// - [`MediationError::Reload`] if the automated session cannot reload.
    pub async fn mediate(
        &self,
        session: &mut Session,
        cancel: &CancellationToken,
    ) -> Result<bool, MediationError> {
        let engine = session.engine();
        let Some(page) = session.current_page() else {
            return Ok(false);
        };
        let Some(signature) = detect_challenge(engine, page) else {
            return Ok(false);
        };

        let mut ctx = ChallengeContext::new(
            engine,
            session.id(),
            page.url.clone(),
            signature,
            session.identity().viewport,
        );
        tracing::warn!(
            %engine,
            session = ctx.session_id,
            signature = %ctx.signature,
            operator = self.operator.name(),
            "challenge detected"
        );
        self.publish(&ctx);

        let mut visible = match self.operator.open(&ctx).await {
            Ok(visible) => visible,
            Err(e) => {
                self.transition(&mut ctx, ChallengeState::Abandoned);
                return Err(MediationError::Operator(e.to_string()));
            }
        };
        self.transition(&mut ctx, ChallengeState::AwaitingHuman);

        let started = std::time::Instant::now();
        let decision = tokio::select! {
            cleared = visible.completion() => {
                if cleared { Ok(()) } else { Err("declined by operator") }
            }
            () = cancel.cancelled() => Err("cancelled"),
            () = tokio::time::sleep(self.wait) => Err("wait limit reached"),
        };
        visible.close().await;
        tracing::debug!(
            %engine,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "human wait ended"
        );

        if let Err(reason) = decision {
            return Err(self.abandon(&mut ctx, reason));
        }

        tokio::select! {
            () = pacing::pause(session.pacing().settle_delay()) => {}
            () = cancel.cancelled() => return Err(self.abandon(&mut ctx, "cancelled")),
        }

        let reloaded = tokio::select! {
            result = session.reload() => result.map(|page| detect_challenge(engine, page)),
            () = cancel.cancelled() => return Err(self.abandon(&mut ctx, "cancelled")),
        };

        match reloaded {
            Ok(None) => {
                tracing::info!(%engine, "challenge resolved");
                self.transition(&mut ctx, ChallengeState::Resolved);
                Ok(true)
            }
            Ok(Some(still)) => {
                tracing::debug!(%engine, signature = %still, "page still challenged after reload");
                Err(self.abandon(&mut ctx, "still challenged after reload"))
            }
            Err(e) => {
                self.transition(&mut ctx, ChallengeState::Abandoned);
                Err(MediationError::Reload(e))
            }
        }
    }

    fn abandon(&self, ctx: &mut ChallengeContext, reason: &str) -> MediationError {
        tracing::warn!(engine = %ctx.engine, reason, "challenge abandoned");
        self.transition(ctx, ChallengeState::Abandoned);
        MediationError::Abandoned(reason.to_string())
    }

    fn transition(&self, ctx: &mut ChallengeContext, next: ChallengeState) {
        if let Err(from) = ctx.advance(next) {
            tracing::debug!(
                engine = %ctx.engine,
                from = from.as_str(),
                to = next.as_str(),
                "ignored illegal challenge transition"
            );
            return;
        }
        self.publish(ctx);
    }

    fn publish(&self, ctx: &ChallengeContext) {
        // No subscribers is fine.
        let _ = self.events.send(ctx.event());
    }
}
