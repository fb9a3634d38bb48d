//! Challenge mediation.
//!
//! When a session lands on an anti-automation challenge, the mediator walks
//! it through a small state machine:
//!
//! ```text
//! Normal -> ChallengeDetected -> AwaitingHuman -> Resolved
//!                                              \-> Abandoned
//! ```
//!
//! `AwaitingHuman` is the only place the core blocks on something other
//! than the network. The wait is bounded by a configured limit and by the
//! caller's cancellation token, and the visible session opened for the
//! human is always torn down when it ends.

pub mod detect;
pub mod mediator;
pub mod operator;

pub use detect::detect_challenge;
pub use mediator::ChallengeMediator;
pub use operator::{BrowserOperator, ChallengeDesk, DeskOperator, HumanOperator, VisibleSession};

use serde::Serialize;

use crate::error::AdapterError;
use crate::session::Viewport;
use crate::types::EngineId;

/// Where a session is in the mediation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeState {
    Normal,
    #[serde(rename = "detected")]
    ChallengeDetected,
    AwaitingHuman,
    Resolved,
    Abandoned,
}

impl ChallengeState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: ChallengeState) -> bool {
        use ChallengeState::*;
        matches!(
            (self, next),
            (Normal, ChallengeDetected)
                | (ChallengeDetected, AwaitingHuman)
                | (ChallengeDetected, Abandoned)
                | (AwaitingHuman, Resolved)
                | (AwaitingHuman, Abandoned)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ChallengeState::Resolved | ChallengeState::Abandoned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeState::Normal => "normal",
            ChallengeState::ChallengeDetected => "detected",
            ChallengeState::AwaitingHuman => "awaiting_human",
            ChallengeState::Resolved => "resolved",
            ChallengeState::Abandoned => "abandoned",
        }
    }
}

/// Transient record of one challenge being mediated. Never persisted.
#[derive(Debug, Clone)]
pub struct ChallengeContext {
    pub engine: EngineId,
    pub session_id: u64,
    /// The challenged URL, which the visible session is opened on.
    pub url: String,
    /// Which detection heuristic matched.
    pub signature: String,
    /// Window size for the visible session.
    pub viewport: Viewport,
    state: ChallengeState,
}

impl ChallengeContext {
    pub fn new(
        engine: EngineId,
        session_id: u64,
        url: impl Into<String>,
        signature: impl Into<String>,
        viewport: Viewport,
    ) -> Self {
        Self {
            engine,
            session_id,
            url: url.into(),
            signature: signature.into(),
            viewport,
            state: ChallengeState::ChallengeDetected,
        }
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    /// Move to `next`, refusing illegal transitions.
    ///
    /// # Errors
    ///
    /// Returns the current state if the transition is not allowed.
    pub fn advance(&mut self, next: ChallengeState) -> Result<(), ChallengeState> {
        if !self.state.can_advance_to(next) {
            return Err(self.state);
        }
        self.state = next;
        Ok(())
    }

    /// Event describing the context in its current state.
    pub fn event(&self) -> ChallengeEvent {
        ChallengeEvent {
            engine: self.engine,
            url: self.url.clone(),
            signature: self.signature.clone(),
            state: self.state,
        }
    }
}

/// Published on every mediation state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeEvent {
    pub engine: EngineId,
    pub url: String,
    pub signature: String,
    pub state: ChallengeState,
}

/// Why a mediation did not end in `Resolved`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediationError {
    /// The human did not clear the challenge: cancelled, timed out, declined,
    /// or the page was still challenged after the reload.
    #[error("challenge abandoned: {0}")]
    Abandoned(String),

    /// The visible session could not be opened or driven.
    #[error("operator failed: {0}")]
    Operator(String),

    /// The automated session could not reload the original page.
    #[error("reload failed: {0}")]
    Reload(AdapterError),
}
