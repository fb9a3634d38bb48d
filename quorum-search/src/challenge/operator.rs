//! Human operators: the visible side of challenge mediation.
//!
//! A [`HumanOperator`] opens a [`VisibleSession`] on the challenged URL and
//! reports when the human is done with it. Two operators ship:
//!
//! - [`BrowserOperator`] launches a visible browser process. The human
//!   clears the challenge and closes the window; process exit is the
//!   completion signal.
//! - [`DeskOperator`] parks the challenge on a shared [`ChallengeDesk`]
//!   until something calls [`ChallengeDesk::resolve`] or
//!   [`ChallengeDesk::abandon`] for the engine (the host bridge does this).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

use super::ChallengeContext;
use crate::error::SearchError;
use crate::types::EngineId;

/// Opens human-visible sessions for challenged pages.
#[async_trait]
pub trait HumanOperator: Send + Sync {
    /// Short identifier for logs (e.g. `browser`, `desk`).
    fn name(&self) -> &'static str;

    /// Open a visible session on `ctx.url`.
    async fn open(&self, ctx: &ChallengeContext) -> crate::Result<Box<dyn VisibleSession>>;
}

/// A session a human is interacting with.
#[async_trait]
pub trait VisibleSession: Send {
    /// Wait until the human signals completion.
    ///
    /// Returns `true` when the human reports the challenge cleared and
    /// `false` when they declined. Must be cancel-safe: the mediator races
    /// it against cancellation and the wait limit.
    async fn completion(&mut self) -> bool;

    /// Tear the session down. Called on every exit path.
    async fn close(&mut self);
}

// ---------------------------------------------------------------------------
// Browser process
// ---------------------------------------------------------------------------

/// Launches a visible browser window per challenge.
///
/// Arguments may contain `{url}`, `{width}` and `{height}` placeholders. If
/// no argument mentions `{url}`, the URL is appended as the last argument.
#[derive(Debug, Clone)]
pub struct BrowserOperator {
    program: String,
    args: Vec<String>,
}

impl BrowserOperator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn render_args(&self, ctx: &ChallengeContext) -> Vec<String> {
        let width = ctx.viewport.width.to_string();
        let height = ctx.viewport.height.to_string();
        let mut rendered: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{url}", &ctx.url)
                    .replace("{width}", &width)
                    .replace("{height}", &height)
            })
            .collect();
        if !self.args.iter().any(|arg| arg.contains("{url}")) {
            rendered.push(ctx.url.clone());
        }
        rendered
    }
}

#[async_trait]
impl HumanOperator for BrowserOperator {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn open(&self, ctx: &ChallengeContext) -> crate::Result<Box<dyn VisibleSession>> {
        let args = self.render_args(ctx);
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SearchError::Session(format!("failed to launch browser `{}`: {e}", self.program))
            })?;

        tracing::info!(
            engine = %ctx.engine,
            pid = child.id(),
            "opened visible browser for challenge"
        );
        Ok(Box::new(BrowserSession {
            engine: ctx.engine,
            child,
        }))
    }
}

struct BrowserSession {
    engine: EngineId,
    child: Child,
}

#[async_trait]
impl VisibleSession for BrowserSession {
    async fn completion(&mut self) -> bool {
        match self.child.wait().await {
            Ok(status) => {
                tracing::debug!(engine = %self.engine, %status, "visible browser exited");
                true
            }
            Err(e) => {
                tracing::warn!(engine = %self.engine, error = %e, "lost visible browser");
                false
            }
        }
    }

    async fn close(&mut self) {
        if matches!(self.child.try_wait(), Ok(Some(_))) {
            return;
        }
        // Best effort: the process may exit between the check and the kill.
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
        tracing::debug!(engine = %self.engine, "visible browser closed");
    }
}

// ---------------------------------------------------------------------------
// Desk
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DeskInner {
    next_ticket: u64,
    pending: HashMap<EngineId, (u64, oneshot::Sender<bool>)>,
}

/// Shared board of challenges waiting for an explicit human decision.
///
/// Cheap to clone; all clones see the same pending set. At most one
/// challenge per engine is pending: a newer one replaces the older, whose
/// waiter then sees a decline.
#[derive(Debug, Clone, Default)]
pub struct ChallengeDesk {
    inner: Arc<Mutex<DeskInner>>,
}

impl ChallengeDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the pending challenge for `engine` as cleared.
    ///
    /// Returns `false` if nothing was pending for that engine.
    pub fn resolve(&self, engine: EngineId) -> bool {
        self.decide(engine, true)
    }

    /// Give up on the pending challenge for `engine`.
    ///
    /// Returns `false` if nothing was pending for that engine.
    pub fn abandon(&self, engine: EngineId) -> bool {
        self.decide(engine, false)
    }

    /// Engines with a challenge currently waiting, in name order.
    pub fn pending(&self) -> Vec<EngineId> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut engines: Vec<EngineId> = inner.pending.keys().copied().collect();
        engines.sort_by_key(|e| e.name());
        engines
    }

    fn decide(&self, engine: EngineId, cleared: bool) -> bool {
        let entry = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pending
            .remove(&engine);
        match entry {
            // The receiver may already be gone if the mediator gave up first.
            Some((_, tx)) => tx.send(cleared).is_ok(),
            None => false,
        }
    }

    fn register(&self, engine: EngineId) -> (u64, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.next_ticket += 1;
        let ticket = inner.next_ticket;
        inner.pending.insert(engine, (ticket, tx));
        (ticket, rx)
    }

    fn withdraw(&self, engine: EngineId, ticket: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.pending.get(&engine).is_some_and(|(t, _)| *t == ticket) {
            inner.pending.remove(&engine);
        }
    }
}

/// Operator that waits on a [`ChallengeDesk`] decision.
#[derive(Debug, Clone, Default)]
pub struct DeskOperator {
    desk: ChallengeDesk,
}

impl DeskOperator {
    pub fn new(desk: ChallengeDesk) -> Self {
        Self { desk }
    }

    pub fn desk(&self) -> &ChallengeDesk {
        &self.desk
    }
}

#[async_trait]
impl HumanOperator for DeskOperator {
    fn name(&self) -> &'static str {
        "desk"
    }

    async fn open(&self, ctx: &ChallengeContext) -> crate::Result<Box<dyn VisibleSession>> {
        let (ticket, rx) = self.desk.register(ctx.engine);
        tracing::info!(engine = %ctx.engine, url = %ctx.url, "challenge waiting on desk");
        Ok(Box::new(DeskSession {
            desk: self.desk.clone(),
            engine: ctx.engine,
            ticket,
            rx,
        }))
    }
}

struct DeskSession {
    desk: ChallengeDesk,
    engine: EngineId,
    ticket: u64,
    rx: oneshot::Receiver<bool>,
}

#[async_trait]
impl VisibleSession for DeskSession {
    async fn completion(&mut self) -> bool {
        // A dropped sender means the ticket was replaced: treat as declined.
        (&mut self.rx).await.unwrap_or(false)
    }

    async fn close(&mut self) {
        self.desk.withdraw(self.engine, self.ticket);
    }
}

impl Drop for DeskSession {
    fn drop(&mut self) {
        self.desk.withdraw(self.engine, self.ticket);
    }
}
