//! Host command channel and router.
//!
//! [`HostCommandClient`] submits envelopes; [`HostCommandServer`] routes
//! each one to a [`HostHandler`] on its own task, so a long `search.run`
//! never holds up a `challenge.resolve` sent while it waits for a human.

use std::sync::Arc;

use async_trait::async_trait;
use quorum_search::{ChallengeEvent, EngineId};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{QuorumError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};

/// `search.run` payload. Omitted fields take the configured defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub engines: Option<Vec<String>>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// What the router calls into.
#[async_trait]
pub trait HostHandler: Send + Sync + 'static {
    /// Run a search, returning the JSON response payload.
    async fn run_search(
        &self,
        params: SearchParams,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value>;

    fn list_history(&self) -> Result<serde_json::Value>;

    /// One saved search. Unknown ids are an error.
    fn get_history(&self, id: Uuid) -> Result<serde_json::Value>;

    fn delete_history(&self, id: Uuid) -> Result<()>;

    /// Report a challenge on `engine` as cleared. `false` if none was pending.
    fn resolve_challenge(&self, engine: EngineId) -> bool;

    /// Give up on a pending challenge. `false` if none was pending.
    fn abandon_challenge(&self, engine: EngineId) -> bool;

    /// Challenge state changes to forward as events.
    fn challenge_events(&self) -> Option<broadcast::Receiver<ChallengeEvent>> {
        None
    }
}

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<ResponseEnvelope>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
    shutdown: CancellationToken,
}

impl HostCommandClient {
    /// Submit a command and wait for its response.
    ///
    /// Envelopes that fail validation are answered directly with an error
    /// response and never reach the router.
    ///
    /// # Errors
    ///
    /// Returns [`QuorumError::Channel`] if the server has gone away.
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        if let Err(e) = envelope.validate() {
            return Ok(ResponseEnvelope::error(
                envelope.request_id,
                format!("invalid command envelope: {e}"),
            ));
        }

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| QuorumError::Channel(format!("failed to send host command request: {e}")))?;

        response_rx
            .await
            .map_err(|e| QuorumError::Channel(format!("host command response dropped: {e}")))
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Cancel every in-flight search.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether `runtime.stop` or [`shutdown`](Self::shutdown) has happened.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

pub struct HostCommandServer<H: HostHandler> {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    router: Router<H>,
}

#[must_use]
pub fn command_channel<H: HostHandler>(
    request_capacity: usize,
    event_capacity: usize,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let shutdown = CancellationToken::new();

    (
        HostCommandClient {
            request_tx,
            event_tx: event_tx.clone(),
            shutdown: shutdown.clone(),
        },
        HostCommandServer {
            request_rx,
            router: Router {
                handler: Arc::new(handler),
                event_tx,
                shutdown,
            },
        },
    )
}

impl<H: HostHandler> HostCommandServer<H> {
    /// Serve until every client is dropped, then cancel and drain in-flight
    /// commands.
    pub async fn run(mut self) {
        let forwarder = self.router.handler.challenge_events().map(|rx| {
            tokio::spawn(forward_challenge_events(rx, self.router.event_tx.clone()))
        });

        let mut in_flight = JoinSet::new();
        while let Some(request) = self.request_rx.recv().await {
            let router = self.router.clone();
            in_flight.spawn(async move {
                let response = router.respond(&request.envelope).await;
                let _ = request.response_tx.send(response);
            });
            // Reap finished commands so the set does not grow unbounded.
            while in_flight.try_join_next().is_some() {}
        }

        self.router.shutdown.cancel();
        while in_flight.join_next().await.is_some() {}
        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
    }

    /// Route a command envelope to the appropriate handler.
    pub async fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        self.router.route(envelope).await
    }
}

struct Router<H> {
    handler: Arc<H>,
    event_tx: broadcast::Sender<EventEnvelope>,
    shutdown: CancellationToken,
}

impl<H> Clone for Router<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            event_tx: self.event_tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<H: HostHandler> Router<H> {
    async fn respond(&self, envelope: &CommandEnvelope) -> ResponseEnvelope {
        self.route(envelope).await.unwrap_or_else(|e| {
            tracing::warn!(
                command = envelope.command.as_str(),
                request_id = %envelope.request_id,
                error = %e,
                "host command failed"
            );
            ResponseEnvelope::error(envelope.request_id.clone(), e.to_string())
        })
    }

    async fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        match envelope.command {
            CommandName::HostPing => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({
                    "pong": true,
                    "contract_version": crate::host::contract::EVENT_VERSION
                }),
            )),
            CommandName::SearchRun => self.handle_search_run(envelope).await,
            CommandName::HistoryList => self.handle_history_list(envelope),
            CommandName::HistoryGet => self.handle_history_get(envelope),
            CommandName::HistoryDelete => self.handle_history_delete(envelope),
            CommandName::ChallengeResolve => self.handle_challenge(envelope, true),
            CommandName::ChallengeAbandon => self.handle_challenge(envelope, false),
            CommandName::RuntimeStop => self.handle_runtime_stop(envelope),
        }
    }

    async fn handle_search_run(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        if self.shutdown.is_cancelled() {
            return Err(QuorumError::Command("runtime is stopping".to_owned()));
        }
        let params = parse_search_params(&envelope.payload)?;

        self.emit_event(
            "search.started",
            serde_json::json!({"request_id": envelope.request_id}),
        );

        let cancel = self.shutdown.child_token();
        let payload = self.handler.run_search(params, &cancel).await?;

        self.emit_event(
            "search.completed",
            serde_json::json!({
                "request_id": envelope.request_id,
                "search_id": payload.get("searchId"),
                "total_unique_results": payload.get("totalUniqueResults")
            }),
        );
        Ok(ResponseEnvelope::ok(envelope.request_id.clone(), payload))
    }

    fn handle_history_list(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let searches = self.handler.list_history()?;
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"searches": searches}),
        ))
    }

    fn handle_history_get(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let id = parse_search_id(&envelope.payload, "history.get")?;
        let record = self.handler.get_history(id)?;
        Ok(ResponseEnvelope::ok(envelope.request_id.clone(), record))
    }

    fn handle_history_delete(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let id = parse_search_id(&envelope.payload, "history.delete")?;
        self.handler.delete_history(id)?;
        self.emit_event(
            "history.deleted",
            serde_json::json!({"request_id": envelope.request_id, "id": id}),
        );
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"deleted": true, "id": id}),
        ))
    }

    fn handle_challenge(&self, envelope: &CommandEnvelope, resolve: bool) -> Result<ResponseEnvelope> {
        let command = envelope.command.as_str();
        let engine = parse_engine(&envelope.payload, command)?;
        let accepted = if resolve {
            self.handler.resolve_challenge(engine)
        } else {
            self.handler.abandon_challenge(engine)
        };
        if !accepted {
            return Err(QuorumError::Command(format!(
                "no challenge pending for {engine}"
            )));
        }
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true, "engine": engine.name()}),
        ))
    }

    fn handle_runtime_stop(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        self.shutdown.cancel();
        self.emit_event(
            "runtime.stopped",
            serde_json::json!({"request_id": envelope.request_id}),
        );
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true}),
        ))
    }

    fn emit_event(&self, event: &str, payload: serde_json::Value) {
        let envelope = EventEnvelope::new(Uuid::new_v4().to_string(), event.to_owned(), payload);
        let _ = self.event_tx.send(envelope);
    }
}

/// Republish mediator state changes as `challenge.<state>` events.
async fn forward_challenge_events(
    mut rx: broadcast::Receiver<ChallengeEvent>,
    event_tx: broadcast::Sender<EventEnvelope>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let name = format!("challenge.{}", event.state.as_str());
                match serde_json::to_value(&event) {
                    Ok(payload) => {
                        let _ = event_tx.send(EventEnvelope::new(
                            Uuid::new_v4().to_string(),
                            name,
                            payload,
                        ));
                    }
                    Err(e) => tracing::error!(error = %e, "failed to serialize challenge event"),
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "challenge event forwarder lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn parse_search_params(payload: &serde_json::Value) -> Result<SearchParams> {
    let params: SearchParams = serde_json::from_value(payload.clone())
        .map_err(|e| QuorumError::Command(format!("search.run payload: {e}")))?;
    if params.query.trim().is_empty() {
        return Err(QuorumError::Command(
            "search.run requires a non-empty payload.query".to_owned(),
        ));
    }
    Ok(params)
}

fn parse_non_empty_field(
    payload: &serde_json::Value,
    field: &str,
    command: &str,
) -> Result<String> {
    let Some(raw) = payload.get(field).and_then(serde_json::Value::as_str) else {
        return Err(QuorumError::Command(format!(
            "{command} requires payload.{field}"
        )));
    };
    let value = raw.trim();
    if value.is_empty() {
        return Err(QuorumError::Command(format!(
            "{command} requires a non-empty payload.{field}"
        )));
    }
    Ok(value.to_owned())
}

fn parse_search_id(payload: &serde_json::Value, command: &str) -> Result<Uuid> {
    let raw = parse_non_empty_field(payload, "id", command)?;
    Uuid::parse_str(&raw)
        .map_err(|e| QuorumError::Command(format!("{command} payload.id is not a UUID: {e}")))
}

fn parse_engine(payload: &serde_json::Value, command: &str) -> Result<EngineId> {
    let raw = parse_non_empty_field(payload, "engine", command)?;
    raw.parse::<EngineId>()
        .map_err(|e| QuorumError::Command(format!("{command}: {e}")))
}
