//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! dispatches them through the `HostCommandServer` router, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages as newline-delimited
//! JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::error::{QuorumError, Result};
use crate::host::channel::{HostCommandClient, HostHandler, command_channel};
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};

/// Default request channel capacity for the stdio bridge.
const REQUEST_CAPACITY: usize = 64;

/// Default event broadcast channel capacity for the stdio bridge.
const EVENT_CAPACITY: usize = 128;

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run the bridge on the process's stdin and stdout.
pub async fn run_stdio_bridge<H: HostHandler>(handler: H) -> Result<()> {
    run_bridge(tokio::io::stdin(), tokio::io::stdout(), handler).await
}

/// Run the JSON bridge until `input` closes or a `runtime.stop` command is
/// received.
///
/// Three kinds of task operate in parallel:
///
/// 1. **Reader** -- reads newline-delimited JSON from `input` and spawns
///    one task per `CommandEnvelope` that awaits its response and writes it.
///    Commands therefore complete out of order; a pending `search.run` does
///    not block a `challenge.resolve` sent after it.
/// 2. **Event forwarder** -- receives broadcast `EventEnvelope` messages
///    and writes them as JSON lines.
/// 3. **Server** -- runs the `HostCommandServer` router loop.
///
/// On exit, in-flight searches are cancelled and their responses are still
/// written before the function returns.
pub async fn run_bridge<R, W, H>(input: R, output: W, handler: H) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    H: HostHandler,
{
    let (client, server) = command_channel(REQUEST_CAPACITY, EVENT_CAPACITY, handler);
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(output)));

    let server_handle = tokio::spawn(server.run());

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event_envelope) => match serde_json::to_string(&event_envelope) {
                    Ok(json) => {
                        if let Err(e) = write_line(&event_writer, &json).await {
                            tracing::warn!(
                                error = %e,
                                "failed to write event envelope; stopping event forwarder"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    tracing::info!("event broadcast channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let mut in_flight = JoinSet::new();
    let reader_result = run_reader(input, &client, &writer, &mut in_flight).await;

    // Stop in-flight searches and let them answer before tearing down.
    client.shutdown();
    while in_flight.join_next().await.is_some() {}
    drop(client);
    let _ = server_handle.await;

    event_handle.abort();
    let _ = event_handle.await;

    reader_result
}

/// Read `input` line-by-line and dispatch each command on its own task.
async fn run_reader<R, W>(
    input: R,
    client: &HostCommandClient,
    writer: &SharedWriter<W>,
    in_flight: &mut JoinSet<()>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(input);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| QuorumError::Channel(format!("failed to read from stdin: {e}")))?;

        // EOF
        if bytes_read == 0 {
            tracing::info!("stdin closed (EOF); shutting down bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse command envelope");
                let error_response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(writer, &error_response).await?;
                continue;
            }
        };

        if envelope.command == CommandName::RuntimeStop {
            let response = dispatch(client, envelope).await;
            write_response(writer, &response).await?;
            tracing::info!("runtime.stop received; shutting down bridge");
            break;
        }

        let client = client.clone();
        let writer = Arc::clone(writer);
        in_flight.spawn(async move {
            let response = dispatch(&client, envelope).await;
            if let Err(e) = write_response(&writer, &response).await {
                tracing::warn!(error = %e, "failed to write response envelope");
            }
        });
        // Reap finished commands so the set does not grow unbounded.
        while in_flight.try_join_next().is_some() {}
    }

    Ok(())
}

async fn dispatch(client: &HostCommandClient, envelope: CommandEnvelope) -> ResponseEnvelope {
    let request_id = envelope.request_id.clone();
    match client.send(envelope).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, "host command dispatch failed");
            ResponseEnvelope::error(request_id, format!("dispatch failed: {e}"))
        }
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &SharedWriter<W>,
    response: &ResponseEnvelope,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| QuorumError::Channel(format!("failed to serialize response envelope: {e}")))?;
    write_line(writer, &json).await
}

/// Write a single JSON line to the shared writer and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &SharedWriter<W>, json: &str) -> Result<()> {
    let mut w = writer.lock().await;
    w.write_all(json.as_bytes())
        .await
        .map_err(|e| QuorumError::Channel(format!("failed to write to stdout: {e}")))?;
    w.write_all(b"\n")
        .await
        .map_err(|e| QuorumError::Channel(format!("failed to write newline to stdout: {e}")))?;
    w.flush()
        .await
        .map_err(|e| QuorumError::Channel(format!("failed to flush stdout: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::contract::EVENT_VERSION;

    #[test]
    fn parse_error_response_is_well_formed() {
        let resp = ResponseEnvelope::error("parse-error", "bad json");
        assert!(!resp.ok);
        assert_eq!(resp.request_id, "parse-error");
        assert_eq!(resp.v, EVENT_VERSION);
        assert!(resp.error.is_some());
    }

    #[test]
    fn command_envelope_roundtrip_json() {
        let envelope = CommandEnvelope::new("req-1", CommandName::HostPing, serde_json::json!({}));
        let json = serde_json::to_string(&envelope).expect("serialize in test");
        let parsed: CommandEnvelope = serde_json::from_str(&json).expect("deserialize in test");
        assert_eq!(parsed, envelope);
    }
}
