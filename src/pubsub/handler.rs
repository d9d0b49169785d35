//! Acknowledge / negative-acknowledge strategy around user callbacks.
//!
//! Per message the handler walks
//! `received -> (pre-acked) -> callback-running -> {acked | nacked}`.
//! There are no callback-level retries: a nack hands redelivery to the bus.

use crate::cloud::traits::{CloudIOError, CloudResult, ErrorKind, JsonMap};
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error};

/// User callback invoked with each decoded payload
pub type MessageCallback = Arc<dyn Fn(JsonMap) -> anyhow::Result<()> + Send + Sync>;

/// When the message is acknowledged relative to the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    /// Ack on receipt. For callbacks that may outlive the ack deadline; a failed
    /// callback is logged and the message is not redelivered (at-most-once).
    BeforeCallback,
    /// Ack after the callback succeeds, nack when it fails (at-least-once).
    #[default]
    AfterCallback,
}

/// Settles one delivered message with the bus
pub trait AckHandle {
    /// # Errors
    ///
    /// Returns an error if the bus rejects the acknowledgment
    fn ack(&self) -> CloudResult<()>;

    /// # Errors
    ///
    /// Returns an error if the bus rejects the negative acknowledgment
    fn nack(&self) -> CloudResult<()>;
}

/// How a single message was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Acked,
    Nacked,
    /// Acked on receipt, then the callback failed
    AckedBeforeFailure,
    /// The bus rejected the ack or nack
    AckFailed,
}

#[derive(Clone)]
pub struct MessageHandler {
    callback: MessageCallback,
    mode: AckMode,
}

impl MessageHandler {
    pub fn new<F>(callback: F, mode: AckMode) -> Self
    where
        F: Fn(JsonMap) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::from_callback(Arc::new(callback), mode)
    }

    #[must_use]
    pub fn from_callback(callback: MessageCallback, mode: AckMode) -> Self {
        Self { callback, mode }
    }

    #[must_use]
    pub const fn mode(&self) -> AckMode {
        self.mode
    }

    /// Decode `data`, run the callback and settle the message through `acker`.
    ///
    /// A body that is not a UTF-8 JSON object counts as a callback failure, and so
    /// does a panicking callback.
    pub fn handle(&self, data: &[u8], acker: &dyn AckHandle) -> MessageOutcome {
        if self.mode == AckMode::BeforeCallback
            && let Err(err) = acker.ack()
        {
            error!(error = %err, "cannot acknowledge message before callback");
            return MessageOutcome::AckFailed;
        }

        let result = decode_payload(data)
            .map_err(anyhow::Error::from)
            .and_then(|payload| self.invoke(payload));

        match (self.mode, result) {
            (AckMode::AfterCallback, Ok(())) => match acker.ack() {
                Ok(()) => {
                    debug!("message acknowledged");
                    MessageOutcome::Acked
                }
                Err(err) => {
                    error!(error = %err, "cannot acknowledge message");
                    MessageOutcome::AckFailed
                }
            },
            (AckMode::AfterCallback, Err(err)) => {
                error!(error = %format!("{err:#}"), "error on message callback (nack)");
                match acker.nack() {
                    Ok(()) => MessageOutcome::Nacked,
                    Err(nack_err) => {
                        error!(error = %nack_err, "cannot negatively acknowledge message");
                        MessageOutcome::AckFailed
                    }
                }
            }
            (AckMode::BeforeCallback, Ok(())) => {
                debug!("message processed after early acknowledgment");
                MessageOutcome::Acked
            }
            (AckMode::BeforeCallback, Err(err)) => {
                error!(error = %format!("{err:#}"), "error on message callback (already acked)");
                MessageOutcome::AckedBeforeFailure
            }
        }
    }

    fn invoke(&self, payload: JsonMap) -> anyhow::Result<()> {
        catch_unwind(AssertUnwindSafe(|| (self.callback)(payload))).unwrap_or_else(|_| {
            Err(CloudIOError::new(ErrorKind::Callback, "message callback panicked").into())
        })
    }
}

/// Parse a message body as a UTF-8 JSON object.
///
/// # Errors
///
/// Returns a `Serialization` error for invalid UTF-8, invalid JSON, or JSON that is
/// not an object
pub fn decode_payload(data: &[u8]) -> CloudResult<JsonMap> {
    let text = std::str::from_utf8(data)
        .map_err(|e| CloudIOError::new(ErrorKind::Serialization, e.to_string()))?;
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(CloudIOError::new(
            ErrorKind::Serialization,
            format!("message body is not a JSON object: {other}"),
        )),
    }
}
