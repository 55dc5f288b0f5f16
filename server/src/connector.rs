//! JSON-lines connector: one [`SyncMessage`] per line in each direction.
//!
//! Requests are read from the input and forwarded to the event loop one at
//! a time. State updates published while a request ran are written before
//! its reply, so a client always sees the new state first.

use anyhow::{Context, Result};
use carta_sync::{EventLoopHandle, SyncBridge, SyncError, SyncMessage};
use carta_types::{ObjectPath, SessionId};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, info, warn};

/// Serves one client until its input closes.
pub async fn serve<R, W>(handle: EventLoopHandle, bridge: Arc<SyncBridge>, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let session = SessionId::new();
    let mut connection = Connection {
        handle,
        session,
        updates: Some(bridge.subscribe()),
        writer,
    };
    info!(session = %session, "Client connected");
    connection.write(&SyncMessage::hello(session)).await?;

    let mut lines = reader.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read request")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = connection.handle_line(&line).await;
                connection.drain_updates().await?;
                connection.write(&reply).await?;
            }
            update = recv_update(&mut connection.updates) => {
                if let Some(message) = update {
                    connection.write(&message).await?;
                }
            }
        }
    }
    connection.drain_updates().await?;
    info!(session = %session, "Client disconnected");
    Ok(())
}

struct Connection<W> {
    handle: EventLoopHandle,
    session: SessionId,
    /// `None` once the bridge is gone.
    updates: Option<broadcast::Receiver<SyncMessage>>,
    writer: W,
}

impl<W: AsyncWrite + Unpin> Connection<W> {
    async fn handle_line(&self, line: &str) -> SyncMessage {
        match serde_json::from_str::<SyncMessage>(line) {
            Ok(message) => self
                .handle_message(message)
                .await
                .unwrap_or_else(|err| SyncMessage::error(err.to_string())),
            Err(err) => {
                warn!(session = %self.session, error = %err, "Malformed request");
                SyncMessage::error(format!("malformed request: {err}"))
            }
        }
    }

    async fn handle_message(&self, message: SyncMessage) -> Result<SyncMessage, SyncError> {
        match message {
            SyncMessage::Command(mut request) => {
                request.session_id = request.session_id.or(Some(self.session));
                let response = self.handle.command(request).await?;
                Ok(SyncMessage::CommandResult(response))
            }
            SyncMessage::Link { host, target } => {
                let changed = self.handle.link(host.clone(), target.clone()).await?;
                Ok(link_result(host, target, changed))
            }
            SyncMessage::Unlink { host, target } => {
                let changed = self.handle.unlink(host.clone(), target.clone()).await?;
                Ok(link_result(host, target, changed))
            }
            SyncMessage::SnapshotRequest { view } => {
                let document = self.handle.snapshot(view).await?;
                Ok(SyncMessage::Snapshot { view, document })
            }
            other => Err(SyncError::Protocol(format!(
                "unexpected message from client: {}",
                message_kind(&other)
            ))),
        }
    }

    /// Writes every update already queued on the bridge.
    async fn drain_updates(&mut self) -> Result<()> {
        loop {
            let Some(updates) = self.updates.as_mut() else {
                return Ok(());
            };
            match updates.try_recv() {
                Ok(message) => self.write(&message).await?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(session = %self.session, missed, "Client fell behind on state updates");
                }
                Err(TryRecvError::Closed) => {
                    self.updates = None;
                    return Ok(());
                }
            }
        }
    }

    async fn write(&mut self, message: &SyncMessage) -> Result<()> {
        let mut line = serde_json::to_vec(message).context("Failed to encode message")?;
        line.push(b'\n');
        self.writer.write_all(&line).await.context("Failed to write message")?;
        self.writer.flush().await.context("Failed to flush output")?;
        Ok(())
    }
}

/// Next update from the bridge. Pends forever once the bridge is gone.
async fn recv_update(updates: &mut Option<broadcast::Receiver<SyncMessage>>) -> Option<SyncMessage> {
    let Some(receiver) = updates.as_mut() else {
        return std::future::pending().await;
    };
    match receiver.recv().await {
        Ok(message) => Some(message),
        Err(RecvError::Lagged(missed)) => {
            warn!(missed, "Client fell behind on state updates");
            None
        }
        Err(RecvError::Closed) => {
            debug!("State bridge closed");
            *updates = None;
            None
        }
    }
}

fn link_result(host: ObjectPath, target: ObjectPath, changed: bool) -> SyncMessage {
    SyncMessage::LinkResult { host, target, changed }
}

fn message_kind(message: &SyncMessage) -> &'static str {
    match message {
        SyncMessage::Hello { .. } => "hello",
        SyncMessage::Command(_) => "command",
        SyncMessage::CommandResult(_) => "commandResult",
        SyncMessage::Link { .. } => "link",
        SyncMessage::Unlink { .. } => "unlink",
        SyncMessage::LinkResult { .. } => "linkResult",
        SyncMessage::SnapshotRequest { .. } => "snapshotRequest",
        SyncMessage::Snapshot { .. } => "snapshot",
        SyncMessage::StateUpdate(_) => "stateUpdate",
        SyncMessage::Error { .. } => "error",
    }
}
