//! Single-consumer event queue that owns the object registry.
//!
//! Every remote request becomes one [`Event`]. The loop applies events in
//! arrival order and each runs to completion, including the flush and
//! change notifications it triggers, before the next one starts.

use crate::error::{SyncError, SyncResult};
use crate::protocol::{CommandRequest, CommandResponse};
use carta_hooks::{Hook, HookDispatcher};
use carta_object::ObjectRegistry;
use carta_state::SnapshotView;
use carta_types::ObjectPath;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

type HookJob = Box<dyn FnOnce(&HookDispatcher) + Send>;
type RegistryJob = Box<dyn FnOnce(&mut ObjectRegistry) + Send>;

/// Work queued for the event loop.
pub enum Event {
    Command {
        request: CommandRequest,
        reply: oneshot::Sender<CommandResponse>,
    },
    Link {
        host: ObjectPath,
        target: ObjectPath,
        reply: oneshot::Sender<SyncResult<bool>>,
    },
    Unlink {
        host: ObjectPath,
        target: ObjectPath,
        reply: oneshot::Sender<SyncResult<bool>>,
    },
    /// Runs a hook dispatch on the loop.
    Hook(HookJob),
    /// Runs arbitrary registry work on the loop.
    Invoke(RegistryJob),
    Snapshot {
        view: SnapshotView,
        reply: oneshot::Sender<Value>,
    },
    Shutdown,
}

pub struct EventLoop {
    registry: ObjectRegistry,
    events: mpsc::Receiver<Event>,
}

impl EventLoop {
    pub fn new(registry: ObjectRegistry, capacity: usize) -> (Self, EventLoopHandle) {
        let (sender, events) = mpsc::channel(capacity.max(1));
        (Self { registry, events }, EventLoopHandle { sender })
    }

    /// Processes events until a `Shutdown` arrives or every handle is
    /// dropped, then destroys all objects.
    pub async fn run(mut self) {
        info!(objects = self.registry.live_count(), "Event loop started");
        while let Some(event) = self.events.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        self.events.close();
        self.registry.shutdown();
        info!("Event loop stopped");
    }

    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Command { request, reply } => {
                let response = match self.registry.dispatch(
                    &request.path,
                    &request.command,
                    &request.params,
                    request.session_id,
                ) {
                    Ok(result) => CommandResponse::completed(&request, result),
                    Err(err) => CommandResponse::failed(&request, err),
                };
                respond(reply, response);
            }
            Event::Link { host, target, reply } => {
                respond(reply, self.registry.link(&host, &target).map_err(SyncError::from));
            }
            Event::Unlink { host, target, reply } => {
                respond(reply, self.registry.unlink(&host, &target).map_err(SyncError::from));
            }
            Event::Hook(job) => job(self.registry.hooks()),
            Event::Invoke(job) => job(&mut self.registry),
            Event::Snapshot { view, reply } => respond(reply, self.registry.snapshot(view)),
            Event::Shutdown => {
                debug!("Shutdown requested");
                return false;
            }
        }
        true
    }
}

fn respond<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        debug!("Requester went away before the reply");
    }
}

/// Cloneable sender side of the event loop.
#[derive(Clone)]
pub struct EventLoopHandle {
    sender: mpsc::Sender<Event>,
}

impl EventLoopHandle {
    pub async fn command(&self, request: CommandRequest) -> SyncResult<CommandResponse> {
        let (reply, response) = oneshot::channel();
        self.send(Event::Command { request, reply }).await?;
        response.await.map_err(|_| SyncError::ChannelClosed)
    }

    pub async fn link(&self, host: ObjectPath, target: ObjectPath) -> SyncResult<bool> {
        let (reply, response) = oneshot::channel();
        self.send(Event::Link { host, target, reply }).await?;
        response.await.map_err(|_| SyncError::ChannelClosed)?
    }

    pub async fn unlink(&self, host: ObjectPath, target: ObjectPath) -> SyncResult<bool> {
        let (reply, response) = oneshot::channel();
        self.send(Event::Unlink { host, target, reply }).await?;
        response.await.map_err(|_| SyncError::ChannelClosed)?
    }

    pub async fn snapshot(&self, view: SnapshotView) -> SyncResult<Value> {
        let (reply, response) = oneshot::channel();
        self.send(Event::Snapshot { view, reply }).await?;
        response.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Dispatches hook `H` on the loop and returns the first plugin's
    /// output.
    pub async fn call_hook<H: Hook>(&self, params: H::Params) -> SyncResult<H::Output> {
        let (reply, response) = oneshot::channel();
        let job: HookJob = Box::new(move |hooks| respond(reply, hooks.call::<H>(params)));
        self.send(Event::Hook(job)).await?;
        Ok(response.await.map_err(|_| SyncError::ChannelClosed)??)
    }

    /// Runs `f` against the registry on the loop.
    pub async fn with_registry<R, F>(&self, f: F) -> SyncResult<R>
    where
        F: FnOnce(&mut ObjectRegistry) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: RegistryJob = Box::new(move |registry| respond(reply, f(registry)));
        self.send(Event::Invoke(job)).await?;
        response.await.map_err(|_| SyncError::ChannelClosed)
    }

    pub async fn shutdown(&self) -> SyncResult<()> {
        self.send(Event::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, event: Event) -> SyncResult<()> {
        self.sender
            .send(event)
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }
}
