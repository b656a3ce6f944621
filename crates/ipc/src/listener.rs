// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingress command listener.
//!
//! A dedicated task accepts host connections and reads command frames. The
//! shutdown handshake sets a flag and sends a sentinel frame through the
//! same socket to unblock the receive, so the loop exits cleanly instead of
//! being cancelled mid-read.

use crate::command::{Command, CommandError, ShutdownState};
use crate::dispatcher::MessageDispatcher;
use crate::message::MessageOut;
use crate::wire::{self, ProtocolError};
use ignite_core::ExitType;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

const SENTINEL: &str = "msg-to-break-read-loop";

/// Agent-side operations the typed commands invoke.
pub trait DeviceCommandHandler: Send + Sync {
    fn prepare_for_shutdown(&self, timeout_s: u64, exit_on_complete: bool, exit_type: ExitType);

    fn shutdown_initiated(&self);

    /// Payload for the `ActivationStatus` reply.
    fn activation_details(&self) -> Value;

    /// Payload for the `DBSize` reply.
    fn db_size(&self) -> Value;

    /// Payload for the `MQTTConnectionStatus` reply.
    fn mqtt_status(&self) -> Value;

    /// Inject a host remote-operation response into the upload stream.
    fn remote_operation_response(&self, payload: &str);
}

/// Handle for unblocking and stopping the listener from another task.
#[derive(Clone)]
pub struct ListenerShutdown {
    socket_path: PathBuf,
    flag: Arc<AtomicBool>,
}

impl ListenerShutdown {
    /// A handle for a listener that will be bound on `socket_path`.
    ///
    /// Create the handle first, share it with whoever triggers shutdown,
    /// then attach the listener with [`CommandListener::attach`].
    pub fn new(socket_path: &Path) -> Self {
        Self { socket_path: socket_path.to_path_buf(), flag: Arc::new(AtomicBool::new(false)) }
    }

    /// Flag the listener down and poke it with a sentinel frame.
    pub async fn shutdown_notify(&self) {
        self.flag.store(true, Ordering::SeqCst);
        info!("sending sentinel to break the command read loop");
        match UnixStream::connect(&self.socket_path).await {
            Ok(mut stream) => {
                if let Err(error) = wire::write_frame(&mut stream, SENTINEL).await {
                    warn!(%error, "could not send sentinel frame");
                }
            }
            Err(error) => warn!(%error, "could not connect for sentinel"),
        }
    }
}

/// Ingress listener over the host command socket.
pub struct CommandListener {
    socket_path: PathBuf,
    ctx: Arc<ConnCtx>,
}

/// Shared context for per-connection tasks.
struct ConnCtx {
    handler: Arc<dyn DeviceCommandHandler>,
    dispatcher: Arc<MessageDispatcher>,
    shutdown: Arc<AtomicBool>,
}

impl CommandListener {
    pub fn new(
        socket_path: &Path,
        handler: Arc<dyn DeviceCommandHandler>,
        dispatcher: Arc<MessageDispatcher>,
    ) -> Self {
        Self::attach(ListenerShutdown::new(socket_path), handler, dispatcher)
    }

    /// Bind the listener to an already-shared shutdown handle.
    pub fn attach(
        shutdown: ListenerShutdown,
        handler: Arc<dyn DeviceCommandHandler>,
        dispatcher: Arc<MessageDispatcher>,
    ) -> Self {
        Self {
            socket_path: shutdown.socket_path,
            ctx: Arc::new(ConnCtx { handler, dispatcher, shutdown: shutdown.flag }),
        }
    }

    pub fn shutdown_handle(&self) -> ListenerShutdown {
        ListenerShutdown {
            socket_path: self.socket_path.clone(),
            flag: Arc::clone(&self.ctx.shutdown),
        }
    }

    /// Accept connections and process command frames until the shutdown
    /// handshake. Each connection is served by its own task so an idle host
    /// connection cannot block the sentinel.
    ///
    /// Returns cleanly after the sentinel; the caller reports readiness to
    /// the shutdown monitor.
    pub async fn run(self) -> Result<(), ProtocolError> {
        let _ = std::fs::remove_file(&self.socket_path);
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = %self.socket_path.display(), "command listener up");

        loop {
            let (stream, _) = listener.accept().await?;
            if self.ctx.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let ctx = Arc::clone(&self.ctx);
            tokio::spawn(async move { ctx.handle_connection(stream).await });
        }

        info!("command listener stopped");
        Ok(())
    }
}

impl ConnCtx {
    async fn handle_connection(&self, mut stream: UnixStream) {
        loop {
            let frame = match wire::read_frame(&mut stream).await {
                Ok(frame) => frame,
                Err(ProtocolError::ConnectionClosed) => return,
                Err(error @ ProtocolError::FrameTooLarge(_)) => {
                    warn!(%error, "rejecting oversized command frame");
                    return;
                }
                Err(error) => {
                    warn!(%error, "command read failed");
                    return;
                }
            };

            if frame == SENTINEL || self.shutdown.load(Ordering::SeqCst) {
                return;
            }

            info!(bytes = frame.len(), "command received");
            self.process(&frame).await;
        }
    }

    async fn process(&self, raw: &str) {
        match Command::parse(raw) {
            Ok(Command::ShutdownNotif { state, exit_on_complete, exit_type, timeout_s }) => {
                match state {
                    ShutdownState::Prepare => {
                        self.handler.prepare_for_shutdown(timeout_s, exit_on_complete, exit_type)
                    }
                    ShutdownState::Initiated => self.handler.shutdown_initiated(),
                }
            }
            Ok(Command::ActivationStatusQuery) => {
                let payload = self.handler.activation_details();
                if self.dispatcher.dispatch(MessageOut::ActivationDetails, &payload).await {
                    info!("activation status sent to host");
                } else {
                    error!("could not send activation status to host");
                }
            }
            Ok(Command::DbSizeQuery) => {
                let payload = self.handler.db_size();
                if !self.dispatcher.dispatch(MessageOut::DbSize, &payload).await {
                    error!("could not send db size to host");
                }
            }
            Ok(Command::MqttStatusQuery) => {
                let payload = self.handler.mqtt_status();
                if !self.dispatcher.dispatch(MessageOut::MqttConnectionStatus, &payload).await {
                    error!("could not send mqtt status to host");
                }
            }
            Ok(Command::RemoteOperationResponse { payload }) => {
                self.handler.remote_operation_response(&payload);
            }
            Err(CommandError::Unknown(name)) => info!(command = %name, "command not supported"),
            Err(error) => error!(%error, "bad command frame"),
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
