// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Egress dispatcher.
//!
//! Point-to-point messages connect out to the host's command endpoint;
//! broadcast messages fan out to whoever subscribed on the publish socket.
//! Both channels initialize lazily and live behind one lock.

use crate::message::MessageOut;
use crate::wire;
use ignite_core::Clock;
use parking_lot::Mutex as SyncMutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Settle time between binding the publish socket and the first publish, so
/// early subscribers do not miss it.
const PUB_SETTLE: Duration = Duration::from_millis(500);

struct Channels {
    push: Option<UnixStream>,
    publisher_started: bool,
}

/// Thread-safe outbound message channel to the host.
pub struct MessageDispatcher {
    push_path: PathBuf,
    pub_path: PathBuf,
    clock: Arc<dyn Clock>,
    channels: Mutex<Channels>,
    subscribers: Arc<SyncMutex<Vec<OwnedWriteHalf>>>,
}

impl MessageDispatcher {
    pub fn new(push_path: &Path, pub_path: &Path, clock: Arc<dyn Clock>) -> Self {
        Self {
            push_path: push_path.to_path_buf(),
            pub_path: pub_path.to_path_buf(),
            clock,
            channels: Mutex::new(Channels { push: None, publisher_started: false }),
            subscribers: Arc::new(SyncMutex::new(Vec::new())),
        }
    }

    /// Deliver one message. `false` when the channel rejected it or nothing
    /// was listening.
    pub async fn dispatch(&self, message: MessageOut, payload: &Value) -> bool {
        let frame = message.envelope(payload, self.clock.epoch_ms());

        let mut channels = self.channels.lock().await;
        if message.is_broadcast() {
            self.publish(&mut channels, &frame).await
        } else {
            self.deliver(&mut channels, &frame).await
        }
    }

    async fn deliver(&self, channels: &mut Channels, frame: &str) -> bool {
        // One reconnect attempt per dispatch: a fresh connection may succeed
        // where a stale one just failed.
        for _ in 0..2 {
            if channels.push.is_none() {
                match UnixStream::connect(&self.push_path).await {
                    Ok(stream) => channels.push = Some(stream),
                    Err(error) => {
                        error!(path = %self.push_path.display(), %error, "host endpoint unreachable");
                        return false;
                    }
                }
            }

            if let Some(stream) = channels.push.as_mut() {
                match wire::write_frame(stream, frame).await {
                    Ok(()) => {
                        info!(bytes = frame.len(), "message sent to host");
                        return true;
                    }
                    Err(error) => {
                        warn!(%error, "send failed, dropping connection");
                        channels.push = None;
                    }
                }
            }
        }
        false
    }

    async fn publish(&self, channels: &mut Channels, frame: &str) -> bool {
        if !channels.publisher_started {
            if let Err(error) = self.start_publisher() {
                error!(%error, "could not bind publish socket");
                return false;
            }
            channels.publisher_started = true;
            tokio::time::sleep(PUB_SETTLE).await;
        }

        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            debug!("no subscribers for broadcast");
            return false;
        }

        // Write synchronously-queued frames; a dead subscriber is dropped.
        let mut delivered = false;
        let mut kept = Vec::with_capacity(subscribers.len());
        for mut half in subscribers.drain(..) {
            let header = (frame.len() as u32).to_be_bytes();
            let writable = half.try_write(&header).is_ok() && half.try_write(frame.as_bytes()).is_ok();
            if writable {
                delivered = true;
                kept.push(half);
            } else {
                debug!("dropping dead subscriber");
            }
        }
        *subscribers = kept;
        delivered
    }

    fn start_publisher(&self) -> std::io::Result<()> {
        let _ = std::fs::remove_file(&self.pub_path);
        if let Some(parent) = self.pub_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&self.pub_path)?;
        info!(path = %self.pub_path.display(), "publish socket bound");

        let subscribers = Arc::clone(&self.subscribers);
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let (_, write_half) = stream.into_split();
                        subscribers.lock().push(write_half);
                    }
                    Err(error) => {
                        error!(%error, "publish accept failed");
                        break;
                    }
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
