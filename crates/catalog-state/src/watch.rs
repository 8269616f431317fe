//! Change notification for blocking queries.
//!
//! Every [`WatchKey`] maps to a one-shot channel. Read operations hand the
//! channel's receiver to the caller's [`WatchSet`]; a commit that changes
//! rows under the key drops the sender, which closes every receiver at
//! once. The next registration for the key gets a fresh channel.
//!
//! Firing carries no value and may stand for several commits. Woken
//! callers must re-run their query.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::select_all;
use tokio::sync::watch;

/// What a registration is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchKey {
    /// Any row of the table.
    Table(&'static str),
    /// Any row of the table owned by the given node.
    Prefix(&'static str, String),
}

/// Store-wide registry of open watch channels.
#[derive(Debug, Default)]
pub(crate) struct Watches {
    channels: Mutex<HashMap<WatchKey, watch::Sender<()>>>,
}

impl Watches {
    /// Get a receiver that closes the next time `key` fires.
    pub(crate) fn subscribe(&self, key: WatchKey) -> watch::Receiver<()> {
        let mut channels = self.channels.lock().expect("watch registry lock");
        channels
            .entry(key)
            .or_insert_with(|| watch::channel(()).0)
            .subscribe()
    }

    /// Close the channels of the given keys. Returns how many had waiters.
    ///
    /// Also drops channels whose receivers are all gone, so abandoned
    /// watch sets do not accumulate.
    pub(crate) fn fire<'a>(&self, keys: impl IntoIterator<Item = &'a WatchKey>) -> usize {
        let mut channels = self.channels.lock().expect("watch registry lock");
        let mut fired = 0;
        for key in keys {
            if let Some(sender) = channels.remove(key) {
                if sender.receiver_count() > 0 {
                    fired += 1;
                }
            }
        }
        channels.retain(|_, sender| sender.receiver_count() > 0);
        fired
    }

    /// Close every open channel.
    pub(crate) fn fire_all(&self) -> usize {
        let mut channels = self.channels.lock().expect("watch registry lock");
        let drained = std::mem::take(&mut *channels);
        drained
            .values()
            .filter(|sender| sender.receiver_count() > 0)
            .count()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.channels.lock().expect("watch registry lock").len()
    }
}

/// A caller-assembled set of change notifications.
///
/// Pass `Some(&mut ws)` to read operations to collect registrations, then
/// wait on the set. Pass `None` for a plain point read.
#[derive(Debug, Default)]
pub struct WatchSet {
    channels: Vec<watch::Receiver<()>>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, receiver: watch::Receiver<()>) {
        self.channels.push(receiver);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Non-blocking check: has any registration fired?
    pub fn fired(&self) -> bool {
        self.channels.iter().any(|rx| rx.has_changed().is_err())
    }

    /// Wait until any registration fires.
    ///
    /// An empty set never fires; combine with a timeout or shutdown.
    pub async fn wait(&mut self) {
        if self.channels.is_empty() {
            return std::future::pending().await;
        }
        // Senders never send, so `changed` only resolves once closed.
        let waits = self.channels.iter_mut().map(|rx| Box::pin(rx.changed()));
        let _ = select_all(waits).await;
    }

    /// Wait up to `timeout`. Returns `true` if something fired.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }

    /// Wait until something fires or `shutdown` flips to `true`.
    ///
    /// Returns `false` when cancelled. A dropped shutdown sender counts as
    /// cancellation.
    pub async fn wait_with_shutdown(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }
        tokio::select! {
            _ = self.wait() => true,
            _ = shutdown.wait_for(|stop| *stop) => false,
        }
    }
}
