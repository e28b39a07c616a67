// src/listeners.rs

//! Subscription bookkeeping shared by the watcher and connection server.
//!
//! A listener is the sending half of an unbounded channel. Subscribing
//! returns a [`ListenerHandle`] that is the only way to remove that listener
//! again, so callers never need to reconstruct "the same callback".

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc;

/// Identifies one installed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerHandle(u64);

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Ordered set of channel listeners.
pub struct Listeners<T> {
    next: u64,
    senders: BTreeMap<ListenerHandle, mpsc::UnboundedSender<T>>,
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.senders.len())
            .finish()
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next: 0,
            senders: BTreeMap::new(),
        }
    }
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sender: mpsc::UnboundedSender<T>) -> ListenerHandle {
        self.next += 1;
        let handle = ListenerHandle(self.next);
        self.senders.insert(handle, sender);
        handle
    }

    /// Remove a listener. Returns false if it was not installed.
    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.senders.remove(&handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Hand `item` to the first listener that is still alive.
    ///
    /// Listeners whose receiver is gone are dropped along the way. Returns
    /// the item back if nobody took it.
    pub fn offer(&mut self, item: T) -> Option<T> {
        let mut item = item;
        let handles: Vec<ListenerHandle> = self.senders.keys().copied().collect();
        for handle in handles {
            let Some(sender) = self.senders.get(&handle) else {
                continue;
            };
            match sender.send(item) {
                Ok(()) => return None,
                Err(mpsc::error::SendError(returned)) => {
                    self.senders.remove(&handle);
                    item = returned;
                }
            }
        }
        Some(item)
    }
}

impl<T: Clone> Listeners<T> {
    /// Send a copy of `item` to every live listener. Returns how many got it.
    pub fn emit(&mut self, item: &T) -> usize {
        let mut delivered = 0;
        self.senders.retain(|_, sender| {
            let alive = sender.send(item.clone()).is_ok();
            delivered += usize::from(alive);
            alive
        });
        delivered
    }
}
