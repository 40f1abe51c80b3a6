//! Navigation-start signal from the host page's router.
//!
//! The router owns a [`NavigationEvents`] and calls [`NavigationEvents::emit`]
//! whenever a route change begins. Listeners are registered with
//! [`NavigationEvents::subscribe`] and unregistered when dropped.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationStart;

#[derive(Debug, Clone)]
pub struct NavigationEvents {
    sender: broadcast::Sender<NavigationStart>,
}

impl Default for NavigationEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Signals a navigation start. Returns how many listeners were notified.
    pub fn emit(&self) -> usize {
        self.sender.send(NavigationStart).unwrap_or(0)
    }

    pub fn subscribe(&self) -> NavigationListener {
        NavigationListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A registered listener. Dropping it removes the registration.
#[derive(Debug)]
pub struct NavigationListener {
    receiver: broadcast::Receiver<NavigationStart>,
}

impl NavigationListener {
    /// Waits for the next navigation start. `None` once the router is gone.
    pub async fn recv(&mut self) -> Option<NavigationStart> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            // Missed some signals, but at least one navigation happened.
            Err(RecvError::Lagged(_)) => Some(NavigationStart),
            Err(RecvError::Closed) => None,
        }
    }
}
