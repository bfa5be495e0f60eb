//! Bus abstraction layer: wraps `tokio::sync::broadcast` so actors never
//! touch the broadcast types directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use gamewheel::{GamewheelEvent, GamewheelMessage};

/// Channel capacity for the unified bus.
pub const BUS_CAPACITY: usize = 1024;

/// Error from `BusReceiver::poll()`: the bus is closed or the actor's
/// shutdown flag is set.
#[derive(Debug)]
pub enum PollError {
    Shutdown,
}

// ---------------------------------------------------------------------------
// BusSender
// ---------------------------------------------------------------------------

/// Cloneable sender that stamps `source` on every outbound message.
#[derive(Clone)]
pub struct BusSender {
    actor_id: String,
    inner: broadcast::Sender<GamewheelMessage>,
    shutdown: Arc<AtomicBool>,
}

impl BusSender {
    pub fn new(
        actor_id: String,
        inner: broadcast::Sender<GamewheelMessage>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            actor_id,
            inner,
            shutdown,
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// The underlying broadcast sender (the web layer subscribes per request).
    pub fn raw_sender(&self) -> &broadcast::Sender<GamewheelMessage> {
        &self.inner
    }

    pub fn send(&self, mut msg: GamewheelMessage) {
        msg.source = self.actor_id.clone();
        let _ = self.inner.send(msg);
    }

    pub fn emit(&self, event: impl Into<GamewheelEvent>) {
        self.send(GamewheelMessage::new(event));
    }

    /// New receiver sharing this sender's shutdown flag.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver {
            inner: self.inner.subscribe(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

// ---------------------------------------------------------------------------
// BusReceiver
// ---------------------------------------------------------------------------

pub struct BusReceiver {
    inner: broadcast::Receiver<GamewheelMessage>,
    shutdown: Arc<AtomicBool>,
}

impl BusReceiver {
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Non-blocking drain: the next message, `Ok(None)` if empty, or
    /// `Err(PollError::Shutdown)` once the bus closes or shutdown is flagged.
    pub fn poll(&mut self) -> Result<Option<GamewheelMessage>, PollError> {
        if self.is_shutdown() {
            return Err(PollError::Shutdown);
        }
        loop {
            match self.inner.try_recv() {
                Ok(msg) => return Ok(Some(msg)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(PollError::Shutdown),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("bus: lagged, dropped {n} events");
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamewheel::WheelAction;

    #[test]
    fn sender_stamps_source() {
        let (tx, _) = broadcast::channel(8);
        let shutdown = Arc::new(AtomicBool::new(false));
        let sender = BusSender::new("system".into(), tx, Arc::clone(&shutdown));
        let mut rx = sender.subscribe();

        sender.emit(WheelAction::Refresh);
        let msg = rx.poll().unwrap().unwrap();
        assert_eq!(msg.source, "system");
        assert!(rx.poll().unwrap().is_none());

        shutdown.store(true, Ordering::Relaxed);
        assert!(matches!(rx.poll(), Err(PollError::Shutdown)));
    }
}
