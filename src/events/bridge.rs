use crate::events::AgentEvent;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Producer half of the worker-to-observer channel. Unbounded and FIFO:
/// enqueueing never blocks the worker, and events arrive in send order.
#[derive(Debug, Clone)]
pub struct EventBridge {
    tx: Sender<AgentEvent>,
}

/// Consumer half. Owned by the observer loop; drains at its own pace.
#[derive(Debug)]
pub struct EventDrain {
    rx: Receiver<AgentEvent>,
}

pub fn event_channel() -> (EventBridge, EventDrain) {
    let (tx, rx) = mpsc::channel();
    (EventBridge { tx }, EventDrain { rx })
}

impl EventBridge {
    /// A departed observer is not an error for the worker: the run keeps
    /// going and the event is dropped.
    pub fn send(&self, event: AgentEvent) {
        let _ = self.tx.send(event);
    }
}

impl EventDrain {
    /// Bounded wait for the next event, so the observer never busy-spins and
    /// never blocks past its poll interval.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<AgentEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Everything currently queued, without blocking.
    pub fn drain_available(&self) -> Vec<AgentEvent> {
        self.rx.try_iter().collect()
    }
}
