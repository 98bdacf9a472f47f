use models::{TaskEvent, TaskId};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// EventBus fans out task state transitions to connected SSE subscribers
/// (: "each task owns a pub/sub channel; every state mutation
/// publishes an event... a read-side subscriber fans out to connected
/// clients"). One `broadcast` channel per live task, created lazily on first
/// subscribe or publish.
#[derive(Default)]
pub struct EventBus {
    channels: Mutex<HashMap<TaskId, broadcast::Sender<TaskEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(&self, task_id: TaskId) -> broadcast::Receiver<TaskEvent> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(task_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish(&self, event: TaskEvent) {
        let mut channels = self.channels.lock().unwrap();
        let sender = channels
            .entry(event.task_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        // No receivers yet is not an error: the event is also persisted via
        // `TaskStore::save`, so a client that connects later still sees
        // current state through `get_task`.
        let _ = sender.send(event);
    }

    /// Drops the channel for a task once it reaches a terminal state, so the
    /// bus does not grow unbounded over the life of the server.
    pub fn retire(&self, task_id: TaskId) {
        self.channels.lock().unwrap().remove(&task_id);
    }
}
