use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use serde::Serialize;
use tokio::{sync::watch, time::sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Warning,
}

/// Short-lived status message for the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub tone: Tone,
    pub message: String,
}

/// Holds at most one notice at a time and clears it once its time is up.
#[derive(Clone)]
pub struct Notices {
    current: Arc<watch::Sender<Option<Notice>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new()
    }
}

impl Notices {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);

        Self {
            current: Arc::new(current),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn current(&self) -> Option<Notice> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
        self.current.subscribe()
    }

    /// Replaces the current notice. The dismiss timer only ever clears the notice it was started for. Must be
    /// called from inside a tokio runtime.
    pub fn post(&self, tone: Tone, message: impl Into<String>, dismiss_after: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.current.send_replace(Some(Notice {
            id,
            tone,
            message: message.into(),
        }));

        let current = self.current.clone();
        tokio::spawn(async move {
            sleep(dismiss_after).await;

            current.send_if_modified(|notice| {
                if notice.as_ref().is_some_and(|n| n.id == id) {
                    *notice = None;
                    return true;
                }
                false
            });
        });

        id
    }
}
