use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::{sync::watch, task::AbortHandle};

pub const DISMISS_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error(String),
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Success | RequestStatus::Error(_))
    }

    /// What the notification banner shows; nothing while idle.
    pub fn notification(&self) -> Option<Notification> {
        let (status, title, message) = match self {
            RequestStatus::Idle => return None,
            RequestStatus::Pending => ("pending", "Sending message...", "Your message is on its way!"),
            RequestStatus::Success => ("success", "Success!", "Message sent successfully!"),
            RequestStatus::Error(message) => ("error", "Error!", message.as_str()),
        };
        Some(Notification {
            status,
            title: title.to_string(),
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub status: &'static str,
    pub title: String,
    pub message: String,
}

/// Request status for one form. Terminal statuses reset to `Idle` after the
/// dismiss delay; a newer status or dropping the notifier cancels the timer.
pub struct Notifier {
    status: Arc<watch::Sender<RequestStatus>>,
    // Bumped on every change, always under the watch lock.
    epoch: Arc<AtomicU64>,
    dismiss: Mutex<Option<AbortHandle>>,
    dismiss_after: Duration,
}

impl Notifier {
    pub fn new(dismiss_after: Duration) -> Self {
        let (tx, _rx) = watch::channel(RequestStatus::Idle);
        Self {
            status: Arc::new(tx),
            epoch: Arc::new(AtomicU64::new(0)),
            dismiss: Mutex::new(None),
            dismiss_after,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestStatus> {
        self.status.subscribe()
    }

    #[cfg(test)]
    pub fn status(&self) -> RequestStatus {
        self.status.borrow().clone()
    }

    /// Moves to `Pending`. Returns false, changing nothing, when a request is
    /// already pending.
    pub fn begin(&self) -> bool {
        let epoch = &self.epoch;
        let started = self.status.send_if_modified(|status| {
            if *status == RequestStatus::Pending {
                return false;
            }
            *status = RequestStatus::Pending;
            epoch.fetch_add(1, Ordering::SeqCst);
            true
        });
        if started {
            self.cancel_dismiss();
        }
        started
    }

    /// Sets a terminal status and arms the dismiss timer.
    pub fn finish(&self, outcome: RequestStatus) {
        debug_assert!(outcome.is_terminal());
        let mut armed_epoch = 0;
        self.status.send_modify(|status| {
            *status = outcome;
            armed_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        });
        self.arm_dismiss(armed_epoch);
    }

    fn arm_dismiss(&self, armed_epoch: u64) {
        let status = Arc::clone(&self.status);
        let epoch = Arc::clone(&self.epoch);
        let delay = self.dismiss_after;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            status.send_if_modified(|current| {
                if epoch.load(Ordering::SeqCst) != armed_epoch || !current.is_terminal() {
                    return false;
                }
                *current = RequestStatus::Idle;
                epoch.fetch_add(1, Ordering::SeqCst);
                true
            });
        });

        if let Ok(mut slot) = self.dismiss.lock() {
            if let Some(previous) = slot.replace(task.abort_handle()) {
                previous.abort();
            }
        }
    }

    fn cancel_dismiss(&self) {
        if let Ok(mut slot) = self.dismiss.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DISMISS_AFTER)
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.cancel_dismiss();
    }
}
