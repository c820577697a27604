use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use brigade_core::{AlertId, Payload, Priority};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

/// One entry of the in-app alert panel.
#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    pub id: AlertId,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    /// Notification type that produced the alert, if any.
    pub category: Option<String>,
    pub details: Option<Payload>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: AlertId::new(),
            title: title.into(),
            message: message.into(),
            priority,
            category: None,
            details: None,
            created_at: Utc::now(),
            read: false,
        }
    }

    /// Error alerts stay until dismissed.
    pub fn is_sticky(&self) -> bool {
        self.priority == Priority::Error
    }
}

struct Slot {
    alert: Alert,
    expires_at: Option<Instant>,
}

/// Capped, newest-first alert buffer with timed expiry.
///
/// Non-sticky alerts expire after the display window. When pushed from inside a
/// tokio runtime a timer task removes them on time; every read also prunes
/// anything already past its deadline.
pub struct AlertBuffer {
    capacity: usize,
    display_window: Duration,
    slots: Mutex<VecDeque<Slot>>,
    tx: watch::Sender<Vec<Alert>>,
}

impl AlertBuffer {
    pub fn new(capacity: usize, display_window: Duration) -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            capacity: capacity.max(1),
            display_window,
            slots: Mutex::new(VecDeque::new()),
            tx,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert `alert` as the newest entry, evicting the oldest past capacity.
    pub fn push(self: &Arc<Self>, alert: Alert) {
        let expires_at = (!alert.is_sticky()).then(|| Instant::now() + self.display_window);
        let id = alert.id.clone();
        self.mutate(|slots| {
            slots.push_front(Slot { alert, expires_at });
            slots.truncate(self.capacity);
            true
        });

        if let Some(deadline) = expires_at {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let buffer: Weak<Self> = Arc::downgrade(self);
                let _ = handle.spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    if let Some(buffer) = buffer.upgrade() {
                        buffer.expire(&id);
                    }
                });
            }
        }
    }

    pub fn dismiss(&self, id: &AlertId) -> bool {
        self.mutate(|slots| {
            let before = slots.len();
            slots.retain(|s| &s.alert.id != id);
            slots.len() != before
        })
    }

    pub fn mark_read(&self, id: &AlertId) -> bool {
        self.mutate(|slots| {
            match slots.iter_mut().find(|s| &s.alert.id == id) {
                Some(slot) if !slot.alert.read => {
                    slot.alert.read = true;
                    true
                }
                _ => false,
            }
        })
    }

    pub fn mark_all_read(&self) {
        self.mutate(|slots| {
            let mut changed = false;
            for slot in slots.iter_mut().filter(|s| !s.alert.read) {
                slot.alert.read = true;
                changed = true;
            }
            changed
        });
    }

    pub fn clear(&self) {
        self.mutate(|slots| {
            let had_any = !slots.is_empty();
            slots.clear();
            had_any
        });
    }

    pub fn unread_count(&self) -> usize {
        self.read_pruned(|slots| slots.iter().filter(|s| !s.alert.read).count())
    }

    pub fn len(&self) -> usize {
        self.read_pruned(VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current alerts, newest first.
    pub fn snapshot(&self) -> Vec<Alert> {
        self.read_pruned(|slots| slots.iter().map(|s| s.alert.clone()).collect())
    }

    /// Receiver that sees a fresh snapshot after every change.
    pub fn watch(&self) -> watch::Receiver<Vec<Alert>> {
        self.tx.subscribe()
    }

    fn expire(&self, id: &AlertId) {
        let now = Instant::now();
        self.mutate(|slots| {
            let before = slots.len();
            slots.retain(|s| &s.alert.id != id || !is_expired(s, now));
            slots.len() != before
        });
    }

    fn read_pruned<T>(&self, f: impl FnOnce(&VecDeque<Slot>) -> T) -> T {
        let (out, snapshot) = {
            let mut slots = self.slots.lock();
            let pruned = prune(&mut slots);
            (f(&slots), pruned.then(|| collect(&slots)))
        };
        self.publish(snapshot);
        out
    }

    /// Apply `f` under the lock after pruning expired entries. `f` reports
    /// whether it changed anything; a snapshot is published if so.
    fn mutate(&self, f: impl FnOnce(&mut VecDeque<Slot>) -> bool) -> bool {
        let (changed, snapshot) = {
            let mut slots = self.slots.lock();
            let pruned = prune(&mut slots);
            let changed = f(&mut slots) || pruned;
            (changed, changed.then(|| collect(&slots)))
        };
        self.publish(snapshot);
        changed
    }

    fn publish(&self, snapshot: Option<Vec<Alert>>) {
        if let Some(snapshot) = snapshot {
            let _ = self.tx.send_replace(snapshot);
        }
    }
}

fn collect(slots: &VecDeque<Slot>) -> Vec<Alert> {
    slots.iter().map(|s| s.alert.clone()).collect()
}

fn is_expired(slot: &Slot, now: Instant) -> bool {
    slot.expires_at.is_some_and(|deadline| deadline <= now)
}

fn prune(slots: &mut VecDeque<Slot>) -> bool {
    let now = Instant::now();
    let before = slots.len();
    slots.retain(|s| !is_expired(s, now));
    slots.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    fn buffer(capacity: usize) -> Arc<AlertBuffer> {
        Arc::new(AlertBuffer::new(capacity, WINDOW))
    }

    fn alert(title: &str, priority: Priority) -> Alert {
        Alert::new(title, "", priority)
    }

    #[tokio::test(start_paused = true)]
    async fn info_alert_expires_after_window() {
        let buf = buffer(10);
        let rx = buf.watch();
        buf.push(alert("a", Priority::Info));
        assert_eq!(rx.borrow().len(), 1);

        tokio::time::sleep(WINDOW - Duration::from_millis(1)).await;
        assert_eq!(buf.len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        // Timer task already removed it and published.
        assert!(rx.borrow().is_empty());
        assert!(buf.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn error_alert_persists_until_dismissed() {
        let buf = buffer(10);
        let sticky = alert("boom", Priority::Error);
        let id = sticky.id.clone();
        buf.push(sticky);

        tokio::time::sleep(WINDOW * 6).await;
        assert_eq!(buf.len(), 1);

        assert!(buf.dismiss(&id));
        assert!(buf.is_empty());
        assert!(!buf.dismiss(&id));
    }

    #[test]
    fn capacity_evicts_oldest() {
        let buf = buffer(3);
        for title in ["1", "2", "3", "4"] {
            buf.push(alert(title, Priority::Error));
        }
        let titles: Vec<_> = buf.snapshot().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, ["4", "3", "2"]);
    }

    #[test]
    fn push_without_runtime_prunes_lazily() {
        let buf = Arc::new(AlertBuffer::new(10, Duration::ZERO));
        buf.push(alert("gone", Priority::Info));
        buf.push(alert("kept", Priority::Error));
        let titles: Vec<_> = buf.snapshot().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, ["kept"]);
    }

    #[test]
    fn mark_read_and_unread_count() {
        let buf = buffer(10);
        let first = alert("a", Priority::Warning);
        let first_id = first.id.clone();
        buf.push(first);
        buf.push(alert("b", Priority::Error));
        assert_eq!(buf.unread_count(), 2);

        assert!(buf.mark_read(&first_id));
        assert!(!buf.mark_read(&first_id));
        assert_eq!(buf.unread_count(), 1);

        buf.mark_all_read();
        assert_eq!(buf.unread_count(), 0);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn clear_publishes_empty_snapshot() {
        let buf = buffer(10);
        let rx = buf.watch();
        buf.push(alert("a", Priority::Error));
        assert_eq!(rx.borrow().len(), 1);
        buf.clear();
        assert!(rx.borrow().is_empty());
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let buf = buffer(0);
        buf.push(alert("a", Priority::Error));
        buf.push(alert("b", Priority::Error));
        assert_eq!(buf.snapshot()[0].title, "b");
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn only_errors_are_sticky() {
        assert!(alert("x", Priority::Error).is_sticky());
        assert!(!alert("x", Priority::Warning).is_sticky());
    }
}
