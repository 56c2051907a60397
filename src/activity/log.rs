//! Bounded activity log
//!
//! Append-only ring of the most recent activities, newest first.
//! - Capacity: 100 entries, oldest dropped silently
//! - Ordering: strictly increasing sequence ids, assigned under the write lock
//! - Sharing: cheap to clone, safe to append from several assessment loops
//! - Subscribers: receive activities in id order

use crate::activity::types::{Activity, ActivityKind, NewActivity};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Maximum retained activities
pub const ACTIVITY_LOG_CAPACITY: usize = 100;

/// Buffered activities per subscriber before it starts lagging
const SUBSCRIBER_BUFFER: usize = 256;

struct Entries {
    next_id: u64,
    /// Newest at the front
    ring: VecDeque<Activity>,
}

struct LogInner {
    entries: RwLock<Entries>,
    sender: broadcast::Sender<Activity>,
}

/// Shared activity log handle
#[derive(Clone)]
pub struct ActivityLog {
    inner: Arc<LogInner>,
}

impl ActivityLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            inner: Arc::new(LogInner {
                entries: RwLock::new(Entries {
                    next_id: 1,
                    ring: VecDeque::with_capacity(ACTIVITY_LOG_CAPACITY + 1),
                }),
                sender,
            }),
        }
    }

    /// Sequence and store an activity, returning the stored entry
    pub fn append(&self, draft: NewActivity) -> Activity {
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let id = entries.next_id;
        entries.next_id += 1;

        let activity = draft.sequence(id, Utc::now());
        entries.ring.push_front(activity.clone());
        if entries.ring.len() > ACTIVITY_LOG_CAPACITY {
            entries.ring.pop_back();
        }

        // Sent under the lock so broadcast order matches id order.
        // No subscribers is fine.
        let _ = self.inner.sender.send(activity.clone());

        activity
    }

    /// Most recent `n` activities, newest first
    pub fn latest(&self, n: usize) -> Vec<Activity> {
        self.read(|ring| ring.iter().take(n).cloned().collect())
    }

    /// All retained activities matching `predicate`, newest first
    pub fn filter<P>(&self, predicate: P) -> Vec<Activity>
    where
        P: Fn(&Activity) -> bool,
    {
        self.read(|ring| ring.iter().filter(|a| predicate(a)).cloned().collect())
    }

    /// Retained activities of one kind, newest first
    pub fn of_kind(&self, kind: ActivityKind) -> Vec<Activity> {
        self.filter(|activity| activity.kind == kind)
    }

    /// Copy of every retained activity, newest first
    pub fn snapshot(&self) -> Vec<Activity> {
        self.read(|ring| ring.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.read(|ring| ring.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every activity appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Activity> {
        self.inner.sender.subscribe()
    }

    fn read<T>(&self, view: impl FnOnce(&VecDeque<Activity>) -> T) -> T {
        let entries = self
            .inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        view(&entries.ring)
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::PhaseId;

    #[test]
    fn test_log_creation() {
        let log = ActivityLog::new();
        assert!(log.is_empty());
        assert!(log.latest(5).is_empty());
    }

    #[test]
    fn test_newest_first() {
        let log = ActivityLog::new();
        log.append(NewActivity::start("first"));
        log.append(NewActivity::progress("second"));
        log.append(NewActivity::complete("third"));

        let latest = log.latest(2);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].message, "third");
        assert_eq!(latest[1].message, "second");
    }

    #[test]
    fn test_capacity_bound() {
        let log = ActivityLog::new();
        for i in 0..250 {
            log.append(NewActivity::progress(format!("event {}", i)));
            assert!(log.len() <= ACTIVITY_LOG_CAPACITY);
        }

        assert_eq!(log.len(), ACTIVITY_LOG_CAPACITY);
        let snapshot = log.snapshot();
        assert_eq!(snapshot[0].message, "event 249");
        assert_eq!(snapshot[ACTIVITY_LOG_CAPACITY - 1].message, "event 150");
    }

    #[test]
    fn test_ids_strictly_increase() {
        let log = ActivityLog::new();
        let a = log.append(NewActivity::start("a"));
        let b = log.append(NewActivity::start("b"));
        assert!(b.id > a.id);
        assert!(b.timestamp >= a.timestamp);
    }

    #[test]
    fn test_filter_does_not_mutate() {
        let log = ActivityLog::new();
        log.append(NewActivity::start("nmap").with_step(PhaseId::Scanning, "nmap"));
        log.append(NewActivity::error("nmap failed").with_step(PhaseId::Scanning, "nmap"));
        log.append(NewActivity::start("whois"));

        let errors = log.of_kind(ActivityKind::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "nmap failed");

        let nmap = log.filter(|a| a.tool.as_deref() == Some("nmap"));
        assert_eq!(nmap.len(), 2);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_concurrent_appends_total_order() {
        let log = ActivityLog::new();
        let mut handles = Vec::new();

        for t in 0..4 {
            let log = log.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..20 {
                    log.append(NewActivity::progress(format!("thread {} event {}", t, i)));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 80);
        for pair in snapshot.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[test]
    fn test_concurrent_appends_broadcast_in_id_order() {
        let log = ActivityLog::new();
        let mut receiver = log.subscribe();
        let mut handles = Vec::new();

        for t in 0..4 {
            let log = log.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    log.append(NewActivity::progress(format!("thread {} event {}", t, i)));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut ids = Vec::new();
        while let Ok(activity) = receiver.try_recv() {
            ids.push(activity.id);
        }
        assert_eq!(ids.len(), 200);
        assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[tokio::test]
    async fn test_subscribe_receives_appends() {
        let log = ActivityLog::new();
        let mut receiver = log.subscribe();

        log.append(NewActivity::start("hello"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.message, "hello");
        assert_eq!(received.kind, ActivityKind::Start);
    }
}
