//! Cancellable one-shot timers on a virtual clock.
//!
//! The queue never sleeps: the host advances it from whatever loop it owns
//! (an animation frame callback, a thread timer, or a test) and receives
//! the tasks that came due. Every task belongs to a session so a session's
//! pending reveals can be cancelled together.

use crate::SessionId;

/// Handle of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// A task that came due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub handle: TaskHandle,
    pub session: SessionId,
    /// Virtual time at which the task was due
    pub deadline_ms: f64,
    pub task: T,
}

#[derive(Debug)]
struct Scheduled<T> {
    handle: TaskHandle,
    session: SessionId,
    deadline_ms: f64,
    task: T,
}

/// One-shot timers ordered by deadline, ties in scheduling order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    now_ms: f64,
    next_handle: u64,
    /// Sorted by (deadline, handle)
    tasks: Vec<Scheduled<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue at time zero.
    pub fn new() -> Self {
        Self {
            now_ms: 0.0,
            next_handle: 0,
            tasks: Vec::new(),
        }
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Schedule `task` to fire `delay_ms` from now. Negative delays fire on the next advance.
    pub fn schedule(&mut self, session: SessionId, delay_ms: f64, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        let deadline_ms = self.now_ms + delay_ms.max(0.0);
        // Handles only grow, so inserting after equal deadlines keeps scheduling order
        let pos = self.tasks.partition_point(|t| t.deadline_ms <= deadline_ms);
        self.tasks.insert(
            pos,
            Scheduled {
                handle,
                session,
                deadline_ms,
                task,
            },
        );
        handle
    }

    /// Cancel one task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    /// Cancel every pending task of a session. Returns how many were cancelled.
    pub fn cancel_all(&mut self, session: SessionId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.session != session);
        before - self.tasks.len()
    }

    /// Number of pending tasks of a session.
    pub fn pending(&self, session: SessionId) -> usize {
        self.tasks.iter().filter(|t| t.session == session).count()
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Deadline of the next task to fire.
    pub fn next_deadline(&self) -> Option<f64> {
        self.tasks.first().map(|t| t.deadline_ms)
    }

    /// Move the clock forward and return the tasks that came due, in order.
    pub fn advance(&mut self, elapsed_ms: f64) -> Vec<Fired<T>> {
        let now = self.now_ms + elapsed_ms.max(0.0);
        self.advance_to(now)
    }

    /// Move the clock to `now_ms` (never backwards) and return due tasks.
    pub fn advance_to(&mut self, now_ms: f64) -> Vec<Fired<T>> {
        if now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
        let due = self.tasks.partition_point(|t| t.deadline_ms <= self.now_ms);
        self.tasks
            .drain(..due)
            .map(|t| Fired {
                handle: t.handle,
                session: t.session,
                deadline_ms: t.deadline_ms,
                task: t.task,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(SessionId(0), 30.0, "c");
        q.schedule(SessionId(0), 10.0, "a");
        q.schedule(SessionId(0), 10.0, "b");
        assert!(q.advance(5.0).is_empty());
        let fired: Vec<&str> = q.advance(25.0).into_iter().map(|f| f.task).collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut q = TimerQueue::new();
        let h = q.schedule(SessionId(0), 10.0, 1);
        q.schedule(SessionId(0), 20.0, 2);
        assert!(q.cancel(h));
        assert!(!q.cancel(h));
        let fired: Vec<i32> = q.advance(100.0).into_iter().map(|f| f.task).collect();
        assert_eq!(fired, vec![2]);
    }

    #[test]
    fn test_cancel_all_is_per_session() {
        let mut q = TimerQueue::new();
        q.schedule(SessionId(0), 10.0, 1);
        q.schedule(SessionId(1), 10.0, 2);
        q.schedule(SessionId(0), 20.0, 3);
        assert_eq!(q.cancel_all(SessionId(0)), 2);
        assert_eq!(q.pending(SessionId(0)), 0);
        assert_eq!(q.pending(SessionId(1)), 1);
    }

    #[test]
    fn test_delay_is_relative_to_now() {
        let mut q = TimerQueue::new();
        q.advance(100.0);
        q.schedule(SessionId(0), 50.0, ());
        assert_eq!(q.next_deadline(), Some(150.0));
        assert!(q.advance_to(120.0).is_empty());
        assert_eq!(q.advance_to(150.0).len(), 1);
    }
}
