//! Delayed task queue
//!
//! Tasks are plain data (`T`), scheduled at an absolute due time and handed
//! back by [`TaskQueue::take_due`] once the clock passes it. The queue never
//! sleeps; the flush loop polls it on every tick.

use std::collections::{BTreeMap, HashMap};

/// Handle returned by [`TaskQueue::schedule`], used to cancel a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Min-ordered queue of delayed tasks
#[derive(Debug)]
pub struct TaskQueue<T> {
    next_id: u64,
    /// Ordered by (due time, insertion id) so equal deadlines run FIFO
    entries: BTreeMap<(u64, TaskId), T>,
    due_by_id: HashMap<TaskId, u64>,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    /// Schedule `task` to run `delay_ms` after `now_ms`
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, task: T) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        let due = now_ms.saturating_add(delay_ms);
        self.entries.insert((due, id), task);
        self.due_by_id.insert(id, due);
        id
    }

    /// Cancel a pending task, returning it if it had not run yet
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let due = self.due_by_id.remove(&id)?;
        self.entries.remove(&(due, id))
    }

    /// Earliest pending deadline
    pub fn next_due(&self) -> Option<u64> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// Remove and return every task due at or before `now_ms`, oldest first
    pub fn take_due(&mut self, now_ms: u64) -> Vec<T> {
        let mut due = Vec::new();
        while let Some((&(at, id), _)) = self.entries.first_key_value() {
            if at > now_ms {
                break;
            }
            if let Some(task) = self.entries.remove(&(at, id)) {
                self.due_by_id.remove(&id);
                due.push(task);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.due_by_id.clear();
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_run_in_deadline_order() {
        let mut queue = TaskQueue::new();
        queue.schedule(0, 300, "late");
        queue.schedule(0, 100, "early");
        queue.schedule(50, 50, "same-as-early");

        assert_eq!(queue.next_due(), Some(100));
        assert!(queue.take_due(99).is_empty());
        assert_eq!(queue.take_due(100), vec!["early", "same-as-early"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take_due(1_000), vec!["late"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_removes_task() {
        let mut queue = TaskQueue::new();
        let keep = queue.schedule(0, 10, 1);
        let drop = queue.schedule(0, 10, 2);

        assert_eq!(queue.cancel(drop), Some(2));
        assert_eq!(queue.cancel(drop), None);
        assert_eq!(queue.take_due(10), vec![1]);
        assert_eq!(queue.cancel(keep), None);
    }
}
