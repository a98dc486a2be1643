//! Shared identifiers and the worker/task entities moved around by the engine.

use std::collections::VecDeque;

/// Unique identifier for a task within one run.
pub type TaskId = u64;
/// Unique identifier for a worker within one run.
pub type WorkerId = u64;

/// Unit of work; lives in exactly one worker queue once assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    /// Stable identifier, independent of the random display name.
    pub id: TaskId,
    pub name: String,
    /// Complexity at creation, kept for completion reports.
    pub initial_complexity: u32,
    /// Remaining work; zero or below means done.
    pub complexity: i64,
}

impl Task {
    /// Construct a fresh task with its full complexity remaining.
    pub fn new(id: TaskId, name: impl Into<String>, complexity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            initial_complexity: complexity,
            complexity: i64::from(complexity),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complexity <= 0
    }

    /// Remove one cycle worth of work; returns true once the task is complete.
    pub fn work(&mut self, productivity: u32) -> bool {
        self.complexity -= i64::from(productivity);
        self.is_complete()
    }
}

/// A worker holding a FIFO queue of tasks; the head is the one in progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    /// Complexity units removed from the head task each cycle.
    pub productivity: u32,
    tasks: VecDeque<Task>,
}

impl Worker {
    /// Construct an idle worker.
    pub fn new(id: WorkerId, name: impl Into<String>, productivity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            productivity,
            tasks: VecDeque::new(),
        }
    }

    /// Append a task to the tail of the queue.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    /// Task currently in progress, if any.
    pub fn head(&self) -> Option<&Task> {
        self.tasks.front()
    }

    pub fn head_mut(&mut self) -> Option<&mut Task> {
        self.tasks.front_mut()
    }

    /// Detach the head task from the queue.
    pub fn take_head(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    /// Queue in FIFO order, head first.
    pub fn tasks(&self) -> impl ExactSizeIterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_reports_completion_at_or_below_zero() {
        let mut task = Task::new(1, "a", 20);
        assert!(!task.work(10));
        assert_eq!(task.complexity, 10);
        assert!(task.work(15));
        assert_eq!(task.complexity, -5);
        // Initial complexity never changes.
        assert_eq!(task.initial_complexity, 20);
    }

    #[test]
    fn exact_zero_counts_as_complete() {
        let mut task = Task::new(2, "b", 30);
        assert!(task.work(30));
        assert!(task.is_complete());
    }

    #[test]
    fn worker_queue_is_fifo() {
        let mut worker = Worker::new(0, "w", 5);
        assert!(worker.is_idle());
        worker.add_task(Task::new(1, "first", 10));
        worker.add_task(Task::new(2, "second", 10));
        assert_eq!(worker.head().map(|t| t.id), Some(1));
        assert_eq!(worker.take_head().map(|t| t.id), Some(1));
        assert_eq!(worker.head().map(|t| t.id), Some(2));
        assert_eq!(worker.task_count(), 1);
    }
}
