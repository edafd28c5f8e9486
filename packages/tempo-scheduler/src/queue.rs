use slotmap::SlotMap;

use crate::heap::MinHeap;
use crate::task::{Priority, Task, TaskCallback, TaskId, TaskKey, TaskRef};

/// Owner of the ready/timer split.
///
/// The ready queue holds tasks eligible to run now, ordered by expiration
/// time; the timer queue holds delayed tasks, ordered by start time. Tasks
/// live in a slotmap and each live task has exactly one `TaskRef` in exactly
/// one heap. Cancellation nulls the callback and leaves the heap alone, so a
/// slot is only released when its ref is popped.
pub(crate) struct TaskQueues {
    tasks: SlotMap<TaskKey, Task>,
    ready: MinHeap<TaskRef>,
    timers: MinHeap<TaskRef>,
    next_id: TaskId,
}

impl TaskQueues {
    pub fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            ready: MinHeap::new(),
            timers: MinHeap::new(),
            next_id: 1,
        }
    }

    /// Builds a task and files it into the appropriate queue. Returns the
    /// new heap node and whether it went into the timer queue.
    pub fn create_task(
        &mut self,
        priority: Priority,
        callback: TaskCallback,
        current_time: f64,
        delay: f64,
    ) -> (TaskRef, bool) {
        let start_time = if delay > 0.0 {
            current_time + delay
        } else {
            current_time
        };
        let expiration_time = start_time + priority.timeout();
        let delayed = start_time > current_time;
        let sort_index = if delayed { start_time } else { expiration_time };

        let id = self.next_id;
        self.next_id += 1;

        let key = self.tasks.insert(Task {
            id,
            callback: Some(callback),
            priority,
            start_time,
            expiration_time,
            sort_index,
        });
        let task_ref = TaskRef {
            key,
            id,
            sort_index,
        };
        if delayed {
            self.timers.push(task_ref);
        } else {
            self.ready.push(task_ref);
        }
        (task_ref, delayed)
    }

    /// Moves tasks whose start time has arrived from the timer queue to the
    /// ready queue, re-keying them by expiration time. Tasks cancelled while
    /// delayed are discarded instead of promoted.
    pub fn advance_timers(&mut self, current_time: f64) {
        while let Some(timer) = self.timers.peek().copied() {
            let (cancelled, start_time, expiration_time) = match self.tasks.get(timer.key) {
                Some(task) => (task.callback.is_none(), task.start_time, task.expiration_time),
                None => (true, 0.0, 0.0),
            };
            if cancelled {
                self.timers.pop();
                self.tasks.remove(timer.key);
            } else if start_time <= current_time {
                self.timers.pop();
                if let Some(task) = self.tasks.get_mut(timer.key) {
                    task.sort_index = expiration_time;
                }
                self.ready.push(TaskRef {
                    sort_index: expiration_time,
                    ..timer
                });
                tracing::trace!("task {} became ready at {}", timer.id, current_time);
            } else {
                // Remaining timers are still pending.
                break;
            }
        }
    }

    pub fn peek_ready(&self) -> Option<TaskRef> {
        self.ready.peek().copied()
    }

    /// Pops the ready-queue head and releases its slot.
    pub fn pop_ready(&mut self) -> Option<TaskRef> {
        let head = self.ready.pop();
        if let Some(task_ref) = head {
            self.tasks.remove(task_ref.key);
        }
        head
    }

    pub fn peek_timer(&self) -> Option<TaskRef> {
        self.timers.peek().copied()
    }

    pub fn is_ready_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub fn has_pending_work(&self) -> bool {
        !self.ready.is_empty() || !self.timers.is_empty()
    }

    pub fn task_id(&self, key: TaskKey) -> Option<TaskId> {
        self.tasks.get(key).map(|task| task.id)
    }

    /// Expiration time and priority of a task, if its slot is still live.
    pub fn task_meta(&self, key: TaskKey) -> Option<(f64, Priority)> {
        self.tasks
            .get(key)
            .map(|task| (task.expiration_time, task.priority))
    }

    /// Takes the callback out of a task, marking it spent. Returns `None`
    /// for cancelled, consumed, or released tasks.
    pub fn take_callback(&mut self, key: TaskKey) -> Option<TaskCallback> {
        self.tasks.get_mut(key).and_then(|task| task.callback.take())
    }

    /// Re-arms a task with its continuation; the task keeps its queue
    /// position.
    pub fn restore_callback(&mut self, key: TaskKey, callback: TaskCallback) {
        if let Some(task) = self.tasks.get_mut(key) {
            task.callback = Some(callback);
        }
    }

    /// Lazy cancellation: nulls the callback without touching the heaps.
    /// Idempotent; a no-op for completed or already-cancelled tasks.
    pub fn cancel(&mut self, key: TaskKey) {
        if let Some(task) = self.tasks.get_mut(key) {
            if task.callback.take().is_some() {
                tracing::debug!("task {} cancelled", task.id);
            }
        }
    }
}
