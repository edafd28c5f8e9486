use slotmap::new_key_type;

use crate::heap::HeapEntry;

new_key_type! {
    /// Slot key into the scheduler's task storage.
    pub struct TaskKey;
}

/// Monotonically increasing creation counter, never reused. Used only as a
/// stable tie-break between tasks with equal urgency.
pub type TaskId = u64;

// Timeout per priority tier, in host clock milliseconds. A task's expiration
// time is its start time plus this value.
const IMMEDIATE_TIMEOUT: f64 = -1.0;
const USER_BLOCKING_TIMEOUT: f64 = 250.0;
const NORMAL_TIMEOUT: f64 = 5_000.0;
const LOW_TIMEOUT: f64 = 10_000.0;
// Max signed 31-bit integer; far enough out to never expire in practice.
const IDLE_TIMEOUT: f64 = 1_073_741_823.0;

/// Priority tier of a scheduled task. Lower timeout means more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Already expired when scheduled; runs on the next turn regardless of
    /// the remaining time budget.
    Immediate,
    /// Result of a user interaction that should stay responsive.
    UserBlocking,
    /// Default tier.
    Normal,
    /// Work that can wait behind anything Normal or above.
    Low,
    /// Runs only when nothing else is pending; effectively never expires.
    Idle,
}

impl Priority {
    pub fn timeout(self) -> f64 {
        match self {
            Priority::Immediate => IMMEDIATE_TIMEOUT,
            Priority::UserBlocking => USER_BLOCKING_TIMEOUT,
            Priority::Normal => NORMAL_TIMEOUT,
            Priority::Low => LOW_TIMEOUT,
            Priority::Idle => IDLE_TIMEOUT,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// What a task callback produced.
pub enum TaskResult {
    /// The task is finished and can leave the queue.
    Done,
    /// Partially completed work. The task keeps its queue position and the
    /// continuation is invoked on a later loop iteration with a freshly
    /// computed `did_timeout`.
    Continue(TaskCallback),
}

impl TaskResult {
    /// Convenience wrapper so call sites don't have to box continuations by
    /// hand.
    pub fn continue_with(f: impl FnOnce(bool) -> TaskResult + 'static) -> Self {
        TaskResult::Continue(Box::new(f))
    }
}

/// The body of a task. The argument is `did_timeout`: whether the task's
/// expiration time had already passed when the work loop reached it, so the
/// callback can pick a degraded or forced-completion path.
pub type TaskCallback = Box<dyn FnOnce(bool) -> TaskResult>;

/// A unit of schedulable work with its timing metadata.
///
/// `callback: None` means the task was cancelled or already consumed; the
/// queues discard such a task the next time it surfaces at a heap root,
/// never execute it.
pub(crate) struct Task {
    pub id: TaskId,
    pub callback: Option<TaskCallback>,
    pub priority: Priority,
    pub start_time: f64,
    pub expiration_time: f64,
    /// Heap ordering key: `start_time` while delayed, re-keyed to
    /// `expiration_time` when the task migrates to the ready queue.
    pub sort_index: f64,
}

/// Lightweight heap node referring to a task by key.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TaskRef {
    pub key: TaskKey,
    pub id: TaskId,
    pub sort_index: f64,
}

impl HeapEntry for TaskRef {
    fn sort_index(&self) -> f64 {
        self.sort_index
    }

    fn id(&self) -> u64 {
        self.id
    }
}

/// Handle returned by [`Scheduler::schedule_task`], used for cancellation.
///
/// [`Scheduler::schedule_task`]: crate::Scheduler::schedule_task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub(crate) key: TaskKey,
    pub(crate) id: TaskId,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }
}

/// Options for [`Scheduler::schedule_task`].
///
/// [`Scheduler::schedule_task`]: crate::Scheduler::schedule_task
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleOptions {
    /// Delay in host clock milliseconds before the task becomes eligible to
    /// run. Zero or negative means eligible immediately.
    pub delay: f64,
}

impl ScheduleOptions {
    pub fn delayed(delay: f64) -> Self {
        Self { delay }
    }
}
