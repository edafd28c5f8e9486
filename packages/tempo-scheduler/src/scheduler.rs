use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::host::HostConfig;
use crate::queue::TaskQueues;
use crate::task::{
    Priority, ScheduleOptions, TaskCallback, TaskHandle, TaskId, TaskKey, TaskResult,
};

/// Cooperative priority scheduler.
///
/// Single-threaded: one instance owns all scheduling state and talks to the
/// embedding event loop through an injected [`HostConfig`]. Task callbacks
/// run to completion within a host turn; the work loop checks the host's
/// yield signal between tasks and hands control back before the time budget
/// expires, leaving unfinished work at the head of the queue for the next
/// turn.
pub struct Scheduler<H: HostConfig> {
    host: H,
    queues: RefCell<TaskQueues>,
    current_priority: Cell<Priority>,
    current_task: Cell<Option<TaskKey>>,
    // Re-entrancy guard: a callback that schedules urgent work must not
    // trigger a nested flush.
    is_performing_work: Cell<bool>,
    is_host_callback_scheduled: Cell<bool>,
    is_host_timeout_scheduled: Cell<bool>,
    // Debug halt; queued state is kept.
    is_paused: Cell<bool>,
}

impl<H: HostConfig + 'static> Scheduler<H> {
    pub fn new(host: H) -> Rc<Self> {
        Rc::new(Self {
            host,
            queues: RefCell::new(TaskQueues::new()),
            current_priority: Cell::new(Priority::Normal),
            current_task: Cell::new(None),
            is_performing_work: Cell::new(false),
            is_host_callback_scheduled: Cell::new(false),
            is_host_timeout_scheduled: Cell::new(false),
            is_paused: Cell::new(false),
        })
    }

    /// Schedules `callback` at `priority`, optionally delayed. Returns a
    /// handle usable for cancellation.
    pub fn schedule_task(
        self: &Rc<Self>,
        priority: Priority,
        callback: TaskCallback,
        options: ScheduleOptions,
    ) -> TaskHandle {
        let current_time = self.host.now();
        let (task_ref, delayed) =
            self.queues
                .borrow_mut()
                .create_task(priority, callback, current_time, options.delay);
        tracing::debug!(
            "scheduled task {} at {:?} (delay {}ms)",
            task_ref.id,
            priority,
            options.delay.max(0.0)
        );

        if delayed {
            let fronts_timer_queue = {
                let queues = self.queues.borrow();
                queues.is_ready_empty()
                    && queues.peek_timer().map(|timer| timer.id) == Some(task_ref.id)
            };
            if fronts_timer_queue {
                // All tasks are delayed and this one has the earliest start
                // time; re-arm the host timeout for it.
                if self.is_host_timeout_scheduled.get() {
                    self.host.cancel_host_timeout();
                }
                self.is_host_timeout_scheduled.set(true);
                // For a delayed task, sort_index is its start time.
                self.request_host_timeout(task_ref.sort_index - current_time);
            }
        } else if !self.is_host_callback_scheduled.get() && !self.is_performing_work.get() {
            // If work is already in progress the running loop will observe
            // the new task; otherwise arrange a turn.
            self.is_host_callback_scheduled.set(true);
            self.request_host_callback();
        }

        TaskHandle {
            key: task_ref.key,
            id: task_ref.id,
        }
    }

    /// Cancels a task. Lazy: the callback is nulled and the entry is
    /// discarded when it later surfaces at a queue head. Idempotent and safe
    /// on completed tasks.
    pub fn cancel_task(&self, handle: &TaskHandle) {
        self.queues.borrow_mut().cancel(handle.key);
    }

    /// Runs `f` with the current-priority context set to `priority`,
    /// restoring the previous context on every exit path.
    pub fn run_with_priority<R>(&self, priority: Priority, f: impl FnOnce() -> R) -> R {
        let previous = self.current_priority.replace(priority);
        let _guard = PriorityGuard {
            cell: &self.current_priority,
            previous,
        };
        f()
    }

    /// Runs `f` at the priority of "the next reasonable tick": Immediate,
    /// UserBlocking and Normal demote to Normal; Low and Idle stay put, so
    /// urgency is never escalated.
    pub fn next<R>(&self, f: impl FnOnce() -> R) -> R {
        let priority = match self.current_priority.get() {
            Priority::Immediate | Priority::UserBlocking | Priority::Normal => Priority::Normal,
            lower => lower,
        };
        self.run_with_priority(priority, f)
    }

    /// Wraps `f` so every future invocation temporarily restores the
    /// priority context that was current at wrap time.
    pub fn wrap_callback<R>(
        self: &Rc<Self>,
        mut f: impl FnMut() -> R + 'static,
    ) -> Box<dyn FnMut() -> R> {
        let scheduler = Rc::clone(self);
        let parent_priority = self.current_priority.get();
        Box::new(move || {
            let previous = scheduler.current_priority.replace(parent_priority);
            let _guard = PriorityGuard {
                cell: &scheduler.current_priority,
                previous,
            };
            f()
        })
    }

    pub fn current_priority(&self) -> Priority {
        self.current_priority.get()
    }

    /// Whether a long-running callback should return a continuation and let
    /// the host take over.
    pub fn should_yield(&self) -> bool {
        self.host.should_yield()
    }

    pub fn request_paint(&self) {
        self.host.request_paint();
    }

    pub fn now(&self) -> f64 {
        self.host.now()
    }

    /// Halts the work loop without losing queued state. Debug facility.
    pub fn pause(&self) {
        tracing::debug!("scheduler paused");
        self.is_paused.set(true);
    }

    /// Resumes a paused scheduler and re-arranges a host turn if needed.
    pub fn resume(self: &Rc<Self>) {
        tracing::debug!("scheduler resumed");
        self.is_paused.set(false);
        if !self.is_host_callback_scheduled.get() && !self.is_performing_work.get() {
            self.is_host_callback_scheduled.set(true);
            self.request_host_callback();
        }
    }

    /// Id of the task whose callback is currently executing, if any.
    pub fn current_task(&self) -> Option<TaskId> {
        self.current_task
            .get()
            .and_then(|key| self.queues.borrow().task_id(key))
    }

    /// Id of the ready-queue head, without popping it. Cancelled tasks still
    /// occupy the head until the loop discards them.
    pub fn first_task(&self) -> Option<TaskId> {
        self.queues.borrow().peek_ready().map(|task| task.id)
    }

    /// Whether either queue holds entries (live or cancelled-but-undiscarded).
    pub fn has_pending_work(&self) -> bool {
        self.queues.borrow().has_pending_work()
    }

    fn request_host_callback(self: &Rc<Self>) {
        let scheduler = Rc::clone(self);
        self.host
            .request_host_callback(Box::new(move |has_time_remaining, initial_time| {
                scheduler.flush_work(has_time_remaining, initial_time)
            }));
    }

    fn request_host_timeout(self: &Rc<Self>, delay: f64) {
        let scheduler = Rc::clone(self);
        self.host.request_host_timeout(
            Box::new(move |current_time| scheduler.handle_timeout(current_time)),
            delay,
        );
    }

    /// Host timeout entry point: promote due timers, then either arrange a
    /// callback turn or re-arm for the next timer.
    fn handle_timeout(self: &Rc<Self>, current_time: f64) {
        self.is_host_timeout_scheduled.set(false);
        self.queues.borrow_mut().advance_timers(current_time);

        if self.is_host_callback_scheduled.get() {
            return;
        }
        let (has_ready_work, first_timer) = {
            let queues = self.queues.borrow();
            (!queues.is_ready_empty(), queues.peek_timer())
        };
        if has_ready_work {
            self.is_host_callback_scheduled.set(true);
            self.request_host_callback();
        } else if let Some(timer) = first_timer {
            self.is_host_timeout_scheduled.set(true);
            self.request_host_timeout(timer.sort_index - current_time);
        }
    }

    /// Host callback entry point. Returns whether more work is pending, in
    /// which case the host must arrange another turn.
    fn flush_work(self: &Rc<Self>, has_time_remaining: bool, initial_time: f64) -> bool {
        // We'll need a fresh host callback the next time work is scheduled.
        self.is_host_callback_scheduled.set(false);
        if self.is_host_timeout_scheduled.get() {
            // This turn supersedes whatever timeout was pending.
            self.is_host_timeout_scheduled.set(false);
            self.host.cancel_host_timeout();
        }

        self.is_performing_work.set(true);
        // Restores bookkeeping on every exit path, a panicking task callback
        // included; the panic itself propagates to the host turn.
        let _cleanup = FlushGuard {
            scheduler: self,
            previous_priority: self.current_priority.get(),
        };
        self.work_loop(has_time_remaining, initial_time)
    }

    fn work_loop(self: &Rc<Self>, has_time_remaining: bool, initial_time: f64) -> bool {
        let mut current_time = initial_time;
        self.queues.borrow_mut().advance_timers(current_time);

        let mut has_more_work = false;
        loop {
            let head = self.queues.borrow().peek_ready();
            let Some(task_ref) = head else {
                break;
            };
            if self.is_paused.get() {
                has_more_work = true;
                break;
            }
            let meta = self.queues.borrow().task_meta(task_ref.key);
            let Some((expiration_time, priority)) = meta else {
                // Stale heap entry whose slot is gone; drop it.
                self.queues.borrow_mut().pop_ready();
                continue;
            };

            if expiration_time > current_time
                && (!has_time_remaining || self.host.should_yield())
            {
                // The head task hasn't expired but the slice is used up.
                // Leave it in place; the next turn picks it up.
                tracing::trace!("yielding to host with task {} at head", task_ref.id);
                has_more_work = true;
                break;
            }

            // Bound here so no queue borrow is held across the invocation.
            let callback = self.queues.borrow_mut().take_callback(task_ref.key);
            match callback {
                Some(callback) => {
                    self.current_task.set(Some(task_ref.key));
                    self.current_priority.set(priority);
                    let did_timeout = expiration_time <= current_time;
                    let result = callback(did_timeout);
                    current_time = self.host.now();
                    match result {
                        TaskResult::Continue(continuation) => {
                            // Partially completed work; keep the task at the
                            // heap head with its continuation armed.
                            tracing::trace!("task {} yielded a continuation", task_ref.id);
                            self.queues
                                .borrow_mut()
                                .restore_callback(task_ref.key, continuation);
                        }
                        TaskResult::Done => {
                            let mut queues = self.queues.borrow_mut();
                            // The callback may have cancelled its own task or
                            // otherwise changed the head; only pop if it is
                            // still the minimum.
                            if queues.peek_ready().map(|head| head.id) == Some(task_ref.id) {
                                queues.pop_ready();
                            }
                        }
                    }
                    // A long callback may have made delayed tasks ready.
                    self.queues.borrow_mut().advance_timers(current_time);
                }
                None => {
                    // Cancelled while queued; discard without running.
                    self.queues.borrow_mut().pop_ready();
                }
            }
        }

        if has_more_work {
            true
        } else {
            if let Some(timer) = self.queues.borrow().peek_timer() {
                self.is_host_timeout_scheduled.set(true);
                self.request_host_timeout(timer.sort_index - current_time);
            }
            false
        }
    }
}

struct PriorityGuard<'a> {
    cell: &'a Cell<Priority>,
    previous: Priority,
}

impl Drop for PriorityGuard<'_> {
    fn drop(&mut self) {
        self.cell.set(self.previous);
    }
}

struct FlushGuard<'a, H: HostConfig> {
    scheduler: &'a Scheduler<H>,
    previous_priority: Priority,
}

impl<H: HostConfig> Drop for FlushGuard<'_, H> {
    fn drop(&mut self) {
        self.scheduler.current_task.set(None);
        self.scheduler
            .current_priority
            .set(self.previous_priority);
        self.scheduler.is_performing_work.set(false);
    }
}
