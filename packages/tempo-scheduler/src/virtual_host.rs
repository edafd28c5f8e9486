use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::host::{HostCallback, HostConfig, HostOptions, TimeoutCallback};

struct Inner {
    clock: Cell<f64>,
    callback: RefCell<Option<HostCallback>>,
    timeout: RefCell<Option<(TimeoutCallback, f64)>>,
    frame_budget: Cell<f64>,
    deadline: Cell<f64>,
    max_deadline: Cell<f64>,
    needs_paint: Cell<bool>,
    /// `None` until [`VirtualHost::set_input_pending`] installs the probe;
    /// without a probe, past-deadline always yields.
    input_pending: Cell<Option<bool>>,
    options: HostOptions,
}

/// Deterministic host for tests and simulations: a virtual clock that only
/// moves when told to, and a manually pumped callback slot.
///
/// Nothing runs until the test calls [`advance`](VirtualHost::advance) or
/// [`flush_callback`](VirtualHost::flush_callback), which also gives the
/// schedule-soon primitive its required "never synchronous" behavior for
/// free.
#[derive(Clone)]
pub struct VirtualHost {
    inner: Rc<Inner>,
}

impl Default for VirtualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualHost {
    pub fn new() -> Self {
        Self::with_options(HostOptions::default())
    }

    pub fn with_options(options: HostOptions) -> Self {
        Self {
            inner: Rc::new(Inner {
                clock: Cell::new(0.0),
                callback: RefCell::new(None),
                timeout: RefCell::new(None),
                frame_budget: Cell::new(options.frame_budget),
                deadline: Cell::new(0.0),
                max_deadline: Cell::new(0.0),
                needs_paint: Cell::new(false),
                input_pending: Cell::new(None),
                options,
            }),
        }
    }

    /// Moves the clock forward and fires any timeout that comes due, which
    /// may arm further timeouts that are fired in turn.
    pub fn advance(&self, ms: f64) {
        let now = self.inner.clock.get() + ms;
        self.inner.clock.set(now);
        loop {
            let due = {
                let mut slot = self.inner.timeout.borrow_mut();
                if slot.as_ref().is_some_and(|(_, fire_at)| *fire_at <= now) {
                    slot.take()
                } else {
                    None
                }
            };
            match due {
                Some((callback, _)) => callback(now),
                None => break,
            }
        }
    }

    /// Delivers one host turn: invokes the pending callback with a fresh
    /// deadline. Returns whether the callback reported more work (in which
    /// case it stays pending for another turn). Returns false when nothing
    /// was pending.
    pub fn flush_callback(&self) -> bool {
        let Some(mut callback) = self.inner.callback.borrow_mut().take() else {
            return false;
        };
        let now = self.inner.clock.get();
        self.inner
            .deadline
            .set(now + self.inner.frame_budget.get());
        self.inner
            .max_deadline
            .set(now + self.inner.options.max_yield_interval);
        let has_more_work = callback(true, now);
        // Yielding back to the host gives it a chance to paint.
        self.inner.needs_paint.set(false);
        if has_more_work {
            let mut slot = self.inner.callback.borrow_mut();
            // A request made during the turn wins over the resumed callback.
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
        has_more_work
    }

    /// Pumps callback turns until no more work is reported.
    pub fn flush_until_idle(&self) {
        while self.flush_callback() {}
    }

    pub fn has_pending_callback(&self) -> bool {
        self.inner.callback.borrow().is_some()
    }

    /// Remaining delay of the pending host timeout, if any.
    pub fn pending_timeout_delay(&self) -> Option<f64> {
        self.inner
            .timeout
            .borrow()
            .as_ref()
            .map(|(_, fire_at)| fire_at - self.inner.clock.get())
    }

    /// Installs/updates the input-pending probe consulted by
    /// `should_yield`.
    pub fn set_input_pending(&self, pending: bool) {
        self.inner.input_pending.set(Some(pending));
    }

    /// Retunes the frame budget from a target frame rate, for embedders
    /// that align turns with a refresh cadence. `0` restores the
    /// construction-time budget; rates above 125fps are rejected.
    pub fn force_frame_rate(&self, fps: u32) {
        if fps > 125 {
            tracing::warn!("frame rates above 125fps are not supported, ignoring {}", fps);
            return;
        }
        if fps > 0 {
            self.inner.frame_budget.set((1_000.0 / fps as f64).floor());
        } else {
            self.inner.frame_budget.set(self.inner.options.frame_budget);
        }
    }
}

impl HostConfig for VirtualHost {
    fn now(&self) -> f64 {
        self.inner.clock.get()
    }

    fn request_host_callback(&self, callback: HostCallback) {
        *self.inner.callback.borrow_mut() = Some(callback);
    }

    fn request_host_timeout(&self, callback: TimeoutCallback, delay: f64) {
        let fire_at = self.inner.clock.get() + delay.max(0.0);
        *self.inner.timeout.borrow_mut() = Some((callback, fire_at));
    }

    fn cancel_host_timeout(&self) {
        *self.inner.timeout.borrow_mut() = None;
    }

    fn should_yield(&self) -> bool {
        let now = self.inner.clock.get();
        if now < self.inner.deadline.get() {
            return false;
        }
        match self.inner.input_pending.get() {
            Some(pending) => {
                self.inner.needs_paint.get() || pending || now >= self.inner.max_deadline.get()
            }
            None => true,
        }
    }

    fn request_paint(&self) {
        self.inner.needs_paint.set(true);
    }
}
