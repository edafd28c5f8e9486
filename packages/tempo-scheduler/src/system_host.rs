use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use crate::host::{HostCallback, HostConfig, HostOptions, TimeoutCallback};

struct Inner {
    epoch: Instant,
    callback: RefCell<Option<HostCallback>>,
    timeout: RefCell<Option<(TimeoutCallback, f64)>>,
    frame_budget: Cell<f64>,
    deadline: Cell<f64>,
    max_deadline: Cell<f64>,
    needs_paint: Cell<bool>,
    input_probe: Option<Box<dyn Fn() -> bool>>,
    options: HostOptions,
}

/// Real-time host backed by `std::time::Instant`, pumped on the embedding
/// thread with [`run_until_idle`](SystemHost::run_until_idle).
///
/// Due timeouts and pending callback turns are delivered from the pump, and
/// the pump sleeps while only a future timeout is outstanding. An optional
/// input probe lets the embedder report pending high-priority input, which
/// makes `should_yield` lazier past the deadline (see
/// [`HostConfig::should_yield`]).
#[derive(Clone)]
pub struct SystemHost {
    inner: Rc<Inner>,
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemHost {
    pub fn new() -> Self {
        Self::with_options(HostOptions::default())
    }

    pub fn with_options(options: HostOptions) -> Self {
        Self::build(options, None)
    }

    pub fn with_input_probe(options: HostOptions, probe: impl Fn() -> bool + 'static) -> Self {
        Self::build(options, Some(Box::new(probe)))
    }

    fn build(options: HostOptions, input_probe: Option<Box<dyn Fn() -> bool>>) -> Self {
        Self {
            inner: Rc::new(Inner {
                epoch: Instant::now(),
                callback: RefCell::new(None),
                timeout: RefCell::new(None),
                frame_budget: Cell::new(options.frame_budget),
                deadline: Cell::new(0.0),
                max_deadline: Cell::new(0.0),
                needs_paint: Cell::new(false),
                input_probe,
                options,
            }),
        }
    }

    /// Runs the host loop until neither a callback turn nor a timeout is
    /// outstanding. Timeouts that are already due fire before the next
    /// callback turn, so promoted timers are visible to it.
    pub fn run_until_idle(&self) {
        loop {
            let now = self.now();
            let due = {
                let mut slot = self.inner.timeout.borrow_mut();
                if slot.as_ref().is_some_and(|(_, fire_at)| *fire_at <= now) {
                    slot.take()
                } else {
                    None
                }
            };
            if let Some((callback, _)) = due {
                callback(now);
                continue;
            }
            if self.inner.callback.borrow().is_some() {
                self.run_turn();
                continue;
            }
            let sleep_for = self
                .inner
                .timeout
                .borrow()
                .as_ref()
                .map(|(_, fire_at)| fire_at - now);
            match sleep_for {
                Some(ms) => thread::sleep(Duration::from_secs_f64(ms.max(0.0) / 1_000.0)),
                None => break,
            }
        }
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

    fn run_turn(&self) {
        let Some(mut callback) = self.inner.callback.borrow_mut().take() else {
            return;
        };
        let turn_start = self.now();
        self.inner
            .deadline
            .set(turn_start + self.inner.frame_budget.get());
        self.inner
            .max_deadline
            .set(turn_start + self.inner.options.max_yield_interval);
        let has_more_work = callback(true, turn_start);
        self.inner.needs_paint.set(false);
        if has_more_work {
            let mut slot = self.inner.callback.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}

impl HostConfig for SystemHost {
    fn now(&self) -> f64 {
        self.inner.epoch.elapsed().as_secs_f64() * 1_000.0
    }

    fn request_host_callback(&self, callback: HostCallback) {
        *self.inner.callback.borrow_mut() = Some(callback);
    }

    fn request_host_timeout(&self, callback: TimeoutCallback, delay: f64) {
        let fire_at = self.now() + delay.max(0.0);
        *self.inner.timeout.borrow_mut() = Some((callback, fire_at));
    }

    fn cancel_host_timeout(&self) {
        *self.inner.timeout.borrow_mut() = None;
    }

    fn should_yield(&self) -> bool {
        let now = self.now();
        if now < self.inner.deadline.get() {
            return false;
        }
        match &self.inner.input_probe {
            Some(probe) => {
                self.inner.needs_paint.get() || probe() || now >= self.inner.max_deadline.get()
            }
            None => true,
        }
    }

    fn request_paint(&self) {
        self.inner.needs_paint.set(true);
    }
}
