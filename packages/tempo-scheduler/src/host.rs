/// Entry point the host invokes to let the scheduler flush work. Arguments
/// are `(has_time_remaining, current_time)`; the return value reports
/// whether more work is pending, in which case the host must arrange another
/// turn.
pub type HostCallback = Box<dyn FnMut(bool, f64) -> bool>;

/// Entry point for a delayed host invocation, passed the current time.
pub type TimeoutCallback = Box<dyn FnOnce(f64)>;

/// The host yield boundary: the primitives the scheduler needs from the
/// surrounding event loop, injected at construction so the core never probes
/// its environment.
///
/// Implementations must deliver the schedule-soon callback strictly
/// asynchronously, never re-entrantly inside `request_host_callback` itself.
/// That one host-loop turn of latency is what lets the host interleave
/// painting and input handling between scheduler turns. A host without a
/// dispatch queue of its own may fall back to a zero-delay timeout; that
/// trades efficiency, not correctness.
pub trait HostConfig {
    /// Monotonic clock in milliseconds, relative to an arbitrary epoch fixed
    /// when the host was created.
    fn now(&self) -> f64;

    /// Requests that `callback` run as soon as the host's loop permits.
    /// Coalescing: a second request before delivery replaces the pending
    /// callback rather than double-scheduling.
    fn request_host_callback(&self, callback: HostCallback);

    /// Requests a single delayed invocation. At most one may be outstanding;
    /// a new request replaces a pending one.
    fn request_host_timeout(&self, callback: TimeoutCallback, delay: f64);

    /// Cancels the outstanding delayed invocation, if any.
    fn cancel_host_timeout(&self);

    /// Whether the current turn has used up its slice of the host loop.
    /// False until the rolling deadline (turn start + frame budget) passes.
    /// Past the deadline: if the host can probe for pending input, yielding
    /// is only forced when there is a pending paint or input, or once the
    /// max yield interval has elapsed; without a probe, past-deadline always
    /// yields.
    fn should_yield(&self) -> bool;

    /// Records that a visual update is pending, which makes `should_yield`
    /// eager once the deadline passes. Cleared at the start of the next
    /// host turn.
    fn request_paint(&self);
}

/// Tunables for the yield heuristic shared by the host implementations.
#[derive(Debug, Clone, Copy)]
pub struct HostOptions {
    /// Time slice per host turn, in milliseconds.
    pub frame_budget: f64,
    /// Hard ceiling after which a turn yields even when no paint or input
    /// signal ever fires. Only "eventually yields" matters; the exact value
    /// is a tunable, not a contract.
    pub max_yield_interval: f64,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            frame_budget: 5.0,
            max_yield_interval: 300.0,
        }
    }
}
