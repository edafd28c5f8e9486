//! Cooperative, priority-based task scheduling for a single-threaded host.
//!
//! Tasks carry a priority tier and run in `(expiration_time, id)` order; the
//! work loop yields control back to the host event loop before the frame
//! budget runs out and resumes unfinished work on the next turn. The host's
//! clock, dispatch, and timer primitives are injected through [`HostConfig`].

pub mod heap;
pub mod host;
mod queue;
pub mod scheduler;
pub mod system_host;
pub mod task;
pub mod virtual_host;

pub use host::{HostCallback, HostConfig, HostOptions, TimeoutCallback};
pub use scheduler::Scheduler;
pub use system_host::SystemHost;
pub use task::{Priority, ScheduleOptions, TaskCallback, TaskHandle, TaskId, TaskResult};
pub use virtual_host::VirtualHost;
