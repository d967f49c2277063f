//! Task spawning primitives shared across tally crates.
//!
//! Every task is tagged with a [`TaskClass`] so that traces can tell debounce
//! timers apart from transport loops and backend work. When no tokio runtime
//! is active on the calling thread, tasks land on a small process-wide
//! fallback runtime instead of panicking.

mod class;
mod join_set;
mod spawn;

pub use class::TaskClass;
pub use join_set::WorkerJoinSet;
pub use spawn::{spawn, spawn_after};
