//! Debounced call coalescing.
//!
//! Callers [`submit`](BatchCoordinator::submit) individual operations and get
//! an [`InvocationFuture`] back immediately. The first submission after an
//! idle period arms a debounce timer; everything submitted before it fires
//! travels to the [`Executor`] as one ordered batch, and the response batch is
//! fanned back out to the waiting futures by position.
//!
//! * Per-item failures reject only their own future.
//! * A short response rejects the missing tail with [`Error::MissingResult`].
//! * A failed executor call rejects every future of that batch with
//!   [`Error::Dispatch`]. Nothing is retried.
//!
//! The scheduling flag is cleared when a batch is detached, before the
//! executor is called, so submissions made while a batch is in flight start
//! the next batch right away.

#![warn(missing_docs)]

mod config;
mod coordinator;
mod dispatch;
mod error;
mod executor;
mod invocation;
mod stats;
mod store;
mod wire;

pub use config::{BatchConfig, DEFAULT_DEBOUNCE};
pub use coordinator::BatchCoordinator;
pub use error::{Error, Result, TransportError};
pub use executor::Executor;
pub use invocation::InvocationFuture;
pub use stats::BatchStats;
pub use wire::{Request, Response};

/// Re-export of the argument/result value type.
pub use serde_json::Value;
