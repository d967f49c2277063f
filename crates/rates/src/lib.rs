//! Tax formula backend.
//!
//! Rate tables are keyed by financial year (`"2024-25"`) and ship embedded in
//! the crate; a replacement TOML file can be loaded at startup. [`evaluate`]
//! maps one wire [`Request`](tally_batch::Request) to one
//! [`Response`](tally_batch::Response), and [`LocalExecutor`] applies it to
//! whole batches so it can stand behind a
//! [`BatchCoordinator`](tally_batch::BatchCoordinator) or an RPC server.

#![warn(missing_docs)]

mod config;
mod error;
mod executor;
pub mod formula;
mod ops;
mod table;

pub use config::BackendConfig;
pub use error::{Error, Result};
pub use executor::LocalExecutor;
pub use ops::{Operation, evaluate};
pub use table::{Bracket, MedicareRates, OffsetSchedule, RateTables, Segment, YearRates, year_key};
