//! JSON-lines transport for request batches.
//!
//! * [`RpcClient`]: an [`Executor`](tally_batch::Executor) that ships each batch
//!   over a byte stream and routes replies back by frame id.
//! * [`serve`]: the matching server loop, answering frames with any executor.
//! * [`protocol`]: frame shapes and the newline-delimited codec.
//!
//! Several batches may be outstanding on one connection; replies can arrive
//! in any order.

#![warn(missing_docs)]

mod client;
pub mod protocol;
mod server;

pub use client::RpcClient;
pub use protocol::{BatchFrame, CounterIdGen, ReplyFrame};
pub use server::serve;
