//! CRUND-style datastore access-path microbenchmark.
//!
//! Drives parameterized create/read/update/navigate/delete sequences against
//! a datastore through swappable access paths, sweeping working-set size and
//! commit batching strategy, and logs timing/memory statistics in a stable
//! tab-separated format for offline comparison.
//!
//! Two access paths ship in-tree: a plain-SQL client over SQLite and an
//! embedded in-process store. Further paths (ORM layers, native bindings)
//! implement [`adapters::LoadAdapter`] and register in the adapter factory.
//!
//! Run the benchmark: `cargo run --release --bin crund-bench -- -p crund.toml`
//! Post-process a log: `cargo run --release --bin crund-stats -- crund.log`

pub mod adapters;
pub mod config;
pub mod driver;
pub mod error;
pub mod mem;
pub mod ops;
pub mod process;
pub mod resultlog;
pub mod runner;
pub mod stats;
pub mod sweep;
pub mod verify;

pub use config::BenchConfig;
pub use error::{BenchError, BenchResult};
