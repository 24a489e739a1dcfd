//! heatsep: online hot/cold key separators.
//!
//! Each policy in [`policy`] watches a stream of reads and writes and
//! classifies keys as hot or cold in real time with bounded memory. The
//! [`builder`] module ties the policies together behind one closed type,
//! [`sync`] adds the per-instance lock a multi-worker host needs and
//! [`config`] loads a set of instances from JSON.

pub mod builder;
pub mod clock;
pub mod config;
pub mod ds;
pub mod error;
pub mod policy;
pub mod report;
pub mod sync;
pub mod trace;
pub mod traits;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
