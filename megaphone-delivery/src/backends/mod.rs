//! In-memory collaborators
//!
//! - `memory`: directory service and secondary identities backed by plain lists
//! - `transport`: a provider connection with scripted per-destination failures
//! - `sink`: a status sink that records everything it is sent
//!
//! These back the test suites and let the engine be embedded without a live
//! provider.

pub mod memory;
pub mod sink;
pub mod transport;

pub use memory::{MemoryDirectory, MemoryIdentity};
pub use sink::RecordingSink;
pub use transport::{CallAction, RecordedCall, ScriptedTransport};
