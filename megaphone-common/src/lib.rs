pub mod logging;

pub use tracing;

/// Lifecycle signals fanned out by the supervisor to its long-lived tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
    Finalised,
}
