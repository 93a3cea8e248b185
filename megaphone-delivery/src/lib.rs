//! Rate-limited broadcast delivery for a messaging provider
//!
//! This crate provides functionality to:
//! - Parse broadcast commands into a payload and a set of target flags
//! - Deliver a payload to primary chats and secondary users in paced batches
//! - Serve provider rate-limit waits and prune permanently unreachable destinations
//! - Deliver through secondary identities to their live dialogs
//! - Keep a per-chat operator cache fresh in the background

pub mod backends;
mod classify;
mod config;
mod dispatcher;
mod error;
mod orchestrator;
mod prune;
mod rate_limiter;
mod reconciler;
mod request;
mod traits;
mod types;

pub use classify::{FailureClass, classify};
pub use config::{BroadcastConfig, ReconcilerConfig};
pub use dispatcher::BatchDispatcher;
pub use error::{
    BroadcastError, DeliveryError, DirectoryError, PermanentError, ReconcileError, SinkError,
    TemporaryError,
};
pub use orchestrator::{BroadcastOrchestrator, Collaborators, Notice, RunGuard, SingleFlight};
pub use prune::{DestinationPruner, PruneCapabilities, Remover};
pub use rate_limiter::{Backoff, BackoffPolicy, Pacing};
pub use reconciler::{AdminCache, BackgroundReconciler, decode_alpha_id, encode_alpha_id};
pub use request::{BroadcastCommand, DeliveryRequest, TargetFlags};
pub use traits::{
    ChatAdministrator, Directory, IdentityClient, MessageSender, StatusHandle, StatusSink,
    Transport,
};
pub use types::{
    BroadcastSummary, ChatId, DeliveryOutcome, DeliveryReport, Destination, DestinationKind,
    IdentityReport, MessageId, MessageRef, Payload, PinMode, RunId, SentMessage, UserId,
};
