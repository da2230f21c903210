//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Routing Model
//! - An `Envelope` is routed by its owning application id and its category
//!   (log or metric)
//! - Consumers subscribe with a `SubscriptionRequest` and receive serialized
//!   envelopes through a `DataSetter`

mod blueprint;
mod envelope;
mod error;
mod setter;
mod stream;
mod subscription;

pub use blueprint::*;
pub use envelope::*;
pub use error::*;
pub use setter::*;
pub use stream::{BatchStream, EnvelopeStream, LocalBatchStream, LocalEnvelopeStream};
pub use subscription::*;
