//! relay-core — shared types, task signing, and message rendering.
//! All other relay crates depend on this one.

pub mod banner;
pub mod config;
pub mod crypto;
pub mod error;
pub mod link;
pub mod markdown;
pub mod task;

pub use banner::{classify, MessageState, ProgressStyle};
pub use crypto::Signer;
pub use error::{DeliveryError, GenerationError, RelayError};
pub use link::LiveLink;
pub use task::{CompletionUpdate, MessageRef, Task, VerifiedTask};
