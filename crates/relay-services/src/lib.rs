//! relay-services — chat transports, generation backends and the relay
//! orchestrator built on them.

pub mod delivery;
pub mod detector;
pub mod events;
pub mod generation;
pub mod memory;
pub mod race;
pub mod relay;
pub mod slack;
pub mod tasks;
pub mod ticker;
pub mod transport;

pub use delivery::{deliver, Delivery};
pub use detector::CompletionDetector;
pub use events::{EventLog, RelayEvent};
pub use generation::{GeminiGenerator, Generator};
pub use memory::{MemoryTransport, TransportOp};
pub use relay::{Relay, RelayOptions, RelayOutcome};
pub use slack::SlackTransport;
pub use tasks::RelayState;
pub use transport::{Blocks, ChatTransport};

/// HTTP client whose requests give up after `timeout`.
pub(crate) fn http_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}
