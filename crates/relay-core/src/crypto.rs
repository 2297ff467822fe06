//! Cryptographic primitives for the relay.
//!
//! Provides two things:
//!   1. Task signatures: HMAC-SHA256 over `prompt || channel || ts`
//!   2. BLAKE3 task ids: stable identifiers for a message slot
//!
//! The signature authorises both the background hand-off and the live-view
//! completion path, so it acts as a capability token for that exact message.
//! The secret never leaves the `Signer`; only minted signatures do, inside
//! server-built live links.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::RelayError;
use crate::task::{Task, VerifiedTask};

type HmacSha256 = Hmac<Sha256>;

// ── Signer ────────────────────────────────────────────────────────────────────

/// Holds the process-wide shared secret. Wiped from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Signer {
    secret: Vec<u8>,
}

impl Signer {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, CryptoError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    fn keyed(&self, prompt: &str, channel: &str, ts: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(prompt.as_bytes());
        mac.update(channel.as_bytes());
        mac.update(ts.as_bytes());
        mac
    }

    /// Hex-encoded signature for one task.
    pub fn sign(&self, prompt: &str, channel: &str, ts: &str) -> String {
        hex::encode(self.keyed(prompt, channel, ts).finalize().into_bytes())
    }

    /// Recompute and compare. The comparison runs in constant time.
    pub fn verify(&self, prompt: &str, channel: &str, ts: &str, sig: &str) -> bool {
        let Ok(provided) = hex::decode(sig.trim()) else {
            return false;
        };
        self.keyed(prompt, channel, ts)
            .verify_slice(&provided)
            .is_ok()
    }

    /// Mint a signed task at send time.
    pub fn sign_task(&self, prompt: &str, channel: &str, ts: &str) -> Task {
        Task {
            prompt: prompt.to_string(),
            channel: channel.to_string(),
            ts: ts.to_string(),
            sig: self.sign(prompt, channel, ts),
        }
    }

    /// Gate for every inbound task. A mismatch is `RelayError::Auth`.
    pub fn verify_task(&self, task: Task) -> Result<VerifiedTask, RelayError> {
        if self.verify(&task.prompt, &task.channel, &task.ts, &task.sig) {
            Ok(VerifiedTask::new(task))
        } else {
            Err(RelayError::Auth)
        }
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

// ── BLAKE3 ────────────────────────────────────────────────────────────────────

/// Identity of a message slot.
///
///   task_id = BLAKE3(channel || 0x00 || ts)
///
/// The separator keeps ("C1", "23") and ("C12", "3") apart.
pub fn task_id(channel: &str, ts: &str) -> [u8; 32] {
    let mut h = blake3::Hasher::new();
    h.update(channel.as_bytes());
    h.update(&[0u8]);
    h.update(ts.as_bytes());
    *h.finalize().as_bytes()
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("signing secret must not be empty")]
    EmptySecret,
}
