//! Live links: pre-signed URLs to the out-of-band answer view.

use std::fmt;

use crate::task::Task;

/// A server-minted URL carrying a task's signature.
///
/// The viewer behind it can read the answer and push it back through the
/// completion endpoint. The shared secret itself is never embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveLink(String);

impl LiveLink {
    /// `{public_url}{live_path}?prompt=..&channel=..&ts=..&sig=..`
    pub fn new(public_url: &str, live_path: &str, task: &Task) -> Self {
        let base = public_url.trim_end_matches('/');
        let path = if live_path.starts_with('/') {
            live_path.to_string()
        } else {
            format!("/{live_path}")
        };
        Self(format!(
            "{base}{path}?prompt={}&channel={}&ts={}&sig={}",
            urlencoding::encode(&task.prompt),
            urlencoding::encode(&task.channel),
            urlencoding::encode(&task.ts),
            urlencoding::encode(&task.sig),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chat-markup anchor: `<url|label>`.
    pub fn anchor(&self, label: &str) -> String {
        format!("<{}|{}>", self.0, label)
    }
}

impl fmt::Display for LiveLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
