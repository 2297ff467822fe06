//! Markdown to chat markup (Slack mrkdwn).
//!
//! Three rewrites, applied once each, in this order, over the whole text:
//!   1. `**bold**`        → `*bold*`
//!   2. `[label](url)`    → `<url|label>`
//!   3. `# Heading` lines → `*Heading*`
//!
//! Single pass only: a converted heading is not fed back through rule 1.

use std::sync::LazyLock;

use regex::Regex;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("hardcoded regex"));

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("hardcoded regex"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.+?)[ \t]*$").expect("hardcoded regex"));

pub fn to_chat_format(text: &str) -> String {
    let text = BOLD.replace_all(text, "*${1}*");
    let text = LINK.replace_all(&text, "<${2}|${1}>");
    let text = HEADING.replace_all(&text, "*${1}*");
    text.into_owned()
}
