//! Answer delivery with the oversized-payload fallback.

use relay_core::banner;
use relay_core::markdown::to_chat_format;
use relay_core::{DeliveryError, LiveLink, MessageRef};
use serde::Serialize;
use serde_json::json;

use crate::transport::{Blocks, ChatTransport};

/// How an answer reached the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// The converted answer itself.
    Direct,
    /// A short notice pointing at the live view.
    Fallback,
}

/// Convert `answer` to chat markup and write it. If the transport refuses it
/// as too large, write a notice with a button to the live view instead.
///
/// Only `PayloadTooLarge` triggers the fallback; other errors propagate.
pub async fn deliver(
    transport: &dyn ChatTransport,
    message: &MessageRef,
    answer: &str,
    link: &LiveLink,
) -> Result<Delivery, DeliveryError> {
    let text = banner::success(&to_chat_format(answer));
    match transport.update_message(message, &text, None).await {
        Ok(()) => Ok(Delivery::Direct),
        Err(DeliveryError::PayloadTooLarge(reason)) => {
            tracing::info!(
                task = %message.short_id(),
                len = text.chars().count(),
                %reason,
                "answer too large, sending live link"
            );
            write_notice(transport, message, link).await?;
            Ok(Delivery::Fallback)
        }
        Err(e) => Err(e),
    }
}

async fn write_notice(
    transport: &dyn ChatTransport,
    message: &MessageRef,
    link: &LiveLink,
) -> Result<(), DeliveryError> {
    let notice = banner::oversized(link);
    match transport
        .update_message(message, &notice, Some(&notice_blocks(link)))
        .await
    {
        // Slack caps button URLs; a long prompt can push the link past it.
        Err(DeliveryError::PayloadTooLarge(_)) => {
            transport.update_message(message, &notice, None).await
        }
        other => other,
    }
}

fn notice_blocks(link: &LiveLink) -> Blocks {
    json!([
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": "🤖 The answer is too long to show here." }
        },
        {
            "type": "actions",
            "elements": [{
                "type": "button",
                "text": { "type": "plain_text", "text": "View full answer" },
                "url": link.as_str(),
            }]
        }
    ])
}
