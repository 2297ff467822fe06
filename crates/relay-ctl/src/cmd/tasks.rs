//! Signing, submission and completion commands.
//!
//! The signing secret comes from `SIGNING_SECRET` or the relay config file,
//! the same way relayd resolves it.

use anyhow::{Context, Result};
use serde::Deserialize;

use relay_core::config::RelayConfig;
use relay_core::{CompletionUpdate, LiveLink, Signer, Task};

use super::http::{base_url, post_json_body};

#[derive(Deserialize)]
struct ProcessResponse {
    accepted: bool,
    task_id: String,
}

#[derive(Deserialize)]
struct UpdateResponse {
    success: bool,
    delivery: String,
}

fn load() -> Result<(RelayConfig, Signer)> {
    let config = RelayConfig::load().context("failed to load config")?;
    let signer = Signer::new(config.require_secret()?).context("invalid signing secret")?;
    Ok((config, signer))
}

pub fn cmd_sign(channel: &str, ts: &str, prompt: &str) -> Result<()> {
    let (config, signer) = load()?;
    let task = signer.sign_task(prompt, channel, ts);
    let link = LiveLink::new(&config.server.public_url, &config.server.live_path, &task);

    println!("sig  : {}", task.sig);
    println!("link : {}", link);
    Ok(())
}

pub async fn cmd_submit(port: u16, channel: &str, ts: &str, prompt: &str) -> Result<()> {
    let (_, signer) = load()?;
    let task: Task = signer.sign_task(prompt, channel, ts);

    let resp: ProcessResponse =
        post_json_body(&format!("{}/process", base_url(port)), &task).await?;
    if resp.accepted {
        println!("Task accepted: {}", resp.task_id);
    }
    Ok(())
}

pub async fn cmd_update(port: u16, channel: &str, ts: &str, prompt: &str, text: &str) -> Result<()> {
    let (_, signer) = load()?;
    let task = signer.sign_task(prompt, channel, ts);
    let update = CompletionUpdate {
        channel: task.channel,
        ts: task.ts,
        text: text.to_string(),
        prompt: task.prompt,
        sig: task.sig,
    };

    let resp: UpdateResponse =
        post_json_body(&format!("{}/update", base_url(port)), &update).await?;
    if resp.success {
        println!("Message updated ({})", resp.delivery);
    }
    Ok(())
}
