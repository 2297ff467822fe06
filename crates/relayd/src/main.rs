//! relayd — AI generation progress relay daemon.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use relay_api::ApiState;
use relay_core::config::RelayConfig;
use relay_core::Signer;
use relay_services::{
    ChatTransport, GeminiGenerator, MemoryTransport, Relay, RelayOptions, SlackTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = RelayConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = RelayConfig::load().context("failed to load config")?;
    let signer = Signer::new(config.require_secret()?).context("invalid signing secret")?;

    // Chat transport
    let transport: Arc<dyn ChatTransport> = if config.slack.bot_token.is_empty() {
        tracing::warn!("BOT_TOKEN not set, using in-memory transport, nothing reaches Slack");
        Arc::new(MemoryTransport::new())
    } else {
        Arc::new(
            SlackTransport::new(
                &config.slack.bot_token,
                &config.slack.api_base,
                config.slack.max_text_len,
            )
            .with_timeout(config.slack.timeout()),
        )
    };

    // Generation backend
    if config.generation.api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY not set; every task will end with an error banner");
    }
    let generator = Arc::new(
        GeminiGenerator::new(
            &config.generation.api_key,
            &config.generation.api_base,
            &config.generation.model,
        )
        .with_timeout(config.generation.timeout()),
    );
    let system_instruction = read_context(&config.generation.context_path);

    let relay = Relay::new(
        signer,
        transport,
        generator,
        RelayOptions {
            settings: config.relay.clone(),
            public_url: config.server.public_url.clone(),
            live_path: config.server.live_path.clone(),
            system_instruction,
        },
    );
    tracing::info!(
        model = %config.generation.model,
        deadline_secs = config.relay.deadline_secs,
        tick_interval_ms = config.relay.tick_interval_ms,
        public_url = %config.server.public_url,
        "relay ready"
    );

    // Shutdown signal
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let api_task = {
        let state = ApiState::new(relay.clone());
        let bind = config.server.bind.clone();
        let port = config.server.port;
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = relay_api::serve(state, &bind, port, shutdown).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    let stats_printer = {
        let relay = relay.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(Duration::from_secs(60));
            ticks.tick().await;
            loop {
                ticks.tick().await;
                tracing::info!(
                    active_tasks = relay.active_tasks(),
                    events = relay.events().len(),
                    "relay stats"
                );
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = api_task           => tracing::error!("API task exited: {:?}", r),
        r = stats_printer      => tracing::error!("stats printer exited: {:?}", r),
    }

    Ok(())
}

/// System instruction for the generator. Missing or empty file = none.
fn read_context(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!(path = %path.display(), len = text.len(), "context loaded");
            Some(text)
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "no context file, running without system instruction");
            None
        }
    }
}
