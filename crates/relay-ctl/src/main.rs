//! relay-ctl — command-line interface for the relay daemon.

mod cmd;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 3000;

fn print_usage() {
    println!("Usage: relay-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                                  Show daemon status");
    println!("  events                                  List recent relay events");
    println!("  sign <channel> <ts> <prompt>            Print signature and live link");
    println!("  submit <channel> <ts> <prompt>          Sign and submit a task");
    println!("  update <channel> <ts> <prompt> <text>   Push a finished answer");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["events"] => cmd::events::cmd_events(port).await,
        ["sign", channel, ts, prompt @ ..] if !prompt.is_empty() => {
            cmd::tasks::cmd_sign(channel, ts, &prompt.join(" "))
        }
        ["submit", channel, ts, prompt @ ..] if !prompt.is_empty() => {
            cmd::tasks::cmd_submit(port, channel, ts, &prompt.join(" ")).await
        }
        ["update", channel, ts, prompt, text @ ..] if !text.is_empty() => {
            cmd::tasks::cmd_update(port, channel, ts, prompt, &text.join(" ")).await
        }
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
