//! `adraft watch`: debounced autosave driven by stdin.
//!
//! Each non-empty stdin line is one state of the form (JSON, or plain text
//! stored as a string). States are fed to the autosave controller, so a
//! burst of lines collapses into a single save of the last one. Pending
//! saves are flushed at EOF.

use std::time::Duration;

use anyhow::{Context, Result};
use autodraft_types::event::AutosaveEvent;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::cli::parse_value;
use crate::state::AppState;

/// Run the watch loop until stdin closes.
pub async fn watch(state: &AppState, key: &str, delay_ms: Option<u64>, json: bool) -> Result<()> {
    let delay = delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| state.controller.default_delay());
    let mut events = state.controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !json {
        println!();
        println!(
            "  {} Watching '{}' (debounce {} ms). Close stdin to finish.",
            style("i").blue().bold(),
            style(key).cyan(),
            delay.as_millis(),
        );
        println!();
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                state.controller.observe(key, &parse_value(line), delay)?;
            }
            event = events.recv() => match event {
                Ok(event) => report(&event, json)?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch output lagged behind autosave events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    let flushed = state.controller.flush().await?;
    while let Ok(event) = events.try_recv() {
        report(&event, json)?;
    }
    tracing::debug!(flushed, "stdin closed");

    if let Some(error) = state.controller.last_error(key) {
        anyhow::bail!("last autosave of '{key}' failed: {error}");
    }

    Ok(())
}

fn report(event: &AutosaveEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        AutosaveEvent::Saved { key, saved_at, .. } => println!(
            "  {} Saved '{}' at {}",
            style("ok").green(),
            style(key).cyan(),
            saved_at.format("%H:%M:%S%.3f"),
        ),
        AutosaveEvent::SaveFailed { key, error } => println!(
            "  {} Autosave of '{}' failed: {}",
            style("!").red().bold(),
            style(key).cyan(),
            error,
        ),
        AutosaveEvent::PendingSync { key } => println!(
            "  {} '{}' saved offline, pending sync",
            style("i").blue().bold(),
            style(key).cyan(),
        ),
        AutosaveEvent::Scheduled { .. } | AutosaveEvent::Cleared { .. } | AutosaveEvent::Synced { .. } => {}
    }

    Ok(())
}
