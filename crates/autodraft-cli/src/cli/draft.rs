//! Draft subcommands: show, save, clear, list, check, resolve.

use anyhow::{Context, Result};
use autodraft_core::storage::draft_store::DraftStore;
use autodraft_types::draft::{Detection, DraftLoad, Resolution, ServerSnapshot};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::Value;

use crate::cli::parse_value;
use crate::state::AppState;

const PREVIEW_CHARS: usize = 60;

/// Compact single-line preview of a JSON value.
pub(crate) fn preview(value: &Value) -> String {
    let text = serde_json::to_string(value).unwrap_or_default();
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        text
    }
}

/// Print the stored draft for `key`.
pub async fn show(state: &AppState, key: &str, json: bool) -> Result<()> {
    let loaded = state
        .controller
        .load::<Value>(key)
        .await
        .with_context(|| format!("Failed to load draft '{key}'"))?;

    if json {
        let result = match &loaded {
            DraftLoad::Present(draft) => serde_json::json!({
                "key": key,
                "content": draft.content,
                "saved_at": draft.saved_at,
            }),
            DraftLoad::Absent => serde_json::json!({ "key": key, "content": null }),
            DraftLoad::Malformed { reason, .. } => serde_json::json!({
                "key": key,
                "content": null,
                "malformed": reason,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    match loaded {
        DraftLoad::Present(draft) => {
            println!(
                "  {} {}",
                style(key).cyan().bold(),
                style(format!("saved {}", draft.saved_at.format("%Y-%m-%d %H:%M:%S UTC"))).dim(),
            );
            println!();
            for line in serde_json::to_string_pretty(&draft.content)?.lines() {
                println!("  {line}");
            }
        }
        DraftLoad::Absent => {
            println!("  {} No draft stored for '{}'", style("i").blue().bold(), style(key).cyan());
        }
        DraftLoad::Malformed { reason, .. } => {
            println!(
                "  {} Draft '{}' is malformed: {}",
                style("!").yellow().bold(),
                style(key).cyan(),
                reason,
            );
        }
    }
    println!();

    Ok(())
}

/// Save `raw` under `key` right away.
pub async fn save(state: &AppState, key: &str, raw: &str, json: bool) -> Result<()> {
    let value = parse_value(raw);
    let saved_at = state
        .controller
        .save_now(key, &value)
        .await
        .with_context(|| format!("Failed to save draft '{key}'"))?;

    if json {
        let result = serde_json::json!({
            "key": key,
            "content": value,
            "saved_at": saved_at,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!("  {} Saved draft '{}'", style("ok").green(), style(key).cyan());
        println!();
    }

    Ok(())
}

/// Remove the draft for `key`.
pub async fn clear(state: &AppState, key: &str, json: bool) -> Result<()> {
    state
        .controller
        .clear(key)
        .await
        .with_context(|| format!("Failed to clear draft '{key}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "cleared": key }))?);
    } else {
        println!();
        println!("  {} Cleared draft '{}'", style("ok").green(), style(key).cyan());
        println!();
    }

    Ok(())
}

/// List every stored draft with a content preview.
pub async fn list(state: &AppState, json: bool) -> Result<()> {
    let keys = state
        .controller
        .store()
        .keys()
        .await
        .context("Failed to list drafts")?;

    let mut rows = Vec::with_capacity(keys.len());
    for key in &keys {
        rows.push((key, state.controller.load::<Value>(key).await?));
    }

    if json {
        let drafts: Vec<Value> = rows
            .iter()
            .map(|(key, loaded)| match loaded {
                DraftLoad::Present(draft) => serde_json::json!({
                    "key": key,
                    "saved_at": draft.saved_at,
                    "content": draft.content,
                }),
                _ => serde_json::json!({ "key": key, "malformed": true }),
            })
            .collect();
        let result = serde_json::json!({
            "backend": state.config.backend.to_string(),
            "drafts": drafts,
            "count": drafts.len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!("  {} No drafts stored.", style("i").blue().bold());
        println!("     Save one with: adraft save <key> <json-value>");
        println!();
        return Ok(());
    }

    println!();
    println!(
        "  Drafts in {} ({} entries)",
        style(state.data_dir.display()).cyan(),
        rows.len(),
    );
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Key").fg(Color::White),
        Cell::new("Saved").fg(Color::White),
        Cell::new("Content Preview").fg(Color::White),
    ]);

    for (key, loaded) in &rows {
        let (saved, content) = match loaded {
            DraftLoad::Present(draft) => (
                draft.saved_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                preview(&draft.content),
            ),
            _ => ("-".to_string(), "(malformed)".to_string()),
        };
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(&saved),
            Cell::new(&content).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();

    Ok(())
}

/// Compare the stored draft with an optional server snapshot.
pub async fn check(state: &AppState, key: &str, server: Option<&str>, json: bool) -> Result<()> {
    let snapshot = server.map(|raw| ServerSnapshot::new(parse_value(raw)));
    let restored = state.controller.restore(key, snapshot.as_ref()).await?;

    if json {
        let result = match &restored.detection {
            Detection::NoConflict => serde_json::json!({
                "key": key,
                "conflict": false,
                "local": restored.clean_content(),
            }),
            Detection::Conflict(conflict) => serde_json::json!({
                "key": key,
                "conflict": true,
                "local": conflict.local.content,
                "server": conflict.server.content,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    match restored.detection {
        Detection::NoConflict => {
            println!("  {} No conflict for '{}'", style("ok").green(), style(key).cyan());
            if let Some(draft) = &restored.local {
                println!("  {}", style(preview(&draft.content)).dim());
            }
        }
        Detection::Conflict(conflict) => {
            println!(
                "  {} Draft conflict detected for '{}'",
                style("!").yellow().bold(),
                style(key).cyan(),
            );
            println!();
            println!("  {} {}", style("Local: ").bold(), preview(&conflict.local.content));
            println!("  {} {}", style("Server:").bold(), preview(&conflict.server.content));
            println!();
            println!(
                "  Resolve with: adraft resolve {key} --server '<json>' --keep local|server"
            );
        }
    }
    println!();

    Ok(())
}

/// Resolve a conflict for `key` in favor of `keep`.
pub async fn resolve(
    state: &AppState,
    key: &str,
    server: &str,
    keep: Resolution,
    json: bool,
) -> Result<()> {
    let snapshot = ServerSnapshot::new(parse_value(server));
    let restored = state.controller.restore(key, Some(&snapshot)).await?;

    let (conflicted, current) = match restored.detection {
        Detection::NoConflict => (
            false,
            restored
                .local
                .map(|draft| draft.content)
                .unwrap_or(snapshot.content),
        ),
        Detection::Conflict(conflict) => (
            true,
            state
                .controller
                .resolve(&conflict, keep)
                .await
                .with_context(|| format!("Failed to resolve conflict for '{key}'"))?,
        ),
    };

    if json {
        let result = serde_json::json!({
            "key": key,
            "conflict": conflicted,
            "kept": if conflicted { Some(keep) } else { None },
            "content": current,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    if conflicted {
        let side = match keep {
            Resolution::KeepLocal => "local draft",
            Resolution::KeepServer => "server version",
        };
        println!(
            "  {} Kept {} for '{}'",
            style("ok").green(),
            side,
            style(key).cyan(),
        );
    } else {
        println!(
            "  {} Nothing to resolve for '{}'",
            style("i").blue().bold(),
            style(key).cyan(),
        );
    }
    println!("  {}", style(preview(&current)).dim());
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preview_short_value_unchanged() {
        assert_eq!(preview(&json!({"title": "A"})), r#"{"title":"A"}"#);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = json!("é".repeat(100));
        let out = preview(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), PREVIEW_CHARS);
    }
}
