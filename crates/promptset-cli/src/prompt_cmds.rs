//! CLI handlers for prompts in the current preset.
//!
//! Implements:
//! - `promptset list`                      -- all prompts, marking active ones
//! - `promptset activate <target>`         -- index, `i,j,k` or `@group`
//! - `promptset deactivate <target>`       -- active index, `i,j,k`, `@group` or `all`
//! - `promptset view prompt|prefix|group|active`
//! - `promptset add <name> [content]`      -- content from stdin when omitted or `-`
//! - `promptset edit <index> <name> [content]`
//! - `promptset delete <index>`

use std::io::Read;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use promptset_core::{Prompt, SessionCoordinator};

use crate::ViewCommands;
use crate::output::{Printer, prompt_names};
use crate::target::Target;

// -----------------------------------------------------------------------
// promptset list
// -----------------------------------------------------------------------

#[derive(Serialize)]
struct PromptRow<'a> {
    index: usize,
    active: bool,
    #[serde(flatten)]
    prompt: &'a Prompt,
}

pub fn cmd_list(session: &SessionCoordinator, printer: Printer) -> Result<()> {
    require_preset(session)?;
    let rows: Vec<PromptRow<'_>> = session
        .current_prompts()
        .iter()
        .enumerate()
        .map(|(index, prompt)| PromptRow {
            index,
            active: session.active_prompts().contains(prompt),
            prompt,
        })
        .collect();
    printer.view(&rows, || {
        format_prompt_list(session.current_preset_name(), &rows, session.active_prompts().len())
    })
}

fn format_prompt_list(preset: &str, rows: &[PromptRow<'_>], active_count: usize) -> String {
    if rows.is_empty() {
        return format!(
            "Preset {preset:?} has no prompts. Add one with `promptset add <name> <content>`."
        );
    }
    let mut out = format!("Preset: {preset}\n\n");
    for row in rows {
        let marker = if row.active { "* " } else { "  " };
        out.push_str(&format!("{marker}{}. {}\n", row.index, row.prompt.name));
    }
    match active_count {
        0 => out.push_str("\nNo prompts are active."),
        n => out.push_str(&format!("\n{n} prompts active.")),
    }
    out
}

// -----------------------------------------------------------------------
// promptset activate / deactivate
// -----------------------------------------------------------------------

pub fn cmd_activate(session: &mut SessionCoordinator, printer: Printer, target: Target) -> Result<()> {
    let outcome = match target {
        Target::Index(index) => {
            let outcome = session.activate_prompt(index);
            let active = session.active_prompts().len();
            return printer.outcome(outcome, |_| Some(format!("{active} prompts active.")));
        }
        Target::Indices(indices) => session.activate_prompts(&indices),
        Target::Group(name) => session.activate_prompt_group(&name),
        Target::All => bail!("`all` can only be used with `deactivate`"),
    };
    let active = session.active_prompts().len();
    printer.outcome(outcome, |newly| {
        (!newly.is_empty()).then(|| format!("{}\n{active} prompts active.", prompt_names(newly)))
    })
}

pub fn cmd_deactivate(
    session: &mut SessionCoordinator,
    printer: Printer,
    target: Target,
) -> Result<()> {
    require_preset(session)?;
    let outcome = match target {
        Target::All => {
            let outcome = session.clear_active_prompts();
            return printer.outcome(outcome, |_| None);
        }
        Target::Index(index) => {
            let outcome = session.deactivate_prompt(index);
            let remaining = session.active_prompts().len();
            return printer.outcome(outcome, |_| Some(format!("{remaining} prompts remain active.")));
        }
        Target::Indices(indices) => session.deactivate_prompts(&indices),
        Target::Group(name) => session.deactivate_prompt_group(&name),
    };
    let remaining = session.active_prompts().len();
    printer.outcome(outcome, |removed| {
        let mut lines = Vec::new();
        if !removed.is_empty() {
            lines.push(prompt_names(removed));
        }
        lines.push(format!("{remaining} prompts remain active."));
        Some(lines.join("\n"))
    })
}

// -----------------------------------------------------------------------
// promptset view
// -----------------------------------------------------------------------

pub fn run_view_command(
    command: ViewCommands,
    session: &SessionCoordinator,
    printer: Printer,
) -> Result<()> {
    require_preset(session)?;
    match command {
        ViewCommands::Prompt { index } => view_prompt(session, printer, index),
        ViewCommands::Prefix => {
            let prefix = session.current_prefix();
            printer.view(&prefix, || {
                if prefix.is_empty() {
                    format!("Preset {:?} has no prefix.", session.current_preset_name())
                } else {
                    format!("Prefix of {:?}:\n\n{prefix}", session.current_preset_name())
                }
            })
        }
        ViewCommands::Group { name } => view_group(session, printer, &name),
        ViewCommands::Active => {
            let active = session.active_prompts();
            printer.view(&active, || {
                if active.is_empty() {
                    return "No prompts are active.".to_owned();
                }
                let mut out = String::from("Active prompts (use these indices with `deactivate`):\n");
                for (idx, prompt) in active.iter().enumerate() {
                    out.push_str(&format!("  {idx}. {}\n", prompt.name));
                }
                out.trim_end().to_owned()
            })
        }
    }
}

fn view_prompt(session: &SessionCoordinator, printer: Printer, index: usize) -> Result<()> {
    let prompts = session.current_prompts();
    let Some(prompt) = prompts.get(index) else {
        bail!(
            "invalid prompt index {index} (preset has {} prompts); see `promptset list`",
            prompts.len()
        );
    };
    let row = PromptRow {
        index,
        active: session.active_prompts().contains(prompt),
        prompt,
    };
    printer.view(&row, || {
        let state = if row.active { "active" } else { "inactive" };
        format!(
            "Prompt {index}: {} ({}, {state})\n\n{}",
            prompt.name, prompt.origin, prompt.content
        )
    })
}

#[derive(Serialize)]
struct GroupMember<'a> {
    index: usize,
    /// `None` when the index no longer points at a prompt.
    prompt: Option<&'a Prompt>,
    active: bool,
}

fn view_group(session: &SessionCoordinator, printer: Printer, name: &str) -> Result<()> {
    let Some(indices) = session.prompt_group(name) else {
        bail!("group {name:?} does not exist; see `promptset group list`");
    };
    let prompts = session.current_prompts();
    let members: Vec<GroupMember<'_>> = indices
        .iter()
        .map(|&index| {
            let prompt = prompts.get(index);
            GroupMember {
                index,
                prompt,
                active: prompt.is_some_and(|p| session.active_prompts().contains(p)),
            }
        })
        .collect();
    printer.view(&members, || {
        let mut out = format!("Group @{name}:\n");
        if members.is_empty() {
            out.push_str("  (empty)\n");
        }
        for member in &members {
            match member.prompt {
                Some(prompt) => {
                    let marker = if member.active { "*" } else { " " };
                    out.push_str(&format!("  {marker} {}. {}\n", member.index, prompt.name));
                }
                None => out.push_str(&format!("    {}. (invalid index)\n", member.index)),
            }
        }
        out.push_str(&format!("\nActivate with `promptset activate @{name}`."));
        out
    })
}

// -----------------------------------------------------------------------
// promptset add / edit / delete
// -----------------------------------------------------------------------

pub fn cmd_add(
    session: &mut SessionCoordinator,
    printer: Printer,
    name: &str,
    content: Option<String>,
) -> Result<()> {
    require_preset(session)?;
    let content = read_content(content)?;
    let outcome = session.add_prompt(name, &content);
    let index = session.current_prompts().len().saturating_sub(1);
    printer.outcome(outcome, |_| Some(format!("Index: {index}")))
}

pub fn cmd_edit(
    session: &mut SessionCoordinator,
    printer: Printer,
    index: usize,
    name: &str,
    content: Option<String>,
) -> Result<()> {
    let content = read_content(content)?;
    let outcome = session.update_prompt(index, name, &content);
    printer.outcome(outcome, |_| None)
}

pub fn cmd_delete(session: &mut SessionCoordinator, printer: Printer, index: usize) -> Result<()> {
    let outcome = session.delete_prompt(index);
    printer.outcome(outcome, |_| {
        Some("Later prompts shifted down by one; group indices are not adjusted.".to_owned())
    })
}

/// Use `arg` unless it is absent or `-`, in which case read stdin.
fn read_content(arg: Option<String>) -> Result<String> {
    match arg {
        Some(content) if content != "-" => Ok(content),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read prompt content from stdin")?;
            Ok(buf.trim_end_matches(['\r', '\n']).to_owned())
        }
    }
}

fn require_preset(session: &SessionCoordinator) -> Result<()> {
    if session.current_preset_name().is_empty() {
        bail!("no preset is selected; see `promptset presets` and `promptset use <index>`");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_list_marks_active_rows() {
        let a = Prompt::extracted("A", "alpha");
        let b = Prompt::user("B", "beta");
        let rows = vec![
            PromptRow { index: 0, active: true, prompt: &a },
            PromptRow { index: 1, active: false, prompt: &b },
        ];
        let text = format_prompt_list("rp", &rows, 1);
        assert!(text.starts_with("Preset: rp\n"));
        assert!(text.contains("* 0. A\n"));
        assert!(text.contains("  1. B\n"));
        assert!(text.ends_with("1 prompts active."));
    }

    #[test]
    fn empty_prompt_list_suggests_add() {
        assert!(format_prompt_list("rp", &[], 0).contains("promptset add"));
    }

    #[test]
    fn explicit_content_skips_stdin() {
        assert_eq!(read_content(Some("hello".into())).unwrap(), "hello");
    }

    #[test]
    fn prompt_row_serializes_flat() {
        let p = Prompt::user("B", "beta");
        let row = PromptRow { index: 1, active: false, prompt: &p };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["index"], 1);
        assert_eq!(json["name"], "B");
        assert_eq!(json["origin"], "user-created");
    }
}
