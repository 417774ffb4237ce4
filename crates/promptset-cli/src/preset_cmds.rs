//! CLI handlers for preset management.
//!
//! Implements:
//! - `promptset presets`              -- list presets, marking the current one
//! - `promptset use <index>`          -- switch the current preset
//! - `promptset create-preset <name>` -- create an empty preset and switch to it
//! - `promptset refresh`              -- re-extract raw preset files

use anyhow::Result;
use serde::Serialize;

use promptset_core::SessionCoordinator;

use crate::output::Printer;

#[derive(Serialize)]
struct PresetsView<'a> {
    current: &'a str,
    presets: &'a [String],
}

pub fn cmd_presets(session: &SessionCoordinator, printer: Printer) -> Result<()> {
    let presets = session.preset_list();
    let current = session.current_preset_name();
    printer.view(&PresetsView { current, presets: &presets }, || {
        format_preset_list(&presets, current)
    })
}

fn format_preset_list(presets: &[String], current: &str) -> String {
    if presets.is_empty() {
        return "No presets available. Add preset files and run `promptset refresh`, \
                or create one with `promptset create-preset <name>`."
            .to_owned();
    }
    let mut out = String::from("Presets:\n");
    for (idx, name) in presets.iter().enumerate() {
        let marker = if name == current { "* " } else { "  " };
        out.push_str(&format!("{marker}{idx}. {name}\n"));
    }
    out.push_str("\nSwitch with `promptset use <index>`.");
    out
}

pub fn cmd_use(session: &mut SessionCoordinator, printer: Printer, index: usize) -> Result<()> {
    let outcome = session.switch_preset(index);
    let prompt_count = session.current_prompts().len();
    let active_count = session.active_prompts().len();
    printer.outcome(outcome, |_| {
        Some(format!(
            "{prompt_count} prompts, {active_count} active. List them with `promptset list`."
        ))
    })
}

pub fn cmd_create(session: &mut SessionCoordinator, printer: Printer, name: &str) -> Result<()> {
    let outcome = session.create_preset(name);
    printer.outcome(outcome, |_| {
        Some("It is now the current preset; add prompts with `promptset add <name> <content>`.".to_owned())
    })
}

pub fn cmd_refresh(session: &mut SessionCoordinator, printer: Printer) -> Result<()> {
    let outcome = session.refresh_prompts();
    let current = session.current_preset_name().to_owned();
    printer.outcome(outcome, |stats| {
        (stats.preset_count > 0).then(|| format!("Current preset: {current}"))
    })
}
