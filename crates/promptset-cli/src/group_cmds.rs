//! CLI handlers for `promptset group` subcommands.

use anyhow::Result;

use promptset_core::{GroupMap, Prompt, SessionCoordinator, parse_index_list};

use crate::GroupCommands;
use crate::output::Printer;

/// Dispatch a `GroupCommands` variant to the appropriate handler.
pub fn run_group_command(
    command: GroupCommands,
    session: &mut SessionCoordinator,
    printer: Printer,
) -> Result<()> {
    match command {
        GroupCommands::List => {
            let groups = session.prompt_groups();
            printer.view(groups, || {
                format_group_list(session.current_preset_name(), groups, session.current_prompts())
            })
        }
        GroupCommands::Create { name, indices } => {
            let indices = parse_index_list(&indices)?;
            let outcome = session.create_prompt_group(&name, &indices);
            printer.outcome(outcome, |_| {
                Some(format!("Activate with `promptset activate @{name}`."))
            })
        }
        GroupCommands::Update { name, indices } => {
            let indices = parse_index_list(&indices)?;
            let outcome = session.update_prompt_group(&name, &indices);
            printer.outcome(outcome, |_| None)
        }
        GroupCommands::Delete { name } => {
            let outcome = session.delete_prompt_group(&name);
            printer.outcome(outcome, |_| None)
        }
    }
}

fn format_group_list(preset: &str, groups: &GroupMap, prompts: &[Prompt]) -> String {
    if groups.is_empty() {
        return format!(
            "Preset {preset:?} has no groups. Create one with `promptset group create <name> <i,j,...>`."
        );
    }
    let mut out = format!("Groups in {preset:?}:\n\n");
    for (name, indices) in groups {
        let members = if indices.is_empty() {
            "(empty)".to_owned()
        } else {
            indices
                .iter()
                .map(|&idx| match prompts.get(idx) {
                    Some(p) => format!("{idx}.{}", p.name),
                    None => format!("{idx}.(invalid)"),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.push_str(&format!("@{name}: {members}\n"));
    }
    out.push_str("\nActivate with `promptset activate @<name>`.");
    out
}
