use crate::prompt::Prompt;

const SEPARATOR: &str = "\n\n";

/// Prepend `prefix` and the content of each active prompt to `system`.
///
/// Empty parts are skipped. With nothing to prepend `system` is returned
/// unchanged; with an empty `system` the block stands alone.
pub fn compose_system_prompt(prefix: &str, active: &[Prompt], system: &str) -> String {
    let parts: Vec<&str> = std::iter::once(prefix)
        .chain(active.iter().map(|p| p.content.as_str()))
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        return system.to_owned();
    }
    let block = parts.join(SEPARATOR);
    if system.is_empty() {
        block
    } else {
        format!("{block}{SEPARATOR}{system}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_then_active_then_system() {
        let active = [Prompt::extracted("A", "a"), Prompt::extracted("C", "c")];
        assert_eq!(
            compose_system_prompt("SYS", &active, "orig"),
            "SYS\n\na\n\nc\n\norig"
        );
    }

    #[test]
    fn nothing_to_prepend_returns_system() {
        assert_eq!(compose_system_prompt("", &[], "orig"), "orig");
        assert_eq!(compose_system_prompt("", &[], ""), "");
    }

    #[test]
    fn empty_system_yields_block_alone() {
        let active = [Prompt::user("x", "only")];
        assert_eq!(compose_system_prompt("", &active, ""), "only");
    }

    #[test]
    fn empty_contents_are_skipped() {
        let active = [Prompt::user("blank", ""), Prompt::user("b", "b")];
        assert_eq!(compose_system_prompt("P", &active, "s"), "P\n\nb\n\ns");
    }
}
