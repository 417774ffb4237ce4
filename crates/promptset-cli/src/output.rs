//! Turning coordinator outcomes into terminal output and exit status.

use anyhow::Result;
use serde::Serialize;

use promptset_core::{ErrorKind, Outcome, Prompt};

/// A failed operation. `reported` is set when the outcome was already
/// printed (JSON mode), so `main` only needs to set the exit status.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct OperationFailed {
    pub message: String,
    pub kind: Option<ErrorKind>,
    pub reported: bool,
}

impl OperationFailed {
    /// Exit status for the failure: 2 rejected input, 3 unknown preset or
    /// group, 4 storage failure, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            Some(ErrorKind::Validation) => 2,
            Some(ErrorKind::NotFound) => 3,
            Some(ErrorKind::Persistence) => 4,
            Some(ErrorKind::Internal) | None => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `outcome`; on success `detail` may append extra lines built
    /// from the payload. A failed outcome becomes an [`OperationFailed`].
    pub fn outcome<T: Serialize>(
        &self,
        outcome: Outcome<T>,
        detail: impl FnOnce(&T) -> Option<String>,
    ) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else if outcome.success {
            println!("{}", outcome.message);
            if let Some(extra) = detail(&outcome.payload) {
                println!("{extra}");
            }
        }
        if outcome.success {
            Ok(())
        } else {
            Err(OperationFailed {
                message: outcome.message,
                kind: outcome.error,
                reported: self.json,
            }
            .into())
        }
    }

    /// Print a read-only view: `value` as JSON, or `text` otherwise.
    pub fn view<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

/// `"A", "B"` style list of prompt names.
pub fn prompt_names(prompts: &[Prompt]) -> String {
    prompts
        .iter()
        .map(|p| format!("{:?}", p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptset_core::SessionError;

    #[test]
    fn failed_outcome_is_an_error() {
        let printer = Printer::new(false);
        let out: Outcome<Vec<Prompt>> = Outcome::failed(&SessionError::not_found("group \"g\" does not exist"));
        let err = printer.outcome(out, |_| None).unwrap_err();
        let failed = err.downcast_ref::<OperationFailed>().unwrap();
        assert_eq!(failed.kind, Some(ErrorKind::NotFound));
        assert_eq!(failed.exit_code(), 3);
        assert!(!failed.reported);
        assert_eq!(err.to_string(), "group \"g\" does not exist");
    }

    #[test]
    fn json_failures_are_marked_reported() {
        let printer = Printer::new(true);
        let out: Outcome<()> = Outcome::failed(&SessionError::validation("bad"));
        let err = printer.outcome(out, |_| None).unwrap_err();
        let failed = err.downcast_ref::<OperationFailed>().unwrap();
        assert!(failed.reported);
        assert_eq!(failed.exit_code(), 2);
    }

    #[test]
    fn names_are_quoted() {
        let prompts = [Prompt::user("a", "x"), Prompt::user("b c", "y")];
        assert_eq!(prompt_names(&prompts), "\"a\", \"b c\"");
    }
}
