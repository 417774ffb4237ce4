//! Parsing of `activate` / `deactivate` targets.
//!
//! - `3`        -- a single index
//! - `0,2,5`    -- several indices
//! - `@name`    -- a prompt group
//! - `all`      -- every active prompt (deactivate only)

use std::str::FromStr;

use promptset_core::parse_index_list;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Index(usize),
    Indices(Vec<usize>),
    Group(String),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetParseError {
    #[error("group name after '@' must not be empty (e.g. @my_group)")]
    EmptyGroup,
    #[error("{0}")]
    BadIndices(String),
    #[error("invalid target {0:?}: expected an index, a comma-separated index list, @group or all")]
    Unrecognized(String),
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(group) = s.strip_prefix('@') {
            if group.is_empty() {
                return Err(TargetParseError::EmptyGroup);
            }
            return Ok(Self::Group(group.to_owned()));
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if s.contains(',') {
            return parse_index_list(s)
                .map(Self::Indices)
                .map_err(|e| TargetParseError::BadIndices(e.to_string()));
        }
        s.parse::<usize>()
            .map(Self::Index)
            .map_err(|_| TargetParseError::Unrecognized(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_form() {
        assert_eq!("3".parse(), Ok(Target::Index(3)));
        assert_eq!("0, 2,5".parse(), Ok(Target::Indices(vec![0, 2, 5])));
        assert_eq!("@focus".parse(), Ok(Target::Group("focus".into())));
        assert_eq!("ALL".parse(), Ok(Target::All));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("@".parse::<Target>(), Err(TargetParseError::EmptyGroup));
        assert!(matches!("1,x".parse::<Target>(), Err(TargetParseError::BadIndices(_))));
        assert!(matches!("-1".parse::<Target>(), Err(TargetParseError::Unrecognized(_))));
        assert!(matches!("abc".parse::<Target>(), Err(TargetParseError::Unrecognized(_))));
    }
}
