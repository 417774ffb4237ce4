use crate::error::SessionError;

/// Parse a comma-separated index list such as `"0, 2,5"`.
///
/// Whitespace around entries is ignored. Empty input, empty entries and
/// anything that is not a non-negative integer are rejected.
pub fn parse_index_list(input: &str) -> Result<Vec<usize>, SessionError> {
    if input.trim().is_empty() {
        return Err(SessionError::validation("index list must not be empty"));
    }
    input
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<usize>().map_err(|_| {
                SessionError::validation(format!(
                    "malformed index list {input:?}: {part:?} is not an index (expected e.g. 0,1,5)"
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_whitespace() {
        assert_eq!(parse_index_list("0, 2,5").unwrap(), vec![0, 2, 5]);
        assert_eq!(parse_index_list(" 7 ").unwrap(), vec![7]);
    }

    #[test]
    fn keeps_duplicates_and_order() {
        assert_eq!(parse_index_list("3,1,3").unwrap(), vec![3, 1, 3]);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "  ", "1,,2", "a", "1,-2", "1.5", "1,"] {
            assert!(parse_index_list(bad).is_err(), "{bad:?}");
        }
    }
}
