//! Raw query normalization.

use thiserror::Error;

/// Longest accepted query, in characters after trimming.
pub const MAX_INPUT_CHARS: usize = 100;

/// Caller-contract violations on the raw query.
///
/// These are never folded into a resolution result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Input was empty or whitespace only
    #[error("Input is empty")]
    Empty,

    /// Input exceeded the length limit
    #[error("Input is too long: {actual} characters, maximum is {max}")]
    TooLong { max: usize, actual: usize },
}

/// Trim and lowercase `raw`, rejecting empty or overlong input.
pub fn normalize_input(raw: &str, max_chars: usize) -> Result<String, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    let actual = trimmed.chars().count();
    if actual > max_chars {
        return Err(InputError::TooLong {
            max: max_chars,
            actual,
        });
    }

    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        assert_eq!(normalize_input("  Put Off ", MAX_INPUT_CHARS).unwrap(), "put off");
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(normalize_input("", MAX_INPUT_CHARS), Err(InputError::Empty));
        assert_eq!(normalize_input(" \t\n ", MAX_INPUT_CHARS), Err(InputError::Empty));
    }

    #[test]
    fn test_length_limit_counts_chars() {
        let exact = "a".repeat(MAX_INPUT_CHARS);
        assert!(normalize_input(&exact, MAX_INPUT_CHARS).is_ok());

        let padded = format!("   {}   ", exact);
        assert!(normalize_input(&padded, MAX_INPUT_CHARS).is_ok());

        let over = "가".repeat(MAX_INPUT_CHARS + 1);
        assert_eq!(
            normalize_input(&over, MAX_INPUT_CHARS),
            Err(InputError::TooLong {
                max: MAX_INPUT_CHARS,
                actual: MAX_INPUT_CHARS + 1
            })
        );
    }
}
