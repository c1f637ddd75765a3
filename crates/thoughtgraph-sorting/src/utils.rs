//! List parsing and the scoring / ground-truth functions for sorting.

use thoughtgraph_core::{Error, Result, ThoughtState};

/// Score given to a state whose lists cannot be parsed.
pub const UNPARSABLE_SCORE: f64 = 300.0;

/// Parse a bracketed list of integers such as `"[1, 2, 3]"`.
pub fn string_to_list(s: &str) -> Result<Vec<i64>> {
    let s = s.trim();
    let inner = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| Error::parse(format!("list must be enclosed in brackets: {:?}", s)))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|item| {
            let item = item.trim();
            item.parse::<i64>()
                .map_err(|_| Error::parse(format!("not an integer: {:?}", item)))
        })
        .collect()
}

/// Render a list the way the prompts and states spell it: `[1, 2, 3]`.
pub fn list_to_string(items: &[i64]) -> String {
    let parts: Vec<String> = items.iter().map(i64::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Number of errors in `current`: digit-frequency mismatches against the
/// reference list plus adjacent inversions. Lower is better.
pub fn num_errors(state: &ThoughtState) -> f64 {
    try_num_errors(state).unwrap_or(UNPARSABLE_SCORE)
}

fn try_num_errors(state: &ThoughtState) -> Result<f64> {
    let original = string_to_list(state.require_str("original")?)?;
    let reference = match state.get_str("unsorted_sublist").filter(|s| !s.is_empty()) {
        Some(sub) => {
            let sub = string_to_list(sub)?;
            if sub.len() + 5 < original.len() {
                sub
            } else {
                original
            }
        }
        None => original,
    };
    let current = string_to_list(state.get_str("current").unwrap_or_default())?;

    let frequency_errors: usize = (0..=9)
        .map(|digit| {
            let expected = reference.iter().filter(|n| **n == digit).count();
            let found = current.iter().filter(|n| **n == digit).count();
            expected.abs_diff(found)
        })
        .sum();
    let inversions = current.windows(2).filter(|w| w[0] > w[1]).count();

    Ok((frequency_errors + inversions) as f64)
}

/// True when `current` is exactly `original` in ascending order.
pub fn test_sorting(state: &ThoughtState) -> Result<bool> {
    let mut expected = string_to_list(state.require_str("original")?)?;
    expected.sort_unstable();
    let current = string_to_list(state.require_str("current")?)?;
    Ok(current == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists() {
        assert_eq!(string_to_list("[3, 1,2]").unwrap(), vec![3, 1, 2]);
        assert_eq!(string_to_list(" [7] ").unwrap(), vec![7]);
        assert!(string_to_list("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_lists() {
        assert!(string_to_list("1, 2").is_err());
        assert!(string_to_list("[1, x]").is_err());
        assert!(string_to_list("[1, 2").is_err());
        assert!(string_to_list("").is_err());
    }

    #[test]
    fn list_string_matches_prompt_format() {
        assert_eq!(list_to_string(&[0, 1, 1]), "[0, 1, 1]");
        assert_eq!(list_to_string(&[]), "[]");
    }
}
