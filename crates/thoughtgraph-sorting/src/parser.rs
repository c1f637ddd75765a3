//! Turns model answers for the sorting prompts back into thought states.

use crate::topology::Method;
use crate::utils::{list_to_string, string_to_list};
use serde_json::{Map, Value};
use thoughtgraph_core::{Error, Result, ThoughtState};
use thoughtgraph_engine::Parser;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct SortingParser;

impl SortingParser {
    pub fn new() -> Self {
        Self
    }
}

/// Lines containing a bracketed list. When some line mentions `Output`, only
/// the lines from the last such line onward count.
fn list_lines(text: &str) -> Vec<&str> {
    from_last_output(
        text.trim()
            .lines()
            .filter(|l| l.contains('[') && l.contains(']'))
            .collect(),
    )
}

/// Drop everything before the last line mentioning "Output".
fn from_last_output(lines: Vec<&str>) -> Vec<&str> {
    match lines.iter().rposition(|l| l.contains("Output")) {
        Some(last) => lines[last..].to_vec(),
        None => lines,
    }
}

/// Unbracketed lists, e.g. `0, 1, 2` or `Output: 0, 1, 2`, as `[...]` strings.
fn bare_lists(text: &str) -> Vec<String> {
    from_last_output(text.trim().lines().filter(|l| !l.trim().is_empty()).collect())
        .into_iter()
        .map(|l| match l.find("Output:") {
            Some(at) => &l[at + "Output:".len()..],
            None => l,
        })
        .map(|l| format!("[{}]", l.trim()))
        .filter(|l| string_to_list(l).is_ok())
        .collect()
}

/// The `[...]` part of a line.
fn bracketed(line: &str) -> Option<&str> {
    let start = line.find('[')?;
    let end = start + line[start..].find(']')?;
    Some(&line[start..=end])
}

/// States for each `"List N": [...]` entry of a split answer.
fn parse_split(state: &ThoughtState, text: &str) -> Result<Vec<ThoughtState>> {
    let start = text
        .find('{')
        .ok_or_else(|| Error::parse("split answer has no JSON object"))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| Error::parse("split answer has no closing brace"))?;
    let lists: Map<String, Value> = serde_json::from_str(&text[start..=end])?;
    if lists.len() != 2 {
        warn!(lists = lists.len(), "expected 2 lists in split answer");
    }

    let mut states = Vec::new();
    for (key, value) in lists {
        if !key.contains("List") {
            warn!(key = %key, "ignoring unexpected key in split answer");
            continue;
        }
        let list = match &value {
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_i64()
                        .ok_or_else(|| Error::parse(format!("not an integer in {}: {}", key, v)))
                })
                .collect::<Result<Vec<i64>>>()?,
            Value::String(s) => string_to_list(s)?,
            other => return Err(Error::parse(format!("{} is not a list: {}", key, other))),
        };
        let list = list_to_string(&list);
        states.push(
            state
                .clone()
                .with("current", list.clone())
                .with("unsorted_sublist", list)
                .with("phase", 1)
                .with("part", key),
        );
    }
    Ok(states)
}

impl Parser for SortingParser {
    fn parse_generate_answer(
        &self,
        state: &ThoughtState,
        texts: &[String],
    ) -> Result<Vec<ThoughtState>> {
        let method: Method = state
            .require_str("method")?
            .parse()
            .map_err(Error::InvalidState)?;
        let splitting = method == Method::Got
            && state.get_str("current").unwrap_or_default().is_empty()
            && state.get_i64("phase").unwrap_or(0) == 0;

        let mut new_states = Vec::new();
        for text in texts {
            if splitting {
                match parse_split(state, text) {
                    Ok(states) => new_states.extend(states),
                    Err(e) => warn!("could not parse split answer: {}", e),
                }
                continue;
            }

            let answers: Vec<&str> = list_lines(text).into_iter().filter_map(bracketed).collect();
            let Some(first) = answers.first() else {
                warn!("no list found in answer");
                continue;
            };
            if answers.len() > 1 {
                debug!(candidates = answers.len(), "several lists in answer, using the first");
            }
            new_states.push(state.clone().with("current", *first).with("phase", 2));
        }
        Ok(new_states)
    }

    fn parse_aggregation_answer(
        &self,
        states: &[ThoughtState],
        texts: &[String],
    ) -> Result<Vec<ThoughtState>> {
        let [first, second] = states else {
            return Err(Error::operation(
                "parse_aggregation_answer",
                format!("expected 2 states, got {}", states.len()),
            ));
        };

        let unsorted_sublist = match (
            first.get_str("unsorted_sublist"),
            second.get_str("unsorted_sublist"),
        ) {
            (Some(a), Some(b)) if a.ends_with(']') && b.starts_with('[') => {
                format!("{}, {}", &a[..a.len() - 1], &b[1..])
            }
            _ => first.require_str("original")?.to_string(),
        };

        let mut new_states = Vec::new();
        for text in texts {
            let mut answers: Vec<String> = list_lines(text)
                .into_iter()
                .filter_map(bracketed)
                .map(str::to_string)
                .collect();
            if answers.is_empty() {
                answers = bare_lists(text);
            }
            let current = match answers.into_iter().next() {
                Some(list) => list,
                None => {
                    warn!("no merged list found in answer");
                    "[]".to_string()
                }
            };
            new_states.push(
                first
                    .clone()
                    .with("current", current)
                    .with("phase", 2)
                    .with("unsorted_sublist", unsorted_sublist.clone()),
            );
        }
        Ok(new_states)
    }
}
