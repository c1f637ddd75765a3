//! Prompts for sorting a list of 32 digits.

use crate::topology::Method;
use crate::utils::string_to_list;
use thoughtgraph_core::{Error, Result, ThoughtState};
use thoughtgraph_engine::Prompter;

const SORT_PROMPT: &str = "<Instruction> Sort the following list of numbers in ascending order. Output only the sorted list of numbers, no additional text. </Instruction>

<Examples>
Input: [5, 2, 6, 0, 1, 8, 1, 5, 9, 0, 8, 3, 0, 1, 6, 6]
Output: [0, 0, 0, 1, 1, 1, 2, 3, 5, 5, 6, 6, 6, 8, 8, 9]

Input: [1, 3, 1, 8, 6, 0, 9, 1, 3, 9, 0, 9, 9, 6, 0, 3, 0, 8, 2, 4, 6, 2, 8, 1, 9, 4, 8, 2, 1, 9, 9, 3]
Output: [0, 0, 0, 0, 1, 1, 1, 1, 1, 2, 2, 2, 3, 3, 3, 3, 4, 4, 6, 6, 6, 8, 8, 8, 8, 9, 9, 9, 9, 9, 9, 9]
</Examples>

Input: {input}";

const SORT_PROMPT_COT: &str = "<Instruction> Sort the following list of numbers in ascending order. You can generate any intermediate lists, but the final output should be the sorted list of numbers, prefixed with \"Output: \". </Instruction>

<Approach>
To sort the list of numbers follow these steps:
1. Split the list of numbers into two to four unsorted sublists, each containing an equal number of elements from the original list (make sure they don't overlap).
2. Sort each of the unsorted sublists.
3. Merge the sorted sublists into a single sorted list using the merging algorithm from merge sort.
</Approach>

<Examples>
Input: [7, 1, 1, 4, 7, 1, 0, 4, 9, 7, 4, 6, 5, 0, 7, 5, 2, 9, 1, 7, 0, 3, 4, 2, 3, 6, 6, 7, 1, 2, 7, 6]
Unsorted Subarrays:
[7, 1, 1, 4, 7, 1, 0, 4, 9, 7, 4, 6, 5, 0, 7, 5]
[2, 9, 1, 7, 0, 3, 4, 2, 3, 6, 6, 7, 1, 2, 7, 6]
Sorted Subarrays:
[0, 0, 1, 1, 1, 4, 4, 4, 5, 5, 6, 7, 7, 7, 7, 9]
[0, 1, 1, 2, 2, 2, 3, 3, 4, 6, 6, 6, 7, 7, 7, 9]
Output: [0, 0, 0, 1, 1, 1, 1, 1, 2, 2, 2, 3, 3, 4, 4, 4, 4, 5, 5, 6, 6, 6, 6, 7, 7, 7, 7, 7, 7, 7, 9, 9]
</Examples>

Input: {input}";

const SPLIT_PROMPT: &str = "<Instruction> Split the following list of 32 numbers into 2 lists of 16 numbers each, the first list should contain the first 16 numbers and the second list the second 16 numbers.
Only output the final 2 lists in the following format without any additional text or thoughts!:
{{
    \"List 1\": [3, 4, 3, 5, 7, 8, 1, ...],
    \"List 2\": [2, 9, 2, 4, 7, 1, 5, ...]
}} </Instruction>

<Example>
Input: [5, 1, 8, 1, 9, 0, 9, 3, 7, 8, 6, 5, 7, 9, 7, 5, 4, 3, 2, 3, 1, 9, 4, 8, 7, 5, 7, 4, 9, 1, 1, 8]
Output:
{{
    \"List 1\": [5, 1, 8, 1, 9, 0, 9, 3, 7, 8, 6, 5, 7, 9, 7, 5],
    \"List 2\": [4, 3, 2, 3, 1, 9, 4, 8, 7, 5, 7, 4, 9, 1, 1, 8]
}}
</Example>

Input: {input}";

const MERGE_PROMPT: &str = "<Instruction> Merge the following 2 sorted lists of length {length1} each, into one sorted list of length {length2} using a merge sort style approach.
Only output the final merged list without any additional text or thoughts!:</Instruction>

<Approach>
To merge the two lists in a merge-sort style approach, follow these steps:
1. Compare the first element of both lists.
2. Append the smaller element to the merged list and move to the next element in the list from which the smaller element came.
3. Repeat steps 1 and 2 until one of the lists is empty.
4. Append the remaining elements of the non-empty list to the merged list.
</Approach>

Merge the following two lists into one sorted list:
1: {input1}
2: {input2}

Merged list:
";

const IMPROVE_PROMPT: &str = "<Instruction> The following two lists represent an unsorted list of numbers and a sorted variant of that list. The sorted variant is not correct. Fix the sorted variant so that it is correct.
Make sure that the output list is sorted in ascending order, has the same number of elements as the input list ({length}), and contains the same elements as the input list. </Instruction>

<Approach>
To fix the incorrectly sorted list follow these steps:
1. For each number from 0 to 9, compare the frequency of that number in the incorrectly sorted list to the frequency of that number in the input list.
2. Iterate through the incorrectly sorted list and add or remove numbers as needed to make the frequency of each number in the incorrectly sorted list match the frequency of that number in the input list.
</Approach>

<Examples>
Input: [6, 2, 5, 2, 7, 6, 0, 1, 8, 9, 5, 5, 5, 9, 7, 9]
Incorrectly Sorted: [0, 1, 2, 5, 5, 5, 5, 6, 6, 7, 7, 7, 8, 9, 9, 9]
Reason: The incorrectly sorted list contains one extra 7 and is missing one 2.
Output: [0, 1, 2, 2, 5, 5, 5, 5, 6, 6, 7, 7, 8, 9, 9, 9]
</Examples>

Input: {input}
Incorrectly Sorted: {incorrectly_sorted}
";

fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.replace("{{", "\u{0}").replace("}}", "\u{1}");
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out.replace('\u{0}', "{").replace('\u{1}', "}")
}

/// Builds sorting prompts. What is asked depends on the state's `method`
/// and, for graph-of-thoughts, its `phase`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SortingPrompter;

impl SortingPrompter {
    pub fn new() -> Self {
        Self
    }

    fn sort_prompt(input: &str) -> String {
        fill(SORT_PROMPT, &[("input", input)])
    }

    fn improve(reference: &str, current: &str) -> Result<String> {
        let length = string_to_list(reference)?.len().to_string();
        Ok(fill(
            IMPROVE_PROMPT,
            &[
                ("input", reference),
                ("incorrectly_sorted", current),
                ("length", &length),
            ],
        ))
    }
}

impl Prompter for SortingPrompter {
    fn generate_prompt(&self, _num_branches: usize, state: &ThoughtState) -> Result<String> {
        let original = state.require_str("original")?;
        let current = state.get_str("current").unwrap_or_default();
        let method: Method = state
            .require_str("method")?
            .parse()
            .map_err(Error::InvalidState)?;
        let input = if current.is_empty() { original } else { current };

        let prompt = match method {
            Method::Io => Self::sort_prompt(input),
            Method::Cot => fill(SORT_PROMPT_COT, &[("input", input)]),
            Method::Tot if current.is_empty() => Self::sort_prompt(input),
            Method::Tot => Self::improve(original, current)?,
            Method::Got => {
                let phase = state.get_i64("phase").unwrap_or(0);
                if current.is_empty() && phase == 0 {
                    fill(SPLIT_PROMPT, &[("input", input)])
                } else if phase == 1 {
                    Self::sort_prompt(current)
                } else {
                    Self::improve(reference_list(state, original)?, current)?
                }
            }
        };
        Ok(prompt)
    }

    fn aggregation_prompt(&self, states: &[ThoughtState]) -> Result<String> {
        let [first, second] = states else {
            return Err(Error::operation(
                "aggregation_prompt",
                format!("expected 2 states to merge, got {}", states.len()),
            ));
        };
        let input1 = first.require_str("current")?;
        let input2 = second.require_str("current")?;
        let length1 = string_to_list(input1)?.len();
        let length2 = length1 + string_to_list(input2)?.len();
        Ok(fill(
            MERGE_PROMPT,
            &[
                ("input1", input1),
                ("input2", input2),
                ("length1", &length1.to_string()),
                ("length2", &length2.to_string()),
            ],
        ))
    }
}

/// The list a graph-of-thoughts improvement is checked against: the
/// thought's own sublist when it is clearly shorter than the full input.
fn reference_list<'a>(state: &'a ThoughtState, original: &'a str) -> Result<&'a str> {
    match state.get_str("unsorted_sublist").filter(|s| !s.is_empty()) {
        Some(sub) if string_to_list(sub)?.len() + 5 < string_to_list(original)?.len() => Ok(sub),
        _ => Ok(original),
    }
}
