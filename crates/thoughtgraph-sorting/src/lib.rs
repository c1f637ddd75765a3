//! thoughtgraph-sorting — sorting a list of 32 digits with a language model
//!
//! Prompts, answer parsing, scoring and the operation graphs for the io, cot,
//! tot and got methods.

pub mod parser;
pub mod prompter;
pub mod topology;
pub mod utils;

pub use parser::SortingParser;
pub use prompter::SortingPrompter;
pub use topology::{cot, got, io, tot, Method};
pub use utils::{list_to_string, num_errors, string_to_list, test_sorting};

use thoughtgraph_core::ThoughtState;

/// The state every sorting run starts from: nothing sorted yet.
pub fn initial_state(original: &str, method: Method) -> ThoughtState {
    ThoughtState::new()
        .with("original", original)
        .with("current", "")
        .with("phase", 0)
        .with("method", method.as_str())
}
