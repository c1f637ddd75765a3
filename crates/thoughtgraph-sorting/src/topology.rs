//! Graphs of operations for each prompting method.

use crate::utils::{num_errors, test_sorting};
use std::fmt;
use std::str::FromStr;
use thoughtgraph_core::{Result, Thought};
use thoughtgraph_engine::{GraphOfOperations, Operation};

/// The prompting method. Its name is stored in the `method` field of every
/// thought so the prompter and parser know which prompts are in play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// Input-output: one direct sort attempt.
    Io,
    /// Chain-of-thought: one attempt with worked intermediate steps.
    Cot,
    /// Tree-of-thoughts: many attempts, best one refined.
    Tot,
    /// Graph-of-thoughts: split, sort halves, merge, refine.
    #[default]
    Got,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Io, Method::Cot, Method::Tot, Method::Got];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Io => "io",
            Method::Cot => "cot",
            Method::Tot => "tot",
            Method::Got => "got",
        }
    }

    pub fn graph(&self) -> Result<GraphOfOperations> {
        match self {
            Method::Io => Ok(io()),
            Method::Cot => Ok(cot()),
            Method::Tot => tot(),
            Method::Got => got(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown method '{}' (expected io, cot, tot or got)", s))
    }
}

/// Refinement rounds in [`tot`].
const TOT_ROUNDS: usize = 1;

fn score() -> Operation {
    Operation::score_with(1, false, num_errors)
}

fn keep_best() -> Operation {
    Operation::keep_best_n(1, false)
}

/// Generate once, score, compare with the answer.
pub fn io() -> GraphOfOperations {
    let mut graph = GraphOfOperations::new();
    graph.append_operation(Operation::generate(1, 1));
    graph.append_operation(score());
    graph.append_operation(Operation::ground_truth(test_sorting));
    graph
}

/// Same shape as [`io`]; only the prompt differs.
pub fn cot() -> GraphOfOperations {
    io()
}

/// Twenty attempts, keep the best, then twenty refinements of it, keeping
/// the best of the refinements and the attempt they started from.
pub fn tot() -> Result<GraphOfOperations> {
    let mut graph = GraphOfOperations::new();
    graph.append_operation(Operation::generate(1, 20));
    graph.append_operation(score());
    let mut best = graph.append_operation(keep_best());

    for _ in 0..TOT_ROUNDS {
        graph.append_operation(Operation::generate(1, 20));
        let scored = graph.append_operation(score());
        best = graph.add_operation(keep_best(), &[best, scored])?;
    }

    graph.append_operation(keep_best());
    graph.append_operation(Operation::ground_truth(test_sorting));
    Ok(graph)
}

/// Split into two halves, sort each half five times keeping the best, merge
/// the halves ten times keeping the best, refine the merge ten times.
pub fn got() -> Result<GraphOfOperations> {
    let mut graph = GraphOfOperations::new();
    let plans = graph.append_operation(Operation::generate(2, 1));

    for part in ["List 1", "List 2"] {
        let select = graph.add_operation(
            Operation::selector(move |t: &Thought| t.state.get_str("part") == Some(part)),
            &[plans],
        )?;
        let sorted = graph.add_operation(Operation::generate(1, 5), &[select])?;
        let scored = graph.add_operation(score(), &[sorted])?;
        graph.add_operation(keep_best(), &[scored])?;
    }

    graph.append_operation(Operation::aggregate(10));
    graph.append_operation(score());
    let best_merge = graph.append_operation(keep_best());

    graph.append_operation(Operation::generate(1, 10));
    let refined = graph.append_operation(score());
    graph.add_operation(keep_best(), &[best_merge, refined])?;

    graph.append_operation(Operation::ground_truth(test_sorting));
    Ok(graph)
}
