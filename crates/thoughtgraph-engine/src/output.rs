//! The serialized graph a finished run leaves on disk.
//!
//! A JSON array with one record per operation (insertion order), followed by
//! one record of token usage and cost.

use crate::graph::GraphOfOperations;
use serde::Serialize;
use std::fmt;
use thoughtgraph_core::ThoughtState;
use thoughtgraph_llm::Usage;

#[derive(Serialize, Debug)]
pub struct OperationRecord<'a> {
    pub operation: &'static str,
    pub thoughts: Vec<&'a ThoughtState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scored: Option<Vec<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated: Option<Vec<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<Vec<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compared_to_ground_truth: Option<Vec<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_solved: Option<Vec<bool>>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum GraphRecord<'a> {
    Operation(OperationRecord<'a>),
    Usage(Usage),
}

/// Records for every operation plus the trailing usage record.
pub fn graph_records<'a>(graph: &'a GraphOfOperations, usage: Usage) -> Vec<GraphRecord<'a>> {
    let mut records: Vec<GraphRecord<'a>> = graph
        .operations()
        .map(|op| {
            let thoughts = op.thoughts();
            let any_scored = thoughts.iter().any(|t| t.scored());
            let any_validated = thoughts.iter().any(|t| t.validated());
            let any_compared = thoughts.iter().any(|t| t.compared_to_ground_truth());
            GraphRecord::Operation(OperationRecord {
                operation: op.tag(),
                thoughts: thoughts.iter().map(|t| &t.state).collect(),
                scored: any_scored.then(|| thoughts.iter().map(|t| t.scored()).collect()),
                scores: any_scored.then(|| thoughts.iter().map(|t| t.score()).collect()),
                validated: any_validated
                    .then(|| thoughts.iter().map(|t| t.validated()).collect()),
                validity: any_validated.then(|| thoughts.iter().map(|t| t.valid()).collect()),
                compared_to_ground_truth: any_compared
                    .then(|| thoughts.iter().map(|t| t.compared_to_ground_truth()).collect()),
                problem_solved: any_compared
                    .then(|| thoughts.iter().map(|t| t.solved()).collect()),
            })
        })
        .collect();
    records.push(GraphRecord::Usage(usage));
    records
}

/// Condensed outcome of a run, for logs and the CLI.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub operations: usize,
    pub executed: usize,
    pub final_thoughts: usize,
    pub solved: bool,
    pub usage: Usage,
}

impl RunSummary {
    pub fn from_graph(graph: &GraphOfOperations, usage: Usage) -> Self {
        let executed = graph.operations().filter(|op| op.executed()).count();
        let finals: Vec<_> = graph
            .leaves()
            .iter()
            .filter_map(|id| graph.operation(*id))
            .flat_map(|op| op.thoughts())
            .collect();
        Self {
            operations: graph.len(),
            executed,
            final_thoughts: finals.len(),
            solved: graph
                .operations()
                .flat_map(|op| op.thoughts())
                .any(|t| t.solved()),
            usage,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} operations executed, {} final thoughts, solved={}, tokens={}+{}, cost=${:.4}",
            self.executed,
            self.operations,
            self.final_thoughts,
            self.solved,
            self.usage.prompt_tokens,
            self.usage.completion_tokens,
            self.usage.cost,
        )
    }
}
