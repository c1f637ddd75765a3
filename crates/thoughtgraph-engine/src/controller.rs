//! Executes a graph of operations against a language model.
//!
//! Execution is breadth-first from the roots: an operation runs once all of its
//! predecessors have, and each operation runs at most once per `run`.

use crate::graph::{GraphOfOperations, OperationId};
use crate::operations::ExecContext;
use crate::output::{graph_records, RunSummary};
use crate::prompter::{Parser, Prompter};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use thoughtgraph_core::{Error, Result, Thought, ThoughtState};
use thoughtgraph_llm::{CancellationToken, LanguageModel};
use tracing::{debug, error, info};

pub struct Controller {
    lm: Arc<dyn LanguageModel>,
    graph: GraphOfOperations,
    prompter: Arc<dyn Prompter>,
    parser: Arc<dyn Parser>,
    problem_parameters: ThoughtState,
    cancel: CancellationToken,
}

impl Controller {
    pub fn new(
        lm: Arc<dyn LanguageModel>,
        graph: GraphOfOperations,
        prompter: Arc<dyn Prompter>,
        parser: Arc<dyn Parser>,
        problem_parameters: ThoughtState,
    ) -> Self {
        Self {
            lm,
            graph,
            prompter,
            parser,
            problem_parameters,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an externally owned token (e.g. one cancelled on Ctrl-C).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn graph(&self) -> &GraphOfOperations {
        &self.graph
    }

    pub fn problem_parameters(&self) -> &ThoughtState {
        &self.problem_parameters
    }

    pub async fn run(&mut self) -> Result<()> {
        let Self {
            lm,
            graph,
            prompter,
            parser,
            problem_parameters,
            cancel,
        } = self;

        if graph.is_empty() {
            return Err(Error::graph("graph of operations is empty"));
        }

        let ctx = ExecContext {
            lm: lm.as_ref(),
            prompter: prompter.as_ref(),
            parser: parser.as_ref(),
            cancel,
        };

        info!(operations = graph.len(), roots = graph.roots().len(), model = lm.name(), "run starting");

        let mut queue: VecDeque<OperationId> = graph.roots().iter().copied().collect();
        let mut enqueued: HashSet<OperationId> = queue.iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            if ctx.cancel.is_cancelled() {
                info!("run cancelled");
                return Err(Error::Cancelled);
            }

            let inputs = graph.input_thoughts(id, problem_parameters);
            let Some(op) = graph.operation_mut(id) else {
                return Err(Error::graph(format!("unknown operation {}", id)));
            };
            let tag = op.tag();
            debug!(op = %id, operation = tag, inputs = inputs.len(), "executing");

            if let Err(e) = op.execute(&ctx, inputs).await {
                if !matches!(e, Error::Cancelled) {
                    error!(op = %id, operation = tag, "operation failed: {}", e);
                }
                return Err(e);
            }
            info!(op = %id, operation = tag, thoughts = op.thoughts().len(), "operation complete");

            for succ in graph.successors(id).to_vec() {
                if graph.can_execute(succ) && enqueued.insert(succ) {
                    queue.push_back(succ);
                }
            }
        }

        let summary = RunSummary::from_graph(graph, lm.usage());
        info!(%summary, "run complete");
        Ok(())
    }

    /// Thoughts held by the leaf operations.
    pub fn final_thoughts(&self) -> Vec<&Thought> {
        self.graph
            .leaves()
            .iter()
            .filter_map(|id| self.graph.operation(*id))
            .flat_map(|op| op.thoughts())
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_graph(&self.graph, self.lm.usage())
    }

    /// The serialized graph as a JSON value.
    pub fn graph_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(graph_records(
            &self.graph,
            self.lm.usage(),
        ))?)
    }

    /// Write the serialized graph, pretty-printed, to `path`.
    pub async fn output_graph(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let body = serde_json::to_vec_pretty(&graph_records(&self.graph, self.lm.usage()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &body).await?;
        info!(path = %path.display(), bytes = body.len(), "graph written");
        Ok(())
    }
}
