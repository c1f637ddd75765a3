//! thoughtgraph — sort a fixed list of 32 digits with a graph of LM operations
//!
//! The binary wires the sorting problem into the engine:
//!   1. the literal input list
//!   2. the operation graph for the chosen method
//!   3. a language model client
//!   4. a controller holding the initial thought state
//!   5. run
//!   6. write the executed graph to `output_got.json`

use std::path::Path;
use std::sync::Arc;
use thoughtgraph_core::ThoughtState;
use thoughtgraph_engine::{Controller, RunSummary};
use thoughtgraph_llm::{CancellationToken, LanguageModel};
use thoughtgraph_sorting::{Method, SortingParser, SortingPrompter};
use tracing::info;

/// The list every run sorts.
pub const TO_BE_SORTED: &str = "[0, 2, 6, 3, 8, 7, 1, 1, 6, 7, 7, 7, 7, 9, 3, 0, 1, 7, 9, 1, 3, 5, 1, 3, 6, 4, 5, 4, 7, 3, 5, 7]";

/// Where the executed graph is written, relative to the working directory.
pub const OUTPUT_PATH: &str = "output_got.json";

/// Environment variable naming the model config file.
pub const CONFIG_ENV: &str = "THOUGHTGRAPH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_MODEL: &str = "chatgpt";

/// Initial thought state for sorting [`TO_BE_SORTED`].
pub fn initial_state(method: Method) -> ThoughtState {
    thoughtgraph_sorting::initial_state(TO_BE_SORTED, method)
}

/// Steps 2 and 4: the method's graph and a controller over it.
pub fn build_controller(lm: Arc<dyn LanguageModel>, method: Method) -> anyhow::Result<Controller> {
    let graph = method.graph()?;
    Ok(Controller::new(
        lm,
        graph,
        Arc::new(SortingPrompter::new()),
        Arc::new(SortingParser::new()),
        initial_state(method),
    ))
}

/// Steps 2 and 4-6 against an already constructed model.
pub async fn sort(
    lm: Arc<dyn LanguageModel>,
    method: Method,
    output: impl AsRef<Path>,
    cancel: CancellationToken,
) -> anyhow::Result<RunSummary> {
    let mut controller = build_controller(lm, method)?.with_cancellation(cancel);
    info!(%method, operations = controller.graph().len(), "sorting");

    controller.run().await?;
    controller.output_graph(output).await?;
    Ok(controller.summary())
}
