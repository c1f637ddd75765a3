//! thoughtgraph-engine — Graph of Operations executor
//!
//! A problem is solved by running a fixed DAG of operations (generate, score,
//! aggregate, keep-best, ...) over thoughts. The controller drives the graph;
//! a Prompter/Parser pair supplies everything problem-specific.

pub mod controller;
pub mod graph;
pub mod operations;
pub mod output;
pub mod prompter;

pub use controller::Controller;
pub use graph::{GraphOfOperations, OperationId};
pub use operations::{ExecContext, Operation, OperationKind};
pub use output::{graph_records, GraphRecord, OperationRecord, RunSummary};
pub use prompter::{Parser, Prompter};
