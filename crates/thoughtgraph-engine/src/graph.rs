//! An arena of operations wired into a DAG.
//!
//! Operations are addressed by the `OperationId` returned when they are added.
//! Insertion order is preserved and is the order of the serialized graph.

use crate::operations::Operation;
use std::fmt;
use thoughtgraph_core::{Error, Result, Thought, ThoughtState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(usize);

impl OperationId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

#[derive(Debug)]
struct Node {
    operation: Operation,
    predecessors: Vec<OperationId>,
    successors: Vec<OperationId>,
}

#[derive(Debug, Default)]
pub struct GraphOfOperations {
    nodes: Vec<Node>,
    roots: Vec<OperationId>,
    leaves: Vec<OperationId>,
}

impl GraphOfOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain `operation` after every current leaf; it becomes the only leaf.
    /// The first operation becomes the root.
    pub fn append_operation(&mut self, operation: Operation) -> OperationId {
        let id = self.push(operation);
        if self.roots.is_empty() {
            self.roots.push(id);
        } else {
            for leaf in std::mem::take(&mut self.leaves) {
                self.link(leaf, id);
            }
        }
        self.leaves = vec![id];
        id
    }

    /// Add `operation` with explicit predecessors. With none it is a new root.
    pub fn add_operation(
        &mut self,
        operation: Operation,
        predecessors: &[OperationId],
    ) -> Result<OperationId> {
        for p in predecessors {
            self.check(*p)?;
        }
        let id = self.push(operation);
        if predecessors.is_empty() {
            self.roots.push(id);
        }
        for p in predecessors {
            self.link(*p, id);
        }
        self.leaves.retain(|l| !predecessors.contains(l));
        self.leaves.push(id);
        Ok(id)
    }

    /// Extra dependency `from -> to` between existing operations.
    pub fn add_edge(&mut self, from: OperationId, to: OperationId) -> Result<()> {
        self.check(from)?;
        self.check(to)?;
        if from == to || self.reaches(to, from) {
            return Err(Error::graph(format!("edge {} -> {} would create a cycle", from, to)));
        }
        if self.nodes[from.0].successors.contains(&to) {
            return Ok(());
        }
        self.link(from, to);
        self.leaves.retain(|l| *l != from);
        self.roots.retain(|r| *r != to);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[OperationId] {
        &self.roots
    }

    pub fn leaves(&self) -> &[OperationId] {
        &self.leaves
    }

    pub fn ids(&self) -> impl Iterator<Item = OperationId> {
        (0..self.nodes.len()).map(OperationId)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.nodes.iter().map(|n| &n.operation)
    }

    pub fn operation(&self, id: OperationId) -> Option<&Operation> {
        self.nodes.get(id.0).map(|n| &n.operation)
    }

    pub fn operation_mut(&mut self, id: OperationId) -> Option<&mut Operation> {
        self.nodes.get_mut(id.0).map(|n| &mut n.operation)
    }

    pub fn predecessors(&self, id: OperationId) -> &[OperationId] {
        self.nodes
            .get(id.0)
            .map(|n| n.predecessors.as_slice())
            .unwrap_or_default()
    }

    pub fn successors(&self, id: OperationId) -> &[OperationId] {
        self.nodes
            .get(id.0)
            .map(|n| n.successors.as_slice())
            .unwrap_or_default()
    }

    /// True once every predecessor has executed.
    pub fn can_execute(&self, id: OperationId) -> bool {
        self.predecessors(id).iter().all(|p| {
            self.operation(*p).is_some_and(Operation::executed)
        })
    }

    /// Thoughts an operation starts from: its predecessors' outputs in order,
    /// or one thought holding `initial` for a root.
    pub fn input_thoughts(&self, id: OperationId, initial: &ThoughtState) -> Vec<Thought> {
        let preds = self.predecessors(id);
        if preds.is_empty() {
            return vec![Thought::new(initial.clone())];
        }
        preds
            .iter()
            .filter_map(|p| self.operation(*p))
            .flat_map(|op| op.thoughts().iter().cloned())
            .collect()
    }

    fn push(&mut self, operation: Operation) -> OperationId {
        let id = OperationId(self.nodes.len());
        self.nodes.push(Node {
            operation,
            predecessors: Vec::new(),
            successors: Vec::new(),
        });
        id
    }

    fn link(&mut self, from: OperationId, to: OperationId) {
        self.nodes[from.0].successors.push(to);
        self.nodes[to.0].predecessors.push(from);
    }

    fn check(&self, id: OperationId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::graph(format!("unknown operation {}", id)))
        }
    }

    /// Depth-first reachability over successor edges.
    fn reaches(&self, from: OperationId, to: OperationId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(cur) = stack.pop() {
            if cur == to {
                return true;
            }
            if std::mem::replace(&mut seen[cur.0], true) {
                continue;
            }
            stack.extend(self.nodes[cur.0].successors.iter().copied());
        }
        false
    }
}
