//! Core types for Thoughtgraph

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Named fields describing the problem-solving context carried by a thought.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThoughtState(Map<String, Value>);

impl ThoughtState {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Like [`get_str`](Self::get_str), but a missing or non-string field is an error.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)
            .ok_or_else(|| Error::InvalidState(format!("missing string field '{}'", key)))
    }

    pub fn require_i64(&self, key: &str) -> Result<i64> {
        self.get_i64(key)
            .ok_or_else(|| Error::InvalidState(format!("missing integer field '{}'", key)))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite fields of `self` with every field of `other`.
    pub fn merge(&mut self, other: &ThoughtState) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// `self` with `other` layered on top, leaving both inputs untouched.
    pub fn merged(&self, other: &ThoughtState) -> ThoughtState {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for ThoughtState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ThoughtState {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidState(format!(
                "thought state must be a JSON object, got {}",
                other
            ))),
        }
    }
}

static NEXT_THOUGHT_ID: AtomicUsize = AtomicUsize::new(0);

fn next_thought_id() -> usize {
    NEXT_THOUGHT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single reasoning step: a state plus whatever evaluation it has received.
#[derive(Clone, Debug)]
pub struct Thought {
    id: usize,
    pub state: ThoughtState,
    score: f64,
    scored: bool,
    valid: bool,
    validated: bool,
    solved: bool,
    compared_to_ground_truth: bool,
}

impl Thought {
    pub fn new(state: ThoughtState) -> Self {
        Self {
            id: next_thought_id(),
            state,
            score: 0.0,
            scored: false,
            valid: false,
            validated: false,
            solved: false,
            compared_to_ground_truth: false,
        }
    }

    /// Copy of `other` (state and evaluation flags) under a fresh id.
    pub fn from_thought(other: &Thought) -> Self {
        Self {
            id: next_thought_id(),
            ..other.clone()
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = score;
        self.scored = true;
    }

    pub fn scored(&self) -> bool {
        self.scored
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
        self.validated = true;
    }

    pub fn validated(&self) -> bool {
        self.validated
    }

    pub fn solved(&self) -> bool {
        self.solved
    }

    pub fn set_solved(&mut self, solved: bool) {
        self.solved = solved;
        self.compared_to_ground_truth = true;
    }

    pub fn compared_to_ground_truth(&self) -> bool {
        self.compared_to_ground_truth
    }
}
