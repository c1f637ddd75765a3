//! Prompter and Parser: the problem-specific halves of every LM call.
//!
//! The engine decides *when* the model is asked something; a Prompter decides
//! *what* is asked and a Parser turns the raw answers back into thought states.
//! Methods a problem never uses keep their default, which fails loudly.

use thoughtgraph_core::{Error, Result, ThoughtState};

fn unsupported(what: &str) -> Error {
    Error::operation(what, "not supported by this problem")
}

pub trait Prompter: Send + Sync {
    /// Prompt asking for `num_branches` new thoughts derived from `state`.
    fn generate_prompt(&self, num_branches: usize, state: &ThoughtState) -> Result<String>;

    fn score_prompt(&self, _states: &[ThoughtState]) -> Result<String> {
        Err(unsupported("score_prompt"))
    }

    fn aggregation_prompt(&self, _states: &[ThoughtState]) -> Result<String> {
        Err(unsupported("aggregation_prompt"))
    }

    fn improve_prompt(&self, _state: &ThoughtState) -> Result<String> {
        Err(unsupported("improve_prompt"))
    }

    fn validation_prompt(&self, _state: &ThoughtState) -> Result<String> {
        Err(unsupported("validation_prompt"))
    }
}

pub trait Parser: Send + Sync {
    /// New states (merged over `state` by the engine) parsed from generate answers.
    fn parse_generate_answer(
        &self,
        state: &ThoughtState,
        texts: &[String],
    ) -> Result<Vec<ThoughtState>>;

    /// One score per state.
    fn parse_score_answer(&self, _states: &[ThoughtState], _texts: &[String]) -> Result<Vec<f64>> {
        Err(unsupported("parse_score_answer"))
    }

    fn parse_aggregation_answer(
        &self,
        _states: &[ThoughtState],
        _texts: &[String],
    ) -> Result<Vec<ThoughtState>> {
        Err(unsupported("parse_aggregation_answer"))
    }

    fn parse_improve_answer(&self, _state: &ThoughtState, _texts: &[String]) -> Result<ThoughtState> {
        Err(unsupported("parse_improve_answer"))
    }

    fn parse_validation_answer(&self, _state: &ThoughtState, _texts: &[String]) -> Result<bool> {
        Err(unsupported("parse_validation_answer"))
    }
}
