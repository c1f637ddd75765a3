//! Operations, the vertices of a graph of operations.
//!
//! Each operation consumes the thoughts of its predecessors (or a single thought
//! holding the initial state, for roots) and produces a new list of thoughts.
//! Thoughts are never shared between operations: anything passed through is
//! copied under a fresh id.

use crate::prompter::{Parser, Prompter};
use std::fmt;
use std::sync::Arc;
use thoughtgraph_core::{Error, Result, Thought, ThoughtState};
use thoughtgraph_llm::{CancellationToken, LanguageModel};
use tracing::{debug, warn};

/// Local scoring of a single state (lower or higher is better, per `KeepBestN`).
pub type ScoreFn = Arc<dyn Fn(&ThoughtState) -> f64 + Send + Sync>;
/// Local validity check of a single state.
pub type ValidateFn = Arc<dyn Fn(&ThoughtState) -> bool + Send + Sync>;
/// Keeps the thoughts for which it returns true.
pub type SelectFn = Arc<dyn Fn(&Thought) -> bool + Send + Sync>;
/// Compares a state against the known answer.
pub type GroundTruthFn = Arc<dyn Fn(&ThoughtState) -> Result<bool> + Send + Sync>;

#[derive(Clone)]
pub enum OperationKind {
    Generate {
        num_branches_prompt: usize,
        num_branches_response: usize,
    },
    Score {
        num_samples: usize,
        combined_scoring: bool,
        scoring_function: Option<ScoreFn>,
    },
    Aggregate {
        num_responses: usize,
    },
    KeepBestN {
        n: usize,
        higher_is_better: bool,
    },
    KeepValid,
    Improve,
    ValidateAndImprove {
        num_samples: usize,
        improve: bool,
        num_tries: usize,
        validate_function: Option<ValidateFn>,
    },
    Selector(SelectFn),
    GroundTruth(GroundTruthFn),
}

impl OperationKind {
    /// Name used in logs and the serialized graph.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::Score { .. } => "score",
            Self::Aggregate { .. } => "aggregate",
            Self::KeepBestN { .. } => "keep_best_n",
            Self::KeepValid => "keep_valid",
            Self::Improve => "improve",
            Self::ValidateAndImprove { .. } => "validate_and_improve",
            Self::Selector(_) => "selector",
            Self::GroundTruth(_) => "ground_truth_evaluator",
        }
    }
}

impl fmt::Debug for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate {
                num_branches_prompt,
                num_branches_response,
            } => write!(f, "Generate({}, {})", num_branches_prompt, num_branches_response),
            Self::Score {
                num_samples,
                combined_scoring,
                scoring_function,
            } => write!(
                f,
                "Score({}, combined={}, local={})",
                num_samples,
                combined_scoring,
                scoring_function.is_some()
            ),
            Self::Aggregate { num_responses } => write!(f, "Aggregate({})", num_responses),
            Self::KeepBestN { n, higher_is_better } => {
                write!(f, "KeepBestN({}, higher_is_better={})", n, higher_is_better)
            }
            Self::KeepValid => write!(f, "KeepValid"),
            Self::Improve => write!(f, "Improve"),
            Self::ValidateAndImprove {
                num_samples,
                improve,
                num_tries,
                validate_function,
            } => write!(
                f,
                "ValidateAndImprove({}, improve={}, tries={}, local={})",
                num_samples,
                improve,
                num_tries,
                validate_function.is_some()
            ),
            Self::Selector(_) => write!(f, "Selector"),
            Self::GroundTruth(_) => write!(f, "GroundTruth"),
        }
    }
}

/// Everything an operation may consult while executing.
pub struct ExecContext<'a> {
    pub lm: &'a dyn LanguageModel,
    pub prompter: &'a dyn Prompter,
    pub parser: &'a dyn Parser,
    pub cancel: &'a CancellationToken,
}

impl ExecContext<'_> {
    async fn ask(&self, prompt: &str, num_responses: usize) -> Result<Vec<String>> {
        debug!(num_responses, "prompt: {}", prompt);
        let responses = self
            .lm
            .query(prompt, num_responses, Some(self.cancel.clone()))
            .await?;
        let texts = self.lm.get_response_texts(&responses);
        debug!(count = texts.len(), "responses: {:?}", texts);
        Ok(texts)
    }
}

#[derive(Debug)]
pub struct Operation {
    kind: OperationKind,
    thoughts: Vec<Thought>,
    executed: bool,
}

impl Operation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            thoughts: Vec::new(),
            executed: false,
        }
    }

    pub fn generate(num_branches_prompt: usize, num_branches_response: usize) -> Self {
        Self::new(OperationKind::Generate {
            num_branches_prompt,
            num_branches_response,
        })
    }

    /// Score through the language model.
    pub fn score(num_samples: usize, combined_scoring: bool) -> Self {
        Self::new(OperationKind::Score {
            num_samples,
            combined_scoring,
            scoring_function: None,
        })
    }

    /// Score locally; no prompt is sent.
    pub fn score_with(
        num_samples: usize,
        combined_scoring: bool,
        f: impl Fn(&ThoughtState) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self::new(OperationKind::Score {
            num_samples,
            combined_scoring,
            scoring_function: Some(Arc::new(f)),
        })
    }

    pub fn aggregate(num_responses: usize) -> Self {
        Self::new(OperationKind::Aggregate { num_responses })
    }

    pub fn keep_best_n(n: usize, higher_is_better: bool) -> Self {
        Self::new(OperationKind::KeepBestN { n, higher_is_better })
    }

    pub fn keep_valid() -> Self {
        Self::new(OperationKind::KeepValid)
    }

    pub fn improve() -> Self {
        Self::new(OperationKind::Improve)
    }

    pub fn validate_and_improve(num_samples: usize, improve: bool, num_tries: usize) -> Self {
        Self::new(OperationKind::ValidateAndImprove {
            num_samples,
            improve,
            num_tries,
            validate_function: None,
        })
    }

    pub fn validate_and_improve_with(
        num_samples: usize,
        improve: bool,
        num_tries: usize,
        f: impl Fn(&ThoughtState) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(OperationKind::ValidateAndImprove {
            num_samples,
            improve,
            num_tries,
            validate_function: Some(Arc::new(f)),
        })
    }

    pub fn selector(f: impl Fn(&Thought) -> bool + Send + Sync + 'static) -> Self {
        Self::new(OperationKind::Selector(Arc::new(f)))
    }

    pub fn ground_truth(
        f: impl Fn(&ThoughtState) -> Result<bool> + Send + Sync + 'static,
    ) -> Self {
        Self::new(OperationKind::GroundTruth(Arc::new(f)))
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn thoughts(&self) -> &[Thought] {
        &self.thoughts
    }

    pub fn executed(&self) -> bool {
        self.executed
    }

    /// Run the operation over `inputs`, replacing any previous output.
    pub async fn execute(&mut self, ctx: &ExecContext<'_>, inputs: Vec<Thought>) -> Result<()> {
        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let tag = self.tag();
        let input_count = inputs.len();
        let thoughts = match &self.kind {
            OperationKind::Generate {
                num_branches_prompt,
                num_branches_response,
            } => generate(ctx, &inputs, *num_branches_prompt, *num_branches_response).await?,
            OperationKind::Score {
                num_samples,
                combined_scoring,
                scoring_function,
            } => {
                score(
                    ctx,
                    inputs,
                    *num_samples,
                    *combined_scoring,
                    scoring_function.as_ref(),
                )
                .await?
            }
            OperationKind::Aggregate { num_responses } => {
                aggregate(ctx, &inputs, *num_responses).await?
            }
            OperationKind::KeepBestN { n, higher_is_better } => {
                keep_best_n(&inputs, *n, *higher_is_better)?
            }
            OperationKind::KeepValid => inputs
                .iter()
                .filter(|t| !t.validated() || t.valid())
                .map(Thought::from_thought)
                .collect(),
            OperationKind::Improve => improve(ctx, &inputs).await?,
            OperationKind::ValidateAndImprove {
                num_samples,
                improve,
                num_tries,
                validate_function,
            } => {
                validate_and_improve(
                    ctx,
                    &inputs,
                    *num_samples,
                    *improve,
                    *num_tries,
                    validate_function.as_ref(),
                )
                .await?
            }
            OperationKind::Selector(select) => inputs
                .iter()
                .filter(|t| select(*t))
                .map(Thought::from_thought)
                .collect(),
            OperationKind::GroundTruth(evaluate) => inputs
                .iter()
                .map(|t| {
                    let mut t = Thought::from_thought(t);
                    let solved = evaluate(&t.state).unwrap_or_else(|e| {
                        debug!("ground truth evaluation failed: {}", e);
                        false
                    });
                    t.set_solved(solved);
                    t
                })
                .collect(),
        };

        debug!(
            operation = tag,
            inputs = input_count,
            produced = thoughts.len(),
            "operation executed"
        );
        self.thoughts = thoughts;
        self.executed = true;
        Ok(())
    }
}

async fn generate(
    ctx: &ExecContext<'_>,
    inputs: &[Thought],
    num_branches_prompt: usize,
    num_branches_response: usize,
) -> Result<Vec<Thought>> {
    let mut out = Vec::new();
    for thought in inputs {
        let base = &thought.state;
        let prompt = ctx.prompter.generate_prompt(num_branches_prompt, base)?;
        let texts = ctx.ask(&prompt, num_branches_response).await?;
        for new_state in ctx.parser.parse_generate_answer(base, &texts)? {
            out.push(Thought::new(base.merged(&new_state)));
        }
    }
    if num_branches_prompt > 0
        && out.len() > num_branches_prompt * num_branches_response * inputs.len()
    {
        warn!(
            produced = out.len(),
            expected = num_branches_prompt * num_branches_response * inputs.len(),
            "generate produced more thoughts than expected"
        );
    }
    Ok(out)
}

async fn score(
    ctx: &ExecContext<'_>,
    inputs: Vec<Thought>,
    num_samples: usize,
    combined_scoring: bool,
    scoring_function: Option<&ScoreFn>,
) -> Result<Vec<Thought>> {
    let mut out: Vec<Thought> = inputs.iter().map(Thought::from_thought).collect();

    if let Some(f) = scoring_function {
        for t in &mut out {
            let s = f(&t.state);
            t.set_score(s);
        }
        return Ok(out);
    }

    if combined_scoring {
        let states: Vec<ThoughtState> = out.iter().map(|t| t.state.clone()).collect();
        let prompt = ctx.prompter.score_prompt(&states)?;
        let texts = ctx.ask(&prompt, num_samples).await?;
        let scores = ctx.parser.parse_score_answer(&states, &texts)?;
        if scores.len() != out.len() {
            return Err(Error::operation(
                "score",
                format!("expected {} scores, parser returned {}", out.len(), scores.len()),
            ));
        }
        for (t, s) in out.iter_mut().zip(scores) {
            t.set_score(s);
        }
    } else {
        for t in &mut out {
            let states = [t.state.clone()];
            let prompt = ctx.prompter.score_prompt(&states)?;
            let texts = ctx.ask(&prompt, num_samples).await?;
            let s = ctx
                .parser
                .parse_score_answer(&states, &texts)?
                .first()
                .copied()
                .ok_or_else(|| Error::operation("score", "parser returned no score"))?;
            t.set_score(s);
        }
    }
    Ok(out)
}

async fn aggregate(
    ctx: &ExecContext<'_>,
    inputs: &[Thought],
    num_responses: usize,
) -> Result<Vec<Thought>> {
    if inputs.is_empty() {
        warn!("aggregate has no thoughts to combine");
        return Ok(Vec::new());
    }
    let states: Vec<ThoughtState> = inputs.iter().map(|t| t.state.clone()).collect();
    let base = states
        .iter()
        .fold(ThoughtState::new(), |acc, s| acc.merged(s));

    let prompt = ctx.prompter.aggregation_prompt(&states)?;
    let texts = ctx.ask(&prompt, num_responses).await?;
    Ok(ctx
        .parser
        .parse_aggregation_answer(&states, &texts)?
        .iter()
        .map(|s| Thought::new(base.merged(s)))
        .collect())
}

fn keep_best_n(inputs: &[Thought], n: usize, higher_is_better: bool) -> Result<Vec<Thought>> {
    if let Some(t) = inputs.iter().find(|t| !t.scored()) {
        return Err(Error::operation(
            "keep_best_n",
            format!("thought {} has not been scored", t.id()),
        ));
    }
    let mut ranked: Vec<&Thought> = inputs.iter().collect();
    // sort_by is stable: ties keep predecessor order
    ranked.sort_by(|a, b| {
        let ord = a
            .score()
            .partial_cmp(&b.score())
            .unwrap_or(std::cmp::Ordering::Equal);
        if higher_is_better {
            ord.reverse()
        } else {
            ord
        }
    });
    Ok(ranked
        .into_iter()
        .take(n)
        .map(Thought::from_thought)
        .collect())
}

async fn improve(ctx: &ExecContext<'_>, inputs: &[Thought]) -> Result<Vec<Thought>> {
    let mut out = Vec::with_capacity(inputs.len());
    for thought in inputs {
        out.push(improve_one(ctx, &thought.state).await?);
    }
    Ok(out)
}

async fn improve_one(ctx: &ExecContext<'_>, state: &ThoughtState) -> Result<Thought> {
    let prompt = ctx.prompter.improve_prompt(state)?;
    let texts = ctx.ask(&prompt, 1).await?;
    let improved = ctx.parser.parse_improve_answer(state, &texts)?;
    Ok(Thought::new(state.merged(&improved)))
}

async fn validate_and_improve(
    ctx: &ExecContext<'_>,
    inputs: &[Thought],
    num_samples: usize,
    improve: bool,
    num_tries: usize,
    validate_function: Option<&ValidateFn>,
) -> Result<Vec<Thought>> {
    let mut out = Vec::with_capacity(inputs.len());
    for thought in inputs {
        let mut current = Thought::from_thought(thought);
        let mut tries = 0;
        loop {
            let valid = match validate_function {
                Some(f) => f(&current.state),
                None => {
                    let prompt = ctx.prompter.validation_prompt(&current.state)?;
                    let texts = ctx.ask(&prompt, num_samples).await?;
                    ctx.parser.parse_validation_answer(&current.state, &texts)?
                }
            };
            current.set_valid(valid);
            if !improve || valid || tries >= num_tries {
                break;
            }
            current = improve_one(ctx, &current.state).await?;
            tries += 1;
        }
        out.push(current);
    }
    Ok(out)
}
