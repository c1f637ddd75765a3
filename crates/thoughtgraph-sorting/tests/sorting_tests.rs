//! Tests for thoughtgraph-sorting: scoring, prompts, answer parsing, topologies
//! and a full graph-of-thoughts run against a model that sorts correctly.

use std::sync::Arc;
use thoughtgraph_core::{Error, ThoughtState};
use thoughtgraph_engine::{Controller, GraphOfOperations, OperationId, Parser, Prompter};
use thoughtgraph_llm::MockModel;
use thoughtgraph_sorting::*;

const INPUT: &str = "[0, 2, 6, 3, 8, 7, 1, 1, 6, 7, 7, 7, 7, 9, 3, 0, 1, 7, 9, 1, 3, 5, 1, 3, 6, 4, 5, 4, 7, 3, 5, 7]";
const FIRST_HALF: &str = "[0, 2, 6, 3, 8, 7, 1, 1, 6, 7, 7, 7, 7, 9, 3, 0]";

fn state(original: &str, current: &str) -> ThoughtState {
    ThoughtState::new()
        .with("original", original)
        .with("current", current)
}

fn with_method(s: ThoughtState, method: Method, phase: i64) -> ThoughtState {
    s.with("method", method.as_str()).with("phase", phase)
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ===========================================================================
// num_errors / test_sorting
// ===========================================================================

#[test]
fn num_errors_counts_inversions_and_frequency_mismatches() {
    assert_eq!(num_errors(&state("[3, 1, 2]", "[1, 2, 3]")), 0.0);
    assert_eq!(num_errors(&state("[3, 1, 2]", "[1, 3, 2]")), 1.0);
    assert_eq!(num_errors(&state("[3, 1, 2]", "[1, 2]")), 1.0);
    assert_eq!(num_errors(&state("[3, 1, 2]", "[1, 2, 3, 3]")), 1.0);
    // one 3 missing, one 4 extra, one inversion
    assert_eq!(num_errors(&state("[3, 1, 2]", "[1, 4, 2]")), 3.0);
}

#[test]
fn num_errors_is_300_when_unparsable() {
    assert_eq!(num_errors(&state("[3, 1, 2]", "sorted!")), 300.0);
    assert_eq!(num_errors(&state("oops", "[1, 2, 3]")), 300.0);
    assert_eq!(num_errors(&ThoughtState::new()), 300.0);
}

#[test]
fn num_errors_uses_short_sublist_as_reference() {
    let original = "[0, 1, 2, 3, 4, 5, 6, 7]";
    let s = state(original, "[1, 5]").with("unsorted_sublist", "[5, 1]");
    assert_eq!(num_errors(&s), 0.0);
    // without the sublist six elements are missing
    assert_eq!(num_errors(&state(original, "[1, 5]")), 6.0);
}

#[test]
fn num_errors_ignores_sublist_that_is_not_much_shorter() {
    let s = state("[3, 1, 2]", "[3]").with("unsorted_sublist", "[3]");
    assert_eq!(num_errors(&s), 2.0);
    let s = state("[3, 1, 2]", "[1, 2, 3]").with("unsorted_sublist", "");
    assert_eq!(num_errors(&s), 0.0);
}

#[test]
fn test_sorting_compares_with_sorted_original() {
    assert!(test_sorting(&state("[3, 1, 2]", "[1, 2, 3]")).unwrap());
    assert!(!test_sorting(&state("[3, 1, 2]", "[1, 3, 2]")).unwrap());
    assert!(!test_sorting(&state("[3, 1, 2]", "[1, 2]")).unwrap());
    assert!(test_sorting(&state("[3, 1, 2]", "")).is_err());
    assert!(test_sorting(&ThoughtState::new().with("original", "[1]")).is_err());
}

// ===========================================================================
// Initial state / Method
// ===========================================================================

#[test]
fn initial_state_has_exactly_four_fields() {
    let s = initial_state(INPUT, Method::Got);
    let mut keys: Vec<&str> = s.keys().collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["current", "method", "original", "phase"]);
    assert_eq!(s.get_str("original"), Some(INPUT));
    assert_eq!(s.get_str("current"), Some(""));
    assert_eq!(s.get_i64("phase"), Some(0));
    assert_eq!(s.get_str("method"), Some("got"));
}

#[test]
fn method_parses_and_displays() {
    assert_eq!("got".parse::<Method>().unwrap(), Method::Got);
    assert_eq!(" TOT ".parse::<Method>().unwrap(), Method::Tot);
    assert_eq!(Method::Cot.to_string(), "cot");
    assert_eq!(Method::default(), Method::Got);
    let err = "bfs".parse::<Method>().unwrap_err();
    assert!(err.contains("bfs"));
}

// ===========================================================================
// Prompter
// ===========================================================================

#[test]
fn io_and_cot_prompts_end_with_the_input() {
    let p = SortingPrompter::new();
    let io = p.generate_prompt(1, &initial_state(INPUT, Method::Io)).unwrap();
    assert!(io.starts_with("<Instruction> Sort the following list of numbers in ascending order."));
    assert!(io.ends_with(&format!("Input: {}", INPUT)));

    let cot = p.generate_prompt(1, &initial_state(INPUT, Method::Cot)).unwrap();
    assert!(cot.contains("<Approach>"));
    assert!(cot.contains("prefixed with \"Output: \""));
    assert!(cot.ends_with(&format!("Input: {}", INPUT)));
}

#[test]
fn tot_sorts_first_then_improves() {
    let p = SortingPrompter::new();
    let first = p.generate_prompt(1, &initial_state("[3, 1, 2]", Method::Tot)).unwrap();
    assert!(first.ends_with("Input: [3, 1, 2]"));

    let again = with_method(state("[3, 1, 2]", "[1, 3]"), Method::Tot, 2);
    let prompt = p.generate_prompt(1, &again).unwrap();
    assert!(prompt.contains("same number of elements as the input list (3)"));
    assert!(prompt.contains("Input: [3, 1, 2]\nIncorrectly Sorted: [1, 3]"));
}

#[test]
fn got_phase_zero_asks_for_a_split() {
    let p = SortingPrompter::new();
    let prompt = p.generate_prompt(2, &initial_state(INPUT, Method::Got)).unwrap();
    assert!(prompt.contains("Split the following list of 32 numbers into 2 lists of 16 numbers"));
    assert!(prompt.contains("{\n    \"List 1\": [3, 4, 3, 5, 7, 8, 1, ...],"));
    assert!(!prompt.contains("{{"));
    assert!(prompt.ends_with(&format!("Input: {}", INPUT)));
}

#[test]
fn got_phase_one_sorts_the_sublist() {
    let p = SortingPrompter::new();
    let s = with_method(state(INPUT, FIRST_HALF), Method::Got, 1);
    let prompt = p.generate_prompt(1, &s).unwrap();
    assert!(prompt.starts_with("<Instruction> Sort the following list"));
    assert!(prompt.ends_with(&format!("Input: {}", FIRST_HALF)));
}

#[test]
fn got_improve_checks_against_sublist_or_original() {
    let p = SortingPrompter::new();
    let half = with_method(state(INPUT, "[0, 1]"), Method::Got, 2)
        .with("unsorted_sublist", FIRST_HALF);
    let prompt = p.generate_prompt(1, &half).unwrap();
    assert!(prompt.contains(&format!("Input: {}\nIncorrectly Sorted: [0, 1]", FIRST_HALF)));
    assert!(prompt.contains("input list (16)"));

    let whole = with_method(state(INPUT, "[0, 1]"), Method::Got, 2).with("unsorted_sublist", INPUT);
    let prompt = p.generate_prompt(1, &whole).unwrap();
    assert!(prompt.contains(&format!("Input: {}\nIncorrectly Sorted:", INPUT)));
    assert!(prompt.contains("input list (32)"));
}

#[test]
fn unknown_or_missing_method_is_an_error() {
    let p = SortingPrompter::new();
    let s = state(INPUT, "").with("method", "beam").with("phase", 0);
    assert!(matches!(p.generate_prompt(1, &s), Err(Error::InvalidState(_))));
    assert!(matches!(
        p.generate_prompt(1, &state(INPUT, "")),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn aggregation_prompt_lists_both_inputs() {
    let p = SortingPrompter::new();
    let a = state(INPUT, "[1, 3]");
    let b = state(INPUT, "[2, 4]");
    let prompt = p.aggregation_prompt(&[a.clone(), b]).unwrap();
    assert!(prompt.contains("Merge the following 2 sorted lists of length 2 each, into one sorted list of length 4"));
    assert!(prompt.contains("1: [1, 3]\n2: [2, 4]\n"));
    assert!(prompt.trim_end().ends_with("Merged list:"));

    assert!(p.aggregation_prompt(&[a]).is_err());
}

#[test]
fn score_and_validation_prompts_are_unsupported() {
    let p = SortingPrompter::new();
    let s = initial_state(INPUT, Method::Got);
    assert!(matches!(p.score_prompt(&[s.clone()]), Err(Error::Operation { .. })));
    assert!(p.validation_prompt(&s).is_err());
}

// ===========================================================================
// Parser
// ===========================================================================

#[test]
fn split_answer_becomes_one_state_per_list() {
    let parser = SortingParser::new();
    let base = initial_state(INPUT, Method::Got);
    let answer = "Sure:\n{\n  \"List 1\": [3, 1],\n  \"List 2\": [2, 0]\n}\nDone.";
    let states = parser.parse_generate_answer(&base, &texts(&[answer])).unwrap();

    assert_eq!(states.len(), 2);
    assert_eq!(states[0].get_str("current"), Some("[3, 1]"));
    assert_eq!(states[0].get_str("unsorted_sublist"), Some("[3, 1]"));
    assert_eq!(states[0].get_i64("phase"), Some(1));
    assert_eq!(states[0].get_str("part"), Some("List 1"));
    assert_eq!(states[0].get_str("original"), Some(INPUT));
    assert_eq!(states[1].get_str("current"), Some("[2, 0]"));
    assert_eq!(states[1].get_str("part"), Some("List 2"));
}

#[test]
fn split_answer_skips_unknown_keys_and_accepts_string_lists() {
    let parser = SortingParser::new();
    let base = initial_state(INPUT, Method::Got);
    let answer = r#"{"List 1": "[1,2]", "Extra": [9], "List 2": [3]}"#;
    let states = parser.parse_generate_answer(&base, &texts(&[answer])).unwrap();
    let currents: Vec<_> = states.iter().filter_map(|s| s.get_str("current")).collect();
    assert_eq!(currents, vec!["[1, 2]", "[3]"]);
}

#[test]
fn unparsable_split_answer_is_skipped() {
    let parser = SortingParser::new();
    let base = initial_state(INPUT, Method::Got);
    let answers = texts(&["no json here", "{\"List 1\": [1, x]}", "{\"List 1\": [4]}"]);
    let states = parser.parse_generate_answer(&base, &answers).unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].get_str("current"), Some("[4]"));
}

#[test]
fn sort_answer_takes_list_after_last_output() {
    let parser = SortingParser::new();
    let base = initial_state("[3, 1, 2]", Method::Cot);
    let answer = "Unsorted Subarrays:\n[3]\n[1, 2]\nOutput: [1, 3, 2]\nWait.\nOutput: [1, 2, 3] final";
    let states = parser.parse_generate_answer(&base, &texts(&[answer])).unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].get_str("current"), Some("[1, 2, 3]"));
    assert_eq!(states[0].get_i64("phase"), Some(2));
}

#[test]
fn sort_answer_without_list_is_dropped() {
    let parser = SortingParser::new();
    let base = initial_state("[3, 1, 2]", Method::Io);
    let states = parser
        .parse_generate_answer(&base, &texts(&["I cannot sort this.", "[1, 2, 3]"]))
        .unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].get_str("current"), Some("[1, 2, 3]"));
}

#[test]
fn merge_answer_concatenates_sublists() {
    let parser = SortingParser::new();
    let a = state(INPUT, "[1, 3]").with("unsorted_sublist", "[3, 1]").with("part", "List 1");
    let b = state(INPUT, "[2, 4]").with("unsorted_sublist", "[4, 2]").with("part", "List 2");
    let states = parser
        .parse_aggregation_answer(&[a, b], &texts(&["Merged list:\n[1, 2, 3, 4]"]))
        .unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].get_str("current"), Some("[1, 2, 3, 4]"));
    assert_eq!(states[0].get_str("unsorted_sublist"), Some("[3, 1, 4, 2]"));
    assert_eq!(states[0].get_i64("phase"), Some(2));
}

#[test]
fn merge_answer_accepts_bare_numbers() {
    let parser = SortingParser::new();
    let a = state(INPUT, "[1, 3]");
    let b = state(INPUT, "[2, 4]");
    let states = parser
        .parse_aggregation_answer(&[a, b], &texts(&["1, 2, 3, 4", "nothing useful"]))
        .unwrap();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].get_str("current"), Some("[1, 2, 3, 4]"));
    // missing sublists fall back to the full input
    assert_eq!(states[0].get_str("unsorted_sublist"), Some(INPUT));
    // an empty merge still ranks: one error per missing element
    assert_eq!(states[1].get_str("current"), Some("[]"));
    assert_eq!(num_errors(&states[1]), 32.0);
}

#[test]
fn merge_answer_bare_numbers_follow_last_output() {
    let parser = SortingParser::new();
    let a = state(INPUT, "[1, 3]");
    let b = state(INPUT, "[2, 4]");
    let answer = "Combining 1, 3 with 2, 4:\n3, 1, 2\nOutput: 1, 2, 3, 4";
    let states = parser
        .parse_aggregation_answer(&[a, b], &texts(&[answer]))
        .unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].get_str("current"), Some("[1, 2, 3, 4]"));
}

#[test]
fn merge_answer_needs_two_states() {
    let parser = SortingParser::new();
    let err = parser
        .parse_aggregation_answer(&[state(INPUT, "[1]")], &texts(&["[1]"]))
        .unwrap_err();
    assert!(err.to_string().contains("expected 2 states"));
}

// ===========================================================================
// Topologies
// ===========================================================================

fn tags(g: &GraphOfOperations) -> Vec<&'static str> {
    g.operations().map(|op| op.tag()).collect()
}

fn ids(g: &GraphOfOperations) -> Vec<OperationId> {
    g.ids().collect()
}

#[test]
fn io_and_cot_are_three_step_chains() {
    for g in [io(), cot()] {
        assert_eq!(tags(&g), vec!["generate", "score", "ground_truth_evaluator"]);
        assert_eq!(g.roots().len(), 1);
        assert_eq!(g.leaves().len(), 1);
    }
}

#[test]
fn tot_refines_from_the_first_best() {
    let g = tot().unwrap();
    assert_eq!(
        tags(&g),
        vec![
            "generate",
            "score",
            "keep_best_n",
            "generate",
            "score",
            "keep_best_n",
            "keep_best_n",
            "ground_truth_evaluator",
        ]
    );
    let id = ids(&g);
    assert_eq!(g.predecessors(id[3]), &[id[2]]);
    assert_eq!(g.predecessors(id[5]), &[id[2], id[4]]);
    assert_eq!(g.predecessors(id[6]), &[id[5]]);
}

#[test]
fn got_splits_sorts_merges_and_refines() {
    let g = got().unwrap();
    assert_eq!(g.len(), 16);
    let id = ids(&g);
    assert_eq!(g.roots(), &[id[0]]);
    assert_eq!(g.leaves(), &[id[15]]);

    // two branches hang off the split
    assert_eq!(g.successors(id[0]), &[id[1], id[5]]);
    assert_eq!(tags(&g)[1..5], ["selector", "generate", "score", "keep_best_n"]);
    assert_eq!(tags(&g)[5..9], ["selector", "generate", "score", "keep_best_n"]);

    assert_eq!(g.operation(id[9]).unwrap().tag(), "aggregate");
    assert_eq!(g.predecessors(id[9]), &[id[4], id[8]]);
    assert_eq!(g.predecessors(id[14]), &[id[11], id[13]]);
    assert_eq!(g.operation(id[15]).unwrap().tag(), "ground_truth_evaluator");
}

#[test]
fn method_graph_matches_factories() {
    assert_eq!(Method::Io.graph().unwrap().len(), io().len());
    assert_eq!(Method::Tot.graph().unwrap().len(), 8);
    assert_eq!(Method::Got.graph().unwrap().len(), 16);
}

// ===========================================================================
// Full run
// ===========================================================================

fn last_list(prompt: &str, prefix: &str) -> Vec<i64> {
    let line = prompt
        .lines()
        .rev()
        .find(|l| l.starts_with(prefix))
        .unwrap();
    string_to_list(&line[prefix.len()..]).unwrap()
}

/// A model that answers every sorting prompt correctly.
fn oracle(prompt: &str, n: usize) -> Vec<String> {
    let answer = if prompt.contains("Split the following list") {
        let input = last_list(prompt, "Input: ");
        let (a, b) = input.split_at(input.len() / 2);
        format!(
            "{{\n    \"List 1\": {},\n    \"List 2\": {}\n}}",
            list_to_string(a),
            list_to_string(b)
        )
    } else if prompt.contains("Merged list:") {
        let mut merged = last_list(prompt, "1: ");
        merged.extend(last_list(prompt, "2: "));
        merged.sort_unstable();
        list_to_string(&merged)
    } else {
        let mut input = last_list(prompt, "Input: ");
        input.sort_unstable();
        list_to_string(&input)
    };
    vec![answer; n]
}

#[tokio::test]
async fn got_run_with_correct_model_solves_the_problem() {
    let lm = Arc::new(MockModel::new(oracle));
    let mut ctrl = Controller::new(
        lm.clone(),
        got().unwrap(),
        Arc::new(SortingPrompter::new()),
        Arc::new(SortingParser::new()),
        initial_state(INPUT, Method::Got),
    );
    ctrl.run().await.unwrap();

    let finals = ctrl.final_thoughts();
    assert_eq!(finals.len(), 1);
    assert!(finals[0].solved());
    assert_eq!(
        finals[0].state.get_str("current"),
        Some("[0, 0, 1, 1, 1, 1, 1, 2, 3, 3, 3, 3, 3, 4, 4, 5, 5, 5, 6, 6, 6, 7, 7, 7, 7, 7, 7, 7, 7, 8, 9, 9]")
    );

    // split, two half sorts, merge, refine
    let prompts = lm.prompts();
    assert_eq!(prompts.len(), 5);
    assert!(prompts[0].contains("Split the following list"));
    assert!(prompts[1].ends_with(&format!("Input: {}", FIRST_HALF)));
    assert!(prompts[3].contains("Merged list:"));
    assert!(prompts[4].contains("Incorrectly Sorted:"));

    let summary = ctrl.summary();
    assert_eq!(summary.executed, 16);
    assert!(summary.solved);
}

#[tokio::test]
async fn io_run_with_wrong_answer_is_not_solved() {
    let lm = Arc::new(MockModel::constant("Output: [1, 2, 3]"));
    let mut ctrl = Controller::new(
        lm,
        io(),
        Arc::new(SortingPrompter::new()),
        Arc::new(SortingParser::new()),
        initial_state(INPUT, Method::Io),
    );
    ctrl.run().await.unwrap();

    let finals = ctrl.final_thoughts();
    assert_eq!(finals.len(), 1);
    assert!(finals[0].compared_to_ground_truth());
    assert!(!finals[0].solved());

    let graph = ctrl.graph_json().unwrap();
    let score = graph[1]["scores"][0].as_f64().unwrap();
    assert!(score > 0.0);
}
