use crate::{
    ArpeggioError, Constraint, Diagnostic, Grammar, GrammarBuilder, Language, Parser, ScoreMatrix,
};

/// シナリオ共通の小さな英語文法。
///
/// スーパータグ目録の列: 0=NP, 1=N, 2=S[dcl]\NP, 3=NP/N, 4=N/N, 5=N\N
fn scenario_grammar() -> Grammar {
    GrammarBuilder::from_readers(
        Language::English,
        "NP\nN\nS[dcl]\\NP\nNP/N\nN/N\nN\\N\n".as_bytes(),
        "N NP\n".as_bytes(),
        "NP S[dcl]\\NP\n".as_bytes(),
        "".as_bytes(),
    )
    .unwrap()
}

const NUM_TAGS: usize = 6;

/// 指定列のみ0、他を-1e10とするタグ行列を構築します。
fn one_hot_tags(columns: &[usize]) -> ScoreMatrix {
    let n = columns.len();
    let mut data = vec![-1e10f32; n * NUM_TAGS];
    for (i, &c) in columns.iter().enumerate() {
        data[i * NUM_TAGS + c] = 0.0;
    }
    ScoreMatrix::from_vec(n, NUM_TAGS, data).unwrap()
}

#[test]
fn test_single_token_sentence() {
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();
    worker
        .reset_sentence(&["Hello"], one_hot_tags(&[0]), ScoreMatrix::zeros(1, 2))
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 1);
    let parse = worker.derivation(0).unwrap();
    assert_eq!(parse.category(), "NP");
    assert_eq!(parse.score(), 0.0);
    assert_eq!(parse.leaf_categories(), vec!["NP".to_string()]);
    assert!(worker.diagnostic().is_none());
}

#[test]
fn test_two_token_backward_application() {
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();
    // John's head is runs (column 2), the head of runs is ROOT (column 0).
    let deps = ScoreMatrix::from_vec(2, 3, vec![-5.0, -5.0, 0.0, 0.0, -5.0, -5.0]).unwrap();
    worker
        .reset_sentence(&["John", "runs"], one_hot_tags(&[0, 2]), deps)
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 1);
    let parse = worker.derivation(0).unwrap();
    assert_eq!(parse.category(), "S[dcl]");
    assert!(parse.score().abs() < 1e-6);
    assert_eq!(parse.head(), 1);
    assert_eq!(
        parse.leaf_categories(),
        vec!["NP".to_string(), "S[dcl]\\NP".to_string()]
    );
}

#[test]
fn test_dependency_scores_enter_the_total() {
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();
    let deps = ScoreMatrix::from_vec(2, 3, vec![-5.0, -5.0, -0.25, -0.125, -5.0, -5.0]).unwrap();
    worker
        .reset_sentence(&["John", "runs"], one_hot_tags(&[0, 2]), deps)
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 1);
    let parse = worker.derivation(0).unwrap();
    // John -> runs plus runs -> ROOT.
    assert!((parse.score() - (-0.375)).abs() < 1e-6);
    assert!((parse.recompute_score() - parse.score()).abs() < 1e-6);
}

#[test]
fn test_seen_rules_reject_unattested_pair() {
    // The seen-rules table lists only NP/N N; the pair (NP, S[dcl]\NP)
    // needed for the sentence is absent.
    let grammar = GrammarBuilder::from_readers(
        Language::English,
        "NP\nN\nS[dcl]\\NP\nNP/N\nN/N\nN\\N\n".as_bytes(),
        "".as_bytes(),
        "NP/N N\n".as_bytes(),
        "".as_bytes(),
    )
    .unwrap();
    let parser = Parser::new(grammar).use_seen_rules(true);
    let mut worker = parser.new_worker();
    worker
        .reset_sentence(&["John", "runs"], one_hot_tags(&[0, 2]), ScoreMatrix::zeros(2, 3))
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 0);
    assert_eq!(worker.diagnostic(), Some(Diagnostic::SearchExhausted));
}

#[test]
fn test_seen_rules_only_remove_parses() {
    let run = |use_seen: bool| {
        let parser = Parser::new(scenario_grammar()).use_seen_rules(use_seen);
        let mut worker = parser.new_worker();
        worker
            .reset_sentence(&["John", "runs"], one_hot_tags(&[0, 2]), ScoreMatrix::zeros(2, 3))
            .unwrap();
        worker.parse();
        worker.num_parses()
    };
    // (NP, S[dcl]\NP) is attested, so enabling the filter changes nothing;
    // it can never add parses.
    assert_eq!(run(false), 1);
    assert_eq!(run(true), 1);
}

/// 3トークンの曖昧な文を構築します。
///
/// 解析は3通り: `(a (b c))`、合成を経た`((a b) c)`、そして`b`に
/// 劣勢カテゴリ`N\N`を使う交差合成の解析。依存スコアが構造を
/// 区別するため、総スコアは厳密に単調減少します。
fn ambiguous_worker(parser: &Parser) -> crate::Worker {
    let mut worker = parser.new_worker();
    let mut tags = vec![-1e10f32; 3 * NUM_TAGS];
    tags[4] = -0.1; // a: N/N
    tags[NUM_TAGS + 4] = -0.2; // b: N/N
    tags[NUM_TAGS + 5] = -0.7; // b: N\N
    tags[2 * NUM_TAGS + 1] = -0.3; // c: N
    let tags = ScoreMatrix::from_vec(3, NUM_TAGS, tags).unwrap();
    let deps = ScoreMatrix::from_vec(
        3,
        4,
        vec![
            0.0, -9.0, -0.4, -9.0, // a: ROOT 0, a->b -0.4
            -0.6, 0.0, -9.0, -9.0, // b: ROOT -0.6, b->a 0
            -9.0, -0.5, 0.0, -9.0, // c: c->a -0.5, c->b 0
        ],
    )
    .unwrap();
    worker
        .reset_sentence(&["a", "b", "c"], tags, deps)
        .unwrap();
    worker
}

#[test]
fn test_nbest_returns_distinct_trees_in_score_order() {
    let parser = Parser::new(scenario_grammar())
        .nbest(3)
        .possible_root_cats(&["N"])
        .unwrap();
    let mut worker = ambiguous_worker(&parser);
    worker.parse();

    assert_eq!(worker.num_parses(), 3);
    let scores: Vec<f32> = (0..3).map(|i| worker.parse_score(i).unwrap()).collect();
    assert!((scores[0] - (-0.6)).abs() < 1e-5);
    assert!((scores[1] - (-1.1)).abs() < 1e-5);
    assert!((scores[2] - (-2.1)).abs() < 1e-5);
    assert!(scores[0] > scores[1] && scores[1] > scores[2]);

    let autos: Vec<String> = (0..3)
        .map(|i| worker.derivation(i).unwrap().to_auto())
        .collect();
    assert_ne!(autos[0], autos[1]);
    assert_ne!(autos[1], autos[2]);
    assert_ne!(autos[0], autos[2]);

    for i in 0..3 {
        let parse = worker.derivation(i).unwrap();
        assert!((parse.recompute_score() - parse.score()).abs() < 1e-5);
        assert_eq!(parse.span(), 0..3);
    }
}

#[test]
fn test_first_parse_is_optimal() {
    // With nbest = 1 the single returned parse carries the same score as
    // the best of the exhaustive 3-best list.
    let parser = Parser::new(scenario_grammar())
        .possible_root_cats(&["N"])
        .unwrap();
    let mut worker = ambiguous_worker(&parser);
    worker.parse();
    assert_eq!(worker.num_parses(), 1);
    assert!((worker.parse_score(0).unwrap() - (-0.6)).abs() < 1e-5);
}

#[test]
fn test_determinism_across_runs() {
    let parser = Parser::new(scenario_grammar())
        .nbest(3)
        .possible_root_cats(&["N"])
        .unwrap();
    let collect = || {
        let mut worker = ambiguous_worker(&parser);
        worker.parse();
        (0..worker.num_parses())
            .map(|i| {
                (
                    worker.derivation(i).unwrap().to_auto(),
                    worker.parse_score(i).unwrap(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(collect(), collect());
}

#[test]
fn test_terminal_constraint_overrides_best_tag() {
    let parser = Parser::new(scenario_grammar())
        .possible_root_cats(&["NP", "N"])
        .unwrap();
    let mut worker = parser.new_worker();
    // The tagger prefers NP, but token 0 is forced to N.
    let mut tags = vec![-1e10f32; NUM_TAGS];
    tags[0] = 0.0;
    tags[1] = -5.0;
    let tags = ScoreMatrix::from_vec(1, NUM_TAGS, tags).unwrap();
    worker
        .reset_sentence(&["cats"], tags, ScoreMatrix::zeros(1, 2))
        .unwrap();
    worker
        .set_constraints(&[Constraint::Terminal {
            category: "N".to_string(),
            position: 0,
        }])
        .unwrap();
    worker.parse();

    assert!(worker.num_parses() >= 1);
    let parse = worker.derivation(0).unwrap();
    assert_eq!(parse.leaf_categories(), vec!["N".to_string()]);
    // The forced category scores 0 regardless of the tagger.
    assert_eq!(parse.score(), 0.0);
}

#[test]
fn test_span_constraint_forces_bracketing() {
    let parser = Parser::new(scenario_grammar())
        .nbest(3)
        .possible_root_cats(&["N"])
        .unwrap();
    let mut worker = ambiguous_worker(&parser);
    // Forcing the bracket (b c) rules out the composed analysis ((a b) c).
    worker
        .set_constraints(&[Constraint::Span {
            category: None,
            start: 1,
            length: 2,
        }])
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 1);
    assert!((worker.parse_score(0).unwrap() - (-0.6)).abs() < 1e-5);
}

#[test]
fn test_max_length_skips_long_sentences() {
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();
    let n = 300;
    let tokens: Vec<String> = (0..n).map(|i| format!("w{i}")).collect();
    worker
        .reset_sentence(
            &tokens,
            ScoreMatrix::zeros(n, NUM_TAGS),
            ScoreMatrix::zeros(n, n + 1),
        )
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 0);
    assert_eq!(worker.diagnostic(), Some(Diagnostic::LengthExceeded));
}

#[test]
fn test_step_limit_returns_collected_parses() {
    let parser = Parser::new(scenario_grammar()).max_steps(1);
    let mut worker = parser.new_worker();
    worker
        .reset_sentence(&["John", "runs"], one_hot_tags(&[0, 2]), ScoreMatrix::zeros(2, 3))
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 0);
    assert_eq!(worker.diagnostic(), Some(Diagnostic::StepLimitExceeded));
}

#[test]
fn test_shape_mismatch_is_surfaced() {
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();
    let result = worker.reset_sentence(
        &["John", "runs"],
        ScoreMatrix::zeros(2, NUM_TAGS + 1),
        ScoreMatrix::zeros(2, 3),
    );
    assert!(matches!(result, Err(ArpeggioError::ShapeMismatch(_))));
    // The worker is left with an empty sentence; parsing is a no-op.
    worker.parse();
    assert_eq!(worker.num_parses(), 0);

    let result = worker.reset_sentence(
        &["John", "runs"],
        ScoreMatrix::zeros(2, NUM_TAGS),
        ScoreMatrix::zeros(2, 2),
    );
    assert!(matches!(result, Err(ArpeggioError::ShapeMismatch(_))));
}

#[test]
fn test_unary_rules_do_not_chain() {
    // N reaches NP by one unary step and S[dcl] would need a second step;
    // chains of two unary rules on the same span are forbidden, so no
    // admissible root is ever produced.
    let grammar = GrammarBuilder::from_readers(
        Language::English,
        "N\nNP\nS[dcl]\n".as_bytes(),
        "N NP\nNP S[dcl]\n".as_bytes(),
        "".as_bytes(),
        "".as_bytes(),
    )
    .unwrap();
    let parser = Parser::new(grammar)
        .possible_root_cats(&["S[dcl]"])
        .unwrap();
    let mut worker = parser.new_worker();
    let mut tags = vec![-1e10f32; 3];
    tags[0] = 0.0;
    worker
        .reset_sentence(
            &["cats"],
            ScoreMatrix::from_vec(1, 3, tags).unwrap(),
            ScoreMatrix::zeros(1, 2),
        )
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 0);
    assert_eq!(worker.diagnostic(), Some(Diagnostic::SearchExhausted));
}

#[test]
fn test_unary_expansion_reaches_root() {
    // A single unary step is fine: N rewrites to NP, which is a root.
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();
    worker
        .reset_sentence(&["cats"], one_hot_tags(&[1]), ScoreMatrix::zeros(1, 2))
        .unwrap();
    worker.parse();

    assert_eq!(worker.num_parses(), 1);
    let parse = worker.derivation(0).unwrap();
    assert_eq!(parse.category(), "NP");
    assert_eq!(parse.leaf_categories(), vec!["N".to_string()]);
    assert_eq!(
        parse.to_auto(),
        "(<T NP 0 1> (<L N XX XX cats N>))"
    );
}

#[test]
fn test_deriv_rendering() {
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();
    worker
        .reset_sentence(&["John", "runs"], one_hot_tags(&[0, 2]), ScoreMatrix::zeros(2, 3))
        .unwrap();
    worker.parse();

    let deriv = worker.derivation(0).unwrap().to_deriv();
    let expected = "John   runs\n\
                    \u{20}NP  S[dcl]\\NP\n\
                    --------------<\n\
                    \u{20}   S[dcl]";
    assert_eq!(deriv, expected);
}

#[test]
fn test_empty_sentence_is_a_noop() {
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();
    worker
        .reset_sentence::<&str>(&[], ScoreMatrix::zeros(0, NUM_TAGS), ScoreMatrix::zeros(0, 1))
        .unwrap();
    worker.parse();
    assert_eq!(worker.num_parses(), 0);
    assert!(worker.diagnostic().is_none());
}

#[test]
fn test_worker_is_reusable_across_sentences() {
    let parser = Parser::new(scenario_grammar());
    let mut worker = parser.new_worker();

    worker
        .reset_sentence(&["John", "runs"], one_hot_tags(&[0, 2]), ScoreMatrix::zeros(2, 3))
        .unwrap();
    worker.parse();
    assert_eq!(worker.num_parses(), 1);

    worker
        .reset_sentence(&["Hello"], one_hot_tags(&[0]), ScoreMatrix::zeros(1, 2))
        .unwrap();
    worker.parse();
    assert_eq!(worker.num_parses(), 1);
    assert_eq!(worker.derivation(0).unwrap().category(), "NP");
    assert!(worker.derivation(1).is_none());
}
