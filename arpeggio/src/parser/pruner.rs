//! トークンごとの語彙候補の選択
//!
//! このモジュールは、スーパータグ分布から各トークンの語彙候補を
//! 絞り込むカスケードを実装します:
//!
//! 1. カテゴリ辞書による既知語の候補制限
//! 2. 端末制約による強制(スコア0、他はすべて除外)
//! 3. 行最大値に対するベータ閾値
//! 4. スコア上位K件への切り詰め
//!
//! カスケードの結果が空になった場合は、フィルタに関係なく行最大の
//! カテゴリ1つを候補とします(フェイルセーフ)。

use crate::common::LOG_ZERO;
use crate::grammar::category::CatId;
use crate::parser::constraints::ConstraintSet;
use crate::parser::Parser;
use crate::scores::ScoreView;

/// 各トークンの語彙候補リストを計算します。
///
/// # 引数
///
/// * `parser` - 枝刈り設定を保持するパーサー
/// * `tokens` - 文の表層形
/// * `view` - スコア行列ビュー
/// * `constraints` - コンパイル済みの制約集合
/// * `out` - 出力先。トークンごとの`(カテゴリ, 語彙スコア)`リスト
pub(crate) fn assign_candidates(
    parser: &Parser,
    tokens: &[String],
    view: &ScoreView,
    constraints: &ConstraintSet,
    out: &mut Vec<Vec<(CatId, f32)>>,
) {
    let grammar = parser.grammar();
    let tag_cats = grammar.tag_categories();
    out.clear();
    out.reserve(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        if let Some(forced) = constraints.terminal_at(i) {
            // The forced category scores 0; everything else is floored out.
            out.push(vec![(forced, 0.0)]);
            continue;
        }

        let row = view.tag_row(i);
        let row_max = row.iter().fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
        let threshold = if parser.use_beta {
            parser.beta.ln() + row_max
        } else {
            LOG_ZERO
        };
        let dict = if parser.use_category_dict {
            grammar.dict_entry(token)
        } else {
            None
        };

        let mut cands: Vec<(CatId, f32)> = Vec::new();
        for (column, &cat) in tag_cats.iter().enumerate() {
            let lp = view.tag_lp(i, column);
            if let Some(allowed) = dict {
                if !allowed.contains(&cat) {
                    continue;
                }
            }
            if lp < threshold {
                continue;
            }
            cands.push((cat, lp));
        }

        cands.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        cands.truncate(parser.pruning_size);

        if cands.is_empty() {
            // Failsafe: the single best tag of the raw row, ignoring filters.
            let mut best = (0, f32::NEG_INFINITY);
            for (column, &lp) in row.iter().enumerate() {
                if lp > best.1 {
                    best = (column, lp);
                }
            }
            cands.push((tag_cats[best.0], best.1));
        }
        out.push(cands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, GrammarBuilder, Language};
    use crate::scores::ScoreMatrix;

    fn toy_grammar() -> Grammar {
        GrammarBuilder::from_readers(
            Language::English,
            "NP\nN\nNP/N\nS[dcl]\\NP\n".as_bytes(),
            "".as_bytes(),
            "".as_bytes(),
            "the NP/N\n".as_bytes(),
        )
        .unwrap()
    }

    fn candidates_for(
        parser: &Parser,
        tokens: &[&str],
        tag_rows: Vec<Vec<f32>>,
        constraints: &ConstraintSet,
    ) -> Vec<Vec<(CatId, f32)>> {
        let n = tokens.len();
        let cols = tag_rows[0].len();
        let tags =
            ScoreMatrix::from_vec(n, cols, tag_rows.into_iter().flatten().collect()).unwrap();
        let deps = ScoreMatrix::zeros(n, n + 1);
        let view = ScoreView::new(&tags, &deps, n, cols).unwrap();
        let tokens: Vec<String> = tokens.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        assign_candidates(parser, &tokens, &view, constraints, &mut out);
        out
    }

    #[test]
    fn test_beta_threshold() {
        let parser = Parser::new(toy_grammar()).beta(0.1);
        let empty = ConstraintSet::default();
        // ln(0.1) + (-1.0) keeps only scores >= -3.30.
        let out = candidates_for(
            &parser,
            &["cats"],
            vec![vec![-2.0, -1.0, -9.0, -3.0]],
            &empty,
        );
        assert_eq!(out[0].len(), 3);
        assert_eq!(out[0][0].1, -1.0);
        assert_eq!(out[0][1].1, -2.0);
        assert_eq!(out[0][2].1, -3.0);
    }

    #[test]
    fn test_top_k_truncation() {
        let parser = Parser::new(toy_grammar()).use_beta(false).pruning_size(2);
        let empty = ConstraintSet::default();
        let out = candidates_for(
            &parser,
            &["cats"],
            vec![vec![-2.0, -1.0, -4.0, -3.0]],
            &empty,
        );
        assert_eq!(out[0].len(), 2);
        assert_eq!(out[0][0].1, -1.0);
        assert_eq!(out[0][1].1, -2.0);
    }

    #[test]
    fn test_category_dict_override() {
        let grammar = toy_grammar();
        let parser = Parser::new(grammar).use_beta(false).use_category_dict(true);
        let empty = ConstraintSet::default();
        let out = candidates_for(
            &parser,
            &["the", "cats"],
            vec![vec![0.0, -1.0, -2.0, -3.0], vec![0.0, -1.0, -2.0, -3.0]],
            &empty,
        );
        // "the" is in the dictionary and restricted to NP/N.
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].1, -2.0);
        // "cats" is unknown and keeps the full row.
        assert_eq!(out[1].len(), 4);
    }

    #[test]
    fn test_failsafe_never_empty() {
        let parser = Parser::new(toy_grammar()).beta(0.5).use_category_dict(true);
        let grammar = parser.grammar();
        let empty = ConstraintSet::default();
        // The dictionary restricts "the" to NP/N, whose score is far below
        // the beta threshold; the failsafe falls back to the row maximum.
        let out = candidates_for(
            &parser,
            &["the"],
            vec![vec![0.0, -1.0, -50.0, -3.0]],
            &empty,
        );
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].0, grammar.parse_category("NP").unwrap());
        assert_eq!(out[0][0].1, 0.0);
    }

    #[test]
    fn test_terminal_constraint_forces_category() {
        let grammar = toy_grammar();
        let parser = Parser::new(grammar);
        let constraints = ConstraintSet::compile(
            parser.grammar(),
            &[crate::parser::constraints::Constraint::Terminal {
                category: "N".to_string(),
                position: 0,
            }],
            1,
        )
        .unwrap();
        let out = candidates_for(&parser, &["cats"], vec![vec![0.0, -8.0, -9.0, -9.0]], &constraints);
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].0, parser.grammar().parse_category("N").unwrap());
        assert_eq!(out[0][0].1, 0.0);
    }
}
