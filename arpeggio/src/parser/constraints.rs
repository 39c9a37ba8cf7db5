//! 部分解析制約
//!
//! このモジュールは、特定のスパンに特定のカテゴリを強制する制約を
//! 提供します。端末制約は語彙候補の選択を上書きし、非端末制約は
//! チャートへの挿入前に候補を検閲します。カテゴリなしの非端末制約は
//! 括弧付け(スパン境界)のみを強制します。

use crate::errors::{ArpeggioError, Result};
use crate::grammar::category::CatId;
use crate::grammar::Grammar;

/// 1つの部分解析制約
///
/// 外部から与えられる制約の入力表現です。カテゴリは
/// CCGbank表記の文字列で指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// 端末制約: トークン`position`にカテゴリを強制します。
    Terminal {
        /// 強制するカテゴリ
        category: String,
        /// トークン位置
        position: usize,
    },
    /// 非端末制約: スパン`[start, start+length)`にカテゴリを強制します。
    /// `category`が`None`の場合は括弧付けのみを強制します。
    Span {
        /// 強制するカテゴリ。`None`なら任意のカテゴリを許容します。
        category: Option<String>,
        /// スパンの開始位置
        start: usize,
        /// スパンの長さ
        length: usize,
    },
}

#[derive(Debug)]
struct SpanConstraint {
    start: usize,
    length: usize,
    /// 許容されるカテゴリの集合。`None`はワイルドカードです。
    allowed: Option<hashbrown::HashSet<CatId>>,
}

/// コンパイル済みの制約集合
#[derive(Debug, Default)]
pub(crate) struct ConstraintSet {
    terminal: hashbrown::HashMap<usize, CatId>,
    spans: Vec<SpanConstraint>,
}

impl ConstraintSet {
    /// 制約集合を空にします。
    pub(crate) fn clear(&mut self) {
        self.terminal.clear();
        self.spans.clear();
    }

    /// 制約の入力表現を検証してコンパイルします。
    ///
    /// カテゴリ付きの非端末制約では、強制カテゴリ自身に加えて、
    /// 単項規則を1段適用すると強制カテゴリに到達するカテゴリも
    /// 同じスパン上で許容されます。
    ///
    /// # 引数
    ///
    /// * `grammar` - 参照する文法
    /// * `constraints` - 制約の一覧
    /// * `sent_len` - 文のトークン数
    ///
    /// # エラー
    ///
    /// 制約が文法に登録されていないカテゴリを参照している場合は
    /// [`ArpeggioError::GrammarInconsistency`]を、スパンが文の範囲外の
    /// 場合は[`ArpeggioError::InvalidArgument`]を返します。
    pub(crate) fn compile(
        grammar: &Grammar,
        constraints: &[Constraint],
        sent_len: usize,
    ) -> Result<Self> {
        let mut set = Self::default();
        for constraint in constraints {
            match constraint {
                Constraint::Terminal { category, position } => {
                    if *position >= sent_len {
                        return Err(ArpeggioError::invalid_argument(
                            "constraints",
                            format!("terminal position {position} out of range"),
                        ));
                    }
                    let cat = resolve(grammar, category)?;
                    if let Some(&existing) = set.terminal.get(position) {
                        if existing != cat {
                            return Err(ArpeggioError::grammar_inconsistency(
                                "conflicting terminal constraints",
                                format!("token {position} is forced to two categories"),
                            ));
                        }
                    }
                    set.terminal.insert(*position, cat);
                }
                Constraint::Span {
                    category,
                    start,
                    length,
                } => {
                    if *length == 0 || start + length > sent_len {
                        return Err(ArpeggioError::invalid_argument(
                            "constraints",
                            format!("span ({start}, {length}) out of range"),
                        ));
                    }
                    let allowed = match category {
                        Some(name) => {
                            let cat = resolve(grammar, name)?;
                            let mut allowed = hashbrown::HashSet::new();
                            allowed.insert(cat);
                            // Categories one unary step below the forced one
                            // may still be rewritten into it on the same span.
                            for &child in grammar.unary_children(cat) {
                                allowed.insert(child);
                            }
                            Some(allowed)
                        }
                        None => None,
                    };
                    set.spans.push(SpanConstraint {
                        start: *start,
                        length: *length,
                        allowed,
                    });
                }
            }
        }
        Ok(set)
    }

    /// トークン`i`に対する端末制約を返します。
    #[inline]
    pub(crate) fn terminal_at(&self, i: usize) -> Option<CatId> {
        self.terminal.get(&i).copied()
    }

    /// スパンとカテゴリの組が制約に適合するかを判定します。
    ///
    /// スパンが制約スパンと一致する場合はカテゴリの適合を検査し、
    /// 交差する場合は括弧付け違反として拒否します。入れ子は許容されます。
    pub(crate) fn admits(&self, start: usize, length: usize, cat: CatId) -> bool {
        let end = start + length;
        for sc in &self.spans {
            let (cs, ce) = (sc.start, sc.start + sc.length);
            if end <= cs || ce <= start {
                continue;
            }
            if start == cs && end == ce {
                if let Some(allowed) = &sc.allowed {
                    if !allowed.contains(&cat) {
                        return false;
                    }
                }
                continue;
            }
            let nested = (start <= cs && ce <= end) || (cs <= start && end <= ce);
            if !nested {
                return false;
            }
        }
        true
    }
}

/// カテゴリ文字列を、登録済みカテゴリに限って解決します。
fn resolve(grammar: &Grammar, name: &str) -> Result<CatId> {
    match grammar.store().find(name)? {
        Some(cat) => Ok(cat),
        None => Err(ArpeggioError::grammar_inconsistency(
            "unknown category in constraint",
            format!("'{name}' is not part of the grammar"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, Language};

    fn toy_grammar() -> Grammar {
        GrammarBuilder::from_readers(
            Language::English,
            "NP\nN\nNP/N\nS[dcl]\\NP\n".as_bytes(),
            "N NP\n".as_bytes(),
            "".as_bytes(),
            "".as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_category_is_inconsistent() {
        let grammar = toy_grammar();
        let constraints = [Constraint::Terminal {
            category: "PP".to_string(),
            position: 0,
        }];
        let err = ConstraintSet::compile(&grammar, &constraints, 3).unwrap_err();
        assert!(matches!(err, ArpeggioError::GrammarInconsistency(_)));
    }

    #[test]
    fn test_bracketing_violation() {
        let grammar = toy_grammar();
        let constraints = [Constraint::Span {
            category: None,
            start: 1,
            length: 2,
        }];
        let set = ConstraintSet::compile(&grammar, &constraints, 4).unwrap();
        let np = grammar.parse_category("NP").unwrap();
        // Crossing the constraint boundary is rejected.
        assert!(!set.admits(0, 2, np));
        assert!(!set.admits(2, 2, np));
        // Nested and disjoint spans are admitted.
        assert!(set.admits(1, 1, np));
        assert!(set.admits(1, 2, np));
        assert!(set.admits(0, 4, np));
        assert!(set.admits(3, 1, np));
    }

    #[test]
    fn test_span_category_with_unary_preimage() {
        let grammar = toy_grammar();
        let constraints = [Constraint::Span {
            category: Some("NP".to_string()),
            start: 0,
            length: 2,
        }];
        let set = ConstraintSet::compile(&grammar, &constraints, 2).unwrap();
        let np = grammar.parse_category("NP").unwrap();
        let n = grammar.parse_category("N").unwrap();
        let vp = grammar.parse_category("S[dcl]\\NP").unwrap();
        assert!(set.admits(0, 2, np));
        // N reaches NP through one unary step, so it stays admissible.
        assert!(set.admits(0, 2, n));
        assert!(!set.admits(0, 2, vp));
    }

    #[test]
    fn test_conflicting_terminals() {
        let grammar = toy_grammar();
        let constraints = [
            Constraint::Terminal {
                category: "NP".to_string(),
                position: 0,
            },
            Constraint::Terminal {
                category: "N".to_string(),
                position: 0,
            },
        ];
        assert!(ConstraintSet::compile(&grammar, &constraints, 2).is_err());
    }
}
