//! 解析結果のビュー
//!
//! このモジュールは、ワーカーが保持する導出木への軽量なビューを
//! 提供します。ビューからはルートカテゴリ、総スコア、葉の情報、
//! CCGbank AUTO形式の文字列表現にアクセスできます。

use std::fmt::Write as _;
use std::ops::Range;
use std::rc::Rc;

use crate::common::ROOT_COLUMN;
use crate::parser::derivation::{DerivKind, DerivNode};
use crate::parser::worker::Worker;

/// 1つの解析結果
///
/// このビューは[`Worker`]への軽量な参照であり、実際のデータは
/// ワーカーが保持しています。ビューはワーカーが生存している間のみ
/// 有効です。
pub struct Parse<'w> {
    worker: &'w Worker,
    index: usize,
}

impl<'w> Parse<'w> {
    #[inline(always)]
    pub(crate) const fn new(worker: &'w Worker, index: usize) -> Self {
        Self { worker, index }
    }

    #[inline(always)]
    fn node(&self) -> &Rc<DerivNode> {
        &self.worker.parses[self.index]
    }

    /// 解析の総スコア(対数確率)を返します。
    ///
    /// 葉の語彙対数確率、内部ノードの依存対数確率、ルート弧の
    /// 対数確率の和です。
    #[inline(always)]
    pub fn score(&self) -> f32 {
        self.node().inside
    }

    /// ルートカテゴリをCCGbank表記の文字列で返します。
    pub fn category(&self) -> String {
        self.worker.parser.grammar().category_repr(self.node().cat)
    }

    /// 解析が覆うトークン範囲を返します。
    #[inline(always)]
    pub fn span(&self) -> Range<usize> {
        let node = self.node();
        node.start..node.end()
    }

    /// ルートの主辞トークン位置を返します。
    #[inline(always)]
    pub fn head(&self) -> usize {
        self.node().head
    }

    /// 葉のカテゴリを位置順に返します。
    pub fn leaf_categories(&self) -> Vec<String> {
        let grammar = self.worker.parser.grammar();
        let mut leaves = Vec::new();
        collect_leaves(self.node(), &mut |node| {
            leaves.push(grammar.category_repr(node.cat));
        });
        leaves
    }

    /// CCGbank AUTO形式の文字列表現を返します。
    ///
    /// 葉は`(<L カテゴリ XX XX 表層形 カテゴリ>)`、内部ノードは
    /// `(<T カテゴリ 主辞側 子数> ...)`として出力されます。
    pub fn to_auto(&self) -> String {
        let mut out = String::new();
        self.write_auto(self.node(), &mut out);
        out
    }

    fn write_auto(&self, node: &DerivNode, out: &mut String) {
        let cat = self.worker.parser.grammar().category_repr(node.cat);
        match &node.kind {
            DerivKind::Leaf { position, .. } => {
                let word = &self.worker.tokens[*position];
                let _ = write!(out, "(<L {cat} XX XX {word} {cat}>)");
            }
            DerivKind::Unary { child } => {
                let _ = write!(out, "(<T {cat} 0 1> ");
                self.write_auto(child, out);
                out.push(')');
            }
            DerivKind::Binary {
                left,
                right,
                head_is_left,
                ..
            } => {
                let head = usize::from(!*head_is_left);
                let _ = write!(out, "(<T {cat} {head} 2> ");
                self.write_auto(left, out);
                out.push(' ');
                self.write_auto(right, out);
                out.push(')');
            }
        }
    }

    /// 導出を人間可読な表形式で整形します。
    ///
    /// 1行目に表層形、2行目に語彙カテゴリを並べ、以降は規則適用の
    /// 1段ごとに、適用スパンを覆う罫線と結合子の名前、導出された
    /// カテゴリを出力します。
    pub fn to_deriv(&self) -> String {
        let grammar = self.worker.parser.grammar();
        let root = self.node();
        let offset = root.start;

        let mut words: Vec<String> = Vec::new();
        let mut cats: Vec<String> = Vec::new();
        collect_leaves(root, &mut |leaf| {
            if let DerivKind::Leaf { position, .. } = leaf.kind {
                words.push(self.worker.tokens[position].clone());
            }
            cats.push(grammar.category_repr(leaf.cat));
        });

        // Character columns of each leaf cell.
        let n = words.len();
        let mut starts = vec![0usize; n];
        let mut ends = vec![0usize; n];
        let mut col = 0;
        for i in 0..n {
            let width = char_len(&words[i]).max(char_len(&cats[i]));
            starts[i] = col;
            ends[i] = col + width;
            col = ends[i] + 1;
        }

        let mut word_line = Vec::new();
        let mut cat_line = Vec::new();
        for i in 0..n {
            put_centered(&mut word_line, starts[i], ends[i], &words[i]);
            put_centered(&mut cat_line, starts[i], ends[i], &cats[i]);
        }

        let mut levels: Vec<Vec<DerivRow>> = Vec::new();
        collect_levels(root, offset, grammar, &mut levels);

        let mut lines = vec![word_line, cat_line];
        for level in &levels {
            let mut rule_line = Vec::new();
            let mut parent_line = Vec::new();
            for row in level {
                for c in starts[row.first]..ends[row.last] {
                    put(&mut rule_line, c, "-");
                }
            }
            for row in level {
                put(&mut rule_line, ends[row.last], row.name);
                put_centered(&mut parent_line, starts[row.first], ends[row.last], &row.cat);
            }
            lines.push(rule_line);
            lines.push(parent_line);
        }

        lines
            .into_iter()
            .map(|line| line.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// スコアを導出木から再計算します。
    ///
    /// 葉の語彙対数確率と内部ノードの依存対数確率を集計し、ルート弧を
    /// 加えた値を返します。[`score()`](Self::score)と浮動小数点誤差の
    /// 範囲で一致します。
    pub fn recompute_score(&self) -> f32 {
        let node = self.node();
        let root_arc = self.worker.dep_scores.get(node.head, ROOT_COLUMN);
        self.sum_subtree(node) + root_arc
    }

    fn sum_subtree(&self, node: &DerivNode) -> f32 {
        match &node.kind {
            DerivKind::Leaf { lex_lp, .. } => *lex_lp,
            DerivKind::Unary { child } => self.sum_subtree(child),
            DerivKind::Binary {
                left,
                right,
                head_is_left,
                ..
            } => {
                let (head, dependent) = if *head_is_left {
                    (left, right)
                } else {
                    (right, left)
                };
                let arc = self.worker.dep_scores.get(dependent.head, head.head + 1);
                self.sum_subtree(left) + self.sum_subtree(right) + arc
            }
        }
    }
}

fn collect_leaves<F>(node: &DerivNode, visit: &mut F)
where
    F: FnMut(&DerivNode),
{
    match &node.kind {
        DerivKind::Leaf { .. } => visit(node),
        DerivKind::Unary { child } => collect_leaves(child, visit),
        DerivKind::Binary { left, right, .. } => {
            collect_leaves(left, visit);
            collect_leaves(right, visit);
        }
    }
}

/// 表形式出力における規則適用の1行。セル番号は葉の通し番号です。
struct DerivRow {
    first: usize,
    last: usize,
    cat: String,
    name: &'static str,
}

/// 規則適用を葉からの深さごとに集めます。
///
/// 深さ`d`の適用は`levels[d - 1]`に入ります。同じ深さのスパンは
/// 互いに重なりません。
fn collect_levels(
    node: &DerivNode,
    offset: usize,
    grammar: &crate::Grammar,
    levels: &mut Vec<Vec<DerivRow>>,
) -> usize {
    let (depth, name) = match &node.kind {
        DerivKind::Leaf { .. } => return 0,
        DerivKind::Unary { child } => (collect_levels(child, offset, grammar, levels) + 1, "lex"),
        DerivKind::Binary {
            left,
            right,
            combinator,
            ..
        } => {
            let dl = collect_levels(left, offset, grammar, levels);
            let dr = collect_levels(right, offset, grammar, levels);
            (dl.max(dr) + 1, combinator.name())
        }
    };
    if levels.len() < depth {
        levels.resize_with(depth, Vec::new);
    }
    levels[depth - 1].push(DerivRow {
        first: node.start - offset,
        last: node.end() - 1 - offset,
        cat: grammar.category_repr(node.cat),
        name,
    });
    depth
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 位置`pos`から文字列を書き込みます。必要に応じて行を拡張します。
fn put(line: &mut Vec<char>, pos: usize, text: &str) {
    for (k, ch) in text.chars().enumerate() {
        let idx = pos + k;
        if line.len() <= idx {
            line.resize(idx + 1, ' ');
        }
        line[idx] = ch;
    }
}

/// `[start, end)`の中央に文字列を書き込みます。
fn put_centered(line: &mut Vec<char>, start: usize, end: usize, text: &str) {
    let width = end - start;
    let pos = start + width.saturating_sub(char_len(text)) / 2;
    put(line, pos, text);
}
