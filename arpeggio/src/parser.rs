//! A*アルゴリズムに基づくCCGパーサー
//!
//! このモジュールは、スーパータグ分布と依存分布から最良優先探索で
//! 導出木を列挙するメインパーサーを提供します。
//!
//! # 主要な構造体
//!
//! - [`Parser`]: 文法と設定を保持するメインパーサー構造体
//! - [`Worker`]: パーサーのワーカー。実際の探索処理を行う
//!
//! # 例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use arpeggio::{GrammarBuilder, Language, Parser, ScoreMatrix};
//!
//! let grammar = GrammarBuilder::from_readers(
//!     Language::English,
//!     "NP\nS[dcl]\\NP\n".as_bytes(),
//!     "".as_bytes(),
//!     "".as_bytes(),
//!     "".as_bytes(),
//! )?;
//! let parser = Parser::new(grammar);
//! let mut worker = parser.new_worker();
//!
//! let tags = ScoreMatrix::from_vec(2, 2, vec![0.0, -10.0, -10.0, 0.0])?;
//! let deps = ScoreMatrix::from_vec(2, 3, vec![-5.0, -5.0, 0.0, 0.0, -5.0, -5.0])?;
//! worker.reset_sentence(&["John", "runs"], tags, deps)?;
//! worker.parse();
//!
//! assert_eq!(worker.num_parses(), 1);
//! let parse = worker.derivation(0).unwrap();
//! assert_eq!(parse.category(), "S[dcl]");
//! assert!((parse.score() - 0.0).abs() < 1e-6);
//! # Ok(())
//! # }
//! ```
pub(crate) mod agenda;
pub(crate) mod chart;
pub mod constraints;
pub(crate) mod derivation;
pub(crate) mod pruner;
pub mod worker;

use std::rc::Rc;
use std::sync::Arc;

use crate::common::{
    DEFAULT_BETA, DEFAULT_MAX_LENGTH, DEFAULT_MAX_STEPS, DEFAULT_NBEST, DEFAULT_PRUNING_SIZE,
};
use crate::errors::Result;
use crate::grammar::category::CatId;
use crate::grammar::Grammar;
use crate::parser::derivation::DerivNode;
use crate::parser::worker::Worker;
use crate::scores::{ScoreMatrix, ScoreView};

/// 探索が正常終了しなかった場合の診断コード
///
/// これらはエラーではありません。いずれの場合も文はそれまでに
/// 収集された解析結果(0個のこともあります)を返します。
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Diagnostic {
    /// 完全な解析が1つも見つかる前にアジェンダが空になりました。
    SearchExhausted,
    /// アジェンダ取り出し回数が上限に達しました。
    StepLimitExceeded,
    /// 文が最大長を超えているため、探索は実行されませんでした。
    LengthExceeded,
}

impl Diagnostic {
    /// 診断コードの文字列表現を返します。
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SearchExhausted => "search_exhausted",
            Self::StepLimitExceeded => "step_limit_exceeded",
            Self::LengthExceeded => "length_exceeded",
        }
    }
}

/// A*探索を行うCCGパーサー
///
/// `Parser`は文法と探索設定を保持し、複数の[`Worker`]インスタンスを
/// 生成して並列処理を行うことができます。文法は`Arc`で共有され、
/// ワーカー間でコピーされません。
///
/// # 例
///
/// ```no_run
/// use std::fs::File;
/// use arpeggio::{Grammar, Parser};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let grammar = Grammar::read(File::open("grammar.bin")?)?;
/// let parser = Parser::new(grammar).nbest(5).use_seen_rules(true);
/// let mut worker = parser.new_worker();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Parser {
    grammar: Arc<Grammar>,
    pub(crate) beta: f32,
    pub(crate) use_beta: bool,
    pub(crate) pruning_size: usize,
    pub(crate) nbest: usize,
    pub(crate) use_category_dict: bool,
    pub(crate) use_seen_rules: bool,
    pub(crate) max_length: usize,
    pub(crate) max_steps: usize,
    roots: Option<Vec<CatId>>,
}

impl Parser {
    /// 新しいパーサーを作成します。
    ///
    /// 文法はパーサーに所有権が移動します。複数のパーサー間で文法を
    /// 共有する必要がある場合は、[`Parser::from_shared_grammar`]を
    /// 使用してください。
    ///
    /// # 引数
    ///
    /// * `grammar` - 解析に使用する文法
    pub fn new(grammar: Grammar) -> Self {
        Self::from_shared_grammar(Arc::new(grammar))
    }

    /// 共有された文法から新しいパーサーを作成します。
    ///
    /// これは、複数のパーサーインスタンスが文法資源を再読み込みする
    /// ことなく同じ文法を共有する必要がある場合に便利です。
    ///
    /// # 引数
    ///
    /// * `grammar` - 共有される文法への`Arc`参照
    pub fn from_shared_grammar(grammar: Arc<Grammar>) -> Self {
        Self {
            grammar,
            beta: DEFAULT_BETA,
            use_beta: true,
            pruning_size: DEFAULT_PRUNING_SIZE,
            nbest: DEFAULT_NBEST,
            use_category_dict: false,
            use_seen_rules: false,
            max_length: DEFAULT_MAX_LENGTH,
            max_steps: DEFAULT_MAX_STEPS,
            roots: None,
        }
    }

    /// ベータ枝刈りの閾値比率を設定します。
    ///
    /// トークンごとに、行最大値との対数差が`ln(beta)`以上の候補だけが
    /// 保持されます。
    pub const fn beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    /// ベータ枝刈りを有効または無効にします。
    pub const fn use_beta(mut self, yes: bool) -> Self {
        self.use_beta = yes;
        self
    }

    /// トークンごとおよびチャートセルごとの候補数上限を設定します。
    pub const fn pruning_size(mut self, size: usize) -> Self {
        self.pruning_size = if size == 0 { 1 } else { size };
        self
    }

    /// 1文あたりに返す解析結果数を設定します。
    pub const fn nbest(mut self, n: usize) -> Self {
        self.nbest = if n == 0 { 1 } else { n };
        self
    }

    /// カテゴリ辞書による候補制限を有効または無効にします。
    pub const fn use_category_dict(mut self, yes: bool) -> Self {
        self.use_category_dict = yes;
        self
    }

    /// シード規則フィルタを有効または無効にします。
    ///
    /// 有効な場合、シード規則表にないカテゴリ対の結合は拒否されます。
    /// このフィルタは解析結果を減らすことはあっても増やすことはありません。
    pub const fn use_seen_rules(mut self, yes: bool) -> Self {
        self.use_seen_rules = yes;
        self
    }

    /// 解析対象とする文の最大トークン数を設定します。
    ///
    /// これを超える文はスキップされ、空の結果と
    /// [`Diagnostic::LengthExceeded`]を返します。
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// 1文あたりのアジェンダ取り出し回数の上限を設定します。
    pub const fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// 許容ルートカテゴリを上書きします。
    ///
    /// 設定しない場合は文法の既定値が使用されます。
    ///
    /// # 引数
    ///
    /// * `cats` - CCGbank表記のカテゴリ文字列の一覧
    ///
    /// # エラー
    ///
    /// カテゴリが解析できない場合に[`ArpeggioError`](crate::ArpeggioError)を
    /// 返します。
    pub fn possible_root_cats(mut self, cats: &[&str]) -> Result<Self> {
        let mut roots = Vec::with_capacity(cats.len());
        for cat in cats {
            roots.push(self.grammar.parse_category(cat)?);
        }
        self.roots = Some(roots);
        Ok(self)
    }

    /// 文法への参照を取得します。
    #[inline(always)]
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// 新しいワーカーを作成します。
    ///
    /// ワーカーは実際の解析処理を実行するために使用されます。
    /// 各ワーカーは独立したチャートとアジェンダを保持するため、
    /// 複数のワーカーで同時に複数の文を解析できます。
    pub fn new_worker(&self) -> Worker {
        Worker::new(self.clone())
    }

    /// A*探索の本体。
    ///
    /// 語彙候補でアジェンダをシードし、最良の部分導出を取り出しては
    /// チャートに確定し、単項規則の適用と隣接導出との結合で新しい
    /// 候補を生成します。完全な解析が`nbest`個集まるか、アジェンダが
    /// 空になるか、取り出し回数が上限に達した時点で終了します。
    pub(crate) fn search(&self, w: &mut Worker, tags: &ScoreMatrix, deps: &ScoreMatrix) {
        let n = w.tokens.len();
        if n == 0 {
            return;
        }
        if n > self.max_length {
            log::warn!(
                "skipped a sentence of {n} tokens (max_length = {})",
                self.max_length
            );
            w.diagnostic = Some(Diagnostic::LengthExceeded);
            return;
        }
        // Shapes were validated in reset_sentence().
        let Ok(view) = ScoreView::new(tags, deps, n, self.grammar.num_tags()) else {
            return;
        };

        let roots: &[CatId] = match &self.roots {
            Some(roots) => roots,
            None => self.grammar.root_cats(),
        };

        pruner::assign_candidates(self, &w.tokens, &view, &w.constraints, &mut w.candidates);
        w.heuristic.compute(&w.candidates, &view);
        w.chart.reset(n, self.pruning_size, self.nbest);
        w.agenda.clear();

        for i in 0..n {
            for &(cat, lp) in &w.candidates[i] {
                if !w.constraints.admits(i, 1, cat) {
                    continue;
                }
                let mut inside = lp;
                if n == 1 {
                    inside += view.root_lp(i);
                }
                let node = DerivNode::leaf(i, cat, lp, inside);
                if w.chart.insert(&node) {
                    let priority = inside + w.heuristic.outside(i, i + 1);
                    w.agenda.push(node, priority);
                }
            }
        }

        let mut steps = 0usize;
        while w.parses.len() < self.nbest {
            let Some(item) = w.agenda.pop() else {
                break;
            };
            steps += 1;
            if steps > self.max_steps {
                log::warn!("step limit of {} pops reached", self.max_steps);
                w.diagnostic = Some(Diagnostic::StepLimitExceeded);
                break;
            }

            let node = item.node;
            if !w.chart.finalize(&node) {
                // The signature was already locked by an earlier pop.
                continue;
            }

            if node.start == 0 && node.length == n && roots.contains(&node.cat) {
                if w.emitted.insert(node.fingerprint()) {
                    w.parses.push(Rc::clone(&node));
                    if w.parses.len() >= self.nbest {
                        break;
                    }
                }
            }

            // Unary rules never chain on the same span.
            if !node.is_unary() {
                for &parent in self.grammar.unary_parents(node.cat) {
                    if node.length == n && !roots.contains(&parent) {
                        continue;
                    }
                    if !w.constraints.admits(node.start, node.length, parent) {
                        continue;
                    }
                    let unary = DerivNode::unary(parent, Rc::clone(&node));
                    if w.chart.insert(&unary) {
                        let priority =
                            unary.inside + w.heuristic.outside(unary.start, unary.end());
                        w.agenda.push(unary, priority);
                    }
                }
            }

            w.scratch.clear();
            w.scratch
                .extend(w.chart.left_neighbors(node.start).iter().cloned());
            let left_count = w.scratch.len();
            w.scratch
                .extend(w.chart.right_neighbors(node.end()).iter().cloned());
            for k in 0..w.scratch.len() {
                let other = Rc::clone(&w.scratch[k]);
                if k < left_count {
                    self.combine(w, &view, n, &other, &node);
                } else {
                    self.combine(w, &view, n, &node, &other);
                }
            }
        }

        if w.parses.is_empty() && w.diagnostic.is_none() {
            w.diagnostic = Some(Diagnostic::SearchExhausted);
        }
    }

    /// 隣接する2つの確定済み導出を結合し、候補をアジェンダに積みます。
    fn combine(
        &self,
        w: &mut Worker,
        view: &ScoreView,
        n: usize,
        left: &Rc<DerivNode>,
        right: &Rc<DerivNode>,
    ) {
        debug_assert_eq!(left.end(), right.start);
        if self.use_seen_rules && !self.grammar.is_seen(left.cat, right.cat) {
            return;
        }
        let outcomes = self.grammar.apply_binary_rules(left.cat, right.cat);
        if outcomes.is_empty() {
            return;
        }

        let start = left.start;
        let length = left.length + right.length;
        for outcome in outcomes.iter() {
            if !w.constraints.admits(start, length, outcome.parent) {
                continue;
            }
            let (head, dependent) = if outcome.head_is_left {
                (left, right)
            } else {
                (right, left)
            };
            let mut inside = left.inside + right.inside + view.dep_lp(dependent.head, head.head);
            if length == n {
                // The span now covers the whole sentence; fold in the arc
                // from its head to ROOT so that agenda order matches the
                // final scores.
                inside += view.root_lp(head.head);
            }
            let node = DerivNode::binary(
                outcome.parent,
                outcome.combinator,
                outcome.head_is_left,
                Rc::clone(left),
                Rc::clone(right),
                inside,
            );
            if w.chart.insert(&node) {
                let priority = inside + w.heuristic.outside(start, start + length);
                w.agenda.push(node, priority);
            }
        }
    }
}
