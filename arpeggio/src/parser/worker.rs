//! 解析処理のためのルーチンを提供するモジュール。
//!
//! このモジュールは、A*探索のための主要なワーカー構造体を提供します。
//! ワーカーはチャート、アジェンダ、候補リストなどの文ごとの内部データ
//! 構造を保持し、再利用することで不要なメモリアロケーションを避けます。
//! 導出木のノードは文内で`Rc`により共有され、次の文のリセット時に
//! まとめて解放されます。

use std::rc::Rc;

use crate::errors::Result;
use crate::grammar::category::CatId;
use crate::parser::agenda::Agenda;
use crate::parser::chart::Chart;
use crate::parser::constraints::{Constraint, ConstraintSet};
use crate::parser::derivation::DerivNode;
use crate::parser::{Diagnostic, Parser};
use crate::scores::{HeuristicTable, ScoreMatrix, ScoreView};
use crate::tree::Parse;

/// 解析処理のためのルーチンを提供する構造体。
///
/// 探索に使用される内部データ構造を保持し、それらを再利用することで
/// 不要なメモリ再割り当てを回避します。
///
/// # 例
///
/// ```ignore
/// let mut worker = parser.new_worker();
/// worker.reset_sentence(&tokens, tag_scores, dep_scores)?;
/// worker.parse();
/// for i in 0..worker.num_parses() {
///     println!("{}", worker.derivation(i).unwrap().to_auto());
/// }
/// ```
pub struct Worker {
    pub(crate) parser: Parser,
    pub(crate) tokens: Vec<String>,
    pub(crate) tag_scores: ScoreMatrix,
    pub(crate) dep_scores: ScoreMatrix,
    pub(crate) candidates: Vec<Vec<(CatId, f32)>>,
    pub(crate) heuristic: HeuristicTable,
    pub(crate) chart: Chart,
    pub(crate) agenda: Agenda,
    pub(crate) constraints: ConstraintSet,
    pub(crate) parses: Vec<Rc<DerivNode>>,
    pub(crate) emitted: hashbrown::HashSet<u64>,
    pub(crate) diagnostic: Option<Diagnostic>,
    pub(crate) scratch: Vec<Rc<DerivNode>>,
}

impl Worker {
    /// 新しいインスタンスを作成します。
    ///
    /// # 引数
    ///
    /// * `parser` - 使用するパーサー
    pub(crate) fn new(parser: Parser) -> Self {
        Self {
            parser,
            tokens: vec![],
            tag_scores: ScoreMatrix::default(),
            dep_scores: ScoreMatrix::default(),
            candidates: vec![],
            heuristic: HeuristicTable::new(),
            chart: Chart::new(),
            agenda: Agenda::new(),
            constraints: ConstraintSet::default(),
            parses: vec![],
            emitted: hashbrown::HashSet::new(),
            diagnostic: None,
            scratch: vec![],
        }
    }

    /// 解析する入力文をリセットします。
    ///
    /// 新しい文とスコア行列を設定し、以前の状態(解析結果、制約、
    /// 診断コード)をクリアします。
    ///
    /// # 引数
    ///
    /// * `tokens` - トークン化された表層形
    /// * `tag_scores` - スーパータグ対数確率行列 `(文長, タグ数)`
    /// * `dep_scores` - 依存対数確率行列 `(文長, 文長+1)`。第0列はROOT。
    ///
    /// # エラー
    ///
    /// 行列の形状が文の長さと一致しない場合、
    /// [`ArpeggioError::ShapeMismatch`](crate::ArpeggioError)を返します。
    /// その場合、ワーカーは空の文をセットした状態になります。
    pub fn reset_sentence<S>(
        &mut self,
        tokens: &[S],
        tag_scores: ScoreMatrix,
        dep_scores: ScoreMatrix,
    ) -> Result<()>
    where
        S: AsRef<str>,
    {
        self.tokens.clear();
        self.parses.clear();
        self.emitted.clear();
        self.constraints.clear();
        self.diagnostic = None;
        ScoreView::new(
            &tag_scores,
            &dep_scores,
            tokens.len(),
            self.parser.grammar().num_tags(),
        )?;
        self.tokens
            .extend(tokens.iter().map(|t| t.as_ref().to_string()));
        self.tag_scores = tag_scores;
        self.dep_scores = dep_scores;
        Ok(())
    }

    /// 部分解析制約を設定します。
    ///
    /// [`reset_sentence()`](Self::reset_sentence)の後、
    /// [`parse()`](Self::parse)の前に呼び出します。
    ///
    /// # 引数
    ///
    /// * `constraints` - 制約の一覧
    ///
    /// # エラー
    ///
    /// 制約が文法に登録されていないカテゴリを参照している場合、
    /// [`ArpeggioError::GrammarInconsistency`](crate::ArpeggioError)を
    /// 返します。
    pub fn set_constraints(&mut self, constraints: &[Constraint]) -> Result<()> {
        self.constraints.clear();
        self.constraints =
            ConstraintSet::compile(self.parser.grammar(), constraints, self.tokens.len())?;
        Ok(())
    }

    /// 設定された入力文を解析します。
    ///
    /// 最大`nbest`個の完全な導出がスコアの高い順に内部状態に保存され、
    /// [`derivation()`](Self::derivation)でアクセスできます。空の文が
    /// 設定されている場合は何も行いません。
    pub fn parse(&mut self) {
        self.parses.clear();
        self.emitted.clear();
        self.diagnostic = None;
        if self.tokens.is_empty() {
            return;
        }
        let tags = std::mem::take(&mut self.tag_scores);
        let deps = std::mem::take(&mut self.dep_scores);
        let parser = self.parser.clone();
        parser.search(self, &tags, &deps);
        self.tag_scores = tags;
        self.dep_scores = deps;
    }

    /// 見つかった解析結果の数を返します。
    #[inline(always)]
    pub fn num_parses(&self) -> usize {
        self.parses.len()
    }

    /// `i`番目の解析結果のビューを返します。
    ///
    /// 結果はスコアの高い順に並んでいます。
    ///
    /// # 引数
    ///
    /// * `i` - 解析結果のインデックス(0から始まる)
    ///
    /// # 戻り値
    ///
    /// 結果が存在する場合は`Some(ビュー)`、存在しない場合は`None`
    pub fn derivation(&self, i: usize) -> Option<Parse<'_>> {
        (i < self.parses.len()).then(|| Parse::new(self, i))
    }

    /// `i`番目の解析結果の総スコアを返します。
    ///
    /// # 引数
    ///
    /// * `i` - 解析結果のインデックス
    ///
    /// # 戻り値
    ///
    /// 結果が存在する場合は`Some(スコア)`、存在しない場合は`None`
    pub fn parse_score(&self, i: usize) -> Option<f32> {
        self.parses.get(i).map(|node| node.inside)
    }

    /// 直前の解析の診断コードを返します。
    ///
    /// # 戻り値
    ///
    /// 探索が正常終了しなかった場合は`Some(診断コード)`、
    /// それ以外は`None`
    #[inline(always)]
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.diagnostic
    }

    /// 設定されているトークン列を返します。
    #[inline(always)]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}
