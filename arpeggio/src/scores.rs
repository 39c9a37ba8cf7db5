//! スコア行列と外側推定値
//!
//! このモジュールは、外部のスーパータガーと依存構造スコアラーが出力した
//! 2つの対数確率行列への読み取り専用ファサードと、A*探索の許容的
//! ヒューリスティックのための前計算テーブルを提供します。

use crate::common::ROOT_COLUMN;
use crate::errors::{ArpeggioError, Result};
use crate::grammar::category::CatId;

/// 行優先の密な実数行列
///
/// 値は対数確率(非正)です。スーパータグ行列は`(文長, タグ数)`、
/// 依存行列は`(文長, 文長+1)`の形状を持ち、依存行列の第0列は
/// 主辞がROOTであることを表します。
#[derive(Debug, Default, Clone)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl ScoreMatrix {
    /// フラットなベクトルから行列を生成します。
    ///
    /// # 引数
    ///
    /// * `rows` - 行数
    /// * `cols` - 列数
    /// * `data` - 行優先で並んだ`rows * cols`個の値
    ///
    /// # エラー
    ///
    /// `data`の長さが`rows * cols`と一致しない場合、[`ArpeggioError`]を返します。
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ArpeggioError::invalid_argument(
                "data",
                format!(
                    "expected {} values for a {rows}x{cols} matrix, but got {}",
                    rows * cols,
                    data.len()
                ),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// すべての値が0の行列を生成します。
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// 行数を返します。
    #[inline(always)]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// 列数を返します。
    #[inline(always)]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// `(i, j)`要素を取得します。
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[i * self.cols + j]
    }

    /// `i`行目のスライスを返します。
    #[inline(always)]
    pub(crate) fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

/// 1文分のスコア行列への読み取り専用ビュー
///
/// 形状は構築時に一度だけ検証され、以後のアクセスは定数時間です。
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScoreView<'a> {
    tags: &'a ScoreMatrix,
    deps: &'a ScoreMatrix,
}

impl<'a> ScoreView<'a> {
    /// スコア行列の形状を検証してビューを生成します。
    ///
    /// # 引数
    ///
    /// * `tags` - スーパータグ対数確率行列 `(sent_len, num_tags)`
    /// * `deps` - 依存対数確率行列 `(sent_len, sent_len + 1)`
    /// * `sent_len` - 文のトークン数
    /// * `num_tags` - スーパータグ目録のサイズ
    ///
    /// # エラー
    ///
    /// いずれかの行列の形状が一致しない場合、[`ArpeggioError::ShapeMismatch`]を
    /// 返します。
    pub(crate) fn new(
        tags: &'a ScoreMatrix,
        deps: &'a ScoreMatrix,
        sent_len: usize,
        num_tags: usize,
    ) -> Result<Self> {
        if tags.rows() != sent_len || tags.cols() != num_tags {
            return Err(ArpeggioError::shape_mismatch(
                "tag_scores",
                (sent_len, num_tags),
                (tags.rows(), tags.cols()),
            ));
        }
        if deps.rows() != sent_len || deps.cols() != sent_len + 1 {
            return Err(ArpeggioError::shape_mismatch(
                "dep_scores",
                (sent_len, sent_len + 1),
                (deps.rows(), deps.cols()),
            ));
        }
        Ok(Self { tags, deps })
    }

    /// トークン`i`がタグ列`c`を取る対数確率を返します。
    #[inline(always)]
    pub(crate) fn tag_lp(&self, i: usize, c: usize) -> f32 {
        self.tags.get(i, c)
    }

    /// トークン`i`のタグ行スライスを返します。
    #[inline(always)]
    pub(crate) fn tag_row(&self, i: usize) -> &'a [f32] {
        self.tags.row(i)
    }

    /// トークン`dependent`の主辞がトークン`head`である対数確率を返します。
    #[inline(always)]
    pub(crate) fn dep_lp(&self, dependent: usize, head: usize) -> f32 {
        self.deps.get(dependent, head + 1)
    }

    /// トークン`dependent`の主辞がROOTである対数確率を返します。
    #[inline(always)]
    pub(crate) fn root_lp(&self, dependent: usize) -> f32 {
        self.deps.get(dependent, ROOT_COLUMN)
    }

    /// トークン`i`の依存行の最大値を返します。
    pub(crate) fn best_dep(&self, i: usize) -> f32 {
        self.deps
            .row(i)
            .iter()
            .fold(f32::NEG_INFINITY, |acc, &v| acc.max(v))
    }
}

/// 外側推定値の前計算テーブル
///
/// 各トークンの最良タグスコアと最良依存スコアの和の累積和を保持し、
/// 任意のスパンの外側推定値を定数時間で返します。推定値は真の補完
/// スコアを下回らないため、A*の許容的ヒューリスティックになります。
#[derive(Debug, Default)]
pub(crate) struct HeuristicTable {
    prefix: Vec<f32>,
}

impl HeuristicTable {
    /// 新しい空のテーブルを生成します。
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 枝刈り後の候補リストからテーブルを再計算します。
    ///
    /// `best_tag[i]`は候補リスト上の最大語彙スコアです。強制された
    /// 端末制約の0点候補もここに反映されるため、推定値は探索が実際に
    /// 到達できる空間に対して許容的です。
    ///
    /// # 引数
    ///
    /// * `candidates` - トークンごとの`(カテゴリ, 語彙スコア)`候補リスト
    /// * `view` - スコア行列ビュー
    pub(crate) fn compute(&mut self, candidates: &[Vec<(CatId, f32)>], view: &ScoreView) {
        self.prefix.clear();
        self.prefix.reserve(candidates.len() + 1);
        self.prefix.push(0.0);
        for (i, cands) in candidates.iter().enumerate() {
            debug_assert!(!cands.is_empty());
            let best_tag = cands
                .iter()
                .fold(f32::NEG_INFINITY, |acc, &(_, lp)| acc.max(lp));
            let sum = self.prefix[i] + best_tag + view.best_dep(i);
            self.prefix.push(sum);
        }
    }

    /// スパン`[start, end)`の外側推定値を返します。
    ///
    /// スパン外のすべてのトークンについて、最良タグスコアと最良依存
    /// スコアの和を合計した値です。
    #[inline(always)]
    pub(crate) fn outside(&self, start: usize, end: usize) -> f32 {
        let total = *self.prefix.last().unwrap();
        total - (self.prefix[end] - self.prefix[start])
    }
}
