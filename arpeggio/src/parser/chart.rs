//! A*解析のチャート
//!
//! このモジュールは、アジェンダから取り出された導出を記録するチャートを
//! 提供します。セルは`(開始位置, 長さ, カテゴリ)`をキーとし、一度確定した
//! シグネチャの再取り出しは破棄されます(first pop wins)。確定済みの導出は
//! 開始位置・終了位置ごとの一覧でも索引され、隣接スパンの探索を
//! 定数時間で開始できます。

use std::rc::Rc;

use crate::grammar::category::CatId;
use crate::parser::derivation::DerivNode;

/// チャートセル
///
/// 同一シグネチャの導出について、記録済みの内側スコアと
/// 確定済みの個数を保持します。
#[derive(Debug, Default)]
struct Cell {
    /// 記録された導出の内側スコア
    scores: Vec<f32>,
    /// 確定済みの導出数
    finalized: usize,
}

/// 受理済み導出の索引付きストア
#[derive(Debug, Default)]
pub(crate) struct Chart {
    cells: hashbrown::HashMap<(usize, usize, CatId), Cell>,
    /// 確定済み導出の開始位置ごとの一覧
    starts: Vec<Vec<Rc<DerivNode>>>,
    /// 確定済み導出の終了位置ごとの一覧
    ends: Vec<Vec<Rc<DerivNode>>>,
    /// セルあたりの記録数上限
    capacity: usize,
    /// シグネチャあたりの確定数上限
    lock_after: usize,
}

impl Chart {
    /// 新しい空のチャートを生成します。
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// チャートをリセットし、新しい文の処理を準備します。
    ///
    /// # 引数
    ///
    /// * `sent_len` - 文のトークン数
    /// * `capacity` - セルあたりの記録数上限
    /// * `lock_after` - シグネチャあたりの確定数上限
    pub(crate) fn reset(&mut self, sent_len: usize, capacity: usize, lock_after: usize) {
        self.cells.clear();
        Self::reset_vec(&mut self.starts, sent_len + 1);
        Self::reset_vec(&mut self.ends, sent_len + 1);
        self.capacity = capacity;
        self.lock_after = lock_after;
    }

    fn reset_vec<T>(data: &mut Vec<Vec<T>>, new_len: usize) {
        for v in data.iter_mut() {
            v.clear();
        }
        let cur_len = data.len();
        if cur_len < new_len {
            data.reserve(new_len - cur_len);
            for _ in cur_len..new_len {
                data.push(Vec::with_capacity(16));
            }
        }
    }

    /// 導出をセルに記録します。
    ///
    /// セルに既に上限個数の、より良い内側スコアを持つ記録がある場合は
    /// 拒否されます。
    ///
    /// # 戻り値
    ///
    /// 記録された場合は`true`、拒否された場合は`false`
    pub(crate) fn insert(&mut self, node: &DerivNode) -> bool {
        let cell = self
            .cells
            .entry((node.start, node.length, node.cat))
            .or_default();
        let better = cell
            .scores
            .iter()
            .filter(|&&score| score > node.inside)
            .count();
        if better >= self.capacity {
            return false;
        }
        cell.scores.push(node.inside);
        true
    }

    /// 取り出された導出を確定します。
    ///
    /// シグネチャが既に上限回数確定されている場合は`false`を返し、
    /// 呼び出し側は導出を破棄します。確定された導出は隣接一覧に
    /// 登録されます。
    pub(crate) fn finalize(&mut self, node: &Rc<DerivNode>) -> bool {
        let cell = self
            .cells
            .entry((node.start, node.length, node.cat))
            .or_default();
        if cell.finalized >= self.lock_after {
            return false;
        }
        cell.finalized += 1;
        self.starts[node.start].push(Rc::clone(node));
        self.ends[node.end()].push(Rc::clone(node));
        true
    }

    /// 指定位置で終わる確定済み導出(左側の隣接候補)を返します。
    #[inline(always)]
    pub(crate) fn left_neighbors(&self, start: usize) -> &[Rc<DerivNode>] {
        &self.ends[start]
    }

    /// 指定位置から始まる確定済み導出(右側の隣接候補)を返します。
    #[inline(always)]
    pub(crate) fn right_neighbors(&self, end: usize) -> &[Rc<DerivNode>] {
        &self.starts[end]
    }
}
