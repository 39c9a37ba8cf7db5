//! 導出木のノード
//!
//! このモジュールは、A*探索が構築する部分導出を表現する永続的な
//! ノード型を提供します。同じ部分木が複数の親に共有されるため、
//! ノードは文内で`Rc`によって参照カウントされ、ワーカーのリセット時に
//! まとめて解放されます。

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::grammar::category::CatId;
use crate::grammar::combinator::Combinator;

/// 導出ノードの種別
#[derive(Debug)]
pub(crate) enum DerivKind {
    /// 語彙項目。トークン位置と語彙対数確率を保持します。
    Leaf {
        /// トークン位置
        position: usize,
        /// 語彙対数確率
        lex_lp: f32,
    },
    /// 単項規則の適用。スパンと主辞は子と同一です。
    Unary {
        /// 子ノード
        child: Rc<DerivNode>,
    },
    /// 二項結合子の適用。
    Binary {
        /// 左側の子ノード
        left: Rc<DerivNode>,
        /// 右側の子ノード
        right: Rc<DerivNode>,
        /// 適用された結合子
        combinator: Combinator,
        /// 主辞が左側の子かどうか
        head_is_left: bool,
    },
}

/// 導出木のノード
///
/// スパン、主辞トークン位置、内側スコアは構築時に計算されて
/// キャッシュされます。内側スコアは、部分木内のすべての葉の語彙
/// 対数確率と、すべての内部ノードの依存対数確率の和です。スパンが
/// 文全体に達した時点で、主辞からROOTへの依存対数確率も畳み込まれます。
#[derive(Debug)]
pub(crate) struct DerivNode {
    /// 親カテゴリ
    pub(crate) cat: CatId,
    /// スパンの開始位置
    pub(crate) start: usize,
    /// スパンの長さ
    pub(crate) length: usize,
    /// 主辞トークンの位置
    pub(crate) head: usize,
    /// 内側スコア
    pub(crate) inside: f32,
    /// ノードの種別
    pub(crate) kind: DerivKind,
}

impl DerivNode {
    /// 語彙項目ノードを生成します。
    ///
    /// # 引数
    ///
    /// * `position` - トークン位置
    /// * `cat` - 割り当てられたカテゴリ
    /// * `lex_lp` - 語彙対数確率
    /// * `inside` - 内側スコア(1トークン文ではROOT弧を含みます)
    pub(crate) fn leaf(position: usize, cat: CatId, lex_lp: f32, inside: f32) -> Rc<Self> {
        Rc::new(Self {
            cat,
            start: position,
            length: 1,
            head: position,
            inside,
            kind: DerivKind::Leaf { position, lex_lp },
        })
    }

    /// 単項規則ノードを生成します。スコアは変化しません。
    pub(crate) fn unary(cat: CatId, child: Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            cat,
            start: child.start,
            length: child.length,
            head: child.head,
            inside: child.inside,
            kind: DerivKind::Unary { child },
        })
    }

    /// 二項結合ノードを生成します。
    ///
    /// # 引数
    ///
    /// * `cat` - 親カテゴリ
    /// * `combinator` - 適用された結合子
    /// * `head_is_left` - 主辞が左側の子かどうか
    /// * `left` - 左側の子(スパンは右側の子と隣接していること)
    /// * `right` - 右側の子
    /// * `inside` - 依存スコアを加算済みの内側スコア
    pub(crate) fn binary(
        cat: CatId,
        combinator: Combinator,
        head_is_left: bool,
        left: Rc<Self>,
        right: Rc<Self>,
        inside: f32,
    ) -> Rc<Self> {
        debug_assert_eq!(left.start + left.length, right.start);
        let head = if head_is_left { left.head } else { right.head };
        Rc::new(Self {
            cat,
            start: left.start,
            length: left.length + right.length,
            head,
            inside,
            kind: DerivKind::Binary {
                left,
                right,
                combinator,
                head_is_left,
            },
        })
    }

    /// スパンの終了位置(排他的)を返します。
    #[inline(always)]
    pub(crate) fn end(&self) -> usize {
        self.start + self.length
    }

    /// 単項規則ノードかどうかを返します。
    #[inline(always)]
    pub(crate) fn is_unary(&self) -> bool {
        matches!(self.kind, DerivKind::Unary { .. })
    }

    /// 木構造の指紋を計算します。
    ///
    /// 構造的に同一の木は同じ値を持ちます。出力時の重複抑制に
    /// 使用されます。
    pub(crate) fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash_into(&mut hasher);
        hasher.finish()
    }

    fn hash_into<H>(&self, hasher: &mut H)
    where
        H: Hasher,
    {
        self.cat.hash(hasher);
        match &self.kind {
            DerivKind::Leaf { position, .. } => {
                0u8.hash(hasher);
                position.hash(hasher);
            }
            DerivKind::Unary { child } => {
                1u8.hash(hasher);
                child.hash_into(hasher);
            }
            DerivKind::Binary {
                left,
                right,
                combinator,
                ..
            } => {
                2u8.hash(hasher);
                combinator.hash(hasher);
                left.hash_into(hasher);
                right.hash_into(hasher);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_and_head_propagation() {
        let np = CatId(0);
        let vp = CatId(1);
        let s = CatId(2);
        let left = DerivNode::leaf(0, np, -0.5, -0.5);
        let right = DerivNode::leaf(1, vp, -0.25, -0.25);
        let node = DerivNode::binary(
            s,
            Combinator::BackwardApplication,
            false,
            left,
            right,
            -0.75,
        );
        assert_eq!(node.start, 0);
        assert_eq!(node.length, 2);
        assert_eq!(node.end(), 2);
        assert_eq!(node.head, 1);

        let parent = DerivNode::unary(np, Rc::clone(&node));
        assert_eq!(parent.length, node.length);
        assert_eq!(parent.head, node.head);
        assert!(parent.is_unary());
    }

    #[test]
    fn test_fingerprint_distinguishes_structure() {
        let a = CatId(0);
        let b = CatId(1);
        let leaf0 = DerivNode::leaf(0, a, 0.0, 0.0);
        let leaf1 = DerivNode::leaf(1, a, 0.0, 0.0);
        let left_first = DerivNode::binary(
            b,
            Combinator::ForwardApplication,
            true,
            Rc::clone(&leaf0),
            Rc::clone(&leaf1),
            0.0,
        );
        let same = DerivNode::binary(
            b,
            Combinator::ForwardApplication,
            true,
            leaf0,
            leaf1,
            0.0,
        );
        let unary = DerivNode::unary(b, DerivNode::leaf(0, a, 0.0, 0.0));
        assert_eq!(left_first.fingerprint(), same.fingerprint());
        assert_ne!(left_first.fingerprint(), unary.fingerprint());
    }
}
