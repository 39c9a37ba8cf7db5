//! 二項結合子の定義と適用
//!
//! このモジュールは、隣接する2つの部分木カテゴリから親カテゴリを
//! 導出する結合子を閉じた列挙型として定義します。文法変種(英語・日本語)は
//! 有効な結合子と主辞方向の組み合わせを規則表として選択します。

use bincode::{Decode, Encode};

use crate::errors::Result;
use crate::grammar::category::{CatId, CatStore, Slash};

/// 二項結合子
///
/// 各バリアントは1つの結合規則に対応し、[`apply`](Self::apply)で
/// ディスパッチされます。適用順は規則表の順序に従い、同じ親カテゴリを
/// 導出する後続の規則は重複として除去されます。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Encode, Decode)]
pub enum Combinator {
    /// 前方適用 `X/Y  Y → X`
    ForwardApplication,
    /// 後方適用 `Y  X\Y → X`
    BackwardApplication,
    /// 前方合成 `X/Y  Y/Z → X/Z`
    ForwardComposition,
    /// 後方合成 `Y\Z  X\Y → X\Z`
    BackwardComposition,
    /// 交差後方合成 `Y/Z  X\Y → X/Z`
    BackwardCrossedComposition,
    /// 一般化前方合成 `X/Y  (Y/Z)/W → (X/Z)/W`
    GeneralizedForwardComposition,
    /// 一般化交差後方合成 `(Y/Z)/W  X\Y → (X/Z)/W`
    GeneralizedBackwardCrossedComposition,
    /// 次数付き一般化後方合成 `Y|Z₁…|Zₙ  X\Y → X|Z₁…|Zₙ`
    GeneralizedBackwardComposition(u8),
    /// 等位接続 `conj  X → X\X`
    Conjunction,
    /// 等位接続の特殊形 `conj  NP\NP → NP\NP`
    Conjunction2,
    /// 句読点の吸収。`punct_left`が真なら左の句読点を、偽なら右の句読点を除去します。
    RemovePunctuation {
        /// 句読点が左側の子かどうか
        punct_left: bool,
    },
    /// カンマと動詞句から副詞句への書き換え `,  S[ng|pss]\NP → (S\NP)\(S\NP)`
    CommaVPToAdverb,
    /// 挿入的直接話法 `,  S[dcl]/S[dcl] → (S\NP)/(S\NP)`
    ParentheticalDirectSpeech,
    /// 文の連接 `S  S → S`
    Conjoin,
}

impl Combinator {
    /// 結合子の表示名を返します。
    pub fn name(&self) -> &'static str {
        match self {
            Self::ForwardApplication => ">",
            Self::BackwardApplication => "<",
            Self::ForwardComposition => ">B",
            Self::BackwardComposition => "<B",
            Self::BackwardCrossedComposition => "<Bx",
            Self::GeneralizedForwardComposition => ">B2",
            Self::GeneralizedBackwardCrossedComposition => "<Bx2",
            Self::GeneralizedBackwardComposition(2) => "<B2",
            Self::GeneralizedBackwardComposition(3) => "<B3",
            Self::GeneralizedBackwardComposition(4) => "<B4",
            Self::GeneralizedBackwardComposition(_) => "<Bn",
            Self::Conjunction | Self::Conjunction2 => "conj",
            Self::RemovePunctuation { punct_left: true } => "lp",
            Self::RemovePunctuation { punct_left: false } => "rp",
            Self::CommaVPToAdverb | Self::ParentheticalDirectSpeech => "lp",
            Self::Conjoin => "SSEQ",
        }
    }

    /// 結合子を隣接カテゴリ対に適用します。
    ///
    /// # 引数
    ///
    /// * `store` - カテゴリインターナー
    /// * `special` - 特殊規則が参照する定数カテゴリ
    /// * `left` - 左側の子カテゴリ
    /// * `right` - 右側の子カテゴリ
    ///
    /// # 戻り値
    ///
    /// 適用可能な場合は親カテゴリのID、不可能な場合は`None`
    pub(crate) fn apply(
        &self,
        store: &CatStore,
        special: &SpecialCats,
        left: CatId,
        right: CatId,
    ) -> Option<CatId> {
        match self {
            Self::ForwardApplication => {
                let (res, slash, arg) = store.functor_parts(left)?;
                if slash != Slash::Forward {
                    return None;
                }
                let mut bind = None;
                if !store.unify(arg, right, &mut bind) {
                    return None;
                }
                Some(store.substitute(res, &bind))
            }
            Self::BackwardApplication => {
                let (res, slash, arg) = store.functor_parts(right)?;
                if slash != Slash::Backward {
                    return None;
                }
                let mut bind = None;
                if !store.unify(arg, left, &mut bind) {
                    return None;
                }
                Some(store.substitute(res, &bind))
            }
            Self::ForwardComposition => {
                let (x, ls, y) = store.functor_parts(left)?;
                let (y2, rs, z) = store.functor_parts(right)?;
                if ls != Slash::Forward || rs != Slash::Forward {
                    return None;
                }
                let mut bind = None;
                if !store.unify(y, y2, &mut bind) {
                    return None;
                }
                let res = store.substitute(x, &bind);
                let arg = store.substitute(z, &bind);
                Some(store.make_functor(res, Slash::Forward, arg))
            }
            Self::BackwardComposition => {
                compose_backward(store, left, right, Slash::Backward)
            }
            Self::BackwardCrossedComposition => {
                compose_backward(store, left, right, Slash::Forward)
            }
            Self::GeneralizedForwardComposition => {
                let (x, ls, y) = store.functor_parts(left)?;
                if ls != Slash::Forward {
                    return None;
                }
                let (inner, s2, w) = store.functor_parts(right)?;
                let (y2, s1, z) = store.functor_parts(inner)?;
                if s1 != Slash::Forward || s2 != Slash::Forward {
                    return None;
                }
                let mut bind = None;
                if !store.unify(y, y2, &mut bind) {
                    return None;
                }
                let res = store.make_functor(
                    store.substitute(x, &bind),
                    Slash::Forward,
                    store.substitute(z, &bind),
                );
                Some(store.make_functor(res, Slash::Forward, store.substitute(w, &bind)))
            }
            Self::GeneralizedBackwardCrossedComposition => {
                let (inner, s2, w) = store.functor_parts(left)?;
                let (y, s1, z) = store.functor_parts(inner)?;
                if s1 != Slash::Forward || s2 != Slash::Forward {
                    return None;
                }
                let (x, rs, y2) = store.functor_parts(right)?;
                if rs != Slash::Backward {
                    return None;
                }
                let mut bind = None;
                if !store.unify(y2, y, &mut bind) {
                    return None;
                }
                let res = store.make_functor(
                    store.substitute(x, &bind),
                    Slash::Forward,
                    store.substitute(z, &bind),
                );
                Some(store.make_functor(res, Slash::Forward, store.substitute(w, &bind)))
            }
            Self::GeneralizedBackwardComposition(degree) => {
                let (x, rs, y2) = store.functor_parts(right)?;
                if rs != Slash::Backward {
                    return None;
                }
                // Peel `degree` arguments off the left category, outermost first.
                let mut tail = Vec::with_capacity(usize::from(*degree));
                let mut remainder = left;
                for _ in 0..*degree {
                    let (res, slash, arg) = store.functor_parts(remainder)?;
                    tail.push((slash, arg));
                    remainder = res;
                }
                let mut bind = None;
                if !store.unify(y2, remainder, &mut bind) {
                    return None;
                }
                let mut parent = store.substitute(x, &bind);
                for &(slash, arg) in tail.iter().rev() {
                    parent = store.make_functor(parent, slash, store.substitute(arg, &bind));
                }
                Some(parent)
            }
            Self::Conjunction => {
                let conj_like = store.atom_base_is(left, "conj")
                    || store.atom_base_is(left, ",")
                    || store.atom_base_is(left, ";");
                if !conj_like || store.is_punct(right) || right == special.np_bs_np {
                    return None;
                }
                Some(store.make_functor(right, Slash::Backward, right))
            }
            Self::Conjunction2 => {
                if store.atom_base_is(left, "conj") && right == special.np_bs_np {
                    Some(special.np_bs_np)
                } else {
                    None
                }
            }
            Self::RemovePunctuation { punct_left } => {
                if *punct_left {
                    store.is_punct(left).then_some(right)
                } else {
                    store.is_punct(right).then_some(left)
                }
            }
            Self::CommaVPToAdverb => {
                if left == special.comma
                    && (right == special.s_ng_bs_np || right == special.s_pss_bs_np)
                {
                    Some(special.vp_mod_bwd)
                } else {
                    None
                }
            }
            Self::ParentheticalDirectSpeech => {
                if left == special.comma && right == special.s_dcl_fs_s_dcl {
                    Some(special.vp_mod_fwd)
                } else {
                    None
                }
            }
            Self::Conjoin => {
                if left == right && store.target_is_sentence(left) {
                    Some(left)
                } else {
                    None
                }
            }
        }
    }
}

/// 後方合成の共通部分。`left_slash`が後方なら通常形、前方なら交差形です。
fn compose_backward(
    store: &CatStore,
    left: CatId,
    right: CatId,
    left_slash: Slash,
) -> Option<CatId> {
    let (y, ls, z) = store.functor_parts(left)?;
    if ls != left_slash {
        return None;
    }
    let (x, rs, y2) = store.functor_parts(right)?;
    if rs != Slash::Backward {
        return None;
    }
    let mut bind = None;
    if !store.unify(y2, y, &mut bind) {
        return None;
    }
    let res = store.substitute(x, &bind);
    let arg = store.substitute(z, &bind);
    Some(store.make_functor(res, left_slash, arg))
}

/// 二項規則表の1エントリ。結合子と主辞方向の組です。
#[derive(Clone, Copy, Debug)]
pub struct BinaryRule {
    /// 適用する結合子
    pub combinator: Combinator,
    /// 主辞が左側の子かどうか
    pub head_is_left: bool,
}

/// 英語の既定二項規則表。主辞は関数カテゴリ側の子に従います。
///
/// 前方規則では左の子が、後方規則では右の子が主辞になります。
/// 句読点の吸収では残る側の子が主辞です。
pub(crate) fn english_rules() -> Vec<BinaryRule> {
    [
        (Combinator::Conjunction, false),
        (Combinator::Conjunction2, false),
        (Combinator::RemovePunctuation { punct_left: true }, false),
        (Combinator::RemovePunctuation { punct_left: false }, true),
        (Combinator::CommaVPToAdverb, false),
        (Combinator::ParentheticalDirectSpeech, false),
        (Combinator::ForwardApplication, true),
        (Combinator::BackwardApplication, false),
        (Combinator::ForwardComposition, true),
        (Combinator::BackwardCrossedComposition, false),
        (Combinator::GeneralizedForwardComposition, true),
        (Combinator::GeneralizedBackwardCrossedComposition, false),
    ]
    .into_iter()
    .map(|(combinator, head_is_left)| BinaryRule {
        combinator,
        head_is_left,
    })
    .collect()
}

/// 日本語の既定二項規則表。主辞は一貫して右側の子です。
pub(crate) fn japanese_rules() -> Vec<BinaryRule> {
    [
        Combinator::Conjoin,
        Combinator::ForwardApplication,
        Combinator::BackwardApplication,
        Combinator::ForwardComposition,
        Combinator::BackwardComposition,
        Combinator::GeneralizedBackwardComposition(2),
        Combinator::GeneralizedBackwardComposition(3),
        Combinator::GeneralizedBackwardComposition(4),
    ]
    .into_iter()
    .map(|combinator| BinaryRule {
        combinator,
        head_is_left: false,
    })
    .collect()
}

/// 特殊規則が参照する定数カテゴリ
///
/// 文法の構築時に一度だけインターンされ、以後は読み取り専用です。
#[derive(Debug)]
pub(crate) struct SpecialCats {
    pub(crate) comma: CatId,
    pub(crate) np_bs_np: CatId,
    pub(crate) s_ng_bs_np: CatId,
    pub(crate) s_pss_bs_np: CatId,
    pub(crate) s_dcl_fs_s_dcl: CatId,
    pub(crate) vp_mod_bwd: CatId,
    pub(crate) vp_mod_fwd: CatId,
}

impl SpecialCats {
    /// 定数カテゴリをインターンして構築します。
    pub(crate) fn build(store: &CatStore) -> Result<Self> {
        Ok(Self {
            comma: store.parse(",")?,
            np_bs_np: store.parse("NP\\NP")?,
            s_ng_bs_np: store.parse("S[ng]\\NP")?,
            s_pss_bs_np: store.parse("S[pss]\\NP")?,
            s_dcl_fs_s_dcl: store.parse("S[dcl]/S[dcl]")?,
            vp_mod_bwd: store.parse("(S\\NP)\\(S\\NP)")?,
            vp_mod_fwd: store.parse("(S\\NP)/(S\\NP)")?,
        })
    }
}
