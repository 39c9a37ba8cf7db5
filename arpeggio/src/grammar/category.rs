//! CCGカテゴリの表現とインターニング
//!
//! このモジュールは、CCGの統語カテゴリを表現する型と、カテゴリを
//! 一意なIDに対応付けるインターナーを提供します。カテゴリは原子カテゴリ
//! (`NP`、`S[dcl]`など)と関数カテゴリ(`X/Y`、`X\Y`)のいずれかであり、
//! インターニングによって探索ホットパス上の等価比較はID比較に置き換えられます。
//!
//! カテゴリの表記はCCGbankの表層構文に従います。素性変数`[X]`は
//! 規則適用時に任意の具体素性と単一化され、結果カテゴリに代入されます。

use std::sync::RwLock;

use bincode::{Decode, Encode};

use crate::errors::{ArpeggioError, Result};

/// インターンされたカテゴリの識別子
///
/// [`CatStore`]内のカテゴリを一意に識別します。同一ストア内では、
/// IDの等価性が構造の等価性と一致します。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct CatId(pub(crate) u32);

impl CatId {
    /// IDの内部値を取得します。
    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline(always)]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// 関数カテゴリのスラッシュ方向
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Encode, Decode)]
pub enum Slash {
    /// 前方スラッシュ `/`。引数を右側に取ります。
    Forward,
    /// 後方スラッシュ `\`。引数を左側に取ります。
    Backward,
}

impl Slash {
    /// スラッシュの表記文字を返します。
    #[inline(always)]
    pub const fn as_char(self) -> char {
        match self {
            Self::Forward => '/',
            Self::Backward => '\\',
        }
    }
}

/// CCGの統語カテゴリ
///
/// 原子カテゴリは基底名とオプションの素性注釈を持ちます。
/// 関数カテゴリの子は[`CatId`]で参照されるため、関数カテゴリを
/// 構築するには子カテゴリが先にインターンされている必要があります。
#[derive(Clone, Eq, PartialEq, Debug, Hash, Encode, Decode)]
pub enum Category {
    /// 原子カテゴリ(例: `NP`、`S[dcl]`)
    Atom {
        /// 基底名(`S`、`NP`、`N`、`conj`、`,`など)
        base: String,
        /// 素性注釈(`dcl`、`nb`、`mod=adn,form=base`など)
        feature: Option<String>,
    },
    /// 関数カテゴリ(例: `S[dcl]\NP`)
    Functor {
        /// 結果カテゴリ
        result: CatId,
        /// スラッシュ方向
        slash: Slash,
        /// 引数カテゴリ
        argument: CatId,
    },
}

impl Category {
    /// 素性を持たない原子カテゴリを生成します。
    pub fn atom<S>(base: S) -> Self
    where
        S: Into<String>,
    {
        Self::Atom {
            base: base.into(),
            feature: None,
        }
    }
}

/// 句読点として扱われる原子カテゴリの基底名。
const PUNCT_BASES: &[&str] = &[",", ".", ";", ":", "LRB", "RRB", "``", "''"];

/// 素性単一化に使用される変数素性の名前。
const FEATURE_VARIABLE: &str = "X";

/// シード規則の正規化時に除去される素性。
const STRIPPED_FEATURES: &[&str] = &["X", "nb"];

#[derive(Default, Debug)]
struct StoreInner {
    cats: Vec<Category>,
    index: hashbrown::HashMap<Category, CatId>,
    stripped: Vec<CatId>,
}

/// カテゴリのインターナー
///
/// カテゴリを一意なIDに対応付ける追記専用のテーブルです。
/// セットアップ時に文法資源のすべてのカテゴリで事前に構築されますが、
/// 合成規則は未知の関数カテゴリを生成しうるため、探索中の追加も
/// ロック越しに受け付けます。除去済み素性版のIDはインターン時に
/// 先行して計算され、[`stripped`](Self::stripped)で定数時間で引けます。
#[derive(Default, Debug)]
pub struct CatStore {
    inner: RwLock<StoreInner>,
}

impl CatStore {
    /// 新しい空のインターナーを生成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録されているカテゴリ数を返します。
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().cats.len()
    }

    /// インターナーが空かどうかを返します。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// カテゴリをインターンし、IDを返します。
    ///
    /// 既に登録済みであれば既存のIDを返します。関数カテゴリの子は
    /// 登録済みのIDでなければなりません。
    pub(crate) fn intern(&self, cat: Category) -> CatId {
        let mut inner = self.inner.write().unwrap();
        intern_value(&mut inner, cat)
    }

    /// CCGbank表記のカテゴリ文字列を解析してインターンします。
    ///
    /// スラッシュは左結合です: `S\NP/NP`は`(S\NP)/NP`と解釈されます。
    ///
    /// # 引数
    ///
    /// * `input` - カテゴリ文字列(例: `"(S[dcl]\NP)/NP"`)
    ///
    /// # エラー
    ///
    /// 文字列がカテゴリとして解析できない場合、[`ArpeggioError`]を返します。
    pub fn parse(&self, input: &str) -> Result<CatId> {
        let ast = parse_ast(input)?;
        let mut inner = self.inner.write().unwrap();
        Ok(resolve_interning(&mut inner, &ast))
    }

    /// 登録済みカテゴリのみを対象に文字列を解決します。
    ///
    /// 未登録のカテゴリを参照した場合は`Ok(None)`を返し、
    /// インターナーは変更されません。
    pub(crate) fn find(&self, input: &str) -> Result<Option<CatId>> {
        let ast = parse_ast(input)?;
        let inner = self.inner.read().unwrap();
        Ok(resolve_lookup(&inner, &ast))
    }

    /// IDに対応するカテゴリのコピーを返します。
    pub(crate) fn get(&self, id: CatId) -> Category {
        self.inner.read().unwrap().cats[id.index()].clone()
    }

    /// 素性`[X]`と`[nb]`を除去したカテゴリのIDを返します。
    ///
    /// シード規則フィルタの照合にのみ使用されます。
    #[inline]
    pub(crate) fn stripped(&self, id: CatId) -> CatId {
        self.inner.read().unwrap().stripped[id.index()]
    }

    /// 関数カテゴリの構成要素を返します。原子カテゴリの場合は`None`。
    pub(crate) fn functor_parts(&self, id: CatId) -> Option<(CatId, Slash, CatId)> {
        match &self.inner.read().unwrap().cats[id.index()] {
            Category::Functor {
                result,
                slash,
                argument,
            } => Some((*result, *slash, *argument)),
            Category::Atom { .. } => None,
        }
    }

    /// 指定した基底名を持つ素性なし・素性ありいずれかの原子カテゴリかを判定します。
    pub(crate) fn atom_base_is(&self, id: CatId, name: &str) -> bool {
        match &self.inner.read().unwrap().cats[id.index()] {
            Category::Atom { base, .. } => base == name,
            Category::Functor { .. } => false,
        }
    }

    /// 句読点カテゴリかどうかを判定します。
    pub(crate) fn is_punct(&self, id: CatId) -> bool {
        match &self.inner.read().unwrap().cats[id.index()] {
            Category::Atom { base, .. } => PUNCT_BASES.contains(&base.as_str()),
            Category::Functor { .. } => false,
        }
    }

    /// カテゴリの最終ターゲット(最も内側の結果カテゴリ)が文カテゴリかを判定します。
    pub(crate) fn target_is_sentence(&self, id: CatId) -> bool {
        let inner = self.inner.read().unwrap();
        let mut cur = id;
        loop {
            match &inner.cats[cur.index()] {
                Category::Atom { base, .. } => return base == "S",
                Category::Functor { result, .. } => cur = *result,
            }
        }
    }

    /// 関数カテゴリを構築してインターンします。
    pub(crate) fn make_functor(&self, result: CatId, slash: Slash, argument: CatId) -> CatId {
        self.intern(Category::Functor {
            result,
            slash,
            argument,
        })
    }

    /// 2つのカテゴリを単一化します。
    ///
    /// 素性変数`[X]`は任意の具体素性と照合し、発見された束縛を
    /// `bind`に記録します。既存の束縛と矛盾する場合は失敗します。
    ///
    /// # 戻り値
    ///
    /// 単一化に成功した場合は`true`
    pub(crate) fn unify(&self, a: CatId, b: CatId, bind: &mut Option<String>) -> bool {
        let inner = self.inner.read().unwrap();
        unify_inner(&inner, a, b, bind)
    }

    /// 素性変数`[X]`を束縛された素性で置き換えたカテゴリを返します。
    ///
    /// 束縛が空の場合、カテゴリは変更されません。
    pub(crate) fn substitute(&self, id: CatId, bind: &Option<String>) -> CatId {
        let feature = match bind {
            Some(f) => f,
            None => return id,
        };
        match self.get(id) {
            Category::Atom { base, feature: f } => {
                if f.as_deref() == Some(FEATURE_VARIABLE) {
                    self.intern(Category::Atom {
                        base,
                        feature: Some(feature.clone()),
                    })
                } else {
                    id
                }
            }
            Category::Functor {
                result,
                slash,
                argument,
            } => {
                let r = self.substitute(result, bind);
                let a = self.substitute(argument, bind);
                if r == result && a == argument {
                    id
                } else {
                    self.intern(Category::Functor {
                        result: r,
                        slash,
                        argument: a,
                    })
                }
            }
        }
    }

    /// カテゴリをCCGbank表記の文字列として整形します。
    ///
    /// 関数カテゴリの子が関数カテゴリである場合は括弧で囲みます。
    pub fn display(&self, id: CatId) -> String {
        let inner = self.inner.read().unwrap();
        let mut out = String::new();
        display_inner(&inner, id, &mut out, false);
        out
    }

    /// 登録順のカテゴリ一覧のコピーを返します。
    ///
    /// コンパイル済み文法の書き出しに使用されます。登録順に再インターン
    /// すると同じIDが再現されます。
    pub(crate) fn snapshot(&self) -> Vec<Category> {
        self.inner.read().unwrap().cats.clone()
    }
}

fn intern_value(inner: &mut StoreInner, cat: Category) -> CatId {
    if let Some(&id) = inner.index.get(&cat) {
        return id;
    }
    let id = CatId(u32::try_from(inner.cats.len()).unwrap());
    inner.cats.push(cat.clone());
    inner.index.insert(cat.clone(), id);
    // Placeholder so that recursive interning below sees a consistent table.
    inner.stripped.push(id);
    let sid = match cat {
        Category::Atom {
            ref base,
            feature: Some(ref f),
        } if STRIPPED_FEATURES.contains(&f.as_str()) => intern_value(
            inner,
            Category::Atom {
                base: base.clone(),
                feature: None,
            },
        ),
        Category::Atom { .. } => id,
        Category::Functor {
            result,
            slash,
            argument,
        } => {
            let sr = inner.stripped[result.index()];
            let sa = inner.stripped[argument.index()];
            if sr == result && sa == argument {
                id
            } else {
                intern_value(
                    inner,
                    Category::Functor {
                        result: sr,
                        slash,
                        argument: sa,
                    },
                )
            }
        }
    };
    inner.stripped[id.index()] = sid;
    id
}

fn unify_inner(inner: &StoreInner, a: CatId, b: CatId, bind: &mut Option<String>) -> bool {
    if a == b {
        return true;
    }
    match (&inner.cats[a.index()], &inner.cats[b.index()]) {
        (
            Category::Atom {
                base: ba,
                feature: fa,
            },
            Category::Atom {
                base: bb,
                feature: fb,
            },
        ) => ba == bb && features_match(fa, fb, bind),
        (
            Category::Functor {
                result: r1,
                slash: s1,
                argument: a1,
            },
            Category::Functor {
                result: r2,
                slash: s2,
                argument: a2,
            },
        ) => s1 == s2 && unify_inner(inner, *r1, *r2, bind) && unify_inner(inner, *a1, *a2, bind),
        _ => false,
    }
}

fn features_match(a: &Option<String>, b: &Option<String>, bind: &mut Option<String>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(f), Some(g)) => {
            if f == g {
                true
            } else if f == FEATURE_VARIABLE {
                bind_feature(g, bind)
            } else if g == FEATURE_VARIABLE {
                bind_feature(f, bind)
            } else {
                false
            }
        }
        _ => false,
    }
}

fn bind_feature(value: &str, bind: &mut Option<String>) -> bool {
    match bind {
        Some(existing) => existing == value,
        None => {
            *bind = Some(value.to_string());
            true
        }
    }
}

fn display_inner(inner: &StoreInner, id: CatId, out: &mut String, parens: bool) {
    match &inner.cats[id.index()] {
        Category::Atom { base, feature } => {
            out.push_str(base);
            if let Some(f) = feature {
                out.push('[');
                out.push_str(f);
                out.push(']');
            }
        }
        Category::Functor {
            result,
            slash,
            argument,
        } => {
            if parens {
                out.push('(');
            }
            display_inner(inner, *result, out, true);
            out.push(slash.as_char());
            display_inner(inner, *argument, out, true);
            if parens {
                out.push(')');
            }
        }
    }
}

/// 解析の中間表現。IDの解決前のカテゴリ構造。
#[derive(Debug)]
enum CatAst {
    Atom(String, Option<String>),
    Functor(Box<CatAst>, Slash, Box<CatAst>),
}

fn resolve_interning(inner: &mut StoreInner, ast: &CatAst) -> CatId {
    match ast {
        CatAst::Atom(base, feature) => intern_value(
            inner,
            Category::Atom {
                base: base.clone(),
                feature: feature.clone(),
            },
        ),
        CatAst::Functor(result, slash, argument) => {
            let r = resolve_interning(inner, result);
            let a = resolve_interning(inner, argument);
            intern_value(
                inner,
                Category::Functor {
                    result: r,
                    slash: *slash,
                    argument: a,
                },
            )
        }
    }
}

fn resolve_lookup(inner: &StoreInner, ast: &CatAst) -> Option<CatId> {
    match ast {
        CatAst::Atom(base, feature) => inner
            .index
            .get(&Category::Atom {
                base: base.clone(),
                feature: feature.clone(),
            })
            .copied(),
        CatAst::Functor(result, slash, argument) => {
            let r = resolve_lookup(inner, result)?;
            let a = resolve_lookup(inner, argument)?;
            inner
                .index
                .get(&Category::Functor {
                    result: r,
                    slash: *slash,
                    argument: a,
                })
                .copied()
        }
    }
}

fn parse_ast(input: &str) -> Result<CatAst> {
    let chars: Vec<char> = input.trim().chars().collect();
    let mut pos = 0;
    let ast = parse_category(&chars, &mut pos, input)?;
    if pos != chars.len() {
        return Err(ArpeggioError::invalid_format(
            "category",
            format!("trailing characters in '{input}'"),
        ));
    }
    Ok(ast)
}

fn parse_category(chars: &[char], pos: &mut usize, input: &str) -> Result<CatAst> {
    let mut left = parse_operand(chars, pos, input)?;
    // Slashes associate to the left: S\NP/NP == (S\NP)/NP.
    while *pos < chars.len() {
        let slash = match chars[*pos] {
            '/' => Slash::Forward,
            '\\' => Slash::Backward,
            _ => break,
        };
        *pos += 1;
        let right = parse_operand(chars, pos, input)?;
        left = CatAst::Functor(Box::new(left), slash, Box::new(right));
    }
    Ok(left)
}

fn parse_operand(chars: &[char], pos: &mut usize, input: &str) -> Result<CatAst> {
    if *pos >= chars.len() {
        return Err(ArpeggioError::invalid_format(
            "category",
            format!("unexpected end of category '{input}'"),
        ));
    }
    if chars[*pos] == '(' {
        *pos += 1;
        let inner = parse_category(chars, pos, input)?;
        if *pos >= chars.len() || chars[*pos] != ')' {
            return Err(ArpeggioError::invalid_format(
                "category",
                format!("unbalanced parentheses in '{input}'"),
            ));
        }
        *pos += 1;
        return Ok(inner);
    }
    let start = *pos;
    while *pos < chars.len() && !matches!(chars[*pos], '(' | ')' | '/' | '\\' | '[') {
        *pos += 1;
    }
    if *pos == start {
        return Err(ArpeggioError::invalid_format(
            "category",
            format!("empty category atom in '{input}'"),
        ));
    }
    let base: String = chars[start..*pos].iter().collect();
    let mut feature = None;
    if *pos < chars.len() && chars[*pos] == '[' {
        *pos += 1;
        let fstart = *pos;
        while *pos < chars.len() && chars[*pos] != ']' {
            *pos += 1;
        }
        if *pos >= chars.len() {
            return Err(ArpeggioError::invalid_format(
                "category",
                format!("unterminated feature in '{input}'"),
            ));
        }
        feature = Some(chars[fstart..*pos].iter().collect());
        *pos += 1;
    }
    Ok(CatAst::Atom(base, feature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display_roundtrip() {
        let store = CatStore::new();
        for s in [
            "NP",
            "S[dcl]",
            "S[dcl]\\NP",
            "(S[dcl]\\NP)/NP",
            "NP[nb]/N",
            "(S\\NP)\\(S\\NP)",
            "S[mod=adn,form=base]",
        ] {
            let id = store.parse(s).unwrap();
            assert_eq!(store.display(id), s);
        }
    }

    #[test]
    fn test_slash_left_associativity() {
        let store = CatStore::new();
        let implicit = store.parse("S\\NP/NP").unwrap();
        let explicit = store.parse("(S\\NP)/NP").unwrap();
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn test_interning_is_identity() {
        let store = CatStore::new();
        let a = store.parse("(S[dcl]\\NP)/NP").unwrap();
        let b = store.parse("(S[dcl]\\NP)/NP").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, store.parse("(S[dcl]\\NP)/PP").unwrap());
    }

    #[test]
    fn test_stripped_features() {
        let store = CatStore::new();
        let nb = store.parse("NP[nb]/N").unwrap();
        let plain = store.parse("NP/N").unwrap();
        assert_eq!(store.stripped(nb), plain);

        let var = store.parse("S[X]\\NP").unwrap();
        let s = store.parse("S\\NP").unwrap();
        assert_eq!(store.stripped(var), s);

        // Concrete features survive normalization.
        let dcl = store.parse("S[dcl]\\NP").unwrap();
        assert_eq!(store.stripped(dcl), dcl);
    }

    #[test]
    fn test_unify_variable_binding() {
        let store = CatStore::new();
        let pattern = store.parse("S[X]\\NP").unwrap();
        let concrete = store.parse("S[dcl]\\NP").unwrap();
        let mut bind = None;
        assert!(store.unify(pattern, concrete, &mut bind));
        assert_eq!(bind.as_deref(), Some("dcl"));

        let result = store.parse("S[X]").unwrap();
        let substituted = store.substitute(result, &bind);
        assert_eq!(store.display(substituted), "S[dcl]");
    }

    #[test]
    fn test_unify_rejects_feature_clash() {
        let store = CatStore::new();
        let a = store.parse("S[dcl]").unwrap();
        let b = store.parse("S[wq]").unwrap();
        let mut bind = None;
        assert!(!store.unify(a, b, &mut bind));
    }

    #[test]
    fn test_find_does_not_intern() {
        let store = CatStore::new();
        store.parse("NP").unwrap();
        let before = store.len();
        assert!(store.find("NP/N").unwrap().is_none());
        assert_eq!(store.len(), before);
        assert!(store.find("NP").unwrap().is_some());
    }

    #[test]
    fn test_punct_detection() {
        let store = CatStore::new();
        let comma = store.parse(",").unwrap();
        let np = store.parse("NP").unwrap();
        assert!(store.is_punct(comma));
        assert!(!store.is_punct(np));
    }

    #[test]
    fn test_target_is_sentence() {
        let store = CatStore::new();
        let vp = store.parse("(S[dcl]\\NP)/NP").unwrap();
        let np = store.parse("NP/N").unwrap();
        assert!(store.target_is_sentence(vp));
        assert!(!store.target_is_sentence(np));
    }
}
