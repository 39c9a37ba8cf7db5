//! 解析のための文法モジュール
//!
//! このモジュールは、CCG解析に必要な文法資源の読み込み、構築、管理を行います。
//! 主な機能として以下を提供します:
//!
//! - スーパータグ目録、単項規則表、シード規則表、カテゴリ辞書の管理
//! - カテゴリインターナーの事前構築と共有
//! - 二項規則適用結果のキャッシュ
//! - コンパイル済み文法ファイルの読み書き
//!
//! 文法は解析開始前に一度だけ構築され、`Arc`を通じてすべてのワーカーから
//! 読み取り専用で共有されます。
pub mod builder;
pub mod category;
pub mod combinator;

use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use bincode::{Decode, Encode};

use crate::errors::{ArpeggioError, Result};
use crate::grammar::category::{CatId, CatStore, Category};
use crate::grammar::combinator::{english_rules, japanese_rules, BinaryRule, Combinator, SpecialCats};

pub use crate::grammar::builder::GrammarBuilder;

/// コンパイル済み文法ファイルを識別するマジックバイト。
///
/// この定数の"0.1"はファイルフォーマットのバージョンを示しており、
/// クレートのセマンティックバージョンからは切り離されています。
pub const GRAMMAR_MAGIC: &[u8] = b"ArpeggioGrammar 0.1\n";

/// 文法の変種
///
/// 英語と日本語は規則表と許容ルートカテゴリのみが異なります。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Encode, Decode)]
pub enum Language {
    /// 英語 (CCGbank)
    English,
    /// 日本語 (Japanese CCGbank)
    Japanese,
}

impl Language {
    /// 言語タグを返します。
    #[inline(always)]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Japanese => "ja",
        }
    }

    /// この変種の既定二項規則表を返します。
    pub(crate) fn default_binary_rules(self) -> Vec<BinaryRule> {
        match self {
            Self::English => english_rules(),
            Self::Japanese => japanese_rules(),
        }
    }

    /// この変種の既定の許容ルートカテゴリを返します。
    pub fn default_root_cats(self) -> &'static [&'static str] {
        match self {
            Self::English => &["S[dcl]", "S[wq]", "S[q]", "S[qem]", "NP"],
            Self::Japanese => &["S[m]", "FRAG", "INTJP", "CP"],
        }
    }
}

impl FromStr for Language {
    type Err = ArpeggioError;

    /// 言語タグから変種をパースします。
    ///
    /// # 引数
    ///
    /// * `tag` - `"en"`または`"ja"`
    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "en" | "english" => Ok(Self::English),
            "ja" | "japanese" => Ok(Self::Japanese),
            _ => Err(ArpeggioError::invalid_argument(
                "language",
                format!("unknown language tag '{tag}' (expected 'en' or 'ja')"),
            )),
        }
    }
}

/// コンパイル済み文法のフラットな表現
///
/// [`Grammar`]の実行時テーブルはここから再構築されます。`cats`は
/// インターン順に並んでおり、順に再インターンすると同じIDが再現されます。
#[derive(Debug, Encode, Decode)]
pub(crate) struct GrammarData {
    pub(crate) language: Language,
    pub(crate) cats: Vec<Category>,
    pub(crate) tag_inventory: Vec<CatId>,
    pub(crate) unary: Vec<(CatId, CatId)>,
    pub(crate) seen_rules: Vec<(CatId, CatId)>,
    pub(crate) cat_dict: Vec<(String, Vec<CatId>)>,
    pub(crate) roots: Vec<CatId>,
}

/// 二項規則適用の1結果。親カテゴリと、それを導出した結合子の組です。
#[derive(Clone, Copy, Debug)]
pub(crate) struct BinaryOutcome {
    /// 導出された親カテゴリ
    pub(crate) parent: CatId,
    /// 適用された結合子
    pub(crate) combinator: Combinator,
    /// 主辞が左側の子かどうか
    pub(crate) head_is_left: bool,
}

/// CCG解析のための文法
///
/// カテゴリインターナー、スーパータグ目録、単項規則表、シード規則表、
/// カテゴリ辞書、許容ルートカテゴリ、二項規則表を保持します。
/// セットアップ時に一度だけ構築され、以後は読み取り専用として
/// すべてのワーカーから共有されます。
///
/// 二項規則の適用結果はカテゴリ対をキーとしてキャッシュされます。
/// 合成規則は目録にない関数カテゴリを生成しうるため、キャッシュと
/// インターナーはロック越しの追加を受け付けますが、探索中の書き込みは
/// まれです。
#[derive(Debug)]
pub struct Grammar {
    data: GrammarData,
    store: CatStore,
    unary: hashbrown::HashMap<CatId, Vec<CatId>>,
    unary_preimage: hashbrown::HashMap<CatId, Vec<CatId>>,
    seen_rules: hashbrown::HashSet<(CatId, CatId)>,
    cat_dict: hashbrown::HashMap<String, Vec<CatId>>,
    root_set: hashbrown::HashSet<CatId>,
    rules: Vec<BinaryRule>,
    special: SpecialCats,
    rule_cache: RwLock<hashbrown::HashMap<(CatId, CatId), Arc<[BinaryOutcome]>>>,
}

impl Grammar {
    /// フラットな文法データから実行時テーブルを構築します。
    ///
    /// # エラー
    ///
    /// カテゴリ表の順序が壊れている場合や、IDが表の範囲外を参照している
    /// 場合に[`ArpeggioError`]を返します。
    pub(crate) fn from_data(data: GrammarData) -> Result<Self> {
        let num_cats = data.cats.len();
        let check = |id: CatId| -> Result<CatId> {
            if (id.get() as usize) < num_cats {
                Ok(id)
            } else {
                Err(ArpeggioError::invalid_format(
                    "grammar",
                    format!("category id {} out of range", id.get()),
                ))
            }
        };

        let store = CatStore::new();
        for (i, cat) in data.cats.iter().enumerate() {
            if let Category::Functor {
                result, argument, ..
            } = cat
            {
                if result.get() as usize >= i || argument.get() as usize >= i {
                    return Err(ArpeggioError::invalid_format(
                        "grammar",
                        "category table is not topologically ordered",
                    ));
                }
            }
            let id = store.intern(cat.clone());
            if id.get() as usize != i {
                return Err(ArpeggioError::invalid_format(
                    "grammar",
                    "duplicate entry in category table",
                ));
            }
        }

        let mut unary: hashbrown::HashMap<CatId, Vec<CatId>> = hashbrown::HashMap::new();
        let mut unary_preimage: hashbrown::HashMap<CatId, Vec<CatId>> = hashbrown::HashMap::new();
        for &(child, parent) in &data.unary {
            let (child, parent) = (check(child)?, check(parent)?);
            let parents = unary.entry(child).or_default();
            if !parents.contains(&parent) {
                parents.push(parent);
            }
            let children = unary_preimage.entry(parent).or_default();
            if !children.contains(&child) {
                children.push(child);
            }
        }

        let mut seen_rules = hashbrown::HashSet::with_capacity(data.seen_rules.len());
        for &(left, right) in &data.seen_rules {
            seen_rules.insert((check(left)?, check(right)?));
        }

        let mut cat_dict = hashbrown::HashMap::with_capacity(data.cat_dict.len());
        for (form, cats) in &data.cat_dict {
            for &c in cats {
                check(c)?;
            }
            cat_dict.insert(form.clone(), cats.clone());
        }

        let mut root_set = hashbrown::HashSet::with_capacity(data.roots.len());
        for &root in &data.roots {
            root_set.insert(check(root)?);
        }

        for &tag in &data.tag_inventory {
            check(tag)?;
        }

        let special = SpecialCats::build(&store)?;
        let rules = data.language.default_binary_rules();

        Ok(Self {
            data,
            store,
            unary,
            unary_preimage,
            seen_rules,
            cat_dict,
            root_set,
            rules,
            special,
            rule_cache: RwLock::new(hashbrown::HashMap::new()),
        })
    }

    /// コンパイル済み文法をリーダーから読み込みます。
    ///
    /// # 引数
    ///
    /// * `rdr` - コンパイル済み文法ファイルのリーダー
    ///
    /// # エラー
    ///
    /// マジックバイトが一致しない場合やデコードに失敗した場合に
    /// [`ArpeggioError`]を返します。
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0u8; GRAMMAR_MAGIC.len()];
        rdr.read_exact(&mut magic)?;
        if magic != GRAMMAR_MAGIC {
            return Err(ArpeggioError::invalid_format(
                "grammar",
                "unrecognized magic bytes; not a compiled grammar file",
            ));
        }
        let data: GrammarData =
            bincode::decode_from_std_read(&mut rdr, bincode::config::standard())?;
        Self::from_data(data)
    }

    /// コンパイル済み文法をライターに書き出します。
    ///
    /// # 引数
    ///
    /// * `wtr` - 書き出し先のライター
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(GRAMMAR_MAGIC)?;
        bincode::encode_into_std_write(&self.data, &mut wtr, bincode::config::standard())?;
        Ok(())
    }

    /// 文法の変種を返します。
    #[inline(always)]
    pub const fn language(&self) -> Language {
        self.data.language
    }

    /// スーパータグ目録のサイズ(スコア行列の列数)を返します。
    #[inline(always)]
    pub fn num_tags(&self) -> usize {
        self.data.tag_inventory.len()
    }

    /// スコア行列の列番号に対応するカテゴリの一覧を返します。
    #[inline(always)]
    pub(crate) fn tag_categories(&self) -> &[CatId] {
        &self.data.tag_inventory
    }

    /// 既定の許容ルートカテゴリを返します。
    #[inline(always)]
    pub(crate) fn root_cats(&self) -> &[CatId] {
        &self.data.roots
    }

    /// カテゴリ文字列を解析してインターンします。
    pub fn parse_category(&self, input: &str) -> Result<CatId> {
        self.store.parse(input)
    }

    /// カテゴリをCCGbank表記の文字列として整形します。
    pub fn category_repr(&self, id: CatId) -> String {
        self.store.display(id)
    }

    /// カテゴリインターナーへの参照を返します。
    #[inline(always)]
    pub(crate) fn store(&self) -> &CatStore {
        &self.store
    }

    /// 単項規則で子カテゴリから導出できる親カテゴリの一覧を返します。
    #[inline]
    pub(crate) fn unary_parents(&self, child: CatId) -> &[CatId] {
        self.unary.get(&child).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 単項規則で親カテゴリを導出できる子カテゴリの一覧を返します。
    #[inline]
    pub(crate) fn unary_children(&self, parent: CatId) -> &[CatId] {
        self.unary_preimage
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// カテゴリ対がシード規則に含まれるかを判定します。
    ///
    /// 照合前に両カテゴリの素性`[X]`と`[nb]`が除去されます。
    #[inline]
    pub(crate) fn is_seen(&self, left: CatId, right: CatId) -> bool {
        self.seen_rules
            .contains(&(self.store.stripped(left), self.store.stripped(right)))
    }

    /// 表層形に対応するカテゴリ辞書のエントリを返します。
    #[inline]
    pub(crate) fn dict_entry(&self, form: &str) -> Option<&[CatId]> {
        self.cat_dict.get(form).map(Vec::as_slice)
    }

    /// カテゴリが許容ルートかを判定します。
    #[inline]
    pub(crate) fn is_root(&self, cat: CatId) -> bool {
        self.root_set.contains(&cat)
    }

    /// 隣接カテゴリ対に二項規則表を適用し、導出可能な親の一覧を返します。
    ///
    /// 結果は親カテゴリで重複除去され、カテゴリ対をキーとして
    /// キャッシュされます。シード規則フィルタは適用前に呼び出し側で
    /// 判定されます。
    pub(crate) fn apply_binary_rules(&self, left: CatId, right: CatId) -> Arc<[BinaryOutcome]> {
        if let Some(hit) = self.rule_cache.read().unwrap().get(&(left, right)) {
            return Arc::clone(hit);
        }
        let mut outcomes: Vec<BinaryOutcome> = Vec::new();
        for rule in &self.rules {
            if let Some(parent) = rule
                .combinator
                .apply(&self.store, &self.special, left, right)
            {
                if !outcomes.iter().any(|o| o.parent == parent) {
                    outcomes.push(BinaryOutcome {
                        parent,
                        combinator: rule.combinator,
                        head_is_left: rule.head_is_left,
                    });
                }
            }
        }
        let outcomes: Arc<[BinaryOutcome]> = outcomes.into();
        let mut cache = self.rule_cache.write().unwrap();
        Arc::clone(
            cache
                .entry((left, right))
                .or_insert(outcomes),
        )
    }
}
