//! 文法構築のためのビルダー
//!
//! このモジュールは、プレーンテキストまたはJSON形式の文法資源から
//! [`Grammar`]を構築するためのビルダーを提供します。
//!
//! テキスト形式は1行1エントリです:
//!
//! - スーパータグ目録: カテゴリ1つ
//! - 単項規則: `子カテゴリ 親カテゴリ`
//! - シード規則: `左カテゴリ 右カテゴリ`
//! - カテゴリ辞書: `表層形 カテゴリ...`
//!
//! 空行と`#`で始まる行は無視されます。JSON形式は1つの文書に
//! すべての資源をまとめたものです。

use std::io::Read;

use serde::Deserialize;

use crate::errors::{ArpeggioError, Result};
use crate::grammar::category::{CatId, CatStore};
use crate::grammar::{Grammar, GrammarData, Language};

/// 文法資源から[`Grammar`]を構築するビルダー
pub struct GrammarBuilder {}

/// JSON形式の文法資源
#[derive(Debug, Deserialize)]
struct JsonGrammar {
    language: String,
    categories: Vec<String>,
    #[serde(default)]
    unary_rules: Vec<(String, String)>,
    #[serde(default)]
    seen_rules: Vec<(String, String)>,
    #[serde(default)]
    cat_dict: std::collections::HashMap<String, Vec<String>>,
    #[serde(default)]
    roots: Option<Vec<String>>,
}

impl GrammarBuilder {
    /// テキスト形式の資源リーダーから新しい[`Grammar`]を作成します。
    ///
    /// 許容ルートカテゴリには言語の既定値が使用されます。
    ///
    /// # 引数
    ///
    ///  - `language`: 文法の変種
    ///  - `tag_list_rdr`: スーパータグ目録のリーダー
    ///  - `unary_rdr`: 単項規則表のリーダー
    ///  - `seen_rules_rdr`: シード規則表のリーダー
    ///  - `cat_dict_rdr`: カテゴリ辞書のリーダー
    ///
    /// # エラー
    ///
    /// 入力フォーマットが不正な場合に[`ArpeggioError`]を返します。
    pub fn from_readers<T, U, S, D>(
        language: Language,
        mut tag_list_rdr: T,
        mut unary_rdr: U,
        mut seen_rules_rdr: S,
        mut cat_dict_rdr: D,
    ) -> Result<Grammar>
    where
        T: Read,
        U: Read,
        S: Read,
        D: Read,
    {
        let mut tag_list = String::new();
        tag_list_rdr.read_to_string(&mut tag_list)?;
        let mut unary = String::new();
        unary_rdr.read_to_string(&mut unary)?;
        let mut seen = String::new();
        seen_rules_rdr.read_to_string(&mut seen)?;
        let mut dict = String::new();
        cat_dict_rdr.read_to_string(&mut dict)?;

        let categories: Vec<String> = content_lines(&tag_list)
            .map(str::to_string)
            .collect();
        let unary_rules = parse_pairs(&unary, "unary_rules")?;
        let seen_rules = parse_pairs(&seen, "seen_rules")?;
        let mut cat_dict = Vec::new();
        for line in content_lines(&dict) {
            let mut fields = line.split_whitespace();
            let form = fields.next().map(str::to_string).ok_or_else(|| {
                ArpeggioError::invalid_format("cat_dict", format!("empty entry in '{line}'"))
            })?;
            let cats: Vec<String> = fields.map(str::to_string).collect();
            if cats.is_empty() {
                return Err(ArpeggioError::invalid_format(
                    "cat_dict",
                    format!("no categories listed for '{form}'"),
                ));
            }
            cat_dict.push((form, cats));
        }

        Self::build(language, categories, unary_rules, seen_rules, cat_dict, None)
    }

    /// JSON形式の資源リーダーから新しい[`Grammar`]を作成します。
    ///
    /// # 引数
    ///
    /// * `rdr` - JSON文書のリーダー
    ///
    /// # エラー
    ///
    /// JSONの構造が不正な場合や、カテゴリが解析できない場合に
    /// [`ArpeggioError`]を返します。
    pub fn from_json_reader<R>(rdr: R) -> Result<Grammar>
    where
        R: Read,
    {
        let json: JsonGrammar = serde_json::from_reader(rdr)?;
        let language: Language = json.language.parse()?;
        // HashMap order is unstable; sort so the compiled form is deterministic.
        let mut cat_dict: Vec<(String, Vec<String>)> = json.cat_dict.into_iter().collect();
        cat_dict.sort_by(|a, b| a.0.cmp(&b.0));
        Self::build(
            language,
            json.categories,
            json.unary_rules,
            json.seen_rules,
            cat_dict,
            json.roots,
        )
    }

    /// パースされた資源から文法を構築します。
    fn build(
        language: Language,
        categories: Vec<String>,
        unary_rules: Vec<(String, String)>,
        seen_rules: Vec<(String, String)>,
        cat_dict: Vec<(String, Vec<String>)>,
        roots: Option<Vec<String>>,
    ) -> Result<Grammar> {
        if categories.is_empty() {
            return Err(ArpeggioError::invalid_argument(
                "tag_list",
                "the supertag inventory is empty",
            ));
        }

        let store = CatStore::new();
        let mut tag_inventory = Vec::with_capacity(categories.len());
        for cat in &categories {
            tag_inventory.push(store.parse(cat)?);
        }

        let mut unary = Vec::with_capacity(unary_rules.len());
        for (child, parent) in &unary_rules {
            unary.push((store.parse(child)?, store.parse(parent)?));
        }

        let mut seen = Vec::with_capacity(seen_rules.len());
        for (left, right) in &seen_rules {
            let left = store.parse(left)?;
            let right = store.parse(right)?;
            // Pairs are stored feature-normalized; matching happens on the
            // normalized ids as well.
            seen.push((store.stripped(left), store.stripped(right)));
        }

        let mut dict = Vec::with_capacity(cat_dict.len());
        for (form, cats) in &cat_dict {
            let mut ids: Vec<CatId> = Vec::with_capacity(cats.len());
            for cat in cats {
                let id = store.parse(cat)?;
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            dict.push((form.clone(), ids));
        }

        let root_names: Vec<String> = match roots {
            Some(names) => names,
            None => language
                .default_root_cats()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        let mut root_ids = Vec::with_capacity(root_names.len());
        for name in &root_names {
            root_ids.push(store.parse(name)?);
        }

        let data = GrammarData {
            language,
            cats: store.snapshot(),
            tag_inventory,
            unary,
            seen_rules: seen,
            cat_dict: dict,
            roots: root_ids,
        };
        Grammar::from_data(data)
    }
}

/// 空行とコメント行を除いた行のイテレータを返します。
fn content_lines(input: &str) -> impl Iterator<Item = &str> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// `A B`形式の行をパースします。
fn parse_pairs(input: &str, what: &'static str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for line in content_lines(input) {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(a), Some(b), None) => pairs.push((a.to_string(), b.to_string())),
            _ => {
                return Err(ArpeggioError::invalid_format(
                    what,
                    format!("expected two categories per line, but got '{line}'"),
                ))
            }
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_readers() {
        let grammar = GrammarBuilder::from_readers(
            Language::English,
            "# inventory\nNP\nS[dcl]\\NP\n\n".as_bytes(),
            "".as_bytes(),
            "NP S[dcl]\\NP\n".as_bytes(),
            "".as_bytes(),
        )
        .unwrap();
        assert_eq!(grammar.num_tags(), 2);
        assert_eq!(grammar.language(), Language::English);
    }

    #[test]
    fn test_from_readers_rejects_bad_pair() {
        let result = GrammarBuilder::from_readers(
            Language::English,
            "NP\n".as_bytes(),
            "N NP extra\n".as_bytes(),
            "".as_bytes(),
            "".as_bytes(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json_reader() {
        let json = r#"{
            "language": "ja",
            "categories": ["NP", "S[m]\\NP"],
            "unary_rules": [],
            "seen_rules": [["NP", "S[m]\\NP"]],
            "cat_dict": {"猫": ["NP"]},
            "roots": ["S[m]"]
        }"#;
        let grammar = GrammarBuilder::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(grammar.language(), Language::Japanese);
        assert_eq!(grammar.language().tag(), "ja");
        assert_eq!(grammar.num_tags(), 2);
        let np = grammar.parse_category("NP").unwrap();
        let pred = grammar.parse_category("S[m]\\NP").unwrap();
        assert!(grammar.is_seen(np, pred));
    }

    #[test]
    fn test_empty_inventory_is_rejected() {
        let result = GrammarBuilder::from_readers(
            Language::English,
            "".as_bytes(),
            "".as_bytes(),
            "".as_bytes(),
            "".as_bytes(),
        );
        assert!(result.is_err());
    }
}
