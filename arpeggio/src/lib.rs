//! # Arpeggio
//!
//! Arpeggioは、A*アルゴリズムに基づく高速な確率的CCG構文解析の実装です。
//!
//! ## 概要
//!
//! このライブラリは、トークン化された文と、外部のスーパータガーおよび
//! 依存構造スコアラーが出力した2つの対数確率行列から、スコア上位N個の
//! CCG導出木を求めるパーサーを提供します。探索には許容的な外側推定値を
//! 用いたA*アルゴリズムを使用し、最初に得られる完全な導出が最適である
//! ことが保証されます。
//!
//! ## 主な機能
//!
//! - **A*最良優先探索**: 許容的ヒューリスティックによる最適性の保証
//! - **N-best解析**: 重複を抑制したスコア上位N個の導出木の列挙
//! - **スーパータグ枝刈り**: ベータ閾値・上位K件・カテゴリ辞書による候補の絞り込み
//! - **文法フィルタ**: シード規則による結合の制限
//! - **部分解析制約**: 特定のスパンへのカテゴリの強制
//! - **2つの文法変種**: 英語と日本語の規則表と許容ルートカテゴリ
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use arpeggio::{GrammarBuilder, Language, Parser, ScoreMatrix};
//!
//! let tag_list = "NP\nN\nS[dcl]\\NP\nNP/N";
//! let unary_rules = "N NP";
//! let seen_rules = "NP S[dcl]\\NP\nNP/N N";
//! let cat_dict = "the NP/N";
//!
//! let grammar = GrammarBuilder::from_readers(
//!     Language::English,
//!     tag_list.as_bytes(),
//!     unary_rules.as_bytes(),
//!     seen_rules.as_bytes(),
//!     cat_dict.as_bytes(),
//! )?;
//!
//! let parser = Parser::new(grammar);
//! let mut worker = parser.new_worker();
//!
//! // "John runs": John is NP, runs is S[dcl]\NP; John's head is runs,
//! // and the head of runs is ROOT.
//! let tags = ScoreMatrix::from_vec(
//!     2,
//!     4,
//!     vec![
//!         0.0, -10.0, -10.0, -10.0, //
//!         -10.0, -10.0, 0.0, -10.0,
//!     ],
//! )?;
//! let deps = ScoreMatrix::from_vec(2, 3, vec![-5.0, -5.0, 0.0, 0.0, -5.0, -5.0])?;
//!
//! worker.reset_sentence(&["John", "runs"], tags, deps)?;
//! worker.parse();
//!
//! assert_eq!(worker.num_parses(), 1);
//! let parse = worker.derivation(0).unwrap();
//! assert_eq!(parse.category(), "S[dcl]");
//! assert_eq!(
//!     parse.to_auto(),
//!     "(<T S[dcl] 1 2> (<L NP XX XX John NP>) (<L S[dcl]\\NP XX XX runs S[dcl]\\NP>))"
//! );
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// 共通の定数定義
pub mod common;

/// エラー型の定義
pub mod errors;

/// 文法資源とビルダー
pub mod grammar;

/// A*探索のパーサー実装
pub mod parser;

/// スコア行列とヒューリスティックテーブル
pub mod scores;

/// 解析結果のビュー
pub mod tree;


// Re-exports
pub use errors::{ArpeggioError, Result};
pub use grammar::category::{CatId, Category, Slash};
pub use grammar::combinator::Combinator;
pub use grammar::{Grammar, GrammarBuilder, Language};
pub use parser::constraints::Constraint;
pub use parser::worker::Worker;
pub use parser::{Diagnostic, Parser};
pub use scores::ScoreMatrix;
pub use tree::Parse;

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
