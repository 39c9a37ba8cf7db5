//! エラー型の定義
//!
//! このモジュールは、Arpeggioライブラリで使用されるすべてのエラー型を定義します。

use std::error::Error;
use std::fmt;

/// Arpeggio専用のResult型
///
/// エラー型としてデフォルトで[`ArpeggioError`]を使用します。
pub type Result<T, E = ArpeggioError> = std::result::Result<T, E>;

/// Arpeggioのエラー型
///
/// このライブラリで発生する可能性のあるすべてのエラーを表現します。
/// 各バリアントは特定のエラー条件に対応しています。
#[derive(Debug, thiserror::Error)]
pub enum ArpeggioError {
    /// 無効な引数エラー
    ///
    /// [`InvalidArgumentError`]のエラーバリアント。
    #[error(transparent)]
    InvalidArgument(InvalidArgumentError),

    /// 無効なフォーマットエラー
    ///
    /// [`InvalidFormatError`]のエラーバリアント。
    #[error(transparent)]
    InvalidFormat(InvalidFormatError),

    /// スコア行列の形状不一致エラー
    ///
    /// [`ShapeMismatchError`]のエラーバリアント。
    #[error(transparent)]
    ShapeMismatch(ShapeMismatchError),

    /// 文法の不整合エラー
    ///
    /// [`GrammarInconsistencyError`]のエラーバリアント。
    #[error(transparent)]
    GrammarInconsistency(GrammarInconsistencyError),

    /// 浮動小数点数パースエラー
    ///
    /// [`ParseFloatError`](std::num::ParseFloatError)のエラーバリアント。
    #[error(transparent)]
    ParseFloat(std::num::ParseFloatError),

    /// 整数パースエラー
    ///
    /// [`ParseIntError`](std::num::ParseIntError)のエラーバリアント。
    #[error(transparent)]
    ParseInt(std::num::ParseIntError),

    /// I/Oエラー
    ///
    /// [`std::io::Error`]のエラーバリアント。
    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    /// JSONデシリアライゼーションエラー
    ///
    /// [`serde_json::Error`]のエラーバリアント。
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// bincodeデコードエラー
    ///
    /// [`DecodeError`](bincode::error::DecodeError)のエラーバリアント。
    #[error(transparent)]
    BincodeDecode(bincode::error::DecodeError),

    /// bincodeエンコードエラー
    ///
    /// [`EncodeError`](bincode::error::EncodeError)のエラーバリアント。
    #[error(transparent)]
    BincodeEncode(bincode::error::EncodeError),
}

impl ArpeggioError {
    /// 無効な引数エラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - 引数の名前
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    /// 無効なフォーマットエラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - フォーマット名
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_format<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            arg,
            msg: msg.into(),
        })
    }

    /// 形状不一致エラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - 行列の名前
    /// * `expected` - 期待される形状 (行数, 列数)
    /// * `actual` - 実際の形状 (行数, 列数)
    pub(crate) fn shape_mismatch(
        arg: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        Self::ShapeMismatch(ShapeMismatchError {
            arg,
            expected,
            actual,
        })
    }

    /// 文法の不整合エラーを生成します
    ///
    /// # 引数
    ///
    /// * `msg` - エラーメッセージ
    /// * `cause` - エラーの原因
    pub(crate) fn grammar_inconsistency<S, M>(msg: S, cause: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self::GrammarInconsistency(GrammarInconsistencyError {
            msg: msg.into(),
            cause: cause.into(),
        })
    }
}

/// 引数が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// 引数の名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// 入力フォーマットが無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidFormatError {
    /// フォーマットの名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidFormatError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidFormatError {}

/// スコア行列の形状が文の長さと一致しない場合に使用されるエラー
///
/// この文の解析は中止されますが、バッチ内の他の文には影響しません。
#[derive(Debug)]
pub struct ShapeMismatchError {
    /// 行列の名前
    pub(crate) arg: &'static str,

    /// 期待される形状 (行数, 列数)
    pub(crate) expected: (usize, usize),

    /// 実際の形状 (行数, 列数)
    pub(crate) actual: (usize, usize),
}

impl fmt::Display for ShapeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ShapeMismatchError: {}: expected ({}, {}), but got ({}, {})",
            self.arg, self.expected.0, self.expected.1, self.actual.0, self.actual.1
        )
    }
}

impl Error for ShapeMismatchError {}

/// 制約が文法資源と矛盾する場合に使用されるエラー
///
/// 制約が語彙目録に存在しないカテゴリを参照している場合などに発生します。
#[derive(Debug)]
pub struct GrammarInconsistencyError {
    /// エラーメッセージ
    pub(crate) msg: String,

    /// エラーの根本原因
    pub(crate) cause: String,
}

impl fmt::Display for GrammarInconsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GrammarInconsistencyError: {}: {}", self.msg, self.cause)
    }
}

impl Error for GrammarInconsistencyError {}

impl From<std::num::ParseFloatError> for ArpeggioError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::ParseFloat(error)
    }
}

impl From<std::num::ParseIntError> for ArpeggioError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::ParseInt(error)
    }
}

impl From<bincode::error::DecodeError> for ArpeggioError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::BincodeDecode(error)
    }
}

impl From<bincode::error::EncodeError> for ArpeggioError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::BincodeEncode(error)
    }
}
