//! 共通の定数定義
//!
//! このモジュールは、パーサー全体で共有される定数を定義します。

/// 除外された語彙項目に割り当てられるスコアの下限値。
///
/// 端末制約によって候補から除外されたカテゴリには、この値が
/// 語彙スコアとして割り当てられます。対数確率として十分に小さく、
/// 探索中に選択されることはありません。
pub const LOG_ZERO: f32 = -1e10;

/// 依存スコア行列においてROOTを表す列番号。
///
/// `P_dep`の第0列は、トークンの主辞が文のROOTであることを表します。
pub const ROOT_COLUMN: usize = 0;

/// スーパータグ枝刈りのベータ閾値のデフォルト値。
pub const DEFAULT_BETA: f32 = 1e-5;

/// トークンごとおよびチャートセルごとの候補数上限のデフォルト値。
pub const DEFAULT_PRUNING_SIZE: usize = 50;

/// 1文あたりに返す解析結果数のデフォルト値。
pub const DEFAULT_NBEST: usize = 1;

/// 解析対象とする文の最大トークン数のデフォルト値。
///
/// これを超える文は解析されず、空の結果を返します。
pub const DEFAULT_MAX_LENGTH: usize = 250;

/// 1文あたりのアジェンダ取り出し回数の上限のデフォルト値。
pub const DEFAULT_MAX_STEPS: usize = 100_000;
