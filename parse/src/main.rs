//! CCG構文解析を実行するユーティリティ
//!
//! このバイナリは、標準入力から1行1文のJSONを読み込み、各文の
//! スコア行列に対してA*解析を実行して、指定された出力形式(auto、json)で
//! 結果を出力します。文単位の解析は互いに独立なため、`-j`でワーカー
//! スレッド数を指定して並列化できます。出力は入力順に整列されます。
//!
//! 入力の1行は以下の形式です:
//!
//! ```json
//! {"tokens": ["John", "runs"],
//!  "tag": [[...], [...]],
//!  "dep": [[...], [...]],
//!  "constraints": [{"type": "terminal", "category": "NP", "position": 0}]}
//! ```

use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;

use arpeggio::{
    Constraint, Grammar, GrammarBuilder, Parser as CcgParser, ScoreMatrix, Worker,
};

use clap::Parser;
use serde::Deserialize;
use serde_json::json;

/// 出力モード
#[derive(Clone, Debug)]
enum OutputMode {
    Auto,
    Deriv,
    Json,
}

/// `OutputMode` の `FromStr` 実装
impl FromStr for OutputMode {
    type Err = &'static str;

    /// 文字列から出力モードをパースする
    ///
    /// # 引数
    ///
    /// * `mode` - パース対象の文字列("auto"、"deriv"、"json"のいずれか)
    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "auto" => Ok(Self::Auto),
            "deriv" => Ok(Self::Deriv),
            "json" => Ok(Self::Json),
            _ => Err("Could not parse a mode"),
        }
    }
}

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(name = "parse", about = "Predicts CCG derivations")]
struct Args {
    /// Compiled grammar file.
    #[clap(short = 'i', long)]
    grammar: Option<PathBuf>,

    /// Combined JSON grammar file (alternative to --grammar).
    #[clap(long)]
    json_grammar: Option<PathBuf>,

    /// Output mode. Choices are auto and json.
    #[clap(short = 'O', long, default_value = "auto")]
    output_mode: OutputMode,

    /// Number of parses returned per sentence.
    #[clap(short = 'n', long, default_value_t = 1)]
    nbest: usize,

    /// Beta threshold ratio for supertag pruning.
    #[clap(long, default_value_t = 1e-5)]
    beta: f32,

    /// Disables beta pruning.
    #[clap(long)]
    disable_beta: bool,

    /// Per-token and per-cell candidate limit.
    #[clap(long, default_value_t = 50)]
    pruning_size: usize,

    /// Enables the seen-rules filter.
    #[clap(long)]
    seen_rules: bool,

    /// Enables the lexical category dictionary.
    #[clap(long)]
    category_dict: bool,

    /// Sentences longer than this are skipped.
    #[clap(long, default_value_t = 250)]
    max_length: usize,

    /// Maximum number of agenda pops per sentence.
    #[clap(long, default_value_t = 100_000)]
    max_steps: usize,

    /// Number of worker threads.
    #[clap(short = 'j', long, default_value_t = 1)]
    threads: usize,
}

/// 入力の1文
#[derive(Debug, Deserialize)]
struct SentenceInput {
    tokens: Vec<String>,
    tag: Vec<Vec<f32>>,
    dep: Vec<Vec<f32>>,
    #[serde(default)]
    constraints: Vec<ConstraintInput>,
}

/// 入力の制約表現
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ConstraintInput {
    Terminal {
        category: String,
        position: usize,
    },
    Span {
        category: Option<String>,
        start: usize,
        length: usize,
    },
}

impl From<ConstraintInput> for Constraint {
    fn from(input: ConstraintInput) -> Self {
        match input {
            ConstraintInput::Terminal { category, position } => {
                Constraint::Terminal { category, position }
            }
            ConstraintInput::Span {
                category,
                start,
                length,
            } => Constraint::Span {
                category,
                start,
                length,
            },
        }
    }
}

/// 行優先のネストした配列から行列を構築する
fn to_matrix(rows: &[Vec<f32>]) -> Result<ScoreMatrix, arpeggio::ArpeggioError> {
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    ScoreMatrix::from_vec(rows.len(), cols, data)
}

/// 1文を解析して出力文字列を生成する
///
/// # 引数
///
/// * `worker` - 再利用されるワーカー
/// * `index` - 文番号(1から始まる)
/// * `line` - 入力のJSON行
/// * `mode` - 出力モード
fn process_line(worker: &mut Worker, index: usize, line: &str, mode: &OutputMode) -> String {
    match parse_line(worker, line) {
        Ok(()) => format_result(worker, index, mode),
        Err(e) => match mode {
            OutputMode::Auto | OutputMode::Deriv => format!("# ID={index} error: {e}\nEOS\n"),
            OutputMode::Json => {
                let value = json!({ "id": index, "error": e.to_string() });
                format!("{value}\n")
            }
        },
    }
}

fn parse_line(worker: &mut Worker, line: &str) -> Result<(), Box<dyn Error>> {
    let input: SentenceInput = serde_json::from_str(line)?;
    let tags = to_matrix(&input.tag)?;
    let deps = to_matrix(&input.dep)?;
    worker.reset_sentence(&input.tokens, tags, deps)?;
    if !input.constraints.is_empty() {
        let constraints: Vec<Constraint> =
            input.constraints.into_iter().map(Constraint::from).collect();
        worker.set_constraints(&constraints)?;
    }
    worker.parse();
    Ok(())
}

fn format_result(worker: &Worker, index: usize, mode: &OutputMode) -> String {
    match mode {
        OutputMode::Auto | OutputMode::Deriv => {
            let mut out = String::new();
            for i in 0..worker.num_parses() {
                let parse = worker.derivation(i).unwrap();
                let rendered = match mode {
                    OutputMode::Auto => parse.to_auto(),
                    _ => parse.to_deriv(),
                };
                out.push_str(&format!(
                    "ID={index}.{} log_prob={:.6}\n{rendered}\n",
                    i + 1,
                    parse.score(),
                ));
            }
            if let Some(diag) = worker.diagnostic() {
                out.push_str(&format!("# ID={index} diagnostic: {}\n", diag.code()));
            }
            out.push_str("EOS\n");
            out
        }
        OutputMode::Json => {
            let parses: Vec<serde_json::Value> = (0..worker.num_parses())
                .map(|i| {
                    let parse = worker.derivation(i).unwrap();
                    json!({ "score": parse.score(), "auto": parse.to_auto() })
                })
                .collect();
            let diagnostic = worker.diagnostic().map(|d| d.code());
            let value = json!({ "id": index, "parses": parses, "diagnostic": diagnostic });
            format!("{value}\n")
        }
    }
}

/// 文の一覧をワーカープールで解析する
///
/// 文はスレッドにラウンドロビンで割り当てられ、結果は入力順に
/// 整列されて返されます。各スレッドは独立したワーカーを保持します。
fn run_batch(
    parser: &CcgParser,
    lines: &[String],
    threads: usize,
    mode: &OutputMode,
) -> Vec<String> {
    if threads <= 1 {
        let mut worker = parser.new_worker();
        return lines
            .iter()
            .enumerate()
            .map(|(i, line)| process_line(&mut worker, i + 1, line, mode))
            .collect();
    }

    let mut outputs: Vec<String> = vec![String::new(); lines.len()];
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads);
        for t in 0..threads {
            let parser = parser.clone();
            let mode = mode.clone();
            handles.push(scope.spawn(move || {
                let mut worker = parser.new_worker();
                let mut results = Vec::new();
                for (i, line) in lines.iter().enumerate().skip(t).step_by(threads) {
                    results.push((i, process_line(&mut worker, i + 1, line, &mode)));
                }
                results
            }));
        }
        for handle in handles {
            for (i, output) in handle.join().expect("worker thread panicked") {
                outputs[i] = output;
            }
        }
    });
    outputs
}

/// メイン関数
///
/// 文法をロードし、標準入力から読み込んだ文を解析して、
/// 指定された形式で結果を標準出力に出力します。
///
/// # 戻り値
///
/// 実行が成功した場合は `Ok(())`、エラーが発生した場合はエラー情報
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    eprintln!("Loading the grammar...");
    let grammar = match (&args.grammar, &args.json_grammar) {
        (Some(path), _) => Grammar::read(File::open(path)?)?,
        (None, Some(path)) => GrammarBuilder::from_json_reader(File::open(path)?)?,
        (None, None) => return Err("either --grammar or --json-grammar is required".into()),
    };

    let parser = CcgParser::new(grammar)
        .nbest(args.nbest)
        .beta(args.beta)
        .use_beta(!args.disable_beta)
        .pruning_size(args.pruning_size)
        .use_seen_rules(args.seen_rules)
        .use_category_dict(args.category_dict)
        .max_length(args.max_length)
        .max_steps(args.max_steps);

    eprintln!("Ready to parse");

    let is_tty = std::io::stdout().is_terminal();
    let out = std::io::stdout();
    let mut out = BufWriter::new(out.lock());

    if args.threads <= 1 {
        // Stream line by line so that interactive use gets immediate output.
        let mut worker = parser.new_worker();
        for (i, line) in std::io::stdin().lock().lines().enumerate() {
            let line = line?;
            out.write_all(process_line(&mut worker, i + 1, &line, &args.output_mode).as_bytes())?;
            if is_tty {
                out.flush()?;
            }
        }
    } else {
        let lines: Vec<String> = std::io::stdin()
            .lock()
            .lines()
            .collect::<Result<_, _>>()?;
        for output in run_batch(&parser, &lines, args.threads, &args.output_mode) {
            out.write_all(output.as_bytes())?;
        }
    }

    Ok(())
}
