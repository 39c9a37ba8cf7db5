//! 文法資源をコンパイルするユーティリティ
//!
//! このバイナリは、プレーンテキストまたはJSON形式の文法資源を読み込み、
//! 高速に起動できる単一のコンパイル済み文法ファイルに変換します。

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::PathBuf;

use arpeggio::{GrammarBuilder, Language};

use clap::Parser;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(name = "compiler", about = "Compiles grammar resources")]
struct Args {
    /// Language of the grammar (en or ja).
    #[clap(short, long, default_value = "en")]
    lang: String,

    /// Supertag inventory file (one category per line).
    #[clap(short = 't', long)]
    tag_list: Option<PathBuf>,

    /// Unary rule file (child and parent per line).
    #[clap(short = 'u', long)]
    unary_rules: Option<PathBuf>,

    /// Seen rule file (left and right per line).
    #[clap(short = 's', long)]
    seen_rules: Option<PathBuf>,

    /// Category dictionary file (surface form and categories per line).
    #[clap(short = 'd', long)]
    cat_dict: Option<PathBuf>,

    /// Combined JSON grammar file (alternative to the text resources).
    #[clap(long)]
    json: Option<PathBuf>,

    /// Output file for the compiled grammar.
    #[clap(short = 'o', long)]
    output: PathBuf,
}

/// パスが指定されていればファイルを、なければ空のリーダーを返す
fn reader_or_empty(path: &Option<PathBuf>) -> Result<Box<dyn Read>, std::io::Error> {
    match path {
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        None => Ok(Box::new(std::io::empty())),
    }
}

/// メイン関数
///
/// 文法資源を読み込んでコンパイルし、指定されたファイルに書き出します。
///
/// # 戻り値
///
/// 実行が成功した場合は `Ok(())`、エラーが発生した場合はエラー情報
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    eprintln!("Compiling the grammar...");
    let grammar = match &args.json {
        Some(path) => GrammarBuilder::from_json_reader(BufReader::new(File::open(path)?))?,
        None => {
            let tag_list = args
                .tag_list
                .as_ref()
                .ok_or("either --json or --tag-list is required")?;
            let language: Language = args.lang.parse()?;
            GrammarBuilder::from_readers(
                language,
                BufReader::new(File::open(tag_list)?),
                reader_or_empty(&args.unary_rules)?,
                reader_or_empty(&args.seen_rules)?,
                reader_or_empty(&args.cat_dict)?,
            )?
        }
    };

    eprintln!(
        "Compiled a {} grammar with {} supertags",
        grammar.language().tag(),
        grammar.num_tags()
    );

    let mut wtr = BufWriter::new(File::create(&args.output)?);
    grammar.write(&mut wtr)?;
    eprintln!("Wrote the compiled grammar to {:?}", args.output);

    Ok(())
}
