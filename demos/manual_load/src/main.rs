//! コンパイル済み文法ファイルの書き出しと読み込みを行うデモ。

use std::fs::File;
use std::io::{BufReader, BufWriter};

use arpeggio::{Grammar, GrammarBuilder, Language, Parser, ScoreMatrix};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let json = r#"{
        "language": "ja",
        "categories": ["NP", "S[m]\\NP"],
        "unary_rules": [],
        "seen_rules": [["NP", "S[m]\\NP"]],
        "cat_dict": {"猫": ["NP"]},
        "roots": ["S[m]"]
    }"#;
    let grammar = GrammarBuilder::from_json_reader(json.as_bytes())?;

    // Round-trip through the compiled representation.
    let path = std::env::temp_dir().join("arpeggio_demo_grammar.bin");
    grammar.write(BufWriter::new(File::create(&path)?))?;
    let grammar = Grammar::read(BufReader::new(File::open(&path)?))?;
    println!(
        "loaded a {} grammar with {} supertags from {:?}",
        grammar.language().tag(),
        grammar.num_tags(),
        path
    );

    let parser = Parser::new(grammar);
    let mut worker = parser.new_worker();

    // "猫 走る": 猫 is NP, 走る is S[m]\NP; the verb heads the sentence.
    let tags = ScoreMatrix::from_vec(2, 2, vec![-0.1, -8.0, -8.0, -0.2])?;
    let deps = ScoreMatrix::from_vec(2, 3, vec![-4.0, -4.0, -0.3, -0.2, -4.0, -4.0])?;
    worker.reset_sentence(&["猫", "走る"], tags, deps)?;
    worker.parse();

    for i in 0..worker.num_parses() {
        let parse = worker.derivation(i).unwrap();
        println!("{:8.4}  {}", parse.score(), parse.to_auto());
    }
    Ok(())
}
