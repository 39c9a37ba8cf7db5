//! 文字列リテラルの文法資源からパーサーを組み立てて1文を解析するデモ。

use arpeggio::{GrammarBuilder, Language, Parser, ScoreMatrix};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tag_list = "NP\nN\nS[dcl]\\NP\nNP/N";
    let unary_rules = "N NP";
    let seen_rules = "NP S[dcl]\\NP\nNP/N N";
    let cat_dict = "the NP/N";

    let grammar = GrammarBuilder::from_readers(
        Language::English,
        tag_list.as_bytes(),
        unary_rules.as_bytes(),
        seen_rules.as_bytes(),
        cat_dict.as_bytes(),
    )?;

    let parser = Parser::new(grammar).nbest(3);
    let mut worker = parser.new_worker();

    // "John runs": John is NP, runs is S[dcl]\NP. John's head is runs and
    // the head of runs is ROOT.
    let tags = ScoreMatrix::from_vec(
        2,
        4,
        vec![
            -0.1, -2.5, -9.0, -9.0, //
            -9.0, -9.0, -0.2, -9.0,
        ],
    )?;
    let deps = ScoreMatrix::from_vec(2, 3, vec![-4.0, -4.0, -0.3, -0.2, -4.0, -4.0])?;

    worker.reset_sentence(&["John", "runs"], tags, deps)?;
    worker.parse();

    for i in 0..worker.num_parses() {
        let parse = worker.derivation(i).unwrap();
        println!("{:2}: {:8.4}  {}", i + 1, parse.score(), parse.to_auto());
    }
    if let Some(diag) = worker.diagnostic() {
        println!("diagnostic: {}", diag.code());
    }
    Ok(())
}
