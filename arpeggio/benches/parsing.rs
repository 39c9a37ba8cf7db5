//! 小さな文法を用いたA*解析のベンチマーク
//!
//! 曖昧性のある短い文に対して、ワーカーを再利用しながら1-bestと
//! N-bestの解析速度を計測します。

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use arpeggio::{Grammar, GrammarBuilder, Language, Parser, ScoreMatrix};

const NUM_TAGS: usize = 6;

fn bench_grammar() -> Grammar {
    GrammarBuilder::from_readers(
        Language::English,
        "NP\nN\nS[dcl]\\NP\nNP/N\nN/N\nN\\N\n".as_bytes(),
        "N NP\n".as_bytes(),
        "".as_bytes(),
        "".as_bytes(),
    )
    .unwrap_or_else(|e| panic!("Failed to build the benchmark grammar: {e}"))
}

/// 名詞句の列からなる曖昧な文のスコアを構築します。
fn ambiguous_sentence(n: usize) -> (Vec<String>, ScoreMatrix, ScoreMatrix) {
    let tokens: Vec<String> = (0..n).map(|i| format!("w{i}")).collect();
    let mut tags = vec![-1e10f32; n * NUM_TAGS];
    for i in 0..n - 1 {
        tags[i * NUM_TAGS + 4] = -0.1; // N/N
        tags[i * NUM_TAGS + 5] = -0.9; // N\N
    }
    tags[(n - 1) * NUM_TAGS + 1] = -0.1; // N
    let tags = ScoreMatrix::from_vec(n, NUM_TAGS, tags).unwrap();
    let deps = ScoreMatrix::zeros(n, n + 1);
    (tokens, tags, deps)
}

fn benchmark_parsing(c: &mut Criterion) {
    let parser = Parser::new(bench_grammar())
        .possible_root_cats(&["N", "NP"])
        .unwrap();

    let mut group = c.benchmark_group("Parsing Speed");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(10));

    for n in [4usize, 8, 12] {
        let (tokens, tags, deps) = ambiguous_sentence(n);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(BenchmarkId::new("1-best", n), |b| {
            b.iter_with_setup(
                || parser.new_worker(),
                |mut worker| {
                    worker
                        .reset_sentence(&tokens, tags.clone(), deps.clone())
                        .unwrap();
                    worker.parse();
                    assert!(worker.num_parses() > 0);
                },
            );
        });

        let nbest_parser = parser.clone().nbest(5);
        group.bench_function(BenchmarkId::new("5-best", n), |b| {
            b.iter_with_setup(
                || nbest_parser.new_worker(),
                |mut worker| {
                    worker
                        .reset_sentence(&tokens, tags.clone(), deps.clone())
                        .unwrap();
                    worker.parse();
                    assert!(worker.num_parses() > 0);
                },
            );
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_parsing);
criterion_main!(benches);
