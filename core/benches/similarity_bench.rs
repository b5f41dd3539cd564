use criterion::{criterion_group, criterion_main, Criterion};
use ufsaco_core::{SearchParams, SimilarityMatrix, TermIndex, Ufsaco};

fn synthetic_index(docs: usize, vocabulary: usize) -> TermIndex {
    let mut index = TermIndex::new();
    for d in 0..docs {
        let tokens: Vec<String> = (0..40).map(|i| format!("t{}", (d * 7 + i * i) % vocabulary)).collect();
        index.ingest(format!("d{d}"), tokens, if d % 2 == 0 { "even" } else { "odd" });
    }
    index
}

fn bench_similarity(c: &mut Criterion) {
    let index = synthetic_index(500, 2_000);
    c.bench_function("similarity_compute_all", |b| b.iter(|| SimilarityMatrix::compute_all(&index)));
}

fn bench_search(c: &mut Criterion) {
    let index = synthetic_index(200, 800);
    let similarity = SimilarityMatrix::compute_all(&index);
    let params = SearchParams { cycles: 5, ..SearchParams::new(10, 20) };
    c.bench_function("ufsaco_search", |b| {
        b.iter(|| {
            let mut engine = Ufsaco::new(&index, &similarity, params);
            engine.search_subset_seeded(7)
        })
    });
}

criterion_group!(benches, bench_similarity, bench_search);
criterion_main!(benches);
