// Word counting: the table against hashbrown::HashMap on the same text.
//
// The text is synthetic: words drawn from a Zipf-ish vocabulary so a few
// keys are updated very often and many appear once.
use chained_hashtable::{djb2, FnOps, Table};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn corpus(words: usize) -> String {
    let vocab: Vec<String> = (0..20_000u32).map(|i| format!("w{:x}", i)).collect();
    let mut text = String::with_capacity(words * 7);
    for x in lcg(42).take(words) {
        // Squaring a uniform fraction skews picks toward the front.
        let f = (x >> 11) as f64 / (1u64 << 53) as f64;
        let i = ((f * f) * vocab.len() as f64) as usize;
        text.push_str(&vocab[i.min(vocab.len() - 1)]);
        text.push(' ');
    }
    text
}

fn count_table(text: &str) -> usize {
    let ops = FnOps::new(
        |k: &&str| djb2(k.as_bytes()),
        |a: &&str, b: &&str| a == b,
    );
    let mut t: Table<&str, u32, _> = Table::with_ops(ops).unwrap();
    for w in text.split_ascii_whitespace() {
        match t.get_mut(&w) {
            Some(n) => *n += 1,
            None => {
                t.insert(w, 1).unwrap();
            }
        }
    }
    t.len()
}

fn count_hashbrown(text: &str) -> usize {
    let mut m: hashbrown::HashMap<&str, u32> = hashbrown::HashMap::new();
    for w in text.split_ascii_whitespace() {
        *m.entry(w).or_insert(0) += 1;
    }
    m.len()
}

fn bench_wordcount(c: &mut Criterion) {
    let text = corpus(200_000);
    assert_eq!(count_table(&text), count_hashbrown(&text));

    let mut group = c.benchmark_group("wordcount_200k");
    group.bench_function("table", |b| b.iter(|| black_box(count_table(&text))));
    group.bench_function("hashbrown", |b| b.iter(|| black_box(count_hashbrown(&text))));
    group.finish();
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(30)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_wordcount
}
criterion_main!(benches);
