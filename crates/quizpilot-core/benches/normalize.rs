use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizpilot_core::memory::{MemoryMap, MemoryRepository};
use quizpilot_core::store::InMemoryStore;
use quizpilot_core::text::{normalize, same_text, QuestionKey};

const SHORT: &str = "Hàng hóa có mấy thuộc tính?";

fn long_question() -> String {
    "Theo quan điểm của kinh tế chính trị Mác - Lênin, “giá trị” của hàng hóa được quyết định bởi: "
        .repeat(8)
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let long = long_question();

    group.bench_function("short", |b| b.iter(|| normalize(black_box(SHORT))));
    group.bench_function("long", |b| b.iter(|| normalize(black_box(&long))));
    group.bench_function("question_key_long", |b| {
        b.iter(|| QuestionKey::from_question(black_box(&long)))
    });

    let a = normalize("Giá trị sử dụng");
    let z = normalize("gia tri su dung.");
    group.bench_function("same_text", |b| b.iter(|| same_text(black_box(&a), black_box(&z))));

    group.finish();
}

fn bench_merge_options(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory");
    let options: Vec<String> = (0..4).map(|i| format!("Phương án số {i}")).collect();

    group.bench_function("merge_options_existing", |b| {
        let repo = MemoryRepository::new(Arc::new(InMemoryStore::<MemoryMap>::new()));
        let key = QuestionKey::from_question(SHORT);
        repo.merge_options(&key, &options).unwrap();
        b.iter(|| repo.merge_options(black_box(&key), black_box(&options)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_merge_options);
criterion_main!(benches);
