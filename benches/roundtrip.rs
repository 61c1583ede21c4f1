use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rmlines::{read_tree, simple_text_document, write_file, WriteOptions};

fn bench_roundtrip(c: &mut Criterion) {
    let author = uuid::Uuid::new_v4();
    let paragraph = "The quick brown fox jumps over the lazy dog.\n".repeat(200);
    let blocks = simple_text_document(&paragraph, author);
    let data = write_file(&blocks, WriteOptions::default()).unwrap();

    c.bench_function("write_file/plain_text_200_lines", |b| {
        b.iter(|| write_file(black_box(&blocks), WriteOptions::default()).unwrap())
    });

    c.bench_function("read_tree/plain_text_200_lines", |b| {
        b.iter(|| read_tree(black_box(data.clone())).unwrap())
    });
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
