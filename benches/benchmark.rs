use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use gedtree::dates::DateValue;
use gedtree::matching::{find_duplicates, similarity, MatchParams};
use gedtree::records::RecordKind;
use gedtree::tree::Tree;

const FIRST_NAMES: [&str; 8] = [
    "Ivan", "Anna", "Petr", "Darya", "Nikolai", "Olga", "Sergei", "Maria",
];
const SURNAMES: [&str; 8] = [
    "Ivanov", "Petrov", "Sidorov", "Smirnov", "Kuznetsov", "Popov", "Volkov", "Orlov",
];

fn tree_with_individuals(count: usize) -> Tree {
    let mut tree = Tree::new();
    for n in 0..count {
        let person = tree.create_individual();
        let name = format!(
            "{} /{}/",
            FIRST_NAMES[n % FIRST_NAMES.len()],
            SURNAMES[(n / FIRST_NAMES.len()) % SURNAMES.len()]
        );
        tree.set_tag_value(person, "NAME", &name).unwrap();
        tree.set_tag_value(person, "SEX", if n % 2 == 0 { "M" } else { "F" })
            .unwrap();
        let birth = format!("{:02} JAN {}", n % 28 + 1, 1900 + (n % 100) as i32);
        tree.add_event(person, "BIRT", &birth, "").unwrap();
    }
    tree
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("parse simple date", |b| {
        b.iter(|| DateValue::parse(black_box("28 DEC 1990")))
    });
    c.bench_function("parse range date", |b| {
        b.iter(|| DateValue::parse(black_box("BET 04 JAN 2013 AND 25 JAN 2013")))
    });
    c.bench_function("parse hebrew date", |b| {
        b.iter(|| DateValue::parse(black_box("@#DHEBREW@ 01 TSH 5774")))
    });

    c.bench_function("similarity", |b| {
        b.iter(|| similarity(black_box("Ivan Ivanov"), black_box("Ivan Ivanovich")))
    });

    let small = tree_with_individuals(100);
    let text = small.save_to_string();
    c.bench_function("load 100", |b| {
        b.iter(|| {
            let mut tree = Tree::new();
            tree.load_from_str(black_box(&text)).unwrap();
            tree
        })
    });
    c.bench_function("save 100", |b| b.iter(|| small.save_to_string()));

    let params = MatchParams::default();
    c.bench_function("dedupe 100", |b| {
        b.iter(|| find_duplicates(&small, RecordKind::Individual, &params, 80.0, |_| {}))
    });
    let large = tree_with_individuals(1000);
    c.bench_function("dedupe 1k", |b| {
        b.iter(|| find_duplicates(&large, RecordKind::Individual, &params, 80.0, |_| {}))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
