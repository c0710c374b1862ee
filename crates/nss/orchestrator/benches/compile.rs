//! End-to-end compile throughput over a synthetic nested stylesheet.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use nss_orchestrator::compile_tree;
use nss_tree::Options;
use nss_tree::tree::selector::{Combinator, Element, Selector};
use nss_tree::tree::{Declaration, Dimension, Keyword, Media, Rule, Ruleset, Value};
use std::hint::black_box;

fn simple(name: &str) -> Selector {
    Selector::new(vec![Element::ident(Combinator::none(), name)])
}

fn declaration(name: &str, value: Value) -> Rule {
    Rule::Declaration(Declaration::new(name, value))
}

/// A sheet with the shapes that dominate real input: nested rulesets,
/// parent references and a sprinkling of hoisted blocks.
fn build_sheet() -> Ruleset {
    let mut rules = Vec::with_capacity(120);
    for index in 0..100u32 {
        let hover = Selector::new(vec![
            Element::parent(Combinator::none()),
            Element::ident(Combinator::none(), ":hover"),
        ]);
        rules.push(Rule::Ruleset(Ruleset::new(
            vec![simple(&format!(".item-{index}"))],
            vec![
                declaration(
                    "width",
                    Value::Dimension(Dimension::with_unit(f64::from(index), "px")),
                ),
                Rule::Ruleset(Ruleset::new(
                    vec![hover],
                    vec![declaration("color", Value::Keyword(Keyword::new("red")))],
                )),
            ],
        )));
    }
    for index in 0..10u32 {
        let body = Ruleset::new(
            Vec::new(),
            vec![Rule::Ruleset(Ruleset::new(
                vec![simple(&format!(".narrow-{index}"))],
                vec![declaration("display", Value::Keyword(Keyword::new("none")))],
            ))],
        );
        rules.push(Rule::Media(Media::new(
            Value::Keyword(Keyword::new("screen")),
            body,
        )));
    }
    Ruleset::root(rules)
}

fn compile_benchmark(criterion: &mut Criterion) {
    let options = Options::default();
    criterion.bench_function("compile_nested_sheet", |bencher| {
        bencher.iter_batched(
            build_sheet,
            |root| black_box(compile_tree(root, &options)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, compile_benchmark);
criterion_main!(benches);
