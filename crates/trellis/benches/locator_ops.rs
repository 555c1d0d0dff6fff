//! Locator Operations Benchmarks
//!
//! Benchmarks for locator composition, compilation and fixture resolution.
//!
//! Run with: `cargo bench --bench locator_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis::locator::predicate::{attr, css_classes, id, last, text};
use trellis::mock::{ElementSpec, FixtureDom};
use trellis::prelude::*;

fn chain(depth: usize) -> Locator {
    let mut locator = Locator::descendant("main", [id("app")]);
    for level in 0..depth {
        locator = locator.then_child("div", [css_classes([format!("level-{level}")])]);
    }
    locator
}

fn bench_locator_composition(c: &mut Criterion) {
    let mut group = c.benchmark_group("locator_composition");

    for depth in [1, 3, 5, 10] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("depth_{depth}")),
            &depth,
            |bench, &d| {
                bench.iter(|| black_box(chain(black_box(d))));
            },
        );
    }

    group.finish();
}

fn bench_locator_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("locator_compilation");

    let cases = vec![
        ("css_id", Locator::descendant("button", [id("submit")])),
        (
            "css_attributes",
            Locator::descendant("a", [attr("href").starts_with("https"), attr("rel").whole_word("noopener")]),
        ),
        ("css_deep", chain(8)),
        (
            "xpath_text",
            Locator::descendant("td", [text().is("Total")]).next_sibling("td", []),
        ),
        ("xpath_position", chain(4).then_child("span", [last()])),
        (
            "xpath_quotes",
            Locator::descendant("li", [attr("title").is("it's \"quoted\"")]).with_dialect(Dialect::XPath),
        ),
    ];

    for (name, locator) in cases {
        for scoped in [false, true] {
            group.bench_with_input(
                BenchmarkId::new(name, if scoped { "scoped" } else { "document" }),
                &locator,
                |bench, loc| {
                    bench.iter(|| black_box(loc.compile(black_box(scoped)).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_fixture_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixture_resolution");

    for rows in [10, 50, 200] {
        let dom = FixtureDom::new();
        let items = (0..rows).map(|n| {
            ElementSpec::new("li")
                .class("row")
                .attr("data-n", &n.to_string())
                .text(&format!("row {n}"))
        });
        dom.append(&dom.document(), ElementSpec::new("ul").id("list").children(items))
            .unwrap();
        let page = Page::new(Session::new(dom, TrellisConfig::default()));
        let collection: ComponentCollection<GenericComponent> = page
            .collection(Locator::descendant("ul", [id("list")]).then_child("li", [css_classes(["row"])]))
            .unwrap();

        group.bench_with_input(BenchmarkId::new("enumerate", rows), &collection, |bench, col| {
            bench.iter(|| black_box(col.len().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("by_key_last", rows), &collection, |bench, col| {
            let key = format!("row {}", rows - 1);
            bench.iter(|| black_box(col.by_key(&key).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_locator_composition,
    bench_locator_compilation,
    bench_fixture_resolution
);
criterion_main!(benches);
