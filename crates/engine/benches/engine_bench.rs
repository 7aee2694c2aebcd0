use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sluice_engine::expr;
use sluice_engine::pattern;
use sluice_engine::test_helpers::{run_body, run_with};
use sluice_engine::{
    AccumulatorDefinition, AccumulatorRule, AnalyzeString, Body, CatchClause, Instruction,
    StaticContext, Value,
};
use sluice_traits::InMemoryResourceProvider;
use std::sync::Arc;

fn generate_items_xml(count: usize) -> String {
    let mut xml = String::from("<items>");
    for i in 0..count {
        xml.push_str(&format!(r#"<item amount="{}">Item {}</item>"#, i % 17, i));
    }
    xml.push_str("</items>");
    xml
}

fn streaming_statics(xml: &str) -> StaticContext {
    let provider = InMemoryResourceProvider::new()
        .with("items.xml", xml.as_bytes().to_vec())
        .unwrap();
    let total = AccumulatorDefinition::new("total", expr::literal(0_i64)).with_rule(
        AccumulatorRule::pre(
            pattern::parse("item").unwrap(),
            expr::from_fn(|ctx| {
                let value = ctx.variable(&"value".into()).and_then(Value::as_integer);
                let amount = expr::attribute("amount").evaluate(ctx)?.as_integer();
                Ok(Value::from(value.unwrap_or(0) + amount.unwrap_or(0)))
            }),
        ),
    );
    StaticContext::new()
        .with_resource_provider(Arc::new(provider))
        .with_accumulator(total)
}

fn analyze_body(text: String) -> Body {
    Body::from(Instruction::AnalyzeString(Box::new(
        AnalyzeString::new(expr::literal(text), "[0-9]+")
            .on_match(Instruction::element(
                "num",
                Instruction::value_of(expr::context_item()),
            ))
            .on_non_match(Instruction::value_of(expr::context_item())),
    )))
}

fn benchmark_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_streaming");

    for item_count in [10, 100, 1000] {
        let xml = generate_items_xml(item_count);
        let body = Body::from(Instruction::stream(
            "items.xml",
            Instruction::value_of(expr::accumulator("total")),
        ));

        group.bench_with_input(
            BenchmarkId::new("accumulate", item_count),
            &xml,
            |b, xml| b.iter(|| run_with(&body, streaming_statics(xml), None).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_analyze_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_analyze_string");

    for text_len in [100, 1000, 10000] {
        let text: String = (0..text_len)
            .map(|i| if i % 5 == 0 { '0' } else { 'a' })
            .collect();
        let body = analyze_body(text);

        group.bench_with_input(BenchmarkId::new("split", text_len), &body, |b, body| {
            b.iter(|| run_body(body).unwrap())
        });
    }

    group.finish();
}

fn benchmark_grounding(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_grounding");

    let rows: Vec<Instruction> = (0..200)
        .map(|i| Instruction::element("row", Instruction::text(format!("cell {}", i))))
        .collect();
    let populated = Body::from(Instruction::where_populated(rows));
    group.bench_function("where_populated", |b| b.iter(|| run_body(&populated).unwrap()));

    let rollback = Body::from(Instruction::Try {
        body: Body::from(vec![
            Instruction::text("partial"),
            Instruction::value_of(expr::raise("FOER0000", "fail")),
        ]),
        catches: vec![CatchClause::any(Instruction::text("recovered"))],
        rollback_output: true,
    });
    group.bench_function("try_rollback", |b| b.iter(|| run_body(&rollback).unwrap()));

    group.finish();
}

criterion_group!(
    benches,
    benchmark_streaming,
    benchmark_analyze_string,
    benchmark_grounding
);
criterion_main!(benches);
