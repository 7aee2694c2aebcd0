//! Streams an in-memory order feed, keeps a running total with an
//! accumulator, and prints the resulting event log as JSON.
//!
//! Run with: `RUST_LOG=debug cargo run --example stream_totals`

use sluice::{
    AccumulatorDefinition, AccumulatorRule, Body, InMemoryResourceProvider, Instruction, Item,
    SluiceError, Transformer, Value, expr, pattern,
};
use std::sync::Arc;

const ORDERS: &str = r#"<?xml version="1.0"?>
<orders>
  <order id="A-1" amount="120"/>
  <order id="A-2" amount="75"/>
  <order id="B-7" amount="310"/>
</orders>"#;

fn running_total() -> Result<AccumulatorDefinition, SluiceError> {
    let rule = AccumulatorRule::pre(
        pattern::parse("order")?,
        expr::from_fn(|ctx| {
            let total = ctx.variable(&"value".into()).and_then(Value::as_integer);
            let amount = expr::attribute("amount").evaluate(ctx)?.as_integer();
            Ok(Value::from(total.unwrap_or(0) + amount.unwrap_or(0)))
        }),
    );
    Ok(AccumulatorDefinition::new("total", expr::literal(0_i64)).with_rule(rule))
}

fn order_row() -> Instruction {
    Instruction::If {
        test: expr::from_fn(|ctx| {
            Ok(Value::from(matches!(
                ctx.item(),
                Some(Item::Node(node)) if node.local_name() == Some("order")
            )))
        }),
        body: Body::from(Instruction::element(
            "row",
            vec![
                Instruction::Attribute {
                    name: "id".into(),
                    select: Some(expr::attribute("id")),
                    body: Body::empty(),
                },
                Instruction::value_of(expr::accumulator("total")),
            ],
        )),
    }
}

fn main() -> Result<(), SluiceError> {
    env_logger::init();

    let provider = InMemoryResourceProvider::new().with("orders.xml", ORDERS)?;
    let transformer = Transformer::builder()
        .with_resource_provider(Arc::new(provider))
        .with_accumulator(running_total()?)
        .with_body(Instruction::element(
            "totals",
            Instruction::stream("orders.xml", order_row()),
        ))
        .build()?;

    println!("{}", transformer.transform_to_json(None)?);
    Ok(())
}
