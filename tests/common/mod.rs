use sluice::{
    AccumulatorDefinition, AccumulatorRule, Expr, InMemoryResourceProvider, Item, Transformer,
    TransformerBuilder, Value, expr, pattern,
};
use std::sync::Arc;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A small order feed with whitespace between elements.
pub fn orders_xml() -> &'static str {
    r#"<?xml version="1.0"?>
<orders>
  <order id="a" amount="10">first</order>
  <order id="b" amount="32">second</order>
  <!-- trailing -->
</orders>"#
}

pub fn provider_with(documents: &[(&str, &str)]) -> Arc<InMemoryResourceProvider> {
    let provider = InMemoryResourceProvider::new();
    for (path, xml) in documents {
        provider.add(*path, *xml).expect("valid resource path");
    }
    Arc::new(provider)
}

/// True when the context item is an element named `name`.
pub fn is_element(name: &'static str) -> Expr {
    expr::from_fn(move |ctx| {
        Ok(Value::from(matches!(
            ctx.item(),
            Some(Item::Node(node)) if node.is_element() && node.local_name() == Some(name)
        )))
    })
}

/// Running sum of the `amount` attribute over `order` elements.
pub fn amount_total(name: &str) -> AccumulatorDefinition {
    AccumulatorDefinition::new(name, expr::literal(0_i64)).with_rule(AccumulatorRule::pre(
        pattern::parse("order").expect("valid pattern"),
        expr::from_fn(|ctx| {
            let total = ctx.variable(&"value".into()).and_then(Value::as_integer);
            let amount = expr::attribute("amount").evaluate(ctx)?.as_integer();
            Ok(Value::from(total.unwrap_or(0) + amount.unwrap_or(0)))
        }),
    ))
}

pub fn build(builder: TransformerBuilder) -> Transformer {
    builder.build().expect("transformer builds")
}
