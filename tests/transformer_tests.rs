mod common;

use common::{TestResult, build, init_logger};
use sluice::{
    Body, CatchClause, Instruction, Item, OutputEvent, SluiceError, Streamability, Transformer,
    TransformError, expr,
};

fn failing_try(rollback_output: bool) -> Instruction {
    Instruction::Try {
        body: Body::from(vec![
            Instruction::text("partial;"),
            Instruction::value_of(expr::raise("FOER0000", "gave up")),
        ]),
        catches: vec![CatchClause::any(Instruction::text("recovered"))],
        rollback_output,
    }
}

#[test]
fn test_build_requires_body() {
    let err = Transformer::builder().build().unwrap_err();
    assert!(matches!(err, SluiceError::Config(_)));
}

#[test]
fn test_transform_to_text() -> TestResult {
    init_logger();
    let transformer = build(Transformer::builder().with_body(vec![
        Instruction::text("total: "),
        Instruction::value_of(expr::literal(42_i64)),
    ]));
    assert_eq!(transformer.transform_to_text(None)?, "total: 42");
    Ok(())
}

#[test]
fn test_initial_context_item() -> TestResult {
    let transformer =
        build(Transformer::builder().with_body(Instruction::value_of(expr::context_item())));
    assert_eq!(transformer.transform_to_text(Some(Item::from("seed")))?, "seed");

    let err = transformer.transform_to_text(None).unwrap_err();
    assert_eq!(err.error_code().as_deref(), Some("XPDY0002"));
    Ok(())
}

#[test]
fn test_global_variables() -> TestResult {
    let transformer = build(
        Transformer::builder()
            .with_global_variable("greeting", expr::literal("hi"))
            .with_body(Instruction::value_of(expr::variable("greeting"))),
    );
    assert_eq!(transformer.transform_to_text(None)?, "hi");
    Ok(())
}

#[test]
fn test_events_and_json() -> TestResult {
    let transformer = build(Transformer::builder().with_body(Instruction::element(
        "p",
        Instruction::comment(Instruction::text("a--b")),
    )));

    let events = transformer.transform_to_events(None)?;
    assert!(matches!(events.events()[0], OutputEvent::StartElement { .. }));
    assert_eq!(
        events.events()[1],
        OutputEvent::Comment {
            text: "a- -b".into()
        }
    );

    let json = transformer.transform_to_json(None)?;
    assert!(json.contains(r#""event":"comment""#));
    assert!(json.contains("a- -b"));
    Ok(())
}

#[test]
fn test_uncaught_failure_reports_code() {
    let transformer = build(
        Transformer::builder().with_body(Instruction::value_of(expr::raise("FOER0000", "boom"))),
    );
    let err = transformer.transform_to_text(None).unwrap_err();
    assert!(matches!(err, SluiceError::Transform(TransformError::Dynamic { .. })));
    assert_eq!(err.error_code().as_deref(), Some("FOER0000"));
}

#[test]
fn test_try_output_rollback() -> TestResult {
    let kept = build(Transformer::builder().with_body(failing_try(false)));
    assert_eq!(kept.transform_to_text(None)?, "partial;recovered");

    let rolled_back = build(Transformer::builder().with_body(failing_try(true)));
    assert_eq!(rolled_back.transform_to_text(None)?, "recovered");
    Ok(())
}

#[test]
fn test_streamability_reported() {
    let direct = build(Transformer::builder().with_body(Instruction::text("x")));
    assert_eq!(direct.streamability(), Streamability::Full);

    let grounded = build(
        Transformer::builder().with_body(Instruction::where_populated(Instruction::text("x"))),
    );
    assert_eq!(grounded.streamability(), Streamability::Grounded);
}
