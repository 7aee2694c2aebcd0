//! Comment, processing-instruction and namespace construction, plus
//! where-populated filtering. All of them ground their content before
//! writing anything.

use crate::ast::Body;
use crate::context::ExecutionContext;
use crate::error::TransformError;
use crate::executor::{content_text, ground};
use crate::expr::{Avt, Expr};
use crate::output::{OutputSink, emit_grounded};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

pub(crate) fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}'))
}

/// Separates every pair of adjacent hyphens and a trailing hyphen with a
/// space, so the text can never close the comment early.
pub fn sanitize_comment(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if c == '-' && out.ends_with('-') {
            out.push(' ');
        }
        out.push(c);
    }
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

/// Breaks every `?>` so the data cannot terminate the instruction.
pub fn sanitize_pi_data(data: &str) -> String {
    data.replace("?>", "? >")
}

pub(crate) fn handle_comment(
    select: Option<&Expr>,
    body: &Body,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let text = content_text(select, body, ctx)?;
    out.comment(&sanitize_comment(&text));
    Ok(())
}

pub(crate) fn handle_processing_instruction(
    name: &Avt,
    select: Option<&Expr>,
    body: &Body,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let target = name.evaluate(ctx)?;
    let target = target.trim();
    if !is_ncname(target) {
        return Err(TransformError::construction(
            "XTDE0890",
            format!("'{}' is not a valid processing-instruction name", target),
        ));
    }
    if target.eq_ignore_ascii_case("xml") {
        return Err(TransformError::construction(
            "XTDE0890",
            format!("processing-instruction name '{}' is reserved", target),
        ));
    }

    let data = content_text(select, body, ctx)?;
    out.processing_instruction(target, &sanitize_pi_data(data.trim_start()));
    Ok(())
}

pub(crate) fn handle_namespace(
    name: &Avt,
    select: Option<&Expr>,
    body: &Body,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let prefix = name.evaluate(ctx)?;
    let prefix = prefix.trim();
    let uri = content_text(select, body, ctx)?;

    if prefix == "xmlns" || (!prefix.is_empty() && !is_ncname(prefix)) {
        return Err(TransformError::construction(
            "XTDE0920",
            format!("'{}' cannot be used as a namespace prefix", prefix),
        ));
    }
    if !prefix.is_empty() && uri.is_empty() {
        return Err(TransformError::construction(
            "XTDE0930",
            format!("namespace prefix '{}' cannot be bound to an empty URI", prefix),
        ));
    }
    if uri == XMLNS_NAMESPACE || ((prefix == "xml") != (uri == XML_NAMESPACE)) {
        return Err(TransformError::construction(
            "XTDE0925",
            format!("prefix '{}' cannot be bound to '{}'", prefix, uri),
        ));
    }

    out.namespace(prefix, &uri);
    Ok(())
}

pub(crate) fn handle_where_populated(
    body: &Body,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let buffer = ground(body, ctx)?;
    if buffer.is_empty() {
        log::debug!("where-populated: content empty, nothing emitted");
        return Ok(());
    }
    emit_grounded(&buffer, out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Instruction;
    use crate::context::StaticContext;
    use crate::expr;
    use crate::output::{ContentBuffer, OutputEvent, TextCollector};
    use std::sync::Arc;

    fn root() -> ExecutionContext {
        ExecutionContext::new(Arc::new(StaticContext::new())).unwrap()
    }

    fn run(instruction: Instruction) -> Result<ContentBuffer, TransformError> {
        let mut out = ContentBuffer::new();
        instruction.execute(&root(), &mut out)?;
        Ok(out)
    }

    fn namespace(prefix: &str, uri: &str) -> Instruction {
        Instruction::Namespace {
            name: prefix.into(),
            select: Some(expr::literal(uri)),
            body: Body::empty(),
        }
    }

    fn pi(name: &str, data: &str) -> Instruction {
        Instruction::ProcessingInstruction {
            name: name.into(),
            select: None,
            body: Body::from(Instruction::text(data)),
        }
    }

    #[test]
    fn test_comment_sanitizer() {
        assert_eq!(sanitize_comment("a--b-"), "a- -b- ");
        assert_eq!(sanitize_comment("---"), "- - - ");
        assert_eq!(sanitize_comment("plain"), "plain");
        assert_eq!(sanitize_comment(""), "");
    }

    #[test]
    fn test_comment_instruction() {
        let out = run(Instruction::comment(Instruction::text("x--y"))).unwrap();
        assert_eq!(out.events(), &[OutputEvent::Comment { text: "x- -y".into() }]);
    }

    #[test]
    fn test_pi_sanitizer() {
        assert_eq!(sanitize_pi_data("x?>y"), "x? >y");
        let out = run(pi("go", "  x?>y")).unwrap();
        assert_eq!(
            out.events(),
            &[OutputEvent::ProcessingInstruction {
                target: "go".into(),
                data: "x? >y".into()
            }]
        );
    }

    #[test]
    fn test_pi_target_validation() {
        for bad in ["xml", "XmL", "1abc", "", "a b"] {
            let err = run(pi(bad, "d")).unwrap_err();
            assert!(
                matches!(err, TransformError::Construction { code: "XTDE0890", .. }),
                "accepted '{bad}'"
            );
        }
        assert!(run(pi("xml-stylesheet", "d")).is_ok());
    }

    #[test]
    fn test_namespace_rules() {
        let err = run(namespace("foo", "")).unwrap_err();
        assert!(matches!(err, TransformError::Construction { code: "XTDE0930", .. }));
        assert!(!err.is_recoverable());

        let out = run(namespace("", "")).unwrap();
        assert_eq!(
            out.events(),
            &[OutputEvent::Namespace {
                prefix: String::new(),
                uri: String::new()
            }]
        );

        let out = run(namespace("p", "urn:p")).unwrap();
        assert_eq!(out.len(), 1);

        for (prefix, uri, code) in [
            ("xmlns", "urn:x", "XTDE0920"),
            ("a:b", "urn:x", "XTDE0920"),
            ("p", XMLNS_NAMESPACE, "XTDE0925"),
            ("xml", "urn:x", "XTDE0925"),
            ("other", XML_NAMESPACE, "XTDE0925"),
        ] {
            let err = run(namespace(prefix, uri)).unwrap_err();
            assert_eq!(err.error_code().as_deref(), Some(code), "{prefix} -> {uri}");
        }
        assert!(run(namespace("xml", XML_NAMESPACE)).is_ok());
    }

    #[test]
    fn test_namespace_uri_from_content() {
        let ns = Instruction::Namespace {
            name: "p".into(),
            select: None,
            body: Body::from(Instruction::text("urn:from-content")),
        };
        let out = run(ns).unwrap();
        assert_eq!(
            out.events(),
            &[OutputEvent::Namespace {
                prefix: "p".into(),
                uri: "urn:from-content".into()
            }]
        );
    }

    #[test]
    fn test_where_populated_empty_emits_nothing() {
        let out = run(Instruction::where_populated(vec![
            Instruction::text(""),
            Instruction::value_of(expr::empty()),
        ]))
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_where_populated_replay_matches_direct() {
        let content = || {
            vec![
                Instruction::element("p", Instruction::text("hi")),
                Instruction::comment(Instruction::text("c")),
            ]
        };
        let direct = run(Instruction::Sequence(content().into())).unwrap();
        let filtered = run(Instruction::where_populated(content())).unwrap();
        assert_eq!(direct, filtered);
    }

    #[test]
    fn test_where_populated_flattens_for_text_sink() {
        let instruction = Instruction::where_populated(vec![
            Instruction::element("p", Instruction::text("a")),
            Instruction::text("b"),
        ]);
        let mut text = TextCollector::new();
        instruction.execute(&root(), &mut text).unwrap();
        assert_eq!(text.as_str(), "ab");
    }
}
