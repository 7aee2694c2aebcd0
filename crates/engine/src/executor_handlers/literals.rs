//! Leaf constructs that write text, elements and attributes.

use crate::ast::Body;
use crate::context::ExecutionContext;
use crate::error::TransformError;
use crate::executor::content_text;
use crate::executor_handlers::markup::is_ncname;
use crate::expr::{Avt, Expr};
use crate::output::OutputSink;
use crate::streaming::QName;

pub(crate) fn handle_text(text: &str, out: &mut dyn OutputSink) -> Result<(), TransformError> {
    if !text.is_empty() {
        out.text(text);
    }
    Ok(())
}

pub(crate) fn handle_character_reference(
    c: char,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let mut buf = [0u8; 4];
    out.text(c.encode_utf8(&mut buf));
    Ok(())
}

pub(crate) fn handle_value_of(
    select: &Expr,
    separator: Option<&Avt>,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let value = select.evaluate(ctx)?;
    let separator = match separator {
        Some(avt) => avt.evaluate(ctx)?,
        None => " ".to_string(),
    };
    let text = value.join(&separator);
    if !text.is_empty() {
        out.text(&text);
    }
    Ok(())
}

pub(crate) fn handle_literal_element(
    name: &QName,
    attributes: &[(QName, Avt)],
    body: &Body,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    out.start_element(name);
    for (attr_name, avt) in attributes {
        let value = avt.evaluate(ctx)?;
        out.attribute(attr_name, &value);
    }
    body.execute(ctx, out)?;
    out.end_element(name);
    Ok(())
}

pub(crate) fn handle_attribute(
    name: &Avt,
    select: Option<&Expr>,
    body: &Body,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let lexical = name.evaluate(ctx)?;
    if !is_qname(&lexical) {
        return Err(TransformError::construction(
            "XTDE0850",
            format!("'{}' is not a valid attribute name", lexical),
        ));
    }
    let value = content_text(select, body, ctx)?;
    out.attribute(&QName::parse(&lexical), &value);
    Ok(())
}

fn is_qname(lexical: &str) -> bool {
    match lexical.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(lexical),
    }
}
