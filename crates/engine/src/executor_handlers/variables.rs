use crate::ast::Body;
use crate::context::{ExecutionContext, VarName};
use crate::error::TransformError;
use crate::executor::content_text;
use crate::expr::Expr;
use crate::value::Value;

/// The value a variable binds: `select` when present, otherwise the text of
/// its content, otherwise the empty sequence.
pub(crate) fn evaluate_variable(
    name: &VarName,
    select: Option<&Expr>,
    body: &Body,
    ctx: &ExecutionContext,
) -> Result<Value, TransformError> {
    let value = match select {
        Some(select) => select.evaluate(ctx)?,
        None if body.is_empty() => Value::empty(),
        None => Value::from(content_text(None, body, ctx)?),
    };
    log::trace!("binding ${} to '{}'", name, value);
    Ok(value)
}
