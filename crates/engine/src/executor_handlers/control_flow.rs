//! Control flow execution: if, choose/when/otherwise, try/catch.

use crate::ast::{Body, CatchClause, When};
use crate::context::{ExecutionContext, StaticContext, VarName};
use crate::error::TransformError;
use crate::executor::ground;
use crate::expr::Expr;
use crate::output::OutputSink;
use crate::value::Value;

/// What a catch handler sees of the failure it intercepted.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub code: Option<String>,
    pub description: String,
    pub value: Option<String>,
    pub module: Option<String>,
    pub line_number: Option<i64>,
    pub column_number: Option<i64>,
}

impl ErrorInfo {
    pub fn from_error(error: &TransformError, statics: &StaticContext) -> Self {
        Self {
            code: error.error_code(),
            description: error.to_string(),
            value: error.value().map(str::to_string),
            module: statics.base_uri().map(str::to_string),
            line_number: None,
            column_number: None,
        }
    }

    /// The six `err:*` bindings; absent parts bind the empty sequence.
    pub fn bindings(&self) -> Vec<(VarName, Value)> {
        fn opt<T: Into<Value>>(v: Option<T>) -> Value {
            v.map(Into::into).unwrap_or_default()
        }
        vec![
            (VarName::err("code"), opt(self.code.clone())),
            (VarName::err("description"), Value::from(self.description.as_str())),
            (VarName::err("value"), opt(self.value.clone())),
            (VarName::err("module"), opt(self.module.clone())),
            (VarName::err("line-number"), opt(self.line_number)),
            (VarName::err("column-number"), opt(self.column_number)),
        ]
    }
}

fn guard(test: &Expr, ctx: &ExecutionContext, construct: &'static str) -> Result<bool, TransformError> {
    test.evaluate(ctx)
        .and_then(|value| value.effective_boolean())
        .map_err(|e| e.in_construct(construct))
}

pub(crate) fn handle_if(
    test: &Expr,
    body: &Body,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    if guard(test, ctx, "xsl:if")? {
        body.execute(ctx, out)?;
    }
    Ok(())
}

pub(crate) fn handle_choose(
    whens: &[When],
    otherwise: Option<&Body>,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let mut matched = false;
    for (index, when) in whens.iter().enumerate() {
        if guard(&when.test, ctx, "xsl:when")? {
            log::debug!("choose: branch {} taken", index + 1);
            when.body.execute(ctx, out)?;
            matched = true;
            break;
        }
    }
    if !matched && let Some(otherwise_body) = otherwise {
        log::debug!("choose: otherwise taken");
        otherwise_body.execute(ctx, out)?;
    }
    Ok(())
}

pub(crate) fn handle_try(
    body: &Body,
    catches: &[CatchClause],
    rollback_output: bool,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    if rollback_output {
        handle_try_with_rollback(body, catches, ctx, out)
    } else {
        handle_try_without_rollback(body, catches, ctx, out)
    }
}

fn handle_try_without_rollback(
    body: &Body,
    catches: &[CatchClause],
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    match body.execute(ctx, out) {
        Ok(()) => Ok(()),
        Err(e) => handle_catch(catches, e, ctx, out),
    }
}

fn handle_try_with_rollback(
    body: &Body,
    catches: &[CatchClause],
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    match ground(body, ctx) {
        Ok(buffer) => {
            buffer.replay_into(out);
            Ok(())
        }
        Err(e) => {
            log::debug!("try: discarding partial output after failure");
            handle_catch(catches, e, ctx, out)
        }
    }
}

fn handle_catch(
    catches: &[CatchClause],
    error: TransformError,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    if !error.is_recoverable() {
        return Err(error);
    }
    if catches.is_empty() {
        log::debug!("try without catch rules swallowed: {}", error);
        return Ok(());
    }

    let info = ErrorInfo::from_error(&error, ctx.static_context());
    for catch in catches {
        if catch.matches(info.code.as_deref()) {
            log::debug!("caught {}", error);
            let handler_ctx = ctx.with_bindings(info.bindings());
            return catch.body.execute(&handler_ctx, out);
        }
    }

    Err(error)
}
