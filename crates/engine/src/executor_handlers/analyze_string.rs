use crate::ast::{AnalyzeString, Body};
use crate::context::{ExecutionContext, RegexMatch};
use crate::error::TransformError;
use crate::output::OutputSink;

/// Splits the string value of `select` into alternating non-matching and
/// matching runs, left to right, without overlap.
pub(crate) fn handle_analyze_string(
    analyze: &AnalyzeString,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let input = analyze.select.evaluate(ctx)?.as_string();
    let pattern = analyze.regex.evaluate(ctx)?;
    let flags = match &analyze.flags {
        Some(flags) => flags.evaluate(ctx)?,
        None => String::new(),
    };
    let regex = analyze.cache.get_or_compile(&pattern, &flags)?;

    let mut last_end = 0;
    for captures in regex.captures_iter(&input) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.start() == whole.end() {
            return Err(TransformError::dynamic(
                "XTDE1150",
                format!(
                    "regular expression '{}' matched a zero-length string at offset {}",
                    pattern,
                    whole.start()
                ),
            ));
        }
        if whole.start() > last_end {
            run_non_matching(
                analyze.non_matching.as_ref(),
                &input[last_end..whole.start()],
                ctx,
                out,
            )?;
        }
        if let Some(body) = &analyze.matching {
            let regex_match = RegexMatch::from_captures(&captures, &regex);
            let match_ctx = ctx
                .with_item(whole.as_str())
                .with_regex_match(Some(regex_match));
            body.execute(&match_ctx, out)?;
        }
        last_end = whole.end();
    }

    if last_end < input.len() {
        run_non_matching(analyze.non_matching.as_ref(), &input[last_end..], ctx, out)?;
    }
    Ok(())
}

fn run_non_matching(
    body: Option<&Body>,
    text: &str,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    match body {
        Some(body) => body.execute(&ctx.with_item(text).with_regex_match(None), out),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Instruction;
    use crate::context::StaticContext;
    use crate::expr;
    use crate::output::ContentBuffer;
    use crate::value::Value;
    use std::sync::Arc;

    fn root() -> ExecutionContext {
        ExecutionContext::new(Arc::new(StaticContext::new())).unwrap()
    }

    fn tagged(select: &str, regex: &str) -> AnalyzeString {
        AnalyzeString::new(expr::literal(select), regex)
            .on_match(vec![
                Instruction::text("["),
                Instruction::value_of(expr::context_item()),
                Instruction::text("]"),
            ])
            .on_non_match(vec![
                Instruction::text("("),
                Instruction::value_of(expr::context_item()),
                Instruction::text(")"),
            ])
    }

    fn run(analyze: &AnalyzeString) -> Result<String, TransformError> {
        let mut out = ContentBuffer::new();
        handle_analyze_string(analyze, &root(), &mut out)?;
        Ok(out.text_content())
    }

    #[test]
    fn test_split_order() {
        assert_eq!(run(&tagged("a1b22c", "[0-9]+")).unwrap(), "(a)[1](b)[22](c)");
    }

    #[test]
    fn test_no_match_runs_non_matching_once() {
        assert_eq!(run(&tagged("abc", "[0-9]+")).unwrap(), "(abc)");
        assert_eq!(run(&tagged("", "[0-9]+")).unwrap(), "");
    }

    #[test]
    fn test_leading_and_trailing_matches() {
        assert_eq!(run(&tagged("12ab34", "[0-9]+")).unwrap(), "[12](ab)[34]");
    }

    #[test]
    fn test_groups_visible_in_matching_content() {
        let analyze = AnalyzeString::new(expr::literal("k=v;x=y"), "(?P<key>[a-z])=([a-z])")
            .on_match(vec![
                Instruction::value_of(expr::named_group("key")),
                Instruction::value_of(expr::regex_group(2)),
            ])
            .on_non_match(Instruction::value_of(expr::regex_group(1)));
        assert_eq!(run(&analyze).unwrap(), "kvxy");
    }

    #[test]
    fn test_flags_from_avt() {
        let analyze = tagged("aBc", "b").with_flags(expr::literal("I"));
        assert_eq!(run(&analyze).unwrap(), "(a)[B](c)");
    }

    #[test]
    fn test_pattern_reused_across_executions() {
        let analyze = tagged("a1", "[0-9]");
        run(&analyze).unwrap();
        let first = analyze.regex_cache().get_or_compile("[0-9]", "").unwrap();
        run(&analyze).unwrap();
        let second = analyze.regex_cache().get_or_compile("[0-9]", "").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_select_errors_propagate() {
        let analyze = AnalyzeString::new(expr::raise("FOER0000", "no input"), "a");
        let err = run(&analyze).unwrap_err();
        assert_eq!(err.error_code().as_deref(), Some("FOER0000"));
    }

    #[test]
    fn test_bad_pattern() {
        let err = run(&tagged("abc", "[")).unwrap_err();
        assert!(matches!(err, TransformError::PatternSyntax { .. }));
    }

    #[test]
    fn test_zero_length_match_inside_input_rejected() {
        let analyze = tagged("ab cd", r"\b");
        let mut out = ContentBuffer::new();
        let err = handle_analyze_string(&analyze, &root(), &mut out).unwrap_err();
        assert_eq!(err.error_code().as_deref(), Some("XTDE1150"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_match_context_does_not_leak() {
        let analyze = AnalyzeString::new(expr::variable("s"), "b").on_match(
            Instruction::value_of(expr::from_fn(|ctx| {
                Ok(Value::from(ctx.regex_match().is_some()))
            })),
        );
        let ctx = root().with_variable("s", Value::from("abc"));
        let mut out = ContentBuffer::new();
        handle_analyze_string(&analyze, &ctx, &mut out).unwrap();
        assert_eq!(out.text_content(), "true");
        assert!(ctx.regex_match().is_none());
    }
}
