use crate::ast::Body;
use crate::context::ExecutionContext;
use crate::error::TransformError;
use crate::expr::Avt;
use crate::output::OutputSink;
use crate::streaming::{BodyStreamHandler, Streamability, XmlTokenizer};

/// Opens the document named by `href` and runs `body` against it as it is
/// read.
pub(crate) fn handle_stream(
    href: &Avt,
    body: &Body,
    ctx: &ExecutionContext,
    out: &mut dyn OutputSink,
) -> Result<(), TransformError> {
    let href = href.evaluate(ctx)?;
    if href.is_empty() {
        return Err(TransformError::dynamic(
            "XTDE1170",
            "stream href must not be empty",
        ));
    }

    let statics = ctx.static_context();
    let resolved = statics.uri_resolver().resolve(&href, statics.base_uri())?;
    let provider = statics.resource_provider().ok_or_else(|| {
        TransformError::streaming_source(&resolved, "no resource provider is configured")
    })?;
    let source = provider
        .open(&resolved)
        .map_err(|e| TransformError::streaming_source(&resolved, e.to_string()))?;

    let capability = body.streamability();
    if capability > Streamability::Full {
        log::warn!(
            "stream body for '{}' is {}; parts of it buffer or look ahead",
            resolved,
            capability
        );
    }

    log::debug!("streaming '{}' via {}", resolved, provider.name());
    let mut handler = BodyStreamHandler::new(ctx, body, out)?;
    let invocations = XmlTokenizer::new(source, resolved.as_str())
        .with_buffer_capacity(statics.stream_options().read_buffer_capacity)
        .run(&mut handler)?;
    log::debug!("finished '{}' after {} body invocation(s)", resolved, invocations);
    Ok(())
}
