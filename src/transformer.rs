use crate::error::SluiceError;
use sluice_engine::resolver::UriResolver;
use sluice_engine::{
    AccumulatorDefinition, Body, ContentBuffer, Expr, Item, OutputSink, StaticContext,
    StreamOptions, Streamability, TextCollector, VarName, transform,
};
use sluice_traits::{FilesystemResourceProvider, ResourceError, ResourceProvider};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// A builder for creating a [`Transformer`].
#[derive(Default)]
pub struct TransformerBuilder {
    body: Option<Body>,
    statics: StaticContext,
}

impl TransformerBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the root instruction tree.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.statics = self.statics.with_base_uri(base_uri);
        self
    }

    pub fn with_resource_provider(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.statics = self.statics.with_resource_provider(provider);
        self
    }

    /// Serves streamed documents from files below `path`.
    pub fn with_resource_dir<P: AsRef<Path>>(self, path: P) -> Result<Self, SluiceError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(ResourceError::NotFound(path.display().to_string()).into());
        }
        Ok(self.with_resource_provider(Arc::new(FilesystemResourceProvider::new(path))))
    }

    pub fn with_uri_resolver(mut self, resolver: Arc<dyn UriResolver>) -> Self {
        self.statics = self.statics.with_uri_resolver(resolver);
        self
    }

    pub fn with_accumulator(mut self, definition: AccumulatorDefinition) -> Self {
        self.statics = self.statics.with_accumulator(definition);
        self
    }

    pub fn with_global_variable(mut self, name: impl Into<VarName>, select: Expr) -> Self {
        self.statics = self.statics.with_global_variable(name, select);
        self
    }

    pub fn with_stream_options(mut self, options: StreamOptions) -> Self {
        self.statics = self.statics.with_stream_options(options);
        self
    }

    /// Loads [`StreamOptions`] from a JSON file. Missing fields keep their
    /// defaults.
    pub fn with_stream_options_file<P: AsRef<Path>>(self, path: P) -> Result<Self, SluiceError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            SluiceError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read stream options from '{}': {}", path.display(), e),
            ))
        })?;
        Ok(self.with_stream_options(StreamOptions::from_json(&json)?))
    }

    /// Consumes the builder and creates the `Transformer`.
    pub fn build(mut self) -> Result<Transformer, SluiceError> {
        let body = self.body.take().ok_or_else(|| {
            SluiceError::Config("No instruction tree has been configured. Use `with_body`.".to_string())
        })?;

        let capability = body.streamability();
        log::info!("Root body is {}.", capability);

        Ok(Transformer {
            body,
            statics: Arc::new(self.statics),
        })
    }
}

/// A root instruction tree bound to its static configuration, ready to run
/// any number of times.
#[derive(Debug)]
pub struct Transformer {
    body: Body,
    statics: Arc<StaticContext>,
}

impl Transformer {
    pub fn builder() -> TransformerBuilder {
        TransformerBuilder::new()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.statics
    }

    pub fn streamability(&self) -> Streamability {
        self.body.streamability()
    }

    /// Runs the tree with an optional initial context item, writing to `out`.
    pub fn transform(&self, item: Option<Item>, out: &mut dyn OutputSink) -> Result<(), SluiceError> {
        transform(&self.body, Arc::clone(&self.statics), item, out)?;
        Ok(())
    }

    /// Runs the tree and returns the recorded output events.
    pub fn transform_to_events(&self, item: Option<Item>) -> Result<ContentBuffer, SluiceError> {
        let mut buffer = ContentBuffer::new();
        self.transform(item, &mut buffer)?;
        Ok(buffer)
    }

    /// Runs the tree and returns only the text it produced.
    pub fn transform_to_text(&self, item: Option<Item>) -> Result<String, SluiceError> {
        let mut collector = TextCollector::new();
        self.transform(item, &mut collector)?;
        Ok(collector.into_text())
    }

    /// Runs the tree and serializes the event log as JSON.
    pub fn transform_to_json(&self, item: Option<Item>) -> Result<String, SluiceError> {
        Ok(self.transform_to_events(item)?.to_json()?)
    }
}
