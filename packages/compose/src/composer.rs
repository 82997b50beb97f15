//! Folding ordered annotation levels into one configuration per story

use crate::annotations::Annotations;
use crate::arg_types::{infer_arg_types, normalize_arg_types, ArgTypesExtraction, ExtractorRegistry};
use crate::error::{ComposeError, ComposeResult, LoaderError};
use crate::merge::{combine_tags, deep_merge, deep_merge_with, merge_args, MergeStrategies, MergeStrategy};
use crate::story::{DecoratorFn, LoaderFn, StoryContext, StoryFn};
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Composition settings; holds no state between calls
#[derive(Debug, Clone, Default)]
pub struct Composer {
    strategies: MergeStrategies,
    extractors: Option<ExtractorRegistry>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt a parameter key path out of deep merging
    pub fn with_strategy(mut self, path: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.strategies.set(path, strategy);
        self
    }

    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = Some(extractors);
        self
    }

    /// Compose levels ordered core → addon → project → meta → story → test
    pub fn compose<R>(&self, layers: &[Annotations<R>]) -> ComposeResult<ComposedConfiguration<R>> {
        for pair in layers.windows(2) {
            if pair[1].level < pair[0].level {
                return Err(ComposeError::OutOfOrder {
                    previous: pair[0].level,
                    next: pair[1].level,
                });
            }
        }

        let mut parameters = Map::new();
        let mut args = Map::new();
        let mut declared_arg_types = Map::new();
        let mut globals = Map::new();
        let mut global_types = Map::new();
        let mut decorators = Vec::new();
        let mut loaders = Vec::new();
        let mut component = None;
        let mut renderer = None;

        for layer in layers {
            deep_merge_with(&mut parameters, &layer.parameters, &self.strategies);
            merge_args(&mut args, &layer.args);
            deep_merge(&mut declared_arg_types, &normalize_arg_types(&layer.arg_types));
            decorators.extend(layer.decorators.iter().cloned());
            loaders.extend(layer.loaders.iter().cloned());

            // Key by key; a later project-scope level replaces the whole value
            if layer.level.is_project_scope() {
                merge_args(&mut globals, &layer.globals);
                merge_args(&mut global_types, &layer.global_types);
            } else if !layer.globals.is_empty() || !layer.global_types.is_empty() {
                tracing::debug!(level = %layer.level, "ignoring globals declared below project level");
            }

            if layer.component.is_some() {
                component = layer.component.clone();
            }
            if layer.renderer.is_some() {
                renderer = layer.renderer.clone();
            }
        }

        let tags = combine_tags(layers.iter().map(|layer| layer.tags.as_slice()));

        let extraction = ArgTypesExtraction::run(
            self.extractors.as_ref(),
            renderer.as_deref(),
            component.as_deref(),
            &parameters,
        );

        // inferred < extracted < declared
        let mut arg_types = infer_arg_types(&args);
        if let Some(extracted) = extraction.arg_types() {
            deep_merge(&mut arg_types, extracted);
        }
        deep_merge(&mut arg_types, &declared_arg_types);

        Ok(ComposedConfiguration {
            component,
            parameters,
            initial_args: args.clone(),
            args,
            arg_types,
            arg_types_extraction: extraction,
            decorators,
            loaders,
            globals,
            global_types,
            tags,
        })
    }
}

/// The resolved configuration for one story
pub struct ComposedConfiguration<R> {
    pub component: Option<String>,
    pub parameters: Map<String, Value>,
    pub initial_args: Map<String, Value>,
    pub args: Map<String, Value>,
    pub arg_types: Map<String, Value>,
    /// Extraction outcome; errors here do not fail composition
    pub arg_types_extraction: ArgTypesExtraction,
    /// Outermost first
    pub decorators: Vec<DecoratorFn<R>>,
    pub loaders: Vec<LoaderFn>,
    pub globals: Map<String, Value>,
    pub global_types: Map<String, Value>,
    pub tags: Vec<String>,
}

impl<R: 'static> ComposedConfiguration<R> {
    /// Wrap `story` so the first decorator is outermost
    pub fn decorate(&self, story: StoryFn<R>) -> StoryFn<R> {
        self.decorators
            .iter()
            .rev()
            .fold(story, |inner, decorator| {
                let decorator = Arc::clone(decorator);
                let wrapped: StoryFn<R> =
                    Arc::new(move |context: &StoryContext| decorator(&inner, context));
                wrapped
            })
    }
}

impl<R> ComposedConfiguration<R> {
    pub fn context(
        &self,
        id: impl Into<String>,
        title: impl Into<String>,
        name: impl Into<String>,
    ) -> StoryContext {
        StoryContext {
            id: id.into(),
            title: title.into(),
            name: name.into(),
            args: self.args.clone(),
            arg_types: self.arg_types.clone(),
            globals: self.globals.clone(),
            parameters: self.parameters.clone(),
            tags: self.tags.clone(),
            loaded: Map::new(),
        }
    }

    /// Run every loader concurrently; results merge in declaration order
    pub async fn load(&self, context: &StoryContext) -> Result<Map<String, Value>, LoaderError> {
        let results = try_join_all(self.loaders.iter().map(|loader| loader(context))).await?;
        let mut loaded = Map::new();
        for result in &results {
            merge_args(&mut loaded, result);
        }
        Ok(loaded)
    }

    /// Whether `tag` survived composition
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl<R> PartialEq for ComposedConfiguration<R> {
    fn eq(&self, other: &Self) -> bool {
        self.component == other.component
            && self.parameters == other.parameters
            && self.initial_args == other.initial_args
            && self.args == other.args
            && self.arg_types == other.arg_types
            && self.arg_types_extraction == other.arg_types_extraction
            && self.globals == other.globals
            && self.global_types == other.global_types
            && self.tags == other.tags
            && self.decorators.len() == other.decorators.len()
            && self
                .decorators
                .iter()
                .zip(&other.decorators)
                .all(|(a, b)| Arc::ptr_eq(a, b))
            && self.loaders.len() == other.loaders.len()
            && self
                .loaders
                .iter()
                .zip(&other.loaders)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl<R> fmt::Debug for ComposedConfiguration<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedConfiguration")
            .field("component", &self.component)
            .field("parameters", &self.parameters)
            .field("args", &self.args)
            .field("arg_types", &self.arg_types)
            .field("arg_types_extraction", &self.arg_types_extraction)
            .field("decorators", &self.decorators.len())
            .field("loaders", &self.loaders.len())
            .field("globals", &self.globals)
            .field("tags", &self.tags)
            .finish()
    }
}
