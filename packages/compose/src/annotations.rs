use crate::error::{ComposeError, ComposeResult, LoaderError};
use crate::level::AnnotationLevel;
use crate::story::{DecoratorFn, LoaderFn, StoryContext, StoryFn};
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// One level of configuration (project preview, meta, story, ...)
pub struct Annotations<R> {
    pub level: AnnotationLevel,
    pub component: Option<String>,
    /// Renderer used to look up an argTypes extractor
    pub renderer: Option<String>,
    pub parameters: Map<String, Value>,
    pub args: Map<String, Value>,
    pub arg_types: Map<String, Value>,
    pub decorators: Vec<DecoratorFn<R>>,
    pub loaders: Vec<LoaderFn>,
    pub globals: Map<String, Value>,
    pub global_types: Map<String, Value>,
    pub tags: Vec<String>,
}

impl<R> Annotations<R> {
    pub fn new(level: AnnotationLevel) -> Self {
        Self {
            level,
            component: None,
            renderer: None,
            parameters: Map::new(),
            args: Map::new(),
            arg_types: Map::new(),
            decorators: Vec::new(),
            loaders: Vec::new(),
            globals: Map::new(),
            global_types: Map::new(),
            tags: Vec::new(),
        }
    }

    /// Read the statically known fields of an annotation object
    pub fn from_json(level: AnnotationLevel, value: &Value) -> ComposeResult<Self> {
        let Value::Object(object) = value else {
            return Err(ComposeError::InvalidAnnotations {
                level,
                message: "annotations must be an object".to_string(),
            });
        };

        let mut annotations = Self::new(level);
        for (key, value) in object {
            match key.as_str() {
                "parameters" => annotations.parameters = expect_object(level, key, value)?,
                "args" => annotations.args = expect_object(level, key, value)?,
                "argTypes" => annotations.arg_types = expect_object(level, key, value)?,
                "globals" => annotations.globals = expect_object(level, key, value)?,
                "globalTypes" => annotations.global_types = expect_object(level, key, value)?,
                "component" => annotations.component = value.as_str().map(str::to_string),
                "renderer" => annotations.renderer = value.as_str().map(str::to_string),
                "tags" => {
                    annotations.tags = value
                        .as_array()
                        .map(|tags| {
                            tags.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .ok_or_else(|| ComposeError::InvalidAnnotations {
                            level,
                            message: "tags must be an array of strings".to_string(),
                        })?
                }
                _ => {}
            }
        }
        Ok(annotations)
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_renderer(mut self, renderer: impl Into<String>) -> Self {
        self.renderer = Some(renderer.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.args.insert(key.into(), value);
        self
    }

    pub fn with_arg_type(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arg_types.insert(key.into(), value);
        self
    }

    pub fn with_global(mut self, key: impl Into<String>, value: Value) -> Self {
        self.globals.insert(key.into(), value);
        self
    }

    pub fn with_global_type(mut self, key: impl Into<String>, value: Value) -> Self {
        self.global_types.insert(key.into(), value);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_decorator<F>(mut self, decorator: F) -> Self
    where
        F: Fn(&StoryFn<R>, &StoryContext) -> R + Send + Sync + 'static,
    {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn with_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&StoryContext) -> BoxFuture<'static, Result<Map<String, Value>, LoaderError>>
            + Send
            + Sync
            + 'static,
    {
        self.loaders.push(Arc::new(loader));
        self
    }
}

fn expect_object(
    level: AnnotationLevel,
    key: &str,
    value: &Value,
) -> ComposeResult<Map<String, Value>> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| ComposeError::InvalidAnnotations {
            level,
            message: format!("{} must be an object", key),
        })
}

impl<R> Clone for Annotations<R> {
    fn clone(&self) -> Self {
        Self {
            level: self.level,
            component: self.component.clone(),
            renderer: self.renderer.clone(),
            parameters: self.parameters.clone(),
            args: self.args.clone(),
            arg_types: self.arg_types.clone(),
            decorators: self.decorators.clone(),
            loaders: self.loaders.clone(),
            globals: self.globals.clone(),
            global_types: self.global_types.clone(),
            tags: self.tags.clone(),
        }
    }
}

impl<R> fmt::Debug for Annotations<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotations")
            .field("level", &self.level)
            .field("component", &self.component)
            .field("parameters", &self.parameters)
            .field("args", &self.args)
            .field("arg_types", &self.arg_types)
            .field("decorators", &self.decorators.len())
            .field("loaders", &self.loaders.len())
            .field("tags", &self.tags)
            .finish()
    }
}
