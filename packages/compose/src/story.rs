use crate::error::LoaderError;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Renders a story for the renderer output type `R`
pub type StoryFn<R> = Arc<dyn Fn(&StoryContext) -> R + Send + Sync>;

/// Wraps the inner story; calling `inner` renders everything below
pub type DecoratorFn<R> = Arc<dyn Fn(&StoryFn<R>, &StoryContext) -> R + Send + Sync>;

/// Produces data merged into `StoryContext::loaded` before rendering
pub type LoaderFn =
    Arc<dyn Fn(&StoryContext) -> BoxFuture<'static, Result<Map<String, Value>, LoaderError>> + Send + Sync>;

/// What decorators, loaders and the story itself see at render time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryContext {
    pub id: String,
    pub title: String,
    pub name: String,
    pub args: Map<String, Value>,
    pub arg_types: Map<String, Value>,
    pub globals: Map<String, Value>,
    pub parameters: Map<String, Value>,
    pub tags: Vec<String>,
    pub loaded: Map<String, Value>,
}
