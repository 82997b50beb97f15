//! Composition of annotations into the configuration a story renders with
//!
//! Levels are folded in order (core, addon, project, meta, story, test):
//! parameters and argTypes deep-merge, args merge shallowly, decorators and
//! loaders concatenate, tags union with `!tag` negation, and globals come
//! from project scope only.

pub mod annotations;
pub mod arg_types;
pub mod composer;
pub mod error;
pub mod level;
pub mod merge;
pub mod story;

pub use annotations::Annotations;
pub use arg_types::{
    infer_arg_types, normalize_arg_types, ArgTypes, ArgTypesExtraction, ArgTypesExtractor,
    ExtractorRegistry,
};
pub use composer::{ComposedConfiguration, Composer};
pub use error::{ComposeError, ComposeResult, LoaderError};
pub use level::AnnotationLevel;
pub use merge::{combine_tags, deep_merge, merge_args, MergeStrategies, MergeStrategy};
pub use story::{DecoratorFn, LoaderFn, StoryContext, StoryFn};
