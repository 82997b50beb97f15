use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an annotation object comes from; composition input must be
/// ordered by level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Core,
    Addon,
    Project,
    Meta,
    Story,
    Test,
}

impl AnnotationLevel {
    /// Levels allowed to declare `globals` and `globalTypes`
    pub fn is_project_scope(self) -> bool {
        self <= AnnotationLevel::Project
    }
}

impl fmt::Display for AnnotationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationLevel::Core => "core",
            AnnotationLevel::Addon => "addon",
            AnnotationLevel::Project => "project",
            AnnotationLevel::Meta => "meta",
            AnnotationLevel::Story => "story",
            AnnotationLevel::Test => "test",
        };
        f.write_str(name)
    }
}
