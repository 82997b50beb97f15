use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use storyloom_sort::StorySortOptions;

/// Tags every entry starts with
pub const DEFAULT_TAGS: &[&str] = &["dev", "test"];
pub const AUTODOCS_TAG: &str = "autodocs";
pub const ATTACHED_MDX_TAG: &str = "attached-mdx";
pub const UNATTACHED_MDX_TAG: &str = "unattached-mdx";

/// When story files get a generated docs entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Autodocs {
    /// Only files whose stories carry the `autodocs` tag
    #[default]
    Tag,
    Always,
    Never,
}

impl Serialize for Autodocs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Autodocs::Tag => serializer.serialize_str("tag"),
            Autodocs::Always => serializer.serialize_bool(true),
            Autodocs::Never => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for Autodocs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Mode(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Autodocs::Always),
            Raw::Flag(false) => Ok(Autodocs::Never),
            Raw::Mode(mode) if mode == "tag" => Ok(Autodocs::Tag),
            Raw::Mode(other) => Err(D::Error::custom(format!(
                "invalid autodocs setting '{}', expected \"tag\", true or false",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocsOptions {
    /// Name of generated and unnamed docs entries
    pub default_name: String,
    pub autodocs: Autodocs,
}

impl Default for DocsOptions {
    fn default() -> Self {
        Self {
            default_name: "Docs".to_string(),
            autodocs: Autodocs::Tag,
        }
    }
}

/// Project-wide settings that shape entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexOptions {
    pub docs: DocsOptions,
    /// Project tags, applied after the defaults
    pub tags: Vec<String>,
    pub story_sort: StorySortOptions,
}

impl IndexOptions {
    /// Default tags followed by project tags
    pub fn base_tags(&self) -> Vec<String> {
        DEFAULT_TAGS
            .iter()
            .map(|tag| tag.to_string())
            .chain(self.tags.iter().cloned())
            .collect()
    }
}
