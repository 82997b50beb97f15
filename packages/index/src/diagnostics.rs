use serde::Serialize;
use std::fmt;
use storyloom_csf::{CsfError, Location};

/// Non-fatal problem found while indexing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IndexDiagnostic {
    /// File could not be indexed and contributes no new entries
    #[serde(rename_all = "camelCase")]
    Parse {
        file: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },

    /// Two sources produced the same id; `first` keeps it
    #[serde(rename_all = "camelCase")]
    Collision {
        id: String,
        first: String,
        second: String,
    },

    /// Docs page references a story file that has no story entries
    #[serde(rename_all = "camelCase")]
    BrokenReference { docs_file: String, reference: String },

    /// File matched a specifier but no indexer accepts it
    #[serde(rename_all = "camelCase")]
    NoIndexer { file: String },
}

impl IndexDiagnostic {
    pub fn parse(file: impl Into<String>, error: &CsfError) -> Self {
        IndexDiagnostic::Parse {
            file: file.into(),
            message: error.to_string(),
            location: error.location(),
        }
    }

    /// File the diagnostic is reported against
    pub fn file(&self) -> &str {
        match self {
            IndexDiagnostic::Parse { file, .. } | IndexDiagnostic::NoIndexer { file } => file,
            IndexDiagnostic::Collision { second, .. } => second,
            IndexDiagnostic::BrokenReference { docs_file, .. } => docs_file,
        }
    }

    /// Whether the index is missing or misattributing entries because of this
    pub fn degrades(&self) -> bool {
        matches!(
            self,
            IndexDiagnostic::Parse { .. } | IndexDiagnostic::Collision { .. }
        )
    }
}

impl fmt::Display for IndexDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDiagnostic::Parse { message, .. } => write!(f, "{}", message),
            IndexDiagnostic::Collision { id, first, second } => write!(
                f,
                "duplicate story id '{}' in {} and {}; keeping {}",
                id, first, second, first
            ),
            IndexDiagnostic::BrokenReference {
                docs_file,
                reference,
            } => write!(
                f,
                "{} references {}, which has no indexed stories",
                docs_file, reference
            ),
            IndexDiagnostic::NoIndexer { file } => write!(f, "no indexer accepts {}", file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_message_names_both_files() {
        let diagnostic = IndexDiagnostic::Collision {
            id: "button--primary".to_string(),
            first: "./src/a.stories.ts".to_string(),
            second: "./src/b.stories.ts".to_string(),
        };
        let message = diagnostic.to_string();
        assert!(message.contains("./src/a.stories.ts"));
        assert!(message.contains("./src/b.stories.ts"));
        assert!(diagnostic.degrades());
        assert_eq!(diagnostic.file(), "./src/b.stories.ts");
    }

    #[test]
    fn test_parse_diagnostic_carries_location() {
        let error = CsfError::missing_meta("./src/a.stories.ts");
        let diagnostic = IndexDiagnostic::parse("./src/a.stories.ts", &error);
        assert_eq!(
            serde_json::to_value(&diagnostic).unwrap(),
            serde_json::json!({
                "kind": "parse",
                "file": "./src/a.stories.ts",
                "message": "./src/a.stories.ts: no default export or meta() call found",
            })
        );
    }
}
