//! argTypes normalisation, inference and extraction
//!
//! An argType is a JSON object (`{ name, type: { name }, control, ... }`).
//! Declared argTypes are normalised before merging so that shorthand forms
//! merge field by field with the expanded forms.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type ArgTypes = Map<String, Value>;

/// Expand shorthand argType declarations
///
/// - `"string"` becomes `{ type: { name: "string" } }`
/// - `type: "string"` becomes `type: { name: "string" }`
/// - `control: "color"` becomes `control: { type: "color" }`
/// - every entry gets a `name` field matching its key
pub fn normalize_arg_types(arg_types: &ArgTypes) -> ArgTypes {
    arg_types
        .iter()
        .map(|(key, value)| (key.clone(), normalize_arg_type(key, value)))
        .collect()
}

fn normalize_arg_type(key: &str, value: &Value) -> Value {
    let mut arg_type = match value {
        Value::String(type_name) => {
            let mut map = Map::new();
            map.insert("type".to_string(), json!({ "name": type_name }));
            map
        }
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    if let Some(Value::String(type_name)) = arg_type.get("type") {
        let expanded = json!({ "name": type_name });
        arg_type.insert("type".to_string(), expanded);
    }
    if let Some(Value::String(control)) = arg_type.get("control") {
        let expanded = json!({ "type": control });
        arg_type.insert("control".to_string(), expanded);
    }
    arg_type
        .entry("name")
        .or_insert_with(|| Value::String(key.to_string()));

    Value::Object(arg_type)
}

/// argTypes implied by the initial args
pub fn infer_arg_types(args: &Map<String, Value>) -> ArgTypes {
    args.iter()
        .map(|(key, value)| {
            (
                key.clone(),
                json!({ "name": key, "type": infer_type(value) }),
            )
        })
        .collect()
}

fn infer_type(value: &Value) -> Value {
    match value {
        Value::String(_) => json!({ "name": "string" }),
        Value::Number(_) => json!({ "name": "number" }),
        Value::Bool(_) => json!({ "name": "boolean" }),
        Value::Array(items) => json!({
            "name": "array",
            "value": items.first().map(infer_type).unwrap_or_else(|| json!({ "name": "other", "value": "unknown" })),
        }),
        Value::Object(fields) => json!({
            "name": "object",
            "value": fields
                .iter()
                .map(|(k, v)| (k.clone(), infer_type(v)))
                .collect::<Map<String, Value>>(),
        }),
        Value::Null => json!({ "name": "other", "value": "null" }),
    }
}

/// Renderer-specific extraction of argTypes from a component reference
pub trait ArgTypesExtractor: Send + Sync {
    fn extract(&self, component: &str, parameters: &Map<String, Value>) -> Result<ArgTypes, String>;
}

impl<F> ArgTypesExtractor for F
where
    F: Fn(&str, &Map<String, Value>) -> Result<ArgTypes, String> + Send + Sync,
{
    fn extract(&self, component: &str, parameters: &Map<String, Value>) -> Result<ArgTypes, String> {
        self(component, parameters)
    }
}

/// Extractors keyed by renderer name
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn ArgTypesExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, renderer: impl Into<String>, extractor: impl ArgTypesExtractor + 'static) {
        self.extractors.insert(renderer.into(), Arc::new(extractor));
    }

    pub fn get(&self, renderer: &str) -> Option<&Arc<dyn ArgTypesExtractor>> {
        self.extractors.get(renderer)
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut renderers: Vec<&String> = self.extractors.keys().collect();
        renderers.sort();
        f.debug_struct("ExtractorRegistry")
            .field("renderers", &renderers)
            .finish()
    }
}

/// Outcome of argTypes extraction for the story's component
#[derive(Debug, Clone, PartialEq)]
pub enum ArgTypesExtraction {
    /// No component, nothing to extract
    NotRequested,
    Extracted(ArgTypes),
    /// A component is set but no extractor is registered for the renderer
    Unsupported { renderer: Option<String> },
    Failed { message: String },
}

impl ArgTypesExtraction {
    pub fn run(
        registry: Option<&ExtractorRegistry>,
        renderer: Option<&str>,
        component: Option<&str>,
        parameters: &Map<String, Value>,
    ) -> Self {
        let Some(component) = component else {
            return ArgTypesExtraction::NotRequested;
        };
        let extractor = renderer.and_then(|r| registry.and_then(|reg| reg.get(r)));
        let Some(extractor) = extractor else {
            return ArgTypesExtraction::Unsupported {
                renderer: renderer.map(str::to_string),
            };
        };
        match extractor.extract(component, parameters) {
            Ok(arg_types) => ArgTypesExtraction::Extracted(normalize_arg_types(&arg_types)),
            Err(message) => ArgTypesExtraction::Failed { message },
        }
    }

    pub fn arg_types(&self) -> Option<&ArgTypes> {
        match self {
            ArgTypesExtraction::Extracted(arg_types) => Some(arg_types),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ArgTypesExtraction::Unsupported { .. } | ArgTypesExtraction::Failed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_normalize_shorthands() {
        let normalized = normalize_arg_types(&object(json!({
            "label": "string",
            "size": { "control": "select", "options": ["s", "m"] },
            "count": { "type": "number", "name": "Count" },
        })));

        assert_eq!(
            Value::Object(normalized),
            json!({
                "label": { "type": { "name": "string" }, "name": "label" },
                "size": { "control": { "type": "select" }, "options": ["s", "m"], "name": "size" },
                "count": { "type": { "name": "number" }, "name": "Count" },
            })
        );
    }

    #[test]
    fn test_infer_from_args() {
        let inferred = infer_arg_types(&object(json!({
            "label": "Hi",
            "count": 3,
            "items": ["a"],
            "user": { "admin": false },
            "empty": null,
        })));

        assert_eq!(inferred["label"]["type"], json!({ "name": "string" }));
        assert_eq!(inferred["count"]["type"], json!({ "name": "number" }));
        assert_eq!(
            inferred["items"]["type"],
            json!({ "name": "array", "value": { "name": "string" } })
        );
        assert_eq!(
            inferred["user"]["type"],
            json!({ "name": "object", "value": { "admin": { "name": "boolean" } } })
        );
        assert_eq!(inferred["empty"]["type"]["name"], "other");
    }

    #[test]
    fn test_extraction_outcomes() {
        let params = Map::new();
        assert_eq!(
            ArgTypesExtraction::run(None, Some("react"), None, &params),
            ArgTypesExtraction::NotRequested
        );
        assert_eq!(
            ArgTypesExtraction::run(None, Some("react"), Some("Button"), &params),
            ArgTypesExtraction::Unsupported {
                renderer: Some("react".into())
            }
        );

        let mut registry = ExtractorRegistry::new();
        registry.register("react", |component: &str, _: &Map<String, Value>| {
            if component == "Broken" {
                Err("no docgen info".to_string())
            } else {
                Ok(object(json!({ "label": "string" })))
            }
        });

        let extracted =
            ArgTypesExtraction::run(Some(&registry), Some("react"), Some("Button"), &params);
        assert_eq!(
            extracted.arg_types().map(|a| a["label"]["name"].clone()),
            Some(json!("label"))
        );

        let failed =
            ArgTypesExtraction::run(Some(&registry), Some("react"), Some("Broken"), &params);
        assert!(failed.is_error());
    }
}
