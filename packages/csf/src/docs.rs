//! Static analysis of MDX docs pages
//!
//! Only the ESM imports and the `<Meta />` block are read. Imports are
//! parsed with the module parser so namespace, default and named bindings
//! can be matched against `<Meta of={...} />`.

use crate::ast::{ImportSpecifier, Item};
use crate::error::{CsfError, CsfResult, Location, ParseError};
use crate::parser;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocsFile {
    pub file_name: String,
    /// `<Meta title="..." />`
    pub title: Option<String>,
    /// `<Meta name="..." />`
    pub name: Option<String>,
    /// Import path of the CSF file named by `<Meta of={...} />`
    pub of: Option<String>,
    /// Import sources in declaration order
    pub imports: Vec<String>,
    /// `<Meta isTemplate />` pages are not indexed
    pub is_template: bool,
}

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?ms)^[ \t]*import\s(?:[^;'"]*?\sfrom\s*)?["'][^"'\n]+["'][ \t]*;?"#)
            .expect("import pattern is valid")
    })
}

fn meta_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<Meta\b(?P<attrs>[^>]*?)/?>").expect("meta pattern is valid")
    })
}

fn attr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?P<key>[A-Za-z]+)(?:\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|\{\s*(?P<expr>[A-Za-z_$][\w$]*(?:\.[\w$]+)*)\s*\}|\{\s*(?P<lit>true|false)\s*\}))?"#,
        )
        .expect("attribute pattern is valid")
    })
}

impl DocsFile {
    pub fn parse(source: &str, file_name: &str) -> CsfResult<DocsFile> {
        let mut docs = DocsFile {
            file_name: file_name.to_string(),
            ..Default::default()
        };

        // Bindings introduced by imports: local name -> source
        let mut bindings: Vec<(String, String)> = Vec::new();
        for statement in import_pattern().find_iter(source) {
            let module = parser::parse(statement.as_str()).map_err(|e| {
                let offset = statement.start();
                CsfError::syntax(file_name, source, shift_error(e, offset))
            })?;
            for item in module.items {
                if let Item::Import(import) = item {
                    for specifier in &import.specifiers {
                        if let ImportSpecifier::Namespace { local } | ImportSpecifier::Default { local } =
                            specifier
                        {
                            bindings.push((local.clone(), import.source.clone()));
                        }
                    }
                    if !import.type_only {
                        docs.imports.push(import.source);
                    }
                }
            }
        }

        let Some(meta) = meta_pattern().captures(source) else {
            return Ok(docs);
        };
        let attrs = meta.name("attrs").map_or("", |m| m.as_str());
        let meta_offset = meta.get(0).map_or(0, |m| m.start());

        for attr in attr_pattern().captures_iter(attrs) {
            let key = attr.name("key").map_or("", |m| m.as_str());
            let text = attr
                .name("dq")
                .or_else(|| attr.name("sq"))
                .map(|m| m.as_str().to_string());

            match key {
                "title" => docs.title = text,
                "name" => docs.name = text,
                "isTemplate" => {
                    docs.is_template = attr.name("lit").map_or(true, |m| m.as_str() == "true")
                }
                "of" => {
                    let Some(reference) = attr.name("expr").map(|m| m.as_str()) else {
                        return Err(CsfError::invalid_meta(
                            file_name,
                            format!(
                                "{}: <Meta of={{...}} /> must reference an imported stories file",
                                Location::from_offset(source, meta_offset)
                            ),
                        ));
                    };
                    let base = reference.split('.').next().unwrap_or(reference);
                    match bindings.iter().find(|(local, _)| local == base) {
                        Some((_, import_source)) => docs.of = Some(import_source.clone()),
                        None => {
                            return Err(CsfError::invalid_meta(
                                file_name,
                                format!(
                                    "{}: <Meta of={{{}}} /> does not reference an import",
                                    Location::from_offset(source, meta_offset),
                                    reference
                                ),
                            ))
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(docs)
    }
}

/// Move an error raised on an import statement back into file coordinates
fn shift_error(error: ParseError, offset: usize) -> ParseError {
    match error {
        ParseError::UnexpectedToken {
            span,
            expected,
            found,
        } => ParseError::UnexpectedToken {
            span: span.start + offset..span.end + offset,
            expected,
            found,
        },
        ParseError::UnexpectedEof { pos, expected } => ParseError::UnexpectedEof {
            pos: pos + offset,
            expected,
        },
        ParseError::InvalidSyntax { span, message } => ParseError::InvalidSyntax {
            span: span.start + offset..span.end + offset,
            message,
        },
    }
}
