//! Module-level syntax tree for story files
//!
//! Only the shapes that carry story metadata are modelled structurally.
//! Everything else (function bodies, JSX, class bodies, type declarations)
//! is kept as an opaque span.

use serde_json::{Map, Number, Value};
use std::ops::Range;

pub type Span = Range<usize>;

/// A parsed module: top-level items in source order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Import(ImportDecl),
    /// `export default <expr>`
    ExportDefault(ExportDefault),
    /// `export const|let|var|function|class ...`
    ExportDecl(Declaration),
    /// `export { a, b as c }` with an optional `from` source
    ExportNamed(ExportNamed),
    /// `export * from '...'`
    ExportAll { source: String, span: Span },
    /// Non-exported `const|let|var|function|class`
    Declaration(Declaration),
    /// `a.b = value`
    Assignment(Assignment),
    /// Any other expression statement
    Expression(Expr),
    /// Type declarations and statements with no bearing on exports
    Other(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub source: String,
    pub specifiers: Vec<ImportSpecifier>,
    pub type_only: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// `import X from`
    Default { local: String },
    /// `import * as X from`
    Namespace { local: String },
    /// `import { a as b } from`
    Named { imported: String, local: String },
}

impl ImportSpecifier {
    pub fn local(&self) -> &str {
        match self {
            ImportSpecifier::Default { local }
            | ImportSpecifier::Namespace { local }
            | ImportSpecifier::Named { local, .. } => local,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportDefault {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportNamed {
    pub specifiers: Vec<ExportSpecifier>,
    pub source: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// `const a = 1, b = 2`; destructuring patterns are recorded without bindings
    Variable {
        kind: VarKind,
        declarators: Vec<Declarator>,
        span: Span,
    },
    Function {
        name: String,
        is_async: bool,
        span: Span,
    },
    Class {
        name: String,
        span: Span,
    },
}

impl Declaration {
    pub fn span(&self) -> &Span {
        match self {
            Declaration::Variable { span, .. }
            | Declaration::Function { span, .. }
            | Declaration::Class { span, .. } => span,
        }
    }

    /// Bound names in declaration order
    pub fn names(&self) -> Vec<&str> {
        match self {
            Declaration::Variable { declarators, .. } => declarators
                .iter()
                .filter_map(|d| d.name.as_deref())
                .collect(),
            Declaration::Function { name, .. } | Declaration::Class { name, .. } => {
                vec![name.as_str()]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    /// `None` for destructuring patterns
    pub name: Option<String>,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Member path, e.g. `["Primary", "args"]` for `Primary.args = ...`
    pub target: Vec<String>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Object(Vec<Property>),
    Array(Vec<Expr>),
    Str(String),
    /// Template literal; `quasi` holds the text when there are no interpolations
    Template { quasi: Option<String> },
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Function {
        is_async: bool,
        kind: FunctionKind,
    },
    Regex {
        pattern: String,
        flags: String,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Anything the extractor does not look inside
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Arrow,
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Named(String),
    Computed,
    Spread,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn opaque(span: Span) -> Self {
        Self::new(ExprKind::Opaque, span)
    }

    /// Look up a named property on an object literal
    pub fn get(&self, key: &str) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Object(props) => props
                .iter()
                .rev()
                .find(|p| matches!(&p.key, PropertyKey::Named(k) if k == key))
                .map(|p| &p.value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Str(s) => Some(s),
            ExprKind::Template { quasi: Some(s) } => Some(s),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Function {
                kind: FunctionKind::Arrow | FunctionKind::Function,
                ..
            }
        )
    }

    /// String elements of an array literal; non-string elements are skipped
    pub fn string_array(&self) -> Option<Vec<String>> {
        match &self.kind {
            ExprKind::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Member chain as path segments, e.g. `a.b.c` -> `["a", "b", "c"]`
    pub fn member_path(&self) -> Option<Vec<String>> {
        match &self.kind {
            ExprKind::Ident(name) => Some(vec![name.clone()]),
            ExprKind::Member { object, property } => {
                let mut path = object.member_path()?;
                path.push(property.clone());
                Some(path)
            }
            _ => None,
        }
    }

    /// Static JSON view of a literal. Leaves that cannot be known without
    /// evaluation are omitted from objects and arrays.
    pub fn to_json(&self) -> Option<Value> {
        match &self.kind {
            ExprKind::Object(props) => {
                let mut map = Map::new();
                for prop in props {
                    if let PropertyKey::Named(key) = &prop.key {
                        match prop.value.to_json() {
                            Some(value) => {
                                map.insert(key.clone(), value);
                            }
                            None => {
                                map.remove(key);
                            }
                        }
                    }
                }
                Some(Value::Object(map))
            }
            ExprKind::Array(items) => Some(Value::Array(
                items.iter().filter_map(Expr::to_json).collect(),
            )),
            ExprKind::Str(s) => Some(Value::String(s.clone())),
            ExprKind::Template { quasi: Some(s) } => Some(Value::String(s.clone())),
            ExprKind::Number(n) => Number::from_f64(*n).map(|num| {
                if n.fract() == 0.0 && n.abs() < 9e15 {
                    Value::Number(Number::from(*n as i64))
                } else {
                    Value::Number(num)
                }
            }),
            ExprKind::Bool(b) => Some(Value::Bool(*b)),
            ExprKind::Null => Some(Value::Null),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prop(key: &str, value: ExprKind) -> Property {
        Property {
            key: PropertyKey::Named(key.to_string()),
            value: Expr::new(value, 0..0),
            span: 0..0,
        }
    }

    #[test]
    fn test_object_to_json_skips_dynamic_values() {
        let obj = Expr::new(
            ExprKind::Object(vec![
                prop("label", ExprKind::Str("Button".into())),
                prop("count", ExprKind::Number(3.0)),
                prop("ratio", ExprKind::Number(0.5)),
                prop("onClick", ExprKind::Ident("fn".into())),
                prop("primary", ExprKind::Bool(true)),
            ]),
            0..0,
        );
        assert_eq!(
            obj.to_json(),
            Some(json!({"label": "Button", "count": 3, "ratio": 0.5, "primary": true}))
        );
    }

    #[test]
    fn test_numbers_to_json() {
        let number = |n: f64| Expr::new(ExprKind::Number(n), 0..0).to_json();
        assert_eq!(number(3.0), Some(json!(3)));
        assert_eq!(number(-2.0), Some(json!(-2)));
        assert_eq!(number(1.5), Some(json!(1.5)));
        assert_eq!(number(1e20), Some(json!(1e20)));
        assert_eq!(number(f64::NAN), None);
    }

    #[test]
    fn test_get_prefers_last_duplicate_key() {
        let obj = Expr::new(
            ExprKind::Object(vec![
                prop("name", ExprKind::Str("first".into())),
                prop("name", ExprKind::Str("second".into())),
            ]),
            0..0,
        );
        assert_eq!(obj.get("name").and_then(Expr::as_str), Some("second"));
    }

    #[test]
    fn test_member_path() {
        let expr = Expr::new(
            ExprKind::Member {
                object: Box::new(Expr::new(ExprKind::Ident("Primary".into()), 0..0)),
                property: "args".into(),
            },
            0..0,
        );
        assert_eq!(
            expr.member_path(),
            Some(vec!["Primary".to_string(), "args".to_string()])
        );
    }
}
