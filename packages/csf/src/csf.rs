//! Story extraction from component story format modules
//!
//! Works purely over the syntax tree: the default export (or a CSF4
//! `preview.meta(...)` call) supplies the meta, named exports supply stories,
//! and member assignments / `.test(...)` calls attach extra annotations.

use crate::ast::*;
use crate::error::{CsfError, CsfResult, Location};
use crate::ids::{is_export_story, story_name_from_export, to_id, to_test_id, ExportMatcher};
use crate::parser;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Tag added to stories and metas that declare a `play` function
pub const PLAY_FN_TAG: &str = "play-fn";
/// Tag added to test sub-entries
pub const TEST_FN_TAG: &str = "test-fn";

const NAMED_EXPORTS_ORDER: &str = "__namedExportsOrder";

/// Resolves the final title from the title written in the file, if any
pub type MakeTitle<'a> = &'a dyn Fn(Option<&str>) -> Option<String>;

#[derive(Debug, Clone, PartialEq)]
pub struct CsfFile {
    pub file_name: String,
    pub meta: CsfMeta,
    /// Resolved title (after `make_title`)
    pub title: String,
    /// Stories in presentation order
    pub stories: Vec<CsfStory>,
    /// Non-type import sources
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsfMeta {
    /// Title as written in the file
    pub title: Option<String>,
    pub id: Option<String>,
    pub component: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Option<Value>,
    pub args: Option<Value>,
    pub include_stories: Option<ExportMatcher>,
    pub exclude_stories: Option<ExportMatcher>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryKind {
    /// `export const A = { ... }`
    Object,
    /// CSF1/2 function or `Template.bind({})`
    Function,
    /// CSF4 `meta.story(...)`
    Factory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsfStory {
    pub export_name: String,
    pub id: String,
    pub name: String,
    pub kind: StoryKind,
    /// Tags declared on the story itself
    pub tags: Vec<String>,
    pub args: Option<Value>,
    pub parameters: Option<Value>,
    pub tests: Vec<CsfTest>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsfTest {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub location: Location,
}

impl CsfFile {
    /// Extract meta and stories from a module without evaluating it
    pub fn parse(source: &str, file_name: &str, make_title: MakeTitle<'_>) -> CsfResult<CsfFile> {
        let module = parser::parse(source).map_err(|e| CsfError::syntax(file_name, source, e))?;
        Analyzer::new(file_name, source, &module).analyze(make_title)
    }

    pub fn story(&self, export_name: &str) -> Option<&CsfStory> {
        self.stories.iter().find(|s| s.export_name == export_name)
    }
}

/// Annotations gathered for one story export
#[derive(Debug, Default)]
struct StoryAnnotations {
    name: Option<String>,
    story_name: Option<String>,
    tags: Vec<String>,
    has_play: bool,
    args: Option<Value>,
    parameters: Option<Value>,
}

impl StoryAnnotations {
    fn from_object(obj: &Expr) -> Self {
        let mut annotations = Self {
            name: obj.get("name").and_then(Expr::as_str).map(str::to_string),
            story_name: obj.get("storyName").and_then(Expr::as_str).map(str::to_string),
            tags: obj
                .get("tags")
                .and_then(Expr::string_array)
                .unwrap_or_default(),
            has_play: obj.get("play").is_some(),
            args: obj.get("args").and_then(Expr::to_json),
            parameters: obj.get("parameters").and_then(Expr::to_json),
        };
        if let Some(legacy) = obj.get("story") {
            annotations.apply_legacy(legacy);
        }
        annotations
    }

    /// CSF1 `story: { name, parameters }`
    fn apply_legacy(&mut self, legacy: &Expr) {
        if let Some(name) = legacy.get("name").and_then(Expr::as_str) {
            self.story_name = Some(name.to_string());
        }
        if let Some(parameters) = legacy.get("parameters").and_then(Expr::to_json) {
            self.parameters = Some(parameters);
        }
    }

    /// `Story.<field> = value`
    fn apply_assignment(&mut self, field: &str, value: &Expr) {
        match field {
            "storyName" => {
                if let Some(name) = value.as_str() {
                    self.story_name = Some(name.to_string());
                }
            }
            "story" => self.apply_legacy(value),
            "tags" => self.tags = value.string_array().unwrap_or_default(),
            "play" => self.has_play = true,
            "args" => self.args = value.to_json(),
            "parameters" => self.parameters = value.to_json(),
            _ => {}
        }
    }
}

struct StoryExport<'m> {
    export_name: String,
    local_name: String,
    init: Option<&'m Expr>,
    is_function: bool,
    span: Span,
}

struct TestCall<'m> {
    local: &'m str,
    name: &'m str,
    options: Option<&'m Expr>,
    span: Span,
}

struct Analyzer<'m> {
    file: &'m str,
    source: &'m str,
    module: &'m Module,
    locals: HashMap<&'m str, &'m Expr>,
    functions: HashSet<&'m str>,
}

impl<'m> Analyzer<'m> {
    fn new(file: &'m str, source: &'m str, module: &'m Module) -> Self {
        let mut locals = HashMap::new();
        let mut functions = HashSet::new();

        for item in &module.items {
            let decl = match item {
                Item::Declaration(decl) | Item::ExportDecl(decl) => decl,
                _ => continue,
            };
            match decl {
                Declaration::Variable { declarators, .. } => {
                    for declarator in declarators {
                        if let (Some(name), Some(init)) = (&declarator.name, &declarator.init) {
                            locals.insert(name.as_str(), init);
                        }
                    }
                }
                Declaration::Function { name, .. } => {
                    functions.insert(name.as_str());
                }
                Declaration::Class { .. } => {}
            }
        }

        Self {
            file,
            source,
            module,
            locals,
            functions,
        }
    }

    fn analyze(&self, make_title: MakeTitle<'_>) -> CsfResult<CsfFile> {
        let mut meta_expr: Option<&'m Expr> = None;
        let mut exports: Vec<StoryExport<'m>> = Vec::new();
        let mut named_order: Option<Vec<String>> = None;
        let mut imports = Vec::new();

        for item in &self.module.items {
            match item {
                Item::Import(import) if !import.type_only => imports.push(import.source.clone()),
                Item::ExportDefault(export) => meta_expr = Some(&export.expr),
                Item::ExportDecl(Declaration::Variable { declarators, .. }) => {
                    for declarator in declarators {
                        let Some(name) = &declarator.name else {
                            continue;
                        };
                        if name == NAMED_EXPORTS_ORDER {
                            named_order = declarator.init.as_ref().and_then(Expr::string_array);
                            continue;
                        }
                        exports.push(StoryExport {
                            export_name: name.clone(),
                            local_name: name.clone(),
                            init: declarator.init.as_ref(),
                            is_function: false,
                            span: declarator.span.clone(),
                        });
                    }
                }
                Item::ExportDecl(Declaration::Function { name, span, .. }) => {
                    exports.push(StoryExport {
                        export_name: name.clone(),
                        local_name: name.clone(),
                        init: None,
                        is_function: true,
                        span: span.clone(),
                    });
                }
                Item::ExportNamed(named) => {
                    for spec in &named.specifiers {
                        if spec.exported == "default" {
                            if named.source.is_some() {
                                return Err(CsfError::invalid_meta(
                                    self.file,
                                    "default export re-exported from another module cannot be analyzed",
                                ));
                            }
                            meta_expr = self.locals.get(spec.local.as_str()).copied();
                            if meta_expr.is_none() {
                                return Err(CsfError::invalid_meta(
                                    self.file,
                                    format!("default export '{}' is not declared in this file", spec.local),
                                ));
                            }
                            continue;
                        }
                        if spec.exported == NAMED_EXPORTS_ORDER {
                            continue;
                        }

                        let local = named.source.is_none().then_some(spec.local.as_str());
                        exports.push(StoryExport {
                            export_name: spec.exported.clone(),
                            local_name: spec.local.clone(),
                            init: local.and_then(|l| self.locals.get(l).copied()),
                            is_function: local.map_or(false, |l| self.functions.contains(l)),
                            span: named.span.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        let meta_object = match meta_expr {
            Some(expr) => self.meta_object(expr)?,
            None => match self.find_meta_factory() {
                Some(object) => object,
                None => return Err(CsfError::missing_meta(self.file)),
            },
        };
        let meta = self.read_meta(meta_object)?;

        let title = make_title(meta.title.as_deref())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CsfError::missing_title(self.file))?;
        let id_base = meta.id.clone().unwrap_or_else(|| title.clone());

        let assignments = self.collect_assignments();
        let tests = self.collect_tests();

        let mut stories = Vec::new();
        for export in &exports {
            if !is_export_story(
                &export.export_name,
                meta.include_stories.as_ref(),
                meta.exclude_stories.as_ref(),
            ) {
                continue;
            }

            let (kind, mut annotations) = self.read_story(export);
            for (field, value) in assignments
                .get(export.local_name.as_str())
                .into_iter()
                .flatten()
            {
                annotations.apply_assignment(field, value);
            }

            let export_story_name = story_name_from_export(&export.export_name);
            let explicit_id = annotations
                .parameters
                .as_ref()
                .and_then(|p| p.get("__id"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let id = match explicit_id {
                Some(id) => id,
                None => to_id(&id_base, Some(&export_story_name))
                    .map_err(|e| CsfError::invalid_meta(self.file, e.to_string()))?,
            };

            let mut story_tests = Vec::new();
            for call in tests.iter().filter(|t| t.local == export.local_name) {
                let mut tags = call
                    .options
                    .and_then(|o| o.get("tags"))
                    .and_then(Expr::string_array)
                    .unwrap_or_default();
                tags.push(TEST_FN_TAG.to_string());
                story_tests.push(CsfTest {
                    id: to_test_id(&id, call.name)
                        .map_err(|e| CsfError::invalid_meta(self.file, e.to_string()))?,
                    name: call.name.to_string(),
                    tags,
                    location: Location::from_offset(self.source, call.span.start),
                });
            }

            let mut tags = annotations.tags;
            if annotations.has_play && !tags.iter().any(|t| t == PLAY_FN_TAG) {
                tags.push(PLAY_FN_TAG.to_string());
            }

            stories.push(CsfStory {
                export_name: export.export_name.clone(),
                id,
                name: annotations
                    .name
                    .or(annotations.story_name)
                    .unwrap_or(export_story_name),
                kind,
                tags,
                args: annotations.args,
                parameters: annotations.parameters,
                tests: story_tests,
                location: Location::from_offset(self.source, export.span.start),
            });
        }

        if let Some(order) = named_order {
            stories = self.apply_named_order(stories, &order)?;
        }

        Ok(CsfFile {
            file_name: self.file.to_string(),
            meta,
            title,
            stories,
            imports,
        })
    }

    /// Follow identifiers to their top-level initialiser
    fn resolve(&self, mut expr: &'m Expr) -> &'m Expr {
        for _ in 0..8 {
            let ExprKind::Ident(name) = &expr.kind else {
                break;
            };
            match self.locals.get(name.as_str()) {
                Some(next) => expr = *next,
                None => break,
            }
        }
        expr
    }

    /// The object literal behind a default export; `None` for an empty
    /// `preview.meta()` call
    fn meta_object(&self, expr: &'m Expr) -> CsfResult<Option<&'m Expr>> {
        let expr = self.resolve(expr);
        match &expr.kind {
            ExprKind::Object(_) => Ok(Some(expr)),
            ExprKind::Call { callee, args } if is_meta_factory(callee) => {
                match args.first().map(|a| self.resolve(a)) {
                    None => Ok(None),
                    Some(arg) if matches!(arg.kind, ExprKind::Object(_)) => Ok(Some(arg)),
                    Some(_) => Err(CsfError::invalid_meta(
                        self.file,
                        "meta() must be called with an object literal",
                    )),
                }
            }
            _ => Err(CsfError::invalid_meta(
                self.file,
                "default export must be an object literal",
            )),
        }
    }

    /// CSF4 files have no default export: `const meta = preview.meta({...})`
    fn find_meta_factory(&self) -> Option<Option<&'m Expr>> {
        self.module.items.iter().find_map(|item| match item {
            Item::Declaration(Declaration::Variable { declarators, .. })
            | Item::ExportDecl(Declaration::Variable { declarators, .. }) => {
                declarators.iter().find_map(|declarator| {
                    let init = declarator.init.as_ref()?;
                    match &init.kind {
                        ExprKind::Call { callee, args } if is_meta_factory(callee) => Some(
                            args.first()
                                .map(|a| self.resolve(a))
                                .filter(|a| matches!(a.kind, ExprKind::Object(_))),
                        ),
                        _ => None,
                    }
                })
            }
            _ => None,
        })
    }

    fn read_meta(&self, object: Option<&'m Expr>) -> CsfResult<CsfMeta> {
        let Some(object) = object else {
            return Ok(CsfMeta::default());
        };

        let title = match object.get("title") {
            None => None,
            Some(value) => match value.as_str() {
                Some(title) => Some(title.to_string()),
                None => {
                    return Err(CsfError::invalid_meta(
                        self.file,
                        "meta title must be a static string",
                    ))
                }
            },
        };

        let mut tags = object
            .get("tags")
            .and_then(Expr::string_array)
            .unwrap_or_default();
        if object.get("play").is_some() && !tags.iter().any(|t| t == PLAY_FN_TAG) {
            tags.push(PLAY_FN_TAG.to_string());
        }

        Ok(CsfMeta {
            title,
            id: object
                .get("id")
                .and_then(Expr::as_str)
                .map(str::to_string),
            component: object
                .get("component")
                .and_then(Expr::member_path)
                .map(|path| path.join(".")),
            tags,
            parameters: object.get("parameters").and_then(Expr::to_json),
            args: object.get("args").and_then(Expr::to_json),
            include_stories: self.export_matcher(object.get("includeStories"), "includeStories")?,
            exclude_stories: self.export_matcher(object.get("excludeStories"), "excludeStories")?,
        })
    }

    fn export_matcher(
        &self,
        expr: Option<&'m Expr>,
        field: &str,
    ) -> CsfResult<Option<ExportMatcher>> {
        let Some(expr) = expr else {
            return Ok(None);
        };

        let expr = self.resolve(expr);
        match &expr.kind {
            ExprKind::Array(_) => Ok(expr.string_array().map(ExportMatcher::Names)),
            ExprKind::Str(name) => Ok(Some(ExportMatcher::Names(vec![name.clone()]))),
            ExprKind::Regex { pattern, flags } => ExportMatcher::from_js_regex(pattern, flags)
                .map(Some)
                .map_err(|e| {
                    CsfError::invalid_meta(self.file, format!("invalid {} pattern: {}", field, e))
                }),
            _ => Err(CsfError::invalid_meta(
                self.file,
                format!("{} must be an array of names or a regular expression", field),
            )),
        }
    }

    fn read_story(&self, export: &StoryExport<'m>) -> (StoryKind, StoryAnnotations) {
        if export.is_function {
            return (StoryKind::Function, StoryAnnotations::default());
        }
        let Some(init) = export.init else {
            return (StoryKind::Object, StoryAnnotations::default());
        };

        let init = self.resolve(init);
        match &init.kind {
            ExprKind::Object(_) => (StoryKind::Object, StoryAnnotations::from_object(init)),
            ExprKind::Call { callee, args } => match &callee.kind {
                ExprKind::Member { property, .. } if property == "story" || property == "extend" => {
                    let annotations = args
                        .first()
                        .map(|a| self.resolve(a))
                        .filter(|a| matches!(a.kind, ExprKind::Object(_)))
                        .map(StoryAnnotations::from_object)
                        .unwrap_or_default();
                    (StoryKind::Factory, annotations)
                }
                _ => (StoryKind::Function, StoryAnnotations::default()),
            },
            ExprKind::Function { .. } => (StoryKind::Function, StoryAnnotations::default()),
            _ => (StoryKind::Object, StoryAnnotations::default()),
        }
    }

    /// `Local.field = value` assignments grouped by local name, in source order
    fn collect_assignments(&self) -> HashMap<&'m str, Vec<(&'m str, &'m Expr)>> {
        let mut assignments: HashMap<&'m str, Vec<(&'m str, &'m Expr)>> = HashMap::new();
        for item in &self.module.items {
            if let Item::Assignment(assignment) = item {
                if let [local, field] = assignment.target.as_slice() {
                    assignments
                        .entry(local.as_str())
                        .or_default()
                        .push((field.as_str(), &assignment.value));
                }
            }
        }
        assignments
    }

    /// `Local.test('name', [options,] fn)` calls in source order
    fn collect_tests(&self) -> Vec<TestCall<'m>> {
        let mut tests = Vec::new();
        for item in &self.module.items {
            let Item::Expression(expr) = item else {
                continue;
            };
            let ExprKind::Call { callee, args } = &expr.kind else {
                continue;
            };
            let ExprKind::Member { object, property } = &callee.kind else {
                continue;
            };
            let (Some(local), true) = (object.as_ident(), property == "test") else {
                continue;
            };
            let Some(name) = args.first().and_then(Expr::as_str) else {
                continue;
            };

            let options = if args.len() >= 3 {
                args.get(1)
                    .filter(|a| matches!(a.kind, ExprKind::Object(_)))
            } else {
                None
            };

            tests.push(TestCall {
                local,
                name,
                options,
                span: expr.span.clone(),
            });
        }
        tests
    }

    /// Reorder by `__namedExportsOrder`; every story must be listed
    fn apply_named_order(
        &self,
        stories: Vec<CsfStory>,
        order: &[String],
    ) -> CsfResult<Vec<CsfStory>> {
        let mut remaining = stories;
        let mut ordered = Vec::with_capacity(remaining.len());

        for name in order {
            if let Some(pos) = remaining.iter().position(|s| &s.export_name == name) {
                ordered.push(remaining.remove(pos));
            }
        }

        if !remaining.is_empty() {
            let missing: Vec<&str> = remaining.iter().map(|s| s.export_name.as_str()).collect();
            return Err(CsfError::invalid_meta(
                self.file,
                format!("Missing exports after sort: {}", missing.join(", ")),
            ));
        }

        Ok(ordered)
    }
}

/// `preview.meta(...)`
fn is_meta_factory(callee: &Expr) -> bool {
    matches!(&callee.kind, ExprKind::Member { property, .. } if property == "meta")
}
