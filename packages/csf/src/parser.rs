use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{tokenize, tokenize_from, Lexeme, SlashKind, Token};

/// Deepest expression nesting accepted before the file is rejected
pub const MAX_NESTING: usize = 64;

/// Recursive-descent parser for the top level of a JavaScript/TypeScript module.
///
/// Expressions are parsed structurally where they can carry story metadata
/// (object and array literals, calls, member chains, literals). Function
/// bodies, JSX, class bodies and type annotations are skipped by bracket
/// balancing. JSX text is scanned raw, since it is not JavaScript.
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Lexeme<'src>>,
    pos: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a complete module
    pub fn parse_module(&mut self) -> ParseResult<Module> {
        let mut module = Module::default();
        self.skip_hashbang();

        while !self.is_at_end() {
            if self.match_token(&Token::Semicolon) {
                continue;
            }
            let item = self.parse_item()?;
            module.items.push(item);
        }

        Ok(module)
    }

    fn parse_item(&mut self) -> ParseResult<Item> {
        let start = self.current_start();

        match self.peek().cloned() {
            Some(Token::Import) => match (self.peek_at(1), self.peek_at(2)) {
                (Some(Token::LParen | Token::Dot), _) => self.parse_expression_statement(),
                (Some(Token::Ident(_)), Some(Token::Eq)) => self.skip_item(start),
                _ => Ok(Item::Import(self.parse_import()?)),
            },
            Some(Token::Export) => self.parse_export(),
            Some(Token::Const) if self.ident_at(1, "enum") => self.skip_item(start),
            Some(Token::Const | Token::Let | Token::Var) => {
                Ok(Item::Declaration(self.parse_variable_declaration()?))
            }
            Some(Token::Function) => Ok(Item::Declaration(
                self.parse_function_declaration(start, false)?,
            )),
            Some(Token::Ident("async")) if self.function_follows() => {
                self.advance();
                Ok(Item::Declaration(
                    self.parse_function_declaration(start, true)?,
                ))
            }
            Some(Token::Class) => Ok(Item::Declaration(self.parse_class_declaration(start)?)),
            Some(Token::Ident("abstract")) if self.peek_at(1) == Some(&Token::Class) => {
                self.advance();
                Ok(Item::Declaration(self.parse_class_declaration(start)?))
            }
            Some(Token::Ident(word)) if self.starts_type_statement(word) => self.skip_item(start),
            Some(Token::Ident(word)) if is_control_keyword(word) => self.skip_item(start),
            Some(Token::LBrace) => {
                self.skip_balanced()?;
                Ok(Item::Other(start..self.prev_end()))
            }
            Some(Token::Op("@")) => {
                self.skip_decorator()?;
                self.parse_item()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn skip_item(&mut self, start: usize) -> ParseResult<Item> {
        self.skip_statement()?;
        Ok(Item::Other(start..self.prev_end()))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Item> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;

        let item = match expr.kind {
            ExprKind::Assign { target, value } => match target.member_path() {
                Some(path) if path.len() > 1 => Item::Assignment(Assignment {
                    target: path,
                    value: *value,
                    span: expr.span,
                }),
                _ => Item::Expression(Expr::new(ExprKind::Assign { target, value }, expr.span)),
            },
            kind => Item::Expression(Expr::new(kind, expr.span)),
        };

        Ok(item)
    }

    /// Parse an import declaration
    fn parse_import(&mut self) -> ParseResult<ImportDecl> {
        let start = self.expect(Token::Import, "'import'")?.start;

        let type_only = self.check_ident("type")
            && matches!(
                self.peek_at(1),
                Some(Token::LBrace | Token::Op("*")) | Some(Token::Ident(_))
            )
            && !self.ident_at(1, "from");
        if type_only {
            self.advance();
        }

        let mut specifiers = Vec::new();

        // Side-effect import
        if let Some(Token::Str(_)) = self.peek() {
            let source = self.expect_string()?;
            self.skip_import_attributes()?;
            self.consume_semicolon()?;
            return Ok(ImportDecl {
                source,
                specifiers,
                type_only,
                span: start..self.prev_end(),
            });
        }

        if let Some(Token::Ident(local)) = self.peek().cloned() {
            self.advance();
            specifiers.push(ImportSpecifier::Default {
                local: local.to_string(),
            });
            self.match_token(&Token::Comma);
        }

        if self.check_op("*") {
            self.advance();
            self.expect_contextual("as")?;
            let local = self.expect_ident()?;
            specifiers.push(ImportSpecifier::Namespace { local });
        } else if self.match_token(&Token::LBrace) {
            while !self.check(&Token::RBrace) {
                if self.check_ident("type")
                    && !matches!(
                        self.peek_at(1),
                        Some(Token::Comma | Token::RBrace) | Some(Token::Ident("as"))
                    )
                {
                    self.advance();
                }
                let imported = self.parse_module_export_name()?;
                let local = if self.check_ident("as") {
                    self.advance();
                    self.expect_ident()?
                } else {
                    imported.clone()
                };
                specifiers.push(ImportSpecifier::Named { imported, local });

                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RBrace, "'}'")?;
        }

        self.expect_contextual("from")?;
        let source = self.expect_string()?;
        self.skip_import_attributes()?;
        self.consume_semicolon()?;

        Ok(ImportDecl {
            source,
            specifiers,
            type_only,
            span: start..self.prev_end(),
        })
    }

    /// Skip `with { type: 'json' }` / `assert { ... }`
    fn skip_import_attributes(&mut self) -> ParseResult<()> {
        if (self.check_ident("with") || self.check_ident("assert"))
            && !self.newline_at(0)
            && self.peek_at(1) == Some(&Token::LBrace)
        {
            self.advance();
            self.skip_balanced()?;
        }
        Ok(())
    }

    /// Parse an export declaration
    fn parse_export(&mut self) -> ParseResult<Item> {
        let start = self.expect(Token::Export, "'export'")?.start;

        match self.peek().cloned() {
            Some(Token::Default) => {
                self.advance();
                if let Some(Token::Ident(word)) = self.peek().cloned() {
                    if self.starts_type_statement(word) {
                        return self.skip_item(start);
                    }
                }
                let expr = self.parse_assign_expr()?;
                self.consume_semicolon()?;
                Ok(Item::ExportDefault(ExportDefault {
                    expr,
                    span: start..self.prev_end(),
                }))
            }
            Some(Token::Const) if self.ident_at(1, "enum") => self.skip_item(start),
            Some(Token::Const | Token::Let | Token::Var) => {
                Ok(Item::ExportDecl(self.parse_variable_declaration()?))
            }
            Some(Token::Function) => {
                let decl_start = self.current_start();
                Ok(Item::ExportDecl(
                    self.parse_function_declaration(decl_start, false)?,
                ))
            }
            Some(Token::Ident("async")) if self.function_follows() => {
                let decl_start = self.current_start();
                self.advance();
                Ok(Item::ExportDecl(
                    self.parse_function_declaration(decl_start, true)?,
                ))
            }
            Some(Token::Class) => {
                let decl_start = self.current_start();
                Ok(Item::ExportDecl(self.parse_class_declaration(decl_start)?))
            }
            Some(Token::Ident("abstract")) if self.peek_at(1) == Some(&Token::Class) => {
                let decl_start = self.current_start();
                self.advance();
                Ok(Item::ExportDecl(self.parse_class_declaration(decl_start)?))
            }
            Some(Token::LBrace) => self.parse_export_named(start),
            Some(Token::Op("*")) => self.parse_export_all(start),
            Some(Token::Ident("type")) if self.peek_at(1) == Some(&Token::LBrace) => {
                self.skip_item(start)
            }
            Some(Token::Ident(word)) if self.starts_type_statement(word) => self.skip_item(start),
            Some(Token::Eq) => self.skip_item(start),
            _ => Err(self.error_here("declaration after 'export'")),
        }
    }

    fn parse_export_named(&mut self, start: usize) -> ParseResult<Item> {
        self.expect(Token::LBrace, "'{'")?;
        let mut specifiers = Vec::new();

        while !self.check(&Token::RBrace) {
            let type_only = self.check_ident("type")
                && !matches!(
                    self.peek_at(1),
                    Some(Token::Comma | Token::RBrace) | Some(Token::Ident("as"))
                );
            if type_only {
                self.advance();
            }

            let local = self.parse_module_export_name()?;
            let exported = if self.check_ident("as") {
                self.advance();
                self.parse_module_export_name()?
            } else {
                local.clone()
            };

            if !type_only {
                specifiers.push(ExportSpecifier { local, exported });
            }

            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "'}'")?;

        let source = if self.check_ident("from") {
            self.advance();
            Some(self.expect_string()?)
        } else {
            None
        };
        self.skip_import_attributes()?;
        self.consume_semicolon()?;

        Ok(Item::ExportNamed(ExportNamed {
            specifiers,
            source,
            span: start..self.prev_end(),
        }))
    }

    fn parse_export_all(&mut self, start: usize) -> ParseResult<Item> {
        self.advance(); // consume '*'
        let alias = if self.check_ident("as") {
            self.advance();
            Some(self.parse_module_export_name()?)
        } else {
            None
        };
        self.expect_contextual("from")?;
        let source = self.expect_string()?;
        self.skip_import_attributes()?;
        self.consume_semicolon()?;
        let span = start..self.prev_end();

        Ok(match alias {
            Some(exported) => Item::ExportNamed(ExportNamed {
                specifiers: vec![ExportSpecifier {
                    local: "*".to_string(),
                    exported,
                }],
                source: Some(source),
                span,
            }),
            None => Item::ExportAll { source, span },
        })
    }

    /// Parse `const|let|var` with one or more declarators
    fn parse_variable_declaration(&mut self) -> ParseResult<Declaration> {
        let start = self.current_start();
        let kind = match self.advance().map(|l| l.token) {
            Some(Token::Const) => VarKind::Const,
            Some(Token::Let) => VarKind::Let,
            Some(Token::Var) => VarKind::Var,
            _ => return Err(ParseError::invalid_syntax(start..start, "expected declaration")),
        };

        let mut declarators = Vec::new();
        loop {
            let decl_start = self.current_start();
            let name = match self.peek().cloned() {
                Some(Token::Ident(name)) => {
                    self.advance();
                    Some(name.to_string())
                }
                Some(Token::LBrace | Token::LBracket) => {
                    self.skip_balanced()?;
                    None
                }
                _ => return Err(self.error_here("binding name")),
            };

            // Definite assignment `let x!: T`
            if self.check(&Token::Bang) {
                self.advance();
            }
            if self.match_token(&Token::Colon) {
                self.skip_type(false)?;
            }
            let init = if self.match_token(&Token::Eq) {
                Some(self.parse_assign_expr()?)
            } else {
                None
            };

            declarators.push(Declarator {
                name,
                init,
                span: decl_start..self.prev_end(),
            });

            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.consume_semicolon()?;

        Ok(Declaration::Variable {
            kind,
            declarators,
            span: start..self.prev_end(),
        })
    }

    fn parse_function_declaration(
        &mut self,
        start: usize,
        is_async: bool,
    ) -> ParseResult<Declaration> {
        self.expect(Token::Function, "'function'")?;
        if self.check_op("*") {
            self.advance();
        }
        let name = self.expect_ident()?;
        self.skip_function_rest(false)?;

        Ok(Declaration::Function {
            name,
            is_async,
            span: start..self.prev_end(),
        })
    }

    fn parse_class_declaration(&mut self, start: usize) -> ParseResult<Declaration> {
        self.expect(Token::Class, "'class'")?;
        let name = self.expect_ident()?;
        self.skip_class_rest()?;

        Ok(Declaration::Class {
            name,
            span: start..self.prev_end(),
        })
    }

    /// Skip type parameters, parameter list, return type and body
    fn skip_function_rest(&mut self, require_body: bool) -> ParseResult<()> {
        if self.check(&Token::Lt) {
            self.skip_angles(true)?;
        }
        if !self.check(&Token::LParen) {
            return Err(self.error_here("'('"));
        }
        self.skip_balanced()?;
        if self.match_token(&Token::Colon) {
            self.skip_type(false)?;
        }

        if self.check(&Token::LBrace) {
            self.skip_balanced()?;
            Ok(())
        } else if require_body {
            Err(self.error_here("function body"))
        } else {
            // Overload signature
            self.consume_semicolon()
        }
    }

    /// Skip type parameters, heritage clauses and the class body
    fn skip_class_rest(&mut self) -> ParseResult<()> {
        loop {
            match self.peek() {
                Some(Token::LBrace) => break,
                Some(Token::Lt) => self.skip_angles(true)?,
                Some(Token::LParen) => {
                    self.skip_balanced()?;
                }
                Some(_) => {
                    self.advance();
                }
                None => return Err(self.error_here("class body")),
            }
        }
        self.skip_balanced()?;
        Ok(())
    }

    fn skip_decorator(&mut self) -> ParseResult<()> {
        self.advance(); // consume '@'
        let target = self.parse_primary()?;
        self.parse_postfix(target)?;
        Ok(())
    }

    /// Skip a statement the extractor does not model (type declarations,
    /// control flow). Ends at a semicolon or at a line break that can end
    /// the statement.
    fn skip_statement(&mut self) -> ParseResult<()> {
        let mut depth = 0usize;

        while let Some(lexeme) = self.advance() {
            match lexeme.token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    if depth == 0 {
                        return Err(ParseError::unexpected_token(
                            lexeme.span,
                            "statement",
                            lexeme.token.to_string(),
                        ));
                    }
                    depth -= 1;
                }
                Token::Semicolon if depth == 0 => return Ok(()),
                _ => {}
            }

            if depth == 0 {
                match self.tokens.get(self.pos) {
                    None => return Ok(()),
                    Some(next)
                        if next.newline_before
                            && lexeme.token.ends_expression()
                            && !continues_statement(&next.token) =>
                    {
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }

        if depth > 0 {
            Err(ParseError::unexpected_eof(self.source.len(), "closing bracket"))
        } else {
            Ok(())
        }
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    /// Comma-separated sequence; multiple members collapse to an opaque expression
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        let first = self.parse_assign_expr()?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }

        let start = first.span.start;
        while self.match_token(&Token::Comma) {
            self.parse_assign_expr()?;
        }
        Ok(Expr::opaque(start..self.prev_end()))
    }

    fn parse_assign_expr(&mut self) -> ParseResult<Expr> {
        self.nested(Self::assign_expr)
    }

    /// Run `parse` one nesting level deeper, failing past `MAX_NESTING`
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::invalid_syntax(
                self.current_span(),
                format!("expression nested deeper than {} levels", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn assign_expr(&mut self) -> ParseResult<Expr> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }

        let start = self.current_start();
        let left = self.parse_unary()?;

        if self.match_token(&Token::Eq) {
            let value = self.parse_assign_expr()?;
            return Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(left),
                    value: Box::new(value),
                },
                start..self.prev_end(),
            ));
        }

        if !self.binary_op_ahead() {
            return Ok(left);
        }

        while self.binary_op_ahead() {
            if self.match_token(&Token::Question) {
                self.parse_assign_expr()?;
                self.expect(Token::Colon, "':'")?;
                self.parse_assign_expr()?;
                break;
            }

            let compound = matches!(self.peek(), Some(Token::Op(op)) if op.len() > 1 && op.ends_with('=') && !matches!(*op, "==" | "===" | "!=" | "!==" | "<=" | ">="));
            self.advance();
            if compound {
                self.parse_assign_expr()?;
                break;
            }
            match self.try_parse_arrow()? {
                Some(_) => {}
                None => {
                    self.parse_unary()?;
                }
            }
        }

        Ok(Expr::opaque(start..self.prev_end()))
    }

    /// Parse an arrow function if one starts here, restoring the position otherwise
    fn try_parse_arrow(&mut self) -> ParseResult<Option<Expr>> {
        let save = self.pos;
        let start = self.current_start();

        let is_async = self.check_ident("async")
            && !self.newline_at(1)
            && matches!(
                self.peek_at(1),
                Some(Token::Ident(_) | Token::LParen | Token::Lt)
            );
        if is_async {
            self.advance();
        }

        let is_arrow = match self.peek().cloned() {
            Some(Token::Ident(_)) if self.peek_at(1) == Some(&Token::Arrow) => {
                self.advance();
                true
            }
            Some(Token::LParen) => {
                self.skip_balanced()?;
                self.arrow_follows_params()
            }
            Some(Token::Lt) if self.looks_like_type_params() => {
                self.skip_angles(true)?;
                if self.check(&Token::LParen) {
                    self.skip_balanced()?;
                    self.arrow_follows_params()
                } else {
                    false
                }
            }
            _ => false,
        };

        if !is_arrow {
            self.pos = save;
            return Ok(None);
        }

        self.expect(Token::Arrow, "'=>'")?;
        if self.check(&Token::LBrace) {
            self.skip_balanced()?;
        } else {
            self.parse_assign_expr()?;
        }

        Ok(Some(Expr::new(
            ExprKind::Function {
                is_async,
                kind: FunctionKind::Arrow,
            },
            start..self.prev_end(),
        )))
    }

    /// After a parameter list: `=>` directly, or a return type then `=>`.
    /// Leaves the position at the arrow when true.
    fn arrow_follows_params(&mut self) -> bool {
        if self.check(&Token::Arrow) {
            return true;
        }
        if !self.check(&Token::Colon) {
            return false;
        }

        let save = self.pos;
        self.advance();
        if self.skip_type(true).is_ok() && self.check(&Token::Arrow) {
            return true;
        }
        self.pos = save;
        false
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();

        match self.peek().cloned() {
            Some(Token::Bang | Token::Typeof | Token::Void)
            | Some(Token::Op("-" | "+" | "~" | "++" | "--")) => {
                let op = self.advance().map(|l| l.token);
                let operand = self.nested(Self::parse_unary)?;
                let span = start..self.prev_end();
                match (op, operand.kind) {
                    (Some(Token::Op("-")), ExprKind::Number(n)) => {
                        Ok(Expr::new(ExprKind::Number(-n), span))
                    }
                    (Some(Token::Op("+")), ExprKind::Number(n)) => {
                        Ok(Expr::new(ExprKind::Number(n), span))
                    }
                    _ => Ok(Expr::opaque(span)),
                }
            }
            Some(Token::Ident("await" | "delete" | "yield"))
                if !self.newline_at(1) && self.starts_expression_at(1) =>
            {
                self.advance();
                self.nested(Self::parse_unary)?;
                Ok(Expr::opaque(start..self.prev_end()))
            }
            Some(Token::New) => {
                self.advance();
                if self.match_token(&Token::Dot) {
                    self.expect_property_name()?;
                } else {
                    let callee = self.parse_primary()?;
                    self.parse_postfix(callee)?;
                }
                Ok(Expr::opaque(start..self.prev_end()))
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(lexeme) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error_here("expression"));
        };
        let span = lexeme.span.clone();

        match lexeme.token {
            Token::LBrace => self.parse_object(),
            Token::LBracket => self.parse_array(),
            Token::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Str(raw) => {
                self.advance();
                Ok(Expr::new(ExprKind::Str(unescape_string(raw)), span))
            }
            Token::Template(raw) => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Template {
                        quasi: template_quasi(raw),
                    },
                    span,
                ))
            }
            Token::Number(text) => {
                self.advance();
                Ok(match parse_number(text) {
                    Some(n) => Expr::new(ExprKind::Number(n), span),
                    None => Expr::opaque(span),
                })
            }
            Token::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), span))
            }
            Token::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), span))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::new(ExprKind::Null, span))
            }
            Token::Slash(SlashKind::Regex(raw)) => {
                self.advance();
                let close = raw.rfind('/').unwrap_or(0).max(1);
                Ok(Expr::new(
                    ExprKind::Regex {
                        pattern: raw[1..close].to_string(),
                        flags: raw[close + 1..].to_string(),
                    },
                    span,
                ))
            }
            Token::Function => self.parse_function_expr(span.start, false),
            Token::Ident("async") if self.function_follows() => {
                self.advance();
                self.parse_function_expr(span.start, true)
            }
            Token::Class => {
                self.advance();
                if let Some(Token::Ident(name)) = self.peek() {
                    if *name != "extends" && *name != "implements" {
                        self.advance();
                    }
                }
                self.skip_class_rest()?;
                Ok(Expr::new(
                    ExprKind::Function {
                        is_async: false,
                        kind: FunctionKind::Class,
                    },
                    span.start..self.prev_end(),
                ))
            }
            Token::Ident("undefined") => {
                self.advance();
                Ok(Expr::new(ExprKind::Undefined, span))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Ident(name.to_string()), span))
            }
            Token::Import => {
                // `import(...)` and `import.meta`
                self.advance();
                Ok(Expr::new(ExprKind::Ident("import".to_string()), span))
            }
            Token::Lt => {
                self.skip_jsx()?;
                Ok(Expr::opaque(span.start..self.prev_end()))
            }
            other => Err(ParseError::unexpected_token(
                span,
                "expression",
                other.to_string(),
            )),
        }
    }

    fn parse_function_expr(&mut self, start: usize, is_async: bool) -> ParseResult<Expr> {
        self.expect(Token::Function, "'function'")?;
        if self.check_op("*") {
            self.advance();
        }
        if let Some(Token::Ident(_)) = self.peek() {
            self.advance();
        }
        self.skip_function_rest(true)?;

        Ok(Expr::new(
            ExprKind::Function {
                is_async,
                kind: FunctionKind::Function,
            },
            start..self.prev_end(),
        ))
    }

    /// Member access, calls, non-null assertions and `as`/`satisfies` clauses
    fn parse_postfix(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        let start = expr.span.start;

        loop {
            let Some(lexeme) = self.tokens.get(self.pos).cloned() else {
                break;
            };

            match lexeme.token {
                Token::Dot => {
                    self.advance();
                    let property = self.expect_property_name()?;
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        start..self.prev_end(),
                    );
                }
                Token::QuestionDot => {
                    self.advance();
                    match self.peek() {
                        Some(Token::LParen) => {
                            let args = self.parse_arguments()?;
                            expr = Expr::new(
                                ExprKind::Call {
                                    callee: Box::new(expr),
                                    args,
                                },
                                start..self.prev_end(),
                            );
                        }
                        Some(Token::LBracket) => {
                            self.skip_balanced()?;
                            expr = Expr::opaque(start..self.prev_end());
                        }
                        _ => {
                            let property = self.expect_property_name()?;
                            expr = Expr::new(
                                ExprKind::Member {
                                    object: Box::new(expr),
                                    property,
                                },
                                start..self.prev_end(),
                            );
                        }
                    }
                }
                Token::LParen => {
                    let args = self.parse_arguments()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        start..self.prev_end(),
                    );
                }
                Token::LBracket => {
                    self.skip_balanced()?;
                    expr = Expr::opaque(start..self.prev_end());
                }
                Token::Template(_) => {
                    self.advance();
                    expr = Expr::opaque(start..self.prev_end());
                }
                Token::Bang if !lexeme.newline_before => {
                    self.advance();
                }
                Token::Op("++" | "--") if !lexeme.newline_before => {
                    self.advance();
                    expr = Expr::opaque(start..self.prev_end());
                }
                Token::Ident("as" | "satisfies") if !lexeme.newline_before => {
                    self.advance();
                    self.skip_type(false)?;
                }
                Token::Lt if !lexeme.newline_before && self.type_arguments_then_call() => {
                    self.skip_angles(false)?;
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();

        while !self.check(&Token::RParen) {
            let arg_start = self.current_start();
            if self.match_token(&Token::Ellipsis) {
                self.parse_assign_expr()?;
                args.push(Expr::opaque(arg_start..self.prev_end()));
            } else {
                args.push(self.parse_assign_expr()?);
            }
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;

        Ok(args)
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        let start = self.expect(Token::LBrace, "'{'")?.start;
        let mut properties = Vec::new();

        while !self.check(&Token::RBrace) {
            let prop_start = self.current_start();

            if self.match_token(&Token::Ellipsis) {
                let value = self.parse_assign_expr()?;
                properties.push(Property {
                    key: PropertyKey::Spread,
                    value,
                    span: prop_start..self.prev_end(),
                });
            } else {
                if matches!(self.peek(), Some(Token::Ident("get" | "set" | "async")))
                    && self.property_key_at(1)
                {
                    self.advance();
                }
                if self.check_op("*") {
                    self.advance();
                }

                let key_span = self.current_span();
                let key = self.parse_property_key()?;

                let value = match self.peek() {
                    Some(Token::Colon) => {
                        self.advance();
                        self.parse_assign_expr()?
                    }
                    Some(Token::LParen | Token::Lt) => {
                        self.skip_function_rest(true)?;
                        Expr::new(
                            ExprKind::Function {
                                is_async: false,
                                kind: FunctionKind::Function,
                            },
                            key_span.start..self.prev_end(),
                        )
                    }
                    Some(Token::Comma | Token::RBrace) => match &key {
                        PropertyKey::Named(name) => {
                            Expr::new(ExprKind::Ident(name.clone()), key_span)
                        }
                        _ => return Err(self.error_here("':'")),
                    },
                    Some(Token::Eq) => {
                        self.advance();
                        self.parse_assign_expr()?;
                        Expr::opaque(key_span.start..self.prev_end())
                    }
                    _ => return Err(self.error_here("':'")),
                };

                properties.push(Property {
                    key,
                    value,
                    span: prop_start..self.prev_end(),
                });
            }

            if !self.match_token(&Token::Comma) {
                break;
            }
        }

        let end = self.expect(Token::RBrace, "'}'")?.end;
        Ok(Expr::new(ExprKind::Object(properties), start..end))
    }

    fn parse_property_key(&mut self) -> ParseResult<PropertyKey> {
        let Some(lexeme) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error_here("property name"));
        };

        if let Some(keyword) = lexeme.token.keyword_text() {
            self.advance();
            return Ok(PropertyKey::Named(keyword.to_string()));
        }

        match lexeme.token {
            Token::Ident(name) => {
                self.advance();
                Ok(PropertyKey::Named(name.to_string()))
            }
            Token::Str(raw) => {
                self.advance();
                Ok(PropertyKey::Named(unescape_string(raw)))
            }
            Token::Number(text) => {
                self.advance();
                Ok(PropertyKey::Named(number_key(text)))
            }
            Token::LBracket => {
                self.advance();
                self.parse_assign_expr()?;
                self.expect(Token::RBracket, "']'")?;
                Ok(PropertyKey::Computed)
            }
            Token::Op("#") => {
                self.advance();
                let name = self.expect_ident()?;
                Ok(PropertyKey::Named(format!("#{}", name)))
            }
            other => Err(ParseError::unexpected_token(
                lexeme.span,
                "property name",
                other.to_string(),
            )),
        }
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let start = self.expect(Token::LBracket, "'['")?.start;
        let mut items = Vec::new();

        while !self.check(&Token::RBracket) {
            // Hole
            if self.match_token(&Token::Comma) {
                continue;
            }

            let item_start = self.current_start();
            if self.match_token(&Token::Ellipsis) {
                self.parse_assign_expr()?;
                items.push(Expr::opaque(item_start..self.prev_end()));
            } else {
                items.push(self.parse_assign_expr()?);
            }

            if !self.match_token(&Token::Comma) {
                break;
            }
        }

        let end = self.expect(Token::RBracket, "']'")?.end;
        Ok(Expr::new(ExprKind::Array(items), start..end))
    }

    // ---------------------------------------------------------------------
    // Skipping: brackets, types, JSX
    // ---------------------------------------------------------------------

    /// Consume a bracketed group starting at the current opener
    fn skip_balanced(&mut self) -> ParseResult<usize> {
        let Some(open) = self.advance() else {
            return Err(self.error_here("'('"));
        };
        let mut depth = 1usize;

        while let Some(lexeme) = self.advance() {
            match lexeme.token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(lexeme.span.end);
                    }
                }
                _ => {}
            }
        }

        Err(ParseError::unexpected_eof(
            self.source.len(),
            format!("closing bracket for {} at {}", open.token, open.span.start),
        ))
    }

    /// Consume `<...>` type parameters or arguments
    fn skip_angles(&mut self, allow_defaults: bool) -> ParseResult<()> {
        let open = self.expect(Token::Lt, "'<'")?;
        let mut depth = 1usize;

        loop {
            let Some(lexeme) = self.tokens.get(self.pos).cloned() else {
                return Err(ParseError::unexpected_eof(self.source.len(), "'>'"));
            };

            match lexeme.token {
                Token::Lt => {
                    self.advance();
                    depth += 1;
                }
                Token::Gt => {
                    self.advance();
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::LParen | Token::LBracket | Token::LBrace => {
                    self.skip_balanced()?;
                }
                Token::Eq if allow_defaults => {
                    self.advance();
                }
                Token::Ident(_)
                | Token::Str(_)
                | Token::Number(_)
                | Token::Template(_)
                | Token::Typeof
                | Token::Void
                | Token::Null
                | Token::True
                | Token::False
                | Token::Const
                | Token::New
                | Token::Dot
                | Token::Comma
                | Token::Pipe
                | Token::Amp
                | Token::Question
                | Token::Colon
                | Token::Arrow
                | Token::Ellipsis
                | Token::Op("-") => {
                    self.advance();
                }
                other => {
                    return Err(ParseError::invalid_syntax(
                        open.start..lexeme.span.end,
                        format!("unexpected {} in type arguments", other),
                    ));
                }
            }
        }
    }

    /// Consume a type annotation. Stops at the first token that cannot
    /// continue the type (`=`, `,`, `;`, closing brackets, a body `{`).
    fn skip_type(&mut self, stop_at_arrow: bool) -> ParseResult<()> {
        let start_pos = self.pos;
        let mut expect_operand = true;
        let mut last_was_group = false;
        let mut pending_conditional = 0usize;

        while let Some(token) = self.peek().cloned() {
            if expect_operand {
                match token {
                    Token::LParen | Token::LBracket | Token::LBrace => {
                        last_was_group = token == Token::LParen;
                        self.skip_balanced()?;
                    }
                    Token::Lt => {
                        self.skip_angles(true)?;
                        continue;
                    }
                    Token::Ident("keyof" | "readonly" | "unique" | "infer" | "asserts")
                        if self.type_operand_at(1) =>
                    {
                        self.advance();
                        continue;
                    }
                    Token::Typeof
                    | Token::New
                    | Token::Pipe
                    | Token::Amp
                    | Token::Ellipsis
                    | Token::Op("-") => {
                        self.advance();
                        continue;
                    }
                    Token::Ident(_)
                    | Token::Str(_)
                    | Token::Number(_)
                    | Token::Template(_)
                    | Token::True
                    | Token::False
                    | Token::Null
                    | Token::Void
                    | Token::Const
                    | Token::Import
                    | Token::Class
                    | Token::Default
                    | Token::Function => {
                        last_was_group = false;
                        self.advance();
                    }
                    _ => break,
                }
                expect_operand = false;
                continue;
            }

            let newline = self.newline_at(0);
            match token {
                Token::Dot => {
                    self.advance();
                    expect_operand = true;
                }
                Token::Lt if !newline => self.skip_angles(true)?,
                Token::LParen if !newline => {
                    // `import('./x')` type queries
                    self.skip_balanced()?;
                }
                Token::LBracket if !newline => {
                    self.skip_balanced()?;
                }
                Token::Pipe | Token::Amp => {
                    self.advance();
                    expect_operand = true;
                }
                Token::Ident("extends") => {
                    self.advance();
                    pending_conditional += 1;
                    expect_operand = true;
                }
                Token::Ident("is") => {
                    self.advance();
                    expect_operand = true;
                }
                Token::Question if pending_conditional > 0 => {
                    self.advance();
                    expect_operand = true;
                }
                Token::Colon if pending_conditional > 0 => {
                    self.advance();
                    pending_conditional -= 1;
                    expect_operand = true;
                }
                Token::Arrow if last_was_group && !stop_at_arrow => {
                    self.advance();
                    expect_operand = true;
                }
                _ => break,
            }
            last_was_group = false;
        }

        if self.pos == start_pos {
            return Err(self.error_here("type"));
        }
        Ok(())
    }

    /// Consume a JSX element or fragment starting at `<`
    fn skip_jsx(&mut self) -> ParseResult<()> {
        if self.skip_jsx_open_tag()? {
            return Ok(());
        }

        let mut depth = 1usize;
        loop {
            self.skip_jsx_text();
            match self.peek() {
                None => return Err(self.error_here("closing tag")),
                Some(Token::Lt) => {
                    if matches!(self.peek_at(1), Some(Token::Slash(_))) {
                        self.advance();
                        self.advance();
                        while !self.check(&Token::Gt) {
                            if self.advance().is_none() {
                                return Err(self.error_here("'>'"));
                            }
                        }
                        self.advance();
                        depth -= 1;
                        if depth == 0 {
                            return Ok(());
                        }
                    } else if !self.skip_jsx_open_tag()? {
                        depth += 1;
                    }
                }
                Some(Token::LBrace) => {
                    self.skip_balanced()?;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Skip JSX text up to the next `<` or `{`.
    ///
    /// Text can hold apostrophes and `//` that lex as strings or comments and
    /// swallow the tags after them, so when no token starts exactly where the
    /// text ends, the rest of the file is lexed again from there.
    fn skip_jsx_text(&mut self) {
        let text_start = self.prev_end();
        let text_end = self.source[text_start..]
            .find(|c| c == '<' || c == '{')
            .map_or(self.source.len(), |i| text_start + i);

        let next = self.tokens[self.pos..]
            .iter()
            .position(|l| l.span.start >= text_end)
            .map_or(self.tokens.len(), |i| self.pos + i);
        let aligned = self.tokens[self.pos..next]
            .iter()
            .all(|l| l.span.end <= text_end)
            && self
                .tokens
                .get(next)
                .map_or(text_end == self.source.len(), |l| l.span.start == text_end);

        if aligned {
            self.pos = next;
        } else {
            self.tokens.truncate(self.pos);
            self.tokens.extend(tokenize_from(self.source, text_end));
        }
    }

    /// Consume an opening tag; returns whether it was self-closing
    fn skip_jsx_open_tag(&mut self) -> ParseResult<bool> {
        self.expect(Token::Lt, "'<'")?;

        loop {
            match self.peek() {
                None => return Err(self.error_here("'>'")),
                Some(Token::Gt) => {
                    self.advance();
                    return Ok(false);
                }
                Some(Token::Slash(_)) if self.peek_at(1) == Some(&Token::Gt) => {
                    self.advance();
                    self.advance();
                    return Ok(true);
                }
                Some(Token::LBrace) => {
                    self.skip_balanced()?;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn skip_hashbang(&mut self) {
        if !self.source.starts_with("#!") {
            return;
        }
        self.advance();
        while let Some(lexeme) = self.tokens.get(self.pos) {
            if lexeme.newline_before {
                break;
            }
            self.pos += 1;
        }
    }

    // ---------------------------------------------------------------------
    // Lookahead predicates
    // ---------------------------------------------------------------------

    fn binary_op_ahead(&self) -> bool {
        match self.peek() {
            Some(Token::Op(op)) => !matches!(*op, "++" | "--" | "~" | "@" | "#"),
            Some(
                Token::Pipe
                | Token::Amp
                | Token::Lt
                | Token::Gt
                | Token::Question
                | Token::Slash(SlashKind::Divide),
            ) => true,
            Some(Token::Ident("in" | "instanceof")) => true,
            _ => false,
        }
    }

    fn function_follows(&self) -> bool {
        self.peek_at(1) == Some(&Token::Function) && !self.newline_at(1)
    }

    fn starts_type_statement(&self, word: &str) -> bool {
        if self.newline_at(1) {
            return false;
        }
        match word {
            "type" | "interface" => matches!(self.peek_at(1), Some(Token::Ident(_))),
            "enum" => matches!(self.peek_at(1), Some(Token::Ident(_))),
            "declare" => matches!(
                self.peek_at(1),
                Some(Token::Ident(_) | Token::Const | Token::Let | Token::Var)
                    | Some(Token::Function | Token::Class)
            ),
            "namespace" | "module" => {
                matches!(self.peek_at(1), Some(Token::Ident(_) | Token::Str(_)))
            }
            _ => false,
        }
    }

    /// `<T,>(...)`, `<T extends X>(...)` or `<T>(...)` before an arrow function
    fn looks_like_type_params(&self) -> bool {
        match (self.peek_at(1), self.peek_at(2), self.peek_at(3)) {
            (Some(Token::Const), _, _) => true,
            (Some(Token::Ident(_)), Some(Token::Comma), _) => true,
            (Some(Token::Ident(_)), Some(Token::Ident("extends")), _) => true,
            (Some(Token::Ident(_)), Some(Token::Gt), Some(Token::LParen)) => true,
            _ => false,
        }
    }

    /// Speculatively check for `<...>(` after a callee
    fn type_arguments_then_call(&mut self) -> bool {
        let save = self.pos;
        let result = self.skip_angles(false).is_ok()
            && self.check(&Token::LParen)
            && !self.newline_at(0);
        self.pos = save;
        result
    }

    fn property_key_at(&self, offset: usize) -> bool {
        match self.peek_at(offset) {
            Some(token) if token.keyword_text().is_some() => true,
            Some(
                Token::Ident(_) | Token::Str(_) | Token::Number(_) | Token::LBracket,
            ) => true,
            Some(Token::Op("*" | "#")) => true,
            _ => false,
        }
    }

    fn type_operand_at(&self, offset: usize) -> bool {
        if self.newline_at(offset) {
            return false;
        }
        matches!(
            self.peek_at(offset),
            Some(
                Token::Ident(_)
                    | Token::Str(_)
                    | Token::Number(_)
                    | Token::LParen
                    | Token::LBracket
                    | Token::LBrace
                    | Token::Typeof
                    | Token::Null
                    | Token::Void
            )
        )
    }

    fn starts_expression_at(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset),
            Some(
                Token::Ident(_)
                    | Token::Str(_)
                    | Token::Number(_)
                    | Token::Template(_)
                    | Token::Slash(SlashKind::Regex(_))
                    | Token::LParen
                    | Token::LBracket
                    | Token::LBrace
                    | Token::Lt
                    | Token::True
                    | Token::False
                    | Token::Null
                    | Token::New
                    | Token::Typeof
                    | Token::Void
                    | Token::Function
                    | Token::Class
                    | Token::Import
                    | Token::Bang
            ) | Some(Token::Op("-" | "+" | "~"))
        )
    }

    // ---------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|l| &l.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|l| &l.token)
    }

    fn newline_at(&self, offset: usize) -> bool {
        self.tokens
            .get(self.pos + offset)
            .map_or(false, |l| l.newline_before)
    }

    fn advance(&mut self) -> Option<Lexeme<'src>> {
        let lexeme = self.tokens.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: &Token) -> bool {
        match self.peek() {
            Some(t) => std::mem::discriminant(t) == std::mem::discriminant(token),
            None => false,
        }
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(n)) if *n == name)
    }

    fn ident_at(&self, offset: usize, name: &str) -> bool {
        matches!(self.peek_at(offset), Some(Token::Ident(n)) if *n == name)
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> ParseResult<Span> {
        if self.check(&token) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_contextual(&mut self, word: &str) -> ParseResult<()> {
        if self.check_ident(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("'{}'", word)))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here("identifier")),
        }
    }

    fn expect_string(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Str(raw)) => {
                let value = unescape_string(raw);
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here("string literal")),
        }
    }

    /// Property names after `.` accept reserved words and private names
    fn expect_property_name(&mut self) -> ParseResult<String> {
        if let Some(keyword) = self.peek().and_then(Token::keyword_text) {
            self.advance();
            return Ok(keyword.to_string());
        }
        if self.check_op("#") {
            self.advance();
            return Ok(format!("#{}", self.expect_ident()?));
        }
        self.expect_ident()
    }

    /// Names in import/export lists: identifiers, reserved words or strings
    fn parse_module_export_name(&mut self) -> ParseResult<String> {
        if let Some(Token::Str(_)) = self.peek() {
            return self.expect_string();
        }
        if let Some(keyword) = self.peek().and_then(Token::keyword_text) {
            self.advance();
            return Ok(keyword.to_string());
        }
        self.expect_ident()
    }

    fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.match_token(&Token::Semicolon) {
            return Ok(());
        }
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(next) if next.newline_before || next.token == Token::RBrace => Ok(()),
            Some(next) => Err(ParseError::unexpected_token(
                next.span.clone(),
                "';'",
                next.token.to_string(),
            )),
        }
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(lexeme) => lexeme.span.clone(),
            None => self.source.len()..self.source.len(),
        }
    }

    fn current_start(&self) -> usize {
        self.current_span().start
    }

    fn prev_end(&self) -> usize {
        match self.pos.checked_sub(1).and_then(|p| self.tokens.get(p)) {
            Some(lexeme) => lexeme.span.end,
            None => 0,
        }
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(lexeme) => ParseError::unexpected_token(
                lexeme.span.clone(),
                expected,
                lexeme.token.to_string(),
            ),
            None => ParseError::unexpected_eof(self.source.len(), expected),
        }
    }
}

fn is_control_keyword(word: &str) -> bool {
    matches!(
        word,
        "if" | "for" | "while" | "do" | "switch" | "try" | "throw" | "with"
    )
}

/// Tokens that continue a statement across a line break
fn continues_statement(token: &Token) -> bool {
    match token {
        Token::Pipe
        | Token::Amp
        | Token::Dot
        | Token::QuestionDot
        | Token::Eq
        | Token::Arrow
        | Token::Question
        | Token::Colon
        | Token::Slash(SlashKind::Divide) => true,
        Token::Op(op) => !matches!(*op, "++" | "--" | "@" | "#"),
        Token::Ident(word) => matches!(
            *word,
            "else" | "catch" | "finally" | "extends" | "implements" | "while"
        ),
        _ => false,
    }
}

/// Decode a quoted string literal
pub(crate) fn unescape_string(raw: &str) -> String {
    let body = raw
        .get(1..raw.len().saturating_sub(1))
        .unwrap_or_default();
    unescape(body)
}

/// Text of a template literal without interpolations
fn template_quasi(raw: &str) -> Option<String> {
    let body = raw.strip_prefix('`')?;
    let body = body.strip_suffix('`').unwrap_or(body);
    if body.contains("${") {
        None
    } else {
        Some(unescape(body))
    }
}

pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            // Line continuation
            Some('\n') => {}
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    // BigInt literals have no f64 equivalent
    if cleaned.ends_with('n') {
        return None;
    }

    let lower = cleaned.to_ascii_lowercase();
    let radix = |digits: &str, radix: u32| i64::from_str_radix(digits, radix).ok().map(|n| n as f64);
    if let Some(hex) = lower.strip_prefix("0x") {
        radix(hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        radix(oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        radix(bin, 2)
    } else {
        cleaned.parse::<f64>().ok()
    }
}

/// Numeric object keys are normalised the way JavaScript stringifies them
fn number_key(text: &str) -> String {
    match parse_number(text) {
        Some(n) if n.fract() == 0.0 && n.abs() < 9e15 => format!("{}", n as i64),
        Some(n) => n.to_string(),
        None => text.to_string(),
    }
}

/// Parse a module
pub fn parse(source: &str) -> ParseResult<Module> {
    Parser::new(source).parse_module()
}
