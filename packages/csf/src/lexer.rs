//! Lexer for story modules using logos
//!
//! Covers the JavaScript/TypeScript surface a story file uses at module level.
//! Regular expression and template literals need context the DFA cannot see,
//! so both are scanned by callbacks: templates track `${}` nesting, and a `/`
//! only starts a regex when the previous token leaves the lexer expecting an
//! operand. Comments also start with `/`, so the same callback skips them.

use logos::{Filter, Lexer, Logos};
use std::fmt;
use std::ops::Range;

/// Lexer state threaded through callbacks
#[derive(Debug, Clone, Copy)]
pub struct LexState {
    /// Whether a `/` at the current position starts a regular expression
    pub regex_allowed: bool,
}

impl Default for LexState {
    fn default() -> Self {
        Self {
            regex_allowed: true,
        }
    }
}

/// A `/` is either division or the start of a regular expression literal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlashKind<'src> {
    Divide,
    Regex(&'src str),
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(extras = LexState)]
#[logos(skip r"[ \t\r\n\f\u{feff}]+")]
pub enum Token<'src> {
    // Keywords
    #[token("export")]
    Export,
    #[token("default")]
    Default,
    #[token("import")]
    Import,
    #[token("const")]
    Const,
    #[token("let")]
    Let,
    #[token("var")]
    Var,
    #[token("function")]
    Function,
    #[token("class")]
    Class,
    #[token("return")]
    Return,
    #[token("new")]
    New,
    #[token("typeof")]
    Typeof,
    #[token("void")]
    Void,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Identifiers (contextual keywords like `as`, `from`, `type` stay identifiers)
    #[regex(r"[\p{XID_Start}_$][\p{XID_Continue}$\x{200C}\x{200D}]*", |lex| lex.slice())]
    Ident(&'src str),

    // Literals, kept raw including quotes
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice())]
    #[regex(r"'([^'\\\n]|\\.)*'", |lex| lex.slice())]
    Str(&'src str),

    // Unpaired quote, e.g. an apostrophe in JSX text
    #[token("'")]
    #[token("\"")]
    Quote,

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?n?", |lex| lex.slice())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    #[regex(r"0[xX][0-9a-fA-F_]+n?|0[oO][0-7_]+n?|0[bB][01_]+n?", |lex| lex.slice())]
    Number(&'src str),

    #[token("`", lex_template)]
    Template(&'src str),

    #[token("/", lex_slash)]
    Slash(SlashKind<'src>),

    // Punctuation
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("?.")]
    QuestionDot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=>")]
    Arrow,
    #[token("=")]
    Eq,
    #[token("!")]
    Bang,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("|")]
    Pipe,
    #[token("&")]
    Amp,

    // Every other operator; the parser never needs to tell them apart
    #[regex(r"===|!==|==|!=|<=|>=|&&=|\|\|=|\?\?=|\*\*=|\*\*|\+\+|--|&&|\|\||\?\?|\+=|-=|\*=|%=|&=|\|=|\^=|<<=|[+\-*%^~#@]", |lex| lex.slice())]
    Op(&'src str),
}

impl<'src> Token<'src> {
    /// Whether a `/` following this token starts a regular expression.
    ///
    /// `<` and `>` are excluded so JSX closing tags (`</div>`) and text
    /// lex as punctuation.
    fn allows_regex_after(&self) -> bool {
        match self {
            Token::LBrace
            | Token::LParen
            | Token::LBracket
            | Token::Semicolon
            | Token::Comma
            | Token::Colon
            | Token::Question
            | Token::Eq
            | Token::Arrow
            | Token::Bang
            | Token::Pipe
            | Token::Amp
            | Token::Return
            | Token::Typeof
            | Token::Void
            | Token::New
            | Token::Default
            | Token::Export => true,
            Token::Op(op) => *op != "++" && *op != "--",
            _ => false,
        }
    }

    /// Keyword text, for positions where JavaScript accepts reserved words as
    /// names (object keys, member access)
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Token::Export => "export",
            Token::Default => "default",
            Token::Import => "import",
            Token::Const => "const",
            Token::Let => "let",
            Token::Var => "var",
            Token::Function => "function",
            Token::Class => "class",
            Token::Return => "return",
            Token::New => "new",
            Token::Typeof => "typeof",
            Token::Void => "void",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            _ => return None,
        };
        Some(text)
    }

    /// Tokens that can end an expression; used for automatic semicolon insertion
    pub fn ends_expression(&self) -> bool {
        matches!(
            self,
            Token::Ident(_)
                | Token::Str(_)
                | Token::Number(_)
                | Token::Template(_)
                | Token::Slash(SlashKind::Regex(_))
                | Token::True
                | Token::False
                | Token::Null
                | Token::RParen
                | Token::RBracket
                | Token::RBrace
                | Token::Gt
        )
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(keyword) = self.keyword_text() {
            return write!(f, "keyword '{}'", keyword);
        }
        match self {
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Str(s) => write!(f, "string {}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Template(_) => write!(f, "template literal"),
            Token::Slash(SlashKind::Divide) => write!(f, "'/'"),
            Token::Slash(SlashKind::Regex(r)) => write!(f, "regex {}", r),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Semicolon => write!(f, "';'"),
            Token::Comma => write!(f, "','"),
            Token::Dot => write!(f, "'.'"),
            Token::Ellipsis => write!(f, "'...'"),
            Token::QuestionDot => write!(f, "'?.'"),
            Token::Question => write!(f, "'?'"),
            Token::Colon => write!(f, "':'"),
            Token::Arrow => write!(f, "'=>'"),
            Token::Eq => write!(f, "'='"),
            Token::Bang => write!(f, "'!'"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::Pipe => write!(f, "'|'"),
            Token::Amp => write!(f, "'&'"),
            Token::Op(op) => write!(f, "'{}'", op),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// A token with its byte range and whether a line break precedes it
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme<'src> {
    pub token: Token<'src>,
    pub span: Range<usize>,
    pub newline_before: bool,
}

fn lex_template<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Option<&'src str> {
    let len = template_len(lex.remainder());
    lex.bump(len);
    Some(lex.slice())
}

fn lex_slash<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Filter<SlashKind<'src>> {
    if let Some(len) = comment_len(lex.remainder()) {
        lex.bump(len);
        return Filter::Skip;
    }
    if !lex.extras.regex_allowed {
        return Filter::Emit(SlashKind::Divide);
    }

    match regex_len(lex.remainder()) {
        Some(len) => {
            lex.bump(len);
            Filter::Emit(SlashKind::Regex(lex.slice()))
        }
        None => Filter::Emit(SlashKind::Divide),
    }
}

/// Length of a line or block comment, given the text after the opening `/`.
/// A line comment stops before the newline; an unterminated block comment
/// runs to the end.
fn comment_len(rest: &str) -> Option<usize> {
    if let Some(body) = rest.strip_prefix('/') {
        return Some(1 + body.find('\n').unwrap_or(body.len()));
    }
    let body = rest.strip_prefix('*')?;
    Some(match body.find("*/") {
        Some(end) => 1 + end + 2,
        None => rest.len(),
    })
}

/// Length of a regex body plus flags, given the text after the opening `/`.
/// Returns `None` when the line ends before the closing `/`.
fn regex_len(rest: &str) -> Option<usize> {
    let mut in_class = false;
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\n' | '\r' => return None,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => {
                if i == 0 {
                    return None;
                }
                let flags = rest[i + 1..]
                    .chars()
                    .take_while(|c| c.is_ascii_alphabetic())
                    .count();
                return Some(i + 1 + flags);
            }
            _ => {}
        }
    }

    None
}

/// Length of a template literal body including the closing backtick, given
/// the text after the opening backtick. Unterminated templates run to the end.
fn template_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i += 2;
                i += interpolation_len(&rest[i..]);
            }
            _ => i += 1,
        }
    }

    rest.len()
}

/// Length of a `${ ... }` body including the closing brace
fn interpolation_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return i + 1;
                }
                depth -= 1;
            }
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'`' => {
                i += template_len(&rest[i + 1..]);
            }
            _ => {}
        }
        i += 1;
    }

    rest.len()
}

/// Tokenize a source string.
///
/// Characters the lexer does not recognise (stray quotes in JSX text, for
/// instance) are dropped.
pub fn tokenize(source: &str) -> Vec<Lexeme<'_>> {
    tokenize_from(source, 0)
}

/// Tokenize `source` starting at byte `offset`, with spans relative to the
/// whole source. The lexer starts fresh, expecting an operand.
pub fn tokenize_from(source: &str, offset: usize) -> Vec<Lexeme<'_>> {
    let rest = &source[offset..];
    let mut lexer = Token::lexer(rest);
    let mut lexemes = Vec::new();
    let mut last_end = 0;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let Ok(token) = result else {
            continue;
        };

        lexer.extras.regex_allowed = token.allows_regex_after();
        let newline_before = rest[last_end..span.start].contains('\n');
        last_end = span.end;

        lexemes.push(Lexeme {
            token,
            span: span.start + offset..span.end + offset,
            newline_before,
        });
    }

    lexemes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        tokenize(source).into_iter().map(|l| l.token).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let toks = tokens("export default const meta as satisfies");
        assert_eq!(toks[0], Token::Export);
        assert_eq!(toks[1], Token::Default);
        assert_eq!(toks[2], Token::Const);
        assert_eq!(toks[3], Token::Ident("meta"));
        assert_eq!(toks[4], Token::Ident("as"));
        assert_eq!(toks[5], Token::Ident("satisfies"));
    }

    #[test]
    fn test_strings_keep_quotes() {
        let toks = tokens(r#"'single' "double \"escaped\"""#);
        assert_eq!(toks[0], Token::Str("'single'"));
        assert_eq!(toks[1], Token::Str(r#""double \"escaped\"""#));
    }

    #[test]
    fn test_numbers() {
        let toks = tokens("42 3.14 .5 0xFF 1_000 10n");
        assert_eq!(toks.len(), 6);
        assert!(toks.iter().all(|t| matches!(t, Token::Number(_))));
    }

    #[test]
    fn test_template_with_nested_interpolation() {
        let toks = tokens("const a = `x ${ { b: `y ${c}` }.b } z`; done");
        assert_eq!(toks[3], Token::Template("`x ${ { b: `y ${c}` }.b } z`"));
        assert_eq!(toks[4], Token::Semicolon);
        assert_eq!(toks[5], Token::Ident("done"));
    }

    #[test]
    fn test_regex_versus_division() {
        let toks = tokens("const r = /^Prim[/]ary$/i; const d = a / b / c;");
        assert_eq!(toks[3], Token::Slash(SlashKind::Regex("/^Prim[/]ary$/i")));
        assert!(toks.contains(&Token::Slash(SlashKind::Divide)));
        assert_eq!(
            toks.iter()
                .filter(|t| matches!(t, Token::Slash(SlashKind::Divide)))
                .count(),
            2
        );
    }

    #[test]
    fn test_jsx_closing_tag_is_not_regex() {
        let toks = tokens("<div>a</div><b>c</b>");
        assert!(!toks
            .iter()
            .any(|t| matches!(t, Token::Slash(SlashKind::Regex(_)))));
    }

    #[test]
    fn test_comments_skipped_and_newlines_tracked() {
        let lexemes = tokenize("a // comment\n/* block\n */ b");
        assert_eq!(lexemes.len(), 2);
        assert!(!lexemes[0].newline_before);
        assert!(lexemes[1].newline_before);
    }

    #[test]
    fn test_doc_comments_are_skipped() {
        assert_eq!(tokens("/** docs */ x"), vec![Token::Ident("x")]);
        assert_eq!(
            tokens("a /* one */ / /** two **/ b // trailing"),
            vec![Token::Ident("a"), Token::Slash(SlashKind::Divide), Token::Ident("b")]
        );
        // Comments in operand position are not regexes
        assert_eq!(
            tokens("= /* c */ /re/g"),
            vec![Token::Eq, Token::Slash(SlashKind::Regex("/re/g"))]
        );
        assert_eq!(tokens("x /* unterminated"), vec![Token::Ident("x")]);
    }

    #[test]
    fn test_unicode_identifiers() {
        let toks = tokens("const 𝒜 = café; ünïcode_$1");
        assert_eq!(toks[1], Token::Ident("𝒜"));
        assert_eq!(toks[3], Token::Ident("café"));
        assert_eq!(toks[5], Token::Ident("ünïcode_$1"));
    }

    #[test]
    fn test_tokenize_from_offset() {
        let source = "<p>don't</p>";
        let lexemes = tokenize_from(source, 8);
        assert_eq!(lexemes[0].token, Token::Lt);
        assert_eq!(lexemes[0].span, 8..9);
        assert_eq!(&source[lexemes[2].span.clone()], "p");
    }

    #[test]
    fn test_operators() {
        let toks = tokens("a === b ?? c?.d => !e");
        assert_eq!(toks[1], Token::Op("==="));
        assert_eq!(toks[3], Token::Op("??"));
        assert_eq!(toks[5], Token::QuestionDot);
        assert_eq!(toks[7], Token::Arrow);
        assert_eq!(toks[8], Token::Bang);
    }
}
