//! Lexer and parser for `.sum` declaration files.
//!
//! # Grammar
//!
//! ```text
//! unit        = { namespace | type_decl } ;
//! namespace   = "namespace" path ( ";" | "{" { type_decl } "}" ) ;
//! type_decl   = { doc | attribute } [ visibility ] { modifier } "type" IDENT [ generics ]
//!               [ "(" [ param { "," param } [ "," ] ] ")" ] [ ":" path { "," path } ]
//!               ( ";" | "{" { type_decl } "}" ) ;
//! modifier    = "abstract" | "partial" | "sealed" ;
//! param       = IDENT ":" type_ref ;
//! ```
//!
//! A file-scoped `namespace a::b;` applies to every declaration after it in the same scope.
//! Type references and generic lists are kept as the exact source text.
//!
//! # Recovery
//!
//! A syntax error discards the top-level declaration it occurs in. The parser skips to the
//! end of that declaration and keeps going, so one broken union does not hide the rest of
//! the file.

use std::fmt;

use crate::descriptor::is_keyword;
use crate::syntax::{
    Attribute, AttributeArg, CompilationUnit, Item, Modifiers, Namespace, ParamDecl, SourceFile,
    Span, TypeDecl, TypePath,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// A lexing or parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}

/// Result of parsing one file: every declaration that parsed, plus the errors.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub unit: CompilationUnit,
    pub errors: Vec<ParseError>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Lexer
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Literal,
    Lifetime,
    DocComment,
    Punct(char),
    PathSep,
    Arrow,
    Eof,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    span: Span,
}

const PUNCTUATION: &str = "{}()[]<>,;:#=&*!?+-./|@$^%~";

fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if bytes[i..].starts_with(b"//") {
            let end = src[i..].find('\n').map_or(bytes.len(), |n| i + n);
            // `///` is a doc comment, `////` is an ordinary comment.
            if bytes[i..].starts_with(b"///") && !bytes[i..].starts_with(b"////") {
                tokens.push(Token {
                    kind: TokenKind::DocComment,
                    span: Span::new(start, end),
                });
            }
            i = end;
            continue;
        }

        if bytes[i..].starts_with(b"/*") {
            let mut depth = 0usize;
            while i < bytes.len() {
                if bytes[i..].starts_with(b"/*") {
                    depth += 1;
                    i += 2;
                } else if bytes[i..].starts_with(b"*/") {
                    depth -= 1;
                    i += 2;
                    if depth == 0 {
                        break;
                    }
                } else {
                    i += 1;
                }
            }
            if depth != 0 {
                return Err(ParseError::new(
                    "unterminated block comment",
                    Span::new(start, bytes.len()),
                ));
            }
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            if bytes[i..].starts_with(b"r#") {
                i += 2;
            }
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                span: Span::new(start, i),
            });
            continue;
        }

        if c.is_ascii_digit() {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Literal,
                span: Span::new(start, i),
            });
            continue;
        }

        if c == b'"' {
            i += 1;
            let mut closed = false;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b'"' => {
                        i += 1;
                        closed = true;
                        break;
                    }
                    _ => i += 1,
                }
            }
            if !closed {
                return Err(ParseError::new(
                    "unterminated string literal",
                    Span::new(start, bytes.len()),
                ));
            }
            tokens.push(Token {
                kind: TokenKind::Literal,
                span: Span::new(start, i.min(bytes.len())),
            });
            continue;
        }

        if c == b'\'' {
            // `'a` is a lifetime, `'a'` a char literal.
            let mut j = i + 1;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            if j > i + 1 && bytes.get(j) != Some(&b'\'') {
                tokens.push(Token {
                    kind: TokenKind::Lifetime,
                    span: Span::new(start, j),
                });
                i = j;
                continue;
            }
            match src[i + 1..].find('\'') {
                Some(close) => {
                    i = i + 1 + close + 1;
                    tokens.push(Token {
                        kind: TokenKind::Literal,
                        span: Span::new(start, i),
                    });
                    continue;
                }
                None => {
                    return Err(ParseError::new(
                        "unterminated character literal",
                        Span::new(start, bytes.len()),
                    ))
                }
            }
        }

        if bytes[i..].starts_with(b"::") {
            tokens.push(Token {
                kind: TokenKind::PathSep,
                span: Span::new(start, i + 2),
            });
            i += 2;
            continue;
        }

        if bytes[i..].starts_with(b"->") {
            tokens.push(Token {
                kind: TokenKind::Arrow,
                span: Span::new(start, i + 2),
            });
            i += 2;
            continue;
        }

        let ch = src[i..].chars().next().unwrap_or('\0');
        if PUNCTUATION.contains(ch) {
            tokens.push(Token {
                kind: TokenKind::Punct(ch),
                span: Span::new(start, i + 1),
            });
            i += 1;
            continue;
        }

        return Err(ParseError::new(
            format!("unexpected character `{ch}`"),
            Span::new(start, start + ch.len_utf8()),
        ));
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(bytes.len(), bytes.len()),
    });
    Ok(tokens)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Parser
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a declaration file.
///
/// Never fails as a whole: declarations that parse are returned even when others do not.
/// A lexing error yields an empty unit and that single error.
#[must_use]
pub fn parse_unit(source: &SourceFile) -> ParseOutput {
    let tokens = match lex(&source.text) {
        Ok(tokens) => tokens,
        Err(error) => {
            return ParseOutput {
                unit: CompilationUnit::default(),
                errors: vec![error],
            }
        }
    };

    let mut parser = Parser {
        src: &source.text,
        tokens,
        pos: 0,
        depth: 0,
        errors: Vec::new(),
    };
    let mut items = Vec::new();
    parser.parse_items(&Namespace::default(), false, &mut items);

    ParseOutput {
        unit: CompilationUnit { items },
        errors: parser.errors,
    }
}

type PResult<T> = Result<T, ParseError>;

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Current `{}` nesting depth, maintained by [`Parser::bump`].
    depth: usize,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    // ── token access ────────────────────────────────────────────────────────

    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn text(&self, token: Token) -> &'a str {
        &self.src[token.span.start..token.span.end]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek();
        match token.kind {
            TokenKind::Punct('{') => self.depth += 1,
            TokenKind::Punct('}') => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at_punct(&self, ch: char) -> bool {
        self.peek().kind == TokenKind::Punct(ch)
    }

    fn at_word(&self, word: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Ident && self.text(token) == word
    }

    fn eat_punct(&mut self, ch: char) -> bool {
        if self.at_punct(ch) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, ch: char) -> PResult<Token> {
        if self.at_punct(ch) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(&format!("`{ch}`")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> PResult<(String, Span)> {
        let token = self.peek();
        if token.kind != TokenKind::Ident {
            return Err(self.unexpected(what));
        }
        self.bump();
        let text = self.text(token);
        Ok((text.strip_prefix("r#").unwrap_or(text).to_string(), token.span))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        let found = match token.kind {
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("`{}`", self.text(token)),
        };
        ParseError::new(format!("expected {expected}, found {found}"), token.span)
    }

    // ── recovery ────────────────────────────────────────────────────────────

    /// Skip to the end of the declaration that started at brace depth `entry_depth`.
    fn recover(&mut self, entry_depth: usize) {
        let start = self.pos;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::Punct('}') if self.depth == entry_depth => {
                    // Closes the enclosing scope; only consume it to guarantee progress.
                    if self.pos == start {
                        self.bump();
                    }
                    return;
                }
                _ => {}
            }
            let kind = self.bump().kind;
            if self.depth == entry_depth
                && matches!(kind, TokenKind::Punct(';') | TokenKind::Punct('}'))
            {
                return;
            }
        }
    }

    // ── items ───────────────────────────────────────────────────────────────

    fn parse_items(&mut self, namespace: &Namespace, in_block: bool, out: &mut Vec<Item>) {
        let mut current = namespace.clone();

        loop {
            if self.peek().kind == TokenKind::Eof {
                if in_block {
                    let error = self.unexpected("`}`");
                    self.errors.push(error);
                }
                return;
            }

            if in_block && self.at_punct('}') {
                self.bump();
                return;
            }

            let entry_depth = self.depth;

            if self.at_word("namespace") {
                match self.parse_namespace_header() {
                    Ok((path, true)) => {
                        let inner = current.join(&path);
                        self.parse_items(&inner, true, out);
                    }
                    Ok((path, false)) => current = namespace.join(&path),
                    Err(error) => {
                        self.errors.push(error);
                        self.recover(entry_depth);
                    }
                }
                continue;
            }

            match self.parse_type_decl() {
                Ok(decl) => out.push(Item {
                    namespace: current.clone(),
                    decl,
                }),
                Err(error) => {
                    self.errors.push(error);
                    self.recover(entry_depth);
                }
            }
        }
    }

    /// Parses `namespace a::b` plus `;` or `{`. Returns the path and whether a block follows.
    fn parse_namespace_header(&mut self) -> PResult<(Vec<String>, bool)> {
        self.bump();
        let mut path = vec![self.namespace_segment("namespace name")?];
        while self.peek().kind == TokenKind::PathSep {
            self.bump();
            path.push(self.namespace_segment("namespace segment")?);
        }
        if self.eat_punct(';') {
            Ok((path, false))
        } else if self.eat_punct('{') {
            Ok((path, true))
        } else {
            Err(self.unexpected("`;` or `{`"))
        }
    }

    /// A namespace segment becomes a `mod` name, so reserved words are rejected.
    fn namespace_segment(&mut self, what: &str) -> PResult<String> {
        let (name, span) = self.expect_ident(what)?;
        if is_keyword(&name) {
            return Err(ParseError::new(
                format!("`{name}` is a reserved word and cannot name a namespace"),
                span,
            ));
        }
        Ok(name)
    }

    fn parse_type_decl(&mut self) -> PResult<TypeDecl> {
        let start = self.peek().span;
        let mut docs = Vec::new();
        let mut attributes = Vec::new();

        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::DocComment => {
                    self.bump();
                    let text = &self.text(token)[3..];
                    docs.push(text.strip_prefix(' ').unwrap_or(text).trim_end().to_string());
                }
                TokenKind::Punct('#') => attributes.push(self.parse_attribute()?),
                _ => break,
            }
        }

        let visibility = self.parse_visibility()?;

        let mut modifiers = Modifiers::default();
        loop {
            if self.at_word("abstract") {
                modifiers.is_abstract = true;
            } else if self.at_word("partial") {
                modifiers.is_partial = true;
            } else if self.at_word("sealed") {
                modifiers.is_sealed = true;
            } else {
                break;
            }
            self.bump();
        }

        if !self.at_word("type") {
            return Err(self.unexpected("`type`"));
        }
        self.bump();

        let (name, name_span) = self.expect_ident("type name")?;
        if is_keyword(&name) {
            return Err(ParseError::new(
                format!("`{name}` is a reserved word and cannot name a type"),
                name_span,
            ));
        }

        let generics = if self.at_punct('<') {
            Some(self.balanced_text('<', '>')?)
        } else {
            None
        };

        let params = if self.at_punct('(') {
            Some(self.parse_params()?)
        } else {
            None
        };

        let mut bases = Vec::new();
        if self.eat_punct(':') {
            bases.push(self.parse_type_path()?);
            while self.eat_punct(',') {
                bases.push(self.parse_type_path()?);
            }
        }

        let mut nested = Vec::new();
        let end = if self.at_punct(';') {
            self.bump().span
        } else if self.at_punct('{') {
            self.bump();
            loop {
                if self.at_punct('}') {
                    break self.bump().span;
                }
                if self.peek().kind == TokenKind::Eof {
                    return Err(self.unexpected("`}`"));
                }
                nested.push(self.parse_type_decl()?);
            }
        } else {
            return Err(self.unexpected("`;` or `{`"));
        };

        Ok(TypeDecl {
            name,
            docs,
            attributes,
            visibility,
            modifiers,
            generics,
            params,
            bases,
            nested,
            span: start.to(end),
            name_span,
        })
    }

    fn parse_visibility(&mut self) -> PResult<Option<String>> {
        if !self.at_word("pub") {
            return Ok(None);
        }
        self.bump();
        if self.at_punct('(') {
            let inner = self.balanced_text('(', ')')?;
            return Ok(Some(format!("pub{inner}")));
        }
        Ok(Some("pub".to_string()))
    }

    fn parse_attribute(&mut self) -> PResult<Attribute> {
        let start = self.expect_punct('#')?.span;
        self.expect_punct('[')?;

        let (mut name, _) = self.expect_ident("attribute name")?;
        while self.peek().kind == TokenKind::PathSep {
            self.bump();
            name.push_str("::");
            name.push_str(&self.expect_ident("attribute path segment")?.0);
        }

        let args = if self.at_punct('(') {
            let open = self.pos;
            self.balanced_text('(', ')')?;
            let close = self.pos;
            parse_attribute_args(self, open + 1, close - 1)
        } else {
            Vec::new()
        };

        let end = self.expect_punct(']')?.span;
        let span = start.to(end);
        Ok(Attribute {
            name,
            args,
            raw: self.src[span.start..span.end].to_string(),
            span,
        })
    }

    fn parse_params(&mut self) -> PResult<Vec<ParamDecl>> {
        self.expect_punct('(')?;
        let mut params = Vec::new();

        loop {
            if self.eat_punct(')') {
                break;
            }
            let (name, name_span) = self.expect_ident("field name")?;
            self.expect_punct(':')?;
            let (type_ref, type_span) = self.type_ref()?;
            params.push(ParamDecl {
                name,
                type_ref,
                span: name_span.to(type_span),
            });
            if !self.eat_punct(',') {
                self.expect_punct(')')?;
                break;
            }
        }

        Ok(params)
    }

    /// Consumes a type reference up to a top-level `,` or `)`.
    fn type_ref(&mut self) -> PResult<(String, Span)> {
        let first = self.peek();
        let mut last = None;
        let mut depth: Vec<char> = Vec::new();

        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return Err(self.unexpected("`)`")),
                TokenKind::Punct(',' | ')') if depth.is_empty() => break,
                TokenKind::Punct(';' | '{' | '}') if depth.is_empty() => break,
                TokenKind::Punct(open @ ('<' | '(' | '[')) => depth.push(closer(open)),
                TokenKind::Punct(close @ ('>' | ')' | ']')) => {
                    if depth.pop() != Some(close) {
                        return Err(ParseError::new(
                            format!("unbalanced `{close}` in type"),
                            token.span,
                        ));
                    }
                }
                _ => {}
            }
            last = Some(self.bump());
        }

        match last {
            Some(last) => {
                let span = first.span.to(last.span);
                Ok((self.src[span.start..span.end].to_string(), span))
            }
            None => Err(self.unexpected("a type")),
        }
    }

    fn parse_type_path(&mut self) -> PResult<TypePath> {
        let (first, start) = self.expect_ident("base type")?;
        let mut segments = vec![first];
        let mut span = start;
        while self.peek().kind == TokenKind::PathSep {
            self.bump();
            let (segment, segment_span) = self.expect_ident("path segment")?;
            segments.push(segment);
            span = span.to(segment_span);
        }
        let generics = if self.at_punct('<') {
            let generics_start = self.peek().span;
            let text = self.balanced_text('<', '>')?;
            span = span.to(generics_start);
            Some(text)
        } else {
            None
        };
        Ok(TypePath {
            segments,
            generics,
            span,
        })
    }

    /// Consumes a bracketed group (nesting of every bracket kind respected) and returns its text.
    fn balanced_text(&mut self, open: char, close: char) -> PResult<String> {
        let start = self.expect_punct(open)?.span;
        let mut stack = vec![close];

        while let Some(&expected) = stack.last() {
            let token = self.bump();
            match token.kind {
                TokenKind::Eof => {
                    return Err(ParseError::new(format!("expected `{expected}`"), token.span))
                }
                TokenKind::Punct(c @ ('<' | '(' | '[')) => stack.push(closer(c)),
                TokenKind::Punct(c @ ('>' | ')' | ']')) => {
                    if c != expected {
                        return Err(ParseError::new(
                            format!("expected `{expected}`, found `{c}`"),
                            token.span,
                        ));
                    }
                    stack.pop();
                    if stack.is_empty() {
                        let span = start.to(token.span);
                        return Ok(self.src[span.start..span.end].to_string());
                    }
                }
                _ => {}
            }
        }

        Err(ParseError::new(format!("expected `{close}`"), start))
    }
}

fn closer(open: char) -> char {
    match open {
        '<' => '>',
        '(' => ')',
        _ => ']',
    }
}

/// Reads `key`, `key = value` pairs from the token range `[from, to)`.
///
/// Arguments of any other shape (e.g. `derive(Debug, Clone)`) yield bare keys, which is
/// what pass-through attributes need: they are re-emitted verbatim anyway.
fn parse_attribute_args(parser: &Parser<'_>, from: usize, to: usize) -> Vec<AttributeArg> {
    let tokens = &parser.tokens[from..to];
    let mut args = Vec::new();

    for group in tokens.split(|t| t.kind == TokenKind::Punct(',')) {
        let Some(first) = group.first() else {
            continue;
        };
        let last = group[group.len() - 1];
        let span = first.span.to(last.span);
        let key = parser.text(*first).to_string();
        let value = match group {
            [_, eq, rest @ ..] if eq.kind == TokenKind::Punct('=') && !rest.is_empty() => {
                let value_span = rest[0].span.to(rest[rest.len() - 1].span);
                Some(parser.src[value_span.start..value_span.end].to_string())
            }
            _ => None,
        };
        args.push(AttributeArg { key, value, span });
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParseOutput {
        parse_unit(&SourceFile::new("test.sum", text))
    }

    const SHAPES: &str = r#"
namespace geometry;

/// A plane figure.
#[union]
#[derive(Debug, Clone, PartialEq)]
pub abstract partial type Shape {
    /// Round.
    pub partial type Circle(radius: f64): Shape;
    pub partial type Rectangle(width: f64, height: f64): Shape;
    pub partial type Triangle(base: f64, height: f64,): Shape;
}
"#;

    #[test]
    fn parses_union_declaration() {
        let out = parse(SHAPES);
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.unit.items.len(), 1);

        let item = &out.unit.items[0];
        assert_eq!(item.namespace.to_string(), "geometry");

        let shape = &item.decl;
        assert_eq!(shape.name, "Shape");
        assert_eq!(shape.docs, vec!["A plane figure."]);
        assert!(shape.modifiers.is_abstract);
        assert!(shape.modifiers.is_partial);
        assert_eq!(shape.visibility.as_deref(), Some("pub"));
        assert!(shape.marker().is_some());
        assert_eq!(shape.passthrough_attributes().count(), 1);
        assert_eq!(shape.nested.len(), 3);

        let circle = &shape.nested[0];
        assert_eq!(circle.docs, vec!["Round."]);
        assert!(circle.derives_from("Shape"));
        let params = circle.params.as_ref().unwrap();
        assert_eq!(params[0].name, "radius");
        assert_eq!(params[0].type_ref, "f64");

        let triangle = &shape.nested[2];
        assert_eq!(triangle.params.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn keeps_complex_type_refs_verbatim() {
        let out = parse(
            "#[union] abstract partial type E { partial type A(x: Vec<Option<(u8, String)>>, f: fn(i32) -> i32, s: &'static str, a: [u8; 4]): E; }",
        );
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let params = out.unit.items[0].decl.nested[0].params.clone().unwrap();
        let types: Vec<_> = params.iter().map(|p| p.type_ref.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "Vec<Option<(u8, String)>>",
                "fn(i32) -> i32",
                "&'static str",
                "[u8; 4]"
            ]
        );
    }

    #[test]
    fn parses_marker_arguments() {
        let out = parse("#[union(factories = false, strict)] abstract partial type E {}");
        let marker = out.unit.items[0].decl.marker().unwrap().clone();
        assert_eq!(marker.args.len(), 2);
        assert_eq!(marker.args[0].key, "factories");
        assert_eq!(marker.args[0].value.as_deref(), Some("false"));
        assert_eq!(marker.args[1].key, "strict");
        assert_eq!(marker.args[1].value, None);
    }

    #[test]
    fn namespace_blocks_scope_declarations() {
        let out = parse(
            "namespace outer { namespace inner { type A; } type B; } type C;",
        );
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let names: Vec<_> = out
            .unit
            .items
            .iter()
            .map(|i| format!("{}|{}", i.namespace, i.decl.name))
            .collect();
        assert_eq!(names, vec!["outer::inner|A", "outer|B", "|C"]);
    }

    #[test]
    fn generic_parameters_are_recorded() {
        let out = parse("#[union] abstract partial type Result<T, E> { partial type Ok(value: T): Result<T, E>; }");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let decl = &out.unit.items[0].decl;
        assert_eq!(decl.generics.as_deref(), Some("<T, E>"));
        assert_eq!(decl.nested[0].bases[0].generics.as_deref(), Some("<T, E>"));
    }

    #[test]
    fn error_in_one_declaration_keeps_the_others() {
        let out = parse(
            "type Good1;\n#[union] abstract partial type Broken { partial type A(x: ): Broken; }\ntype Good2;",
        );
        assert_eq!(out.errors.len(), 1, "{:?}", out.errors);
        let names: Vec<_> = out.unit.items.iter().map(|i| i.decl.name.as_str()).collect();
        assert_eq!(names, vec!["Good1", "Good2"]);
    }

    #[test]
    fn comments_are_ignored() {
        let out = parse("// line\n/* block /* nested */ */ type A; //// not a doc\n type B;");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.unit.items.len(), 2);
        assert!(out.unit.items[1].decl.docs.is_empty());
    }

    #[test]
    fn lex_error_reports_position() {
        let out = parse("type A; \u{1F600}");
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].span.start, 8);
        assert!(out.unit.items.is_empty());
    }

    #[test]
    fn raw_identifiers_are_unescaped() {
        let out = parse("type A(r#type: u8);");
        let params = out.unit.items[0].decl.params.clone().unwrap();
        assert_eq!(params[0].name, "type");
    }

    #[test]
    fn keyword_type_name_is_rejected() {
        let out = parse("type match;");
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn keyword_namespace_is_rejected() {
        for text in ["namespace type;", "namespace geometry::match { type A; }"] {
            let out = parse(text);
            assert_eq!(out.errors.len(), 1, "{text}: {:?}", out.errors);
            assert!(out.errors[0].message.contains("cannot name a namespace"));
            assert!(out.unit.items.iter().all(|i| i.namespace.is_global()));
        }
    }

    #[test]
    fn declaration_span_covers_attributes() {
        let text = "  #[union] abstract partial type E {}";
        let out = parse(text);
        let decl = &out.unit.items[0].decl;
        assert_eq!(decl.span.start, 2);
        assert_eq!(decl.span.end, text.len());
    }
}
