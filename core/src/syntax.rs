//! Declaration syntax model.
//!
//! The parser ([`parse_unit`](crate::parse_unit)) produces these types; the schema
//! extractor ([`extract`](crate::extract)) consumes them. They carry only the syntax facts
//! derivation needs: modifiers, nesting, inheritance lists and parameter lists.
//!
//! Every node keeps its [`Span`] so diagnostics can point back at the declaration text.

use std::fmt;

/// Byte range into a [`SourceFile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Move the span by `delta` bytes (used when a cached declaration moved in its file).
    #[must_use]
    pub fn shifted(self, delta: isize) -> Span {
        let shift = |offset: usize| offset.saturating_add_signed(delta);
        Span::new(shift(self.start), shift(self.end))
    }
}

/// A named declaration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// 1-based line and column of a byte offset.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let before = &self.text[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        (line, column)
    }

    /// Source text covered by `span`, or `""` if it falls outside the file.
    #[must_use]
    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }
}

/// Modifiers written before `type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub is_abstract: bool,
    pub is_partial: bool,
    pub is_sealed: bool,
}

/// An attribute such as `#[union(factories = false)]` or `#[derive(Debug)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute path, e.g. `union` or `derive`.
    pub name: String,
    /// `key = value` pairs when the arguments take that shape, in source order.
    pub args: Vec<AttributeArg>,
    /// The full attribute text (`#[...]`), re-emitted verbatim for pass-through attributes.
    pub raw: String,
    pub span: Span,
}

/// One `key = value` argument of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeArg {
    pub key: String,
    /// Value text; `None` for a bare flag (`#[union(factories)]`).
    pub value: Option<String>,
    pub span: Span,
}

/// Name of the marker attribute that selects a declaration for derivation.
pub const MARKER_ATTRIBUTE: &str = "union";

/// A reference to another type in an inheritance list, e.g. `Shape` or `geometry::Shape`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePath {
    pub segments: Vec<String>,
    /// Generic arguments text (`<T>`), if any.
    pub generics: Option<String>,
    pub span: Span,
}

impl TypePath {
    /// Last path segment (the type's simple name).
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("::"))?;
        if let Some(generics) = &self.generics {
            f.write_str(generics)?;
        }
        Ok(())
    }
}

/// One `name: Type` entry of a parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    /// Type text exactly as written.
    pub type_ref: String,
    pub span: Span,
}

/// A `type` declaration, top-level or nested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub docs: Vec<String>,
    pub attributes: Vec<Attribute>,
    /// Visibility text (`pub`, `pub(crate)`), `None` for private.
    pub visibility: Option<String>,
    pub modifiers: Modifiers,
    /// Generic parameter list text (`<T>`), if any.
    pub generics: Option<String>,
    /// Parameter list; `None` when the declaration has no parentheses.
    pub params: Option<Vec<ParamDecl>>,
    pub bases: Vec<TypePath>,
    pub nested: Vec<TypeDecl>,
    /// Span of the whole declaration, attributes and docs included.
    pub span: Span,
    /// Span of the declared name.
    pub name_span: Span,
}

impl TypeDecl {
    /// The marker attribute, if this declaration carries one.
    #[must_use]
    pub fn marker(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == MARKER_ATTRIBUTE)
    }

    /// Attributes other than the marker, re-emitted on generated types.
    pub fn passthrough_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.name != MARKER_ATTRIBUTE)
    }

    /// Whether the inheritance list names `outer` by its bare name.
    ///
    /// A qualified base such as `other::Shape` names some other type, never the
    /// enclosing one.
    #[must_use]
    pub fn derives_from(&self, outer: &str) -> bool {
        self.bases.iter().any(|base| {
            base.generics.is_none() && base.segments.len() == 1 && base.simple_name() == outer
        })
    }
}

/// A namespace path; empty means the global scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Namespace(pub Vec<String>);

impl Namespace {
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Namespace extended by one more level.
    #[must_use]
    pub fn join(&self, more: &[String]) -> Namespace {
        let mut segments = self.0.clone();
        segments.extend(more.iter().cloned());
        Namespace(segments)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("::"))
    }
}

/// A top-level declaration with the namespace it was declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub namespace: Namespace,
    pub decl: TypeDecl,
}

/// A parsed declaration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationUnit {
    pub items: Vec<Item>,
}

impl CompilationUnit {
    /// Items carrying the `#[union]` marker, in source order.
    pub fn marked(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.decl.marker().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_from_one() {
        let file = SourceFile::new("a.sum", "ab\ncde\n");
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(1), (1, 2));
        assert_eq!(file.line_col(3), (2, 1));
        assert_eq!(file.line_col(5), (2, 3));
    }

    #[test]
    fn line_col_clamps_past_end() {
        let file = SourceFile::new("a.sum", "ab");
        assert_eq!(file.line_col(100), (1, 3));
    }

    #[test]
    fn span_shift_both_directions() {
        let span = Span::new(10, 20);
        assert_eq!(span.shifted(5), Span::new(15, 25));
        assert_eq!(span.shifted(-10), Span::new(0, 10));
        assert_eq!(span.shifted(-50), Span::new(0, 0));
    }

    fn variant_of(segments: &[&str]) -> TypeDecl {
        TypeDecl {
            name: "Circle".into(),
            docs: vec![],
            attributes: vec![],
            visibility: None,
            modifiers: Modifiers::default(),
            generics: None,
            params: None,
            bases: vec![TypePath {
                segments: segments.iter().map(|s| (*s).to_string()).collect(),
                generics: None,
                span: Span::default(),
            }],
            nested: vec![],
            span: Span::default(),
            name_span: Span::default(),
        }
    }

    #[test]
    fn derives_from_requires_bare_name() {
        let decl = variant_of(&["Shape"]);
        assert!(decl.derives_from("Shape"));
        assert!(!decl.derives_from("Circle"));
    }

    #[test]
    fn qualified_base_is_another_type() {
        assert!(!variant_of(&["other", "Shape"]).derives_from("Shape"));
        assert!(!variant_of(&["geometry", "Shape"]).derives_from("Shape"));
    }

    #[test]
    fn namespace_display() {
        assert_eq!(Namespace::default().to_string(), "");
        let ns = Namespace(vec!["a".into(), "b".into()]);
        assert_eq!(ns.to_string(), "a::b");
        assert!(!ns.is_global());
    }
}
