//! `UnionDescriptor`: the validated-shape IR between extraction and synthesis.
//!
//! A descriptor is rebuilt from the declaration text on every edit. It is never mutated
//! after extraction, and every synthesized member is a pure function of it.
//!
//! # INV: one derived identifier per variant
//!
//! [`VariantDescriptor::derived_identifier`] is computed once, at construction, and every
//! generator reads it from here. The `on_circle` handler parameter, `is_circle`,
//! `as_circle` and `new_circle` can therefore never disagree about a variant's name.

use serde::Serialize;

use crate::syntax::{Namespace, Span};

/// Options carried by the `#[union(...)]` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnionOptions {
    /// Emit one `new_<variant>` constructor per variant (`factories = ...`).
    pub generate_factory_methods: bool,
}

impl Default for UnionOptions {
    fn default() -> Self {
        Self {
            generate_factory_methods: true,
        }
    }
}

/// One field of a variant, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Type text exactly as declared.
    pub type_ref: String,
    #[serde(skip)]
    pub span: Span,
}

/// One variant of the union.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VariantDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    derived_identifier: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(skip)]
    pub span: Span,
}

impl VariantDescriptor {
    /// Build a variant; the derived identifier is fixed here.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        let name = name.into();
        let derived_identifier = derive_identifier(&name);
        Self {
            name,
            fields,
            derived_identifier,
            docs: Vec::new(),
            span: Span::default(),
        }
    }

    #[must_use]
    pub fn with_docs(mut self, docs: Vec<String>) -> Self {
        self.docs = docs;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Snake-case identifier shared by every member that names this variant.
    #[must_use]
    pub fn derived_identifier(&self) -> &str {
        &self.derived_identifier
    }
}

/// The extracted shape of one union declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnionDescriptor {
    pub name: String,
    /// Enclosing namespace; empty for the global scope.
    pub namespace: Namespace,
    pub variants: Vec<VariantDescriptor>,
    pub options: UnionOptions,
    /// Type parameters of the outer declaration. Non-empty means generic, which the gate
    /// declines.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    /// Attributes re-applied to the generated enum and payload structs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(skip)]
    pub span: Span,
}

impl UnionDescriptor {
    /// A descriptor with default options and no decorations.
    pub fn new(
        name: impl Into<String>,
        namespace: Namespace,
        variants: Vec<VariantDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace,
            variants,
            options: UnionOptions::default(),
            type_parameters: Vec::new(),
            visibility: None,
            docs: Vec::new(),
            attributes: Vec::new(),
            span: Span::default(),
        }
    }

    /// `namespace::Name`, or just `Name` in the global scope.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_global() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace, self.name)
        }
    }

    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }

    /// Look up a variant by name.
    #[must_use]
    pub fn variant(&self, name: &str) -> Option<&VariantDescriptor> {
        self.variants.iter().find(|v| v.name == name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Naming
// ═══════════════════════════════════════════════════════════════════════════════

/// Snake-case form of a variant name: `Circle` → `circle`, `HttpServer` and `HTTPServer`
/// → `http_server`, `Point3D` → `point3_d`.
///
/// A word boundary sits before an uppercase letter that follows a lowercase letter or a
/// digit, and before the last uppercase letter of an acronym that is followed by a
/// lowercase letter. Existing underscores are kept, but never doubled.
#[must_use]
pub fn derive_identifier(name: &str) -> String {
    let name = name.strip_prefix("r#").unwrap_or(name);
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Rust keywords (strict and reserved) that cannot be plain identifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
    "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers either.
const UNRAWABLE: &[&str] = &["crate", "self", "Self", "super", "_"];

#[must_use]
pub fn is_keyword(ident: &str) -> bool {
    KEYWORDS.contains(&ident)
}

/// Whether `ident` can be emitted as an identifier at all (possibly as `r#ident`).
#[must_use]
pub fn is_emittable_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !UNRAWABLE.contains(&ident)
}

/// `ident`, or `r#ident` when it collides with a keyword.
#[must_use]
pub fn escape_ident(ident: &str) -> String {
    if is_keyword(ident) {
        format!("r#{ident}")
    } else {
        ident.to_string()
    }
}
