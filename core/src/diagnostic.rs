//! Diagnostics reported through the host's diagnostic channel.
//!
//! Diagnostics are plain data anchored to a byte [`Span`] of the offending declaration.
//! Rendering to `file:line:col` happens at the edge ([`Diagnostic::render`]) against the
//! file the span belongs to.

use std::fmt;

use serde::Serialize;

use crate::syntax::{SourceFile, Span};

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// Two variants derive the same identifier; conflicting members are skipped.
    DerivedIdentifierCollision,
    /// Two variants share a name.
    DuplicateVariant,
    /// Two fields of one variant share a name.
    DuplicateField,
    /// A variant is named like the union itself.
    VariantShadowsUnion,
    /// Unknown or ill-typed `#[union(...)]` option.
    InvalidMarkerOption,
    /// A size limit was exceeded.
    LimitExceeded,
    /// A field name cannot be emitted as a Rust identifier.
    InvalidFieldName,
    /// The same union is declared (and marked) more than once.
    DuplicateUnion,
    /// A union or payload struct takes a name already used in its namespace.
    ItemNameClash,
    /// A field type names a payload struct, which shadows whatever the name meant.
    VariantNameInFieldType,
    /// Declaration text does not parse.
    Syntax,
    /// Strict mode: marked type is not `abstract`.
    NotAbstract,
    /// Strict mode: marked type is not `partial`.
    NotPartial,
    /// Strict mode: no nested `partial` type derives from the marked type.
    NoVariants,
    /// Strict mode: marked type declares type parameters.
    GenericUnion,
}

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 15] = [
        Self::DerivedIdentifierCollision,
        Self::DuplicateVariant,
        Self::DuplicateField,
        Self::VariantShadowsUnion,
        Self::InvalidMarkerOption,
        Self::LimitExceeded,
        Self::InvalidFieldName,
        Self::DuplicateUnion,
        Self::ItemNameClash,
        Self::VariantNameInFieldType,
        Self::Syntax,
        Self::NotAbstract,
        Self::NotPartial,
        Self::NoVariants,
        Self::GenericUnion,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::DerivedIdentifierCollision => "SG0001",
            Self::DuplicateVariant => "SG0002",
            Self::DuplicateField => "SG0003",
            Self::VariantShadowsUnion => "SG0004",
            Self::InvalidMarkerOption => "SG0005",
            Self::LimitExceeded => "SG0006",
            Self::InvalidFieldName => "SG0007",
            Self::DuplicateUnion => "SG0008",
            Self::ItemNameClash => "SG0009",
            Self::VariantNameInFieldType => "SG0010",
            Self::Syntax => "SG0100",
            Self::NotAbstract => "SG0201",
            Self::NotPartial => "SG0202",
            Self::NoVariants => "SG0203",
            Self::GenericUnion => "SG0204",
        }
    }

    /// Look a code up by its `SGxxxx` string.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::DerivedIdentifierCollision | Self::InvalidMarkerOption => Severity::Warning,
            Self::NotAbstract | Self::NotPartial | Self::NoVariants | Self::GenericUnion => {
                Severity::Info
            }
            Self::DuplicateVariant
            | Self::DuplicateField
            | Self::VariantShadowsUnion
            | Self::LimitExceeded
            | Self::InvalidFieldName
            | Self::DuplicateUnion
            | Self::ItemNameClash
            | Self::VariantNameInFieldType
            | Self::Syntax => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A structured diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    /// Follow-up hint, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Diagnostic {
    /// A diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            span,
            help: None,
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Same diagnostic with its span moved by `delta` bytes.
    #[must_use]
    pub fn shifted(&self, delta: isize) -> Self {
        Self {
            span: self.span.shifted(delta),
            ..self.clone()
        }
    }

    /// `file:line:col: severity[code]: message`, plus a `help:` line when present.
    #[must_use]
    pub fn render(&self, file: &SourceFile) -> String {
        let (line, column) = file.line_col(self.span.start);
        let mut out = format!(
            "{}:{line}:{column}: {}[{}]: {}",
            file.name, self.severity, self.code, self.message
        );
        if let Some(help) = &self.help {
            out.push_str("\n  help: ");
            out.push_str(help);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_strings() {
        for code in DiagnosticCode::ALL {
            assert_eq!(DiagnosticCode::from_code(code.code()), Some(code));
        }
        assert_eq!(DiagnosticCode::from_code("SG9999"), None);
    }

    #[test]
    fn codes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in DiagnosticCode::ALL {
            assert!(seen.insert(code.code()), "duplicate code {code}");
        }
    }

    #[test]
    fn render_points_at_line_and_column() {
        let file = SourceFile::new("shapes.sum", "type A;\n  type B;");
        let diagnostic = Diagnostic::new(
            DiagnosticCode::DuplicateVariant,
            "variant `B` is declared twice",
            Span::new(10, 14),
        )
        .with_help("rename one of them");
        assert_eq!(
            diagnostic.render(&file),
            "shapes.sum:2:3: error[SG0002]: variant `B` is declared twice\n  help: rename one of them"
        );
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
