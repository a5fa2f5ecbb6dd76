//! Schema extraction: declaration syntax → [`UnionDescriptor`].
//!
//! # Eligibility (all required)
//!
//! 1. The declaration carries the `#[union]` marker.
//! 2. It is declared `abstract`.
//! 3. It is declared `partial`.
//! 4. At least one nested declaration is `partial` and names the outer type in its
//!    inheritance list.
//!
//! Failing any of these is a [`DeclineReason`], not an error: the marker may sit on a type
//! that is still being written. Nested declarations that are not variants are ignored.

use std::fmt;

use crate::descriptor::{FieldDescriptor, UnionDescriptor, UnionOptions, VariantDescriptor};
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::syntax::{Attribute, Namespace, TypeDecl};

/// Why a declaration produced no descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclineReason {
    /// No `#[union]` marker.
    NotMarked,
    NotAbstract,
    NotPartial,
    /// No nested `partial` type derives from the outer type.
    NoEligibleVariants,
    /// The outer type declares type parameters (decided by the validation gate).
    Generic,
}

impl DeclineReason {
    /// Code used when strict mode turns this decline into a diagnostic.
    #[must_use]
    pub fn strict_code(self) -> Option<DiagnosticCode> {
        match self {
            Self::NotMarked => None,
            Self::NotAbstract => Some(DiagnosticCode::NotAbstract),
            Self::NotPartial => Some(DiagnosticCode::NotPartial),
            Self::NoEligibleVariants => Some(DiagnosticCode::NoVariants),
            Self::Generic => Some(DiagnosticCode::GenericUnion),
        }
    }
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotMarked => "type is not marked with #[union]",
            Self::NotAbstract => "union type is not declared `abstract`",
            Self::NotPartial => "union type is not declared `partial`",
            Self::NoEligibleVariants => {
                "no nested `partial` type derives from the union type"
            }
            Self::Generic => "generic unions are not supported",
        })
    }
}

/// A descriptor plus the diagnostics raised while reading the marker.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub descriptor: UnionDescriptor,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extract a descriptor from a top-level declaration.
///
/// # Errors
///
/// Returns the [`DeclineReason`] when the declaration is not an eligible union.
pub fn extract(decl: &TypeDecl, namespace: &Namespace) -> Result<Extracted, DeclineReason> {
    let marker = decl.marker().ok_or(DeclineReason::NotMarked)?;
    if !decl.modifiers.is_abstract {
        return Err(DeclineReason::NotAbstract);
    }
    if !decl.modifiers.is_partial {
        return Err(DeclineReason::NotPartial);
    }

    let variants: Vec<VariantDescriptor> = decl
        .nested
        .iter()
        .filter(|nested| is_variant(nested, &decl.name))
        .map(variant_descriptor)
        .collect();

    if variants.is_empty() {
        return Err(DeclineReason::NoEligibleVariants);
    }

    let mut diagnostics = Vec::new();
    let options = read_options(marker, &mut diagnostics);

    let descriptor = UnionDescriptor {
        name: decl.name.clone(),
        namespace: namespace.clone(),
        variants,
        options,
        type_parameters: decl
            .generics
            .as_deref()
            .map(split_generics)
            .unwrap_or_default(),
        visibility: decl.visibility.clone(),
        docs: decl.docs.clone(),
        attributes: decl
            .passthrough_attributes()
            .map(|a| a.raw.clone())
            .collect(),
        span: decl.span,
    };

    Ok(Extracted {
        descriptor,
        diagnostics,
    })
}

fn is_variant(nested: &TypeDecl, outer: &str) -> bool {
    nested.modifiers.is_partial && nested.derives_from(outer) && nested.generics.is_none()
}

fn variant_descriptor(nested: &TypeDecl) -> VariantDescriptor {
    let fields = nested
        .params
        .iter()
        .flatten()
        .map(|param| FieldDescriptor {
            name: param.name.clone(),
            type_ref: param.type_ref.clone(),
            span: param.span,
        })
        .collect();

    VariantDescriptor::new(nested.name.clone(), fields)
        .with_docs(nested.docs.clone())
        .with_span(nested.name_span)
}

/// Reads `#[union(factories = bool)]`. Anything else is reported and ignored.
fn read_options(marker: &Attribute, diagnostics: &mut Vec<Diagnostic>) -> UnionOptions {
    let mut options = UnionOptions::default();

    for arg in &marker.args {
        match arg.key.as_str() {
            "factories" => match arg.value.as_deref() {
                None | Some("true") => options.generate_factory_methods = true,
                Some("false") => options.generate_factory_methods = false,
                Some(other) => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::InvalidMarkerOption,
                        format!("option `factories` expects `true` or `false`, found `{other}`"),
                        arg.span,
                    )
                    .with_help("the option keeps its default (`true`)"),
                ),
            },
            other => diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::InvalidMarkerOption,
                    format!("unknown #[union] option `{other}`"),
                    arg.span,
                )
                .with_help("supported options: `factories`"),
            ),
        }
    }

    options
}

/// `<T, E: Clone>` → `["T", "E: Clone"]`.
fn split_generics(text: &str) -> Vec<String> {
    let inner = text
        .trim()
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(text);

    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                params.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    params.push(current);

    params
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_unit;
    use crate::syntax::SourceFile;

    fn first(text: &str) -> (TypeDecl, Namespace) {
        let out = parse_unit(&SourceFile::new("t.sum", text));
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let item = out.unit.items.into_iter().next().expect("one item");
        (item.decl, item.namespace)
    }

    fn run(text: &str) -> Result<Extracted, DeclineReason> {
        let (decl, ns) = first(text);
        extract(&decl, &ns)
    }

    #[test]
    fn extracts_variants_in_declaration_order() {
        let extracted = run(
            "namespace geo; #[union] pub abstract partial type Shape {
                partial type Circle(radius: f64): Shape;
                partial type Rectangle(width: f64, height: f64): Shape;
            }",
        )
        .unwrap();
        let d = extracted.descriptor;
        assert_eq!(d.name, "Shape");
        assert_eq!(d.namespace.to_string(), "geo");
        let names: Vec<_> = d.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Circle", "Rectangle"]);
        assert_eq!(d.variants[1].fields[1].name, "height");
        assert_eq!(d.variants[1].derived_identifier(), "rectangle");
        assert!(d.options.generate_factory_methods);
        assert!(extracted.diagnostics.is_empty());
    }

    #[test]
    fn global_scope_yields_empty_namespace() {
        let d = run("#[union] abstract partial type U { partial type A: U; }")
            .unwrap()
            .descriptor;
        assert!(d.namespace.is_global());
    }

    #[test]
    fn declines_without_marker() {
        assert_eq!(
            run("abstract partial type U { partial type A: U; }").unwrap_err(),
            DeclineReason::NotMarked
        );
    }

    #[test]
    fn declines_without_abstract() {
        assert_eq!(
            run("#[union] partial type U { partial type A: U; }").unwrap_err(),
            DeclineReason::NotAbstract
        );
    }

    #[test]
    fn declines_without_partial() {
        assert_eq!(
            run("#[union] abstract type U { partial type A: U; }").unwrap_err(),
            DeclineReason::NotPartial
        );
    }

    #[test]
    fn declines_without_eligible_variants() {
        assert_eq!(
            run("#[union] abstract partial type U { type A: U; partial type B; partial type C: Other; }")
                .unwrap_err(),
            DeclineReason::NoEligibleVariants
        );
    }

    #[test]
    fn ignores_nested_types_that_are_not_variants() {
        let d = run(
            "#[union] abstract partial type U {
                partial type A: U;
                type Helper;
                partial type Unrelated: Other;
                partial type Boxed<T>(value: T): U;
            }",
        )
        .unwrap()
        .descriptor;
        assert_eq!(d.variants.len(), 1);
        assert_eq!(d.variants[0].name, "A");
    }

    #[test]
    fn qualified_base_is_not_a_variant() {
        let d = run(
            "#[union] abstract partial type U {
                partial type A: U;
                partial type B: other::U;
            }",
        )
        .unwrap()
        .descriptor;
        let names: Vec<_> = d.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn reads_factories_option() {
        let d = run("#[union(factories = false)] abstract partial type U { partial type A: U; }")
            .unwrap()
            .descriptor;
        assert!(!d.options.generate_factory_methods);
    }

    #[test]
    fn unknown_option_is_reported_not_fatal() {
        let extracted =
            run("#[union(fatories = false)] abstract partial type U { partial type A: U; }")
                .unwrap();
        assert_eq!(extracted.diagnostics.len(), 1);
        assert_eq!(
            extracted.diagnostics[0].code,
            DiagnosticCode::InvalidMarkerOption
        );
        assert!(extracted.descriptor.options.generate_factory_methods);
    }

    #[test]
    fn records_type_parameters_for_the_gate() {
        let d = run("#[union] abstract partial type R<T, E: Into<Box<T>>> { partial type A: R; }")
            .unwrap()
            .descriptor;
        assert_eq!(d.type_parameters, vec!["T", "E: Into<Box<T>>"]);
        assert!(d.is_generic());
    }

    #[test]
    fn keeps_passthrough_attributes_and_docs() {
        let d = run(
            "/// Doc.\n#[union]\n#[derive(Debug)]\npub abstract partial type U { /// A doc.\npartial type A: U; }",
        )
        .unwrap()
        .descriptor;
        assert_eq!(d.attributes, vec!["#[derive(Debug)]"]);
        assert_eq!(d.docs, vec!["Doc."]);
        assert_eq!(d.variants[0].docs, vec!["A doc."]);
        assert_eq!(d.visibility.as_deref(), Some("pub"));
    }
}
