//! Validation gate: decides decline / abort / proceed for an extracted descriptor.
//!
//! | Outcome | When | Output |
//! |---------|------|--------|
//! | [`Gate::Decline`] | the union is generic | nothing, silently |
//! | [`Gate::Abort`] | the data representation itself would be invalid | error diagnostics only |
//! | [`Gate::Proceed`] | otherwise | members, minus the ones listed in [`Conflicts`] |
//!
//! Derived-identifier collisions are the one contradiction the gate lets through: the
//! union's type skeleton is still well formed, so only the members whose names or
//! parameters would collide are skipped.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::descriptor::{is_emittable_identifier, UnionDescriptor};
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::extract::DeclineReason;
use crate::{MAX_FIELDS_PER_VARIANT, MAX_VARIANTS};

/// Variants whose derived identifiers collide.
///
/// # INV: a non-empty set blocks every dispatch member
///
/// `fold`, `visit`, `map` and `tap` take one `on_<id>` parameter per variant, so a single
/// collision makes their parameter lists invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conflicts {
    variants: BTreeSet<usize>,
}

impl Conflicts {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Whether the variant at `index` takes part in a collision.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.variants.contains(&index)
    }

    /// Whether members with one parameter per variant must be skipped.
    #[must_use]
    pub fn blocks_dispatch(&self) -> bool {
        !self.is_empty()
    }

    /// Indices of the conflicting variants, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.variants.iter().copied()
    }
}

/// Gate outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Decline(DeclineReason),
    Abort(Vec<Diagnostic>),
    Proceed {
        diagnostics: Vec<Diagnostic>,
        conflicts: Conflicts,
    },
}

/// Apply the eligibility and consistency rules to `descriptor`.
#[must_use]
pub fn validate(descriptor: &UnionDescriptor) -> Gate {
    if descriptor.is_generic() {
        return Gate::Decline(DeclineReason::Generic);
    }

    let errors = structural_errors(descriptor);
    if !errors.is_empty() {
        return Gate::Abort(errors);
    }

    let (diagnostics, conflicts) = identifier_collisions(descriptor);
    Gate::Proceed {
        diagnostics,
        conflicts,
    }
}

/// Contradictions that make the enum or payload structs themselves invalid.
fn structural_errors(descriptor: &UnionDescriptor) -> Vec<Diagnostic> {
    let mut errors = Vec::new();

    if descriptor.variants.len() > MAX_VARIANTS {
        errors.push(Diagnostic::new(
            DiagnosticCode::LimitExceeded,
            format!(
                "union `{}` has {} variants, but maximum allowed is {MAX_VARIANTS}",
                descriptor.name,
                descriptor.variants.len()
            ),
            descriptor.span,
        ));
    }

    let mut seen_variants = HashSet::new();
    for variant in &descriptor.variants {
        if variant.name == descriptor.name {
            errors.push(
                Diagnostic::new(
                    DiagnosticCode::VariantShadowsUnion,
                    format!("variant `{}` has the same name as its union", variant.name),
                    variant.span,
                )
                .with_help("the payload struct and the enum would share one name; rename the variant"),
            );
        }

        if !seen_variants.insert(variant.name.as_str()) {
            errors.push(Diagnostic::new(
                DiagnosticCode::DuplicateVariant,
                format!(
                    "variant `{}` is declared more than once in union `{}`",
                    variant.name, descriptor.name
                ),
                variant.span,
            ));
        }

        if variant.fields.len() > MAX_FIELDS_PER_VARIANT {
            errors.push(Diagnostic::new(
                DiagnosticCode::LimitExceeded,
                format!(
                    "variant `{}` has {} fields, but maximum allowed is {MAX_FIELDS_PER_VARIANT}",
                    variant.name,
                    variant.fields.len()
                ),
                variant.span,
            ));
        }

        let mut seen_fields = HashSet::new();
        for field in &variant.fields {
            if let Some(shadowed) = path_heads(&field.type_ref)
                .into_iter()
                .find(|head| is_variant_name(descriptor, head))
            {
                errors.push(
                    Diagnostic::new(
                        DiagnosticCode::VariantNameInFieldType,
                        format!(
                            "type of field `{}` in variant `{}` refers to `{shadowed}`, which is \
                             also a variant of union `{}`",
                            field.name, variant.name, descriptor.name
                        ),
                        field.span,
                    )
                    .with_help(format!(
                        "variant payloads are generated as structs named after the variant, so \
                         `{shadowed}` here would mean the payload struct; use `{}` or a \
                         qualified path such as `::std::string::String`",
                        descriptor.name
                    )),
                );
            }

            if !is_emittable_identifier(&field.name) {
                errors.push(Diagnostic::new(
                    DiagnosticCode::InvalidFieldName,
                    format!(
                        "field `{}` of variant `{}` cannot be used as a Rust identifier",
                        field.name, variant.name
                    ),
                    field.span,
                ));
            }
            if !seen_fields.insert(field.name.as_str()) {
                errors.push(Diagnostic::new(
                    DiagnosticCode::DuplicateField,
                    format!(
                        "field `{}` is declared more than once in variant `{}`",
                        field.name, variant.name
                    ),
                    field.span,
                ));
            }
        }
    }

    errors
}

fn is_variant_name(descriptor: &UnionDescriptor, name: &str) -> bool {
    descriptor.variants.iter().any(|v| v.name == name)
}

/// First segment of every path written in `type_ref`, lifetimes excluded.
///
/// `Vec<::std::string::String>` yields `Vec`; `HashMap<Key, Box<Node>>` yields `HashMap`,
/// `Key`, `Box` and `Node`.
fn path_heads(type_ref: &str) -> Vec<&str> {
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80;
    let bytes = type_ref.as_bytes();
    let mut heads = Vec::new();
    let mut after_separator = false;
    let mut after_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        if is_ident(bytes[i]) {
            let start = i;
            while i < bytes.len() && is_ident(bytes[i]) {
                i += 1;
            }
            if !after_separator && !after_quote {
                heads.push(&type_ref[start..i]);
            }
            after_separator = false;
            after_quote = false;
        } else if type_ref[i..].starts_with("::") {
            after_separator = true;
            i += 2;
        } else {
            if !bytes[i].is_ascii_whitespace() {
                after_separator = false;
                after_quote = bytes[i] == b'\'';
            }
            i += 1;
        }
    }
    heads
}

fn identifier_collisions(descriptor: &UnionDescriptor) -> (Vec<Diagnostic>, Conflicts) {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, variant) in descriptor.variants.iter().enumerate() {
        groups
            .entry(variant.derived_identifier())
            .or_default()
            .push(index);
    }

    let mut diagnostics = Vec::new();
    let mut conflicts = Conflicts::default();

    for (identifier, indices) in groups {
        if indices.len() < 2 {
            continue;
        }
        let first = &descriptor.variants[indices[0]];
        for &index in &indices[1..] {
            let variant = &descriptor.variants[index];
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::DerivedIdentifierCollision,
                    format!(
                        "variants `{}` and `{}` both derive the identifier `{identifier}`",
                        first.name, variant.name
                    ),
                    variant.span,
                )
                .with_help(format!(
                    "`fold`, `visit`, `map`, `tap` and the `*_{identifier}` members are not \
                     generated; rename one of the variants"
                )),
            );
        }
        conflicts.variants.extend(indices);
    }

    diagnostics.sort_by_key(|d| d.span.start);
    (diagnostics, conflicts)
}
