//! Member synthesis: `UnionDescriptor` → `[MemberSpec]`.
//!
//! One generator per member kind, run in a fixed order:
//!
//! 1. `fold` (exhaustive match)
//! 2. `visit` (void match)
//! 3. `is_<id>` per variant
//! 4. `as_<id>` per variant (needs the `option_type` capability)
//! 5. `map`
//! 6. `tap`
//! 7. `new_<id>` per variant (unless `factories = false`)
//! 8. `into_<id>` per variant (needs the `option_type` capability)
//!
//! Members blocked by [`Conflicts`] are left out; everything else is still produced.
//!
//! # INV: pure
//!
//! The output depends only on the descriptor, the conflicts and the capabilities. The
//! cancellation token is the only other input, and it can only cut the work short.

use crate::config::Capabilities;
use crate::descriptor::{UnionDescriptor, VariantDescriptor};
use crate::host::{CancellationToken, Cancelled};
use crate::member::{
    as_method, bridge_method, factory_method, handler_param, is_method, CaseAccessor, Dispatch,
    Factory, FactoryParam, Handler, MemberSpec, MAP_METHOD, MATCH_METHOD, TAP_METHOD,
    VOID_MATCH_METHOD,
};
use crate::validate::Conflicts;

type Generator = fn(&Synthesis<'_>) -> Vec<MemberSpec>;

const GENERATORS: [(&str, Generator); 8] = [
    ("match", match_member),
    ("void_match", void_match_member),
    ("is_case", predicates),
    ("as_case", downcasts),
    ("map", map_member),
    ("tap", tap_member),
    ("factory", factories),
    ("option_bridge", option_bridges),
];

struct Synthesis<'a> {
    descriptor: &'a UnionDescriptor,
    conflicts: &'a Conflicts,
    capabilities: &'a Capabilities,
}

impl<'a> Synthesis<'a> {
    fn dispatch(&self, method: &str, build: fn(Dispatch) -> MemberSpec) -> Vec<MemberSpec> {
        if self.conflicts.blocks_dispatch() {
            return Vec::new();
        }
        let handlers = self
            .descriptor
            .variants
            .iter()
            .map(|variant| Handler {
                param: handler_param(variant.derived_identifier()),
                variant: variant.name.clone(),
            })
            .collect();
        vec![build(Dispatch {
            method: method.to_string(),
            handlers,
        })]
    }

    /// Variants that may carry per-variant members.
    fn clear_variants(&self) -> impl Iterator<Item = &'a VariantDescriptor> {
        let conflicts = self.conflicts;
        self.descriptor
            .variants
            .iter()
            .enumerate()
            .filter(move |(index, _)| !conflicts.contains(*index))
            .map(|(_, variant)| variant)
    }

    fn per_variant(
        &self,
        method: fn(&str) -> String,
        build: fn(CaseAccessor) -> MemberSpec,
    ) -> Vec<MemberSpec> {
        self.clear_variants()
            .map(|variant| {
                build(CaseAccessor {
                    method: method(variant.derived_identifier()),
                    variant: variant.name.clone(),
                })
            })
            .collect()
    }
}

/// Synthesize every member for `descriptor`, in the documented order.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` fires before synthesis completes; no partial member
/// list is ever returned.
pub fn synthesize(
    descriptor: &UnionDescriptor,
    conflicts: &Conflicts,
    capabilities: &Capabilities,
    cancel: &CancellationToken,
) -> Result<Vec<MemberSpec>, Cancelled> {
    let synthesis = Synthesis {
        descriptor,
        conflicts,
        capabilities,
    };

    let mut members = Vec::new();
    for (name, generator) in GENERATORS {
        cancel.check()?;
        let produced = generator(&synthesis);
        tracing::trace!(
            union = %descriptor.name,
            generator = name,
            count = produced.len(),
            "generator finished"
        );
        members.extend(produced);
    }
    Ok(members)
}

fn match_member(s: &Synthesis<'_>) -> Vec<MemberSpec> {
    s.dispatch(MATCH_METHOD, MemberSpec::Match)
}

fn void_match_member(s: &Synthesis<'_>) -> Vec<MemberSpec> {
    s.dispatch(VOID_MATCH_METHOD, MemberSpec::VoidMatch)
}

fn predicates(s: &Synthesis<'_>) -> Vec<MemberSpec> {
    s.per_variant(is_method, MemberSpec::IsCase)
}

fn downcasts(s: &Synthesis<'_>) -> Vec<MemberSpec> {
    if !s.capabilities.option_type {
        return Vec::new();
    }
    s.per_variant(as_method, MemberSpec::AsCase)
}

fn map_member(s: &Synthesis<'_>) -> Vec<MemberSpec> {
    s.dispatch(MAP_METHOD, MemberSpec::Map)
}

fn tap_member(s: &Synthesis<'_>) -> Vec<MemberSpec> {
    s.dispatch(TAP_METHOD, MemberSpec::Tap)
}

fn factories(s: &Synthesis<'_>) -> Vec<MemberSpec> {
    if !s.descriptor.options.generate_factory_methods {
        return Vec::new();
    }
    s.clear_variants()
        .map(|variant| {
            MemberSpec::Factory(Factory {
                method: factory_method(variant.derived_identifier()),
                variant: variant.name.clone(),
                params: variant
                    .fields
                    .iter()
                    .map(|field| FactoryParam {
                        name: field.name.clone(),
                        type_ref: field.type_ref.clone(),
                    })
                    .collect(),
            })
        })
        .collect()
}

fn option_bridges(s: &Synthesis<'_>) -> Vec<MemberSpec> {
    if !s.capabilities.option_type {
        return Vec::new();
    }
    s.per_variant(bridge_method, MemberSpec::OptionBridge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldDescriptor;
    use crate::member::MemberKind;
    use crate::syntax::{Namespace, Span};
    use crate::validate::{validate, Gate};

    fn field(name: &str, ty: &str) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            type_ref: ty.into(),
            span: Span::default(),
        }
    }

    fn shape() -> UnionDescriptor {
        UnionDescriptor::new(
            "Shape",
            Namespace::default(),
            vec![
                VariantDescriptor::new("Circle", vec![field("radius", "f64")]),
                VariantDescriptor::new(
                    "Rectangle",
                    vec![field("width", "f64"), field("height", "f64")],
                ),
                VariantDescriptor::new(
                    "Triangle",
                    vec![field("base", "f64"), field("height", "f64")],
                ),
            ],
        )
    }

    fn members(descriptor: &UnionDescriptor, capabilities: Capabilities) -> Vec<MemberSpec> {
        let Gate::Proceed { conflicts, .. } = validate(descriptor) else {
            panic!("expected Proceed");
        };
        synthesize(
            descriptor,
            &conflicts,
            &capabilities,
            &CancellationToken::new(),
        )
        .unwrap()
    }

    fn methods(members: &[MemberSpec]) -> Vec<&str> {
        members.iter().map(MemberSpec::method).collect()
    }

    #[test]
    fn members_come_out_in_fixed_order() {
        let members = members(&shape(), Capabilities::default());
        assert_eq!(
            methods(&members),
            vec![
                "fold",
                "visit",
                "is_circle",
                "is_rectangle",
                "is_triangle",
                "as_circle",
                "as_rectangle",
                "as_triangle",
                "map",
                "tap",
                "new_circle",
                "new_rectangle",
                "new_triangle",
                "into_circle",
                "into_rectangle",
                "into_triangle",
            ]
        );
    }

    #[test]
    fn match_has_one_handler_per_variant() {
        let members = members(&shape(), Capabilities::default());
        let MemberSpec::Match(dispatch) = &members[0] else {
            panic!("first member must be Match");
        };
        let params: Vec<_> = dispatch.handlers.iter().map(|h| h.param.as_str()).collect();
        assert_eq!(params, vec!["on_circle", "on_rectangle", "on_triangle"]);
    }

    #[test]
    fn factory_params_follow_field_order() {
        let members = members(&shape(), Capabilities::default());
        let factory = members
            .iter()
            .find_map(|m| match m {
                MemberSpec::Factory(f) if f.variant == "Triangle" => Some(f),
                _ => None,
            })
            .unwrap();
        let params: Vec<_> = factory.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["base", "height"]);
    }

    #[test]
    fn option_capability_gates_downcasts_and_bridges() {
        let members = members(
            &shape(),
            Capabilities {
                option_type: false,
            },
        );
        assert!(!members
            .iter()
            .any(|m| matches!(m.kind(), MemberKind::AsCase | MemberKind::OptionBridge)));
        assert!(members.iter().any(|m| m.kind() == MemberKind::IsCase));
    }

    #[test]
    fn factories_option_disables_constructors() {
        let mut descriptor = shape();
        descriptor.options.generate_factory_methods = false;
        let members = members(&descriptor, Capabilities::default());
        assert!(!members.iter().any(|m| m.kind() == MemberKind::Factory));
    }

    #[test]
    fn collision_skips_dispatch_and_conflicting_variants_only() {
        let descriptor = UnionDescriptor::new(
            "Endpoint",
            Namespace::default(),
            vec![
                VariantDescriptor::new("HttpServer", vec![]),
                VariantDescriptor::new("HTTPServer", vec![]),
                VariantDescriptor::new("Socket", vec![]),
            ],
        );
        let members = members(&descriptor, Capabilities::default());
        assert_eq!(
            methods(&members),
            vec!["is_socket", "as_socket", "new_socket", "into_socket"]
        );
    }

    #[test]
    fn synthesis_is_deterministic() {
        let a = members(&shape(), Capabilities::default());
        let b = members(&shape(), Capabilities::default());
        assert_eq!(a, b);
    }

    #[test]
    fn cancelled_token_yields_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let result = synthesize(
            &shape(),
            &Conflicts::default(),
            &Capabilities::default(),
            &token,
        );
        assert_eq!(result, Err(Cancelled));
    }
}
