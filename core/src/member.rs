//! `MemberSpec`: one synthesized member, self-describing enough to render on its own.
//!
//! Method names are fixed here; everything variant-specific comes from the variant's
//! derived identifier:
//!
//! | Kind | Method | Parameters |
//! |------|--------|------------|
//! | [`MemberSpec::Match`] | `fold` | `on_<id>` for every variant |
//! | [`MemberSpec::VoidMatch`] | `visit` | `on_<id>` for every variant |
//! | [`MemberSpec::IsCase`] | `is_<id>` | |
//! | [`MemberSpec::AsCase`] | `as_<id>` | |
//! | [`MemberSpec::Map`] | `map` | `on_<id>` for every variant |
//! | [`MemberSpec::Tap`] | `tap` | `on_<id>` for every variant |
//! | [`MemberSpec::Factory`] | `new_<id>` | one per field |
//! | [`MemberSpec::OptionBridge`] | `into_<id>` | |

use serde::Serialize;

pub const MATCH_METHOD: &str = "fold";
pub const VOID_MATCH_METHOD: &str = "visit";
pub const MAP_METHOD: &str = "map";
pub const TAP_METHOD: &str = "tap";

/// Handler parameter name for a variant.
#[must_use]
pub fn handler_param(derived_identifier: &str) -> String {
    format!("on_{derived_identifier}")
}

#[must_use]
pub fn is_method(derived_identifier: &str) -> String {
    format!("is_{derived_identifier}")
}

#[must_use]
pub fn as_method(derived_identifier: &str) -> String {
    format!("as_{derived_identifier}")
}

#[must_use]
pub fn factory_method(derived_identifier: &str) -> String {
    format!("new_{derived_identifier}")
}

#[must_use]
pub fn bridge_method(derived_identifier: &str) -> String {
    format!("into_{derived_identifier}")
}

/// Discriminant of [`MemberSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MemberKind {
    Match,
    VoidMatch,
    IsCase,
    AsCase,
    Map,
    Tap,
    Factory,
    OptionBridge,
}

/// What a member returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReturnShape {
    /// The caller-chosen handler result type.
    Generic,
    Unit,
    Bool,
    /// `Option<&Variant>`.
    BorrowedOption(String),
    /// `Option<Variant>`.
    OwnedOption(String),
    /// A (possibly different) value of the union.
    Union,
    /// The receiver itself, unchanged.
    Receiver,
}

/// One `on_<id>` parameter of a dispatch member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handler {
    pub param: String,
    pub variant: String,
}

/// A member with one handler per variant, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatch {
    pub method: String,
    pub handlers: Vec<Handler>,
}

/// A member targeting exactly one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseAccessor {
    pub method: String,
    pub variant: String,
}

/// A factory parameter, mapped onto the field of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactoryParam {
    pub name: String,
    pub type_ref: String,
}

/// A `new_<id>` constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Factory {
    pub method: String,
    pub variant: String,
    pub params: Vec<FactoryParam>,
}

/// One synthesized member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum MemberSpec {
    /// Exhaustive match returning the handler's result.
    Match(Dispatch),
    /// Match with optional side-effecting handlers.
    VoidMatch(Dispatch),
    /// `true` iff the value is the given variant.
    IsCase(CaseAccessor),
    /// Borrowing downcast.
    AsCase(CaseAccessor),
    /// Per-variant rewrite into the same union; omitted handlers are identity.
    Map(Dispatch),
    /// Observe the value, then return it unchanged.
    Tap(Dispatch),
    Factory(Factory),
    /// Consuming downcast.
    OptionBridge(CaseAccessor),
}

impl MemberSpec {
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self {
            Self::Match(_) => MemberKind::Match,
            Self::VoidMatch(_) => MemberKind::VoidMatch,
            Self::IsCase(_) => MemberKind::IsCase,
            Self::AsCase(_) => MemberKind::AsCase,
            Self::Map(_) => MemberKind::Map,
            Self::Tap(_) => MemberKind::Tap,
            Self::Factory(_) => MemberKind::Factory,
            Self::OptionBridge(_) => MemberKind::OptionBridge,
        }
    }

    /// Generated method name.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Match(d) | Self::VoidMatch(d) | Self::Map(d) | Self::Tap(d) => &d.method,
            Self::IsCase(c) | Self::AsCase(c) | Self::OptionBridge(c) => &c.method,
            Self::Factory(f) => &f.method,
        }
    }

    /// Variants the member refers to.
    #[must_use]
    pub fn variants(&self) -> Vec<&str> {
        match self {
            Self::Match(d) | Self::VoidMatch(d) | Self::Map(d) | Self::Tap(d) => {
                d.handlers.iter().map(|h| h.variant.as_str()).collect()
            }
            Self::IsCase(c) | Self::AsCase(c) | Self::OptionBridge(c) => vec![c.variant.as_str()],
            Self::Factory(f) => vec![f.variant.as_str()],
        }
    }

    #[must_use]
    pub fn return_shape(&self) -> ReturnShape {
        match self {
            Self::Match(_) => ReturnShape::Generic,
            Self::VoidMatch(_) => ReturnShape::Unit,
            Self::IsCase(_) => ReturnShape::Bool,
            Self::AsCase(c) => ReturnShape::BorrowedOption(c.variant.clone()),
            Self::Map(_) | Self::Factory(_) => ReturnShape::Union,
            Self::Tap(_) => ReturnShape::Receiver,
            Self::OptionBridge(c) => ReturnShape::OwnedOption(c.variant.clone()),
        }
    }
}
