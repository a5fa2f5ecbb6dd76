//! Code emission: descriptor + member specs → Rust source text.
//!
//! Each union renders as:
//!
//! - the type skeleton: an enum with one tuple variant per variant, and one payload struct
//!   per variant with public fields;
//! - one `impl` block attaching every synthesized member to that enum.
//!
//! A non-empty namespace becomes nested `pub mod` wrappers; see [`render_unit`].
//!
//! Paths into `core` are fully qualified so a variant called `Option` or `FnOnce` cannot
//! shadow them. Field names that are Rust keywords are emitted as raw identifiers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::descriptor::{escape_ident, UnionDescriptor, VariantDescriptor};
use crate::member::{CaseAccessor, Dispatch, Factory, MemberSpec};
use crate::syntax::Namespace;

const OPTION: &str = "::core::option::Option";
const SOME: &str = "::core::option::Option::Some";
const NONE: &str = "::core::option::Option::None";
const FN_ONCE: &str = "::core::ops::FnOnce";
const FN_MUT: &str = "::core::ops::FnMut";

/// Rendered code for one union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedSource {
    /// Stable file-like name, e.g. `geometry.Shape.rs`.
    pub hint_name: String,
    pub union_name: String,
    pub namespace: Namespace,
    /// Names `body` defines at namespace level: the enum, then one payload struct per
    /// variant.
    pub items: Vec<String>,
    /// Items at namespace level, without any `mod` wrapper.
    pub body: String,
}

impl GeneratedSource {
    /// This source alone, wrapped in its namespace.
    #[must_use]
    pub fn text(&self) -> String {
        render_unit(std::slice::from_ref(self), None)
    }
}

/// Render `members` for `descriptor`.
#[must_use]
pub fn emit(descriptor: &UnionDescriptor, members: &[MemberSpec]) -> GeneratedSource {
    let ctx = EmitContext::new(descriptor);
    let mut w = CodeWriter::default();

    ctx.skeleton(&mut w);

    w.blank();
    w.line("#[allow(dead_code, clippy::too_many_arguments)]");
    w.open(format!("impl {} {{", descriptor.name));
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            w.blank();
        }
        ctx.member(&mut w, member);
    }
    w.close("}");

    let hint_name = if descriptor.namespace.is_global() {
        format!("{}.rs", descriptor.name)
    } else {
        format!("{}.{}.rs", descriptor.namespace.segments().join("."), descriptor.name)
    };

    GeneratedSource {
        hint_name,
        union_name: descriptor.name.clone(),
        namespace: descriptor.namespace.clone(),
        items: std::iter::once(&descriptor.name)
            .chain(descriptor.variants.iter().map(|v| &v.name))
            .cloned()
            .collect(),
        body: w.finish(),
    }
}

/// Render several sources as one file, grouping sources that share a namespace into a
/// single module tree. `banner` becomes a leading `//` comment.
#[must_use]
pub fn render_unit(sources: &[GeneratedSource], banner: Option<&str>) -> String {
    let mut root = ModuleNode::default();
    for source in sources {
        let mut node = &mut root;
        for segment in source.namespace.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.bodies.push(&source.body);
    }

    let mut w = CodeWriter::default();
    if let Some(banner) = banner {
        for line in banner.lines() {
            w.line(format!("// {line}"));
        }
        w.blank();
    }
    root.render(&mut w);
    w.finish()
}

#[derive(Default)]
struct ModuleNode<'a> {
    bodies: Vec<&'a str>,
    children: BTreeMap<String, ModuleNode<'a>>,
}

impl ModuleNode<'_> {
    fn render(&self, w: &mut CodeWriter) {
        let mut first = true;
        for body in &self.bodies {
            if !first {
                w.blank();
            }
            first = false;
            w.block(body);
        }
        for (name, child) in &self.children {
            if !first {
                w.blank();
            }
            first = false;
            w.open(format!("pub mod {name} {{"));
            w.line("#[allow(unused_imports)]");
            w.line("use super::*;");
            w.blank();
            child.render(w);
            w.close("}");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Per-union rendering
// ═══════════════════════════════════════════════════════════════════════════════

struct EmitContext<'a> {
    descriptor: &'a UnionDescriptor,
    /// `pub ` / `pub(crate) ` / empty.
    vis: String,
    /// Type parameter name for `fold`'s result; `R` unless a variant is called `R`.
    result_param: String,
}

impl<'a> EmitContext<'a> {
    fn new(descriptor: &'a UnionDescriptor) -> Self {
        let vis = descriptor
            .visibility
            .as_ref()
            .map(|v| format!("{v} "))
            .unwrap_or_default();
        Self {
            descriptor,
            vis,
            result_param: result_param(descriptor),
        }
    }

    fn variant(&self, name: &str) -> Option<&'a VariantDescriptor> {
        self.descriptor.variant(name)
    }

    fn has_other_variants(&self) -> bool {
        self.descriptor.variants.len() > 1
    }

    // ── skeleton ────────────────────────────────────────────────────────────

    fn skeleton(&self, w: &mut CodeWriter) {
        let d = self.descriptor;

        if d.docs.is_empty() {
            let list = d
                .variants
                .iter()
                .map(|v| format!("[`{}`]", v.name))
                .collect::<Vec<_>>()
                .join(", ");
            w.doc(&format!("Closed union of {list}."));
        } else {
            for line in &d.docs {
                w.doc(line);
            }
        }
        for attribute in &d.attributes {
            w.line(attribute);
        }
        w.open(format!("{}enum {} {{", self.vis, d.name));
        for variant in &d.variants {
            w.doc(&format!("See [`{}`].", variant.name));
            w.line(format!("{}({}),", variant.name, variant.name));
        }
        w.close("}");

        for variant in &d.variants {
            w.blank();
            if variant.docs.is_empty() {
                w.doc(&format!("Payload of the [`{}::{}`] variant.", d.name, variant.name));
            } else {
                for line in &variant.docs {
                    w.doc(line);
                }
            }
            for attribute in &d.attributes {
                w.line(attribute);
            }
            if variant.fields.is_empty() {
                w.line(format!("{}struct {} {{}}", self.vis, variant.name));
                continue;
            }
            w.open(format!("{}struct {} {{", self.vis, variant.name));
            for field in &variant.fields {
                w.line(format!("pub {}: {},", escape_ident(&field.name), field.type_ref));
            }
            w.close("}");
        }
    }

    // ── members ─────────────────────────────────────────────────────────────

    fn member(&self, w: &mut CodeWriter, member: &MemberSpec) {
        match member {
            MemberSpec::Match(d) => self.match_method(w, d),
            MemberSpec::VoidMatch(d) => self.void_match_method(w, d),
            MemberSpec::IsCase(c) => self.is_method(w, c),
            MemberSpec::AsCase(c) => self.as_method(w, c),
            MemberSpec::Map(d) => self.map_method(w, d),
            MemberSpec::Tap(d) => self.tap_method(w, d),
            MemberSpec::Factory(f) => self.factory_method(w, f),
            MemberSpec::OptionBridge(c) => self.bridge_method(w, c),
        }
    }

    /// Writes `fn name(receiver, p1: T1, ...) -> ret {` with one parameter per line.
    fn signature(
        &self,
        w: &mut CodeWriter,
        name: &str,
        receiver: &str,
        params: Vec<String>,
        ret: Option<&str>,
    ) {
        let ret = ret.map(|r| format!(" -> {r}")).unwrap_or_default();
        w.open(format!("{}fn {name}(", self.vis));
        w.line(format!("{receiver},"));
        for param in params {
            w.line(format!("{param},"));
        }
        w.indent -= 1;
        w.open(format!("){ret} {{"));
    }

    fn match_method(&self, w: &mut CodeWriter, d: &Dispatch) {
        let r = &self.result_param;
        w.doc("Exhaustive match: calls the handler for this value's variant and returns its result.");
        w.doc("");
        w.doc("Every variant has a mandatory handler, so adding a variant breaks each call site");
        w.doc("until it handles the new case.");
        w.line("#[inline]");
        let params = d
            .handlers
            .iter()
            .map(|h| format!("{}: impl {FN_ONCE}(&{}) -> {r}", h.param, h.variant))
            .collect();
        self.signature(w, &format!("{}<{r}>", d.method), "&self", params, Some(r));
        w.open("match self {");
        for h in &d.handlers {
            w.line(format!("Self::{}(value) => {}(value),", h.variant, h.param));
        }
        w.close("}");
        w.close("}");
    }

    fn void_match_method(&self, w: &mut CodeWriter, d: &Dispatch) {
        w.doc("Calls the handler for this value's variant, if one was given.");
        w.doc("");
        w.doc("Handlers are optional: a variant without one is a no-op.");
        let params = d
            .handlers
            .iter()
            .map(|h| format!("{}: {OPTION}<&mut dyn {FN_MUT}(&{})>", h.param, h.variant))
            .collect();
        self.signature(w, &d.method, "&self", params, None);
        w.open("match self {");
        for h in &d.handlers {
            w.open(format!("Self::{}(value) => {{", h.variant));
            w.open(format!("if let {SOME}(handler) = {} {{", h.param));
            w.line("handler(value);");
            w.close("}");
            w.close("}");
        }
        w.close("}");
        w.close("}");
    }

    fn is_method(&self, w: &mut CodeWriter, c: &CaseAccessor) {
        w.doc(&format!(
            "Returns `true` if and only if this value is the [`{}`] variant.",
            c.variant
        ));
        w.line("#[must_use]");
        w.line("#[inline]");
        w.open(format!("{}fn {}(&self) -> bool {{", self.vis, c.method));
        w.line(format!("::core::matches!(self, Self::{}(_))", c.variant));
        w.close("}");
    }

    fn as_method(&self, w: &mut CodeWriter, c: &CaseAccessor) {
        w.doc(&format!(
            "Borrows the [`{}`] payload, or returns `None` for any other variant.",
            c.variant
        ));
        w.line("#[must_use]");
        w.open(format!(
            "{}fn {}(&self) -> {OPTION}<&{}> {{",
            self.vis, c.method, c.variant
        ));
        self.downcast_body(w, &c.variant);
        w.close("}");
    }

    fn bridge_method(&self, w: &mut CodeWriter, c: &CaseAccessor) {
        w.doc(&format!(
            "Converts into the [`{}`] payload, or returns `None` for any other variant.",
            c.variant
        ));
        w.line("#[must_use]");
        w.open(format!(
            "{}fn {}(self) -> {OPTION}<{}> {{",
            self.vis, c.method, c.variant
        ));
        self.downcast_body(w, &c.variant);
        w.close("}");
    }

    fn downcast_body(&self, w: &mut CodeWriter, variant: &str) {
        w.open("match self {");
        w.line(format!("Self::{variant}(value) => {SOME}(value),"));
        if self.has_other_variants() {
            w.line(format!("_ => {NONE},"));
        }
        w.close("}");
    }

    fn map_method(&self, w: &mut CodeWriter, d: &Dispatch) {
        w.doc("Rewrites this value with the transform for its variant.");
        w.doc("");
        w.doc("A variant without a transform is returned unchanged, so the result is always");
        w.doc(&format!("a `{}`.", self.descriptor.name));
        w.line("#[must_use]");
        let params = d
            .handlers
            .iter()
            .map(|h| {
                format!(
                    "{}: {OPTION}<&mut dyn {FN_MUT}({}) -> Self>",
                    h.param, h.variant
                )
            })
            .collect();
        self.signature(w, &d.method, "self", params, Some("Self"));
        w.open("match self {");
        for h in &d.handlers {
            w.open(format!("Self::{}(value) => match {} {{", h.variant, h.param));
            w.line(format!("{SOME}(transform) => transform(value),"));
            w.line(format!("{NONE} => Self::{}(value),", h.variant));
            w.close("},");
        }
        w.close("}");
        w.close("}");
    }

    fn tap_method(&self, w: &mut CodeWriter, d: &Dispatch) {
        w.doc("Calls the observer for this value's variant, if one was given, then returns the");
        w.doc("value unchanged.");
        let params = d
            .handlers
            .iter()
            .map(|h| format!("{}: {OPTION}<&mut dyn {FN_MUT}(&{})>", h.param, h.variant))
            .collect();
        self.signature(w, &d.method, "self", params, Some("Self"));
        w.open("match &self {");
        for h in &d.handlers {
            w.open(format!("Self::{}(value) => {{", h.variant));
            w.open(format!("if let {SOME}(observer) = {} {{", h.param));
            w.line("observer(value);");
            w.close("}");
            w.close("}");
        }
        w.close("}");
        w.line("self");
        w.close("}");
    }

    fn factory_method(&self, w: &mut CodeWriter, f: &Factory) {
        w.doc(&format!("Creates a [`{}`] value.", f.variant));
        w.line("#[must_use]");
        let params: Vec<String> = f
            .params
            .iter()
            .map(|p| format!("{}: {}", escape_ident(&p.name), p.type_ref))
            .collect();
        let fields = f
            .params
            .iter()
            .map(|p| escape_ident(&p.name))
            .collect::<Vec<_>>()
            .join(", ");
        let construct = if fields.is_empty() {
            format!("Self::{}({} {{}})", f.variant, f.variant)
        } else {
            format!("Self::{}({} {{ {fields} }})", f.variant, f.variant)
        };

        debug_assert!(self.variant(&f.variant).is_some());

        w.open(format!(
            "{}fn {}({}) -> Self {{",
            self.vis,
            f.method,
            params.join(", ")
        ));
        w.line(construct);
        w.close("}");
    }
}

/// `R`, or the first of `R0`, `R1`, ... that no variant (or the union) is named.
fn result_param(descriptor: &UnionDescriptor) -> String {
    let taken = |name: &str| {
        name == descriptor.name || descriptor.variants.iter().any(|v| v.name == name)
    };
    if !taken("R") {
        return "R".to_string();
    }
    (0..)
        .map(|i| format!("R{i}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| "R".to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Writer
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct CodeWriter {
    out: String,
    indent: usize,
}

impl CodeWriter {
    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn doc(&mut self, text: &str) {
        if text.is_empty() {
            self.line("///");
        } else {
            self.line(format!("/// {text}"));
        }
    }

    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent += 1;
    }

    fn close(&mut self, text: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    /// Writes pre-rendered text at the current indentation.
    fn block(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    fn finish(self) -> String {
        self.out
    }
}
