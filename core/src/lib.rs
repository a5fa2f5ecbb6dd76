//! sumgen - derivation engine for closed tagged unions
//!
//! Given a declarative skeleton of a closed set of variants, sumgen synthesizes a complete,
//! exhaustiveness-checked API for it: `fold`, `visit`, `is_*`, `as_*`, `map`, `tap`,
//! `new_*` and `into_*`.
//!
//! # Pipeline
//!
//! - [`parse_unit`]: `.sum` declaration text → [`CompilationUnit`]
//! - [`extract`]: marked declaration → [`UnionDescriptor`] (or a [`DeclineReason`])
//! - [`validate`]: descriptor → [`Gate`]: decline, abort with errors, or proceed
//! - [`synthesize`]: descriptor → [`MemberSpec`] list, in a fixed order
//! - [`emit`]: descriptor + members → Rust source text
//! - [`Generator`]: incremental driver over all of the above
//!
//! # Key Design Insights
//!
//! 1. **Declarations, not macros**: the engine reads only syntax facts (modifiers, nesting,
//!    inheritance lists, parameter lists). No type checking, no macro expansion.
//!
//! 2. **Failures are local**: an ineligible declaration is declined silently, a
//!    contradictory one reports errors and produces nothing, and neither affects any other
//!    union in the same run.
//!
//! 3. **One name per variant**: every member naming a variant reads the same derived
//!    identifier from the descriptor, so `on_circle`, `is_circle` and `new_circle` agree.
//!
//! # Example
//!
//! ```
//! use sumgen::prelude::*;
//!
//! let file = SourceFile::new(
//!     "shapes.sum",
//!     "namespace geometry;
//!
//!      #[union]
//!      pub abstract partial type Shape {
//!          partial type Circle(radius: f64): Shape;
//!          partial type Square(side: f64): Shape;
//!      }",
//! );
//!
//! let mut generator = Generator::new(GeneratorConfig::default());
//! let output = generator.run(&[file], &CancellationToken::new()).unwrap();
//!
//! let code = output.files[0].render(true);
//! assert!(code.contains("pub mod geometry {"));
//! assert!(code.contains("pub fn new_square(side: f64) -> Self {"));
//! ```
//!
//! # Drivers
//!
//! - [`build::Build`]: cargo build scripts (`OUT_DIR` + `include!`)
//! - `sumgen`: command-line tool (`sumgen-cli` crate)

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

pub mod build;
mod config;
mod descriptor;
mod diagnostic;
mod emit;
mod extract;
mod host;
mod member;
mod parse;
mod synth;
mod syntax;
mod validate;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Syntax
pub use parse::{parse_unit, ParseError, ParseOutput};
pub use syntax::{
    Attribute, AttributeArg, CompilationUnit, Item, Modifiers, Namespace, ParamDecl,
    SourceFile, Span, TypeDecl, TypePath, MARKER_ATTRIBUTE,
};

// Pipeline stages
pub use descriptor::{
    derive_identifier, FieldDescriptor, UnionDescriptor, UnionOptions, VariantDescriptor,
};
pub use emit::{emit, render_unit, GeneratedSource};
pub use extract::{extract, DeclineReason, Extracted};
pub use member::{
    CaseAccessor, Dispatch, Factory, FactoryParam, Handler, MemberKind, MemberSpec, ReturnShape,
};
pub use synth::synthesize;
pub use validate::{validate, Conflicts, Gate};

// Diagnostics
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};

// Host
pub use config::{Capabilities, GeneratorConfig};
pub use host::{
    derive, describe, CancellationToken, Cancelled, Derivation, Description, FileOutput,
    Generator, RunOutput, RunStats,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use sumgen::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CancellationToken, Diagnostic, DiagnosticCode, FileOutput, Generator, GeneratorConfig,
        RunOutput, Severity, SourceFile, SumgenError,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of variants in one union.
///
/// Every dispatch member takes one handler per variant; past this point the generated
/// signatures stop being usable.
pub const MAX_VARIANTS: usize = 256;

/// Maximum number of fields in one variant (and so parameters of its `new_*` factory).
pub const MAX_FIELDS_PER_VARIANT: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from loading configuration and driving a run.
///
/// Problems with individual declarations are not errors: they are reported as
/// [`Diagnostic`]s and leave every other declaration unaffected.
#[derive(Debug, thiserror::Error)]
pub enum SumgenError {
    /// A file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Configuration deserialization failed.
    #[error("invalid config: {message}")]
    Config { message: String },
    /// Two inputs would be written to the same output file.
    #[error("{first} and {second} would both be written to {name}")]
    OutputClash {
        name: String,
        first: String,
        second: String,
    },
    /// The run finished but reported errors.
    #[error("generation failed with {count} error(s)")]
    Diagnostics { count: usize },
    /// The run was cancelled before it finished.
    #[error("generation cancelled")]
    Cancelled,
}
