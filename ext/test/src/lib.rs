//! sumgen-test: helpers for testing sumgen derivations
//!
//! Runs declaration text through a [`Generator`] as an in-memory file and answers the
//! questions conformance tests ask about the result: which members were generated,
//! which diagnostics were reported.
//!
//! # Example
//!
//! ```
//! use sumgen_test::prelude::*;
//!
//! let output = generate(
//!     "#[union] abstract partial type Shape {
//!          partial type Circle(radius: f64): Shape;
//!          partial type Square(side: f64): Shape;
//!      }",
//! );
//!
//! let code = output.render(false);
//! assert!(has_member(&code, "fold"));
//! assert!(has_member(&code, "new_circle"));
//! assert!(diagnostic_codes(&output).is_empty());
//! ```

use sumgen::prelude::*;
use sumgen::RunStats;

#[cfg(feature = "fixtures")]
pub mod fixture;

/// Name given to in-memory declaration files.
pub const TEST_FILE: &str = "test.sum";

/// A generator that is fed one in-memory file per run, keeping its cache between runs.
#[derive(Debug, Default)]
pub struct Harness {
    generator: Generator,
    last: RunStats,
}

impl Harness {
    /// Create a harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a harness with the given configuration.
    #[must_use]
    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            generator: Generator::new(config),
            last: RunStats::default(),
        }
    }

    /// Run the generator on `text`.
    ///
    /// # Panics
    ///
    /// Panics if the run is cancelled, which cannot happen with a fresh token.
    pub fn run(&mut self, text: &str) -> FileOutput {
        let file = SourceFile::new(TEST_FILE, text);
        let output = self
            .generator
            .run(&[file], &CancellationToken::new())
            .expect("uncancelled run");
        self.last = output.stats;
        output.files.into_iter().next().expect("one file in, one file out")
    }

    /// Counters of the most recent [`run`](Self::run).
    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.last
    }
}

/// One-shot generation with the default configuration.
#[must_use]
pub fn generate(text: &str) -> FileOutput {
    Harness::new().run(text)
}

/// One-shot generation with `config`.
#[must_use]
pub fn generate_with(text: &str, config: GeneratorConfig) -> FileOutput {
    Harness::with_config(config).run(text)
}

/// Whether `code` defines a method named `method`.
#[must_use]
pub fn has_member(code: &str, method: &str) -> bool {
    code.contains(&format!("fn {method}(")) || code.contains(&format!("fn {method}<"))
}

/// Codes of every diagnostic in `output`, in position order.
#[must_use]
pub fn diagnostic_codes(output: &FileOutput) -> Vec<&'static str> {
    output.diagnostics.iter().map(|d| d.code.code()).collect()
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{diagnostic_codes, generate, generate_with, has_member, Harness, TEST_FILE};
    pub use sumgen::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_member_matches_generic_and_plain_methods() {
        let code = "pub fn fold<R>(\n&self) {}\npub fn is_circle(&self) -> bool {}";
        assert!(has_member(code, "fold"));
        assert!(has_member(code, "is_circle"));
        assert!(!has_member(code, "is_circ"));
        assert!(!has_member(code, "visit"));
    }

    #[test]
    fn harness_keeps_the_cache_between_runs() {
        let text = "#[union] abstract partial type U { partial type A: U; }";
        let mut harness = Harness::new();
        harness.run(text);
        assert_eq!(harness.stats().derived, 1);
        harness.run(text);
        assert_eq!(harness.stats().reused, 1);
    }
}
