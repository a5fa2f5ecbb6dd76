//! Conformance fixture runner
//!
//! Loads YAML fixtures and runs them through the generator. A fixture file may hold
//! several documents separated by `---`:
//!
//! ```yaml
//! name: collision_skips_dispatch
//! description: Two variants deriving the same identifier
//! config:
//!   strict: false
//! source: |
//!   #[union] abstract partial type Endpoint {
//!       partial type HttpServer: Endpoint;
//!       partial type HTTPServer: Endpoint;
//!   }
//! expect:
//!   unions: [Endpoint]
//!   diagnostics: [SG0001]
//!   members: []
//!   absent: [fold, visit, map, tap]
//! ```

use serde::Deserialize;
use sumgen::prelude::*;

use crate::{diagnostic_codes, has_member, Harness};

/// A complete test fixture
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Generator configuration; defaults apply when omitted.
    #[serde(default)]
    pub config: Option<GeneratorConfig>,
    /// Declaration file text.
    pub source: String,
    pub expect: Expectation,
}

/// What the run must produce. Omitted checks are skipped.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Expectation {
    /// Names of the unions generated, in declaration order.
    pub unions: Option<Vec<String>>,
    /// Exact diagnostic codes, in position order.
    pub diagnostics: Option<Vec<String>>,
    /// Methods that must be generated.
    pub members: Vec<String>,
    /// Methods that must not be generated.
    pub absent: Vec<String>,
    /// Snippets the rendered code must contain.
    pub contains: Vec<String>,
}

/// One failed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub check: &'static str,
    pub detail: String,
}

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Run the fixture and return every failed check
    pub fn run(&self) -> Vec<Failure> {
        let mut harness = Harness::with_config(self.config.clone().unwrap_or_default());
        let output = harness.run(&self.source);
        let code = output.render(false);
        let mut failures = Vec::new();

        if let Some(expected) = &self.expect.unions {
            let actual: Vec<_> = output.sources.iter().map(|s| s.union_name.clone()).collect();
            if &actual != expected {
                failures.push(Failure {
                    check: "unions",
                    detail: format!("expected {expected:?}, got {actual:?}"),
                });
            }
        }

        if let Some(expected) = &self.expect.diagnostics {
            let actual = diagnostic_codes(&output);
            if actual != *expected {
                let rendered: Vec<_> = output.diagnostics.iter().map(ToString::to_string).collect();
                failures.push(Failure {
                    check: "diagnostics",
                    detail: format!("expected {expected:?}, got {rendered:#?}"),
                });
            }
        }

        for method in &self.expect.members {
            if !has_member(&code, method) {
                failures.push(Failure {
                    check: "members",
                    detail: format!("`{method}` was not generated"),
                });
            }
        }

        for method in &self.expect.absent {
            if has_member(&code, method) {
                failures.push(Failure {
                    check: "absent",
                    detail: format!("`{method}` was generated"),
                });
            }
        }

        for snippet in &self.expect.contains {
            if !code.contains(snippet.as_str()) {
                failures.push(Failure {
                    check: "contains",
                    detail: format!("missing {snippet:?}"),
                });
            }
        }

        failures
    }

    /// Run the fixture and panic on the first failure
    pub fn run_and_assert(&self) {
        let failures = self.run();
        if let Some(failure) = failures.first() {
            let code = Harness::with_config(self.config.clone().unwrap_or_default())
                .run(&self.source)
                .render(false);
            panic!(
                "Fixture '{}' failed {} check: {}\n--- generated ---\n{code}",
                self.name, failure.check, failure.detail
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_document_files() {
        let yaml = "name: a
source: '#[union] abstract partial type U { partial type A: U; }'
expect:
  members: [fold]
---
name: b
config:
  capabilities:
    option_type: false
source: '#[union] abstract partial type U { partial type A: U; }'
expect:
  absent: [as_a]
";
        let fixtures = Fixture::from_yaml_multi(yaml).unwrap();
        assert_eq!(fixtures.len(), 2);
        assert!(fixtures[0].config.is_none());
        assert!(!fixtures[1].config.as_ref().unwrap().capabilities.option_type);
        for fixture in &fixtures {
            assert_eq!(fixture.run(), vec![]);
        }
    }

    #[test]
    fn reports_failed_checks() {
        let fixture = Fixture::from_yaml(
            "name: wrong
source: '#[union] abstract partial type U { partial type A: U; }'
expect:
  unions: [V]
  diagnostics: [SG0001]
  absent: [fold]
",
        )
        .unwrap();
        let checks: Vec<_> = fixture.run().into_iter().map(|f| f.check).collect();
        assert_eq!(checks, vec!["unions", "diagnostics", "absent"]);
    }
}
