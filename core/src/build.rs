//! Cargo build-script driver.
//!
//! ```no_run
//! // build.rs
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     sumgen::build::Build::new().file("src/shapes.sum").compile()?;
//!     Ok(())
//! }
//! ```
//!
//! ```ignore
//! // lib.rs
//! include!(concat!(env!("OUT_DIR"), "/shapes.rs"));
//! ```
//!
//! Each declaration file `<stem>.sum` becomes `<stem>.rs` in the output directory. Two
//! inputs with the same stem are rejected before anything is read or written.
//! Diagnostics are forwarded as `cargo:warning=` lines; any error fails the build after
//! every file has been written.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::GeneratorConfig;
use crate::host::{CancellationToken, Generator};
use crate::syntax::SourceFile;
use crate::SumgenError;

/// Builder for one build-script invocation.
#[derive(Debug, Clone)]
pub struct Build {
    files: Vec<PathBuf>,
    config: GeneratorConfig,
    out_dir: Option<PathBuf>,
    cargo_metadata: bool,
}

impl Default for Build {
    fn default() -> Self {
        Self::new()
    }
}

impl Build {
    #[must_use]
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            config: GeneratorConfig::default(),
            out_dir: None,
            cargo_metadata: true,
        }
    }

    /// Add a declaration file.
    #[must_use]
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn files<P: AsRef<Path>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.files
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    #[must_use]
    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a YAML or JSON file, which is also tracked for reruns.
    ///
    /// # Errors
    ///
    /// See [`GeneratorConfig::load`].
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self, SumgenError> {
        let path = path.as_ref();
        self.config = GeneratorConfig::load(path)?;
        if self.cargo_metadata {
            println!("cargo:rerun-if-changed={}", path.display());
        }
        Ok(self)
    }

    /// Output directory; defaults to `$OUT_DIR`.
    #[must_use]
    pub fn out_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.out_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Print `cargo:` lines (on by default).
    #[must_use]
    pub fn cargo_metadata(mut self, enabled: bool) -> Self {
        self.cargo_metadata = enabled;
        self
    }

    /// Generate every file and return the paths written.
    ///
    /// # Errors
    ///
    /// - [`SumgenError::OutputClash`] if two inputs share a file stem.
    /// - [`SumgenError::Io`] if a file cannot be read or written, or no output directory
    ///   is known.
    /// - [`SumgenError::Diagnostics`] if any declaration reported an error.
    pub fn compile(self) -> Result<Vec<PathBuf>, SumgenError> {
        let names = output_names(&self.files)?;

        let out_dir = match self.out_dir.clone() {
            Some(dir) => dir,
            None => std::env::var_os("OUT_DIR")
                .map(PathBuf::from)
                .ok_or_else(|| SumgenError::Io {
                    path: "$OUT_DIR".to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "environment variable not set"),
                })?,
        };

        let mut sources = Vec::with_capacity(self.files.len());
        for path in &self.files {
            if self.cargo_metadata {
                println!("cargo:rerun-if-changed={}", path.display());
            }
            let text = std::fs::read_to_string(path).map_err(|source| SumgenError::Io {
                path: path.display().to_string(),
                source,
            })?;
            sources.push(SourceFile::new(path.display().to_string(), text));
        }

        let header = self.config.header;
        let mut generator = Generator::new(self.config);
        let output = generator.run(&sources, &CancellationToken::new())?;

        std::fs::create_dir_all(&out_dir).map_err(|source| SumgenError::Io {
            path: out_dir.display().to_string(),
            source,
        })?;

        let mut written = Vec::with_capacity(output.files.len());
        for ((name, source), file) in names.iter().zip(&sources).zip(&output.files) {
            if self.cargo_metadata {
                for diagnostic in &file.diagnostics {
                    for line in diagnostic.render(source).lines() {
                        println!("cargo:warning={line}");
                    }
                }
            }

            let target = out_dir.join(name);
            std::fs::write(&target, file.render(header)).map_err(|source| SumgenError::Io {
                path: target.display().to_string(),
                source,
            })?;
            tracing::debug!(target = %target.display(), unions = file.sources.len(), "wrote");
            written.push(target);
        }

        match output.error_count() {
            0 => Ok(written),
            count => Err(SumgenError::Diagnostics { count }),
        }
    }
}

/// `src/shapes.sum` → `shapes.rs`.
fn output_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "generated".into(), |s| s.to_string_lossy());
    PathBuf::from(format!("{stem}.rs"))
}

/// Output file name for each of `paths`, in order.
///
/// # Errors
///
/// Returns [`SumgenError::OutputClash`] if two paths map to the same name.
pub fn output_names(paths: &[PathBuf]) -> Result<Vec<PathBuf>, SumgenError> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    let mut names = Vec::with_capacity(paths.len());
    for path in paths {
        let name = output_name(path);
        if let Some(first) = seen.insert(name.clone(), path) {
            return Err(SumgenError::OutputClash {
                name: name.display().to_string(),
                first: first.display().to_string(),
                second: path.display().to_string(),
            });
        }
        names.push(name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sumgen-build-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn output_name_uses_the_stem() {
        assert_eq!(output_name(Path::new("src/shapes.sum")), PathBuf::from("shapes.rs"));
    }

    #[test]
    fn inputs_sharing_a_stem_are_rejected() {
        let paths = [PathBuf::from("a/shapes.sum"), PathBuf::from("b/shapes.sum")];
        let err = output_names(&paths).unwrap_err();
        let SumgenError::OutputClash { name, first, second } = err else {
            panic!("expected OutputClash, got {err:?}");
        };
        assert_eq!(name, "shapes.rs");
        assert_eq!(PathBuf::from(first), paths[0]);
        assert_eq!(PathBuf::from(second), paths[1]);

        let names =
            output_names(&[PathBuf::from("a/shapes.sum"), PathBuf::from("a/events.sum")]).unwrap();
        assert_eq!(
            names,
            vec![PathBuf::from("shapes.rs"), PathBuf::from("events.rs")]
        );
    }

    #[test]
    fn stem_clash_writes_nothing() {
        let dir = scratch("clash");
        for sub in ["a", "b"] {
            std::fs::create_dir_all(dir.join(sub)).unwrap();
            std::fs::write(
                dir.join(sub).join("shapes.sum"),
                "#[union] abstract partial type U { partial type A: U; }",
            )
            .unwrap();
        }

        let err = Build::new()
            .file(dir.join("a/shapes.sum"))
            .file(dir.join("b/shapes.sum"))
            .out_dir(dir.join("out"))
            .cargo_metadata(false)
            .compile()
            .unwrap_err();
        assert!(matches!(err, SumgenError::OutputClash { .. }));
        assert!(!dir.join("out").exists());
    }

    #[test]
    fn compile_writes_one_file_per_input() {
        let dir = scratch("ok");
        let input = dir.join("shapes.sum");
        std::fs::write(
            &input,
            "#[union] pub abstract partial type Shape { partial type Circle(radius: f64): Shape; }",
        )
        .unwrap();

        let written = Build::new()
            .file(&input)
            .out_dir(dir.join("out"))
            .cargo_metadata(false)
            .compile()
            .unwrap();

        assert_eq!(written, vec![dir.join("out").join("shapes.rs")]);
        let text = std::fs::read_to_string(&written[0]).unwrap();
        assert!(text.starts_with("// @generated"));
        assert!(text.contains("pub enum Shape {"));
    }

    #[test]
    fn errors_fail_the_build() {
        let dir = scratch("err");
        let input = dir.join("bad.sum");
        std::fs::write(
            &input,
            "#[union] abstract partial type U { partial type A: U; partial type A: U; }",
        )
        .unwrap();

        let err = Build::new()
            .file(&input)
            .out_dir(&dir)
            .cargo_metadata(false)
            .compile()
            .unwrap_err();
        assert!(matches!(err, SumgenError::Diagnostics { count: 1 }));
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = scratch("missing");
        let err = Build::new()
            .file(dir.join("nope.sum"))
            .out_dir(&dir)
            .cargo_metadata(false)
            .compile()
            .unwrap_err();
        assert!(matches!(err, SumgenError::Io { .. }));
    }
}
