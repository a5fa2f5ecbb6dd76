//! Host integration: the incremental [`Generator`] and the pure [`derive`] pipeline.
//!
//! ```text
//! SourceFile ──parse──► Item ──extract──► UnionDescriptor ──validate──► Gate
//!                                                                        │
//!                       GeneratedSource ◄──emit── [MemberSpec] ◄──synth──┘
//! ```
//!
//! # Incrementality
//!
//! The generator caches one entry per marked declaration, keyed by
//! `(file, namespace, union name)`. An entry stores the declaration's exact syntax text;
//! on the next [`Generator::run`] an entry whose text is unchanged is reused as is, even
//! when the declaration moved. Its diagnostics are shifted to the new position. Anything
//! else is derived again from scratch, and entries whose declaration vanished are evicted.
//!
//! Each file renders to one module tree, so after derivation every union's items are
//! checked against the names earlier unions of the same file already took in that
//! namespace. A union that would redefine one is dropped with an error, and every
//! other union is still generated. The check runs on every run, cached or not.
//!
//! # Concurrency
//!
//! Declarations are independent, so cache misses are derived in parallel (with the
//! `parallel` feature). A [`CancellationToken`] is checked between stages; a cancelled
//! declaration yields nothing and is never cached.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::descriptor::UnionDescriptor;
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::emit::{emit, render_unit, GeneratedSource};
use crate::extract::{extract, DeclineReason};
use crate::member::MemberSpec;
use crate::parse::parse_unit;
use crate::synth::synthesize;
use crate::syntax::{Item, Namespace, SourceFile, TypeDecl};
use crate::validate::{validate, Gate};
use crate::SumgenError;

// ═══════════════════════════════════════════════════════════════════════════════
// Cancellation
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared cooperative cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// # Errors
    ///
    /// Returns [`Cancelled`] once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A derivation stopped because its token was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("derivation cancelled")]
pub struct Cancelled;

impl From<Cancelled> for SumgenError {
    fn from(_: Cancelled) -> Self {
        SumgenError::Cancelled
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Pure pipeline
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of deriving one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    /// Not an eligible union; nothing is produced and nothing is reported.
    Declined(DeclineReason),
    /// Eligible. `source` is `None` when the gate aborted, in which case `diagnostics`
    /// holds at least one error.
    Derived {
        source: Option<GeneratedSource>,
        diagnostics: Vec<Diagnostic>,
    },
}

/// Run extract → validate → synthesize → emit on one declaration.
///
/// The result depends only on the declaration, its namespace and `config`.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` fires before emission.
pub fn derive(
    decl: &TypeDecl,
    namespace: &Namespace,
    config: &GeneratorConfig,
    cancel: &CancellationToken,
) -> Result<Derivation, Cancelled> {
    cancel.check()?;

    let extracted = match extract(decl, namespace) {
        Ok(extracted) => extracted,
        Err(reason) => return Ok(Derivation::Declined(reason)),
    };
    let descriptor = extracted.descriptor;
    let mut diagnostics = extracted.diagnostics;

    cancel.check()?;
    match validate(&descriptor) {
        Gate::Decline(reason) => Ok(Derivation::Declined(reason)),
        Gate::Abort(errors) => {
            diagnostics.extend(errors);
            Ok(Derivation::Derived {
                source: None,
                diagnostics,
            })
        }
        Gate::Proceed {
            diagnostics: gate_diagnostics,
            conflicts,
        } => {
            diagnostics.extend(gate_diagnostics);
            let members = synthesize(&descriptor, &conflicts, &config.capabilities, cancel)?;
            cancel.check()?;
            Ok(Derivation::Derived {
                source: Some(emit(&descriptor, &members)),
                diagnostics,
            })
        }
    }
}

/// Descriptor and members of one union, as reported by `sumgen describe`.
#[derive(Debug, Clone, Serialize)]
pub struct Description {
    pub descriptor: UnionDescriptor,
    /// Empty when the gate aborted.
    pub members: Vec<MemberSpec>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Describe every eligible union in `file`, without rendering code.
///
/// Declined declarations are left out.
#[must_use]
pub fn describe(file: &SourceFile, config: &GeneratorConfig) -> Vec<Description> {
    let parsed = parse_unit(file);
    let never = CancellationToken::new();

    parsed
        .unit
        .marked()
        .filter_map(|item| {
            let extracted = extract(&item.decl, &item.namespace).ok()?;
            let mut diagnostics = extracted.diagnostics;
            let members = match validate(&extracted.descriptor) {
                Gate::Decline(_) => return None,
                Gate::Abort(errors) => {
                    diagnostics.extend(errors);
                    Vec::new()
                }
                Gate::Proceed {
                    diagnostics: gate_diagnostics,
                    conflicts,
                } => {
                    diagnostics.extend(gate_diagnostics);
                    synthesize(
                        &extracted.descriptor,
                        &conflicts,
                        &config.capabilities,
                        &never,
                    )
                    .ok()?
                }
            };
            Some(Description {
                descriptor: extracted.descriptor,
                members,
                diagnostics,
            })
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Generator
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity of a marked declaration across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DeclarationKey {
    file: String,
    namespace: Namespace,
    name: String,
}

/// What one declaration contributes to its file's output.
#[derive(Debug, Clone)]
struct Outcome {
    source: Option<GeneratedSource>,
    /// Spans relative to the file the declaration was derived in.
    diagnostics: Vec<Diagnostic>,
    declined: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    /// Exact declaration text the outcome was derived from.
    syntax: String,
    /// Byte offset of the declaration when it was derived.
    origin: usize,
    outcome: Outcome,
}

/// Counters for one [`Generator::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Declarations derived in this run.
    pub derived: usize,
    /// Declarations whose cached outcome was reused.
    pub reused: usize,
    /// Marked declarations that are not eligible unions.
    pub declined: usize,
}

/// Generated code and diagnostics for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutput {
    pub name: String,
    /// One source per derived union, in declaration order.
    pub sources: Vec<GeneratedSource>,
    /// Sorted by position.
    pub diagnostics: Vec<Diagnostic>,
}

impl FileOutput {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// All sources of this file as one Rust file, ready for `include!`.
    #[must_use]
    pub fn render(&self, header: bool) -> String {
        let banner = header.then(|| format!("@generated by sumgen from {}. Do not edit.", self.name));
        render_unit(&self.sources, banner.as_deref())
    }
}

/// Output of one [`Generator::run`], one entry per input file in input order.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub files: Vec<FileOutput>,
    pub stats: RunStats,
}

impl RunOutput {
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.files
            .iter()
            .flat_map(|f| &f.diagnostics)
            .filter(|d| d.is_error())
            .count()
    }

    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FileOutput> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// A marked declaration waiting to be derived or reused.
struct Job<'a> {
    file: usize,
    key: DeclarationKey,
    syntax: &'a str,
    origin: usize,
    item: &'a Item,
}

/// Incremental derivation driver.
///
/// # Example
///
/// ```
/// use sumgen::{CancellationToken, Generator, GeneratorConfig, SourceFile};
///
/// let mut generator = Generator::new(GeneratorConfig::default());
/// let file = SourceFile::new(
///     "shapes.sum",
///     "#[union] pub abstract partial type Shape { partial type Circle(radius: f64): Shape; }",
/// );
///
/// let output = generator.run(&[file.clone()], &CancellationToken::new()).unwrap();
/// assert_eq!(output.stats.derived, 1);
/// assert!(output.files[0].render(true).contains("pub fn is_circle(&self) -> bool"));
///
/// let output = generator.run(&[file], &CancellationToken::new()).unwrap();
/// assert_eq!(output.stats.reused, 1);
/// ```
#[derive(Debug, Default)]
pub struct Generator {
    config: GeneratorConfig,
    cache: HashMap<DeclarationKey, CacheEntry>,
}

impl Generator {
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            cache: HashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Replace the configuration. Cached outcomes depend on it, so a different
    /// configuration clears the cache.
    pub fn set_config(&mut self, config: GeneratorConfig) {
        if config != self.config {
            tracing::debug!("configuration changed, clearing derivation cache");
            self.cache.clear();
            self.config = config;
        }
    }

    /// Number of cached declarations.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Derive every marked declaration in `files`, reusing cached outcomes.
    ///
    /// Failures stay local: a syntax error or a contradictory union is reported in its
    /// file's diagnostics while every other declaration is still generated.
    ///
    /// # Errors
    ///
    /// Returns [`SumgenError::Cancelled`] if `cancel` fires. Declarations finished before
    /// that point stay cached.
    pub fn run(
        &mut self,
        files: &[SourceFile],
        cancel: &CancellationToken,
    ) -> Result<RunOutput, SumgenError> {
        let parsed: Vec<_> = files.iter().map(parse_unit).collect();

        let mut outputs: Vec<FileOutput> = files
            .iter()
            .zip(&parsed)
            .map(|(file, parsed)| FileOutput {
                name: file.name.clone(),
                sources: Vec::new(),
                diagnostics: parsed
                    .errors
                    .iter()
                    .map(|e| Diagnostic::new(DiagnosticCode::Syntax, e.message.clone(), e.span))
                    .collect(),
            })
            .collect();

        // Collect marked declarations, reporting duplicates. The first one wins.
        let mut jobs = Vec::new();
        for (index, (file, parsed)) in files.iter().zip(&parsed).enumerate() {
            let mut seen = HashSet::new();
            for item in parsed.unit.marked() {
                let key = DeclarationKey {
                    file: file.name.clone(),
                    namespace: item.namespace.clone(),
                    name: item.decl.name.clone(),
                };
                if !seen.insert(key.clone()) {
                    outputs[index].diagnostics.push(duplicate_union(item));
                    continue;
                }
                jobs.push(Job {
                    file: index,
                    key,
                    syntax: file.slice(item.decl.span),
                    origin: item.decl.span.start,
                    item,
                });
            }
        }

        // Split into cache hits and misses.
        let mut stats = RunStats::default();
        let mut outcomes: Vec<Option<Outcome>> = Vec::with_capacity(jobs.len());
        let mut misses = Vec::new();
        for (index, job) in jobs.iter().enumerate() {
            match self.cache.get(&job.key) {
                Some(entry) if entry.syntax == job.syntax => {
                    tracing::debug!(
                        file = %job.key.file,
                        union = %job.key.name,
                        "reusing cached derivation"
                    );
                    stats.reused += 1;
                    outcomes.push(Some(rebase(&entry.outcome, entry.origin, job.origin)));
                }
                _ => {
                    outcomes.push(None);
                    misses.push(index);
                }
            }
        }

        let derived = self.derive_all(&jobs, &misses, cancel);

        let mut cancelled = false;
        for (&index, result) in misses.iter().zip(derived) {
            match result {
                Ok(outcome) => {
                    stats.derived += 1;
                    outcomes[index] = Some(outcome);
                }
                Err(Cancelled) => cancelled = true,
            }
        }

        if cancelled {
            // Keep what finished; never cache a partial result.
            for (job, outcome) in jobs.iter().zip(&outcomes) {
                if let Some(outcome) = outcome {
                    self.remember(job, outcome.clone());
                }
            }
            tracing::debug!(derived = stats.derived, "run cancelled");
            return Err(SumgenError::Cancelled);
        }

        // Rebuild the cache from this run, which evicts vanished declarations.
        let previous = std::mem::take(&mut self.cache);
        let evicted = previous
            .keys()
            .filter(|key| !jobs.iter().any(|job| &job.key == *key))
            .count();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted vanished declarations");
        }

        let mut scopes: Vec<ItemScope> = outputs.iter().map(|_| ItemScope::default()).collect();
        for (job, outcome) in jobs.iter().zip(outcomes) {
            let Some(outcome) = outcome else { continue };
            if outcome.declined {
                stats.declined += 1;
            }
            let output = &mut outputs[job.file];
            output.diagnostics.extend(outcome.diagnostics.iter().cloned());
            if let Some(source) = &outcome.source {
                match scopes[job.file].claim(source) {
                    Ok(()) => output.sources.push(source.clone()),
                    Err((name, owner)) => {
                        tracing::debug!(union = %job.key.name, item = %name, "item name clash");
                        output.diagnostics.push(item_clash(job.item, &name, &owner));
                    }
                }
            }
            self.remember(job, outcome);
        }

        for output in &mut outputs {
            output.diagnostics.sort_by_key(|d| (d.span.start, d.span.end));
        }

        tracing::info!(
            files = files.len(),
            derived = stats.derived,
            reused = stats.reused,
            declined = stats.declined,
            "generation finished"
        );

        Ok(RunOutput {
            files: outputs,
            stats,
        })
    }

    fn remember(&mut self, job: &Job<'_>, outcome: Outcome) {
        self.cache.insert(
            job.key.clone(),
            CacheEntry {
                syntax: job.syntax.to_string(),
                origin: job.origin,
                outcome,
            },
        );
    }

    fn derive_all(
        &self,
        jobs: &[Job<'_>],
        misses: &[usize],
        cancel: &CancellationToken,
    ) -> Vec<Result<Outcome, Cancelled>> {
        let config = &self.config;
        let work = |&index: &usize| {
            let job = &jobs[index];
            let outcome = derive_outcome(job.item, config, cancel);
            if outcome.is_ok() {
                tracing::debug!(
                    file = %job.key.file,
                    union = %job.key.name,
                    "derived"
                );
            }
            outcome
        };

        #[cfg(feature = "parallel")]
        {
            misses.par_iter().map(work).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            misses.iter().map(work).collect()
        }
    }
}

fn derive_outcome(
    item: &Item,
    config: &GeneratorConfig,
    cancel: &CancellationToken,
) -> Result<Outcome, Cancelled> {
    match derive(&item.decl, &item.namespace, config, cancel)? {
        Derivation::Declined(reason) => {
            tracing::trace!(union = %item.decl.name, %reason, "declined");
            let diagnostics = if config.strict {
                reason
                    .strict_code()
                    .map(|code| {
                        Diagnostic::new(
                            code,
                            format!("`{}` is not derived: {reason}", item.decl.name),
                            item.decl.name_span,
                        )
                    })
                    .into_iter()
                    .collect()
            } else {
                Vec::new()
            };
            Ok(Outcome {
                source: None,
                diagnostics,
                declined: true,
            })
        }
        Derivation::Derived {
            source,
            diagnostics,
        } => Ok(Outcome {
            source,
            diagnostics,
            declined: false,
        }),
    }
}

/// A cached outcome moved from `from` to `to`.
fn rebase(outcome: &Outcome, from: usize, to: usize) -> Outcome {
    if from == to {
        return outcome.clone();
    }
    let delta = to as isize - from as isize;
    Outcome {
        diagnostics: outcome.diagnostics.iter().map(|d| d.shifted(delta)).collect(),
        ..outcome.clone()
    }
}

/// What already owns a name in a file's module tree.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Claim {
    /// The `mod` of a nested namespace, shared by every union inside it.
    Module,
    /// The enum or a payload struct of this union.
    Union(String),
}

/// Names taken at each namespace level of one generated file.
#[derive(Debug, Default)]
struct ItemScope {
    claims: HashMap<(Namespace, String), Claim>,
}

impl ItemScope {
    /// Take every name `source` defines, or report the first one already taken.
    ///
    /// Rust puts modules and types in one namespace, so the `mod` wrappers count too.
    fn claim(&mut self, source: &GeneratedSource) -> Result<(), (String, Claim)> {
        let segments = source.namespace.segments();
        let modules = segments.iter().enumerate().map(|(depth, segment)| {
            (
                Namespace(segments[..depth].to_vec()),
                segment.clone(),
                Claim::Module,
            )
        });
        let items = source.items.iter().map(|name| {
            (
                source.namespace.clone(),
                name.clone(),
                Claim::Union(source.union_name.clone()),
            )
        });
        let wanted: Vec<_> = modules.chain(items).collect();

        for (namespace, name, claim) in &wanted {
            match self.claims.get(&(namespace.clone(), name.clone())) {
                Some(Claim::Module) if *claim == Claim::Module => {}
                Some(owner) => return Err((name.clone(), owner.clone())),
                None => {}
            }
        }
        for (namespace, name, claim) in wanted {
            self.claims.entry((namespace, name)).or_insert(claim);
        }
        Ok(())
    }
}

fn item_clash(item: &Item, name: &str, owner: &Claim) -> Diagnostic {
    let owner = match owner {
        Claim::Module => format!("the module of namespace `{name}`"),
        Claim::Union(union) if union == name => format!("union `{union}`"),
        Claim::Union(union) => format!("a variant of union `{union}`"),
    };
    Diagnostic::new(
        DiagnosticCode::ItemNameClash,
        format!(
            "union `{}` is not generated: `{name}` is already defined by {owner} in this namespace",
            item.decl.name
        ),
        item.decl.name_span,
    )
    .with_help(
        "payload structs are named after their variants; rename the variant or move one \
         union to another namespace",
    )
}

fn duplicate_union(item: &Item) -> Diagnostic {
    Diagnostic::new(
        DiagnosticCode::DuplicateUnion,
        format!(
            "union `{}` is declared more than once in this file",
            if item.namespace.is_global() {
                item.decl.name.clone()
            } else {
                format!("{}::{}", item.namespace, item.decl.name)
            }
        ),
        item.decl.name_span,
    )
    .with_help("only the first declaration is generated; remove or rename the others")
}
