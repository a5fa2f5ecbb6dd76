//! sumgen CLI: driving adapter for the sumgen derivation engine.
//!
//! Subcommands:
//! - `gen <files...> [--out-dir <dir>]`: generate code (to stdout without `--out-dir`)
//! - `check <files...>`: report diagnostics without writing anything
//! - `describe <file>`: dump descriptors and member specs as JSON

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use sumgen::build::output_names;
use sumgen::{
    describe, CancellationToken, Generator, GeneratorConfig, RunOutput, Severity, SourceFile,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "sumgen", author, version, about)]
struct Cli {
    /// Generator configuration (YAML, or JSON for `.json` files).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Report declined `#[union]` declarations.
    #[arg(long, global = true)]
    strict: bool,

    /// More logging (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate Rust code from declaration files.
    Gen {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Write `<stem>.rs` per input into this directory instead of printing.
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Check declaration files and report diagnostics.
    Check {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Print the descriptors and members derived from a file as JSON.
    Describe {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_config(cli.config.as_deref(), cli.strict).and_then(|config| match &cli.command {
        Command::Gen { files, out_dir } => cmd_gen(config, files, out_dir.as_deref()),
        Command::Check { files } => cmd_check(config, files),
        Command::Describe { file } => cmd_describe(&config, file),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_gen(config: GeneratorConfig, paths: &[PathBuf], out_dir: Option<&Path>) -> Result<(), String> {
    let header = config.header;
    let targets = match out_dir {
        Some(dir) => Some((dir, output_names(paths).map_err(|e| e.to_string())?)),
        None => None,
    };
    let (sources, output) = run(config, paths)?;
    report(&sources, &output);

    for (index, file) in output.files.iter().enumerate() {
        let code = file.render(header);
        match &targets {
            Some((dir, names)) => {
                std::fs::create_dir_all(dir)
                    .map_err(|e| format!("cannot create {}: {e}", dir.display()))?;
                let target = dir.join(&names[index]);
                std::fs::write(&target, code)
                    .map_err(|e| format!("cannot write {}: {e}", target.display()))?;
                tracing::info!(target = %target.display(), "wrote");
            }
            None => print!("{code}"),
        }
    }

    fail_on_errors(&output)
}

fn cmd_check(config: GeneratorConfig, paths: &[PathBuf]) -> Result<(), String> {
    let (sources, output) = run(config, paths)?;
    report(&sources, &output);
    fail_on_errors(&output)?;

    let unions: usize = output.files.iter().map(|f| f.sources.len()).sum();
    println!(
        "{unions} union(s) OK ({} derived, {} declined)",
        output.stats.derived, output.stats.declined
    );
    Ok(())
}

fn cmd_describe(config: &GeneratorConfig, path: &Path) -> Result<(), String> {
    let source = read_source(path)?;
    let descriptions = describe(&source, config);
    let json = serde_json::to_string_pretty(&descriptions)
        .map_err(|e| format!("cannot serialize descriptions: {e}"))?;
    println!("{json}");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

fn load_config(path: Option<&Path>, strict: bool) -> Result<GeneratorConfig, String> {
    let mut config = match path {
        Some(path) => GeneratorConfig::load(path).map_err(|e| e.to_string())?,
        None => GeneratorConfig::default(),
    };
    config.strict |= strict;
    Ok(config)
}

fn read_source(path: &Path) -> Result<SourceFile, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(SourceFile::new(path.display().to_string(), text))
}

fn run(config: GeneratorConfig, paths: &[PathBuf]) -> Result<(Vec<SourceFile>, RunOutput), String> {
    let sources = paths
        .iter()
        .map(|p| read_source(p))
        .collect::<Result<Vec<_>, _>>()?;
    let mut generator = Generator::new(config);
    let output = generator
        .run(&sources, &CancellationToken::new())
        .map_err(|e| e.to_string())?;
    Ok((sources, output))
}

/// Print every diagnostic to stderr, errors last within each file.
fn report(sources: &[SourceFile], output: &RunOutput) {
    for (source, file) in sources.iter().zip(&output.files) {
        let mut diagnostics: Vec<_> = file.diagnostics.iter().collect();
        diagnostics.sort_by_key(|d| d.severity == Severity::Error);
        for diagnostic in diagnostics {
            eprintln!("{}", diagnostic.render(source));
        }
    }
}

fn fail_on_errors(output: &RunOutput) -> Result<(), String> {
    match output.error_count() {
        0 => Ok(()),
        count => Err(format!("{count} error(s) reported")),
    }
}
