#![forbid(unsafe_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use helix::{CompileOptions, manifest};

#[derive(Parser, Debug)]
#[command(name = "helix", version, about = "Helix to C compiler")]
struct Cli {
    /// Log every pass (same as `HELIX_LOG=debug`)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check a program and write the generated C
    Build {
        /// Input .hx file
        #[arg(default_value = "main.hx")]
        path: PathBuf,

        /// Output .c file. Overrides `helix.toml`; defaults to the input with a .c extension
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Emit `// Line N: ...` comments in the generated C
        #[arg(long)]
        line_comments: bool,
    },
    /// Run every check without generating code
    Check {
        /// Input .hx file
        #[arg(default_value = "main.hx")]
        path: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("HELIX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Cmd::Build {
            path,
            output,
            line_comments,
        } => build(&path, output, line_comments),
        Cmd::Check { path } => check(&path),
    }
}

fn read_source(path: &Path) -> miette::Result<(String, NamedSource<String>)> {
    let src = fs::read_to_string(path).into_diagnostic()?;
    let source = NamedSource::new(display_path(path), src.clone());
    Ok((src, source))
}

fn check(path: &Path) -> miette::Result<()> {
    let (src, source) = read_source(path)?;
    let started = Instant::now();
    let checked =
        helix::check_source(&src).map_err(|e| miette::Report::new(e).with_source_code(source))?;
    info!(
        functions = checked.functions.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "check finished"
    );
    println!("{}: ok", display_path(path));
    Ok(())
}

fn build(path: &Path, output: Option<PathBuf>, line_comments: bool) -> miette::Result<()> {
    let resolved = manifest::load_resolved_manifest(path)?;
    if let Some(manifest_path) = &resolved.manifest_path {
        debug!(manifest = %manifest_path.display(), "using manifest");
    }

    let (src, source) = read_source(path)?;
    let options = CompileOptions {
        file_name: display_path(path),
        line_comments: line_comments || resolved.line_comments.unwrap_or(false),
    };

    let started = Instant::now();
    let c_source = helix::compile_source(&src, &options)
        .map_err(|e| miette::Report::new(e).with_source_code(source))?;

    let out_path = output
        .or(resolved.output)
        .unwrap_or_else(|| path.with_extension("c"));
    if let Some(dir) = out_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).into_diagnostic()?;
    }
    fs::write(&out_path, c_source).into_diagnostic()?;

    info!(
        output = %out_path.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "build finished"
    );
    println!("wrote {}", display_path(&out_path));
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
