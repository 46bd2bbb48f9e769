mod vm;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use miette::NamedSource;
use pasc_syntax::{CompileFailure, Program};
use tracing::Level;

use crate::vm::VmConfig;

#[derive(Parser, Debug)]
#[command(name = "pasc", version, about = "Compile and run a Pascal-subset program")]
struct Cli {
    /// Source file to compile.
    file: PathBuf,

    /// What to print once the program compiles.
    #[arg(long, value_enum, default_value_t = Emit::None)]
    emit: Emit,

    /// Compile only, don't run the program.
    #[arg(long)]
    no_run: bool,

    /// Abort the program after this many instructions.
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Log more: -v for debug, -vv for trace.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    None,
    /// Human readable instruction listing.
    Listing,
    /// The program as JSON.
    Json,
}

#[derive(Debug)]
struct RunOptions {
    emit: Emit,
    run: bool,
    vm: VmConfig,
}

impl From<&Cli> for RunOptions {
    fn from(cli: &Cli) -> Self {
        RunOptions {
            emit: cli.emit,
            run: !cli.no_run,
            vm: VmConfig {
                max_steps: cli.max_steps,
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

/// `Ok(false)` when the source does not compile.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let source = fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let options = RunOptions::from(cli);
    tracing::debug!(?options, file = %cli.file.display(), "compiling");

    let program = match pasc_syntax::compile(&source) {
        Ok(program) => program,
        Err(failure) => {
            report(&cli.file, &source, failure);
            return Ok(false);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    emit(&program, options.emit, &mut out)?;
    if options.run {
        vm::run(&program, &mut out, &options.vm).context("program aborted")?;
    }
    Ok(true)
}

fn emit(program: &Program, emit: Emit, mut out: impl Write) -> anyhow::Result<()> {
    match emit {
        Emit::None => {}
        Emit::Listing => write!(out, "{program}")?,
        Emit::Json => {
            serde_json::to_writer_pretty(&mut out, program)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Renders every diagnostic against the source, lexical ones first.
fn report(path: &Path, source: &str, failure: CompileFailure) {
    let name = path.display().to_string();
    for diagnostic in failure.all() {
        let report = miette::Report::new(diagnostic.error)
            .with_source_code(NamedSource::new(&name, source.to_owned()));
        eprintln!("{report:?}");
    }
    eprintln!("error: {failure}");
}
