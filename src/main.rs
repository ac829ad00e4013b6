//! motif: compile music programs to ABC notation.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use motif::config::{Config, OutputFormat};
use motif::dsl::{CompileError, Compiler};

#[derive(Debug, Parser)]
#[command(name = "motif", version, about = "Compile music programs to ABC notation")]
struct Cli {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a program and render what `main` returns
    Compile {
        /// Source file
        file: PathBuf,
        /// Output format (defaults to the config file, then abc)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
        /// Seed for rand()
        #[arg(short, long)]
        seed: Option<u64>,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse and type-check without running
    Check {
        /// Source file
        file: PathBuf,
    },
    /// Print the token stream
    Tokens {
        /// Source file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = stderrlog::new()
        .verbosity(usize::from(cli.verbose))
        .quiet(cli.quiet)
        .init()
    {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Compile {
            file,
            format,
            seed,
            output,
        } => {
            let source = read_source(&file)?;
            let mut config = Config::load().unwrap_or_default();
            if let Some(format) = format {
                config.format = format;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            log::debug!("compiling {} with {config:?}", file.display());

            let rendered = Compiler::compile(&source, &config).map_err(|e| report(&file, &e))?;
            match output {
                Some(path) => fs::write(&path, rendered)
                    .map_err(|e| format!("cannot write {}: {e}", path.display())),
                None => {
                    print!("{rendered}");
                    Ok(())
                }
            }
        }
        Command::Check { file } => {
            let source = read_source(&file)?;
            let steps = Compiler::parse(&source).map_err(|e| report(&file, &e))?;
            println!("{}: ok ({} top-level declarations)", file.display(), steps.len());
            Ok(())
        }
        Command::Tokens { file } => {
            let source = read_source(&file)?;
            for token in Compiler::tokenize(&source) {
                println!("{token}");
            }
            Ok(())
        }
    }
}

fn read_source(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}

fn report(file: &Path, error: &CompileError) -> String {
    format!("{}:{error}", file.display())
}
