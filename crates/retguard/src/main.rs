use std::process;

use clap::{Parser, ValueEnum};
use retguard_core::spawn::Mode;
use retguard_core::supervisor;
use retguard_utils::{info, init_logging};

/// A shadow call stack supervisor enforcing control-flow integrity on traced programs.
#[derive(Parser, Debug)]
#[command(name = "retguard")]
#[command(version)]
#[command(about = "Validates every return the traced program executes against a shadow call stack", long_about = None)]
struct Cli
{
    /// Where return validation runs
    #[arg(value_enum)]
    mode: ModeArg,
    /// The instrumentation driver executable (e.g. drrun)
    driver: String,
    /// The program to trace
    target: String,
    /// Arguments passed to the traced program verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    target_args: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg
{
    /// Validate inside the traced process itself
    Internal,
    /// Validate in this supervisor over a rendezvous socket
    External,
}

impl From<ModeArg> for Mode
{
    fn from(mode: ModeArg) -> Self
    {
        match mode {
            ModeArg::Internal => Mode::Internal,
            ModeArg::External => Mode::External,
        }
    }
}

fn main()
{
    // Initialize logging (reads from RUST_LOG env var)
    // Defaults to INFO level and Pretty format if not set
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let cli = Cli::parse();
    info!(
        "Supervising {} in {:?} mode via {}",
        cli.target, cli.mode, cli.driver
    );

    if let Err(e) = supervisor::run(cli.mode.into(), &cli.driver, &cli.target, &cli.target_args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
