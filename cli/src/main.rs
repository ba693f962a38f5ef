use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use commands::{
    combine::{run_combine, CombineArgs},
    split::{run_split, SplitArgs},
};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use yansi::{Condition, Paint};

mod commands;

#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    /// Log more details to stderr (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Split(SplitArgs),
    Combine(CombineArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Split(args) => run_split(args),
        Commands::Combine(args) => run_combine(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let prefix = "Error:".red().bold().whenever(Condition::from(|| {
                Condition::stderr_is_tty() && Condition::clicolor() && Condition::no_color()
            }));
            eprintln!("{prefix} {err:#}");
            ExitCode::FAILURE
        }
    }
}
