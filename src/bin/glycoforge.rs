use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod commands;

use commands::{IoParameters, StructureFormat};
use commands::{bonds, glycans, info, prmtop, rings};

#[derive(Parser, Debug)]
#[command(
    name = "glycoforge",
    about = "Bond perception, carbohydrate classification, and topology synthesis for molecular assemblies.",
    version,
    author,
    arg_required_else_help = true
)]
struct Cli {
    /// Input file path. When omitted, stdin is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    input: Option<PathBuf>,
    /// Output file path. When omitted, stdout is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,
    /// Force the input format (pdb or mol2).
    #[arg(long = "format", value_enum, global = true)]
    input_format: Option<StructureFormat>,
    /// Force the output format (pdb or mol2).
    #[arg(long = "out-format", value_enum, global = true)]
    output_format: Option<StructureFormat>,
    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize the assembly without modifying the data stream.
    Info(info::InfoArgs),
    /// Build the bond graph and write it with explicit connectivity.
    Bonds(bonds::BondsArgs),
    /// List perceived rings.
    Rings(rings::RingsArgs),
    /// Classify monosaccharides and print oligosaccharide sequences.
    Glycans(glycans::GlycansArgs),
    /// Write an AMBER-style topology from typed atoms and a parameter table.
    Prmtop(prmtop::PrmtopArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let io_params = IoParameters {
        input: cli.input.clone(),
        output: cli.output.clone(),
        input_format: cli.input_format,
        output_format: cli.output_format,
    };

    match cli.command {
        Command::Info(args) => {
            let assembly = commands::load_input(&io_params)?;
            info::run(&assembly, &args)?;
        }
        Command::Bonds(args) => {
            commands::ensure_noninteractive_stdout("bonds", &io_params)?;
            let assembly = commands::load_input(&io_params)?;
            bonds::run(assembly, &args, &io_params)?;
        }
        Command::Rings(args) => {
            let assembly = commands::load_input(&io_params)?;
            rings::run(assembly, &args)?;
        }
        Command::Glycans(args) => {
            let assembly = commands::load_input(&io_params)?;
            glycans::run(assembly, &args)?;
        }
        Command::Prmtop(args) => {
            let assembly = commands::load_input(&io_params)?;
            prmtop::run(assembly, &args, &io_params)?;
        }
    }

    Ok(())
}
