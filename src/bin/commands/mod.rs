use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{self as stdio, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;

use glyco_forge::io::{
    IoContext, read_mol2_assembly, read_pdb_assembly, write_mol2_topology, write_pdb_topology,
};
use glyco_forge::ops::{BondingStrategy, IssueCategory, PerceptionConfig, Report, TopologyBuilder};
use glyco_forge::{Assembly, Topology};

pub mod bonds;
pub mod glycans;
pub mod info;
pub mod prmtop;
pub mod rings;

/// Formats supported by the CLI when reading or writing structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StructureFormat {
    /// PDB with optional CONECT records.
    #[value(name = "pdb")]
    Pdb,
    /// Tripos MOL2.
    #[value(name = "mol2")]
    Mol2,
}

impl StructureFormat {
    /// Attempts to infer a format from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdb" | "ent" => Some(Self::Pdb),
            "mol2" => Some(Self::Mol2),
            _ => None,
        }
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureFormat::Pdb => write!(f, "PDB"),
            StructureFormat::Mol2 => write!(f, "MOL2"),
        }
    }
}

/// Aggregated IO parameters shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct IoParameters {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub input_format: Option<StructureFormat>,
    pub output_format: Option<StructureFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Use bonds declared by the input file, falling back to distance.
    Declared,
    /// Bond every pair within the cutoff.
    Distance,
}

impl From<StrategyArg> for BondingStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Declared => BondingStrategy::Declared,
            StrategyArg::Distance => BondingStrategy::Distance,
        }
    }
}

/// Bond-graph and ring perception options shared by the analysis commands.
#[derive(Debug, Clone, Args)]
pub struct PerceptionArgs {
    /// Source of connectivity.
    #[arg(long, value_enum, default_value = "declared")]
    pub strategy: StrategyArg,
    /// Maximum bonding distance in ångströms.
    #[arg(long, default_value_t = 1.65)]
    pub cutoff: f64,
    /// Coordinate model (0-based) used for distances and orientations.
    #[arg(long, default_value_t = 0)]
    pub model: usize,
    /// Ring sizes kept after perception.
    #[arg(long = "ring-size", value_delimiter = ',', default_values_t = [5, 6])]
    pub ring_sizes: Vec<usize>,
}

impl PerceptionArgs {
    pub fn config(&self) -> PerceptionConfig {
        PerceptionConfig {
            strategy: self.strategy.into(),
            cutoff: self.cutoff,
            model_index: self.model,
            ring_sizes: self.ring_sizes.iter().copied().collect::<BTreeSet<_>>(),
            ..PerceptionConfig::default()
        }
    }
}

/// Loads an assembly from the configured input source.
pub fn load_input(params: &IoParameters) -> Result<Assembly> {
    let format = resolve_input_format(params)?;
    let io_context = IoContext::new_default();

    if let Some(path) = &params.input {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        read_assembly(BufReader::new(file), format, &io_context)
            .with_context(|| format!("Failed to parse {} input from {}", format, path.display()))
    } else {
        let stdin = stdio::stdin();
        if stdin.is_terminal() {
            bail!(
                "No --input provided and stdin is a TTY. Provide -i/--input or pipe a structure into glycoforge."
            );
        }
        read_assembly(BufReader::new(stdin.lock()), format, &io_context)
            .with_context(|| format!("Failed to parse {} input from stdin", format))
    }
}

/// Builds the bond graph under a spinner.
pub fn build_topology(
    assembly: Assembly,
    args: &PerceptionArgs,
    report: &mut Report,
) -> Result<Topology> {
    let builder = TopologyBuilder::with_config(args.config());
    run_with_spinner("Building bond graph", || {
        builder
            .build(assembly, report)
            .context("Failed to build bond graph")
    })
}

/// Saves a bond graph to the configured output destination.
pub fn save_topology(topology: &Topology, params: &IoParameters) -> Result<()> {
    let format = resolve_output_format(params)?;
    write_with(params.output.as_deref(), &format.to_string(), |writer| {
        match format {
            StructureFormat::Pdb => write_pdb_topology(writer, topology)?,
            StructureFormat::Mol2 => write_mol2_topology(writer, topology)?,
        }
        Ok(())
    })
}

/// Opens `output` (or stdout) and hands a buffered writer to `render`.
pub fn write_with<F>(output: Option<&Path>, what: &str, render: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            render(&mut writer)
                .with_context(|| format!("Failed to write {} output to {}", what, path.display()))?;
            writer.flush().context("Failed to flush output writer")?;
        }
        None => {
            let stdout = stdio::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            render(&mut writer).with_context(|| format!("Failed to write {} output to stdout", what))?;
            writer.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

fn resolve_input_format(params: &IoParameters) -> Result<StructureFormat> {
    if let Some(explicit) = params.input_format {
        Ok(explicit)
    } else if let Some(path) = &params.input {
        StructureFormat::from_path(path).ok_or_else(|| {
            anyhow!(
                "Unable to infer input format from '{}'. Please specify --format.",
                path.display()
            )
        })
    } else {
        Ok(StructureFormat::Pdb)
    }
}

fn resolve_output_format(params: &IoParameters) -> Result<StructureFormat> {
    if let Some(explicit) = params.output_format {
        return Ok(explicit);
    }

    if let Some(path) = &params.output {
        StructureFormat::from_path(path).ok_or_else(|| {
            anyhow!(
                "Unable to infer output format from '{}'. Please specify --out-format.",
                path.display()
            )
        })
    } else {
        Ok(StructureFormat::Pdb)
    }
}

fn read_assembly<R: BufRead>(
    reader: R,
    format: StructureFormat,
    ctx: &IoContext,
) -> Result<Assembly> {
    let assembly = match format {
        StructureFormat::Pdb => read_pdb_assembly(reader, ctx)?,
        StructureFormat::Mol2 => read_mol2_assembly(reader, ctx)?,
    };
    Ok(assembly)
}

/// Wraps long-running operations with a spinner rendered to stderr.
pub fn run_with_spinner<T, F>(message: &str, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    let result = work();

    match &result {
        Ok(_) => spinner.finish_with_message(format!("{} ✓", message)),
        Err(_) => spinner.abandon_with_message(format!("{} ✗", message)),
    }

    result
}

/// Prints a one-line tally of the report to stderr.
pub fn summarize_report(report: &Report) {
    if report.is_empty() {
        return;
    }
    let tally = [
        (IssueCategory::StructuralInput, "structural"),
        (IssueCategory::UnresolvedType, "unresolved"),
        (IssueCategory::Ambiguous, "ambiguous"),
        (IssueCategory::MalformedTopology, "malformed"),
    ]
    .iter()
    .filter_map(|&(category, label)| match report.count(category) {
        0 => None,
        n => Some(format!("{n} {label}")),
    })
    .collect::<Vec<_>>()
    .join(", ");
    eprintln!("{} issue(s): {}", report.len(), tally);
}

/// Draws a rounded box around a section title.
pub fn print_boxed_label<W: Write>(writer: &mut W, title: &str) -> stdio::Result<()> {
    let inner = format!(" {title} ");
    let width = inner.chars().count();
    writeln!(writer, "╭{}╮", "─".repeat(width))?;
    writeln!(writer, "│{}│", inner)?;
    writeln!(writer, "╰{}╯", "─".repeat(width))?;
    Ok(())
}

/// Returns true when stdout is a TTY and no explicit output file was supplied.
pub fn interactive_stdout_requested(params: &IoParameters) -> bool {
    params.output.is_none() && stdio::stdout().is_terminal()
}

/// Ensures commands do not dump structured output directly into an interactive terminal.
pub fn ensure_noninteractive_stdout(command: &str, params: &IoParameters) -> Result<()> {
    if interactive_stdout_requested(params) {
        bail!(
            "Refusing to stream {command} results to an interactive terminal. Use -o/--output or pipe the command into a file."
        );
    }
    Ok(())
}
