use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};

use glyco_forge::io::{read_parameters, write_inpcrd, write_prmtop};
use glyco_forge::ops::{
    IssueCategory, Report, build_coordinate_file, build_topology_file, extract_types,
};
use glyco_forge::Assembly;

use crate::commands::{
    IoParameters, PerceptionArgs, build_topology, ensure_noninteractive_stdout, run_with_spinner,
    summarize_report, write_with,
};

/// Writes an AMBER-style topology (and optionally coordinates) for typed input atoms.
#[derive(Debug, Args)]
pub struct PrmtopArgs {
    #[command(flatten)]
    pub perception: PerceptionArgs,
    /// Force-field parameter table (TOML).
    #[arg(long, value_name = "FILE")]
    pub params: PathBuf,
    /// Also write the coordinates of the selected model to this file.
    #[arg(long, value_name = "FILE")]
    pub inpcrd: Option<PathBuf>,
    /// Title written into both files; defaults to the assembly name.
    #[arg(long)]
    pub title: Option<String>,
}

pub fn run(assembly: Assembly, args: &PrmtopArgs, io_params: &IoParameters) -> Result<()> {
    ensure_noninteractive_stdout("prmtop", io_params)?;
    let params = read_parameters(&args.params)
        .with_context(|| format!("Failed to load parameters from {}", args.params.display()))?;
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| assembly.name.clone());

    let mut report = Report::new();
    let topology = build_topology(assembly, &args.perception, &mut report)?;

    let (file, coordinates) = run_with_spinner("Extracting bonded terms", || {
        let tables = extract_types(&topology, &params, &mut report);
        let file = build_topology_file(&topology, &tables, &params, &title);
        let coordinates = args.inpcrd.as_ref().map(|_| {
            build_coordinate_file(&topology, args.perception.model, &title, &mut report)
        });
        Ok((file, coordinates))
    })?;
    summarize_report(&report);

    write_with(io_params.output.as_deref(), "prmtop", |writer| {
        write_prmtop(writer, &file)?;
        Ok(())
    })?;
    if let (Some(path), Some(coordinates)) = (&args.inpcrd, &coordinates) {
        write_with(Some(path), "inpcrd", |writer| {
            write_inpcrd(writer, coordinates)?;
            Ok(())
        })?;
    }

    let unresolved: Vec<_> = report.of_category(IssueCategory::UnresolvedType).collect();
    if !unresolved.is_empty() {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(row!["Unresolved Type"]);
        for issue in unresolved {
            table.add_row(row![issue]);
        }
        table
            .print(&mut io::stderr().lock())
            .context("Failed to render unresolved types")?;
    }

    let placeholders = file.bond_types.iter().filter(|t| !t.resolved).count()
        + file.angle_types.iter().filter(|t| !t.resolved).count()
        + file.dihedral_types.iter().filter(|t| !t.resolved).count();
    eprintln!(
        "{} atoms, {} bonds, {} angles, {} dihedrals; {} placeholder type(s)",
        file.counts.atoms,
        file.counts.bonds(),
        file.counts.angles(),
        file.counts.dihedrals(),
        placeholders
    );
    Ok(())
}
