use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use nalgebra::Vector3;
use prettytable::{Table, format, row};

use glyco_forge::ops::het_residues;
use glyco_forge::{Assembly, ResidueKind, Selection};

use crate::commands::{print_boxed_label, run_with_spinner};

/// Report-only command that summarizes an assembly.
#[derive(Debug, Default, Args)]
pub struct InfoArgs {
    /// List hetero residues and ions.
    #[arg(long)]
    pub het: bool,
    /// List atoms matching a selection pattern, e.g. `NAG,MAN@^C` or `1.2:#401-405@O5`.
    #[arg(long, value_name = "PATTERN")]
    pub select: Option<String>,
}

pub fn run(assembly: &Assembly, args: &InfoArgs) -> Result<()> {
    let selection = args
        .select
        .as_deref()
        .map(str::parse::<Selection>)
        .transpose()
        .context("Invalid selection pattern")?;

    let (chains, kinds, box_metrics) = run_with_spinner("Analyzing assembly", || {
        Ok((
            collect_chain_reports(assembly),
            count_kinds(assembly),
            calculate_box_metrics(assembly),
        ))
    })?;

    print_tables(assembly, &chains, &kinds, box_metrics.as_ref())?;
    if args.het {
        print_het_residues(assembly)?;
    }
    if let Some(selection) = &selection {
        print_selection(assembly, selection)?;
    }
    Ok(())
}

fn print_het_residues(assembly: &Assembly) -> Result<()> {
    let mut stderr = io::stderr().lock();
    writeln!(&mut stderr)?;
    print_boxed_label(&mut stderr, "Hetero Residues")?;
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["Residue", "Chain", "Kind", "Atoms", "Heavy Atoms"]);
    for het in het_residues(assembly) {
        let id = match het.insertion_code {
            Some(code) => format!("{} {}{}", het.name, het.id, code),
            None => format!("{} {}", het.name, het.id),
        };
        table.add_row(row![id, het.chain_id, het.kind, het.atoms, het.heavy_atoms]);
    }
    table
        .print(&mut stderr)
        .context("Failed to render hetero residues")?;
    Ok(())
}

fn print_selection(assembly: &Assembly, selection: &Selection) -> Result<()> {
    let selected = assembly.select(selection);
    let mut stderr = io::stderr().lock();
    writeln!(&mut stderr)?;
    print_boxed_label(&mut stderr, "Selection")?;
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["Index", "Serial", "Atom", "Residue", "Chain"]);
    let mut wanted = selected.iter().peekable();
    for (index, (residue, atom)) in assembly.iter_atoms_with_context().enumerate() {
        if wanted.peek() != Some(&&index) {
            continue;
        }
        wanted.next();
        table.add_row(row![
            index,
            atom.serial,
            atom.name,
            format!("{} {}", residue.name, residue.id),
            residue.chain_id
        ]);
    }
    table
        .print(&mut stderr)
        .context("Failed to render selection")?;
    writeln!(&mut stderr, "{} atom(s) selected", selected.len())?;
    Ok(())
}

#[derive(Debug, Default)]
struct ChainReport {
    residues: usize,
    atoms: usize,
    heavy_atoms: usize,
}

fn collect_chain_reports(assembly: &Assembly) -> BTreeMap<String, ChainReport> {
    let mut reports: BTreeMap<String, ChainReport> = BTreeMap::new();
    for residue in assembly.iter_residues() {
        let label = if residue.chain_id.is_empty() {
            "-".to_string()
        } else {
            residue.chain_id.clone()
        };
        let report = reports.entry(label).or_default();
        report.residues += 1;
        report.atoms += residue.atoms().len();
        report.heavy_atoms += residue.heavy_atom_count();
    }
    reports
}

fn count_kinds(assembly: &Assembly) -> Vec<(ResidueKind, usize)> {
    [
        ResidueKind::AminoAcid,
        ResidueKind::Nucleotide,
        ResidueKind::Hetero,
        ResidueKind::Water,
        ResidueKind::Ion,
    ]
    .into_iter()
    .map(|kind| {
        let count = assembly.iter_residues().filter(|r| r.kind == kind).count();
        (kind, count)
    })
    .filter(|&(_, count)| count > 0)
    .collect()
}

fn print_tables(
    assembly: &Assembly,
    chains: &BTreeMap<String, ChainReport>,
    kinds: &[(ResidueKind, usize)],
    box_metrics: Option<&BoxMetrics>,
) -> Result<()> {
    let mut stderr = io::stderr().lock();

    print_boxed_label(&mut stderr, "GlycoForge Assembly Report")?;
    writeln!(&mut stderr)?;

    print_boxed_label(&mut stderr, "Chain Breakdown")?;
    let mut chain_table = Table::new();
    chain_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    chain_table.set_titles(row!["Chain", "Residues", "Atoms", "Heavy Atoms"]);
    for (id, report) in chains {
        chain_table.add_row(row![id, report.residues, report.atoms, report.heavy_atoms]);
    }
    chain_table
        .print(&mut stderr)
        .context("Failed to render chain summary")?;
    writeln!(&mut stderr)?;

    print_boxed_label(&mut stderr, "Residue Kinds")?;
    let mut kind_table = Table::new();
    kind_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    kind_table.set_titles(row!["Kind", "Residues"]);
    for (kind, count) in kinds {
        kind_table.add_row(row![kind, count]);
    }
    kind_table
        .print(&mut stderr)
        .context("Failed to render residue kinds")?;
    writeln!(&mut stderr)?;

    print_boxed_label(&mut stderr, "Assembly Summary")?;
    let mut summary_table = Table::new();
    summary_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    summary_table.set_titles(row!["Metric", "Value"]);
    let name = if assembly.name.is_empty() {
        "(unnamed)"
    } else {
        assembly.name.as_str()
    };
    summary_table.add_row(row!["Name", name]);
    summary_table.add_row(row!["Atoms", assembly.atom_count()]);
    summary_table.add_row(row!["Residues", assembly.residue_count()]);
    summary_table.add_row(row!["Models", assembly.model_count()]);
    let declared = match &assembly.declared_bonds {
        Some(bonds) => bonds.len().to_string(),
        None => "none (distance bonding)".to_string(),
    };
    summary_table.add_row(row!["Declared Bonds", declared]);
    summary_table.add_row(row!["Largest Residue", assembly.max_residue_atom_count()]);

    if let Some(metrics) = box_metrics {
        summary_table.add_row(row![
            "Box Lengths (Å)",
            format!(
                "a = {:.2}, b = {:.2}, c = {:.2}",
                metrics.lengths[0], metrics.lengths[1], metrics.lengths[2]
            )
        ]);
        summary_table.add_row(row![
            "Box Angles (°)",
            format!(
                "α = {:.2}, β = {:.2}, γ = {:.2}",
                metrics.angles[0], metrics.angles[1], metrics.angles[2]
            )
        ]);
    } else {
        summary_table.add_row(row!["Box", "Not specified"]);
    }
    summary_table
        .print(&mut stderr)
        .context("Failed to render assembly summary")?;

    Ok(())
}

#[derive(Debug)]
struct BoxMetrics {
    lengths: [f64; 3],
    angles: [f64; 3],
}

fn calculate_box_metrics(assembly: &Assembly) -> Option<BoxMetrics> {
    let vectors = assembly.box_vectors?;
    let [a, b, c] = vectors.map(Vector3::<f64>::from);
    let lengths = [a.norm(), b.norm(), c.norm()];
    if lengths.iter().any(|l| *l < f64::EPSILON) {
        return None;
    }

    Some(BoxMetrics {
        lengths,
        angles: [b.angle(&c), a.angle(&c), a.angle(&b)].map(f64::to_degrees),
    })
}
