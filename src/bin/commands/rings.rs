use std::io;

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};

use glyco_forge::ops::{Report, perceive_rings};
use glyco_forge::{Assembly, Ring, Topology};

use crate::commands::{PerceptionArgs, build_topology, run_with_spinner, summarize_report};

/// Lists the rings that survive size, carbon-content and fused-ring filtering.
#[derive(Debug, Args)]
pub struct RingsArgs {
    #[command(flatten)]
    pub perception: PerceptionArgs,
}

pub fn run(assembly: Assembly, args: &RingsArgs) -> Result<()> {
    let mut report = Report::new();
    let topology = build_topology(assembly, &args.perception, &mut report)?;
    let config = args.perception.config();
    let rings = run_with_spinner("Perceiving rings", || {
        Ok(perceive_rings(&topology, &config, &mut report))
    })?;
    summarize_report(&report);

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["Residue", "Size", "Atoms"]);
    for ring in rings.iter() {
        table.add_row(row![owner_label(&topology, ring), ring.len(), atom_labels(&topology, ring)]);
    }
    table
        .print(&mut io::stdout().lock())
        .context("Failed to render ring table")?;
    Ok(())
}

fn owner_label(topology: &Topology, ring: &Ring) -> String {
    let mut owners: Vec<String> = ring
        .atoms()
        .iter()
        .map(|&idx| {
            let residue = topology.residue_of(idx);
            format!("{}{}", residue.name, residue.id)
        })
        .collect();
    owners.dedup();
    owners.join("/")
}

fn atom_labels(topology: &Topology, ring: &Ring) -> String {
    ring.atoms()
        .iter()
        .map(|&idx| topology.atom(idx).name.as_str())
        .collect::<Vec<_>>()
        .join("-")
}
