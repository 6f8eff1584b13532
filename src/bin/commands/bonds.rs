use anyhow::Result;
use clap::Args;

use glyco_forge::Assembly;
use glyco_forge::ops::Report;

use crate::commands::{IoParameters, PerceptionArgs, build_topology, save_topology, summarize_report};

/// Builds the bond graph and writes it with explicit connectivity.
#[derive(Debug, Args)]
pub struct BondsArgs {
    #[command(flatten)]
    pub perception: PerceptionArgs,
}

pub fn run(assembly: Assembly, args: &BondsArgs, io_params: &IoParameters) -> Result<()> {
    let mut report = Report::new();
    let topology = build_topology(assembly, &args.perception, &mut report)?;
    summarize_report(&report);
    eprintln!(
        "{} bonds among {} atoms",
        topology.bond_count(),
        topology.atom_count()
    );
    save_topology(&topology, io_params)
}
