use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};

use glyco_forge::Assembly;
use glyco_forge::ops::{GlycanRules, MonosaccharideDb, Report, analyze_glycans, perceive_rings};

use crate::commands::{
    PerceptionArgs, build_topology, print_boxed_label, run_with_spinner, summarize_report,
};

/// Classifies monosaccharides and prints oligosaccharide sequences.
#[derive(Debug, Args)]
pub struct GlycansArgs {
    #[command(flatten)]
    pub perception: PerceptionArgs,
    /// Normalized triple products within this tolerance count as degenerate.
    #[arg(long, default_value_t = 0.05)]
    pub tolerance: f64,
    /// Extra monosaccharide database entries (TOML), merged over the built-in set.
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,
    /// Also classify rings inside amino-acid and nucleotide residues.
    #[arg(long)]
    pub include_polymers: bool,
}

impl GlycansArgs {
    fn rules(&self) -> Result<GlycanRules> {
        let mut database = MonosaccharideDb::builtin();
        if let Some(path) = &self.database {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read database {}", path.display()))?;
            database
                .extend_from_toml(&content)
                .with_context(|| format!("Invalid database {}", path.display()))?;
        }
        Ok(GlycanRules {
            database,
            orientation_tolerance: self.tolerance,
            model_index: self.perception.model,
            skip_polymer_residues: !self.include_polymers,
        })
    }
}

pub fn run(assembly: Assembly, args: &GlycansArgs) -> Result<()> {
    let rules = args.rules()?;
    let config = args.perception.config();
    let mut report = Report::new();
    let topology = build_topology(assembly, &args.perception, &mut report)?;

    let analysis = run_with_spinner("Classifying carbohydrates", || {
        let rings = perceive_rings(&topology, &config, &mut report);
        analyze_glycans(&topology, &rings, &rules, &mut report)
            .context("Failed to classify carbohydrates")
    })?;
    summarize_report(&report);

    let mut stdout = io::stdout().lock();
    print_boxed_label(&mut stdout, "Monosaccharides")?;
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["Residue", "Chain", "Anomeric", "Code", "Name"]);
    for mono in &analysis.monosaccharides {
        table.add_row(row![
            format!("{}{}", mono.residue_name, mono.residue_id),
            mono.chain_id,
            topology.atom(mono.anomeric_carbon).name,
            mono.code,
            mono.name
                .as_ref()
                .map_or_else(|| "unclassified".to_string(), |n| n.to_string())
        ]);
    }
    table
        .print(&mut stdout)
        .context("Failed to render monosaccharide table")?;

    writeln!(stdout)?;
    print_boxed_label(&mut stdout, "Oligosaccharides")?;
    for (oligo, sequence) in analysis.oligosaccharides.iter().zip(analysis.sequences()) {
        let marker = if oligo.truncated { " (truncated)" } else { "" };
        writeln!(stdout, "{sequence}{marker}")?;
    }
    Ok(())
}
