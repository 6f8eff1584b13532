//! Operations over an assembly: bond-graph construction, ring perception, carbohydrate
//! classification, bonded-term type extraction, and output file synthesis.
//!
//! Every stage is a plain function (or the [`TopologyBuilder`]) that takes the previous
//! stage's result by reference and appends non-fatal findings to a shared [`Report`]. Only
//! conditions that leave nothing to work with surface as [`Error`].

mod config;
mod error;
mod glycan;
mod report;
mod rings;
mod synthesis;
mod topology;
mod typing;

#[cfg(test)]
mod testing;

pub use config::{BondingStrategy, DEFAULT_MAX_ATOMS, MAX_CUTOFF, PerceptionConfig};

pub use error::Error;

pub use report::{HetResidue, Issue, IssueCategory, Report, het_residues};

pub use topology::{TopologyBuilder, brute_force_bonds};

pub use rings::{
    dfs_cycles, ensure_current, is_all_carbon, path_graph_cycles, perceive_rings, remove_fused,
};

pub use glycan::{
    DatabaseError, GlycanAnalysis, GlycanRules, MonosaccharideDb, MonosaccharideEntry,
    analyze_glycans,
};

pub use typing::{count_terms, excluded_atoms, extract_types};

pub use synthesis::{
    build_coordinate_file, build_library_file, build_prep_file, build_topology_file,
    topology_from_files, topology_from_library,
};
