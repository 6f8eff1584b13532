//! Core data structures of the assembly graph engine.
//!
//! Atoms, residues and the assembly tree own the molecular data; [`topology::Topology`]
//! overlays the bond graph on an assembly. Rings, glycan annotations, bonded-term tables,
//! parameter tables and output file images are derived from that graph by `ops` and
//! consumed by `io`.

pub mod assembly;
pub mod atom;
pub mod files;
pub mod glycan;
pub mod grid;
pub mod parameters;
pub mod residue;
pub mod ring;
pub mod selection;
pub mod terms;
pub mod topology;
pub mod types;
