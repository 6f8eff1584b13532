//! # GlycoForge
//!
//! **GlycoForge** is a pure-Rust assembly graph engine for carbohydrate-aware molecular
//! modeling. It turns atoms read from structure files into a bond graph, perceives rings,
//! recognizes and names monosaccharides, links them into oligosaccharide trees, and extracts
//! the bonded-term type tables a force-field topology file needs.
//!
//! ## Features
//!
//! - **Index-based bond graph** – `Topology` owns an `Assembly` and keeps symmetric adjacency lists; bonds come from file records or a grid-pruned distance search.
//! - **Ring perception** – Path-graph collapse with a DFS cross-check, rotation/reflection-invariant deduplication, and fused-ring removal.
//! - **Glycan classification** – Anomeric-carbon detection, substituent orientation codes, a TOML monosaccharide database, derivative patterns, and linkage trees with condensed sequences.
//! - **Type extraction** – Permutation-aware parameter lookup with wildcards and deduplicated bond, angle and dihedral type tables.
//! - **Format synthesis** – AMBER prmtop/inpcrd-like images, OFF-like libraries, prep trees, and PDB/MOL2 structures with connectivity, plus the reverse translation.

mod db;
mod model;

pub mod io;
pub mod ops;

pub use model::assembly::Assembly;
pub use model::atom::Atom;
pub use model::residue::Residue;
pub use model::topology::{Bond, Topology};
pub use model::types::{BondOrder, Element, Point, ResidueKind};

pub use model::ring::{Ring, RingSet, ring_key};

pub use model::selection::{Selection, SelectionError};

pub use model::glycan::{
    Anomer, ChainCarbon, ChemicalCode, CodeParseError, Configuration, Derivative, DerivativeKind, Linkage,
    Monosaccharide, Oligosaccharide, Orientation, RingForm, RingPosition, SugarName, Terminal,
};

pub use model::terms::{
    AngleTerm, AngleType, BondTerm, BondType, DihedralTerm, DihedralType, TermKind, TypeTables,
    canonical_types, equivalent_orderings, format_types,
};

pub use model::files::{
    CoordinateFile, LibraryAtom, LibraryAtomRef, LibraryFile, LibraryResidue, PrepAtom, PrepFile,
    PrepResidue, TopologicalType, TopologyAtom, TopologyCounts, TopologyFile, TopologyResidue,
};

pub use model::parameters::{
    AngleParameter, BondParameter, DihedralParameter, ImproperParameter, MassParameter,
    ParameterError, ParameterTable, TorsionTerm,
};
