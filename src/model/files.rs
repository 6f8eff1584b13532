//! In-memory images of the synthesized output files.
//!
//! These structures hold exactly what a writer renders and what a reader hands back for
//! re-import. They carry no behavior beyond small accessors; building them from a bond graph
//! is the job of [`ops::synthesis`](crate::ops).

use super::terms::{AngleTerm, AngleType, BondTerm, BondType, DihedralTerm, DihedralType};
use super::types::{Element, Point, ResidueKind};
use smol_str::SmolStr;
use std::fmt;

/// Size block of a topology file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyCounts {
    pub atoms: usize,
    pub atom_types: usize,
    pub bonds_with_h: usize,
    pub bonds_without_h: usize,
    pub angles_with_h: usize,
    pub angles_without_h: usize,
    pub dihedrals_with_h: usize,
    pub dihedrals_without_h: usize,
    pub excluded_atoms: usize,
    pub residues: usize,
    pub bond_types: usize,
    pub angle_types: usize,
    pub dihedral_types: usize,
    pub largest_residue: usize,
}

impl TopologyCounts {
    pub fn bonds(&self) -> usize {
        self.bonds_with_h + self.bonds_without_h
    }

    pub fn angles(&self) -> usize {
        self.angles_with_h + self.angles_without_h
    }

    pub fn dihedrals(&self) -> usize {
        self.dihedrals_with_h + self.dihedrals_without_h
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyAtom {
    pub name: SmolStr,
    pub atom_type: SmolStr,
    /// Index into [`TopologyFile::atom_types`].
    pub type_index: usize,
    pub element: Element,
    pub charge: f64,
    pub mass: f64,
    pub residue: usize,
    /// Higher-indexed atoms within three bonds.
    pub excluded: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyResidue {
    pub label: String,
    pub id: i32,
    pub chain_id: String,
    pub kind: ResidueKind,
    /// Global index of the residue's first atom.
    pub first_atom: usize,
}

/// AMBER prmtop-like topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologyFile {
    pub title: String,
    pub atoms: Vec<TopologyAtom>,
    pub residues: Vec<TopologyResidue>,
    pub atom_types: Vec<SmolStr>,
    pub bond_types: Vec<BondType>,
    pub angle_types: Vec<AngleType>,
    pub dihedral_types: Vec<DihedralType>,
    pub bonds_with_h: Vec<BondTerm>,
    pub bonds_without_h: Vec<BondTerm>,
    pub angles_with_h: Vec<AngleTerm>,
    pub angles_without_h: Vec<AngleTerm>,
    pub dihedrals_with_h: Vec<DihedralTerm>,
    pub dihedrals_without_h: Vec<DihedralTerm>,
    pub counts: TopologyCounts,
}

impl TopologyFile {
    /// Every bond instance, hydrogen-containing ones first.
    pub fn bonds(&self) -> impl Iterator<Item = &BondTerm> {
        self.bonds_with_h.iter().chain(&self.bonds_without_h)
    }

    pub fn angles(&self) -> impl Iterator<Item = &AngleTerm> {
        self.angles_with_h.iter().chain(&self.angles_without_h)
    }

    pub fn dihedrals(&self) -> impl Iterator<Item = &DihedralTerm> {
        self.dihedrals_with_h.iter().chain(&self.dihedrals_without_h)
    }

    /// Atom index range `[start, end)` of a residue.
    pub fn residue_range(&self, residue: usize) -> Option<std::ops::Range<usize>> {
        let start = self.residues.get(residue)?.first_atom;
        let end = self
            .residues
            .get(residue + 1)
            .map_or(self.atoms.len(), |r| r.first_atom);
        Some(start..end)
    }
}

/// AMBER inpcrd-like coordinate file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateFile {
    pub title: String,
    pub positions: Vec<Point>,
    /// Box lengths and angles, when the assembly is periodic.
    pub box_dimensions: Option<[f64; 6]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryAtom {
    pub name: SmolStr,
    pub atom_type: SmolStr,
    pub element: Element,
    pub charge: f64,
    pub position: Point,
}

/// One residue template of an OFF-like library.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryResidue {
    pub name: String,
    pub id: i32,
    pub chain_id: String,
    pub kind: ResidueKind,
    pub atoms: Vec<LibraryAtom>,
    /// Intra-residue bonds by local atom index, lower index first.
    pub connections: Vec<(usize, usize)>,
    /// Local atom bonded to the previous residue.
    pub head: Option<usize>,
    /// Local atom bonded to the next residue.
    pub tail: Option<usize>,
}

/// Atom of a residue addressed as `(residue, local atom)`.
pub type LibraryAtomRef = (usize, usize);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryFile {
    pub residues: Vec<LibraryResidue>,
    /// Bonds crossing residue boundaries.
    pub links: Vec<(LibraryAtomRef, LibraryAtomRef)>,
}

impl LibraryFile {
    pub fn atom_count(&self) -> usize {
        self.residues.iter().map(|r| r.atoms.len()).sum()
    }

    pub fn bond_count(&self) -> usize {
        self.residues
            .iter()
            .map(|r| r.connections.len())
            .sum::<usize>()
            + self.links.len()
    }
}

/// Role of an atom in the prep-file spanning tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologicalType {
    /// On the path from the head atom to the tail atom.
    Main,
    Single,
    Branch,
    Triple,
    End,
}

impl TopologicalType {
    /// Classification of a non-main-chain atom by its number of tree children.
    pub fn from_children(children: usize) -> Self {
        match children {
            0 => TopologicalType::End,
            1 => TopologicalType::Single,
            2 => TopologicalType::Branch,
            _ => TopologicalType::Triple,
        }
    }

    pub fn code(&self) -> char {
        match self {
            TopologicalType::Main => 'M',
            TopologicalType::Single => 'S',
            TopologicalType::Branch => 'B',
            TopologicalType::Triple => '3',
            TopologicalType::End => 'E',
        }
    }
}

impl fmt::Display for TopologicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepAtom {
    pub name: SmolStr,
    pub atom_type: SmolStr,
    pub topological_type: TopologicalType,
    /// Local index of the tree parent; `None` for the root.
    pub parent: Option<usize>,
    /// Internal coordinates against parent, grandparent and great-grandparent; zero where the
    /// reference atom does not exist.
    pub bond_length: f64,
    pub bond_angle: f64,
    pub dihedral: f64,
    pub charge: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepResidue {
    pub name: String,
    /// Atoms in tree (depth-first) order.
    pub atoms: Vec<PrepAtom>,
    /// Ring-closing bonds by local index into `atoms`.
    pub loops: Vec<(usize, usize)>,
    /// Impropers centered in this residue, as atom names with the center third.
    pub impropers: Vec<[SmolStr; 4]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepFile {
    pub residues: Vec<PrepResidue>,
}
