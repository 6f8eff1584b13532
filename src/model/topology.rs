//! Bond-graph overlay for an [`Assembly`].
//!
//! Atoms are addressed by global index (see [`Assembly::iter_atoms`]). The overlay keeps a
//! canonical bond list and a symmetric adjacency list in lockstep, so `b ∈ neighbors(a)`
//! holds exactly when `a ∈ neighbors(b)`. Every successful mutation bumps a revision counter
//! that derived results (rings, classifications) use to detect staleness.

use super::assembly::Assembly;
use super::atom::Atom;
use super::residue::Residue;
use super::selection::Selection;
use super::types::{BondOrder, Element};
use std::fmt;

/// Undirected bond connecting two atoms by global index.
///
/// Endpoints are stored in ascending order so equality and hashing ignore creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bond {
    /// Index of the first atom (always the lesser index).
    pub a1_idx: usize,
    /// Index of the second atom.
    pub a2_idx: usize,
    /// Bond multiplicity, when the source supplied one.
    pub order: BondOrder,
}

impl Bond {
    /// Creates a bond with canonical endpoint ordering.
    pub fn new(idx1: usize, idx2: usize, order: BondOrder) -> Self {
        let (a1_idx, a2_idx) = if idx1 <= idx2 { (idx1, idx2) } else { (idx2, idx1) };
        Self {
            a1_idx,
            a2_idx,
            order,
        }
    }

    /// Returns the endpoint opposite to `idx`, if `idx` is part of this bond.
    pub fn partner(&self, idx: usize) -> Option<usize> {
        if self.a1_idx == idx {
            Some(self.a2_idx)
        } else if self.a2_idx == idx {
            Some(self.a1_idx)
        } else {
            None
        }
    }
}

/// Assembly plus its bond graph.
#[derive(Debug, Clone)]
pub struct Topology {
    assembly: Assembly,
    locator: Vec<(usize, usize)>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<usize>>,
    revision: u64,
}

impl Topology {
    /// Wraps an assembly with an empty bond graph.
    pub fn new(assembly: Assembly) -> Self {
        let locator: Vec<(usize, usize)> = assembly
            .iter_residues()
            .enumerate()
            .flat_map(|(res_idx, residue)| (0..residue.atom_count()).map(move |i| (res_idx, i)))
            .collect();
        let adjacency = vec![Vec::new(); locator.len()];

        Self {
            assembly,
            locator,
            bonds: Vec::new(),
            adjacency,
            revision: 0,
        }
    }

    /// Wraps an assembly and inserts the given bonds, dropping duplicates and self-bonds.
    pub fn with_bonds(assembly: Assembly, bonds: impl IntoIterator<Item = Bond>) -> Self {
        let mut topology = Self::new(assembly);
        for bond in bonds {
            topology.add_bond(bond.a1_idx, bond.a2_idx, bond.order);
        }
        topology
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    /// Releases the assembly, discarding the bond graph.
    pub fn into_assembly(self) -> Assembly {
        self.assembly
    }

    pub fn atom_count(&self) -> usize {
        self.locator.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Bonds in ascending `(a1_idx, a2_idx)` order.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Sorted neighbor indices of an atom.
    pub fn neighbors(&self, atom_idx: usize) -> &[usize] {
        &self.adjacency[atom_idx]
    }

    pub fn degree(&self, atom_idx: usize) -> usize {
        self.adjacency[atom_idx].len()
    }

    pub fn has_bond(&self, idx1: usize, idx2: usize) -> bool {
        self.adjacency
            .get(idx1)
            .is_some_and(|n| n.binary_search(&idx2).is_ok())
    }

    /// Monotonic counter bumped by every bond mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Inserts a bond. Returns `false` when it already exists or is a self-bond.
    pub fn add_bond(&mut self, idx1: usize, idx2: usize, order: BondOrder) -> bool {
        if idx1 == idx2 || idx1 >= self.atom_count() || idx2 >= self.atom_count() {
            return false;
        }
        if self.has_bond(idx1, idx2) {
            return false;
        }

        let bond = Bond::new(idx1, idx2, order);
        let pos = self
            .bonds
            .binary_search_by(|b| (b.a1_idx, b.a2_idx).cmp(&(bond.a1_idx, bond.a2_idx)))
            .unwrap_or_else(|p| p);
        self.bonds.insert(pos, bond);
        insert_sorted(&mut self.adjacency[idx1], idx2);
        insert_sorted(&mut self.adjacency[idx2], idx1);
        self.revision += 1;
        true
    }

    /// Removes a bond. Returns `false` when it was not present.
    pub fn remove_bond(&mut self, idx1: usize, idx2: usize) -> bool {
        if !self.has_bond(idx1, idx2) {
            return false;
        }
        let (a, b) = if idx1 <= idx2 { (idx1, idx2) } else { (idx2, idx1) };
        self.bonds.retain(|bond| !(bond.a1_idx == a && bond.a2_idx == b));
        self.adjacency[idx1].retain(|&n| n != idx2);
        self.adjacency[idx2].retain(|&n| n != idx1);
        self.revision += 1;
        true
    }

    pub fn clear_bonds(&mut self) {
        if self.bonds.is_empty() {
            return;
        }
        self.bonds.clear();
        self.adjacency.iter_mut().for_each(Vec::clear);
        self.revision += 1;
    }

    /// Atom at a global index.
    ///
    /// # Panics
    ///
    /// Panics when `atom_idx` is out of bounds.
    pub fn atom(&self, atom_idx: usize) -> &Atom {
        let (res_idx, local) = self.locator[atom_idx];
        &self.residue(res_idx).atoms()[local]
    }

    /// Global residue index owning an atom.
    pub fn residue_index_of(&self, atom_idx: usize) -> usize {
        self.locator[atom_idx].0
    }

    /// Residue owning an atom.
    pub fn residue_of(&self, atom_idx: usize) -> &Residue {
        self.residue(self.residue_index_of(atom_idx))
    }

    fn residue(&self, res_idx: usize) -> &Residue {
        self.assembly
            .residue_at(res_idx)
            .unwrap_or_else(|| unreachable!("locator references residue {res_idx}"))
    }

    /// Global indices of the atoms matching a selection pattern.
    pub fn select(&self, selection: &Selection) -> Vec<usize> {
        self.assembly.select(selection)
    }

    /// Borrowed atoms in global order, for algorithms that index repeatedly.
    pub fn atoms(&self) -> Vec<&Atom> {
        self.assembly.iter_atoms().collect()
    }

    /// Global index of the first atom of each residue, plus a trailing total.
    pub fn residue_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.assembly.residue_count() + 1);
        let mut offset = 0;
        for residue in self.assembly.iter_residues() {
            offsets.push(offset);
            offset += residue.atom_count();
        }
        offsets.push(offset);
        offsets
    }

    /// Whether any of the listed atoms is a hydrogen.
    pub fn involves_hydrogen(&self, atoms: &[usize]) -> bool {
        atoms.iter().any(|&i| self.atom(i).element == Element::H)
    }
}

fn insert_sorted(list: &mut Vec<usize>, value: usize) {
    if let Err(pos) = list.binary_search(&value) {
        list.insert(pos, value);
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Topology {{ atoms: {}, bonds: {} }}",
            self.atom_count(),
            self.bond_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::residue::Residue;
    use crate::model::types::{Point, ResidueKind};

    fn methanol() -> Assembly {
        let mut residue = Residue::new(1, "MOH", "A", ResidueKind::Hetero);
        residue.add_atom(Atom::new("C1", Element::C, Point::new(0.0, 0.0, 0.0)));
        residue.add_atom(Atom::new("O1", Element::O, Point::new(1.43, 0.0, 0.0)));
        residue.add_atom(Atom::new("HO1", Element::H, Point::new(1.8, 0.9, 0.0)));
        let mut second = Residue::new(2, "HOH", "A", ResidueKind::Water);
        second.add_atom(Atom::new("O", Element::O, Point::new(5.0, 0.0, 0.0)));
        vec![residue, second].into_iter().collect()
    }

    #[test]
    fn bond_new_canonicalizes_endpoints() {
        let bond = Bond::new(5, 2, BondOrder::Single);
        assert_eq!((bond.a1_idx, bond.a2_idx), (2, 5));
        assert_eq!(bond.partner(2), Some(5));
        assert_eq!(bond.partner(5), Some(2));
        assert_eq!(bond.partner(3), None);
    }

    #[test]
    fn select_resolves_to_global_atom_indices() {
        let topology = Topology::new(methanol());
        let oxygens: Selection = "@^O".parse().unwrap();
        let water: Selection = "HOH".parse().unwrap();

        assert_eq!(topology.select(&oxygens), vec![1, 3]);
        assert_eq!(topology.select(&water), vec![3]);
        assert_eq!(topology.residue_of(3).name, "HOH");
    }

    #[test]
    fn add_bond_keeps_adjacency_symmetric() {
        let mut topology = Topology::new(methanol());
        assert!(topology.add_bond(1, 0, BondOrder::Single));
        assert!(topology.add_bond(1, 2, BondOrder::Single));

        for a in 0..topology.atom_count() {
            for &b in topology.neighbors(a) {
                assert!(topology.neighbors(b).contains(&a));
            }
        }
        assert_eq!(topology.neighbors(1), &[0, 2]);
        assert_eq!(topology.degree(3), 0);
    }

    #[test]
    fn duplicate_and_self_bonds_are_rejected() {
        let mut topology = Topology::new(methanol());
        assert!(topology.add_bond(0, 1, BondOrder::Single));
        assert!(!topology.add_bond(1, 0, BondOrder::Double));
        assert!(!topology.add_bond(2, 2, BondOrder::Single));

        assert_eq!(topology.bond_count(), 1);
        assert_eq!(topology.revision(), 1);
    }

    #[test]
    fn bonds_stay_sorted() {
        let topology = Topology::with_bonds(
            methanol(),
            vec![
                Bond::new(2, 1, BondOrder::Single),
                Bond::new(0, 1, BondOrder::Single),
            ],
        );

        let pairs: Vec<_> = topology.bonds().iter().map(|b| (b.a1_idx, b.a2_idx)).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn remove_and_clear_bump_revision() {
        let mut topology = Topology::new(methanol());
        topology.add_bond(0, 1, BondOrder::Single);
        topology.add_bond(1, 2, BondOrder::Single);
        let before = topology.revision();

        assert!(topology.remove_bond(2, 1));
        assert!(!topology.remove_bond(2, 1));
        assert!(!topology.has_bond(1, 2));
        assert_eq!(topology.revision(), before + 1);

        topology.clear_bonds();
        assert_eq!(topology.bond_count(), 0);
        assert!(topology.neighbors(0).is_empty());
        assert_eq!(topology.revision(), before + 2);
    }

    #[test]
    fn atom_and_residue_lookup_follow_global_order() {
        let topology = Topology::new(methanol());

        assert_eq!(topology.atom_count(), 4);
        assert_eq!(topology.atom(2).name, "HO1");
        assert_eq!(topology.atom(3).name, "O");
        assert_eq!(topology.residue_of(3).name, "HOH");
        assert_eq!(topology.residue_index_of(1), 0);
        assert_eq!(topology.residue_offsets(), vec![0, 3, 4]);
    }

    #[test]
    fn involves_hydrogen_checks_elements() {
        let topology = Topology::new(methanol());
        assert!(topology.involves_hydrogen(&[1, 2]));
        assert!(!topology.involves_hydrogen(&[0, 1]));
    }

    #[test]
    fn display_reports_counts() {
        let mut topology = Topology::new(methanol());
        topology.add_bond(0, 1, BondOrder::Single);
        assert_eq!(topology.to_string(), "Topology { atoms: 4, bonds: 1 }");
    }
}
