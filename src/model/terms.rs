//! Bonded-term type records and instances.
//!
//! Type records carry an atom-type tuple, the numeric parameters resolved from a parameter
//! table, and the sequential index instances refer to. Instances name concrete atoms by
//! global index. Both are produced by the type extraction stage and consumed by file
//! synthesis.

use smol_str::SmolStr;
use std::fmt;

/// Wildcard atom type accepted in dihedral and improper parameter entries.
pub const WILDCARD: &str = "X";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Bond,
    Angle,
    Dihedral,
    Improper,
}

impl TermKind {
    /// Number of atoms in the term.
    pub fn arity(&self) -> usize {
        match self {
            TermKind::Bond => 2,
            TermKind::Angle => 3,
            TermKind::Dihedral | TermKind::Improper => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TermKind::Bond => "bond",
            TermKind::Angle => "angle",
            TermKind::Dihedral => "dihedral",
            TermKind::Improper => "improper",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every ordering of `types` that describes the same term.
///
/// Bonds, angles and dihedrals are symmetric under reversal. Impropers keep the central
/// atom in the third slot (AMBER convention) and permute the three outer atoms freely.
/// The first element is always `types` itself; duplicates from symmetric tuples are removed.
pub fn equivalent_orderings<T: Clone + PartialEq>(kind: TermKind, types: &[T]) -> Vec<Vec<T>> {
    let mut orderings: Vec<Vec<T>> = vec![types.to_vec()];
    match kind {
        TermKind::Bond | TermKind::Angle | TermKind::Dihedral => {
            orderings.push(types.iter().rev().cloned().collect());
        }
        TermKind::Improper if types.len() == 4 => {
            let outer = [&types[0], &types[1], &types[3]];
            const PERMUTATIONS: [[usize; 3]; 6] = [
                [0, 1, 2],
                [0, 2, 1],
                [1, 0, 2],
                [1, 2, 0],
                [2, 0, 1],
                [2, 1, 0],
            ];
            for [a, b, d] in PERMUTATIONS {
                orderings.push(vec![
                    outer[a].clone(),
                    outer[b].clone(),
                    types[2].clone(),
                    outer[d].clone(),
                ]);
            }
        }
        TermKind::Improper => {}
    }

    let mut unique: Vec<Vec<T>> = Vec::with_capacity(orderings.len());
    for ordering in orderings {
        if !unique.contains(&ordering) {
            unique.push(ordering);
        }
    }
    unique
}

/// Lexicographically smallest equivalent ordering, used as the deduplication key.
pub fn canonical_types(kind: TermKind, types: &[SmolStr]) -> Vec<SmolStr> {
    equivalent_orderings(kind, types)
        .into_iter()
        .min()
        .unwrap_or_default()
}

/// Joins a type tuple for display, e.g. `CG-OS-CG`.
pub fn format_types(types: &[SmolStr]) -> String {
    types
        .iter()
        .map(SmolStr::as_str)
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, PartialEq)]
pub struct BondType {
    pub index: usize,
    pub types: [SmolStr; 2],
    /// Force constant in kcal/(mol Å²).
    pub k: f64,
    /// Equilibrium length in Å.
    pub r0: f64,
    /// `false` for a placeholder emitted without a parameter-table match.
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AngleType {
    pub index: usize,
    pub types: [SmolStr; 3],
    /// Force constant in kcal/(mol rad²).
    pub k: f64,
    /// Equilibrium angle in degrees.
    pub theta0: f64,
    pub resolved: bool,
}

/// One Fourier term of a proper or improper torsion.
#[derive(Debug, Clone, PartialEq)]
pub struct DihedralType {
    pub index: usize,
    pub types: [SmolStr; 4],
    /// Barrier height `V_n / 2` in kcal/mol.
    pub barrier: f64,
    pub periodicity: f64,
    /// Phase in degrees.
    pub phase: f64,
    pub scee: f64,
    pub scnb: f64,
    pub improper: bool,
    pub resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondTerm {
    pub atoms: [usize; 2],
    pub type_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleTerm {
    pub atoms: [usize; 3],
    pub type_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DihedralTerm {
    pub atoms: [usize; 4],
    pub type_index: usize,
    pub improper: bool,
    /// Skip the 1-4 pair: already counted by another term of the same torsion, or a ring
    /// closes it within three bonds.
    pub ignore_end: bool,
}

/// Everything type extraction produces for one topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeTables {
    /// Distinct atom types in first-seen order.
    pub atom_types: Vec<SmolStr>,
    /// Per atom, index into `atom_types`.
    pub atom_type_indices: Vec<usize>,
    pub bond_types: Vec<BondType>,
    pub angle_types: Vec<AngleType>,
    pub dihedral_types: Vec<DihedralType>,
    pub bonds: Vec<BondTerm>,
    pub angles: Vec<AngleTerm>,
    pub dihedrals: Vec<DihedralTerm>,
    /// Per atom, partners within three bonds that have a higher index.
    pub excluded: Vec<Vec<usize>>,
}

impl TypeTables {
    /// Atom type label of an atom.
    pub fn atom_type(&self, atom: usize) -> Option<&SmolStr> {
        self.atom_type_indices
            .get(atom)
            .and_then(|&i| self.atom_types.get(i))
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.iter().map(Vec::len).sum()
    }

    pub fn unresolved_count(&self) -> usize {
        self.bond_types.iter().filter(|t| !t.resolved).count()
            + self.angle_types.iter().filter(|t| !t.resolved).count()
            + self.dihedral_types.iter().filter(|t| !t.resolved).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(types: &[&str]) -> Vec<SmolStr> {
        types.iter().map(|t| SmolStr::new(t)).collect()
    }

    #[test]
    fn reversible_terms_have_two_orderings() {
        let orderings = equivalent_orderings(TermKind::Dihedral, &tuple(&["CG", "CG", "OS", "H1"]));
        assert_eq!(
            orderings,
            vec![
                tuple(&["CG", "CG", "OS", "H1"]),
                tuple(&["H1", "OS", "CG", "CG"])
            ]
        );
    }

    #[test]
    fn palindromic_tuples_collapse() {
        let orderings = equivalent_orderings(TermKind::Angle, &tuple(&["CG", "OS", "CG"]));
        assert_eq!(orderings.len(), 1);
    }

    #[test]
    fn impropers_permute_outer_atoms_around_fixed_center() {
        let orderings = equivalent_orderings(TermKind::Improper, &tuple(&["A", "B", "C", "D"]));
        assert_eq!(orderings.len(), 6);
        assert!(orderings.iter().all(|o| o[2] == "C"));
        assert!(orderings.contains(&tuple(&["D", "B", "C", "A"])));
        assert!(!orderings.contains(&tuple(&["D", "C", "B", "A"])));
    }

    #[test]
    fn canonical_form_is_shared_by_mirror_tuples() {
        let forward = canonical_types(TermKind::Angle, &tuple(&["OS", "CG", "H1"]));
        let mirror = canonical_types(TermKind::Angle, &tuple(&["H1", "CG", "OS"]));
        assert_eq!(forward, mirror);
        assert_eq!(forward, tuple(&["H1", "CG", "OS"]));
    }

    #[test]
    fn formatted_types_are_dash_joined() {
        assert_eq!(format_types(&tuple(&["CG", "OS"])), "CG-OS");
    }
}
