//! Extraction of bonded-term types from a bond graph.
//!
//! Every bond, angle, proper dihedral and improper is enumerated from the adjacency lists,
//! mapped to its atom-type tuple, and deduplicated on the canonical ordering of that tuple so
//! that mirror images share one type index. Numeric parameters come from a
//! [`ParameterTable`]; tuples the table does not cover still receive a placeholder type and
//! an [`Issue::UnresolvedType`] entry so downstream counts stay consistent.

use crate::model::files::TopologyCounts;
use crate::model::parameters::ParameterTable;
use crate::model::terms::{
    AngleTerm, AngleType, BondTerm, BondType, DihedralTerm, DihedralType, TermKind, TypeTables,
    canonical_types, format_types,
};
use crate::model::topology::Topology;
use crate::ops::report::{Issue, Report};
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet, VecDeque};

/// Maximum bond separation of excluded non-bonded pairs.
const EXCLUSION_DEPTH: usize = 3;

/// Builds every type table and term list for `topology`.
///
/// # Arguments
///
/// * `topology` - Bond graph with (ideally) force-field atom types assigned.
/// * `params` - Parameter table matched against each type tuple.
/// * `report` - Receives missing atom types and unresolved tuples.
pub fn extract_types(topology: &Topology, params: &ParameterTable, report: &mut Report) -> TypeTables {
    let mut extractor = Extractor::new(topology, params);
    extractor.assign_atom_types(report);
    extractor.collect_bonds(report);
    extractor.collect_angles(report);
    extractor.collect_dihedrals(report);
    extractor.collect_impropers();
    extractor.tables.excluded = excluded_atoms(topology);

    let tables = extractor.tables;
    log::info!(
        "Extracted {} bond, {} angle and {} dihedral types ({} unresolved)",
        tables.bond_types.len(),
        tables.angle_types.len(),
        tables.dihedral_types.len(),
        tables.unresolved_count()
    );
    tables
}

/// Size block for a topology file built from `tables`.
pub fn count_terms(topology: &Topology, tables: &TypeTables) -> TopologyCounts {
    let (bonds_with_h, bonds_without_h) =
        split_by_hydrogen(topology, tables.bonds.iter().map(|t| &t.atoms));
    let (angles_with_h, angles_without_h) =
        split_by_hydrogen(topology, tables.angles.iter().map(|t| &t.atoms));
    let (dihedrals_with_h, dihedrals_without_h) =
        split_by_hydrogen(topology, tables.dihedrals.iter().map(|t| &t.atoms));

    TopologyCounts {
        atoms: topology.atom_count(),
        atom_types: tables.atom_types.len(),
        bonds_with_h,
        bonds_without_h,
        angles_with_h,
        angles_without_h,
        dihedrals_with_h,
        dihedrals_without_h,
        excluded_atoms: tables.excluded_count(),
        residues: topology.assembly().residue_count(),
        bond_types: tables.bond_types.len(),
        angle_types: tables.angle_types.len(),
        dihedral_types: tables.dihedral_types.len(),
        largest_residue: topology.assembly().max_residue_atom_count(),
    }
}

/// Number of terms that do and do not involve a hydrogen.
fn split_by_hydrogen<'t, const N: usize>(
    topology: &Topology,
    terms: impl Iterator<Item = &'t [usize; N]>,
) -> (usize, usize) {
    terms.fold((0, 0), |(with, without), atoms| {
        if topology.involves_hydrogen(atoms) {
            (with + 1, without)
        } else {
            (with, without + 1)
        }
    })
}

struct Extractor<'a> {
    topology: &'a Topology,
    params: &'a ParameterTable,
    labels: Vec<SmolStr>,
    tables: TypeTables,
    bond_index: HashMap<Vec<SmolStr>, usize>,
    angle_index: HashMap<Vec<SmolStr>, usize>,
    dihedral_index: HashMap<Vec<SmolStr>, Vec<usize>>,
    improper_index: HashMap<Vec<SmolStr>, usize>,
}

impl<'a> Extractor<'a> {
    fn new(topology: &'a Topology, params: &'a ParameterTable) -> Self {
        Self {
            topology,
            params,
            labels: Vec::with_capacity(topology.atom_count()),
            tables: TypeTables::default(),
            bond_index: HashMap::new(),
            angle_index: HashMap::new(),
            dihedral_index: HashMap::new(),
            improper_index: HashMap::new(),
        }
    }

    fn assign_atom_types(&mut self, report: &mut Report) {
        let mut seen: HashMap<SmolStr, usize> = HashMap::new();
        for (idx, atom) in self.topology.assembly().iter_atoms().enumerate() {
            if atom.atom_type.is_none() {
                report.push(Issue::MissingAtomType {
                    atom: idx,
                    name: atom.name.to_string(),
                });
            }
            let label = SmolStr::new(atom.type_label());
            let type_index = *seen.entry(label.clone()).or_insert_with(|| {
                self.tables.atom_types.push(label.clone());
                self.tables.atom_types.len() - 1
            });
            self.tables.atom_type_indices.push(type_index);
            self.labels.push(label);
        }
    }

    fn types_of<const N: usize>(&self, atoms: [usize; N]) -> [SmolStr; N] {
        atoms.map(|a| self.labels[a].clone())
    }

    fn unresolved(kind: TermKind, key: &[SmolStr], report: &mut Report) {
        report.push(Issue::UnresolvedType {
            kind,
            types: format_types(key),
        });
    }

    fn collect_bonds(&mut self, report: &mut Report) {
        let (topology, params) = (self.topology, self.params);
        for bond in topology.bonds() {
            let atoms = [bond.a1_idx, bond.a2_idx];
            let key = canonical_types(TermKind::Bond, &self.types_of(atoms));

            let type_index = match self.bond_index.get(&key) {
                Some(&index) => index,
                None => {
                    let index = self.tables.bond_types.len();
                    let found = params.bond(&key);
                    if found.is_none() {
                        Self::unresolved(TermKind::Bond, &key, report);
                    }
                    self.tables.bond_types.push(BondType {
                        index,
                        types: [key[0].clone(), key[1].clone()],
                        k: found.map_or(0.0, |p| p.k),
                        r0: found.map_or(0.0, |p| p.r0),
                        resolved: found.is_some(),
                    });
                    self.bond_index.insert(key, index);
                    index
                }
            };
            self.tables.bonds.push(BondTerm { atoms, type_index });
        }
    }

    fn collect_angles(&mut self, report: &mut Report) {
        let (topology, params) = (self.topology, self.params);
        for center in 0..topology.atom_count() {
            let neighbors = topology.neighbors(center);
            for (i, &a) in neighbors.iter().enumerate() {
                for &c in &neighbors[i + 1..] {
                    let atoms = [a, center, c];
                    let key = canonical_types(TermKind::Angle, &self.types_of(atoms));

                    let type_index = match self.angle_index.get(&key) {
                        Some(&index) => index,
                        None => {
                            let index = self.tables.angle_types.len();
                            let found = params.angle(&key);
                            if found.is_none() {
                                Self::unresolved(TermKind::Angle, &key, report);
                            }
                            self.tables.angle_types.push(AngleType {
                                index,
                                types: [key[0].clone(), key[1].clone(), key[2].clone()],
                                k: found.map_or(0.0, |p| p.k),
                                theta0: found.map_or(0.0, |p| p.theta0),
                                resolved: found.is_some(),
                            });
                            self.angle_index.insert(key, index);
                            index
                        }
                    };
                    self.tables.angles.push(AngleTerm { atoms, type_index });
                }
            }
        }
    }

    /// Type indices of a proper torsion, one per Fourier term.
    fn dihedral_type_indices(&mut self, key: Vec<SmolStr>, report: &mut Report) -> Vec<usize> {
        if let Some(indices) = self.dihedral_index.get(&key) {
            return indices.clone();
        }
        let types = [key[0].clone(), key[1].clone(), key[2].clone(), key[3].clone()];
        let params = self.params;
        let mut indices = Vec::new();
        match params.dihedral(&key) {
            Some(found) => {
                for term in &found.terms {
                    let index = self.tables.dihedral_types.len();
                    self.tables.dihedral_types.push(DihedralType {
                        index,
                        types: types.clone(),
                        barrier: term.barrier,
                        periodicity: term.periodicity,
                        phase: term.phase,
                        scee: found.scee,
                        scnb: found.scnb,
                        improper: false,
                        resolved: true,
                    });
                    indices.push(index);
                }
            }
            None => {
                Self::unresolved(TermKind::Dihedral, &key, report);
                let index = self.tables.dihedral_types.len();
                self.tables.dihedral_types.push(DihedralType {
                    index,
                    types,
                    barrier: 0.0,
                    periodicity: 0.0,
                    phase: 0.0,
                    scee: 1.2,
                    scnb: 2.0,
                    improper: false,
                    resolved: false,
                });
                indices.push(index);
            }
        }
        self.dihedral_index.insert(key, indices.clone());
        indices
    }

    fn collect_dihedrals(&mut self, report: &mut Report) {
        let topology = self.topology;
        let mut counted_pairs: HashSet<(usize, usize)> = HashSet::new();

        for bond in topology.bonds() {
            let (b, c) = (bond.a1_idx, bond.a2_idx);
            for &a in topology.neighbors(b) {
                if a == c {
                    continue;
                }
                for &d in topology.neighbors(c) {
                    if d == b || d == a {
                        continue;
                    }
                    let atoms = [a, b, c, d];
                    let key = canonical_types(TermKind::Dihedral, &self.types_of(atoms));
                    let indices = self.dihedral_type_indices(key, report);

                    let pair = (a.min(d), a.max(d));
                    let mut ignore_end =
                        self.within_two_bonds(a, d) || !counted_pairs.insert(pair);
                    for type_index in indices {
                        self.tables.dihedrals.push(DihedralTerm {
                            atoms,
                            type_index,
                            improper: false,
                            ignore_end,
                        });
                        ignore_end = true;
                    }
                }
            }
        }
    }

    /// Impropers for every trio of neighbors around a center the table has an entry for.
    fn collect_impropers(&mut self) {
        let (topology, params) = (self.topology, self.params);
        for center in 0..topology.atom_count() {
            let neighbors = topology.neighbors(center);
            if neighbors.len() < 3 {
                continue;
            }
            for (i, &p1) in neighbors.iter().enumerate() {
                for (j, &p2) in neighbors.iter().enumerate().skip(i + 1) {
                    for &p3 in &neighbors[j + 1..] {
                        let atoms = [p1, p2, center, p3];
                        let types = self.types_of(atoms);
                        let Some(found) = params.improper(&types) else {
                            continue;
                        };
                        let key = canonical_types(TermKind::Improper, &types);

                        let type_index = match self.improper_index.get(&key) {
                            Some(&index) => index,
                            None => {
                                let index = self.tables.dihedral_types.len();
                                self.tables.dihedral_types.push(DihedralType {
                                    index,
                                    types: [
                                        key[0].clone(),
                                        key[1].clone(),
                                        key[2].clone(),
                                        key[3].clone(),
                                    ],
                                    barrier: found.barrier,
                                    periodicity: found.periodicity,
                                    phase: found.phase,
                                    scee: 1.2,
                                    scnb: 2.0,
                                    improper: true,
                                    resolved: true,
                                });
                                self.improper_index.insert(key, index);
                                index
                            }
                        };
                        self.tables.dihedrals.push(DihedralTerm {
                            atoms,
                            type_index,
                            improper: true,
                            ignore_end: true,
                        });
                    }
                }
            }
        }
    }

    fn within_two_bonds(&self, a: usize, d: usize) -> bool {
        self.topology.has_bond(a, d)
            || self
                .topology
                .neighbors(a)
                .iter()
                .any(|&n| self.topology.has_bond(n, d))
    }
}

/// For each atom, the higher-indexed atoms reachable within three bonds.
pub fn excluded_atoms(topology: &Topology) -> Vec<Vec<usize>> {
    let n = topology.atom_count();
    let mut depth = vec![usize::MAX; n];
    let mut excluded = Vec::with_capacity(n);

    for start in 0..n {
        let mut touched = vec![start];
        let mut queue = VecDeque::from([start]);
        depth[start] = 0;
        while let Some(atom) = queue.pop_front() {
            if depth[atom] == EXCLUSION_DEPTH {
                continue;
            }
            for &next in topology.neighbors(atom) {
                if depth[next] == usize::MAX {
                    depth[next] = depth[atom] + 1;
                    touched.push(next);
                    queue.push_back(next);
                }
            }
        }

        let mut partners: Vec<usize> = touched.iter().copied().filter(|&j| j > start).collect();
        partners.sort_unstable();
        excluded.push(partners);
        for atom in touched {
            depth[atom] = usize::MAX;
        }
    }
    excluded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Element::{self, *};
    use crate::ops::report::IssueCategory;
    use crate::ops::testing::graph;

    const PARAMS: &str = r#"
        [[bonds]]
        types = ["CG", "OS"]
        k = 320.0
        r0 = 1.41

        [[bonds]]
        types = ["CG", "CG"]
        k = 310.0
        r0 = 1.52

        [[angles]]
        types = ["CG", "CG", "OS"]
        k = 50.0
        theta0 = 109.5

        [[angles]]
        types = ["CG", "OS", "CG"]
        k = 50.0
        theta0 = 108.5

        [[dihedrals]]
        types = ["X", "CG", "CG", "X"]
        terms = [{ barrier = 0.16, periodicity = 3.0 }]

        [[dihedrals]]
        types = ["CG", "CG", "OS", "CG"]
        terms = [
            { barrier = 0.1, periodicity = 3.0 },
            { barrier = 0.3, periodicity = 2.0, phase = 180.0 },
        ]
    "#;

    /// Chain typed `CG` for carbon, `OS` for oxygen, and the element symbol otherwise.
    fn typed_chain(elements: &[Element]) -> Topology {
        let bonds: Vec<(usize, usize)> = (1..elements.len()).map(|i| (i - 1, i)).collect();
        let topology = graph(elements, &bonds);
        let mut assembly = topology.into_assembly();
        for atom in assembly.iter_atoms_mut() {
            let label = match atom.element {
                C => "CG",
                O => "OS",
                other => other.symbol(),
            };
            atom.atom_type = Some(label.into());
        }
        Topology::with_bonds(
            assembly,
            bonds
                .into_iter()
                .map(|(a, b)| crate::model::topology::Bond::new(a, b, Default::default())),
        )
    }

    fn params() -> ParameterTable {
        ParameterTable::from_toml_str(PARAMS).unwrap()
    }

    #[test]
    fn mirror_angles_share_one_type() {
        // C-C-O and O-C-C.
        let topology = typed_chain(&[C, C, O, C, C]);
        let mut report = Report::new();
        let tables = extract_types(&topology, &params(), &mut report);

        assert_eq!(tables.angles.len(), 3);
        let cco: Vec<usize> = tables
            .angles
            .iter()
            .filter(|a| a.atoms[1] != 2)
            .map(|a| a.type_index)
            .collect();
        assert_eq!(cco.len(), 2);
        assert_eq!(cco[0], cco[1]);
        assert_eq!(tables.angle_types.len(), 2);
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn reversed_dihedrals_resolve_to_the_same_types() {
        let topology = typed_chain(&[C, C, O, C, C]);
        let mut report = Report::new();
        let tables = extract_types(&topology, &params(), &mut report);

        // C0-C1-O2-C3 and C1-O2-C3-C4 mirror each other: two terms each.
        assert_eq!(tables.dihedrals.len(), 4);
        assert_eq!(tables.dihedral_types.len(), 2);
        let first: Vec<usize> = tables.dihedrals[..2].iter().map(|d| d.type_index).collect();
        let second: Vec<usize> = tables.dihedrals[2..].iter().map(|d| d.type_index).collect();
        assert_eq!(first, second);

        // Only the first term of each torsion counts the 1-4 pair.
        let flags: Vec<bool> = tables.dihedrals.iter().map(|d| d.ignore_end).collect();
        assert_eq!(flags, vec![false, true, false, true]);
    }

    #[test]
    fn unresolved_tuples_get_placeholders() {
        let topology = typed_chain(&[C, N, C]);
        let mut report = Report::new();
        let tables = extract_types(&topology, &params(), &mut report);

        assert_eq!(tables.bond_types.len(), 1);
        assert!(!tables.bond_types[0].resolved);
        assert_eq!(tables.bonds.len(), 2);
        assert_eq!(tables.unresolved_count(), 2);
        assert_eq!(report.count(IssueCategory::UnresolvedType), 2);
    }

    #[test]
    fn untyped_atoms_fall_back_to_element_symbols() {
        let topology = graph(&[C, O], &[(0, 1)]);
        let mut report = Report::new();
        let tables = extract_types(&topology, &ParameterTable::default(), &mut report);

        assert_eq!(tables.atom_types, vec![SmolStr::new("C"), SmolStr::new("O")]);
        assert_eq!(
            report
                .issues()
                .iter()
                .filter(|i| matches!(i, Issue::MissingAtomType { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn impropers_need_a_table_entry() {
        // Carboxylate-like center 1 bonded to 0, 2 and 3.
        let topology = graph(&[C, C, O, O], &[(0, 1), (1, 2), (1, 3)]);
        let with_entry = ParameterTable::from_toml_str(
            r#"
            [[impropers]]
            types = ["X", "O", "C", "O"]
            barrier = 10.5
            periodicity = 2.0
            phase = 180.0
            "#,
        )
        .unwrap();

        let mut report = Report::new();
        let tables = extract_types(&topology, &with_entry, &mut report);
        let impropers: Vec<&DihedralTerm> = tables.dihedrals.iter().filter(|d| d.improper).collect();
        assert_eq!(impropers.len(), 1);
        assert_eq!(impropers[0].atoms[2], 1);

        let tables = extract_types(&topology, &ParameterTable::default(), &mut report);
        assert!(tables.dihedrals.iter().all(|d| !d.improper));
    }

    #[test]
    fn exclusions_reach_three_bonds() {
        let topology = graph(&[C, C, C, C, C], &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let excluded = excluded_atoms(&topology);

        assert_eq!(excluded[0], vec![1, 2, 3]);
        assert_eq!(excluded[1], vec![2, 3, 4]);
        assert!(excluded[4].is_empty());
    }

    #[test]
    fn counts_split_hydrogen_terms() {
        let topology = graph(&[C, C, H], &[(0, 1), (1, 2)]);
        let mut report = Report::new();
        let tables = extract_types(&topology, &ParameterTable::default(), &mut report);
        let counts = count_terms(&topology, &tables);

        assert_eq!(counts.atoms, 3);
        assert_eq!(counts.bonds_with_h, 1);
        assert_eq!(counts.bonds_without_h, 1);
        assert_eq!(counts.angles_with_h, 1);
        assert_eq!(counts.excluded_atoms, 3);
        assert_eq!(counts.residues, 1);
        assert_eq!(counts.largest_residue, 3);
    }
}
