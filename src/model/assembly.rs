//! Hierarchical container for residues and nested assemblies.
//!
//! An [`Assembly`] owns its residues and child assemblies exclusively. Whenever atoms need a
//! stable global index (bond graphs, type tables, writers) the tree is flattened depth-first:
//! an assembly's own residues come first, followed by each child assembly in insertion order.

use super::atom::Atom;
use super::residue::Residue;
use super::types::Point;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub name: String,
    pub id: String,
    /// Bond pairs declared by the source file, keyed by atom serial. `None` when the
    /// source carried no connectivity records.
    pub declared_bonds: Option<Vec<(u32, u32)>>,
    pub box_vectors: Option<[[f64; 3]; 3]>,
    residues: Vec<Residue>,
    assemblies: Vec<Assembly>,
}

impl Assembly {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: name.to_string(),
            ..Self::default()
        }
    }

    pub fn add_residue(&mut self, residue: Residue) {
        self.residues.push(residue);
    }

    pub fn add_assembly(&mut self, assembly: Assembly) {
        self.assemblies.push(assembly);
    }

    /// Appends a declared bond between two atom serials.
    pub fn declare_bond(&mut self, serial1: u32, serial2: u32) {
        self.declared_bonds
            .get_or_insert_with(Vec::new)
            .push((serial1, serial2));
    }

    /// Residues owned directly by this assembly.
    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn residues_mut(&mut self) -> &mut [Residue] {
        &mut self.residues
    }

    /// Child assemblies owned directly by this assembly.
    pub fn assemblies(&self) -> &[Assembly] {
        &self.assemblies
    }

    pub fn is_empty(&self) -> bool {
        self.atom_count() == 0
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
            + self
                .assemblies
                .iter()
                .map(Assembly::residue_count)
                .sum::<usize>()
    }

    pub fn atom_count(&self) -> usize {
        self.iter_residues().map(Residue::atom_count).sum()
    }

    /// Iterates residues of the whole tree in global order.
    pub fn iter_residues(&self) -> Box<dyn Iterator<Item = &Residue> + '_> {
        Box::new(
            self.residues
                .iter()
                .chain(self.assemblies.iter().flat_map(|a| a.iter_residues())),
        )
    }

    /// Mutable counterpart of [`Assembly::iter_residues`].
    pub fn iter_residues_mut(&mut self) -> Box<dyn Iterator<Item = &mut Residue> + '_> {
        Box::new(
            self.residues
                .iter_mut()
                .chain(self.assemblies.iter_mut().flat_map(|a| a.iter_residues_mut())),
        )
    }

    /// Iterates atoms of the whole tree; the position in this sequence is the global index.
    pub fn iter_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.iter_residues().flat_map(|r| r.iter_atoms())
    }

    pub fn iter_atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.iter_residues_mut().flat_map(|r| r.iter_atoms_mut())
    }

    pub fn iter_atoms_with_context(&self) -> impl Iterator<Item = (&Residue, &Atom)> {
        self.iter_residues()
            .flat_map(|residue| residue.iter_atoms().map(move |atom| (residue, atom)))
    }

    /// Residue at a global residue index.
    pub fn residue_at(&self, index: usize) -> Option<&Residue> {
        if let Some(residue) = self.residues.get(index) {
            return Some(residue);
        }
        let mut remaining = index - self.residues.len();
        for child in &self.assemblies {
            let count = child.residue_count();
            if remaining < count {
                return child.residue_at(remaining);
            }
            remaining -= count;
        }
        None
    }

    pub fn total_mass(&self) -> f64 {
        self.iter_residues().map(Residue::mass).sum()
    }

    pub fn geometric_center(&self) -> Point {
        let mut sum = nalgebra::Vector3::zeros();
        let mut count = 0;

        for atom in self.iter_atoms() {
            sum += atom.pos().coords;
            count += 1;
        }

        if count > 0 {
            Point::from(sum / (count as f64))
        } else {
            Point::origin()
        }
    }

    pub fn center_of_mass(&self) -> Point {
        let mut total_mass = 0.0;
        let mut weighted_sum = nalgebra::Vector3::zeros();

        for atom in self.iter_atoms() {
            let mass = atom.element.atomic_mass();
            weighted_sum += atom.pos().coords * mass;
            total_mass += mass;
        }

        if total_mass > 1e-9 {
            Point::from(weighted_sum / total_mass)
        } else {
            Point::origin()
        }
    }

    /// Largest atom count found in a single residue.
    pub fn max_residue_atom_count(&self) -> usize {
        self.iter_residues()
            .map(Residue::atom_count)
            .max()
            .unwrap_or(0)
    }

    /// Number of coordinate models; the minimum over all atoms so every index is complete.
    pub fn model_count(&self) -> usize {
        self.iter_atoms().map(Atom::model_count).min().unwrap_or(0)
    }
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Assembly {{ name: \"{}\", assemblies: {}, residues: {}, atoms: {} }}",
            self.name,
            self.assemblies.len(),
            self.residue_count(),
            self.atom_count()
        )
    }
}

impl FromIterator<Residue> for Assembly {
    fn from_iter<T: IntoIterator<Item = Residue>>(iter: T) -> Self {
        Self {
            residues: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Element, ResidueKind};

    fn residue(id: i32, name: &str, atoms: &[(&str, Element, [f64; 3])]) -> Residue {
        let mut residue = Residue::new(id, name, "A", ResidueKind::Hetero);
        for (atom_name, element, [x, y, z]) in atoms {
            residue.add_atom(Atom::new(atom_name, *element, Point::new(*x, *y, *z)));
        }
        residue
    }

    fn nested() -> Assembly {
        let mut root = Assembly::new("root");
        root.add_residue(residue(1, "ROH", &[("O1", Element::O, [0.0, 0.0, 0.0])]));

        let mut child = Assembly::new("glycan");
        child.add_residue(residue(
            2,
            "GLC",
            &[
                ("C1", Element::C, [2.0, 0.0, 0.0]),
                ("O5", Element::O, [4.0, 0.0, 0.0]),
            ],
        ));
        child.add_residue(residue(3, "GAL", &[("C1", Element::C, [6.0, 0.0, 0.0])]));
        root.add_assembly(child);
        root
    }

    #[test]
    fn new_assembly_is_empty() {
        let assembly = Assembly::new("empty");

        assert!(assembly.is_empty());
        assert_eq!(assembly.residue_count(), 0);
        assert_eq!(assembly.atom_count(), 0);
        assert!(assembly.declared_bonds.is_none());
    }

    #[test]
    fn counts_span_the_whole_tree() {
        let assembly = nested();

        assert_eq!(assembly.assemblies().len(), 1);
        assert_eq!(assembly.residues().len(), 1);
        assert_eq!(assembly.residue_count(), 3);
        assert_eq!(assembly.atom_count(), 4);
        assert_eq!(assembly.max_residue_atom_count(), 2);
    }

    #[test]
    fn global_order_visits_own_residues_before_children() {
        let assembly = nested();
        let names: Vec<_> = assembly.iter_residues().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["ROH", "GLC", "GAL"]);
        assert_eq!(assembly.residue_at(2).map(|r| r.name.as_str()), Some("GAL"));
        assert!(assembly.residue_at(3).is_none());
    }

    #[test]
    fn declare_bond_creates_bond_list_on_demand() {
        let mut assembly = Assembly::new("bonded");
        assembly.declare_bond(1, 2);
        assembly.declare_bond(2, 3);

        assert_eq!(assembly.declared_bonds, Some(vec![(1, 2), (2, 3)]));
    }

    #[test]
    fn geometric_center_and_mass_aggregate_all_atoms() {
        let assembly = nested();

        let center = assembly.geometric_center();
        assert!((center.x - 3.0).abs() < 1e-9);

        let mass = 2.0 * Element::O.atomic_mass() + 2.0 * Element::C.atomic_mass();
        assert!((assembly.total_mass() - mass).abs() < 1e-9);

        let com = assembly.center_of_mass();
        let expected = (Element::C.atomic_mass() * 8.0 + Element::O.atomic_mass() * 4.0) / mass;
        assert!((com.x - expected).abs() < 1e-9);
    }

    #[test]
    fn center_of_empty_assembly_is_origin() {
        let assembly = Assembly::new("empty");
        assert_eq!(assembly.geometric_center(), Point::origin());
        assert_eq!(assembly.center_of_mass(), Point::origin());
    }

    #[test]
    fn from_iterator_collects_residues() {
        let assembly: Assembly = vec![
            residue(1, "A", &[("C1", Element::C, [0.0, 0.0, 0.0])]),
            residue(2, "B", &[]),
        ]
        .into_iter()
        .collect();

        assert_eq!(assembly.residue_count(), 2);
        assert_eq!(assembly.atom_count(), 1);
    }
}
