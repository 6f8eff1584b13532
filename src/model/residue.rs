use super::atom::Atom;
use super::types::{Element, ResidueKind};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub id: i32,
    pub insertion_code: Option<char>,
    pub name: String,
    pub chain_id: String,
    pub kind: ResidueKind,
    atoms: Vec<Atom>,
}

impl Residue {
    pub fn new(id: i32, name: &str, chain_id: &str, kind: ResidueKind) -> Self {
        Self {
            id,
            insertion_code: None,
            name: name.to_string(),
            chain_id: chain_id.to_string(),
            kind,
            atoms: Vec::new(),
        }
    }

    pub fn add_atom(&mut self, atom: Atom) {
        debug_assert!(
            self.atom(&atom.name).is_none(),
            "Attempted to add a duplicate atom name '{}' to residue '{}'",
            atom.name,
            self.name
        );
        self.atoms.push(atom);
    }

    pub fn atom(&self, name: &str) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.name == name)
    }

    pub fn atom_mut(&mut self, name: &str) -> Option<&mut Atom> {
        self.atoms.iter_mut().find(|a| a.name == name)
    }

    pub fn atom_index(&self, name: &str) -> Option<usize> {
        self.atoms.iter().position(|a| a.name == name)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| a.element != Element::H).count()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter_atoms(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    pub fn iter_atoms_mut(&mut self) -> std::slice::IterMut<'_, Atom> {
        self.atoms.iter_mut()
    }

    pub fn mass(&self) -> f64 {
        self.atoms.iter().map(|a| a.element.atomic_mass()).sum()
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Residue {{ chain: \"{}\", id: {}{}, name: \"{}\", kind: {}, atoms: {} }}",
            self.chain_id,
            self.id,
            self.insertion_code.map(String::from).unwrap_or_default(),
            self.name,
            self.kind,
            self.atom_count()
        )
    }
}
