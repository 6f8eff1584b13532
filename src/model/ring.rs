//! Perceived rings and the revision-stamped set that holds them.

use std::collections::BTreeMap;
use std::fmt;

/// Simple cycle of atoms, stored in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    atoms: Vec<usize>,
    key: String,
}

impl Ring {
    pub fn new(atoms: Vec<usize>) -> Self {
        let key = ring_key(&atoms);
        Self { atoms, key }
    }

    /// Atoms in traversal order; consecutive entries (and last/first) are bonded.
    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Order-independent identity: sorted global indices joined by `-`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn contains(&self, atom_idx: usize) -> bool {
        self.atoms.contains(&atom_idx)
    }

    pub fn shared_atoms(&self, other: &Ring) -> usize {
        self.atoms.iter().filter(|a| other.contains(**a)).count()
    }

    /// Ring neighbors of a member atom, as `(previous, next)` in traversal order.
    pub fn flanking(&self, atom_idx: usize) -> Option<(usize, usize)> {
        let pos = self.atoms.iter().position(|&a| a == atom_idx)?;
        let n = self.atoms.len();
        Some((self.atoms[(pos + n - 1) % n], self.atoms[(pos + 1) % n]))
    }

    /// Returns the same cycle traversed from `start` toward `next`.
    pub fn reordered(&self, start: usize, next: usize) -> Option<Ring> {
        let n = self.atoms.len();
        let pos = self.atoms.iter().position(|&a| a == start)?;
        let forward = self.atoms[(pos + 1) % n] == next;
        let backward = self.atoms[(pos + n - 1) % n] == next;
        let atoms = match (forward, backward) {
            (true, _) => (0..n).map(|k| self.atoms[(pos + k) % n]).collect(),
            (false, true) => (0..n).map(|k| self.atoms[(pos + n - k) % n]).collect(),
            _ => return None,
        };
        Some(Ring {
            atoms,
            key: self.key.clone(),
        })
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

pub fn ring_key(atoms: &[usize]) -> String {
    let mut sorted = atoms.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// Rings keyed by canonical identity, stamped with the bond-graph revision they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingSet {
    rings: BTreeMap<String, Ring>,
    revision: u64,
}

impl RingSet {
    pub fn new(revision: u64) -> Self {
        Self {
            rings: BTreeMap::new(),
            revision,
        }
    }

    /// Inserts a ring unless an identical cycle is already present.
    pub fn insert(&mut self, ring: Ring) -> bool {
        if self.rings.contains_key(ring.key()) {
            return false;
        }
        self.rings.insert(ring.key().to_string(), ring);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Ring> {
        self.rings.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.rings.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ring> {
        self.rings.values()
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Ring) -> bool) {
        self.rings.retain(|_, ring| keep(ring));
    }
}

impl FromIterator<Ring> for RingSet {
    fn from_iter<I: IntoIterator<Item = Ring>>(iter: I) -> Self {
        let mut set = RingSet::default();
        for ring in iter {
            set.insert(ring);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_traversal_order() {
        let a = Ring::new(vec![12, 3, 7, 10]);
        let b = Ring::new(vec![7, 3, 12, 10]);
        assert_eq!(a.key(), "3-7-10-12");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn set_deduplicates_equivalent_cycles() {
        let mut set = RingSet::new(4);
        assert!(set.insert(Ring::new(vec![1, 2, 3, 4, 5])));
        assert!(!set.insert(Ring::new(vec![3, 2, 1, 5, 4])));
        assert_eq!(set.len(), 1);
        assert_eq!(set.revision(), 4);
    }

    #[test]
    fn flanking_wraps_around() {
        let ring = Ring::new(vec![4, 8, 15, 16, 23, 42]);
        assert_eq!(ring.flanking(4), Some((42, 8)));
        assert_eq!(ring.flanking(42), Some((23, 4)));
        assert_eq!(ring.flanking(99), None);
    }

    #[test]
    fn reordered_walks_in_requested_direction() {
        let ring = Ring::new(vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(ring.reordered(2, 3).unwrap().atoms(), &[2, 3, 4, 5, 0, 1]);
        assert_eq!(ring.reordered(2, 1).unwrap().atoms(), &[2, 1, 0, 5, 4, 3]);
        assert!(ring.reordered(2, 4).is_none());
    }

    #[test]
    fn shared_atoms_counts_overlap() {
        let a = Ring::new(vec![0, 1, 2, 3, 4, 5]);
        let b = Ring::new(vec![4, 5, 6, 7, 8, 9]);
        assert_eq!(a.shared_atoms(&b), 2);
    }
}
