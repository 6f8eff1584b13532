//! Fundamental atom representation: identity, force-field typing, and per-model coordinates.
//!
//! Atoms are created by readers and by topology re-import, owned by their residue, and
//! referenced everywhere else through global indices. Bond adjacency is deliberately absent
//! here; it lives in the [`Topology`](super::topology::Topology) overlay so residues stay
//! plain data holders.

use super::types::{Element, Point};
use smol_str::SmolStr;
use std::fmt;

/// Labeled atom with element identity, optional force-field type, and one position per model.
///
/// The first coordinate set is the primary model. Multi-model inputs (NMR ensembles, MD
/// snapshots) append further positions in model order, so `positions().len()` equals the
/// number of models the atom appeared in.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Atom name as it appears in the source file (e.g., `C1`, `O5`, `HO2`).
    pub name: SmolStr,
    /// Chemical element.
    pub element: Element,
    /// Force-field atom type (e.g., `Cg`, `Os`), when the source supplied one.
    pub atom_type: Option<SmolStr>,
    /// Serial number from the source file, used to resolve declared bonds.
    pub serial: u32,
    /// Partial charge in elementary charge units.
    pub charge: f64,
    positions: Vec<Point>,
}

impl Atom {
    /// Creates an untyped atom with a single model position and serial `0`.
    ///
    /// # Arguments
    ///
    /// * `name` - Atom label such as `"C1"`.
    /// * `element` - Chemical identity.
    /// * `pos` - Position of the primary model in ångströms.
    pub fn new(name: &str, element: Element, pos: Point) -> Self {
        Self {
            name: SmolStr::new(name),
            element,
            atom_type: None,
            serial: 0,
            charge: 0.0,
            positions: vec![pos],
        }
    }

    /// Sets the serial number, consuming and returning the atom.
    pub fn with_serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    /// Sets the force-field atom type, consuming and returning the atom.
    pub fn with_type(mut self, atom_type: &str) -> Self {
        self.atom_type = Some(SmolStr::new(atom_type));
        self
    }

    /// Sets the partial charge, consuming and returning the atom.
    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    /// Position in the primary model.
    pub fn pos(&self) -> &Point {
        &self.positions[0]
    }

    /// Position in the given model, if the atom was present there.
    pub fn position(&self, model_index: usize) -> Option<&Point> {
        self.positions.get(model_index)
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn model_count(&self) -> usize {
        self.positions.len()
    }

    /// Appends the coordinates of the next model.
    pub fn push_model(&mut self, pos: Point) {
        self.positions.push(pos);
    }

    /// Type label used for parameter matching; falls back to the element symbol.
    pub fn type_label(&self) -> &str {
        self.atom_type
            .as_deref()
            .unwrap_or_else(|| self.element.symbol())
    }

    /// Squared distance between primary-model positions.
    pub fn distance_squared(&self, other: &Atom) -> f64 {
        nalgebra::distance_squared(self.pos(), other.pos())
    }

    /// Distance between primary-model positions, in ångströms.
    pub fn distance(&self, other: &Atom) -> f64 {
        nalgebra::distance(self.pos(), other.pos())
    }

    /// Translates every model position by `vector`.
    pub fn translate_by(&mut self, vector: &nalgebra::Vector3<f64>) {
        for pos in &mut self.positions {
            *pos += vector;
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pos = self.pos();
        write!(
            f,
            "Atom {{ serial: {}, name: \"{}\", element: {}, type: {}, pos: [{:.3}, {:.3}, {:.3}] }}",
            self.serial,
            self.name,
            self.element,
            self.type_label(),
            pos.x,
            pos.y,
            pos.z
        )
    }
}
