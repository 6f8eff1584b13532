//! Shared fixtures for unit tests.

use crate::model::{
    assembly::Assembly,
    atom::Atom,
    residue::Residue,
    topology::{Bond, Topology},
    types::{BondOrder, Element, Point, ResidueKind},
};
use nalgebra::Vector3;

/// Topology over atoms spread along x, bonded exactly as listed.
pub fn graph(elements: &[Element], bonds: &[(usize, usize)]) -> Topology {
    let mut residue = Residue::new(1, "LIG", "A", ResidueKind::Hetero);
    for (i, element) in elements.iter().enumerate() {
        residue.add_atom(
            Atom::new(
                &format!("{}{}", element.symbol(), i),
                *element,
                Point::new(i as f64 * 10.0, 0.0, 0.0),
            )
            .with_serial(i as u32 + 1),
        );
    }
    let assembly: Assembly = std::iter::once(residue).collect();
    Topology::with_bonds(
        assembly,
        bonds
            .iter()
            .map(|&(a, b)| Bond::new(a, b, BondOrder::Single)),
    )
}

/// One residue plus its intra-residue bonds by local index.
#[derive(Debug, Clone)]
pub struct Piece {
    pub residue: Residue,
    pub bonds: Vec<(usize, usize)>,
}

impl Piece {
    pub fn index(&self, name: &str) -> usize {
        self.residue
            .atom_index(name)
            .unwrap_or_else(|| panic!("fixture atom {name} missing"))
    }

    /// Drops every bond of an atom, leaving it in place.
    pub fn detach(&mut self, name: &str) {
        let idx = self.index(name);
        self.bonds.retain(|&(a, b)| a != idx && b != idx);
    }

    pub fn shifted(mut self, dz: f64) -> Self {
        let offset = Vector3::new(0.0, 0.0, dz);
        for atom in self.residue.iter_atoms_mut() {
            atom.translate_by(&offset);
        }
        self
    }

    /// Turns the hydroxyl at `carbon` into an N-acetyl amide.
    pub fn with_n_acetyl(mut self, carbon: usize) -> Self {
        let o_name = format!("O{carbon}");
        let n_name = format!("N{carbon}");
        let n_idx = self.index(&o_name);
        let n_pos = {
            let atom = self
                .residue
                .atom_mut(&o_name)
                .unwrap_or_else(|| panic!("fixture atom {o_name} missing"));
            atom.element = Element::N;
            atom.name = n_name.as_str().into();
            *atom.pos()
        };

        let push = |piece: &mut Piece, name: &str, element: Element, dx: f64, dz: f64| {
            let pos = n_pos + Vector3::new(dx, 0.0, dz);
            piece.residue.add_atom(Atom::new(name, element, pos));
            piece.residue.atom_count() - 1
        };
        let c7 = push(&mut self, "C7", Element::C, 0.0, 1.3);
        let o7 = push(&mut self, "O7", Element::O, 1.1, 1.9);
        let c8 = push(&mut self, "C8", Element::C, -1.2, 2.0);
        self.bonds.extend([(n_idx, c7), (c7, o7), (c7, c8)]);
        self
    }

    /// Replaces the hydroxyl oxygen at `carbon` with an amine nitrogen.
    pub fn with_nitrogen(mut self, carbon: usize) -> Self {
        let o_name = format!("O{carbon}");
        let atom = self
            .residue
            .atom_mut(&o_name)
            .unwrap_or_else(|| panic!("fixture atom {o_name} missing"));
        atom.element = Element::N;
        atom.name = format!("N{carbon}").as_str().into();
        self
    }

    /// Hangs `center` off atom `on`, capped with `oxygens` terminal oxygens.
    ///
    /// `(S, 3)` gives a sulfate, `(P, 3)` a phosphate, `(C, 0)` a methyl and `(O, 0)` a bare
    /// oxygen, which turns a terminal hydroxymethyl into a carboxylate.
    pub fn with_group(mut self, on: &str, center: Element, oxygens: usize) -> Self {
        let anchor = self.index(on);
        let base = *self.residue.atoms()[anchor].pos() + Vector3::new(0.0, 0.0, 1.5);
        let tag = self.residue.atom_count();

        self.residue.add_atom(Atom::new(
            &format!("{}{tag}", center.symbol()),
            center,
            base,
        ));
        let center_idx = self.residue.atom_count() - 1;
        self.bonds.push((anchor, center_idx));
        for k in 0..oxygens {
            let angle = k as f64 * std::f64::consts::TAU / oxygens as f64;
            let pos = base + Vector3::new(angle.cos() * 1.4, angle.sin() * 1.4, 0.5);
            self.residue
                .add_atom(Atom::new(&format!("O{tag}{k}"), Element::O, pos));
            let idx = self.residue.atom_count() - 1;
            self.bonds.push((center_idx, idx));
        }
        self
    }
}

/// Idealized sugar ring lying in the xy plane, numbered clockwise when viewed from +z.
///
/// `ups[k]` orients the substituent of ring carbon `k`: the hydroxyl for every carbon but the
/// last, which carries the exocyclic backbone carbon instead. `exo_oxygen` adds the hydroxyl on
/// that exocyclic carbon (false gives a 6-deoxy methyl group).
pub fn ring_sugar(name: &str, id: i32, ring_size: usize, ups: &[bool], exo_oxygen: bool) -> Piece {
    let carbons = ring_size - 1;
    assert_eq!(ups.len(), carbons);

    let mut residue = Residue::new(id, name, "A", ResidueKind::Hetero);
    let mut bonds = Vec::new();
    let step = std::f64::consts::TAU / ring_size as f64;
    let radial = |k: usize| {
        let angle = -(k as f64) * step;
        Vector3::new(angle.cos(), angle.sin(), 0.0)
    };
    let z = Vector3::new(0.0, 0.0, 1.0);
    let ring_pos = |k: usize| Point::origin() + radial(k) * 1.45;

    for k in 0..carbons {
        residue.add_atom(Atom::new(&format!("C{}", k + 1), Element::C, ring_pos(k)));
    }
    residue.add_atom(Atom::new(
        &format!("O{carbons}"),
        Element::O,
        ring_pos(carbons),
    ));
    for k in 0..ring_size {
        bonds.push((k, (k + 1) % ring_size));
    }

    for k in 0..carbons {
        let sign = if ups[k] { 1.0 } else { -1.0 };
        let pos = ring_pos(k) + radial(k) * 1.0 + z * (0.9 * sign);
        let idx = residue.atom_count();
        if k + 1 < carbons {
            residue.add_atom(Atom::new(&format!("O{}", k + 1), Element::O, pos));
            bonds.push((k, idx));
        } else {
            residue.add_atom(Atom::new(&format!("C{}", carbons + 1), Element::C, pos));
            bonds.push((k, idx));
            if exo_oxygen {
                let o_pos = pos + radial(k) * 1.0 + z * (0.5 * sign);
                residue.add_atom(Atom::new(&format!("O{}", carbons + 1), Element::O, o_pos));
                bonds.push((idx, idx + 1));
            }
        }
    }

    Piece { residue, bonds }
}

/// Joins pieces into one topology, adding inter-piece bonds given as `(piece, atom name)` pairs.
pub fn assemble(pieces: Vec<Piece>, links: &[((usize, &str), (usize, &str))]) -> Topology {
    let mut offsets = Vec::with_capacity(pieces.len());
    let mut offset = 0;
    for piece in &pieces {
        offsets.push(offset);
        offset += piece.residue.atom_count();
    }

    let mut bonds: Vec<Bond> = pieces
        .iter()
        .zip(&offsets)
        .flat_map(|(piece, &base)| {
            piece
                .bonds
                .iter()
                .map(move |&(a, b)| Bond::new(base + a, base + b, BondOrder::Single))
        })
        .collect();
    for &((pa, na), (pb, nb)) in links {
        bonds.push(Bond::new(
            offsets[pa] + pieces[pa].index(na),
            offsets[pb] + pieces[pb].index(nb),
            BondOrder::Single,
        ));
    }

    let assembly: Assembly = pieces.into_iter().map(|p| p.residue).collect();
    Topology::with_bonds(assembly, bonds)
}
