//! Bond-graph builder that turns an [`Assembly`] into a [`Topology`].
//!
//! Connectivity comes either from bonds declared by the source file (resolved through atom
//! serials) or from a distance criterion evaluated on one coordinate model. The distance path
//! prunes candidate pairs with a [`Grid`] so large assemblies stay close to linear time; a
//! brute-force reference, [`brute_force_bonds`], is kept for verification.

use crate::model::{
    assembly::Assembly,
    atom::Atom,
    grid::Grid,
    topology::{Bond, Topology},
    types::{BondOrder, Point},
};
use crate::ops::config::{BondingStrategy, PerceptionConfig};
use crate::ops::error::Error;
use crate::ops::report::{Issue, Report};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Builder responsible for creating [`Topology`] objects from an [`Assembly`].
///
/// Configure the strategy and distance cutoff through the builder-style setters, then call
/// [`TopologyBuilder::build`]. Non-fatal problems (unknown serials, atoms without coordinates)
/// are appended to the caller's [`Report`].
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    config: PerceptionConfig,
}

impl TopologyBuilder {
    /// Creates a builder with the default perception settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from an existing configuration.
    pub fn with_config(config: PerceptionConfig) -> Self {
        Self { config }
    }

    /// Selects declared or distance-based bonding.
    pub fn strategy(mut self, strategy: BondingStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Sets the maximum bonding distance in ångströms (inclusive).
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.config.cutoff = cutoff;
        self
    }

    /// Selects the coordinate model used for distance bonding.
    pub fn model_index(mut self, model_index: usize) -> Self {
        self.config.model_index = model_index;
        self
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// Builds the bond graph for an assembly.
    ///
    /// # Arguments
    ///
    /// * `assembly` - Assembly to wrap; ownership moves into the returned topology.
    /// * `report` - Sink for non-fatal issues.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyAssembly`] when the assembly holds no atoms and
    /// [`Error::InvalidConfig`] when the configuration fails validation.
    pub fn build(&self, assembly: Assembly, report: &mut Report) -> Result<Topology, Error> {
        let mut topology = Topology::new(assembly);
        self.rebuild(&mut topology, report)?;
        Ok(topology)
    }

    /// Recomputes the bonds of an existing topology in place.
    ///
    /// Running it twice on unchanged input yields the identical bond set.
    pub fn rebuild(&self, topology: &mut Topology, report: &mut Report) -> Result<(), Error> {
        self.config.validate()?;
        if topology.atom_count() == 0 {
            return Err(Error::empty_assembly(&topology.assembly().name));
        }
        if topology.atom_count() > self.config.max_atoms {
            report.push(Issue::OversizedAssembly {
                atoms: topology.atom_count(),
                limit: self.config.max_atoms,
            });
        }

        let bonds = match self.config.strategy {
            BondingStrategy::Declared => match collect_declared(topology.assembly()) {
                Some(pairs) => resolve_declared(topology.assembly(), &pairs, report),
                None => {
                    report.push(Issue::DeclaredBondsMissing);
                    self.distance(topology, report)
                }
            },
            BondingStrategy::Distance => self.distance(topology, report),
        };

        topology.clear_bonds();
        for bond in bonds {
            topology.add_bond(bond.a1_idx, bond.a2_idx, bond.order);
        }

        log::info!(
            "Perceived {} bonds among {} atoms ({} strategy)",
            topology.bond_count(),
            topology.atom_count(),
            self.config.strategy
        );
        Ok(())
    }

    fn distance(&self, topology: &Topology, report: &mut Report) -> Vec<Bond> {
        let atoms = topology.atoms();
        let positioned = positioned_atoms(&atoms, self.config.model_index, report);
        grid_bonds(&positioned, self.config.cutoff)
    }
}

/// Distance bonding by exhaustive pairwise comparison.
///
/// Produces the same bond set as the grid-accelerated path; atoms lacking the requested
/// model are skipped silently.
pub fn brute_force_bonds(atoms: &[&Atom], cutoff: f64, model_index: usize) -> Vec<Bond> {
    let cutoff_sq = cutoff * cutoff;
    let mut bonds = Vec::new();
    for i in 0..atoms.len() {
        let Some(pi) = atoms[i].position(model_index) else {
            continue;
        };
        for (j, other) in atoms.iter().enumerate().skip(i + 1) {
            let Some(pj) = other.position(model_index) else {
                continue;
            };
            if nalgebra::distance_squared(pi, pj) <= cutoff_sq {
                bonds.push(Bond::new(i, j, BondOrder::Single));
            }
        }
    }
    bonds
}

fn positioned_atoms(
    atoms: &[&Atom],
    model_index: usize,
    report: &mut Report,
) -> Vec<(Point, usize)> {
    let mut positioned = Vec::with_capacity(atoms.len());
    for (idx, atom) in atoms.iter().enumerate() {
        match atom.position(model_index) {
            Some(pos) => positioned.push((*pos, idx)),
            None => report.push(Issue::MissingCoordinates {
                atom: idx,
                name: atom.name.to_string(),
                model: model_index,
            }),
        }
    }
    positioned
}

fn grid_bonds(positioned: &[(Point, usize)], cutoff: f64) -> Vec<Bond> {
    if positioned.is_empty() {
        return Vec::new();
    }

    let grid = Grid::new(positioned.iter().copied(), cutoff);
    let mut bonds: Vec<Bond> = positioned
        .iter()
        .flat_map(|(pos, idx1)| {
            grid.within(pos, cutoff)
                .filter(move |idx2| *idx1 < **idx2)
                .map(move |idx2| Bond::new(*idx1, *idx2, BondOrder::Single))
        })
        .collect();

    bonds.sort_unstable();
    bonds.dedup();
    bonds
}

fn collect_declared(assembly: &Assembly) -> Option<Vec<(u32, u32)>> {
    let mut found = assembly.declared_bonds.clone();
    for child in assembly.assemblies() {
        if let Some(pairs) = collect_declared(child) {
            found.get_or_insert_with(Vec::new).extend(pairs);
        }
    }
    found
}

fn resolve_declared(assembly: &Assembly, pairs: &[(u32, u32)], report: &mut Report) -> Vec<Bond> {
    let mut by_serial: HashMap<u32, usize> = HashMap::new();
    for (idx, atom) in assembly.iter_atoms().enumerate() {
        match by_serial.entry(atom.serial) {
            Entry::Vacant(slot) => {
                slot.insert(idx);
            }
            Entry::Occupied(_) => report.push(Issue::DuplicateSerial {
                serial: atom.serial,
            }),
        }
    }

    let mut bonds = Vec::with_capacity(pairs.len());
    for &(s1, s2) in pairs {
        let resolved = [s1, s2].map(|serial| {
            let idx = by_serial.get(&serial).copied();
            if idx.is_none() {
                report.push(Issue::UnknownBondAtom { serial });
            }
            idx
        });
        if let [Some(i), Some(j)] = resolved {
            if i != j {
                bonds.push(Bond::new(i, j, BondOrder::Single));
            }
        }
    }

    bonds.sort_unstable();
    bonds.dedup();
    bonds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::residue::Residue;
    use crate::model::types::{Element, ResidueKind};
    use crate::ops::report::IssueCategory;

    fn assembly_from(atoms: Vec<Atom>) -> Assembly {
        let mut residue = Residue::new(1, "LIG", "A", ResidueKind::Hetero);
        for atom in atoms {
            residue.add_atom(atom);
        }
        std::iter::once(residue).collect()
    }

    fn carbon(name: &str, serial: u32, x: f64, y: f64, z: f64) -> Atom {
        Atom::new(name, Element::C, Point::new(x, y, z)).with_serial(serial)
    }

    fn pseudo_random_cloud(count: usize) -> Vec<Atom> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_000) as f64 / 1_000.0
        };
        (0..count)
            .map(|i| carbon(&format!("C{i}"), i as u32 + 1, next(), next(), next()))
            .collect()
    }

    #[test]
    fn distance_cutoff_is_inclusive_and_exact() {
        let assembly = assembly_from(vec![
            carbon("A", 1, 0.0, 0.0, 0.0),
            carbon("B", 2, 1.5, 0.0, 0.0),
            carbon("C", 3, 0.0, 1.7, 0.0),
        ]);
        let mut report = Report::new();

        let topology = TopologyBuilder::new()
            .strategy(BondingStrategy::Distance)
            .cutoff(1.6)
            .build(assembly, &mut report)
            .unwrap();

        assert!(topology.has_bond(0, 1));
        assert!(!topology.has_bond(0, 2));
        assert_eq!(topology.bond_count(), 1);
        assert!(report.is_empty());
    }

    #[test]
    fn bonding_is_idempotent_and_symmetric() {
        let assembly = assembly_from(pseudo_random_cloud(60));
        let builder = TopologyBuilder::new()
            .strategy(BondingStrategy::Distance)
            .cutoff(1.65);
        let mut report = Report::new();

        let mut topology = builder.build(assembly, &mut report).unwrap();
        let first: Vec<Bond> = topology.bonds().to_vec();
        builder.rebuild(&mut topology, &mut report).unwrap();

        assert_eq!(first, topology.bonds());
        for a in 0..topology.atom_count() {
            for &b in topology.neighbors(a) {
                assert!(topology.neighbors(b).contains(&a));
            }
        }
    }

    #[test]
    fn grid_matches_brute_force() {
        let assembly = assembly_from(pseudo_random_cloud(200));
        let mut report = Report::new();
        let topology = TopologyBuilder::new()
            .strategy(BondingStrategy::Distance)
            .cutoff(1.65)
            .build(assembly, &mut report)
            .unwrap();

        let expected = brute_force_bonds(&topology.atoms(), 1.65, 0);
        assert!(!expected.is_empty());
        assert_eq!(topology.bonds(), expected.as_slice());
    }

    #[test]
    fn declared_bonds_resolve_by_serial_and_report_unknown_atoms() {
        let mut assembly = assembly_from(vec![
            carbon("A", 10, 0.0, 0.0, 0.0),
            carbon("B", 20, 5.0, 0.0, 0.0),
        ]);
        assembly.declare_bond(10, 20);
        assembly.declare_bond(20, 10);
        assembly.declare_bond(20, 99);
        let mut report = Report::new();

        let topology = TopologyBuilder::new().build(assembly, &mut report).unwrap();

        assert_eq!(topology.bond_count(), 1);
        assert!(topology.has_bond(0, 1));
        assert_eq!(report.issues(), &[Issue::UnknownBondAtom { serial: 99 }]);
    }

    #[test]
    fn duplicate_serials_keep_first_occurrence() {
        let mut assembly = assembly_from(vec![
            carbon("A", 1, 0.0, 0.0, 0.0),
            carbon("B", 2, 1.0, 0.0, 0.0),
            carbon("C", 2, 2.0, 0.0, 0.0),
        ]);
        assembly.declare_bond(1, 2);
        let mut report = Report::new();

        let topology = TopologyBuilder::new().build(assembly, &mut report).unwrap();

        assert!(topology.has_bond(0, 1));
        assert!(!topology.has_bond(0, 2));
        assert_eq!(report.issues(), &[Issue::DuplicateSerial { serial: 2 }]);
    }

    #[test]
    fn oversized_assemblies_are_reported_but_still_bonded() {
        let assembly = assembly_from(vec![
            carbon("A", 1, 0.0, 0.0, 0.0),
            carbon("B", 2, 1.54, 0.0, 0.0),
            carbon("C", 3, 3.08, 0.0, 0.0),
        ]);
        let config = PerceptionConfig {
            strategy: BondingStrategy::Distance,
            max_atoms: 2,
            ..PerceptionConfig::default()
        };
        let mut report = Report::new();

        let topology = TopologyBuilder::with_config(config)
            .build(assembly, &mut report)
            .unwrap();

        assert_eq!(topology.bond_count(), 2);
        assert_eq!(
            report.issues(),
            &[Issue::OversizedAssembly { atoms: 3, limit: 2 }]
        );
    }

    #[test]
    fn declared_strategy_falls_back_to_distance() {
        let assembly = assembly_from(vec![
            carbon("A", 1, 0.0, 0.0, 0.0),
            carbon("B", 2, 1.54, 0.0, 0.0),
        ]);
        let mut report = Report::new();

        let topology = TopologyBuilder::new().build(assembly, &mut report).unwrap();

        assert!(topology.has_bond(0, 1));
        assert_eq!(report.issues(), &[Issue::DeclaredBondsMissing]);
    }

    #[test]
    fn atoms_without_requested_model_are_skipped_and_reported() {
        let mut second = carbon("B", 2, 1.5, 0.0, 0.0);
        second.push_model(Point::new(1.4, 0.0, 0.0));
        let assembly = assembly_from(vec![
            {
                let mut first = carbon("A", 1, 0.0, 0.0, 0.0);
                first.push_model(Point::new(0.0, 0.0, 0.0));
                first
            },
            second,
            carbon("C", 3, 0.0, 1.5, 0.0),
        ]);
        let mut report = Report::new();

        let topology = TopologyBuilder::new()
            .strategy(BondingStrategy::Distance)
            .model_index(1)
            .build(assembly, &mut report)
            .unwrap();

        assert!(topology.has_bond(0, 1));
        assert_eq!(topology.degree(2), 0);
        assert_eq!(report.count(IssueCategory::StructuralInput), 1);
    }

    #[test]
    fn empty_assembly_is_fatal() {
        let mut report = Report::new();
        let result = TopologyBuilder::new().build(Assembly::new("empty"), &mut report);
        assert!(matches!(result, Err(Error::EmptyAssembly { .. })));
    }

    #[test]
    fn invalid_cutoff_is_rejected() {
        let assembly = assembly_from(vec![carbon("A", 1, 0.0, 0.0, 0.0)]);
        let mut report = Report::new();
        let result = TopologyBuilder::new()
            .cutoff(0.0)
            .build(assembly, &mut report);
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn declared_bonds_are_collected_from_child_assemblies() {
        let mut root = assembly_from(vec![carbon("A", 1, 0.0, 0.0, 0.0)]);
        let mut child = assembly_from(vec![carbon("B", 2, 9.0, 0.0, 0.0)]);
        child.declare_bond(1, 2);
        root.add_assembly(child);
        let mut report = Report::new();

        let topology = TopologyBuilder::new().build(root, &mut report).unwrap();

        assert!(topology.has_bond(0, 1));
        assert!(report.is_empty());
    }
}
