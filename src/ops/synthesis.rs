//! Assembly of output file structures from a bond graph and its type tables.
//!
//! Each `build_*` function maps the graph onto one target layout without further analysis.
//! The reverse direction, [`topology_from_files`] and [`topology_from_library`], rebuilds a
//! [`Topology`] from those structures so a synthesized file can be read back and re-typed.

use crate::model::{
    assembly::Assembly,
    atom::Atom,
    files::{
        CoordinateFile, LibraryAtom, LibraryFile, LibraryResidue, PrepAtom, PrepFile,
        PrepResidue, TopologicalType, TopologyAtom, TopologyFile, TopologyResidue,
    },
    parameters::ParameterTable,
    residue::Residue,
    terms::TypeTables,
    topology::{Bond, Topology},
    types::{BondOrder, Point},
};
use crate::ops::error::Error;
use crate::ops::report::{Issue, Report};
use crate::ops::typing::count_terms;
use smol_str::SmolStr;

/// Topology file for `topology` using previously extracted `tables`.
///
/// Masses come from the parameter table when it lists the atom type, otherwise from the
/// element.
pub fn build_topology_file(
    topology: &Topology,
    tables: &TypeTables,
    params: &ParameterTable,
    title: &str,
) -> TopologyFile {
    let offsets = topology.residue_offsets();
    let residues: Vec<TopologyResidue> = topology
        .assembly()
        .iter_residues()
        .zip(&offsets)
        .map(|(residue, &first_atom)| TopologyResidue {
            label: residue.name.clone(),
            id: residue.id,
            chain_id: residue.chain_id.clone(),
            kind: residue.kind,
            first_atom,
        })
        .collect();

    let atoms: Vec<TopologyAtom> = topology
        .assembly()
        .iter_atoms()
        .enumerate()
        .map(|(idx, atom)| {
            let type_index = tables.atom_type_indices.get(idx).copied().unwrap_or(0);
            let atom_type = tables
                .atom_type(idx)
                .cloned()
                .unwrap_or_else(|| SmolStr::new(atom.type_label()));
            TopologyAtom {
                name: atom.name.clone(),
                mass: params
                    .mass(&atom_type)
                    .unwrap_or_else(|| atom.element.atomic_mass()),
                atom_type,
                type_index,
                element: atom.element,
                charge: atom.charge,
                residue: topology.residue_index_of(idx),
                excluded: tables.excluded.get(idx).cloned().unwrap_or_default(),
            }
        })
        .collect();

    let (bonds_with_h, bonds_without_h) = tables
        .bonds
        .iter()
        .copied()
        .partition(|t| topology.involves_hydrogen(&t.atoms));
    let (angles_with_h, angles_without_h) = tables
        .angles
        .iter()
        .copied()
        .partition(|t| topology.involves_hydrogen(&t.atoms));
    let (dihedrals_with_h, dihedrals_without_h) = tables
        .dihedrals
        .iter()
        .copied()
        .partition(|t| topology.involves_hydrogen(&t.atoms));

    TopologyFile {
        title: title.to_string(),
        atoms,
        residues,
        atom_types: tables.atom_types.clone(),
        bond_types: tables.bond_types.clone(),
        angle_types: tables.angle_types.clone(),
        dihedral_types: tables.dihedral_types.clone(),
        bonds_with_h,
        bonds_without_h,
        angles_with_h,
        angles_without_h,
        dihedrals_with_h,
        dihedrals_without_h,
        counts: count_terms(topology, tables),
    }
}

/// Coordinates of one model; atoms lacking that model fall back to their primary position.
pub fn build_coordinate_file(
    topology: &Topology,
    model_index: usize,
    title: &str,
    report: &mut Report,
) -> CoordinateFile {
    let positions = topology
        .assembly()
        .iter_atoms()
        .enumerate()
        .map(|(idx, atom)| match atom.position(model_index) {
            Some(pos) => *pos,
            None => {
                report.push(Issue::MissingCoordinates {
                    atom: idx,
                    name: atom.name.to_string(),
                    model: model_index,
                });
                *atom.pos()
            }
        })
        .collect();

    CoordinateFile {
        title: title.to_string(),
        positions,
        box_dimensions: topology.assembly().box_vectors.map(box_dimensions),
    }
}

/// Lengths and angles (degrees) of a box given by its three edge vectors.
fn box_dimensions(vectors: [[f64; 3]; 3]) -> [f64; 6] {
    let [a, b, c] = vectors.map(nalgebra::Vector3::from);
    let angle = |u: &nalgebra::Vector3<f64>, v: &nalgebra::Vector3<f64>| u.angle(v).to_degrees();
    [
        a.norm(),
        b.norm(),
        c.norm(),
        angle(&b, &c),
        angle(&a, &c),
        angle(&a, &b),
    ]
}

/// Residue library with intra-residue connectivity and head/tail atoms.
///
/// The head is the first atom bonded to the preceding residue, the tail the first atom bonded
/// to the following one; every other cross-residue bond is kept in [`LibraryFile::links`].
pub fn build_library_file(topology: &Topology) -> LibraryFile {
    let offsets = topology.residue_offsets();
    let locate = |atom: usize| {
        let residue = topology.residue_index_of(atom);
        (residue, atom - offsets[residue])
    };

    let mut residues: Vec<LibraryResidue> = topology
        .assembly()
        .iter_residues()
        .map(|residue| LibraryResidue {
            name: residue.name.clone(),
            id: residue.id,
            chain_id: residue.chain_id.clone(),
            kind: residue.kind,
            atoms: residue
                .iter_atoms()
                .map(|atom| LibraryAtom {
                    name: atom.name.clone(),
                    atom_type: SmolStr::new(atom.type_label()),
                    element: atom.element,
                    charge: atom.charge,
                    position: *atom.pos(),
                })
                .collect(),
            connections: Vec::new(),
            head: None,
            tail: None,
        })
        .collect();

    let mut links = Vec::new();
    for bond in topology.bonds() {
        let (r1, l1) = locate(bond.a1_idx);
        let (r2, l2) = locate(bond.a2_idx);
        if r1 == r2 {
            residues[r1].connections.push((l1.min(l2), l1.max(l2)));
        } else {
            let (low, high) = if r1 < r2 { ((r1, l1), (r2, l2)) } else { ((r2, l2), (r1, l1)) };
            if high.0 == low.0 + 1 {
                residues[low.0].tail.get_or_insert(low.1);
                residues[high.0].head.get_or_insert(high.1);
            }
            links.push((low, high));
        }
    }

    LibraryFile { residues, links }
}

/// Prep-style residue trees rooted at each residue's head atom.
pub fn build_prep_file(topology: &Topology, tables: &TypeTables) -> PrepFile {
    let library = build_library_file(topology);
    let offsets = topology.residue_offsets();

    let residues = library
        .residues
        .iter()
        .enumerate()
        .map(|(r, residue)| {
            let base = offsets[r];
            let impropers = tables
                .dihedrals
                .iter()
                .filter(|d| d.improper && topology.residue_index_of(d.atoms[2]) == r)
                .map(|d| d.atoms.map(|a| topology.atom(a).name.clone()))
                .collect();
            prep_residue(residue, base, topology, impropers)
        })
        .collect();

    PrepFile { residues }
}

fn prep_residue(
    residue: &LibraryResidue,
    base: usize,
    topology: &Topology,
    impropers: Vec<[SmolStr; 4]>,
) -> PrepResidue {
    let n = residue.atoms.len();
    let mut adjacency = vec![Vec::new(); n];
    for &(a, b) in &residue.connections {
        adjacency[a].push(b);
        adjacency[b].push(a);
    }

    // Depth-first spanning trees; disconnected fragments start new roots.
    let root = residue.head.unwrap_or(0);
    let mut order = Vec::with_capacity(n);
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let mut seen = vec![false; n];
    let starts = std::iter::once(root).chain(0..n);
    for start in starts {
        if n == 0 || seen[start] {
            continue;
        }
        let mut stack = vec![start];
        seen[start] = true;
        while let Some(atom) = stack.pop() {
            order.push(atom);
            for &next in adjacency[atom].iter().rev() {
                if !seen[next] {
                    seen[next] = true;
                    parent[next] = Some(atom);
                    stack.push(next);
                }
            }
        }
    }

    // Head-to-tail path; a residue without a tail keeps only its root on the main chain.
    let mut main_chain = vec![false; n];
    match residue.tail {
        Some(tail) => {
            let mut cursor = Some(tail);
            while let Some(atom) = cursor {
                main_chain[atom] = true;
                cursor = parent[atom];
            }
        }
        None if n > 0 => main_chain[root] = true,
        None => {}
    }

    let mut loops = Vec::new();
    for &(a, b) in &residue.connections {
        if parent[a] != Some(b) && parent[b] != Some(a) {
            loops.push((a, b));
        }
    }

    let position_in_order: Vec<usize> = {
        let mut slots = vec![0; n];
        for (slot, &atom) in order.iter().enumerate() {
            slots[atom] = slot;
        }
        slots
    };
    let point = |local: usize| *topology.atom(base + local).pos();

    let atoms = order
        .iter()
        .map(|&atom| {
            let children = parent.iter().filter(|&&p| p == Some(atom)).count();
            let topological_type = if main_chain[atom] {
                TopologicalType::Main
            } else {
                TopologicalType::from_children(children)
            };
            let p = parent[atom];
            let gp = p.and_then(|p| parent[p]);
            let ggp = gp.and_then(|gp| parent[gp]);
            let library_atom = &residue.atoms[atom];
            PrepAtom {
                name: library_atom.name.clone(),
                atom_type: library_atom.atom_type.clone(),
                topological_type,
                parent: p.map(|p| position_in_order[p]),
                bond_length: p.map_or(0.0, |p| nalgebra::distance(&point(atom), &point(p))),
                bond_angle: match (p, gp) {
                    (Some(p), Some(gp)) => bond_angle(&point(atom), &point(p), &point(gp)),
                    _ => 0.0,
                },
                dihedral: match (p, gp, ggp) {
                    (Some(p), Some(gp), Some(ggp)) => {
                        dihedral_angle(&point(atom), &point(p), &point(gp), &point(ggp))
                    }
                    _ => 0.0,
                },
                charge: library_atom.charge,
            }
        })
        .collect();

    PrepResidue {
        name: residue.name.clone(),
        atoms,
        loops: loops
            .into_iter()
            .map(|(a, b)| (position_in_order[a], position_in_order[b]))
            .collect(),
        impropers,
    }
}

/// Angle a-b-c in degrees.
fn bond_angle(a: &Point, b: &Point, c: &Point) -> f64 {
    (a - b).angle(&(c - b)).to_degrees()
}

/// Torsion a-b-c-d in degrees, in `(-180, 180]`.
fn dihedral_angle(a: &Point, b: &Point, c: &Point, d: &Point) -> f64 {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let m1 = n1.cross(&b2.normalize());
    let x = n1.dot(&n2);
    let y = m1.dot(&n2);
    -y.atan2(x).to_degrees()
}

/// Rebuilds a bond graph from a topology file and, optionally, its coordinates.
///
/// Atoms without coordinates are placed at the origin.
///
/// # Errors
///
/// Returns [`Error::EmptyAssembly`] for a file without atoms and [`Error::MalformedFile`] when
/// coordinates, residue pointers or bond indices do not match the atom list.
pub fn topology_from_files(
    file: &TopologyFile,
    coordinates: Option<&CoordinateFile>,
) -> Result<Topology, Error> {
    if file.atoms.is_empty() {
        return Err(Error::empty_assembly(&file.title));
    }
    if let Some(coordinates) = coordinates {
        if coordinates.positions.len() != file.atoms.len() {
            return Err(Error::malformed_file(
                "coordinate",
                format!(
                    "{} positions for {} atoms",
                    coordinates.positions.len(),
                    file.atoms.len()
                ),
            ));
        }
    }

    let mut assembly = Assembly::new(&file.title);
    for (r, record) in file.residues.iter().enumerate() {
        let range = file
            .residue_range(r)
            .filter(|range| range.start <= range.end && range.end <= file.atoms.len())
            .ok_or_else(|| {
                Error::malformed_file("topology", format!("bad pointer for residue {}", r + 1))
            })?;

        let mut residue = Residue::new(record.id, &record.label, &record.chain_id, record.kind);
        for idx in range {
            let source = &file.atoms[idx];
            let position = coordinates
                .map(|c| c.positions[idx])
                .unwrap_or_else(Point::origin);
            let atom = Atom::new(&source.name, source.element, position)
                .with_serial(idx as u32 + 1)
                .with_type(&source.atom_type)
                .with_charge(source.charge);
            residue.add_atom(atom);
        }
        assembly.add_residue(residue);
    }
    if assembly.atom_count() != file.atoms.len() {
        return Err(Error::malformed_file(
            "topology",
            "residue pointers do not cover every atom",
        ));
    }

    let n = file.atoms.len();
    let mut bonds = Vec::with_capacity(file.counts.bonds());
    for term in file.bonds() {
        let [a, b] = term.atoms;
        if a >= n || b >= n {
            return Err(Error::malformed_file(
                "topology",
                format!("bond {}-{} references a missing atom", a + 1, b + 1),
            ));
        }
        bonds.push(Bond::new(a, b, BondOrder::Single));
    }

    log::debug!(
        "Re-imported {} atoms and {} bonds from topology '{}'",
        n,
        bonds.len(),
        file.title
    );
    Ok(Topology::with_bonds(assembly, bonds))
}

/// Rebuilds a bond graph from a residue library.
///
/// # Errors
///
/// Returns [`Error::EmptyAssembly`] for an empty library and [`Error::MalformedFile`] when a
/// connection names an atom the residue does not have.
pub fn topology_from_library(library: &LibraryFile, name: &str) -> Result<Topology, Error> {
    if library.atom_count() == 0 {
        return Err(Error::empty_assembly(name));
    }

    let mut assembly = Assembly::new(name);
    let mut offsets = Vec::with_capacity(library.residues.len());
    let mut bonds = Vec::new();
    let mut serial = 1;

    for record in &library.residues {
        let base = assembly.atom_count();
        offsets.push(base);
        let mut residue = Residue::new(record.id, &record.name, &record.chain_id, record.kind);
        for source in &record.atoms {
            residue.add_atom(
                Atom::new(&source.name, source.element, source.position)
                    .with_serial(serial)
                    .with_type(&source.atom_type)
                    .with_charge(source.charge),
            );
            serial += 1;
        }
        for &(a, b) in &record.connections {
            if a >= record.atoms.len() || b >= record.atoms.len() {
                return Err(Error::malformed_file(
                    "library",
                    format!("connection {}-{} outside residue {}", a, b, record.name),
                ));
            }
            bonds.push(Bond::new(base + a, base + b, BondOrder::Single));
        }
        assembly.add_residue(residue);
    }

    for &((r1, l1), (r2, l2)) in &library.links {
        let resolve = |r: usize, l: usize| {
            library
                .residues
                .get(r)
                .filter(|res| l < res.atoms.len())
                .map(|_| offsets[r] + l)
        };
        match (resolve(r1, l1), resolve(r2, l2)) {
            (Some(a), Some(b)) => bonds.push(Bond::new(a, b, BondOrder::Single)),
            _ => {
                return Err(Error::malformed_file(
                    "library",
                    format!("link ({r1}, {l1})-({r2}, {l2}) references a missing atom"),
                ));
            }
        }
    }

    Ok(Topology::with_bonds(assembly, bonds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Element::*;
    use crate::ops::testing::{assemble, graph, ring_sugar};
    use crate::ops::typing::extract_types;

    const PARAMS: &str = r#"
        [[bonds]]
        types = ["C", "O"]
        k = 320.0
        r0 = 1.41

        [[angles]]
        types = ["C", "C", "O"]
        k = 50.0
        theta0 = 109.5

        [[dihedrals]]
        types = ["X", "C", "C", "X"]
        terms = [
            { barrier = 0.16, periodicity = 3.0 },
            { barrier = 0.25, periodicity = 1.0 },
        ]

        [[masses]]
        type = "C"
        mass = 12.01
    "#;

    fn glucose() -> Topology {
        let piece = ring_sugar("GLC", 1, 6, &[true, false, true, false, true], true);
        let methyl = ring_sugar("GLC", 2, 6, &[true, false, true, false, true], true).shifted(8.0);
        assemble(vec![piece, methyl], &[((0, "O4"), (1, "C1"))])
    }

    #[test]
    fn topology_file_round_trip_preserves_counts() {
        let topology = glucose();
        let params = ParameterTable::from_toml_str(PARAMS).unwrap();
        let mut report = Report::new();
        let tables = extract_types(&topology, &params, &mut report);
        let file = build_topology_file(&topology, &tables, &params, "maltose");
        let coordinates = build_coordinate_file(&topology, 0, "maltose", &mut report);

        let reimported = topology_from_files(&file, Some(&coordinates)).unwrap();
        let mut second = Report::new();
        let retyped = extract_types(&reimported, &params, &mut second);
        let counts = count_terms(&reimported, &retyped);

        assert_eq!(reimported.atom_count(), topology.atom_count());
        assert_eq!(reimported.bond_count(), topology.bond_count());
        assert_eq!(counts, file.counts);
        assert_eq!(retyped.bond_types.len(), tables.bond_types.len());
        assert_eq!(retyped.dihedral_types.len(), tables.dihedral_types.len());
        assert_eq!(reimported.atom(3).pos(), topology.atom(3).pos());
        assert_eq!(reimported.residue_of(20).name, "GLC");
    }

    #[test]
    fn topology_file_maps_atoms_and_masses() {
        let topology = glucose();
        let params = ParameterTable::from_toml_str(PARAMS).unwrap();
        let mut report = Report::new();
        let tables = extract_types(&topology, &params, &mut report);
        let file = build_topology_file(&topology, &tables, &params, "maltose");

        assert_eq!(file.atoms.len(), 24);
        assert_eq!(file.residues.len(), 2);
        assert_eq!(file.residues[1].first_atom, 12);
        assert_eq!(file.atoms[0].atom_type, "C");
        assert!((file.atoms[0].mass - 12.01).abs() < 1e-6);
        assert!((file.atoms[5].mass - O.atomic_mass()).abs() < 1e-6);
        assert_eq!(file.counts.atoms, 24);
        assert_eq!(file.counts.bonds(), topology.bond_count());
        assert!(file.dihedrals().filter(|d| d.ignore_end).count() > 0);
    }

    #[test]
    fn library_round_trip_keeps_links() {
        let topology = glucose();
        let library = build_library_file(&topology);

        assert_eq!(library.residues.len(), 2);
        assert_eq!(library.links.len(), 1);
        assert_eq!(library.residues[0].tail, Some(9));
        assert_eq!(library.residues[1].head, Some(0));
        assert_eq!(library.bond_count(), topology.bond_count());

        let reimported = topology_from_library(&library, "maltose").unwrap();
        assert_eq!(reimported.atom_count(), topology.atom_count());
        assert_eq!(reimported.bond_count(), topology.bond_count());
        assert!(reimported.has_bond(9, 12));
    }

    #[test]
    fn prep_tree_marks_main_chain_and_ring_closures() {
        let topology = glucose();
        let mut report = Report::new();
        let tables = extract_types(&topology, &ParameterTable::default(), &mut report);
        let prep = build_prep_file(&topology, &tables);

        let first = &prep.residues[0];
        assert_eq!(first.atoms.len(), 12);
        assert_eq!(first.atoms[0].name, "C1");
        assert!(first.atoms[0].parent.is_none());
        // One ring closure per residue.
        assert_eq!(first.loops.len(), 1);
        // C1 through O4 runs along the main chain to the tail.
        let o4 = first.atoms.iter().find(|a| a.name == "O4").unwrap();
        assert_eq!(o4.topological_type, TopologicalType::Main);
        let o6 = first.atoms.iter().find(|a| a.name == "O6").unwrap();
        assert_eq!(o6.topological_type, TopologicalType::End);
        assert!((o6.bond_length - 1.25f64.sqrt()).abs() < 1e-6);

        let second = &prep.residues[1];
        assert_eq!(second.atoms[0].name, "C1");
    }

    #[test]
    fn prep_residue_without_tail_keeps_only_its_root_on_the_main_chain() {
        let topology = glucose();
        let mut report = Report::new();
        let tables = extract_types(&topology, &ParameterTable::default(), &mut report);
        let prep = build_prep_file(&topology, &tables);

        let second = &prep.residues[1];
        assert_eq!(second.atoms[0].topological_type, TopologicalType::Main);
        assert_eq!(
            second
                .atoms
                .iter()
                .filter(|a| a.topological_type == TopologicalType::Main)
                .count(),
            1
        );
    }

    #[test]
    fn mismatched_coordinates_are_rejected() {
        let topology = graph(&[C, O], &[(0, 1)]);
        let mut report = Report::new();
        let tables = extract_types(&topology, &ParameterTable::default(), &mut report);
        let file = build_topology_file(&topology, &tables, &ParameterTable::default(), "t");
        let coordinates = CoordinateFile {
            positions: vec![Point::origin()],
            ..Default::default()
        };

        let result = topology_from_files(&file, Some(&coordinates));
        assert!(matches!(result, Err(Error::MalformedFile { .. })));
        assert!(matches!(
            topology_from_files(&TopologyFile::default(), None),
            Err(Error::EmptyAssembly { .. })
        ));
    }

    #[test]
    fn geometry_helpers() {
        let a = Point::new(1.0, 0.0, 0.0);
        let b = Point::origin();
        let c = Point::new(0.0, 1.0, 0.0);
        let d = Point::new(0.0, 1.0, 1.0);
        assert!((bond_angle(&a, &b, &c) - 90.0).abs() < 1e-6);
        assert!((dihedral_angle(&a, &b, &c, &d).abs() - 90.0).abs() < 1e-6);

        let dims = box_dimensions([[10.0, 0.0, 0.0], [0.0, 20.0, 0.0], [0.0, 0.0, 30.0]]);
        assert!((dims[1] - 20.0).abs() < 1e-6);
        assert!((dims[3] - 90.0).abs() < 1e-6);
    }
}
