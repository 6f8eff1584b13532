use crate::io::error::Error;
use crate::model::{residue::Residue, topology::Topology};
use std::io::Write;

/// Writes a topology as a single Tripos MOL2 molecule.
///
/// Atom ids are the 1-based global atom indices, substructure ids the 1-based global residue
/// indices. Untyped atoms are written with their element symbol as type.
pub fn write_topology<W: Write>(mut writer: W, topology: &Topology) -> Result<(), Error> {
    let assembly = topology.assembly();
    let residues: Vec<&Residue> = assembly.iter_residues().collect();
    let io = |e: std::io::Error| Error::from_io(e, None);

    let name = if assembly.name.is_empty() {
        "glycoforge"
    } else {
        assembly.name.as_str()
    };

    writeln!(writer, "@<TRIPOS>MOLECULE").map_err(io)?;
    writeln!(writer, "{name}").map_err(io)?;
    writeln!(
        writer,
        "{:5} {:5} {:5} 0 0",
        topology.atom_count(),
        topology.bond_count(),
        residues.len()
    )
    .map_err(io)?;
    writeln!(writer, "SMALL").map_err(io)?;
    writeln!(writer, "USER_CHARGES").map_err(io)?;
    writeln!(writer).map_err(io)?;

    writeln!(writer, "@<TRIPOS>ATOM").map_err(io)?;
    let mut atom_id = 1;
    for (res_idx, residue) in residues.iter().enumerate() {
        for atom in residue.iter_atoms() {
            let pos = atom.pos();
            writeln!(
                writer,
                "{:7} {:<8} {:10.4} {:10.4} {:10.4} {:<8} {:4} {:<8} {:10.4}",
                atom_id,
                atom.name,
                pos.x,
                pos.y,
                pos.z,
                atom.type_label(),
                res_idx + 1,
                residue.name,
                atom.charge
            )
            .map_err(io)?;
            atom_id += 1;
        }
    }

    writeln!(writer, "@<TRIPOS>BOND").map_err(io)?;
    for (bond_idx, bond) in topology.bonds().iter().enumerate() {
        writeln!(
            writer,
            "{:6} {:5} {:5} {}",
            bond_idx + 1,
            bond.a1_idx + 1,
            bond.a2_idx + 1,
            bond.order.mol2_token()
        )
        .map_err(io)?;
    }

    writeln!(writer, "@<TRIPOS>SUBSTRUCTURE").map_err(io)?;
    let offsets = topology.residue_offsets();
    for (res_idx, residue) in residues.iter().enumerate() {
        let chain = if residue.chain_id.is_empty() {
            "****"
        } else {
            residue.chain_id.as_str()
        };
        writeln!(
            writer,
            "{:6} {:<8} {:6} RESIDUE {:4} {:<4} {}",
            res_idx + 1,
            residue.name,
            offsets[res_idx] + 1,
            residue.id,
            chain,
            residue.name
        )
        .map_err(io)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::context::IoContext;
    use crate::io::mol2::reader;
    use crate::model::assembly::Assembly;
    use crate::model::atom::Atom;
    use crate::model::topology::Bond;
    use crate::model::types::{BondOrder, Element, Point, ResidueKind};
    use std::io::Cursor;

    fn methyl_glycoside() -> Topology {
        let mut sugar = Residue::new(1, "0GB", "A", ResidueKind::Hetero);
        sugar.add_atom(
            Atom::new("C1", Element::C, Point::new(0.0, 0.0, 0.0))
                .with_type("Cg")
                .with_charge(0.201),
        );
        sugar.add_atom(Atom::new("O1", Element::O, Point::new(-0.5, 1.3, 0.0)).with_type("Os"));
        let mut methyl = Residue::new(2, "OME", "A", ResidueKind::Hetero);
        methyl.add_atom(Atom::new("CH3", Element::C, Point::new(-1.9, 1.3, 0.0)));

        let assembly: Assembly = [sugar, methyl].into_iter().collect();
        Topology::with_bonds(
            assembly,
            [
                Bond::new(0, 1, BondOrder::Single),
                Bond::new(1, 2, BondOrder::Single),
            ],
        )
    }

    #[test]
    fn sections_and_counts_are_written() {
        let mut buffer = Vec::new();
        write_topology(&mut buffer, &methyl_glycoside()).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "@<TRIPOS>MOLECULE");
        assert_eq!(lines[1], "glycoforge");
        let counts: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(&counts[..3], &["3", "2", "2"]);

        let atom_line: Vec<&str> = lines[7].split_whitespace().collect();
        assert_eq!(atom_line, vec!["1", "C1", "0.0000", "0.0000", "0.0000", "Cg", "1", "0GB", "0.2010"]);

        let methyl_line: Vec<&str> = lines[9].split_whitespace().collect();
        assert_eq!(methyl_line[5], "C");
        assert_eq!(methyl_line[6], "2");
    }

    #[test]
    fn output_reads_back_with_same_connectivity() {
        let topology = methyl_glycoside();
        let mut buffer = Vec::new();
        write_topology(&mut buffer, &topology).unwrap();

        let reread = reader::read(Cursor::new(buffer), &IoContext::default()).unwrap();
        assert_eq!(reread.atom_count(), 3);
        assert_eq!(reread.residue_count(), 2);
        assert_eq!(reread.declared_bonds, Some(vec![(1, 2), (2, 3)]));

        let c1 = reread.iter_atoms().next().unwrap();
        assert_eq!(c1.type_label(), "Cg");
        assert!((c1.charge - 0.201).abs() < 1e-6);
    }
}
