//! AMBER parameter/topology (`prmtop`) files.
//!
//! Atom indices in the bond, angle and dihedral lists are stored as coordinate-array offsets
//! (`3 * index`). A negative third dihedral index marks a term whose 1-4 pair is skipped; a
//! negative fourth index marks an improper. Charges are scaled by [`CHARGE_FACTOR`] and
//! angles are stored in radians.

use super::{Column, Sections, integers, labels, reals, write_section};
use crate::io::context::IoContext;
use crate::io::error::Error;
use crate::model::files::{TopologyAtom, TopologyCounts, TopologyFile, TopologyResidue};
use crate::model::terms::{
    AngleTerm, AngleType, BondTerm, BondType, DihedralTerm, DihedralType, WILDCARD,
};
use crate::model::types::Element;
use smol_str::SmolStr;
use std::io::{BufRead, Write};
use std::str::FromStr;

const FORMAT: &str = "prmtop";

/// Internal charge unit: `q_amber = q_e * 18.2223`.
pub const CHARGE_FACTOR: f64 = 18.2223;

/// Writes a topology file in AMBER7 `%FLAG` layout.
pub fn write<W: Write>(mut writer: W, file: &TopologyFile) -> Result<(), Error> {
    let w = &mut writer;
    let n_atoms = file.atoms.len();

    writeln!(w, "%VERSION  VERSION_STAMP = V0001.000").map_err(|e| Error::from_io(e, None))?;
    write_section(w, "TITLE", Column::Text, &[format!("{:<80}", file.title)])?;

    let (exclusion_counts, exclusion_list) = exclusions(file);
    let pointers = [
        n_atoms,
        file.atom_types.len(),
        file.bonds_with_h.len(),
        file.bonds_without_h.len(),
        file.angles_with_h.len(),
        file.angles_without_h.len(),
        file.dihedrals_with_h.len(),
        file.dihedrals_without_h.len(),
        0,
        0,
        exclusion_list.len(),
        file.residues.len(),
        file.bonds_without_h.len(),
        file.angles_without_h.len(),
        file.dihedrals_without_h.len(),
        file.bond_types.len(),
        file.angle_types.len(),
        file.dihedral_types.len(),
        file.atom_types.len(),
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        file.counts.largest_residue,
        0,
        0,
    ];
    write_section(w, "POINTERS", Column::Integer, &integers(pointers.map(|p| p as i64)))?;

    write_section(
        w,
        "ATOM_NAME",
        Column::Text,
        &labels(file.atoms.iter().map(|a| a.name.as_str())),
    )?;
    write_section(
        w,
        "CHARGE",
        Column::Real,
        &reals(file.atoms.iter().map(|a| a.charge * CHARGE_FACTOR)),
    )?;
    write_section(
        w,
        "ATOMIC_NUMBER",
        Column::Integer,
        &integers(file.atoms.iter().map(|a| i64::from(a.element.atomic_number()))),
    )?;
    write_section(w, "MASS", Column::Real, &reals(file.atoms.iter().map(|a| a.mass)))?;
    write_section(
        w,
        "ATOM_TYPE_INDEX",
        Column::Integer,
        &integers(file.atoms.iter().map(|a| a.type_index as i64 + 1)),
    )?;
    write_section(w, "NUMBER_EXCLUDED_ATOMS", Column::Integer, &integers(exclusion_counts))?;

    write_section(
        w,
        "RESIDUE_LABEL",
        Column::Text,
        &labels(file.residues.iter().map(|r| r.label.as_str())),
    )?;
    write_section(
        w,
        "RESIDUE_POINTER",
        Column::Integer,
        &integers(file.residues.iter().map(|r| r.first_atom as i64 + 1)),
    )?;

    write_section(w, "BOND_FORCE_CONSTANT", Column::Real, &reals(file.bond_types.iter().map(|t| t.k)))?;
    write_section(w, "BOND_EQUIL_VALUE", Column::Real, &reals(file.bond_types.iter().map(|t| t.r0)))?;
    write_section(w, "ANGLE_FORCE_CONSTANT", Column::Real, &reals(file.angle_types.iter().map(|t| t.k)))?;
    write_section(
        w,
        "ANGLE_EQUIL_VALUE",
        Column::Real,
        &reals(file.angle_types.iter().map(|t| t.theta0.to_radians())),
    )?;
    write_section(
        w,
        "DIHEDRAL_FORCE_CONSTANT",
        Column::Real,
        &reals(file.dihedral_types.iter().map(|t| t.barrier)),
    )?;
    write_section(
        w,
        "DIHEDRAL_PERIODICITY",
        Column::Real,
        &reals(file.dihedral_types.iter().map(|t| t.periodicity)),
    )?;
    write_section(
        w,
        "DIHEDRAL_PHASE",
        Column::Real,
        &reals(file.dihedral_types.iter().map(|t| t.phase.to_radians())),
    )?;
    write_section(w, "SCEE_SCALE_FACTOR", Column::Real, &reals(file.dihedral_types.iter().map(|t| t.scee)))?;
    write_section(w, "SCNB_SCALE_FACTOR", Column::Real, &reals(file.dihedral_types.iter().map(|t| t.scnb)))?;

    write_section(w, "BONDS_INC_HYDROGEN", Column::Integer, &integers(bond_entries(&file.bonds_with_h)))?;
    write_section(w, "BONDS_WITHOUT_HYDROGEN", Column::Integer, &integers(bond_entries(&file.bonds_without_h)))?;
    write_section(w, "ANGLES_INC_HYDROGEN", Column::Integer, &integers(angle_entries(&file.angles_with_h)))?;
    write_section(w, "ANGLES_WITHOUT_HYDROGEN", Column::Integer, &integers(angle_entries(&file.angles_without_h)))?;
    write_section(
        w,
        "DIHEDRALS_INC_HYDROGEN",
        Column::Integer,
        &integers(dihedral_entries(&file.dihedrals_with_h)),
    )?;
    write_section(
        w,
        "DIHEDRALS_WITHOUT_HYDROGEN",
        Column::Integer,
        &integers(dihedral_entries(&file.dihedrals_without_h)),
    )?;
    write_section(w, "EXCLUDED_ATOMS_LIST", Column::Integer, &integers(exclusion_list))?;

    write_section(
        w,
        "AMBER_ATOM_TYPE",
        Column::Text,
        &labels(file.atoms.iter().map(|a| a.atom_type.as_str())),
    )?;
    write_section(
        w,
        "TREE_CHAIN_CLASSIFICATION",
        Column::Text,
        &labels(std::iter::repeat_n("BLA", n_atoms)),
    )?;

    log::debug!(
        "Wrote prmtop '{}': {} atoms, {} bonds, {} angles, {} dihedrals",
        file.title,
        n_atoms,
        file.counts.bonds(),
        file.counts.angles(),
        file.counts.dihedrals()
    );
    Ok(())
}

/// Per-atom exclusion counts and the flattened 1-based list; atoms without partners get a
/// single `0` placeholder.
fn exclusions(file: &TopologyFile) -> (Vec<i64>, Vec<i64>) {
    let mut counts = Vec::with_capacity(file.atoms.len());
    let mut list = Vec::new();
    for atom in &file.atoms {
        if atom.excluded.is_empty() {
            counts.push(1);
            list.push(0);
        } else {
            counts.push(atom.excluded.len() as i64);
            list.extend(atom.excluded.iter().map(|&j| j as i64 + 1));
        }
    }
    (counts, list)
}

fn offset(atom: usize) -> i64 {
    3 * atom as i64
}

fn bond_entries(terms: &[BondTerm]) -> Vec<i64> {
    terms
        .iter()
        .flat_map(|t| [offset(t.atoms[0]), offset(t.atoms[1]), t.type_index as i64 + 1])
        .collect()
}

fn angle_entries(terms: &[AngleTerm]) -> Vec<i64> {
    terms
        .iter()
        .flat_map(|t| {
            [
                offset(t.atoms[0]),
                offset(t.atoms[1]),
                offset(t.atoms[2]),
                t.type_index as i64 + 1,
            ]
        })
        .collect()
}

/// Sign flags cannot mark atom 0, so terms touching it in the third or fourth slot are
/// reordered: propers are reversed, impropers swap their outer first and last atoms.
fn dihedral_entries(terms: &[DihedralTerm]) -> Vec<i64> {
    terms
        .iter()
        .flat_map(|t| {
            let mut atoms = t.atoms;
            if atoms[2] == 0 || atoms[3] == 0 {
                if t.improper {
                    atoms.swap(0, 3);
                } else {
                    atoms.reverse();
                }
                if atoms[2] == 0 || atoms[3] == 0 {
                    log::warn!(
                        "Dihedral {:?} cannot carry its flags on atom 1; written unflagged",
                        t.atoms
                    );
                }
            }
            let k = if t.ignore_end { -offset(atoms[2]) } else { offset(atoms[2]) };
            let l = if t.improper { -offset(atoms[3]) } else { offset(atoms[3]) };
            [
                offset(atoms[0]),
                offset(atoms[1]),
                k,
                l,
                t.type_index as i64 + 1,
            ]
        })
        .collect()
}

/// Reads a prmtop stream back into a [`TopologyFile`].
///
/// Residue ids are the 1-based residue positions and chains are left blank, since the format
/// carries neither; residue kinds come from `context`. Type tuples are reconstructed from the
/// first instance that uses each type.
pub fn read<R: BufRead>(reader: R, context: &IoContext) -> Result<TopologyFile, Error> {
    let sections = Sections::read(reader, FORMAT)?;

    let pointers = sections.integers("POINTERS", FORMAT)?;
    if pointers.len() < 12 {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            format!("POINTERS holds {} values, expected at least 12", pointers.len()),
        ));
    }
    let n_atoms = non_negative(pointers[0], "NATOM")?;
    let n_residues = non_negative(pointers[11], "NRES")?;

    let names = sections.labels("ATOM_NAME", FORMAT)?;
    let charges = sections.reals("CHARGE", FORMAT)?;
    let masses = sections.reals("MASS", FORMAT)?;
    let type_indices = sections.integers("ATOM_TYPE_INDEX", FORMAT)?;
    let atom_type_labels = sections.labels("AMBER_ATOM_TYPE", FORMAT)?;
    let atomic_numbers = if sections.has("ATOMIC_NUMBER") {
        Some(sections.integers("ATOMIC_NUMBER", FORMAT)?)
    } else {
        None
    };
    for (flag, len) in [
        ("ATOM_NAME", names.len()),
        ("CHARGE", charges.len()),
        ("MASS", masses.len()),
        ("ATOM_TYPE_INDEX", type_indices.len()),
        ("AMBER_ATOM_TYPE", atom_type_labels.len()),
    ] {
        expect_len(flag, len, n_atoms)?;
    }

    let excluded = read_exclusions(&sections, n_atoms)?;

    let residue_labels = sections.labels("RESIDUE_LABEL", FORMAT)?;
    let residue_pointers = sections.integers("RESIDUE_POINTER", FORMAT)?;
    expect_len("RESIDUE_LABEL", residue_labels.len(), n_residues)?;
    expect_len("RESIDUE_POINTER", residue_pointers.len(), n_residues)?;

    let mut residues = Vec::with_capacity(n_residues);
    for (r, (label, &pointer)) in residue_labels.iter().zip(&residue_pointers).enumerate() {
        let first_atom = non_negative(pointer - 1, "RESIDUE_POINTER")?;
        residues.push(TopologyResidue {
            label: label.clone(),
            id: r as i32 + 1,
            chain_id: String::new(),
            kind: context.classify_residue(label, 0),
            first_atom,
        });
    }
    let atom_residue = residue_of_atoms(&residues, n_atoms);

    let mut atom_types: Vec<SmolStr> = Vec::new();
    let mut atoms = Vec::with_capacity(n_atoms);
    for i in 0..n_atoms {
        let type_index = non_negative(type_indices[i] - 1, "ATOM_TYPE_INDEX")?;
        let atom_type = SmolStr::new(&atom_type_labels[i]);
        if atom_types.len() <= type_index {
            atom_types.resize(type_index + 1, SmolStr::new(WILDCARD));
        }
        atom_types[type_index] = atom_type.clone();

        let element = match &atomic_numbers {
            Some(numbers) => Element::from_str(&numbers[i].to_string()).unwrap_or(Element::Unknown),
            None => Element::infer_from_label(&names[i]),
        };
        atoms.push(TopologyAtom {
            name: SmolStr::new(&names[i]),
            atom_type,
            type_index,
            element,
            charge: charges[i] / CHARGE_FACTOR,
            mass: masses[i],
            residue: atom_residue[i],
            excluded: excluded[i].clone(),
        });
    }

    let type_of = |atom: usize| atoms[atom].atom_type.clone();

    let bonds_with_h = read_bonds(&sections, "BONDS_INC_HYDROGEN", n_atoms)?;
    let bonds_without_h = read_bonds(&sections, "BONDS_WITHOUT_HYDROGEN", n_atoms)?;
    let angles_with_h = read_angles(&sections, "ANGLES_INC_HYDROGEN", n_atoms)?;
    let angles_without_h = read_angles(&sections, "ANGLES_WITHOUT_HYDROGEN", n_atoms)?;
    let dihedrals_with_h = read_dihedrals(&sections, "DIHEDRALS_INC_HYDROGEN", n_atoms)?;
    let dihedrals_without_h = read_dihedrals(&sections, "DIHEDRALS_WITHOUT_HYDROGEN", n_atoms)?;

    let bond_k = sections.reals("BOND_FORCE_CONSTANT", FORMAT)?;
    let bond_r0 = sections.reals("BOND_EQUIL_VALUE", FORMAT)?;
    expect_len("BOND_EQUIL_VALUE", bond_r0.len(), bond_k.len())?;
    let bond_types: Vec<BondType> = (0..bond_k.len())
        .map(|index| {
            let user = bonds_with_h.iter().chain(&bonds_without_h).find(|t| t.type_index == index);
            BondType {
                index,
                types: user.map_or_else(|| wildcards(), |t| t.atoms.map(type_of)),
                k: bond_k[index],
                r0: bond_r0[index],
                resolved: true,
            }
        })
        .collect();

    let angle_k = sections.reals("ANGLE_FORCE_CONSTANT", FORMAT)?;
    let angle_theta = sections.reals("ANGLE_EQUIL_VALUE", FORMAT)?;
    expect_len("ANGLE_EQUIL_VALUE", angle_theta.len(), angle_k.len())?;
    let angle_types: Vec<AngleType> = (0..angle_k.len())
        .map(|index| {
            let user = angles_with_h.iter().chain(&angles_without_h).find(|t| t.type_index == index);
            AngleType {
                index,
                types: user.map_or_else(|| wildcards(), |t| t.atoms.map(type_of)),
                k: angle_k[index],
                theta0: angle_theta[index].to_degrees(),
                resolved: true,
            }
        })
        .collect();

    let barriers = sections.reals("DIHEDRAL_FORCE_CONSTANT", FORMAT)?;
    let periodicities = sections.reals("DIHEDRAL_PERIODICITY", FORMAT)?;
    let phases = sections.reals("DIHEDRAL_PHASE", FORMAT)?;
    expect_len("DIHEDRAL_PERIODICITY", periodicities.len(), barriers.len())?;
    expect_len("DIHEDRAL_PHASE", phases.len(), barriers.len())?;
    let scale = |flag: &str, default: f64| -> Result<Vec<f64>, Error> {
        if sections.has(flag) {
            let values = sections.reals(flag, FORMAT)?;
            expect_len(flag, values.len(), barriers.len())?;
            Ok(values)
        } else {
            Ok(vec![default; barriers.len()])
        }
    };
    let scee = scale("SCEE_SCALE_FACTOR", 1.2)?;
    let scnb = scale("SCNB_SCALE_FACTOR", 2.0)?;
    let dihedral_types: Vec<DihedralType> = (0..barriers.len())
        .map(|index| {
            let user = dihedrals_with_h
                .iter()
                .chain(&dihedrals_without_h)
                .find(|t| t.type_index == index);
            DihedralType {
                index,
                types: user.map_or_else(|| wildcards(), |t| t.atoms.map(type_of)),
                barrier: barriers[index],
                periodicity: periodicities[index],
                phase: phases[index].to_degrees(),
                scee: scee[index],
                scnb: scnb[index],
                improper: user.is_some_and(|t| t.improper),
                resolved: true,
            }
        })
        .collect();

    let counts = TopologyCounts {
        atoms: n_atoms,
        atom_types: atom_types.len(),
        bonds_with_h: bonds_with_h.len(),
        bonds_without_h: bonds_without_h.len(),
        angles_with_h: angles_with_h.len(),
        angles_without_h: angles_without_h.len(),
        dihedrals_with_h: dihedrals_with_h.len(),
        dihedrals_without_h: dihedrals_without_h.len(),
        excluded_atoms: excluded.iter().map(Vec::len).sum(),
        residues: n_residues,
        bond_types: bond_types.len(),
        angle_types: angle_types.len(),
        dihedral_types: dihedral_types.len(),
        largest_residue: largest_residue(&residues, n_atoms),
    };

    Ok(TopologyFile {
        title: sections.title(),
        atoms,
        residues,
        atom_types,
        bond_types,
        angle_types,
        dihedral_types,
        bonds_with_h,
        bonds_without_h,
        angles_with_h,
        angles_without_h,
        dihedrals_with_h,
        dihedrals_without_h,
        counts,
    })
}

fn wildcards<const N: usize>() -> [SmolStr; N] {
    std::array::from_fn(|_| SmolStr::new(WILDCARD))
}

fn non_negative(value: i64, what: &str) -> Result<usize, Error> {
    usize::try_from(value)
        .map_err(|_| Error::inconsistent_data(FORMAT, None, format!("negative {what} value {value}")))
}

fn expect_len(flag: &str, found: usize, expected: usize) -> Result<(), Error> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::inconsistent_data(
            FORMAT,
            None,
            format!("{flag} holds {found} values, expected {expected}"),
        ))
    }
}

fn read_exclusions(sections: &Sections, n_atoms: usize) -> Result<Vec<Vec<usize>>, Error> {
    let counts = sections.integers("NUMBER_EXCLUDED_ATOMS", FORMAT)?;
    let list = sections.integers("EXCLUDED_ATOMS_LIST", FORMAT)?;
    expect_len("NUMBER_EXCLUDED_ATOMS", counts.len(), n_atoms)?;

    let mut cursor = 0;
    let mut excluded = Vec::with_capacity(n_atoms);
    for &count in &counts {
        let count = non_negative(count, "NUMBER_EXCLUDED_ATOMS")?;
        let slice = list.get(cursor..cursor + count).ok_or_else(|| {
            Error::inconsistent_data(FORMAT, None, "EXCLUDED_ATOMS_LIST is shorter than its counts")
        })?;
        excluded.push(
            slice
                .iter()
                .filter(|&&j| j > 0)
                .map(|&j| j as usize - 1)
                .collect(),
        );
        cursor += count;
    }
    Ok(excluded)
}

fn residue_of_atoms(residues: &[TopologyResidue], n_atoms: usize) -> Vec<usize> {
    let mut owner = vec![0; n_atoms];
    for (r, residue) in residues.iter().enumerate() {
        let end = residues.get(r + 1).map_or(n_atoms, |next| next.first_atom);
        for slot in owner.iter_mut().take(end.min(n_atoms)).skip(residue.first_atom) {
            *slot = r;
        }
    }
    owner
}

fn largest_residue(residues: &[TopologyResidue], n_atoms: usize) -> usize {
    residues
        .iter()
        .enumerate()
        .map(|(r, residue)| {
            let end = residues.get(r + 1).map_or(n_atoms, |next| next.first_atom);
            end.saturating_sub(residue.first_atom)
        })
        .max()
        .unwrap_or(0)
}

fn atom_index(raw: i64, n_atoms: usize, flag: &str) -> Result<usize, Error> {
    let raw = raw.unsigned_abs() as usize;
    if raw % 3 != 0 || raw / 3 >= n_atoms {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            format!("{flag} references invalid coordinate offset {raw}"),
        ));
    }
    Ok(raw / 3)
}

fn type_index(raw: i64, flag: &str) -> Result<usize, Error> {
    non_negative(raw - 1, flag)
}

fn records<'a>(
    values: &'a [i64],
    width: usize,
    flag: &str,
) -> Result<std::slice::ChunksExact<'a, i64>, Error> {
    if values.len() % width != 0 {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            format!("{flag} length {} is not a multiple of {width}", values.len()),
        ));
    }
    Ok(values.chunks_exact(width))
}

fn read_bonds(sections: &Sections, flag: &str, n_atoms: usize) -> Result<Vec<BondTerm>, Error> {
    let values = sections.integers(flag, FORMAT)?;
    records(&values, 3, flag)?
        .map(|r| {
            Ok(BondTerm {
                atoms: [atom_index(r[0], n_atoms, flag)?, atom_index(r[1], n_atoms, flag)?],
                type_index: type_index(r[2], flag)?,
            })
        })
        .collect()
}

fn read_angles(sections: &Sections, flag: &str, n_atoms: usize) -> Result<Vec<AngleTerm>, Error> {
    let values = sections.integers(flag, FORMAT)?;
    records(&values, 4, flag)?
        .map(|r| {
            Ok(AngleTerm {
                atoms: [
                    atom_index(r[0], n_atoms, flag)?,
                    atom_index(r[1], n_atoms, flag)?,
                    atom_index(r[2], n_atoms, flag)?,
                ],
                type_index: type_index(r[3], flag)?,
            })
        })
        .collect()
}

fn read_dihedrals(
    sections: &Sections,
    flag: &str,
    n_atoms: usize,
) -> Result<Vec<DihedralTerm>, Error> {
    let values = sections.integers(flag, FORMAT)?;
    records(&values, 5, flag)?
        .map(|r| {
            Ok(DihedralTerm {
                atoms: [
                    atom_index(r[0], n_atoms, flag)?,
                    atom_index(r[1], n_atoms, flag)?,
                    atom_index(r[2], n_atoms, flag)?,
                    atom_index(r[3], n_atoms, flag)?,
                ],
                type_index: type_index(r[4], flag)?,
                improper: r[3] < 0,
                ignore_end: r[2] < 0,
            })
        })
        .collect()
}
