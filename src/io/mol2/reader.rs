use crate::io::context::IoContext;
use crate::io::error::Error;
use crate::model::{
    assembly::Assembly,
    atom::Atom,
    residue::Residue,
    types::{Element, Point},
};
use std::collections::HashMap;
use std::io::BufRead;

const FORMAT: &str = "MOL2";

struct PendingResidue {
    id: i32,
    name: String,
    atoms: Vec<Atom>,
}

/// Reads the first molecule of a Tripos MOL2 stream into an [`Assembly`].
///
/// Atoms are grouped into residues by substructure id. Atom ids become serials and the BOND
/// section becomes the declared bond list; bonds naming unknown ids are left for the bond-graph
/// builder to report. Atom types are kept as given; the element is taken from a SYBYL type
/// prefix (`C.3`) when present and inferred from the atom name otherwise.
pub fn read<R: BufRead>(reader: R, context: &IoContext) -> Result<Assembly, Error> {
    let mut section = Section::None;
    let mut molecule_lines_seen = 0usize;
    let mut molecules_seen = 0usize;

    let mut molecule_name: Option<String> = None;
    let mut expected_atoms: Option<usize> = None;
    let mut expected_bonds: Option<usize> = None;

    let mut residues: Vec<PendingResidue> = Vec::new();
    let mut residue_lookup: HashMap<(i32, String), usize> = HashMap::new();
    let mut atom_count = 0usize;
    let mut bonds: Option<Vec<(u32, u32)>> = None;

    for (idx, line_res) in reader.lines().enumerate() {
        let line = line_res.map_err(|e| Error::from_io(e, None))?;
        let line_number = idx + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix("@<TRIPOS>") {
            section = match header {
                "MOLECULE" => {
                    molecules_seen += 1;
                    if molecules_seen > 1 {
                        log::debug!("MOL2 stream holds several molecules; reading the first");
                        break;
                    }
                    molecule_lines_seen = 0;
                    Section::Molecule
                }
                "ATOM" => Section::Atom,
                "BOND" => {
                    if bonds.is_none() {
                        bonds = Some(Vec::new());
                    }
                    Section::Bond
                }
                _ => Section::None,
            };
            continue;
        }

        match section {
            Section::Molecule => {
                molecule_lines_seen += 1;
                match molecule_lines_seen {
                    1 => molecule_name = Some(trimmed.to_string()),
                    2 => {
                        let (atoms, bonds) = parse_expected_counts(trimmed, line_number)?;
                        expected_atoms = Some(atoms);
                        expected_bonds = Some(bonds);
                    }
                    _ => {}
                }
            }
            Section::Atom => {
                let record = parse_atom_line(trimmed, line_number)?;

                let key = (record.subst_id, record.subst_name.clone());
                let res_idx = *residue_lookup.entry(key).or_insert_with(|| {
                    residues.push(PendingResidue {
                        id: record.subst_id,
                        name: residue_name(&record.subst_name, record.subst_id),
                        atoms: Vec::new(),
                    });
                    residues.len() - 1
                });
                let residue = &mut residues[res_idx];
                if residue.atoms.iter().any(|a| a.name == record.name) {
                    log::warn!(
                        "Skipping duplicate atom name '{}' in substructure {} (line {})",
                        record.name,
                        record.subst_id,
                        line_number
                    );
                    continue;
                }

                let element = if let Some((prefix, _)) = record.atom_type.split_once('.') {
                    Element::infer_from_label(prefix)
                } else {
                    Element::infer_from_label(&record.name)
                };
                residue.atoms.push(
                    Atom::new(&record.name, element, record.pos)
                        .with_serial(record.id)
                        .with_type(&record.atom_type)
                        .with_charge(record.charge),
                );
                atom_count += 1;
            }
            Section::Bond => {
                let tokens: Vec<&str> = trimmed.split_whitespace().collect();
                if tokens.len() < 4 {
                    return Err(Error::parse(
                        FORMAT,
                        None,
                        line_number,
                        "BOND record must include id, endpoints, and bond type",
                    ));
                }

                let endpoint = |token: &str, which: &str| {
                    token
                        .parse::<u32>()
                        .ok()
                        .filter(|&id| id > 0)
                        .ok_or_else(|| {
                            Error::parse(FORMAT, None, line_number, format!("Invalid {which} atom id"))
                        })
                };
                let origin = endpoint(tokens[1], "origin")?;
                let target = endpoint(tokens[2], "target")?;
                bonds.get_or_insert_with(Vec::new).push((origin, target));
            }
            Section::None => {}
        }
    }

    let name = molecule_name.ok_or_else(|| {
        Error::parse(
            FORMAT,
            None,
            0,
            "Missing @<TRIPOS>MOLECULE section with molecule name",
        )
    })?;

    if atom_count == 0 {
        return Err(Error::parse(
            FORMAT,
            None,
            0,
            "Missing or empty @<TRIPOS>ATOM section",
        ));
    }

    if let Some(expected) = expected_atoms {
        if expected != atom_count {
            return Err(Error::inconsistent_data(
                FORMAT,
                None,
                format!("Declared {expected} atoms but parsed {atom_count}"),
            ));
        }
    }

    let bond_count = bonds.as_ref().map_or(0, Vec::len);
    if let Some(expected) = expected_bonds {
        if expected != bond_count {
            return Err(Error::inconsistent_data(
                FORMAT,
                None,
                format!("Declared {expected} bonds but parsed {bond_count}"),
            ));
        }
    }

    let mut assembly = Assembly::new(&name);
    for pending in residues {
        let heavy = pending.atoms.iter().filter(|a| a.element.is_heavy_atom()).count();
        let kind = context.classify_residue(&pending.name, heavy);
        let mut residue = Residue::new(pending.id, &pending.name, "", kind);
        for atom in pending.atoms {
            residue.add_atom(atom);
        }
        assembly.add_residue(residue);
    }
    assembly.declared_bonds = bonds;

    log::debug!(
        "Read MOL2 '{}': {} residues, {} atoms, {} bonds",
        assembly.name,
        assembly.residue_count(),
        atom_count,
        bond_count
    );

    Ok(assembly)
}

enum Section {
    None,
    Molecule,
    Atom,
    Bond,
}

struct AtomLine {
    id: u32,
    name: String,
    pos: Point,
    atom_type: String,
    subst_id: i32,
    subst_name: String,
    charge: f64,
}

fn parse_atom_line(line: &str, line_number: usize) -> Result<AtomLine, Error> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(Error::parse(
            FORMAT,
            None,
            line_number,
            "ATOM record must include id, name, coordinates, and type",
        ));
    }

    let id = tokens[0]
        .parse::<u32>()
        .ok()
        .filter(|&id| id > 0)
        .ok_or_else(|| Error::parse(FORMAT, None, line_number, "Atom id must be a positive integer"))?;

    let coord = |token: &str| {
        token
            .parse::<f64>()
            .map_err(|_| Error::parse(FORMAT, None, line_number, "Invalid atom coordinate"))
    };
    let pos = Point::new(coord(tokens[2])?, coord(tokens[3])?, coord(tokens[4])?);

    let subst_id = match tokens.get(6) {
        Some(token) => token
            .parse::<i32>()
            .map_err(|_| Error::parse(FORMAT, None, line_number, "Invalid substructure id"))?,
        None => 1,
    };
    let subst_name = tokens.get(7).copied().unwrap_or("UNK").to_string();
    let charge = match tokens.get(8) {
        Some(token) => token
            .parse::<f64>()
            .map_err(|_| Error::parse(FORMAT, None, line_number, "Invalid partial charge"))?,
        None => 0.0,
    };

    Ok(AtomLine {
        id,
        name: tokens[1].to_string(),
        pos,
        atom_type: tokens[5].to_string(),
        subst_id,
        subst_name,
        charge,
    })
}

/// Strips the substructure id that many writers append to the residue name (`GLC1`).
fn residue_name(subst_name: &str, subst_id: i32) -> String {
    let suffix = subst_id.to_string();
    match subst_name.strip_suffix(suffix.as_str()) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => subst_name.to_string(),
    }
}

fn parse_expected_counts(line: &str, line_number: usize) -> Result<(usize, usize), Error> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let count = |idx: usize, what: &str| {
        fields
            .get(idx)
            .and_then(|f| f.parse::<usize>().ok())
            .ok_or_else(|| Error::parse(FORMAT, None, line_number, format!("Invalid {what} count")))
    };
    let atoms = count(0, "atom")?;
    let bonds = match fields.get(1) {
        Some(_) => count(1, "bond")?,
        None => 0,
    };
    Ok((atoms, bonds))
}
