use crate::io::context::IoContext;
use crate::io::error::Error;
use crate::model::{
    assembly::Assembly,
    atom::Atom,
    residue::Residue,
    types::{Element, Point},
};
use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::str::FromStr;

const FORMAT: &str = "PDB";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResKey {
    chain_id: String,
    res_seq: i32,
    i_code: Option<char>,
}

struct PendingResidue {
    key: ResKey,
    name: String,
    atoms: Vec<(f64, Atom)>,
}

struct AtomRecord {
    serial: Option<u32>,
    name: String,
    res_name: String,
    key: ResKey,
    pos: Point,
    occupancy: f64,
    element: Element,
}

/// Reads ATOM/HETATM, MODEL/ENDMDL, CONECT and CRYST1 records into an [`Assembly`].
///
/// Residues keep their order of first appearance and atoms keep file order. The first model
/// defines the atom set; every later model appends coordinates to the atoms it names.
/// Alternate locations collapse onto the highest-occupancy record. `CONECT` records become
/// declared bonds keyed by serial; a file without them leaves `declared_bonds` unset.
pub fn read<R: BufRead>(reader: R, context: &IoContext) -> Result<Assembly, Error> {
    let mut assembly = Assembly::new("");

    let mut residues: Vec<PendingResidue> = Vec::new();
    let mut lookup: HashMap<ResKey, usize> = HashMap::new();
    let mut bonds: BTreeSet<(u32, u32)> = BTreeSet::new();
    let mut model_index = 0usize;
    let mut next_serial = 1u32;

    for (idx, line) in reader.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.map_err(|e| Error::from_io(e, None))?;

        if line.starts_with("HEADER") || line.starts_with("TITLE ") {
            if assembly.name.is_empty() {
                assembly.name = field(&line, 10, 80).to_string();
            }
        } else if line.starts_with("CRYST1") {
            assembly.box_vectors = Some(parse_cryst1(&line, line_num)?);
        } else if line.starts_with("ENDMDL") {
            model_index += 1;
        } else if line.starts_with("CONECT") {
            parse_conect(&line, line_num, &mut bonds)?;
        } else if line.starts_with("ATOM  ") || line.starts_with("HETATM") {
            let record = parse_atom_record(&line, line_num)?;
            let serial = record.serial.unwrap_or(next_serial);
            next_serial = serial.saturating_add(1);

            if model_index == 0 {
                add_first_model_atom(record, serial, &mut residues, &mut lookup);
            } else {
                extend_model(record, model_index, &mut residues, &lookup);
            }
        }
    }

    for pending in residues {
        let atoms: Vec<Atom> = pending.atoms.into_iter().map(|(_, atom)| atom).collect();
        let heavy = atoms.iter().filter(|a| a.element.is_heavy_atom()).count();
        let kind = context.classify_residue(&pending.name, heavy);

        let mut residue = Residue::new(
            pending.key.res_seq,
            &pending.name,
            &pending.key.chain_id,
            kind,
        );
        residue.insertion_code = pending.key.i_code;
        for atom in atoms {
            residue.add_atom(atom);
        }
        assembly.add_residue(residue);
    }

    for (a, b) in bonds {
        assembly.declare_bond(a, b);
    }

    log::debug!(
        "Read PDB: {} residues, {} atoms, {} models, {} declared bonds",
        assembly.residue_count(),
        assembly.atom_count(),
        model_index.max(1),
        assembly.declared_bonds.as_ref().map_or(0, Vec::len)
    );

    Ok(assembly)
}

fn field(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start..end).unwrap_or("").trim()
}

fn parse_atom_record(line: &str, line_num: usize) -> Result<AtomRecord, Error> {
    if line.len() < 54 {
        return Err(Error::parse(FORMAT, None, line_num, "Atom record too short"));
    }

    let name = field(line, 12, 16).to_string();
    let res_name = field(line, 17, 21).to_string();
    let chain_id = field(line, 21, 22).to_string();
    let i_code = field(line, 26, 27).chars().next();

    let res_seq = field(line, 22, 26)
        .parse::<i32>()
        .map_err(|_| Error::parse(FORMAT, None, line_num, "Invalid residue sequence number"))?;

    let coord = |start: usize, axis: &str| {
        field(line, start, start + 8)
            .parse::<f64>()
            .map_err(|_| Error::parse(FORMAT, None, line_num, format!("Invalid {axis} coordinate")))
    };
    let pos = Point::new(coord(30, "X")?, coord(38, "Y")?, coord(46, "Z")?);

    let occupancy = field(line, 54, 60).parse::<f64>().unwrap_or(1.0);

    let symbol = field(line, 76, 78);
    let element = match Element::from_str(symbol) {
        Ok(element) if !symbol.is_empty() && element != Element::Unknown => element,
        _ => Element::infer_from_label(&name),
    };

    Ok(AtomRecord {
        serial: field(line, 6, 11).parse::<u32>().ok(),
        name,
        res_name,
        key: ResKey {
            chain_id,
            res_seq,
            i_code,
        },
        pos,
        occupancy,
        element,
    })
}

fn add_first_model_atom(
    record: AtomRecord,
    serial: u32,
    residues: &mut Vec<PendingResidue>,
    lookup: &mut HashMap<ResKey, usize>,
) {
    let res_idx = *lookup.entry(record.key.clone()).or_insert_with(|| {
        residues.push(PendingResidue {
            key: record.key.clone(),
            name: record.res_name.clone(),
            atoms: Vec::new(),
        });
        residues.len() - 1
    });
    let pending = &mut residues[res_idx];

    let atom = Atom::new(&record.name, record.element, record.pos).with_serial(serial);
    match pending.atoms.iter_mut().find(|(_, a)| a.name == record.name) {
        Some(slot) => {
            if record.occupancy > slot.0 {
                *slot = (record.occupancy, atom);
            }
        }
        None => pending.atoms.push((record.occupancy, atom)),
    }
}

fn extend_model(
    record: AtomRecord,
    model_index: usize,
    residues: &mut [PendingResidue],
    lookup: &HashMap<ResKey, usize>,
) {
    let atom = lookup.get(&record.key).and_then(|&res_idx| {
        residues[res_idx]
            .atoms
            .iter_mut()
            .map(|(_, atom)| atom)
            .find(|atom| atom.name == record.name)
    });

    match atom {
        Some(atom) if atom.model_count() == model_index => atom.push_model(record.pos),
        Some(_) => {}
        None => log::debug!(
            "Model {} names atom {} of residue {}{} absent from the first model; ignored",
            model_index + 1,
            record.name,
            record.res_name,
            record.key.res_seq
        ),
    }
}

fn parse_conect(
    line: &str,
    line_num: usize,
    bonds: &mut BTreeSet<(u32, u32)>,
) -> Result<(), Error> {
    let origin = field(line, 6, 11)
        .parse::<u32>()
        .map_err(|_| Error::parse(FORMAT, None, line_num, "Invalid CONECT origin serial"))?;

    for start in [11, 16, 21, 26] {
        let token = field(line, start, start + 5);
        if token.is_empty() {
            continue;
        }
        let target = token
            .parse::<u32>()
            .map_err(|_| Error::parse(FORMAT, None, line_num, "Invalid CONECT target serial"))?;
        if target != origin {
            bonds.insert((origin.min(target), origin.max(target)));
        }
    }
    Ok(())
}

fn parse_cryst1(line: &str, line_num: usize) -> Result<[[f64; 3]; 3], Error> {
    if line.len() < 54 {
        return Err(Error::parse(
            FORMAT,
            None,
            line_num,
            "CRYST1 record too short",
        ));
    }

    let length = |start: usize, end: usize| field(line, start, end).parse::<f64>().unwrap_or(0.0);
    let angle = |start: usize, end: usize| {
        field(line, start, end)
            .parse::<f64>()
            .unwrap_or(90.0)
            .to_radians()
    };

    let (a, b, c) = (length(6, 15), length(15, 24), length(24, 33));
    let (alpha, beta, gamma) = (angle(33, 40), angle(40, 47), angle(47, 54));

    if a <= 0.0 || b <= 0.0 || c <= 0.0 {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            "Invalid unit cell dimensions",
        ));
    }

    let (cos_a, cos_b, cos_g, sin_g) = (alpha.cos(), beta.cos(), gamma.cos(), gamma.sin());
    let tilt = (cos_a - cos_b * cos_g) / sin_g;

    Ok([
        [a, 0.0, 0.0],
        [b * cos_g, b * sin_g, 0.0],
        [
            c * cos_b,
            c * tilt,
            c * (1.0 - cos_b * cos_b - tilt * tilt).sqrt(),
        ],
    ])
}
